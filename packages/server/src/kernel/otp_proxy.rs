// Client for the OTP proxy endpoints (`/send-otp`, `/verify-otp`)
//
// The proxy holds the vendor credentials; callers only need its URL and,
// when deployed behind an API gateway, an anonymous key.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::kernel::{BaseSmsVerifier, OtpCheck, SmsError};

#[derive(Debug, Serialize)]
struct ProxyRequest<'a> {
    phone: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    code: Option<&'a str>,
}

/// `{ success: true }` or `{ error }`
#[derive(Debug, Deserialize)]
struct ProxyReply {
    #[serde(default)]
    success: bool,
    error: Option<String>,
}

pub struct ProxySmsVerifier {
    base_url: String,
    api_key: Option<String>,
    client: Client,
}

impl ProxySmsVerifier {
    pub fn new(base_url: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key,
            client: Client::new(),
        }
    }

    async fn call(&self, path: &str, body: &ProxyRequest<'_>) -> Result<ProxyReply, SmsError> {
        let mut request = self
            .client
            .post(format!("{}/{}", self.base_url, path))
            .json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key).header("apikey", key);
        }

        let response = request.send().await.map_err(|e| {
            error!(error = %e, path, "OTP proxy unreachable");
            SmsError::new(format!("OTP service unreachable: {}", e))
        })?;

        let status = response.status();
        response.json::<ProxyReply>().await.map_err(|e| {
            error!(error = %e, %status, path, "Unreadable OTP proxy reply");
            SmsError::new(format!("Unexpected reply from OTP service ({})", status))
        })
    }
}

#[async_trait]
impl BaseSmsVerifier for ProxySmsVerifier {
    async fn send_otp(&self, phone_number: &str) -> Result<(), SmsError> {
        let reply = self
            .call(
                "send-otp",
                &ProxyRequest {
                    phone: phone_number,
                    code: None,
                },
            )
            .await?;

        match reply {
            ProxyReply { success: true, .. } => Ok(()),
            ProxyReply { error: Some(message), .. } => Err(SmsError::new(message)),
            _ => Err(SmsError::new("Failed to send OTP")),
        }
    }

    async fn check_otp(&self, phone_number: &str, code: &str) -> Result<OtpCheck, SmsError> {
        let reply = self
            .call(
                "verify-otp",
                &ProxyRequest {
                    phone: phone_number,
                    code: Some(code),
                },
            )
            .await?;

        Ok(match reply {
            ProxyReply { success: true, .. } => OtpCheck::Approved,
            ProxyReply { error: Some(message), .. } => OtpCheck::from_error_message(&message),
            _ => OtpCheck::Rejected("Failed to verify OTP".to_string()),
        })
    }
}
