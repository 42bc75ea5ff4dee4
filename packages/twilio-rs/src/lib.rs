// Thin client for the Twilio Verify API (send a code, check a code).

use std::collections::HashMap;

pub mod models;
use reqwest::{header, Client};
use tracing::{debug, error};

pub use crate::models::{OTPResponse, OTPVerifyResponse, TwilioErrorBody, VerificationStatus};

const DEFAULT_BASE_URL: &str = "https://verify.twilio.com";

#[derive(Debug, Clone)]
pub struct TwilioOptions {
    pub account_sid: String,
    pub auth_token: String,
    pub service_id: String,
}

/// Errors returned by [`TwilioService`]
#[derive(Debug, thiserror::Error)]
pub enum TwilioError {
    /// Twilio answered with a non-2xx status. `message` is Twilio's own message when present.
    #[error("{message}")]
    Api {
        status: u16,
        code: Option<i64>,
        message: String,
    },

    #[error("Request to Twilio failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("Error parsing Twilio response: {0}")]
    Parse(#[source] reqwest::Error),
}

impl TwilioError {
    /// Message suitable for surfacing to a caller verbatim
    pub fn message(&self) -> String {
        self.to_string()
    }
}

#[derive(Debug, Clone)]
pub struct TwilioService {
    options: TwilioOptions,
    base_url: String,
    client: Client,
}

impl TwilioService {
    pub fn new(options: TwilioOptions) -> Self {
        Self {
            options,
            base_url: DEFAULT_BASE_URL.to_string(),
            client: Client::new(),
        }
    }

    /// Point the client at a different Verify host (local stand-ins, regional edges).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn service_url(&self, resource: &str) -> String {
        format!(
            "{base}/v2/Services/{serv_id}/{resource}",
            base = self.base_url,
            serv_id = self.options.service_id,
        )
    }

    /// Start a verification: Twilio dispatches a one-time code over SMS.
    pub async fn send_otp(&self, recipient: &str) -> Result<OTPResponse, TwilioError> {
        let mut form_body: HashMap<&str, &str> = HashMap::new();
        form_body.insert("To", recipient);
        form_body.insert("Channel", "sms");

        let response = self.post_form(&self.service_url("Verifications"), &form_body).await?;
        let status = response.status();
        if !status.is_success() {
            return Err(api_error(response).await);
        }

        let data = response
            .json::<OTPResponse>()
            .await
            .map_err(TwilioError::Parse)?;
        debug!(status = %data.status, "Twilio verification created");
        Ok(data)
    }

    /// Check a code. Any 2xx reply is returned as-is; callers inspect
    /// [`OTPVerifyResponse::status`] to see whether it was approved.
    pub async fn verify_otp(
        &self,
        recipient: &str,
        code: &str,
    ) -> Result<OTPVerifyResponse, TwilioError> {
        let mut form_body: HashMap<&str, &str> = HashMap::new();
        form_body.insert("To", recipient);
        form_body.insert("Code", code);

        let response = self
            .post_form(&self.service_url("VerificationCheck"), &form_body)
            .await?;
        if !response.status().is_success() {
            return Err(api_error(response).await);
        }

        response
            .json::<OTPVerifyResponse>()
            .await
            .map_err(TwilioError::Parse)
    }

    async fn post_form(
        &self,
        url: &str,
        form_body: &HashMap<&str, &str>,
    ) -> Result<reqwest::Response, TwilioError> {
        self.client
            .post(url)
            .basic_auth(&self.options.account_sid, Some(&self.options.auth_token))
            .header(header::ACCEPT, "application/json")
            .form(form_body)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "Request to Twilio failed");
                TwilioError::Transport(e)
            })
    }
}

async fn api_error(response: reqwest::Response) -> TwilioError {
    let status = response.status().as_u16();
    let raw = response.text().await.unwrap_or_default();
    error!(status, body = %raw, "Twilio returned an error");

    let body = serde_json::from_str::<TwilioErrorBody>(&raw).ok();
    let code = body.as_ref().and_then(|b| b.code);
    let message = body
        .and_then(|b| b.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| format!("Twilio returned status {}", status));

    TwilioError::Api {
        status,
        code,
        message,
    }
}
