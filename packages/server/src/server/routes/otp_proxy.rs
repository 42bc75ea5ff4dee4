//! OTP proxy endpoints
//!
//! Thin pass-through to the SMS verification backend for clients that must
//! not hold vendor credentials. Replies are always `{success: true}` or
//! `{error}` with status 400.

use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::kernel::OtpCheck;
use crate::server::app::AxumAppState;

#[derive(Debug, Deserialize)]
pub struct ProxySendBody {
    pub phone: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ProxyVerifyBody {
    pub phone: Option<String>,
    pub code: Option<String>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum ProxyResponse {
    Success { success: bool },
    Error { error: String },
}

impl ProxyResponse {
    fn ok() -> Response {
        (StatusCode::OK, Json(Self::Success { success: true })).into_response()
    }

    fn error(message: impl Into<String>) -> Response {
        (
            StatusCode::BAD_REQUEST,
            Json(Self::Error {
                error: message.into(),
            }),
        )
            .into_response()
    }
}

fn present(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// POST /send-otp
pub async fn send_otp_proxy(
    Extension(state): Extension<AxumAppState>,
    payload: Result<Json<ProxySendBody>, JsonRejection>,
) -> Response {
    let body = match payload {
        Ok(Json(body)) => body,
        Err(rejection) => return ProxyResponse::error(rejection.body_text()),
    };
    let Some(phone) = present(body.phone) else {
        return ProxyResponse::error("Phone number is required");
    };

    match state.deps.sms.send_otp(&phone).await {
        Ok(()) => {
            info!("Proxy OTP sent");
            ProxyResponse::ok()
        }
        Err(e) => {
            warn!(error = %e, "Proxy OTP send failed");
            ProxyResponse::error(e.message)
        }
    }
}

/// POST /verify-otp
pub async fn verify_otp_proxy(
    Extension(state): Extension<AxumAppState>,
    payload: Result<Json<ProxyVerifyBody>, JsonRejection>,
) -> Response {
    let body = match payload {
        Ok(Json(body)) => body,
        Err(rejection) => return ProxyResponse::error(rejection.body_text()),
    };
    let (Some(phone), Some(code)) = (present(body.phone), present(body.code)) else {
        return ProxyResponse::error("Phone number and verification code are required");
    };

    match state.deps.sms.check_otp(&phone, &code).await {
        Ok(OtpCheck::Approved) => ProxyResponse::ok(),
        // Keeps "expired" in the text so downstream clients classify it the same way
        Ok(OtpCheck::Expired) => ProxyResponse::error("Verification code has expired"),
        Ok(OtpCheck::Rejected(message)) => ProxyResponse::error(message),
        Err(e) => {
            warn!(error = %e, "Proxy OTP check failed");
            ProxyResponse::error(e.message)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_shapes() {
        assert_eq!(
            serde_json::to_value(ProxyResponse::Success { success: true }).unwrap(),
            serde_json::json!({ "success": true })
        );
        assert_eq!(
            serde_json::to_value(ProxyResponse::Error {
                error: "nope".into()
            })
            .unwrap(),
            serde_json::json!({ "error": "nope" })
        );
    }

    #[test]
    fn test_blank_fields_count_as_missing() {
        assert_eq!(present(Some("  ".into())), None);
        assert_eq!(present(None), None);
        assert_eq!(present(Some("+91".into())), Some("+91".to_string()));
    }
}
