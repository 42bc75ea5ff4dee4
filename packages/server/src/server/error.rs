//! HTTP error mapping

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;

use crate::domains::auth::AuthFlowError;

pub type AppResult<T> = Result<T, AppError>;

#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Flow(#[from] AuthFlowError),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("missing session credential")]
    MissingCredential,

    #[error("internal server error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::Flow(err) => match err {
                AuthFlowError::Validation(_)
                | AuthFlowError::SmsBackend(_)
                | AuthFlowError::ExpiredCode
                | AuthFlowError::EmptyCode => StatusCode::BAD_REQUEST,
                AuthFlowError::Unauthorized => StatusCode::FORBIDDEN,
                AuthFlowError::Busy | AuthFlowError::InvalidState(_) => StatusCode::CONFLICT,
                AuthFlowError::Backend(_) | AuthFlowError::SessionCreation(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::MissingCredential => StatusCode::UNAUTHORIZED,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            AppError::Flow(err) => err.kind(),
            AppError::BadRequest(_) => "bad_request",
            AppError::MissingCredential => "unauthorized",
            AppError::Internal(_) => "internal",
        }
    }

    /// Message safe to hand to the client
    fn public_message(&self) -> String {
        match self {
            AppError::Flow(AuthFlowError::Backend(_)) => "Internal server error".to_string(),
            AppError::Flow(AuthFlowError::SessionCreation(_)) => {
                "Could not establish session".to_string()
            }
            AppError::Internal(_) => "Internal server error".to_string(),
            AppError::BadRequest(message) => message.clone(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, debug = ?self, "Request failed");
        }
        let body = Json(json!({
            "error": self.public_message(),
            "kind": self.kind(),
        }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            AppError::from(AuthFlowError::Unauthorized).status_code(),
            StatusCode::FORBIDDEN
        );
        assert_eq!(
            AppError::from(AuthFlowError::Busy).status_code(),
            StatusCode::CONFLICT
        );
        assert_eq!(
            AppError::MissingCredential.status_code(),
            StatusCode::UNAUTHORIZED
        );
    }

    #[test]
    fn test_backend_details_are_not_exposed() {
        let err = AppError::from(AuthFlowError::Backend("connection refused".into()));
        assert_eq!(err.public_message(), "Internal server error");
        assert_eq!(err.kind(), "backend");

        let err = AppError::from(anyhow::anyhow!("pool timed out"));
        assert_eq!(err.public_message(), "Internal server error");
    }

    #[test]
    fn test_vendor_message_is_verbatim() {
        let err = AppError::from(AuthFlowError::SmsBackend("Max send attempts reached".into()));
        assert_eq!(err.public_message(), "Max send attempts reached");
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
