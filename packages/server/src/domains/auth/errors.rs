use thiserror::Error;

use crate::common::ValidationError;

/// Failures of the OTP authentication flow.
///
/// Every variant is meant to be shown to the user as a notice; none of them
/// should escape as a panic or an unhandled fault.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthFlowError {
    /// Bad phone format, decided locally before any network call
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// Phone is not a provisioned admin
    #[error("unauthorized phone number")]
    Unauthorized,

    /// Auth/data backend call failed
    #[error("backend error: {0}")]
    Backend(String),

    /// Send or verify failed at the SMS vendor or proxy; message is verbatim
    #[error("{0}")]
    SmsBackend(String),

    /// The code was valid once but has expired
    #[error("verification code has expired")]
    ExpiredCode,

    /// Code was approved but no session could be established
    #[error("could not establish session: {0}")]
    SessionCreation(String),

    #[error("verification code is required")]
    EmptyCode,

    /// A send or verify for this flow is still outstanding
    #[error("a request is already in progress")]
    Busy,

    #[error("{0}")]
    InvalidState(&'static str),
}

impl AuthFlowError {
    /// Stable machine-readable kind, used in API responses
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::Unauthorized => "unauthorized",
            Self::Backend(_) => "backend",
            Self::SmsBackend(_) => "sms_backend",
            Self::ExpiredCode => "expired_code",
            Self::SessionCreation(_) => "session_creation",
            Self::EmptyCode => "empty_code",
            Self::Busy => "busy",
            Self::InvalidState(_) => "invalid_state",
        }
    }

    /// Title shown above the message in a notice
    pub fn title(&self) -> &'static str {
        match self {
            Self::Validation(_) => "Invalid Phone Number",
            Self::Unauthorized => "Unauthorized",
            Self::ExpiredCode => "Code Expired",
            _ => "Error",
        }
    }
}
