use serde::{Deserialize, Serialize};

/// Response of `POST /v2/Services/{sid}/Verifications`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OTPResponse {
    pub sid: Option<String>,
    pub to: String,
    pub channel: String,
    pub status: String,
    #[serde(default)]
    pub valid: bool,
}

/// Response of `POST /v2/Services/{sid}/VerificationCheck`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OTPVerifyResponse {
    pub to: Option<String>,
    pub status: String,
    #[serde(default)]
    pub valid: bool,
}

impl OTPVerifyResponse {
    pub fn status(&self) -> VerificationStatus {
        VerificationStatus::from(self.status.as_str())
    }
}

/// Status of a verification as reported by Twilio Verify
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerificationStatus {
    Pending,
    Approved,
    Canceled,
    Expired,
    MaxAttemptsReached,
    Other(String),
}

impl From<&str> for VerificationStatus {
    fn from(status: &str) -> Self {
        match status {
            "pending" => Self::Pending,
            "approved" => Self::Approved,
            "canceled" => Self::Canceled,
            "expired" => Self::Expired,
            "max_attempts_reached" => Self::MaxAttemptsReached,
            other => Self::Other(other.to_string()),
        }
    }
}

/// Error body returned by the Twilio REST API on non-2xx responses
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwilioErrorBody {
    pub code: Option<i64>,
    pub message: Option<String>,
    pub more_info: Option<String>,
    pub status: Option<u16>,
}
