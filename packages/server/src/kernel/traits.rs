// Trait definitions for dependency injection
//
// These are INFRASTRUCTURE traits only - no business logic.
// The OTP flow and the session gate are domain code built on top of them.
//
// Naming convention: Base* for trait names (e.g., BaseAuthBackend, BaseSmsVerifier)

use anyhow::Result;
use async_trait::async_trait;

use crate::common::PhoneNumber;
use crate::domains::auth::models::{AdminRecord, AdminRecordUpdate, Session, VerifiedOtp};

// =============================================================================
// Auth/Data Backend Trait (Infrastructure - sessions + admin records)
// =============================================================================

#[async_trait]
pub trait BaseAuthBackend: Send + Sync {
    /// Resolve a session credential. Unknown, expired or revoked credentials yield `None`.
    async fn get_session(&self, credential: &str) -> Result<Option<Session>>;

    /// Establish a session for a phone number whose OTP was approved
    async fn create_session(&self, assertion: VerifiedOtp) -> Result<Session>;

    /// Destroy a session (logout). Unknown credentials are not an error.
    async fn destroy_session(&self, credential: &str) -> Result<()>;

    /// Look up the admin record for a phone number
    async fn get_record(&self, phone_number: &PhoneNumber) -> Result<Option<AdminRecord>>;

    /// Apply a partial update; fails when no record exists for the phone number
    async fn update_record(
        &self,
        phone_number: &PhoneNumber,
        update: AdminRecordUpdate,
    ) -> Result<()>;
}

// =============================================================================
// SMS Verification Trait (Infrastructure - OTP send/check)
// =============================================================================

/// Outcome of checking a code with the SMS backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OtpCheck {
    Approved,
    Expired,
    /// Wrong code, still pending, or any other non-approval
    Rejected(String),
}

impl OtpCheck {
    /// Classify an error reply from the SMS backend
    pub fn from_error_message(message: &str) -> Self {
        if message.to_ascii_lowercase().contains("expired") {
            Self::Expired
        } else {
            Self::Rejected(message.to_string())
        }
    }
}

/// The SMS backend could not be reached or refused the request
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct SmsError {
    pub message: String,
}

impl SmsError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[async_trait]
pub trait BaseSmsVerifier: Send + Sync {
    /// Dispatch a one-time code to the phone number over SMS
    async fn send_otp(&self, phone_number: &str) -> std::result::Result<(), SmsError>;

    /// Check a code the user typed for the phone number
    async fn check_otp(
        &self,
        phone_number: &str,
        code: &str,
    ) -> std::result::Result<OtpCheck, SmsError>;
}
