//! Server dependencies for the auth domain.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;
use twilio::{TwilioError, TwilioService, VerificationStatus};

use crate::kernel::{BaseAuthBackend, BaseSmsVerifier, OtpCheck, SmsError};

// =============================================================================
// TwilioService Adapter (implements BaseSmsVerifier trait)
// =============================================================================

/// Wrapper around TwilioService that implements BaseSmsVerifier trait
pub struct TwilioAdapter(pub Arc<TwilioService>);

impl TwilioAdapter {
    pub fn new(service: Arc<TwilioService>) -> Self {
        Self(service)
    }
}

#[async_trait]
impl BaseSmsVerifier for TwilioAdapter {
    async fn send_otp(&self, phone_number: &str) -> Result<(), SmsError> {
        self.0
            .send_otp(phone_number)
            .await
            .map(|_| ())
            .map_err(|e| SmsError::new(e.message()))
    }

    async fn check_otp(&self, phone_number: &str, code: &str) -> Result<OtpCheck, SmsError> {
        match self.0.verify_otp(phone_number, code).await {
            Ok(response) => Ok(match response.status() {
                VerificationStatus::Approved => OtpCheck::Approved,
                VerificationStatus::Expired => OtpCheck::Expired,
                status => {
                    warn!(?status, "Verification check not approved");
                    OtpCheck::Rejected("Invalid verification code".to_string())
                }
            }),
            // Twilio answered: classify its message
            Err(e @ TwilioError::Api { .. }) => Ok(OtpCheck::from_error_message(&e.message())),
            Err(e) => Err(SmsError::new(e.message())),
        }
    }
}

// =============================================================================
// ServerDeps
// =============================================================================

/// Knobs that select between the observed flow variants
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthPolicy {
    /// Look up the admin record before sending, so non-admins never cost an SMS
    pub require_provisioned_admin: bool,
}

impl Default for AuthPolicy {
    fn default() -> Self {
        Self {
            require_provisioned_admin: true,
        }
    }
}

/// Server dependencies accessible to activities (using traits for testability)
#[derive(Clone)]
pub struct ServerDeps {
    pub auth: Arc<dyn BaseAuthBackend>,
    pub sms: Arc<dyn BaseSmsVerifier>,
    pub policy: AuthPolicy,
}

impl ServerDeps {
    /// Create new ServerDeps with the given dependencies
    pub fn new(
        auth: Arc<dyn BaseAuthBackend>,
        sms: Arc<dyn BaseSmsVerifier>,
        policy: AuthPolicy,
    ) -> Self {
        Self { auth, sms, policy }
    }
}
