//! Send OTP activity

use tracing::{error, info, warn};

use crate::common::PhoneNumber;
use crate::domains::auth::errors::AuthFlowError;
use crate::domains::auth::models::{AdminRecord, AdminRecordUpdate};
use crate::domains::auth::types::OtpSent;
use crate::kernel::ServerDeps;

/// Send an OTP to an already-normalized phone number.
///
/// With `require_provisioned_admin` the allow-list is checked first and
/// unknown numbers are refused without contacting the SMS backend.
/// The login attempt counter is bumped only after the SMS backend
/// acknowledged dispatch, and a failure to bump it is only logged.
pub async fn send_otp(
    phone_number: &PhoneNumber,
    deps: &ServerDeps,
) -> Result<OtpSent, AuthFlowError> {
    let phone = phone_number.masked();

    // 1. Allow-list pre-check
    let mut record: Option<AdminRecord> = None;
    if deps.policy.require_provisioned_admin {
        record = deps.auth.get_record(phone_number).await.map_err(|e| {
            error!(%phone, error = %e, "Admin record lookup failed");
            AuthFlowError::Backend(e.to_string())
        })?;

        if record.is_none() {
            info!(%phone, "Phone number is not a provisioned admin");
            return Err(AuthFlowError::Unauthorized);
        }
    }

    // 2. Dispatch via the SMS backend
    deps.sms
        .send_otp(phone_number.as_str())
        .await
        .map_err(|e| {
            error!(%phone, error = %e, "Failed to send OTP");
            AuthFlowError::SmsBackend(e.message)
        })?;

    info!(%phone, "OTP sent");

    // 3. Best-effort attempt counter
    if record.is_none() {
        record = deps.auth.get_record(phone_number).await.ok().flatten();
    }
    match record {
        Some(record) => {
            if let Err(e) = deps
                .auth
                .update_record(phone_number, AdminRecordUpdate::login_attempt(&record))
                .await
            {
                warn!(%phone, error = %e, "Failed to record login attempt");
            }
        }
        None => warn!(%phone, "No admin record to count login attempt against"),
    }

    Ok(OtpSent {
        phone_number: phone_number.clone(),
        success: true,
    })
}
