//! Verify OTP activity

use chrono::Utc;
use tracing::{error, info, warn};

use crate::common::PhoneNumber;
use crate::domains::auth::errors::AuthFlowError;
use crate::domains::auth::models::{AdminRecordUpdate, Session, VerifiedOtp};
use crate::kernel::{OtpCheck, ServerDeps};

/// Check a code with the SMS backend and, when approved, establish a session.
///
/// Only provisioned admins get a session: an approved code for a number with
/// no admin record is `Unauthorized` and nothing is minted. The session is
/// created before the record is marked verified; if marking fails the fresh
/// session is torn down, so a caller never holds a session whose record
/// update was lost.
pub async fn verify_otp(
    phone_number: &PhoneNumber,
    code: &str,
    deps: &ServerDeps,
) -> Result<Session, AuthFlowError> {
    let phone = phone_number.masked();

    if code.trim().is_empty() {
        return Err(AuthFlowError::EmptyCode);
    }

    // 1. Check with the SMS backend
    let check = deps
        .sms
        .check_otp(phone_number.as_str(), code)
        .await
        .map_err(|e| {
            error!(%phone, error = %e, "OTP verification request failed");
            AuthFlowError::SmsBackend(e.message)
        })?;

    match check {
        OtpCheck::Approved => {}
        OtpCheck::Expired => {
            info!(%phone, "OTP expired");
            return Err(AuthFlowError::ExpiredCode);
        }
        OtpCheck::Rejected(reason) => {
            info!(%phone, %reason, "OTP rejected");
            return Err(AuthFlowError::SmsBackend(reason));
        }
    }

    // 2. The approval only counts for a provisioned admin
    let record = deps.auth.get_record(phone_number).await.map_err(|e| {
        error!(%phone, error = %e, "Failed to load admin record");
        AuthFlowError::Backend(e.to_string())
    })?;
    if record.is_none() {
        warn!(%phone, "OTP approved for a number that is not an admin");
        return Err(AuthFlowError::Unauthorized);
    }

    // 3. Establish the session from the approval
    let session = deps
        .auth
        .create_session(VerifiedOtp::new(phone_number.clone()))
        .await
        .map_err(|e| {
            error!(%phone, error = %e, "OTP approved but session creation failed");
            AuthFlowError::SessionCreation(e.to_string())
        })?;

    // 4. Persist verification state
    if let Err(e) = deps
        .auth
        .update_record(phone_number, AdminRecordUpdate::verified_at(Utc::now()))
        .await
    {
        error!(%phone, error = %e, "Failed to mark admin verified");
        if let Err(cleanup) = deps.auth.destroy_session(&session.token).await {
            warn!(%phone, error = %cleanup, "Failed to discard orphaned session");
        }
        return Err(AuthFlowError::Backend(e.to_string()));
    }

    info!(%phone, session_id = %session.id, "OTP verified");
    Ok(session)
}
