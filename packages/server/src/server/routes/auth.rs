use axum::{
    extract::{rejection::JsonRejection, Extension},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use tracing::info;

use crate::common::normalize_and_validate;
use crate::domains::auth::{activities, AccessResponse, AuthFlowError, OtpSent, OtpVerified};
use crate::server::app::AxumAppState;
use crate::server::error::{AppError, AppResult};
use crate::server::middleware::{ClientIp, SessionCredential};

#[derive(Debug, Deserialize)]
pub struct RequestOtpBody {
    pub phone: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpBody {
    pub phone: String,
    pub code: String,
}

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> AppResult<T> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| AppError::BadRequest(rejection.body_text()))
}

/// POST /api/auth/otp
pub async fn request_otp_handler(
    Extension(state): Extension<AxumAppState>,
    client_ip: Option<Extension<ClientIp>>,
    payload: Result<Json<RequestOtpBody>, JsonRejection>,
) -> AppResult<Json<OtpSent>> {
    let body = json_body(payload)?;
    let phone_number = normalize_and_validate(&body.phone).map_err(AuthFlowError::from)?;

    info!(
        phone = %phone_number.masked(),
        client_ip = ?client_ip.map(|Extension(ClientIp(ip))| ip),
        "OTP requested"
    );

    let sent = activities::send_otp(&phone_number, &state.deps).await?;
    Ok(Json(sent))
}

/// POST /api/auth/otp/verify
pub async fn verify_otp_handler(
    Extension(state): Extension<AxumAppState>,
    payload: Result<Json<VerifyOtpBody>, JsonRejection>,
) -> AppResult<Json<OtpVerified>> {
    let body = json_body(payload)?;
    let phone_number = normalize_and_validate(&body.phone).map_err(AuthFlowError::from)?;

    let session = activities::verify_otp(&phone_number, &body.code, &state.deps).await?;

    Ok(Json(OtpVerified {
        phone_number,
        token: session.token,
        expires_at: session.expires_at,
    }))
}

/// GET /api/auth/access
///
/// 200 when the bearer session belongs to a verified admin, 403 otherwise.
pub async fn access_handler(
    Extension(state): Extension<AxumAppState>,
    credential: Option<Extension<SessionCredential>>,
) -> Response {
    let credential = credential.map(|Extension(c)| c);
    let decision = state
        .gate
        .resolve_access(credential.as_ref().map(SessionCredential::as_str))
        .await;

    let status = if decision.is_granted() {
        StatusCode::OK
    } else {
        StatusCode::FORBIDDEN
    };
    (status, Json(AccessResponse::from(decision))).into_response()
}

/// POST /api/auth/logout
pub async fn logout_handler(
    Extension(state): Extension<AxumAppState>,
    credential: Option<Extension<SessionCredential>>,
) -> AppResult<StatusCode> {
    let Some(Extension(credential)) = credential else {
        return Err(AppError::MissingCredential);
    };

    state.deps.auth.destroy_session(credential.as_str()).await?;
    Ok(StatusCode::NO_CONTENT)
}
