//! TwilioAdapter outcome mapping against a local Verify API stand-in.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{http::StatusCode, routing::post, Form, Json, Router};
use serde_json::{json, Value};
use twilio::{TwilioOptions, TwilioService};

use admin_core::kernel::{BaseSmsVerifier, OtpCheck, TwilioAdapter};

async fn verifications(Form(form): Form<HashMap<String, String>>) -> (StatusCode, Json<Value>) {
    match form.get("To").map(String::as_str) {
        Some("+918888888888") => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({"code": 60203, "message": "Max send attempts reached"})),
        ),
        to => (
            StatusCode::CREATED,
            Json(json!({"to": to, "channel": "sms", "status": "pending"})),
        ),
    }
}

async fn verification_check(
    Form(form): Form<HashMap<String, String>>,
) -> (StatusCode, Json<Value>) {
    match form.get("Code").map(String::as_str) {
        Some("123456") => (StatusCode::OK, Json(json!({"status": "approved", "valid": true}))),
        Some("111111") => (StatusCode::OK, Json(json!({"status": "expired", "valid": false}))),
        Some("999999") => (
            StatusCode::NOT_FOUND,
            Json(json!({"code": 20404, "message": "Verification code has Expired"})),
        ),
        _ => (StatusCode::OK, Json(json!({"status": "pending", "valid": false}))),
    }
}

async fn adapter() -> TwilioAdapter {
    let app = Router::new()
        .route("/v2/Services/:service/Verifications", post(verifications))
        .route("/v2/Services/:service/VerificationCheck", post(verification_check));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    let service = TwilioService::new(TwilioOptions {
        account_sid: "AC_TEST".to_string(),
        auth_token: "token".to_string(),
        service_id: "VA_TEST".to_string(),
    })
    .with_base_url(format!("http://{}", addr));
    TwilioAdapter::new(Arc::new(service))
}

#[tokio::test]
async fn send_succeeds_and_surfaces_vendor_errors() {
    let adapter = adapter().await;

    adapter.send_otp("+919999999999").await.unwrap();

    let err = adapter.send_otp("+918888888888").await.unwrap_err();
    assert_eq!(err.message, "Max send attempts reached");
}

#[tokio::test]
async fn check_statuses_are_classified() {
    let adapter = adapter().await;
    let phone = "+919999999999";

    assert_eq!(adapter.check_otp(phone, "123456").await.unwrap(), OtpCheck::Approved);
    assert_eq!(adapter.check_otp(phone, "111111").await.unwrap(), OtpCheck::Expired);
    assert_eq!(adapter.check_otp(phone, "999999").await.unwrap(), OtpCheck::Expired);
    assert_eq!(
        adapter.check_otp(phone, "000000").await.unwrap(),
        OtpCheck::Rejected("Invalid verification code".to_string())
    );
}

#[tokio::test]
async fn unreachable_vendor_is_an_error() {
    let service = TwilioService::new(TwilioOptions {
        account_sid: "AC_TEST".to_string(),
        auth_token: "token".to_string(),
        service_id: "VA_TEST".to_string(),
    })
    .with_base_url("http://127.0.0.1:1");
    let adapter = TwilioAdapter::new(Arc::new(service));

    assert!(adapter.check_otp("+919999999999", "123456").await.is_err());
}
