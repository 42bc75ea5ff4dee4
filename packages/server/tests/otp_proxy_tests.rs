//! The proxy client talking to a live proxy server backed by mocks.

use std::sync::Arc;

use admin_core::common::normalize_and_validate;
use admin_core::domains::auth::{AuthFlowError, FlowState, OtpFlow};
use admin_core::kernel::{
    AuthPolicy, BaseSmsVerifier, MockAuthBackend, MockSmsVerifier, OtpCheck, ProxySmsVerifier,
    ServerDeps, SmsError, TestDependencies,
};
use admin_core::server::{build_router, AxumAppState};

/// Serve the proxy routes on an ephemeral port; returns its base URL
async fn spawn_proxy(deps: &TestDependencies) -> String {
    let app = build_router(AxumAppState::new(deps.server_deps(), None), &[]);
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{}", addr)
}

fn vendor(sms: MockSmsVerifier) -> TestDependencies {
    TestDependencies::new(MockAuthBackend::new(), sms)
}

#[tokio::test]
async fn send_through_proxy() {
    let upstream = vendor(MockSmsVerifier::new());
    let client = ProxySmsVerifier::new(spawn_proxy(&upstream).await, Some("anon-key".into()));

    client.send_otp("+919999999999").await.unwrap();

    assert_eq!(upstream.sms.sent(), vec!["+919999999999".to_string()]);
}

#[tokio::test]
async fn send_error_is_verbatim_through_proxy() {
    let upstream = vendor(
        MockSmsVerifier::new().with_send_result(Err(SmsError::new("Max send attempts reached"))),
    );
    let client = ProxySmsVerifier::new(spawn_proxy(&upstream).await, None);

    let err = client.send_otp("+919999999999").await.unwrap_err();

    assert_eq!(err.message, "Max send attempts reached");
}

#[tokio::test]
async fn check_outcomes_survive_the_proxy() {
    let upstream = vendor(MockSmsVerifier::new());
    upstream.sms.push_check_result(Ok(OtpCheck::Expired));
    let client = ProxySmsVerifier::new(spawn_proxy(&upstream).await, None);

    assert_eq!(
        client.check_otp("+919999999999", "123456").await.unwrap(),
        OtpCheck::Expired
    );
    assert_eq!(
        client.check_otp("+919999999999", "123456").await.unwrap(),
        OtpCheck::Approved
    );
    assert_eq!(
        client.check_otp("+919999999999", "000000").await.unwrap(),
        OtpCheck::Rejected("Invalid verification code".to_string())
    );
}

#[tokio::test]
async fn unreachable_proxy_is_an_sms_error() {
    let client = ProxySmsVerifier::new("http://127.0.0.1:1", None);

    let err = client.send_otp("+919999999999").await.unwrap_err();

    assert!(err.message.starts_with("OTP service unreachable"));
}

#[tokio::test]
async fn flow_over_proxy_with_local_records() {
    let upstream = vendor(MockSmsVerifier::new());
    let base_url = spawn_proxy(&upstream).await;

    let records = Arc::new(
        MockAuthBackend::new().with_admin(&normalize_and_validate("9999999999").unwrap(), false),
    );
    let deps = ServerDeps::new(
        records.clone(),
        Arc::new(ProxySmsVerifier::new(base_url, None)),
        AuthPolicy::default(),
    );
    let flow = OtpFlow::new(deps);

    let phone_number = flow.request_code("9999999999").await.unwrap();
    assert!(matches!(
        flow.verify_otp(&phone_number, "000000").await,
        Err(AuthFlowError::SmsBackend(_))
    ));
    flow.verify_otp(&phone_number, "123456").await.unwrap();

    assert!(matches!(flow.state().await, FlowState::Verified { .. }));
    assert!(records.record(&phone_number).unwrap().is_verified);
}
