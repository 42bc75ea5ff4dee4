//! Admin session gate
//!
//! Decides dashboard vs login for a visitor. Every call re-derives the
//! decision from backend state; nothing is cached between calls.

use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::common::PhoneNumber;
use crate::domains::auth::models::{AdminRecordUpdate, Session};
use crate::domains::auth::types::Notice;
use crate::kernel::BaseAuthBackend;

/// Why access was denied
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DenialReason {
    /// No credential, or the backend does not know it
    NoSession,
    /// The session carries no usable phone identifier
    MissingPhone,
    /// The admin record could not be read
    LookupFailed(String),
    /// Session is valid but the phone is not a provisioned admin
    NotProvisioned,
    /// Provisioned admin whose OTP was never verified
    NotVerified,
}

impl DenialReason {
    /// Human-readable reason
    pub fn message(&self) -> &'static str {
        match self {
            Self::NoSession => "No active session",
            Self::MissingPhone => "Session has no phone number",
            Self::LookupFailed(_) => "Could not check admin access. Please try again.",
            Self::NotProvisioned => "You do not have admin access",
            Self::NotVerified => "Your admin account is not yet verified",
        }
    }

    /// Notice to surface, if any. A missing session just shows the login flow.
    pub fn notice(&self) -> Option<Notice> {
        match self {
            Self::NoSession => None,
            Self::NotVerified => Some(Notice::error("Not Verified", self.message())),
            _ => Some(Notice::error("Access Denied", self.message())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum AccessDecision {
    Granted {
        phone_number: PhoneNumber,
        session: Session,
    },
    Denied {
        reason: DenialReason,
    },
}

impl AccessDecision {
    fn denied(reason: DenialReason) -> Self {
        Self::Denied { reason }
    }

    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted { .. })
    }

    /// Human-readable reason, only present on denial
    pub fn reason(&self) -> Option<&'static str> {
        match self {
            Self::Granted { .. } => None,
            Self::Denied { reason } => Some(reason.message()),
        }
    }
}

/// Wire form of an [`AccessDecision`]
#[derive(Debug, Clone, Serialize)]
pub struct AccessResponse {
    /// `"granted"` or `"denied"`
    pub access: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<PhoneNumber>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session: Option<Session>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<Notice>,
}

impl From<AccessDecision> for AccessResponse {
    fn from(decision: AccessDecision) -> Self {
        match decision {
            AccessDecision::Granted {
                phone_number,
                session,
            } => Self {
                access: "granted",
                phone_number: Some(phone_number),
                session: Some(session),
                reason: None,
                notice: None,
            },
            AccessDecision::Denied { reason } => Self {
                access: "denied",
                phone_number: None,
                session: None,
                reason: Some(reason.message().to_string()),
                notice: reason.notice(),
            },
        }
    }
}

#[derive(Clone)]
pub struct AdminSessionGate {
    auth: Arc<dyn BaseAuthBackend>,
}

impl AdminSessionGate {
    pub fn new(auth: Arc<dyn BaseAuthBackend>) -> Self {
        Self { auth }
    }

    /// Resolve access for the given session credential.
    ///
    /// Fails closed: any backend error denies. On a grant the admin record's
    /// login bookkeeping is updated, but a failed update never changes the
    /// decision.
    pub async fn resolve_access(&self, credential: Option<&str>) -> AccessDecision {
        let Some(credential) = credential.filter(|c| !c.is_empty()) else {
            return AccessDecision::denied(DenialReason::NoSession);
        };

        let session = match self.auth.get_session(credential).await {
            Ok(Some(session)) => session,
            Ok(None) => {
                debug!("Unknown or expired session");
                return AccessDecision::denied(DenialReason::NoSession);
            }
            Err(e) => {
                error!(error = %e, "Session lookup failed");
                return AccessDecision::denied(DenialReason::LookupFailed(e.to_string()));
            }
        };

        let Some(phone_number) = session.phone_number.clone() else {
            warn!(session_id = %session.id, "Session without phone number");
            return AccessDecision::denied(DenialReason::MissingPhone);
        };
        let phone = phone_number.masked();

        let record = match self.auth.get_record(&phone_number).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                info!(%phone, "Session holder is not a provisioned admin");
                return AccessDecision::denied(DenialReason::NotProvisioned);
            }
            Err(e) => {
                error!(%phone, error = %e, "Admin record lookup failed");
                return AccessDecision::denied(DenialReason::LookupFailed(e.to_string()));
            }
        };

        if !record.is_verified {
            info!(%phone, "Admin not yet verified");
            return AccessDecision::denied(DenialReason::NotVerified);
        }

        if let Err(e) = self
            .auth
            .update_record(
                &phone_number,
                AdminRecordUpdate::dashboard_login(&record, Utc::now()),
            )
            .await
        {
            warn!(%phone, error = %e, "Failed to record dashboard login");
        }

        info!(%phone, session_id = %session.id, "Admin access granted");
        AccessDecision::Granted {
            phone_number,
            session,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::normalize_and_validate;
    use crate::kernel::{AuthOp, MockAuthBackend};

    fn phone() -> PhoneNumber {
        normalize_and_validate("9999999999").unwrap()
    }

    fn gate(auth: &Arc<MockAuthBackend>) -> AdminSessionGate {
        AdminSessionGate::new(auth.clone())
    }

    #[tokio::test]
    async fn test_verified_admin_is_granted() {
        let auth = Arc::new(MockAuthBackend::new().with_admin(&phone(), true));
        let token = auth.insert_session(Some(&phone()));

        let decision = gate(&auth).resolve_access(Some(&token)).await;

        assert!(decision.is_granted());
        assert_eq!(decision.reason(), None);
        let record = auth.record(&phone()).unwrap();
        assert_eq!(record.login_attempts, 1);
        assert!(record.last_login_at.is_some());
    }

    #[tokio::test]
    async fn test_unverified_admin_is_denied_distinctly() {
        let auth = Arc::new(MockAuthBackend::new().with_admin(&phone(), false));
        let token = auth.insert_session(Some(&phone()));

        let decision = gate(&auth).resolve_access(Some(&token)).await;

        assert_eq!(
            decision,
            AccessDecision::Denied {
                reason: DenialReason::NotVerified
            }
        );
        assert_eq!(decision.reason(), Some("Your admin account is not yet verified"));
        assert!(auth.updates().is_empty());
    }

    #[tokio::test]
    async fn test_no_credential_makes_no_backend_calls() {
        let auth = Arc::new(MockAuthBackend::new());

        let decision = gate(&auth).resolve_access(None).await;

        assert_eq!(
            decision,
            AccessDecision::Denied {
                reason: DenialReason::NoSession
            }
        );
        assert!(auth.calls().is_empty());
    }

    #[tokio::test]
    async fn test_unknown_session_only_checks_session() {
        let auth = Arc::new(MockAuthBackend::new().with_admin(&phone(), true));

        let decision = gate(&auth).resolve_access(Some("stale-token")).await;

        assert!(!decision.is_granted());
        assert_eq!(auth.calls(), vec![AuthOp::GetSession]);
    }

    #[tokio::test]
    async fn test_session_without_phone_is_denied() {
        let auth = Arc::new(MockAuthBackend::new());
        let token = auth.insert_session(None);

        let decision = gate(&auth).resolve_access(Some(&token)).await;

        assert_eq!(
            decision,
            AccessDecision::Denied {
                reason: DenialReason::MissingPhone
            }
        );
        assert_eq!(auth.calls(), vec![AuthOp::GetSession]);
    }

    #[tokio::test]
    async fn test_lookup_failure_fails_closed() {
        let auth = Arc::new(
            MockAuthBackend::new()
                .with_admin(&phone(), true)
                .failing(AuthOp::GetRecord),
        );
        let token = auth.insert_session(Some(&phone()));

        let decision = gate(&auth).resolve_access(Some(&token)).await;

        assert!(matches!(
            decision,
            AccessDecision::Denied {
                reason: DenialReason::LookupFailed(_)
            }
        ));
        let response = AccessResponse::from(decision);
        assert_eq!(response.access, "denied");
        assert_eq!(response.notice.unwrap().title, "Access Denied");
    }

    #[tokio::test]
    async fn test_session_lookup_failure_fails_closed() {
        let auth = Arc::new(MockAuthBackend::new().failing(AuthOp::GetSession));

        let decision = gate(&auth).resolve_access(Some("token")).await;

        assert!(matches!(
            decision,
            AccessDecision::Denied {
                reason: DenialReason::LookupFailed(_)
            }
        ));
    }

    #[tokio::test]
    async fn test_missing_record_is_denied() {
        let auth = Arc::new(MockAuthBackend::new());
        let token = auth.insert_session(Some(&phone()));

        let decision = gate(&auth).resolve_access(Some(&token)).await;

        assert_eq!(
            decision,
            AccessDecision::Denied {
                reason: DenialReason::NotProvisioned
            }
        );
    }

    #[tokio::test]
    async fn test_bookkeeping_failure_still_grants() {
        let auth = Arc::new(
            MockAuthBackend::new()
                .with_admin(&phone(), true)
                .failing(AuthOp::UpdateRecord),
        );
        let token = auth.insert_session(Some(&phone()));

        let decision = gate(&auth).resolve_access(Some(&token)).await;

        assert!(decision.is_granted());
    }

    #[tokio::test]
    async fn test_each_call_rechecks_backend_state() {
        let auth = Arc::new(MockAuthBackend::new().with_admin(&phone(), false));
        let token = auth.insert_session(Some(&phone()));
        let gate = gate(&auth);

        assert!(!gate.resolve_access(Some(&token)).await.is_granted());

        // Verification lands between two page loads
        auth.update_record(&phone(), AdminRecordUpdate::verified_at(Utc::now()))
            .await
            .unwrap();
        assert!(gate.resolve_access(Some(&token)).await.is_granted());

        auth.fail(AuthOp::GetRecord);
        assert!(!gate.resolve_access(Some(&token)).await.is_granted());
    }

    #[test]
    fn test_no_session_has_no_notice() {
        assert!(DenialReason::NoSession.notice().is_none());
        assert_eq!(
            DenialReason::NotVerified.notice().unwrap().title,
            "Not Verified"
        );
    }
}
