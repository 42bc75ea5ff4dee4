// TestDependencies - mock implementations for testing
//
// Provides mock backends that can be injected into ServerDeps for tests.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;
use uuid::Uuid;

use super::{AuthPolicy, BaseAuthBackend, BaseSmsVerifier, OtpCheck, ServerDeps, SmsError};
use crate::common::PhoneNumber;
use crate::domains::auth::models::{AdminRecord, AdminRecordUpdate, Session, VerifiedOtp};

// =============================================================================
// Mock Auth Backend
// =============================================================================

/// Backend operations that can be made to fail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AuthOp {
    GetSession,
    CreateSession,
    DestroySession,
    GetRecord,
    UpdateRecord,
}

/// In-memory auth/data backend with call recording and failure injection
pub struct MockAuthBackend {
    records: Arc<Mutex<HashMap<String, AdminRecord>>>,
    sessions: Arc<Mutex<HashMap<String, Session>>>,
    failures: Arc<Mutex<HashSet<AuthOp>>>,
    calls: Arc<Mutex<Vec<AuthOp>>>,
    updates: Arc<Mutex<Vec<(String, AdminRecordUpdate)>>>,
}

impl MockAuthBackend {
    pub fn new() -> Self {
        Self {
            records: Arc::new(Mutex::new(HashMap::new())),
            sessions: Arc::new(Mutex::new(HashMap::new())),
            failures: Arc::new(Mutex::new(HashSet::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            updates: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Provision an admin record
    pub fn with_admin(self, phone_number: &PhoneNumber, is_verified: bool) -> Self {
        let mut record = AdminRecord::new(phone_number);
        record.is_verified = is_verified;
        self.records
            .lock()
            .unwrap()
            .insert(phone_number.to_string(), record);
        self
    }

    /// Make an operation fail until [`MockAuthBackend::recover`] is called
    pub fn failing(self, op: AuthOp) -> Self {
        self.fail(op);
        self
    }

    pub fn fail(&self, op: AuthOp) {
        self.failures.lock().unwrap().insert(op);
    }

    pub fn recover(&self, op: AuthOp) {
        self.failures.lock().unwrap().remove(&op);
    }

    /// Insert a session directly and return its credential
    pub fn insert_session(&self, phone_number: Option<&PhoneNumber>) -> String {
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4(),
            token: Uuid::new_v4().to_string(),
            phone_number: phone_number.cloned(),
            issued_at: now,
            expires_at: now + Duration::hours(24),
        };
        let token = session.token.clone();
        self.sessions.lock().unwrap().insert(token.clone(), session);
        token
    }

    pub fn record(&self, phone_number: &PhoneNumber) -> Option<AdminRecord> {
        self.records
            .lock()
            .unwrap()
            .get(phone_number.as_str())
            .cloned()
    }

    pub fn session(&self, credential: &str) -> Option<Session> {
        self.sessions.lock().unwrap().get(credential).cloned()
    }

    pub fn session_count(&self) -> usize {
        self.sessions.lock().unwrap().len()
    }

    /// Every backend call made so far, in order
    pub fn calls(&self) -> Vec<AuthOp> {
        self.calls.lock().unwrap().clone()
    }

    pub fn updates(&self) -> Vec<(String, AdminRecordUpdate)> {
        self.updates.lock().unwrap().clone()
    }

    fn enter(&self, op: AuthOp) -> Result<()> {
        self.calls.lock().unwrap().push(op);
        if self.failures.lock().unwrap().contains(&op) {
            return Err(anyhow!("mock backend failure: {:?}", op));
        }
        Ok(())
    }
}

impl Default for MockAuthBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseAuthBackend for MockAuthBackend {
    async fn get_session(&self, credential: &str) -> Result<Option<Session>> {
        self.enter(AuthOp::GetSession)?;
        let sessions = self.sessions.lock().unwrap();
        Ok(sessions
            .get(credential)
            .filter(|s| s.expires_at > Utc::now())
            .cloned())
    }

    async fn create_session(&self, assertion: VerifiedOtp) -> Result<Session> {
        self.enter(AuthOp::CreateSession)?;
        let now = Utc::now();
        let session = Session {
            id: Uuid::new_v4(),
            token: Uuid::new_v4().to_string(),
            phone_number: Some(assertion.phone_number().clone()),
            issued_at: now,
            expires_at: now + Duration::hours(24),
        };
        self.sessions
            .lock()
            .unwrap()
            .insert(session.token.clone(), session.clone());
        Ok(session)
    }

    async fn destroy_session(&self, credential: &str) -> Result<()> {
        self.enter(AuthOp::DestroySession)?;
        self.sessions.lock().unwrap().remove(credential);
        Ok(())
    }

    async fn get_record(&self, phone_number: &PhoneNumber) -> Result<Option<AdminRecord>> {
        self.enter(AuthOp::GetRecord)?;
        Ok(self.record(phone_number))
    }

    async fn update_record(
        &self,
        phone_number: &PhoneNumber,
        update: AdminRecordUpdate,
    ) -> Result<()> {
        self.enter(AuthOp::UpdateRecord)?;
        let mut records = self.records.lock().unwrap();
        let record = records
            .get_mut(phone_number.as_str())
            .ok_or_else(|| anyhow!("admin record not found"))?;
        record.apply(&update);
        self.updates
            .lock()
            .unwrap()
            .push((phone_number.to_string(), update));
        Ok(())
    }
}

// =============================================================================
// Mock SMS Verifier
// =============================================================================

/// SMS backend that approves `"123456"` unless told otherwise
pub struct MockSmsVerifier {
    send_responses: Arc<Mutex<VecDeque<Result<(), SmsError>>>>,
    check_responses: Arc<Mutex<VecDeque<Result<OtpCheck, SmsError>>>>,
    sent: Arc<Mutex<Vec<String>>>,
    checked: Arc<Mutex<Vec<(String, String)>>>,
    send_gate: Option<Arc<Notify>>,
}

impl MockSmsVerifier {
    pub fn new() -> Self {
        Self {
            send_responses: Arc::new(Mutex::new(VecDeque::new())),
            check_responses: Arc::new(Mutex::new(VecDeque::new())),
            sent: Arc::new(Mutex::new(Vec::new())),
            checked: Arc::new(Mutex::new(Vec::new())),
            send_gate: None,
        }
    }

    /// Queue the result of the next send
    pub fn with_send_result(self, result: Result<(), SmsError>) -> Self {
        self.send_responses.lock().unwrap().push_back(result);
        self
    }

    /// Queue the result of the next check
    pub fn with_check_result(self, result: Result<OtpCheck, SmsError>) -> Self {
        self.check_responses.lock().unwrap().push_back(result);
        self
    }

    /// Hold every send until the returned handle is notified
    pub fn with_send_gate(mut self) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        self.send_gate = Some(gate.clone());
        (self, gate)
    }

    pub fn push_check_result(&self, result: Result<OtpCheck, SmsError>) {
        self.check_responses.lock().unwrap().push_back(result);
    }

    /// Phone numbers an OTP was sent to
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().unwrap().clone()
    }

    /// (phone, code) pairs that were checked
    pub fn checked(&self) -> Vec<(String, String)> {
        self.checked.lock().unwrap().clone()
    }
}

impl Default for MockSmsVerifier {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseSmsVerifier for MockSmsVerifier {
    async fn send_otp(&self, phone_number: &str) -> Result<(), SmsError> {
        self.sent.lock().unwrap().push(phone_number.to_string());
        if let Some(gate) = &self.send_gate {
            gate.notified().await;
        }
        let queued = self.send_responses.lock().unwrap().pop_front();
        queued.unwrap_or(Ok(()))
    }

    async fn check_otp(&self, phone_number: &str, code: &str) -> Result<OtpCheck, SmsError> {
        self.checked
            .lock()
            .unwrap()
            .push((phone_number.to_string(), code.to_string()));
        let queued = self.check_responses.lock().unwrap().pop_front();
        queued.unwrap_or_else(|| {
            Ok(if code == "123456" {
                OtpCheck::Approved
            } else {
                OtpCheck::Rejected("Invalid verification code".to_string())
            })
        })
    }
}

// =============================================================================
// TestDependencies
// =============================================================================

/// Mock backends plus the ServerDeps wired to them
pub struct TestDependencies {
    pub auth: Arc<MockAuthBackend>,
    pub sms: Arc<MockSmsVerifier>,
    pub policy: AuthPolicy,
}

impl TestDependencies {
    pub fn new(auth: MockAuthBackend, sms: MockSmsVerifier) -> Self {
        Self {
            auth: Arc::new(auth),
            sms: Arc::new(sms),
            policy: AuthPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: AuthPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn server_deps(&self) -> ServerDeps {
        ServerDeps::new(self.auth.clone(), self.sms.clone(), self.policy)
    }
}
