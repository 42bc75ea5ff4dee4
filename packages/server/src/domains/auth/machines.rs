//! OTP login state machine.
//!
//! One `OtpFlow` drives one login attempt from phone entry to a verified
//! session:
//!
//! ```text
//! Idle(phone_input) -> Sending -> AwaitingCode(phone, code) -> Verifying -> Verified
//!        ^                 |             ^                          |
//!        +--- send failed -+             +-- expired / rejected ----+
//! ```
//!
//! Backend calls are never made while the state lock is held. Each in-flight
//! transition remembers the generation it started in; its completion is
//! dropped if the flow has moved on (reset, or a newer transition) meanwhile.

use tokio::sync::Mutex;
use tracing::debug;

use crate::common::{normalize_and_validate, PhoneNumber};
use crate::domains::auth::activities;
use crate::domains::auth::errors::AuthFlowError;
use crate::domains::auth::models::Session;
use crate::domains::auth::types::Notice;
use crate::kernel::ServerDeps;

/// Where a login attempt currently stands
#[derive(Debug, Clone, PartialEq)]
pub enum FlowState {
    Idle { phone_input: String },
    Sending { phone_number: PhoneNumber },
    AwaitingCode { phone_number: PhoneNumber, code: String },
    Verifying { phone_number: PhoneNumber },
    Verified { session: Session },
}

impl FlowState {
    fn idle() -> Self {
        Self::Idle {
            phone_input: String::new(),
        }
    }

    /// A send or verify is outstanding; the matching action must be disabled
    pub fn is_loading(&self) -> bool {
        matches!(self, Self::Sending { .. } | Self::Verifying { .. })
    }

    /// Whether the code entry field is shown
    pub fn shows_code_input(&self) -> bool {
        matches!(self, Self::AwaitingCode { .. } | Self::Verifying { .. })
    }
}

struct FlowInner {
    state: FlowState,
    generation: u64,
    notice: Option<Notice>,
}

impl FlowInner {
    /// Enter a loading state and hand out the generation that owns it
    fn begin(&mut self, state: FlowState) -> u64 {
        self.generation += 1;
        self.state = state;
        self.generation
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }
}

pub struct OtpFlow {
    deps: ServerDeps,
    inner: Mutex<FlowInner>,
}

impl OtpFlow {
    pub fn new(deps: ServerDeps) -> Self {
        Self {
            deps,
            inner: Mutex::new(FlowInner {
                state: FlowState::idle(),
                generation: 0,
                notice: None,
            }),
        }
    }

    pub async fn state(&self) -> FlowState {
        self.inner.lock().await.state.clone()
    }

    /// The most recent user-visible notice
    pub async fn last_notice(&self) -> Option<Notice> {
        self.inner.lock().await.notice.clone()
    }

    /// Keep the raw phone input while the user types
    pub async fn set_phone_input(&self, input: &str) -> Result<(), AuthFlowError> {
        let mut inner = self.inner.lock().await;
        match &mut inner.state {
            FlowState::Idle { phone_input } => {
                *phone_input = input.to_string();
                Ok(())
            }
            _ => Err(AuthFlowError::InvalidState("phone number can no longer be edited")),
        }
    }

    /// Keep the code while the user types it
    pub async fn enter_code(&self, input: &str) -> Result<(), AuthFlowError> {
        let mut inner = self.inner.lock().await;
        match &mut inner.state {
            FlowState::AwaitingCode { code, .. } => {
                *code = input.to_string();
                Ok(())
            }
            _ => Err(AuthFlowError::InvalidState("no verification code was requested")),
        }
    }

    /// Normalize the raw input and send an OTP to it.
    ///
    /// Invalid input is refused locally; the SMS backend is not contacted.
    pub async fn request_code(&self, raw_input: &str) -> Result<PhoneNumber, AuthFlowError> {
        let phone_number = match normalize_and_validate(raw_input) {
            Ok(phone_number) => phone_number,
            Err(e) => {
                let err = AuthFlowError::from(e);
                let mut inner = self.inner.lock().await;
                if let FlowState::Idle { phone_input } = &mut inner.state {
                    *phone_input = raw_input.to_string();
                }
                inner.notice = Some(Notice::error(
                    err.title(),
                    "Please enter a valid 10-digit Indian phone number.",
                ));
                return Err(err);
            }
        };

        self.send_otp(phone_number.clone()).await?;
        Ok(phone_number)
    }

    /// Send an OTP to a normalized phone number.
    ///
    /// The code field is only revealed (`AwaitingCode`) once the SMS backend
    /// acknowledged dispatch. On failure the flow returns to `Idle`.
    pub async fn send_otp(&self, phone_number: PhoneNumber) -> Result<(), AuthFlowError> {
        let generation = {
            let mut inner = self.inner.lock().await;
            match &inner.state {
                FlowState::Idle { .. } | FlowState::AwaitingCode { .. } => {}
                FlowState::Sending { .. } | FlowState::Verifying { .. } => {
                    return Err(AuthFlowError::Busy)
                }
                FlowState::Verified { .. } => {
                    return Err(AuthFlowError::InvalidState("already verified"))
                }
            }
            inner.begin(FlowState::Sending {
                phone_number: phone_number.clone(),
            })
        };

        let result = activities::send_otp(&phone_number, &self.deps).await;

        let mut inner = self.inner.lock().await;
        if !inner.is_current(generation) {
            debug!(generation, "Dropping stale send completion");
            return result.map(|_| ());
        }

        match result {
            Ok(_) => {
                inner.state = FlowState::AwaitingCode {
                    phone_number,
                    code: String::new(),
                };
                inner.notice = Some(Notice::success(
                    "OTP Sent",
                    "Please check your phone for the verification code.",
                ));
                Ok(())
            }
            Err(err) => {
                inner.state = FlowState::Idle {
                    phone_input: phone_number.to_string(),
                };
                inner.notice = Some(Notice::error(err.title(), err.to_string()));
                Err(err)
            }
        }
    }

    /// Verify a code for the phone number the flow is waiting on.
    ///
    /// On an expired code the entered code is cleared; on any other failure
    /// it is kept so the user can correct it. Either way the flow stays in
    /// `AwaitingCode` for the same phone number.
    pub async fn verify_otp(
        &self,
        phone_number: &PhoneNumber,
        code: &str,
    ) -> Result<Session, AuthFlowError> {
        let generation = {
            let mut inner = self.inner.lock().await;
            match &inner.state {
                FlowState::AwaitingCode {
                    phone_number: awaiting,
                    ..
                } if awaiting == phone_number => {}
                FlowState::AwaitingCode { .. } => {
                    return Err(AuthFlowError::InvalidState(
                        "no code was requested for this phone number",
                    ))
                }
                FlowState::Sending { .. } | FlowState::Verifying { .. } => {
                    return Err(AuthFlowError::Busy)
                }
                FlowState::Idle { .. } | FlowState::Verified { .. } => {
                    return Err(AuthFlowError::InvalidState("no verification code was requested"))
                }
            }
            if code.trim().is_empty() {
                let err = AuthFlowError::EmptyCode;
                inner.notice = Some(Notice::error(err.title(), err.to_string()));
                return Err(err);
            }
            inner.begin(FlowState::Verifying {
                phone_number: phone_number.clone(),
            })
        };

        let result = activities::verify_otp(phone_number, code, &self.deps).await;

        let mut inner = self.inner.lock().await;
        if !inner.is_current(generation) {
            debug!(generation, "Dropping stale verify completion");
            return result;
        }

        match result {
            Ok(session) => {
                inner.state = FlowState::Verified {
                    session: session.clone(),
                };
                inner.notice = Some(Notice::success("Success", "Admin verified successfully!"));
                Ok(session)
            }
            Err(err) => {
                let code = match err {
                    AuthFlowError::ExpiredCode => String::new(),
                    _ => code.to_string(),
                };
                inner.state = FlowState::AwaitingCode {
                    phone_number: phone_number.clone(),
                    code,
                };
                let message = match err {
                    AuthFlowError::ExpiredCode => {
                        "The verification code has expired. Request a new one and try again."
                            .to_string()
                    }
                    _ => err.to_string(),
                };
                inner.notice = Some(Notice::error(err.title(), message));
                Err(err)
            }
        }
    }

    /// Verify the code entered via [`OtpFlow::enter_code`]
    pub async fn submit_code(&self) -> Result<Session, AuthFlowError> {
        let (phone_number, code) = match self.state().await {
            FlowState::AwaitingCode { phone_number, code } => (phone_number, code),
            FlowState::Sending { .. } | FlowState::Verifying { .. } => {
                return Err(AuthFlowError::Busy)
            }
            _ => return Err(AuthFlowError::InvalidState("no verification code was requested")),
        };
        self.verify_otp(&phone_number, &code).await
    }

    /// Clear the entered code and send a new OTP to the same number.
    ///
    /// The number was validated when the first code was requested and is
    /// reused as-is.
    pub async fn resend_otp(&self) -> Result<(), AuthFlowError> {
        let phone_number = {
            let mut inner = self.inner.lock().await;
            match &mut inner.state {
                FlowState::AwaitingCode { phone_number, code } => {
                    code.clear();
                    phone_number.clone()
                }
                FlowState::Sending { .. } | FlowState::Verifying { .. } => {
                    return Err(AuthFlowError::Busy)
                }
                _ => return Err(AuthFlowError::InvalidState("no verification code was requested")),
            }
        };
        self.send_otp(phone_number).await
    }

    /// Back to the initial state, e.g. after the session gate denied access.
    /// Completions of requests still in flight are ignored.
    pub async fn reset(&self) {
        let mut inner = self.inner.lock().await;
        inner.begin(FlowState::idle());
        inner.notice = None;
    }
}
