//! Auth domain - OTP-gated admin authentication
//!
//! Layout:
//!   activities  stateless send/verify steps over `ServerDeps`
//!   machines    the per-login `OtpFlow` state machine built on the activities
//!   gate        `AdminSessionGate`, the dashboard-vs-login decision
//!
//! Responsibilities:
//! - Phone-based OTP authentication via Twilio Verify (direct or through the OTP proxy)
//! - Revocable JWT sessions
//! - Admin allow-list bookkeeping (verification, login attempts)

pub mod activities;
pub mod errors;
pub mod gate;
pub mod jwt;
pub mod machines;
pub mod models;
pub mod types;

pub use errors::AuthFlowError;
pub use gate::{AccessDecision, AccessResponse, AdminSessionGate, DenialReason};
pub use jwt::{Claims, JwtService};
pub use machines::{FlowState, OtpFlow};
pub use types::{Notice, NoticeKind, OtpSent, OtpVerified};
