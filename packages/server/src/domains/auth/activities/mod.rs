//! Auth domain activities - business logic functions
//!
//! Activities are stateless: they take a normalized phone number and the
//! injected backends, perform one operation end to end and return a typed
//! result. The HTTP API calls them directly; `OtpFlow` wraps them with state.

mod send_otp;
mod verify_otp;

pub use send_otp::send_otp;
pub use verify_otp::verify_otp;
