// Admin Console - API Core
//
// Backend for the admin dashboard: OTP-gated admin authentication over
// Twilio Verify, the admin session gate, and the OTP proxy endpoints.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
