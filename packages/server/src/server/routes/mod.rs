// HTTP routes
pub mod auth;
pub mod health;
pub mod otp_proxy;

pub use auth::*;
pub use health::*;
pub use otp_proxy::*;
