//! Kernel module - server infrastructure and dependencies.

pub mod auth_backend;
pub mod deps;
pub mod otp_proxy;
pub mod test_dependencies;
pub mod traits;

pub use auth_backend::PostgresAuthBackend;
pub use deps::{AuthPolicy, ServerDeps, TwilioAdapter};
pub use otp_proxy::ProxySmsVerifier;
pub use test_dependencies::{AuthOp, MockAuthBackend, MockSmsVerifier, TestDependencies};
pub use traits::*;
