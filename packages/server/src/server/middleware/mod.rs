// HTTP middleware
pub mod ip_extractor;
pub mod session_auth;

pub use ip_extractor::*;
pub use session_auth::*;
