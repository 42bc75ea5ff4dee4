// Common test utilities (Postgres-backed tests)

pub mod fixtures;
pub mod harness;

pub use fixtures::*;
pub use harness::*;
