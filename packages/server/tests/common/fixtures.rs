//! Test fixtures for creating test data.

use anyhow::Result;
use sqlx::PgPool;
use uuid::Uuid;

use admin_core::common::{normalize_and_validate, PhoneNumber};
use admin_core::domains::auth::models::AdminRecord;

/// A valid phone number no other test uses
pub fn unique_phone() -> PhoneNumber {
    let suffix = Uuid::new_v4().as_u128() % 1_000_000_000;
    normalize_and_validate(&format!("9{:09}", suffix)).expect("generated phone is valid")
}

/// Provision a fresh admin and return its phone number
pub async fn provision_admin(pool: &PgPool) -> Result<PhoneNumber> {
    let phone_number = unique_phone();
    AdminRecord::provision(&phone_number, pool).await?;
    Ok(phone_number)
}
