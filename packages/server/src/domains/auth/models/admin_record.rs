use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::common::PhoneNumber;

/// AdminRecord - the allow-list entry that gates dashboard access
///
/// One row per admin phone number (E.164). Rows are provisioned out-of-band
/// (CLI or `ADMIN_IDENTIFIERS`); the OTP flow only ever updates them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AdminRecord {
    pub phone_number: String,
    pub is_verified: bool,
    pub login_attempts: i32,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial update of an [`AdminRecord`]; `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdminRecordUpdate {
    pub is_verified: Option<bool>,
    pub login_attempts: Option<i32>,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl AdminRecordUpdate {
    /// Bump the attempt counter from the last value we read.
    pub fn login_attempt(record: &AdminRecord) -> Self {
        Self {
            login_attempts: Some(record.login_attempts.saturating_add(1)),
            ..Default::default()
        }
    }

    /// Mark the admin verified after a successful OTP check.
    pub fn verified_at(now: DateTime<Utc>) -> Self {
        Self {
            is_verified: Some(true),
            last_login_at: Some(now),
            ..Default::default()
        }
    }

    /// Record a granted dashboard load.
    pub fn dashboard_login(record: &AdminRecord, now: DateTime<Utc>) -> Self {
        Self {
            login_attempts: Some(record.login_attempts.saturating_add(1)),
            last_login_at: Some(now),
            ..Default::default()
        }
    }
}

impl AdminRecord {
    /// A freshly provisioned, not yet verified record
    pub fn new(phone_number: &PhoneNumber) -> Self {
        let now = Utc::now();
        Self {
            phone_number: phone_number.to_string(),
            is_verified: false,
            login_attempts: 0,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply a partial update in memory (mirrors the SQL `COALESCE` update)
    pub fn apply(&mut self, update: &AdminRecordUpdate) {
        if let Some(is_verified) = update.is_verified {
            self.is_verified = is_verified;
        }
        if let Some(login_attempts) = update.login_attempts {
            self.login_attempts = login_attempts.max(0);
        }
        if let Some(last_login_at) = update.last_login_at {
            self.last_login_at = Some(last_login_at);
        }
        self.updated_at = Utc::now();
    }
}

// =============================================================================
// SQL Queries - ALL queries must be in models/
// =============================================================================

impl AdminRecord {
    /// Find record by normalized phone number
    pub async fn find_by_phone(phone_number: &str, pool: &PgPool) -> Result<Option<Self>> {
        let record =
            sqlx::query_as::<_, AdminRecord>("SELECT * FROM admin_records WHERE phone_number = $1")
                .bind(phone_number)
                .fetch_optional(pool)
                .await?;
        Ok(record)
    }

    /// Add a phone number to the allow-list. Existing rows are left as they are.
    pub async fn provision(phone_number: &PhoneNumber, pool: &PgPool) -> Result<Self> {
        let record = sqlx::query_as::<_, AdminRecord>(
            r#"
            INSERT INTO admin_records (phone_number)
            VALUES ($1)
            ON CONFLICT (phone_number) DO UPDATE SET phone_number = EXCLUDED.phone_number
            RETURNING *
            "#,
        )
        .bind(phone_number.as_str())
        .fetch_one(pool)
        .await?;
        Ok(record)
    }

    /// Apply a partial update. Returns the number of rows touched (0 or 1).
    pub async fn apply_update(
        phone_number: &str,
        update: &AdminRecordUpdate,
        pool: &PgPool,
    ) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE admin_records
            SET is_verified = COALESCE($2, is_verified),
                login_attempts = GREATEST(COALESCE($3, login_attempts), 0),
                last_login_at = COALESCE($4, last_login_at),
                updated_at = NOW()
            WHERE phone_number = $1
            "#,
        )
        .bind(phone_number)
        .bind(update.is_verified)
        .bind(update.login_attempts)
        .bind(update.last_login_at)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
