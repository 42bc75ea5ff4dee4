use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

use crate::common::PhoneNumber;

/// Proof that the SMS backend approved a code for this phone number.
///
/// Only the OTP activities can mint one, so a session can never be created
/// from a raw code or any other credential.
#[derive(Debug, Clone)]
pub struct VerifiedOtp {
    phone_number: PhoneNumber,
    verified_at: DateTime<Utc>,
}

impl VerifiedOtp {
    pub(crate) fn new(phone_number: PhoneNumber) -> Self {
        Self {
            phone_number,
            verified_at: Utc::now(),
        }
    }

    pub fn phone_number(&self) -> &PhoneNumber {
        &self.phone_number
    }

    pub fn verified_at(&self) -> DateTime<Utc> {
        self.verified_at
    }
}

/// An admin session as seen by the core.
///
/// `token` is the opaque credential handed to the client. `phone_number` is
/// `None` when the backend knows the session but it carries no usable phone
/// identifier.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Session {
    pub id: Uuid,
    #[serde(skip_serializing)]
    pub token: String,
    pub phone_number: Option<PhoneNumber>,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// SessionRecord - server-side bookkeeping for issued session tokens
///
/// The token itself is a signed JWT; this row makes it revocable.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct SessionRecord {
    pub id: Uuid,
    pub phone_number: String,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl SessionRecord {
    /// Record a newly issued session
    pub async fn insert(
        id: Uuid,
        phone_number: &str,
        issued_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
        pool: &PgPool,
    ) -> Result<Self> {
        let record = sqlx::query_as::<_, SessionRecord>(
            r#"
            INSERT INTO admin_sessions (id, phone_number, issued_at, expires_at)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(phone_number)
        .bind(issued_at)
        .bind(expires_at)
        .fetch_one(pool)
        .await?;
        Ok(record)
    }

    /// Find a session that is neither revoked nor expired
    pub async fn find_active(id: Uuid, pool: &PgPool) -> Result<Option<Self>> {
        let record = sqlx::query_as::<_, SessionRecord>(
            r#"
            SELECT * FROM admin_sessions
            WHERE id = $1 AND revoked_at IS NULL AND expires_at > NOW()
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;
        Ok(record)
    }

    /// Revoke a session (logout)
    pub async fn revoke(id: Uuid, pool: &PgPool) -> Result<()> {
        sqlx::query("UPDATE admin_sessions SET revoked_at = NOW() WHERE id = $1 AND revoked_at IS NULL")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    /// Delete expired and revoked sessions (run periodically)
    pub async fn delete_expired(pool: &PgPool) -> Result<u64> {
        let result = sqlx::query(
            "DELETE FROM admin_sessions WHERE expires_at <= NOW() OR revoked_at IS NOT NULL",
        )
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }
}
