// Postgres-backed auth/data backend
//
// Sessions are signed JWTs whose `jti` is recorded in `admin_sessions`, so a
// token is only honoured while its row is present, unexpired and unrevoked.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{debug, info};

use crate::common::PhoneNumber;
use crate::domains::auth::models::{
    AdminRecord, AdminRecordUpdate, Session, SessionRecord, VerifiedOtp,
};
use crate::domains::auth::JwtService;
use crate::kernel::BaseAuthBackend;

pub struct PostgresAuthBackend {
    pool: PgPool,
    jwt_service: JwtService,
}

impl PostgresAuthBackend {
    pub fn new(pool: PgPool, jwt_service: JwtService) -> Self {
        Self { pool, jwt_service }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl BaseAuthBackend for PostgresAuthBackend {
    async fn get_session(&self, credential: &str) -> Result<Option<Session>> {
        let claims = match self.jwt_service.verify_token(credential) {
            Ok(claims) => claims,
            Err(e) => {
                debug!(error = %e, "Rejected session token");
                return Ok(None);
            }
        };

        let Some(record) = SessionRecord::find_active(claims.jti, &self.pool).await? else {
            debug!(session_id = %claims.jti, "Session revoked or expired");
            return Ok(None);
        };

        Ok(Some(Session {
            id: record.id,
            token: credential.to_string(),
            phone_number: PhoneNumber::parse_e164(&claims.phone_number).ok(),
            issued_at: record.issued_at,
            expires_at: record.expires_at,
        }))
    }

    async fn create_session(&self, assertion: VerifiedOtp) -> Result<Session> {
        let phone_number = assertion.phone_number();
        let (token, claims) = self
            .jwt_service
            .create_token(phone_number)
            .context("Failed to sign session token")?;

        let record = SessionRecord::insert(
            claims.jti,
            phone_number.as_str(),
            claims.issued_at(),
            claims.expires_at(),
            &self.pool,
        )
        .await
        .context("Failed to record session")?;

        info!(
            session_id = %record.id,
            phone = %phone_number.masked(),
            "Admin session created"
        );

        Ok(Session {
            id: record.id,
            token,
            phone_number: Some(phone_number.clone()),
            issued_at: record.issued_at,
            expires_at: record.expires_at,
        })
    }

    async fn destroy_session(&self, credential: &str) -> Result<()> {
        let Ok(claims) = self.jwt_service.verify_token(credential) else {
            return Ok(());
        };
        SessionRecord::revoke(claims.jti, &self.pool).await?;
        info!(session_id = %claims.jti, "Admin session revoked");
        Ok(())
    }

    async fn get_record(&self, phone_number: &PhoneNumber) -> Result<Option<AdminRecord>> {
        AdminRecord::find_by_phone(phone_number.as_str(), &self.pool).await
    }

    async fn update_record(
        &self,
        phone_number: &PhoneNumber,
        update: AdminRecordUpdate,
    ) -> Result<()> {
        let rows = AdminRecord::apply_update(phone_number.as_str(), &update, &self.pool).await?;
        if rows == 0 {
            return Err(anyhow!("admin record not found"));
        }
        Ok(())
    }
}
