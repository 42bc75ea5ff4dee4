use anyhow::Result;
use chrono::{DateTime, Duration, TimeZone, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::PhoneNumber;

/// JWT Claims - data stored in the session token
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: String,          // Subject (admin phone number)
    pub phone_number: String, // Phone number the OTP was verified for
    pub exp: i64,             // Expiration timestamp
    pub iat: i64,             // Issued at timestamp
    pub iss: String,          // Issuer
    pub jti: Uuid,            // Session id (revocation key)
}

impl Claims {
    pub fn issued_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.iat, 0).single().unwrap_or_else(Utc::now)
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        Utc.timestamp_opt(self.exp, 0).single().unwrap_or_else(Utc::now)
    }
}

/// JWT Service - creates and verifies session tokens
#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    issuer: String,
    ttl: Duration,
}

impl JwtService {
    /// Create new JWT service with secret and issuer (tokens live 24 hours)
    pub fn new(secret: &str, issuer: String) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            issuer,
            ttl: Duration::hours(24),
        }
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.ttl = ttl;
        self
    }

    /// Create a new session token for an admin phone number
    pub fn create_token(&self, phone_number: &PhoneNumber) -> Result<(String, Claims)> {
        let now = Utc::now();
        let exp = now + self.ttl;

        let claims = Claims {
            sub: phone_number.to_string(),
            phone_number: phone_number.to_string(),
            exp: exp.timestamp(),
            iat: now.timestamp(),
            iss: self.issuer.clone(),
            jti: Uuid::new_v4(),
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)?;
        Ok((token, claims))
    }

    /// Verify and decode a session token
    ///
    /// Returns claims if token is valid and not expired
    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let mut validation = Validation::default();
        validation.set_issuer(&[&self.issuer]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::normalize_and_validate;

    fn phone() -> PhoneNumber {
        normalize_and_validate("9999999999").unwrap()
    }

    #[test]
    fn test_create_and_verify_token() {
        let service = JwtService::new("test_secret_key", "test_issuer".to_string());

        let (token, issued) = service.create_token(&phone()).unwrap();

        let claims = service.verify_token(&token).unwrap();
        assert_eq!(claims.phone_number, "+919999999999");
        assert_eq!(claims.sub, "+919999999999");
        assert_eq!(claims.jti, issued.jti);
        assert_eq!(claims.iss, "test_issuer");
    }

    #[test]
    fn test_invalid_token() {
        let service = JwtService::new("test_secret_key", "test_issuer".to_string());
        let result = service.verify_token("invalid_token");
        assert!(result.is_err());
    }

    #[test]
    fn test_wrong_secret() {
        let service1 = JwtService::new("secret1", "test_issuer".to_string());
        let service2 = JwtService::new("secret2", "test_issuer".to_string());

        let (token, _) = service1.create_token(&phone()).unwrap();

        // Token created with secret1 should not verify with secret2
        let result = service2.verify_token(&token);
        assert!(result.is_err());
    }

    #[test]
    fn test_wrong_issuer() {
        let service1 = JwtService::new("secret", "issuer_a".to_string());
        let service2 = JwtService::new("secret", "issuer_b".to_string());

        let (token, _) = service1.create_token(&phone()).unwrap();
        assert!(service2.verify_token(&token).is_err());
    }

    #[test]
    fn test_ttl_is_applied() {
        let service = JwtService::new("test_secret_key", "test_issuer".to_string())
            .with_ttl(Duration::hours(2));

        let (_, claims) = service.create_token(&phone()).unwrap();

        let expires_in = claims.exp - claims.iat;
        assert_eq!(expires_in, 2 * 3600);
        assert!(claims.expires_at() > claims.issued_at());
    }

    #[test]
    fn test_expired_token_is_rejected() {
        // Past the default 60s leeway
        let service = JwtService::new("test_secret_key", "test_issuer".to_string())
            .with_ttl(Duration::minutes(-5));

        let (token, _) = service.create_token(&phone()).unwrap();
        assert!(service.verify_token(&token).is_err());
    }

    #[test]
    fn test_each_token_gets_its_own_session_id() {
        let service = JwtService::new("test_secret_key", "test_issuer".to_string());
        let (_, a) = service.create_token(&phone()).unwrap();
        let (_, b) = service.create_token(&phone()).unwrap();
        assert_ne!(a.jti, b.jti);
    }
}
