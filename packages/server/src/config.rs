use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use twilio::TwilioOptions;

/// Application configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub port: u16,
    pub twilio_account_sid: Option<String>,
    pub twilio_auth_token: Option<String>,
    pub twilio_verify_service_sid: Option<String>,
    pub jwt_secret: String,
    pub jwt_issuer: String,
    pub session_ttl_hours: i64,
    /// Empty means any origin
    pub allowed_origins: Vec<String>,
    /// Phone numbers provisioned as admins at startup
    pub admin_identifiers: Vec<String>,
    /// Check the admin allow-list before spending an OTP
    pub require_provisioned_admin: bool,
    /// When set, OTPs go through the proxy endpoints instead of Twilio directly
    pub otp_proxy_url: Option<String>,
    pub otp_proxy_key: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            database_url: env::var("DATABASE_URL").context("DATABASE_URL must be set")?,
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("PORT must be a valid number")?,
            twilio_account_sid: non_empty_var("TWILIO_ACCOUNT_SID"),
            twilio_auth_token: non_empty_var("TWILIO_AUTH_TOKEN"),
            twilio_verify_service_sid: non_empty_var("TWILIO_VERIFY_SERVICE_SID")
                .or_else(|| non_empty_var("TWILIO_SERVICE_SID")),
            jwt_secret: env::var("JWT_SECRET").context("JWT_SECRET must be set")?,
            jwt_issuer: env::var("JWT_ISSUER").unwrap_or_else(|_| "admin-console".to_string()),
            session_ttl_hours: env::var("SESSION_TTL_HOURS")
                .unwrap_or_else(|_| "24".to_string())
                .parse()
                .context("SESSION_TTL_HOURS must be a valid number")?,
            allowed_origins: parse_list(&env::var("ALLOWED_ORIGINS").unwrap_or_default()),
            admin_identifiers: parse_list(&env::var("ADMIN_IDENTIFIERS").unwrap_or_default()),
            require_provisioned_admin: parse_bool(
                &env::var("REQUIRE_PROVISIONED_ADMIN").unwrap_or_else(|_| "true".to_string()),
            )
            .context("REQUIRE_PROVISIONED_ADMIN must be true or false")?,
            otp_proxy_url: non_empty_var("OTP_PROXY_URL"),
            otp_proxy_key: non_empty_var("OTP_PROXY_KEY"),
        })
    }

    /// Twilio Verify credentials; required wherever OTPs are sent directly.
    pub fn twilio_options(&self) -> Result<TwilioOptions> {
        Ok(TwilioOptions {
            account_sid: self
                .twilio_account_sid
                .clone()
                .context("TWILIO_ACCOUNT_SID must be set")?,
            auth_token: self
                .twilio_auth_token
                .clone()
                .context("TWILIO_AUTH_TOKEN must be set")?,
            service_id: self
                .twilio_verify_service_sid
                .clone()
                .context("TWILIO_VERIFY_SERVICE_SID must be set")?,
        })
    }
}

fn non_empty_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

fn parse_bool(value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" => Ok(true),
        "0" | "false" | "no" => Ok(false),
        other => anyhow::bail!("unrecognized boolean: {}", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_list_trims_and_skips_empty() {
        assert_eq!(
            parse_list(" +919999999999, ,+918888888888,"),
            vec!["+919999999999".to_string(), "+918888888888".to_string()]
        );
        assert!(parse_list("").is_empty());
    }

    #[test]
    fn test_parse_bool() {
        assert!(parse_bool("TRUE").unwrap());
        assert!(parse_bool("1").unwrap());
        assert!(!parse_bool("no").unwrap());
        assert!(parse_bool("maybe").is_err());
    }

    #[test]
    fn test_twilio_options_requires_all_credentials() {
        let config = Config {
            database_url: "postgres://localhost/admin".to_string(),
            port: 8080,
            twilio_account_sid: Some("AC123".to_string()),
            twilio_auth_token: None,
            twilio_verify_service_sid: Some("VA123".to_string()),
            jwt_secret: "secret".to_string(),
            jwt_issuer: "admin-console".to_string(),
            session_ttl_hours: 24,
            allowed_origins: vec![],
            admin_identifiers: vec![],
            require_provisioned_admin: true,
            otp_proxy_url: None,
            otp_proxy_key: None,
        };
        let err = config.twilio_options().unwrap_err();
        assert!(err.to_string().contains("TWILIO_AUTH_TOKEN"));
    }
}
