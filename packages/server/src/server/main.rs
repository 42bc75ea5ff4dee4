// Main entry point for API server

use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use admin_core::common::normalize_and_validate;
use admin_core::domains::auth::models::{AdminRecord, SessionRecord};
use admin_core::domains::auth::JwtService;
use admin_core::kernel::{
    AuthPolicy, BaseSmsVerifier, PostgresAuthBackend, ProxySmsVerifier, ServerDeps, TwilioAdapter,
};
use admin_core::server::{build_app, AxumAppState};
use admin_core::Config;
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use twilio::TwilioService;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,admin_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting admin console API");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded");

    // Connect to database
    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connected");

    // Run migrations
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Migrations complete");

    provision_admins(&config.admin_identifiers, &pool).await?;
    spawn_session_cleanup(pool.clone());

    // Build dependencies
    let jwt_service = JwtService::new(&config.jwt_secret, config.jwt_issuer.clone())
        .with_ttl(chrono::Duration::hours(config.session_ttl_hours));
    let auth = Arc::new(PostgresAuthBackend::new(pool.clone(), jwt_service));
    let sms = sms_verifier(&config)?;
    let deps = ServerDeps::new(
        auth,
        sms,
        AuthPolicy {
            require_provisioned_admin: config.require_provisioned_admin,
        },
    );

    let app = build_app(AxumAppState::new(deps, Some(pool)), &config.allowed_origins)?;

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<std::net::SocketAddr>(),
    )
    .await
    .context("Server error")?;

    Ok(())
}

/// Twilio Verify when credentials are configured, otherwise the OTP proxy
fn sms_verifier(config: &Config) -> Result<Arc<dyn BaseSmsVerifier>> {
    if let Ok(options) = config.twilio_options() {
        tracing::info!("Using Twilio Verify for OTP delivery");
        return Ok(Arc::new(TwilioAdapter::new(Arc::new(TwilioService::new(
            options,
        )))));
    }
    if let Some(url) = &config.otp_proxy_url {
        tracing::info!(%url, "Using OTP proxy for OTP delivery");
        return Ok(Arc::new(ProxySmsVerifier::new(
            url.clone(),
            config.otp_proxy_key.clone(),
        )));
    }
    bail!("No SMS backend configured: set TWILIO_* credentials or OTP_PROXY_URL")
}

/// Seed the admin allow-list from configuration
async fn provision_admins(identifiers: &[String], pool: &PgPool) -> Result<()> {
    for identifier in identifiers {
        let Ok(phone_number) = normalize_and_validate(identifier) else {
            tracing::warn!(%identifier, "Skipping invalid admin identifier");
            continue;
        };
        AdminRecord::provision(&phone_number, pool)
            .await
            .with_context(|| format!("Failed to provision admin {}", phone_number.masked()))?;
        tracing::info!(phone = %phone_number.masked(), "Admin provisioned");
    }
    Ok(())
}

/// Hourly purge of expired and revoked sessions
fn spawn_session_cleanup(pool: PgPool) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60 * 60));
        loop {
            interval.tick().await;
            match SessionRecord::delete_expired(&pool).await {
                Ok(0) => {}
                Ok(deleted) => tracing::info!(deleted, "Purged stale admin sessions"),
                Err(e) => tracing::error!(error = %e, "Session cleanup failed"),
            }
        }
    });
}
