//! Application setup and server configuration.

use std::sync::Arc;

use anyhow::{anyhow, Result};
use axum::{
    extract::Extension,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        HeaderName, HeaderValue, Method,
    },
    middleware,
    routing::{get, post},
    Router,
};
use sqlx::PgPool;
use tower_governor::{
    governor::GovernorConfigBuilder, key_extractor::SmartIpKeyExtractor, GovernorLayer,
};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::warn;

use crate::domains::auth::AdminSessionGate;
use crate::kernel::ServerDeps;
use crate::server::middleware::{extract_client_ip, session_auth_middleware};
use crate::server::routes::{
    access_handler, health_handler, logout_handler, request_otp_handler, send_otp_proxy,
    verify_otp_handler, verify_otp_proxy,
};

/// Shared application state
#[derive(Clone)]
pub struct AxumAppState {
    pub deps: ServerDeps,
    pub gate: AdminSessionGate,
    pub db_pool: Option<PgPool>,
}

impl AxumAppState {
    pub fn new(deps: ServerDeps, db_pool: Option<PgPool>) -> Self {
        let gate = AdminSessionGate::new(deps.auth.clone());
        Self {
            deps,
            gate,
            db_pool,
        }
    }
}

/// CORS for browser clients of the OTP routes. An empty list allows any origin.
fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    let allow_origin = if origins.is_empty() {
        AllowOrigin::from(Any)
    } else {
        AllowOrigin::list(origins)
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            AUTHORIZATION,
            CONTENT_TYPE,
            HeaderName::from_static("x-client-info"),
            HeaderName::from_static("apikey"),
        ])
}

fn otp_routes() -> Router {
    Router::new()
        .route("/send-otp", post(send_otp_proxy))
        .route("/verify-otp", post(verify_otp_proxy))
        .route("/api/auth/otp", post(request_otp_handler))
        .route("/api/auth/otp/verify", post(verify_otp_handler))
}

fn session_routes() -> Router {
    Router::new()
        .route("/api/auth/access", get(access_handler))
        .route("/api/auth/logout", post(logout_handler))
}

fn assemble(otp: Router, state: AxumAppState, allowed_origins: &[String]) -> Router {
    otp.merge(session_routes())
        // Health check (no rate limit)
        .route("/health", get(health_handler))
        // Middleware layers (applied in reverse order - last added runs first)
        .layer(middleware::from_fn(session_auth_middleware))
        .layer(middleware::from_fn(extract_client_ip))
        .layer(Extension(state))
        .layer(cors_layer(allowed_origins))
        .layer(TraceLayer::new_for_http())
}

/// Build the router without rate limiting.
///
/// Suitable for in-process use, where requests carry no peer address.
pub fn build_router(state: AxumAppState, allowed_origins: &[String]) -> Router {
    assemble(otp_routes(), state, allowed_origins)
}

/// Build the served application: [`build_router`] plus per-IP rate limiting
/// on the OTP routes. Must be served with connect info.
pub fn build_app(state: AxumAppState, allowed_origins: &[String]) -> Result<Router> {
    // OTP routes: bursts of 5 per client IP, then one request every 30 seconds.
    // Clients are keyed by X-Forwarded-For / X-Real-IP, falling back to the peer.
    let rate_limit_config = Arc::new(
        GovernorConfigBuilder::default()
            .per_second(30)
            .burst_size(5)
            .key_extractor(SmartIpKeyExtractor)
            .use_headers()
            .finish()
            .ok_or_else(|| anyhow!("Invalid rate limiter configuration"))?,
    );

    let otp = otp_routes().layer(GovernorLayer {
        config: rate_limit_config,
    });

    Ok(assemble(otp, state, allowed_origins))
}
