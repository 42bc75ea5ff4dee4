use axum::{extract::Request, middleware::Next, response::Response};
use tracing::debug;

/// Raw session credential presented by the client.
///
/// Only extracted here; whether it grants anything is decided by the
/// session gate against backend state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionCredential(pub String);

impl SessionCredential {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Session credential middleware
///
/// Extracts the token from the Authorization header and adds a
/// [`SessionCredential`] to request extensions. Requests without one continue
/// unauthenticated.
pub async fn session_auth_middleware(mut request: Request, next: Next) -> Response {
    match extract_credential(&request) {
        Some(credential) => {
            request.extensions_mut().insert(credential);
        }
        None => debug!("No session credential"),
    }

    next.run(request).await
}

/// Read the credential, accepting both "Bearer <token>" and a raw token
fn extract_credential(request: &Request) -> Option<SessionCredential> {
    let auth_header = request.headers().get("authorization")?;
    let auth_str = auth_header.to_str().ok()?;

    let token = auth_str.strip_prefix("Bearer ").unwrap_or(auth_str).trim();
    if token.is_empty() {
        return None;
    }

    Some(SessionCredential(token.to_string()))
}
