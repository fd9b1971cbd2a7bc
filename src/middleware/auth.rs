//! Session authentication for guarded routes.
//!
//! Authentication is one step of the request guard, see
//! [`crate::middleware::guard`]. This module owns:
//! 1. Extracting the session token from the request
//! 2. Resolving it to an identity, bounded by a timeout
//! 3. The `AuthContext` injected into authenticated requests

use std::time::Duration;

use axum::http::HeaderMap;
use tokio::time::timeout;
use uuid::Uuid;

use crate::error::AppError;
use crate::stores::AuthResolver;

use super::cookies::extract_cookie;

/// Cookie carrying the session token for browser clients.
pub const SESSION_COOKIE: &str = "session_token";

/// Upper bound on the session lookup. A hung lookup must not hold the
/// request open indefinitely; past this the request counts as
/// unauthenticated.
const RESOLVE_TIMEOUT: Duration = Duration::from_secs(5);

/// Authentication context attached to authenticated requests.
///
/// This struct is inserted into the request's extension map and can be
/// extracted by route handlers to know who made the request.
#[derive(Debug, Clone)]
pub struct AuthContext {
    /// ID of the authenticated user
    ///
    /// Used to scope database queries (e.g., only show this user's payments)
    pub user_id: Uuid,

    /// Email of the authenticated user
    pub email: String,
}

/// Extract the session token from a request.
///
/// Checks `Authorization: Bearer <token>` first, then falls back to the
/// session cookie, so both API clients and browsers are served.
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = headers
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
    {
        if !token.is_empty() {
            return Some(token.to_string());
        }
    }

    extract_cookie(headers, SESSION_COOKIE)
}

/// Resolve the request's session token to an identity.
///
/// Returns `Ok(None)` when no token is present, the token is unknown or
/// expired, or the lookup timed out. Only a failed lookup becomes an error.
pub async fn resolve_identity(
    resolver: &dyn AuthResolver,
    headers: &HeaderMap,
) -> Result<Option<AuthContext>, AppError> {
    let Some(token) = extract_session_token(headers) else {
        return Ok(None);
    };

    match timeout(RESOLVE_TIMEOUT, resolver.resolve(&token)).await {
        Ok(resolved) => Ok(resolved?),
        Err(_) => {
            // Token values are never logged.
            tracing::warn!("session lookup timed out, treating request as unauthenticated");
            Ok(None)
        }
    }
}
