//! Session model for authentication.
//!
//! Sessions authenticate browser and API requests. Only the SHA-256 hash of
//! the session token is stored, so a leaked table cannot be replayed.

use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

/// Represents a session record from the database.
///
/// # Database Table
///
/// Maps to the `sessoes` table with columns:
/// - `token_hash`: SHA-256 hash of the session token
/// - `user_id`: User this session belongs to
/// - `email`: User email captured at login
/// - `expires_at`: When the session stops being accepted
/// - `created_at`: When the session was created
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Session {
    /// SHA-256 hash of the session token (64 hex characters)
    ///
    /// When a request carries a token, we:
    /// 1. Hash it with SHA-256
    /// 2. Look up this hash in the database
    /// 3. If found and not expired, authenticate the request
    pub token_hash: String,

    /// User this session authenticates
    pub user_id: Uuid,

    /// User email captured at login
    pub email: String,

    /// Expiry timestamp; expired sessions are rejected during lookup
    pub expires_at: DateTime<Utc>,

    /// Timestamp when this session was created
    pub created_at: DateTime<Utc>,
}

/// Response carrying a CSRF token for the frontend to mirror back.
///
/// The field is camelCase because the frontend consumes it directly.
#[derive(Debug, Serialize)]
pub struct CsrfTokenResponse {
    #[serde(rename = "csrfToken")]
    pub csrf_token: String,
}
