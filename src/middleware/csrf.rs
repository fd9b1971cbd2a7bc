//! Stateless double-submit CSRF protection.
//!
//! The token lives in two places the attacker cannot both control: an
//! `HttpOnly` cookie and a response field the frontend echoes back in the
//! `x-csrf-token` header. Mutating requests pass only when both sides are
//! present and equal, compared in constant time. No server-side token
//! state exists; the cookie is the state.

use axum::http::{HeaderMap, HeaderValue};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use super::cookies::extract_cookie;

/// Cookie carrying the CSRF token.
pub const CSRF_COOKIE: &str = "csrf_token";

/// Header the client mirrors the token into on mutating requests.
pub const CSRF_HEADER: &str = "x-csrf-token";

/// Token entropy in bytes; hex-encoded to twice as many characters.
const TOKEN_BYTES: usize = 16;

/// Cookie lifetime in seconds.
const COOKIE_MAX_AGE_SECS: u32 = 3600;

/// The cookie is scoped to the API, not the whole site.
const COOKIE_PATH: &str = "/api";

/// Issues and verifies CSRF tokens.
pub struct CsrfGuard {
    /// Mark cookies `Secure` (HTTPS only); enabled in production.
    secure_cookies: bool,
}

/// Result of issuing a token.
///
/// `set_cookie` is `None` when a valid cookie already existed and was
/// reused, so refreshing the page does not rotate the token.
pub struct IssuedCsrfToken {
    pub token: String,
    pub set_cookie: Option<HeaderValue>,
}

impl CsrfGuard {
    pub fn new(secure_cookies: bool) -> Self {
        Self { secure_cookies }
    }

    /// Issue a token for this client.
    ///
    /// Reuses the existing cookie token when it is well formed, otherwise
    /// mints 16 random bytes, hex-encoded, and builds the `Set-Cookie`
    /// header for it.
    pub fn issue(&self, headers: &HeaderMap) -> IssuedCsrfToken {
        if let Some(existing) = extract_cookie(headers, CSRF_COOKIE) {
            if is_well_formed(&existing) {
                return IssuedCsrfToken {
                    token: existing,
                    set_cookie: None,
                };
            }
        }

        let token = hex::encode(rand::random::<[u8; TOKEN_BYTES]>());
        let set_cookie = self.build_cookie(&token);
        IssuedCsrfToken {
            token,
            set_cookie: Some(set_cookie),
        }
    }

    /// Check a mutating request's header token against its cookie token.
    ///
    /// Fails when either side is absent or empty. The comparison is
    /// constant time so equality checks leak nothing about the token.
    pub fn verify(header_token: Option<&str>, cookie_token: Option<&str>) -> bool {
        match (header_token, cookie_token) {
            (Some(header), Some(cookie)) if !header.is_empty() && !cookie.is_empty() => {
                constant_time_eq(header.as_bytes(), cookie.as_bytes())
            }
            _ => false,
        }
    }

    fn build_cookie(&self, token: &str) -> HeaderValue {
        let mut cookie = format!(
            "{CSRF_COOKIE}={token}; HttpOnly; SameSite=Strict; Path={COOKIE_PATH}; Max-Age={COOKIE_MAX_AGE_SECS}"
        );
        if self.secure_cookies {
            cookie.push_str("; Secure");
        }
        // Hex token plus fixed ASCII attributes, always a valid value.
        HeaderValue::from_str(&cookie).expect("cookie is valid ASCII")
    }
}

/// A token is a full-length lowercase-or-uppercase hex string.
fn is_well_formed(token: &str) -> bool {
    token.len() == TOKEN_BYTES * 2 && token.chars().all(|c| c.is_ascii_hexdigit())
}

/// Compare two byte strings in constant time.
///
/// Hashing both sides first makes the comparison independent of input
/// length, so mismatched lengths don't short-circuit.
fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    let hash_a = Sha256::digest(a);
    let hash_b = Sha256::digest(b);
    hash_a.ct_eq(&hash_b).into()
}
