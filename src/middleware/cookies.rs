//! Cookie header parsing.

use axum::http::{HeaderMap, header};

/// Extract a cookie value by name from the `Cookie` request header.
///
/// Handles multiple cookies separated by `;` and ignores surrounding
/// whitespace. Returns `None` when the header or the cookie is absent.
pub fn extract_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let cookie_header = headers.get(header::COOKIE)?.to_str().ok()?;

    cookie_header.split(';').find_map(|pair| {
        let pair = pair.trim();
        pair.strip_prefix(name)
            .and_then(|rest| rest.strip_prefix('='))
            .map(|value| value.to_string())
    })
}
