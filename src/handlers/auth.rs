//! Auth HTTP handlers.
//!
//! This module implements:
//! - GET /api/auth/csrf - Issue a CSRF token

use axum::{
    extract::State,
    http::{HeaderMap, HeaderValue, header},
    response::{IntoResponse, Response},
};

use crate::{
    AppState, middleware::csrf::CSRF_HEADER, models::session::CsrfTokenResponse,
    response::ApiResponse,
};

/// Issue a CSRF token for the calling client.
///
/// The token is returned three ways so every client style is served:
/// in the JSON body (`csrfToken`), in the `x-csrf-token` response header,
/// and as an `HttpOnly` cookie. A client that already holds a valid cookie
/// gets the same token back without a new `Set-Cookie`.
///
/// # Response (200)
///
/// ```json
/// { "success": true, "data": { "csrfToken": "9f86d081884c7d65..." } }
/// ```
pub async fn csrf_token(State(state): State<AppState>, headers: HeaderMap) -> Response {
    let issued = state.csrf.issue(&headers);

    let mut response = ApiResponse::ok(CsrfTokenResponse {
        csrf_token: issued.token.clone(),
    })
    .into_response();

    // Tokens are hex, always a valid header value.
    let header_value =
        HeaderValue::from_str(&issued.token).expect("csrf token is valid ASCII");
    response.headers_mut().insert(CSRF_HEADER, header_value);

    if let Some(cookie) = issued.set_cookie {
        response.headers_mut().insert(header::SET_COOKIE, cookie);
    }

    response
}
