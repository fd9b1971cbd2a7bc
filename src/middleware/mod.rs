//! HTTP middleware components.
//!
//! Middleware are functions that run before route handlers.
//! They can:
//! - Authenticate requests
//! - Log requests
//! - Modify request/response
//! - Short-circuit requests (reject unauthorized)
//!
//! The entry point is [`guard::api_guard`], which composes the other
//! modules into one configurable pipeline.

/// Session authentication
pub mod auth;
/// Cookie header parsing
pub mod cookies;
/// CSRF token issuing and verification
pub mod csrf;
/// The composable request guard
pub mod guard;
/// Sliding-window rate limiting
pub mod rate_limit;
