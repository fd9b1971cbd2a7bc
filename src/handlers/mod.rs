//! HTTP request handlers (route handlers).
//!
//! Each handler is an async function that:
//! 1. Receives HTTP request data (JSON body, URL params, etc.)
//! 2. Calls the relevant service or store
//! 3. Returns an HTTP response wrapped in the response envelope

/// CSRF token endpoint
pub mod auth;
/// Document numbering and email endpoints
pub mod documents;
/// Health check endpoint
pub mod health;
/// Payment lifecycle endpoints
pub mod payments;
