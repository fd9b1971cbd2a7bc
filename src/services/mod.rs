//! Business logic services.
//!
//! Services contain core business logic separated from HTTP handlers.
//! They handle the finalization pipeline, retries, and upstream providers.

/// Transactional email delivery
pub mod email_service;
/// Document finalization pipeline
pub mod finalize_service;
/// Payment gateway client and callback verification
pub mod gateway_service;
/// Retry scan for stuck payments
pub mod retry_service;
