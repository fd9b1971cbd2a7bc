//! Error types and HTTP error response handling.
//!
//! This module defines all application errors and how they are converted
//! into HTTP responses with stable machine-readable codes and JSON bodies.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;

use crate::stores::StoreError;

/// Application-wide error type.
///
/// This enum represents all possible errors that can occur in the application.
/// Each variant maps to a stable error code and a specific HTTP status, so
/// API clients can branch on `error.code` without parsing messages.
///
/// # Error Categories
///
/// - **Guard Errors**: Rejections from the request guard (401 / 403 / 429)
/// - **Validation Errors**: Invalid request data (400)
/// - **Resource Errors**: Payments or documents that do not exist (404)
/// - **State Errors**: Operations that conflict with the payment state (409)
/// - **Pipeline Errors**: Failed steps of document finalization (500)
/// - **Upstream Errors**: Payment gateway or email provider failures (502)
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    /// A store operation failed (e.g., connection error, query error).
    ///
    /// This wraps any [`StoreError`] using the `#[from]` attribute, which
    /// automatically implements `From<StoreError> for AppError`.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// No authenticated identity could be established for the request.
    ///
    /// Returns HTTP 401 Unauthorized.
    #[error("Authentication required")]
    Unauthorized,

    /// The CSRF header token and cookie token were absent or did not match.
    ///
    /// Returns HTTP 403 Forbidden.
    #[error("CSRF token validation failed")]
    CsrfFailed,

    /// The client exceeded the rate limit configured for this endpoint.
    ///
    /// Returns HTTP 429 Too Many Requests.
    #[error("Too many requests, try again later")]
    RateLimited,

    /// Request body or parameters are invalid.
    ///
    /// Returns HTTP 400 Bad Request.
    /// The String contains details about what was invalid.
    #[error("{0}")]
    Validation(String),

    /// The document payload is missing fields every document kind requires.
    ///
    /// Returns HTTP 400 Bad Request with the missing field names in
    /// `error.details.missing`.
    #[error("Document payload is missing required fields")]
    DocumentFieldsMissing(Vec<&'static str>),

    /// Requested payment does not exist or doesn't belong to the
    /// authenticated user.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("Payment not found")]
    PaymentNotFound,

    /// Requested document does not exist or doesn't belong to the
    /// authenticated user.
    ///
    /// Returns HTTP 404 Not Found.
    #[error("Document not found")]
    DocumentNotFound,

    /// The payment is not in a state that allows the requested transition.
    ///
    /// Returns HTTP 409 Conflict. The String carries the current status.
    #[error("Payment status '{0}' does not allow this operation")]
    InvalidStatus(String),

    /// Inserting the base document row failed.
    ///
    /// Returns HTTP 500 Internal Server Error.
    #[error("Document could not be created")]
    DocumentCreateFailed,

    /// Inserting the kind-specific document row failed. The base row has
    /// been removed again, so no half-created document remains.
    ///
    /// Returns HTTP 500 Internal Server Error.
    #[error("Document could not be specialized")]
    DocumentSpecializedFailed,

    /// The document exists but the payment row could not be updated to
    /// point at it.
    ///
    /// Returns HTTP 500 Internal Server Error.
    #[error("Payment could not be updated")]
    PaymentUpdateFailed,

    /// The payment gateway rejected the request or was unreachable.
    ///
    /// Returns HTTP 502 Bad Gateway with a generic message; the gateway's
    /// actual response is only logged server-side.
    #[error("Payment gateway request failed: {0}")]
    Gateway(String),

    /// The email provider rejected the request or was unreachable.
    ///
    /// Returns HTTP 502 Bad Gateway.
    #[error("Email delivery failed: {0}")]
    EmailDelivery(String),

    /// Catch-all for unexpected internal failures.
    ///
    /// Returns HTTP 500 Internal Server Error with a generic message.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convert AppError into an HTTP response.
///
/// This implementation allows Axum handlers to return `Result<T, AppError>`
/// and have errors automatically converted to proper HTTP responses.
///
/// # Response Format
///
/// All errors return JSON in this format:
/// ```json
/// {
///   "success": false,
///   "error": {
///     "code": "ERROR_CODE",
///     "message": "Human-readable error message"
///   }
/// }
/// ```
///
/// An optional `error.details` object carries structured context, currently
/// only the missing field names for `DOCUMENT_FIELDS_MISSING`.
///
/// # Status Code Mapping
///
/// - `Unauthorized` → 401 Unauthorized
/// - `CsrfFailed` → 403 Forbidden
/// - `RateLimited` → 429 Too Many Requests
/// - `Validation` / `DocumentFieldsMissing` → 400 Bad Request
/// - `PaymentNotFound` / `DocumentNotFound` → 404 Not Found
/// - `InvalidStatus` → 409 Conflict
/// - `Gateway` / `EmailDelivery` → 502 Bad Gateway (hides upstream details)
/// - everything else → 500 Internal Server Error (hides details from client)
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        // Map each error variant to (HTTP status, error code, message)
        let (status, code, message) = match self {
            AppError::Unauthorized => {
                (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", self.to_string())
            }
            AppError::CsrfFailed => (StatusCode::FORBIDDEN, "CSRF_FAILED", self.to_string()),
            AppError::RateLimited => {
                (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED", self.to_string())
            }
            AppError::Validation(ref msg) => {
                (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg.clone())
            }
            AppError::DocumentFieldsMissing(ref missing) => {
                let body = Json(json!({
                    "success": false,
                    "error": {
                        "code": "DOCUMENT_FIELDS_MISSING",
                        "message": self.to_string(),
                        "details": { "missing": missing }
                    }
                }));
                return (StatusCode::BAD_REQUEST, body).into_response();
            }
            AppError::PaymentNotFound => {
                (StatusCode::NOT_FOUND, "PAYMENT_NOT_FOUND", self.to_string())
            }
            AppError::DocumentNotFound => {
                (StatusCode::NOT_FOUND, "DOCUMENT_NOT_FOUND", self.to_string())
            }
            AppError::InvalidStatus(_) => (StatusCode::CONFLICT, "INVALID_STATUS", self.to_string()),
            AppError::DocumentCreateFailed => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DOCUMENT_CREATE_FAILED",
                self.to_string(),
            ),
            AppError::DocumentSpecializedFailed => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "DOCUMENT_SPECIALIZED_FAILED",
                self.to_string(),
            ),
            AppError::PaymentUpdateFailed => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "PAYMENT_UPDATE_FAILED",
                self.to_string(),
            ),
            AppError::Gateway(ref detail) => {
                // Upstream detail stays in the logs, not in the response.
                tracing::error!(detail = %detail, "payment gateway request failed");
                (
                    StatusCode::BAD_GATEWAY,
                    "GATEWAY_ERROR",
                    "Payment gateway request failed".to_string(),
                )
            }
            AppError::EmailDelivery(ref detail) => {
                tracing::error!(detail = %detail, "email delivery failed");
                (
                    StatusCode::BAD_GATEWAY,
                    "EMAIL_DELIVERY_FAILED",
                    "Email delivery failed".to_string(),
                )
            }
            AppError::Store(ref err) => {
                tracing::error!(error = %err, "store operation failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
            AppError::Internal(ref detail) => {
                tracing::error!(detail = %detail, "unexpected internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "An internal error occurred".to_string(),
                )
            }
        };

        // Build JSON response body
        let body = Json(json!({
            "success": false,
            "error": {
                "code": code,
                "message": message
            }
        }));

        // Return the response with status code and JSON body
        (status, body).into_response()
    }
}
