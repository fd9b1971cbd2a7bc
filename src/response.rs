//! Success response envelope.
//!
//! Every successful API response carries the same top-level shape, mirroring
//! the error envelope in [`crate::error`]:
//!
//! ```json
//! { "success": true, "data": { ... } }
//! ```

use axum::Json;
use serde::Serialize;

/// Envelope wrapped around every successful response body.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

impl<T: Serialize> ApiResponse<T> {
    /// Wrap a payload in the success envelope, ready to return from a handler.
    pub fn ok(data: T) -> Json<Self> {
        Json(Self {
            success: true,
            data: Some(data),
        })
    }
}
