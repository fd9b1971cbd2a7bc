//! Document HTTP handlers.
//!
//! This module implements document-related API endpoints:
//! - GET /api/documents/numero - Reserve the next document number
//! - POST /api/documents/email - Email a document link to its recipient

use axum::{
    Extension, Json,
    extract::{Query, State},
};

use crate::{
    AppState,
    error::AppError,
    middleware::auth::AuthContext,
    models::document::{EmailDocumentRequest, EmailDocumentResponse, NumeroQuery, NumeroResponse},
    response::ApiResponse,
};

/// Reserve the next sequential document number.
///
/// # Endpoint
///
/// `GET /api/documents/numero?tipo=fatura`
///
/// # Response (200)
///
/// ```json
/// { "success": true, "data": { "numero": "FAT-2026-0042" } }
/// ```
///
/// Numbers are per user, per kind, per year; each call consumes one.
pub async fn next_numero(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<NumeroQuery>,
) -> Result<Json<ApiResponse<NumeroResponse>>, AppError> {
    let numero = state.documents.next_numero(auth.user_id, query.tipo).await?;

    Ok(ApiResponse::ok(NumeroResponse { numero }))
}

/// Email a document link to a recipient.
///
/// # Security
///
/// Returns 404 if the document doesn't belong to the authenticated user.
///
/// # Errors
///
/// A provider failure surfaces as 502 `EMAIL_DELIVERY_FAILED`; the
/// document itself is untouched either way.
pub async fn email_document(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<EmailDocumentRequest>,
) -> Result<Json<ApiResponse<EmailDocumentResponse>>, AppError> {
    let email = request.destinatario_email.trim();
    if email.is_empty() || !email.contains('@') {
        return Err(AppError::Validation(
            "destinatario_email must be a valid address".to_string(),
        ));
    }

    let document = state
        .documents
        .find_base_for_user(request.documento_id, auth.user_id)
        .await?
        .ok_or(AppError::DocumentNotFound)?;

    state.email.send_document_link(email, &document).await?;

    Ok(ApiResponse::ok(EmailDocumentResponse {
        message: format!("document {} sent to {}", document.numero, email),
    }))
}
