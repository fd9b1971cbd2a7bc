//! Payment HTTP handlers.
//!
//! This module implements payment-related API endpoints:
//! - POST /api/payments - Initiate a mobile-money charge
//! - POST /api/payments/callback - Gateway callback (HMAC verified)
//! - POST /api/payments/finalize - Turn a paid payment into a document
//! - POST /api/payments/retry - Retry stuck payments
//! - GET /api/payments/{id} - Get payment details

use axum::{
    Extension, Json,
    body::Bytes,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    AppState,
    error::AppError,
    middleware::auth::AuthContext,
    models::payment::{
        CallbackAck, CallbackRequest, CallbackResult, DEFAULT_CURRENCY, FinalizeRequest,
        FinalizeResponse, InitiatePaymentRequest, InitiatePaymentResponse, NewPayment,
        PaymentResponse, PaymentStatus, RetryReport,
    },
    response::ApiResponse,
    services::{finalize_service, gateway_service, retry_service},
};

/// Initiate a mobile-money charge.
///
/// # Process
///
/// 1. Validate amount and subscriber number
/// 2. Ask the gateway to charge the subscriber
/// 3. Only then persist the payment as `pendente`, capturing the document
///    payload in metadata for later finalization and retries
///
/// A gateway refusal leaves nothing behind; the client simply tries again.
///
/// # Response (201)
///
/// ```json
/// {
///   "success": true,
///   "data": {
///     "payment_id": "770e8400-...",
///     "gateway_ref": "MPESA-REF-123",
///     "status": "pendente"
///   }
/// }
/// ```
pub async fn initiate_payment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<InitiatePaymentRequest>,
) -> Result<(StatusCode, Json<ApiResponse<InitiatePaymentResponse>>), AppError> {
    if request.valor_centavos <= 0 {
        return Err(AppError::Validation(
            "valor_centavos must be positive".to_string(),
        ));
    }

    let msisdn = request.msisdn.trim();
    if msisdn.is_empty() || !msisdn.chars().all(|c| c.is_ascii_digit()) {
        return Err(AppError::Validation(
            "msisdn must contain digits only".to_string(),
        ));
    }

    let moeda = request
        .moeda
        .clone()
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());

    // Charge first; the payment is only recorded once the gateway accepts.
    let charge = state
        .gateway
        .initiate_c2b(msisdn, request.valor_centavos, &moeda)
        .await?;

    let payment = state
        .payments
        .insert_pending(&NewPayment {
            user_id: auth.user_id,
            tipo_documento: request.documento.kind(),
            moeda,
            valor_centavos: request.valor_centavos,
            gateway_ref: Some(charge.reference.clone()),
            metadata: Some(json!({
                "documento": request.documento,
                "msisdn": msisdn,
            })),
        })
        .await?;

    tracing::info!(
        payment_id = %payment.id,
        gateway_ref = %charge.reference,
        tipo = payment.tipo_documento.as_str(),
        "payment initiated"
    );

    Ok((
        StatusCode::CREATED,
        ApiResponse::ok(InitiatePaymentResponse {
            payment_id: payment.id,
            gateway_ref: charge.reference,
            status: payment.status,
        }),
    ))
}

/// Receive a charge verdict from the payment gateway.
///
/// # Security
///
/// The `x-gateway-signature` header must carry an HMAC-SHA256 of the raw
/// request bytes (`sha256=<hex>`), verified before the body is parsed.
/// An invalid or missing signature is rejected with 401.
///
/// # Idempotency
///
/// Only a `pendente` payment moves; a replayed callback is acknowledged
/// with the payment's current status and changes nothing.
pub async fn gateway_callback(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<ApiResponse<CallbackAck>>, AppError> {
    let signature = headers
        .get("x-gateway-signature")
        .and_then(|h| h.to_str().ok())
        .unwrap_or("");

    if !gateway_service::verify_callback_signature(
        &state.config.gateway_webhook_secret,
        &body,
        signature,
    ) {
        tracing::warn!(
            target: "security",
            signature_present = !signature.is_empty(),
            "gateway callback signature rejected"
        );
        return Err(AppError::Unauthorized);
    }

    let request: CallbackRequest = serde_json::from_slice(&body)
        .map_err(|e| AppError::Validation(format!("unreadable callback body: {e}")))?;

    let payment = state
        .payments
        .find_by_gateway_ref(&request.gateway_ref)
        .await?
        .ok_or(AppError::PaymentNotFound)?;

    let verdict = match request.result {
        CallbackResult::Success => PaymentStatus::AguardandoDocumento,
        CallbackResult::Failed => PaymentStatus::Falhado,
    };

    if payment.status == PaymentStatus::Pendente
        && state
            .payments
            .mark_callback_result(payment.id, verdict)
            .await?
    {
        tracing::info!(
            payment_id = %payment.id,
            status = verdict.as_str(),
            detalhe = ?request.detalhe,
            "gateway callback applied"
        );
        return Ok(ApiResponse::ok(CallbackAck {
            payment_id: payment.id,
            status: verdict,
        }));
    }

    // Replay or race: acknowledge without touching the payment.
    tracing::info!(
        payment_id = %payment.id,
        status = payment.status.as_str(),
        "gateway callback replay acknowledged"
    );
    Ok(ApiResponse::ok(CallbackAck {
        payment_id: payment.id,
        status: payment.status,
    }))
}

/// Finalize a paid payment into its document.
///
/// # Request Body
///
/// ```json
/// {
///   "payment_id": "770e8400-...",
///   "documento": {
///     "tipo_documento": "fatura",
///     "emitente_id": "550e8400-...",
///     "destinatario_id": "660e8400-...",
///     "numero": "FAT-2026-0042"
///   }
/// }
/// ```
///
/// # Response (200)
///
/// ```json
/// {
///   "success": true,
///   "data": {
///     "documento_id": "880e8400-...",
///     "payment_id": "770e8400-...",
///     "status": "associado",
///     "already_associated": false,
///     "message": "document created and associated"
///   }
/// }
/// ```
pub async fn finalize_payment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(request): Json<FinalizeRequest>,
) -> Result<Json<ApiResponse<FinalizeResponse>>, AppError> {
    let outcome = finalize_service::execute_finalization(
        state.payments.as_ref(),
        state.documents.as_ref(),
        auth.user_id,
        &request,
    )
    .await?;

    let message = if outcome.already_associated {
        "payment already had a document associated"
    } else {
        "document created and associated"
    };

    Ok(ApiResponse::ok(FinalizeResponse {
        documento_id: outcome.documento_id,
        payment_id: outcome.payment_id,
        status: "associado".to_string(),
        already_associated: outcome.already_associated,
        message: message.to_string(),
    }))
}

/// Retry document creation for the user's stuck payments.
///
/// Processes a bounded batch, oldest first, and reports an outcome per
/// payment. Safe to call repeatedly.
pub async fn retry_payments(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<ApiResponse<RetryReport>>, AppError> {
    let processed = retry_service::run_retry_scan(
        state.payments.as_ref(),
        state.documents.as_ref(),
        auth.user_id,
    )
    .await?;

    Ok(ApiResponse::ok(RetryReport { processed }))
}

/// Get payment by ID.
///
/// # Security
///
/// Returns 404 if the payment doesn't belong to the authenticated user.
pub async fn get_payment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(payment_id): Path<Uuid>,
) -> Result<Json<ApiResponse<PaymentResponse>>, AppError> {
    let payment = state
        .payments
        .find_for_user(payment_id, auth.user_id)
        .await?
        .ok_or(AppError::PaymentNotFound)?;

    Ok(ApiResponse::ok(payment.into()))
}
