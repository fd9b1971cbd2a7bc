//! Payment data models and API request/response types.
//!
//! This module defines:
//! - `Payment`: Database entity representing a mobile-money payment
//! - `PaymentStatus`: the payment lifecycle state machine
//! - Request types for initiation, finalization, and gateway callbacks
//! - Response types returned to clients

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::document::{DocumentKind, DocumentPayload};

/// Currency applied when a request doesn't name one.
pub const DEFAULT_CURRENCY: &str = "MZN";

/// Lifecycle states of a payment.
///
/// Stored as lowercase text in `pagamentos.status`.
///
/// ```text
/// pendente ──callback ok──▶ aguardando_documento ──finalize──▶ pago
///     │
///     └────callback failed──▶ falhado
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum PaymentStatus {
    /// Charge initiated at the gateway, confirmation not yet received
    Pendente,
    /// Money received, document not yet created
    AguardandoDocumento,
    /// Document created and linked
    Pago,
    /// Gateway reported the charge failed
    Falhado,
}

impl PaymentStatus {
    /// Lowercase name as stored in the database.
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pendente => "pendente",
            PaymentStatus::AguardandoDocumento => "aguardando_documento",
            PaymentStatus::Pago => "pago",
            PaymentStatus::Falhado => "falhado",
        }
    }
}

/// Represents a payment record from the database.
///
/// # Database Table
///
/// Maps to the `pagamentos` table. Each payment:
/// - Belongs to one user and one document kind
/// - Stores the amount in cents (never floats!)
/// - Keeps the document payload captured at initiation in `metadata`
/// - Points at the finished document via `documento_id` once finalized
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct Payment {
    /// Unique identifier for this payment
    pub id: Uuid,

    /// Owning user
    pub user_id: Uuid,

    /// Lifecycle state, see [`PaymentStatus`]
    pub status: PaymentStatus,

    /// Kind of document this payment will produce
    pub tipo_documento: DocumentKind,

    /// Currency code
    pub moeda: String,

    /// Amount in cents
    ///
    /// Must be positive (enforced by CHECK constraint)
    pub valor_centavos: i64,

    /// The finished document, NULL until finalization succeeds
    ///
    /// A non-NULL value makes finalization idempotent: repeated requests
    /// return this id without touching the database again.
    pub documento_id: Option<Uuid>,

    /// Failed finalization attempts recorded so far
    pub retry_count: i32,

    /// When the last failed attempt happened
    pub last_retry_at: Option<DateTime<Utc>>,

    /// When the payment was linked to its document
    pub paid_at: Option<DateTime<Utc>>,

    /// Gateway-issued charge reference, used to match callbacks
    pub gateway_ref: Option<String>,

    /// Additional metadata (JSON)
    ///
    /// `metadata.documento` holds the document payload captured at
    /// initiation, so the retry scan can rebuild the document without the
    /// client resending it.
    pub metadata: Option<serde_json::Value>,

    /// When the payment was created
    pub created_at: DateTime<Utc>,
}

impl Payment {
    /// Parse the document payload captured in `metadata.documento`.
    ///
    /// Returns `None` when the metadata is absent or doesn't parse as a
    /// tagged document payload; callers treat that as a skippable payment.
    pub fn document_payload(&self) -> Option<DocumentPayload> {
        let value = self.metadata.as_ref()?.get("documento")?;
        serde_json::from_value(value.clone()).ok()
    }
}

/// Insert model for a freshly initiated payment.
#[derive(Debug, Clone)]
pub struct NewPayment {
    pub user_id: Uuid,
    pub tipo_documento: DocumentKind,
    pub moeda: String,
    pub valor_centavos: i64,
    pub gateway_ref: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

/// Request to initiate a mobile-money charge.
///
/// # JSON Example
///
/// ```json
/// {
///   "msisdn": "258841234567",
///   "valor_centavos": 150000,
///   "documento": {
///     "tipo_documento": "fatura",
///     "emitente_id": "550e8400-e29b-41d4-a716-446655440000",
///     "destinatario_id": "660e8400-e29b-41d4-a716-446655440001",
///     "numero": "FAT-2026-0042"
///   }
/// }
/// ```
///
/// # Validation
///
/// - Amount must be positive
/// - The phone number must be digits only
/// - The charge is only persisted after the gateway accepts it
#[derive(Debug, Deserialize)]
pub struct InitiatePaymentRequest {
    /// Mobile-money subscriber number to charge
    pub msisdn: String,

    /// Amount to charge in cents
    pub valor_centavos: i64,

    /// Optional currency code, defaults to MZN
    pub moeda: Option<String>,

    /// Document to create once the charge is confirmed
    pub documento: DocumentPayload,
}

/// Response returned after a charge was accepted by the gateway.
#[derive(Debug, Serialize)]
pub struct InitiatePaymentResponse {
    pub payment_id: Uuid,
    pub gateway_ref: String,
    pub status: PaymentStatus,
}

/// Gateway verdict delivered in a callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallbackResult {
    Success,
    Failed,
}

/// Callback body sent by the payment gateway.
///
/// The raw request body is HMAC-verified before this is parsed, see the
/// callback handler.
///
/// # JSON Example
///
/// ```json
/// {
///   "gateway_ref": "MPESA-REF-123",
///   "result": "success"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct CallbackRequest {
    /// Charge reference issued at initiation
    pub gateway_ref: String,

    /// Whether the subscriber completed the charge
    pub result: CallbackResult,

    /// Optional gateway detail message, logged but not stored
    #[serde(default)]
    pub detalhe: Option<String>,
}

/// Acknowledgement returned to the gateway.
#[derive(Debug, Serialize)]
pub struct CallbackAck {
    pub payment_id: Uuid,
    pub status: PaymentStatus,
}

/// Request to finalize a paid-for payment into a document.
///
/// # JSON Example
///
/// ```json
/// {
///   "payment_id": "770e8400-e29b-41d4-a716-446655440002",
///   "documento": {
///     "tipo_documento": "fatura",
///     "emitente_id": "550e8400-e29b-41d4-a716-446655440000",
///     "destinatario_id": "660e8400-e29b-41d4-a716-446655440001",
///     "numero": "FAT-2026-0042",
///     "itens": [
///       { "descricao": "Consultoria (10h)", "quantidade": 10, "preco_unitario_centavos": 150000 }
///     ]
///   }
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct FinalizeRequest {
    /// Payment to finalize; must belong to the authenticated user
    pub payment_id: Uuid,

    /// Document to create and link
    pub documento: DocumentPayload,
}

/// Response for a finalization request.
///
/// `already_associated` distinguishes a fresh association from an
/// idempotent replay that found the document already linked.
#[derive(Debug, Serialize)]
pub struct FinalizeResponse {
    pub documento_id: Uuid,
    pub payment_id: Uuid,
    pub status: String,
    pub already_associated: bool,
    pub message: String,
}

/// Per-payment outcome of one retry scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RetryOutcome {
    /// Document created and linked
    Associated,
    /// Payload missing or invalid; counted against the retry budget
    Skipped,
    /// A pipeline step failed; will be picked up again next scan
    Failed,
}

/// One processed payment in a retry report.
#[derive(Debug, Serialize)]
pub struct RetryEntry {
    pub payment_id: Uuid,
    pub outcome: RetryOutcome,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documento_id: Option<Uuid>,
}

/// Response for a retry scan request.
#[derive(Debug, Serialize)]
pub struct RetryReport {
    pub processed: Vec<RetryEntry>,
}

/// Response returned for single-payment reads.
///
/// # JSON Example
///
/// ```json
/// {
///   "id": "770e8400-e29b-41d4-a716-446655440002",
///   "status": "aguardando_documento",
///   "tipo_documento": "fatura",
///   "moeda": "MZN",
///   "valor_centavos": 150000,
///   "documento_id": null,
///   "retry_count": 0,
///   "paid_at": null,
///   "created_at": "2026-06-01T10:00:00Z"
/// }
/// ```
#[derive(Debug, Serialize)]
pub struct PaymentResponse {
    pub id: Uuid,
    pub status: PaymentStatus,
    pub tipo_documento: DocumentKind,
    pub moeda: String,
    pub valor_centavos: i64,
    pub documento_id: Option<Uuid>,
    pub retry_count: i32,
    pub paid_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Convert database Payment to API PaymentResponse.
///
/// This removes internal fields like metadata and the owning user id
/// that clients don't need to see.
impl From<Payment> for PaymentResponse {
    fn from(payment: Payment) -> Self {
        Self {
            id: payment.id,
            status: payment.status,
            tipo_documento: payment.tipo_documento,
            moeda: payment.moeda,
            valor_centavos: payment.valor_centavos,
            documento_id: payment.documento_id,
            retry_count: payment.retry_count,
            paid_at: payment.paid_at,
            created_at: payment.created_at,
        }
    }
}
