//! Document data models and API request/response types.
//!
//! This module defines:
//! - `DocumentKind`: the three document kinds the service can issue
//! - `DocumentPayload`: the tagged client payload used to finalize a payment
//! - `NewDocumentBase` / `SpecializedDocument` / `NewItem`: insert models
//! - `DocumentBase`: database entity for the shared document row
//! - Request and response types for the document endpoints

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::payment::Payment;

/// Status given to every newly created base document row.
pub const DOCUMENT_STATUS_ISSUED: &str = "emitido";

/// Payment method recorded when the payload doesn't name one.
pub const DEFAULT_PAYMENT_METHOD: &str = "mpesa";

/// Days until an invoice falls due when the payload gives no due date.
pub const FATURA_DUE_DAYS: i64 = 30;

/// Days a quote stays valid when the payload gives no validity date.
pub const COTACAO_VALID_DAYS: i64 = 15;

/// The kinds of billing document the service can issue.
///
/// Stored as lowercase text in `pagamentos.tipo_documento` and used as the
/// payload tag (`tipo_documento`) on [`DocumentPayload`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "snake_case")]
#[sqlx(rename_all = "snake_case")]
pub enum DocumentKind {
    /// Invoice, numbered `FAT-<year>-<seq>`
    Fatura,
    /// Quote, numbered `COT-<year>-<seq>`
    Cotacao,
    /// Receipt, numbered `REC-<year>-<seq>`
    Recibo,
}

impl DocumentKind {
    /// Lowercase name as stored in the database and used in payload tags.
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentKind::Fatura => "fatura",
            DocumentKind::Cotacao => "cotacao",
            DocumentKind::Recibo => "recibo",
        }
    }
}

/// One line item inside a document payload.
///
/// # JSON Example
///
/// ```json
/// {
///   "descricao": "Consultoria (10h)",
///   "quantidade": 10,
///   "preco_unitario_centavos": 150000
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ItemPayload {
    /// Human-readable description of the billed item
    pub descricao: String,

    /// Quantity, defaults to 1 when omitted
    #[serde(default = "default_quantidade")]
    pub quantidade: i64,

    /// Unit price in cents, defaults to 0 when omitted
    #[serde(default)]
    pub preco_unitario_centavos: i64,
}

fn default_quantidade() -> i64 {
    1
}

/// Fields shared by every payload kind plus the invoice-specific ones.
///
/// The shared trio `emitente_id` / `destinatario_id` / `numero` is optional
/// at the wire level and validated by [`DocumentPayload::core`] before any
/// row is written.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FaturaPayload {
    pub emitente_id: Option<Uuid>,
    pub destinatario_id: Option<Uuid>,
    pub numero: Option<String>,
    pub moeda: Option<String>,
    #[serde(default)]
    pub itens: Vec<ItemPayload>,

    /// Due date, defaults to issue date + 30 days
    pub data_vencimento: Option<NaiveDate>,
    /// Payment method, defaults to "mpesa"
    pub metodo_pagamento: Option<String>,
}

/// Quote payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CotacaoPayload {
    pub emitente_id: Option<Uuid>,
    pub destinatario_id: Option<Uuid>,
    pub numero: Option<String>,
    pub moeda: Option<String>,
    #[serde(default)]
    pub itens: Vec<ItemPayload>,

    /// Validity date, defaults to issue date + 15 days
    pub validade: Option<NaiveDate>,
}

/// Receipt payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReciboPayload {
    pub emitente_id: Option<Uuid>,
    pub destinatario_id: Option<Uuid>,
    pub numero: Option<String>,
    pub moeda: Option<String>,
    #[serde(default)]
    pub itens: Vec<ItemPayload>,

    /// Payment method, defaults to "mpesa"
    pub metodo_pagamento: Option<String>,
    /// Payment reference, defaults to the payment's gateway reference
    pub referencia_pagamento: Option<String>,
}

/// Client payload describing the document to create for a payment.
///
/// The `tipo_documento` tag selects the variant, so each kind gets its own
/// schema instead of one loose map, and a payload can never smuggle fields
/// of a different kind past validation.
///
/// # JSON Example
///
/// ```json
/// {
///   "tipo_documento": "fatura",
///   "emitente_id": "550e8400-e29b-41d4-a716-446655440000",
///   "destinatario_id": "660e8400-e29b-41d4-a716-446655440001",
///   "numero": "FAT-2026-0042",
///   "itens": [
///     { "descricao": "Consultoria (10h)", "quantidade": 10, "preco_unitario_centavos": 150000 }
///   ]
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "tipo_documento", rename_all = "snake_case")]
pub enum DocumentPayload {
    Fatura(FaturaPayload),
    Cotacao(CotacaoPayload),
    Recibo(ReciboPayload),
}

/// The validated shared fields every document kind requires.
#[derive(Debug, Clone)]
pub struct DocumentCore {
    pub emitente_id: Uuid,
    pub destinatario_id: Uuid,
    pub numero: String,
}

impl DocumentPayload {
    /// The document kind this payload describes.
    pub fn kind(&self) -> DocumentKind {
        match self {
            DocumentPayload::Fatura(_) => DocumentKind::Fatura,
            DocumentPayload::Cotacao(_) => DocumentKind::Cotacao,
            DocumentPayload::Recibo(_) => DocumentKind::Recibo,
        }
    }

    fn emitente_id(&self) -> Option<Uuid> {
        match self {
            DocumentPayload::Fatura(p) => p.emitente_id,
            DocumentPayload::Cotacao(p) => p.emitente_id,
            DocumentPayload::Recibo(p) => p.emitente_id,
        }
    }

    fn destinatario_id(&self) -> Option<Uuid> {
        match self {
            DocumentPayload::Fatura(p) => p.destinatario_id,
            DocumentPayload::Cotacao(p) => p.destinatario_id,
            DocumentPayload::Recibo(p) => p.destinatario_id,
        }
    }

    fn numero(&self) -> Option<&str> {
        match self {
            DocumentPayload::Fatura(p) => p.numero.as_deref(),
            DocumentPayload::Cotacao(p) => p.numero.as_deref(),
            DocumentPayload::Recibo(p) => p.numero.as_deref(),
        }
    }

    fn moeda(&self) -> Option<&str> {
        match self {
            DocumentPayload::Fatura(p) => p.moeda.as_deref(),
            DocumentPayload::Cotacao(p) => p.moeda.as_deref(),
            DocumentPayload::Recibo(p) => p.moeda.as_deref(),
        }
    }

    /// Line items carried by the payload.
    pub fn itens(&self) -> &[ItemPayload] {
        match self {
            DocumentPayload::Fatura(p) => &p.itens,
            DocumentPayload::Cotacao(p) => &p.itens,
            DocumentPayload::Recibo(p) => &p.itens,
        }
    }

    /// Validate and extract the shared required fields.
    ///
    /// # Errors
    ///
    /// Returns the names of the missing fields, in payload order, when the
    /// issuer, recipient, or document number is absent.
    pub fn core(&self) -> Result<DocumentCore, Vec<&'static str>> {
        let mut missing = Vec::new();
        if self.emitente_id().is_none() {
            missing.push("emitente_id");
        }
        if self.destinatario_id().is_none() {
            missing.push("destinatario_id");
        }
        match self.numero() {
            Some(n) if !n.trim().is_empty() => {}
            _ => missing.push("numero"),
        }
        if !missing.is_empty() {
            return Err(missing);
        }
        // The is_none checks above guarantee these are present.
        Ok(DocumentCore {
            emitente_id: self.emitente_id().unwrap_or_default(),
            destinatario_id: self.destinatario_id().unwrap_or_default(),
            numero: self.numero().unwrap_or_default().trim().to_string(),
        })
    }

    /// Build the base row insert model for this payload.
    ///
    /// The currency falls back to the payment's currency when the payload
    /// doesn't carry one.
    pub fn base(&self, payment: &Payment, core: &DocumentCore) -> NewDocumentBase {
        NewDocumentBase {
            user_id: payment.user_id,
            emitente_id: core.emitente_id,
            destinatario_id: core.destinatario_id,
            numero: core.numero.clone(),
            status: DOCUMENT_STATUS_ISSUED.to_string(),
            moeda: self
                .moeda()
                .unwrap_or(payment.moeda.as_str())
                .to_string(),
        }
    }

    /// Build the kind-specific insert model, filling defaults the payload
    /// left out.
    ///
    /// # Defaults
    ///
    /// - Invoice: due date = today + 30 days, payment method = "mpesa"
    /// - Quote: validity = today + 15 days
    /// - Receipt: payment method = "mpesa", payment reference = the
    ///   payment's gateway reference
    pub fn specialized(&self, payment: &Payment) -> SpecializedDocument {
        let today = Utc::now().date_naive();
        match self {
            DocumentPayload::Fatura(p) => SpecializedDocument::Fatura {
                data_vencimento: p
                    .data_vencimento
                    .unwrap_or_else(|| today + Duration::days(FATURA_DUE_DAYS)),
                metodo_pagamento: p
                    .metodo_pagamento
                    .clone()
                    .unwrap_or_else(|| DEFAULT_PAYMENT_METHOD.to_string()),
            },
            DocumentPayload::Cotacao(p) => SpecializedDocument::Cotacao {
                validade: p
                    .validade
                    .unwrap_or_else(|| today + Duration::days(COTACAO_VALID_DAYS)),
            },
            DocumentPayload::Recibo(p) => SpecializedDocument::Recibo {
                metodo_pagamento: p
                    .metodo_pagamento
                    .clone()
                    .unwrap_or_else(|| DEFAULT_PAYMENT_METHOD.to_string()),
                referencia_pagamento: p
                    .referencia_pagamento
                    .clone()
                    .or_else(|| payment.gateway_ref.clone()),
            },
        }
    }

    /// Items ready for insertion, numbered 1-based in payload order.
    pub fn items_for_insert(&self) -> Vec<NewItem> {
        self.itens()
            .iter()
            .enumerate()
            .map(|(index, item)| NewItem {
                id_original: index as i32 + 1,
                descricao: item.descricao.clone(),
                quantidade: item.quantidade,
                preco_unitario_centavos: item.preco_unitario_centavos,
            })
            .collect()
    }
}

/// Insert model for the shared `documentos_base` row.
#[derive(Debug, Clone)]
pub struct NewDocumentBase {
    pub user_id: Uuid,
    pub emitente_id: Uuid,
    pub destinatario_id: Uuid,
    pub numero: String,
    pub status: String,
    pub moeda: String,
}

/// Insert model for the kind-specific row that shares the base row's id.
#[derive(Debug, Clone)]
pub enum SpecializedDocument {
    Fatura {
        data_vencimento: NaiveDate,
        metodo_pagamento: String,
    },
    Cotacao {
        validade: NaiveDate,
    },
    Recibo {
        metodo_pagamento: String,
        referencia_pagamento: Option<String>,
    },
}

impl SpecializedDocument {
    /// The document kind this specialized row belongs to.
    pub fn kind(&self) -> DocumentKind {
        match self {
            SpecializedDocument::Fatura { .. } => DocumentKind::Fatura,
            SpecializedDocument::Cotacao { .. } => DocumentKind::Cotacao,
            SpecializedDocument::Recibo { .. } => DocumentKind::Recibo,
        }
    }
}

/// Insert model for one `itens_documento` row.
#[derive(Debug, Clone, PartialEq)]
pub struct NewItem {
    /// 1-based position in the client payload
    pub id_original: i32,
    pub descricao: String,
    pub quantidade: i64,
    pub preco_unitario_centavos: i64,
}

/// Represents a shared document row from the database.
///
/// # Database Table
///
/// Maps to the `documentos_base` table. The kind-specific fields live in
/// `faturas` / `cotacoes` / `recibos`, keyed by the same id.
#[derive(Debug, Clone, sqlx::FromRow, Serialize)]
pub struct DocumentBase {
    /// Unique identifier, shared with the kind-specific row
    pub id: Uuid,

    /// Owning user
    pub user_id: Uuid,

    /// Issuer reference
    pub emitente_id: Uuid,

    /// Recipient reference
    pub destinatario_id: Uuid,

    /// Formatted document number, e.g. `FAT-2026-0042`
    pub numero: String,

    /// Document status, `emitido` on creation
    pub status: String,

    /// Currency code
    pub moeda: String,

    /// Rendered HTML, populated later by the rendering frontend
    pub html_content: Option<String>,

    /// When the document was created
    pub created_at: DateTime<Utc>,
}

/// Query parameters for reserving the next document number.
#[derive(Debug, Deserialize)]
pub struct NumeroQuery {
    /// Document kind to number, e.g. `?tipo=fatura`
    pub tipo: DocumentKind,
}

/// Response carrying a freshly reserved document number.
#[derive(Debug, Serialize)]
pub struct NumeroResponse {
    pub numero: String,
}

/// Request to email a document link to its recipient.
///
/// # JSON Example
///
/// ```json
/// {
///   "documento_id": "770e8400-e29b-41d4-a716-446655440002",
///   "destinatario_email": "cliente@example.com"
/// }
/// ```
#[derive(Debug, Deserialize)]
pub struct EmailDocumentRequest {
    /// Document to send; must belong to the authenticated user
    pub documento_id: Uuid,

    /// Recipient address
    pub destinatario_email: String,
}

/// Response for the email endpoint.
#[derive(Debug, Serialize)]
pub struct EmailDocumentResponse {
    pub message: String,
}
