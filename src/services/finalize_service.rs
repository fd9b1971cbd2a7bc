//! Document finalization - Core business logic of the payment pipeline.
//!
//! A payment that reached `aguardando_documento` carries money that has no
//! document yet. This service turns it into one: base row, kind-specific
//! row, line items, then the link back onto the payment.
//!
//! # Failure Model
//!
//! There is no cross-table transaction here; each step compensates instead:
//! - Base insert fails: nothing was written, the attempt is counted
//! - Specialized insert fails: the base row is deleted again, the attempt
//!   is counted
//! - Item insert fails: the document survives without items
//! - Link update fails: the document exists unlinked and the error says so
//!
//! Failed attempts are retried by [`super::retry_service`].
//!
//! # Known Limitation
//!
//! The idempotency check and the link update are separate store calls. Two
//! concurrent finalizations of one payment can both pass the check and each
//! create a document; the later link wins and the earlier document is left
//! unreferenced. Finalization is driven by a single user session per
//! payment, which keeps the window theoretical.

use uuid::Uuid;

use crate::error::AppError;
use crate::models::document::{DocumentCore, DocumentPayload};
use crate::models::payment::{FinalizeRequest, Payment, PaymentStatus};
use crate::stores::{DocumentStore, PaymentStore};

/// Outcome of a finalization request.
#[derive(Debug)]
pub struct FinalizeOutcome {
    pub documento_id: Uuid,
    pub payment_id: Uuid,
    /// `true` when the payment already had a document and nothing was
    /// written on this request.
    pub already_associated: bool,
}

/// Finalize a payment into its document.
///
/// # Process
///
/// 1. Fetch the payment, scoped to the authenticated user
/// 2. If a document is already linked, return it (idempotent replay)
/// 3. Require status `aguardando_documento`
/// 4. Require the payload kind to match the payment's kind
/// 5. Validate the required document fields
/// 6. Create the document rows and link the payment
///
/// # Errors
///
/// - `PaymentNotFound`: Payment doesn't exist or belongs to someone else
/// - `InvalidStatus`: Payment is not awaiting a document
/// - `Validation`: Payload kind doesn't match the payment
/// - `DocumentFieldsMissing`: Issuer, recipient, or number is absent
/// - `DocumentCreateFailed` / `DocumentSpecializedFailed` /
///   `PaymentUpdateFailed`: A pipeline step failed, see the failure model
pub async fn execute_finalization(
    payments: &dyn PaymentStore,
    documents: &dyn DocumentStore,
    user_id: Uuid,
    request: &FinalizeRequest,
) -> Result<FinalizeOutcome, AppError> {
    let payment = payments
        .find_for_user(request.payment_id, user_id)
        .await?
        .ok_or(AppError::PaymentNotFound)?;

    // Idempotency: a linked payment is already done, write nothing.
    if let Some(documento_id) = payment.documento_id {
        tracing::info!(
            payment_id = %payment.id,
            documento_id = %documento_id,
            "finalization replayed for an already associated payment"
        );
        return Ok(FinalizeOutcome {
            documento_id,
            payment_id: payment.id,
            already_associated: true,
        });
    }

    if payment.status != PaymentStatus::AguardandoDocumento {
        return Err(AppError::InvalidStatus(payment.status.as_str().to_string()));
    }

    if request.documento.kind() != payment.tipo_documento {
        return Err(AppError::Validation(format!(
            "payload tipo_documento '{}' does not match the payment's '{}'",
            request.documento.kind().as_str(),
            payment.tipo_documento.as_str()
        )));
    }

    let core = request
        .documento
        .core()
        .map_err(AppError::DocumentFieldsMissing)?;

    let documento_id =
        create_document_for_payment(payments, documents, &payment, &request.documento, &core)
            .await?;

    tracing::info!(
        payment_id = %payment.id,
        documento_id = %documento_id,
        tipo = payment.tipo_documento.as_str(),
        "payment finalized into a document"
    );

    Ok(FinalizeOutcome {
        documento_id,
        payment_id: payment.id,
        already_associated: false,
    })
}

/// Create the document rows for a payment and link them.
///
/// Shared by finalization and the retry scan; the caller has already
/// validated status and payload.
///
/// # Process
///
/// 1. Insert the base row
/// 2. Insert the kind-specific row; on failure delete the base row again
/// 3. Insert line items, best effort
/// 4. Point the payment at the document and mark it paid
pub(crate) async fn create_document_for_payment(
    payments: &dyn PaymentStore,
    documents: &dyn DocumentStore,
    payment: &Payment,
    payload: &DocumentPayload,
    core: &DocumentCore,
) -> Result<Uuid, AppError> {
    // Step 1: base row
    let base = payload.base(payment, core);
    let documento_id = match documents.insert_base(&base).await {
        Ok(id) => id,
        Err(err) => {
            tracing::error!(
                error = %err,
                payment_id = %payment.id,
                "base document insert failed"
            );
            count_failed_attempt(payments, payment.id).await;
            return Err(AppError::DocumentCreateFailed);
        }
    };

    // Step 2: kind-specific row, compensating on failure so no base row
    // exists without its specialization
    let specialized = payload.specialized(payment);
    if let Err(err) = documents.insert_specialized(documento_id, &specialized).await {
        tracing::error!(
            error = %err,
            payment_id = %payment.id,
            documento_id = %documento_id,
            "specialized row insert failed, removing the base row"
        );
        if let Err(del_err) = documents.delete_base(documento_id).await {
            tracing::error!(
                error = %del_err,
                documento_id = %documento_id,
                "compensating delete failed, orphaned base row remains"
            );
        }
        count_failed_attempt(payments, payment.id).await;
        return Err(AppError::DocumentSpecializedFailed);
    }

    // Step 3: items are best effort; a document without items is still a
    // valid document
    let items = payload.items_for_insert();
    if !items.is_empty() {
        if let Err(err) = documents.insert_items(documento_id, &items).await {
            tracing::warn!(
                error = %err,
                documento_id = %documento_id,
                "line item insert failed, document kept without items"
            );
        }
    }

    // Step 4: link the payment
    if let Err(err) = payments
        .link_document(payment.id, documento_id, chrono::Utc::now())
        .await
    {
        tracing::error!(
            error = %err,
            payment_id = %payment.id,
            documento_id = %documento_id,
            "payment link update failed, document exists unlinked"
        );
        return Err(AppError::PaymentUpdateFailed);
    }

    Ok(documento_id)
}

/// Count a failed attempt against the payment's retry budget.
///
/// Bookkeeping only; a failure here must not mask the pipeline error.
async fn count_failed_attempt(payments: &dyn PaymentStore, payment_id: Uuid) {
    if let Err(err) = payments.record_retry_failure(payment_id).await {
        tracing::warn!(
            error = %err,
            payment_id = %payment_id,
            "failed to record the retry attempt"
        );
    }
}
