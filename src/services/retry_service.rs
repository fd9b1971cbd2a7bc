//! Retry scan for payments stuck without a document.
//!
//! A payment can sit in `aguardando_documento` with money received but no
//! document if a finalization step failed. The scan replays document
//! creation for a bounded batch of them, using the payload captured in the
//! payment's metadata at initiation, so no client input is needed.

use uuid::Uuid;

use crate::error::AppError;
use crate::models::payment::{Payment, RetryEntry, RetryOutcome};
use crate::stores::{DocumentStore, PaymentStore};

use super::finalize_service::create_document_for_payment;

/// A payment is abandoned after this many failed attempts.
pub const MAX_RETRY_ATTEMPTS: i32 = 5;

/// At most this many payments are processed per scan.
pub const RETRY_BATCH_SIZE: i64 = 10;

/// Scan the user's stuck payments and retry document creation.
///
/// # Process
///
/// 1. Fetch up to [`RETRY_BATCH_SIZE`] payments in `aguardando_documento`
///    with no document and attempts left, oldest first
/// 2. Rebuild each document payload from `metadata.documento`
/// 3. Run the creation pipeline per payment
///
/// Every payment gets an outcome:
/// - `associated`: document created and linked
/// - `skipped`: payload missing, unparseable, or invalid; the attempt is
///   counted so a hopeless payment eventually leaves the scan
/// - `failed`: a pipeline step failed; eligible again next scan
///
/// One bad payment never aborts the batch.
pub async fn run_retry_scan(
    payments: &dyn PaymentStore,
    documents: &dyn DocumentStore,
    user_id: Uuid,
) -> Result<Vec<RetryEntry>, AppError> {
    let stuck = payments
        .find_stuck(user_id, MAX_RETRY_ATTEMPTS, RETRY_BATCH_SIZE)
        .await?;

    tracing::info!(
        user_id = %user_id,
        count = stuck.len(),
        "retry scan started"
    );

    let mut processed = Vec::with_capacity(stuck.len());
    for payment in stuck {
        processed.push(retry_one(payments, documents, &payment).await);
    }

    Ok(processed)
}

/// Retry a single payment.
async fn retry_one(
    payments: &dyn PaymentStore,
    documents: &dyn DocumentStore,
    payment: &Payment,
) -> RetryEntry {
    let Some(payload) = payment.document_payload() else {
        return skip(payments, payment, "metadata carries no usable document payload").await;
    };

    if payload.kind() != payment.tipo_documento {
        return skip(payments, payment, "metadata payload kind does not match the payment").await;
    }

    let Ok(core) = payload.core() else {
        return skip(payments, payment, "metadata payload is missing required fields").await;
    };

    match create_document_for_payment(payments, documents, payment, &payload, &core).await {
        Ok(documento_id) => {
            tracing::info!(
                payment_id = %payment.id,
                documento_id = %documento_id,
                "retry associated a document"
            );
            RetryEntry {
                payment_id: payment.id,
                outcome: RetryOutcome::Associated,
                documento_id: Some(documento_id),
            }
        }
        // The pipeline already logged and counted the failure.
        Err(_) => RetryEntry {
            payment_id: payment.id,
            outcome: RetryOutcome::Failed,
            documento_id: None,
        },
    }
}

/// Mark a payment as skipped and count the attempt, so payments that can
/// never succeed don't stay in the scan forever.
async fn skip(payments: &dyn PaymentStore, payment: &Payment, reason: &'static str) -> RetryEntry {
    tracing::warn!(
        payment_id = %payment.id,
        reason,
        "retry skipped a payment"
    );
    if let Err(err) = payments.record_retry_failure(payment.id).await {
        tracing::warn!(
            error = %err,
            payment_id = %payment.id,
            "failed to record the skipped attempt"
        );
    }
    RetryEntry {
        payment_id: payment.id,
        outcome: RetryOutcome::Skipped,
        documento_id: None,
    }
}
