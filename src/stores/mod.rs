//! Persistence traits and their implementations.
//!
//! The finalization pipeline and the handlers talk to storage through these
//! traits, never to `sqlx` directly. That keeps the pipeline testable: the
//! in-memory implementations can simulate any failure the Postgres ones can
//! produce.
//!
//! - [`postgres`]: production implementations backed by the connection pool
//! - [`memory`]: in-memory implementations for tests

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::middleware::auth::AuthContext;
use crate::models::document::{
    DocumentBase, DocumentKind, NewDocumentBase, NewItem, SpecializedDocument,
};
use crate::models::payment::{NewPayment, Payment, PaymentStatus};

/// Error produced by any store operation.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Database operation failed (e.g., connection error, query error)
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The store refused or could not complete the operation
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Access to payment rows.
#[async_trait]
pub trait PaymentStore: Send + Sync {
    /// Insert a freshly initiated payment with status `pendente`.
    async fn insert_pending(&self, payment: &NewPayment) -> Result<Payment, StoreError>;

    /// Fetch a payment scoped to its owning user.
    async fn find_for_user(
        &self,
        payment_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Payment>, StoreError>;

    /// Fetch a payment by the gateway's charge reference.
    async fn find_by_gateway_ref(&self, gateway_ref: &str) -> Result<Option<Payment>, StoreError>;

    /// Move a `pendente` payment to its callback verdict.
    ///
    /// Returns `false` when the payment was no longer `pendente`, which
    /// makes repeated callbacks harmless.
    async fn mark_callback_result(
        &self,
        payment_id: Uuid,
        status: PaymentStatus,
    ) -> Result<bool, StoreError>;

    /// Payments stuck in `aguardando_documento` with no document and a
    /// retry budget left, oldest first, at most `limit`.
    async fn find_stuck(
        &self,
        user_id: Uuid,
        max_retries: i32,
        limit: i64,
    ) -> Result<Vec<Payment>, StoreError>;

    /// Count one failed finalization attempt against the payment.
    async fn record_retry_failure(&self, payment_id: Uuid) -> Result<(), StoreError>;

    /// Point the payment at its finished document and mark it `pago`.
    async fn link_document(
        &self,
        payment_id: Uuid,
        documento_id: Uuid,
        paid_at: DateTime<Utc>,
    ) -> Result<(), StoreError>;
}

/// Access to document rows.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Reserve the next formatted document number for a user and kind.
    async fn next_numero(&self, user_id: Uuid, kind: DocumentKind) -> Result<String, StoreError>;

    /// Insert the shared base row and return its id.
    async fn insert_base(&self, base: &NewDocumentBase) -> Result<Uuid, StoreError>;

    /// Insert the kind-specific row sharing the base row's id.
    async fn insert_specialized(
        &self,
        documento_id: Uuid,
        doc: &SpecializedDocument,
    ) -> Result<(), StoreError>;

    /// Remove a base row again; compensation for a failed specialization.
    async fn delete_base(&self, documento_id: Uuid) -> Result<(), StoreError>;

    /// Insert line items for a document.
    async fn insert_items(&self, documento_id: Uuid, items: &[NewItem]) -> Result<(), StoreError>;

    /// Fetch a base row scoped to its owning user.
    async fn find_base_for_user(
        &self,
        documento_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<DocumentBase>, StoreError>;
}

/// Resolves a session token to an authenticated identity.
#[async_trait]
pub trait AuthResolver: Send + Sync {
    /// Resolve a raw session token.
    ///
    /// Returns `Ok(None)` for unknown or expired tokens; an `Err` means the
    /// lookup itself failed.
    async fn resolve(&self, token: &str) -> Result<Option<AuthContext>, StoreError>;
}
