//! In-memory store implementations.
//!
//! Used by the test suite so the pipeline and the guard can run against
//! real store semantics without a database. Clones share state through the
//! inner `Arc`s, so a test can keep a handle for assertions while the
//! router owns another.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Datelike, Utc};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::middleware::auth::AuthContext;
use crate::models::document::{
    DocumentBase, DocumentKind, NewDocumentBase, NewItem, SpecializedDocument,
};
use crate::models::payment::{NewPayment, Payment, PaymentStatus};

use super::{AuthResolver, DocumentStore, PaymentStore, StoreError};

/// [`PaymentStore`] over a shared `HashMap`.
#[derive(Default, Clone)]
pub struct InMemoryPaymentStore {
    payments: Arc<RwLock<HashMap<Uuid, Payment>>>,
}

impl InMemoryPaymentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a fully formed payment, bypassing the initiation flow.
    pub async fn insert(&self, payment: Payment) {
        self.payments.write().await.insert(payment.id, payment);
    }

    /// Snapshot a payment for assertions.
    pub async fn get(&self, payment_id: Uuid) -> Option<Payment> {
        self.payments.read().await.get(&payment_id).cloned()
    }
}

#[async_trait]
impl PaymentStore for InMemoryPaymentStore {
    async fn insert_pending(&self, payment: &NewPayment) -> Result<Payment, StoreError> {
        let created = Payment {
            id: Uuid::new_v4(),
            user_id: payment.user_id,
            status: PaymentStatus::Pendente,
            tipo_documento: payment.tipo_documento,
            moeda: payment.moeda.clone(),
            valor_centavos: payment.valor_centavos,
            documento_id: None,
            retry_count: 0,
            last_retry_at: None,
            paid_at: None,
            gateway_ref: payment.gateway_ref.clone(),
            metadata: payment.metadata.clone(),
            created_at: Utc::now(),
        };
        self.payments
            .write()
            .await
            .insert(created.id, created.clone());
        Ok(created)
    }

    async fn find_for_user(
        &self,
        payment_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Payment>, StoreError> {
        let payments = self.payments.read().await;
        Ok(payments
            .get(&payment_id)
            .filter(|p| p.user_id == user_id)
            .cloned())
    }

    async fn find_by_gateway_ref(&self, gateway_ref: &str) -> Result<Option<Payment>, StoreError> {
        let payments = self.payments.read().await;
        Ok(payments
            .values()
            .find(|p| p.gateway_ref.as_deref() == Some(gateway_ref))
            .cloned())
    }

    async fn mark_callback_result(
        &self,
        payment_id: Uuid,
        status: PaymentStatus,
    ) -> Result<bool, StoreError> {
        let mut payments = self.payments.write().await;
        match payments.get_mut(&payment_id) {
            Some(payment) if payment.status == PaymentStatus::Pendente => {
                payment.status = status;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn find_stuck(
        &self,
        user_id: Uuid,
        max_retries: i32,
        limit: i64,
    ) -> Result<Vec<Payment>, StoreError> {
        let payments = self.payments.read().await;
        let mut stuck: Vec<Payment> = payments
            .values()
            .filter(|p| {
                p.user_id == user_id
                    && p.status == PaymentStatus::AguardandoDocumento
                    && p.documento_id.is_none()
                    && p.retry_count < max_retries
            })
            .cloned()
            .collect();
        stuck.sort_by_key(|p| p.created_at);
        stuck.truncate(limit as usize);
        Ok(stuck)
    }

    async fn record_retry_failure(&self, payment_id: Uuid) -> Result<(), StoreError> {
        let mut payments = self.payments.write().await;
        if let Some(payment) = payments.get_mut(&payment_id) {
            payment.retry_count += 1;
            payment.last_retry_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn link_document(
        &self,
        payment_id: Uuid,
        documento_id: Uuid,
        paid_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut payments = self.payments.write().await;
        if let Some(payment) = payments.get_mut(&payment_id) {
            payment.documento_id = Some(documento_id);
            payment.status = PaymentStatus::Pago;
            payment.paid_at = Some(paid_at);
        }
        Ok(())
    }
}

/// [`DocumentStore`] over shared `HashMap`s, one per table.
#[derive(Default, Clone)]
pub struct InMemoryDocumentStore {
    bases: Arc<RwLock<HashMap<Uuid, DocumentBase>>>,
    specialized: Arc<RwLock<HashMap<Uuid, SpecializedDocument>>>,
    items: Arc<RwLock<HashMap<Uuid, Vec<NewItem>>>>,
    counters: Arc<RwLock<HashMap<(Uuid, DocumentKind), u32>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of base rows currently stored.
    pub async fn base_count(&self) -> usize {
        self.bases.read().await.len()
    }

    /// Snapshot a base row for assertions.
    pub async fn base(&self, documento_id: Uuid) -> Option<DocumentBase> {
        self.bases.read().await.get(&documento_id).cloned()
    }

    /// Kind of the specialized row, if one exists.
    pub async fn specialized_kind(&self, documento_id: Uuid) -> Option<DocumentKind> {
        self.specialized
            .read()
            .await
            .get(&documento_id)
            .map(|s| s.kind())
    }

    /// Snapshot the specialized row for assertions.
    pub async fn specialized(&self, documento_id: Uuid) -> Option<SpecializedDocument> {
        self.specialized.read().await.get(&documento_id).cloned()
    }

    /// Items stored for a document.
    pub async fn items(&self, documento_id: Uuid) -> Vec<NewItem> {
        self.items
            .read()
            .await
            .get(&documento_id)
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn next_numero(&self, user_id: Uuid, kind: DocumentKind) -> Result<String, StoreError> {
        let mut counters = self.counters.write().await;
        let seq = counters.entry((user_id, kind)).or_insert(0);
        *seq += 1;

        let prefix = match kind {
            DocumentKind::Fatura => "FAT",
            DocumentKind::Cotacao => "COT",
            DocumentKind::Recibo => "REC",
        };
        Ok(format!("{}-{}-{:04}", prefix, Utc::now().year(), seq))
    }

    async fn insert_base(&self, base: &NewDocumentBase) -> Result<Uuid, StoreError> {
        let id = Uuid::new_v4();
        let row = DocumentBase {
            id,
            user_id: base.user_id,
            emitente_id: base.emitente_id,
            destinatario_id: base.destinatario_id,
            numero: base.numero.clone(),
            status: base.status.clone(),
            moeda: base.moeda.clone(),
            html_content: None,
            created_at: Utc::now(),
        };
        self.bases.write().await.insert(id, row);
        Ok(id)
    }

    async fn insert_specialized(
        &self,
        documento_id: Uuid,
        doc: &SpecializedDocument,
    ) -> Result<(), StoreError> {
        // Mirrors the foreign key: no specialized row without a base row.
        if !self.bases.read().await.contains_key(&documento_id) {
            return Err(StoreError::Unavailable(
                "base document does not exist".to_string(),
            ));
        }
        self.specialized
            .write()
            .await
            .insert(documento_id, doc.clone());
        Ok(())
    }

    async fn delete_base(&self, documento_id: Uuid) -> Result<(), StoreError> {
        self.bases.write().await.remove(&documento_id);
        // Cascade like the schema does.
        self.specialized.write().await.remove(&documento_id);
        self.items.write().await.remove(&documento_id);
        Ok(())
    }

    async fn insert_items(&self, documento_id: Uuid, items: &[NewItem]) -> Result<(), StoreError> {
        self.items
            .write()
            .await
            .entry(documento_id)
            .or_default()
            .extend(items.iter().cloned());
        Ok(())
    }

    async fn find_base_for_user(
        &self,
        documento_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<DocumentBase>, StoreError> {
        let bases = self.bases.read().await;
        Ok(bases
            .get(&documento_id)
            .filter(|d| d.user_id == user_id)
            .cloned())
    }
}

/// [`AuthResolver`] over a token-to-identity map.
#[derive(Default, Clone)]
pub struct InMemoryAuthResolver {
    sessions: Arc<RwLock<HashMap<String, AuthContext>>>,
}

impl InMemoryAuthResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a raw token as a valid session.
    pub async fn insert_session(&self, token: &str, context: AuthContext) {
        self.sessions
            .write()
            .await
            .insert(token.to_string(), context);
    }
}

#[async_trait]
impl AuthResolver for InMemoryAuthResolver {
    async fn resolve(&self, token: &str) -> Result<Option<AuthContext>, StoreError> {
        Ok(self.sessions.read().await.get(token).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::document::DocumentKind;
    use chrono::Duration;

    fn stuck_payment(user_id: Uuid, created_at: DateTime<Utc>, retry_count: i32) -> Payment {
        Payment {
            id: Uuid::new_v4(),
            user_id,
            status: PaymentStatus::AguardandoDocumento,
            tipo_documento: DocumentKind::Fatura,
            moeda: "MZN".to_string(),
            valor_centavos: 100_000,
            documento_id: None,
            retry_count,
            last_retry_at: None,
            paid_at: None,
            gateway_ref: None,
            metadata: None,
            created_at,
        }
    }

    #[tokio::test]
    async fn callback_transition_only_moves_pending_payments() {
        let store = InMemoryPaymentStore::new();
        let payment = stuck_payment(Uuid::new_v4(), Utc::now(), 0);
        let id = payment.id;
        store.insert(payment).await;

        // Already past pendente, so the transition must be refused.
        let moved = store
            .mark_callback_result(id, PaymentStatus::Falhado)
            .await
            .expect("store should not fail");
        assert!(!moved);
        let stored = store.get(id).await.expect("payment exists");
        assert_eq!(stored.status, PaymentStatus::AguardandoDocumento);
    }

    #[tokio::test]
    async fn find_stuck_orders_oldest_first_and_respects_the_limit() {
        let store = InMemoryPaymentStore::new();
        let user_id = Uuid::new_v4();
        let base = Utc::now();

        let newest = stuck_payment(user_id, base, 0);
        let oldest = stuck_payment(user_id, base - Duration::hours(2), 0);
        let middle = stuck_payment(user_id, base - Duration::hours(1), 0);
        let exhausted = stuck_payment(user_id, base - Duration::hours(3), 5);
        let (oldest_id, middle_id) = (oldest.id, middle.id);

        for payment in [newest, oldest, middle, exhausted] {
            store.insert(payment).await;
        }

        let stuck = store
            .find_stuck(user_id, 5, 2)
            .await
            .expect("store should not fail");
        assert_eq!(stuck.len(), 2);
        assert_eq!(stuck[0].id, oldest_id);
        assert_eq!(stuck[1].id, middle_id);
    }

    #[tokio::test]
    async fn numbering_is_sequential_per_user_and_kind() {
        let store = InMemoryDocumentStore::new();
        let user_id = Uuid::new_v4();

        let first = store
            .next_numero(user_id, DocumentKind::Fatura)
            .await
            .expect("store should not fail");
        let second = store
            .next_numero(user_id, DocumentKind::Fatura)
            .await
            .expect("store should not fail");
        let quote = store
            .next_numero(user_id, DocumentKind::Cotacao)
            .await
            .expect("store should not fail");

        assert!(first.starts_with("FAT-"));
        assert!(first.ends_with("-0001"));
        assert!(second.ends_with("-0002"));
        assert!(quote.starts_with("COT-"));
        assert!(quote.ends_with("-0001"));
    }
}
