//! Postgres-backed store implementations.
//!
//! Thin wrappers around the connection pool; all SQL of the service lives
//! here. Each struct is cheap to clone because the pool is itself an `Arc`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::db::DbPool;
use crate::middleware::auth::AuthContext;
use crate::models::document::{
    DocumentBase, DocumentKind, NewDocumentBase, NewItem, SpecializedDocument,
};
use crate::models::payment::{NewPayment, Payment, PaymentStatus};
use crate::models::session::Session;

use super::{AuthResolver, DocumentStore, PaymentStore, StoreError};

/// [`PaymentStore`] backed by the `pagamentos` table.
#[derive(Clone)]
pub struct PgPaymentStore {
    pool: DbPool,
}

impl PgPaymentStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PaymentStore for PgPaymentStore {
    async fn insert_pending(&self, payment: &NewPayment) -> Result<Payment, StoreError> {
        let created = sqlx::query_as::<_, Payment>(
            r#"
            INSERT INTO pagamentos (
                user_id,
                status,
                tipo_documento,
                moeda,
                valor_centavos,
                gateway_ref,
                metadata
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(payment.user_id)
        .bind(PaymentStatus::Pendente)
        .bind(payment.tipo_documento)
        .bind(&payment.moeda)
        .bind(payment.valor_centavos)
        .bind(&payment.gateway_ref)
        .bind(&payment.metadata)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    async fn find_for_user(
        &self,
        payment_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Payment>, StoreError> {
        let payment = sqlx::query_as::<_, Payment>(
            "SELECT * FROM pagamentos WHERE id = $1 AND user_id = $2",
        )
        .bind(payment_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(payment)
    }

    async fn find_by_gateway_ref(&self, gateway_ref: &str) -> Result<Option<Payment>, StoreError> {
        let payment =
            sqlx::query_as::<_, Payment>("SELECT * FROM pagamentos WHERE gateway_ref = $1")
                .bind(gateway_ref)
                .fetch_optional(&self.pool)
                .await?;

        Ok(payment)
    }

    async fn mark_callback_result(
        &self,
        payment_id: Uuid,
        status: PaymentStatus,
    ) -> Result<bool, StoreError> {
        // The WHERE clause rejects replays: only a pending payment moves.
        let updated = sqlx::query(
            r#"
            UPDATE pagamentos
            SET status = $2
            WHERE id = $1 AND status = $3
            "#,
        )
        .bind(payment_id)
        .bind(status)
        .bind(PaymentStatus::Pendente)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(updated > 0)
    }

    async fn find_stuck(
        &self,
        user_id: Uuid,
        max_retries: i32,
        limit: i64,
    ) -> Result<Vec<Payment>, StoreError> {
        let payments = sqlx::query_as::<_, Payment>(
            r#"
            SELECT * FROM pagamentos
            WHERE user_id = $1
              AND status = $2
              AND documento_id IS NULL
              AND retry_count < $3
            ORDER BY created_at ASC
            LIMIT $4
            "#,
        )
        .bind(user_id)
        .bind(PaymentStatus::AguardandoDocumento)
        .bind(max_retries)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(payments)
    }

    async fn record_retry_failure(&self, payment_id: Uuid) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE pagamentos
            SET retry_count = retry_count + 1,
                last_retry_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(payment_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn link_document(
        &self,
        payment_id: Uuid,
        documento_id: Uuid,
        paid_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            UPDATE pagamentos
            SET documento_id = $2,
                status = $3,
                paid_at = $4
            WHERE id = $1
            "#,
        )
        .bind(payment_id)
        .bind(documento_id)
        .bind(PaymentStatus::Pago)
        .bind(paid_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

/// [`DocumentStore`] backed by `documentos_base` and its satellite tables.
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: DbPool,
}

impl PgDocumentStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn next_numero(&self, user_id: Uuid, kind: DocumentKind) -> Result<String, StoreError> {
        // Delegates to the plpgsql counter so concurrent callers can't
        // collide on a number.
        let numero = sqlx::query_scalar::<_, String>("SELECT gerar_numero_documento($1, $2)")
            .bind(user_id)
            .bind(kind)
            .fetch_one(&self.pool)
            .await?;

        Ok(numero)
    }

    async fn insert_base(&self, base: &NewDocumentBase) -> Result<Uuid, StoreError> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO documentos_base (
                user_id,
                emitente_id,
                destinatario_id,
                numero,
                status,
                moeda
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING id
            "#,
        )
        .bind(base.user_id)
        .bind(base.emitente_id)
        .bind(base.destinatario_id)
        .bind(&base.numero)
        .bind(&base.status)
        .bind(&base.moeda)
        .fetch_one(&self.pool)
        .await?;

        Ok(id)
    }

    async fn insert_specialized(
        &self,
        documento_id: Uuid,
        doc: &SpecializedDocument,
    ) -> Result<(), StoreError> {
        match doc {
            SpecializedDocument::Fatura {
                data_vencimento,
                metodo_pagamento,
            } => {
                sqlx::query(
                    "INSERT INTO faturas (id, data_vencimento, metodo_pagamento) VALUES ($1, $2, $3)",
                )
                .bind(documento_id)
                .bind(data_vencimento)
                .bind(metodo_pagamento)
                .execute(&self.pool)
                .await?;
            }
            SpecializedDocument::Cotacao { validade } => {
                sqlx::query("INSERT INTO cotacoes (id, validade) VALUES ($1, $2)")
                    .bind(documento_id)
                    .bind(validade)
                    .execute(&self.pool)
                    .await?;
            }
            SpecializedDocument::Recibo {
                metodo_pagamento,
                referencia_pagamento,
            } => {
                sqlx::query(
                    "INSERT INTO recibos (id, metodo_pagamento, referencia_pagamento) VALUES ($1, $2, $3)",
                )
                .bind(documento_id)
                .bind(metodo_pagamento)
                .bind(referencia_pagamento)
                .execute(&self.pool)
                .await?;
            }
        }

        Ok(())
    }

    async fn delete_base(&self, documento_id: Uuid) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM documentos_base WHERE id = $1")
            .bind(documento_id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    async fn insert_items(&self, documento_id: Uuid, items: &[NewItem]) -> Result<(), StoreError> {
        for item in items {
            sqlx::query(
                r#"
                INSERT INTO itens_documento (
                    documento_id,
                    id_original,
                    descricao,
                    quantidade,
                    preco_unitario_centavos
                )
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(documento_id)
            .bind(item.id_original)
            .bind(&item.descricao)
            .bind(item.quantidade)
            .bind(item.preco_unitario_centavos)
            .execute(&self.pool)
            .await?;
        }

        Ok(())
    }

    async fn find_base_for_user(
        &self,
        documento_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<DocumentBase>, StoreError> {
        let document = sqlx::query_as::<_, DocumentBase>(
            "SELECT * FROM documentos_base WHERE id = $1 AND user_id = $2",
        )
        .bind(documento_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(document)
    }
}

/// [`AuthResolver`] backed by the `sessoes` table.
#[derive(Clone)]
pub struct PgAuthResolver {
    pool: DbPool,
}

impl PgAuthResolver {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuthResolver for PgAuthResolver {
    async fn resolve(&self, token: &str) -> Result<Option<AuthContext>, StoreError> {
        // Hash the presented token; only hashes are stored.
        let mut hasher = Sha256::new();
        hasher.update(token.as_bytes());
        let token_hash = hex::encode(hasher.finalize());

        let session = sqlx::query_as::<_, Session>(
            "SELECT * FROM sessoes WHERE token_hash = $1 AND expires_at > NOW()",
        )
        .bind(&token_hash)
        .fetch_optional(&self.pool)
        .await?;

        Ok(session.map(|s| AuthContext {
            user_id: s.user_id,
            email: s.email,
        }))
    }
}
