//! Shared fixtures for the integration tests.
//!
//! Builds the real API router over the in-memory stores and keeps direct
//! handles on those stores so tests can seed rows and assert on what the
//! handlers wrote. Store failures are injected through thin wrappers that
//! fail selected operations on command.

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
    response::Response,
};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use tower::ServiceExt;
use uuid::Uuid;

use billing_document_server::{
    AppState, api_router,
    config::Config,
    middleware::auth::AuthContext,
    models::document::{DocumentBase, DocumentKind, NewDocumentBase, NewItem, SpecializedDocument},
    models::payment::{NewPayment, Payment, PaymentStatus},
    stores::{
        AuthResolver, DocumentStore, PaymentStore, StoreError,
        memory::{InMemoryAuthResolver, InMemoryDocumentStore, InMemoryPaymentStore},
    },
};

/// Raw session token registered for the test user.
pub const SESSION_TOKEN: &str = "itest-session-token";

/// Well-formed CSRF token used for the double-submit pair.
pub const CSRF_TOKEN: &str = "0123456789abcdef0123456789abcdef";

/// HMAC key the test configuration hands to the callback handler.
pub const WEBHOOK_SECRET: &str = "itest-webhook-secret";

/// Which store operations should fail.
#[derive(Debug, Default, Clone, Copy)]
pub struct StoreFailures {
    pub base_insert: bool,
    pub specialized_insert: bool,
    pub items_insert: bool,
    pub document_link: bool,
}

/// The router under test plus handles on everything behind it.
pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    pub payments: InMemoryPaymentStore,
    pub documents: InMemoryDocumentStore,
    pub sessions: InMemoryAuthResolver,
    pub user_id: Uuid,
}

/// Build the app with healthy stores.
pub async fn spawn_app() -> TestApp {
    spawn_app_with(StoreFailures::default()).await
}

/// Build the app with the given store failures armed.
pub async fn spawn_app_with(failures: StoreFailures) -> TestApp {
    let payments = InMemoryPaymentStore::new();
    let documents = InMemoryDocumentStore::new();
    let sessions = InMemoryAuthResolver::new();

    let user_id = Uuid::new_v4();
    sessions
        .insert_session(
            SESSION_TOKEN,
            AuthContext {
                user_id,
                email: "tester@example.com".to_string(),
            },
        )
        .await;

    let state = AppState::new(
        test_config(),
        Arc::new(FailingPaymentStore {
            inner: payments.clone(),
            failures,
        }),
        Arc::new(FailingDocumentStore {
            inner: documents.clone(),
            failures,
        }),
        Arc::new(sessions.clone()),
    )
    .expect("test state should build");

    TestApp {
        router: api_router(state.clone()),
        state,
        payments,
        documents,
        sessions,
        user_id,
    }
}

/// Configuration pointing at hosts that can never resolve, so any test
/// that reaches an outbound client fails fast instead of calling out.
pub fn test_config() -> Config {
    Config {
        database_url: "postgres://unused".to_string(),
        server_port: 0,
        allowed_origin: "http://localhost:5173".to_string(),
        production: false,
        gateway_base_url: "http://gateway.invalid".to_string(),
        gateway_api_key: "itest-gateway-key".to_string(),
        gateway_webhook_secret: WEBHOOK_SECRET.to_string(),
        email_api_url: "http://email.invalid/emails".to_string(),
        email_api_key: "itest-email-key".to_string(),
        email_from: "documentos@example.com".to_string(),
        app_base_url: "http://localhost:5173".to_string(),
    }
}

/// A payment sitting in `aguardando_documento`, ready to finalize.
pub fn awaiting_payment(user_id: Uuid, kind: DocumentKind) -> Payment {
    Payment {
        id: Uuid::new_v4(),
        user_id,
        status: PaymentStatus::AguardandoDocumento,
        tipo_documento: kind,
        moeda: "MZN".to_string(),
        valor_centavos: 150_000,
        documento_id: None,
        retry_count: 0,
        last_retry_at: None,
        paid_at: None,
        gateway_ref: Some(format!("MPESA-{}", Uuid::new_v4().simple())),
        metadata: None,
        created_at: Utc::now(),
    }
}

/// A fully populated invoice payload as JSON.
pub fn fatura_payload(numero: &str) -> Value {
    serde_json::json!({
        "tipo_documento": "fatura",
        "emitente_id": Uuid::new_v4(),
        "destinatario_id": Uuid::new_v4(),
        "numero": numero,
        "itens": [
            { "descricao": "Consultoria (10h)", "quantidade": 10, "preco_unitario_centavos": 150000 }
        ]
    })
}

/// Sign a callback body the way the gateway does.
pub fn sign_callback(secret: &str, body: &[u8]) -> String {
    let mut mac =
        Hmac::<Sha256>::new_from_slice(secret.as_bytes()).expect("HMAC accepts any key length");
    mac.update(body);
    format!("sha256={}", hex::encode(mac.finalize().into_bytes()))
}

/// POST with session cookie and a matching CSRF pair.
pub fn authed_post(path: &str, body: &Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json")
        .header(
            header::COOKIE,
            format!("session_token={SESSION_TOKEN}; csrf_token={CSRF_TOKEN}"),
        )
        .header("x-csrf-token", CSRF_TOKEN)
        .body(Body::from(body.to_string()))
        .expect("request should build")
}

/// GET with session cookie only.
pub fn authed_get(path: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri(path)
        .header(header::COOKIE, format!("session_token={SESSION_TOKEN}"))
        .body(Body::empty())
        .expect("request should build")
}

/// Run a request through the router and decode the JSON body.
pub async fn send(app: &TestApp, request: Request<Body>) -> (StatusCode, Value) {
    let response = app
        .router
        .clone()
        .oneshot(request)
        .await
        .expect("router should respond");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body should read");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("body should be JSON")
    };
    (status, body)
}

/// Run a request and hand back the raw response for header assertions.
pub async fn send_raw(app: &TestApp, request: Request<Body>) -> Response {
    app.router
        .clone()
        .oneshot(request)
        .await
        .expect("router should respond")
}

/// [`PaymentStore`] wrapper that fails selected operations.
#[derive(Clone)]
pub struct FailingPaymentStore {
    pub inner: InMemoryPaymentStore,
    pub failures: StoreFailures,
}

#[async_trait]
impl PaymentStore for FailingPaymentStore {
    async fn insert_pending(&self, payment: &NewPayment) -> Result<Payment, StoreError> {
        self.inner.insert_pending(payment).await
    }

    async fn find_for_user(
        &self,
        payment_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<Payment>, StoreError> {
        self.inner.find_for_user(payment_id, user_id).await
    }

    async fn find_by_gateway_ref(&self, gateway_ref: &str) -> Result<Option<Payment>, StoreError> {
        self.inner.find_by_gateway_ref(gateway_ref).await
    }

    async fn mark_callback_result(
        &self,
        payment_id: Uuid,
        status: PaymentStatus,
    ) -> Result<bool, StoreError> {
        self.inner.mark_callback_result(payment_id, status).await
    }

    async fn find_stuck(
        &self,
        user_id: Uuid,
        max_retries: i32,
        limit: i64,
    ) -> Result<Vec<Payment>, StoreError> {
        self.inner.find_stuck(user_id, max_retries, limit).await
    }

    async fn record_retry_failure(&self, payment_id: Uuid) -> Result<(), StoreError> {
        self.inner.record_retry_failure(payment_id).await
    }

    async fn link_document(
        &self,
        payment_id: Uuid,
        documento_id: Uuid,
        paid_at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        if self.failures.document_link {
            return Err(StoreError::Unavailable("link refused".to_string()));
        }
        self.inner
            .link_document(payment_id, documento_id, paid_at)
            .await
    }
}

/// [`DocumentStore`] wrapper that fails selected operations.
#[derive(Clone)]
pub struct FailingDocumentStore {
    pub inner: InMemoryDocumentStore,
    pub failures: StoreFailures,
}

#[async_trait]
impl DocumentStore for FailingDocumentStore {
    async fn next_numero(&self, user_id: Uuid, kind: DocumentKind) -> Result<String, StoreError> {
        self.inner.next_numero(user_id, kind).await
    }

    async fn insert_base(&self, base: &NewDocumentBase) -> Result<Uuid, StoreError> {
        if self.failures.base_insert {
            return Err(StoreError::Unavailable("base insert refused".to_string()));
        }
        self.inner.insert_base(base).await
    }

    async fn insert_specialized(
        &self,
        documento_id: Uuid,
        doc: &SpecializedDocument,
    ) -> Result<(), StoreError> {
        if self.failures.specialized_insert {
            return Err(StoreError::Unavailable(
                "specialized insert refused".to_string(),
            ));
        }
        self.inner.insert_specialized(documento_id, doc).await
    }

    async fn delete_base(&self, documento_id: Uuid) -> Result<(), StoreError> {
        self.inner.delete_base(documento_id).await
    }

    async fn insert_items(&self, documento_id: Uuid, items: &[NewItem]) -> Result<(), StoreError> {
        if self.failures.items_insert {
            return Err(StoreError::Unavailable("items insert refused".to_string()));
        }
        self.inner.insert_items(documento_id, items).await
    }

    async fn find_base_for_user(
        &self,
        documento_id: Uuid,
        user_id: Uuid,
    ) -> Result<Option<DocumentBase>, StoreError> {
        self.inner.find_base_for_user(documento_id, user_id).await
    }
}
