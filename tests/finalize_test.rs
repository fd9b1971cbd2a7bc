//! Integration tests for POST /api/payments/finalize.
//!
//! Drives the full pipeline through the router: idempotency, status gate,
//! payload validation, the compensating delete, and retry accounting.

mod common;

use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

use billing_document_server::models::document::{DocumentKind, SpecializedDocument};
use billing_document_server::models::payment::PaymentStatus;

use common::{
    StoreFailures, authed_post, awaiting_payment, fatura_payload, send, spawn_app, spawn_app_with,
};

#[tokio::test]
async fn finalize_creates_and_links_a_fatura() {
    let app = spawn_app().await;
    let payment = awaiting_payment(app.user_id, DocumentKind::Fatura);
    let payment_id = payment.id;
    app.payments.insert(payment).await;

    let body = json!({
        "payment_id": payment_id,
        "documento": fatura_payload("FAT-2026-0042"),
    });
    let (status, body) = send(&app, authed_post("/api/payments/finalize", &body)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["already_associated"], false);
    assert_eq!(body["data"]["status"], "associado");

    let documento_id: Uuid = serde_json::from_value(body["data"]["documento_id"].clone())
        .expect("documento_id should be a uuid");

    let stored = app.payments.get(payment_id).await.expect("payment exists");
    assert_eq!(stored.status, PaymentStatus::Pago);
    assert_eq!(stored.documento_id, Some(documento_id));
    assert!(stored.paid_at.is_some());
    assert_eq!(stored.retry_count, 0);

    let base = app.documents.base(documento_id).await.expect("base exists");
    assert_eq!(base.numero, "FAT-2026-0042");
    assert_eq!(base.moeda, "MZN");
    assert_eq!(base.status, "emitido");
    assert_eq!(base.user_id, app.user_id);

    assert_eq!(
        app.documents.specialized_kind(documento_id).await,
        Some(DocumentKind::Fatura)
    );
    let items = app.documents.items(documento_id).await;
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].descricao, "Consultoria (10h)");
}

#[tokio::test]
async fn finalize_recibo_inherits_the_gateway_reference() {
    let app = spawn_app().await;
    let mut payment = awaiting_payment(app.user_id, DocumentKind::Recibo);
    payment.gateway_ref = Some("MPESA-REF-9".to_string());
    let payment_id = payment.id;
    app.payments.insert(payment).await;

    let body = json!({
        "payment_id": payment_id,
        "documento": {
            "tipo_documento": "recibo",
            "emitente_id": Uuid::new_v4(),
            "destinatario_id": Uuid::new_v4(),
            "numero": "REC-2026-0001",
        },
    });
    let (status, body) = send(&app, authed_post("/api/payments/finalize", &body)).await;

    assert_eq!(status, StatusCode::OK);
    let documento_id: Uuid = serde_json::from_value(body["data"]["documento_id"].clone())
        .expect("documento_id should be a uuid");

    match app
        .documents
        .specialized(documento_id)
        .await
        .expect("specialized row exists")
    {
        SpecializedDocument::Recibo {
            metodo_pagamento,
            referencia_pagamento,
        } => {
            assert_eq!(metodo_pagamento, "mpesa");
            assert_eq!(referencia_pagamento.as_deref(), Some("MPESA-REF-9"));
        }
        other => panic!("expected a receipt, got {other:?}"),
    }
}

#[tokio::test]
async fn finalize_replay_returns_the_linked_document_without_writes() {
    let app = spawn_app().await;
    let payment = awaiting_payment(app.user_id, DocumentKind::Fatura);
    let payment_id = payment.id;
    app.payments.insert(payment).await;

    let body = json!({
        "payment_id": payment_id,
        "documento": fatura_payload("FAT-2026-0050"),
    });
    let (first_status, first) = send(&app, authed_post("/api/payments/finalize", &body)).await;
    assert_eq!(first_status, StatusCode::OK);
    assert_eq!(app.documents.base_count().await, 1);

    let (second_status, second) = send(&app, authed_post("/api/payments/finalize", &body)).await;
    assert_eq!(second_status, StatusCode::OK);
    assert_eq!(second["data"]["already_associated"], true);
    assert_eq!(
        second["data"]["documento_id"], first["data"]["documento_id"],
        "replay must return the original document"
    );

    // No second document, no retry accounting.
    assert_eq!(app.documents.base_count().await, 1);
    let stored = app.payments.get(payment_id).await.expect("payment exists");
    assert_eq!(stored.retry_count, 0);
}

#[tokio::test]
async fn finalize_refuses_payments_outside_the_awaiting_state() {
    let app = spawn_app().await;

    for status in [PaymentStatus::Pendente, PaymentStatus::Falhado] {
        let mut payment = awaiting_payment(app.user_id, DocumentKind::Fatura);
        payment.status = status;
        let payment_id = payment.id;
        app.payments.insert(payment).await;

        let body = json!({
            "payment_id": payment_id,
            "documento": fatura_payload("FAT-2026-0060"),
        });
        let (http_status, body) = send(&app, authed_post("/api/payments/finalize", &body)).await;

        assert_eq!(http_status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["code"], "INVALID_STATUS");
        assert_eq!(
            body["error"]["message"]
                .as_str()
                .expect("message is a string")
                .contains(status.as_str()),
            true
        );
    }

    assert_eq!(app.documents.base_count().await, 0);
}

#[tokio::test]
async fn finalize_unknown_payment_is_not_found() {
    let app = spawn_app().await;

    let body = json!({
        "payment_id": Uuid::new_v4(),
        "documento": fatura_payload("FAT-2026-0001"),
    });
    let (status, body) = send(&app, authed_post("/api/payments/finalize", &body)).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "PAYMENT_NOT_FOUND");
}

#[tokio::test]
async fn finalize_cannot_touch_another_users_payment() {
    let app = spawn_app().await;
    let payment = awaiting_payment(Uuid::new_v4(), DocumentKind::Fatura);
    let payment_id = payment.id;
    app.payments.insert(payment).await;

    let body = json!({
        "payment_id": payment_id,
        "documento": fatura_payload("FAT-2026-0002"),
    });
    let (status, body) = send(&app, authed_post("/api/payments/finalize", &body)).await;

    // Ownership failures are indistinguishable from missing payments.
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "PAYMENT_NOT_FOUND");
    let stored = app.payments.get(payment_id).await.expect("payment exists");
    assert_eq!(stored.status, PaymentStatus::AguardandoDocumento);
}

#[tokio::test]
async fn finalize_reports_missing_document_fields() {
    let app = spawn_app().await;
    let payment = awaiting_payment(app.user_id, DocumentKind::Fatura);
    let payment_id = payment.id;
    app.payments.insert(payment).await;

    let body = json!({
        "payment_id": payment_id,
        "documento": {
            "tipo_documento": "fatura",
            "emitente_id": Uuid::new_v4(),
        },
    });
    let (status, body) = send(&app, authed_post("/api/payments/finalize", &body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "DOCUMENT_FIELDS_MISSING");
    assert_eq!(
        body["error"]["details"]["missing"],
        json!(["destinatario_id", "numero"])
    );

    // A rejected payload is the client's fault, not a failed attempt.
    let stored = app.payments.get(payment_id).await.expect("payment exists");
    assert_eq!(stored.retry_count, 0);
    assert_eq!(app.documents.base_count().await, 0);
}

#[tokio::test]
async fn finalize_rejects_a_payload_of_the_wrong_kind() {
    let app = spawn_app().await;
    let payment = awaiting_payment(app.user_id, DocumentKind::Fatura);
    let payment_id = payment.id;
    app.payments.insert(payment).await;

    let body = json!({
        "payment_id": payment_id,
        "documento": {
            "tipo_documento": "recibo",
            "emitente_id": Uuid::new_v4(),
            "destinatario_id": Uuid::new_v4(),
            "numero": "REC-2026-0001",
        },
    });
    let (status, body) = send(&app, authed_post("/api/payments/finalize", &body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "VALIDATION_ERROR");
    assert_eq!(app.documents.base_count().await, 0);
}

#[tokio::test]
async fn finalize_base_insert_failure_counts_a_retry() {
    let app = spawn_app_with(StoreFailures {
        base_insert: true,
        ..Default::default()
    })
    .await;
    let payment = awaiting_payment(app.user_id, DocumentKind::Fatura);
    let payment_id = payment.id;
    app.payments.insert(payment).await;

    let body = json!({
        "payment_id": payment_id,
        "documento": fatura_payload("FAT-2026-0070"),
    });
    let (status, body) = send(&app, authed_post("/api/payments/finalize", &body)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "DOCUMENT_CREATE_FAILED");

    let stored = app.payments.get(payment_id).await.expect("payment exists");
    assert_eq!(stored.status, PaymentStatus::AguardandoDocumento);
    assert_eq!(stored.retry_count, 1);
    assert!(stored.last_retry_at.is_some());
    assert_eq!(app.documents.base_count().await, 0);
}

#[tokio::test]
async fn finalize_specialized_failure_rolls_back_the_base_row() {
    let app = spawn_app_with(StoreFailures {
        specialized_insert: true,
        ..Default::default()
    })
    .await;
    let payment = awaiting_payment(app.user_id, DocumentKind::Fatura);
    let payment_id = payment.id;
    app.payments.insert(payment).await;

    let body = json!({
        "payment_id": payment_id,
        "documento": fatura_payload("FAT-2026-0071"),
    });
    let (status, body) = send(&app, authed_post("/api/payments/finalize", &body)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "DOCUMENT_SPECIALIZED_FAILED");

    // The compensating delete removed the half-created document.
    assert_eq!(app.documents.base_count().await, 0);
    let stored = app.payments.get(payment_id).await.expect("payment exists");
    assert_eq!(stored.retry_count, 1);
    assert_eq!(stored.documento_id, None);
}

#[tokio::test]
async fn finalize_keeps_the_document_when_items_fail() {
    let app = spawn_app_with(StoreFailures {
        items_insert: true,
        ..Default::default()
    })
    .await;
    let payment = awaiting_payment(app.user_id, DocumentKind::Fatura);
    let payment_id = payment.id;
    app.payments.insert(payment).await;

    let body = json!({
        "payment_id": payment_id,
        "documento": fatura_payload("FAT-2026-0072"),
    });
    let (status, body) = send(&app, authed_post("/api/payments/finalize", &body)).await;

    // Item loss is tolerated; the association still happens.
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["already_associated"], false);

    let documento_id: Uuid = serde_json::from_value(body["data"]["documento_id"].clone())
        .expect("documento_id should be a uuid");
    assert!(app.documents.items(documento_id).await.is_empty());

    let stored = app.payments.get(payment_id).await.expect("payment exists");
    assert_eq!(stored.status, PaymentStatus::Pago);
    assert_eq!(stored.retry_count, 0);
}

#[tokio::test]
async fn finalize_link_failure_leaves_the_document_for_retry() {
    let app = spawn_app_with(StoreFailures {
        document_link: true,
        ..Default::default()
    })
    .await;
    let payment = awaiting_payment(app.user_id, DocumentKind::Fatura);
    let payment_id = payment.id;
    app.payments.insert(payment).await;

    let body = json!({
        "payment_id": payment_id,
        "documento": fatura_payload("FAT-2026-0073"),
    });
    let (status, body) = send(&app, authed_post("/api/payments/finalize", &body)).await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body["error"]["code"], "PAYMENT_UPDATE_FAILED");

    // The document exists but the payment was not linked or charged a retry.
    assert_eq!(app.documents.base_count().await, 1);
    let stored = app.payments.get(payment_id).await.expect("payment exists");
    assert_eq!(stored.status, PaymentStatus::AguardandoDocumento);
    assert_eq!(stored.documento_id, None);
    assert_eq!(stored.retry_count, 0);
}
