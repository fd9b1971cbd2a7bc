//! Integration tests for payment initiation and single-payment reads.

mod common;

use axum::http::StatusCode;
use serde_json::json;
use uuid::Uuid;

use billing_document_server::models::document::DocumentKind;

use common::{authed_get, authed_post, awaiting_payment, fatura_payload, send, spawn_app};

#[tokio::test]
async fn initiate_rejects_a_non_positive_amount() {
    let app = spawn_app().await;

    let body = json!({
        "msisdn": "258841234567",
        "valor_centavos": 0,
        "documento": fatura_payload("FAT-2026-0800"),
    });
    let (status, response) = send(&app, authed_post("/api/payments", &body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn initiate_rejects_a_non_numeric_subscriber() {
    let app = spawn_app().await;

    let body = json!({
        "msisdn": "84-123-4567",
        "valor_centavos": 150000,
        "documento": fatura_payload("FAT-2026-0801"),
    });
    let (status, response) = send(&app, authed_post("/api/payments", &body)).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(response["error"]["code"], "VALIDATION_ERROR");
}

#[tokio::test]
async fn initiate_surfaces_an_unreachable_gateway_without_recording_a_payment() {
    let app = spawn_app().await;

    // The test configuration points the gateway client at a host that
    // cannot resolve; the charge fails and nothing may be persisted.
    let body = json!({
        "msisdn": "258841234567",
        "valor_centavos": 150000,
        "documento": fatura_payload("FAT-2026-0802"),
    });
    let (status, response) = send(&app, authed_post("/api/payments", &body)).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(response["error"]["code"], "GATEWAY_ERROR");
}

#[tokio::test]
async fn get_payment_returns_the_client_view() {
    let app = spawn_app().await;
    let payment = awaiting_payment(app.user_id, DocumentKind::Cotacao);
    let payment_id = payment.id;
    app.payments.insert(payment).await;

    let (status, body) = send(&app, authed_get(&format!("/api/payments/{payment_id}"))).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], json!(payment_id));
    assert_eq!(body["data"]["tipo_documento"], "cotacao");
    assert_eq!(body["data"]["valor_centavos"], 150000);
    // Internal fields stay out of the client view.
    assert!(body["data"].get("metadata").is_none());
    assert!(body["data"].get("user_id").is_none());
}

#[tokio::test]
async fn get_payment_hides_other_users_payments() {
    let app = spawn_app().await;
    let payment = awaiting_payment(Uuid::new_v4(), DocumentKind::Fatura);
    let payment_id = payment.id;
    app.payments.insert(payment).await;

    let (status, body) = send(&app, authed_get(&format!("/api/payments/{payment_id}"))).await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "PAYMENT_NOT_FOUND");
}
