//! Billing Document Server
//!
//! REST API for turning mobile-money payments into billing documents
//! (invoices, quotes, receipts). A payment is charged through the gateway,
//! confirmed by callback, and then finalized into a document that the
//! payment row points at.
//!
//! # Architecture
//!
//! - **Web Framework**: Axum (async HTTP server)
//! - **Database**: PostgreSQL with sqlx (async queries)
//! - **Authentication**: session tokens with SHA-256 hashing
//! - **Request Guard**: composable rate-limit / auth / CSRF pipeline
//! - **Format**: JSON requests/responses in a `{success, data, error}`
//!   envelope

pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod response;
pub mod services;
pub mod stores;

use std::sync::Arc;
use std::time::Duration;

use axum::{
    Router, middleware as axum_middleware,
    routing::{get, post},
};

use crate::config::Config;
use crate::error::AppError;
use crate::middleware::csrf::CsrfGuard;
use crate::middleware::guard::{GuardConfig, GuardContext, RatePolicy, api_guard};
use crate::middleware::rate_limit::RateLimiter;
use crate::services::email_service::EmailClient;
use crate::services::gateway_service::GatewayClient;
use crate::stores::{AuthResolver, DocumentStore, PaymentStore};

/// Rate policy for endpoints that write.
const MUTATE_RATE: RatePolicy = RatePolicy {
    limit: 20,
    window: Duration::from_secs(60),
};

/// Rate policy for read endpoints.
const READ_RATE: RatePolicy = RatePolicy {
    limit: 60,
    window: Duration::from_secs(60),
};

/// Rate policy for unauthenticated endpoints (callback, CSRF issuing).
const PUBLIC_RATE: RatePolicy = RatePolicy {
    limit: 30,
    window: Duration::from_secs(60),
};

/// Shared application state handed to every handler and guard.
///
/// Stores are trait objects so tests can swap in the in-memory
/// implementations; everything is behind an `Arc`, making the state cheap
/// to clone per request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub payments: Arc<dyn PaymentStore>,
    pub documents: Arc<dyn DocumentStore>,
    pub auth: Arc<dyn AuthResolver>,
    pub limiter: Arc<RateLimiter>,
    pub csrf: Arc<CsrfGuard>,
    pub gateway: Arc<GatewayClient>,
    pub email: Arc<EmailClient>,
}

impl AppState {
    /// Assemble the shared state from configuration and stores.
    ///
    /// # Errors
    ///
    /// Fails when the gateway or email client cannot be constructed from
    /// the configuration (bad URLs).
    pub fn new(
        config: Config,
        payments: Arc<dyn PaymentStore>,
        documents: Arc<dyn DocumentStore>,
        auth: Arc<dyn AuthResolver>,
    ) -> Result<Self, AppError> {
        let gateway = Arc::new(GatewayClient::new(&config)?);
        let email = Arc::new(EmailClient::new(&config)?);
        let csrf = Arc::new(CsrfGuard::new(config.production));

        Ok(Self {
            payments,
            documents,
            auth,
            limiter: Arc::new(RateLimiter::new()),
            csrf,
            gateway,
            email,
            config: Arc::new(config),
        })
    }
}

/// Build the `/api` router with every route behind its guard.
///
/// Each endpoint picks its own [`GuardConfig`]: mutating endpoints require
/// authentication and CSRF, reads require authentication only, and the
/// gateway callback relies on its HMAC signature instead of a session.
/// The `/health` route lives outside this router because it bypasses the
/// guard entirely.
pub fn api_router(state: AppState) -> Router {
    Router::new()
        .merge(guarded_route(
            &state,
            "/api/payments",
            post(handlers::payments::initiate_payment),
            GuardConfig {
                auth: true,
                rate: Some(MUTATE_RATE),
                csrf: true,
                audit_label: "payments.initiate",
            },
        ))
        .merge(guarded_route(
            &state,
            "/api/payments/callback",
            post(handlers::payments::gateway_callback),
            GuardConfig {
                auth: false,
                rate: Some(PUBLIC_RATE),
                csrf: false,
                audit_label: "payments.callback",
            },
        ))
        .merge(guarded_route(
            &state,
            "/api/payments/finalize",
            post(handlers::payments::finalize_payment),
            GuardConfig {
                auth: true,
                rate: Some(MUTATE_RATE),
                csrf: true,
                audit_label: "payments.finalize",
            },
        ))
        .merge(guarded_route(
            &state,
            "/api/payments/retry",
            post(handlers::payments::retry_payments),
            GuardConfig {
                auth: true,
                rate: Some(MUTATE_RATE),
                csrf: true,
                audit_label: "payments.retry",
            },
        ))
        .merge(guarded_route(
            &state,
            "/api/payments/{id}",
            get(handlers::payments::get_payment),
            GuardConfig {
                auth: true,
                rate: Some(READ_RATE),
                csrf: false,
                audit_label: "payments.get",
            },
        ))
        .merge(guarded_route(
            &state,
            "/api/documents/numero",
            get(handlers::documents::next_numero),
            GuardConfig {
                auth: true,
                rate: Some(READ_RATE),
                csrf: false,
                audit_label: "documents.numero",
            },
        ))
        .merge(guarded_route(
            &state,
            "/api/documents/email",
            post(handlers::documents::email_document),
            GuardConfig {
                auth: true,
                rate: Some(MUTATE_RATE),
                csrf: true,
                audit_label: "documents.email",
            },
        ))
        .merge(guarded_route(
            &state,
            "/api/auth/csrf",
            get(handlers::auth::csrf_token),
            GuardConfig {
                auth: false,
                rate: Some(PUBLIC_RATE),
                csrf: false,
                audit_label: "auth.csrf",
            },
        ))
}

/// One route wrapped in the guard middleware with its own configuration.
fn guarded_route(
    state: &AppState,
    path: &str,
    handler: axum::routing::MethodRouter<AppState>,
    config: GuardConfig,
) -> Router {
    Router::new()
        .route(path, handler)
        .route_layer(axum_middleware::from_fn_with_state(
            GuardContext {
                state: state.clone(),
                config,
            },
            api_guard,
        ))
        .with_state(state.clone())
}
