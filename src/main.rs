//! Billing Document Server - Main Application Entry Point
//!
//! Loads configuration, connects to PostgreSQL, runs migrations and serves
//! the API. Routing and shared state live in the library crate so the
//! integration tests can drive the same router against in-memory stores.
//!
//! # Startup Flow
//!
//! 1. Load configuration from environment variables
//! 2. Create database connection pool
//! 3. Run database migrations
//! 4. Build the guarded HTTP router
//! 5. Start server on configured port

use std::sync::Arc;

use axum::{
    Router,
    http::{HeaderName, HeaderValue, Method, header},
    routing::get,
};
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::EnvFilter;

use billing_document_server::{
    AppState, api_router,
    config::Config,
    db,
    handlers::health::health_check,
    middleware::csrf::CSRF_HEADER,
    stores::{
        AuthResolver, DocumentStore, PaymentStore,
        postgres::{PgAuthResolver, PgDocumentStore, PgPaymentStore},
    },
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging with tracing subscriber. Reads RUST_LOG environment variable (defaults to "info" level)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    // Load configuration
    let config = Config::from_env()?;
    tracing::info!("Configuration loaded");

    // Create database pool
    let pool = db::create_pool(&config.database_url).await?;
    tracing::info!("Database pool created");

    // Run migrations
    db::run_migrations(&pool).await?;
    tracing::info!("Database migrations complete");

    let payments: Arc<dyn PaymentStore> = Arc::new(PgPaymentStore::new(pool.clone()));
    let documents: Arc<dyn DocumentStore> = Arc::new(PgDocumentStore::new(pool.clone()));
    let auth: Arc<dyn AuthResolver> = Arc::new(PgAuthResolver::new(pool.clone()));

    let allowed_origin = config.allowed_origin.clone();
    let server_port = config.server_port;
    let state = AppState::new(config, payments, documents, auth)?;

    // The frontend sends session cookies and the CSRF header cross-origin,
    // so the origin must be explicit and credentials allowed.
    let cors = CorsLayer::new()
        .allow_origin(allowed_origin.parse::<HeaderValue>()?)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE, HeaderName::from_static(CSRF_HEADER)])
        .allow_credentials(true);

    let app = Router::new()
        // Public routes (no guard)
        .route("/health", get(health_check))
        .with_state(pool)
        // Merge guarded API routes
        .merge(api_router(state))
        // Add distributed tracing middleware for observability
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Bind to network address and start server
    let addr = format!("0.0.0.0:{}", server_port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    // Start serving HTTP requests
    // This blocks forever, handling requests concurrently with tokio
    axum::serve(listener, app).await?;

    Ok(())
}
