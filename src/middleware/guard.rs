//! Composable request guard for API routes.
//!
//! Every API route group runs this middleware with its own
//! [`GuardConfig`]. The pipeline order is fixed:
//!
//! 1. Rate limiting (cheapest check, before any identity work)
//! 2. Authentication (injects [`AuthContext`](super::auth::AuthContext))
//! 3. CSRF verification (mutating methods only)
//! 4. The handler itself
//! 5. Audit log record, written for failures and successes alike
//!
//! A failed step short-circuits: later steps and the handler never run.

use std::time::{Duration, Instant};

use axum::{
    extract::{Request, State},
    http::{HeaderMap, Method},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::AppState;
use crate::error::AppError;

use super::auth::resolve_identity;
use super::cookies::extract_cookie;
use super::csrf::{CSRF_COOKIE, CSRF_HEADER, CsrfGuard};

/// Rate limit policy for one route group.
#[derive(Debug, Clone, Copy)]
pub struct RatePolicy {
    /// Requests allowed per window
    pub limit: usize,
    /// Window length
    pub window: Duration,
}

/// Which protections a route group opts into.
#[derive(Debug, Clone)]
pub struct GuardConfig {
    /// Require an authenticated identity
    pub auth: bool,
    /// Rate limit applied per client identifier, if any
    pub rate: Option<RatePolicy>,
    /// Verify CSRF tokens on mutating methods
    pub csrf: bool,
    /// Label stamped on every audit record for this group
    pub audit_label: &'static str,
}

/// State handed to the guard: the shared application state plus the route
/// group's configuration.
#[derive(Clone)]
pub struct GuardContext {
    pub state: AppState,
    pub config: GuardConfig,
}

/// The guard middleware function.
///
/// Rejections are converted to responses here instead of bubbling up, so
/// the audit record at the end covers denied requests too.
pub async fn api_guard(State(ctx): State<GuardContext>, mut request: Request, next: Next) -> Response {
    let started = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let response = match enforce(&ctx, &mut request).await {
        Ok(()) => next.run(request).await,
        Err(err) => err.into_response(),
    };

    let elapsed_ms = started.elapsed().as_millis() as u64;
    tracing::info!(
        target: "audit",
        label = ctx.config.audit_label,
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        elapsed_ms,
        success = response.status().is_success(),
        "request completed"
    );

    response
}

/// Run the configured checks against the request.
async fn enforce(ctx: &GuardContext, request: &mut Request) -> Result<(), AppError> {
    let config = &ctx.config;

    // Step 1: Rate limit, before any identity work is spent on the client
    if let Some(policy) = config.rate {
        let identifier = client_identifier(request.headers());
        if ctx
            .state
            .limiter
            .check(policy.limit, policy.window, &identifier)
        {
            tracing::warn!(
                target: "security",
                identifier = %identifier,
                path = %request.uri().path(),
                "rate limit exceeded"
            );
            return Err(AppError::RateLimited);
        }
    }

    // Step 2: Authentication
    if config.auth {
        let identity = resolve_identity(ctx.state.auth.as_ref(), request.headers())
            .await?
            .ok_or(AppError::Unauthorized)?;
        // Handlers extract this via Extension<AuthContext>
        request.extensions_mut().insert(identity);
    }

    // Step 3: CSRF, only for methods that change state
    if config.csrf && is_mutating(request.method()) {
        let headers = request.headers();
        let header_token = headers.get(CSRF_HEADER).and_then(|h| h.to_str().ok());
        let cookie_token = extract_cookie(headers, CSRF_COOKIE);

        if !CsrfGuard::verify(header_token, cookie_token.as_deref()) {
            // Token values stay out of the logs.
            tracing::warn!(
                target: "security",
                method = %request.method(),
                path = %request.uri().path(),
                header_present = header_token.is_some(),
                cookie_present = cookie_token.is_some(),
                "csrf validation failed"
            );
            return Err(AppError::CsrfFailed);
        }
    }

    Ok(())
}

/// Identify the client for rate limiting.
///
/// Takes the first entry of `x-forwarded-for` (the original client as
/// reported by the proxy) and falls back to a shared bucket when the
/// header is absent.
fn client_identifier(headers: &HeaderMap) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|ip| ip.trim().to_string())
        .filter(|ip| !ip.is_empty())
        .unwrap_or_else(|| "anonymous".to_string())
}

/// CSRF applies to everything except safe read methods.
fn is_mutating(method: &Method) -> bool {
    !matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}
