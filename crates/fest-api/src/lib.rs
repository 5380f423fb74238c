//! # fest-api: Festival Ticketing Service
//!
//! Students register, an administrator approves or rejects them, approved
//! students receive a QR ticket by email, and gate scanners validate those
//! tickets at the venue with a re-entry cooldown.
//!
//! ## API Surface
//!
//! | Prefix                      | Module                      | Access            |
//! |-----------------------------|-----------------------------|-------------------|
//! | `/v1/registrations`         | [`routes::registrations`]   | public            |
//! | `/v1/admin/login`           | [`routes::admin`]           | public            |
//! | `/v1/admin/registrations/*` | [`routes::admin`]           | admin session     |
//! | `/v1/entry/validate`        | [`routes::entry`]           | public, rate-limited |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → [AdminAuth | RateLimit] → Handler
//! ```
//!
//! ## OpenAPI
//!
//! Generated with utoipa and served at `/openapi.json`.

pub mod auth;
pub mod db;
pub mod error;
pub mod extractors;
pub mod lifecycle;
pub mod middleware;
pub mod notify;
pub mod openapi;
pub mod routes;
pub mod state;
pub mod store;

use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::get;
use axum::Router;

use crate::middleware::metrics::ApiMetrics;
use crate::middleware::rate_limit::RateLimiter;
use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
pub fn app(state: AppState) -> Router {
    let metrics = ApiMetrics::new();
    let limiter = RateLimiter::new(state.config.rate_limit.clone());

    let admin = routes::admin::router()
        .layer(from_fn_with_state(state.clone(), auth::admin_auth_middleware));

    let entry = routes::entry::router()
        .layer(from_fn(middleware::rate_limit::rate_limit_middleware));

    Router::new()
        .merge(routes::registrations::router())
        .merge(routes::admin::login_router())
        .merge(admin)
        .merge(entry)
        .merge(openapi::router())
        .route("/health/liveness", get(liveness))
        .route("/health/readiness", get(readiness))
        .route("/metrics", get(middleware::metrics::metrics_handler))
        .layer(from_fn(middleware::metrics::metrics_middleware))
        .layer(middleware::tracing_layer::layer())
        .layer(axum::Extension(metrics))
        .layer(axum::Extension(limiter))
        .with_state(state)
}

/// Liveness probe: 200 while the process runs.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe: 200 once the store answers.
async fn readiness(State(state): State<AppState>) -> (StatusCode, &'static str) {
    match state.repo.ping().await {
        Ok(()) => (StatusCode::OK, "ready"),
        Err(e) => {
            tracing::warn!(error = %e, "readiness check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "store unavailable")
        }
    }
}
