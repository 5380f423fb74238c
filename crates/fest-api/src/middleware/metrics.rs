//! # Service Metrics
//!
//! In-process atomic counters, rendered as Prometheus text at `/metrics`.

use std::fmt::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use axum::extract::Request;
use axum::http::header;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Extension;

use fest_state::EntryDecision;

/// Shared metrics state.
#[derive(Debug, Clone, Default)]
pub struct ApiMetrics {
    pub request_count: Arc<AtomicU64>,
    pub error_count: Arc<AtomicU64>,
    pub entries_accepted: Arc<AtomicU64>,
    pub entries_duplicate: Arc<AtomicU64>,
    pub entries_not_approved: Arc<AtomicU64>,
    pub entries_not_found: Arc<AtomicU64>,
}

impl ApiMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn requests(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    pub fn errors(&self) -> u64 {
        self.error_count.load(Ordering::Relaxed)
    }

    /// Count one entry decision.
    pub fn record_entry(&self, decision: &EntryDecision) {
        let counter = match decision {
            EntryDecision::Accepted { .. } => &self.entries_accepted,
            EntryDecision::Duplicate { .. } => &self.entries_duplicate,
            EntryDecision::NotApproved { .. } => &self.entries_not_approved,
            EntryDecision::NotFound { .. } => &self.entries_not_found,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Prometheus text exposition.
    pub fn render(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# TYPE fest_http_requests_total counter");
        let _ = writeln!(out, "fest_http_requests_total {}", self.requests());
        let _ = writeln!(out, "# TYPE fest_http_errors_total counter");
        let _ = writeln!(out, "fest_http_errors_total {}", self.errors());
        let _ = writeln!(out, "# TYPE fest_entry_scans_total counter");
        for (outcome, counter) in [
            ("accepted", &self.entries_accepted),
            ("duplicate", &self.entries_duplicate),
            ("not_approved", &self.entries_not_approved),
            ("not_found", &self.entries_not_found),
        ] {
            let _ = writeln!(
                out,
                "fest_entry_scans_total{{outcome=\"{outcome}\"}} {}",
                counter.load(Ordering::Relaxed)
            );
        }
        out
    }
}

/// Middleware that increments request and error counters.
pub async fn metrics_middleware(request: Request, next: Next) -> Response {
    let metrics = request.extensions().get::<ApiMetrics>().cloned();

    let response = next.run(request).await;

    if let Some(m) = metrics {
        m.request_count.fetch_add(1, Ordering::Relaxed);
        if response.status().is_server_error() || response.status().is_client_error() {
            m.error_count.fetch_add(1, Ordering::Relaxed);
        }
    }

    response
}

/// GET /metrics
pub async fn metrics_handler(Extension(metrics): Extension<ApiMetrics>) -> Response {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        metrics.render(),
    )
        .into_response()
}
