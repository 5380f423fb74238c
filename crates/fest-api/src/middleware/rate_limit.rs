//! # Scanner Rate Limiting
//!
//! Fixed-window limiter for the public entry-validation endpoint, keyed by
//! the TCP peer address. Client-supplied headers are ignored unless
//! [`RateLimitConfig::trust_forwarded_for`] is set, in which case the last
//! `X-Forwarded-For` hop (the one appended by the trusted proxy) is used.
//!
//! In-memory only. Expired windows are swept at most once per window, and
//! the table never holds more than [`RateLimitConfig::max_clients`] keys;
//! a new client arriving at a full table is refused.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::{ConnectInfo, Request};
use axum::http::{header, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum::Json;
use parking_lot::Mutex;

use crate::error::{ErrorBody, ErrorDetail};

/// Key used when neither a peer address nor a trusted hop is known.
const UNKNOWN_PEER: &str = "unknown-peer";

/// Rate limiter configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RateLimitConfig {
    /// Maximum requests per window.
    pub max_requests: u64,
    /// Window duration in seconds.
    pub window_secs: u64,
    /// Upper bound on tracked clients.
    pub max_clients: usize,
    /// Key on the last `X-Forwarded-For` hop instead of the peer address.
    /// Enable only behind a proxy that overwrites the header.
    pub trust_forwarded_for: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 120,
            window_secs: 60,
            max_clients: 10_000,
            trust_forwarded_for: false,
        }
    }
}

#[derive(Debug, Clone)]
struct BucketState {
    count: u64,
    window_start: Instant,
}

#[derive(Debug)]
struct Buckets {
    by_client: HashMap<String, BucketState>,
    last_sweep: Instant,
}

/// Shared rate limiter state.
#[derive(Debug, Clone)]
pub struct RateLimiter {
    config: RateLimitConfig,
    buckets: Arc<Mutex<Buckets>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            buckets: Arc::new(Mutex::new(Buckets {
                by_client: HashMap::new(),
                last_sweep: Instant::now(),
            })),
        }
    }

    fn window(&self) -> Duration {
        Duration::from_secs(self.config.window_secs)
    }

    /// Whether a request from `key` at `now` is allowed. Counts it if so.
    fn check_at(&self, key: &str, now: Instant) -> bool {
        let window = self.window();
        let mut buckets = self.buckets.lock();

        let full = buckets.by_client.len() >= self.config.max_clients;
        if full || now.saturating_duration_since(buckets.last_sweep) >= window {
            buckets
                .by_client
                .retain(|_, b| now.saturating_duration_since(b.window_start) < window);
            buckets.last_sweep = now;
        }

        if !buckets.by_client.contains_key(key)
            && buckets.by_client.len() >= self.config.max_clients
        {
            return false;
        }

        let bucket = buckets
            .by_client
            .entry(key.to_string())
            .or_insert(BucketState {
                count: 0,
                window_start: now,
            });

        if now.saturating_duration_since(bucket.window_start) >= window {
            bucket.count = 0;
            bucket.window_start = now;
        }

        if bucket.count >= self.config.max_requests {
            false
        } else {
            bucket.count += 1;
            true
        }
    }

    fn check(&self, key: &str) -> bool {
        self.check_at(key, Instant::now())
    }

    #[cfg(test)]
    fn tracked_clients(&self) -> usize {
        self.buckets.lock().by_client.len()
    }

    fn client_key(&self, request: &Request) -> String {
        if self.config.trust_forwarded_for {
            let last_hop = request
                .headers()
                .get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.rsplit(',').next())
                .map(str::trim)
                .filter(|v| !v.is_empty());
            if let Some(hop) = last_hop {
                return hop.to_string();
            }
        }
        request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| addr.ip().to_string())
            .unwrap_or_else(|| UNKNOWN_PEER.to_string())
    }
}

/// Middleware that enforces per-client rate limits.
pub async fn rate_limit_middleware(request: Request, next: Next) -> Response {
    let limiter = request.extensions().get::<RateLimiter>().cloned();

    if let Some(limiter) = limiter {
        let key = limiter.client_key(&request);
        if !limiter.check(&key) {
            tracing::warn!(client = %key, "scan rate limit exceeded");
            let body = ErrorBody {
                error: ErrorDetail {
                    code: "RATE_LIMITED".to_string(),
                    message: "rate limit exceeded".to_string(),
                    details: None,
                },
            };
            return (
                StatusCode::TOO_MANY_REQUESTS,
                [(header::RETRY_AFTER, limiter.config.window_secs.to_string())],
                Json(body),
            )
                .into_response();
        }
    }

    next.run(request).await
}
