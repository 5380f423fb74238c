//! # Middleware
//!
//! - `metrics`: request, error and entry-outcome counters.
//! - `rate_limit`: fixed-window limiter for the public scanning endpoint.
//! - `tracing_layer`: per-request spans via `tower-http`.

pub mod metrics;
pub mod rate_limit;
pub mod tracing_layer;
