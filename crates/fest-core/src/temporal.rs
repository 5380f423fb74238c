//! # Temporal Types: UTC-Only Timestamps and Clocks
//!
//! `Timestamp` is a UTC timestamp truncated to seconds precision. All
//! instants in the ticketing stack (registration, review, entry scans) use
//! it, so comparisons are never confused by timezone offsets or sub-second
//! jitter between the store and the caller.
//!
//! Reads of "now" go through the [`Clock`] trait. Production code uses
//! [`SystemClock`]; tests drive the entry cooldown with [`ManualClock`].

use std::sync::Arc;

use chrono::{DateTime, Duration, Timelike, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::error::FestError;

/// A UTC-only timestamp, truncated to seconds precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "DateTime<Utc>")]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Create a timestamp from the current UTC time, truncated to seconds.
    pub fn now() -> Self {
        Self(truncate_to_seconds(Utc::now()))
    }

    /// Create a timestamp from a `chrono::DateTime<Utc>`, truncating sub-seconds.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(truncate_to_seconds(dt))
    }

    /// Parse a timestamp from an RFC 3339 string with a `Z` suffix.
    ///
    /// Explicit offsets (even `+00:00`) are rejected.
    pub fn parse(s: &str) -> Result<Self, FestError> {
        if !s.ends_with('Z') {
            return Err(FestError::Timestamp(format!(
                "timestamp must use Z suffix (UTC only), got: {s:?}"
            )));
        }
        let dt = DateTime::parse_from_rfc3339(s)
            .map_err(|e| FestError::Timestamp(format!("invalid RFC 3339 timestamp {s:?}: {e}")))?;
        Ok(Self(truncate_to_seconds(dt.with_timezone(&Utc))))
    }

    /// Access the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Returns the Unix epoch timestamp in seconds.
    pub fn epoch_secs(&self) -> i64 {
        self.0.timestamp()
    }

    /// Add a duration, returning `None` on overflow.
    pub fn checked_add(&self, duration: Duration) -> Option<Self> {
        self.0.checked_add_signed(duration).map(Self::from_utc)
    }

    /// Signed duration elapsed since `earlier`. Negative if `earlier` is in the future.
    pub fn signed_duration_since(&self, earlier: Timestamp) -> Duration {
        self.0.signed_duration_since(earlier.0)
    }

    /// Render as ISO8601 with Z suffix (e.g., `2026-01-15T12:00:00Z`).
    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(dt: DateTime<Utc>) -> Self {
        Self::from_utc(dt)
    }
}

fn truncate_to_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(0).unwrap_or(dt)
}

// ── Clocks ──────────────────────────────────────────────────────────

/// Source of the current instant.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// The current UTC instant.
    fn now(&self) -> Timestamp;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// A clock that only moves when told to. Clones share the same instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
    current: Arc<Mutex<Timestamp>>,
}

impl ManualClock {
    /// Create a clock frozen at `start`.
    pub fn new(start: Timestamp) -> Self {
        Self {
            current: Arc::new(Mutex::new(start)),
        }
    }

    /// Jump to an absolute instant.
    pub fn set(&self, to: Timestamp) {
        *self.current.lock() = to;
    }

    /// Move forward (or backward, for negative durations).
    pub fn advance(&self, by: Duration) {
        let mut guard = self.current.lock();
        if let Some(next) = guard.checked_add(by) {
            *guard = next;
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.current.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn now_has_no_subseconds() {
        assert_eq!(Timestamp::now().as_datetime().nanosecond(), 0);
    }

    #[test]
    fn from_utc_truncates() {
        let dt = Utc.with_ymd_and_hms(2025, 3, 14, 18, 30, 45).unwrap();
        let ts = Timestamp::from_utc(dt.with_nanosecond(987_654_321).unwrap());
        assert_eq!(ts.to_iso8601(), "2025-03-14T18:30:45Z");
    }

    #[test]
    fn parse_requires_z_suffix() {
        assert!(Timestamp::parse("2025-03-14T18:00:00Z").is_ok());
        assert!(Timestamp::parse("2025-03-14T18:00:00+00:00").is_err());
        assert!(Timestamp::parse("2025-03-14T23:30:00+05:30").is_err());
        assert!(Timestamp::parse("yesterday").is_err());
    }

    #[test]
    fn signed_duration_can_be_negative() {
        let a = Timestamp::parse("2025-03-14T12:00:00Z").unwrap();
        let b = Timestamp::parse("2025-03-14T13:00:00Z").unwrap();
        assert_eq!(b.signed_duration_since(a), Duration::hours(1));
        assert_eq!(a.signed_duration_since(b), Duration::hours(-1));
    }

    #[test]
    fn checked_add_moves_forward() {
        let a = Timestamp::parse("2025-03-14T12:00:00Z").unwrap();
        let b = a.checked_add(Duration::hours(13)).unwrap();
        assert_eq!(b.to_iso8601(), "2025-03-15T01:00:00Z");
    }

    #[test]
    fn manual_clock_is_shared_between_clones() {
        let start = Timestamp::parse("2025-03-14T12:00:00Z").unwrap();
        let clock = ManualClock::new(start);
        let other = clock.clone();
        clock.advance(Duration::minutes(1));
        assert_eq!(other.now().to_iso8601(), "2025-03-14T12:01:00Z");
        other.set(start);
        assert_eq!(clock.now(), start);
    }

    #[test]
    fn serde_roundtrip() {
        let ts = Timestamp::parse("2025-03-14T12:00:00Z").unwrap();
        let json = serde_json::to_string(&ts).unwrap();
        assert_eq!(serde_json::from_str::<Timestamp>(&json).unwrap(), ts);
    }

    #[test]
    fn deserialize_truncates_subseconds() {
        let ts: Timestamp = serde_json::from_str("\"2025-03-14T09:00:00.987Z\"").unwrap();
        assert_eq!(ts, Timestamp::parse("2025-03-14T09:00:00Z").unwrap());
        assert_eq!(ts.as_datetime().nanosecond(), 0);
    }
}
