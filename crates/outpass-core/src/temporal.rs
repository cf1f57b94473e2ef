//! # Temporal Types: UTC-Only Timestamps and the Clock
//!
//! Defines [`Timestamp`], a UTC timestamp truncated to seconds precision,
//! and the [`Clock`] abstraction through which every "now" in the system
//! is obtained.
//!
//! ## Invariants
//!
//! - Timestamps are stored and compared in UTC. Inputs carrying an offset
//!   are converted on ingestion ([`Timestamp::parse_lenient`]) or rejected
//!   ([`Timestamp::parse`]).
//! - Rendering is always `YYYY-MM-DDTHH:MM:SSZ`.
//! - Lateness and decision times come from an injected [`Clock`], never
//!   from a direct `Utc::now()` call in domain code.

use std::sync::Arc;

use chrono::{DateTime, Duration, Timelike, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::CoreError;

/// A UTC-only timestamp, truncated to seconds.
///
/// # Construction
///
/// - [`Timestamp::now()`]: current UTC time, truncated.
/// - [`Timestamp::from_utc()`]: from a `DateTime<Utc>`, truncating sub-seconds.
/// - [`Timestamp::parse()`]: from an RFC 3339 string with `Z` suffix.
/// - [`Timestamp::parse_lenient()`]: from an RFC 3339 string with any offset.
///
/// Serializes as the ISO 8601 `Z` string; deserializes leniently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
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

    /// Parse a timestamp from an RFC 3339 string.
    ///
    /// Only the `Z` suffix is accepted; explicit offsets (even `+00:00`)
    /// are rejected.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        if !s.ends_with('Z') {
            return Err(CoreError::InvalidTimestamp(format!(
                "timestamp must use Z suffix (UTC only), got: {s:?}"
            )));
        }
        Self::parse_lenient(s)
    }

    /// Parse a timestamp from an RFC 3339 string, accepting any offset and
    /// converting to UTC.
    pub fn parse_lenient(s: &str) -> Result<Self, CoreError> {
        let dt = DateTime::parse_from_rfc3339(s.trim()).map_err(|e| {
            CoreError::InvalidTimestamp(format!("invalid RFC 3339 timestamp {s:?}: {e}"))
        })?;
        Ok(Self(truncate_to_seconds(dt.with_timezone(&Utc))))
    }

    /// Create a timestamp from a Unix epoch timestamp (seconds).
    pub fn from_epoch_secs(secs: i64) -> Result<Self, CoreError> {
        DateTime::from_timestamp(secs, 0)
            .map(Self)
            .ok_or_else(|| CoreError::InvalidTimestamp(format!("invalid Unix timestamp: {secs}")))
    }

    /// Access the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Returns the Unix epoch timestamp in seconds.
    pub fn epoch_secs(&self) -> i64 {
        self.0.timestamp()
    }

    /// The timestamp shifted by `delta`, saturating at the representable range.
    pub fn offset_by(&self, delta: Duration) -> Self {
        self.0
            .checked_add_signed(delta)
            .map(Self::from_utc)
            .unwrap_or(*self)
    }

    /// Render as ISO 8601 with Z suffix (e.g., `2026-01-15T12:00:00Z`).
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

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_iso8601())
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::parse_lenient(&s).map_err(serde::de::Error::custom)
    }
}

/// Truncate a `DateTime<Utc>` to seconds precision (discard nanoseconds).
fn truncate_to_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(0).unwrap_or(dt)
}

// ─── Clock ───────────────────────────────────────────────────────────

/// Source of the current time.
///
/// Production code injects [`SystemClock`]. Tests inject a [`ManualClock`]
/// to pin decisions and scans to exact instants.
pub trait Clock: Send + Sync + std::fmt::Debug {
    /// The current instant.
    fn now(&self) -> Timestamp;
}

/// Wall-clock time from the operating system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// A clock that only moves when told to.
///
/// Clones share the same underlying instant.
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<Mutex<Timestamp>>,
}

impl ManualClock {
    /// Create a clock frozen at `start`.
    pub fn new(start: Timestamp) -> Self {
        Self {
            now: Arc::new(Mutex::new(start)),
        }
    }

    /// Move the clock to `instant`.
    pub fn set(&self, instant: Timestamp) {
        *self.now.lock() = instant;
    }

    /// Move the clock forward by `delta`.
    pub fn advance(&self, delta: Duration) {
        let mut guard = self.now.lock();
        *guard = guard.offset_by(delta);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Timestamp {
        *self.now.lock()
    }
}
