//! Time provider abstraction
//!
//! New profiles are stamped with a join date. The [`Clock`] trait lets the
//! reconciler use real time in production and a [`FixedClock`] in tests.

use std::fmt::Debug;

use chrono::{DateTime, SecondsFormat, Utc};

/// A time provider for join-date timestamps.
pub trait Clock: Send + Sync + Debug {
    /// Current time as ISO-8601 UTC with milliseconds, e.g. `2026-10-19T08:30:00.000Z`.
    fn now_iso(&self) -> String;
}

/// Production clock using real system time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_iso(&self) -> String {
        format_iso(Utc::now())
    }
}

/// Clock frozen at a single instant.
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    at: DateTime<Utc>,
}

impl FixedClock {
    pub fn new(at: DateTime<Utc>) -> Self {
        Self { at }
    }

    /// Clock frozen at `millis` since the Unix epoch. Out-of-range values clamp to the epoch.
    pub fn from_millis(millis: i64) -> Self {
        Self::new(DateTime::from_timestamp_millis(millis).unwrap_or_default())
    }
}

impl Clock for FixedClock {
    fn now_iso(&self) -> String {
        format_iso(self.at)
    }
}

fn format_iso(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}
