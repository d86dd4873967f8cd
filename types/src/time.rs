//! Timestamp type used throughout the protocol.
//!
//! Timestamps are Unix epoch seconds (UTC).

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// A Unix timestamp in seconds since epoch (UTC).
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The epoch (time zero).
    pub const EPOCH: Self = Self(0);

    /// The far future, used for issuers without an end of validity.
    pub const MAX: Self = Self(u64::MAX);

    pub fn new(secs: u64) -> Self {
        Self(secs)
    }

    /// Get the current system time as a `Timestamp`.
    ///
    /// A clock set before the epoch reads as the epoch.
    pub fn now() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        Self(secs)
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }

    /// `(year, month)` of this timestamp in UTC, month in `1..=12`.
    pub fn year_month(&self) -> (i32, u32) {
        let secs = i64::try_from(self.0).unwrap_or(i64::MAX);
        let dt = DateTime::<Utc>::from_timestamp(secs, 0).unwrap_or(DateTime::<Utc>::MAX_UTC);
        (dt.year(), dt.month())
    }

    /// Whether both timestamps fall in the same calendar month (UTC).
    pub fn same_month_as(&self, other: Timestamp) -> bool {
        self.year_month() == other.year_month()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

/// Source of the current time, injected so tests can control it.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// The system wall clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn year_month_utc() {
        // 2024-02-29T12:00:00Z
        assert_eq!(Timestamp::new(1_709_208_000).year_month(), (2024, 2));
        assert_eq!(Timestamp::EPOCH.year_month(), (1970, 1));
    }

    #[test]
    fn month_boundary() {
        // 2024-01-31T23:59:59Z and 2024-02-01T00:00:00Z
        let jan = Timestamp::new(1_706_745_599);
        let feb = Timestamp::new(1_706_745_600);
        assert!(!jan.same_month_as(feb));
        assert!(feb.same_month_as(Timestamp::new(1_706_745_600 + 86_400)));
    }
}
