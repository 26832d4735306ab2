//! Timestamps and the clock abstraction.
//!
//! Timestamps are Unix epoch seconds (UTC). The wire format renders
//! them as RFC 3339 strings. Anything that needs "now" takes a
//! [`Clock`] so tests can drive time deterministically.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// A Unix timestamp in seconds since epoch (UTC).
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const EPOCH: Self = Self(0);

    pub fn new(secs: u64) -> Self {
        Self(secs)
    }

    /// Current system time.
    pub fn now() -> Self {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();
        Self(secs)
    }

    pub fn as_secs(&self) -> u64 {
        self.0
    }

    pub fn plus_secs(&self, secs: u64) -> Self {
        Self(self.0.saturating_add(secs))
    }

    /// Seconds from this timestamp until `deadline` (0 if already past).
    pub fn remaining_until(&self, deadline: Timestamp) -> u64 {
        deadline.0.saturating_sub(self.0)
    }

    /// Whether `deadline` has passed relative to this timestamp.
    pub fn has_passed(&self, deadline: Timestamp) -> bool {
        self.0 >= deadline.0
    }

    /// RFC 3339 rendering for the live-update wire format.
    pub fn to_rfc3339(&self) -> String {
        DateTime::<Utc>::from_timestamp(self.0 as i64, 0)
            .unwrap_or_else(|| DateTime::<Utc>::from_timestamp(0, 0).expect("epoch is valid"))
            .to_rfc3339()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}s", self.0)
    }
}

/// Source of "now". The engine and oracle take this as a trait object
/// so expiry logic is testable without real waiting.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// The production clock: reads the system time.
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
    fn remaining_saturates_at_zero() {
        let now = Timestamp::new(100);
        assert_eq!(now.remaining_until(Timestamp::new(160)), 60);
        assert_eq!(now.remaining_until(Timestamp::new(40)), 0);
    }

    #[test]
    fn has_passed_is_inclusive() {
        let now = Timestamp::new(100);
        assert!(now.has_passed(Timestamp::new(100)));
        assert!(now.has_passed(Timestamp::new(99)));
        assert!(!now.has_passed(Timestamp::new(101)));
    }

    #[test]
    fn rfc3339_rendering() {
        assert_eq!(Timestamp::new(0).to_rfc3339(), "1970-01-01T00:00:00+00:00");
        assert_eq!(
            Timestamp::new(1_700_000_000).to_rfc3339(),
            "2023-11-14T22:13:20+00:00"
        );
    }
}
