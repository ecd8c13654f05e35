//! Time source of the execution environment
//!
//! Day boundaries for the spending allowance and signature expiry are both
//! judged against a [`Clock`], so tests can drive time explicitly.

use chrono::{DateTime, Duration, TimeZone, Utc};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

/// Seconds in one allowance day
pub const SECONDS_PER_DAY: i64 = 86_400;

/// Provides the current time to the engine
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Manually driven clock; clones share the same instant
#[derive(Debug, Clone)]
pub struct ManualClock {
    seconds: Arc<AtomicI64>,
}

impl ManualClock {
    /// Start at a unix timestamp (seconds)
    pub fn starting_at(seconds: i64) -> Self {
        Self {
            seconds: Arc::new(AtomicI64::new(seconds)),
        }
    }

    pub fn set(&self, seconds: i64) {
        self.seconds.store(seconds, Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        self.seconds.fetch_add(by.num_seconds(), Ordering::SeqCst);
    }

    pub fn timestamp(&self) -> i64 {
        self.seconds.load(Ordering::SeqCst)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        to_datetime(self.timestamp())
    }
}

/// Index of the day containing `at`, counted from the unix epoch
pub fn day_index(at: DateTime<Utc>) -> i64 {
    at.timestamp().div_euclid(SECONDS_PER_DAY)
}

/// Convert unix seconds to a UTC datetime, clamping out-of-range values to the epoch
pub fn to_datetime(seconds: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(seconds, 0).single().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_manual_clock_shared_between_clones() {
        let clock = ManualClock::starting_at(1_000);
        let other = clock.clone();

        clock.advance(Duration::seconds(50));
        assert_eq!(other.now().timestamp(), 1_050);

        other.set(10);
        assert_eq!(clock.timestamp(), 10);
    }

    #[test]
    fn test_day_index_boundaries() {
        assert_eq!(day_index(to_datetime(0)), 0);
        assert_eq!(day_index(to_datetime(SECONDS_PER_DAY - 1)), 0);
        assert_eq!(day_index(to_datetime(SECONDS_PER_DAY)), 1);
    }
}
