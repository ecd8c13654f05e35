//! Daily spending allowance for single-owner transfers

use crate::core::{day_index, Amount};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Allowance ceiling, spend so far and the day it was last reset
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DailyLimitTracker {
    limit: Amount,
    spent_today: Amount,
    last_reset: DateTime<Utc>,
}

impl DailyLimitTracker {
    pub fn new(limit: Amount, now: DateTime<Utc>) -> Self {
        Self {
            limit,
            spent_today: 0,
            last_reset: now,
        }
    }

    pub fn limit(&self) -> Amount {
        self.limit
    }

    /// Spend recorded at `now`, treating a crossed day boundary as zero
    pub fn spent_at(&self, now: DateTime<Utc>) -> Amount {
        if self.is_new_day(now) {
            0
        } else {
            self.spent_today
        }
    }

    /// Allowance left at `now`
    pub fn remaining_at(&self, now: DateTime<Utc>) -> Amount {
        self.limit.saturating_sub(self.spent_at(now))
    }

    pub fn last_reset(&self) -> DateTime<Utc> {
        self.last_reset
    }

    /// Whether `amount` fits in today's allowance; resets the spend first if
    /// a day boundary was crossed since the last reset
    pub fn within_limit(&mut self, amount: Amount, now: DateTime<Utc>) -> bool {
        self.roll_over(now);
        self.spent_today
            .checked_add(amount)
            .map_or(false, |total| total <= self.limit)
    }

    /// Check and record `amount` in one step
    pub fn try_reserve(&mut self, amount: Amount, now: DateTime<Utc>) -> bool {
        if !self.within_limit(amount, now) {
            return false;
        }
        self.spent_today += amount;
        true
    }

    /// Change the ceiling; spend already recorded today is kept
    pub fn set_limit(&mut self, limit: Amount) {
        self.limit = limit;
    }

    pub fn reset_spent(&mut self, now: DateTime<Utc>) {
        self.spent_today = 0;
        self.last_reset = now;
    }

    fn is_new_day(&self, now: DateTime<Utc>) -> bool {
        day_index(now) > day_index(self.last_reset)
    }

    fn roll_over(&mut self, now: DateTime<Utc>) {
        if self.is_new_day(now) {
            log::debug!("New allowance day, resetting spent amount {}", self.spent_today);
            self.reset_spent(now);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{to_datetime, SECONDS_PER_DAY};

    const DAY_START: i64 = 20_000 * SECONDS_PER_DAY;

    #[test]
    fn test_reserve_within_limit() {
        let now = to_datetime(DAY_START + 10);
        let mut tracker = DailyLimitTracker::new(100, now);

        assert!(tracker.try_reserve(60, now));
        assert_eq!(tracker.spent_at(now), 60);
        assert!(!tracker.try_reserve(41, now));
        assert_eq!(tracker.spent_at(now), 60);
        assert!(tracker.try_reserve(40, now));
        assert_eq!(tracker.remaining_at(now), 0);
    }

    #[test]
    fn test_zero_limit_allows_only_zero() {
        let now = to_datetime(DAY_START);
        let mut tracker = DailyLimitTracker::new(0, now);
        assert!(!tracker.try_reserve(1, now));
        assert!(tracker.try_reserve(0, now));
    }

    #[test]
    fn test_day_boundary_resets_spend() {
        let morning = to_datetime(DAY_START + 100);
        let mut tracker = DailyLimitTracker::new(100, morning);
        assert!(tracker.try_reserve(100, morning));

        let late = to_datetime(DAY_START + SECONDS_PER_DAY - 1);
        assert!(!tracker.within_limit(1, late));

        let next_day = to_datetime(DAY_START + SECONDS_PER_DAY);
        assert_eq!(tracker.spent_at(next_day), 0);
        assert!(tracker.try_reserve(100, next_day));
        assert_eq!(tracker.last_reset(), next_day);
    }

    #[test]
    fn test_lowering_limit_keeps_spend() {
        let now = to_datetime(DAY_START);
        let mut tracker = DailyLimitTracker::new(100, now);
        assert!(tracker.try_reserve(80, now));

        tracker.set_limit(50);
        assert_eq!(tracker.spent_at(now), 80);
        assert_eq!(tracker.remaining_at(now), 0);
        assert!(!tracker.within_limit(1, now));
    }

    #[test]
    fn test_overflow_is_not_within_limit() {
        let now = to_datetime(DAY_START);
        let mut tracker = DailyLimitTracker::new(u64::MAX, now);
        assert!(tracker.try_reserve(u64::MAX, now));
        assert!(!tracker.within_limit(1, now));
    }
}
