//! Wall-clock source.
//!
//! Sanction expiry and inactivity are computed against [`Clock::now`] so the
//! time can be driven explicitly.

use std::sync::Mutex;

use chrono::{DateTime, Duration, TimeDelta, Utc};

/// Largest day count accepted for sanctions, retention and inactivity.
pub const MAX_DAYS: i64 = 1_000_000;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// The system clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    now: Mutex<DateTime<Utc>>,
}

impl ManualClock {
    #[must_use]
    pub const fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        *now += by;
    }

    pub fn set(&self, to: DateTime<Utc>) {
        let mut now = self.now.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        *now = to;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// `at` moved `days` forward, `None` if the result is not representable.
#[must_use]
pub fn days_after(at: DateTime<Utc>, days: i64) -> Option<DateTime<Utc>> {
    TimeDelta::try_days(days).and_then(|delta| at.checked_add_signed(delta))
}

/// `at` moved `days` back, `None` if the result is not representable.
#[must_use]
pub fn days_before(at: DateTime<Utc>, days: i64) -> Option<DateTime<Utc>> {
    TimeDelta::try_days(days).and_then(|delta| at.checked_sub_signed(delta))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn day_shifts_are_checked() {
        let start = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        assert_eq!(days_after(start, 3), Some(start + Duration::days(3)));
        assert_eq!(days_before(start, 3), Some(start - Duration::days(3)));
        assert!(days_after(start, MAX_DAYS).is_some());
        assert!(days_before(start, MAX_DAYS).is_some());

        assert_eq!(days_after(start, i64::from(i32::MAX)), None);
        assert_eq!(days_before(start, i64::from(i32::MAX)), None);
        assert_eq!(days_before(start, 999_999_999_999_999), None);
    }

    #[test]
    fn manual_clock_advances() {
        let start = Utc::now();
        let clock = ManualClock::new(start);
        clock.advance(Duration::days(2));
        assert_eq!(clock.now(), start + Duration::days(2));
    }
}
