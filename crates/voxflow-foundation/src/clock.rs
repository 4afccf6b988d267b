//! Clock abstraction so quota-window boundaries are testable without
//! waiting for midnight.

use chrono::{NaiveDate, Utc};
use parking_lot::Mutex;
use std::sync::Arc;

/// Source of "today" for quota accounting. Windows are fixed UTC
/// calendar days.
pub trait QuotaClock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Wall-clock implementation.
pub struct UtcClock;

impl QuotaClock for UtcClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// Settable clock for deterministic tests.
pub struct TestClock {
    today: Mutex<NaiveDate>,
}

impl TestClock {
    pub fn new(today: NaiveDate) -> Self {
        Self {
            today: Mutex::new(today),
        }
    }

    pub fn set_today(&self, date: NaiveDate) {
        *self.today.lock() = date;
    }

    /// Advance the clock by whole days.
    pub fn advance_days(&self, days: u64) {
        let mut today = self.today.lock();
        *today += chrono::Duration::days(days as i64);
    }
}

impl QuotaClock for TestClock {
    fn today(&self) -> NaiveDate {
        *self.today.lock()
    }
}

pub type SharedClock = Arc<dyn QuotaClock>;

pub fn utc_clock() -> SharedClock {
    Arc::new(UtcClock)
}
