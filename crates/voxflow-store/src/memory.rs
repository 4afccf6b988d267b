//! In-memory tier store
//!
//! Non-durable fallback used when no store path is configured, and the
//! workhorse for tests. Semantics are identical to the JSON store.

use chrono::NaiveDate;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};

use voxflow_foundation::clock::{utc_clock, SharedClock};

use crate::types::{Tier, UserId, UserRecord};
use crate::{StoreError, TierStore};

#[derive(Default, Clone)]
pub(crate) struct Accounts {
    pub records: HashMap<UserId, UserRecord>,
    pub applied_keys: HashSet<String>,
}

impl Accounts {
    /// Record with the window reset folded in. Does not insert.
    pub fn effective(&self, user: UserId, today: NaiveDate) -> UserRecord {
        match self.records.get(&user) {
            Some(rec) if rec.window_start == today => rec.clone(),
            Some(rec) => UserRecord {
                tier: rec.tier,
                used_seconds: 0,
                window_start: today,
            },
            None => UserRecord::fresh(today),
        }
    }

    pub fn try_spend(
        &mut self,
        user: UserId,
        seconds: u64,
        daily_limit_seconds: u64,
        today: NaiveDate,
    ) -> bool {
        let mut rec = self.effective(user, today);
        if rec.used_seconds.saturating_add(seconds) > daily_limit_seconds {
            return false;
        }
        rec.used_seconds += seconds;
        self.records.insert(user, rec);
        true
    }

    pub fn set_tier(&mut self, user: UserId, tier: Tier, key: &str, today: NaiveDate) -> bool {
        if self.applied_keys.contains(key) {
            return false;
        }
        let mut rec = self.effective(user, today);
        rec.tier = tier;
        self.records.insert(user, rec);
        self.applied_keys.insert(key.to_string());
        true
    }
}

pub struct MemoryTierStore {
    clock: SharedClock,
    accounts: Mutex<Accounts>,
}

impl Default for MemoryTierStore {
    fn default() -> Self {
        Self::new(utc_clock())
    }
}

impl MemoryTierStore {
    pub fn new(clock: SharedClock) -> Self {
        Self {
            clock,
            accounts: Mutex::new(Accounts::default()),
        }
    }
}

impl TierStore for MemoryTierStore {
    fn get(&self, user: UserId) -> Result<UserRecord, StoreError> {
        let today = self.clock.today();
        Ok(self.accounts.lock().effective(user, today))
    }

    fn try_spend(
        &self,
        user: UserId,
        seconds: u64,
        daily_limit_seconds: u64,
    ) -> Result<bool, StoreError> {
        let today = self.clock.today();
        Ok(self
            .accounts
            .lock()
            .try_spend(user, seconds, daily_limit_seconds, today))
    }

    fn set_tier(
        &self,
        user: UserId,
        tier: Tier,
        idempotency_key: &str,
    ) -> Result<bool, StoreError> {
        let today = self.clock.today();
        let applied = self
            .accounts
            .lock()
            .set_tier(user, tier, idempotency_key, today);
        if applied {
            tracing::info!(user, ?tier, key = idempotency_key, "tier updated");
        }
        Ok(applied)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use voxflow_foundation::clock::TestClock;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn store_at(date: NaiveDate) -> (MemoryTierStore, Arc<TestClock>) {
        let clock = Arc::new(TestClock::new(date));
        (MemoryTierStore::new(clock.clone()), clock)
    }

    #[test]
    fn unknown_user_reads_as_fresh_free_account() {
        let (store, _) = store_at(day(2026, 3, 1));
        let rec = store.get(42).unwrap();
        assert_eq!(rec.tier, Tier::Free);
        assert_eq!(rec.used_seconds, 0);
    }

    #[test]
    fn spend_up_to_limit_then_reject() {
        let (store, _) = store_at(day(2026, 3, 1));
        assert!(store.try_spend(1, 1200, 1800).unwrap());
        assert!(store.try_spend(1, 600, 1800).unwrap());
        // exactly at the limit now; any further spend fails
        assert!(!store.try_spend(1, 1, 1800).unwrap());
        // rejection must not have incremented usage
        assert_eq!(store.get(1).unwrap().used_seconds, 1800);
    }

    #[test]
    fn window_reset_refreshes_quota() {
        let (store, clock) = store_at(day(2026, 3, 1));
        assert!(store.try_spend(1, 1800, 1800).unwrap());
        assert!(!store.try_spend(1, 60, 1800).unwrap());

        clock.advance_days(1);
        assert_eq!(store.get(1).unwrap().used_seconds, 0);
        assert!(store.try_spend(1, 60, 1800).unwrap());
    }

    #[test]
    fn tier_survives_window_reset() {
        let (store, clock) = store_at(day(2026, 3, 1));
        assert!(store.set_tier(1, Tier::Pro, "pay:1").unwrap());
        clock.advance_days(3);
        assert_eq!(store.get(1).unwrap().tier, Tier::Pro);
    }

    #[test]
    fn set_tier_is_idempotent_per_key() {
        let (store, _) = store_at(day(2026, 3, 1));
        assert!(store.set_tier(7, Tier::Pro, "yookassa:abc").unwrap());
        assert!(!store.set_tier(7, Tier::Pro, "yookassa:abc").unwrap());
        assert_eq!(store.get(7).unwrap().tier, Tier::Pro);
    }

    #[test]
    fn legacy_migration_applies_once() {
        let (store, _) = store_at(day(2026, 3, 1));
        assert_eq!(store.migrate_legacy_pro_list(&[42, 7]).unwrap(), 2);
        assert_eq!(store.migrate_legacy_pro_list(&[42, 7]).unwrap(), 0);
        assert_eq!(store.get(42).unwrap().tier, Tier::Pro);
        assert_eq!(store.get(7).unwrap().tier, Tier::Pro);
    }

    #[test]
    fn concurrent_spends_admit_exactly_remaining_quota() {
        let (store, _) = store_at(day(2026, 3, 1));
        let store = Arc::new(store);
        // 5 admits worth of quota, 16 contenders
        let limit = 5 * 60;
        let handles: Vec<_> = (0..16)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || store.try_spend(9, 60, limit).unwrap())
            })
            .collect();
        let successes = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|&admitted| admitted)
            .count();
        assert_eq!(successes, 5);
        assert_eq!(store.get(9).unwrap().used_seconds, limit);
    }
}
