//! Tier and usage store for VoxFlow
//!
//! Holds the durable per-user state: subscription tier, the daily usage
//! counter, and the set of payment idempotency keys that have already been
//! applied. Every mutation is an atomic read-modify-write so concurrent
//! admissions and payment events cannot lose updates.

use thiserror::Error;

pub mod json;
pub mod memory;
pub mod types;

pub use json::JsonTierStore;
pub use memory::MemoryTierStore;
pub use types::{Tier, UserId, UserRecord};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// The persistence contract behind quota checks and payment reconciliation.
///
/// `try_spend` and `set_tier` must be atomic with respect to concurrent
/// callers for the same user; both implementations take a single lock over
/// the account map for the full read-modify-write.
pub trait TierStore: Send + Sync {
    /// Current record for the user, window reset applied. Users are
    /// created lazily; unknown ids read as a fresh FREE account.
    fn get(&self, user: UserId) -> Result<UserRecord, StoreError>;

    /// Atomically spend `seconds` against `daily_limit_seconds` for the
    /// user's current window. Returns false without any increment when
    /// the remaining quota is insufficient.
    fn try_spend(
        &self,
        user: UserId,
        seconds: u64,
        daily_limit_seconds: u64,
    ) -> Result<bool, StoreError>;

    /// Apply a tier change under an idempotency key. Returns false (and
    /// leaves all state untouched) when the key was already consumed.
    fn set_tier(&self, user: UserId, tier: Tier, idempotency_key: &str)
        -> Result<bool, StoreError>;

    /// One-shot migration of a legacy static PRO id list. Keys are derived
    /// from the ids, so repeated startups are no-ops after the first run.
    /// Returns the number of ids newly applied.
    fn migrate_legacy_pro_list(&self, ids: &[UserId]) -> Result<usize, StoreError> {
        let mut applied = 0;
        for &id in ids {
            let key = format!("legacy-migration:{id}");
            if self.set_tier(id, Tier::Pro, &key)? {
                applied += 1;
            }
        }
        Ok(applied)
    }
}
