//! JSON-snapshot tier store
//!
//! Durable single-file store. The whole account map plus the applied
//! idempotency keys are serialized after every mutation; the write goes to
//! a sibling temp file first and is renamed into place so a crash never
//! leaves a half-written snapshot.

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};

use voxflow_foundation::clock::{utc_clock, SharedClock};

use crate::memory::Accounts;
use crate::types::{Tier, UserId, UserRecord};
use crate::{StoreError, TierStore};

#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    records: HashMap<UserId, UserRecord>,
    applied_keys: HashSet<String>,
}

pub struct JsonTierStore {
    path: PathBuf,
    clock: SharedClock,
    accounts: Mutex<Accounts>,
}

impl JsonTierStore {
    /// Open (or create) the snapshot at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Self::open_with_clock(path, utc_clock())
    }

    pub fn open_with_clock(
        path: impl AsRef<Path>,
        clock: SharedClock,
    ) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let accounts = match fs::read(&path) {
            Ok(bytes) => {
                let snap: Snapshot = serde_json::from_slice(&bytes)
                    .map_err(|e| StoreError::Unavailable(format!("corrupt snapshot: {e}")))?;
                tracing::info!(
                    path = %path.display(),
                    users = snap.records.len(),
                    keys = snap.applied_keys.len(),
                    "tier store loaded"
                );
                Accounts {
                    records: snap.records,
                    applied_keys: snap.applied_keys,
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "starting empty tier store");
                Accounts::default()
            }
            Err(e) => return Err(StoreError::Unavailable(e.to_string())),
        };
        Ok(Self {
            path,
            clock,
            accounts: Mutex::new(accounts),
        })
    }

    /// Serialize under the account lock so snapshots are consistent.
    fn persist(&self, accounts: &Accounts) -> Result<(), StoreError> {
        let snap = Snapshot {
            records: accounts.records.clone(),
            applied_keys: accounts.applied_keys.clone(),
        };
        let bytes = serde_json::to_vec_pretty(&snap)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, &bytes).map_err(|e| StoreError::Unavailable(e.to_string()))?;
        fs::rename(&tmp, &self.path).map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(())
    }
}

impl TierStore for JsonTierStore {
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
        let mut accounts = self.accounts.lock();
        // Mutate a scratch copy and commit only after the snapshot is on
        // disk; a failed write must not charge quota or consume a key.
        let mut next = accounts.clone();
        if !next.try_spend(user, seconds, daily_limit_seconds, today) {
            return Ok(false);
        }
        self.persist(&next)?;
        *accounts = next;
        Ok(true)
    }

    fn set_tier(
        &self,
        user: UserId,
        tier: Tier,
        idempotency_key: &str,
    ) -> Result<bool, StoreError> {
        let today = self.clock.today();
        let mut accounts = self.accounts.lock();
        let mut next = accounts.clone();
        if !next.set_tier(user, tier, idempotency_key, today) {
            return Ok(false);
        }
        self.persist(&next)?;
        *accounts = next;
        tracing::info!(user, ?tier, key = idempotency_key, "tier updated");
        Ok(true)
    }
}
