//! Account types shared by every store implementation

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Opaque user identifier assigned by the front-end.
pub type UserId = u64;

/// Subscription tier. Upgrades happen only through a verified payment
/// event or the legacy-list migration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Pro,
}

impl Default for Tier {
    fn default() -> Self {
        Self::Free
    }
}

/// One user's durable state. `window_start` is the UTC calendar day the
/// usage counter belongs to; a record from an earlier day reads as zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRecord {
    pub tier: Tier,
    pub used_seconds: u64,
    pub window_start: NaiveDate,
}

impl UserRecord {
    pub fn fresh(today: NaiveDate) -> Self {
        Self {
            tier: Tier::Free,
            used_seconds: 0,
            window_start: today,
        }
    }
}
