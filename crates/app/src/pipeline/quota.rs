//! Admission control
//!
//! The decision order matters: the absolute size ceiling is checked first
//! (independent of tier), then the atomic spend against the tier's daily
//! limit. Store failure rejects the request rather than admitting for free.

use std::sync::Arc;

use voxflow_foundation::AdmissionError;
use voxflow_store::{Tier, TierStore, UserId};
use voxflow_stt::MediaSource;

#[derive(Debug, Clone, Copy)]
pub struct QuotaLimits {
    pub max_file_size_bytes: u64,
    pub free_daily_seconds: u64,
    pub pro_daily_seconds: u64,
}

pub struct QuotaPolicy {
    store: Arc<dyn TierStore>,
    limits: QuotaLimits,
}

impl QuotaPolicy {
    pub fn new(store: Arc<dyn TierStore>, limits: QuotaLimits) -> Self {
        Self { store, limits }
    }

    pub fn daily_limit_for(&self, tier: Tier) -> u64 {
        match tier {
            Tier::Free => self.limits.free_daily_seconds,
            Tier::Pro => self.limits.pro_daily_seconds,
        }
    }

    /// Admit or reject a request. On admission the usage has already been
    /// spent atomically; rejections leave counters untouched.
    pub fn admit(&self, user: UserId, media: &MediaSource) -> Result<(), AdmissionError> {
        // Ceiling is inclusive: exactly at the limit passes
        if media.size_bytes > self.limits.max_file_size_bytes {
            return Err(AdmissionError::FileTooLarge {
                size_bytes: media.size_bytes,
                limit_bytes: self.limits.max_file_size_bytes,
            });
        }

        let record = self
            .store
            .get(user)
            .map_err(|_| AdmissionError::StoreUnavailable)?;
        let limit = self.daily_limit_for(record.tier);

        match self.store.try_spend(user, media.duration_secs, limit) {
            Ok(true) => Ok(()),
            Ok(false) => Err(AdmissionError::QuotaExceeded {
                limit_seconds: limit,
            }),
            // Fail closed: an outage must not grant unbounded free usage
            Err(_) => Err(AdmissionError::StoreUnavailable),
        }
    }
}
