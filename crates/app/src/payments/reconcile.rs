//! Payment reconciliation
//!
//! Applies verified payment events to the tier store, and runs the
//! one-shot migration of the legacy static PRO list at startup. Both paths
//! lean on the store's idempotency keys, so duplicate webhook deliveries
//! and repeated process restarts are no-ops.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

use voxflow_foundation::ReconcileError;
use voxflow_store::{Tier, TierStore, UserId};
use voxflow_telemetry::PipelineMetrics;

use crate::payments::PaymentEvent;

pub struct PaymentReconciler {
    store: Arc<dyn TierStore>,
    metrics: Arc<PipelineMetrics>,
}

impl PaymentReconciler {
    pub fn new(store: Arc<dyn TierStore>, metrics: Arc<PipelineMetrics>) -> Self {
        Self { store, metrics }
    }

    /// Upgrade the paying user to PRO. `Ok(false)` means the event was a
    /// duplicate delivery and nothing changed.
    pub fn apply(&self, event: &PaymentEvent) -> Result<bool, ReconcileError> {
        let key = event.idempotency_key();
        let applied = self
            .store
            .set_tier(event.user_id, Tier::Pro, &key)
            .map_err(|e| ReconcileError::StoreUnavailable(e.to_string()))?;

        if applied {
            self.metrics.payments_applied.fetch_add(1, Ordering::Relaxed);
            info!(
                user = event.user_id,
                provider = %event.provider,
                amount = event.amount,
                "payment applied, user upgraded to PRO"
            );
        } else {
            self.metrics
                .payments_duplicate
                .fetch_add(1, Ordering::Relaxed);
            info!(
                user = event.user_id,
                key = %key,
                "duplicate payment delivery ignored"
            );
        }
        Ok(applied)
    }

    /// Migrate the legacy static PRO id list into the store. Runs exactly
    /// once per process start, before any payment event is accepted.
    pub fn run_startup_migration(&self, legacy_ids: &[UserId]) -> Result<usize, ReconcileError> {
        if legacy_ids.is_empty() {
            info!("no legacy PRO ids configured, skipping migration");
            return Ok(0);
        }
        let applied = self
            .store
            .migrate_legacy_pro_list(legacy_ids)
            .map_err(|e| ReconcileError::StoreUnavailable(e.to_string()))?;
        info!(
            configured = legacy_ids.len(),
            applied, "legacy PRO migration finished"
        );
        Ok(applied)
    }
}
