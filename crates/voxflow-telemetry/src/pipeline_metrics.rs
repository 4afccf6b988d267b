use parking_lot::RwLock;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

/// Shared metrics for cross-task pipeline monitoring
#[derive(Clone)]
pub struct PipelineMetrics {
    // Queue monitoring
    pub queue_depth: Arc<AtomicUsize>,
    pub active_jobs: Arc<AtomicUsize>,

    // Job outcome counters
    pub jobs_admitted: Arc<AtomicU64>,
    pub jobs_succeeded: Arc<AtomicU64>,
    pub jobs_failed: Arc<AtomicU64>,
    pub jobs_cancelled: Arc<AtomicU64>,

    // Admission rejections by cause
    pub rejected_too_large: Arc<AtomicU64>,
    pub rejected_quota: Arc<AtomicU64>,
    pub rejected_queue_full: Arc<AtomicU64>,

    // Payment reconciliation
    pub payments_applied: Arc<AtomicU64>,
    pub payments_duplicate: Arc<AtomicU64>,

    // Latency tracking
    pub last_job_latency_ms: Arc<AtomicU64>,
    pub last_job_finished: Arc<RwLock<Option<Instant>>>,
}

impl Default for PipelineMetrics {
    fn default() -> Self {
        Self {
            queue_depth: Arc::new(AtomicUsize::new(0)),
            active_jobs: Arc::new(AtomicUsize::new(0)),
            jobs_admitted: Arc::new(AtomicU64::new(0)),
            jobs_succeeded: Arc::new(AtomicU64::new(0)),
            jobs_failed: Arc::new(AtomicU64::new(0)),
            jobs_cancelled: Arc::new(AtomicU64::new(0)),
            rejected_too_large: Arc::new(AtomicU64::new(0)),
            rejected_quota: Arc::new(AtomicU64::new(0)),
            rejected_queue_full: Arc::new(AtomicU64::new(0)),
            payments_applied: Arc::new(AtomicU64::new(0)),
            payments_duplicate: Arc::new(AtomicU64::new(0)),
            last_job_latency_ms: Arc::new(AtomicU64::new(0)),
            last_job_finished: Arc::new(RwLock::new(None)),
        }
    }
}

/// Point-in-time copy of the counters, for the operator stats surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineSnapshot {
    pub queue_depth: usize,
    pub active_jobs: usize,
    pub jobs_admitted: u64,
    pub jobs_succeeded: u64,
    pub jobs_failed: u64,
    pub jobs_cancelled: u64,
    pub rejected_too_large: u64,
    pub rejected_quota: u64,
    pub rejected_queue_full: u64,
    pub payments_applied: u64,
    pub payments_duplicate: u64,
}

impl PipelineMetrics {
    pub fn record_job_finished(&self, latency_ms: u64) {
        self.last_job_latency_ms.store(latency_ms, Ordering::Relaxed);
        *self.last_job_finished.write() = Some(Instant::now());
    }

    pub fn snapshot(&self) -> PipelineSnapshot {
        PipelineSnapshot {
            queue_depth: self.queue_depth.load(Ordering::Relaxed),
            active_jobs: self.active_jobs.load(Ordering::Relaxed),
            jobs_admitted: self.jobs_admitted.load(Ordering::Relaxed),
            jobs_succeeded: self.jobs_succeeded.load(Ordering::Relaxed),
            jobs_failed: self.jobs_failed.load(Ordering::Relaxed),
            jobs_cancelled: self.jobs_cancelled.load(Ordering::Relaxed),
            rejected_too_large: self.rejected_too_large.load(Ordering::Relaxed),
            rejected_quota: self.rejected_quota.load(Ordering::Relaxed),
            rejected_queue_full: self.rejected_queue_full.load(Ordering::Relaxed),
            payments_applied: self.payments_applied.load(Ordering::Relaxed),
            payments_duplicate: self.payments_duplicate.load(Ordering::Relaxed),
        }
    }
}
