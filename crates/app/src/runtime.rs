//! Pipeline runtime
//!
//! Wires the tier store, quota policy, job queue, worker pool and payment
//! reconciler together and hands back a `PipelineHandle`: the surface the
//! front-end submits jobs to, the webhook transport delivers payment
//! events to, and operators query stats from.

use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tracing::{error, info};

use voxflow_foundation::{AppError, AppState, ReconcileError, StateManager};
use voxflow_store::{TierStore, UserId};
use voxflow_stt::backends::{LocalCliConfig, LocalCliFactory, RemoteApiConfig, RemoteApiFactory};
use voxflow_stt::{BackendError, BackendInfo, BackendRegistry, MediaSource, TranscribeBackend};
use voxflow_telemetry::{PipelineMetrics, PipelineSnapshot};

use crate::job::{JobHandle, OutputFormat, TranscriptionJob};
use crate::payments::{PaymentEvent, PaymentReconciler};
use crate::pipeline::{JobQueue, QuotaLimits, QuotaPolicy, WorkerConfig, WorkerPool};
use crate::Settings;

/// Read-only operator view of the running pipeline.
#[derive(Debug, Clone)]
pub struct PipelineStats {
    pub counters: PipelineSnapshot,
    pub backend_id: String,
    pub backend_model: String,
}

pub struct PipelineHandle {
    pub metrics: Arc<PipelineMetrics>,
    quota: QuotaPolicy,
    queue: Arc<JobQueue>,
    workers: WorkerPool,
    reconciler: PaymentReconciler,
    backend_info: BackendInfo,
    state: StateManager,
}

impl PipelineHandle {
    /// Build and start the pipeline: open the store-backed policy, run the
    /// legacy PRO migration, then spawn the workers.
    pub fn start(
        settings: &Settings,
        store: Arc<dyn TierStore>,
        backend: Arc<dyn TranscribeBackend>,
    ) -> Result<Self, AppError> {
        let state = StateManager::new();
        let metrics = Arc::new(PipelineMetrics::default());

        let quota = QuotaPolicy::new(
            store.clone(),
            QuotaLimits {
                max_file_size_bytes: settings.max_file_size_mb * 1024 * 1024,
                free_daily_seconds: settings.free_daily_limit_minutes * 60,
                pro_daily_seconds: settings.pro_daily_limit_minutes * 60,
            },
        );
        let reconciler = PaymentReconciler::new(store, metrics.clone());

        state.transition(AppState::Migrating)?;
        reconciler
            .run_startup_migration(&settings.legacy_pro_user_ids)
            .map_err(|e| AppError::Fatal(format!("legacy PRO migration failed: {e}")))?;

        let backend_info = backend.info();
        let queue = Arc::new(JobQueue::new(settings.queue_capacity, metrics.clone()));
        let workers = WorkerPool::spawn(
            WorkerConfig {
                pool_size: settings.worker_pool_size,
                backend_timeout: Duration::from_secs(settings.backend.timeout_secs),
                language: settings.backend.language.clone(),
            },
            queue.clone(),
            backend,
            metrics.clone(),
        );

        state.transition(AppState::Running)?;
        info!(
            backend = %backend_info.id,
            model = %backend_info.model,
            workers = settings.worker_pool_size,
            queue_capacity = settings.queue_capacity,
            "pipeline running"
        );

        Ok(Self {
            metrics,
            quota,
            queue,
            workers,
            reconciler,
            backend_info,
            state,
        })
    }

    /// Inbound job submission. Reserves a queue slot before spending
    /// quota, so a busy system rejects without charging the user.
    pub fn submit(
        &self,
        user_id: UserId,
        media: MediaSource,
        formats: Vec<OutputFormat>,
    ) -> Result<JobHandle, AppError> {
        use std::sync::atomic::Ordering;

        let slot = self.queue.reserve().map_err(|e| {
            self.metrics
                .rejected_queue_full
                .fetch_add(1, Ordering::Relaxed);
            AppError::Queue(e)
        })?;

        if let Err(reason) = self.quota.admit(user_id, &media) {
            match reason {
                voxflow_foundation::AdmissionError::FileTooLarge { .. } => {
                    self.metrics
                        .rejected_too_large
                        .fetch_add(1, Ordering::Relaxed);
                }
                _ => {
                    self.metrics.rejected_quota.fetch_add(1, Ordering::Relaxed);
                }
            }
            return Err(AppError::Admission(reason));
        }

        let (job, handle) = TranscriptionJob::new(user_id, media, formats);
        info!(job_id = %job.id, user = user_id, file = %job.media.file_name, "job admitted");
        self.metrics
            .jobs_admitted
            .fetch_add(1, Ordering::Relaxed);
        self.queue.enqueue(slot, job);
        Ok(handle)
    }

    /// Deliver a verified payment event. `Ok(false)` is a duplicate.
    pub fn apply_payment(&self, event: &PaymentEvent) -> Result<bool, ReconcileError> {
        self.reconciler.apply(event)
    }

    pub fn stats(&self) -> PipelineStats {
        PipelineStats {
            counters: self.metrics.snapshot(),
            backend_id: self.backend_info.id.clone(),
            backend_model: self.backend_info.model.clone(),
        }
    }

    /// Stop accepting work, drain queued jobs, wait for the workers.
    pub async fn shutdown(self) -> Result<(), AppError> {
        info!("shutting down pipeline...");
        self.state.transition(AppState::Stopping)?;
        self.queue.close().await;
        self.workers.join().await;
        self.state.transition(AppState::Stopped)?;
        info!("pipeline shutdown complete");
        Ok(())
    }

    /// Wait for SIGINT / Ctrl+C.
    pub async fn wait_for_shutdown_signal() {
        match signal::ctrl_c().await {
            Ok(()) => info!("received SIGINT, initiating graceful shutdown"),
            Err(err) => error!("failed to listen for SIGINT: {err}"),
        }
    }
}

/// Construct the configured backend through the registry. Selection is a
/// startup decision; callers only ever see the trait object.
pub fn build_backend(settings: &Settings) -> Result<Arc<dyn TranscribeBackend>, BackendError> {
    let mut registry = BackendRegistry::new();
    registry.register(Box::new(LocalCliFactory::new(LocalCliConfig {
        binary: settings.backend.local_binary.clone().into(),
        model: settings.backend.model.clone(),
        language: settings.backend.language.clone(),
    })));
    registry.register(Box::new(RemoteApiFactory::new(RemoteApiConfig {
        endpoint: settings.backend.remote_endpoint.clone().unwrap_or_default(),
        api_key: settings.backend.remote_api_key.clone().unwrap_or_default(),
        model: settings.backend.model.clone(),
        connect_timeout: Duration::from_secs(10),
    })));
    registry.create(&settings.backend.kind)
}
