//! Transcription job model
//!
//! A job is a transient in-memory transit unit: created at admission,
//! carried through the queue, and discarded after its outcome is delivered
//! on the per-job oneshot channel. Durable state lives in the tier store.

use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::oneshot;
use uuid::Uuid;

use voxflow_store::UserId;
use voxflow_stt::{BackendError, MediaSource, Transcript};

/// Output renderings a submitter can ask for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    PlainText,
    Timestamped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobStatus {
    Queued,
    Running,
    Succeeded,
    Failed,
    Cancelled,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderedOutput {
    pub format: OutputFormat,
    pub text: String,
}

#[derive(Debug)]
pub struct JobResult {
    pub transcript: Transcript,
    pub outputs: Vec<RenderedOutput>,
    pub processing_ms: u64,
}

/// Terminal outcome delivered to whoever holds the job handle. Failure is
/// final; resubmission is the caller's decision.
#[derive(Debug)]
pub enum JobOutcome {
    Succeeded(JobResult),
    Failed(BackendError),
    Cancelled,
}

/// The queue's unit of work. Ownership moves from the queue to exactly one
/// worker at dequeue.
pub struct TranscriptionJob {
    pub id: Uuid,
    pub user_id: UserId,
    pub media: MediaSource,
    pub formats: Vec<OutputFormat>,
    pub admitted_at: Instant,
    pub(crate) status: Arc<RwLock<JobStatus>>,
    pub(crate) outcome_tx: oneshot::Sender<JobOutcome>,
}

impl TranscriptionJob {
    /// Build a job plus the handle the submitter keeps.
    pub fn new(user_id: UserId, media: MediaSource, formats: Vec<OutputFormat>) -> (Self, JobHandle) {
        let id = Uuid::new_v4();
        let status = Arc::new(RwLock::new(JobStatus::Queued));
        let (outcome_tx, outcome_rx) = oneshot::channel();

        let job = Self {
            id,
            user_id,
            media,
            formats,
            admitted_at: Instant::now(),
            status: status.clone(),
            outcome_tx,
        };
        let handle = JobHandle {
            id,
            status,
            outcome_rx,
        };
        (job, handle)
    }

    /// Atomically take the job for execution: Queued becomes Running.
    /// Returns false when a cancel won the race, in which case the job
    /// must be discarded without invoking the backend.
    pub(crate) fn begin_running(&self) -> bool {
        let mut status = self.status.write();
        if *status == JobStatus::Queued {
            *status = JobStatus::Running;
            true
        } else {
            false
        }
    }

    pub(crate) fn set_status(&self, status: JobStatus) {
        *self.status.write() = status;
    }

    pub fn status(&self) -> JobStatus {
        self.status.read().clone()
    }
}

/// Submitter-side view of an admitted job. Await `outcome()` for the
/// terminal result; `cancel()` works only while the job is still queued.
#[derive(Debug)]
pub struct JobHandle {
    pub id: Uuid,
    status: Arc<RwLock<JobStatus>>,
    outcome_rx: oneshot::Receiver<JobOutcome>,
}

impl JobHandle {
    pub fn status(&self) -> JobStatus {
        self.status.read().clone()
    }

    /// Request cancellation. The status transition is atomic with the
    /// worker's Queued-to-Running takeover, so `true` guarantees the
    /// backend is never invoked for this job; once a worker has taken
    /// (or finished) the job, cancellation is refused.
    pub fn cancel(&self) -> bool {
        let mut status = self.status.write();
        if *status == JobStatus::Queued {
            *status = JobStatus::Cancelled;
            true
        } else {
            false
        }
    }

    /// Wait for the terminal outcome. Errors only if the pipeline was
    /// torn down before the job reached a worker.
    pub async fn outcome(self) -> Result<JobOutcome, oneshot::error::RecvError> {
        self.outcome_rx.await
    }
}
