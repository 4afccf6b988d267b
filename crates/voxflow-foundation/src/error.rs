use thiserror::Error;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Admission rejected: {0}")]
    Admission(#[from] AdmissionError),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Fatal error, cannot recover: {0}")]
    Fatal(String),
}

/// Why a submission was turned away before it became a job.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AdmissionError {
    #[error("File of {size_bytes} bytes exceeds the {limit_bytes} byte ceiling")]
    FileTooLarge { size_bytes: u64, limit_bytes: u64 },

    #[error("Daily quota exhausted ({limit_seconds}s limit)")]
    QuotaExceeded { limit_seconds: u64 },

    #[error("Usage store unavailable, rejecting")]
    StoreUnavailable,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueueError {
    #[error("Job queue is full ({capacity} pending)")]
    Full { capacity: usize },

    #[error("Job queue is closed")]
    Closed,
}

/// Payment reconciliation failures. A duplicate idempotency key is not an
/// error; `apply` reports it as `Ok(false)`.
#[derive(Error, Debug)]
pub enum ReconcileError {
    #[error("Tier store unavailable: {0}")]
    StoreUnavailable(String),
}
