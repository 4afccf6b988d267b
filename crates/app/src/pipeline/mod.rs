pub mod queue;
pub mod quota;
pub mod worker;

pub use queue::JobQueue;
pub use quota::{QuotaLimits, QuotaPolicy};
pub use worker::{WorkerConfig, WorkerPool};
