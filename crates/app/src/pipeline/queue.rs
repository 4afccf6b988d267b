//! Bounded FIFO job queue
//!
//! Admission reserves a slot before spending quota, so a full queue turns
//! the request away without burning the user's daily allowance. Once full,
//! reservation fails fast; nothing is dropped silently.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::sync::mpsc;

use voxflow_foundation::QueueError;
use voxflow_telemetry::PipelineMetrics;

use crate::job::TranscriptionJob;

/// A reserved queue slot. Dropping it without enqueueing releases the slot.
pub struct QueueSlot {
    permit: mpsc::OwnedPermit<TranscriptionJob>,
}

pub struct JobQueue {
    tx: mpsc::Sender<TranscriptionJob>,
    rx: tokio::sync::Mutex<mpsc::Receiver<TranscriptionJob>>,
    capacity: usize,
    metrics: Arc<PipelineMetrics>,
}

impl JobQueue {
    pub fn new(capacity: usize, metrics: Arc<PipelineMetrics>) -> Self {
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            tx,
            rx: tokio::sync::Mutex::new(rx),
            capacity,
            metrics,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn depth(&self) -> usize {
        self.metrics.queue_depth.load(Ordering::Relaxed)
    }

    /// Fail-fast backpressure: `Full` when every slot is taken.
    pub fn reserve(&self) -> Result<QueueSlot, QueueError> {
        match self.tx.clone().try_reserve_owned() {
            Ok(permit) => Ok(QueueSlot { permit }),
            Err(mpsc::error::TrySendError::Full(_)) => Err(QueueError::Full {
                capacity: self.capacity,
            }),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(QueueError::Closed),
        }
    }

    /// Commit an admitted job into its reserved slot. FIFO by commit order.
    pub fn enqueue(&self, slot: QueueSlot, job: TranscriptionJob) {
        slot.permit.send(job);
        self.metrics.queue_depth.fetch_add(1, Ordering::Relaxed);
    }

    /// Take the next job, suspending until one is available. Returns None
    /// once the queue is closed and drained.
    pub async fn dequeue(&self) -> Option<TranscriptionJob> {
        let mut rx = self.rx.lock().await;
        let job = rx.recv().await;
        if job.is_some() {
            self.metrics.queue_depth.fetch_sub(1, Ordering::Relaxed);
        }
        job
    }

    /// Stop accepting new jobs; already-queued jobs still drain.
    pub async fn close(&self) {
        self.rx.lock().await.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::{OutputFormat, TranscriptionJob};
    use std::path::PathBuf;
    use voxflow_stt::{MediaRef, MediaSource};

    fn job(user: u64) -> (TranscriptionJob, crate::job::JobHandle) {
        let media = MediaSource {
            media: MediaRef::File {
                path: PathBuf::from("/tmp/a.mp3"),
            },
            file_name: "a.mp3".to_string(),
            size_bytes: 100,
            duration_secs: 5,
        };
        TranscriptionJob::new(user, media, vec![OutputFormat::PlainText])
    }

    #[tokio::test]
    async fn fifo_order_is_preserved() {
        let queue = JobQueue::new(8, Arc::new(PipelineMetrics::default()));
        let mut handles = Vec::new();
        for user in [1u64, 2, 3] {
            let (j, h) = job(user);
            let slot = queue.reserve().unwrap();
            queue.enqueue(slot, j);
            handles.push(h);
        }
        for expected in [1u64, 2, 3] {
            let j = queue.dequeue().await.unwrap();
            assert_eq!(j.user_id, expected);
        }
    }

    #[tokio::test]
    async fn full_queue_fails_fast() {
        let queue = JobQueue::new(1, Arc::new(PipelineMetrics::default()));
        let (j, _h) = job(1);
        let slot = queue.reserve().unwrap();
        queue.enqueue(slot, j);

        assert!(matches!(
            queue.reserve(),
            Err(QueueError::Full { capacity: 1 })
        ));
    }

    #[tokio::test]
    async fn dropped_reservation_releases_the_slot() {
        let queue = JobQueue::new(1, Arc::new(PipelineMetrics::default()));
        {
            let _slot = queue.reserve().unwrap();
            assert!(queue.reserve().is_err());
        }
        assert!(queue.reserve().is_ok());
    }

    #[tokio::test]
    async fn close_drains_then_ends() {
        let queue = JobQueue::new(4, Arc::new(PipelineMetrics::default()));
        let (j, _h) = job(9);
        let slot = queue.reserve().unwrap();
        queue.enqueue(slot, j);

        queue.close().await;
        assert!(queue.dequeue().await.is_some());
        assert!(queue.dequeue().await.is_none());
        assert!(matches!(queue.reserve(), Err(QueueError::Closed)));
    }
}
