//! Worker pool
//!
//! A fixed number of tokio tasks drain the job queue. Dequeue transfers
//! exclusive ownership of a job to one worker; the backend call runs in a
//! spawned task so a panic is contained to that job, and is bounded by the
//! configured timeout. Failed jobs are terminal; nothing re-enqueues them.

use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use voxflow_stt::{BackendError, TranscribeBackend, TranscribeOptions, Transcript};
use voxflow_telemetry::PipelineMetrics;

use crate::job::{
    JobOutcome, JobResult, JobStatus, OutputFormat, RenderedOutput, TranscriptionJob,
};
use crate::pipeline::queue::JobQueue;

#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub pool_size: usize,
    pub backend_timeout: Duration,
    /// Language hint forwarded to the backend on every call.
    pub language: Option<String>,
}

pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    pub fn spawn(
        config: WorkerConfig,
        queue: Arc<JobQueue>,
        backend: Arc<dyn TranscribeBackend>,
        metrics: Arc<PipelineMetrics>,
    ) -> Self {
        let handles = (0..config.pool_size)
            .map(|worker_id| {
                let queue = queue.clone();
                let backend = backend.clone();
                let metrics = metrics.clone();
                let config = config.clone();
                tokio::spawn(async move {
                    worker_loop(worker_id, config, queue, backend, metrics).await;
                })
            })
            .collect();
        Self { handles }
    }

    /// Wait for every worker to finish draining. Call after closing the queue.
    pub async fn join(self) {
        for handle in self.handles {
            let _ = handle.await;
        }
    }
}

async fn worker_loop(
    worker_id: usize,
    config: WorkerConfig,
    queue: Arc<JobQueue>,
    backend: Arc<dyn TranscribeBackend>,
    metrics: Arc<PipelineMetrics>,
) {
    info!(worker_id, "worker started");
    while let Some(job) = queue.dequeue().await {
        // Queued -> Running is atomic with JobHandle::cancel; losing the
        // race means the job is already Cancelled and never runs.
        if !job.begin_running() {
            metrics.jobs_cancelled.fetch_add(1, Ordering::Relaxed);
            deliver(job, JobOutcome::Cancelled);
            continue;
        }

        metrics.active_jobs.fetch_add(1, Ordering::Relaxed);
        let queued_ms = job.admitted_at.elapsed().as_millis() as u64;
        let started = std::time::Instant::now();

        let result = run_isolated(&config, backend.clone(), &job).await;
        let elapsed_ms = started.elapsed().as_millis() as u64;
        metrics.active_jobs.fetch_sub(1, Ordering::Relaxed);
        metrics.record_job_finished(elapsed_ms);

        match result {
            Ok(transcript) => {
                job.set_status(JobStatus::Succeeded);
                metrics.jobs_succeeded.fetch_add(1, Ordering::Relaxed);
                info!(
                    worker_id,
                    job_id = %job.id,
                    queued_ms,
                    elapsed_ms,
                    words = transcript.word_count(),
                    "job succeeded"
                );
                let outputs = render(&transcript, &job.formats);
                deliver(
                    job,
                    JobOutcome::Succeeded(JobResult {
                        transcript,
                        outputs,
                        processing_ms: elapsed_ms,
                    }),
                );
            }
            Err(err) => {
                job.set_status(JobStatus::Failed);
                metrics.jobs_failed.fetch_add(1, Ordering::Relaxed);
                warn!(worker_id, job_id = %job.id, queued_ms, code = err.code(), %err, "job failed");
                deliver(job, JobOutcome::Failed(err));
            }
        }
    }
    info!(worker_id, "worker stopped");
}

/// Run one backend call in its own task so a panic cannot take the worker
/// down, bounded by the configured timeout.
async fn run_isolated(
    config: &WorkerConfig,
    backend: Arc<dyn TranscribeBackend>,
    job: &TranscriptionJob,
) -> Result<Transcript, BackendError> {
    let media = job.media.clone();
    let options = TranscribeOptions {
        language: config.language.clone(),
    };
    let mut call = tokio::spawn(async move { backend.transcribe(&media, &options).await });

    match tokio::time::timeout(config.backend_timeout, &mut call).await {
        Err(_) => {
            call.abort();
            Err(BackendError::Timeout {
                timeout_secs: config.backend_timeout.as_secs(),
            })
        }
        Ok(Err(join_err)) => {
            error!(job_id = %job.id, %join_err, "backend task fault");
            Err(BackendError::Internal(format!(
                "backend task fault: {join_err}"
            )))
        }
        Ok(Ok(result)) => result,
    }
}

fn render(transcript: &Transcript, formats: &[OutputFormat]) -> Vec<RenderedOutput> {
    formats
        .iter()
        .map(|&format| RenderedOutput {
            format,
            text: match format {
                OutputFormat::PlainText => transcript.format_plain(),
                OutputFormat::Timestamped => transcript.format_timestamped(),
            },
        })
        .collect()
}

fn deliver(job: TranscriptionJob, outcome: JobOutcome) {
    // The submitter may have dropped the handle; that is their loss only
    if job.outcome_tx.send(outcome).is_err() {
        tracing::debug!(job_id = %job.id, "outcome discarded, handle dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::job::TranscriptionJob;
    use std::path::PathBuf;
    use voxflow_stt::backends::mock::{MockBackend, MockOutcome};
    use voxflow_stt::{MediaRef, MediaSource};

    fn media() -> MediaSource {
        MediaSource {
            media: MediaRef::File {
                path: PathBuf::from("/tmp/a.mp3"),
            },
            file_name: "a.mp3".to_string(),
            size_bytes: 100,
            duration_secs: 5,
        }
    }

    fn pool(
        backend: Arc<dyn TranscribeBackend>,
        timeout: Duration,
    ) -> (Arc<JobQueue>, WorkerPool, Arc<PipelineMetrics>) {
        let metrics = Arc::new(PipelineMetrics::default());
        let queue = Arc::new(JobQueue::new(8, metrics.clone()));
        let workers = WorkerPool::spawn(
            WorkerConfig {
                pool_size: 1,
                backend_timeout: timeout,
                language: None,
            },
            queue.clone(),
            backend,
            metrics.clone(),
        );
        (queue, workers, metrics)
    }

    #[tokio::test]
    async fn job_runs_to_success_with_rendered_outputs() {
        let backend = Arc::new(MockBackend::with_transcript("hello"));
        let (queue, workers, metrics) = pool(backend, Duration::from_secs(5));

        let (job, handle) = TranscriptionJob::new(
            1,
            media(),
            vec![OutputFormat::PlainText, OutputFormat::Timestamped],
        );
        let slot = queue.reserve().unwrap();
        queue.enqueue(slot, job);

        match handle.outcome().await.unwrap() {
            JobOutcome::Succeeded(result) => {
                assert_eq!(result.transcript.text, "hello");
                assert_eq!(result.outputs.len(), 2);
                assert_eq!(result.outputs[0].text, "hello");
                assert_eq!(result.outputs[1].text, "[0s-5s] hello");
            }
            other => panic!("expected success, got {other:?}"),
        }
        assert_eq!(metrics.snapshot().jobs_succeeded, 1);

        queue.close().await;
        workers.join().await;
    }

    #[tokio::test]
    async fn timeout_fails_the_job_but_not_the_next_one() {
        let backend = Arc::new(MockBackend::new(
            voxflow_stt::backends::mock::MockBackendConfig {
                outcome: MockOutcome::Succeed("second job fine".to_string()),
                fail_on_calls: vec![1],
            },
        ));
        let (queue, workers, metrics) = pool(backend, Duration::from_secs(5));

        let (j1, h1) = TranscriptionJob::new(1, media(), vec![OutputFormat::PlainText]);
        let (j2, h2) = TranscriptionJob::new(2, media(), vec![OutputFormat::PlainText]);
        let slot = queue.reserve().unwrap();
        queue.enqueue(slot, j1);
        let slot = queue.reserve().unwrap();
        queue.enqueue(slot, j2);

        assert!(matches!(
            h1.outcome().await.unwrap(),
            JobOutcome::Failed(BackendError::Timeout { .. })
        ));
        assert!(matches!(
            h2.outcome().await.unwrap(),
            JobOutcome::Succeeded(_)
        ));
        let snap = metrics.snapshot();
        assert_eq!(snap.jobs_failed, 1);
        assert_eq!(snap.jobs_succeeded, 1);

        queue.close().await;
        workers.join().await;
    }

    #[tokio::test]
    async fn slow_backend_hits_the_deadline() {
        let backend = Arc::new(MockBackend::with_outcome(MockOutcome::Slow(
            Duration::from_secs(30),
        )));
        let (queue, workers, _metrics) = pool(backend, Duration::from_millis(50));

        let (job, handle) = TranscriptionJob::new(1, media(), vec![OutputFormat::PlainText]);
        let slot = queue.reserve().unwrap();
        queue.enqueue(slot, job);

        assert!(matches!(
            handle.outcome().await.unwrap(),
            JobOutcome::Failed(BackendError::Timeout { timeout_secs: 0 })
        ));

        queue.close().await;
        workers.join().await;
    }

    #[tokio::test]
    async fn backend_panic_is_contained_to_the_job() {
        let backend = Arc::new(MockBackend::with_outcome(MockOutcome::Panic));
        let (queue, workers, metrics) = pool(backend.clone(), Duration::from_secs(5));

        let (j1, h1) = TranscriptionJob::new(1, media(), vec![OutputFormat::PlainText]);
        let slot = queue.reserve().unwrap();
        queue.enqueue(slot, j1);

        assert!(matches!(
            h1.outcome().await.unwrap(),
            JobOutcome::Failed(BackendError::Internal(_))
        ));
        assert_eq!(metrics.snapshot().jobs_failed, 1);

        // the pool is still alive and draining
        queue.close().await;
        workers.join().await;
    }

    #[tokio::test]
    async fn cancelled_job_never_reaches_the_backend() {
        let backend = Arc::new(MockBackend::with_transcript("never"));
        let calls = backend.call_counter();
        let metrics = Arc::new(PipelineMetrics::default());
        let queue = Arc::new(JobQueue::new(8, metrics.clone()));

        let (job, handle) = TranscriptionJob::new(1, media(), vec![OutputFormat::PlainText]);
        let slot = queue.reserve().unwrap();
        queue.enqueue(slot, job);
        assert!(handle.cancel());

        // start the worker only after cancellation so the job is still queued
        let workers = WorkerPool::spawn(
            WorkerConfig {
                pool_size: 1,
                backend_timeout: Duration::from_secs(5),
                language: None,
            },
            queue.clone(),
            backend,
            metrics.clone(),
        );

        assert!(matches!(
            handle.outcome().await.unwrap(),
            JobOutcome::Cancelled
        ));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(metrics.snapshot().jobs_cancelled, 1);

        queue.close().await;
        workers.join().await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn cancel_racing_the_dequeue_keeps_its_promise() {
        // Whichever side wins the Queued->{Running,Cancelled} transition,
        // a successful cancel means the backend was never invoked.
        for _ in 0..50 {
            let backend = Arc::new(MockBackend::with_transcript("raced"));
            let calls = backend.call_counter();
            let metrics = Arc::new(PipelineMetrics::default());
            let queue = Arc::new(JobQueue::new(8, metrics.clone()));
            let workers = WorkerPool::spawn(
                WorkerConfig {
                    pool_size: 1,
                    backend_timeout: Duration::from_secs(5),
                    language: None,
                },
                queue.clone(),
                backend,
                metrics.clone(),
            );

            let (job, handle) = TranscriptionJob::new(1, media(), vec![OutputFormat::PlainText]);
            let slot = queue.reserve().unwrap();
            queue.enqueue(slot, job);
            let won = handle.cancel();

            match handle.outcome().await.unwrap() {
                JobOutcome::Cancelled => {
                    assert!(won);
                    assert_eq!(calls.load(Ordering::SeqCst), 0);
                }
                JobOutcome::Succeeded(_) => assert!(!won),
                other => panic!("unexpected outcome {other:?}"),
            }

            queue.close().await;
            workers.join().await;
        }
    }
}
