//! Mock backend for testing the pipeline

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::backend::{
    BackendError, BackendFactory, BackendInfo, TranscribeBackend, TranscribeOptions,
};
use crate::media::MediaSource;
use crate::types::{Segment, Transcript};

/// What the mock should do per call.
#[derive(Debug, Clone)]
pub enum MockOutcome {
    Succeed(String),
    Timeout,
    Unavailable,
    /// Panic inside the backend call, for worker isolation tests.
    Panic,
    /// Sleep this long before succeeding, for timeout tests.
    Slow(Duration),
}

#[derive(Debug, Clone)]
pub struct MockBackendConfig {
    pub outcome: MockOutcome,
    /// If set, fail every call whose (1-based) index is in this list.
    pub fail_on_calls: Vec<usize>,
}

impl Default for MockBackendConfig {
    fn default() -> Self {
        Self {
            outcome: MockOutcome::Succeed("mock transcript".to_string()),
            fail_on_calls: Vec::new(),
        }
    }
}

#[derive(Debug)]
pub struct MockBackend {
    config: MockBackendConfig,
    calls: Arc<AtomicUsize>,
}

impl MockBackend {
    pub fn new(config: MockBackendConfig) -> Self {
        Self {
            config,
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_transcript(text: &str) -> Self {
        Self::new(MockBackendConfig {
            outcome: MockOutcome::Succeed(text.to_string()),
            ..Default::default()
        })
    }

    pub fn with_outcome(outcome: MockOutcome) -> Self {
        Self::new(MockBackendConfig {
            outcome,
            ..Default::default()
        })
    }

    /// Handle on the call counter, valid across clones of the Arc.
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        self.calls.clone()
    }

    fn transcript(text: &str, media: &MediaSource) -> Transcript {
        let duration = media.duration_secs as f64;
        Transcript {
            text: text.to_string(),
            segments: vec![Segment {
                start_secs: 0.0,
                end_secs: duration,
                text: text.to_string(),
            }],
            detected_language: Some("en".to_string()),
            duration_secs: duration,
        }
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new(MockBackendConfig::default())
    }
}

#[async_trait]
impl TranscribeBackend for MockBackend {
    fn info(&self) -> BackendInfo {
        BackendInfo {
            id: "mock".to_string(),
            name: "Mock backend".to_string(),
            model: "mock".to_string(),
            requires_network: false,
            is_local: true,
        }
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn transcribe(
        &self,
        media: &MediaSource,
        _options: &TranscribeOptions,
    ) -> Result<Transcript, BackendError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

        if self.config.fail_on_calls.contains(&call) {
            return Err(BackendError::Timeout { timeout_secs: 0 });
        }

        match &self.config.outcome {
            MockOutcome::Succeed(text) => Ok(Self::transcript(text, media)),
            MockOutcome::Timeout => Err(BackendError::Timeout { timeout_secs: 0 }),
            MockOutcome::Unavailable => Err(BackendError::Unavailable {
                reason: "mock backend told to be down".to_string(),
            }),
            MockOutcome::Panic => panic!("mock backend panic"),
            MockOutcome::Slow(delay) => {
                tokio::time::sleep(*delay).await;
                Ok(Self::transcript("slow mock transcript", media))
            }
        }
    }
}

pub struct MockBackendFactory {
    config: MockBackendConfig,
}

impl MockBackendFactory {
    pub fn new(config: MockBackendConfig) -> Self {
        Self { config }
    }
}

impl Default for MockBackendFactory {
    fn default() -> Self {
        Self::new(MockBackendConfig::default())
    }
}

impl BackendFactory for MockBackendFactory {
    fn create(&self) -> Result<Arc<dyn TranscribeBackend>, BackendError> {
        Ok(Arc::new(MockBackend::new(self.config.clone())))
    }

    fn backend_info(&self) -> BackendInfo {
        MockBackend::default().info()
    }
}
