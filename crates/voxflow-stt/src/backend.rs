//! Backend interface and startup-time selection
//!
//! Any transcription engine (local CLI model, hosted API, test mock)
//! implements `TranscribeBackend`. Selection happens once at startup via
//! the `BackendRegistry`; callers only ever hold the trait object.

use async_trait::async_trait;
use std::fmt::Debug;
use std::sync::Arc;
use thiserror::Error;

use crate::media::MediaSource;
use crate::types::Transcript;

/// Errors a backend call can surface. The worker maps these onto the
/// job's terminal failure reason; no retry logic lives here.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Unsupported media format: {extension:?}")]
    UnsupportedFormat { extension: String },

    #[error("Backend unavailable: {reason}")]
    Unavailable { reason: String },

    #[error("Backend call exceeded {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Internal backend error: {0}")]
    Internal(String),
}

impl BackendError {
    /// Stable reason code carried on failed jobs.
    pub fn code(&self) -> &'static str {
        match self {
            Self::UnsupportedFormat { .. } => "unsupported_format",
            Self::Unavailable { .. } => "backend_unavailable",
            Self::Timeout { .. } => "timeout",
            Self::Internal(_) => "internal",
        }
    }
}

/// Metadata about a backend implementation
#[derive(Debug, Clone)]
pub struct BackendInfo {
    /// Unique identifier ("local", "remote", "mock")
    pub id: String,
    /// Human-readable name
    pub name: String,
    /// Model identifier this backend was configured with
    pub model: String,
    pub requires_network: bool,
    pub is_local: bool,
}

/// Per-call options; the static model choice lives in the backend itself.
#[derive(Debug, Clone, Default)]
pub struct TranscribeOptions {
    /// ISO 639-1 language hint; None lets the engine auto-detect.
    pub language: Option<String>,
}

/// The capability interface the worker pool dispatches to.
#[async_trait]
pub trait TranscribeBackend: Send + Sync + Debug {
    fn info(&self) -> BackendInfo;

    /// Cheap readiness probe for startup and the stats surface.
    async fn is_available(&self) -> bool;

    /// Convert media to text. Long-running from the caller's viewpoint;
    /// the caller owns any timeout.
    async fn transcribe(
        &self,
        media: &MediaSource,
        options: &TranscribeOptions,
    ) -> Result<Transcript, BackendError>;
}

/// Factory for deferred backend construction
pub trait BackendFactory: Send + Sync {
    fn create(&self) -> Result<Arc<dyn TranscribeBackend>, BackendError>;

    /// Info without constructing the backend
    fn backend_info(&self) -> BackendInfo;
}

/// Registry mapping backend ids to factories. Populated at startup from
/// configuration; selection is static, not per-request.
#[derive(Default)]
pub struct BackendRegistry {
    factories: Vec<Box<dyn BackendFactory>>,
}

impl BackendRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, factory: Box<dyn BackendFactory>) {
        self.factories.push(factory);
    }

    pub fn available_backends(&self) -> Vec<BackendInfo> {
        self.factories.iter().map(|f| f.backend_info()).collect()
    }

    pub fn create(&self, id: &str) -> Result<Arc<dyn TranscribeBackend>, BackendError> {
        self.factories
            .iter()
            .find(|f| f.backend_info().id == id)
            .ok_or_else(|| BackendError::Unavailable {
                reason: format!("backend '{id}' is not registered"),
            })?
            .create()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::mock::MockBackendFactory;

    #[test]
    fn registry_creates_by_id() {
        let mut registry = BackendRegistry::new();
        registry.register(Box::new(MockBackendFactory::default()));

        assert!(registry.create("mock").is_ok());
        assert!(matches!(
            registry.create("nope"),
            Err(BackendError::Unavailable { .. })
        ));
        assert_eq!(registry.available_backends().len(), 1);
    }
}
