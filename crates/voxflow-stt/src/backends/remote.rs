//! Remote-API backend
//!
//! Uploads media to a hosted transcription endpoint as multipart form
//! data, or passes a source URL through for the service to fetch itself.
//! HTTP-level failures are folded into the backend error taxonomy; the
//! caller owns timeouts and retries.

use async_trait::async_trait;
use reqwest::multipart;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::backend::{
    BackendError, BackendFactory, BackendInfo, TranscribeBackend, TranscribeOptions,
};
use crate::media::{MediaKind, MediaRef, MediaSource};
use crate::types::{Segment, Transcript};

#[derive(Debug, Clone)]
pub struct RemoteApiConfig {
    /// Transcription endpoint, e.g. "https://api.example.com/v1/transcribe".
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    /// HTTP connect timeout; the overall call deadline is the worker's.
    pub connect_timeout: Duration,
}

impl Default for RemoteApiConfig {
    fn default() -> Self {
        Self {
            endpoint: String::new(),
            api_key: String::new(),
            model: "whisper-1".to_string(),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    text: String,
    #[serde(default)]
    segments: Vec<ApiSegment>,
    language: Option<String>,
    #[serde(default)]
    duration: f64,
}

#[derive(Debug, Deserialize)]
struct ApiSegment {
    #[serde(default)]
    start: f64,
    #[serde(default)]
    end: f64,
    #[serde(default)]
    text: String,
}

#[derive(Debug)]
pub struct RemoteApiBackend {
    config: RemoteApiConfig,
    client: reqwest::Client,
}

impl RemoteApiBackend {
    pub fn new(config: RemoteApiConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .connect_timeout(config.connect_timeout)
            .build()
            .map_err(|e| BackendError::Internal(e.to_string()))?;
        Ok(Self { config, client })
    }

    fn map_send_error(err: reqwest::Error) -> BackendError {
        if err.is_timeout() {
            BackendError::Timeout { timeout_secs: 0 }
        } else if err.is_connect() {
            BackendError::Unavailable {
                reason: err.to_string(),
            }
        } else {
            BackendError::Internal(err.to_string())
        }
    }

    fn into_transcript(resp: ApiResponse) -> Transcript {
        let segments: Vec<Segment> = resp
            .segments
            .into_iter()
            .map(|s| Segment {
                start_secs: s.start,
                end_secs: s.end,
                text: s.text.trim().to_string(),
            })
            .collect();
        let duration_secs = if resp.duration > 0.0 {
            resp.duration
        } else {
            segments.last().map(|s| s.end_secs).unwrap_or(0.0)
        };
        Transcript {
            text: resp.text.trim().to_string(),
            segments,
            detected_language: resp.language,
            duration_secs,
        }
    }
}

#[async_trait]
impl TranscribeBackend for RemoteApiBackend {
    fn info(&self) -> BackendInfo {
        BackendInfo {
            id: "remote".to_string(),
            name: "Remote transcription API".to_string(),
            model: self.config.model.clone(),
            requires_network: true,
            is_local: false,
        }
    }

    async fn is_available(&self) -> bool {
        !self.config.endpoint.is_empty() && !self.config.api_key.is_empty()
    }

    async fn transcribe(
        &self,
        media: &MediaSource,
        options: &TranscribeOptions,
    ) -> Result<Transcript, BackendError> {
        if media.kind() == MediaKind::Unknown {
            return Err(BackendError::UnsupportedFormat {
                extension: media.extension(),
            });
        }
        if self.config.endpoint.is_empty() {
            return Err(BackendError::Unavailable {
                reason: "no remote endpoint configured".to_string(),
            });
        }

        let mut form = multipart::Form::new().text("model", self.config.model.clone());
        if let Some(lang) = &options.language {
            form = form.text("language", lang.clone());
        }

        form = match &media.media {
            MediaRef::File { path } => {
                let bytes = tokio::fs::read(path)
                    .await
                    .map_err(|e| BackendError::Internal(format!("reading media: {e}")))?;
                let part = multipart::Part::bytes(bytes).file_name(media.file_name.clone());
                form.part("file", part)
            }
            MediaRef::RemoteUrl { url } => form.text("url", url.clone()),
        };

        debug!(endpoint = %self.config.endpoint, file = %media.file_name, "posting media to remote API");

        let response = self
            .client
            .post(&self.config.endpoint)
            .bearer_auth(&self.config.api_key)
            .multipart(form)
            .send()
            .await
            .map_err(Self::map_send_error)?;

        let status = response.status();
        if status == reqwest::StatusCode::UNSUPPORTED_MEDIA_TYPE {
            return Err(BackendError::UnsupportedFormat {
                extension: media.extension(),
            });
        }
        if status.is_server_error() {
            return Err(BackendError::Unavailable {
                reason: format!("remote API returned {status}"),
            });
        }
        if !status.is_success() {
            return Err(BackendError::Internal(format!(
                "remote API returned {status}"
            )));
        }

        let payload: ApiResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Internal(format!("unparseable API response: {e}")))?;
        Ok(Self::into_transcript(payload))
    }
}

pub struct RemoteApiFactory {
    config: RemoteApiConfig,
}

impl RemoteApiFactory {
    pub fn new(config: RemoteApiConfig) -> Self {
        Self { config }
    }
}

impl BackendFactory for RemoteApiFactory {
    fn create(&self) -> Result<Arc<dyn TranscribeBackend>, BackendError> {
        Ok(Arc::new(RemoteApiBackend::new(self.config.clone())?))
    }

    fn backend_info(&self) -> BackendInfo {
        BackendInfo {
            id: "remote".to_string(),
            name: "Remote transcription API".to_string(),
            model: self.config.model.clone(),
            requires_network: true,
            is_local: false,
        }
    }
}
