//! Local-model backend
//!
//! Drives a whisper-style command line executable and parses its JSON
//! output. Nothing here retries; a failed invocation is the job's failure.

use async_trait::async_trait;
use serde::Deserialize;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::Arc;
use tokio::process::Command;
use tracing::debug;

use crate::backend::{
    BackendError, BackendFactory, BackendInfo, TranscribeBackend, TranscribeOptions,
};
use crate::media::{MediaKind, MediaRef, MediaSource};
use crate::types::{Segment, Transcript};

#[derive(Debug, Clone)]
pub struct LocalCliConfig {
    /// Transcriber executable, e.g. "whisper-cli".
    pub binary: PathBuf,
    /// Model name passed to the executable ("tiny", "small", ...).
    pub model: String,
    /// Default language hint; per-call options override it.
    pub language: Option<String>,
}

impl Default for LocalCliConfig {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("whisper-cli"),
            model: "small".to_string(),
            language: None,
        }
    }
}

/// JSON document the CLI prints on success.
#[derive(Debug, Deserialize)]
struct CliPayload {
    #[serde(default)]
    text: String,
    #[serde(default)]
    segments: Vec<CliSegment>,
    language: Option<String>,
    #[serde(default)]
    duration: f64,
}

#[derive(Debug, Deserialize)]
struct CliSegment {
    #[serde(default)]
    start: f64,
    #[serde(default)]
    end: f64,
    #[serde(default)]
    text: String,
}

#[derive(Debug)]
pub struct LocalCliBackend {
    config: LocalCliConfig,
}

impl LocalCliBackend {
    pub fn new(config: LocalCliConfig) -> Self {
        Self { config }
    }

    fn parse_output(stdout: &[u8]) -> Result<Transcript, BackendError> {
        let payload: CliPayload = serde_json::from_slice(stdout)
            .map_err(|e| BackendError::Internal(format!("unparseable transcriber output: {e}")))?;

        let segments: Vec<Segment> = payload
            .segments
            .into_iter()
            .map(|s| Segment {
                start_secs: s.start,
                end_secs: s.end,
                text: s.text.trim().to_string(),
            })
            .collect();

        // Some models omit duration; the last segment end is close enough
        let duration_secs = if payload.duration > 0.0 {
            payload.duration
        } else {
            segments.last().map(|s| s.end_secs).unwrap_or(0.0)
        };

        Ok(Transcript {
            text: payload.text.trim().to_string(),
            segments,
            detected_language: payload.language,
            duration_secs,
        })
    }
}

#[async_trait]
impl TranscribeBackend for LocalCliBackend {
    fn info(&self) -> BackendInfo {
        BackendInfo {
            id: "local".to_string(),
            name: "Local CLI model".to_string(),
            model: self.config.model.clone(),
            requires_network: false,
            is_local: true,
        }
    }

    async fn is_available(&self) -> bool {
        Command::new(&self.config.binary)
            .arg("--version")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .map(|s| s.success())
            .unwrap_or(false)
    }

    async fn transcribe(
        &self,
        media: &MediaSource,
        options: &TranscribeOptions,
    ) -> Result<Transcript, BackendError> {
        let path = match &media.media {
            MediaRef::File { path } => path,
            MediaRef::RemoteUrl { .. } => {
                return Err(BackendError::Unavailable {
                    reason: "remote URL sources require the remote backend".to_string(),
                })
            }
        };

        if media.kind() == MediaKind::Unknown {
            return Err(BackendError::UnsupportedFormat {
                extension: media.extension(),
            });
        }

        let mut cmd = Command::new(&self.config.binary);
        cmd.arg("--model")
            .arg(&self.config.model)
            .arg("--output-format")
            .arg("json")
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let language = options.language.as_ref().or(self.config.language.as_ref());
        if let Some(lang) = language {
            cmd.arg("--language").arg(lang);
        }
        cmd.arg(path);

        debug!(binary = %self.config.binary.display(), file = %path.display(), "invoking local transcriber");

        let output = cmd.output().await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BackendError::Unavailable {
                    reason: format!("transcriber binary '{}' not found", self.config.binary.display()),
                }
            } else {
                BackendError::Internal(e.to_string())
            }
        })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BackendError::Internal(format!(
                "transcriber exited with {}: {}",
                output.status,
                stderr.trim()
            )));
        }

        Self::parse_output(&output.stdout)
    }
}

pub struct LocalCliFactory {
    config: LocalCliConfig,
}

impl LocalCliFactory {
    pub fn new(config: LocalCliConfig) -> Self {
        Self { config }
    }
}

impl BackendFactory for LocalCliFactory {
    fn create(&self) -> Result<Arc<dyn TranscribeBackend>, BackendError> {
        Ok(Arc::new(LocalCliBackend::new(self.config.clone())))
    }

    fn backend_info(&self) -> BackendInfo {
        LocalCliBackend::new(self.config.clone()).info()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_cli_payload() {
        let raw = br#"{
            "text": " hello there ",
            "segments": [
                {"start": 0.0, "end": 1.5, "text": " hello"},
                {"start": 1.5, "end": 3.2, "text": " there"}
            ],
            "language": "en",
            "duration": 0.0
        }"#;
        let transcript = LocalCliBackend::parse_output(raw).unwrap();
        assert_eq!(transcript.text, "hello there");
        assert_eq!(transcript.segments.len(), 2);
        // duration falls back to the last segment end
        assert!((transcript.duration_secs - 3.2).abs() < f64::EPSILON);
        assert_eq!(transcript.detected_language.as_deref(), Some("en"));
    }

    #[test]
    fn garbage_output_is_an_internal_error() {
        assert!(matches!(
            LocalCliBackend::parse_output(b"whisper exploded"),
            Err(BackendError::Internal(_))
        ));
    }

    #[tokio::test]
    async fn unknown_extension_is_rejected_before_spawning() {
        let backend = LocalCliBackend::new(LocalCliConfig::default());
        let media = MediaSource {
            media: MediaRef::File {
                path: PathBuf::from("/tmp/notes.txt"),
            },
            file_name: "notes.txt".to_string(),
            size_bytes: 10,
            duration_secs: 1,
        };
        let err = backend
            .transcribe(&media, &TranscribeOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::UnsupportedFormat { .. }));
    }
}
