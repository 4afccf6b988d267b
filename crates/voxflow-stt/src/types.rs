//! Transcription result types

use serde::{Deserialize, Serialize};

/// One recognized span of speech.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub start_secs: f64,
    pub end_secs: f64,
    pub text: String,
}

/// A completed transcription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transcript {
    pub text: String,
    #[serde(default)]
    pub segments: Vec<Segment>,
    pub detected_language: Option<String>,
    /// Media duration as reported by the backend, falling back to the
    /// end of the last segment.
    pub duration_secs: f64,
}

impl Transcript {
    pub fn format_plain(&self) -> String {
        self.text.trim().to_string()
    }

    pub fn format_timestamped(&self) -> String {
        self.segments
            .iter()
            .map(|seg| {
                format!(
                    "[{:.0}s-{:.0}s] {}",
                    seg.start_secs,
                    seg.end_secs,
                    seg.text.trim()
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}
