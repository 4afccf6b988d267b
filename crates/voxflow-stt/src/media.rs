//! Media references and format classification

use std::path::{Path, PathBuf};

const AUDIO_EXTENSIONS: &[&str] = &["mp3", "wav", "ogg", "m4a", "flac", "aac", "oga", "opus"];
const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "wmv", "flv", "mkv", "webm"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    Audio,
    Video,
    Unknown,
}

/// Opaque handle to the media a job should transcribe. The front-end has
/// already fetched remote links it wants fetched; a `RemoteUrl` here is
/// passed through to backends that can ingest URLs directly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaRef {
    File { path: PathBuf },
    RemoteUrl { url: String },
}

/// A media reference plus the metadata admission and billing need.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaSource {
    pub media: MediaRef,
    /// Display name, also used for format classification.
    pub file_name: String,
    pub size_bytes: u64,
    /// Duration in whole seconds; this is what quota is billed in.
    pub duration_secs: u64,
}

impl MediaSource {
    pub fn kind(&self) -> MediaKind {
        classify(&self.file_name)
    }

    pub fn extension(&self) -> String {
        Path::new(&self.file_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase()
    }
}

pub fn classify(file_name: &str) -> MediaKind {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    if AUDIO_EXTENSIONS.contains(&ext.as_str()) {
        MediaKind::Audio
    } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
        MediaKind::Video
    } else {
        MediaKind::Unknown
    }
}
