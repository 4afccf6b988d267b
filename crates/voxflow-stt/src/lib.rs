//! Transcription backend abstraction for VoxFlow
//!
//! This crate provides the capability interface the worker pool talks to:
//! the `TranscribeBackend` trait, the backend error taxonomy, the factory
//! registry used for startup-time selection, and the concrete backends
//! (local CLI model, remote API, mock).

pub mod backend;
pub mod backends;
pub mod media;
pub mod types;

pub use backend::{
    BackendError, BackendFactory, BackendInfo, BackendRegistry, TranscribeBackend,
    TranscribeOptions,
};
pub use media::{MediaKind, MediaRef, MediaSource};
pub use types::{Segment, Transcript};
