//! Media capture collaborator.
//!
//! The controller only talks to [`MediaCapture`]; backends decide what a stream is. The
//! `microphone` feature provides a cpal-backed implementation.

pub mod buffer;
#[cfg(feature = "microphone")]
pub mod microphone;
pub mod wav;

pub use buffer::AudioBuffer;
#[cfg(feature = "microphone")]
pub use microphone::MicrophoneCapture;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::{
    atomic::{AtomicU32, Ordering},
    Arc,
};
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CaptureError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Already recording")]
    AlreadyRecording,

    #[error("Not recording")]
    NotRecording,

    #[error("Device error: {0}")]
    Device(String),

    #[error("Encoding error: {0}")]
    Encoding(String),
}

/// Live input meter shared between the capture backend and whoever renders it.
///
/// Stores an `f32` in `0.0..=1.0` as raw bits so the audio callback never locks.
#[derive(Debug, Clone)]
pub struct AudioLevel(Arc<AtomicU32>);

impl AudioLevel {
    pub fn new() -> Self {
        Self(Arc::new(AtomicU32::new(0.0f32.to_bits())))
    }

    pub fn set(&self, value: f32) {
        let value = if value.is_finite() {
            value.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.0.store(value.to_bits(), Ordering::Relaxed);
    }

    pub fn get(&self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    pub fn reset(&self) {
        self.set(0.0);
    }
}

impl Default for AudioLevel {
    fn default() -> Self {
        Self::new()
    }
}

/// An acquired input the user has granted access to.
#[derive(Debug, Clone)]
pub struct MediaStream {
    pub id: String,
    pub device_name: String,
    pub level: AudioLevel,
}

#[derive(Debug, Clone)]
pub struct RecordingHandle {
    pub id: String,
    pub stream_id: String,
    pub started_at: DateTime<Utc>,
}

/// The finished, encoded recording.
#[derive(Debug, Clone)]
pub struct Artifact {
    pub bytes: Vec<u8>,
    pub mime_type: String,
    pub file_name: String,
    pub duration_secs: f32,
    pub recorded_at: DateTime<Utc>,
}

impl Artifact {
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

#[async_trait]
pub trait MediaCapture: Send + Sync {
    /// Ask for the input device. Fails with `PermissionDenied` when access is refused.
    async fn acquire(&self) -> Result<MediaStream, CaptureError>;

    async fn start_recording(&self, stream: &MediaStream) -> Result<RecordingHandle, CaptureError>;

    /// Resolves once the recording has been finalized and encoded.
    async fn stop_recording(&self, handle: RecordingHandle) -> Result<Artifact, CaptureError>;

    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audio_level_clamps_and_shares() {
        let level = AudioLevel::new();
        let reader = level.clone();
        level.set(0.4);
        assert!((reader.get() - 0.4).abs() < f32::EPSILON);

        level.set(3.0);
        assert_eq!(reader.get(), 1.0);
        level.set(f32::NAN);
        assert_eq!(reader.get(), 0.0);
        level.set(0.7);
        level.reset();
        assert_eq!(reader.get(), 0.0);
    }
}
