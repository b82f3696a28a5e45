//! In-memory collaborators for controller and driver tests.

use crate::capture::{Artifact, AudioLevel, CaptureError, MediaCapture, MediaStream, RecordingHandle};
use crate::submit::{ApplicationSubmitter, CandidateFields, Confirmation, SubmissionError};
use crate::upload::{StoredReference, UploadError, UploadGateway};
use async_trait::async_trait;
use chrono::Utc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// How long a "slow" fake call hangs; long enough that callers must cancel it.
pub const HANG: Duration = Duration::from_secs(60);

#[derive(Clone, Default)]
pub struct Calls(Arc<AtomicUsize>);

impl Calls {
    pub fn bump(&self) -> usize {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

#[derive(Default)]
pub struct FakeCapture {
    pub deny: bool,
    pub fail_start: bool,
    pub fail_stop: bool,
    pub acquire_calls: Calls,
    pub start_calls: Calls,
    pub stop_calls: Calls,
}

#[async_trait]
impl MediaCapture for FakeCapture {
    async fn acquire(&self) -> Result<MediaStream, CaptureError> {
        self.acquire_calls.bump();
        if self.deny {
            return Err(CaptureError::PermissionDenied("user dismissed prompt".into()));
        }
        let level = AudioLevel::new();
        level.set(0.25);
        Ok(MediaStream {
            id: "stream-1".into(),
            device_name: "Fake camera".into(),
            level,
        })
    }

    async fn start_recording(&self, stream: &MediaStream) -> Result<RecordingHandle, CaptureError> {
        self.start_calls.bump();
        if self.fail_start {
            return Err(CaptureError::Device("camera busy".into()));
        }
        Ok(RecordingHandle {
            id: "rec-1".into(),
            stream_id: stream.id.clone(),
            started_at: Utc::now(),
        })
    }

    async fn stop_recording(&self, handle: RecordingHandle) -> Result<Artifact, CaptureError> {
        self.stop_calls.bump();
        if self.fail_stop {
            return Err(CaptureError::Encoding("encoder crashed".into()));
        }
        Ok(Artifact {
            bytes: vec![1, 2, 3, 4],
            mime_type: "video/webm".into(),
            file_name: format!("{}.webm", handle.id),
            duration_secs: 50.0,
            recorded_at: handle.started_at,
        })
    }

    fn name(&self) -> &str {
        "Fake capture"
    }
}

/// Hangs on the first `slow_calls` uploads and fails the first `failures`, then succeeds.
#[derive(Default)]
pub struct FakeUploader {
    pub failures: usize,
    pub slow_calls: usize,
    pub calls: Calls,
    pub uploaded_sizes: Arc<Mutex<Vec<usize>>>,
}

#[async_trait]
impl UploadGateway for FakeUploader {
    async fn upload(&self, artifact: &Artifact) -> Result<StoredReference, UploadError> {
        let call = self.calls.bump();
        if let Ok(mut sizes) = self.uploaded_sizes.lock() {
            sizes.push(artifact.len());
        }
        if call <= self.slow_calls {
            tokio::time::sleep(HANG).await;
        }
        if call <= self.failures {
            return Err(UploadError::Timeout);
        }
        Ok(StoredReference {
            url: format!("https://store.example/{}", artifact.file_name),
            file_name: artifact.file_name.clone(),
        })
    }

    fn name(&self) -> &str {
        "Fake upload"
    }
}

/// Hangs on the first `slow_calls` submissions and fails the first `failures`, then succeeds.
#[derive(Default)]
pub struct FakeSubmitter {
    pub failures: usize,
    pub slow_calls: usize,
    pub calls: Calls,
    pub last_video: Arc<Mutex<Option<String>>>,
}

#[async_trait]
impl ApplicationSubmitter for FakeSubmitter {
    async fn submit(
        &self,
        candidate: &CandidateFields,
        video: &StoredReference,
    ) -> Result<Confirmation, SubmissionError> {
        let call = self.calls.bump();
        if let Ok(mut last) = self.last_video.lock() {
            *last = Some(video.url.clone());
        }
        if call <= self.slow_calls {
            tokio::time::sleep(HANG).await;
        }
        if call <= self.failures {
            return Err(SubmissionError::Rejected {
                status: 500,
                body: "Error adding application".into(),
            });
        }
        Ok(Confirmation {
            application_id: Some(format!("app-for-{}", candidate.interview_id)),
            status: "pending".into(),
            video_url: video.url.clone(),
        })
    }
}

pub fn candidate() -> CandidateFields {
    CandidateFields {
        interview_id: "interview-1".into(),
        name: "Ada".into(),
        surname: "Lovelace".into(),
        email: "ada@example.com".into(),
        phone: "555-0100".into(),
        gdpr_consent: true,
    }
}
