use crate::capture::{Artifact, MediaCapture, MediaStream, RecordingHandle};
use crate::sequencer::{
    Question, QuestionMark, QuestionSequencer, SequencerEvent, SequencerState, SequencerStatus,
};
use crate::submit::{ApplicationSubmitter, CandidateFields, Confirmation};
use crate::upload::{StoredReference, UploadGateway};
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use uuid::Uuid;

pub mod driver;
#[cfg(test)]
pub(crate) mod fakes;
pub mod progress;
pub mod state;

pub use driver::{run_session, DriverCommand};
pub use progress::{SessionEvent, SessionProgress};
pub use state::{FailureReason, SessionError, SessionStatus};

const EVENT_CAPACITY: usize = 128;

/// Runs one candidate's recording session: permission, timed recording, upload, submission.
///
/// Every way a recording can end (questions running out, skipping past the last question,
/// an explicit early stop) goes through `finalize`, which stops the capture exactly once.
pub struct InterviewRecordingController {
    id: String,
    started_at: DateTime<Utc>,
    capture: Box<dyn MediaCapture>,
    uploader: Box<dyn UploadGateway>,
    submitter: Box<dyn ApplicationSubmitter>,
    status: SessionStatus,
    sequencer: QuestionSequencer,
    stream: Option<MediaStream>,
    recording: Option<RecordingHandle>,
    finalized: bool,
    artifact: Option<Artifact>,
    uploaded: Option<StoredReference>,
    confirmation: Option<Confirmation>,
    event_tx: broadcast::Sender<SessionEvent>,
}

impl InterviewRecordingController {
    pub fn new(
        capture: Box<dyn MediaCapture>,
        uploader: Box<dyn UploadGateway>,
        submitter: Box<dyn ApplicationSubmitter>,
    ) -> Self {
        let (event_tx, _) = broadcast::channel(EVENT_CAPACITY);
        let id = Uuid::new_v4().to_string();
        tracing::info!(
            "Session {} created: capture={}, upload={}",
            id,
            capture.name(),
            uploader.name()
        );

        Self {
            id,
            started_at: Utc::now(),
            capture,
            uploader,
            submitter,
            status: SessionStatus::NotStarted,
            sequencer: QuestionSequencer::new(),
            stream: None,
            recording: None,
            finalized: false,
            artifact: None,
            uploaded: None,
            confirmation: None,
            event_tx,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn status(&self) -> &SessionStatus {
        &self.status
    }

    pub fn sequencer_state(&self) -> SequencerState {
        self.sequencer.state()
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.sequencer.current_question()
    }

    pub fn timeline(&self) -> &[QuestionMark] {
        self.sequencer.timeline()
    }

    pub fn artifact(&self) -> Option<&Artifact> {
        self.artifact.as_ref()
    }

    pub fn uploaded_reference(&self) -> Option<&StoredReference> {
        self.uploaded.as_ref()
    }

    pub fn confirmation(&self) -> Option<&Confirmation> {
        self.confirmation.as_ref()
    }

    /// Live input meter, `0.0` until permission is granted.
    pub fn audio_level(&self) -> f32 {
        self.stream.as_ref().map(|s| s.level.get()).unwrap_or(0.0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.event_tx.subscribe()
    }

    pub fn progress(&self) -> SessionProgress {
        let snapshot = self.sequencer.snapshot();
        SessionProgress {
            session_id: self.id.clone(),
            status: self.status.clone(),
            question: snapshot.question,
            question_index: snapshot.index,
            question_count: snapshot.total,
            remaining_seconds: snapshot.remaining_seconds,
            elapsed_secs: self.sequencer.elapsed_secs(),
            audio_level: self.audio_level(),
            uploaded_url: self.uploaded.as_ref().map(|r| r.url.clone()),
        }
    }

    /// Whether `request_permission` would be accepted now. Unlike
    /// [`SessionStatus::can_request_permission`] this also knows whether a failed capture
    /// ever recorded anything.
    pub fn can_request_permission(&self) -> bool {
        match &self.status {
            // Starting the capture failed before anything was recorded.
            SessionStatus::Failed(FailureReason::CaptureError(_)) => {
                self.recording.is_none()
                    && !self.finalized
                    && self.sequencer.status() == SequencerStatus::Idle
            }
            status => status.can_request_permission(),
        }
    }

    pub async fn request_permission(&mut self) -> Result<(), SessionError> {
        if !self.can_request_permission() {
            return Err(self.invalid_state("request_permission"));
        }

        self.stream = None;
        self.set_status(SessionStatus::AwaitingPermission);

        let result = self.capture.acquire().await;
        match result {
            Ok(stream) => {
                tracing::info!("Session {}: input acquired ({})", self.id, stream.device_name);
                self.stream = Some(stream);
                self.set_status(SessionStatus::Ready);
                Ok(())
            }
            Err(e) => {
                tracing::error!("Session {}: permission denied: {}", self.id, e);
                self.fail(FailureReason::PermissionDenied(e.to_string()));
                Err(SessionError::PermissionDenied(e))
            }
        }
    }

    pub async fn begin_recording(&mut self, questions: Vec<Question>) -> Result<(), SessionError> {
        if self.status != SessionStatus::Ready {
            return Err(self.invalid_state("begin_recording"));
        }
        let Some(stream) = self.stream.as_ref() else {
            return Err(self.invalid_state("begin_recording"));
        };

        let result = self.capture.start_recording(stream).await;
        let handle = match result {
            Ok(handle) => handle,
            Err(e) => {
                tracing::error!("Session {}: failed to start recording: {}", self.id, e);
                self.fail(FailureReason::CaptureError(e.to_string()));
                return Err(SessionError::Capture(e));
            }
        };

        tracing::info!(
            "Session {}: recording started with {} questions",
            self.id,
            questions.len()
        );
        self.recording = Some(handle);
        self.set_status(SessionStatus::Recording);

        let events = self.sequencer.start(questions);
        self.apply_sequencer_events(events).await
    }

    /// One second of wall-clock time has passed.
    pub async fn tick(&mut self) -> Result<(), SessionError> {
        if !self.status.is_recording() {
            return Err(self.invalid_state("tick"));
        }

        let events = self.sequencer.tick();
        if events.is_empty() {
            let state = self.sequencer.state();
            let _ = self.event_tx.send(SessionEvent::Tick {
                index: state.current_index,
                remaining_seconds: state.remaining_seconds,
            });
            return Ok(());
        }
        self.apply_sequencer_events(events).await
    }

    pub async fn advance_manually(&mut self) -> Result<(), SessionError> {
        if !self.status.is_recording() {
            return Err(self.invalid_state("advance_manually"));
        }

        let events = self.sequencer.advance_manually();
        self.apply_sequencer_events(events).await
    }

    pub async fn stop_early(&mut self) -> Result<(), SessionError> {
        if !self.status.is_recording() {
            return Err(self.invalid_state("stop_early"));
        }

        tracing::info!("Session {}: stopped early by candidate", self.id);
        let events = self.sequencer.stop();
        self.apply_sequencer_events(events).await
    }

    /// Uploads the held artifact (unless an earlier attempt already stored it) and submits
    /// the application. Retry after an upload or submission failure by calling this again.
    pub async fn submit(&mut self, candidate: &CandidateFields) -> Result<&Confirmation, SessionError> {
        match &self.status {
            SessionStatus::Uploading => {
                tracing::warn!("Session {}: submit rejected, already uploading", self.id);
                return Err(SessionError::SubmissionInFlight);
            }
            status if status.can_submit() => {}
            _ => return Err(self.invalid_state("submit")),
        }
        if self.artifact.is_none() {
            return Err(SessionError::NoArtifact);
        }
        candidate.validate().map_err(SessionError::Submission)?;

        // Every return below settles it; an unsettled drop means the caller cancelled.
        let mut in_flight = InFlight::enter(&mut self.status, &self.event_tx, &self.id);

        let reference = match self.uploaded.clone() {
            Some(reference) => {
                tracing::info!(
                    "Session {}: reusing stored upload {}",
                    self.id,
                    reference.url
                );
                reference
            }
            None => {
                let Some(artifact) = self.artifact.as_ref() else {
                    in_flight.settle(SessionStatus::Failed(FailureReason::UploadError(
                        SessionError::NoArtifact.to_string(),
                    )));
                    return Err(SessionError::NoArtifact);
                };
                let result = self.uploader.upload(artifact).await;
                match result {
                    Ok(reference) => {
                        self.uploaded = Some(reference.clone());
                        reference
                    }
                    Err(e) => {
                        tracing::error!("Session {}: upload failed: {}", self.id, e);
                        in_flight.settle(SessionStatus::Failed(FailureReason::UploadError(
                            e.to_string(),
                        )));
                        return Err(SessionError::Upload(e));
                    }
                }
            }
        };
        in_flight.uploaded = true;

        let result = self.submitter.submit(candidate, &reference).await;
        match result {
            Ok(confirmation) => {
                tracing::info!(
                    "Session {}: application submitted ({})",
                    self.id,
                    confirmation.status
                );
                self.artifact = None;
                in_flight.settle(SessionStatus::Submitted);
                Ok(self.confirmation.insert(confirmation))
            }
            Err(e) => {
                tracing::error!("Session {}: submission failed: {}", self.id, e);
                in_flight.settle(SessionStatus::Failed(FailureReason::SubmissionError(
                    e.to_string(),
                )));
                Err(SessionError::Submission(e))
            }
        }
    }

    async fn apply_sequencer_events(
        &mut self,
        events: Vec<SequencerEvent>,
    ) -> Result<(), SessionError> {
        let mut completed = false;
        for event in events {
            match event {
                SequencerEvent::QuestionStarted {
                    index,
                    remaining_seconds,
                } => {
                    let text = self
                        .sequencer
                        .timeline()
                        .iter()
                        .rev()
                        .find(|mark| mark.index == index)
                        .map(|mark| mark.text.clone())
                        .unwrap_or_default();
                    tracing::info!(
                        "Session {}: question {} ({}s): {}",
                        self.id,
                        index + 1,
                        remaining_seconds,
                        text
                    );
                    let _ = self.event_tx.send(SessionEvent::QuestionStarted {
                        index,
                        text,
                        remaining_seconds,
                    });
                }
                SequencerEvent::Completed => {
                    let _ = self.event_tx.send(SessionEvent::SequenceCompleted);
                    completed = true;
                }
            }
        }

        if completed {
            self.finalize().await?;
        }
        Ok(())
    }

    /// Stops the capture. Runs its body at most once per session.
    async fn finalize(&mut self) -> Result<(), SessionError> {
        if self.finalized {
            tracing::debug!("Session {}: already finalized", self.id);
            return Ok(());
        }
        self.finalized = true;

        let Some(handle) = self.recording.take() else {
            let e = crate::capture::CaptureError::NotRecording;
            tracing::error!("Session {}: finalize without a recording handle", self.id);
            self.fail(FailureReason::CaptureError(e.to_string()));
            return Err(SessionError::Capture(e));
        };

        let result = self.capture.stop_recording(handle).await;
        if let Some(stream) = self.stream.as_ref() {
            stream.level.reset();
        }

        match result {
            Ok(artifact) if artifact.is_empty() => {
                let e = crate::capture::CaptureError::Encoding("recording produced no data".into());
                tracing::error!("Session {}: {}", self.id, e);
                self.fail(FailureReason::CaptureError(e.to_string()));
                Err(SessionError::Capture(e))
            }
            Ok(artifact) => {
                tracing::info!(
                    "Session {}: recording finalized, {} bytes, {:.1}s",
                    self.id,
                    artifact.len(),
                    artifact.duration_secs
                );
                self.artifact = Some(artifact);
                self.set_status(SessionStatus::Stopped);
                Ok(())
            }
            Err(e) => {
                tracing::error!("Session {}: failed to stop recording: {}", self.id, e);
                self.fail(FailureReason::CaptureError(e.to_string()));
                Err(SessionError::Capture(e))
            }
        }
    }

    fn set_status(&mut self, status: SessionStatus) {
        transition(&mut self.status, &self.event_tx, &self.id, status);
    }

    fn fail(&mut self, reason: FailureReason) {
        self.set_status(SessionStatus::Failed(reason));
    }

    fn invalid_state(&self, operation: &'static str) -> SessionError {
        tracing::warn!(
            "Session {}: {} rejected in state {:?}",
            self.id,
            operation,
            self.status
        );
        SessionError::InvalidState {
            operation,
            status: self.status.clone(),
        }
    }
}

fn transition(
    current: &mut SessionStatus,
    events: &broadcast::Sender<SessionEvent>,
    session_id: &str,
    next: SessionStatus,
) {
    if *current == next {
        return;
    }
    tracing::debug!("Session {}: {:?} -> {:?}", session_id, current, next);
    *current = next.clone();
    let _ = events.send(SessionEvent::StatusChanged(next));
}

/// Holds the session in `Uploading` for the duration of one `submit` call.
///
/// Dropped without `settle` (the caller timed out or cancelled the future), it leaves the
/// session in a retryable `Failed` state instead of `Uploading`.
struct InFlight<'a> {
    status: &'a mut SessionStatus,
    events: &'a broadcast::Sender<SessionEvent>,
    session_id: &'a str,
    uploaded: bool,
    settled: bool,
}

impl<'a> InFlight<'a> {
    fn enter(
        status: &'a mut SessionStatus,
        events: &'a broadcast::Sender<SessionEvent>,
        session_id: &'a str,
    ) -> Self {
        transition(status, events, session_id, SessionStatus::Uploading);
        Self {
            status,
            events,
            session_id,
            uploaded: false,
            settled: false,
        }
    }

    fn settle(&mut self, next: SessionStatus) {
        self.settled = true;
        transition(self.status, self.events, self.session_id, next);
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }
        tracing::warn!("Session {}: submit cancelled while in flight", self.session_id);
        let reason = if self.uploaded {
            FailureReason::SubmissionError("cancelled".into())
        } else {
            FailureReason::UploadError("cancelled".into())
        };
        transition(self.status, self.events, self.session_id, SessionStatus::Failed(reason));
    }
}
