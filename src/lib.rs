//! Candidate-side interview recording.
//!
//! A [`QuestionSequencer`] plays the interview's questions against a one-second tick, an
//! [`InterviewRecordingController`] ties that clock to a [`MediaCapture`] recording, and the
//! finished artifact is pushed through an [`UploadGateway`] and an [`ApplicationSubmitter`].

pub mod capture;
pub mod config;
pub mod interview;
pub mod sequencer;
pub mod session;
pub mod submit;
pub mod upload;

pub use capture::{Artifact, CaptureError, MediaCapture, MediaStream, RecordingHandle};
pub use config::RecorderConfig;
pub use interview::{Interview, InterviewClient, InterviewError};
pub use sequencer::{Question, QuestionSequencer, SequencerEvent, SequencerState, SequencerStatus};
pub use session::{
    run_session, DriverCommand, FailureReason, InterviewRecordingController, SessionError,
    SessionEvent, SessionProgress, SessionStatus,
};
pub use submit::{
    ApplicationSubmitter, CandidateFields, Confirmation, HttpApplicationSubmitter, SubmissionError,
};
pub use upload::{HttpUploadGateway, RetryPolicy, StoredReference, UploadError, UploadGateway};
