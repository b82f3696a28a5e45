use super::SessionStatus;
use serde::Serialize;

/// What a UI needs to render the recording step.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionProgress {
    pub session_id: String,
    pub status: SessionStatus,
    pub question: Option<String>,
    pub question_index: usize,
    pub question_count: usize,
    pub remaining_seconds: u32,
    pub elapsed_secs: u64,
    pub audio_level: f32,
    pub uploaded_url: Option<String>,
}

/// Broadcast to subscribers as the session moves along.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionEvent {
    StatusChanged(SessionStatus),
    QuestionStarted {
        index: usize,
        text: String,
        remaining_seconds: u32,
    },
    Tick {
        index: usize,
        remaining_seconds: u32,
    },
    SequenceCompleted,
}
