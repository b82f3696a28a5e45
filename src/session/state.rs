use crate::capture::CaptureError;
use crate::submit::SubmissionError;
use crate::upload::UploadError;
use serde::Serialize;
use thiserror::Error;

/// Why a session landed in `Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "message")]
pub enum FailureReason {
    PermissionDenied(String),
    CaptureError(String),
    UploadError(String),
    SubmissionError(String),
}

impl FailureReason {
    /// Upload and submission failures can be retried with the artifact already held.
    pub fn is_retryable_submit(&self) -> bool {
        matches!(
            self,
            FailureReason::UploadError(_) | FailureReason::SubmissionError(_)
        )
    }
}

/// Lifecycle of one candidate's recording session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "reason", rename_all = "camelCase")]
pub enum SessionStatus {
    NotStarted,
    AwaitingPermission,
    Ready,
    Recording,
    Stopped,
    Uploading,
    Submitted,
    Failed(FailureReason),
}

impl Default for SessionStatus {
    fn default() -> Self {
        Self::NotStarted
    }
}

impl SessionStatus {
    pub fn is_recording(&self) -> bool {
        matches!(self, SessionStatus::Recording)
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, SessionStatus::Failed(_))
    }

    pub fn failure(&self) -> Option<&FailureReason> {
        match self {
            SessionStatus::Failed(reason) => Some(reason),
            _ => None,
        }
    }

    /// Camera button, judged from the status alone. `Failed(CaptureError)` is refused here;
    /// the controller's own `can_request_permission` additionally allows it when the capture
    /// failed before recording anything.
    pub fn can_request_permission(&self) -> bool {
        matches!(
            self,
            SessionStatus::NotStarted
                | SessionStatus::Ready
                | SessionStatus::Failed(FailureReason::PermissionDenied(_))
        )
    }

    /// "Next question" and "stop" controls.
    pub fn can_advance(&self) -> bool {
        self.is_recording()
    }

    /// Submit button. The controller additionally requires a held artifact.
    pub fn can_submit(&self) -> bool {
        match self {
            SessionStatus::Stopped => true,
            SessionStatus::Failed(reason) => reason.is_retryable_submit(),
            _ => false,
        }
    }
}

/// Errors returned to the caller of a controller operation.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("{operation} is not allowed while {status:?}")]
    InvalidState {
        operation: &'static str,
        status: SessionStatus,
    },

    #[error("A submission is already in flight")]
    SubmissionInFlight,

    #[error("No recorded artifact is held")]
    NoArtifact,

    #[error("Permission denied: {0}")]
    PermissionDenied(CaptureError),

    #[error("Capture failed: {0}")]
    Capture(CaptureError),

    #[error("Upload failed: {0}")]
    Upload(UploadError),

    #[error("Submission failed: {0}")]
    Submission(SubmissionError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_control_gating() {
        assert!(SessionStatus::NotStarted.can_request_permission());
        assert!(!SessionStatus::Recording.can_request_permission());
        assert!(SessionStatus::Recording.can_advance());
        assert!(SessionStatus::Stopped.can_submit());
        assert!(SessionStatus::Failed(FailureReason::UploadError("x".into())).can_submit());
        assert!(!SessionStatus::Failed(FailureReason::CaptureError("x".into())).can_submit());
        assert!(!SessionStatus::Uploading.can_submit());
    }

    #[test]
    fn test_status_serializes_with_reason() {
        let json = serde_json::to_value(SessionStatus::Failed(FailureReason::UploadError(
            "timeout".into(),
        )))
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "state": "failed",
                "reason": {"kind": "UploadError", "message": "timeout"}
            })
        );
        assert_eq!(
            serde_json::to_value(SessionStatus::Ready).unwrap(),
            serde_json::json!({"state": "ready"})
        );
    }
}
