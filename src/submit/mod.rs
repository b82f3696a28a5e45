// Application submitter - records the candidate against an interview

mod http;

pub use http::HttpApplicationSubmitter;

use crate::upload::StoredReference;
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use thiserror::Error;

/// Identity fields the candidate types into the public form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateFields {
    pub interview_id: String,
    pub name: String,
    pub surname: String,
    pub email: String,
    pub phone: String,
    pub gdpr_consent: bool,
}

impl CandidateFields {
    pub fn validate(&self) -> Result<(), SubmissionError> {
        let required = [
            ("interview id", &self.interview_id),
            ("name", &self.name),
            ("surname", &self.surname),
            ("email", &self.email),
            ("phone", &self.phone),
        ];
        if let Some((field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(SubmissionError::InvalidCandidate(format!("{} is required", field)));
        }

        static EMAIL_RE: OnceLock<Regex> = OnceLock::new();
        let re = EMAIL_RE.get_or_init(|| {
            Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("valid email regex")
        });
        if !re.is_match(self.email.trim()) {
            return Err(SubmissionError::InvalidCandidate(format!(
                "email '{}' is not valid",
                self.email.trim()
            )));
        }

        if !self.gdpr_consent {
            return Err(SubmissionError::InvalidCandidate(
                "GDPR consent is required".into(),
            ));
        }

        Ok(())
    }
}

/// The persisted application as acknowledged by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Confirmation {
    pub application_id: Option<String>,
    pub status: String,
    pub video_url: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubmissionError {
    #[error("Invalid candidate: {0}")]
    InvalidCandidate(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Submission timed out")]
    Timeout,

    #[error("Backend rejected application: HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Invalid backend response: {0}")]
    InvalidResponse(String),
}

#[async_trait]
pub trait ApplicationSubmitter: Send + Sync {
    async fn submit(
        &self,
        candidate: &CandidateFields,
        video: &StoredReference,
    ) -> Result<Confirmation, SubmissionError>;
}
