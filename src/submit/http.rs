// JSON submission to the interview backend

use super::{ApplicationSubmitter, CandidateFields, Confirmation, SubmissionError};
use crate::config::RecorderConfig;
use crate::upload::StoredReference;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_STATUS: &str = "pending";

/// Body shape of `POST /interview/{id}/applications`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ApplicationPayload<'a> {
    name: &'a str,
    surname: &'a str,
    email: &'a str,
    phone: &'a str,
    gdpr_consent: bool,
    video_url: &'a str,
}

impl<'a> ApplicationPayload<'a> {
    fn new(candidate: &'a CandidateFields, video: &'a StoredReference) -> Self {
        Self {
            name: candidate.name.trim(),
            surname: candidate.surname.trim(),
            email: candidate.email.trim(),
            phone: candidate.phone.trim(),
            gdpr_consent: candidate.gdpr_consent,
            video_url: &video.url,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreatedApplication {
    #[serde(rename = "_id", default)]
    id: Option<String>,
    #[serde(default)]
    status: Option<String>,
    #[serde(default)]
    video_url: Option<String>,
}

pub struct HttpApplicationSubmitter {
    api_base_url: String,
    client: reqwest::Client,
}

impl HttpApplicationSubmitter {
    pub fn new(api_base_url: impl Into<String>, timeout: Duration) -> Result<Self, SubmissionError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SubmissionError::Network(e.to_string()))?;

        Ok(Self {
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn from_config(config: &RecorderConfig) -> Result<Self, SubmissionError> {
        Self::new(
            config.api_base_url.clone(),
            Duration::from_secs(config.submit_timeout_secs),
        )
    }

    fn applications_url(&self, interview_id: &str) -> String {
        format!(
            "{}/interview/{}/applications",
            self.api_base_url,
            interview_id.trim()
        )
    }
}

#[async_trait]
impl ApplicationSubmitter for HttpApplicationSubmitter {
    async fn submit(
        &self,
        candidate: &CandidateFields,
        video: &StoredReference,
    ) -> Result<Confirmation, SubmissionError> {
        candidate.validate()?;

        let url = self.applications_url(&candidate.interview_id);
        tracing::info!("Submitting application to {}", url);

        let response = self
            .client
            .post(&url)
            .json(&ApplicationPayload::new(candidate, video))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    SubmissionError::Timeout
                } else {
                    SubmissionError::Network(e.to_string())
                }
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        if !status.is_success() {
            return Err(SubmissionError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        parse_confirmation(&body, &video.url)
    }
}

pub(crate) fn parse_confirmation(body: &str, video_url: &str) -> Result<Confirmation, SubmissionError> {
    let created: CreatedApplication = serde_json::from_str(body)
        .map_err(|e| SubmissionError::InvalidResponse(e.to_string()))?;

    Ok(Confirmation {
        application_id: created.id,
        status: created
            .status
            .unwrap_or_else(|| DEFAULT_STATUS.to_string()),
        video_url: created.video_url.unwrap_or_else(|| video_url.to_string()),
    })
}
