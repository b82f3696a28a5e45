use super::{Interview, InterviewError};
use crate::config::RecorderConfig;
use std::time::Duration;

/// Read-only client for the admin backend's interview endpoint.
pub struct InterviewClient {
    api_base_url: String,
    client: reqwest::Client,
}

impl InterviewClient {
    pub fn new(api_base_url: impl Into<String>, timeout: Duration) -> Result<Self, InterviewError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| InterviewError::Network(e.to_string()))?;

        Ok(Self {
            api_base_url: api_base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn from_config(config: &RecorderConfig) -> Result<Self, InterviewError> {
        Self::new(
            config.api_base_url.clone(),
            Duration::from_secs(config.submit_timeout_secs),
        )
    }

    pub async fn fetch(&self, interview_id: &str) -> Result<Interview, InterviewError> {
        let url = format!("{}/interview/{}", self.api_base_url, interview_id.trim());
        tracing::info!("Fetching interview from {}", url);

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| InterviewError::Network(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| InterviewError::Network(e.to_string()))?;

        if status.as_u16() == 404 {
            return Err(InterviewError::NotFound(interview_id.to_string()));
        }
        if !status.is_success() {
            return Err(InterviewError::Backend {
                status: status.as_u16(),
                body,
            });
        }

        let interview: Interview = serde_json::from_str(&body)
            .map_err(|e| InterviewError::InvalidResponse(e.to_string()))?;
        tracing::info!(
            "Interview '{}' loaded: {} questions, {}s total",
            interview.title,
            interview.playback_questions().len(),
            interview.total_duration_secs()
        );
        Ok(interview)
    }
}
