// Multipart upload to an HTTP video store

use super::{RetryPolicy, StoredReference, UploadError, UploadGateway};
use crate::capture::Artifact;
use crate::config::RecorderConfig;
use async_trait::async_trait;
use reqwest::multipart;
use serde_json::Value;
use std::time::Duration;

const URL_KEYS: [&str; 3] = ["url", "secure_url", "videoUrl"];
const FILE_NAME_KEYS: [&str; 3] = ["filename", "file_name", "public_id"];

pub struct HttpUploadGateway {
    endpoint: String,
    token: Option<String>,
    client: reqwest::Client,
    timeout: Duration,
    retry: RetryPolicy,
}

impl HttpUploadGateway {
    pub fn new(
        endpoint: impl Into<String>,
        token: Option<String>,
        timeout: Duration,
        retry: RetryPolicy,
    ) -> Result<Self, UploadError> {
        let endpoint = endpoint.into();
        if endpoint.trim().is_empty() {
            return Err(UploadError::NotConfigured("upload endpoint is empty".into()));
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| UploadError::NotConfigured(e.to_string()))?;

        tracing::info!("HTTP upload gateway initialized: {}", endpoint);

        Ok(Self {
            endpoint,
            token: token.filter(|t| !t.trim().is_empty()),
            client,
            timeout,
            retry,
        })
    }

    pub fn from_config(config: &RecorderConfig) -> Result<Self, UploadError> {
        let endpoint = config
            .upload_url
            .clone()
            .ok_or_else(|| UploadError::NotConfigured("upload_url is not set".into()))?;
        Self::new(
            endpoint,
            config.upload_token.clone(),
            Duration::from_secs(config.upload_timeout_secs),
            RetryPolicy::new(config.upload_max_retries),
        )
    }

    async fn try_upload(&self, artifact: &Artifact) -> Result<StoredReference, UploadError> {
        let file_part = multipart::Part::bytes(artifact.bytes.clone())
            .file_name(artifact.file_name.clone())
            .mime_str(&artifact.mime_type)
            .map_err(|e| UploadError::InvalidResponse(e.to_string()))?;
        let form = multipart::Form::new().part("file", file_part);

        let mut request = self.client.post(&self.endpoint).multipart(form);
        if let Some(token) = self.token.as_deref() {
            request = request.bearer_auth(token);
        }

        let response = match tokio::time::timeout(self.timeout, request.send()).await {
            Ok(result) => result,
            Err(_) => return Err(UploadError::Timeout),
        };

        match response {
            Ok(resp) => {
                let status = resp.status();
                let body = resp.text().await.unwrap_or_default();

                if status.is_success() {
                    parse_stored_reference(&body, &artifact.file_name)
                } else if status.as_u16() == 401 || status.as_u16() == 403 {
                    Err(UploadError::Authentication)
                } else if status.as_u16() == 429 {
                    Err(UploadError::RateLimited)
                } else if status.is_server_error() {
                    Err(UploadError::Network(format!("HTTP {}: {}", status, body)))
                } else {
                    Err(UploadError::Rejected {
                        status: status.as_u16(),
                        body,
                    })
                }
            }
            Err(e) => {
                if e.is_timeout() {
                    Err(UploadError::Timeout)
                } else {
                    Err(UploadError::Network(e.to_string()))
                }
            }
        }
    }
}

#[async_trait]
impl UploadGateway for HttpUploadGateway {
    async fn upload(&self, artifact: &Artifact) -> Result<StoredReference, UploadError> {
        if artifact.is_empty() {
            return Err(UploadError::EmptyArtifact);
        }

        tracing::info!(
            "Uploading {} ({} bytes, {:.1}s)",
            artifact.file_name,
            artifact.len(),
            artifact.duration_secs
        );

        let mut attempt = 0u8;
        loop {
            match self.try_upload(artifact).await {
                Ok(reference) => {
                    tracing::info!("Upload stored at {}", reference.url);
                    return Ok(reference);
                }
                Err(e) => {
                    tracing::warn!(
                        "Upload attempt {}/{} failed: {}",
                        attempt + 1,
                        self.retry.max_retries() + 1,
                        e
                    );
                    if self.retry.should_retry(attempt, &e) {
                        self.retry.wait_before_retry(attempt).await;
                        attempt += 1;
                        continue;
                    }
                    return Err(e);
                }
            }
        }
    }

    fn name(&self) -> &str {
        "HTTP upload"
    }
}

/// Pulls the stored location out of a storage service's JSON reply.
pub(crate) fn parse_stored_reference(
    body: &str,
    fallback_file_name: &str,
) -> Result<StoredReference, UploadError> {
    let value: Value = serde_json::from_str(body)
        .map_err(|e| UploadError::InvalidResponse(format!("not JSON: {}", e)))?;

    let url = URL_KEYS
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .ok_or_else(|| UploadError::InvalidResponse("no stored url in response".into()))?;

    let file_name = FILE_NAME_KEYS
        .iter()
        .find_map(|key| value.get(*key).and_then(Value::as_str))
        .map(str::to_string)
        .or_else(|| {
            url.rsplit('/')
                .next()
                .filter(|segment| !segment.is_empty())
                .map(str::to_string)
        })
        .unwrap_or_else(|| fallback_file_name.to_string());

    Ok(StoredReference {
        url: url.to_string(),
        file_name,
    })
}
