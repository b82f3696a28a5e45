// Upload gateway - hands the finished recording to video storage

mod http;
mod retry;

pub use http::HttpUploadGateway;
pub use retry::RetryPolicy;

use crate::capture::Artifact;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Where the storage service put the artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredReference {
    pub url: String,
    pub file_name: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UploadError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Upload timed out")]
    Timeout,

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Authentication failed")]
    Authentication,

    #[error("Artifact is empty")]
    EmptyArtifact,

    #[error("Storage rejected upload: HTTP {status}: {body}")]
    Rejected { status: u16, body: String },

    #[error("Invalid storage response: {0}")]
    InvalidResponse(String),

    #[error("Upload gateway not configured: {0}")]
    NotConfigured(String),
}

impl UploadError {
    /// Returns true if the same request may succeed when sent again
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            UploadError::Network(_) | UploadError::Timeout | UploadError::RateLimited
        )
    }
}

#[async_trait]
pub trait UploadGateway: Send + Sync {
    async fn upload(&self, artifact: &Artifact) -> Result<StoredReference, UploadError>;

    /// Get gateway name
    fn name(&self) -> &str;
}
