//! Pipeline error types.

use thiserror::Error;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("AI analysis failed: {0}")]
    AiFailed(String),

    #[error("Keyframe extraction failed: {0}")]
    ExtractionFailed(String),

    #[error("Asset upload failed: {0}")]
    UploadFailed(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Media error: {0}")]
    Media(#[from] vidnote_media::MediaError),

    #[error("Storage error: {0}")]
    Storage(#[from] vidnote_storage::StorageError),

    #[error("State store error: {0}")]
    State(#[from] vidnote_state::StateError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn ai_failed(msg: impl Into<String>) -> Self {
        Self::AiFailed(msg.into())
    }

    pub fn extraction_failed(msg: impl Into<String>) -> Self {
        Self::ExtractionFailed(msg.into())
    }

    pub fn upload_failed(msg: impl Into<String>) -> Self {
        Self::UploadFailed(msg.into())
    }

    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// The human-readable string persisted as the job's processing error.
    /// Raw underlying detail stays in the logs, never in the row.
    pub fn user_message(&self) -> String {
        match self {
            Self::AiFailed(_) => "AI analysis failed".to_string(),
            Self::ExtractionFailed(_) | Self::Media(_) => {
                "Keyframe extraction failed".to_string()
            }
            Self::UploadFailed(_) | Self::Storage(_) => "Asset upload failed".to_string(),
            Self::ConfigError(_) => "Worker is misconfigured".to_string(),
            Self::State(_) => "Internal state error".to_string(),
            Self::Json(_) | Self::Io(_) => "Internal processing error".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_message_hides_raw_detail() {
        let err = PipelineError::ai_failed("model returned 429: quota exhausted for key abc123");
        assert_eq!(err.user_message(), "AI analysis failed");
        assert!(!err.user_message().contains("abc123"));
    }
}
