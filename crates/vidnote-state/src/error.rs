//! State store error types.

use thiserror::Error;
use vidnote_models::JobId;

pub type StateResult<T> = Result<T, StateError>;

#[derive(Debug, Error)]
pub enum StateError {
    #[error("Job not found: {0}")]
    NotFound(JobId),

    #[error("Job {0} is in a terminal state and cannot be modified")]
    TerminalState(JobId),

    #[error("Store backend error: {0}")]
    Backend(String),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StateError {
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }
}
