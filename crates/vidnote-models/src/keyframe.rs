//! Persisted keyframe captures.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::interval::IntervalCategory;
use crate::job::JobId;

/// Unique identifier for a persisted keyframe.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct KeyframeId(pub String);

impl KeyframeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for KeyframeId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for KeyframeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Scale a model confidence float in [0, 1] to an integer percentage.
pub fn confidence_pct(confidence: f64) -> u8 {
    (confidence.clamp(0.0, 1.0) * 100.0).round() as u8
}

/// A keyframe capture awaiting persistence.
///
/// Created only after the publisher confirms the corresponding upload.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct NewKeyframe {
    /// Timestamp in seconds.
    pub timestamp_secs: i64,

    /// Public URL of the published frame.
    pub asset_url: String,

    /// Public URL of the scaled companion thumbnail, when one was published.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,

    /// Why this moment was selected.
    pub description: String,

    /// Confidence percentage (0-100), scaled from the model's 0..1 float.
    pub confidence: u8,

    /// Category of the moment.
    pub category: IntervalCategory,

    /// File size of the published frame in bytes.
    pub file_size: u64,
}

/// A persisted keyframe row, owned by its parent job and removed with it.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Keyframe {
    pub id: KeyframeId,

    /// Parent job.
    pub job_id: JobId,

    pub timestamp_secs: i64,

    pub asset_url: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,

    pub description: String,

    pub confidence: u8,

    pub category: IntervalCategory,

    pub file_size: u64,

    pub created_at: DateTime<Utc>,
}

impl Keyframe {
    pub fn from_new(job_id: JobId, new: NewKeyframe) -> Self {
        Self {
            id: KeyframeId::new(),
            job_id,
            timestamp_secs: new.timestamp_secs,
            asset_url: new.asset_url,
            thumbnail_url: new.thumbnail_url,
            description: new.description,
            confidence: new.confidence,
            category: new.category,
            file_size: new.file_size,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_scaling() {
        assert_eq!(confidence_pct(0.0), 0);
        assert_eq!(confidence_pct(0.5), 50);
        assert_eq!(confidence_pct(1.0), 100);
        assert_eq!(confidence_pct(0.876), 88);
    }

    #[test]
    fn test_confidence_clamped() {
        assert_eq!(confidence_pct(-0.3), 0);
        assert_eq!(confidence_pct(1.7), 100);
    }
}
