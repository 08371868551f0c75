//! Transcript extraction DTOs.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Which extraction strategy produced the transcript.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptSource {
    /// Primary caption API.
    CaptionApi,
    /// Caption-track parse from video metadata.
    CaptionTrack,
    /// All strategies failed; no transcript available.
    #[default]
    None,
}

impl TranscriptSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CaptionApi => "caption_api",
            Self::CaptionTrack => "caption_track",
            Self::None => "none",
        }
    }
}

/// One timed caption segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TranscriptSegment {
    pub text: String,

    /// Offset from the start of the video, in seconds.
    pub start_secs: f64,

    /// Duration of the segment, in seconds.
    pub duration_secs: f64,
}

/// Result of a transcript extraction attempt.
///
/// Extraction never throws: all strategies failing yields
/// `success == false, source == None`, which the pipeline treats as a soft
/// condition rather than a stage failure.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TranscriptOutcome {
    pub success: bool,

    #[serde(default)]
    pub segments: Vec<TranscriptSegment>,

    /// Segments joined into one newline-separated text.
    pub full_text: String,

    pub source: TranscriptSource,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TranscriptOutcome {
    /// Build a successful outcome from timed segments.
    pub fn success(segments: Vec<TranscriptSegment>, source: TranscriptSource) -> Self {
        let full_text = segments
            .iter()
            .map(|s| s.text.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        Self {
            success: true,
            segments,
            full_text,
            source,
            error: None,
        }
    }

    /// Build the all-strategies-failed outcome.
    pub fn unavailable(error: impl Into<String>) -> Self {
        Self {
            success: false,
            segments: Vec::new(),
            full_text: String::new(),
            source: TranscriptSource::None,
            error: Some(error.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_success_joins_full_text() {
        let outcome = TranscriptOutcome::success(
            vec![
                TranscriptSegment {
                    text: "hello".into(),
                    start_secs: 0.0,
                    duration_secs: 1.5,
                },
                TranscriptSegment {
                    text: "world".into(),
                    start_secs: 1.5,
                    duration_secs: 1.0,
                },
            ],
            TranscriptSource::CaptionApi,
        );

        assert!(outcome.success);
        assert_eq!(outcome.full_text, "hello\nworld");
    }

    #[test]
    fn test_unavailable_has_none_source() {
        let outcome = TranscriptOutcome::unavailable("no captions");
        assert!(!outcome.success);
        assert_eq!(outcome.source, TranscriptSource::None);
        assert!(outcome.full_text.is_empty());
    }
}
