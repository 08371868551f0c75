//! Job row definitions.
//!
//! One `Job` row per processing request. The row is the single durable source
//! of truth for pipeline progress: every stage persists its transition here
//! and the status facade derives client-facing progress purely from it.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::content::AiContent;

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Opaque identifier returned at trigger time and used for status lookups.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(transparent)]
pub struct CorrelationId(pub String);

impl CorrelationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for CorrelationId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Persisted processing status of a job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProcessingStatus {
    /// Row created, no stage has run yet.
    #[default]
    Pending,
    /// Fetching the spoken-word transcript.
    ExtractingTranscript,
    /// Generative model producing summary, tags and intervals.
    GeneratingSummary,
    /// Capturing still frames at validated timestamps.
    ExtractingKeyframes,
    /// Publishing artifacts to object storage.
    UploadingAssets,
    /// Pipeline finished successfully.
    Completed,
    /// A stage failed fatally.
    Failed,
}

impl ProcessingStatus {
    /// Canonical stage order. The status-label table and the orchestrator's
    /// execution order both follow this single list.
    pub const ORDERED: [ProcessingStatus; 7] = [
        ProcessingStatus::Pending,
        ProcessingStatus::ExtractingTranscript,
        ProcessingStatus::GeneratingSummary,
        ProcessingStatus::ExtractingKeyframes,
        ProcessingStatus::UploadingAssets,
        ProcessingStatus::Completed,
        ProcessingStatus::Failed,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::ExtractingTranscript => "extracting_transcript",
            Self::GeneratingSummary => "generating_summary",
            Self::ExtractingKeyframes => "extracting_keyframes",
            Self::UploadingAssets => "uploading_assets",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    /// Position in the canonical stage order.
    pub fn step_index(&self) -> usize {
        Self::ORDERED
            .iter()
            .position(|s| s == self)
            .unwrap_or_default()
    }

    /// Once terminal, no stage writes to the row again except an explicit
    /// manual retry that resets to pending.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

impl fmt::Display for ProcessingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Request that triggers a processing job.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct TriggerRequest {
    /// Caller-chosen job ID; a fresh one is generated when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub job_id: Option<JobId>,

    /// Owner supplied by the authentication layer.
    pub owner_id: String,

    /// Source video URL.
    pub source_url: String,

    /// External video ID on the hosting platform.
    pub external_id: String,

    /// Video title.
    pub title: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_name: Option<String>,

    /// Duration in seconds, when the caller already knows it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,
}

/// One durable row per processing request.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Job {
    /// Unique job ID.
    pub id: JobId,

    /// Owner of the job.
    pub owner_id: String,

    /// Source video URL.
    pub source_url: String,

    /// External video ID on the hosting platform.
    pub external_id: String,

    /// Video title.
    pub title: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel_name: Option<String>,

    /// Duration in seconds, if known.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<i64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub thumbnail_url: Option<String>,

    /// Derived transcript, absent when no strategy succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transcript: Option<String>,

    /// Structured AI payload, absent until the analysis stage persists it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ai_content: Option<AiContent>,

    /// Current processing status.
    #[serde(default)]
    pub processing_status: ProcessingStatus,

    /// Human-readable failure description; only set on fatal stage failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processing_error: Option<String>,

    /// Raw stored progress (0-100). The status facade's fixed table wins over
    /// this value when deriving client output.
    #[serde(default)]
    pub processing_progress: u8,

    /// Label of the currently running step.
    pub current_step: String,

    /// Label of the last step that finished.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_processed_step: Option<String>,

    /// Number of manual retries.
    #[serde(default)]
    pub retry_count: u32,

    /// Correlation ID handed back to the caller at trigger time.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<CorrelationId>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Create a fresh pending row from a trigger request.
    pub fn from_trigger(request: TriggerRequest, correlation_id: CorrelationId) -> Self {
        let now = Utc::now();
        Self {
            id: request.job_id.unwrap_or_default(),
            owner_id: request.owner_id,
            source_url: request.source_url,
            external_id: request.external_id,
            title: request.title,
            description: request.description,
            channel_name: request.channel_name,
            duration_secs: request.duration_secs,
            thumbnail_url: request.thumbnail_url,
            transcript: None,
            ai_content: None,
            processing_status: ProcessingStatus::Pending,
            processing_error: None,
            processing_progress: 0,
            current_step: "Initializing".to_string(),
            last_processed_step: None,
            retry_count: 0,
            correlation_id: Some(correlation_id),
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.processing_status.is_terminal()
    }

    /// Record the start of a stage.
    pub fn begin_stage(&mut self, status: ProcessingStatus, progress: u8, step: impl Into<String>) {
        self.last_processed_step = Some(std::mem::replace(&mut self.current_step, step.into()));
        self.processing_status = status;
        self.processing_progress = progress.min(100);
        self.updated_at = Utc::now();
    }

    /// Mark the job completed.
    pub fn complete(&mut self) {
        self.last_processed_step = Some(std::mem::replace(
            &mut self.current_step,
            "Complete".to_string(),
        ));
        self.processing_status = ProcessingStatus::Completed;
        self.processing_progress = 100;
        self.updated_at = Utc::now();
    }

    /// Mark the job failed with a human-readable error.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.processing_status = ProcessingStatus::Failed;
        self.processing_error = Some(error.into());
        self.updated_at = Utc::now();
    }

    /// Reset the row for an explicit manual retry (full restart).
    pub fn reset_for_retry(&mut self) {
        self.processing_status = ProcessingStatus::Pending;
        self.processing_error = None;
        self.processing_progress = 0;
        self.current_step = "Initializing".to_string();
        self.last_processed_step = None;
        self.retry_count += 1;
        self.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trigger() -> TriggerRequest {
        TriggerRequest {
            job_id: None,
            owner_id: "user-1".into(),
            source_url: "https://videos.example/watch?v=abc12345".into(),
            external_id: "abc12345".into(),
            title: "Intro to ownership".into(),
            description: None,
            channel_name: Some("Rustcasts".into()),
            duration_secs: Some(600),
            thumbnail_url: None,
        }
    }

    #[test]
    fn test_job_creation_is_pending() {
        let job = Job::from_trigger(trigger(), CorrelationId::new());
        assert_eq!(job.processing_status, ProcessingStatus::Pending);
        assert_eq!(job.processing_progress, 0);
        assert_eq!(job.current_step, "Initializing");
        assert!(!job.is_terminal());
        assert!(job.correlation_id.is_some());
    }

    #[test]
    fn test_stage_transitions() {
        let mut job = Job::from_trigger(trigger(), CorrelationId::new());

        job.begin_stage(
            ProcessingStatus::ExtractingTranscript,
            15,
            "Extracting transcript",
        );
        assert_eq!(
            job.processing_status,
            ProcessingStatus::ExtractingTranscript
        );
        assert_eq!(job.last_processed_step.as_deref(), Some("Initializing"));

        job.complete();
        assert!(job.is_terminal());
        assert_eq!(job.processing_progress, 100);
    }

    #[test]
    fn test_fail_records_error() {
        let mut job = Job::from_trigger(trigger(), CorrelationId::new());
        job.fail("AI analysis failed");
        assert_eq!(job.processing_status, ProcessingStatus::Failed);
        assert_eq!(job.processing_error.as_deref(), Some("AI analysis failed"));
        assert!(job.is_terminal());
    }

    #[test]
    fn test_retry_resets_to_pending() {
        let mut job = Job::from_trigger(trigger(), CorrelationId::new());
        job.fail("boom");
        job.reset_for_retry();

        assert_eq!(job.processing_status, ProcessingStatus::Pending);
        assert!(job.processing_error.is_none());
        assert_eq!(job.retry_count, 1);
    }

    #[test]
    fn test_canonical_step_order() {
        assert!(
            ProcessingStatus::GeneratingSummary.step_index()
                < ProcessingStatus::ExtractingKeyframes.step_index()
        );
        assert!(
            ProcessingStatus::ExtractingKeyframes.step_index()
                < ProcessingStatus::UploadingAssets.step_index()
        );
    }
}
