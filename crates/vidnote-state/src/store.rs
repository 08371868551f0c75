//! Durable job store contract.
//!
//! The pipeline never holds job state in memory between stages: every
//! transition is written here and every stage re-reads its inputs from the
//! row. Implementations must enforce the terminal-row invariant: once a job
//! is `completed` or `failed`, only `reset_for_retry` may touch it again.

use async_trait::async_trait;
use vidnote_models::{
    AiContent, CorrelationId, Job, JobId, Keyframe, NewKeyframe, ProcessingStatus,
};

use crate::error::StateResult;

#[async_trait]
pub trait JobStore: Send + Sync {
    /// Persist a fresh job row.
    async fn create(&self, job: Job) -> StateResult<()>;

    /// Fetch a job by id.
    async fn get(&self, job_id: &JobId) -> StateResult<Job>;

    /// Look up a job by the correlation id handed out at trigger time.
    async fn find_by_correlation(&self, correlation_id: &CorrelationId)
        -> StateResult<Option<Job>>;

    /// Record the start of a pipeline stage.
    async fn begin_stage(
        &self,
        job_id: &JobId,
        status: ProcessingStatus,
        progress: u8,
        step: &str,
    ) -> StateResult<Job>;

    /// Persist the extracted transcript text.
    async fn set_transcript(&self, job_id: &JobId, transcript: &str) -> StateResult<()>;

    /// Persist the structured AI payload. The payload is normalized before it
    /// is written so re-submitting an identical document is idempotent.
    async fn set_ai_content(&self, job_id: &JobId, content: AiContent) -> StateResult<()>;

    /// Persist keyframe rows for a job. Called once, after uploads confirm.
    async fn insert_keyframes(
        &self,
        job_id: &JobId,
        keyframes: Vec<NewKeyframe>,
    ) -> StateResult<Vec<Keyframe>>;

    /// All keyframe rows belonging to a job, ordered by timestamp.
    async fn keyframes_for(&self, job_id: &JobId) -> StateResult<Vec<Keyframe>>;

    /// Mark the job completed.
    async fn complete(&self, job_id: &JobId) -> StateResult<Job>;

    /// Mark the job failed with a user-presentable error message.
    async fn fail(&self, job_id: &JobId, error: &str) -> StateResult<Job>;

    /// Force a non-terminal job into `failed`. This is the cancellation
    /// mechanism: there is no in-flight abort, pollers simply stop on the
    /// terminal status.
    async fn force_fail(&self, job_id: &JobId, reason: &str) -> StateResult<Job>;

    /// Reset a job for a full manual restart. The only write permitted on a
    /// terminal row.
    async fn reset_for_retry(&self, job_id: &JobId) -> StateResult<Job>;

    /// Delete a job and, in cascade, its keyframe rows.
    async fn delete(&self, job_id: &JobId) -> StateResult<()>;
}
