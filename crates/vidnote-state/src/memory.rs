//! In-memory reference implementation of the job store.
//!
//! Backs the worker in tests and single-process deployments. A database-backed
//! implementation only has to satisfy the same `JobStore` contract.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::{debug, info};
use vidnote_models::{
    AiContent, CorrelationId, Job, JobId, Keyframe, NewKeyframe, ProcessingStatus,
};

use crate::error::{StateError, StateResult};
use crate::store::JobStore;

#[derive(Default)]
struct Tables {
    jobs: HashMap<JobId, Job>,
    keyframes: HashMap<JobId, Vec<Keyframe>>,
}

/// Thread-safe in-memory job store.
#[derive(Clone, Default)]
pub struct MemoryJobStore {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryJobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Apply a mutation to a non-terminal row. Terminal rows reject every
    /// write except the explicit retry reset.
    async fn update_live<F>(&self, job_id: &JobId, mutate: F) -> StateResult<Job>
    where
        F: FnOnce(&mut Job),
    {
        let mut tables = self.tables.write().await;
        let job = tables
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| StateError::NotFound(job_id.clone()))?;
        if job.is_terminal() {
            return Err(StateError::TerminalState(job_id.clone()));
        }
        mutate(job);
        Ok(job.clone())
    }
}

#[async_trait]
impl JobStore for MemoryJobStore {
    async fn create(&self, job: Job) -> StateResult<()> {
        debug!(job_id = %job.id, owner = %job.owner_id, "Creating job row");
        let mut tables = self.tables.write().await;
        tables.keyframes.entry(job.id.clone()).or_default();
        tables.jobs.insert(job.id.clone(), job);
        Ok(())
    }

    async fn get(&self, job_id: &JobId) -> StateResult<Job> {
        let tables = self.tables.read().await;
        tables
            .jobs
            .get(job_id)
            .cloned()
            .ok_or_else(|| StateError::NotFound(job_id.clone()))
    }

    async fn find_by_correlation(
        &self,
        correlation_id: &CorrelationId,
    ) -> StateResult<Option<Job>> {
        let tables = self.tables.read().await;
        Ok(tables
            .jobs
            .values()
            .find(|job| job.correlation_id.as_ref() == Some(correlation_id))
            .cloned())
    }

    async fn begin_stage(
        &self,
        job_id: &JobId,
        status: ProcessingStatus,
        progress: u8,
        step: &str,
    ) -> StateResult<Job> {
        debug!(job_id = %job_id, status = %status, "Stage transition");
        self.update_live(job_id, |job| job.begin_stage(status, progress, step))
            .await
    }

    async fn set_transcript(&self, job_id: &JobId, transcript: &str) -> StateResult<()> {
        self.update_live(job_id, |job| {
            job.transcript = Some(transcript.to_string());
            job.updated_at = chrono::Utc::now();
        })
        .await?;
        Ok(())
    }

    async fn set_ai_content(&self, job_id: &JobId, content: AiContent) -> StateResult<()> {
        let normalized = content.normalized();
        self.update_live(job_id, |job| {
            job.ai_content = Some(normalized);
            job.updated_at = chrono::Utc::now();
        })
        .await?;
        Ok(())
    }

    async fn insert_keyframes(
        &self,
        job_id: &JobId,
        keyframes: Vec<NewKeyframe>,
    ) -> StateResult<Vec<Keyframe>> {
        let mut tables = self.tables.write().await;
        if !tables.jobs.contains_key(job_id) {
            return Err(StateError::NotFound(job_id.clone()));
        }

        let mut rows: Vec<Keyframe> = keyframes
            .into_iter()
            .map(|new| Keyframe::from_new(job_id.clone(), new))
            .collect();
        rows.sort_by_key(|k| k.timestamp_secs);

        info!(job_id = %job_id, count = rows.len(), "Persisting keyframes");
        tables.keyframes.insert(job_id.clone(), rows.clone());
        Ok(rows)
    }

    async fn keyframes_for(&self, job_id: &JobId) -> StateResult<Vec<Keyframe>> {
        let tables = self.tables.read().await;
        if !tables.jobs.contains_key(job_id) {
            return Err(StateError::NotFound(job_id.clone()));
        }
        Ok(tables.keyframes.get(job_id).cloned().unwrap_or_default())
    }

    async fn complete(&self, job_id: &JobId) -> StateResult<Job> {
        info!(job_id = %job_id, "Job completed");
        self.update_live(job_id, |job| job.complete()).await
    }

    async fn fail(&self, job_id: &JobId, error: &str) -> StateResult<Job> {
        info!(job_id = %job_id, error = error, "Job failed");
        self.update_live(job_id, |job| job.fail(error)).await
    }

    async fn force_fail(&self, job_id: &JobId, reason: &str) -> StateResult<Job> {
        info!(job_id = %job_id, reason = reason, "Job force-failed");
        self.update_live(job_id, |job| job.fail(reason)).await
    }

    async fn reset_for_retry(&self, job_id: &JobId) -> StateResult<Job> {
        let mut tables = self.tables.write().await;
        let job = tables
            .jobs
            .get_mut(job_id)
            .ok_or_else(|| StateError::NotFound(job_id.clone()))?;
        job.reset_for_retry();
        let snapshot = job.clone();
        // A restart reruns every stage, so stale keyframe rows go with it.
        tables.keyframes.insert(job_id.clone(), Vec::new());
        info!(job_id = %job_id, retry = snapshot.retry_count, "Job reset for retry");
        Ok(snapshot)
    }

    async fn delete(&self, job_id: &JobId) -> StateResult<()> {
        let mut tables = self.tables.write().await;
        if tables.jobs.remove(job_id).is_none() {
            return Err(StateError::NotFound(job_id.clone()));
        }
        tables.keyframes.remove(job_id);
        info!(job_id = %job_id, "Job deleted with keyframes");
        Ok(())
    }
}
