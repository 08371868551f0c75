//! Trigger service.
//!
//! Owns job admission: creates the durable row, hands the caller a
//! correlation id, and drives the saga in a spawned task. A semaphore bounds
//! how many jobs run concurrently; jobs for different videos share no mutable
//! state beyond the store.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{error, info, warn};
use vidnote_models::{CorrelationId, Job, JobId, TriggerRequest};
use vidnote_state::JobStore;

use crate::config::WorkerConfig;
use crate::error::PipelineResult;
use crate::pipeline::PipelineOrchestrator;

/// Accepts triggers and runs the pipeline for each accepted job.
pub struct PipelineService {
    store: Arc<dyn JobStore>,
    orchestrator: Arc<PipelineOrchestrator>,
    semaphore: Arc<Semaphore>,
    max_concurrent_jobs: usize,
    job_timeout: Duration,
}

impl PipelineService {
    pub fn new(
        store: Arc<dyn JobStore>,
        orchestrator: Arc<PipelineOrchestrator>,
        config: &WorkerConfig,
    ) -> Self {
        Self {
            store,
            orchestrator,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent_jobs)),
            max_concurrent_jobs: config.max_concurrent_jobs,
            job_timeout: config.job_timeout,
        }
    }

    /// Drain in-flight jobs, waiting up to `timeout` for every concurrency
    /// permit to come back. Returns false if jobs were still running when the
    /// timeout elapsed; those jobs keep their rows as-is and a later retry
    /// restarts them.
    pub async fn shutdown(&self, timeout: Duration) -> bool {
        let all = self.max_concurrent_jobs as u32;
        match tokio::time::timeout(timeout, self.semaphore.acquire_many(all)).await {
            Ok(Ok(_permits)) => {
                info!("All in-flight jobs drained");
                true
            }
            Ok(Err(_)) => true,
            Err(_) => {
                warn!("Shutdown timed out with jobs still in flight");
                false
            }
        }
    }

    /// Create the job row and start processing. Returns the correlation id
    /// the caller polls status with.
    pub async fn trigger(&self, request: TriggerRequest) -> PipelineResult<CorrelationId> {
        let correlation_id = CorrelationId::new();
        let job = Job::from_trigger(request, correlation_id.clone());
        let job_id = job.id.clone();

        info!(job_id = %job_id, correlation_id = %correlation_id, "Job accepted");
        self.store.create(job).await?;
        self.spawn_run(job_id);

        Ok(correlation_id)
    }

    /// Manual retry: full restart. The row resets to pending and the saga
    /// reruns from the top; stages are restart-safe because inputs are
    /// re-read from the store.
    pub async fn retry(&self, job_id: &JobId) -> PipelineResult<()> {
        let job = self.store.reset_for_retry(job_id).await?;
        info!(job_id = %job_id, retry = job.retry_count, "Job retry requested");
        self.spawn_run(job_id.clone());
        Ok(())
    }

    /// Cancellation: force the terminal failed status so pollers stop.
    /// In-flight external calls are not aborted; their results are discarded
    /// when they try to write to the now-terminal row.
    pub async fn cancel(&self, job_id: &JobId, reason: &str) -> PipelineResult<()> {
        self.store.force_fail(job_id, reason).await?;
        info!(job_id = %job_id, reason = reason, "Job cancelled");
        Ok(())
    }

    fn spawn_run(&self, job_id: JobId) {
        let orchestrator = self.orchestrator.clone();
        let store = self.store.clone();
        let semaphore = self.semaphore.clone();
        let job_timeout = self.job_timeout;

        tokio::spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    error!(job_id = %job_id, "Job semaphore closed, dropping job");
                    return;
                }
            };

            match tokio::time::timeout(job_timeout, orchestrator.run(&job_id)).await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    // Already persisted as failed by the orchestrator.
                    warn!(job_id = %job_id, "Job ended in failure: {}", e);
                }
                Err(_) => {
                    error!(job_id = %job_id, "Job timed out");
                    if let Err(e) = store.fail(&job_id, "Processing timed out").await {
                        error!(job_id = %job_id, "Failed to persist timeout: {}", e);
                    }
                }
            }
        });
    }
}
