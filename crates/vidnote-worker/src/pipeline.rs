//! Pipeline orchestrator.
//!
//! A sequential saga: extract-transcript, ai-analysis, extract-keyframes,
//! upload-assets, finalize, plus an independent temp-file cleanup side
//! channel. Every stage persists its transition to the job store before doing
//! work, and stage inputs are re-read from the store rather than carried in
//! memory, so the durable row is the canonical answer to "where is this job"
//! and a resumed run computes on the same inputs a fresh run would.

use std::path::PathBuf;
use std::sync::Arc;

use metrics::counter;
use tracing::{error, info};
use vidnote_media::{job_workspace, spawn_cleanup, CaptureBatch, CaptureRequest, FrameSource};
use vidnote_models::{
    confidence_pct, Interval, Job, JobId, NewKeyframe, ProcessingStatus,
};
use vidnote_state::JobStore;
use vidnote_storage::{AssetPublisher, KeyframeUpload, PublishedKeyframe};

use crate::analysis::{AnalysisEngine, AnalysisInput};
use crate::error::{PipelineError, PipelineResult};
use crate::logging::JobLogger;
use crate::transcript::TranscriptFetcher;

/// Orchestrates one job end to end.
pub struct PipelineOrchestrator {
    store: Arc<dyn JobStore>,
    transcripts: Arc<dyn TranscriptFetcher>,
    engine: AnalysisEngine,
    frames: Arc<dyn FrameSource>,
    publisher: AssetPublisher,
    work_dir: PathBuf,
}

impl PipelineOrchestrator {
    pub fn new(
        store: Arc<dyn JobStore>,
        transcripts: Arc<dyn TranscriptFetcher>,
        engine: AnalysisEngine,
        frames: Arc<dyn FrameSource>,
        publisher: AssetPublisher,
        work_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            store,
            transcripts,
            engine,
            frames,
            publisher,
            work_dir: work_dir.into(),
        }
    }

    /// Run the saga for one job. A stage failure persists the user-facing
    /// error and the failed status; data written by earlier successful stages
    /// is retained, never rolled back.
    pub async fn run(&self, job_id: &JobId) -> PipelineResult<()> {
        match self.execute(job_id).await {
            Ok(()) => {
                counter!("vidnote_jobs_completed_total").increment(1);
                Ok(())
            }
            Err(e) => {
                counter!("vidnote_jobs_failed_total").increment(1);
                error!(job_id = %job_id, "Pipeline failed: {}", e);
                if let Err(store_err) = self.store.fail(job_id, &e.user_message()).await {
                    error!(job_id = %job_id, "Failed to persist failure: {}", store_err);
                }
                Err(e)
            }
        }
    }

    async fn execute(&self, job_id: &JobId) -> PipelineResult<()> {
        let job = self.store.get(job_id).await?;

        self.extract_transcript(&job).await?;
        self.run_analysis(job_id).await?;

        // Re-read: capture consumes the already-validated intervals the
        // analysis stage persisted, not an in-memory copy.
        let job = self.store.get(job_id).await?;
        let intervals = job
            .ai_content
            .as_ref()
            .map(|c| c.keyframe_intervals.clone())
            .unwrap_or_default();

        if intervals.is_empty() {
            // Soft condition: nothing to capture, the job still completes.
            // The transcript stage may have left files in the workspace.
            let logger = JobLogger::new(job_id, "extract_keyframes");
            logger.log_warning("No validated intervals; skipping capture and upload");
            self.store.complete(job_id).await?;
            spawn_cleanup(
                job_workspace(&self.work_dir, job_id.as_str()),
                job_id.to_string(),
            );
            return Ok(());
        }

        let batch = self.extract_keyframes(&job, &intervals).await?;
        let published = self.upload_assets(&job, &batch).await?;
        self.finalize(&job, &intervals, published).await?;

        spawn_cleanup(batch.temp_dir, job_id.to_string());
        Ok(())
    }

    async fn extract_transcript(&self, job: &Job) -> PipelineResult<()> {
        let logger = JobLogger::new(&job.id, "extract_transcript");
        self.store
            .begin_stage(
                &job.id,
                ProcessingStatus::ExtractingTranscript,
                20,
                "Extracting transcript",
            )
            .await?;
        logger.log_start(&format!("external_id={}", job.external_id));

        let workdir = job_workspace(&self.work_dir, job.id.as_str());
        let outcome = self.transcripts.fetch(&job.external_id, &workdir).await;

        if outcome.success {
            self.store.set_transcript(&job.id, &outcome.full_text).await?;
            logger.log_completion(&format!(
                "{} segments via {}",
                outcome.segments.len(),
                outcome.source.as_str()
            ));
        } else {
            // Soft: absence of a transcript alone never fails the job.
            counter!("vidnote_transcripts_unavailable_total").increment(1);
            logger.log_warning(&format!(
                "No transcript available: {}",
                outcome.error.as_deref().unwrap_or("unknown")
            ));
        }
        Ok(())
    }

    async fn run_analysis(&self, job_id: &JobId) -> PipelineResult<()> {
        let logger = JobLogger::new(job_id, "ai_analysis");
        self.store
            .begin_stage(
                job_id,
                ProcessingStatus::GeneratingSummary,
                40,
                "Generating AI summary",
            )
            .await?;
        logger.log_start("running analysis");

        // Transcript comes back from the store, not from the previous stage's
        // return value.
        let job = self.store.get(job_id).await?;
        let input = AnalysisInput {
            title: job.title.clone(),
            description: job.description.clone(),
            duration_secs: job.duration_secs,
            transcript: job.transcript.clone(),
            channel_name: job.channel_name.clone(),
            source_ref: Some(job.source_url.clone()),
        };

        let content = self.engine.analyze(&input).await?;
        logger.log_completion(&format!(
            "{} validated intervals",
            content.keyframe_intervals.len()
        ));
        self.store.set_ai_content(job_id, content).await?;
        Ok(())
    }

    async fn extract_keyframes(
        &self,
        job: &Job,
        intervals: &[Interval],
    ) -> PipelineResult<CaptureBatch> {
        let logger = JobLogger::new(&job.id, "extract_keyframes");
        self.store
            .begin_stage(
                &job.id,
                ProcessingStatus::ExtractingKeyframes,
                60,
                "Extracting keyframes",
            )
            .await?;
        logger.log_start(&format!("{} target timestamps", intervals.len()));

        let request = CaptureRequest {
            timestamps: intervals.iter().map(|i| i.timestamp_secs).collect(),
            ..CaptureRequest::default()
        };

        let batch = self
            .frames
            .extract(&job.source_url, job.id.as_str(), &request)
            .await?;

        logger.log_completion(&format!("captured {} frames", batch.frames.len()));
        Ok(batch)
    }

    async fn upload_assets(
        &self,
        job: &Job,
        batch: &CaptureBatch,
    ) -> PipelineResult<Vec<PublishedKeyframe>> {
        let logger = JobLogger::new(&job.id, "upload_assets");
        self.store
            .begin_stage(
                &job.id,
                ProcessingStatus::UploadingAssets,
                80,
                "Uploading assets",
            )
            .await?;
        logger.log_start(&format!("{} frames to publish", batch.frames.len()));

        let uploads: Vec<KeyframeUpload> = batch
            .frames
            .iter()
            .map(|frame| KeyframeUpload {
                timestamp_secs: frame.timestamp_secs,
                path: frame.path.clone(),
                thumbnail_path: frame.thumbnail_path.clone(),
            })
            .collect();

        let assets = self
            .publisher
            .publish_keyframes(&job.owner_id, &job.id, &uploads)
            .await?;

        // Transcript and analysis blobs ride in the same stage; their
        // failures are per-asset soft conditions too.
        if let Some(transcript) = &job.transcript {
            self.publisher
                .publish_transcript(&job.owner_id, &job.id, transcript)
                .await?;
        }
        if let Some(content) = &job.ai_content {
            self.publisher
                .publish_analysis(&job.owner_id, &job.id, content)
                .await?;
        }

        logger.log_completion(&format!(
            "{} uploaded, {} failed",
            assets.keyframes.len(),
            assets.failures.len()
        ));
        Ok(assets.keyframes)
    }

    /// Pair uploaded frames with validated intervals by timestamp and persist
    /// one keyframe row per confirmed upload, then mark the job completed.
    async fn finalize(
        &self,
        job: &Job,
        intervals: &[Interval],
        published: Vec<PublishedKeyframe>,
    ) -> PipelineResult<()> {
        let logger = JobLogger::new(&job.id, "finalize");

        let rows: Vec<NewKeyframe> = published
            .into_iter()
            .filter_map(|pk| {
                let interval = intervals
                    .iter()
                    .find(|i| i.timestamp_secs == pk.timestamp_secs)?;
                Some(NewKeyframe {
                    timestamp_secs: pk.timestamp_secs,
                    asset_url: pk.url,
                    thumbnail_url: pk.thumbnail_url,
                    description: interval.reason.clone(),
                    confidence: confidence_pct(interval.confidence),
                    category: interval.category,
                    file_size: pk.size,
                })
            })
            .collect();

        let count = rows.len();
        self.store.insert_keyframes(&job.id, rows).await?;
        self.store.complete(&job.id).await?;

        counter!("vidnote_keyframes_persisted_total").increment(count as u64);
        logger.log_completion(&format!("{} keyframe rows persisted", count));
        info!(job_id = %job.id, "Job completed");
        Ok(())
    }
}
