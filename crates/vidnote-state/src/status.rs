//! Client-facing status derivation.
//!
//! Everything the client sees is derived from the durable job row through one
//! fixed lookup table. The table's progress value always wins over the row's
//! raw stored progress, so clients observe a stable, monotonic sequence no
//! matter how individual stages report internally.

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::{self, Stream};
use serde::{Deserialize, Serialize};
use tracing::debug;
use vidnote_models::{CorrelationId, Job, ProcessingStatus};

use crate::error::StateResult;
use crate::store::JobStore;

/// Coarse status bucket reported to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusBucket {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// One status snapshot, as handed to clients by both poll and push paths.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub status: StatusBucket,
    /// Fixed per-stage progress from the lookup table, never raw row progress.
    pub progress: u8,
    pub current_step: String,
    /// Labels of pipeline steps strictly before the current one.
    pub completed_steps: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Fixed status label and progress table.
fn label_and_progress(status: ProcessingStatus) -> (&'static str, u8) {
    match status {
        ProcessingStatus::Pending => ("Initializing", 0),
        ProcessingStatus::ExtractingTranscript => ("Extracting transcript", 20),
        ProcessingStatus::GeneratingSummary => ("Generating AI summary", 40),
        ProcessingStatus::ExtractingKeyframes => ("Extracting keyframes", 60),
        ProcessingStatus::UploadingAssets => ("Uploading assets", 80),
        ProcessingStatus::Completed => ("Complete", 100),
        ProcessingStatus::Failed => ("Failed", 10),
    }
}

fn bucket(status: ProcessingStatus) -> StatusBucket {
    match status {
        ProcessingStatus::Pending => StatusBucket::Pending,
        ProcessingStatus::Completed => StatusBucket::Completed,
        ProcessingStatus::Failed => StatusBucket::Failed,
        _ => StatusBucket::Processing,
    }
}

/// The four working stages, in canonical order.
const WORK_STAGES: [ProcessingStatus; 4] = [
    ProcessingStatus::ExtractingTranscript,
    ProcessingStatus::GeneratingSummary,
    ProcessingStatus::ExtractingKeyframes,
    ProcessingStatus::UploadingAssets,
];

/// Derives client status snapshots from job rows.
#[derive(Clone)]
pub struct StatusFacade {
    store: Arc<dyn JobStore>,
}

impl StatusFacade {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }

    /// Snapshot for a correlation id. Unknown ids report the default pending
    /// state rather than an error, so a client that polls before the trigger
    /// write lands sees a coherent answer.
    pub async fn get_status(&self, correlation_id: &CorrelationId) -> StateResult<StatusReport> {
        match self.store.find_by_correlation(correlation_id).await? {
            Some(job) => Ok(Self::derive(&job)),
            None => {
                debug!(correlation_id = %correlation_id, "Status requested for unknown id");
                Ok(Self::default_report())
            }
        }
    }

    /// Poll-path alias; both paths share the same derivation.
    pub async fn poll(&self, correlation_id: &CorrelationId) -> StateResult<StatusReport> {
        self.get_status(correlation_id).await
    }

    /// Push path: re-reads the row on an interval and yields each snapshot,
    /// ending after the first terminal one.
    pub fn watch(
        &self,
        correlation_id: CorrelationId,
        interval: Duration,
    ) -> impl Stream<Item = StatusReport> + Send {
        let facade = self.clone();
        stream::unfold(false, move |done| {
            let facade = facade.clone();
            let correlation_id = correlation_id.clone();
            async move {
                if done {
                    return None;
                }
                let report = match facade.get_status(&correlation_id).await {
                    Ok(report) => report,
                    Err(_) => return None,
                };
                let terminal = matches!(
                    report.status,
                    StatusBucket::Completed | StatusBucket::Failed
                );
                if !terminal {
                    tokio::time::sleep(interval).await;
                }
                Some((report, terminal))
            }
        })
    }

    fn default_report() -> StatusReport {
        let (label, progress) = label_and_progress(ProcessingStatus::Pending);
        StatusReport {
            status: StatusBucket::Pending,
            progress,
            current_step: label.to_string(),
            completed_steps: Vec::new(),
            warnings: Vec::new(),
            error: None,
        }
    }

    fn derive(job: &Job) -> StatusReport {
        let status = job.processing_status;
        let (label, progress) = label_and_progress(status);

        StatusReport {
            status: bucket(status),
            progress,
            current_step: label.to_string(),
            completed_steps: Self::completed_steps(job),
            warnings: Self::warnings(job),
            error: job.processing_error.clone(),
        }
    }

    /// Steps strictly before the current one. A failed row reports the steps
    /// finished before the stage it died in, which the row still names in
    /// `current_step`.
    fn completed_steps(job: &Job) -> Vec<String> {
        let cutoff = match job.processing_status {
            ProcessingStatus::Completed => WORK_STAGES.len(),
            ProcessingStatus::Failed => WORK_STAGES
                .iter()
                .position(|s| label_and_progress(*s).0 == job.current_step)
                .unwrap_or(0),
            status => WORK_STAGES
                .iter()
                .position(|s| *s == status)
                .unwrap_or(0),
        };

        WORK_STAGES[..cutoff]
            .iter()
            .map(|s| label_and_progress(*s).0.to_string())
            .collect()
    }

    /// Soft conditions worth telling the client about.
    fn warnings(job: &Job) -> Vec<String> {
        let mut warnings = Vec::new();
        let past = |stage: ProcessingStatus| {
            job.processing_status == ProcessingStatus::Completed
                || job.processing_status.step_index() > stage.step_index()
        };

        if job.transcript.is_none() && past(ProcessingStatus::ExtractingTranscript) {
            warnings.push("No transcript was available for this video.".to_string());
        }
        if past(ProcessingStatus::GeneratingSummary) {
            if let Some(content) = &job.ai_content {
                if content.keyframe_intervals.is_empty() {
                    warnings.push("No usable keyframe moments were identified.".to_string());
                }
            }
        }
        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryJobStore;
    use futures_util::StreamExt;
    use vidnote_models::{JobId, TriggerRequest};

    async fn seeded() -> (StatusFacade, Arc<MemoryJobStore>, JobId, CorrelationId) {
        let store = Arc::new(MemoryJobStore::new());
        let correlation = CorrelationId::new();
        let job = Job::from_trigger(
            TriggerRequest {
                job_id: None,
                owner_id: "user-1".into(),
                source_url: "https://videos.example/watch?v=abc".into(),
                external_id: "abc".into(),
                title: "Lifetimes explained".into(),
                description: None,
                channel_name: None,
                duration_secs: Some(480),
                thumbnail_url: None,
            },
            correlation.clone(),
        );
        let id = job.id.clone();
        store.create(job).await.unwrap();

        let facade = StatusFacade::new(store.clone() as Arc<dyn JobStore>);
        (facade, store, id, correlation)
    }

    #[tokio::test]
    async fn unknown_id_reports_default_pending() {
        let store = Arc::new(MemoryJobStore::new());
        let facade = StatusFacade::new(store as Arc<dyn JobStore>);

        let report = facade.get_status(&CorrelationId::new()).await.unwrap();
        assert_eq!(report.status, StatusBucket::Pending);
        assert_eq!(report.progress, 0);
        assert_eq!(report.current_step, "Initializing");
        assert!(report.completed_steps.is_empty());
        assert!(report.warnings.is_empty());
    }

    #[tokio::test]
    async fn fixed_table_beats_raw_progress() {
        let (facade, store, id, correlation) = seeded().await;

        // Stage writes a raw progress of 33; the table still reports 40.
        store
            .begin_stage(
                &id,
                ProcessingStatus::GeneratingSummary,
                33,
                "Generating AI summary",
            )
            .await
            .unwrap();

        let report = facade.get_status(&correlation).await.unwrap();
        assert_eq!(report.status, StatusBucket::Processing);
        assert_eq!(report.progress, 40);
        assert_eq!(report.current_step, "Generating AI summary");
    }

    #[tokio::test]
    async fn completed_steps_are_strictly_before_current() {
        let (facade, store, id, correlation) = seeded().await;

        store
            .begin_stage(
                &id,
                ProcessingStatus::ExtractingKeyframes,
                60,
                "Extracting keyframes",
            )
            .await
            .unwrap();

        let report = facade.get_status(&correlation).await.unwrap();
        assert_eq!(
            report.completed_steps,
            vec!["Extracting transcript", "Generating AI summary"]
        );
    }

    #[tokio::test]
    async fn completed_job_reports_full_step_list() {
        let (facade, store, id, correlation) = seeded().await;
        store.set_transcript(&id, "transcript body").await.unwrap();
        store.complete(&id).await.unwrap();

        let report = facade.get_status(&correlation).await.unwrap();
        assert_eq!(report.status, StatusBucket::Completed);
        assert_eq!(report.progress, 100);
        assert_eq!(report.completed_steps.len(), 4);
    }

    #[tokio::test]
    async fn failed_job_reports_fixed_failed_progress_and_error() {
        let (facade, store, id, correlation) = seeded().await;
        store
            .begin_stage(
                &id,
                ProcessingStatus::GeneratingSummary,
                40,
                "Generating AI summary",
            )
            .await
            .unwrap();
        store.fail(&id, "AI analysis failed").await.unwrap();

        let report = facade.get_status(&correlation).await.unwrap();
        assert_eq!(report.status, StatusBucket::Failed);
        assert_eq!(report.progress, 10);
        assert_eq!(report.error.as_deref(), Some("AI analysis failed"));
        assert_eq!(report.completed_steps, vec!["Extracting transcript"]);
    }

    #[tokio::test]
    async fn missing_transcript_surfaces_as_warning_after_the_stage() {
        let (facade, store, id, correlation) = seeded().await;

        store
            .begin_stage(
                &id,
                ProcessingStatus::ExtractingTranscript,
                20,
                "Extracting transcript",
            )
            .await
            .unwrap();
        let report = facade.get_status(&correlation).await.unwrap();
        assert!(report.warnings.is_empty());

        store
            .begin_stage(
                &id,
                ProcessingStatus::GeneratingSummary,
                40,
                "Generating AI summary",
            )
            .await
            .unwrap();
        let report = facade.get_status(&correlation).await.unwrap();
        assert_eq!(
            report.warnings,
            vec!["No transcript was available for this video."]
        );
    }

    #[tokio::test]
    async fn watch_ends_on_terminal_status() {
        let (facade, store, id, correlation) = seeded().await;
        store.complete(&id).await.unwrap();

        let reports: Vec<StatusReport> = facade
            .watch(correlation, Duration::from_millis(1))
            .collect()
            .await;

        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].status, StatusBucket::Completed);
    }
}
