//! Keyframe capture.
//!
//! Acquires the source video into a job-scoped workspace, probes the true
//! duration, then sequentially seeks and captures one frame per target
//! timestamp at bounded resolution. A single timestamp's failure is swallowed
//! and logged; failing to acquire or open the source at all is a fatal setup
//! failure that cleans up the workspace.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{info, warn};

use vidnote_models::evenly_spaced_intervals;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::{MediaError, MediaResult};
use crate::probe::probe_video;
use crate::thumbnail::generate_thumbnail;
use crate::download;
use crate::workspace::{cleanup_workspace, create_workspace};

/// Capture parameters for one job.
#[derive(Debug, Clone)]
pub struct CaptureRequest {
    /// Target timestamps in seconds. Evenly-spaced targets are computed from
    /// the probed duration when empty.
    pub timestamps: Vec<i64>,
    /// JPEG quality (2 = best, 31 = worst).
    pub quality: u8,
    /// Maximum frame width.
    pub max_width: u32,
    /// Maximum frame height.
    pub max_height: u32,
}

impl Default for CaptureRequest {
    fn default() -> Self {
        Self {
            timestamps: Vec::new(),
            quality: 3,
            max_width: 1280,
            max_height: 720,
        }
    }
}

/// One successfully captured frame.
#[derive(Debug, Clone)]
pub struct CapturedFrame {
    /// Timestamp in seconds.
    pub timestamp_secs: i64,
    /// Path of the captured frame in the workspace.
    pub path: PathBuf,
    /// Path of the scaled companion thumbnail, if it rendered.
    pub thumbnail_path: Option<PathBuf>,
    /// File size in bytes.
    pub size: u64,
}

/// Result of a capture batch.
#[derive(Debug, Clone)]
pub struct CaptureBatch {
    /// Captured frames, in target-timestamp order. Failed points are absent.
    pub frames: Vec<CapturedFrame>,
    /// Job workspace holding the frames; the publisher still needs it, so the
    /// caller triggers cleanup separately.
    pub temp_dir: PathBuf,
    /// Probed source duration in seconds.
    pub duration_secs: f64,
}

/// Seam for the capture stage so the orchestrator can be tested with fakes.
#[async_trait]
pub trait FrameSource: Send + Sync {
    async fn extract(
        &self,
        source_url: &str,
        job_id: &str,
        request: &CaptureRequest,
    ) -> MediaResult<CaptureBatch>;
}

/// FFmpeg-backed keyframe extractor.
#[derive(Debug, Clone)]
pub struct KeyframeExtractor {
    work_root: PathBuf,
    capture_timeout_secs: u64,
}

impl KeyframeExtractor {
    pub fn new(work_root: impl Into<PathBuf>) -> Self {
        Self {
            work_root: work_root.into(),
            capture_timeout_secs: 120,
        }
    }

    pub fn with_capture_timeout(mut self, secs: u64) -> Self {
        self.capture_timeout_secs = secs;
        self
    }

    async fn capture_one(
        &self,
        source: &PathBuf,
        dir: &PathBuf,
        timestamp_secs: i64,
        request: &CaptureRequest,
    ) -> MediaResult<CapturedFrame> {
        let frame_path = dir.join(format!("keyframe_{:06}.jpg", timestamp_secs));
        let filter = format!(
            "scale='min({},iw)':'min({},ih)':force_original_aspect_ratio=decrease",
            request.max_width, request.max_height
        );

        let cmd = FfmpegCommand::new(source, &frame_path)
            .seek(timestamp_secs as f64)
            .single_frame()
            .video_filter(&filter)
            .jpeg_quality(request.quality);

        FfmpegRunner::new()
            .with_timeout(self.capture_timeout_secs)
            .run(&cmd)
            .await?;

        let size = tokio::fs::metadata(&frame_path).await?.len();
        if size == 0 {
            return Err(MediaError::InvalidVideo(format!(
                "Empty frame at {}s",
                timestamp_secs
            )));
        }

        // Thumbnail failure only costs the thumbnail, not the frame.
        let thumb_path = dir.join(format!("thumb_{:06}.jpg", timestamp_secs));
        let thumbnail_path = match generate_thumbnail(&frame_path, &thumb_path).await {
            Ok(()) => Some(thumb_path),
            Err(e) => {
                warn!("Thumbnail for {}s failed: {}", timestamp_secs, e);
                None
            }
        };

        Ok(CapturedFrame {
            timestamp_secs,
            path: frame_path,
            thumbnail_path,
            size,
        })
    }
}

#[async_trait]
impl FrameSource for KeyframeExtractor {
    async fn extract(
        &self,
        source_url: &str,
        job_id: &str,
        request: &CaptureRequest,
    ) -> MediaResult<CaptureBatch> {
        let dir = create_workspace(&self.work_root, job_id).await?;
        let source = dir.join("source.mp4");

        // Acquisition or probing failure is a fatal setup failure: tear the
        // workspace down and report it.
        let info = match setup(source_url, &source).await {
            Ok(info) => info,
            Err(e) => {
                cleanup_workspace(&dir).await;
                return Err(e);
            }
        };

        let targets: Vec<i64> = if request.timestamps.is_empty() {
            evenly_spaced_intervals(info.duration_secs as i64)
                .into_iter()
                .map(|i| i.timestamp_secs)
                .collect()
        } else {
            request.timestamps.clone()
        };

        info!(
            job_id = %job_id,
            duration = info.duration_secs,
            targets = targets.len(),
            "Capturing keyframes"
        );

        let mut frames = Vec::with_capacity(targets.len());
        for timestamp_secs in targets {
            if (timestamp_secs as f64) >= info.duration_secs {
                warn!(
                    "Skipping {}s: beyond decodable duration {:.1}s",
                    timestamp_secs, info.duration_secs
                );
                continue;
            }

            match self
                .capture_one(&source, &dir, timestamp_secs, request)
                .await
            {
                Ok(frame) => frames.push(frame),
                Err(e) => {
                    warn!("Capture at {}s failed, skipping: {}", timestamp_secs, e);
                }
            }
        }

        info!(job_id = %job_id, captured = frames.len(), "Keyframe capture finished");

        Ok(CaptureBatch {
            frames,
            temp_dir: dir,
            duration_secs: info.duration_secs,
        })
    }
}

async fn setup(source_url: &str, source: &PathBuf) -> MediaResult<crate::probe::VideoInfo> {
    download::acquire_source(source_url, source).await?;
    probe_video(source).await
}

/// Fire-and-forget cleanup trigger for a job workspace.
pub fn spawn_cleanup(temp_dir: PathBuf, job_id: String) {
    tokio::spawn(async move {
        info!(job_id = %job_id, "Cleaning up temp files");
        cleanup_workspace(&temp_dir).await;
    });
}
