//! Media layer: source acquisition, probing and keyframe capture.
//!
//! Wraps the `ffmpeg`/`ffprobe`/`yt-dlp` CLIs behind async functions. The only
//! stateful resource is the per-job temporary workspace, scoped by job id so
//! concurrent jobs on the same external video never collide.

pub mod command;
pub mod download;
pub mod error;
pub mod keyframes;
pub mod probe;
pub mod thumbnail;
pub mod workspace;

pub use command::{check_ffmpeg, check_ffprobe, check_ytdlp, FfmpegCommand, FfmpegRunner};
pub use download::acquire_source;
pub use error::{MediaError, MediaResult};
pub use keyframes::{
    spawn_cleanup, CaptureBatch, CaptureRequest, CapturedFrame, FrameSource, KeyframeExtractor,
};
pub use probe::{probe_video, VideoInfo};
pub use workspace::{cleanup_workspace, create_workspace, job_workspace};
