//! Thumbnail generation for captured frames.

use std::path::Path;

use crate::command::{FfmpegCommand, FfmpegRunner};
use crate::error::MediaResult;

/// Width of generated thumbnails; height follows the aspect ratio.
pub const THUMBNAIL_SCALE_WIDTH: u32 = 480;

/// Generate a scaled thumbnail from a captured frame.
pub async fn generate_thumbnail(
    frame_path: impl AsRef<Path>,
    output_path: impl AsRef<Path>,
) -> MediaResult<()> {
    let filter = format!("scale={}:-2", THUMBNAIL_SCALE_WIDTH);

    let cmd = FfmpegCommand::new(frame_path.as_ref(), output_path.as_ref())
        .video_filter(&filter)
        .log_level("error");

    FfmpegRunner::new().run(&cmd).await
}
