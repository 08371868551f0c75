//! Source video acquisition using yt-dlp.

use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::error::{MediaError, MediaResult};

/// Minimum file size (bytes) for an existing download to be reused.
const MIN_SOURCE_FILE_SIZE: u64 = 1024 * 1024;

/// Acquire the source video into the job workspace.
///
/// Reuses an existing file at `output_path` if one is already large enough.
/// Any failure here is a setup failure for the capture stage: the caller is
/// expected to clean up the workspace and abort.
pub async fn acquire_source(url: &str, output_path: impl AsRef<Path>) -> MediaResult<()> {
    let output_path = output_path.as_ref();

    if output_path.exists() {
        if let Ok(metadata) = output_path.metadata() {
            if metadata.len() > MIN_SOURCE_FILE_SIZE {
                info!("Using existing source file: {}", output_path.display());
                return Ok(());
            }
            warn!(
                "Existing file {} is too small ({} bytes), re-downloading",
                output_path.display(),
                metadata.len()
            );
            tokio::fs::remove_file(output_path).await?;
        }
    }

    which::which("yt-dlp").map_err(|_| MediaError::YtDlpNotFound)?;

    info!("Acquiring source from {} to {}", url, output_path.display());

    let output_path_str = output_path.to_string_lossy();
    let args = [
        "--no-playlist",
        "--concurrent-fragments",
        "1",
        "-f",
        "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best",
        "-o",
        &output_path_str,
        url,
    ];

    let output = Command::new("yt-dlp")
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        debug!("yt-dlp stderr: {}", stderr);
        return Err(MediaError::acquisition_failed(describe_failure(&stderr)));
    }

    if !output_path.exists() {
        return Err(MediaError::acquisition_failed(
            "yt-dlp reported success but produced no file",
        ));
    }

    info!("Source acquired: {}", output_path.display());
    Ok(())
}

/// Turn yt-dlp stderr into a short human-readable failure description.
fn describe_failure(stderr: &str) -> String {
    let lower = stderr.to_lowercase();

    if lower.contains("429") || lower.contains("too many requests") {
        return "Video host is rate limiting downloads".to_string();
    }
    if lower.contains("private video") || lower.contains("video is private") {
        return "Video is private".to_string();
    }
    if lower.contains("video unavailable") || lower.contains("not available") {
        return "Video is unavailable".to_string();
    }

    stderr
        .lines()
        .rev()
        .find(|l| !l.trim().is_empty())
        .unwrap_or("Unknown download error")
        .trim()
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_rate_limit() {
        assert_eq!(
            describe_failure("ERROR: HTTP Error 429: Too Many Requests"),
            "Video host is rate limiting downloads"
        );
    }

    #[test]
    fn test_describe_private_video() {
        assert_eq!(
            describe_failure("ERROR: Private video. Sign in if you've been granted access"),
            "Video is private"
        );
    }

    #[test]
    fn test_describe_falls_back_to_last_line() {
        assert_eq!(
            describe_failure("WARNING: something\nERROR: ffmpeg exited\n"),
            "ERROR: ffmpeg exited"
        );
    }
}
