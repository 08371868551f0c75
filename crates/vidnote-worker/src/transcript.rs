//! Transcript extraction.
//!
//! Tries the caption API first for speed, then falls back to a caption-track
//! download and WebVTT parse. Each strategy absorbs its own errors and returns
//! a failure object, so the caller can fall through; both strategies failing
//! is a soft condition, never a stage failure.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use tracing::{info, warn};
use vidnote_models::{TranscriptOutcome, TranscriptSegment, TranscriptSource};

const CAPTION_API_TIMEOUT: Duration = Duration::from_secs(25);

/// Seam for the transcript stage so the orchestrator can be tested with fakes.
#[async_trait]
pub trait TranscriptFetcher: Send + Sync {
    /// Fetch a transcript. Never errors: all strategies failing yields an
    /// unavailable outcome.
    async fn fetch(&self, external_id: &str, workdir: &Path) -> TranscriptOutcome;
}

/// Production extractor: caption API, then caption-track parse via yt-dlp.
pub struct CaptionExtractor {
    client: reqwest::Client,
    caption_api_base: String,
}

impl CaptionExtractor {
    pub fn new() -> Self {
        Self {
            client: reqwest::Client::new(),
            caption_api_base: std::env::var("CAPTION_API_BASE")
                .unwrap_or_else(|_| "https://video.google.com/timedtext".to_string()),
        }
    }

    async fn try_caption_api(&self, external_id: &str) -> Result<Vec<TranscriptSegment>, String> {
        let url = format!(
            "{}?lang=en&v={}&fmt=json3",
            self.caption_api_base, external_id
        );
        info!(external_id = external_id, "Fetching captions via caption API");

        let response = self
            .client
            .get(&url)
            .timeout(CAPTION_API_TIMEOUT)
            .send()
            .await
            .map_err(|e| format!("caption API request failed: {}", e))?;

        if !response.status().is_success() {
            return Err(format!("caption API returned {}", response.status()));
        }

        let body = response
            .text()
            .await
            .map_err(|e| format!("caption API body read failed: {}", e))?;

        let segments = parse_timedtext(&body)?;
        if segments.is_empty() {
            return Err("caption API returned no usable segments".to_string());
        }
        Ok(segments)
    }

    async fn try_caption_track(
        &self,
        external_id: &str,
        workdir: &Path,
    ) -> Result<Vec<TranscriptSegment>, String> {
        info!(external_id = external_id, "Fetching captions via yt-dlp subtitle track");

        tokio::fs::create_dir_all(workdir)
            .await
            .map_err(|e| format!("failed to create workdir: {}", e))?;

        let output_template = workdir.join("%(id)s");
        let output_template_str = output_template.to_string_lossy().to_string();

        let output = tokio::process::Command::new("yt-dlp")
            .args([
                "--write-auto-sub",
                "--write-sub",
                "--sub-lang",
                "en,en-US,en-GB",
                "--skip-download",
                "--sub-format",
                "vtt",
                "--no-playlist",
                "--output",
                output_template_str.as_str(),
                external_id,
            ])
            .output()
            .await
            .map_err(|e| format!("failed to run yt-dlp: {}", e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(format!("yt-dlp subtitle download failed: {}", stderr.trim()));
        }

        let mut vtt_files: Vec<_> = std::fs::read_dir(workdir)
            .map_err(|e| format!("failed to read workdir: {}", e))?
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.path().extension().and_then(|s| s.to_str()) == Some("vtt"))
            .collect();

        if vtt_files.is_empty() {
            return Err("no caption track downloaded; video may not have captions".to_string());
        }

        // Prefer English tracks
        vtt_files.sort_by_key(|entry| {
            let name = entry.file_name();
            if name.to_string_lossy().contains(".en") {
                0
            } else {
                1
            }
        });

        let vtt_path = vtt_files[0].path();
        let content = tokio::fs::read_to_string(&vtt_path)
            .await
            .map_err(|e| format!("failed to read caption file: {}", e))?;

        for entry in vtt_files {
            tokio::fs::remove_file(entry.path()).await.ok();
        }

        let segments = parse_vtt(&content);
        if segments.is_empty() {
            return Err("caption track was empty after parsing".to_string());
        }
        Ok(segments)
    }
}

impl Default for CaptionExtractor {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TranscriptFetcher for CaptionExtractor {
    async fn fetch(&self, external_id: &str, workdir: &Path) -> TranscriptOutcome {
        let mut errors: Vec<String> = Vec::new();

        match self.try_caption_api(external_id).await {
            Ok(segments) => {
                let outcome = TranscriptOutcome::success(segments, TranscriptSource::CaptionApi);
                persist_transcript(workdir, &outcome.full_text).await;
                return outcome;
            }
            Err(e) => {
                warn!(external_id = external_id, "Caption API strategy failed: {}", e);
                errors.push(e);
            }
        }

        match self.try_caption_track(external_id, workdir).await {
            Ok(segments) => {
                let outcome = TranscriptOutcome::success(segments, TranscriptSource::CaptionTrack);
                persist_transcript(workdir, &outcome.full_text).await;
                return outcome;
            }
            Err(e) => {
                warn!(external_id = external_id, "Caption track strategy failed: {}", e);
                errors.push(e);
            }
        }

        info!(external_id = external_id, "No transcript available from any strategy");
        TranscriptOutcome::unavailable(errors.join("; "))
    }
}

/// Write the transcript into the job workspace for later publishing and
/// debugging. Failure only costs the file.
async fn persist_transcript(workdir: &Path, transcript: &str) {
    if let Err(e) = tokio::fs::create_dir_all(workdir).await {
        warn!(path = ?workdir, error = %e, "Failed to create transcript workdir");
        return;
    }
    let transcript_path = workdir.join("transcript.txt");
    if let Err(e) = tokio::fs::write(&transcript_path, transcript).await {
        warn!(
            path = ?transcript_path,
            error = %e,
            "Failed to write transcript to disk"
        );
    }
}

#[derive(Debug, Deserialize)]
struct TimedTextBody {
    #[serde(default)]
    events: Vec<TimedTextEvent>,
}

#[derive(Debug, Deserialize)]
struct TimedTextEvent {
    #[serde(rename = "tStartMs", default)]
    start_ms: u64,
    #[serde(rename = "dDurationMs", default)]
    duration_ms: u64,
    #[serde(default)]
    segs: Vec<TimedTextSeg>,
}

#[derive(Debug, Deserialize)]
struct TimedTextSeg {
    #[serde(default)]
    utf8: String,
}

/// Parse the caption API's json3 payload into timed segments.
fn parse_timedtext(body: &str) -> Result<Vec<TranscriptSegment>, String> {
    let parsed: TimedTextBody =
        serde_json::from_str(body).map_err(|e| format!("caption API JSON parse failed: {}", e))?;

    let segments = parsed
        .events
        .into_iter()
        .filter_map(|event| {
            let text: String = event
                .segs
                .iter()
                .map(|s| s.utf8.as_str())
                .collect::<String>()
                .trim()
                .to_string();
            if text.is_empty() || text == "\n" {
                return None;
            }
            Some(TranscriptSegment {
                text,
                start_secs: event.start_ms as f64 / 1000.0,
                duration_secs: event.duration_ms as f64 / 1000.0,
            })
        })
        .collect();

    Ok(segments)
}

/// Parse WebVTT content into timed segments.
///
/// Strips inline tags, normalizes cue timestamps and de-duplicates rolling
/// captions, where each cue repeats the previous cue's trailing line.
fn parse_vtt(content: &str) -> Vec<TranscriptSegment> {
    let cue_pattern =
        Regex::new(r"((?:\d{2}:)?\d{2}:\d{2}\.\d{3}) --> ((?:\d{2}:)?\d{2}:\d{2}\.\d{3})")
            .unwrap();
    let tag_pattern = Regex::new(r"<[^>]+>").unwrap();

    let mut segments: Vec<TranscriptSegment> = Vec::new();
    let mut current_start = 0.0_f64;
    let mut current_end = 0.0_f64;
    let mut last_text = String::new();

    for line in content.lines() {
        let line = tag_pattern.replace_all(line.trim(), "").to_string();

        if line.is_empty() || line == "WEBVTT" || line.starts_with("Kind:") || line.starts_with("Language:") {
            continue;
        }

        if let Some(caps) = cue_pattern.captures(&line) {
            current_start = vtt_timestamp_secs(&caps[1]);
            current_end = vtt_timestamp_secs(&caps[2]);
            continue;
        }

        // Cue sequence numbers
        if line.chars().all(|c| c.is_numeric()) {
            continue;
        }

        if line != last_text {
            segments.push(TranscriptSegment {
                text: line.clone(),
                start_secs: current_start,
                duration_secs: (current_end - current_start).max(0.0),
            });
            last_text = line;
        }
    }

    segments
}

/// `HH:MM:SS.mmm` or `MM:SS.mmm` to seconds.
fn vtt_timestamp_secs(ts: &str) -> f64 {
    let parts: Vec<&str> = ts.split(':').collect();
    let (hours, minutes, seconds) = match parts.len() {
        3 => (parts[0], parts[1], parts[2]),
        2 => ("0", parts[0], parts[1]),
        _ => return 0.0,
    };

    let hours: f64 = hours.parse().unwrap_or(0.0);
    let minutes: f64 = minutes.parse().unwrap_or(0.0);
    let seconds: f64 = seconds.parse().unwrap_or(0.0);
    hours * 3600.0 + minutes * 60.0 + seconds
}
