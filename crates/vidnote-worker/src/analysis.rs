//! AI analysis engine.
//!
//! Builds a transcript-based prompt when a transcript exists, otherwise a
//! heavier "simulate viewing" prompt against the raw source reference, which
//! itself falls back to the transcript-based path if the direct call fails.
//! Model output is schema-validated before acceptance; any underlying call or
//! validation failure is fatal for the stage.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::{info, warn};
use vidnote_models::{
    evenly_spaced_intervals, validate_intervals, AiContent, Difficulty, Interval,
    IntervalCategory, Summary, DEFAULT_MIN_GAP_SECS, MAX_INTERVALS,
};

use crate::error::{PipelineError, PipelineResult};

/// Seam for the generative-model endpoint.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Send one prompt and return the raw model text.
    async fn generate(&self, prompt: &str) -> PipelineResult<String>;
}

const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com";

/// Gemini API client with an ordered model fallback chain.
pub struct GeminiClient {
    api_key: String,
    api_base: String,
    client: reqwest::Client,
    models: Vec<String>,
}

#[derive(Debug, serde::Serialize)]
struct GeminiRequest {
    contents: Vec<Content>,
    #[serde(rename = "generationConfig")]
    generation_config: GenerationConfig,
}

#[derive(Debug, serde::Serialize)]
struct Content {
    parts: Vec<Part>,
}

#[derive(Debug, serde::Serialize)]
struct Part {
    text: String,
}

#[derive(Debug, serde::Serialize)]
struct GenerationConfig {
    #[serde(rename = "responseMimeType")]
    response_mime_type: String,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: ResponseContent,
}

#[derive(Debug, Deserialize)]
struct ResponseContent {
    parts: Vec<ResponsePart>,
}

#[derive(Debug, Deserialize)]
struct ResponsePart {
    text: String,
}

impl GeminiClient {
    pub fn new() -> PipelineResult<Self> {
        let api_key = std::env::var("GEMINI_API_KEY")
            .map_err(|_| PipelineError::config_error("GEMINI_API_KEY not set"))?;
        let api_base = std::env::var("GEMINI_API_BASE")
            .unwrap_or_else(|_| DEFAULT_API_BASE.to_string());

        Ok(Self::with_endpoint(api_key, api_base))
    }

    fn with_endpoint(api_key: impl Into<String>, api_base: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_base: api_base.into(),
            client: reqwest::Client::new(),
            models: vec![
                "gemini-2.5-flash".to_string(),
                "gemini-2.5-flash-lite".to_string(),
                "gemini-2.5-pro".to_string(),
            ],
        }
    }

    async fn call_model(&self, model: &str, prompt: &str) -> PipelineResult<String> {
        let url = format!(
            "{}/v1beta/models/{}:generateContent?key={}",
            self.api_base, model, self.api_key
        );

        let request = GeminiRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: prompt.to_string(),
                }],
            }],
            generation_config: GenerationConfig {
                response_mime_type: "application/json".to_string(),
            },
        };

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| PipelineError::ai_failed(format!("model request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(PipelineError::ai_failed(format!(
                "model returned {}: {}",
                status, error_text
            )));
        }

        let parsed: GeminiResponse = response
            .json()
            .await
            .map_err(|e| PipelineError::ai_failed(format!("model response parse failed: {}", e)))?;

        parsed
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.clone())
            .ok_or_else(|| PipelineError::ai_failed("no content in model response"))
    }
}

#[async_trait]
impl ModelClient for GeminiClient {
    async fn generate(&self, prompt: &str) -> PipelineResult<String> {
        let mut last_error = None;

        for model in &self.models {
            info!("Attempting model: {}", model);
            match self.call_model(model, prompt).await {
                Ok(text) => {
                    info!("Got analysis from {}", model);
                    return Ok(text);
                }
                Err(e) => {
                    warn!("Model {} failed: {}", model, e);
                    last_error = Some(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| PipelineError::ai_failed("all models failed")))
    }
}

/// Prompt mode selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnalysisMode {
    /// Transcript prompt when a transcript exists, direct otherwise.
    #[default]
    Auto,
    /// Always the direct "simulate viewing" prompt.
    Direct,
}

/// Everything the analysis stage knows about the video.
#[derive(Debug, Clone, Default)]
pub struct AnalysisInput {
    pub title: String,
    pub description: Option<String>,
    pub duration_secs: Option<i64>,
    pub transcript: Option<String>,
    pub channel_name: Option<String>,
    pub source_ref: Option<String>,
}

/// Raw, unvalidated model output shape.
#[derive(Debug, Deserialize)]
struct RawAnalysis {
    summary: RawSummary,
    #[serde(default)]
    keyframe_intervals: Vec<RawInterval>,
    #[serde(default)]
    tags: Vec<String>,
    #[serde(default)]
    categories: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct RawSummary {
    text: String,
    #[serde(default)]
    key_points: Vec<String>,
    #[serde(default)]
    topics: Vec<String>,
    #[serde(default)]
    difficulty: Option<String>,
    #[serde(default)]
    estimated_read_minutes: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct RawInterval {
    timestamp_secs: i64,
    #[serde(default)]
    reason: String,
    confidence: f64,
    category: String,
}

/// Schema-validating analysis engine over an injected model client.
pub struct AnalysisEngine {
    model: Arc<dyn ModelClient>,
    mode: AnalysisMode,
}

impl AnalysisEngine {
    pub fn new(model: Arc<dyn ModelClient>) -> Self {
        Self {
            model,
            mode: AnalysisMode::Auto,
        }
    }

    pub fn with_mode(mut self, mode: AnalysisMode) -> Self {
        self.mode = mode;
        self
    }

    /// Run the analysis. Returns the validated payload with intervals already
    /// gated through the interval validator; the caller persists it as-is.
    pub async fn analyze(&self, input: &AnalysisInput) -> PipelineResult<AiContent> {
        let use_transcript = input.transcript.is_some() && self.mode != AnalysisMode::Direct;

        let text = if use_transcript {
            self.model.generate(&transcript_prompt(input)).await?
        } else {
            match self.model.generate(&direct_prompt(input)).await {
                Ok(text) => text,
                Err(e) => {
                    warn!("Direct analysis failed, falling back to metadata prompt: {}", e);
                    self.model.generate(&transcript_prompt(input)).await?
                }
            }
        };

        let content = parse_and_validate(&text, input.duration_secs)?;
        info!(
            intervals = content.keyframe_intervals.len(),
            tags = content.tags.len(),
            "Analysis accepted"
        );
        Ok(content)
    }
}

fn metadata_block(input: &AnalysisInput) -> String {
    let mut block = format!("Title: {}\n", input.title);
    if let Some(channel) = &input.channel_name {
        block.push_str(&format!("Channel: {}\n", channel));
    }
    if let Some(duration) = input.duration_secs {
        block.push_str(&format!("Duration: {} seconds\n", duration));
    }
    if let Some(description) = &input.description {
        block.push_str(&format!("Description: {}\n", description));
    }
    block
}

fn schema_block() -> &'static str {
    r#"Return ONLY a single JSON object with this schema:
{
  "summary": {
    "text": "Prose summary of the video",
    "key_points": ["takeaway"],
    "topics": ["topic"],
    "difficulty": "beginner|intermediate|advanced",
    "estimated_read_minutes": 1
  },
  "keyframe_intervals": [
    {
      "timestamp_secs": 0,
      "reason": "Why this moment matters",
      "confidence": 0.0,
      "category": "intro|main_point|demo|conclusion|transition|highlight"
    }
  ],
  "tags": ["tag"],
  "categories": ["category"]
}

Rules:
- Return ONLY the JSON object, nothing else.
- Propose at most 15 keyframe intervals, confidence between 0 and 1.
- Timestamps are integer seconds from the start of the video.
- At most 15 tags and 8 categories."#
}

fn transcript_prompt(input: &AnalysisInput) -> String {
    let transcript = input.transcript.as_deref().unwrap_or("(no transcript available)");
    format!(
        "Analyze this video from its metadata and transcript.\n\n{}\n{}\n\nTRANSCRIPT:\n{}\n",
        metadata_block(input),
        schema_block(),
        transcript
    )
}

fn direct_prompt(input: &AnalysisInput) -> String {
    let source = input.source_ref.as_deref().unwrap_or("(no source reference)");
    format!(
        "Watch this video and analyze its content directly.\n\nSource: {}\n{}\n{}\n",
        source,
        metadata_block(input),
        schema_block()
    )
}

/// Strip a ```json fenced block if the model wrapped its output in one.
fn strip_fences(text: &str) -> &str {
    let text = text.trim();
    let text = text.strip_prefix("```json").unwrap_or(text);
    let text = text.strip_prefix("```").unwrap_or(text);
    text.strip_suffix("```").unwrap_or(text).trim()
}

fn parse_category(raw: &str) -> Option<IntervalCategory> {
    match raw {
        "intro" => Some(IntervalCategory::Intro),
        "main_point" => Some(IntervalCategory::MainPoint),
        "demo" => Some(IntervalCategory::Demo),
        "conclusion" => Some(IntervalCategory::Conclusion),
        "transition" => Some(IntervalCategory::Transition),
        "highlight" => Some(IntervalCategory::Highlight),
        _ => None,
    }
}

fn parse_difficulty(raw: Option<&str>) -> PipelineResult<Difficulty> {
    match raw {
        None => Ok(Difficulty::default()),
        Some("beginner") => Ok(Difficulty::Beginner),
        Some("intermediate") => Ok(Difficulty::Intermediate),
        Some("advanced") => Ok(Difficulty::Advanced),
        Some(other) => Err(PipelineError::ai_failed(format!(
            "model returned unknown difficulty: {}",
            other
        ))),
    }
}

/// Parse the model text and validate it against the content schema.
///
/// Intervals with a negative timestamp, an out-of-range confidence or an
/// unknown category are dropped; the survivors pass through the interval
/// validator. When the validated list is empty and the duration is known,
/// evenly-spaced fallback intervals are substituted.
fn parse_and_validate(text: &str, duration_secs: Option<i64>) -> PipelineResult<AiContent> {
    let raw: RawAnalysis = serde_json::from_str(strip_fences(text))
        .map_err(|e| PipelineError::ai_failed(format!("analysis JSON parse failed: {}", e)))?;

    let candidates: Vec<Interval> = raw
        .keyframe_intervals
        .into_iter()
        .filter_map(|i| {
            if i.timestamp_secs < 0 || !(0.0..=1.0).contains(&i.confidence) {
                return None;
            }
            let category = parse_category(&i.category)?;
            Some(Interval::new(i.timestamp_secs, i.reason, i.confidence, category))
        })
        .take(MAX_INTERVALS)
        .collect();

    let mut intervals = match duration_secs {
        Some(duration) => validate_intervals(&candidates, duration, DEFAULT_MIN_GAP_SECS),
        // Without a known duration the range check waits for the probe; the
        // ordering and spacing rules still apply.
        None => validate_intervals(&candidates, i64::MAX, DEFAULT_MIN_GAP_SECS),
    };

    if intervals.is_empty() {
        if let Some(duration) = duration_secs {
            warn!("No usable model intervals; substituting evenly spaced fallback");
            intervals = evenly_spaced_intervals(duration);
        }
    }

    let content = AiContent {
        summary: Summary {
            text: raw.summary.text,
            key_points: raw.summary.key_points,
            topics: raw.summary.topics,
            difficulty: parse_difficulty(raw.summary.difficulty.as_deref())?,
            estimated_read_minutes: raw.summary.estimated_read_minutes.unwrap_or(1),
        },
        keyframe_intervals: intervals,
        tags: raw.tags,
        categories: raw.categories,
    };

    Ok(content.normalized())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeModel {
        responses: Vec<PipelineResult<String>>,
        calls: AtomicUsize,
    }

    impl FakeModel {
        fn returning(text: &str) -> Self {
            Self {
                responses: vec![Ok(text.to_string())],
                calls: AtomicUsize::new(0),
            }
        }

        fn sequence(responses: Vec<PipelineResult<String>>) -> Self {
            Self {
                responses,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl ModelClient for FakeModel {
        async fn generate(&self, _prompt: &str) -> PipelineResult<String> {
            let idx = self.calls.fetch_add(1, Ordering::SeqCst);
            match self.responses.get(idx.min(self.responses.len() - 1)) {
                Some(Ok(text)) => Ok(text.clone()),
                Some(Err(_)) => Err(PipelineError::ai_failed("simulated model failure")),
                None => Err(PipelineError::ai_failed("no response configured")),
            }
        }
    }

    fn valid_json() -> String {
        r#"{
            "summary": {
                "text": "A walkthrough of Rust ownership.",
                "key_points": ["moves", "borrows"],
                "topics": ["rust", "ownership"],
                "difficulty": "beginner",
                "estimated_read_minutes": 2
            },
            "keyframe_intervals": [
                {"timestamp_secs": 5, "reason": "opening", "confidence": 0.9, "category": "intro"},
                {"timestamp_secs": 90, "reason": "core idea", "confidence": 0.8, "category": "main_point"},
                {"timestamp_secs": 230, "reason": "wrap up", "confidence": 0.7, "category": "conclusion"}
            ],
            "tags": ["rust", "Rust", "systems"],
            "categories": ["programming"]
        }"#
        .to_string()
    }

    fn input_with_transcript() -> AnalysisInput {
        AnalysisInput {
            title: "Ownership in Rust".into(),
            duration_secs: Some(250),
            transcript: Some("[00:00:01] welcome\n".into()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn accepts_valid_output_and_dedupes_tags() {
        let engine = AnalysisEngine::new(Arc::new(FakeModel::returning(&valid_json())));
        let content = engine.analyze(&input_with_transcript()).await.unwrap();

        assert_eq!(content.keyframe_intervals.len(), 3);
        assert_eq!(content.tags, vec!["rust", "systems"]);
        assert_eq!(content.summary.difficulty, Difficulty::Beginner);
    }

    #[tokio::test]
    async fn accepts_fenced_output() {
        let fenced = format!("```json\n{}\n```", valid_json());
        let engine = AnalysisEngine::new(Arc::new(FakeModel::returning(&fenced)));
        let content = engine.analyze(&input_with_transcript()).await.unwrap();
        assert_eq!(content.keyframe_intervals.len(), 3);
    }

    #[tokio::test]
    async fn drops_invalid_intervals_through_the_gate() {
        let json = r#"{
            "summary": {"text": "s"},
            "keyframe_intervals": [
                {"timestamp_secs": -4, "reason": "negative", "confidence": 0.9, "category": "intro"},
                {"timestamp_secs": 10, "reason": "bad confidence", "confidence": 1.5, "category": "intro"},
                {"timestamp_secs": 20, "reason": "bad category", "confidence": 0.9, "category": "explosion"},
                {"timestamp_secs": 40, "reason": "kept", "confidence": 0.9, "category": "main_point"},
                {"timestamp_secs": 55, "reason": "too close", "confidence": 0.9, "category": "main_point"},
                {"timestamp_secs": 400, "reason": "past end", "confidence": 0.9, "category": "conclusion"}
            ],
            "tags": [], "categories": []
        }"#;
        let engine = AnalysisEngine::new(Arc::new(FakeModel::returning(json)));
        let content = engine
            .analyze(&AnalysisInput {
                title: "t".into(),
                duration_secs: Some(300),
                transcript: Some("x".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        let timestamps: Vec<i64> = content
            .keyframe_intervals
            .iter()
            .map(|i| i.timestamp_secs)
            .collect();
        assert_eq!(timestamps, vec![40]);
    }

    #[tokio::test]
    async fn zero_usable_intervals_substitutes_fallback() {
        let json = r#"{"summary": {"text": "s"}, "keyframe_intervals": [], "tags": [], "categories": []}"#;
        let engine = AnalysisEngine::new(Arc::new(FakeModel::returning(json)));
        let content = engine
            .analyze(&AnalysisInput {
                title: "t".into(),
                duration_secs: Some(120),
                transcript: Some("x".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(content.keyframe_intervals.len(), 5);
        assert_eq!(content.keyframe_intervals[0].timestamp_secs, 20);
        assert_eq!(content.keyframe_intervals[0].category, IntervalCategory::Intro);
    }

    #[tokio::test]
    async fn no_duration_and_no_intervals_stays_empty() {
        let json = r#"{"summary": {"text": "s"}, "keyframe_intervals": [], "tags": [], "categories": []}"#;
        let engine = AnalysisEngine::new(Arc::new(FakeModel::returning(json)));
        let content = engine
            .analyze(&AnalysisInput {
                title: "t".into(),
                transcript: Some("x".into()),
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(content.keyframe_intervals.is_empty());
    }

    #[tokio::test]
    async fn direct_mode_falls_back_to_metadata_prompt() {
        let model = FakeModel::sequence(vec![
            Err(PipelineError::ai_failed("direct call rejected")),
            Ok(valid_json()),
        ]);
        let engine = AnalysisEngine::new(Arc::new(model)).with_mode(AnalysisMode::Direct);

        let content = engine.analyze(&input_with_transcript()).await.unwrap();
        assert_eq!(content.keyframe_intervals.len(), 3);
    }

    #[tokio::test]
    async fn model_failure_is_fatal() {
        let model = FakeModel::sequence(vec![
            Err(PipelineError::ai_failed("boom")),
            Err(PipelineError::ai_failed("boom again")),
        ]);
        let engine = AnalysisEngine::new(Arc::new(model));

        let result = engine
            .analyze(&AnalysisInput {
                title: "t".into(),
                ..Default::default()
            })
            .await;
        assert!(matches!(result, Err(PipelineError::AiFailed(_))));
    }

    #[tokio::test]
    async fn unknown_difficulty_is_fatal() {
        let json = r#"{"summary": {"text": "s", "difficulty": "expert"}, "keyframe_intervals": [], "tags": [], "categories": []}"#;
        let engine = AnalysisEngine::new(Arc::new(FakeModel::returning(json)));

        let result = engine.analyze(&input_with_transcript()).await;
        assert!(matches!(result, Err(PipelineError::AiFailed(_))));
    }

    #[test]
    fn test_strip_fences_variants() {
        assert_eq!(strip_fences("{\"a\":1}"), "{\"a\":1}");
        assert_eq!(strip_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_fences("```\n{\"a\":1}\n```"), "{\"a\":1}");
    }

    mod gemini {
        use super::super::*;
        use wiremock::matchers::{method, path};
        use wiremock::{Mock, MockServer, ResponseTemplate};

        fn candidate_body(text: &str) -> serde_json::Value {
            serde_json::json!({
                "candidates": [{"content": {"parts": [{"text": text}]}}]
            })
        }

        #[tokio::test]
        async fn next_model_is_tried_after_an_http_error() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
                .respond_with(ResponseTemplate::new(500).set_body_string("overloaded"))
                .expect(1)
                .mount(&server)
                .await;
            Mock::given(method("POST"))
                .and(path("/v1beta/models/gemini-2.5-flash-lite:generateContent"))
                .respond_with(
                    ResponseTemplate::new(200).set_body_json(candidate_body(r#"{"ok":true}"#)),
                )
                .expect(1)
                .mount(&server)
                .await;

            let client = GeminiClient::with_endpoint("test-key", server.uri());
            let text = client.generate("prompt").await.unwrap();
            assert_eq!(text, r#"{"ok":true}"#);
        }

        #[tokio::test]
        async fn last_error_propagates_when_every_model_fails() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
                .expect(3)
                .mount(&server)
                .await;

            let client = GeminiClient::with_endpoint("test-key", server.uri());
            let err = client.generate("prompt").await.unwrap_err();
            assert!(matches!(err, PipelineError::AiFailed(_)));
            assert!(err.to_string().contains("503"));
        }

        #[tokio::test]
        async fn unparseable_success_body_moves_down_the_chain() {
            let server = MockServer::start().await;
            Mock::given(method("POST"))
                .and(path("/v1beta/models/gemini-2.5-flash:generateContent"))
                .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
                .expect(1)
                .mount(&server)
                .await;
            Mock::given(method("POST"))
                .and(path("/v1beta/models/gemini-2.5-flash-lite:generateContent"))
                .respond_with(ResponseTemplate::new(200).set_body_json(candidate_body("ok")))
                .expect(1)
                .mount(&server)
                .await;

            let client = GeminiClient::with_endpoint("test-key", server.uri());
            assert_eq!(client.generate("prompt").await.unwrap(), "ok");
        }
    }
}
