//! Video processing worker.
//!
//! Wires transcript extraction, AI analysis, keyframe capture and asset
//! publishing into a persisted, sequential per-job saga, plus the trigger
//! service that admits jobs and bounds their concurrency.

pub mod analysis;
pub mod config;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod service;
pub mod transcript;

pub use analysis::{AnalysisEngine, AnalysisInput, AnalysisMode, GeminiClient, ModelClient};
pub use config::WorkerConfig;
pub use error::{PipelineError, PipelineResult};
pub use logging::JobLogger;
pub use pipeline::PipelineOrchestrator;
pub use service::PipelineService;
pub use transcript::{CaptionExtractor, TranscriptFetcher};
