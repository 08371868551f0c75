//! Shared data models for the Vidnote processing pipeline.
//!
//! This crate holds the durable row types (`Job`, `Keyframe`), the structured
//! AI payload (`AiContent`), transcript DTOs and the pure keyframe-interval
//! logic used by both the analysis and extraction stages.

pub mod content;
pub mod interval;
pub mod job;
pub mod keyframe;
pub mod transcript;

pub use content::{AiContent, Difficulty, Summary, MAX_CATEGORIES, MAX_TAGS, MAX_TOPICS};
pub use interval::{
    evenly_spaced_intervals, validate_intervals, Interval, IntervalCategory,
    DEFAULT_MIN_GAP_SECS, MAX_INTERVALS,
};
pub use job::{CorrelationId, Job, JobId, ProcessingStatus, TriggerRequest};
pub use keyframe::{confidence_pct, Keyframe, KeyframeId, NewKeyframe};
pub use transcript::{TranscriptOutcome, TranscriptSegment, TranscriptSource};
