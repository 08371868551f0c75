//! Keyframe interval types and the pure interval validation gate.
//!
//! `validate_intervals` is the single gate between model-suggested timestamps
//! and what gets extracted and persisted. Both the analysis output and any
//! later re-derivation pass through it identically.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Minimum spacing between two kept intervals, in seconds.
pub const DEFAULT_MIN_GAP_SECS: i64 = 30;

/// Maximum number of intervals accepted from the model.
pub const MAX_INTERVALS: usize = 15;

/// Category of a proposed keyframe moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum IntervalCategory {
    Intro,
    MainPoint,
    Demo,
    Conclusion,
    Transition,
    Highlight,
}

impl IntervalCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Intro => "intro",
            Self::MainPoint => "main_point",
            Self::Demo => "demo",
            Self::Conclusion => "conclusion",
            Self::Transition => "transition",
            Self::Highlight => "highlight",
        }
    }
}

/// A candidate keyframe proposal prior to validation and extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Interval {
    /// Timestamp in seconds from the start of the video.
    pub timestamp_secs: i64,

    /// Why the model considers this moment salient.
    pub reason: String,

    /// Confidence score in [0, 1].
    pub confidence: f64,

    /// Category of the moment.
    pub category: IntervalCategory,
}

impl Interval {
    pub fn new(
        timestamp_secs: i64,
        reason: impl Into<String>,
        confidence: f64,
        category: IntervalCategory,
    ) -> Self {
        Self {
            timestamp_secs,
            reason: reason.into(),
            confidence,
            category,
        }
    }
}

/// Validate a set of candidate intervals against the video duration.
///
/// 1. Drops entries outside `[0, duration_secs)`.
/// 2. Sorts ascending by timestamp.
/// 3. Greedy-keeps: the first survivor is always kept, subsequent entries only
///    if they are at least `min_gap_secs` after the last kept one.
///
/// Idempotent: `validate(validate(x)) == validate(x)`.
pub fn validate_intervals(
    intervals: &[Interval],
    duration_secs: i64,
    min_gap_secs: i64,
) -> Vec<Interval> {
    let mut survivors: Vec<Interval> = intervals
        .iter()
        .filter(|i| i.timestamp_secs >= 0 && i.timestamp_secs < duration_secs)
        .cloned()
        .collect();

    survivors.sort_by_key(|i| i.timestamp_secs);

    let mut kept: Vec<Interval> = Vec::with_capacity(survivors.len());
    for interval in survivors {
        match kept.last() {
            None => kept.push(interval),
            Some(last) if interval.timestamp_secs - last.timestamp_secs >= min_gap_secs => {
                kept.push(interval)
            }
            Some(_) => {}
        }
    }

    kept
}

/// Generate evenly spaced fallback intervals when no model output is available.
///
/// count = clamp(floor(duration / 60), 5, 10); step = duration / (count + 1);
/// timestamps at step * i for i in 1..=count. The first interval is tagged
/// `intro`, the last `conclusion`, the rest `main_point`, all at confidence 0.5.
pub fn evenly_spaced_intervals(duration_secs: i64) -> Vec<Interval> {
    if duration_secs <= 0 {
        return Vec::new();
    }

    let count = (duration_secs / 60).clamp(5, 10);
    let step = duration_secs as f64 / (count + 1) as f64;

    (1..=count)
        .map(|i| {
            let category = if i == 1 {
                IntervalCategory::Intro
            } else if i == count {
                IntervalCategory::Conclusion
            } else {
                IntervalCategory::MainPoint
            };

            Interval::new(
                (step * i as f64).floor() as i64,
                format!("Evenly spaced checkpoint {} of {}", i, count),
                0.5,
                category,
            )
        })
        .collect()
}
