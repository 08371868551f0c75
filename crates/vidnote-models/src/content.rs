//! Structured AI analysis payload.
//!
//! Modeled as tagged structs rather than an open JSON map so the pipeline gets
//! compile-time guarantees over every field it persists.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::interval::Interval;

/// Maximum number of topics accepted from the model.
pub const MAX_TOPICS: usize = 15;

/// Maximum number of tags accepted from the model.
pub const MAX_TAGS: usize = 15;

/// Maximum number of categories accepted from the model.
pub const MAX_CATEGORIES: usize = 8;

/// Difficulty level of the video content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Beginner,
    #[default]
    Intermediate,
    Advanced,
}

impl Difficulty {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Beginner => "beginner",
            Self::Intermediate => "intermediate",
            Self::Advanced => "advanced",
        }
    }
}

/// AI-generated summary of a video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Summary {
    /// Prose summary text.
    pub text: String,

    /// Key takeaways.
    #[serde(default)]
    pub key_points: Vec<String>,

    /// Topics covered.
    #[serde(default)]
    pub topics: Vec<String>,

    /// Difficulty level.
    #[serde(default)]
    pub difficulty: Difficulty,

    /// Estimated reading time of the summary, in minutes.
    #[serde(default = "default_read_minutes")]
    pub estimated_read_minutes: u32,
}

fn default_read_minutes() -> u32 {
    1
}

/// The full structured payload produced by the analysis stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AiContent {
    /// Summary block.
    pub summary: Summary,

    /// Validated keyframe intervals.
    #[serde(default)]
    pub keyframe_intervals: Vec<Interval>,

    /// Topical tags.
    #[serde(default)]
    pub tags: Vec<String>,

    /// Broad categories.
    #[serde(default)]
    pub categories: Vec<String>,
}

impl AiContent {
    /// Normalize the payload for persistence.
    ///
    /// Tags and categories collapse to one entry per distinct name
    /// (case-insensitive, first spelling wins) so re-submitting an identical
    /// list is idempotent. List caps are enforced here as well.
    pub fn normalized(mut self) -> Self {
        self.tags = dedup_names(self.tags, MAX_TAGS);
        self.categories = dedup_names(self.categories, MAX_CATEGORIES);
        self.summary.topics = dedup_names(std::mem::take(&mut self.summary.topics), MAX_TOPICS);
        self.keyframe_intervals.truncate(crate::MAX_INTERVALS);
        self
    }
}

fn dedup_names(names: Vec<String>, cap: usize) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    let mut out: Vec<String> = Vec::new();

    for name in names {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            continue;
        }
        let folded = trimmed.to_lowercase();
        if seen.contains(&folded) {
            continue;
        }
        seen.push(folded);
        out.push(trimmed.to_string());
        if out.len() >= cap {
            break;
        }
    }

    out
}
