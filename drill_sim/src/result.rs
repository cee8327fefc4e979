//! Outcome records of exercise runs.

use crate::exercise::Exercise;
use chrono::{DateTime, Utc};
use drill_core::{Grade, GradingTunables};
use drill_env::RunId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Everything needed to replay a run later.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReproductionInfo {
    /// Seed the scenario random source was derived from
    pub seed: u64,

    /// Where the playlist was loaded from
    pub source_locator: String,

    /// Position of the exercise within that playlist
    pub playlist_index: usize,

    /// Tunables the grader was built with; filled in by the runner
    #[serde(default)]
    pub tunables: GradingTunables,
}

impl ReproductionInfo {
    pub fn new(seed: u64, source_locator: impl Into<String>, playlist_index: usize) -> Self {
        Self {
            seed,
            source_locator: source_locator.into(),
            playlist_index,
            tunables: GradingTunables::default(),
        }
    }
}

/// The outcome of one exercise run. Immutable once emitted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExerciseResult {
    pub seed: u64,

    /// Terminal grade (never `Continue`)
    pub grade: Grade,

    /// Value copy of the exercise as it was run
    pub exercise: Exercise,

    pub reproduction_info: ReproductionInfo,

    /// Unique id of this run
    pub run_id: RunId,

    pub created_at: DateTime<Utc>,

    /// Snapshots graded before the terminal grade, inclusive
    pub ticks: u64,

    /// Grader metric at the end of the run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric: Option<Value>,
}

impl ExerciseResult {
    /// One-line human summary for logs.
    pub fn summary(&self) -> String {
        format!(
            "{}: {} (seed={}, ticks={})",
            self.exercise.name, self.grade, self.seed, self.ticks
        )
    }
}
