//! Exercise definitions and in-place hot swapping.

use crate::scenarios::ScenarioConfig;
use drill_core::GraderConfig;
use drill_env::MatchConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// One named, scripted training scenario plus how to judge it.
///
/// `name` identifies the exercise across reloads. The other fields can be
/// replaced while a playlist is running (see [`apply_update`]).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Exercise {
    /// Identity of the exercise within its playlist
    pub name: String,

    /// How to set up the initial game state
    pub scenario: ScenarioConfig,

    /// How to judge the attempt
    #[serde(default)]
    pub grader: GraderConfig,

    /// Match the exercise is played in
    #[serde(default)]
    pub match_config: MatchConfig,
}

impl Exercise {
    /// Creates an exercise with the default grader and match.
    pub fn new(name: impl Into<String>, scenario: ScenarioConfig) -> Self {
        Self {
            name: name.into(),
            scenario,
            grader: GraderConfig::default(),
            match_config: MatchConfig::default(),
        }
    }

    /// Sets the grader.
    pub fn with_grader(mut self, grader: GraderConfig) -> Self {
        self.grader = grader;
        self
    }

    /// Sets the match config.
    pub fn with_match_config(mut self, match_config: MatchConfig) -> Self {
        self.match_config = match_config;
        self
    }
}

/// Errors from [`apply_update`].
#[derive(Debug, Error, PartialEq, Eq)]
pub enum UpdateError {
    /// The fresh definition describes a different exercise
    #[error("Identity mismatch: running '{current}' but got '{fresh}'")]
    IdentityMismatch { current: String, fresh: String },
}

/// Copies the hot-swappable fields of `fresh` onto `current`.
///
/// The object behind `current` keeps its identity; only its contents
/// change. Returns the names of the fields whose values differed.
pub fn apply_update(current: &mut Exercise, fresh: Exercise) -> Result<Vec<&'static str>, UpdateError> {
    if current.name != fresh.name {
        return Err(UpdateError::IdentityMismatch {
            current: current.name.clone(),
            fresh: fresh.name,
        });
    }

    let mut changed = Vec::new();
    if current.scenario != fresh.scenario {
        changed.push("scenario");
    }
    if current.grader != fresh.grader {
        changed.push("grader");
    }
    if current.match_config != fresh.match_config {
        changed.push("match_config");
    }

    let Exercise { scenario, grader, match_config, .. } = fresh;
    current.scenario = scenario;
    current.grader = grader;
    current.match_config = match_config;

    Ok(changed)
}
