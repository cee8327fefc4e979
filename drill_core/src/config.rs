//! Serializable grader descriptions and grading tunables.
//!
//! Exercises carry a [`GraderConfig`] rather than a live grader, so a
//! fresh grader can be built for every run and the description can be
//! persisted, compared and hot-swapped.

use crate::compound::CompoundGrader;
use crate::goal::{
    goalie_grader, rl_striker_grader, striker_grader, PassOnBallGoingAwayFromGoal,
    PassOnGoalForAllyTeam,
};
use crate::grader::Grader;
use crate::snapshots::SnapshotWrapperGrader;
use crate::timeout::{FailOnBallOnGroundAfterTimeout, FailOnTimeout, PassOnTimeout};
use crate::touches::RecordBallTouches;
use drill_env::Team;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

/// Knobs shared by the grader presets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GradingTunables {
    /// Consecutive ticks the ball must move away from goal to count as cleared
    pub ball_away_required_ticks: u32,

    /// Default striker timeout (seconds of simulated time)
    pub striker_timeout_seconds: f64,

    /// Default goalie timeout (seconds of simulated time)
    pub goalie_timeout_seconds: f64,
}

impl Default for GradingTunables {
    fn default() -> Self {
        Self {
            ball_away_required_ticks: PassOnBallGoingAwayFromGoal::REQUIRED_CONSECUTIVE_TICKS,
            striker_timeout_seconds: 4.0,
            goalie_timeout_seconds: 10.0,
        }
    }
}

impl GradingTunables {
    /// Applies the same rules [`GraderConfig::validate`] uses for explicit values.
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_duration("StrikerGrader", self.striker_timeout_seconds)?;
        check_duration("GoalieGrader", self.goalie_timeout_seconds)?;
        if self.ball_away_required_ticks == 0 {
            return Err(ConfigError::ZeroDebounce);
        }
        Ok(())
    }
}

fn check_duration(grader: &'static str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidDuration { grader, value })
    }
}

/// Errors found when validating a grader description.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Invalid duration {value} for {grader}")]
    InvalidDuration { grader: &'static str, value: f64 },

    #[error("Compound grader has no children")]
    EmptyCompound,

    #[error("Duplicate child grader name: {0}")]
    DuplicateName(String),

    #[error("Debounce window must be at least one tick")]
    ZeroDebounce,
}

/// A child of a compound description.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NamedGraderConfig {
    pub name: String,
    pub grader: GraderConfig,
}

/// Description of a grader, built into a fresh instance per run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum GraderConfig {
    Striker {
        #[serde(default)]
        timeout_seconds: Option<f64>,
        #[serde(default)]
        ally_team: Team,
    },
    Goalie {
        #[serde(default)]
        timeout_seconds: Option<f64>,
        #[serde(default)]
        ally_team: Team,
    },
    RlStriker {
        #[serde(default)]
        timeout_seconds: Option<f64>,
        #[serde(default)]
        ally_team: Team,
    },
    FailOnTimeout {
        max_duration_seconds: f64,
    },
    PassOnTimeout {
        max_duration_seconds: f64,
    },
    FailOnBallOnGroundAfterTimeout {
        max_duration_seconds: f64,
    },
    PassOnGoalForAllyTeam {
        #[serde(default)]
        ally_team: Team,
    },
    PassOnBallGoingAwayFromGoal {
        #[serde(default)]
        ally_team: Team,
        #[serde(default)]
        required_consecutive_ticks: Option<u32>,
    },
    RecordBallTouches,
    Compound {
        graders: Vec<NamedGraderConfig>,
    },
    /// Records the first and terminal snapshots around another grader
    SnapshotWrapper {
        grader: Box<GraderConfig>,
    },
}

impl Default for GraderConfig {
    fn default() -> Self {
        GraderConfig::Striker {
            timeout_seconds: None,
            ally_team: Team::Blue,
        }
    }
}

impl GraderConfig {
    /// Builds a fresh grader with zeroed internal state.
    pub fn build(&self, tunables: &GradingTunables) -> Box<dyn Grader> {
        match self {
            GraderConfig::Striker { timeout_seconds, ally_team } => Box::new(striker_grader(
                timeout_seconds.unwrap_or(tunables.striker_timeout_seconds),
                *ally_team,
            )),
            GraderConfig::Goalie { timeout_seconds, ally_team } => Box::new(goalie_grader(
                timeout_seconds.unwrap_or(tunables.goalie_timeout_seconds),
                *ally_team,
                tunables.ball_away_required_ticks,
            )),
            GraderConfig::RlStriker { timeout_seconds, ally_team } => Box::new(rl_striker_grader(
                timeout_seconds.unwrap_or(tunables.striker_timeout_seconds),
                *ally_team,
            )),
            GraderConfig::FailOnTimeout { max_duration_seconds } => {
                Box::new(FailOnTimeout::new(*max_duration_seconds))
            }
            GraderConfig::PassOnTimeout { max_duration_seconds } => {
                Box::new(PassOnTimeout::new(*max_duration_seconds))
            }
            GraderConfig::FailOnBallOnGroundAfterTimeout { max_duration_seconds } => {
                Box::new(FailOnBallOnGroundAfterTimeout::new(*max_duration_seconds))
            }
            GraderConfig::PassOnGoalForAllyTeam { ally_team } => {
                Box::new(PassOnGoalForAllyTeam::new(*ally_team))
            }
            GraderConfig::PassOnBallGoingAwayFromGoal {
                ally_team,
                required_consecutive_ticks,
            } => Box::new(PassOnBallGoingAwayFromGoal::with_required_ticks(
                *ally_team,
                required_consecutive_ticks.unwrap_or(tunables.ball_away_required_ticks),
            )),
            GraderConfig::RecordBallTouches => Box::new(RecordBallTouches::new()),
            GraderConfig::Compound { graders } => Box::new(CompoundGrader::new(
                graders
                    .iter()
                    .map(|child| (child.name.clone(), child.grader.build(tunables)))
                    .collect(),
            )),
            GraderConfig::SnapshotWrapper { grader } => {
                Box::new(SnapshotWrapperGrader::new(grader.build(tunables)))
            }
        }
    }

    /// Checks durations, debounce windows and compound child names.
    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            GraderConfig::Striker { timeout_seconds, .. }
            | GraderConfig::Goalie { timeout_seconds, .. }
            | GraderConfig::RlStriker { timeout_seconds, .. } => match timeout_seconds {
                Some(t) => check_duration(self.variant_name(), *t),
                None => Ok(()),
            },
            GraderConfig::FailOnTimeout { max_duration_seconds }
            | GraderConfig::PassOnTimeout { max_duration_seconds }
            | GraderConfig::FailOnBallOnGroundAfterTimeout { max_duration_seconds } => {
                check_duration(self.variant_name(), *max_duration_seconds)
            }
            GraderConfig::PassOnBallGoingAwayFromGoal {
                required_consecutive_ticks: Some(0),
                ..
            } => Err(ConfigError::ZeroDebounce),
            GraderConfig::PassOnGoalForAllyTeam { .. }
            | GraderConfig::PassOnBallGoingAwayFromGoal { .. }
            | GraderConfig::RecordBallTouches => Ok(()),
            GraderConfig::Compound { graders } => {
                if graders.is_empty() {
                    return Err(ConfigError::EmptyCompound);
                }
                let mut seen = HashSet::new();
                for child in graders {
                    if !seen.insert(child.name.as_str()) {
                        return Err(ConfigError::DuplicateName(child.name.clone()));
                    }
                    child.grader.validate()?;
                }
                Ok(())
            }
            GraderConfig::SnapshotWrapper { grader } => grader.validate(),
        }
    }

    /// Type-like name of the described grader.
    pub fn variant_name(&self) -> &'static str {
        match self {
            GraderConfig::Striker { .. } => "StrikerGrader",
            GraderConfig::Goalie { .. } => "GoalieGrader",
            GraderConfig::RlStriker { .. } => "RocketLeagueStrikerGrader",
            GraderConfig::FailOnTimeout { .. } => "FailOnTimeout",
            GraderConfig::PassOnTimeout { .. } => "PassOnTimeout",
            GraderConfig::FailOnBallOnGroundAfterTimeout { .. } => "FailOnBallOnGroundAfterTimeout",
            GraderConfig::PassOnGoalForAllyTeam { .. } => "PassOnGoalForAllyTeam",
            GraderConfig::PassOnBallGoingAwayFromGoal { .. } => "PassOnBallGoingAwayFromGoal",
            GraderConfig::RecordBallTouches => "RecordBallTouches",
            GraderConfig::Compound { .. } => "CompoundGrader",
            GraderConfig::SnapshotWrapper { .. } => "SnapshotWrapperGrader",
        }
    }
}
