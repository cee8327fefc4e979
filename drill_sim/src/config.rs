//! Harness configuration.

use clap::ValueEnum;
use drill_core::GradingTunables;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// When the playlist loop re-reads its source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ReloadPolicy {
    /// Load once at startup
    Never,

    /// Reload after every finished exercise
    #[default]
    EachExercise,
}

/// Settings for a playlist execution loop.
#[derive(Debug, Clone, PartialEq)]
pub struct HarnessConfig {
    /// Where results are persisted; `None` keeps them in memory only
    pub history_dir: Option<PathBuf>,

    pub reload_policy: ReloadPolicy,

    /// Seed of the first pass; later passes use wall-clock milliseconds
    pub first_seed: u64,

    /// Stop after this many passes; `None` runs until cancelled
    pub max_passes: Option<u64>,

    /// Back-off between failed initial playlist loads
    pub reload_retry_interval: Duration,

    /// Per-exercise tick cap handed to the runner
    pub max_ticks_per_exercise: Option<u64>,

    /// Used whenever the playlist source carries no tunables of its own
    pub tunables: GradingTunables,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            history_dir: None,
            reload_policy: ReloadPolicy::default(),
            first_seed: 4,
            max_passes: None,
            reload_retry_interval: Duration::from_secs(1),
            max_ticks_per_exercise: None,
            tunables: GradingTunables::default(),
        }
    }
}

impl HarnessConfig {
    pub fn with_history_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.history_dir = Some(dir.into());
        self
    }

    pub fn with_reload_policy(mut self, policy: ReloadPolicy) -> Self {
        self.reload_policy = policy;
        self
    }

    pub fn with_first_seed(mut self, seed: u64) -> Self {
        self.first_seed = seed;
        self
    }

    pub fn with_max_passes(mut self, passes: u64) -> Self {
        self.max_passes = Some(passes);
        self
    }

    pub fn with_reload_retry_interval(mut self, interval: Duration) -> Self {
        self.reload_retry_interval = interval;
        self
    }

    pub fn with_max_ticks_per_exercise(mut self, ticks: u64) -> Self {
        self.max_ticks_per_exercise = Some(ticks);
        self
    }

    pub fn with_tunables(mut self, tunables: GradingTunables) -> Self {
        self.tunables = tunables;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = HarnessConfig::default();
        assert_eq!(config.first_seed, 4);
        assert_eq!(config.reload_policy, ReloadPolicy::EachExercise);
        assert_eq!(config.reload_retry_interval, Duration::from_secs(1));
        assert!(config.max_passes.is_none());
    }

    #[test]
    fn test_reload_policy_names() {
        assert_eq!(ReloadPolicy::from_str("each-exercise", true), Ok(ReloadPolicy::EachExercise));
        assert_eq!(ReloadPolicy::from_str("never", true), Ok(ReloadPolicy::Never));
    }
}
