//! Where playlists come from.
//!
//! A [`PlaylistSource`] is asked for a complete, freshly built list of
//! exercises every time the loop reloads. Sources must be safe to call
//! repeatedly; a failed call leaves the running playlist untouched.

use crate::exercise::Exercise;
use crate::scenarios::ScenarioConfig;
use drill_core::{ConfigError, GraderConfig, GradingTunables};
use drill_env::Team;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors produced while loading a playlist.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Playlist file not found: {0}")]
    NotFound(PathBuf),

    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {path}: {message}")]
    Parse { path: PathBuf, message: String },

    #[error("Playlist {0} has no exercises")]
    Empty(String),

    #[error("Duplicate exercise name: {0}")]
    DuplicateName(String),

    #[error("Invalid grader in exercise '{exercise}': {source}")]
    InvalidGrader {
        exercise: String,
        #[source]
        source: ConfigError,
    },

    #[error("Invalid tunables in {path}: {source}")]
    InvalidTunables {
        path: PathBuf,
        #[source]
        source: ConfigError,
    },

    #[error("Playlist factory failed: {0}")]
    Factory(String),

    #[error("Unknown builtin playlist: {0}")]
    UnknownBuiltin(String),
}

/// A re-invocable provider of playlists.
pub trait PlaylistSource: Send + Sync {
    /// Human-readable location, recorded for reproduction.
    fn locator(&self) -> String;

    /// Produces a fresh list of exercises.
    fn load(&self) -> Result<Vec<Exercise>, SourceError>;

    /// Grading tunables carried by the source, re-read on every call.
    ///
    /// `None` means the harness defaults apply.
    fn tunables(&self) -> Result<Option<GradingTunables>, SourceError> {
        Ok(None)
    }
}

/// Checks the invariants every loaded playlist must satisfy.
pub fn validate_playlist(locator: &str, exercises: &[Exercise]) -> Result<(), SourceError> {
    if exercises.is_empty() {
        return Err(SourceError::Empty(locator.to_string()));
    }
    let mut seen = HashSet::new();
    for exercise in exercises {
        if !seen.insert(exercise.name.as_str()) {
            return Err(SourceError::DuplicateName(exercise.name.clone()));
        }
        exercise
            .grader
            .validate()
            .map_err(|source| SourceError::InvalidGrader {
                exercise: exercise.name.clone(),
                source,
            })?;
    }
    Ok(())
}

/// On-disk playlist document.
///
/// ```toml
/// [tunables]
/// striker_timeout_seconds = 5.0
///
/// [[exercise]]
/// name = "Facing ball"
/// scenario = { kind = "ball_in_front_of_goal" }
/// grader = { kind = "striker" }
/// ```
#[derive(Debug, Deserialize)]
struct PlaylistDocument {
    #[serde(default)]
    tunables: Option<GradingTunables>,
    #[serde(default)]
    exercise: Vec<Exercise>,
}

/// A playlist stored as a TOML file and re-read on every load.
#[derive(Debug, Clone)]
pub struct TomlPlaylistFile {
    path: PathBuf,
}

impl TomlPlaylistFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_document(&self) -> Result<PlaylistDocument, SourceError> {
        if !self.path.exists() {
            return Err(SourceError::NotFound(self.path.clone()));
        }
        let content = fs::read_to_string(&self.path).map_err(|source| SourceError::Io {
            path: self.path.clone(),
            source,
        })?;
        let document: PlaylistDocument = toml::from_str(&content).map_err(|e| SourceError::Parse {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        if let Some(tunables) = &document.tunables {
            tunables.validate().map_err(|source| SourceError::InvalidTunables {
                path: self.path.clone(),
                source,
            })?;
        }
        Ok(document)
    }
}

impl PlaylistSource for TomlPlaylistFile {
    fn locator(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self) -> Result<Vec<Exercise>, SourceError> {
        let exercises = self.read_document()?.exercise;
        validate_playlist(&self.locator(), &exercises)?;
        Ok(exercises)
    }

    /// The optional `[tunables]` table of the file.
    fn tunables(&self) -> Result<Option<GradingTunables>, SourceError> {
        Ok(self.read_document()?.tunables)
    }
}

type PlaylistFactory = dyn Fn() -> Result<Vec<Exercise>, SourceError> + Send + Sync;

/// A playlist produced by an in-process factory closure.
pub struct FnPlaylist {
    name: String,
    factory: Box<PlaylistFactory>,
}

impl FnPlaylist {
    pub fn new<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Result<Vec<Exercise>, SourceError> + Send + Sync + 'static,
    {
        Self {
            name: name.into(),
            factory: Box::new(factory),
        }
    }

    /// Wraps a factory that cannot fail.
    pub fn infallible<F>(name: impl Into<String>, factory: F) -> Self
    where
        F: Fn() -> Vec<Exercise> + Send + Sync + 'static,
    {
        Self::new(name, move || Ok(factory()))
    }
}

impl PlaylistSource for FnPlaylist {
    fn locator(&self) -> String {
        self.name.clone()
    }

    fn load(&self) -> Result<Vec<Exercise>, SourceError> {
        let exercises = (self.factory)()?;
        validate_playlist(&self.name, &exercises)?;
        Ok(exercises)
    }
}

/// The striker playlist: score on the orange goal before the timeout.
pub fn striker_playlist() -> Vec<Exercise> {
    let facing_away = |name: &str, car_start_x: f64, car_start_y: f64| {
        Exercise::new(name, ScenarioConfig::FacingAwayFromBall { car_start_x, car_start_y })
    };
    vec![
        Exercise::new("Facing ball", ScenarioConfig::BallInFrontOfGoal),
        Exercise::new("Rolling Shot", ScenarioConfig::RollingTowardsGoal),
        facing_away("Facing directly away from ball", 0.0, 2400.0),
        facing_away("Facing away from ball 1", 1500.0, 2400.0),
        facing_away("Facing away from ball 2", -400.0, 2400.0),
        facing_away("Facing away from opponents goal", 200.0, 5100.0),
    ]
}

/// The goalie playlist: keep the ball out of the blue goal.
pub fn goalie_playlist() -> Vec<Exercise> {
    vec![Exercise::new("BallRollingToGoalie", ScenarioConfig::BallRollingToGoalie).with_grader(
        GraderConfig::Goalie {
            timeout_seconds: None,
            ally_team: Team::Blue,
        },
    )]
}

/// Prefix selecting a built-in playlist instead of a file.
pub const BUILTIN_PREFIX: &str = "builtin:";

/// Resolves `builtin:<name>` or a TOML file path.
pub fn open_source(locator: &str) -> Result<Box<dyn PlaylistSource>, SourceError> {
    match locator.strip_prefix(BUILTIN_PREFIX) {
        Some("striker") => Ok(Box::new(FnPlaylist::infallible(locator, striker_playlist))),
        Some("goalie") => Ok(Box::new(FnPlaylist::infallible(locator, goalie_playlist))),
        Some(other) => Err(SourceError::UnknownBuiltin(other.to_string())),
        None => Ok(Box::new(TomlPlaylistFile::new(locator))),
    }
}
