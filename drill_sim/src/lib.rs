//! Drill Exercise Harness
//!
//! Runs grading exercises against a live game session, pass after pass,
//! and picks up edits to the playlist while it runs.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                  PlaylistExecutionLoop                     │
//! │                                                            │
//! │  PlaylistSource ──load──► Playlist (Arc<RwLock<Exercise>>) │
//! │       ▲   reload after                 │ value copy        │
//! │       │   every exercise               ▼                   │
//! │       │                        ┌───────────────┐           │
//! │       └────────────────────────│ ExerciseRunner│           │
//! │                                └───────┬───────┘           │
//! │                                        │ snapshots         │
//! │                        ┌───────────────▼────────────┐      │
//! │                        │ GameSession (live or sim)  │      │
//! │                        └────────────────────────────┘      │
//! │                                        │ ExerciseResult    │
//! │                                        ▼                   │
//! │              ResultSink: ResultHistoryStore / NullSink     │
//! └────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use drill_sim::{HarnessConfig, KinematicSession, NullSink, PlaylistExecutionLoop, TomlPlaylistFile};
//!
//! let source = Box::new(TomlPlaylistFile::new("demos/striker.toml"));
//! let config = HarnessConfig::default().with_max_passes(3);
//! let mut execution = PlaylistExecutionLoop::new(source, KinematicSession::new(), NullSink::new(), config);
//! execution.run().await?;
//! ```

pub mod clock;
pub mod config;
pub mod encoding;
pub mod execution;
pub mod exercise;
pub mod history;
pub mod playlist;
pub mod result;
pub mod runner;
pub mod scenarios;
pub mod session;
pub mod source;

pub use clock::ManualClock;
pub use config::{HarnessConfig, ReloadPolicy};
pub use execution::{run_playlist_once, LoopError, LoopReport, PlaylistExecutionLoop, ReloadOutcome};
pub use exercise::{apply_update, Exercise, UpdateError};
pub use history::{
    canonical_match_config_json, load_result_file, match_config_hash, HistoryError, NullSink,
    ResultHistoryStore, ResultSink,
};
pub use playlist::{ExerciseSlot, Playlist};
pub use result::{ExerciseResult, ReproductionInfo};
pub use runner::{ExerciseRunner, RunError};
pub use scenarios::ScenarioConfig;
pub use session::{KinematicSession, RecordingRenderer, ReplaySession};
pub use source::{
    goalie_playlist, open_source, striker_playlist, validate_playlist, FnPlaylist, PlaylistSource,
    SourceError, TomlPlaylistFile, BUILTIN_PREFIX,
};
