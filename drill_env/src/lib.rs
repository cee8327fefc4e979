//! Drill Environment Abstraction Layer
//!
//! This crate provides the boundary between the Drill grading harness and
//! whatever is actually playing the game: a live game process in
//! production, or a deterministic stand-in in tests and smoke runs.
//!
//! # Core Concept
//!
//! Drill never talks to the game directly. It only:
//! - Reads snapshots (`SnapshotSource::next_snapshot()`)
//! - Hands over exercise setup (`ScenarioSink::apply_scenario()`)
//! - Issues best-effort debug drawing (`RenderSink::draw()`)
//! - Asks a `Clock` for wall-clock time (seeding, back-off)
//!
//! # Example
//!
//! ```ignore
//! use drill_env::{GameSession, Snapshot};
//!
//! async fn watch<S: GameSession>(session: &mut S) {
//!     while let Some(snapshot) = session.next_snapshot().await {
//!         println!("t={:.2}", snapshot.seconds_elapsed);
//!     }
//! }
//! ```

mod context;
mod error;
mod session;
mod system_clock;
mod types;

pub use context::Clock;
pub use error::EnvError;
pub use session::{GameSession, NullRenderer, RenderSink, ScenarioSink, SnapshotSource};
pub use system_clock::SystemClock;
pub use types::{
    BallSnapshot, BallState, CarState, Color, DrawCommand, MatchConfig, Participant,
    PlayerConfig, PlayerKind, RunId, ScenarioState, ScoreCounters, Snapshot, Team, Touch,
};
