//! Game session abstraction for Drill exercises.

use async_trait::async_trait;
use crate::error::EnvError;
use crate::types::{DrawCommand, MatchConfig, ScenarioState, Snapshot};

/// Source of per-tick snapshots from the live session.
///
/// # Implementations
///
/// - **Production**: a bridge to the running game process
/// - **Simulation**: `KinematicSession` / `ReplaySession` in drill_sim
///
/// # Tick Flow
///
/// ```text
/// Game                     SnapshotSource                 Runner
///   |-- tick ------------------>|                            |
///   |                           |-- next_snapshot() -------->|-- detect events
///   |                           |                            |-- grade
/// ```
#[async_trait]
pub trait SnapshotSource: Send {
    /// Waits for the next tick.
    ///
    /// # Returns
    /// * `Some(snapshot)` - The state of the session for one tick
    /// * `None` - The session ended (no more ticks will arrive)
    async fn next_snapshot(&mut self) -> Option<Snapshot>;
}

/// Applies exercise setup to the live session.
///
/// The runner never mutates game state itself; it hands everything here.
#[async_trait]
pub trait ScenarioSink: Send {
    /// Makes sure the session is running the given match.
    ///
    /// Implementations should be cheap when the match is already running.
    async fn ensure_match(&mut self, config: &MatchConfig) -> Result<(), EnvError>;

    /// Applies the initial state of an exercise.
    async fn apply_scenario(&mut self, state: ScenarioState) -> Result<(), EnvError>;
}

/// Best-effort debug drawing.
///
/// Failures are reported but must never change a grading verdict.
pub trait RenderSink: Send {
    /// Queues a draw command for the current tick.
    fn draw(&mut self, command: DrawCommand) -> Result<(), EnvError>;

    /// Flushes the commands queued for the current tick.
    fn finish_frame(&mut self) -> Result<(), EnvError> {
        Ok(())
    }
}

/// A render sink that drops everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRenderer;

impl RenderSink for NullRenderer {
    fn draw(&mut self, _command: DrawCommand) -> Result<(), EnvError> {
        Ok(())
    }
}

/// Everything the runner needs from a session.
pub trait GameSession: SnapshotSource + ScenarioSink + RenderSink {}

impl<T: SnapshotSource + ScenarioSink + RenderSink> GameSession for T {}
