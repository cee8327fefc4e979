//! Drill Core - exercise grading engine
//!
//! Pure, synchronous building blocks for judging a training exercise
//! from a stream of game snapshots:
//! 1. **Events**: counter deltas between consecutive snapshots become
//!    once-only player events
//! 2. **Grades**: a `Continue | Pass | Fail` state machine with a
//!    significance order (Fail > Pass > Continue)
//! 3. **Graders**: timeout, goal and touch judges, combined by
//!    [`CompoundGrader`], optionally wrapped by [`SnapshotWrapperGrader`],
//!    and described by serializable [`GraderConfig`]s
//!
//! Nothing here performs I/O; the harness in `drill_sim` drives it.

pub mod compound;
pub mod config;
pub mod events;
pub mod goal;
pub mod grade;
pub mod grader;
pub mod rng;
pub mod snapshots;
pub mod timeout;
pub mod touches;

// Re-export key types for convenience
pub use compound::CompoundGrader;
pub use config::{ConfigError, GraderConfig, GradingTunables, NamedGraderConfig};
pub use events::{EventDetector, PlayerEvent, PlayerEventKind};
pub use goal::{
    goalie_grader, rl_striker_grader, striker_grader, PassOnBallGoingAwayFromGoal,
    PassOnGoalForAllyTeam,
};
pub use grade::{FailReason, Grade, PassReason};
pub use grader::{Grader, Renderer, TrainingTick};
pub use rng::SeededRandomSource;
pub use snapshots::SnapshotWrapperGrader;
pub use timeout::{FailOnBallOnGroundAfterTimeout, FailOnTimeout, PassOnTimeout};
pub use touches::RecordBallTouches;
