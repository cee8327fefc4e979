//! Exercise runner - plays one exercise against a session until graded.

use crate::exercise::Exercise;
use crate::result::{ExerciseResult, ReproductionInfo};
use chrono::Utc;
use drill_core::{
    EventDetector, Grade, Grader, GradingTunables, PlayerEvent, Renderer, SeededRandomSource,
    TrainingTick,
};
use drill_env::{EnvError, GameSession, RunId, Snapshot};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::any::Any;
use std::backtrace::Backtrace;
use std::cell::{Cell, RefCell};
use std::panic::{self, catch_unwind, AssertUnwindSafe};
use std::sync::Once;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors that end a run without a verdict.
#[derive(Debug, Error)]
pub enum RunError {
    /// The session could not set up the exercise
    #[error("Session error: {0}")]
    Env(#[from] EnvError),

    /// The snapshot stream ended before any grader decided
    #[error("Snapshots ran out after {ticks} ticks of '{exercise}'")]
    SnapshotsExhausted { exercise: String, ticks: u64 },

    /// The runner's safety cap was hit
    #[error("'{exercise}' was still undecided after {max_ticks} ticks")]
    TickLimit { exercise: String, max_ticks: u64 },
}

/// Runs single exercises.
#[derive(Debug, Clone, Default)]
pub struct ExerciseRunner {
    /// Inputs for building graders
    tunables: GradingTunables,

    /// Safety cap on ticks per exercise
    max_ticks: Option<u64>,
}

impl ExerciseRunner {
    /// Creates a runner with default tunables and no tick cap.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the grading tunables.
    pub fn with_tunables(mut self, tunables: GradingTunables) -> Self {
        self.tunables = tunables;
        self
    }

    /// Sets the per-exercise tick cap.
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = Some(max_ticks);
        self
    }

    pub fn tunables(&self) -> &GradingTunables {
        &self.tunables
    }

    /// Runs `exercise` until its grader returns Pass or Fail.
    ///
    /// The session is asked to start the exercise's match and apply the
    /// scenario built from `seed`; the runner never touches game state
    /// itself. A panicking grader fails the exercise instead of
    /// propagating; rendering problems are logged and ignored.
    pub async fn run<S: GameSession>(
        &self,
        session: &mut S,
        exercise: Exercise,
        seed: u64,
        reproduction_info: ReproductionInfo,
    ) -> Result<ExerciseResult, RunError> {
        debug!("Starting exercise: {} (seed={})", exercise.name, seed);
        let reproduction_info = ReproductionInfo {
            tunables: self.tunables.clone(),
            ..reproduction_info
        };

        let mut grader = exercise.grader.build(&self.tunables);
        let mut detector = EventDetector::new();

        let parent = ChaCha8Rng::seed_from_u64(seed);
        let mut rng = SeededRandomSource::from_parent(&parent);
        let state = exercise.scenario.build(&mut rng);

        session.ensure_match(&exercise.match_config).await?;
        session.apply_scenario(state).await?;

        let mut ticks: u64 = 0;
        loop {
            if self.max_ticks.is_some_and(|max| ticks >= max) {
                return Err(RunError::TickLimit {
                    exercise: exercise.name,
                    max_ticks: ticks,
                });
            }
            let Some(snapshot) = session.next_snapshot().await else {
                return Err(RunError::SnapshotsExhausted {
                    exercise: exercise.name,
                    ticks,
                });
            };
            ticks += 1;

            let events = detector.detect(&snapshot);
            for event in &events {
                debug!(
                    "  t={:.2}s | {:?} by {}",
                    event.seconds_elapsed, event.kind, event.participant.name
                );
            }

            let grade = match grade_tick(grader.as_mut(), &snapshot, &events) {
                Ok(grade) => {
                    render_tick(grader.as_ref(), session);
                    grade
                }
                Err(caught) => {
                    warn!("⚠️ Grader of '{}' panicked: {}", exercise.name, caught.message);
                    Grade::exercise_error_with_backtrace(caught.message, caught.backtrace)
                }
            };

            if grade.is_terminal() {
                let metric = catch_grader_panic(|| grader.metric()).ok().flatten();
                return Ok(ExerciseResult {
                    seed,
                    grade,
                    exercise,
                    reproduction_info,
                    run_id: RunId::new(),
                    created_at: Utc::now(),
                    ticks,
                    metric,
                });
            }
        }
    }

    /// Re-runs a recorded result with its seed, exercise and tunables.
    ///
    /// The tick cap of this runner still applies.
    pub async fn reproduce<S: GameSession>(
        &self,
        session: &mut S,
        original: &ExerciseResult,
    ) -> Result<ExerciseResult, RunError> {
        let runner = Self {
            tunables: original.reproduction_info.tunables.clone(),
            max_ticks: self.max_ticks,
        };
        runner
            .run(
                session,
                original.exercise.clone(),
                original.seed,
                original.reproduction_info.clone(),
            )
            .await
    }
}

/// A panic caught while calling into a grader.
#[derive(Debug)]
struct GraderPanic {
    message: String,
    backtrace: Option<String>,
}

thread_local! {
    static CAPTURE_BACKTRACE: Cell<bool> = Cell::new(false);
    static LAST_BACKTRACE: RefCell<Option<String>> = RefCell::new(None);
}

static BACKTRACE_HOOK: Once = Once::new();

/// Chains a panic hook that records the stack of panics raised inside
/// [`catch_grader_panic`] on the current thread. Other panics go to the
/// previous hook unchanged.
fn install_backtrace_hook() {
    BACKTRACE_HOOK.call_once(|| {
        let previous = panic::take_hook();
        panic::set_hook(Box::new(move |info| {
            if CAPTURE_BACKTRACE.with(Cell::get) {
                let backtrace = Backtrace::force_capture().to_string();
                LAST_BACKTRACE.with(|slot| *slot.borrow_mut() = Some(backtrace));
            } else {
                previous(info);
            }
        }));
    });
}

fn catch_grader_panic<T>(f: impl FnOnce() -> T) -> Result<T, GraderPanic> {
    install_backtrace_hook();
    CAPTURE_BACKTRACE.with(|flag| flag.set(true));
    let outcome = catch_unwind(AssertUnwindSafe(f));
    CAPTURE_BACKTRACE.with(|flag| flag.set(false));
    let backtrace = LAST_BACKTRACE.with(|slot| slot.borrow_mut().take());

    outcome.map_err(|payload| GraderPanic {
        message: panic_message(payload),
        backtrace,
    })
}

/// Grades one tick, catching a panicking grader.
fn grade_tick(
    grader: &mut dyn Grader,
    snapshot: &Snapshot,
    events: &[PlayerEvent],
) -> Result<Grade, GraderPanic> {
    let tick = TrainingTick::new(snapshot, events);
    catch_grader_panic(|| grader.on_tick(&tick))
}

/// Lets the grader draw. Never affects the grade.
fn render_tick<S: GameSession>(grader: &dyn Grader, session: &mut S) {
    let outcome = catch_grader_panic(|| {
        let mut renderer = Renderer::new(&mut *session);
        grader.render(&mut renderer);
        renderer.finish();
        (renderer.failures(), renderer.last_error().map(str::to_string))
    });

    match outcome {
        Ok((0, _)) => {}
        Ok((failures, last_error)) => debug!(
            "Render: {} draw calls failed (last: {})",
            failures,
            last_error.unwrap_or_default()
        ),
        Err(caught) => warn!("⚠️ Grader render panicked: {}", caught.message),
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "grader panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenarios::ScenarioConfig;
    use crate::session::ReplaySession;
    use drill_core::{FailOnTimeout, FailReason, GraderConfig, PassReason};
    use drill_env::{Participant, ScoreCounters, Team};

    fn reproduction() -> ReproductionInfo {
        ReproductionInfo::new(4, "test", 0)
    }

    fn snapshots(times: &[f64]) -> Vec<Snapshot> {
        times.iter().map(|&t| Snapshot::new(t)).collect()
    }

    fn timeout_exercise(max: f64) -> Exercise {
        Exercise::new("timeout", ScenarioConfig::BallInFrontOfGoal)
            .with_grader(GraderConfig::FailOnTimeout { max_duration_seconds: max })
    }

    #[tokio::test]
    async fn test_run_until_timeout() {
        let mut session = ReplaySession::new(snapshots(&[20.0, 23.2, 23.75, 30.0]));
        let result = ExerciseRunner::new()
            .run(&mut session, timeout_exercise(3.5), 4, reproduction())
            .await
            .unwrap();

        assert_eq!(result.grade, Grade::Fail(FailReason::Timeout { max_duration_seconds: 3.5 }));
        assert_eq!(result.ticks, 3);
        assert_eq!(result.seed, 4);
        assert_eq!(session.remaining(), 1);
        assert_eq!(session.applied.len(), 1);
        assert_eq!(session.matches.len(), 1);
        assert!(result.metric.is_some());
    }

    #[tokio::test]
    async fn test_scenario_built_from_seed() {
        let exercise = timeout_exercise(0.5);
        let mut first = ReplaySession::new(snapshots(&[0.0, 1.0]));
        let mut second = ReplaySession::new(snapshots(&[0.0, 1.0]));
        let runner = ExerciseRunner::new();

        runner.run(&mut first, exercise.clone(), 77, reproduction()).await.unwrap();
        runner.run(&mut second, exercise, 77, reproduction()).await.unwrap();

        assert_eq!(first.applied, second.applied);
    }

    #[tokio::test]
    async fn test_goal_event_passes_striker() {
        let scored = ScoreCounters { goals: 1, score: 100, ..Default::default() };
        let blue = Participant::new(0, "bot", Team::Blue);
        let ticks = vec![
            Snapshot::new(1.0).with_participant(blue.clone()),
            Snapshot::new(1.1).with_participant(blue.clone().with_counters(scored)),
        ];
        let mut session = ReplaySession::new(ticks);
        let exercise = Exercise::new("Facing ball", ScenarioConfig::BallInFrontOfGoal);

        let result = ExerciseRunner::new()
            .run(&mut session, exercise, 4, reproduction())
            .await
            .unwrap();

        assert_eq!(result.grade, Grade::Pass(PassReason::GoalForAllyTeam));
        assert_eq!(result.ticks, 2);
        // The striker timeout counts down on screen.
        assert!(!session.renderer.frames.is_empty());
    }

    #[tokio::test]
    async fn test_snapshots_exhausted() {
        let mut session = ReplaySession::new(snapshots(&[0.0, 1.0]));
        let err = ExerciseRunner::new()
            .run(&mut session, timeout_exercise(10.0), 4, reproduction())
            .await
            .unwrap_err();

        assert!(matches!(err, RunError::SnapshotsExhausted { ticks: 2, .. }));
    }

    #[tokio::test]
    async fn test_tick_limit() {
        let mut session = ReplaySession::new(snapshots(&[0.0, 1.0, 2.0, 3.0]));
        let err = ExerciseRunner::new()
            .with_max_ticks(2)
            .run(&mut session, timeout_exercise(10.0), 4, reproduction())
            .await
            .unwrap_err();

        assert!(matches!(err, RunError::TickLimit { max_ticks: 2, .. }));
    }

    #[tokio::test]
    async fn test_render_failures_do_not_change_grade() {
        let mut session = ReplaySession::new(snapshots(&[0.0, 1.0, 5.0])).with_failing_renderer();
        let result = ExerciseRunner::new()
            .run(&mut session, timeout_exercise(3.0), 4, reproduction())
            .await
            .unwrap();

        assert!(result.grade.is_fail());
        assert_eq!(result.ticks, 3);
    }

    #[test]
    fn test_grader_panic_becomes_exercise_error() {
        struct Exploding;

        impl Grader for Exploding {
            fn on_tick(&mut self, _tick: &TrainingTick<'_>) -> Grade {
                panic!("division by zero");
            }

            fn name(&self) -> &'static str {
                "Exploding"
            }
        }

        let snapshot = Snapshot::new(0.0);
        let caught = grade_tick(&mut Exploding, &snapshot, &[]).unwrap_err();
        assert_eq!(caught.message, "division by zero");
        assert!(caught.backtrace.as_deref().is_some_and(|b| !b.is_empty()));

        let grade = Grade::exercise_error_with_backtrace(caught.message, caught.backtrace);
        assert_eq!(grade.to_string(), "Fail: Exercise raised an error: division by zero");
        assert!(matches!(
            grade,
            Grade::Fail(FailReason::ExerciseError { backtrace: Some(_), .. })
        ));

        // Capture is scoped to the call; a later grade sees no stale stack.
        assert!(grade_tick(&mut FailOnTimeout::new(1.0), &snapshot, &[]).is_ok());
        assert!(LAST_BACKTRACE.with(|slot| slot.borrow().is_none()));
    }

    #[tokio::test]
    async fn test_reproduce_uses_recorded_tunables() {
        let times = [0.0, 0.1, 0.3, 1.0, 5.0];
        let exercise = Exercise::new("Facing ball", ScenarioConfig::BallInFrontOfGoal);
        let tunables = GradingTunables {
            striker_timeout_seconds: 0.2,
            ..Default::default()
        };

        let mut session = ReplaySession::new(snapshots(&times));
        let recorded = ExerciseRunner::new()
            .with_tunables(tunables.clone())
            .run(&mut session, exercise, 7, reproduction())
            .await
            .unwrap();
        assert_eq!(recorded.grade, Grade::Fail(FailReason::Timeout { max_duration_seconds: 0.2 }));
        assert_eq!(recorded.ticks, 3);
        assert_eq!(recorded.reproduction_info.tunables, tunables);

        // A runner with default tunables still replays the recorded ones.
        let mut replay_session = ReplaySession::new(snapshots(&times));
        let replayed = ExerciseRunner::new()
            .reproduce(&mut replay_session, &recorded)
            .await
            .unwrap();
        assert_eq!(replayed.grade, recorded.grade);
        assert_eq!(replayed.ticks, recorded.ticks);
        assert_eq!(replayed.seed, 7);
        assert_eq!(replay_session.applied, session.applied);
    }
}
