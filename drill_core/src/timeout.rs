//! Graders that end an exercise after a span of simulated time.
//!
//! All of them measure `seconds_elapsed` from the snapshots, never the
//! wall clock, so a stalled or sped-up game does not change the verdict.

use crate::grade::{FailReason, Grade, PassReason};
use crate::grader::{Grader, Renderer, TrainingTick};
use drill_env::Color;
use nalgebra::Vector3;
use serde_json::{json, Value};

/// Fails the exercise if it takes too long.
#[derive(Debug, Clone)]
pub struct FailOnTimeout {
    max_duration_seconds: f64,
    initial_seconds_elapsed: Option<f64>,
    measured_duration_seconds: Option<f64>,
}

impl FailOnTimeout {
    pub fn new(max_duration_seconds: f64) -> Self {
        Self {
            max_duration_seconds,
            initial_seconds_elapsed: None,
            measured_duration_seconds: None,
        }
    }

    pub fn max_duration_seconds(&self) -> f64 {
        self.max_duration_seconds
    }

    /// Simulated seconds since the first graded tick.
    pub fn measured_duration_seconds(&self) -> Option<f64> {
        self.measured_duration_seconds
    }

    /// Updates the measurement and reports whether the limit was exceeded.
    fn timed_out(&mut self, seconds_elapsed: f64) -> bool {
        let initial = *self.initial_seconds_elapsed.get_or_insert(seconds_elapsed);
        let measured = seconds_elapsed - initial;
        self.measured_duration_seconds = Some(measured);
        measured > self.max_duration_seconds
    }

    fn timeout_metric(&self) -> Value {
        json!({
            "max_duration_seconds": self.max_duration_seconds,
            "initial_seconds_elapsed": self.initial_seconds_elapsed,
            "measured_duration_seconds": self.measured_duration_seconds,
        })
    }

    fn render_countdown(&self, renderer: &mut Renderer<'_>, color: Color) {
        if let Some(measured) = self.measured_duration_seconds {
            let remaining = (self.max_duration_seconds - measured).max(0.0);
            renderer.text(
                Vector3::new(0.0, 0.0, 300.0),
                format!("{:.1}s", remaining),
                color,
            );
        }
    }
}

impl Grader for FailOnTimeout {
    fn on_tick(&mut self, tick: &TrainingTick<'_>) -> Grade {
        if self.timed_out(tick.seconds_elapsed()) {
            Grade::Fail(FailReason::Timeout {
                max_duration_seconds: self.max_duration_seconds,
            })
        } else {
            Grade::Continue
        }
    }

    fn render(&self, renderer: &mut Renderer<'_>) {
        self.render_countdown(renderer, Color::RED);
    }

    fn metric(&self) -> Option<Value> {
        Some(self.timeout_metric())
    }

    fn name(&self) -> &'static str {
        "FailOnTimeout"
    }
}

/// Passes the exercise if nothing failed before the time ran out.
#[derive(Debug, Clone)]
pub struct PassOnTimeout {
    inner: FailOnTimeout,
}

impl PassOnTimeout {
    pub fn new(max_duration_seconds: f64) -> Self {
        Self {
            inner: FailOnTimeout::new(max_duration_seconds),
        }
    }
}

impl Grader for PassOnTimeout {
    fn on_tick(&mut self, tick: &TrainingTick<'_>) -> Grade {
        match self.inner.on_tick(tick) {
            Grade::Fail(FailReason::Timeout { max_duration_seconds }) => {
                Grade::Pass(PassReason::SurvivedTimeout { max_duration_seconds })
            }
            other => other,
        }
    }

    fn render(&self, renderer: &mut Renderer<'_>) {
        self.inner.render_countdown(renderer, Color::GREEN);
    }

    fn metric(&self) -> Option<Value> {
        Some(self.inner.timeout_metric())
    }

    fn name(&self) -> &'static str {
        "PassOnTimeout"
    }
}

/// Ball height below which it counts as resting on the ground.
const GROUND_HEIGHT: f64 = 100.0;

/// Mirrors the in-game custom striker training: once the time is up the
/// attempt only fails when the ball is low and not dropping any more, so
/// a shot that is still in the air gets to land first.
#[derive(Debug, Clone)]
pub struct FailOnBallOnGroundAfterTimeout {
    inner: FailOnTimeout,
}

impl FailOnBallOnGroundAfterTimeout {
    pub fn new(max_duration_seconds: f64) -> Self {
        Self {
            inner: FailOnTimeout::new(max_duration_seconds),
        }
    }
}

impl Grader for FailOnBallOnGroundAfterTimeout {
    fn on_tick(&mut self, tick: &TrainingTick<'_>) -> Grade {
        if !self.inner.timed_out(tick.seconds_elapsed()) {
            return Grade::Continue;
        }
        let ball = &tick.snapshot.ball;
        if ball.position.z < GROUND_HEIGHT && ball.velocity.z >= 0.0 {
            Grade::Fail(FailReason::BallOnGroundAfterTimeout {
                max_duration_seconds: self.inner.max_duration_seconds,
            })
        } else {
            Grade::Continue
        }
    }

    fn render(&self, renderer: &mut Renderer<'_>) {
        self.inner.render_countdown(renderer, Color::YELLOW);
    }

    fn metric(&self) -> Option<Value> {
        Some(self.inner.timeout_metric())
    }

    fn name(&self) -> &'static str {
        "FailOnBallOnGroundAfterTimeout"
    }
}
