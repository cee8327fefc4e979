//! The `Grader` trait and the per-tick input it receives.

use crate::events::PlayerEvent;
use crate::grade::Grade;
use drill_env::{Color, DrawCommand, RenderSink, Snapshot};
use nalgebra::Vector3;
use serde_json::Value;

/// One tick as seen by graders: the raw snapshot plus the events the
/// detector found in it.
#[derive(Debug, Clone, Copy)]
pub struct TrainingTick<'a> {
    pub snapshot: &'a Snapshot,
    pub events: &'a [PlayerEvent],
}

impl<'a> TrainingTick<'a> {
    pub fn new(snapshot: &'a Snapshot, events: &'a [PlayerEvent]) -> Self {
        Self { snapshot, events }
    }

    /// Simulated time of this tick.
    pub fn seconds_elapsed(&self) -> f64 {
        self.snapshot.seconds_elapsed
    }
}

/// A judge of an exercise.
///
/// Receives every tick of one exercise run and answers Continue, Pass or
/// Fail. A grader has no notion of "already decided": the runner stops
/// calling it after the first terminal grade, and builds a fresh instance
/// for the next run.
pub trait Grader: Send {
    /// Grades one tick.
    fn on_tick(&mut self, tick: &TrainingTick<'_>) -> Grade;

    /// Draws debug information. Called after grading, every tick.
    fn render(&self, _renderer: &mut Renderer<'_>) {}

    /// Implementation defined measurements persisted with the result.
    fn metric(&self) -> Option<Value> {
        None
    }

    /// Human readable grader name used in logs and metrics.
    fn name(&self) -> &'static str;
}

/// Best-effort drawing handle given to graders.
///
/// Sink failures are swallowed and counted so a broken overlay can never
/// abort grading.
pub struct Renderer<'a> {
    sink: &'a mut dyn RenderSink,
    failures: usize,
    last_error: Option<String>,
}

impl<'a> Renderer<'a> {
    pub fn new(sink: &'a mut dyn RenderSink) -> Self {
        Self {
            sink,
            failures: 0,
            last_error: None,
        }
    }

    /// Queues an arbitrary command.
    pub fn draw(&mut self, command: DrawCommand) {
        if let Err(e) = self.sink.draw(command) {
            self.failures += 1;
            self.last_error = Some(e.to_string());
        }
    }

    pub fn line(&mut self, from: Vector3<f64>, to: Vector3<f64>, color: Color) {
        self.draw(DrawCommand::Line { from, to, color });
    }

    pub fn text(&mut self, at: Vector3<f64>, text: impl Into<String>, color: Color) {
        self.draw(DrawCommand::Text {
            at,
            text: text.into(),
            color,
        });
    }

    /// Flushes the frame, counting a failure like any other draw call.
    pub fn finish(&mut self) {
        if let Err(e) = self.sink.finish_frame() {
            self.failures += 1;
            self.last_error = Some(e.to_string());
        }
    }

    /// Number of draw calls that failed so far.
    pub fn failures(&self) -> usize {
        self.failures
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }
}
