//! Keeping the start and end state of an attempt.

use crate::grade::Grade;
use crate::grader::{Grader, Renderer, TrainingTick};
use drill_env::Snapshot;
use serde_json::{json, Value};

/// Wraps another grader and remembers the first graded snapshot and the
/// one on which the wrapped grader reached a terminal grade.
///
/// The grade itself is passed through untouched. Both snapshots end up in
/// the metric next to the wrapped grader's own metric, so a stored result
/// shows where the attempt started and where it ended.
pub struct SnapshotWrapperGrader {
    inner: Box<dyn Grader>,
    first: Option<Snapshot>,
    terminal: Option<Snapshot>,
}

impl SnapshotWrapperGrader {
    pub fn new(inner: Box<dyn Grader>) -> Self {
        Self {
            inner,
            first: None,
            terminal: None,
        }
    }

    pub fn first_snapshot(&self) -> Option<&Snapshot> {
        self.first.as_ref()
    }

    /// Snapshot of the tick that ended the attempt, once there is one.
    pub fn terminal_snapshot(&self) -> Option<&Snapshot> {
        self.terminal.as_ref()
    }
}

impl Grader for SnapshotWrapperGrader {
    fn on_tick(&mut self, tick: &TrainingTick<'_>) -> Grade {
        if self.first.is_none() {
            self.first = Some(tick.snapshot.clone());
        }

        let grade = self.inner.on_tick(tick);
        if grade.is_terminal() && self.terminal.is_none() {
            self.terminal = Some(tick.snapshot.clone());
        }
        grade
    }

    fn render(&self, renderer: &mut Renderer<'_>) {
        self.inner.render(renderer);
    }

    fn metric(&self) -> Option<Value> {
        Some(json!({
            "grader": self.inner.name(),
            "first_snapshot": self.first,
            "terminal_snapshot": self.terminal,
            "metric": self.inner.metric(),
        }))
    }

    fn name(&self) -> &'static str {
        "SnapshotWrapperGrader"
    }
}
