//! Ball touch recording.

use crate::grade::Grade;
use crate::grader::{Grader, TrainingTick};
use drill_env::Touch;
use serde_json::Value;

/// Keeps a log of ball touches made while the exercise is running.
///
/// Touches from before the first graded tick are ignored, as is a touch
/// whose time equals the last recorded one. Never terminates the exercise.
#[derive(Debug, Clone, Default)]
pub struct RecordBallTouches {
    touches: Vec<Touch>,
    initial_seconds_elapsed: Option<f64>,
}

impl RecordBallTouches {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn touches(&self) -> &[Touch] {
        &self.touches
    }
}

impl Grader for RecordBallTouches {
    fn on_tick(&mut self, tick: &TrainingTick<'_>) -> Grade {
        let initial = *self
            .initial_seconds_elapsed
            .get_or_insert(tick.seconds_elapsed());

        let Some(touch) = tick.snapshot.ball.latest_touch else {
            return Grade::Continue;
        };
        if touch.seconds_elapsed < initial {
            return Grade::Continue;
        }
        if self
            .touches
            .last()
            .is_some_and(|last| last.seconds_elapsed == touch.seconds_elapsed)
        {
            return Grade::Continue;
        }

        self.touches.push(touch);
        Grade::Continue
    }

    fn metric(&self) -> Option<Value> {
        serde_json::to_value(&self.touches).ok()
    }

    fn name(&self) -> &'static str {
        "RecordBallTouches"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drill_env::Snapshot;

    fn touched(seconds: f64, touch_time: Option<f64>) -> Snapshot {
        let mut snapshot = Snapshot::new(seconds);
        snapshot.ball.latest_touch = touch_time.map(|t| Touch {
            participant_index: 0,
            seconds_elapsed: t,
        });
        snapshot
    }

    #[test]
    fn test_records_new_touches_once() {
        let mut grader = RecordBallTouches::new();
        let ticks = [
            touched(10.0, Some(3.0)),  // before the exercise started
            touched(10.5, Some(10.4)),
            touched(10.6, Some(10.4)), // same touch again
            touched(11.0, Some(10.9)),
            touched(11.1, None),
        ];
        for snapshot in &ticks {
            assert_eq!(grader.on_tick(&TrainingTick::new(snapshot, &[])), Grade::Continue);
        }

        let times: Vec<f64> = grader.touches().iter().map(|t| t.seconds_elapsed).collect();
        assert_eq!(times, vec![10.4, 10.9]);
        assert_eq!(grader.metric().unwrap().as_array().unwrap().len(), 2);
    }
}
