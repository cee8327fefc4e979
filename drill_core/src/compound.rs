//! Combining several graders into one verdict.

use crate::grade::Grade;
use crate::grader::{Grader, Renderer, TrainingTick};
use serde_json::{Map, Value};

/// Runs an ordered list of named graders and reduces their grades by
/// significance (Fail > Pass > Continue).
///
/// Every child sees every tick, even once another child has already
/// decided, since children may accumulate state or draw overlays. Among
/// equally significant grades the earliest child wins, so the result
/// depends on child order.
pub struct CompoundGrader {
    graders: Vec<(String, Box<dyn Grader>)>,
}

impl CompoundGrader {
    pub fn new(graders: Vec<(String, Box<dyn Grader>)>) -> Self {
        Self { graders }
    }

    /// Builder-style append.
    pub fn with(mut self, name: impl Into<String>, grader: Box<dyn Grader>) -> Self {
        self.graders.push((name.into(), grader));
        self
    }

    pub fn len(&self) -> usize {
        self.graders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.graders.is_empty()
    }

    /// Child names in evaluation order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.graders.iter().map(|(name, _)| name.as_str())
    }
}

impl Grader for CompoundGrader {
    fn on_tick(&mut self, tick: &TrainingTick<'_>) -> Grade {
        let grades: Vec<Grade> = self
            .graders
            .iter_mut()
            .map(|(_, grader)| grader.on_tick(tick))
            .collect();

        grades
            .into_iter()
            .fold(Grade::Continue, Grade::pick_more_significant)
    }

    fn render(&self, renderer: &mut Renderer<'_>) {
        for (_, grader) in &self.graders {
            grader.render(renderer);
        }
    }

    fn metric(&self) -> Option<Value> {
        let metrics: Map<String, Value> = self
            .graders
            .iter()
            .map(|(name, grader)| (name.clone(), grader.metric().unwrap_or(Value::Null)))
            .collect();
        Some(Value::Object(metrics))
    }

    fn name(&self) -> &'static str {
        "CompoundGrader"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grade::{FailReason, PassReason};
    use drill_env::Snapshot;
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Always answers the same grade and counts its calls.
    struct Fixed {
        grade: Grade,
        calls: Arc<AtomicUsize>,
    }

    impl Fixed {
        fn boxed(grade: Grade) -> Box<dyn Grader> {
            Box::new(Self { grade, calls: Arc::new(AtomicUsize::new(0)) })
        }
    }

    impl Grader for Fixed {
        fn on_tick(&mut self, _tick: &TrainingTick<'_>) -> Grade {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.grade.clone()
        }

        fn name(&self) -> &'static str {
            "Fixed"
        }
    }

    fn fail(secs: f64) -> Grade {
        Grade::Fail(FailReason::Timeout { max_duration_seconds: secs })
    }

    fn pass() -> Grade {
        Grade::Pass(PassReason::GoalForAllyTeam)
    }

    fn grade_once(children: Vec<Grade>) -> Grade {
        let mut compound = CompoundGrader::new(
            children
                .into_iter()
                .enumerate()
                .map(|(i, g)| (format!("child{}", i), Fixed::boxed(g)))
                .collect(),
        );
        let snapshot = Snapshot::new(0.0);
        compound.on_tick(&TrainingTick::new(&snapshot, &[]))
    }

    #[test]
    fn test_first_fail_wins() {
        assert_eq!(grade_once(vec![fail(1.0), fail(2.0)]), fail(1.0));
    }

    #[test]
    fn test_second_fail_when_only_second_fails() {
        assert_eq!(grade_once(vec![pass(), fail(2.0)]), fail(2.0));
        assert_eq!(grade_once(vec![Grade::Continue, fail(2.0)]), fail(2.0));
    }

    #[test]
    fn test_pass_requires_no_fail() {
        assert_eq!(grade_once(vec![Grade::Continue, pass()]), pass());
    }

    #[test]
    fn test_continue_only_when_all_continue() {
        assert_eq!(grade_once(vec![Grade::Continue, Grade::Continue]), Grade::Continue);
        assert_eq!(grade_once(vec![]), Grade::Continue);
    }

    #[test]
    fn test_every_child_is_called() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let mut compound = CompoundGrader::new(vec![])
            .with("fails", Box::new(Fixed { grade: fail(1.0), calls: first.clone() }))
            .with("watches", Box::new(Fixed { grade: Grade::Continue, calls: second.clone() }));

        let snapshot = Snapshot::new(0.0);
        compound.on_tick(&TrainingTick::new(&snapshot, &[]));

        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 1);
        assert_eq!(compound.names().collect::<Vec<_>>(), vec!["fails", "watches"]);
    }

    #[test]
    fn test_metric_keyed_by_name() {
        let compound = CompoundGrader::new(vec![("a".to_string(), Fixed::boxed(pass()))]);
        let metric = compound.metric().unwrap();
        assert!(metric["a"].is_null());
    }

    fn arb_grade() -> impl Strategy<Value = Grade> {
        prop_oneof![
            Just(Grade::Continue),
            Just(pass()),
            (0.0f64..10.0).prop_map(fail),
        ]
    }

    proptest! {
        #[test]
        fn prop_result_is_first_of_highest_significance(grades in prop::collection::vec(arb_grade(), 0..6)) {
            let result = grade_once(grades.clone());
            let top = grades.iter().map(Grade::significance).max().unwrap_or(0);
            let expected = grades
                .iter()
                .find(|g| g.significance() == top)
                .cloned()
                .unwrap_or(Grade::Continue);
            prop_assert_eq!(result, expected);
        }
    }
}
