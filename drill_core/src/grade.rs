//! The tri-state verdict produced by graders every tick.

use serde::{Deserialize, Serialize};

/// Why an exercise passed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PassReason {
    /// A goal counted for the ally team
    GoalForAllyTeam,

    /// The ball kept moving away from the ally goal long enough
    BallGoingAwayFromGoal { consecutive_ticks: u32 },

    /// Nothing failed before the time ran out
    SurvivedTimeout { max_duration_seconds: f64 },
}

impl PassReason {
    /// Short type-like name of the variant.
    pub fn variant_name(&self) -> &'static str {
        match self {
            PassReason::GoalForAllyTeam => "GoalForAllyTeam",
            PassReason::BallGoingAwayFromGoal { .. } => "BallGoingAwayFromGoal",
            PassReason::SurvivedTimeout { .. } => "SurvivedTimeout",
        }
    }
}

/// Why an exercise failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FailReason {
    /// The ball went into the ally team's goal
    WrongGoal,

    /// The exercise took longer than allowed
    Timeout { max_duration_seconds: f64 },

    /// Time ran out while the ball was resting low on the field
    BallOnGroundAfterTimeout { max_duration_seconds: f64 },

    /// Grading itself broke; the message is what the grader reported
    ExerciseError {
        message: String,
        /// Stack at the point of failure, when one was captured
        #[serde(default, skip_serializing_if = "Option::is_none")]
        backtrace: Option<String>,
    },
}

impl FailReason {
    /// Short type-like name of the variant.
    pub fn variant_name(&self) -> &'static str {
        match self {
            FailReason::WrongGoal => "WrongGoal",
            FailReason::Timeout { .. } => "Timeout",
            FailReason::BallOnGroundAfterTimeout { .. } => "BallOnGroundAfterTimeout",
            FailReason::ExerciseError { .. } => "ExerciseError",
        }
    }
}

/// Verdict for one tick.
///
/// `Continue` is the initial, non-terminal state. `Pass` and `Fail` end
/// the exercise; callers stop grading once either is produced.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "reason", rename_all = "snake_case")]
pub enum Grade {
    #[default]
    Continue,
    Pass(PassReason),
    Fail(FailReason),
}

impl Grade {
    /// Shorthand for a failure caused by a broken grader.
    pub fn exercise_error(message: impl Into<String>) -> Self {
        Grade::Fail(FailReason::ExerciseError {
            message: message.into(),
            backtrace: None,
        })
    }

    /// Like [`Grade::exercise_error`], keeping the captured stack.
    pub fn exercise_error_with_backtrace(message: impl Into<String>, backtrace: Option<String>) -> Self {
        Grade::Fail(FailReason::ExerciseError {
            message: message.into(),
            backtrace,
        })
    }

    /// The same grade with any captured stack dropped.
    ///
    /// Stacks differ between builds, so replays compare grades this way.
    pub fn without_backtrace(&self) -> Grade {
        match self {
            Grade::Fail(FailReason::ExerciseError { message, .. }) => Grade::exercise_error(message.clone()),
            other => other.clone(),
        }
    }

    /// Pass or Fail.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Grade::Continue)
    }

    pub fn is_pass(&self) -> bool {
        matches!(self, Grade::Pass(_))
    }

    pub fn is_fail(&self) -> bool {
        matches!(self, Grade::Fail(_))
    }

    /// Rank in the significance order Fail > Pass > Continue.
    pub fn significance(&self) -> u8 {
        match self {
            Grade::Continue => 0,
            Grade::Pass(_) => 1,
            Grade::Fail(_) => 2,
        }
    }

    /// Returns whichever grade is more significant; ties favour `a`.
    pub fn pick_more_significant(a: Grade, b: Grade) -> Grade {
        if b.significance() > a.significance() {
            b
        } else {
            a
        }
    }

    /// Name of the concrete outcome, e.g. `"Timeout"` or `"Continue"`.
    pub fn variant_name(&self) -> &'static str {
        match self {
            Grade::Continue => "Continue",
            Grade::Pass(reason) => reason.variant_name(),
            Grade::Fail(reason) => reason.variant_name(),
        }
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Grade::Continue => write!(f, "Continue"),
            Grade::Pass(PassReason::GoalForAllyTeam) => write!(f, "Pass: Goal for the ally team."),
            Grade::Pass(PassReason::BallGoingAwayFromGoal { consecutive_ticks }) => write!(
                f,
                "Pass: Ball moved away from goal for {} consecutive ticks.",
                consecutive_ticks
            ),
            Grade::Pass(PassReason::SurvivedTimeout { max_duration_seconds }) => {
                write!(f, "Pass: Timeout: Survived {} seconds.", max_duration_seconds)
            }
            Grade::Fail(FailReason::WrongGoal) => write!(f, "Fail: Ball went into the wrong goal."),
            Grade::Fail(FailReason::Timeout { max_duration_seconds }) => {
                write!(f, "Fail: Timeout: Took longer than {} seconds.", max_duration_seconds)
            }
            Grade::Fail(FailReason::BallOnGroundAfterTimeout { max_duration_seconds }) => write!(
                f,
                "Fail: Timeout: Ball on the ground after {} seconds.",
                max_duration_seconds
            ),
            Grade::Fail(FailReason::ExerciseError { message, .. }) => {
                write!(f, "Fail: Exercise raised an error: {}", message)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timeout(secs: f64) -> Grade {
        Grade::Fail(FailReason::Timeout { max_duration_seconds: secs })
    }

    #[test]
    fn test_significance_order() {
        let pass = Grade::Pass(PassReason::GoalForAllyTeam);
        assert!(timeout(1.0).significance() > pass.significance());
        assert!(pass.significance() > Grade::Continue.significance());
    }

    #[test]
    fn test_pick_favours_first_on_tie() {
        let picked = Grade::pick_more_significant(timeout(1.0), timeout(2.0));
        assert_eq!(picked, timeout(1.0));

        let picked = Grade::pick_more_significant(Grade::Continue, timeout(2.0));
        assert_eq!(picked, timeout(2.0));
    }

    #[test]
    fn test_terminal_flags() {
        assert!(!Grade::Continue.is_terminal());
        assert!(Grade::exercise_error("boom").is_terminal());
        assert!(Grade::exercise_error("boom").is_fail());
        assert!(Grade::Pass(PassReason::GoalForAllyTeam).is_pass());
    }

    #[test]
    fn test_backtrace_ignored_when_comparing_replays() {
        let recorded = Grade::exercise_error_with_backtrace("boom", Some("0: grader::on_tick".into()));
        let replayed = Grade::exercise_error_with_backtrace("boom", Some("0: other frame".into()));

        assert_ne!(recorded, replayed);
        assert_eq!(recorded.without_backtrace(), replayed.without_backtrace());
        assert_eq!(recorded.to_string(), "Fail: Exercise raised an error: boom");
        assert_eq!(timeout(2.0).without_backtrace(), timeout(2.0));

        let json = serde_json::to_value(Grade::exercise_error("boom")).unwrap();
        assert!(json["reason"].get("backtrace").is_none());
    }

    #[test]
    fn test_display_carries_payload() {
        assert_eq!(timeout(3.5).to_string(), "Fail: Timeout: Took longer than 3.5 seconds.");
        let survived = Grade::Pass(PassReason::SurvivedTimeout { max_duration_seconds: 10.0 });
        assert_eq!(survived.to_string(), "Pass: Timeout: Survived 10 seconds.");
    }

    #[test]
    fn test_serde_shape() {
        let json = serde_json::to_value(timeout(4.0)).unwrap();
        assert_eq!(json["outcome"], "fail");
        assert_eq!(json["reason"]["kind"], "timeout");
        assert_eq!(json["reason"]["max_duration_seconds"], 4.0);

        let back: Grade = serde_json::from_value(json).unwrap();
        assert_eq!(back, timeout(4.0));
    }
}
