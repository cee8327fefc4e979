//! Graders that judge goals and saves, plus the standard striker/goalie
//! combinations built from them.

use crate::compound::CompoundGrader;
use crate::events::PlayerEventKind;
use crate::grade::{FailReason, Grade, PassReason};
use crate::grader::{Grader, Renderer, TrainingTick};
use crate::timeout::{FailOnBallOnGroundAfterTimeout, FailOnTimeout, PassOnTimeout};
use drill_env::{Color, Team};
use serde_json::{json, Value};

/// Terminates the exercise when any goal is scored.
///
/// Passes iff the goal counts for `ally_team` (a goal by an ally, or an own
/// goal by an opponent); any other goal fails with [`FailReason::WrongGoal`].
#[derive(Debug, Clone)]
pub struct PassOnGoalForAllyTeam {
    ally_team: Team,
}

impl PassOnGoalForAllyTeam {
    pub fn new(ally_team: Team) -> Self {
        Self { ally_team }
    }
}

impl Grader for PassOnGoalForAllyTeam {
    fn on_tick(&mut self, tick: &TrainingTick<'_>) -> Grade {
        for event in tick.events {
            let by_ally = event.participant.team == self.ally_team;
            match (event.kind, by_ally) {
                (PlayerEventKind::Goal, true) | (PlayerEventKind::OwnGoal, false) => {
                    return Grade::Pass(PassReason::GoalForAllyTeam);
                }
                (PlayerEventKind::Goal, false) | (PlayerEventKind::OwnGoal, true) => {
                    return Grade::Fail(FailReason::WrongGoal);
                }
                _ => {}
            }
        }
        Grade::Continue
    }

    fn name(&self) -> &'static str {
        "PassOnGoalForAllyTeam"
    }
}

/// Passes once the ball has moved away from the ally goal for a number of
/// consecutive ticks. Never fails.
///
/// The debounce keeps two near-simultaneous touches from reading as a save.
#[derive(Debug, Clone)]
pub struct PassOnBallGoingAwayFromGoal {
    ally_team: Team,
    required_consecutive_ticks: u32,
    consecutive_good_ticks: u32,
}

impl PassOnBallGoingAwayFromGoal {
    /// Default debounce window.
    pub const REQUIRED_CONSECUTIVE_TICKS: u32 = 20;

    pub fn new(ally_team: Team) -> Self {
        Self::with_required_ticks(ally_team, Self::REQUIRED_CONSECUTIVE_TICKS)
    }

    pub fn with_required_ticks(ally_team: Team, required_consecutive_ticks: u32) -> Self {
        Self {
            ally_team,
            required_consecutive_ticks,
            consecutive_good_ticks: 0,
        }
    }

    pub fn consecutive_good_ticks(&self) -> u32 {
        self.consecutive_good_ticks
    }
}

impl Grader for PassOnBallGoingAwayFromGoal {
    fn on_tick(&mut self, tick: &TrainingTick<'_>) -> Grade {
        let away = tick.snapshot.ball.velocity.y * self.ally_team.away_from_own_goal();
        if away > 0.0 {
            self.consecutive_good_ticks += 1;
        } else {
            self.consecutive_good_ticks = 0;
        }

        if self.consecutive_good_ticks >= self.required_consecutive_ticks {
            Grade::Pass(PassReason::BallGoingAwayFromGoal {
                consecutive_ticks: self.consecutive_good_ticks,
            })
        } else {
            Grade::Continue
        }
    }

    fn render(&self, renderer: &mut Renderer<'_>) {
        if self.consecutive_good_ticks > 0 {
            renderer.text(
                nalgebra::Vector3::new(0.0, 0.0, 400.0),
                format!(
                    "clearing {}/{}",
                    self.consecutive_good_ticks, self.required_consecutive_ticks
                ),
                Color::GREEN,
            );
        }
    }

    fn metric(&self) -> Option<Value> {
        Some(json!({
            "required_consecutive_ticks": self.required_consecutive_ticks,
            "consecutive_good_ticks": self.consecutive_good_ticks,
        }))
    }

    fn name(&self) -> &'static str {
        "PassOnBallGoingAwayFromGoal"
    }
}

/// Behaves like the in-game striker training: score before the timeout.
pub fn striker_grader(timeout_seconds: f64, ally_team: Team) -> CompoundGrader {
    CompoundGrader::new(vec![])
        .with("striker goal", Box::new(PassOnGoalForAllyTeam::new(ally_team)))
        .with("timeout", Box::new(FailOnTimeout::new(timeout_seconds)))
}

/// Behaves like the in-game goalie training: clear the ball, or at least
/// don't concede before the timeout.
pub fn goalie_grader(timeout_seconds: f64, ally_team: Team, required_ticks: u32) -> CompoundGrader {
    CompoundGrader::new(vec![])
        .with(
            "ball going away",
            Box::new(PassOnBallGoingAwayFromGoal::with_required_ticks(ally_team, required_ticks)),
        )
        .with("goal", Box::new(PassOnGoalForAllyTeam::new(ally_team)))
        .with("timeout", Box::new(PassOnTimeout::new(timeout_seconds)))
}

/// Striker grading that lets an airborne shot land before timing out.
pub fn rl_striker_grader(timeout_seconds: f64, ally_team: Team) -> CompoundGrader {
    CompoundGrader::new(vec![])
        .with("striker goal", Box::new(PassOnGoalForAllyTeam::new(ally_team)))
        .with("ground timeout", Box::new(FailOnBallOnGroundAfterTimeout::new(timeout_seconds)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::PlayerEvent;
    use drill_env::{Participant, Snapshot};
    use nalgebra::Vector3;

    fn event(kind: PlayerEventKind, team: Team) -> PlayerEvent {
        PlayerEvent {
            kind,
            participant: Participant::new(0, "p", team),
            seconds_elapsed: 1.0,
        }
    }

    fn grade_events(grader: &mut PassOnGoalForAllyTeam, events: &[PlayerEvent]) -> Grade {
        let snapshot = Snapshot::new(1.0);
        grader.on_tick(&TrainingTick::new(&snapshot, events))
    }

    #[test]
    fn test_goal_outcomes() {
        let mut grader = PassOnGoalForAllyTeam::new(Team::Blue);

        let pass = Grade::Pass(PassReason::GoalForAllyTeam);
        let wrong = Grade::Fail(FailReason::WrongGoal);

        assert_eq!(grade_events(&mut grader, &[event(PlayerEventKind::Goal, Team::Blue)]), pass);
        assert_eq!(grade_events(&mut grader, &[event(PlayerEventKind::OwnGoal, Team::Orange)]), pass);
        assert_eq!(grade_events(&mut grader, &[event(PlayerEventKind::Goal, Team::Orange)]), wrong);
        assert_eq!(grade_events(&mut grader, &[event(PlayerEventKind::OwnGoal, Team::Blue)]), wrong);
    }

    #[test]
    fn test_non_goal_events_continue() {
        let mut grader = PassOnGoalForAllyTeam::new(Team::Blue);
        let events = [
            event(PlayerEventKind::Score, Team::Orange),
            event(PlayerEventKind::Shot, Team::Orange),
        ];
        assert_eq!(grade_events(&mut grader, &events), Grade::Continue);
        assert_eq!(grade_events(&mut grader, &[]), Grade::Continue);
    }

    fn away_tick(grader: &mut PassOnBallGoingAwayFromGoal, vy: f64) -> Grade {
        let snapshot = Snapshot::new(0.0).with_ball_velocity(Vector3::new(0.0, vy, 0.0));
        grader.on_tick(&TrainingTick::new(&snapshot, &[]))
    }

    #[test]
    fn test_ball_away_needs_twenty_ticks() {
        let mut grader = PassOnBallGoingAwayFromGoal::new(Team::Blue);
        for _ in 0..19 {
            assert_eq!(away_tick(&mut grader, 500.0), Grade::Continue);
        }
        assert_eq!(
            away_tick(&mut grader, 500.0),
            Grade::Pass(PassReason::BallGoingAwayFromGoal { consecutive_ticks: 20 })
        );
    }

    #[test]
    fn test_ball_away_reset_at_nineteen() {
        let mut grader = PassOnBallGoingAwayFromGoal::new(Team::Blue);
        for _ in 0..18 {
            away_tick(&mut grader, 500.0);
        }
        // 19th tick disqualifies
        assert_eq!(away_tick(&mut grader, -10.0), Grade::Continue);
        assert_eq!(grader.consecutive_good_ticks(), 0);

        for _ in 0..19 {
            assert_eq!(away_tick(&mut grader, 500.0), Grade::Continue);
        }
        assert!(away_tick(&mut grader, 500.0).is_pass());
    }

    #[test]
    fn test_ball_away_direction_depends_on_team() {
        let mut orange = PassOnBallGoingAwayFromGoal::with_required_ticks(Team::Orange, 1);
        assert_eq!(away_tick(&mut orange, 500.0), Grade::Continue);
        assert!(away_tick(&mut orange, -500.0).is_pass());
    }

    #[test]
    fn test_ball_away_never_fails() {
        let mut grader = PassOnBallGoingAwayFromGoal::with_required_ticks(Team::Blue, 3);
        for _ in 0..100 {
            assert!(!away_tick(&mut grader, -2000.0).is_fail());
        }
    }

    #[test]
    fn test_striker_grader_times_out() {
        let mut grader = striker_grader(4.0, Team::Blue);
        let start = Snapshot::new(10.0);
        let late = Snapshot::new(14.5);
        assert_eq!(grader.on_tick(&TrainingTick::new(&start, &[])), Grade::Continue);
        assert_eq!(
            grader.on_tick(&TrainingTick::new(&late, &[])),
            Grade::Fail(FailReason::Timeout { max_duration_seconds: 4.0 })
        );
    }

    #[test]
    fn test_goal_on_timeout_tick_still_fails_striker() {
        // Fail outranks Pass even when both happen in the same tick.
        let mut grader = striker_grader(1.0, Team::Blue);
        let start = Snapshot::new(0.0);
        grader.on_tick(&TrainingTick::new(&start, &[]));

        let late = Snapshot::new(2.0);
        let goal = [event(PlayerEventKind::Goal, Team::Blue)];
        assert!(grader.on_tick(&TrainingTick::new(&late, &goal)).is_fail());
    }

    #[test]
    fn test_goalie_grader_survives() {
        let mut grader = goalie_grader(1.0, Team::Blue, 20);
        let start = Snapshot::new(0.0);
        grader.on_tick(&TrainingTick::new(&start, &[]));
        let later = Snapshot::new(1.5);
        assert_eq!(
            grader.on_tick(&TrainingTick::new(&later, &[])),
            Grade::Pass(PassReason::SurvivedTimeout { max_duration_seconds: 1.0 })
        );
    }
}
