//! Stand-in game sessions.
//!
//! [`KinematicSession`] is a tiny deterministic arena: constant-velocity
//! ball, bots that drive straight at the ball and knock it towards the
//! opposing goal, goal detection and score counters. It is enough for
//! smoke runs of real playlists without a game process.
//!
//! [`ReplaySession`] plays back a fixed list of snapshots and records what
//! the runner asked of it.

use async_trait::async_trait;
use drill_env::{
    BallSnapshot, BallState, CarState, DrawCommand, EnvError, MatchConfig, Participant,
    RenderSink, ScenarioSink, ScenarioState, Snapshot, SnapshotSource, Team, Touch,
};
use nalgebra::Vector3;
use std::collections::{BTreeMap, VecDeque};
use tracing::debug;

/// Half width of the goal mouth (unreal units)
pub const GOAL_HALF_WIDTH: f64 = 892.755;

/// Distance of the goal lines from the centre of the field
pub const GOAL_LINE_Y: f64 = 5120.0;

/// Ball rest height
const BALL_REST_Z: f64 = 92.75;

/// Car-to-ball distance at which a bot touches the ball
const TOUCH_DISTANCE: f64 = 150.0;

/// Bot driving speed
const CAR_SPEED: f64 = 1400.0;

/// Ball speed after a bot touch
const SHOT_SPEED: f64 = 2000.0;

/// Deterministic kinematic arena.
pub struct KinematicSession {
    /// Tick rate in Hz
    tick_rate_hz: u32,

    /// Total tick budget; the stream ends once it is used up
    max_ticks: Option<u64>,

    /// Ticks produced so far
    ticks: u64,

    /// Simulated game time
    seconds_elapsed: f64,

    /// Whether bots drive towards the ball
    bots_chase_ball: bool,

    match_config: Option<MatchConfig>,
    participants: Vec<Participant>,
    cars: BTreeMap<usize, CarState>,
    ball: BallState,
    latest_touch: Option<Touch>,

    /// Draw commands received over the session's lifetime
    draw_count: u64,
}

impl KinematicSession {
    /// Creates a session ticking at 120 Hz with no tick budget.
    pub fn new() -> Self {
        Self {
            tick_rate_hz: 120,
            max_ticks: None,
            ticks: 0,
            seconds_elapsed: 0.0,
            bots_chase_ball: true,
            match_config: None,
            participants: Vec::new(),
            cars: BTreeMap::new(),
            ball: resting_ball(),
            latest_touch: None,
            draw_count: 0,
        }
    }

    /// Sets the tick rate.
    pub fn with_tick_rate(mut self, hz: u32) -> Self {
        self.tick_rate_hz = hz.max(1);
        self
    }

    /// Ends the snapshot stream after this many ticks.
    pub fn with_max_ticks(mut self, ticks: u64) -> Self {
        self.max_ticks = Some(ticks);
        self
    }

    /// Makes bots keep their scenario velocity instead of chasing the ball.
    pub fn with_passive_bots(mut self) -> Self {
        self.bots_chase_ball = false;
        self
    }

    /// Ticks produced so far.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    /// Draw commands received so far.
    pub fn draw_count(&self) -> u64 {
        self.draw_count
    }

    /// Current match config, if a match was started.
    pub fn match_config(&self) -> Option<&MatchConfig> {
        self.match_config.as_ref()
    }

    fn dt(&self) -> f64 {
        1.0 / self.tick_rate_hz as f64
    }

    /// Advances the arena by one tick.
    fn step(&mut self) {
        let dt = self.dt();
        self.seconds_elapsed += dt;

        for (index, car) in self.cars.iter_mut() {
            if self.bots_chase_ball {
                let mut to_ball = self.ball.position - car.position;
                to_ball.z = 0.0;
                car.velocity = match to_ball.try_normalize(1e-9) {
                    Some(direction) => direction * CAR_SPEED,
                    None => Vector3::zeros(),
                };
            }
            car.position += car.velocity * dt;

            let within_reach = (self.ball.position - car.position).xy().norm() < TOUCH_DISTANCE;
            if within_reach {
                if let Some(team) = self.participants.iter().find(|p| p.index == *index).map(|p| p.team) {
                    let target = Vector3::new(0.0, GOAL_LINE_Y * team.away_from_own_goal(), self.ball.position.z);
                    if let Some(direction) = (target - self.ball.position).try_normalize(1e-9) {
                        self.ball.velocity = direction * SHOT_SPEED;
                    }
                    self.latest_touch = Some(Touch {
                        participant_index: *index,
                        seconds_elapsed: self.seconds_elapsed,
                    });
                }
            }
        }

        self.ball.position += self.ball.velocity * dt;
        self.check_goal();
    }

    /// Credits a goal if the ball crossed a goal line inside the mouth.
    fn check_goal(&mut self) {
        let position = self.ball.position;
        if position.x.abs() >= GOAL_HALF_WIDTH || position.y.abs() <= GOAL_LINE_Y {
            return;
        }
        // Ball inside the orange goal counts for blue and vice versa.
        let scoring_team = if position.y > 0.0 { Team::Blue } else { Team::Orange };

        let toucher = self
            .latest_touch
            .and_then(|touch| self.participants.iter().position(|p| p.index == touch.participant_index));
        let scorer = toucher
            .filter(|&i| self.participants[i].team == scoring_team)
            .or_else(|| self.participants.iter().position(|p| p.team == scoring_team));

        match scorer {
            Some(i) => {
                let counters = &mut self.participants[i].counters;
                counters.goals += 1;
                counters.score += 100;
                debug!("Goal for {} by {}", scoring_team, self.participants[i].name);
            }
            None => {
                let own = toucher.or_else(|| {
                    self.participants
                        .iter()
                        .position(|p| p.team == scoring_team.opponent())
                });
                if let Some(i) = own {
                    self.participants[i].counters.own_goals += 1;
                    debug!("Own goal by {}", self.participants[i].name);
                }
            }
        }

        self.ball = resting_ball();
        self.latest_touch = None;
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            seconds_elapsed: self.seconds_elapsed,
            participants: self.participants.clone(),
            ball: BallSnapshot {
                position: self.ball.position,
                velocity: self.ball.velocity,
                latest_touch: self.latest_touch,
            },
        }
    }
}

impl Default for KinematicSession {
    fn default() -> Self {
        Self::new()
    }
}

fn resting_ball() -> BallState {
    BallState {
        position: Vector3::new(0.0, 0.0, BALL_REST_Z),
        ..Default::default()
    }
}

#[async_trait]
impl SnapshotSource for KinematicSession {
    async fn next_snapshot(&mut self) -> Option<Snapshot> {
        if self.max_ticks.is_some_and(|max| self.ticks >= max) {
            return None;
        }
        // Gives cancellation (e.g. Ctrl-C) a chance between ticks.
        tokio::task::yield_now().await;

        self.step();
        self.ticks += 1;
        Some(self.snapshot())
    }
}

#[async_trait]
impl ScenarioSink for KinematicSession {
    async fn ensure_match(&mut self, config: &MatchConfig) -> Result<(), EnvError> {
        if self.match_config.as_ref() == Some(config) {
            return Ok(());
        }
        if config.players.is_empty() {
            return Err(EnvError::MatchSetup("match has no players".to_string()));
        }

        debug!("Starting match on {} with {} players", config.game_map, config.players.len());
        self.participants = config
            .players
            .iter()
            .enumerate()
            .map(|(index, player)| Participant::new(index, player.name.clone(), player.team))
            .collect();
        self.cars.clear();
        self.ball = resting_ball();
        self.latest_touch = None;
        self.match_config = Some(config.clone());
        Ok(())
    }

    async fn apply_scenario(&mut self, state: ScenarioState) -> Result<(), EnvError> {
        for index in state.cars.keys() {
            if !self.participants.iter().any(|p| p.index == *index) {
                return Err(EnvError::rejected(format!("no car with index {}", index)));
            }
        }
        self.ball = state.ball;
        self.cars.extend(state.cars);
        self.latest_touch = None;
        Ok(())
    }
}

impl RenderSink for KinematicSession {
    fn draw(&mut self, _command: DrawCommand) -> Result<(), EnvError> {
        self.draw_count += 1;
        Ok(())
    }
}

/// Plays back a fixed snapshot list.
#[derive(Debug, Default)]
pub struct ReplaySession {
    snapshots: VecDeque<Snapshot>,

    /// Scenario states handed over by the runner, in order
    pub applied: Vec<ScenarioState>,

    /// Match configs requested by the runner, in order
    pub matches: Vec<MatchConfig>,

    /// Commands drawn, grouped per frame
    pub renderer: RecordingRenderer,
}

impl ReplaySession {
    pub fn new(snapshots: impl IntoIterator<Item = Snapshot>) -> Self {
        Self {
            snapshots: snapshots.into_iter().collect(),
            ..Default::default()
        }
    }

    /// Makes every draw call fail.
    pub fn with_failing_renderer(mut self) -> Self {
        self.renderer.fail = true;
        self
    }

    /// Snapshots not yet consumed.
    pub fn remaining(&self) -> usize {
        self.snapshots.len()
    }
}

#[async_trait]
impl SnapshotSource for ReplaySession {
    async fn next_snapshot(&mut self) -> Option<Snapshot> {
        self.snapshots.pop_front()
    }
}

#[async_trait]
impl ScenarioSink for ReplaySession {
    async fn ensure_match(&mut self, config: &MatchConfig) -> Result<(), EnvError> {
        self.matches.push(config.clone());
        Ok(())
    }

    async fn apply_scenario(&mut self, state: ScenarioState) -> Result<(), EnvError> {
        self.applied.push(state);
        Ok(())
    }
}

impl RenderSink for ReplaySession {
    fn draw(&mut self, command: DrawCommand) -> Result<(), EnvError> {
        self.renderer.draw(command)
    }

    fn finish_frame(&mut self) -> Result<(), EnvError> {
        self.renderer.finish_frame()
    }
}

/// Render sink that keeps everything it is given.
#[derive(Debug, Default)]
pub struct RecordingRenderer {
    /// Commands of the frame being built
    pub pending: Vec<DrawCommand>,

    /// Completed frames
    pub frames: Vec<Vec<DrawCommand>>,

    /// When set, every call fails
    pub fail: bool,
}

impl RenderSink for RecordingRenderer {
    fn draw(&mut self, command: DrawCommand) -> Result<(), EnvError> {
        if self.fail {
            return Err(EnvError::render("renderer unavailable"));
        }
        self.pending.push(command);
        Ok(())
    }

    fn finish_frame(&mut self) -> Result<(), EnvError> {
        if self.fail {
            return Err(EnvError::render("renderer unavailable"));
        }
        self.frames.push(std::mem::take(&mut self.pending));
        Ok(())
    }
}
