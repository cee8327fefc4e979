//! Common types crossing the boundary between Drill and a game session.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Unique identifier for a single exercise execution.
///
/// Uses UUID v4 so that results from independent runs never share a name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Creates a new random RunId.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a RunId from a UUID.
    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Returns the inner UUID.
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// The two sides of a match.
///
/// Blue defends the goal on the negative y side of the field,
/// Orange the one on the positive y side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Team {
    #[default]
    Blue,
    Orange,
}

impl Team {
    /// Team index as reported by the game (0 = blue, 1 = orange).
    pub fn index(self) -> u8 {
        match self {
            Team::Blue => 0,
            Team::Orange => 1,
        }
    }

    /// Inverse of [`Team::index`].
    pub fn from_index(index: u8) -> Option<Team> {
        match index {
            0 => Some(Team::Blue),
            1 => Some(Team::Orange),
            _ => None,
        }
    }

    /// Returns the other team.
    pub fn opponent(self) -> Team {
        match self {
            Team::Blue => Team::Orange,
            Team::Orange => Team::Blue,
        }
    }

    /// Sign of the y axis pointing away from this team's own goal.
    pub fn away_from_own_goal(self) -> f64 {
        match self {
            Team::Blue => 1.0,
            Team::Orange => -1.0,
        }
    }
}

impl std::fmt::Display for Team {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Team::Blue => write!(f, "blue"),
            Team::Orange => write!(f, "orange"),
        }
    }
}

/// Monotonic per-participant statistics maintained by the game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScoreCounters {
    pub score: u32,
    pub goals: u32,
    pub own_goals: u32,
    pub assists: u32,
    pub saves: u32,
    pub shots: u32,
    pub demolitions: u32,
}

/// One car/player as seen in a snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Participant {
    /// Position of this participant in the session's player list
    pub index: usize,

    /// Display name
    pub name: String,

    /// Team assignment
    pub team: Team,

    /// Score counters at the time of the snapshot
    pub counters: ScoreCounters,
}

impl Participant {
    /// Creates a participant with zeroed counters.
    pub fn new(index: usize, name: impl Into<String>, team: Team) -> Self {
        Self {
            index,
            name: name.into(),
            team,
            counters: ScoreCounters::default(),
        }
    }

    /// Replaces the counters.
    pub fn with_counters(mut self, counters: ScoreCounters) -> Self {
        self.counters = counters;
        self
    }
}

/// The most recent ball touch reported by the game.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Touch {
    pub participant_index: usize,
    pub seconds_elapsed: f64,
}

/// Ball kinematics at the time of a snapshot.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BallSnapshot {
    /// Position in unreal units
    pub position: Vector3<f64>,

    /// Velocity in unreal units per second
    pub velocity: Vector3<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub latest_touch: Option<Touch>,
}

/// Per-tick state of the live session.
///
/// Produced by a [`crate::SnapshotSource`]; Drill only ever reads it.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Snapshot {
    /// Simulated game time in seconds (not wall-clock)
    pub seconds_elapsed: f64,

    /// All cars in the match, ordered by index
    pub participants: Vec<Participant>,

    /// Ball kinematics
    pub ball: BallSnapshot,
}

impl Snapshot {
    /// Creates an empty snapshot at the given simulated time.
    pub fn new(seconds_elapsed: f64) -> Self {
        Self {
            seconds_elapsed,
            ..Default::default()
        }
    }

    /// Adds a participant.
    pub fn with_participant(mut self, participant: Participant) -> Self {
        self.participants.push(participant);
        self
    }

    /// Sets the ball velocity.
    pub fn with_ball_velocity(mut self, velocity: Vector3<f64>) -> Self {
        self.ball.velocity = velocity;
        self
    }

    /// Sets the ball position.
    pub fn with_ball_position(mut self, position: Vector3<f64>) -> Self {
        self.ball.position = position;
        self
    }

    /// Looks up a participant by index.
    pub fn participant(&self, index: usize) -> Option<&Participant> {
        self.participants.iter().find(|p| p.index == index)
    }
}

/// Desired ball state when setting up an exercise.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BallState {
    pub position: Vector3<f64>,
    #[serde(default)]
    pub velocity: Vector3<f64>,
    #[serde(default)]
    pub angular_velocity: Vector3<f64>,
}

/// Desired car state when setting up an exercise.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CarState {
    pub position: Vector3<f64>,
    #[serde(default)]
    pub velocity: Vector3<f64>,
    #[serde(default)]
    pub angular_velocity: Vector3<f64>,
    /// Heading around the vertical axis, radians
    #[serde(default)]
    pub yaw: f64,
    #[serde(default)]
    pub boost_amount: f32,
    #[serde(default)]
    pub jumped: bool,
    #[serde(default)]
    pub double_jumped: bool,
}

/// The initial state an exercise asks the session to apply.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScenarioState {
    pub ball: BallState,

    /// Cars keyed by participant index; cars not listed keep their state
    #[serde(default)]
    pub cars: BTreeMap<usize, CarState>,

    /// Boost pad fill level applied to every pad, if set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub boost_pads: Option<f32>,
}

/// How a seat in the match is controlled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerKind {
    #[default]
    Bot,
    Human,
}

/// One seat in the match.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PlayerConfig {
    pub name: String,
    #[serde(default)]
    pub team: Team,
    #[serde(default)]
    pub kind: PlayerKind,
    /// Bot configuration file, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_path: Option<String>,
}

impl PlayerConfig {
    /// A bot seat.
    pub fn bot(name: impl Into<String>, team: Team) -> Self {
        Self {
            name: name.into(),
            team,
            kind: PlayerKind::Bot,
            config_path: None,
        }
    }
}

/// The match an exercise should be played in.
///
/// Opaque to grading; the session decides what a change means
/// (typically restarting the match).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MatchConfig {
    #[serde(default = "default_game_map")]
    pub game_map: String,
    #[serde(default = "default_game_mode")]
    pub game_mode: String,
    #[serde(default = "default_players")]
    pub players: Vec<PlayerConfig>,
    #[serde(default)]
    pub mutators: BTreeMap<String, String>,
}

fn default_game_map() -> String {
    "Mannfield".to_string()
}

fn default_game_mode() -> String {
    "soccer".to_string()
}

fn default_players() -> Vec<PlayerConfig> {
    vec![PlayerConfig::bot("simple_bot", Team::Blue)]
}

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            game_map: default_game_map(),
            game_mode: default_game_mode(),
            players: default_players(),
            mutators: BTreeMap::new(),
        }
    }
}

/// RGBA colour for debug drawing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl Color {
    pub const WHITE: Color = Color { r: 255, g: 255, b: 255, a: 255 };
    pub const RED: Color = Color { r: 255, g: 0, b: 0, a: 255 };
    pub const GREEN: Color = Color { r: 0, g: 255, b: 0, a: 255 };
    pub const YELLOW: Color = Color { r: 255, g: 255, b: 0, a: 255 };
}

/// A best-effort debug drawing request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DrawCommand {
    Line {
        from: Vector3<f64>,
        to: Vector3<f64>,
        color: Color,
    },
    Text {
        at: Vector3<f64>,
        text: String,
        color: Color,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_id_roundtrip_display() {
        let id = RunId::new();
        let parsed: RunId = id.to_string().parse().unwrap();
        assert_eq!(id, parsed);
    }

    #[test]
    fn test_run_ids_are_unique() {
        assert_ne!(RunId::new(), RunId::new());
    }

    #[test]
    fn test_team_directions() {
        assert_eq!(Team::Blue.away_from_own_goal(), 1.0);
        assert_eq!(Team::Orange.away_from_own_goal(), -1.0);
        assert_eq!(Team::Blue.opponent(), Team::Orange);
        assert_eq!(Team::from_index(1), Some(Team::Orange));
        assert_eq!(Team::from_index(7), None);
    }

    #[test]
    fn test_snapshot_participant_lookup() {
        let snapshot = Snapshot::new(3.0)
            .with_participant(Participant::new(0, "a", Team::Blue))
            .with_participant(Participant::new(1, "b", Team::Orange));

        assert_eq!(snapshot.participant(1).map(|p| p.team), Some(Team::Orange));
        assert!(snapshot.participant(2).is_none());
    }

    #[test]
    fn test_match_config_defaults() {
        let config = MatchConfig::default();
        assert_eq!(config.players.len(), 1);
        assert_eq!(config.players[0].team, Team::Blue);
    }
}
