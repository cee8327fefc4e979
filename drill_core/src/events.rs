//! Discrete player events derived from monotonic score counters.
//!
//! The game only reports running totals (goals, saves, ...). Graders want
//! to react to "a goal happened this tick", so the [`EventDetector`] diffs
//! each snapshot against the previous one and emits one event per counter
//! that went up.

use drill_env::{Participant, ScoreCounters, Snapshot};
use serde::{Deserialize, Serialize};

/// Kind of counter that changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PlayerEventKind {
    Score,
    Goal,
    OwnGoal,
    Assist,
    Save,
    Shot,
    Demolition,
}

impl PlayerEventKind {
    /// All kinds, in the order they are compared.
    pub const ALL: [PlayerEventKind; 7] = [
        PlayerEventKind::Score,
        PlayerEventKind::Goal,
        PlayerEventKind::OwnGoal,
        PlayerEventKind::Assist,
        PlayerEventKind::Save,
        PlayerEventKind::Shot,
        PlayerEventKind::Demolition,
    ];

    /// Reads the counter this kind tracks.
    pub fn counter(self, counters: &ScoreCounters) -> u32 {
        match self {
            PlayerEventKind::Score => counters.score,
            PlayerEventKind::Goal => counters.goals,
            PlayerEventKind::OwnGoal => counters.own_goals,
            PlayerEventKind::Assist => counters.assists,
            PlayerEventKind::Save => counters.saves,
            PlayerEventKind::Shot => counters.shots,
            PlayerEventKind::Demolition => counters.demolitions,
        }
    }
}

/// Something that happened to a participant during one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerEvent {
    pub kind: PlayerEventKind,

    /// The participant as reported in the snapshot that revealed the event
    pub participant: Participant,

    /// Simulated time of that snapshot
    pub seconds_elapsed: f64,
}

/// Turns successive snapshots into once-only events.
///
/// One detector belongs to one exercise run. The stored baseline is an
/// owned copy that is replaced on every call.
#[derive(Debug, Default)]
pub struct EventDetector {
    previous: Option<Snapshot>,
}

impl EventDetector {
    /// Creates a detector with no baseline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the events that happened since the previous call.
    ///
    /// The first call only records a baseline and returns nothing.
    /// Counters that went down (e.g. the game was reset underneath us)
    /// are a discontinuity and produce no event.
    pub fn detect(&mut self, snapshot: &Snapshot) -> Vec<PlayerEvent> {
        let mut events = Vec::new();

        if let Some(previous) = &self.previous {
            for (player, prev_player) in snapshot.participants.iter().zip(&previous.participants) {
                for kind in PlayerEventKind::ALL {
                    if kind.counter(&player.counters) > kind.counter(&prev_player.counters) {
                        events.push(PlayerEvent {
                            kind,
                            participant: player.clone(),
                            seconds_elapsed: snapshot.seconds_elapsed,
                        });
                    }
                }
            }
        }

        self.previous = Some(snapshot.clone());
        events
    }

    /// Whether a baseline has been recorded yet.
    pub fn has_baseline(&self) -> bool {
        self.previous.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use drill_env::Team;

    fn snapshot_with(seconds: f64, counters: ScoreCounters) -> Snapshot {
        Snapshot::new(seconds)
            .with_participant(Participant::new(0, "striker", Team::Blue).with_counters(counters))
    }

    fn goals(n: u32) -> ScoreCounters {
        ScoreCounters { goals: n, ..Default::default() }
    }

    #[test]
    fn test_first_call_is_baseline_only() {
        let mut detector = EventDetector::new();
        let loaded = snapshot_with(
            1.0,
            ScoreCounters { score: 500, goals: 4, saves: 2, ..Default::default() },
        );

        assert!(detector.detect(&loaded).is_empty());
        assert!(detector.has_baseline());
    }

    #[test]
    fn test_goal_sequence_with_duplicates() {
        let mut detector = EventDetector::new();

        assert!(detector.detect(&snapshot_with(14.0, goals(3))).is_empty());
        assert!(detector.detect(&snapshot_with(14.0, goals(3))).is_empty());

        let five = snapshot_with(15.0, goals(5));
        let events = detector.detect(&five);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, PlayerEventKind::Goal);
        assert_eq!(events[0].seconds_elapsed, 15.0);

        assert!(detector.detect(&five).is_empty());
    }

    #[test]
    fn test_one_event_per_increased_counter() {
        let mut detector = EventDetector::new();
        detector.detect(&snapshot_with(1.0, ScoreCounters::default()));

        let events = detector.detect(&snapshot_with(
            2.0,
            ScoreCounters { score: 100, goals: 1, shots: 1, ..Default::default() },
        ));

        let kinds: Vec<_> = events.iter().map(|e| e.kind).collect();
        assert_eq!(
            kinds,
            vec![PlayerEventKind::Score, PlayerEventKind::Goal, PlayerEventKind::Shot]
        );
    }

    #[test]
    fn test_decrease_is_ignored_but_others_compared() {
        let mut detector = EventDetector::new();
        detector.detect(&snapshot_with(
            1.0,
            ScoreCounters { score: 300, saves: 1, ..Default::default() },
        ));

        let events = detector.detect(&snapshot_with(
            2.0,
            ScoreCounters { score: 0, saves: 2, ..Default::default() },
        ));

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].kind, PlayerEventKind::Save);
    }

    #[test]
    fn test_event_references_current_participant() {
        let mut detector = EventDetector::new();
        detector.detect(&snapshot_with(1.0, goals(0)));

        let mut current = snapshot_with(2.0, goals(1));
        current.participants[0].name = "renamed".to_string();

        let events = detector.detect(&current);
        assert_eq!(events[0].participant.name, "renamed");
        assert_eq!(events[0].participant.counters.goals, 1);
    }

    #[test]
    fn test_baseline_is_an_owned_copy() {
        let mut detector = EventDetector::new();
        let mut snapshot = snapshot_with(1.0, goals(0));
        detector.detect(&snapshot);

        // Mutating the caller's value must not move the baseline.
        snapshot.participants[0].counters.goals = 1;
        snapshot.seconds_elapsed = 2.0;
        assert_eq!(detector.detect(&snapshot).len(), 1);
    }

    #[test]
    fn test_new_participant_has_no_baseline() {
        let mut detector = EventDetector::new();
        detector.detect(&snapshot_with(1.0, goals(0)));

        let joined = snapshot_with(2.0, goals(0))
            .with_participant(Participant::new(1, "late", Team::Orange).with_counters(goals(2)));
        assert!(detector.detect(&joined).is_empty());
    }
}
