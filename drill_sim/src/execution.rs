//! The playlist execution loop.
//!
//! Runs every exercise of a playlist, pass after pass, and picks up edits
//! to the playlist source between exercises:
//!
//! ```text
//! load (retry until it works)
//! loop {
//!     seed = 4 on the first pass, wall-clock millis afterwards
//!     for exercise in playlist {
//!         run -> record result
//!         reload:
//!             error          -> keep the current playlist
//!             same names     -> copy new parameters into the live slots,
//!                               pick up the source's tunables
//!             names differ   -> replace the playlist, restart the pass
//!     }
//! }
//! ```
//!
//! The loop only ends on its own when `max_passes` is set; otherwise the
//! caller cancels it by dropping the future. An exercise interrupted that
//! way records nothing.

use crate::config::{HarnessConfig, ReloadPolicy};
use crate::exercise::{Exercise, UpdateError};
use crate::history::{HistoryError, ResultSink};
use crate::playlist::Playlist;
use crate::result::{ExerciseResult, ReproductionInfo};
use crate::runner::{ExerciseRunner, RunError};
use crate::source::PlaylistSource;
use drill_core::GradingTunables;
use drill_env::{Clock, GameSession, SystemClock};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors that stop the loop.
#[derive(Debug, Error)]
pub enum LoopError {
    #[error("Exercise run failed: {0}")]
    Run(#[from] RunError),

    #[error("History error: {0}")]
    History(#[from] HistoryError),

    #[error("Playlist update failed: {0}")]
    Update(#[from] UpdateError),
}

/// What a reload did to the running playlist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadOutcome {
    /// Reloading is disabled
    Skipped,

    /// The source failed; the current playlist stays
    KeptStale,

    /// Same exercises; this many slots got new parameters
    Updated(usize),

    /// Exercises were added, removed, renamed or reordered
    Restarted,
}

/// Counters describing a finished (or cancelled) loop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopReport {
    /// Passes started
    pub passes: u64,

    /// Results recorded
    pub results: u64,

    /// Passes cut short by a shape change
    pub restarts: u64,

    /// Reload attempts that failed
    pub reload_failures: u64,
}

/// Seeds for successive passes.
struct SeedSequence {
    first: Option<u64>,
}

impl SeedSequence {
    fn new(first: u64) -> Self {
        Self { first: Some(first) }
    }

    fn next(&mut self, clock: &dyn Clock) -> u64 {
        self.first.take().unwrap_or_else(|| clock.epoch_millis())
    }
}

enum PassOutcome {
    Completed,
    Restarted,
}

/// Runs a playlist indefinitely against one session.
pub struct PlaylistExecutionLoop<S: GameSession, R: ResultSink> {
    source: Box<dyn PlaylistSource>,
    session: S,
    sink: R,
    clock: Arc<dyn Clock>,
    runner: ExerciseRunner,
    config: HarnessConfig,
    seeds: SeedSequence,

    /// Live playlist; kept across passes so slot identity survives
    playlist: Option<Playlist>,

    report: LoopReport,
}

impl<S: GameSession, R: ResultSink> PlaylistExecutionLoop<S, R> {
    /// Creates a loop using the system clock.
    pub fn new(source: Box<dyn PlaylistSource>, session: S, sink: R, config: HarnessConfig) -> Self {
        let mut runner = ExerciseRunner::new().with_tunables(config.tunables.clone());
        if let Some(max_ticks) = config.max_ticks_per_exercise {
            runner = runner.with_max_ticks(max_ticks);
        }
        Self {
            source,
            session,
            sink,
            clock: SystemClock::shared(),
            runner,
            seeds: SeedSequence::new(config.first_seed),
            config,
            playlist: None,
            report: LoopReport::default(),
        }
    }

    /// Replaces the clock.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn sink(&self) -> &R {
        &self.sink
    }

    /// The live playlist, once loaded.
    pub fn playlist(&self) -> Option<&Playlist> {
        self.playlist.as_ref()
    }

    pub fn report(&self) -> LoopReport {
        self.report
    }

    /// Runs until `max_passes` is reached, or forever.
    pub async fn run(&mut self) -> Result<LoopReport, LoopError> {
        if self.playlist.is_none() {
            let exercises = self.initial_load().await;
            info!("📋 Loaded {} exercises from {}", exercises.len(), self.source.locator());
            self.playlist = Some(Playlist::new(exercises));
            self.refresh_tunables();
        }

        loop {
            if self.config.max_passes.is_some_and(|max| self.report.passes >= max) {
                return Ok(self.report);
            }

            let seed = self.seeds.next(self.clock.as_ref());
            self.report.passes += 1;
            info!("▶️ Pass {} (seed={})", self.report.passes, seed);

            if let PassOutcome::Restarted = self.run_pass(seed).await? {
                self.report.restarts += 1;
            }
        }
    }

    /// Loads the playlist, retrying until the source succeeds.
    async fn initial_load(&mut self) -> Vec<Exercise> {
        loop {
            match self.source.load() {
                Ok(exercises) => return exercises,
                Err(e) => {
                    warn!(
                        "⚠️ Could not load playlist from {}: {} (retrying in {:?})",
                        self.source.locator(),
                        e,
                        self.config.reload_retry_interval
                    );
                    self.clock.sleep(self.config.reload_retry_interval).await;
                }
            }
        }
    }

    async fn run_pass(&mut self, seed: u64) -> Result<PassOutcome, LoopError> {
        let mut index = 0;
        loop {
            let exercise = match &self.playlist {
                Some(playlist) => playlist.exercise(index).await,
                None => None,
            };
            let Some(exercise) = exercise else {
                return Ok(PassOutcome::Completed);
            };

            let reproduction_info = ReproductionInfo::new(seed, self.source.locator(), index);
            let result = self
                .runner
                .run(&mut self.session, exercise, seed, reproduction_info)
                .await?;
            self.record(&result)?;

            if self.reload().await? == ReloadOutcome::Restarted {
                return Ok(PassOutcome::Restarted);
            }
            index += 1;
        }
    }

    fn record(&mut self, result: &ExerciseResult) -> Result<(), LoopError> {
        if result.grade.is_pass() {
            info!("✅ {}", result.summary());
        } else {
            info!("❌ {}", result.summary());
        }
        self.sink.record(result)?;
        self.report.results += 1;
        Ok(())
    }

    /// Re-reads the source and applies it to the live playlist.
    pub async fn reload(&mut self) -> Result<ReloadOutcome, LoopError> {
        if self.config.reload_policy == ReloadPolicy::Never {
            return Ok(ReloadOutcome::Skipped);
        }

        let fresh = match self.source.load() {
            Ok(fresh) => fresh,
            Err(e) => {
                warn!("⚠️ Failed to reload playlist from {}: {}", self.source.locator(), e);
                self.report.reload_failures += 1;
                return Ok(ReloadOutcome::KeptStale);
            }
        };

        self.refresh_tunables();

        let playlist = match &self.playlist {
            Some(playlist) if playlist.same_shape(&fresh) => playlist,
            _ => {
                warn!("Need to restart to pick up new exercises.");
                self.playlist = Some(Playlist::new(fresh));
                return Ok(ReloadOutcome::Restarted);
            }
        };

        let changes = playlist.apply_updates(fresh).await?;
        for (name, fields) in &changes {
            info!("🔄 Reloaded '{}': {}", name, fields.join(", "));
        }
        if changes.is_empty() {
            debug!("Playlist unchanged");
        }
        Ok(ReloadOutcome::Updated(changes.len()))
    }

    /// Tunables the next exercise will be graded with.
    pub fn tunables(&self) -> &GradingTunables {
        self.runner.tunables()
    }

    /// Takes the source's tunables, or the configured ones if it has none.
    fn refresh_tunables(&mut self) {
        let tunables = match self.source.tunables() {
            Ok(Some(tunables)) => tunables,
            Ok(None) => self.config.tunables.clone(),
            Err(e) => {
                warn!("⚠️ Keeping current tunables, could not read them: {}", e);
                return;
            }
        };
        if &tunables != self.runner.tunables() {
            info!("🔄 Tunables: {:?}", tunables);
            self.runner = self.runner.clone().with_tunables(tunables);
        }
    }
}

/// Runs every exercise once with the same seed.
pub async fn run_playlist_once<S: GameSession>(
    session: &mut S,
    runner: &ExerciseRunner,
    exercises: &[Exercise],
    seed: u64,
    source_locator: &str,
) -> Result<Vec<ExerciseResult>, RunError> {
    let mut results = Vec::with_capacity(exercises.len());
    for (playlist_index, exercise) in exercises.iter().enumerate() {
        let reproduction_info = ReproductionInfo::new(seed, source_locator, playlist_index);
        results.push(runner.run(session, exercise.clone(), seed, reproduction_info).await?);
    }
    Ok(results)
}
