//! Drill exercise harness CLI
//!
//! Runs grading playlists against the built-in kinematic session.

use clap::{Parser, Subcommand};
use drill_core::GradingTunables;
use drill_sim::encoding::encode_result;
use drill_sim::{
    load_result_file, match_config_hash, open_source, run_playlist_once, ExerciseResult, ExerciseRunner,
    HarnessConfig, HistoryError, KinematicSession, LoopError, NullSink, PlaylistExecutionLoop,
    ReloadPolicy, ResultHistoryStore, ResultSink, RunError, SourceError,
};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info, warn, Level};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Drill exercise harness
#[derive(Parser, Debug)]
#[command(name = "drill-sim")]
#[command(about = "Run grading exercises against a simulated game session", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Simulation tick rate in Hz
    #[arg(long, default_value = "120", global = true)]
    tick_rate: u32,

    /// Bots stand still instead of chasing the ball
    #[arg(long, global = true)]
    passive_bots: bool,

    /// Give up on an exercise after this many ticks
    #[arg(long, global = true)]
    max_ticks: Option<u64>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run a playlist pass after pass, picking up edits between exercises
    ///
    /// Edits to a playlist file, its [tunables] table included, apply from
    /// the next exercise.
    Run {
        /// Playlist TOML file, or builtin:striker / builtin:goalie
        #[arg(default_value = "builtin:striker")]
        playlist: String,

        /// When to re-read the playlist
        #[arg(long, value_enum, default_value_t = ReloadPolicy::EachExercise)]
        reload: ReloadPolicy,

        /// Stop after this many passes (default: run until Ctrl-C)
        #[arg(long)]
        passes: Option<u64>,

        /// Seed of the first pass
        #[arg(short, long, default_value = "4")]
        seed: u64,

        /// Persist results under this directory
        #[arg(long)]
        history: Option<PathBuf>,
    },

    /// Run every exercise of a playlist once
    Once {
        #[arg(default_value = "builtin:striker")]
        playlist: String,

        #[arg(short, long, default_value = "4")]
        seed: u64,

        /// Persist results under this directory
        #[arg(long)]
        history: Option<PathBuf>,

        /// JSON output for CI parsing
        #[arg(long)]
        json: bool,
    },

    /// Re-run a stored result with its recorded seed and exercise
    Reproduce {
        /// Path to a stored result JSON file
        result: PathBuf,
    },
}

#[derive(Debug, Error)]
enum CliError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Loop(#[from] LoopError),

    #[error(transparent)]
    Run(#[from] RunError),

    #[error(transparent)]
    History(#[from] HistoryError),

    #[error("Failed to write JSON output: {0}")]
    Output(#[from] serde_json::Error),
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");

    let outcome = match &args.command {
        Command::Run {
            playlist,
            reload,
            passes,
            seed,
            history,
        } => run_loop(&args, playlist, *reload, *passes, *seed, history.as_deref()).await,
        Command::Once {
            playlist,
            seed,
            history,
            json,
        } => run_once(&args, playlist, *seed, history.as_deref(), *json).await,
        Command::Reproduce { result } => reproduce(&args, result).await,
    };

    match outcome {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            error!("❌ {}", e);
            std::process::exit(1);
        }
    }
}

fn build_session(args: &Args) -> KinematicSession {
    let session = KinematicSession::new().with_tick_rate(args.tick_rate);
    if args.passive_bots {
        session.with_passive_bots()
    } else {
        session
    }
}

fn build_runner(args: &Args, tunables: GradingTunables) -> ExerciseRunner {
    let runner = ExerciseRunner::new().with_tunables(tunables);
    match args.max_ticks {
        Some(max_ticks) => runner.with_max_ticks(max_ticks),
        None => runner,
    }
}

async fn run_loop(
    args: &Args,
    playlist: &str,
    reload: ReloadPolicy,
    passes: Option<u64>,
    seed: u64,
    history: Option<&Path>,
) -> Result<bool, CliError> {
    let source = open_source(playlist)?;

    let mut config = HarnessConfig::default()
        .with_reload_policy(reload)
        .with_first_seed(seed);
    if let Some(passes) = passes {
        config = config.with_max_passes(passes);
    }
    if let Some(max_ticks) = args.max_ticks {
        config = config.with_max_ticks_per_exercise(max_ticks);
    }
    if let Some(dir) = history {
        config = config.with_history_dir(dir);
    }

    let sink: Box<dyn ResultSink> = match &config.history_dir {
        Some(dir) => {
            info!("💾 Recording results under {}", dir.display());
            Box::new(ResultHistoryStore::new(dir))
        }
        None => Box::new(NullSink::new()),
    };

    info!("Drill exercise harness v{}", env!("CARGO_PKG_VERSION"));
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("Playlist: {} (reload: {:?})", playlist, reload);

    let mut execution = PlaylistExecutionLoop::new(source, build_session(args), sink, config);

    let finished = tokio::select! {
        outcome = execution.run() => Some(outcome),
        _ = tokio::signal::ctrl_c() => None,
    };

    let report = match finished {
        Some(outcome) => outcome?,
        None => {
            info!("🛑 Interrupted");
            execution.report()
        }
    };

    info!("");
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!(
        "Passes: {} | results: {} | restarts: {} | failed reloads: {}",
        report.passes, report.results, report.restarts, report.reload_failures
    );
    Ok(true)
}

async fn run_once(
    args: &Args,
    playlist: &str,
    seed: u64,
    history: Option<&Path>,
    json: bool,
) -> Result<bool, CliError> {
    let source = open_source(playlist)?;
    let exercises = source.load()?;
    let runner = build_runner(args, source.tunables()?.unwrap_or_default());
    let mut session = build_session(args);

    let results = run_playlist_once(&mut session, &runner, &exercises, seed, &source.locator()).await?;

    if let Some(dir) = history {
        let store = ResultHistoryStore::new(dir);
        for result in &results {
            let path = store.store_result(result)?;
            debug!("Stored {}", path.display());
        }
    }

    let failed: Vec<&ExerciseResult> = results.iter().filter(|r| !r.grade.is_pass()).collect();

    if json {
        let mut records = Vec::with_capacity(results.len());
        for result in &results {
            let hash = match_config_hash(&result.exercise.match_config)?;
            records.push(encode_result(result, &hash));
        }
        let summary = serde_json::json!({
            "total": results.len(),
            "passed": results.len() - failed.len(),
            "failed": failed.len(),
            "results": records,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        for result in &results {
            if result.grade.is_pass() {
                info!("✓ {}", result.summary());
            } else {
                error!("✗ {}", result.summary());
            }
        }
        info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
        if failed.is_empty() {
            info!("✅ All {} exercises passed!", results.len());
        } else {
            error!("❌ {}/{} exercises failed!", failed.len(), results.len());
        }
    }

    Ok(failed.is_empty())
}

async fn reproduce(args: &Args, path: &Path) -> Result<bool, CliError> {
    let original = load_result_file(path)?;
    info!(
        "Reproducing '{}' (seed={}, {}#{})",
        original.exercise.name,
        original.seed,
        original.reproduction_info.source_locator,
        original.reproduction_info.playlist_index
    );

    let runner = build_runner(args, GradingTunables::default());
    let mut session = build_session(args);
    let replayed = runner.reproduce(&mut session, &original).await?;

    info!("Recorded: {}", original.grade);
    info!("Replayed: {}", replayed.grade);

    if replayed.grade.without_backtrace() == original.grade.without_backtrace() {
        info!("✅ Reproduced");
        Ok(true)
    } else {
        warn!("⚠️ Replayed grade differs from the recorded one");
        Ok(false)
    }
}
