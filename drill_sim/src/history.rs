//! Append-only result history on disk.
//!
//! ```text
//! <root>/authoritative_data/
//!     match_configs/<sha256 of canonical JSON>.json
//!     results/<run id>.json
//! ```
//!
//! Files under `authoritative_data` are written once and never changed.
//! Finding different content under an existing name is an integrity
//! violation.

use crate::encoding::{encode_result, strip_annotations};
use crate::result::ExerciseResult;
use drill_env::{MatchConfig, RunId};
use sha2::{Digest, Sha256};
use std::fs::{self, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

/// Errors from the history store.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Encoding failed: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("Could not decode {path}: {message}")]
    Decode { path: PathBuf, message: String },

    /// Existing authoritative data disagrees with what was about to be written
    #[error("Integrity violation at {path}: {reason}")]
    IntegrityViolation { path: PathBuf, reason: String },
}

impl HistoryError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Anything that accepts finished results.
pub trait ResultSink: Send {
    fn record(&mut self, result: &ExerciseResult) -> Result<(), HistoryError>;
}

impl<T: ResultSink + ?Sized> ResultSink for Box<T> {
    fn record(&mut self, result: &ExerciseResult) -> Result<(), HistoryError> {
        (**self).record(result)
    }
}

impl ResultSink for Vec<ExerciseResult> {
    fn record(&mut self, result: &ExerciseResult) -> Result<(), HistoryError> {
        self.push(result.clone());
        Ok(())
    }
}

/// Sink that keeps nothing but a count, for runs without a history directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink {
    recorded: u64,
}

impl NullSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Results seen so far.
    pub fn recorded(&self) -> u64 {
        self.recorded
    }
}

impl ResultSink for NullSink {
    fn record(&mut self, _result: &ExerciseResult) -> Result<(), HistoryError> {
        self.recorded += 1;
        Ok(())
    }
}

/// Canonical JSON of a match config: sorted keys, no whitespace.
pub fn canonical_match_config_json(config: &MatchConfig) -> Result<String, HistoryError> {
    // serde_json's default map is ordered, so a round trip through
    // `Value` sorts every object's keys.
    let value = serde_json::to_value(config)?;
    Ok(serde_json::to_string(&value)?)
}

/// Hex SHA-256 of the canonical JSON.
pub fn match_config_hash(config: &MatchConfig) -> Result<String, HistoryError> {
    let canonical = canonical_match_config_json(config)?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.as_bytes());
    Ok(format!("{:x}", hasher.finalize()))
}

/// Results and match configs stored under a history directory.
#[derive(Debug, Clone)]
pub struct ResultHistoryStore {
    root: PathBuf,
}

impl ResultHistoryStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn authoritative_data_dir(&self) -> PathBuf {
        self.root.join("authoritative_data")
    }

    pub fn match_configs_dir(&self) -> PathBuf {
        self.authoritative_data_dir().join("match_configs")
    }

    pub fn results_dir(&self) -> PathBuf {
        self.authoritative_data_dir().join("results")
    }

    pub fn result_path(&self, run_id: RunId) -> PathBuf {
        self.results_dir().join(format!("{}.json", run_id))
    }

    /// Writes `config` under its content hash unless already present.
    ///
    /// Returns the hash. An existing file with different bytes is an
    /// [`HistoryError::IntegrityViolation`].
    pub fn ensure_match_config_on_disk(&self, config: &MatchConfig) -> Result<String, HistoryError> {
        let canonical = canonical_match_config_json(config)?;
        let hash = match_config_hash(config)?;
        let dir = self.match_configs_dir();
        fs::create_dir_all(&dir).map_err(|e| HistoryError::io(&dir, e))?;

        let path = dir.join(format!("{}.json", hash));
        match fs::read(&path) {
            Ok(existing) if existing == canonical.as_bytes() => Ok(hash),
            Ok(_) => Err(HistoryError::IntegrityViolation {
                path,
                reason: "match config file content does not match its hash".to_string(),
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                write_new(&path, canonical.as_bytes())?;
                debug!("Stored match config {}", hash);
                Ok(hash)
            }
            Err(e) => Err(HistoryError::io(&path, e)),
        }
    }

    /// Persists a result; never overwrites an existing record.
    pub fn store_result(&self, result: &ExerciseResult) -> Result<PathBuf, HistoryError> {
        let hash = self.ensure_match_config_on_disk(&result.exercise.match_config)?;
        let record = encode_result(result, &hash);

        let dir = self.results_dir();
        fs::create_dir_all(&dir).map_err(|e| HistoryError::io(&dir, e))?;

        let path = self.result_path(result.run_id);
        let bytes = serde_json::to_vec_pretty(&record)?;
        write_new(&path, &bytes)?;
        Ok(path)
    }

    /// Loads a stored result by run id.
    pub fn load_result(&self, run_id: RunId) -> Result<ExerciseResult, HistoryError> {
        load_result_file(&self.result_path(run_id))
    }

    /// Run ids of all stored results, in no particular order.
    pub fn list_results(&self) -> Result<Vec<RunId>, HistoryError> {
        let dir = self.results_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(HistoryError::io(&dir, e)),
        };

        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| HistoryError::io(&dir, e))?;
            let path = entry.path();
            if let Some(id) = path
                .file_stem()
                .and_then(|stem| stem.to_str())
                .and_then(|stem| stem.parse().ok())
            {
                ids.push(id);
            }
        }
        Ok(ids)
    }
}

impl ResultSink for ResultHistoryStore {
    fn record(&mut self, result: &ExerciseResult) -> Result<(), HistoryError> {
        self.store_result(result).map(|_| ())
    }
}

/// Decodes a result record written by [`ResultHistoryStore::store_result`].
pub fn load_result_file(path: &Path) -> Result<ExerciseResult, HistoryError> {
    let bytes = fs::read(path).map_err(|e| HistoryError::io(path, e))?;
    let record: serde_json::Value = serde_json::from_slice(&bytes).map_err(|e| HistoryError::Decode {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;
    serde_json::from_value(strip_annotations(record)).map_err(|e| HistoryError::Decode {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Creates `path` and writes `bytes`, refusing to replace an existing file.
fn write_new(path: &Path, bytes: &[u8]) -> Result<(), HistoryError> {
    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            return Err(HistoryError::IntegrityViolation {
                path: path.to_path_buf(),
                reason: "refusing to overwrite authoritative data".to_string(),
            })
        }
        Err(e) => return Err(HistoryError::io(path, e)),
    };
    file.write_all(bytes).map_err(|e| HistoryError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exercise::Exercise;
    use crate::result::ReproductionInfo;
    use crate::scenarios::ScenarioConfig;
    use chrono::{TimeZone, Utc};
    use drill_core::{Grade, PassReason};
    use drill_env::{PlayerConfig, Team};

    fn result_with(match_config: MatchConfig) -> ExerciseResult {
        ExerciseResult {
            seed: 4,
            grade: Grade::Pass(PassReason::GoalForAllyTeam),
            exercise: Exercise::new("Facing ball", ScenarioConfig::BallInFrontOfGoal)
                .with_match_config(match_config),
            reproduction_info: ReproductionInfo::new(4, "builtin:striker", 0),
            run_id: RunId::new(),
            created_at: Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap(),
            ticks: 10,
            metric: None,
        }
    }

    fn orange_match() -> MatchConfig {
        MatchConfig {
            players: vec![PlayerConfig::bot("line_goalie", Team::Orange)],
            ..Default::default()
        }
    }

    #[test]
    fn test_match_configs_are_deduplicated() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultHistoryStore::new(dir.path());

        let first = store.ensure_match_config_on_disk(&MatchConfig::default()).unwrap();
        let again = store.ensure_match_config_on_disk(&MatchConfig::default()).unwrap();
        let other = store.ensure_match_config_on_disk(&orange_match()).unwrap();

        assert_eq!(first, again);
        assert_ne!(first, other);
        assert_eq!(first.len(), 64);
        assert_eq!(fs::read_dir(store.match_configs_dir()).unwrap().count(), 2);
    }

    #[test]
    fn test_tampered_match_config_is_integrity_violation() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultHistoryStore::new(dir.path());

        let hash = store.ensure_match_config_on_disk(&MatchConfig::default()).unwrap();
        let path = store.match_configs_dir().join(format!("{}.json", hash));
        fs::write(&path, b"{}").unwrap();

        assert!(matches!(
            store.ensure_match_config_on_disk(&MatchConfig::default()),
            Err(HistoryError::IntegrityViolation { .. })
        ));
    }

    #[test]
    fn test_store_and_load_result() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ResultHistoryStore::new(dir.path());
        let result = result_with(orange_match());

        store.record(&result).unwrap();

        assert_eq!(store.load_result(result.run_id).unwrap(), result);
        assert_eq!(store.list_results().unwrap(), vec![result.run_id]);

        let record: serde_json::Value =
            serde_json::from_slice(&fs::read(store.result_path(result.run_id)).unwrap()).unwrap();
        assert_eq!(record["match_config_hash"], match_config_hash(&orange_match()).unwrap());
    }

    #[test]
    fn test_results_are_never_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let store = ResultHistoryStore::new(dir.path());
        let result = result_with(MatchConfig::default());

        store.store_result(&result).unwrap();
        assert!(matches!(
            store.store_result(&result),
            Err(HistoryError::IntegrityViolation { .. })
        ));
    }

    #[test]
    fn test_canonical_json_sorts_keys() {
        let json = canonical_match_config_json(&MatchConfig::default()).unwrap();
        let game_map = json.find("\"game_map\"").unwrap();
        let players = json.find("\"players\"").unwrap();
        let mutators = json.find("\"mutators\"").unwrap();
        assert!(game_map < mutators && mutators < players);
    }
}
