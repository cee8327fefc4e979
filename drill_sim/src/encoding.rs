//! JSON encoding of history records.
//!
//! Records are plain serde JSON annotated for downstream tooling:
//! - `"__class__"`: Rust type path of the encoded value
//! - `"__isinstance_Pass__"` / `"__isinstance_Fail__"`: on grades
//! - `"__isinstance_Grader__"`: on grader descriptions
//! - `"__isinstance_Exception__"` + `"message"`: on error payloads
//!
//! Each top-level field is encoded on its own. A field that fails to
//! encode is replaced by `{"__encode_error__": <exception>}` and the rest
//! of the record is still written.

use crate::exercise::Exercise;
use crate::result::ExerciseResult;
use chrono::{DateTime, SecondsFormat, Utc};
use drill_core::{FailReason, Grade, GraderConfig};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::any::type_name;

pub const CLASS_KEY: &str = "__class__";
pub const ENCODE_ERROR_KEY: &str = "__encode_error__";
pub const DATETIME_CLASS: &str = "chrono::DateTime<Utc>";

/// Adds a `__class__` tag to JSON objects; other values pass through.
pub fn tag_class(mut value: Value, class: &str) -> Value {
    if let Value::Object(map) = &mut value {
        map.insert(CLASS_KEY.to_string(), Value::String(class.to_string()));
    }
    value
}

/// Plain serde encoding tagged with the value's type path.
pub fn encode_tagged<T: Serialize>(value: &T) -> Result<Value, serde_json::Error> {
    Ok(tag_class(serde_json::to_value(value)?, type_name::<T>()))
}

/// Encodes an error as an exception payload.
pub fn encode_exception<E: std::error::Error>(error: &E) -> Value {
    json!({
        CLASS_KEY: type_name::<E>(),
        "__isinstance_Exception__": true,
        "message": error.to_string(),
    })
}

/// UTC timestamp with millisecond precision and a `Z` suffix.
pub fn encode_datetime(at: &DateTime<Utc>) -> Value {
    json!({
        CLASS_KEY: DATETIME_CLASS,
        "iso8601": at.to_rfc3339_opts(SecondsFormat::Millis, true),
    })
}

pub fn encode_grade(grade: &Grade) -> Result<Value, serde_json::Error> {
    let mut value = encode_tagged(grade)?;
    if let Value::Object(map) = &mut value {
        match grade {
            Grade::Continue => {}
            Grade::Pass(_) => {
                map.insert("__isinstance_Pass__".into(), Value::Bool(true));
            }
            Grade::Fail(reason) => {
                map.insert("__isinstance_Fail__".into(), Value::Bool(true));
                if let FailReason::ExerciseError { .. } = reason {
                    if let Some(Value::Object(reason)) = map.get_mut("reason") {
                        reason.insert("__isinstance_Exception__".into(), Value::Bool(true));
                    }
                }
            }
        }
    }
    Ok(value)
}

pub fn encode_grader_config(grader: &GraderConfig) -> Result<Value, serde_json::Error> {
    let mut value = encode_tagged(grader)?;
    if let Value::Object(map) = &mut value {
        map.insert("__isinstance_Grader__".into(), Value::Bool(true));
    }
    Ok(value)
}

pub fn encode_exercise(exercise: &Exercise) -> Result<Value, serde_json::Error> {
    let mut map = Map::new();
    map.insert(CLASS_KEY.into(), Value::String(type_name::<Exercise>().into()));
    map.insert("name".into(), Value::String(exercise.name.clone()));
    map.insert("scenario".into(), encode_tagged(&exercise.scenario)?);
    map.insert("grader".into(), encode_grader_config(&exercise.grader)?);
    map.insert("match_config".into(), encode_tagged(&exercise.match_config)?);
    Ok(Value::Object(map))
}

/// Turns a field encoding attempt into its value or an error marker.
pub fn encode_field(encoded: Result<Value, serde_json::Error>) -> Value {
    match encoded {
        Ok(value) => value,
        Err(e) => json!({ ENCODE_ERROR_KEY: encode_exception(&e) }),
    }
}

/// Encodes a full result record.
///
/// `match_config_hash` names the content-addressed match config file the
/// run used.
pub fn encode_result(result: &ExerciseResult, match_config_hash: &str) -> Value {
    let mut map = Map::new();
    map.insert(CLASS_KEY.into(), Value::String(type_name::<ExerciseResult>().into()));
    map.insert("run_id".into(), Value::String(result.run_id.to_string()));
    map.insert("seed".into(), Value::from(result.seed));
    map.insert("ticks".into(), Value::from(result.ticks));
    map.insert("created_at".into(), encode_datetime(&result.created_at));
    map.insert("grade".into(), encode_field(encode_grade(&result.grade)));
    map.insert("grade_summary".into(), Value::String(result.grade.to_string()));
    map.insert("exercise".into(), encode_field(encode_exercise(&result.exercise)));
    map.insert(
        "reproduction_info".into(),
        encode_field(encode_tagged(&result.reproduction_info)),
    );
    map.insert("match_config_hash".into(), Value::String(match_config_hash.to_string()));
    if let Some(metric) = &result.metric {
        map.insert("metric".into(), metric.clone());
    }
    Value::Object(map)
}

/// Removes the annotations added by this module, leaving plain serde JSON.
///
/// Timestamps collapse back to their ISO 8601 string. Error markers are
/// left in place so that decoding such a field fails loudly.
pub fn strip_annotations(value: Value) -> Value {
    match value {
        Value::Object(mut map) => {
            if map.get(CLASS_KEY).and_then(Value::as_str) == Some(DATETIME_CLASS) {
                if let Some(iso) = map.remove("iso8601") {
                    return iso;
                }
            }
            if map.contains_key(ENCODE_ERROR_KEY) {
                return Value::Object(map);
            }
            map.retain(|key, _| !(key.starts_with("__") && key.ends_with("__")));
            Value::Object(
                map.into_iter()
                    .map(|(key, value)| (key, strip_annotations(value)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(strip_annotations).collect()),
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::ReproductionInfo;
    use crate::scenarios::ScenarioConfig;
    use chrono::TimeZone;
    use drill_core::PassReason;
    use drill_env::RunId;

    fn sample_result(grade: Grade) -> ExerciseResult {
        ExerciseResult {
            seed: 4,
            grade,
            exercise: Exercise::new("Facing ball", ScenarioConfig::BallInFrontOfGoal),
            reproduction_info: ReproductionInfo::new(4, "builtin:striker", 0),
            run_id: RunId::new(),
            created_at: Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap(),
            ticks: 42,
            metric: Some(json!({ "timeout": { "max_duration_seconds": 4.0 } })),
        }
    }

    #[test]
    fn test_datetime_encoding() {
        let at = Utc.with_ymd_and_hms(2024, 3, 1, 12, 30, 5).unwrap();
        assert_eq!(
            encode_datetime(&at),
            json!({ "__class__": "chrono::DateTime<Utc>", "iso8601": "2024-03-01T12:30:05.000Z" })
        );
    }

    #[test]
    fn test_grade_annotations() {
        let pass = encode_grade(&Grade::Pass(PassReason::GoalForAllyTeam)).unwrap();
        assert_eq!(pass["__isinstance_Pass__"], true);
        assert_eq!(pass[CLASS_KEY], type_name::<Grade>());

        let error = encode_grade(&Grade::exercise_error("boom")).unwrap();
        assert_eq!(error["__isinstance_Fail__"], true);
        assert_eq!(error["reason"]["__isinstance_Exception__"], true);
        assert_eq!(error["reason"]["message"], "boom");
    }

    #[test]
    fn test_result_record_shape() {
        let record = encode_result(&sample_result(Grade::Pass(PassReason::GoalForAllyTeam)), "abc");

        assert_eq!(record["exercise"]["grader"]["__isinstance_Grader__"], true);
        assert_eq!(record["exercise"]["name"], "Facing ball");
        assert_eq!(record["match_config_hash"], "abc");
        assert_eq!(record["created_at"]["iso8601"], "2024-03-01T12:30:05.000Z");
    }

    #[test]
    fn test_stripped_record_decodes() {
        let result = sample_result(Grade::exercise_error("boom"));
        let record = encode_result(&result, "abc");

        let decoded: ExerciseResult = serde_json::from_value(strip_annotations(record)).unwrap();
        assert_eq!(decoded, result);
    }

    #[test]
    fn test_failed_field_becomes_marker() {
        struct Unencodable;

        impl Serialize for Unencodable {
            fn serialize<S: serde::Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
                Err(serde::ser::Error::custom("cannot encode"))
            }
        }

        let marker = encode_field(encode_tagged(&Unencodable));
        let exception = &marker[ENCODE_ERROR_KEY];
        assert_eq!(exception["__isinstance_Exception__"], true);
        assert!(exception["message"].as_str().unwrap().contains("cannot encode"));
    }
}
