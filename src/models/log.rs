// ABOUTME: Legacy per-user aggregate log: exercise history keyed by exercise and date
// ABOUTME: Sibling-preserving upsert into the JSON blob and tolerant history decoding
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Setsync Project

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::constants::units::lb_to_kg;
use crate::errors::{AppError, AppResult};

/// Display unit a legacy log entry was recorded in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WeightUnit {
    Kg,
    Lb,
}

impl WeightUnit {
    /// Convert a weight recorded in this unit to kilograms
    #[must_use]
    pub fn to_kg(self, weight: f64) -> f64 {
        match self {
            Self::Kg => weight,
            Self::Lb => lb_to_kg(weight),
        }
    }
}

/// One set inside a legacy log entry
///
/// Field names mirror the historical blob layout, which predates this crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LogSet {
    /// Weight in the entry's unit
    pub weight: f64,
    /// Rep count
    pub reps: u32,
    /// Whether the set was completed
    pub is_completed: bool,
}

/// One legacy log entry: one exercise, one calendar date
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExerciseLogEntry {
    /// Calendar date of the workout
    pub date: NaiveDate,
    /// Unit the sets were recorded in
    pub unit: WeightUnit,
    /// Sets performed that day
    pub sets: Vec<LogSet>,
}

/// Upsert a log entry into the per-user aggregate blob, by (exercise, date).
///
/// The blob carries sibling keys this crate does not own (custom exercises,
/// cardio history, other exercises' logs); those must survive the write
/// untouched. An entry for the same date is replaced, otherwise the entry is
/// appended - never two entries for one date.
pub fn upsert_entry_in_blob(
    blob: &mut Value,
    exercise_key: &str,
    entry: &ExerciseLogEntry,
) -> AppResult<()> {
    if !blob.is_object() {
        // Empty or malformed blob: start a fresh aggregate
        *blob = Value::Object(Map::new());
    }
    let Some(root) = blob.as_object_mut() else {
        return Err(AppError::internal("progress blob is not an object"));
    };

    let entry_value = serde_json::to_value(entry)?;
    let date_key = entry.date.to_string();

    let entries = root
        .entry(exercise_key.to_owned())
        .or_insert_with(|| Value::Array(Vec::new()));
    if !entries.is_array() {
        // Malformed history under this key: replace, siblings unaffected
        *entries = Value::Array(Vec::new());
    }
    let Some(list) = entries.as_array_mut() else {
        return Err(AppError::internal("exercise history is not an array"));
    };

    match list
        .iter_mut()
        .find(|e| e.get("date").and_then(Value::as_str) == Some(date_key.as_str()))
    {
        Some(existing) => *existing = entry_value,
        None => list.push(entry_value),
    }
    Ok(())
}

impl ExerciseLogEntry {
    /// Decode one exercise's history from a legacy blob value.
    ///
    /// Historical data is messy: non-array blobs, entries with missing
    /// `sets`, stray field types. All of those decode to empty rather than
    /// erroring - the analyzer must never fail on old data.
    #[must_use]
    pub fn decode_history(value: &Value) -> Vec<Self> {
        let Some(entries) = value.as_array() else {
            return Vec::new();
        };
        entries.iter().filter_map(Self::decode_entry).collect()
    }

    fn decode_entry(value: &Value) -> Option<Self> {
        let date = value
            .get("date")
            .and_then(Value::as_str)
            .and_then(|s| s.parse::<NaiveDate>().ok())?;
        let unit = match value.get("unit").and_then(Value::as_str) {
            Some("lb") => WeightUnit::Lb,
            _ => WeightUnit::Kg,
        };
        let sets = value
            .get("sets")
            .and_then(Value::as_array)
            .map(|sets| sets.iter().map(decode_set).collect())
            .unwrap_or_default();
        Some(Self { date, unit, sets })
    }
}

fn decode_set(value: &Value) -> LogSet {
    LogSet {
        weight: value.get("weight").and_then(Value::as_f64).unwrap_or(0.0),
        reps: value
            .get("reps")
            .and_then(Value::as_u64)
            .and_then(|r| u32::try_from(r).ok())
            .unwrap_or(0),
        is_completed: value
            .get("isCompleted")
            .and_then(Value::as_bool)
            .unwrap_or(false),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn entry(date: &str, weight: f64, reps: u32) -> ExerciseLogEntry {
        ExerciseLogEntry {
            date: date.parse().unwrap(),
            unit: WeightUnit::Kg,
            sets: vec![LogSet {
                weight,
                reps,
                is_completed: true,
            }],
        }
    }

    #[test]
    fn test_upsert_appends_new_date() {
        let mut blob = Value::Null;
        upsert_entry_in_blob(&mut blob, "bench", &entry("2024-01-01", 60.0, 8)).unwrap();
        upsert_entry_in_blob(&mut blob, "bench", &entry("2024-01-08", 62.5, 8)).unwrap();
        assert_eq!(blob["bench"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_upsert_replaces_same_date() {
        let mut blob = Value::Null;
        upsert_entry_in_blob(&mut blob, "bench", &entry("2024-01-01", 60.0, 8)).unwrap();
        upsert_entry_in_blob(&mut blob, "bench", &entry("2024-01-01", 65.0, 5)).unwrap();
        let list = blob["bench"].as_array().unwrap();
        assert_eq!(list.len(), 1);
        assert!((list[0]["sets"][0]["weight"].as_f64().unwrap() - 65.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_upsert_preserves_sibling_keys() {
        let mut blob = json!({
            "customExercises": [{"name": "Face Pull"}],
            "cardio": [{"date": "2024-01-02", "minutes": 30}],
            "squat": [{"date": "2024-01-01", "unit": "kg", "sets": []}],
        });
        upsert_entry_in_blob(&mut blob, "bench", &entry("2024-01-03", 80.0, 5)).unwrap();
        assert_eq!(blob["customExercises"][0]["name"], "Face Pull");
        assert_eq!(blob["cardio"][0]["minutes"], 30);
        assert_eq!(blob["squat"].as_array().unwrap().len(), 1);
        assert_eq!(blob["bench"].as_array().unwrap().len(), 1);
    }

    #[test]
    fn test_decode_history_tolerates_malformed_data() {
        assert!(ExerciseLogEntry::decode_history(&Value::Null).is_empty());
        assert!(ExerciseLogEntry::decode_history(&json!("oops")).is_empty());
        assert!(ExerciseLogEntry::decode_history(&json!({"date": "2024-01-01"})).is_empty());

        // Entry with no sets decodes as empty sets, not an error
        let history = ExerciseLogEntry::decode_history(&json!([{"date": "2024-01-01"}]));
        assert_eq!(history.len(), 1);
        assert!(history[0].sets.is_empty());

        // Undateable entries are skipped, valid ones survive
        let history = ExerciseLogEntry::decode_history(&json!([
            {"date": "not-a-date"},
            {"date": "2024-01-08", "unit": "lb", "sets": [{"weight": 135, "reps": 5, "isCompleted": true}]},
        ]));
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].unit, WeightUnit::Lb);
        assert_eq!(history[0].sets[0].reps, 5);
    }

    #[test]
    fn test_log_entry_serde_camel_case() {
        let json = serde_json::to_string(&entry("2024-01-01", 60.0, 8)).unwrap();
        assert!(json.contains("\"isCompleted\":true"));
        assert!(json.contains("\"2024-01-01\""));
    }
}
