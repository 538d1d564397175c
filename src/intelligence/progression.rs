// ABOUTME: Progression analyzer computing personal records from historical logs
// ABOUTME: Epley one-rep-max estimation and beat-last-workout suggestion generation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Setsync Project

//! Personal-record computation and progression suggestions.
//!
//! Strictly read-only: the analyzer consumes one exercise's legacy log
//! history and never writes. Historical data is messy and partially typed;
//! anything malformed decodes to empty rather than erroring.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::EngineConfig;
use crate::models::{ExerciseLogEntry, LogSet, WeightUnit};

/// Best-ever values for one exercise, derived from completed sets only
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PersonalRecords {
    /// Max single-set weight ever, kilograms
    pub heaviest_weight: Option<f64>,
    /// Max single-set weight x reps
    pub best_set_volume: Option<f64>,
    /// Max per-session sum of weight x reps over completed sets
    pub best_session_volume: Option<f64>,
    /// Max Epley-estimated one-rep max: weight * (1 + reps/30)
    pub best_estimated_one_rep_max: Option<f64>,
}

/// Records plus suggestions, as seeded on exercise load
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProgressionReport {
    pub records: PersonalRecords,
    /// Short, human-readable targets for beating the last workout
    pub suggestions: Vec<String>,
}

/// Epley one-rep-max estimate.
///
/// Monotonic: heavier weight, or more reps at equal weight, never lowers it.
#[must_use]
pub fn epley_one_rep_max(weight_kg: f64, reps: u32) -> f64 {
    weight_kg * (1.0 + f64::from(reps) / 30.0)
}

/// Computes PRs and beat-last-workout suggestions for one exercise
#[derive(Debug, Clone, Default)]
pub struct ProgressionAnalyzer {
    config: EngineConfig,
}

impl ProgressionAnalyzer {
    /// Create an analyzer with the given tuning
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    /// Full report from a raw legacy-blob history value
    #[must_use]
    pub fn analyze(&self, history_blob: &Value) -> ProgressionReport {
        let history = ExerciseLogEntry::decode_history(history_blob);
        ProgressionReport {
            records: self.personal_records(&history),
            suggestions: self.beat_last_suggestions(&history),
        }
    }

    /// Personal records over all entries, completed sets only.
    ///
    /// Entries recorded in pounds are converted to kilograms before
    /// comparison.
    #[must_use]
    pub fn personal_records(&self, history: &[ExerciseLogEntry]) -> PersonalRecords {
        let mut records = PersonalRecords::default();
        for entry in history {
            let mut session_volume = 0.0;
            let mut any_completed = false;
            for set in completed_sets(entry) {
                let weight_kg = entry.unit.to_kg(set.weight);
                let volume = weight_kg * f64::from(set.reps);
                any_completed = true;
                session_volume += volume;
                records.heaviest_weight = fold_max(records.heaviest_weight, weight_kg);
                records.best_set_volume = fold_max(records.best_set_volume, volume);
                records.best_estimated_one_rep_max = fold_max(
                    records.best_estimated_one_rep_max,
                    epley_one_rep_max(weight_kg, set.reps),
                );
            }
            if any_completed {
                records.best_session_volume =
                    fold_max(records.best_session_volume, session_volume);
            }
        }
        records
    }

    /// Suggestions for beating the most recent session.
    ///
    /// Per completed set of the latest entry: one more rep at the same
    /// weight, or - once the set reaches the top of the rep band - a weight
    /// increment with reps reset to the band bottom. Capped to a small count;
    /// no history means no suggestions, not an error.
    #[must_use]
    pub fn beat_last_suggestions(&self, history: &[ExerciseLogEntry]) -> Vec<String> {
        let Some(latest) = history.iter().max_by_key(|e| e.date) else {
            return Vec::new();
        };
        let (band_bottom, band_top) = self.config.rep_band;
        let increment = self.config.weight_increment_kg;

        latest
            .sets
            .iter()
            .enumerate()
            .filter(|(_, set)| set.is_completed)
            .take(self.config.max_suggestions)
            .map(|(index, set)| {
                let weight_kg = latest.unit.to_kg(set.weight);
                if set.reps >= band_top {
                    format!(
                        "Set {}: try {:.1} kg x {} reps (+{:.1} kg, reset reps)",
                        index + 1,
                        weight_kg + increment,
                        band_bottom,
                        increment,
                    )
                } else {
                    format!(
                        "Set {}: try {:.1} kg x {} reps (+1 rep)",
                        index + 1,
                        weight_kg,
                        set.reps + 1,
                    )
                }
            })
            .collect()
    }
}

fn completed_sets(entry: &ExerciseLogEntry) -> impl Iterator<Item = &LogSet> {
    entry.sets.iter().filter(|s| s.is_completed)
}

fn fold_max(current: Option<f64>, candidate: f64) -> Option<f64> {
    match current {
        Some(best) if best >= candidate => Some(best),
        _ => Some(candidate),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn entry(date: &str, unit: WeightUnit, sets: Vec<(f64, u32, bool)>) -> ExerciseLogEntry {
        ExerciseLogEntry {
            date: date.parse::<NaiveDate>().unwrap(),
            unit,
            sets: sets
                .into_iter()
                .map(|(weight, reps, is_completed)| LogSet {
                    weight,
                    reps,
                    is_completed,
                })
                .collect(),
        }
    }

    fn analyzer() -> ProgressionAnalyzer {
        ProgressionAnalyzer::new(EngineConfig::default())
    }

    #[test]
    fn test_epley_monotonic() {
        assert!(epley_one_rep_max(100.0, 6) > epley_one_rep_max(100.0, 5));
        assert!(epley_one_rep_max(102.5, 5) > epley_one_rep_max(100.0, 5));
    }

    #[test]
    fn test_records_over_history() {
        let history = vec![
            entry("2024-01-01", WeightUnit::Kg, vec![(60.0, 8, true), (60.0, 8, true)]),
            entry("2024-01-08", WeightUnit::Kg, vec![(62.5, 8, true)]),
        ];
        let records = analyzer().personal_records(&history);
        assert_eq!(records.heaviest_weight, Some(62.5));
        assert_eq!(records.best_set_volume, Some(62.5 * 8.0));
        // Two 60x8 sets in one session beat the single 62.5x8
        assert_eq!(records.best_session_volume, Some(960.0));
        assert_eq!(
            records.best_estimated_one_rep_max,
            Some(epley_one_rep_max(62.5, 8))
        );
    }

    #[test]
    fn test_records_ignore_incomplete_sets() {
        let history = vec![entry(
            "2024-01-01",
            WeightUnit::Kg,
            vec![(200.0, 5, false), (60.0, 8, true)],
        )];
        let records = analyzer().personal_records(&history);
        assert_eq!(records.heaviest_weight, Some(60.0));
    }

    #[test]
    fn test_records_convert_pounds() {
        let history = vec![entry("2024-01-01", WeightUnit::Lb, vec![(220.462, 5, true)])];
        let records = analyzer().personal_records(&history);
        let heaviest = records.heaviest_weight.unwrap();
        assert!((heaviest - 100.0).abs() < 0.01);
    }

    #[test]
    fn test_suggestions_from_latest_entry() {
        let history = vec![
            entry("2024-01-08", WeightUnit::Kg, vec![(60.0, 8, true), (60.0, 12, true)]),
            entry("2024-01-01", WeightUnit::Kg, vec![(55.0, 8, true)]),
        ];
        let suggestions = analyzer().beat_last_suggestions(&history);
        assert_eq!(suggestions.len(), 2);
        // Below the band top: one more rep
        assert!(suggestions[0].contains("9 reps"));
        // At the band top: increment weight, reset reps
        assert!(suggestions[1].contains("62.5 kg"));
        assert!(suggestions[1].contains("8 reps"));
    }

    #[test]
    fn test_suggestions_capped() {
        let history = vec![entry(
            "2024-01-01",
            WeightUnit::Kg,
            vec![(60.0, 8, true); 6],
        )];
        let suggestions = analyzer().beat_last_suggestions(&history);
        assert_eq!(suggestions.len(), 3);
    }

    #[test]
    fn test_empty_history_yields_no_suggestions() {
        let analyzer = analyzer();
        assert!(analyzer.beat_last_suggestions(&[]).is_empty());
        assert_eq!(analyzer.personal_records(&[]), PersonalRecords::default());
    }

    #[test]
    fn test_analyze_tolerates_malformed_blob() {
        let analyzer = analyzer();
        let report = analyzer.analyze(&serde_json::json!({"not": "an array"}));
        assert!(report.suggestions.is_empty());
        assert_eq!(report.records, PersonalRecords::default());
    }
}
