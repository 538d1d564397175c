// ABOUTME: Completion protocol: drives an exercise from editable to finalized
// ABOUTME: Dual-write of legacy log and normalized store with optimistic cache rollback
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Setsync Project

//! # Completion Protocol
//!
//! State machine per exercise, per session:
//! `Editing -> RequestComplete -> Persisting -> Finalized`, with a
//! failure edge back to `Editing`.
//!
//! Completion atomically (from the user's perspective) updates both
//! persistence representations - the legacy per-user aggregate log and the
//! normalized session store - and publishes an optimistic snapshot to the
//! shared read cache, rolled back if any write fails.

use chrono::Utc;
use tracing::{debug, warn};

use crate::buffer::ExerciseEditBuffer;
use crate::cache::{ProgressCache, ProgressPatch};
use crate::errors::{AppError, AppResult};
use crate::models::{
    ExerciseLogEntry, ExerciseStatus, LogSet, SessionKind, SessionSet, SessionStatus,
    WeightUnit, WorkoutSession,
};
use crate::save::SaveController;
use crate::store::EntityStore;

/// Where an exercise sits in the completion protocol
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionState {
    /// Sets are editable; saves flow through the save controller
    Editing,
    /// User asked to complete; awaiting confirmation
    RequestComplete,
    /// The dual write is running
    Persisting,
    /// Exercise is finalized and read-only for this session
    Finalized,
}

/// Summary shown to the user before confirming completion
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionSummary {
    /// Sets marked complete
    pub completed_sets: u32,
    /// Sets in the exercise
    pub total_sets: u32,
    /// Completion percentage, 0-100
    pub percent: f64,
}

/// Result of a successful completion
#[derive(Debug, Clone, Copy)]
pub struct CompletionOutcome {
    /// The confirmed summary
    pub summary: CompletionSummary,
    /// True when this was the session's last exercise and the session row
    /// was finalized too
    pub session_finalized: bool,
    /// The caller should navigate away from the editing screen
    pub navigate: bool,
}

/// Snapshot-before-mutate helper for optimistic cache updates.
///
/// Applies the patch before the commit round-trip completes so sibling
/// screens reflect the new state immediately; any commit failure restores
/// the snapshot.
pub async fn with_optimistic_update<T, F>(
    cache: &ProgressCache,
    patch: Option<ProgressPatch>,
    commit: F,
) -> AppResult<T>
where
    F: std::future::Future<Output = AppResult<T>>,
{
    let snapshot = cache.snapshot().await;
    if let Some(patch) = patch {
        cache.patch_cached_progress(patch).await;
    }
    match commit.await {
        Ok(value) => Ok(value),
        Err(error) => {
            warn!(%error, "optimistic commit failed, restoring cache snapshot");
            cache.restore(snapshot).await;
            Err(error)
        }
    }
}

/// Floor zero-rep sets to one rep and missing weights to zero.
///
/// A zero-rep completed set is never persisted; entered numbers are
/// otherwise left intact.
pub fn normalize_sets(sets: &mut [SessionSet]) {
    for set in sets {
        if set.reps == 0 {
            set.reps = 1;
        }
        if !set.weight_kg.is_finite() || set.weight_kg < 0.0 {
            set.weight_kg = 0.0;
        }
    }
}

fn summarize(sets: &[SessionSet]) -> CompletionSummary {
    let total = sets.len() as u32;
    let completed = sets.iter().filter(|s| s.is_completed).count() as u32;
    let percent = if total == 0 {
        0.0
    } else {
        f64::from(completed) / f64::from(total) * 100.0
    };
    CompletionSummary {
        completed_sets: completed,
        total_sets: total,
        percent,
    }
}

fn has_valid_completed_set(sets: &[SessionSet]) -> bool {
    sets.iter()
        .any(|s| s.is_completed && s.weight_kg > 0.0 && s.reps > 0)
}

/// Drives one exercise through the completion protocol
pub struct CompletionFlow<S> {
    store: S,
    cache: ProgressCache,
    saves: SaveController<S>,
    session: WorkoutSession,
    state: CompletionState,
}

impl<S: EntityStore> CompletionFlow<S> {
    /// Create a flow for one exercise of the given session
    #[must_use]
    pub fn new(
        store: S,
        cache: ProgressCache,
        saves: SaveController<S>,
        session: WorkoutSession,
    ) -> Self {
        Self {
            store,
            cache,
            saves,
            session,
            state: CompletionState::Editing,
        }
    }

    /// Current protocol state
    #[must_use]
    pub const fn state(&self) -> CompletionState {
        self.state
    }

    /// Ask to complete: pure precondition check plus summary for the
    /// confirmation dialog. Mutates nothing in the store.
    ///
    /// # Errors
    ///
    /// Returns a precondition error when no set is completed with weight and
    /// reps; callers keep the completion button inert rather than surfacing
    /// this.
    pub fn request_completion(
        &mut self,
        buffer: &ExerciseEditBuffer,
    ) -> AppResult<CompletionSummary> {
        if self.state == CompletionState::Finalized {
            return Err(AppError::precondition_no_completed_sets());
        }
        if !has_valid_completed_set(buffer.sets()) {
            return Err(AppError::precondition_no_completed_sets());
        }
        self.state = CompletionState::RequestComplete;
        Ok(summarize(buffer.sets()))
    }

    /// Back out of a requested completion
    pub fn cancel_request(&mut self) {
        if self.state == CompletionState::RequestComplete {
            self.state = CompletionState::Editing;
        }
    }

    /// Finalize the exercise: flush pending saves, normalize, then perform
    /// the dual write under an optimistic cache update.
    ///
    /// On any write failure the cache snapshot is restored, completion flags
    /// are reverted locally (entered numbers kept), and the flow returns to
    /// `Editing` with a retryable error.
    pub async fn complete_exercise(
        &mut self,
        buffer: &mut ExerciseEditBuffer,
        display_unit: WeightUnit,
    ) -> AppResult<CompletionOutcome> {
        if !matches!(
            self.state,
            CompletionState::Editing | CompletionState::RequestComplete
        ) {
            return Err(AppError::precondition_no_completed_sets());
        }
        if !has_valid_completed_set(buffer.sets()) {
            return Err(AppError::precondition_no_completed_sets());
        }

        // Outstanding debounced edits must hit the store before finalizing
        self.saves.flush(buffer.session_exercise_id()).await;

        let mut normalized = buffer.sets().to_vec();
        normalize_sets(&mut normalized);
        let summary = summarize(&normalized);

        // Manual/cardio sessions have no weekly schedule to advance; they
        // skip the optimistic progress patch but keep the dual-write path
        let patch = if self.session.kind.advances_schedule() {
            let cached = self.cache.get_cached_progress().await;
            Some(ProgressPatch {
                completed_exercises: Some(cached.completed_exercises + 1),
                completed_sets: Some(cached.completed_sets + summary.completed_sets),
                last_completed_exercise_id: Some(Some(buffer.session_exercise_id())),
                ..ProgressPatch::default()
            })
        } else {
            None
        };

        self.state = CompletionState::Persisting;
        let entry = log_entry_from_sets(&normalized, display_unit);
        let commit = self.commit(buffer, &normalized, &entry);
        let result = with_optimistic_update(&self.cache, patch, commit).await;

        match result {
            Ok(()) => {
                buffer.apply_sets(normalized);
                buffer.set_read_only(true);
                self.state = CompletionState::Finalized;
                let session_finalized = self.maybe_finalize_session().await;
                debug!(exercise = %buffer.session_exercise_id(), "exercise finalized");
                Ok(CompletionOutcome {
                    summary,
                    session_finalized,
                    navigate: true,
                })
            }
            Err(error) => {
                // Sets stay unmarked-complete but entered numbers intact
                buffer.revert_completions();
                self.state = CompletionState::Editing;
                Err(
                    AppError::transient_write(
                        "Failed to Save - check your connection and try again",
                    )
                    .with_source(error),
                )
            }
        }
    }

    /// The sequential dual write: legacy log first, then normalized store
    async fn commit(
        &self,
        buffer: &ExerciseEditBuffer,
        normalized: &[SessionSet],
        entry: &ExerciseLogEntry,
    ) -> AppResult<()> {
        self.store
            .upsert_today_exercise_log(self.session.user_id, buffer.exercise_id(), entry)
            .await?;
        self.store
            .update_exercise_status(
                self.session.id,
                buffer.session_exercise_id(),
                ExerciseStatus::Completed,
            )
            .await?;
        for set in normalized {
            self.store.upsert_set(set).await?;
        }
        Ok(())
    }

    /// Finalize the session row once every exercise slot is completed.
    ///
    /// Bookkeeping only: a failure here leaves the exercise finalized and is
    /// retried when the next exercise completes.
    async fn maybe_finalize_session(&self) -> bool {
        let detail = match self
            .store
            .get_session_with_exercises_and_sets(self.session.id)
            .await
        {
            Ok(Some(detail)) => detail,
            Ok(None) => return false,
            Err(error) => {
                warn!(%error, "could not check session for finalization");
                return false;
            }
        };
        let all_done = !detail.exercises.is_empty()
            && detail
                .exercises
                .iter()
                .all(|e| e.exercise.status == ExerciseStatus::Completed);
        if !all_done {
            return false;
        }

        let now = Utc::now();
        let total_volume: f64 = detail
            .exercises
            .iter()
            .flat_map(|e| &e.sets)
            .filter(|s| s.is_completed)
            .map(SessionSet::volume)
            .sum();
        let duration = (now - detail.session.started_at).num_seconds().max(0);
        match self
            .store
            .update_session_status(
                self.session.id,
                SessionStatus::Completed,
                Some(now),
                Some(duration),
                Some(total_volume),
            )
            .await
        {
            Ok(()) => true,
            Err(error) => {
                warn!(%error, "session finalization write failed");
                false
            }
        }
    }
}

fn log_entry_from_sets(sets: &[SessionSet], unit: WeightUnit) -> ExerciseLogEntry {
    let convert = |kg: f64| match unit {
        WeightUnit::Kg => kg,
        WeightUnit::Lb => crate::constants::units::kg_to_lb(kg),
    };
    ExerciseLogEntry {
        date: Utc::now().date_naive(),
        unit,
        sets: sets
            .iter()
            .map(|s| LogSet {
                weight: convert(s.weight_kg),
                reps: s.reps,
                is_completed: s.is_completed,
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn set(weight: f64, reps: u32, completed: bool) -> SessionSet {
        SessionSet {
            id: Uuid::new_v4(),
            session_exercise_id: Uuid::new_v4(),
            set_number: 1,
            weight_kg: weight,
            reps,
            is_completed: completed,
        }
    }

    #[test]
    fn test_normalize_floors_zero_reps() {
        let mut sets = vec![set(60.0, 8, true), set(0.0, 0, false), set(65.0, 6, true)];
        normalize_sets(&mut sets);
        assert_eq!(sets[0].reps, 8);
        assert_eq!(sets[1].reps, 1);
        assert!((sets[1].weight_kg).abs() < f64::EPSILON);
        assert_eq!(sets[2].reps, 6);
    }

    #[test]
    fn test_summary_percentage() {
        let sets = vec![set(60.0, 8, true), set(60.0, 8, false), set(60.0, 8, true)];
        let summary = summarize(&sets);
        assert_eq!(summary.completed_sets, 2);
        assert_eq!(summary.total_sets, 3);
        assert!((summary.percent - 66.666_666_666_666_66).abs() < 0.01);
    }

    #[test]
    fn test_precondition_requires_valid_completed_set() {
        assert!(!has_valid_completed_set(&[set(0.0, 8, true)]));
        assert!(!has_valid_completed_set(&[set(60.0, 0, true)]));
        assert!(!has_valid_completed_set(&[set(60.0, 8, false)]));
        assert!(has_valid_completed_set(&[set(60.0, 8, true)]));
    }

    #[test]
    fn test_log_entry_unit_conversion() {
        let entry = log_entry_from_sets(&[set(100.0, 5, true)], WeightUnit::Lb);
        assert_eq!(entry.unit, WeightUnit::Lb);
        assert!((entry.sets[0].weight - 220.462_262_18).abs() < 0.01);
    }
}
