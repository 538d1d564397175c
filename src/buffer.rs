// ABOUTME: Per-exercise edit buffer holding mutable set state during a workout
// ABOUTME: Clamps edits, emits rest-timer commands, and mirrors a live workout summary
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Setsync Project

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use tracing::debug;
use uuid::Uuid;

use crate::config::EngineConfig;
use crate::models::{SessionExercise, SessionSet, WeightUnit};
use crate::save::SavePayload;
use crate::timer::TimerCommand;

/// Coarse workout-wide completion mirror
///
/// Every buffer mutation updates this synchronously so a concurrently
/// visible summary (the "sets completed / total" banner) never waits on
/// persistence. Advisory only; the entity store stays authoritative.
#[derive(Clone, Default)]
pub struct WorkoutSummary {
    inner: Arc<RwLock<HashMap<Uuid, (u32, u32)>>>,
}

impl WorkoutSummary {
    /// Create an empty summary
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one exercise's (completed, total) set counts
    pub fn record(&self, session_exercise_id: Uuid, completed: u32, total: u32) {
        let Ok(mut inner) = self.inner.write() else {
            return;
        };
        inner.insert(session_exercise_id, (completed, total));
    }

    /// Summed (completed, total) set counts across the workout
    #[must_use]
    pub fn totals(&self) -> (u32, u32) {
        let Ok(inner) = self.inner.read() else {
            return (0, 0);
        };
        inner
            .values()
            .fold((0, 0), |(c, t), (completed, total)| (c + completed, t + total))
    }
}

/// Mutable, client-local set state for one exercise slot
///
/// The buffer is the authoritative intent until a save commits; the entity
/// store's acknowledgement then becomes authoritative. Out-of-range edits
/// are clamped silently, never surfaced as errors. All mutations are no-ops
/// in read-only mode (viewing historical or finished workouts).
///
/// Mutations only mark the buffer dirty; persistence happens when the owner
/// hands the payload to the save controller, normally via
/// [`WorkoutEngine::edit_and_save`](crate::engine::WorkoutEngine::edit_and_save).
pub struct ExerciseEditBuffer {
    session_id: Uuid,
    session_exercise_id: Uuid,
    exercise_id: Uuid,
    sets: Vec<SessionSet>,
    dirty: bool,
    read_only: bool,
    config: EngineConfig,
    summary: WorkoutSummary,
}

impl ExerciseEditBuffer {
    /// Build a buffer from an exercise slot's persisted state
    #[must_use]
    pub fn new(
        exercise: &SessionExercise,
        sets: Vec<SessionSet>,
        config: EngineConfig,
        summary: WorkoutSummary,
    ) -> Self {
        let read_only = exercise.status == crate::models::ExerciseStatus::Completed;
        let buffer = Self {
            session_id: exercise.session_id,
            session_exercise_id: exercise.id,
            exercise_id: exercise.exercise_id,
            sets,
            dirty: false,
            read_only,
            config,
            summary,
        };
        buffer.mirror();
        buffer
    }

    /// The exercise slot this buffer edits
    #[must_use]
    pub const fn session_exercise_id(&self) -> Uuid {
        self.session_exercise_id
    }

    /// The catalog exercise referenced by the slot
    #[must_use]
    pub const fn exercise_id(&self) -> Uuid {
        self.exercise_id
    }

    /// The owning session
    #[must_use]
    pub const fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Current set state, ordered by set number
    #[must_use]
    pub fn sets(&self) -> &[SessionSet] {
        &self.sets
    }

    /// Whether unsaved edits are outstanding
    #[must_use]
    pub const fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Whether the buffer rejects mutations
    #[must_use]
    pub const fn is_read_only(&self) -> bool {
        self.read_only
    }

    /// Switch the buffer into (or out of) read-only mode
    pub fn set_read_only(&mut self, read_only: bool) {
        self.read_only = read_only;
    }

    /// (completed, total) set counts
    #[must_use]
    pub fn completed_counts(&self) -> (u32, u32) {
        let completed = self.sets.iter().filter(|s| s.is_completed).count();
        (completed as u32, self.sets.len() as u32)
    }

    /// Set a set's weight, converting from the display unit and clamping
    ///
    /// Returns true if the buffer changed.
    pub fn set_weight(&mut self, set_id: Uuid, value: f64, unit: WeightUnit) -> bool {
        if self.read_only {
            return false;
        }
        let max = self.config.max_weight_kg;
        let kg = unit.to_kg(value);
        let clamped = if kg.is_finite() { kg.clamp(0.0, max) } else { 0.0 };
        let Some(set) = self.sets.iter_mut().find(|s| s.id == set_id) else {
            return false;
        };
        if (set.weight_kg - clamped).abs() < f64::EPSILON {
            return false;
        }
        set.weight_kg = clamped;
        self.mark_dirty();
        true
    }

    /// Set a set's rep count, clamping into range
    ///
    /// Returns true if the buffer changed.
    pub fn set_reps(&mut self, set_id: Uuid, value: u32) -> bool {
        if self.read_only {
            return false;
        }
        let clamped = value.min(self.config.max_reps);
        let Some(set) = self.sets.iter_mut().find(|s| s.id == set_id) else {
            return false;
        };
        if set.reps == clamped {
            return false;
        }
        set.reps = clamped;
        self.mark_dirty();
        true
    }

    /// Flip a set's completion flag
    ///
    /// Completing a set that has weight and reps starts the rest timer;
    /// un-completing cancels any active countdown.
    pub fn toggle_set_completion(&mut self, set_id: Uuid) -> Option<TimerCommand> {
        if self.read_only {
            return None;
        }
        let Some(set) = self.sets.iter_mut().find(|s| s.id == set_id) else {
            return None;
        };
        set.is_completed = !set.is_completed;
        let command = if set.is_completed {
            (set.weight_kg > 0.0 && set.reps > 0).then_some(TimerCommand::Start)
        } else {
            Some(TimerCommand::Cancel)
        };
        self.mark_dirty();
        command
    }

    /// Append a placeholder set; bounded by the configured maximum
    ///
    /// Returns the new set's ID, or None if at capacity or read-only.
    pub fn add_set(&mut self, target_reps: u32) -> Option<Uuid> {
        if self.read_only || self.sets.len() >= self.config.max_sets {
            return None;
        }
        let set_number = self.sets.len() as u32 + 1;
        let set = SessionSet::placeholder(self.session_exercise_id, set_number, target_reps);
        let id = set.id;
        self.sets.push(set);
        self.mark_dirty();
        Some(id)
    }

    /// Remove a set by ID, or the last set when no ID is given
    ///
    /// Bounded by the configured minimum. Returns true if a set was removed.
    pub fn remove_set(&mut self, set_id: Option<Uuid>) -> bool {
        if self.read_only || self.sets.len() <= self.config.min_sets {
            return false;
        }
        let removed = match set_id {
            Some(id) => {
                let Some(index) = self.sets.iter().position(|s| s.id == id) else {
                    return false;
                };
                self.sets.remove(index);
                true
            }
            None => self.sets.pop().is_some(),
        };
        if removed {
            // Keep set numbers 1-based and gapless; order never changes
            for (index, set) in self.sets.iter_mut().enumerate() {
                set.set_number = index as u32 + 1;
            }
            self.mark_dirty();
        }
        removed
    }

    /// Build the save payload for the controller, clearing the dirty flag
    pub fn take_payload(&mut self) -> Option<SavePayload> {
        if !self.dirty {
            return None;
        }
        self.dirty = false;
        Some(self.payload())
    }

    /// Current state as a save payload, without touching the dirty flag
    #[must_use]
    pub fn payload(&self) -> SavePayload {
        SavePayload {
            session_exercise_id: self.session_exercise_id,
            sets: self.sets.clone(),
        }
    }

    /// Replace local state with authoritative store state (save-error reload)
    pub fn apply_authoritative(&mut self, sets: Vec<SessionSet>) {
        debug!(
            exercise = %self.session_exercise_id,
            "replacing local edits with authoritative store state"
        );
        self.sets = sets;
        self.dirty = false;
        self.mirror();
    }

    /// Clear every completion flag, keeping entered numbers (rollback path)
    pub fn revert_completions(&mut self) {
        for set in &mut self.sets {
            set.is_completed = false;
        }
        self.mirror();
    }

    /// Overwrite local sets after a successful finalize
    pub fn apply_sets(&mut self, sets: Vec<SessionSet>) {
        self.sets = sets;
        self.dirty = false;
        self.mirror();
    }

    fn mark_dirty(&mut self) {
        self.dirty = true;
        self.mirror();
    }

    fn mirror(&self) {
        let (completed, total) = self.completed_counts();
        self.summary
            .record(self.session_exercise_id, completed, total);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExerciseStatus;

    fn test_exercise() -> SessionExercise {
        SessionExercise {
            id: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
            exercise_id: Uuid::new_v4(),
            display_name: "Bench Press".to_owned(),
            sort_order: 0,
            status: ExerciseStatus::InProgress,
            target_sets: 3,
            target_reps: 8,
            rest_seconds: 90,
        }
    }

    fn test_buffer() -> ExerciseEditBuffer {
        let exercise = test_exercise();
        let sets = (1..=3)
            .map(|n| SessionSet::placeholder(exercise.id, n, 8))
            .collect();
        ExerciseEditBuffer::new(
            &exercise,
            sets,
            EngineConfig::default(),
            WorkoutSummary::new(),
        )
    }

    #[test]
    fn test_weight_clamped_to_bounds() {
        let mut buffer = test_buffer();
        let set_id = buffer.sets()[0].id;

        buffer.set_weight(set_id, 500.0, WeightUnit::Kg);
        assert!((buffer.sets()[0].weight_kg - 300.0).abs() < f64::EPSILON);

        buffer.set_weight(set_id, -10.0, WeightUnit::Kg);
        assert!((buffer.sets()[0].weight_kg).abs() < f64::EPSILON);
    }

    #[test]
    fn test_weight_entered_in_pounds_converts() {
        let mut buffer = test_buffer();
        let set_id = buffer.sets()[0].id;

        buffer.set_weight(set_id, 220.462_262_18, WeightUnit::Lb);
        assert!((buffer.sets()[0].weight_kg - 100.0).abs() < 0.1);
    }

    #[test]
    fn test_reps_clamped() {
        let mut buffer = test_buffer();
        let set_id = buffer.sets()[0].id;
        buffer.set_reps(set_id, 200);
        assert_eq!(buffer.sets()[0].reps, 50);
    }

    #[test]
    fn test_toggle_emits_timer_commands() {
        let mut buffer = test_buffer();
        let set_id = buffer.sets()[0].id;

        // Empty set completed: no timer
        assert_eq!(buffer.toggle_set_completion(set_id), None);
        assert_eq!(buffer.toggle_set_completion(set_id), Some(TimerCommand::Cancel));

        buffer.set_weight(set_id, 60.0, WeightUnit::Kg);
        buffer.set_reps(set_id, 8);
        assert_eq!(buffer.toggle_set_completion(set_id), Some(TimerCommand::Start));
        assert_eq!(buffer.toggle_set_completion(set_id), Some(TimerCommand::Cancel));
    }

    #[test]
    fn test_set_count_bounds() {
        let mut buffer = test_buffer();
        for _ in 0..10 {
            buffer.add_set(8);
        }
        assert_eq!(buffer.sets().len(), 8, "bounded by MAX_SETS");

        for _ in 0..10 {
            buffer.remove_set(None);
        }
        assert_eq!(buffer.sets().len(), 1, "bounded by MIN_SETS");
    }

    #[test]
    fn test_remove_renumbers_sets() {
        let mut buffer = test_buffer();
        let middle = buffer.sets()[1].id;
        assert!(buffer.remove_set(Some(middle)));
        let numbers: Vec<u32> = buffer.sets().iter().map(|s| s.set_number).collect();
        assert_eq!(numbers, vec![1, 2]);
    }

    #[test]
    fn test_read_only_mutations_are_noops() {
        let mut buffer = test_buffer();
        buffer.set_read_only(true);
        let set_id = buffer.sets()[0].id;

        assert!(!buffer.set_weight(set_id, 60.0, WeightUnit::Kg));
        assert!(!buffer.set_reps(set_id, 5));
        assert_eq!(buffer.toggle_set_completion(set_id), None);
        assert_eq!(buffer.add_set(8), None);
        assert!(!buffer.remove_set(None));
        assert!(!buffer.is_dirty());
    }

    #[test]
    fn test_mutations_mirror_summary() {
        let exercise = test_exercise();
        let summary = WorkoutSummary::new();
        let sets = (1..=3)
            .map(|n| SessionSet::placeholder(exercise.id, n, 8))
            .collect();
        let mut buffer = ExerciseEditBuffer::new(
            &exercise,
            sets,
            EngineConfig::default(),
            summary.clone(),
        );
        assert_eq!(summary.totals(), (0, 3));

        let set_id = buffer.sets()[0].id;
        buffer.set_weight(set_id, 60.0, WeightUnit::Kg);
        buffer.set_reps(set_id, 8);
        buffer.toggle_set_completion(set_id);
        assert_eq!(summary.totals(), (1, 3));
    }

    #[test]
    fn test_take_payload_clears_dirty() {
        let mut buffer = test_buffer();
        assert!(buffer.take_payload().is_none(), "clean buffer has no payload");

        let set_id = buffer.sets()[0].id;
        buffer.set_reps(set_id, 10);
        let payload = buffer.take_payload().expect("dirty buffer yields payload");
        assert_eq!(payload.sets[0].reps, 10);
        assert!(!buffer.is_dirty());
    }
}
