// ABOUTME: Entity store abstraction for session, exercise, set, and legacy log persistence
// ABOUTME: Pluggable backends: in-memory and SQLite, selected through the factory
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Setsync Project

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use uuid::Uuid;

use crate::errors::AppResult;
use crate::models::{
    ExerciseLogEntry, ExerciseStatus, SessionDetail, SessionExercise, SessionSet, SessionStatus,
    WorkoutSession,
};

pub mod factory;
pub mod memory;
pub mod sqlite;

/// Core entity store abstraction
///
/// All calls are asynchronous and may fail with a transport error; callers
/// treat any failure identically. Implementations must uphold two data
/// invariants on behalf of callers:
///
/// - `get_active_session` deterministically returns the most recently started
///   row when corrupt data holds more than one `IN_PROGRESS` session.
/// - `update_exercise_status` never regresses a status; a backward transition
///   is logged and ignored rather than applied.
#[async_trait]
pub trait EntityStore: Send + Sync + Clone + 'static {
    /// Persist a newly started session
    async fn create_session(&self, session: &WorkoutSession) -> AppResult<()>;

    /// Get the user's in-progress session, if any
    async fn get_active_session(&self, user_id: Uuid) -> AppResult<Option<WorkoutSession>>;

    /// Load a session with all exercise slots and sets
    async fn get_session_with_exercises_and_sets(
        &self,
        session_id: Uuid,
    ) -> AppResult<Option<SessionDetail>>;

    /// Update a session's lifecycle status and completion bookkeeping
    async fn update_session_status(
        &self,
        session_id: Uuid,
        status: SessionStatus,
        completed_at: Option<DateTime<Utc>>,
        duration_seconds: Option<i64>,
        total_volume: Option<f64>,
    ) -> AppResult<()>;

    /// Delete a session and cascade to its exercises and sets
    async fn delete_session(&self, session_id: Uuid) -> AppResult<()>;

    /// Persist a batch of exercise slots
    async fn create_exercises(&self, exercises: &[SessionExercise]) -> AppResult<()>;

    /// Update an exercise slot's status (forward-only)
    async fn update_exercise_status(
        &self,
        session_id: Uuid,
        session_exercise_id: Uuid,
        status: ExerciseStatus,
    ) -> AppResult<()>;

    /// Persist a batch of sets
    async fn create_sets(&self, sets: &[SessionSet]) -> AppResult<()>;

    /// Load an exercise slot's sets, ordered by set number
    async fn get_sets(&self, session_exercise_id: Uuid) -> AppResult<Vec<SessionSet>>;

    /// Insert or update one set's weight/reps/completion by ID
    async fn upsert_set(&self, set: &SessionSet) -> AppResult<()>;

    /// Replace an exercise slot's full set list atomically.
    ///
    /// Set removal and renumbering only persist through this; a per-set
    /// upsert cannot express a deleted row.
    async fn replace_sets(
        &self,
        session_exercise_id: Uuid,
        sets: &[SessionSet],
    ) -> AppResult<()>;

    /// Read the user's legacy aggregate progress blob (Null when absent)
    async fn get_user_progress_blob(&self, user_id: Uuid) -> AppResult<Value>;

    /// Replace the user's legacy aggregate progress blob
    async fn put_user_progress_blob(&self, user_id: Uuid, blob: Value) -> AppResult<()>;

    /// Upsert one exercise's log entry for its date, preserving all sibling
    /// keys of the aggregate blob
    async fn upsert_today_exercise_log(
        &self,
        user_id: Uuid,
        exercise_id: Uuid,
        entry: &ExerciseLogEntry,
    ) -> AppResult<()>;
}
