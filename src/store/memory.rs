// ABOUTME: In-memory entity store for tests and embedded use
// ABOUTME: Shared-state HashMaps behind a tokio RwLock, with write failure injection
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Setsync Project

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::warn;
use uuid::Uuid;

use super::EntityStore;
use crate::errors::{AppError, AppResult};
use crate::models::{
    upsert_entry_in_blob, ExerciseDetail, ExerciseLogEntry, ExerciseStatus, SessionDetail,
    SessionExercise, SessionSet, SessionStatus, WorkoutSession,
};

#[derive(Default)]
struct MemoryInner {
    sessions: HashMap<Uuid, WorkoutSession>,
    exercises: HashMap<Uuid, SessionExercise>,
    sets: HashMap<Uuid, SessionSet>,
    blobs: HashMap<Uuid, Value>,
}

/// In-memory entity store
///
/// Backs unit and integration tests, and doubles as the storage for fully
/// offline embedded use. Cloning yields a handle to the same state. Writes
/// can be artificially delayed or failed to exercise the save controller's
/// in-flight and rollback paths.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<MemoryInner>>,
    fail_writes: Arc<AtomicBool>,
    write_delay_ms: Arc<AtomicU64>,
    upsert_set_calls: Arc<AtomicUsize>,
    replace_sets_calls: Arc<AtomicUsize>,
}

impl MemoryStore {
    /// Create an empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent write fail with a store error
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Delay every subsequent write, simulating network latency
    pub fn set_write_delay(&self, delay: Duration) {
        self.write_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// Number of `upsert_set` calls observed since creation
    #[must_use]
    pub fn upsert_set_calls(&self) -> usize {
        self.upsert_set_calls.load(Ordering::SeqCst)
    }

    /// Number of `replace_sets` calls observed since creation
    #[must_use]
    pub fn replace_sets_calls(&self) -> usize {
        self.replace_sets_calls.load(Ordering::SeqCst)
    }

    async fn write_gate(&self) -> AppResult<()> {
        let delay_ms = self.write_delay_ms.load(Ordering::SeqCst);
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms)).await;
        }
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(AppError::store("injected write failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn create_session(&self, session: &WorkoutSession) -> AppResult<()> {
        self.write_gate().await?;
        self.inner
            .write()
            .await
            .sessions
            .insert(session.id, session.clone());
        Ok(())
    }

    async fn get_active_session(&self, user_id: Uuid) -> AppResult<Option<WorkoutSession>> {
        let inner = self.inner.read().await;
        let mut active: Vec<&WorkoutSession> = inner
            .sessions
            .values()
            .filter(|s| s.user_id == user_id && s.status == SessionStatus::InProgress)
            .collect();
        if active.len() > 1 {
            warn!(
                user_id = %user_id,
                count = active.len(),
                "multiple IN_PROGRESS sessions found, picking most recent"
            );
        }
        active.sort_by_key(|s| s.started_at);
        Ok(active.last().map(|s| (*s).clone()))
    }

    async fn get_session_with_exercises_and_sets(
        &self,
        session_id: Uuid,
    ) -> AppResult<Option<SessionDetail>> {
        let inner = self.inner.read().await;
        let Some(session) = inner.sessions.get(&session_id).cloned() else {
            return Ok(None);
        };
        let mut exercises: Vec<SessionExercise> = inner
            .exercises
            .values()
            .filter(|e| e.session_id == session_id)
            .cloned()
            .collect();
        exercises.sort_by_key(|e| e.sort_order);
        let exercises = exercises
            .into_iter()
            .map(|exercise| {
                let mut sets: Vec<SessionSet> = inner
                    .sets
                    .values()
                    .filter(|s| s.session_exercise_id == exercise.id)
                    .cloned()
                    .collect();
                sets.sort_by_key(|s| s.set_number);
                ExerciseDetail { exercise, sets }
            })
            .collect();
        Ok(Some(SessionDetail { session, exercises }))
    }

    async fn update_session_status(
        &self,
        session_id: Uuid,
        status: SessionStatus,
        completed_at: Option<DateTime<Utc>>,
        duration_seconds: Option<i64>,
        total_volume: Option<f64>,
    ) -> AppResult<()> {
        self.write_gate().await?;
        let mut inner = self.inner.write().await;
        let session = inner
            .sessions
            .get_mut(&session_id)
            .ok_or_else(|| AppError::not_found("Session", session_id))?;
        session.status = status;
        session.completed_at = completed_at;
        session.duration_seconds = duration_seconds;
        session.total_volume = total_volume;
        Ok(())
    }

    async fn delete_session(&self, session_id: Uuid) -> AppResult<()> {
        self.write_gate().await?;
        let mut inner = self.inner.write().await;
        inner.sessions.remove(&session_id);
        let exercise_ids: Vec<Uuid> = inner
            .exercises
            .values()
            .filter(|e| e.session_id == session_id)
            .map(|e| e.id)
            .collect();
        inner.exercises.retain(|_, e| e.session_id != session_id);
        inner
            .sets
            .retain(|_, s| !exercise_ids.contains(&s.session_exercise_id));
        Ok(())
    }

    async fn create_exercises(&self, exercises: &[SessionExercise]) -> AppResult<()> {
        self.write_gate().await?;
        let mut inner = self.inner.write().await;
        for exercise in exercises {
            inner.exercises.insert(exercise.id, exercise.clone());
        }
        Ok(())
    }

    async fn update_exercise_status(
        &self,
        session_id: Uuid,
        session_exercise_id: Uuid,
        status: ExerciseStatus,
    ) -> AppResult<()> {
        self.write_gate().await?;
        let mut inner = self.inner.write().await;
        let exercise = inner
            .exercises
            .get_mut(&session_exercise_id)
            .filter(|e| e.session_id == session_id)
            .ok_or_else(|| AppError::not_found("SessionExercise", session_exercise_id))?;
        if !exercise.status.can_transition_to(status) {
            warn!(
                exercise_id = %session_exercise_id,
                from = exercise.status.as_str(),
                to = status.as_str(),
                "ignoring backward exercise status transition"
            );
            return Ok(());
        }
        exercise.status = status;
        Ok(())
    }

    async fn create_sets(&self, sets: &[SessionSet]) -> AppResult<()> {
        self.write_gate().await?;
        let mut inner = self.inner.write().await;
        for set in sets {
            inner.sets.insert(set.id, set.clone());
        }
        Ok(())
    }

    async fn get_sets(&self, session_exercise_id: Uuid) -> AppResult<Vec<SessionSet>> {
        let inner = self.inner.read().await;
        let mut sets: Vec<SessionSet> = inner
            .sets
            .values()
            .filter(|s| s.session_exercise_id == session_exercise_id)
            .cloned()
            .collect();
        sets.sort_by_key(|s| s.set_number);
        Ok(sets)
    }

    async fn upsert_set(&self, set: &SessionSet) -> AppResult<()> {
        self.upsert_set_calls.fetch_add(1, Ordering::SeqCst);
        self.write_gate().await?;
        self.inner.write().await.sets.insert(set.id, set.clone());
        Ok(())
    }

    async fn replace_sets(
        &self,
        session_exercise_id: Uuid,
        sets: &[SessionSet],
    ) -> AppResult<()> {
        self.replace_sets_calls.fetch_add(1, Ordering::SeqCst);
        self.write_gate().await?;
        let mut inner = self.inner.write().await;
        inner
            .sets
            .retain(|_, s| s.session_exercise_id != session_exercise_id);
        for set in sets {
            inner.sets.insert(set.id, set.clone());
        }
        Ok(())
    }

    async fn get_user_progress_blob(&self, user_id: Uuid) -> AppResult<Value> {
        let inner = self.inner.read().await;
        Ok(inner.blobs.get(&user_id).cloned().unwrap_or(Value::Null))
    }

    async fn put_user_progress_blob(&self, user_id: Uuid, blob: Value) -> AppResult<()> {
        self.write_gate().await?;
        self.inner.write().await.blobs.insert(user_id, blob);
        Ok(())
    }

    async fn upsert_today_exercise_log(
        &self,
        user_id: Uuid,
        exercise_id: Uuid,
        entry: &ExerciseLogEntry,
    ) -> AppResult<()> {
        self.write_gate().await?;
        let mut inner = self.inner.write().await;
        let blob = inner.blobs.entry(user_id).or_insert(Value::Null);
        upsert_entry_in_blob(blob, &exercise_id.to_string(), entry)
    }
}
