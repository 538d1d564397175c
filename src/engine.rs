// ABOUTME: Workout engine: session lifecycle, identity gating, and component wiring
// ABOUTME: Starts/resumes sessions, seeds the read cache and progression suggestions
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Setsync Project

use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use crate::buffer::{ExerciseEditBuffer, WorkoutSummary};
use crate::cache::{ProgressCache, SessionProgress};
use crate::config::EngineConfig;
use crate::errors::AppResult;
use crate::intelligence::{ProgressionAnalyzer, ProgressionReport};
use crate::models::{
    ExerciseStatus, ExerciseTemplate, SessionDetail, SessionExercise, SessionKind, SessionSet,
    SessionStatus, WorkoutSession,
};
use crate::protocol::CompletionFlow;
use crate::save::SaveController;
use crate::store::EntityStore;
use crate::timer::RestTimer;

/// Top-level engine for one user's workout editing
///
/// Holds the identity context: without a current user every read answers
/// `None`/empty and every write is a no-op, by contract.
pub struct WorkoutEngine<S> {
    store: S,
    cache: ProgressCache,
    saves: SaveController<S>,
    summary: WorkoutSummary,
    analyzer: ProgressionAnalyzer,
    config: EngineConfig,
    user_id: Option<Uuid>,
}

impl<S: EntityStore> WorkoutEngine<S> {
    /// Create an engine over the given store
    #[must_use]
    pub fn new(store: S, config: EngineConfig) -> Self {
        let cache = ProgressCache::new(config.cache_max_age);
        let saves = SaveController::new(store.clone(), config.debounce);
        Self {
            store,
            cache,
            saves,
            summary: WorkoutSummary::new(),
            analyzer: ProgressionAnalyzer::new(config.clone()),
            config,
            user_id: None,
        }
    }

    /// Set or clear the current user
    pub fn set_identity(&mut self, user_id: Option<Uuid>) {
        self.user_id = user_id;
    }

    /// The shared read cache, for sibling screens
    #[must_use]
    pub fn cache(&self) -> &ProgressCache {
        &self.cache
    }

    /// The save controller, for buffer owners
    #[must_use]
    pub fn saves(&self) -> &SaveController<S> {
        &self.saves
    }

    /// The live workout summary mirror
    #[must_use]
    pub fn summary(&self) -> &WorkoutSummary {
        &self.summary
    }

    /// Start a session from a catalog exercise list, or resume the user's
    /// in-progress one.
    ///
    /// The single-active invariant is enforced here: when an `IN_PROGRESS`
    /// session already exists it is resumed, never duplicated. A new session
    /// gets one exercise slot per template and a batch of placeholder sets
    /// (count = target sets, reps defaulted to the target).
    pub async fn start_session(
        &self,
        display_name: &str,
        kind: SessionKind,
        source_template_id: Option<Uuid>,
        templates: &[ExerciseTemplate],
    ) -> AppResult<Option<SessionDetail>> {
        let Some(user_id) = self.user_id else {
            debug!("start_session without identity is a no-op");
            return Ok(None);
        };

        if let Some(active) = self.store.get_active_session(user_id).await? {
            info!(session = %active.id, "resuming in-progress session");
            let detail = self
                .store
                .get_session_with_exercises_and_sets(active.id)
                .await?;
            if let Some(detail) = &detail {
                self.seed_cache(detail).await;
            }
            return Ok(detail);
        }

        let session = WorkoutSession::start(user_id, display_name, kind, source_template_id);
        self.store.create_session(&session).await?;

        let exercises: Vec<SessionExercise> = templates
            .iter()
            .enumerate()
            .map(|(index, template)| SessionExercise {
                id: Uuid::new_v4(),
                session_id: session.id,
                exercise_id: template.exercise_id,
                display_name: template.name.clone(),
                sort_order: index as i32,
                status: ExerciseStatus::NotStarted,
                target_sets: template.target_sets,
                target_reps: template.target_reps,
                rest_seconds: template.rest_seconds,
            })
            .collect();
        self.store.create_exercises(&exercises).await?;

        let sets: Vec<SessionSet> = exercises
            .iter()
            .flat_map(|exercise| {
                (1..=exercise.target_sets)
                    .map(|n| SessionSet::placeholder(exercise.id, n, exercise.target_reps))
                    .collect::<Vec<_>>()
            })
            .collect();
        self.store.create_sets(&sets).await?;

        info!(session = %session.id, exercises = exercises.len(), "session started");
        let detail = self
            .store
            .get_session_with_exercises_and_sets(session.id)
            .await?;
        if let Some(detail) = &detail {
            self.seed_cache(detail).await;
        }
        Ok(detail)
    }

    /// Load the user's in-progress session, if any
    pub async fn load_active_session(&self) -> AppResult<Option<SessionDetail>> {
        let Some(user_id) = self.user_id else {
            return Ok(None);
        };
        let Some(active) = self.store.get_active_session(user_id).await? else {
            return Ok(None);
        };
        let detail = self
            .store
            .get_session_with_exercises_and_sets(active.id)
            .await?;
        if let Some(detail) = &detail {
            self.seed_cache(detail).await;
        }
        Ok(detail)
    }

    /// Build an edit buffer for one exercise slot of a loaded session
    #[must_use]
    pub fn edit_buffer(
        &self,
        exercise: &SessionExercise,
        sets: Vec<SessionSet>,
    ) -> ExerciseEditBuffer {
        ExerciseEditBuffer::new(exercise, sets, self.config.clone(), self.summary.clone())
    }

    /// Rest timer for an exercise slot, honoring its catalog rest override
    #[must_use]
    pub fn rest_timer(&self, exercise: &SessionExercise) -> RestTimer {
        let countdown = if exercise.rest_seconds > 0 {
            Duration::from_secs(u64::from(exercise.rest_seconds))
        } else {
            self.config.rest_timer
        };
        RestTimer::new(countdown)
    }

    /// Schedule a debounced save if the buffer holds unsaved edits
    pub async fn schedule_save(&self, buffer: &mut ExerciseEditBuffer) {
        if let Some(payload) = buffer.take_payload() {
            self.saves.schedule(payload).await;
        }
    }

    /// Apply one buffer mutation and schedule its save in the same call.
    ///
    /// Buffer mutations only mark the buffer dirty; this pairs the edit with
    /// `schedule_save` so no dirty edit is ever left waiting on a follow-up
    /// call the caller forgot.
    pub async fn edit_and_save<R>(
        &self,
        buffer: &mut ExerciseEditBuffer,
        edit: impl FnOnce(&mut ExerciseEditBuffer) -> R,
    ) -> R {
        let result = edit(buffer);
        self.schedule_save(buffer).await;
        result
    }

    /// Build a completion flow for a loaded session
    #[must_use]
    pub fn completion_flow(&self, session: WorkoutSession) -> CompletionFlow<S> {
        CompletionFlow::new(
            self.store.clone(),
            self.cache.clone(),
            self.saves.clone(),
            session,
        )
    }

    /// Progression report for one exercise, seeded on load.
    ///
    /// Reads the legacy history only; malformed blobs analyze as empty.
    pub async fn progression_report(&self, exercise_id: Uuid) -> AppResult<ProgressionReport> {
        let Some(user_id) = self.user_id else {
            return Ok(ProgressionReport::default());
        };
        let blob = self.store.get_user_progress_blob(user_id).await?;
        let history = blob
            .get(exercise_id.to_string())
            .cloned()
            .unwrap_or(Value::Null);
        Ok(self.analyzer.analyze(&history))
    }

    /// Flush any outstanding edits for an exercise (navigation-away path)
    pub async fn flush_exercise(&self, session_exercise_id: Uuid) {
        self.saves.flush(session_exercise_id).await;
    }

    /// Finalize a session explicitly, recording duration and total volume
    /// over its completed sets.
    ///
    /// Returns `false` when there is no identity or no such session.
    pub async fn complete_session(&self, session_id: Uuid) -> AppResult<bool> {
        if self.user_id.is_none() {
            return Ok(false);
        }
        let Some(detail) = self
            .store
            .get_session_with_exercises_and_sets(session_id)
            .await?
        else {
            return Ok(false);
        };
        let now = Utc::now();
        let total_volume: f64 = detail
            .exercises
            .iter()
            .flat_map(|e| &e.sets)
            .filter(|s| s.is_completed)
            .map(SessionSet::volume)
            .sum();
        let duration = (now - detail.session.started_at).num_seconds().max(0);
        self.store
            .update_session_status(
                session_id,
                SessionStatus::Completed,
                Some(now),
                Some(duration),
                Some(total_volume),
            )
            .await?;
        info!(session = %session_id, total_volume, "session completed");
        Ok(true)
    }

    /// Abandon an in-progress session without recording results.
    ///
    /// The row flips to `CANCELLED` so it stops answering the active-session
    /// query and a fresh session can start; set data stays for history. The
    /// read cache is reset since the session it mirrored is gone.
    pub async fn cancel_session(&self, session_id: Uuid) -> AppResult<()> {
        if self.user_id.is_none() {
            return Ok(());
        }
        self.store
            .update_session_status(session_id, SessionStatus::Cancelled, None, None, None)
            .await?;
        self.cache.load(SessionProgress::default()).await;
        info!(session = %session_id, "session cancelled");
        Ok(())
    }

    /// Delete a session at explicit user request, cascading to its
    /// exercises and sets
    pub async fn delete_session(&self, session_id: Uuid) -> AppResult<()> {
        if self.user_id.is_none() {
            return Ok(());
        }
        self.store.delete_session(session_id).await
    }

    async fn seed_cache(&self, detail: &SessionDetail) {
        let total_sets: u32 = detail.exercises.iter().map(|e| e.sets.len() as u32).sum();
        let completed_sets: u32 = detail
            .exercises
            .iter()
            .flat_map(|e| &e.sets)
            .filter(|s| s.is_completed)
            .count() as u32;
        let completed_exercises = detail
            .exercises
            .iter()
            .filter(|e| e.exercise.status == ExerciseStatus::Completed)
            .count() as u32;
        self.cache
            .load(SessionProgress {
                session_id: Some(detail.session.id),
                completed_exercises,
                total_exercises: detail.exercises.len() as u32,
                completed_sets,
                total_sets,
                last_completed_exercise_id: None,
            })
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExerciseStatus;
    use crate::store::memory::MemoryStore;

    fn engine() -> WorkoutEngine<MemoryStore> {
        WorkoutEngine::new(MemoryStore::new(), EngineConfig::default())
    }

    fn slot(rest_seconds: u32) -> SessionExercise {
        SessionExercise {
            id: Uuid::new_v4(),
            session_id: Uuid::new_v4(),
            exercise_id: Uuid::new_v4(),
            display_name: "Bench Press".to_owned(),
            sort_order: 0,
            status: ExerciseStatus::NotStarted,
            target_sets: 3,
            target_reps: 8,
            rest_seconds,
        }
    }

    #[tokio::test]
    async fn test_rest_timer_honors_catalog_override() {
        let engine = engine();
        let timer = engine.rest_timer(&slot(120));
        timer.start().await;
        assert!(timer.remaining().await.expect("running") > Duration::from_secs(100));
    }

    #[tokio::test]
    async fn test_rest_timer_falls_back_to_default() {
        let engine = engine();
        let timer = engine.rest_timer(&slot(0));
        timer.start().await;
        let remaining = timer.remaining().await.expect("running");
        assert!(remaining <= Duration::from_secs(90));
        assert!(remaining > Duration::from_secs(80));
    }

    #[tokio::test]
    async fn test_identity_gate_no_ops() {
        let engine = engine();
        let started = engine
            .start_session("Push Day", SessionKind::Template, None, &[])
            .await
            .expect("no-op succeeds");
        assert!(started.is_none());
        assert!(engine.load_active_session().await.unwrap().is_none());
    }
}
