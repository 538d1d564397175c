// ABOUTME: SQLite entity store backing sessions, exercise slots, sets, and the progress blob
// ABOUTME: TEXT-encoded UUIDs and timestamps; schema created in-place by migrate()
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Setsync Project

//! SQLite entity store implementation
//!
//! Persists sessions, exercise slots, sets, and the legacy per-user progress
//! blob. UUIDs and timestamps are stored as TEXT; schema is created in-place
//! by `migrate()`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite, SqlitePool};
use tracing::{info, warn};
use uuid::Uuid;

use super::EntityStore;
use crate::errors::{AppError, AppResult};
use crate::models::{
    upsert_entry_in_blob, ExerciseDetail, ExerciseLogEntry, ExerciseStatus, SessionDetail,
    SessionExercise, SessionKind, SessionSet, SessionStatus, WorkoutSession,
};

/// SQLite-backed entity store
#[derive(Clone)]
pub struct SqliteStore {
    pool: Pool<Sqlite>,
}

impl SqliteStore {
    /// Connect and run migrations
    pub async fn new(database_url: &str) -> AppResult<Self> {
        // Ensure SQLite creates the database file if it doesn't exist
        let connection_options = if database_url.starts_with("sqlite:") {
            format!("{database_url}?mode=rwc")
        } else {
            database_url.to_owned()
        };
        let pool = SqlitePool::connect(&connection_options).await?;
        let store = Self { pool };
        store.migrate().await?;
        info!("SQLite entity store initialized");
        Ok(store)
    }

    /// Create tables and indexes if they do not exist
    pub async fn migrate(&self) -> AppResult<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS workout_sessions (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                source_template_id TEXT,
                display_name TEXT NOT NULL,
                kind TEXT NOT NULL,
                status TEXT NOT NULL,
                started_at TEXT NOT NULL,
                completed_at TEXT,
                duration_seconds INTEGER,
                total_volume REAL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_sessions_user_status
             ON workout_sessions(user_id, status)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS session_exercises (
                id TEXT PRIMARY KEY,
                session_id TEXT NOT NULL,
                exercise_id TEXT NOT NULL,
                display_name TEXT NOT NULL,
                sort_order INTEGER NOT NULL,
                status TEXT NOT NULL,
                target_sets INTEGER NOT NULL,
                target_reps INTEGER NOT NULL,
                rest_seconds INTEGER NOT NULL,
                UNIQUE(session_id, sort_order)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_exercises_session
             ON session_exercises(session_id)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS session_sets (
                id TEXT PRIMARY KEY,
                session_exercise_id TEXT NOT NULL,
                set_number INTEGER NOT NULL,
                weight_kg REAL NOT NULL,
                reps INTEGER NOT NULL,
                is_completed BOOLEAN NOT NULL DEFAULT 0,
                UNIQUE(session_exercise_id, set_number)
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_sets_exercise
             ON session_sets(session_exercise_id)",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS user_progress (
                user_id TEXT PRIMARY KEY,
                blob TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

fn parse_uuid(value: &str) -> AppResult<Uuid> {
    Uuid::parse_str(value).map_err(|e| AppError::internal("invalid UUID in store").with_source(e))
}

fn parse_datetime(value: &str) -> AppResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| AppError::internal("invalid timestamp in store").with_source(e))
}

fn row_to_session(row: &SqliteRow) -> AppResult<WorkoutSession> {
    let kind: String = row.try_get("kind")?;
    let status: String = row.try_get("status")?;
    let source_template_id: Option<String> = row.try_get("source_template_id")?;
    let started_at: String = row.try_get("started_at")?;
    let completed_at: Option<String> = row.try_get("completed_at")?;
    Ok(WorkoutSession {
        id: parse_uuid(row.try_get::<String, _>("id")?.as_str())?,
        user_id: parse_uuid(row.try_get::<String, _>("user_id")?.as_str())?,
        source_template_id: source_template_id
            .as_deref()
            .map(parse_uuid)
            .transpose()?,
        display_name: row.try_get("display_name")?,
        kind: SessionKind::parse(&kind)
            .ok_or_else(|| AppError::internal(format!("unknown session kind '{kind}'")))?,
        status: SessionStatus::parse(&status)
            .ok_or_else(|| AppError::internal(format!("unknown session status '{status}'")))?,
        started_at: parse_datetime(&started_at)?,
        completed_at: completed_at.as_deref().map(parse_datetime).transpose()?,
        duration_seconds: row.try_get("duration_seconds")?,
        total_volume: row.try_get("total_volume")?,
    })
}

fn row_to_exercise(row: &SqliteRow) -> AppResult<SessionExercise> {
    let status: String = row.try_get("status")?;
    Ok(SessionExercise {
        id: parse_uuid(row.try_get::<String, _>("id")?.as_str())?,
        session_id: parse_uuid(row.try_get::<String, _>("session_id")?.as_str())?,
        exercise_id: parse_uuid(row.try_get::<String, _>("exercise_id")?.as_str())?,
        display_name: row.try_get("display_name")?,
        sort_order: row.try_get("sort_order")?,
        status: ExerciseStatus::parse(&status)
            .ok_or_else(|| AppError::internal(format!("unknown exercise status '{status}'")))?,
        target_sets: u32::try_from(row.try_get::<i64, _>("target_sets")?).unwrap_or(0),
        target_reps: u32::try_from(row.try_get::<i64, _>("target_reps")?).unwrap_or(0),
        rest_seconds: u32::try_from(row.try_get::<i64, _>("rest_seconds")?).unwrap_or(0),
    })
}

fn row_to_set(row: &SqliteRow) -> AppResult<SessionSet> {
    Ok(SessionSet {
        id: parse_uuid(row.try_get::<String, _>("id")?.as_str())?,
        session_exercise_id: parse_uuid(
            row.try_get::<String, _>("session_exercise_id")?.as_str(),
        )?,
        set_number: u32::try_from(row.try_get::<i64, _>("set_number")?).unwrap_or(0),
        weight_kg: row.try_get("weight_kg")?,
        reps: u32::try_from(row.try_get::<i64, _>("reps")?).unwrap_or(0),
        is_completed: row.try_get("is_completed")?,
    })
}

#[async_trait]
impl EntityStore for SqliteStore {
    async fn create_session(&self, session: &WorkoutSession) -> AppResult<()> {
        sqlx::query(
            r"
            INSERT INTO workout_sessions
                (id, user_id, source_template_id, display_name, kind, status,
                 started_at, completed_at, duration_seconds, total_volume)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            ",
        )
        .bind(session.id.to_string())
        .bind(session.user_id.to_string())
        .bind(session.source_template_id.map(|id| id.to_string()))
        .bind(&session.display_name)
        .bind(session.kind.as_str())
        .bind(session.status.as_str())
        .bind(session.started_at.to_rfc3339())
        .bind(session.completed_at.map(|t| t.to_rfc3339()))
        .bind(session.duration_seconds)
        .bind(session.total_volume)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_active_session(&self, user_id: Uuid) -> AppResult<Option<WorkoutSession>> {
        // Corrupt data may hold several IN_PROGRESS rows; pick the most
        // recently started, deterministically.
        let rows = sqlx::query(
            r"
            SELECT * FROM workout_sessions
            WHERE user_id = ?1 AND status = 'IN_PROGRESS'
            ORDER BY started_at DESC
            ",
        )
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        if rows.len() > 1 {
            warn!(
                user_id = %user_id,
                count = rows.len(),
                "multiple IN_PROGRESS sessions found, picking most recent"
            );
        }
        rows.first().map(row_to_session).transpose()
    }

    async fn get_session_with_exercises_and_sets(
        &self,
        session_id: Uuid,
    ) -> AppResult<Option<SessionDetail>> {
        let Some(row) = sqlx::query("SELECT * FROM workout_sessions WHERE id = ?1")
            .bind(session_id.to_string())
            .fetch_optional(&self.pool)
            .await?
        else {
            return Ok(None);
        };
        let session = row_to_session(&row)?;

        let exercise_rows = sqlx::query(
            "SELECT * FROM session_exercises WHERE session_id = ?1 ORDER BY sort_order",
        )
        .bind(session_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        let mut exercises = Vec::with_capacity(exercise_rows.len());
        for exercise_row in &exercise_rows {
            let exercise = row_to_exercise(exercise_row)?;
            let sets = self.get_sets(exercise.id).await?;
            exercises.push(ExerciseDetail { exercise, sets });
        }
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
        let result = sqlx::query(
            r"
            UPDATE workout_sessions
            SET status = ?1, completed_at = ?2, duration_seconds = ?3, total_volume = ?4
            WHERE id = ?5
            ",
        )
        .bind(status.as_str())
        .bind(completed_at.map(|t| t.to_rfc3339()))
        .bind(duration_seconds)
        .bind(total_volume)
        .bind(session_id.to_string())
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found("Session", session_id));
        }
        Ok(())
    }

    async fn delete_session(&self, session_id: Uuid) -> AppResult<()> {
        sqlx::query(
            r"
            DELETE FROM session_sets WHERE session_exercise_id IN
                (SELECT id FROM session_exercises WHERE session_id = ?1)
            ",
        )
        .bind(session_id.to_string())
        .execute(&self.pool)
        .await?;
        sqlx::query("DELETE FROM session_exercises WHERE session_id = ?1")
            .bind(session_id.to_string())
            .execute(&self.pool)
            .await?;
        sqlx::query("DELETE FROM workout_sessions WHERE id = ?1")
            .bind(session_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn create_exercises(&self, exercises: &[SessionExercise]) -> AppResult<()> {
        for exercise in exercises {
            sqlx::query(
                r"
                INSERT INTO session_exercises
                    (id, session_id, exercise_id, display_name, sort_order,
                     status, target_sets, target_reps, rest_seconds)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                ",
            )
            .bind(exercise.id.to_string())
            .bind(exercise.session_id.to_string())
            .bind(exercise.exercise_id.to_string())
            .bind(&exercise.display_name)
            .bind(exercise.sort_order)
            .bind(exercise.status.as_str())
            .bind(i64::from(exercise.target_sets))
            .bind(i64::from(exercise.target_reps))
            .bind(i64::from(exercise.rest_seconds))
            .execute(&self.pool)
            .await?;
        }
        Ok(())
    }

    async fn update_exercise_status(
        &self,
        session_id: Uuid,
        session_exercise_id: Uuid,
        status: ExerciseStatus,
    ) -> AppResult<()> {
        let row = sqlx::query(
            "SELECT status FROM session_exercises WHERE id = ?1 AND session_id = ?2",
        )
        .bind(session_exercise_id.to_string())
        .bind(session_id.to_string())
        .fetch_optional(&self.pool)
        .await?
        .ok_or_else(|| AppError::not_found("SessionExercise", session_exercise_id))?;

        let current: String = row.try_get("status")?;
        let current = ExerciseStatus::parse(&current)
            .ok_or_else(|| AppError::internal(format!("unknown exercise status '{current}'")))?;
        if !current.can_transition_to(status) {
            warn!(
                exercise_id = %session_exercise_id,
                from = current.as_str(),
                to = status.as_str(),
                "ignoring backward exercise status transition"
            );
            return Ok(());
        }

        sqlx::query("UPDATE session_exercises SET status = ?1 WHERE id = ?2")
            .bind(status.as_str())
            .bind(session_exercise_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn create_sets(&self, sets: &[SessionSet]) -> AppResult<()> {
        for set in sets {
            self.upsert_set(set).await?;
        }
        Ok(())
    }

    async fn get_sets(&self, session_exercise_id: Uuid) -> AppResult<Vec<SessionSet>> {
        let rows = sqlx::query(
            "SELECT * FROM session_sets WHERE session_exercise_id = ?1 ORDER BY set_number",
        )
        .bind(session_exercise_id.to_string())
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_set).collect()
    }

    async fn upsert_set(&self, set: &SessionSet) -> AppResult<()> {
        sqlx::query(
            r"
            INSERT INTO session_sets
                (id, session_exercise_id, set_number, weight_kg, reps, is_completed)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            ON CONFLICT(id) DO UPDATE SET
                weight_kg = excluded.weight_kg,
                reps = excluded.reps,
                is_completed = excluded.is_completed
            ",
        )
        .bind(set.id.to_string())
        .bind(set.session_exercise_id.to_string())
        .bind(i64::from(set.set_number))
        .bind(set.weight_kg)
        .bind(i64::from(set.reps))
        .bind(set.is_completed)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn replace_sets(
        &self,
        session_exercise_id: Uuid,
        sets: &[SessionSet],
    ) -> AppResult<()> {
        // Delete-then-insert in one transaction; renumbered rows would
        // otherwise trip UNIQUE(session_exercise_id, set_number)
        let mut tx = self.pool.begin().await?;
        sqlx::query("DELETE FROM session_sets WHERE session_exercise_id = ?1")
            .bind(session_exercise_id.to_string())
            .execute(&mut *tx)
            .await?;
        for set in sets {
            sqlx::query(
                r"
                INSERT INTO session_sets
                    (id, session_exercise_id, set_number, weight_kg, reps, is_completed)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                ",
            )
            .bind(set.id.to_string())
            .bind(set.session_exercise_id.to_string())
            .bind(i64::from(set.set_number))
            .bind(set.weight_kg)
            .bind(i64::from(set.reps))
            .bind(set.is_completed)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn get_user_progress_blob(&self, user_id: Uuid) -> AppResult<Value> {
        let row = sqlx::query("SELECT blob FROM user_progress WHERE user_id = ?1")
            .bind(user_id.to_string())
            .fetch_optional(&self.pool)
            .await?;
        match row {
            Some(row) => {
                let blob: String = row.try_get("blob")?;
                Ok(serde_json::from_str(&blob)?)
            }
            None => Ok(Value::Null),
        }
    }

    async fn put_user_progress_blob(&self, user_id: Uuid, blob: Value) -> AppResult<()> {
        sqlx::query(
            r"
            INSERT INTO user_progress (user_id, blob) VALUES (?1, ?2)
            ON CONFLICT(user_id) DO UPDATE SET blob = excluded.blob
            ",
        )
        .bind(user_id.to_string())
        .bind(serde_json::to_string(&blob)?)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn upsert_today_exercise_log(
        &self,
        user_id: Uuid,
        exercise_id: Uuid,
        entry: &ExerciseLogEntry,
    ) -> AppResult<()> {
        // Read-modify-write of the whole aggregate; sibling keys must survive
        let mut blob = self.get_user_progress_blob(user_id).await?;
        upsert_entry_in_blob(&mut blob, &exercise_id.to_string(), entry)?;
        self.put_user_progress_blob(user_id, blob).await
    }
}
