// ABOUTME: Store factory with runtime backend selection from a connection URL
// ABOUTME: Unified Store enum delegating to in-memory or SQLite implementations
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Setsync Project

//! Store factory
//!
//! Detects the backend from the connection string and wraps it behind a
//! single enum so callers stay backend-agnostic.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, info};
use uuid::Uuid;

use super::memory::MemoryStore;
use super::sqlite::SqliteStore;
use super::EntityStore;
use crate::errors::{AppError, AppResult};
use crate::models::{
    ExerciseLogEntry, ExerciseStatus, SessionDetail, SessionExercise, SessionSet, SessionStatus,
    WorkoutSession,
};

/// Supported store backends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreType {
    Memory,
    Sqlite,
}

/// Store wrapper that delegates to the selected backend
#[derive(Clone)]
pub enum Store {
    Memory(MemoryStore),
    Sqlite(SqliteStore),
}

impl Store {
    /// Create a store from a connection URL
    ///
    /// `memory:` selects the in-memory backend; `sqlite:...` selects SQLite.
    pub async fn new(database_url: &str) -> AppResult<Self> {
        debug!("detecting store backend from URL");
        match detect_store_type(database_url)? {
            StoreType::Memory => {
                info!("initializing in-memory entity store");
                Ok(Self::Memory(MemoryStore::new()))
            }
            StoreType::Sqlite => {
                info!("initializing SQLite entity store");
                Ok(Self::Sqlite(SqliteStore::new(database_url).await?))
            }
        }
    }

    /// The backend this store runs on
    #[must_use]
    pub const fn store_type(&self) -> StoreType {
        match self {
            Self::Memory(_) => StoreType::Memory,
            Self::Sqlite(_) => StoreType::Sqlite,
        }
    }
}

/// Detect the backend type from a connection string
fn detect_store_type(database_url: &str) -> AppResult<StoreType> {
    if database_url == "memory:" || database_url.starts_with("memory:") {
        Ok(StoreType::Memory)
    } else if database_url.starts_with("sqlite:") {
        Ok(StoreType::Sqlite)
    } else {
        Err(AppError::internal(format!(
            "unsupported store URL '{database_url}' (expected memory: or sqlite:)"
        )))
    }
}

macro_rules! delegate {
    ($self:ident, $inner:ident => $body:expr) => {
        match $self {
            Store::Memory($inner) => $body,
            Store::Sqlite($inner) => $body,
        }
    };
}

#[async_trait]
impl EntityStore for Store {
    async fn create_session(&self, session: &WorkoutSession) -> AppResult<()> {
        delegate!(self, s => s.create_session(session).await)
    }

    async fn get_active_session(&self, user_id: Uuid) -> AppResult<Option<WorkoutSession>> {
        delegate!(self, s => s.get_active_session(user_id).await)
    }

    async fn get_session_with_exercises_and_sets(
        &self,
        session_id: Uuid,
    ) -> AppResult<Option<SessionDetail>> {
        delegate!(self, s => s.get_session_with_exercises_and_sets(session_id).await)
    }

    async fn update_session_status(
        &self,
        session_id: Uuid,
        status: SessionStatus,
        completed_at: Option<DateTime<Utc>>,
        duration_seconds: Option<i64>,
        total_volume: Option<f64>,
    ) -> AppResult<()> {
        delegate!(self, s => {
            s.update_session_status(session_id, status, completed_at, duration_seconds, total_volume)
                .await
        })
    }

    async fn delete_session(&self, session_id: Uuid) -> AppResult<()> {
        delegate!(self, s => s.delete_session(session_id).await)
    }

    async fn create_exercises(&self, exercises: &[SessionExercise]) -> AppResult<()> {
        delegate!(self, s => s.create_exercises(exercises).await)
    }

    async fn update_exercise_status(
        &self,
        session_id: Uuid,
        session_exercise_id: Uuid,
        status: ExerciseStatus,
    ) -> AppResult<()> {
        delegate!(self, s => {
            s.update_exercise_status(session_id, session_exercise_id, status).await
        })
    }

    async fn create_sets(&self, sets: &[SessionSet]) -> AppResult<()> {
        delegate!(self, s => s.create_sets(sets).await)
    }

    async fn get_sets(&self, session_exercise_id: Uuid) -> AppResult<Vec<SessionSet>> {
        delegate!(self, s => s.get_sets(session_exercise_id).await)
    }

    async fn upsert_set(&self, set: &SessionSet) -> AppResult<()> {
        delegate!(self, s => s.upsert_set(set).await)
    }

    async fn replace_sets(
        &self,
        session_exercise_id: Uuid,
        sets: &[SessionSet],
    ) -> AppResult<()> {
        delegate!(self, s => s.replace_sets(session_exercise_id, sets).await)
    }

    async fn get_user_progress_blob(&self, user_id: Uuid) -> AppResult<Value> {
        delegate!(self, s => s.get_user_progress_blob(user_id).await)
    }

    async fn put_user_progress_blob(&self, user_id: Uuid, blob: Value) -> AppResult<()> {
        delegate!(self, s => s.put_user_progress_blob(user_id, blob).await)
    }

    async fn upsert_today_exercise_log(
        &self,
        user_id: Uuid,
        exercise_id: Uuid,
        entry: &ExerciseLogEntry,
    ) -> AppResult<()> {
        delegate!(self, s => s.upsert_today_exercise_log(user_id, exercise_id, entry).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_store_type() {
        assert_eq!(detect_store_type("memory:").unwrap(), StoreType::Memory);
        assert_eq!(
            detect_store_type("sqlite:./data.db").unwrap(),
            StoreType::Sqlite
        );
        assert!(detect_store_type("postgres://x").is_err());
    }
}
