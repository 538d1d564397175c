// ABOUTME: Normalized session entities: WorkoutSession, SessionExercise, SessionSet
// ABOUTME: Status enums with monotonic transition rules and SQL text mapping
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Setsync Project

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How a session was created
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    /// Started from a workout template
    Template,
    /// Assembled manually by the user
    Manual,
    /// Cardio-only session
    Cardio,
}

impl SessionKind {
    /// Text form used in SQL columns
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Template => "template",
            Self::Manual => "manual",
            Self::Cardio => "cardio",
        }
    }

    /// Parse from the SQL text form
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "template" => Some(Self::Template),
            "manual" => Some(Self::Manual),
            "cardio" => Some(Self::Cardio),
            _ => None,
        }
    }

    /// Whether the session participates in weekly-schedule progress patches
    #[must_use]
    pub const fn advances_schedule(self) -> bool {
        matches!(self, Self::Template)
    }
}

/// Lifecycle status of a workout session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    InProgress,
    Completed,
    Cancelled,
}

impl SessionStatus {
    /// Text form used in SQL columns
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
        }
    }

    /// Parse from the SQL text form
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "IN_PROGRESS" => Some(Self::InProgress),
            "COMPLETED" => Some(Self::Completed),
            "CANCELLED" => Some(Self::Cancelled),
            _ => None,
        }
    }
}

/// Status of one exercise slot within a session
///
/// Status only moves forward within a session lifetime. Reopening a finished
/// exercise means starting a new session, never regressing status in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ExerciseStatus {
    NotStarted,
    InProgress,
    Completed,
}

impl ExerciseStatus {
    /// Text form used in SQL columns
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::NotStarted => "NOT_STARTED",
            Self::InProgress => "IN_PROGRESS",
            Self::Completed => "COMPLETED",
        }
    }

    /// Parse from the SQL text form
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "NOT_STARTED" => Some(Self::NotStarted),
            "IN_PROGRESS" => Some(Self::InProgress),
            "COMPLETED" => Some(Self::Completed),
            _ => None,
        }
    }

    /// Whether moving to `next` respects the forward-only rule
    #[must_use]
    pub fn can_transition_to(self, next: Self) -> bool {
        self.rank() <= next.rank()
    }

    const fn rank(self) -> u8 {
        match self {
            Self::NotStarted => 0,
            Self::InProgress => 1,
            Self::Completed => 2,
        }
    }
}

/// One workout attempt by one user
///
/// At most one session per user may be `IN_PROGRESS` at any time. Sessions
/// are never physically deleted except by explicit user request, which
/// cascades to exercises and sets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkoutSession {
    /// Unique session identifier
    pub id: Uuid,
    /// Owning user
    pub user_id: Uuid,
    /// Template this session was started from; None for manual/cardio
    pub source_template_id: Option<Uuid>,
    /// User-visible session name
    pub display_name: String,
    /// How the session was created
    pub kind: SessionKind,
    /// Lifecycle status
    pub status: SessionStatus,
    /// When the user started the workout (UTC)
    pub started_at: DateTime<Utc>,
    /// When the session completed, if it has
    pub completed_at: Option<DateTime<Utc>>,
    /// Wall-clock duration, filled in at completion
    pub duration_seconds: Option<i64>,
    /// Total volume (sum of weight x reps over completed sets), filled in at completion
    pub total_volume: Option<f64>,
}

impl WorkoutSession {
    /// Start a new in-progress session
    #[must_use]
    pub fn start(
        user_id: Uuid,
        display_name: impl Into<String>,
        kind: SessionKind,
        source_template_id: Option<Uuid>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            source_template_id,
            display_name: display_name.into(),
            kind,
            status: SessionStatus::InProgress,
            started_at: Utc::now(),
            completed_at: None,
            duration_seconds: None,
            total_volume: None,
        }
    }
}

/// One exercise slot within a session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionExercise {
    /// Unique slot identifier
    pub id: Uuid,
    /// Owning session
    pub session_id: Uuid,
    /// Catalog exercise this slot references
    pub exercise_id: Uuid,
    /// User-visible exercise name
    pub display_name: String,
    /// Position within the session; unique per session
    pub sort_order: i32,
    /// Forward-only lifecycle status
    pub status: ExerciseStatus,
    /// Planned set count
    pub target_sets: u32,
    /// Planned reps per set
    pub target_reps: u32,
    /// Rest between sets, seconds
    pub rest_seconds: u32,
}

/// One working set: a weight x reps attempt, ordered within its exercise
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSet {
    /// Unique set identifier
    pub id: Uuid,
    /// Owning exercise slot
    pub session_exercise_id: Uuid,
    /// 1-based position; unique within the exercise, never reordered
    pub set_number: u32,
    /// Weight in kilograms, clamped to the configured range
    pub weight_kg: f64,
    /// Rep count, clamped to the configured range
    pub reps: u32,
    /// Whether the user marked this set done
    pub is_completed: bool,
}

impl SessionSet {
    /// Placeholder set created when an exercise slot is initialized
    #[must_use]
    pub fn placeholder(session_exercise_id: Uuid, set_number: u32, target_reps: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            session_exercise_id,
            set_number,
            weight_kg: 0.0,
            reps: target_reps,
            is_completed: false,
        }
    }

    /// Volume contribution of this set
    #[must_use]
    pub fn volume(&self) -> f64 {
        self.weight_kg * f64::from(self.reps)
    }
}

/// Read-only catalog entry supplied by an external template/generator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExerciseTemplate {
    /// Catalog exercise identifier
    pub exercise_id: Uuid,
    /// Display name
    pub name: String,
    /// Planned set count
    pub target_sets: u32,
    /// Planned reps per set
    pub target_reps: u32,
    /// Rest between sets, seconds
    pub rest_seconds: u32,
}

/// An exercise slot together with its sets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExerciseDetail {
    pub exercise: SessionExercise,
    /// Sets ordered by set_number
    pub sets: Vec<SessionSet>,
}

/// A session with all its exercise slots and sets
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionDetail {
    pub session: WorkoutSession,
    /// Slots ordered by sort_order
    pub exercises: Vec<ExerciseDetail>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exercise_status_monotonic() {
        use ExerciseStatus::{Completed, InProgress, NotStarted};
        assert!(NotStarted.can_transition_to(InProgress));
        assert!(InProgress.can_transition_to(Completed));
        assert!(NotStarted.can_transition_to(Completed));
        assert!(Completed.can_transition_to(Completed));
        assert!(!Completed.can_transition_to(InProgress));
        assert!(!Completed.can_transition_to(NotStarted));
        assert!(!InProgress.can_transition_to(NotStarted));
    }

    #[test]
    fn test_status_sql_round_trip() {
        for status in [
            ExerciseStatus::NotStarted,
            ExerciseStatus::InProgress,
            ExerciseStatus::Completed,
        ] {
            assert_eq!(ExerciseStatus::parse(status.as_str()), Some(status));
        }
        for status in [
            SessionStatus::InProgress,
            SessionStatus::Completed,
            SessionStatus::Cancelled,
        ] {
            assert_eq!(SessionStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn test_session_serde_status_names() {
        let session = WorkoutSession::start(Uuid::new_v4(), "Push Day", SessionKind::Template, None);
        let json = serde_json::to_string(&session).unwrap();
        assert!(json.contains("\"IN_PROGRESS\""));
        assert!(json.contains("\"template\""));
    }
}
