// ABOUTME: Persisted data model for sessions, exercises, sets, and legacy logs
// ABOUTME: Session entities in session.rs, legacy aggregate log types in log.rs
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Setsync Project

pub mod log;
pub mod session;

pub use log::{upsert_entry_in_blob, ExerciseLogEntry, LogSet, WeightUnit};
pub use session::{
    ExerciseDetail, ExerciseStatus, ExerciseTemplate, SessionDetail, SessionExercise, SessionKind,
    SessionSet, SessionStatus, WorkoutSession,
};
