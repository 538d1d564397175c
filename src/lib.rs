// ABOUTME: Library entry point for the setsync workout engine
// ABOUTME: Set tracking, debounced session synchronization, and PR progression analytics
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Setsync Project

#![deny(unsafe_code)]

//! # Setsync
//!
//! Exercise set-tracking and session-synchronization engine for workout
//! clients. The crate owns the hard parts of an in-progress workout:
//!
//! - **Edit buffer**: per-exercise mutable set state with silent clamping
//!   and a live workout summary mirror
//! - **Coalesced save controller**: debounced, single-flight persistence
//!   per exercise key - the last edit always wins, writes never overlap
//! - **Completion protocol**: dual-write of the legacy aggregate log and
//!   the normalized store, with optimistic cache update and rollback
//! - **Progression analyzer**: personal records and "beat last workout"
//!   suggestions from messy historical logs
//!
//! Screens, navigation, authentication, and the transport itself are the
//! caller's business; the [`store::EntityStore`] trait is the contract a
//! transport/store implementation must satisfy.
//!
//! ## Example
//!
//! ```rust,no_run
//! use setsync::config::EngineConfig;
//! use setsync::engine::WorkoutEngine;
//! use setsync::store::factory::Store;
//!
//! # async fn example() -> setsync::errors::AppResult<()> {
//! let store = Store::new("sqlite:./workouts.db").await?;
//! let mut engine = WorkoutEngine::new(store, EngineConfig::from_env());
//! engine.set_identity(Some(uuid::Uuid::new_v4()));
//! let session = engine.load_active_session().await?;
//! # Ok(())
//! # }
//! ```

pub mod buffer;
pub mod cache;
pub mod config;
pub mod constants;
pub mod engine;
pub mod errors;
pub mod intelligence;
pub mod models;
pub mod protocol;
pub mod save;
pub mod store;
pub mod timer;

pub use buffer::{ExerciseEditBuffer, WorkoutSummary};
pub use cache::{ProgressCache, ProgressPatch, SessionProgress};
pub use config::EngineConfig;
pub use engine::WorkoutEngine;
pub use errors::{AppError, AppResult, ErrorCode};
pub use protocol::{CompletionFlow, CompletionOutcome, CompletionState, CompletionSummary};
pub use save::{SaveController, SavePayload, SaveStatus};
pub use timer::{RestTimer, TimerCommand};
