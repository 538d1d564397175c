// ABOUTME: Shared test utilities for setsync integration tests
// ABOUTME: Quiet logging setup plus session and template fixtures
#![allow(dead_code)]

//! Shared test utilities
//!
//! Common setup to reduce duplication across integration tests.

use std::sync::Once;

use setsync::config::EngineConfig;
use setsync::engine::WorkoutEngine;
use setsync::models::{ExerciseTemplate, SessionDetail, SessionKind};
use setsync::store::memory::MemoryStore;
use uuid::Uuid;

static INIT_LOGGER: Once = Once::new();

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            _ => tracing::Level::WARN,
        };
        let _ = tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .try_init();
    });
}

/// A bench-press style template: 3 sets of 8, 90 s rest
pub fn bench_template() -> ExerciseTemplate {
    ExerciseTemplate {
        exercise_id: Uuid::new_v4(),
        name: "Bench Press".to_owned(),
        target_sets: 3,
        target_reps: 8,
        rest_seconds: 90,
    }
}

/// Engine over a fresh in-memory store with a signed-in user
pub fn test_engine() -> (WorkoutEngine<MemoryStore>, MemoryStore, Uuid) {
    init_test_logging();
    let store = MemoryStore::new();
    let user_id = Uuid::new_v4();
    let mut engine = WorkoutEngine::new(store.clone(), EngineConfig::default());
    engine.set_identity(Some(user_id));
    (engine, store, user_id)
}

/// Start a one-exercise template session and return its detail
pub async fn started_session(
    engine: &WorkoutEngine<MemoryStore>,
    kind: SessionKind,
) -> SessionDetail {
    engine
        .start_session("Push Day", kind, None, &[bench_template()])
        .await
        .expect("start_session")
        .expect("session detail")
}
