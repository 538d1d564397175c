// ABOUTME: Integration tests for the completion protocol
// ABOUTME: Normalization, dual-write, optimistic rollback, and session finalization

mod common;

use setsync::errors::ErrorCode;
use setsync::models::{ExerciseStatus, SessionKind, SessionStatus, WeightUnit};
use setsync::protocol::CompletionState;
use setsync::store::EntityStore;

// Scenario: completing sets [{60,8,done},{0,0,open},{65,6,done}] persists
// [{60,8,done},{0,1,open},{65,6,done}] - zero reps floored to one, the
// incomplete set's weight left at zero.
#[tokio::test]
async fn test_complete_normalizes_and_persists_sets() {
    let (engine, store, _user) = common::test_engine();
    let detail = common::started_session(&engine, SessionKind::Template).await;
    let slot = &detail.exercises[0];

    let mut buffer = engine.edit_buffer(&slot.exercise, slot.sets.clone());
    let ids: Vec<_> = buffer.sets().iter().map(|s| s.id).collect();
    buffer.set_weight(ids[0], 60.0, WeightUnit::Kg);
    buffer.set_reps(ids[0], 8);
    buffer.toggle_set_completion(ids[0]);
    buffer.set_reps(ids[1], 0);
    buffer.set_weight(ids[2], 65.0, WeightUnit::Kg);
    buffer.set_reps(ids[2], 6);
    buffer.toggle_set_completion(ids[2]);
    // Outstanding debounced edits are flushed by the completion itself
    engine.schedule_save(&mut buffer).await;

    let mut flow = engine.completion_flow(detail.session.clone());
    let summary = flow.request_completion(&buffer).expect("precondition holds");
    assert_eq!(summary.completed_sets, 2);
    assert_eq!(summary.total_sets, 3);

    let outcome = flow
        .complete_exercise(&mut buffer, WeightUnit::Kg)
        .await
        .expect("completion succeeds");
    assert!(outcome.navigate);
    assert_eq!(flow.state(), CompletionState::Finalized);
    assert!(buffer.is_read_only());

    let persisted = store.get_sets(slot.exercise.id).await.unwrap();
    assert!((persisted[0].weight_kg - 60.0).abs() < f64::EPSILON);
    assert_eq!(persisted[0].reps, 8);
    assert!(persisted[0].is_completed);
    assert!((persisted[1].weight_kg).abs() < f64::EPSILON);
    assert_eq!(persisted[1].reps, 1, "zero reps floored to 1");
    assert!(!persisted[1].is_completed);
    assert_eq!(persisted[2].reps, 6);

    // Legacy log got today's entry alongside the normalized write
    let report = engine
        .progression_report(slot.exercise.exercise_id)
        .await
        .unwrap();
    assert_eq!(report.records.heaviest_weight, Some(65.0));
}

// Scenario: a failing store during completion restores the cache snapshot
// and unmarks every set, keeping the entered numbers.
#[tokio::test]
async fn test_failed_completion_rolls_back_cache_and_flags() {
    let (engine, store, _user) = common::test_engine();
    let detail = common::started_session(&engine, SessionKind::Template).await;
    let slot = &detail.exercises[0];

    let mut buffer = engine.edit_buffer(&slot.exercise, slot.sets.clone());
    let set_id = buffer.sets()[0].id;
    buffer.set_weight(set_id, 60.0, WeightUnit::Kg);
    buffer.set_reps(set_id, 8);
    buffer.toggle_set_completion(set_id);

    let before = engine.cache().get_cached_progress().await;
    store.set_fail_writes(true);

    let mut flow = engine.completion_flow(detail.session.clone());
    let error = flow
        .complete_exercise(&mut buffer, WeightUnit::Kg)
        .await
        .expect_err("completion must fail");
    assert_eq!(error.code, ErrorCode::TransientWriteFailed);

    // Cache restored to its pre-completion snapshot
    assert_eq!(engine.cache().get_cached_progress().await, before);
    // Flags reverted, numbers intact, still editable
    assert!(buffer.sets().iter().all(|s| !s.is_completed));
    assert!((buffer.sets()[0].weight_kg - 60.0).abs() < f64::EPSILON);
    assert_eq!(flow.state(), CompletionState::Editing);
    assert!(!buffer.is_read_only());

    // Nothing finalized server-side
    store.set_fail_writes(false);
    let after = store
        .get_session_with_exercises_and_sets(detail.session.id)
        .await
        .unwrap()
        .unwrap();
    assert_ne!(after.exercises[0].exercise.status, ExerciseStatus::Completed);
}

#[tokio::test]
async fn test_precondition_rejects_empty_completion() {
    let (engine, _store, _user) = common::test_engine();
    let detail = common::started_session(&engine, SessionKind::Template).await;
    let slot = &detail.exercises[0];

    // Placeholder sets: nothing completed yet
    let buffer = engine.edit_buffer(&slot.exercise, slot.sets.clone());
    let mut flow = engine.completion_flow(detail.session.clone());

    let error = flow.request_completion(&buffer).expect_err("inert button");
    assert_eq!(error.code, ErrorCode::PreconditionNoCompletedSets);
    assert_eq!(flow.state(), CompletionState::Editing);
}

#[tokio::test]
async fn test_exercise_status_never_regresses() {
    let (engine, store, _user) = common::test_engine();
    let detail = common::started_session(&engine, SessionKind::Template).await;
    let slot = &detail.exercises[0];

    let mut buffer = engine.edit_buffer(&slot.exercise, slot.sets.clone());
    let set_id = buffer.sets()[0].id;
    buffer.set_weight(set_id, 60.0, WeightUnit::Kg);
    buffer.toggle_set_completion(set_id);

    let mut flow = engine.completion_flow(detail.session.clone());
    flow.complete_exercise(&mut buffer, WeightUnit::Kg)
        .await
        .unwrap();

    // A late backward transition is ignored, not applied
    store
        .update_exercise_status(detail.session.id, slot.exercise.id, ExerciseStatus::InProgress)
        .await
        .unwrap();
    let after = store
        .get_session_with_exercises_and_sets(detail.session.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.exercises[0].exercise.status, ExerciseStatus::Completed);
}

#[tokio::test]
async fn test_last_exercise_finalizes_session() {
    let (engine, store, _user) = common::test_engine();
    let detail = common::started_session(&engine, SessionKind::Template).await;
    let slot = &detail.exercises[0];

    let mut buffer = engine.edit_buffer(&slot.exercise, slot.sets.clone());
    let ids: Vec<_> = buffer.sets().iter().map(|s| s.id).collect();
    buffer.set_weight(ids[0], 60.0, WeightUnit::Kg);
    buffer.set_reps(ids[0], 8);
    buffer.toggle_set_completion(ids[0]);
    buffer.set_weight(ids[2], 65.0, WeightUnit::Kg);
    buffer.set_reps(ids[2], 6);
    buffer.toggle_set_completion(ids[2]);

    let mut flow = engine.completion_flow(detail.session.clone());
    let outcome = flow
        .complete_exercise(&mut buffer, WeightUnit::Kg)
        .await
        .unwrap();
    assert!(outcome.session_finalized);

    let after = store
        .get_session_with_exercises_and_sets(detail.session.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.session.status, SessionStatus::Completed);
    assert!(after.session.completed_at.is_some());
    // 60x8 + 65x6 over completed sets
    assert!((after.session.total_volume.unwrap() - 870.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn test_manual_session_skips_progress_patch() {
    let (engine, _store, _user) = common::test_engine();
    let detail = common::started_session(&engine, SessionKind::Manual).await;
    let slot = &detail.exercises[0];

    let mut buffer = engine.edit_buffer(&slot.exercise, slot.sets.clone());
    let set_id = buffer.sets()[0].id;
    buffer.set_weight(set_id, 40.0, WeightUnit::Kg);
    buffer.toggle_set_completion(set_id);

    let before = engine.cache().get_cached_progress().await;
    let mut flow = engine.completion_flow(detail.session.clone());
    flow.complete_exercise(&mut buffer, WeightUnit::Kg)
        .await
        .unwrap();

    // No weekly schedule to advance: cache progress left as loaded
    let after = engine.cache().get_cached_progress().await;
    assert_eq!(after.completed_exercises, before.completed_exercises);
    assert_eq!(after.last_completed_exercise_id, None);
}

#[tokio::test]
async fn test_start_session_resumes_active() {
    let (engine, _store, _user) = common::test_engine();
    let first = common::started_session(&engine, SessionKind::Template).await;
    // A second start must resume, never create a duplicate IN_PROGRESS row
    let second = common::started_session(&engine, SessionKind::Template).await;
    assert_eq!(first.session.id, second.session.id);
}

// Scenario: cancelling frees the single-active slot and resets the shared
// cache, so the next start creates a fresh session instead of resuming.
#[tokio::test]
async fn test_cancelled_session_releases_active_slot() {
    let (engine, store, user) = common::test_engine();
    let first = common::started_session(&engine, SessionKind::Template).await;

    engine.cancel_session(first.session.id).await.unwrap();

    assert!(store.get_active_session(user).await.unwrap().is_none());
    assert_eq!(engine.cache().get_cached_progress().await.session_id, None);
    let row = store
        .get_session_with_exercises_and_sets(first.session.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(row.session.status, SessionStatus::Cancelled);
    assert_eq!(row.session.completed_at, None, "cancelled is not completed");

    let next = common::started_session(&engine, SessionKind::Template).await;
    assert_ne!(next.session.id, first.session.id);
}

#[tokio::test]
async fn test_complete_session_records_duration_and_volume() {
    let (engine, store, _user) = common::test_engine();
    let detail = common::started_session(&engine, SessionKind::Template).await;
    let slot = &detail.exercises[0];

    let mut buffer = engine.edit_buffer(&slot.exercise, slot.sets.clone());
    let set_id = buffer.sets()[0].id;
    buffer.set_weight(set_id, 60.0, WeightUnit::Kg);
    buffer.set_reps(set_id, 8);
    buffer.toggle_set_completion(set_id);
    engine.schedule_save(&mut buffer).await;
    engine.flush_exercise(slot.exercise.id).await;

    assert!(engine.complete_session(detail.session.id).await.unwrap());
    let after = store
        .get_session_with_exercises_and_sets(detail.session.id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(after.session.status, SessionStatus::Completed);
    // Only the one completed set counts toward volume
    assert_eq!(after.session.total_volume, Some(480.0));
    assert!(after.session.completed_at.is_some());
    assert!(after.session.duration_seconds.is_some());
}
