// ABOUTME: Shared session-progress read cache consulted by independent screens
// ABOUTME: Single advisory slot with explicit freshness, patch, and snapshot/restore
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Setsync Project

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

/// Session progress snapshot visible to sibling screens
///
/// Advisory data: readers must tolerate it being one round-trip stale
/// relative to the entity store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionProgress {
    /// The in-progress session, if one is loaded
    pub session_id: Option<Uuid>,
    /// Exercise slots finished so far
    pub completed_exercises: u32,
    /// Exercise slots in the session
    pub total_exercises: u32,
    /// Sets marked complete so far
    pub completed_sets: u32,
    /// Sets in the session
    pub total_sets: u32,
    /// Most recently finalized exercise slot
    pub last_completed_exercise_id: Option<Uuid>,
}

/// Partial update to the cached progress; unset fields keep their value
#[derive(Debug, Clone, Default)]
pub struct ProgressPatch {
    pub session_id: Option<Option<Uuid>>,
    pub completed_exercises: Option<u32>,
    pub total_exercises: Option<u32>,
    pub completed_sets: Option<u32>,
    pub total_sets: Option<u32>,
    pub last_completed_exercise_id: Option<Option<Uuid>>,
}

/// Opaque snapshot for restore-on-failure
#[derive(Debug, Clone)]
pub struct CacheSnapshot {
    value: SessionProgress,
    updated_at: Option<Instant>,
}

#[derive(Debug, Default)]
struct Slot {
    value: SessionProgress,
    updated_at: Option<Instant>,
}

/// Shared last-writer-wins progress cache
///
/// Only the completion protocol and the initial load path write here; all
/// other consumers are readers. Freshness is an explicit, injected contract,
/// never an implicit assumption.
#[derive(Clone)]
pub struct ProgressCache {
    slot: Arc<RwLock<Slot>>,
    max_age: Duration,
}

impl ProgressCache {
    /// Create an empty cache with the given freshness window
    #[must_use]
    pub fn new(max_age: Duration) -> Self {
        Self {
            slot: Arc::new(RwLock::new(Slot::default())),
            max_age,
        }
    }

    /// Read the cached progress
    pub async fn get_cached_progress(&self) -> SessionProgress {
        self.slot.read().await.value.clone()
    }

    /// Replace the cached progress wholesale (initial load path)
    pub async fn load(&self, progress: SessionProgress) {
        let mut slot = self.slot.write().await;
        slot.value = progress;
        slot.updated_at = Some(Instant::now());
    }

    /// Merge a partial update into the cached progress (last writer wins)
    pub async fn patch_cached_progress(&self, patch: ProgressPatch) {
        let mut slot = self.slot.write().await;
        if let Some(session_id) = patch.session_id {
            slot.value.session_id = session_id;
        }
        if let Some(completed) = patch.completed_exercises {
            slot.value.completed_exercises = completed;
        }
        if let Some(total) = patch.total_exercises {
            slot.value.total_exercises = total;
        }
        if let Some(completed) = patch.completed_sets {
            slot.value.completed_sets = completed;
        }
        if let Some(total) = patch.total_sets {
            slot.value.total_sets = total;
        }
        if let Some(last) = patch.last_completed_exercise_id {
            slot.value.last_completed_exercise_id = last;
        }
        slot.updated_at = Some(Instant::now());
    }

    /// Whether the cached value was written within the given window
    pub async fn is_cache_fresh(&self, max_age: Duration) -> bool {
        self.slot
            .read()
            .await
            .updated_at
            .is_some_and(|at| at.elapsed() <= max_age)
    }

    /// Whether the cached value is fresh under the configured window
    pub async fn is_fresh(&self) -> bool {
        self.is_cache_fresh(self.max_age).await
    }

    /// Capture the current slot for a later [`ProgressCache::restore`]
    pub async fn snapshot(&self) -> CacheSnapshot {
        let slot = self.slot.read().await;
        CacheSnapshot {
            value: slot.value.clone(),
            updated_at: slot.updated_at,
        }
    }

    /// Restore a previously captured snapshot (optimistic-update rollback)
    pub async fn restore(&self, snapshot: CacheSnapshot) {
        let mut slot = self.slot.write().await;
        slot.value = snapshot.value;
        slot.updated_at = snapshot.updated_at;
    }
}
