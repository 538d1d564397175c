// ABOUTME: Coalesced save controller: debounced, single-flight persistence per exercise key
// ABOUTME: Guarantees last-edit-wins with trailing replay and no concurrent writes per key
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Setsync Project

//! # Coalesced Save Controller
//!
//! Turns bursts of edit-buffer mutations into a minimal, correctly ordered
//! sequence of persisted writes. Per exercise key the controller runs an
//! explicit state machine: `Idle -> Debouncing -> Saving -> Saving+PendingReplay`.
//!
//! Guarantees, for any sequence of edits to one exercise:
//! - the store ends up with a write reflecting the last edit,
//! - the number of writes is bounded by (debounce-idle gaps + 1),
//! - no two writes ever run concurrently for the same key.
//!
//! Writes to different exercise keys are independent and may overlap.

use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{Mutex, Notify};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::errors::AppResult;
use crate::models::SessionSet;
use crate::store::EntityStore;

/// The unit of persistence: one exercise's full set state
#[derive(Debug, Clone)]
pub struct SavePayload {
    /// Exercise slot the sets belong to
    pub session_exercise_id: Uuid,
    /// Complete set state at edit time; replaces the slot's persisted sets
    pub sets: Vec<SessionSet>,
}

/// User-visible save state for the inline indicator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveStatus {
    /// Nothing scheduled or written yet
    #[default]
    Idle,
    /// A dirty edit is waiting out the debounce window
    Dirty,
    /// A write is in flight
    Saving,
    /// The last write committed
    Saved,
    /// The last write failed; local state was reloaded from the store
    Error,
}

#[derive(Default)]
struct KeyInner {
    /// Latest unsaved payload; always the newest intent
    latest: Option<SavePayload>,
    /// Debounce generation; a newer edit invalidates older timers
    epoch: u64,
    in_flight: bool,
    /// An edit arrived while a write was in flight; replay after it resolves
    pending: bool,
    status: SaveStatus,
    /// Authoritative sets reloaded after a failed write, for the buffer owner
    reloaded: Option<Vec<SessionSet>>,
}

struct KeyState {
    state: Mutex<KeyInner>,
    /// Signalled whenever a write resolves; `flush` waits on this
    settled: Notify,
}

struct Inner<S> {
    store: S,
    debounce: Duration,
    keys: DashMap<Uuid, Arc<KeyState>>,
}

/// Debounced single-flight save controller with trailing coalescing
pub struct SaveController<S> {
    inner: Arc<Inner<S>>,
}

impl<S> Clone for SaveController<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: EntityStore> SaveController<S> {
    /// Create a controller over the given store
    #[must_use]
    pub fn new(store: S, debounce: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                debounce,
                keys: DashMap::new(),
            }),
        }
    }

    fn key_state(&self, key: Uuid) -> Arc<KeyState> {
        self.inner
            .keys
            .entry(key)
            .or_insert_with(|| {
                Arc::new(KeyState {
                    state: Mutex::new(KeyInner::default()),
                    settled: Notify::new(),
                })
            })
            .clone()
    }

    /// Record a dirty edit and (re)start the debounce timer.
    ///
    /// Only after the window elapses without further edits is a save
    /// attempted; rapid edits collapse into one trailing write.
    pub async fn schedule(&self, payload: SavePayload) {
        let key = payload.session_exercise_id;
        let entry = self.key_state(key);
        let my_epoch = {
            let mut state = entry.state.lock().await;
            state.latest = Some(payload);
            state.epoch += 1;
            if state.status != SaveStatus::Saving {
                state.status = SaveStatus::Dirty;
            }
            state.epoch
        };

        let this = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(this.inner.debounce).await;
            let still_current = {
                let state = entry.state.lock().await;
                state.epoch == my_epoch
            };
            if still_current {
                this.drive(key).await;
            }
        });
    }

    fn existing_key_state(&self, key: Uuid) -> Option<Arc<KeyState>> {
        // Clone out of the map guard before any await point
        self.inner.keys.get(&key).map(|entry| Arc::clone(&entry))
    }

    /// Current save status for a key
    pub async fn status(&self, key: Uuid) -> SaveStatus {
        match self.existing_key_state(key) {
            Some(entry) => entry.state.lock().await.status,
            None => SaveStatus::Idle,
        }
    }

    /// Take the authoritative sets reloaded after a failed write, if any.
    ///
    /// The buffer owner drains this and calls
    /// [`crate::buffer::ExerciseEditBuffer::apply_authoritative`].
    pub async fn take_reloaded(&self, key: Uuid) -> Option<Vec<SessionSet>> {
        let entry = self.existing_key_state(key)?;
        let mut state = entry.state.lock().await;
        state.reloaded.take()
    }

    /// Cancel the debounce window and force any outstanding edit to disk,
    /// waiting for all in-flight work on the key to resolve.
    ///
    /// Called on navigation-away and before finalizing an exercise; the
    /// debounce timer is flushed, never dropped.
    pub async fn flush(&self, key: Uuid) {
        let entry = self.key_state(key);
        {
            // Invalidate any running debounce timer; we save right now
            let mut state = entry.state.lock().await;
            state.epoch += 1;
        }
        loop {
            // Register for the settle signal before checking state, so a
            // write resolving in between cannot be missed
            let mut notified = std::pin::pin!(entry.settled.notified());
            notified.as_mut().enable();
            let waiting_on_flight = {
                let state = entry.state.lock().await;
                if !state.in_flight && state.latest.is_none() {
                    return;
                }
                state.in_flight
            };
            if waiting_on_flight {
                notified.await;
            } else {
                self.drive(key).await;
            }
        }
    }

    /// Run the save loop for a key: issue at most one write at a time,
    /// replaying once if edits arrived mid-write.
    async fn drive(&self, key: Uuid) {
        let entry = self.key_state(key);
        loop {
            let payload = {
                let mut state = entry.state.lock().await;
                if state.in_flight {
                    // Single-flight: queue intent instead of a second write
                    state.pending = true;
                    return;
                }
                let Some(payload) = state.latest.take() else {
                    return;
                };
                state.in_flight = true;
                state.status = SaveStatus::Saving;
                payload
            };

            debug!(exercise = %key, sets = payload.sets.len(), "issuing save");
            let result = self.write(&payload).await;

            let replay = {
                let mut state = entry.state.lock().await;
                state.in_flight = false;
                let replay = state.pending && state.latest.is_some();
                state.pending = false;
                state.status = if result.is_ok() {
                    SaveStatus::Saved
                } else {
                    SaveStatus::Error
                };
                replay
            };

            if let Err(error) = &result {
                warn!(exercise = %key, %error, "save failed, reloading authoritative state");
                if !replay {
                    // Fail safe toward server truth: discard unconfirmed
                    // local edits and surface the store's version
                    match self.inner.store.get_sets(key).await {
                        Ok(sets) => {
                            entry.state.lock().await.reloaded = Some(sets);
                        }
                        Err(error) => {
                            warn!(exercise = %key, %error, "reload after failed save also failed");
                        }
                    }
                }
            }

            entry.settled.notify_waiters();
            if !replay {
                return;
            }
            debug!(exercise = %key, "replaying edits that arrived mid-write");
        }
    }

    async fn write(&self, payload: &SavePayload) -> AppResult<()> {
        // Full replacement: set removals and renumbering travel with the
        // payload, which a per-set upsert cannot express
        self.inner
            .store
            .replace_sets(payload.session_exercise_id, &payload.sets)
            .await
    }
}
