// ABOUTME: Rest timer driving the between-set countdown
// ABOUTME: Restartable and cancellable; stale expiry tasks are generation-guarded
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Setsync Project

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

/// Command emitted by the edit buffer toward the rest timer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerCommand {
    /// Start (or restart) the countdown
    Start,
    /// Cancel any running countdown
    Cancel,
}

#[derive(Debug, Clone, Copy)]
struct Deadline {
    at: Instant,
    generation: u64,
}

/// Countdown timer for rest between sets
///
/// Starting while running restarts the countdown. Each start bumps a
/// generation counter so expiry observed for an older start is ignored.
#[derive(Clone)]
pub struct RestTimer {
    duration: Duration,
    deadline: Arc<RwLock<Option<Deadline>>>,
    generation: Arc<AtomicU64>,
}

impl RestTimer {
    /// Create a timer with the given countdown length
    #[must_use]
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            deadline: Arc::new(RwLock::new(None)),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Start or restart the countdown
    pub async fn start(&self) {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let mut deadline = self.deadline.write().await;
        *deadline = Some(Deadline {
            at: Instant::now() + self.duration,
            generation,
        });
        debug!(generation, secs = self.duration.as_secs(), "rest timer started");
    }

    /// Cancel any running countdown
    pub async fn cancel(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        let mut deadline = self.deadline.write().await;
        if deadline.take().is_some() {
            debug!("rest timer cancelled");
        }
    }

    /// Apply a buffer-emitted command
    pub async fn apply(&self, command: TimerCommand) {
        match command {
            TimerCommand::Start => self.start().await,
            TimerCommand::Cancel => self.cancel().await,
        }
    }

    /// Time left on the countdown; None when idle or expired
    pub async fn remaining(&self) -> Option<Duration> {
        let deadline = self.deadline.read().await;
        deadline.and_then(|d| d.at.checked_duration_since(Instant::now()))
    }

    /// Whether a countdown is currently running
    pub async fn is_running(&self) -> bool {
        self.remaining().await.is_some()
    }

    /// Wait for the current countdown to expire.
    ///
    /// Returns false if the countdown was cancelled or restarted while
    /// waiting (the caller's wait is stale).
    pub async fn wait(&self) -> bool {
        let Some(Deadline { at, generation }) = *self.deadline.read().await else {
            return false;
        };
        tokio::time::sleep_until(at).await;
        // Another start or a cancel invalidates this wait
        self.generation.load(Ordering::SeqCst) == generation
    }
}
