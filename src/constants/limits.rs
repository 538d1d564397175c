// ABOUTME: Validation bounds and timing constants for the set-tracking engine
// ABOUTME: Named constants to eliminate magic numbers in edit and save paths
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Setsync Project

/// Maximum weight accepted for a single set, in kilograms
pub const MAX_WEIGHT_KG: f64 = 300.0;

/// Maximum rep count accepted for a single set
pub const MAX_REPS: u32 = 50;

/// Minimum number of sets an exercise slot may hold
pub const MIN_SETS: usize = 1;

/// Maximum number of sets an exercise slot may hold
pub const MAX_SETS: usize = 8;

/// Debounce window before a dirty edit buffer is persisted, in milliseconds
pub const DEBOUNCE_MS: u64 = 250;

/// Default rest timer countdown after completing a set, in seconds
pub const REST_TIMER_SECS: u32 = 90;

/// Default lower bound of the target rep band used by progression suggestions
pub const REP_BAND_BOTTOM: u32 = 8;

/// Default upper bound of the target rep band used by progression suggestions
pub const REP_BAND_TOP: u32 = 12;

/// Default weight increment proposed when the rep band tops out, in kilograms
pub const WEIGHT_INCREMENT_KG: f64 = 2.5;

/// Maximum number of "beat last workout" suggestions emitted per exercise
pub const MAX_SUGGESTIONS: usize = 3;

/// Default freshness window for the shared progress cache, in milliseconds
pub const CACHE_MAX_AGE_MS: u64 = 60_000;
