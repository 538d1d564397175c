// ABOUTME: Engine configuration with product defaults and environment overrides
// ABOUTME: Clamp bounds, debounce window, rest timer, and progression tuning knobs
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Setsync Project

use std::env;
use std::time::Duration;

use crate::constants::limits::{
    CACHE_MAX_AGE_MS, DEBOUNCE_MS, MAX_REPS, MAX_SETS, MAX_SUGGESTIONS, MAX_WEIGHT_KG, MIN_SETS,
    REP_BAND_BOTTOM, REP_BAND_TOP, REST_TIMER_SECS, WEIGHT_INCREMENT_KG,
};

/// Tunable engine parameters
///
/// Defaults follow the product values; each field can be overridden through
/// a `SETSYNC_`-prefixed environment variable for deployment tuning.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Upper clamp for set weight, in kilograms
    pub max_weight_kg: f64,
    /// Upper clamp for set reps
    pub max_reps: u32,
    /// Minimum sets per exercise slot
    pub min_sets: usize,
    /// Maximum sets per exercise slot
    pub max_sets: usize,
    /// Debounce window before a dirty buffer is persisted
    pub debounce: Duration,
    /// Rest timer countdown after completing a set
    pub rest_timer: Duration,
    /// Target rep band for progression suggestions (inclusive)
    pub rep_band: (u32, u32),
    /// Weight increment proposed when the rep band tops out, kilograms
    pub weight_increment_kg: f64,
    /// Cap on emitted "beat last workout" suggestions
    pub max_suggestions: usize,
    /// Freshness window for the shared progress cache
    pub cache_max_age: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_weight_kg: MAX_WEIGHT_KG,
            max_reps: MAX_REPS,
            min_sets: MIN_SETS,
            max_sets: MAX_SETS,
            debounce: Duration::from_millis(DEBOUNCE_MS),
            rest_timer: Duration::from_secs(u64::from(REST_TIMER_SECS)),
            rep_band: (REP_BAND_BOTTOM, REP_BAND_TOP),
            weight_increment_kg: WEIGHT_INCREMENT_KG,
            max_suggestions: MAX_SUGGESTIONS,
            cache_max_age: Duration::from_millis(CACHE_MAX_AGE_MS),
        }
    }
}

impl EngineConfig {
    /// Load configuration from the environment, falling back to defaults
    #[must_use]
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            max_weight_kg: env_f64("SETSYNC_MAX_WEIGHT_KG", defaults.max_weight_kg),
            max_reps: env_u32("SETSYNC_MAX_REPS", defaults.max_reps),
            debounce: Duration::from_millis(env_u64(
                "SETSYNC_DEBOUNCE_MS",
                defaults.debounce.as_millis() as u64,
            )),
            rest_timer: Duration::from_secs(env_u64(
                "SETSYNC_REST_TIMER_SECS",
                defaults.rest_timer.as_secs(),
            )),
            weight_increment_kg: env_f64(
                "SETSYNC_WEIGHT_INCREMENT_KG",
                defaults.weight_increment_kg,
            ),
            cache_max_age: Duration::from_millis(env_u64(
                "SETSYNC_CACHE_MAX_AGE_MS",
                defaults.cache_max_age.as_millis() as u64,
            )),
            ..defaults
        }
    }
}

fn env_u64(key: &str, default: u64) -> u64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_f64(key: &str, default: f64) -> f64 {
    env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
