// ABOUTME: Read-only analytics over historical exercise logs
// ABOUTME: Personal records and "beat last workout" progression suggestions
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Setsync Project

pub mod progression;

pub use progression::{PersonalRecords, ProgressionAnalyzer, ProgressionReport};
