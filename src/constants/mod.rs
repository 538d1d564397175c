// ABOUTME: Constants module with domain-separated organization
// ABOUTME: Groups engine limits and unit conversion factors by concern
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Setsync Project

//! Constants module
//!
//! Engine constants grouped by domain rather than a single flat file.

pub mod limits;
pub mod units;

pub use limits::*;
pub use units::*;
