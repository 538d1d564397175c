// ABOUTME: Unified error handling for the set-tracking engine
// ABOUTME: ErrorCode taxonomy, AppError type, and AppResult alias used by all modules
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Setsync Project

//! # Unified Error Handling
//!
//! Centralized error types for the engine. Every component returns
//! [`AppResult`]; the [`ErrorCode`] taxonomy distinguishes errors that are
//! resolved locally (validation, precondition) from the transient write
//! errors that are the only kind surfaced to a user.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Standard error codes used throughout the engine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorCode {
    // Validation (handled locally by clamping, never user-facing)
    #[serde(rename = "VALIDATION_OUT_OF_RANGE")]
    ValidationOutOfRange,

    // Preconditions (rejected before any write, silently)
    #[serde(rename = "PRECONDITION_NO_COMPLETED_SETS")]
    PreconditionNoCompletedSets,

    // Transient persistence failures (the only user-surfaced kind)
    #[serde(rename = "TRANSIENT_WRITE_FAILED")]
    TransientWriteFailed,

    // Malformed historical data (treated as empty by readers)
    #[serde(rename = "DATA_SHAPE_INVALID")]
    DataShapeInvalid,

    // Store / infrastructure
    #[serde(rename = "STORE_ERROR")]
    StoreError,
    #[serde(rename = "RESOURCE_NOT_FOUND")]
    ResourceNotFound,
    #[serde(rename = "IDENTITY_MISSING")]
    IdentityMissing,
    #[serde(rename = "INTERNAL_ERROR")]
    InternalError,
}

impl ErrorCode {
    /// Short human-readable description of the code
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::ValidationOutOfRange => "Value out of range",
            Self::PreconditionNoCompletedSets => "No completed sets",
            Self::TransientWriteFailed => "Write failed",
            Self::DataShapeInvalid => "Malformed historical data",
            Self::StoreError => "Store error",
            Self::ResourceNotFound => "Resource not found",
            Self::IdentityMissing => "No user identity",
            Self::InternalError => "Internal error",
        }
    }

    /// Whether errors with this code should be surfaced to the user
    #[must_use]
    pub const fn is_user_facing(self) -> bool {
        matches!(self, Self::TransientWriteFailed)
    }

    /// Whether a failed operation with this code may be retried as-is
    #[must_use]
    pub const fn is_retryable(self) -> bool {
        matches!(self, Self::TransientWriteFailed | Self::StoreError)
    }
}

/// Application error with code, message, and optional source chain
#[derive(Debug, Error)]
#[error("{}: {}", .code.description(), .message)]
pub struct AppError {
    /// Error classification code
    pub code: ErrorCode,
    /// Human-readable error message
    pub message: String,
    /// Resource the error relates to, when known
    pub resource_id: Option<String>,
    /// Underlying cause, for error chaining
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl AppError {
    /// Create a new error with the given code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            resource_id: None,
            source: None,
        }
    }

    /// Attach a resource ID for context
    #[must_use]
    pub fn with_resource_id(mut self, resource_id: impl Into<String>) -> Self {
        self.resource_id = Some(resource_id.into());
        self
    }

    /// Attach a source error for chaining
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Box::new(source));
        self
    }
}

/// Result type alias for convenience
pub type AppResult<T> = Result<T, AppError>;

/// Convenience constructors for common errors
impl AppError {
    /// An edit value fell outside its clamp bounds
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ValidationOutOfRange, message)
    }

    /// Completion requested with no valid completed sets
    pub fn precondition_no_completed_sets() -> Self {
        Self::new(
            ErrorCode::PreconditionNoCompletedSets,
            "At least one completed set with weight and reps is required",
        )
    }

    /// A save or completion write failed and may be retried
    pub fn transient_write(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::TransientWriteFailed, message)
    }

    /// Historical log data did not match the expected shape
    pub fn data_shape(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DataShapeInvalid, message)
    }

    /// Entity store operation failed
    pub fn store(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StoreError, message)
    }

    /// A referenced entity does not exist
    pub fn not_found(resource: impl Into<String>, id: Uuid) -> Self {
        Self::new(
            ErrorCode::ResourceNotFound,
            format!("{} not found", resource.into()),
        )
        .with_resource_id(id.to_string())
    }

    /// Operation attempted without a user identity
    pub fn identity_missing() -> Self {
        Self::new(ErrorCode::IdentityMissing, "No current user")
    }

    /// Unexpected internal failure
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> Self {
        Self::new(ErrorCode::StoreError, "Database operation failed").with_source(error)
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::new(ErrorCode::DataShapeInvalid, "JSON encoding failed").with_source(error)
    }
}
