//! # Error Types
//!
//! Domain-specific error types for till-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  till-core errors (this file)                                          │
//! │  ├── CoreError        - Session workflow errors                        │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  till-db errors (separate crate)                                       │
//! │  └── DbError          - Store operation failures                       │
//! │                                                                         │
//! │  till-engine errors                                                    │
//! │  └── EngineError      - What collaborators see                         │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError ─┐                                   │
//! │                         DbError ────┴──► EngineError → Caller           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Categories
//! Every [`CoreError`] falls in exactly one [`ErrorCategory`], so callers can
//! tell "nothing to do" (`NotOpen`) from a genuine conflict (`AlreadyOpen`)
//! from bad input (`InvalidAmount`). None of them is retried automatically.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::SessionStatus;

// =============================================================================
// Error Category
// =============================================================================

/// Coarse classification of a failure, used for caller-side handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Bad input. Surface immediately, never retry.
    Validation,
    /// Workflow conflict. Refresh state and re-decide.
    Conflict,
    /// The thing asked for does not exist.
    NotFound,
    /// Store connectivity or other infrastructure failure.
    Infrastructure,
}

// =============================================================================
// Core Error
// =============================================================================

/// Cash session workflow errors.
///
/// These errors represent lifecycle rule violations. They are workflow-level
/// failures, never transient faults.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The branch already has an open session.
    ///
    /// ## When This Occurs
    /// ```text
    /// Branch "north" ── open ──► OPEN (session A)
    ///        │
    ///        └──────── open ──► AlreadyOpen { existing: A }
    /// ```
    #[error("Branch {branch_id} already has an open cash session{}", existing_suffix(.existing_session_id))]
    AlreadyOpen {
        branch_id: String,
        existing_session_id: Option<String>,
    },

    /// The session is not open (already closed, balanced or voided).
    ///
    /// ## When This Occurs
    /// - Second `close` of the same session (idempotent retry)
    /// - `reset` after `close`
    /// - Losing a race against another operator's close/reset
    #[error("Cash session {session_id} is not open (status: {status})")]
    NotOpen {
        session_id: String,
        status: SessionStatus,
    },

    /// A cash event arrived for a branch with no open session.
    #[error("Branch {branch_id} has no open cash session")]
    NoOpenSession { branch_id: String },

    /// Unknown session id.
    #[error("Cash session not found: {0}")]
    SessionNotFound(String),

    /// A monetary amount is outside its allowed range.
    #[error("Invalid amount for {field}: {reason}")]
    InvalidAmount { field: String, reason: String },

    /// The session kept changing underneath a close.
    ///
    /// ## When This Occurs
    /// Sale/expense events landed between reading the summary and writing the
    /// closing record on every attempt.
    #[error("Cash session {session_id} changed concurrently {attempts} times during close")]
    ConcurrentModification { session_id: String, attempts: u32 },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

fn existing_suffix(existing: &Option<String>) -> String {
    match existing {
        Some(id) => format!(" ({})", id),
        None => String::new(),
    }
}

impl CoreError {
    /// Returns the category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            CoreError::AlreadyOpen { .. }
            | CoreError::NotOpen { .. }
            | CoreError::ConcurrentModification { .. } => ErrorCategory::Conflict,
            CoreError::NoOpenSession { .. } | CoreError::SessionNotFound(_) => {
                ErrorCategory::NotFound
            }
            CoreError::InvalidAmount { .. } | CoreError::Validation(_) => {
                ErrorCategory::Validation
            }
        }
    }

    /// Creates an InvalidAmount error.
    pub fn invalid_amount(field: impl Into<String>, reason: impl Into<String>) -> Self {
        CoreError::InvalidAmount {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised at the boundary, before any session state is touched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    Negative { field: String },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, malformed amount).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Duplicate value (e.g., same denomination counted twice).
    #[error("{field} '{value}' appears more than once")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
