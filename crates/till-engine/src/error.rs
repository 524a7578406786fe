//! # Engine Error Types
//!
//! The error surface every collaborator of the cash session engine sees.
//!
//! ## Error Categories
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Error Categories                                   │
//! │                                                                         │
//! │  VALIDATION        InvalidAmount, malformed breakdown, bad paging       │
//! │  └── Surface immediately. Never retry.                                 │
//! │                                                                         │
//! │  CONFLICT          AlreadyOpen, NotOpen, ConcurrentModification         │
//! │  └── Refresh state and re-decide.                                      │
//! │                                                                         │
//! │  NOT FOUND         NoOpenSession, SessionNotFound                       │
//! │  └── Surface directly.                                                 │
//! │                                                                         │
//! │  INFRASTRUCTURE    Store failures, config, I/O                          │
//! │  └── Propagated unchanged.                                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Error Codes
//! [`ErrorReport`] flattens an error into a stable SCREAMING_SNAKE_CASE code
//! plus message, which is what the admin CLI prints.

use serde::Serialize;
use thiserror::Error;

use till_core::{CoreError, ErrorCategory, ValidationError};
use till_db::DbError;

/// Result type alias for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Engine error type.
#[derive(Debug, Error)]
pub enum EngineError {
    // =========================================================================
    // Workflow Errors
    // =========================================================================
    /// Lifecycle rule violation or rejected input.
    #[error(transparent)]
    Core(#[from] CoreError),

    // =========================================================================
    // Store Errors
    // =========================================================================
    /// Session Store failure, propagated unchanged.
    #[error(transparent)]
    Db(#[from] DbError),

    // =========================================================================
    // Configuration Errors
    // =========================================================================
    /// Invalid engine configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Failed to load config file.
    #[error("Failed to load config: {0}")]
    ConfigLoadFailed(String),

    /// Failed to save config file.
    #[error("Failed to save config: {0}")]
    ConfigSaveFailed(String),

    /// File system error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

// =============================================================================
// Error Conversions
// =============================================================================

impl From<ValidationError> for EngineError {
    fn from(err: ValidationError) -> Self {
        EngineError::Core(CoreError::Validation(err))
    }
}

impl From<toml::de::Error> for EngineError {
    fn from(err: toml::de::Error) -> Self {
        EngineError::ConfigLoadFailed(err.to_string())
    }
}

impl From<toml::ser::Error> for EngineError {
    fn from(err: toml::ser::Error) -> Self {
        EngineError::ConfigSaveFailed(err.to_string())
    }
}

// =============================================================================
// Error Categorization
// =============================================================================

impl EngineError {
    /// Returns the category of this error.
    pub fn category(&self) -> ErrorCategory {
        match self {
            EngineError::Core(err) => err.category(),
            EngineError::Db(_)
            | EngineError::Config(_)
            | EngineError::ConfigLoadFailed(_)
            | EngineError::ConfigSaveFailed(_)
            | EngineError::Io(_) => ErrorCategory::Infrastructure,
        }
    }

    /// Returns true if repeating the same call may succeed without any
    /// change in session state.
    ///
    /// ## Retryable Errors
    /// - Connection failures
    /// - Pool exhaustion
    ///
    /// Workflow errors are never retryable: a second `close` after
    /// `NotOpen` yields `NotOpen` again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            EngineError::Db(DbError::ConnectionFailed(_)) | EngineError::Db(DbError::PoolExhausted)
        )
    }

    /// Returns true if this error indicates a configuration problem.
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            EngineError::Config(_) | EngineError::ConfigLoadFailed(_) | EngineError::ConfigSaveFailed(_)
        )
    }

    /// Returns the workflow error, if this is one.
    pub fn as_core(&self) -> Option<&CoreError> {
        match self {
            EngineError::Core(err) => Some(err),
            _ => None,
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> ErrorCode {
        match self {
            EngineError::Core(err) => match err {
                CoreError::AlreadyOpen { .. } => ErrorCode::AlreadyOpen,
                CoreError::NotOpen { .. } => ErrorCode::NotOpen,
                CoreError::NoOpenSession { .. } => ErrorCode::NoOpenSession,
                CoreError::SessionNotFound(_) => ErrorCode::SessionNotFound,
                CoreError::InvalidAmount { .. } => ErrorCode::InvalidAmount,
                CoreError::ConcurrentModification { .. } => ErrorCode::ConcurrentModification,
                CoreError::Validation(_) => ErrorCode::ValidationError,
            },
            EngineError::Db(_) => ErrorCode::DatabaseError,
            EngineError::Config(_)
            | EngineError::ConfigLoadFailed(_)
            | EngineError::ConfigSaveFailed(_) => ErrorCode::ConfigError,
            EngineError::Io(_) => ErrorCode::IoError,
        }
    }
}

// =============================================================================
// Error Report
// =============================================================================

/// Error codes for programmatic handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    AlreadyOpen,
    NotOpen,
    NoOpenSession,
    SessionNotFound,
    InvalidAmount,
    ConcurrentModification,
    ValidationError,
    DatabaseError,
    ConfigError,
    IoError,
}

/// Serializable view of an [`EngineError`].
///
/// ## Example
/// ```json
/// {
///   "code": "NOT_OPEN",
///   "category": "conflict",
///   "message": "Cash session 3f2a... is not open (status: balanced)"
/// }
/// ```
#[derive(Debug, Clone, Serialize)]
pub struct ErrorReport {
    pub code: ErrorCode,
    pub category: ErrorCategory,
    pub message: String,
}

impl From<&EngineError> for ErrorReport {
    fn from(err: &EngineError) -> Self {
        ErrorReport {
            code: err.code(),
            category: err.category(),
            message: err.to_string(),
        }
    }
}
