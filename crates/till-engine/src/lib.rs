//! # till-engine: Cash Session Engine for Till
//!
//! Lifecycle, aggregation and history on top of the Session Store.
//!
//! ## Request Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Till Request Flow                              │
//! │                                                                         │
//! │  Back office / Sales / Expenses / till-admin                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  TillService (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │  validate ──► LifecycleController ──► reconcile (till-core)    │   │
//! │  │          ──► CashEventAggregator                               │   │
//! │  │          ──► HistoryReader                                     │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  till-db: SessionRepository / MovementRepository (SQLite)              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`service`] - The `TillService` facade
//! - [`controller`] - Open/close/reset state machine
//! - [`aggregator`] - Sale and expense events
//! - [`history`] - History listing, movements, branch reports
//! - [`config`] - TOML + environment configuration
//! - [`error`] - Engine error taxonomy
//! - [`telemetry`] - Tracing subscriber setup
//!
//! ## Usage
//!
//! ```rust,ignore
//! use till_engine::{EngineConfig, OpenSession, TillService};
//!
//! let service = TillService::connect(&EngineConfig::load(None)?).await?;
//! let session = service
//!     .open_session(OpenSession {
//!         branch_id: "north".into(),
//!         opening_amount_cents: 50_000,
//!         opening_notes: None,
//!         acting_user_id: "alice".into(),
//!     })
//!     .await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod aggregator;
pub mod config;
pub mod controller;
pub mod error;
pub mod history;
pub mod service;
pub mod telemetry;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::EngineConfig;
pub use controller::{CloseSession, OpenSession};
pub use error::{EngineError, EngineResult, ErrorCode, ErrorReport};
pub use service::{HealthReport, TillService};
pub use telemetry::init_tracing;
