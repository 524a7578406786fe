//! # till-core: Pure Cash-Drawer Logic for Till
//!
//! This crate is the **heart** of Till. It contains the cash session data
//! model and the reconciliation arithmetic as pure functions with zero I/O
//! dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          Till Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │              Back office / Sales / Expenses collaborators       │   │
//! │  │    open drawer ──► sale/expense events ──► count & close        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                till-engine (TillService)                        │   │
//! │  │    controller, aggregator, history reader                       │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ till-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌────────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money    │  │ reconcile │  │ validation│  │   │
//! │  │   │CashSession│  │   Money    │  │ expected  │  │   rules   │  │   │
//! │  │   │  Summary  │  │denomination│  │ counted   │  │  checks   │  │   │
//! │  │   └───────────┘  └────────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    till-db (Session Store)                      │   │
//! │  │              SQLite queries, migrations, repositories           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Session data model (CashSession, SessionSummary, CashEvent, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`denomination`] - Closed set of bills/coins and the counted breakdown
//! - [`reconcile`] - The reconciliation engine (expected vs counted)
//! - [`error`] - Domain error types
//! - [`validation`] - Boundary validation
//!
//! ## Example Usage
//!
//! ```rust
//! use till_core::denomination::{CashBreakdown, Denomination};
//! use till_core::money::Money;
//! use till_core::reconcile::{reconcile, Classification};
//! use till_core::types::SessionSummary;
//!
//! let summary = SessionSummary {
//!     cash_sales_total_cents: 123_000,
//!     sales_count: 12,
//!     total_expenses_cents: 8_000,
//!     expenses_count: 1,
//! };
//! let counted = CashBreakdown::from_counts([
//!     (Denomination::Bill100, 16),
//!     (Denomination::Bill50, 1),
//! ])
//! .unwrap();
//!
//! let result = reconcile(Money::from_cents(50_000), &summary, &counted);
//! assert_eq!(result.expected_total.cents(), 165_000);
//! assert_eq!(result.classification, Classification::Exact);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod denomination;
pub mod error;
pub mod money;
pub mod reconcile;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use denomination::{BreakdownLine, CashBreakdown, Denomination, DenominationKind};
pub use error::{CoreError, CoreResult, ErrorCategory, ValidationError};
pub use money::Money;
pub use reconcile::{reconcile, Classification, Reconciliation};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum units of a single denomination accepted in one count.
///
/// Catches fat-finger entries (10000 typed instead of 100) before they
/// become a permanent part of the audit history.
pub const MAX_DENOMINATION_COUNT: i64 = 100_000;

/// Largest single monetary amount accepted, in cents ($1,000,000.00).
///
/// Applies to opening amounts and to individual sale/expense events.
pub const MAX_CASH_AMOUNT_CENTS: i64 = 100_000_000;

/// Maximum length of opening/closing notes.
pub const MAX_NOTES_LENGTH: usize = 500;

/// Maximum length of branch and user identifiers.
pub const MAX_IDENTIFIER_LENGTH: usize = 64;
