//! # Domain Types
//!
//! The cash session data model used throughout Till.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌───────────────────────────────────────────────────────────────┐     │
//! │  │ CashSession                                                   │     │
//! │  │  id, branch_id, status, version                               │     │
//! │  │  opened_by, opened_at, opening_amount_cents, opening_notes    │     │
//! │  │  ┌──────────────────┐ ┌──────────────────┐ ┌──────────────┐   │     │
//! │  │  │ SessionSummary   │ │ SessionClosing?  │ │ SessionVoid? │   │     │
//! │  │  │ (mutable: OPEN)  │ │ (CLOSED/BALANCED)│ │ (VOIDED)     │   │     │
//! │  │  └──────────────────┘ └──────────────────┘ └──────────────┘   │     │
//! │  └───────────────────────────────────────────────────────────────┘     │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   CashEvent     │   │  CashMovement   │   │  BranchReport   │       │
//! │  │  (incoming)     │──►│  (ledger row)   │   │  (aggregates)   │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Session State Machine
//! ```text
//!            open                close (difference == 0)
//!   ∅ ───────────────► OPEN ─────────────────────────► BALANCED
//!                        │ │     close (difference != 0)
//!                        │ └───────────────────────────► CLOSED
//!                        │       reset
//!                        └─────────────────────────────► VOIDED
//!
//!   CLOSED, BALANCED, VOIDED are terminal.
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::denomination::CashBreakdown;
use crate::money::Money;
use crate::reconcile::Classification;

// =============================================================================
// Session Status
// =============================================================================

/// The lifecycle status of a cash session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Drawer is in use; summary accepts events.
    Open,
    /// Closed with a non-zero difference.
    Closed,
    /// Closed with an exact match.
    Balanced,
    /// Ended by an administrative reset, never reconciled.
    Voided,
}

impl SessionStatus {
    /// Terminal statuses.
    pub const TERMINAL: [SessionStatus; 3] = [
        SessionStatus::Closed,
        SessionStatus::Balanced,
        SessionStatus::Voided,
    ];

    /// True for CLOSED, BALANCED and VOIDED.
    #[inline]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, SessionStatus::Open)
    }

    /// Lowercase name, as stored.
    pub const fn as_str(&self) -> &'static str {
        match self {
            SessionStatus::Open => "open",
            SessionStatus::Closed => "closed",
            SessionStatus::Balanced => "balanced",
            SessionStatus::Voided => "voided",
        }
    }
}

impl Default for SessionStatus {
    fn default() -> Self {
        SessionStatus::Open
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Session Summary
// =============================================================================

/// Running cash totals of a session.
///
/// Only ever grows while the session is open; frozen afterwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SessionSummary {
    /// Sum of cash-tendered sale amounts attributed to this session.
    pub cash_sales_total_cents: i64,
    pub sales_count: i64,
    /// Sum of cash expenses paid out of this drawer.
    pub total_expenses_cents: i64,
    pub expenses_count: i64,
}

impl SessionSummary {
    #[inline]
    pub fn cash_sales_total(&self) -> Money {
        Money::from_cents(self.cash_sales_total_cents)
    }

    #[inline]
    pub fn total_expenses(&self) -> Money {
        Money::from_cents(self.total_expenses_cents)
    }

    /// Sales minus expenses.
    pub fn net_cash_flow(&self) -> Money {
        self.cash_sales_total() - self.total_expenses()
    }

    /// Returns the summary after applying one event.
    pub fn with_event(mut self, kind: CashEventKind, amount: Money) -> Self {
        match kind {
            CashEventKind::Sale => {
                self.cash_sales_total_cents += amount.cents();
                self.sales_count += 1;
            }
            CashEventKind::Expense => {
                self.total_expenses_cents += amount.cents();
                self.expenses_count += 1;
            }
        }
        self
    }
}

// =============================================================================
// Closing / Void Records
// =============================================================================

/// The reconciliation record written once, atomically, at close.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SessionClosing {
    pub closed_by: String,
    #[ts(as = "String")]
    pub closed_at: DateTime<Utc>,
    pub cash_breakdown: CashBreakdown,
    pub counted_total_cents: i64,
    pub expected_total_cents: i64,
    /// counted - expected. Negative is a shortage.
    pub difference_cents: i64,
    pub classification: Classification,
    pub closing_notes: Option<String>,
}

impl SessionClosing {
    #[inline]
    pub fn difference(&self) -> Money {
        Money::from_cents(self.difference_cents)
    }
}

/// Audit stamp of an administrative reset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SessionVoid {
    pub voided_by: String,
    #[ts(as = "String")]
    pub voided_at: DateTime<Utc>,
}

// =============================================================================
// Cash Session
// =============================================================================

/// One cash-drawer accounting period between an open and a close/void.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CashSession {
    /// Unique identifier (UUID v4).
    pub id: String,
    pub branch_id: String,
    pub status: SessionStatus,
    pub opened_by: String,
    #[ts(as = "String")]
    pub opened_at: DateTime<Utc>,
    /// Counted into the drawer at open, never negative.
    pub opening_amount_cents: i64,
    pub opening_notes: Option<String>,
    pub summary: SessionSummary,
    /// Present once CLOSED or BALANCED.
    pub closing: Option<SessionClosing>,
    /// Present once VOIDED.
    pub voided: Option<SessionVoid>,
    /// Compare-and-swap token, bumped by every mutation.
    pub version: i64,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl CashSession {
    #[inline]
    pub fn opening_amount(&self) -> Money {
        Money::from_cents(self.opening_amount_cents)
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.status == SessionStatus::Open
    }

    /// When the session left OPEN, if it has.
    pub fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.closing
            .as_ref()
            .map(|c| c.closed_at)
            .or_else(|| self.voided.as_ref().map(|v| v.voided_at))
    }
}

// =============================================================================
// Cash Events
// =============================================================================

/// Kind of cash-affecting event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum CashEventKind {
    /// Cash-tendered sale completed.
    Sale,
    /// Cash paid out of the drawer.
    Expense,
}

impl fmt::Display for CashEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CashEventKind::Sale => f.write_str("sale"),
            CashEventKind::Expense => f.write_str("expense"),
        }
    }
}

/// A cash movement reported by the Sales or Expense subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CashEvent {
    pub branch_id: String,
    pub kind: CashEventKind,
    /// Strictly positive.
    pub amount_cents: i64,
    /// Receipt number, expense voucher, etc.
    pub reference: Option<String>,
    pub recorded_by: Option<String>,
    #[ts(as = "String")]
    pub occurred_at: DateTime<Utc>,
}

impl CashEvent {
    /// A sale event stamped now.
    pub fn sale(branch_id: impl Into<String>, amount: Money) -> Self {
        Self::new(branch_id, CashEventKind::Sale, amount)
    }

    /// An expense event stamped now.
    pub fn expense(branch_id: impl Into<String>, amount: Money) -> Self {
        Self::new(branch_id, CashEventKind::Expense, amount)
    }

    fn new(branch_id: impl Into<String>, kind: CashEventKind, amount: Money) -> Self {
        CashEvent {
            branch_id: branch_id.into(),
            kind,
            amount_cents: amount.cents(),
            reference: None,
            recorded_by: None,
            occurred_at: Utc::now(),
        }
    }

    pub fn with_reference(mut self, reference: impl Into<String>) -> Self {
        self.reference = Some(reference.into());
        self
    }

    pub fn with_recorded_by(mut self, user_id: impl Into<String>) -> Self {
        self.recorded_by = Some(user_id.into());
        self
    }

    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

/// Ledger row of an accepted cash event.
///
/// `session_id` is cleared when the session is voided; the original
/// attribution is kept in `detached_from_session_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CashMovement {
    pub id: String,
    pub session_id: Option<String>,
    pub detached_from_session_id: Option<String>,
    pub branch_id: String,
    pub kind: CashEventKind,
    pub amount_cents: i64,
    pub reference: Option<String>,
    pub recorded_by: Option<String>,
    #[ts(as = "String")]
    pub occurred_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub recorded_at: DateTime<Utc>,
}

// =============================================================================
// History Queries
// =============================================================================

/// Half-open time window `[from, to)`. Missing bounds are unbounded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DateRange {
    #[ts(as = "Option<String>")]
    pub from: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub to: Option<DateTime<Utc>>,
}

impl DateRange {
    /// No bounds.
    pub fn all() -> Self {
        DateRange::default()
    }

    pub fn between(from: DateTime<Utc>, to: DateTime<Utc>) -> Self {
        DateRange {
            from: Some(from),
            to: Some(to),
        }
    }

    /// True when `at` falls inside the window.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.from.map_or(true, |from| at >= from) && self.to.map_or(true, |to| at < to)
    }

    /// True when `from` is not after `to`.
    pub fn is_well_formed(&self) -> bool {
        match (self.from, self.to) {
            (Some(from), Some(to)) => from <= to,
            _ => true,
        }
    }
}

/// Offset/limit paging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Pagination {
    pub offset: u32,
    pub limit: u32,
}

impl Pagination {
    pub fn new(offset: u32, limit: u32) -> Self {
        Pagination { offset, limit }
    }

    /// First page of `limit` rows.
    pub fn first(limit: u32) -> Self {
        Pagination { offset: 0, limit }
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Pagination {
            offset: 0,
            limit: 50,
        }
    }
}

/// One page of results plus the total number of matches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub offset: u32,
    pub limit: u32,
}

impl<T> Page<T> {
    /// True when more rows exist after this page.
    pub fn has_more(&self) -> bool {
        (self.offset as i64) + (self.items.len() as i64) < self.total
    }
}

/// Filters for history listing.
///
/// An empty `statuses` means every terminal status.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct HistoryFilter {
    pub statuses: Vec<SessionStatus>,
    pub range: DateRange,
    pub classification: Option<Classification>,
}

impl HistoryFilter {
    pub fn in_range(range: DateRange) -> Self {
        HistoryFilter {
            range,
            ..Default::default()
        }
    }

    /// Terminal statuses this filter selects.
    pub fn effective_statuses(&self) -> Vec<SessionStatus> {
        let selected: Vec<SessionStatus> = self
            .statuses
            .iter()
            .copied()
            .filter(SessionStatus::is_terminal)
            .collect();
        if selected.is_empty() {
            SessionStatus::TERMINAL.to_vec()
        } else {
            selected
        }
    }
}

/// Branch-level aggregates over persisted session results.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BranchReport {
    pub branch_id: String,
    pub range: DateRange,
    pub sessions_closed: i64,
    pub sessions_balanced: i64,
    pub sessions_voided: i64,
    pub shortage_sessions: i64,
    pub surplus_sessions: i64,
    /// Absolute value of all negative differences.
    pub total_shortage_cents: i64,
    pub total_surplus_cents: i64,
    /// Σ difference over reconciled sessions.
    pub net_difference_cents: i64,
    pub total_cash_sales_cents: i64,
    pub total_expenses_cents: i64,
}

// =============================================================================
// Unit Tests
// =============================================================================
