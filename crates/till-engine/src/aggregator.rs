//! # Cash Event Aggregator
//!
//! The only write path into a session's summary.
//!
//! ## Message Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                     Cash Event Aggregator                               │
//! │                                                                         │
//! │  Sales ─────┐                                                          │
//! │             │ CashEvent { branch, Sale, 12.50 }                        │
//! │  Expenses ──┼──────────────▶ validate ──▶ Session Store                │
//! │             │                             UPDATE ... SET               │
//! │  Register ──┘                               total = total + ?          │
//! │                                           WHERE branch = ?             │
//! │                                             AND status = 'open'        │
//! │                                                  │                     │
//! │                              ┌───────────────────┴──────────┐          │
//! │                              ▼                              ▼          │
//! │                      1 row: movement               0 rows: nothing     │
//! │                      appended, returned            written,            │
//! │                                                    NoOpenSession       │
//! │                                                                         │
//! │  Increments are ADDITIVE: sale(+5) then sale(+3) == sale(+3) then     │
//! │  sale(+5). No lock, no read-modify-write in memory.                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use tracing::{debug, warn};

use till_core::validation::{validate_event_amount, validate_identifier, validate_reference};
use till_core::{CashEvent, CashMovement, CoreError};
use till_db::Database;

use crate::error::EngineResult;

/// Folds sale and expense events into the branch's open session.
#[derive(Debug, Clone)]
pub struct CashEventAggregator {
    db: Database,
}

impl CashEventAggregator {
    /// Creates an aggregator over the given store.
    pub fn new(db: Database) -> Self {
        CashEventAggregator { db }
    }

    /// Records one cash-tendered sale or cash expense.
    ///
    /// ## Returns
    /// * `Ok(movement)` - The ledger row written alongside the increment
    /// * `Err(NoOpenSession)` - The branch has no open session; nothing written
    /// * `Err(InvalidAmount)` - Zero, negative or oversized amount
    pub async fn record(&self, event: CashEvent) -> EngineResult<CashMovement> {
        let branch_id = validate_identifier("branch_id", &event.branch_id)?;
        validate_event_amount(event.amount_cents)
            .map_err(|e| CoreError::invalid_amount("amount", e.to_string()))?;
        let reference = validate_reference(event.reference.as_deref())?;
        let recorded_by = match event.recorded_by.as_deref().map(str::trim) {
            Some(user) if !user.is_empty() => Some(validate_identifier("recorded_by", user)?),
            _ => None,
        };

        let event = CashEvent {
            branch_id,
            reference,
            recorded_by,
            ..event
        };

        match self.db.sessions().apply_cash_event(&event).await? {
            Some(movement) => {
                debug!(
                    movement_id = %movement.id,
                    session_id = ?movement.session_id,
                    kind = %movement.kind,
                    amount = %till_core::Money::from_cents(movement.amount_cents),
                    "Cash event recorded"
                );
                Ok(movement)
            }
            None => {
                warn!(
                    branch_id = %event.branch_id,
                    kind = %event.kind,
                    amount_cents = event.amount_cents,
                    reference = ?event.reference,
                    "Cash event rejected: branch has no open session"
                );
                Err(CoreError::NoOpenSession {
                    branch_id: event.branch_id,
                }
                .into())
            }
        }
    }
}
