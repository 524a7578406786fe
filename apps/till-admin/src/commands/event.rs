//! # Cash Event Commands

use chrono::Utc;

use till_core::{CashEvent, CashMovement, Money};
use till_engine::{EngineResult, TillService};

use crate::args::EventKindArg;

pub async fn record(
    service: &TillService,
    branch_id: String,
    kind: EventKindArg,
    amount: Money,
    reference: Option<String>,
    recorded_by: Option<String>,
) -> EngineResult<CashMovement> {
    service
        .record_cash_event(CashEvent {
            branch_id,
            kind: kind.into(),
            amount_cents: amount.cents(),
            reference,
            recorded_by,
            occurred_at: Utc::now(),
        })
        .await
}
