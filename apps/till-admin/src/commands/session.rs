//! # Session Commands

use serde::Serialize;
use tracing::debug;

use till_core::{BreakdownLine, CashBreakdown, CashSession, Denomination, Money};
use till_engine::{CloseSession, EngineResult, OpenSession, TillService};

/// What `close` prints: the closed session plus its counted lines.
#[derive(Debug, Clone, Serialize)]
pub struct CloseResponse {
    pub session: CashSession,
    pub lines: Vec<BreakdownLine>,
}

pub async fn open(
    service: &TillService,
    branch_id: String,
    amount: Money,
    acting_user_id: String,
    notes: Option<String>,
) -> EngineResult<CashSession> {
    debug!(branch_id = %branch_id, amount = %amount, "open command");

    service
        .open_session(OpenSession {
            branch_id,
            opening_amount_cents: amount.cents(),
            opening_notes: notes,
            acting_user_id,
        })
        .await
}

pub async fn active(service: &TillService, branch_id: &str) -> EngineResult<CashSession> {
    service.get_active_session(branch_id).await
}

pub async fn show(service: &TillService, session_id: &str) -> EngineResult<CashSession> {
    service.get_session(session_id).await
}

pub async fn close(
    service: &TillService,
    session_id: String,
    acting_user_id: String,
    counts: Vec<(Denomination, i64)>,
    notes: Option<String>,
) -> EngineResult<CloseResponse> {
    let cash_breakdown = CashBreakdown::from_counts(counts)?;
    debug!(
        session_id = %session_id,
        counted = %cash_breakdown.total(),
        "close command"
    );

    let session = service
        .close_session(CloseSession {
            session_id,
            cash_breakdown,
            closing_notes: notes,
            acting_user_id,
        })
        .await?;

    let lines = session
        .closing
        .as_ref()
        .map(|closing| closing.cash_breakdown.lines())
        .unwrap_or_default();

    Ok(CloseResponse { session, lines })
}

pub async fn reset(
    service: &TillService,
    session_id: &str,
    acting_user_id: &str,
) -> EngineResult<CashSession> {
    service.reset_session(session_id, acting_user_id).await
}
