//! # History Commands

use serde::Serialize;

use till_core::{
    BranchReport, CashMovement, CashSession, DateRange, HistoryFilter, Page, Pagination,
};
use till_engine::{EngineResult, TillService};

use crate::args::{ClassificationArg, Instant, StatusArg};

pub struct HistoryArgs {
    pub statuses: Vec<StatusArg>,
    pub classification: Option<ClassificationArg>,
    pub from: Option<Instant>,
    pub to: Option<Instant>,
    pub offset: u32,
    pub limit: Option<u32>,
}

#[derive(Debug, Clone, Serialize)]
pub struct MovementsResponse {
    pub session_id: String,
    pub detached: bool,
    pub total_cents: i64,
    pub movements: Vec<CashMovement>,
}

fn range(from: Option<Instant>, to: Option<Instant>) -> DateRange {
    DateRange {
        from: from.map(|i| i.0),
        to: to.map(|i| i.0),
    }
}

pub async fn list(
    service: &TillService,
    branch_id: &str,
    args: HistoryArgs,
) -> EngineResult<Page<CashSession>> {
    let filter = HistoryFilter {
        statuses: args.statuses.into_iter().map(Into::into).collect(),
        range: range(args.from, args.to),
        classification: args.classification.map(Into::into),
    };
    let limit = args
        .limit
        .unwrap_or_else(|| service.default_pagination().limit);

    service
        .list_history(branch_id, filter, Pagination::new(args.offset, limit))
        .await
}

pub async fn movements(
    service: &TillService,
    session_id: &str,
    detached: bool,
) -> EngineResult<MovementsResponse> {
    let movements = if detached {
        service.list_detached_movements(session_id).await?
    } else {
        service.list_movements(session_id).await?
    };

    Ok(MovementsResponse {
        session_id: session_id.trim().to_string(),
        detached,
        total_cents: movements.iter().map(|m| m.amount_cents).sum(),
        movements,
    })
}

pub async fn report(
    service: &TillService,
    branch_id: &str,
    from: Option<Instant>,
    to: Option<Instant>,
) -> EngineResult<BranchReport> {
    service.branch_report(branch_id, range(from, to)).await
}
