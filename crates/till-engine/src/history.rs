//! # History/Audit Reader
//!
//! Read-only projection over the Session Store.
//!
//! Aggregates are sums of persisted closing columns. They are never rebuilt
//! from the movement ledger: a voided session's movements have already lost
//! their attribution.

use tracing::debug;

use till_core::validation::{validate_identifier, validate_pagination, validate_uuid};
use till_core::{
    BranchReport, CashMovement, CashSession, CoreError, DateRange, HistoryFilter, Page, Pagination,
    ValidationError,
};
use till_db::Database;

use crate::error::EngineResult;

/// Serves history listings, movement ledgers and branch reports.
#[derive(Debug, Clone)]
pub struct HistoryReader {
    db: Database,
    default_page_size: u32,
    max_page_size: u32,
}

impl HistoryReader {
    /// Creates a reader over the given store.
    pub fn new(db: Database, default_page_size: u32, max_page_size: u32) -> Self {
        HistoryReader {
            db,
            default_page_size,
            max_page_size,
        }
    }

    /// First page at the configured default size.
    pub fn default_pagination(&self) -> Pagination {
        Pagination::first(self.default_page_size)
    }

    /// Terminal sessions of a branch, most recently ended first.
    pub async fn list_history(
        &self,
        branch_id: &str,
        filter: HistoryFilter,
        pagination: Pagination,
    ) -> EngineResult<Page<CashSession>> {
        let branch_id = validate_identifier("branch_id", branch_id)?;
        let pagination = validate_pagination(pagination, self.max_page_size)?;
        check_range(&filter.range)?;

        let page = self
            .db
            .sessions()
            .list_history(&branch_id, &filter, pagination)
            .await?;

        debug!(
            branch_id = %branch_id,
            total = page.total,
            offset = page.offset,
            returned = page.items.len(),
            "History page served"
        );

        Ok(page)
    }

    /// Movements currently attributed to a session.
    ///
    /// Empty for a voided session; see [`HistoryReader::list_detached_movements`].
    pub async fn list_movements(&self, session_id: &str) -> EngineResult<Vec<CashMovement>> {
        let session_id = self.require_session(session_id).await?;
        Ok(self.db.movements().list_by_session(&session_id).await?)
    }

    /// Movements that belonged to a session before it was voided.
    pub async fn list_detached_movements(&self, session_id: &str) -> EngineResult<Vec<CashMovement>> {
        let session_id = self.require_session(session_id).await?;
        Ok(self.db.movements().list_detached_from(&session_id).await?)
    }

    /// Shortage/surplus and cash totals for a branch over a period.
    pub async fn branch_report(&self, branch_id: &str, range: DateRange) -> EngineResult<BranchReport> {
        let branch_id = validate_identifier("branch_id", branch_id)?;
        check_range(&range)?;

        let report = self.db.sessions().branch_report(&branch_id, range).await?;

        debug!(
            branch_id = %branch_id,
            net_difference_cents = report.net_difference_cents,
            shortage_sessions = report.shortage_sessions,
            "Branch report computed"
        );

        Ok(report)
    }

    async fn require_session(&self, session_id: &str) -> EngineResult<String> {
        validate_uuid(session_id)?;
        let session_id = session_id.trim();

        match self.db.sessions().get_by_id(session_id).await? {
            Some(session) => Ok(session.id),
            None => Err(CoreError::SessionNotFound(session_id.to_string()).into()),
        }
    }
}

fn check_range(range: &DateRange) -> Result<(), ValidationError> {
    if range.is_well_formed() {
        Ok(())
    } else {
        Err(ValidationError::InvalidFormat {
            field: "range".to_string(),
            reason: "from must not be after to".to_string(),
        })
    }
}
