//! # Cash Session Repository
//!
//! Database operations for cash sessions.
//!
//! ## Session Lifecycle in SQL
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                       Session Lifecycle                                 │
//! │                                                                         │
//! │  1. OPEN                                                               │
//! │     └── create() → single INSERT                                       │
//! │         partial UNIQUE (branch_id) WHERE status = 'open'               │
//! │         rejects a second open session → DbError::Conflict              │
//! │                                                                         │
//! │  2. EVENTS (concurrent)                                                │
//! │     └── apply_cash_event() → UPDATE ... SET total = total + ?          │
//! │         WHERE branch_id = ? AND status = 'open' RETURNING id           │
//! │         + INSERT INTO cash_movements (same transaction)                │
//! │                                                                         │
//! │  3a. CLOSE                                                             │
//! │     └── close_counted() → claim write lock, read, reconcile,           │
//! │         UPDATE ... WHERE id = ? AND status = 'open' AND version = ?    │
//! │         (one transaction; events wait instead of racing the count)     │
//! │                                                                         │
//! │  3b. RESET                                                             │
//! │     └── void() → UPDATE ... WHERE id = ? AND status = 'open'           │
//! │         + detach movements (same transaction)                          │
//! │                                                                         │
//! │  Every mutating statement carries status = 'open', so terminal rows    │
//! │  can never change again.                                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::movement::insert_movement;
use till_core::{
    reconcile, BranchReport, CashBreakdown, CashEvent, CashEventKind, CashMovement, CashSession,
    Classification, DateRange, HistoryFilter, Page, Pagination, Reconciliation, SessionClosing,
    SessionStatus, SessionSummary, SessionVoid,
};

/// Column list shared by every SELECT and RETURNING clause.
const SESSION_COLUMNS: &str = r#"
    id, branch_id, status,
    opened_by, opened_at, opening_amount_cents, opening_notes,
    cash_sales_total_cents, sales_count, total_expenses_cents, expenses_count,
    closed_by, closed_at, cash_breakdown,
    counted_total_cents, expected_total_cents, difference_cents,
    classification, closing_notes,
    voided_by, voided_at,
    version, updated_at
"#;

// =============================================================================
// Inputs
// =============================================================================

/// Validated fields of a session about to be opened.
#[derive(Debug, Clone)]
pub struct NewSession {
    pub branch_id: String,
    pub opened_by: String,
    pub opening_amount_cents: i64,
    pub opening_notes: Option<String>,
}

/// A physical count submitted to close a session.
#[derive(Debug, Clone)]
pub struct CountedClose {
    pub closed_by: String,
    pub cash_breakdown: CashBreakdown,
    pub closing_notes: Option<String>,
}

/// What [`SessionRepository::close_counted`] found.
#[derive(Debug)]
pub enum CloseOutcome {
    /// Closed against the summary read under the write lock.
    Closed {
        session: CashSession,
        reconciliation: Reconciliation,
    },
    /// Already closed or voided; nothing was written.
    NotOpen(CashSession),
    NotFound,
}

// =============================================================================
// Row Mapping
// =============================================================================

/// Flat row as stored in `cash_sessions`.
#[derive(Debug, sqlx::FromRow)]
struct SessionRow {
    id: String,
    branch_id: String,
    status: SessionStatus,
    opened_by: String,
    opened_at: DateTime<Utc>,
    opening_amount_cents: i64,
    opening_notes: Option<String>,
    cash_sales_total_cents: i64,
    sales_count: i64,
    total_expenses_cents: i64,
    expenses_count: i64,
    closed_by: Option<String>,
    closed_at: Option<DateTime<Utc>>,
    cash_breakdown: Option<String>,
    counted_total_cents: Option<i64>,
    expected_total_cents: Option<i64>,
    difference_cents: Option<i64>,
    classification: Option<Classification>,
    closing_notes: Option<String>,
    voided_by: Option<String>,
    voided_at: Option<DateTime<Utc>>,
    version: i64,
    updated_at: DateTime<Utc>,
}

impl SessionRow {
    /// Rebuilds the nested domain model from the flat row.
    fn into_session(self) -> DbResult<CashSession> {
        let closing = match self.status {
            SessionStatus::Closed | SessionStatus::Balanced => Some(self.closing_record()?),
            SessionStatus::Open | SessionStatus::Voided => None,
        };

        let voided = match (self.status, self.voided_at) {
            (SessionStatus::Voided, Some(voided_at)) => Some(SessionVoid {
                voided_by: self.voided_by.clone().unwrap_or_default(),
                voided_at,
            }),
            (SessionStatus::Voided, None) => {
                return Err(DbError::corrupt("CashSession", &self.id, "voided without voided_at"))
            }
            _ => None,
        };

        Ok(CashSession {
            id: self.id,
            branch_id: self.branch_id,
            status: self.status,
            opened_by: self.opened_by,
            opened_at: self.opened_at,
            opening_amount_cents: self.opening_amount_cents,
            opening_notes: self.opening_notes,
            summary: SessionSummary {
                cash_sales_total_cents: self.cash_sales_total_cents,
                sales_count: self.sales_count,
                total_expenses_cents: self.total_expenses_cents,
                expenses_count: self.expenses_count,
            },
            closing,
            voided,
            version: self.version,
            updated_at: self.updated_at,
        })
    }

    fn closing_record(&self) -> DbResult<SessionClosing> {
        let missing = |column: &str| DbError::corrupt("CashSession", &self.id, format!("missing {}", column));

        let cash_breakdown: CashBreakdown = match &self.cash_breakdown {
            Some(json) => serde_json::from_str(json).map_err(|e| {
                DbError::corrupt("CashSession", &self.id, format!("cash_breakdown: {}", e))
            })?,
            None => return Err(missing("cash_breakdown")),
        };

        Ok(SessionClosing {
            closed_by: self.closed_by.clone().ok_or_else(|| missing("closed_by"))?,
            closed_at: self.closed_at.ok_or_else(|| missing("closed_at"))?,
            cash_breakdown,
            counted_total_cents: self.counted_total_cents.ok_or_else(|| missing("counted_total_cents"))?,
            expected_total_cents: self
                .expected_total_cents
                .ok_or_else(|| missing("expected_total_cents"))?,
            difference_cents: self.difference_cents.ok_or_else(|| missing("difference_cents"))?,
            classification: self.classification.ok_or_else(|| missing("classification"))?,
            closing_notes: self.closing_notes.clone(),
        })
    }
}

/// Aggregate row for [`SessionRepository::branch_report`].
#[derive(Debug, sqlx::FromRow)]
struct ReportRow {
    sessions_closed: i64,
    sessions_balanced: i64,
    sessions_voided: i64,
    shortage_sessions: i64,
    surplus_sessions: i64,
    total_shortage_cents: i64,
    total_surplus_cents: i64,
    net_difference_cents: i64,
    total_cash_sales_cents: i64,
    total_expenses_cents: i64,
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for cash session database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.sessions();
///
/// let open = repo.find_open_by_branch("north").await?;
/// let session = repo.get_by_id("uuid-here").await?;
/// ```
#[derive(Debug, Clone)]
pub struct SessionRepository {
    pool: SqlitePool,
}

impl SessionRepository {
    /// Creates a new SessionRepository.
    pub fn new(pool: SqlitePool) -> Self {
        SessionRepository { pool }
    }

    /// Gets the branch's OPEN session, if any.
    pub async fn find_open_by_branch(&self, branch_id: &str) -> DbResult<Option<CashSession>> {
        let sql = format!(
            "SELECT {} FROM cash_sessions WHERE branch_id = ?1 AND status = 'open'",
            SESSION_COLUMNS
        );

        let row: Option<SessionRow> = sqlx::query_as(&sql)
            .bind(branch_id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(SessionRow::into_session).transpose()
    }

    /// Gets a session by ID, whatever its status.
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<CashSession>> {
        let sql = format!("SELECT {} FROM cash_sessions WHERE id = ?1", SESSION_COLUMNS);

        let row: Option<SessionRow> = sqlx::query_as(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(SessionRow::into_session).transpose()
    }

    /// Inserts a new OPEN session.
    ///
    /// ## Atomicity
    /// The existence check and the insert are one statement: the partial
    /// unique index turns a second open session for the branch into
    /// `DbError::Conflict`.
    pub async fn create(&self, new: &NewSession) -> DbResult<CashSession> {
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        debug!(
            id = %id,
            branch_id = %new.branch_id,
            opening_amount_cents = new.opening_amount_cents,
            "Creating cash session"
        );

        sqlx::query(
            r#"
            INSERT INTO cash_sessions (
                id, branch_id, status,
                opened_by, opened_at, opening_amount_cents, opening_notes,
                version, updated_at
            ) VALUES (
                ?1, ?2, 'open',
                ?3, ?4, ?5, ?6,
                0, ?4
            )
            "#,
        )
        .bind(&id)
        .bind(&new.branch_id)
        .bind(&new.opened_by)
        .bind(now)
        .bind(new.opening_amount_cents)
        .bind(&new.opening_notes)
        .execute(&self.pool)
        .await?;

        Ok(CashSession {
            id,
            branch_id: new.branch_id.clone(),
            status: SessionStatus::Open,
            opened_by: new.opened_by.clone(),
            opened_at: now,
            opening_amount_cents: new.opening_amount_cents,
            opening_notes: new.opening_notes.clone(),
            summary: SessionSummary::default(),
            closing: None,
            voided: None,
            version: 0,
            updated_at: now,
        })
    }

    /// Folds one cash event into the branch's OPEN session.
    ///
    /// ## What This Does
    /// 1. Increments the matching total and count in SQL (no read first)
    /// 2. Appends the movement to the ledger
    /// 3. Commits both or neither
    ///
    /// ## Returns
    /// * `Ok(Some(movement))` - Event applied
    /// * `Ok(None)` - The branch has no open session; nothing was written
    pub async fn apply_cash_event(&self, event: &CashEvent) -> DbResult<Option<CashMovement>> {
        let now = Utc::now();
        let (sales_cents, sales_n, expense_cents, expense_n) = match event.kind {
            CashEventKind::Sale => (event.amount_cents, 1_i64, 0_i64, 0_i64),
            CashEventKind::Expense => (0, 0, event.amount_cents, 1),
        };

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let session_id: Option<String> = sqlx::query_scalar(
            r#"
            UPDATE cash_sessions SET
                cash_sales_total_cents = cash_sales_total_cents + ?1,
                sales_count = sales_count + ?2,
                total_expenses_cents = total_expenses_cents + ?3,
                expenses_count = expenses_count + ?4,
                version = version + 1,
                updated_at = ?5
            WHERE branch_id = ?6 AND status = 'open'
            RETURNING id
            "#,
        )
        .bind(sales_cents)
        .bind(sales_n)
        .bind(expense_cents)
        .bind(expense_n)
        .bind(now)
        .bind(&event.branch_id)
        .fetch_optional(&mut *tx)
        .await?;

        let Some(session_id) = session_id else {
            // Dropping the transaction rolls it back
            return Ok(None);
        };

        let movement = CashMovement {
            id: Uuid::new_v4().to_string(),
            session_id: Some(session_id),
            detached_from_session_id: None,
            branch_id: event.branch_id.clone(),
            kind: event.kind,
            amount_cents: event.amount_cents,
            reference: event.reference.clone(),
            recorded_by: event.recorded_by.clone(),
            occurred_at: event.occurred_at,
            recorded_at: now,
        };
        insert_movement(&mut *tx, &movement).await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        debug!(
            session_id = ?movement.session_id,
            branch_id = %movement.branch_id,
            kind = %movement.kind,
            amount_cents = movement.amount_cents,
            "Cash event applied"
        );

        Ok(Some(movement))
    }

    /// Writes the closing record and flips the status, if nothing moved.
    ///
    /// ## Compare-and-Swap
    /// Matches only `status = 'open' AND version = expected_version`. A miss
    /// returns `DbError::Conflict`; the caller re-reads to learn whether the
    /// session was closed by someone else or merely received another event.
    pub async fn close(
        &self,
        session_id: &str,
        expected_version: i64,
        status: SessionStatus,
        closing: &SessionClosing,
    ) -> DbResult<CashSession> {
        let mut conn = self.pool.acquire().await?;
        write_closing(&mut *conn, session_id, expected_version, status, closing).await
    }

    /// Reconciles a physical count against the latest summary and closes.
    ///
    /// ## What This Does
    /// 1. Claims the SQLite write lock with a no-op UPDATE on the open row
    /// 2. Reads the session inside the same transaction
    /// 3. Runs the pure reconciliation and writes the closing record
    ///
    /// Concurrent events wait on the lock, so the count always reconciles
    /// the summary it freezes.
    pub async fn close_counted(
        &self,
        session_id: &str,
        count: &CountedClose,
    ) -> DbResult<CloseOutcome> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        // First statement writes, so the snapshot read below is the latest one
        let claimed = sqlx::query(
            "UPDATE cash_sessions SET version = version WHERE id = ?1 AND status = 'open'",
        )
        .bind(session_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let sql = format!("SELECT {} FROM cash_sessions WHERE id = ?1", SESSION_COLUMNS);
        let row: Option<SessionRow> = sqlx::query_as(&sql)
            .bind(session_id)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(row) = row else {
            return Ok(CloseOutcome::NotFound);
        };
        let session = row.into_session()?;
        if claimed == 0 || !session.is_open() {
            return Ok(CloseOutcome::NotOpen(session));
        }

        let reconciliation = reconcile(
            session.opening_amount(),
            &session.summary,
            &count.cash_breakdown,
        );
        let closing = SessionClosing {
            closed_by: count.closed_by.clone(),
            closed_at: Utc::now(),
            cash_breakdown: count.cash_breakdown.clone(),
            counted_total_cents: reconciliation.counted_total.cents(),
            expected_total_cents: reconciliation.expected_total.cents(),
            difference_cents: reconciliation.difference.cents(),
            classification: reconciliation.classification,
            closing_notes: count.closing_notes.clone(),
        };

        let closed = write_closing(
            &mut *tx,
            session_id,
            session.version,
            reconciliation.resulting_status(),
            &closing,
        )
        .await?;

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        Ok(CloseOutcome::Closed {
            session: closed,
            reconciliation,
        })
    }

    /// Voids an OPEN session and detaches its movements.
    ///
    /// ## What This Does
    /// 1. CAS `open → voided`, stamping who and when
    /// 2. Moves `session_id` to `detached_from_session_id` on its movements
    ///
    /// Both in one transaction. The frozen summary stays on the row.
    pub async fn void(&self, session_id: &str, voided_by: &str) -> DbResult<CashSession> {
        let now = Utc::now();

        debug!(session_id = %session_id, voided_by = %voided_by, "Voiding cash session");

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        let sql = format!(
            r#"
            UPDATE cash_sessions SET
                status = 'voided',
                voided_by = ?1,
                voided_at = ?2,
                ended_at = ?2,
                version = version + 1,
                updated_at = ?2
            WHERE id = ?3 AND status = 'open'
            RETURNING {}
            "#,
            SESSION_COLUMNS
        );

        let row: Option<SessionRow> = sqlx::query_as(&sql)
            .bind(voided_by)
            .bind(now)
            .bind(session_id)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(row) = row else {
            return Err(DbError::conflict(
                "CashSession",
                format!("{} is no longer open", session_id),
            ));
        };

        let detached = sqlx::query(
            r#"
            UPDATE cash_movements SET
                detached_from_session_id = session_id,
                session_id = NULL
            WHERE session_id = ?1
            "#,
        )
        .bind(session_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        debug!(session_id = %session_id, detached, "Movements detached from voided session");

        row.into_session()
    }

    /// Lists terminal sessions of a branch, most recently ended first.
    pub async fn list_history(
        &self,
        branch_id: &str,
        filter: &HistoryFilter,
        pagination: Pagination,
    ) -> DbResult<Page<CashSession>> {
        let total: i64 = history_query("SELECT COUNT(*) FROM cash_sessions", branch_id, filter)
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;

        let mut query = history_query(
            format!("SELECT {} FROM cash_sessions", SESSION_COLUMNS),
            branch_id,
            filter,
        );
        query
            .push(" ORDER BY ended_at DESC, id LIMIT ")
            .push_bind(i64::from(pagination.limit))
            .push(" OFFSET ")
            .push_bind(i64::from(pagination.offset));

        let rows: Vec<SessionRow> = query.build_query_as().fetch_all(&self.pool).await?;

        debug!(
            branch_id = %branch_id,
            total,
            returned = rows.len(),
            "Listed session history"
        );

        Ok(Page {
            items: rows
                .into_iter()
                .map(SessionRow::into_session)
                .collect::<DbResult<Vec<_>>>()?,
            total,
            offset: pagination.offset,
            limit: pagination.limit,
        })
    }

    /// Branch-level aggregates computed from persisted closing columns.
    ///
    /// Sales and expense totals cover reconciled sessions only; a voided
    /// session's cash was never counted.
    pub async fn branch_report(&self, branch_id: &str, range: DateRange) -> DbResult<BranchReport> {
        let filter = HistoryFilter::in_range(range);
        let row: ReportRow = history_query(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN status = 'closed' THEN 1 ELSE 0 END), 0) AS sessions_closed,
                COALESCE(SUM(CASE WHEN status = 'balanced' THEN 1 ELSE 0 END), 0) AS sessions_balanced,
                COALESCE(SUM(CASE WHEN status = 'voided' THEN 1 ELSE 0 END), 0) AS sessions_voided,
                COALESCE(SUM(CASE WHEN classification = 'shortage' THEN 1 ELSE 0 END), 0) AS shortage_sessions,
                COALESCE(SUM(CASE WHEN classification = 'surplus' THEN 1 ELSE 0 END), 0) AS surplus_sessions,
                COALESCE(SUM(CASE WHEN difference_cents < 0 THEN -difference_cents ELSE 0 END), 0) AS total_shortage_cents,
                COALESCE(SUM(CASE WHEN difference_cents > 0 THEN difference_cents ELSE 0 END), 0) AS total_surplus_cents,
                COALESCE(SUM(CASE WHEN status <> 'voided' THEN difference_cents ELSE 0 END), 0) AS net_difference_cents,
                COALESCE(SUM(CASE WHEN status <> 'voided' THEN cash_sales_total_cents ELSE 0 END), 0) AS total_cash_sales_cents,
                COALESCE(SUM(CASE WHEN status <> 'voided' THEN total_expenses_cents ELSE 0 END), 0) AS total_expenses_cents
            FROM cash_sessions
            "#,
            branch_id,
            &filter,
        )
        .build_query_as()
        .fetch_one(&self.pool)
        .await?;

        Ok(BranchReport {
            branch_id: branch_id.to_string(),
            range,
            sessions_closed: row.sessions_closed,
            sessions_balanced: row.sessions_balanced,
            sessions_voided: row.sessions_voided,
            shortage_sessions: row.shortage_sessions,
            surplus_sessions: row.surplus_sessions,
            total_shortage_cents: row.total_shortage_cents,
            total_surplus_cents: row.total_surplus_cents,
            net_difference_cents: row.net_difference_cents,
            total_cash_sales_cents: row.total_cash_sales_cents,
            total_expenses_cents: row.total_expenses_cents,
        })
    }

    /// Number of OPEN sessions for a branch. Always 0 or 1.
    pub async fn count_open(&self, branch_id: &str) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM cash_sessions WHERE branch_id = ?1 AND status = 'open'",
        )
        .bind(branch_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Total sessions of any status.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cash_sessions")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// `<select> WHERE branch_id = ? AND status IN (...) [AND ended_at ...] [AND classification = ?]`
fn history_query<'a>(
    select: impl Into<String>,
    branch_id: &str,
    filter: &HistoryFilter,
) -> QueryBuilder<'a, Sqlite> {
    let mut query = QueryBuilder::new(select);

    query
        .push(" WHERE branch_id = ")
        .push_bind(branch_id.to_string())
        .push(" AND status IN (");
    let mut statuses = query.separated(", ");
    for status in filter.effective_statuses() {
        statuses.push_bind(status);
    }
    statuses.push_unseparated(")");

    if let Some(from) = filter.range.from {
        query.push(" AND ended_at >= ").push_bind(from);
    }
    if let Some(to) = filter.range.to {
        query.push(" AND ended_at < ").push_bind(to);
    }
    if let Some(classification) = filter.classification {
        query.push(" AND classification = ").push_bind(classification);
    }

    query
}

// =============================================================================
// Unit Tests
// =============================================================================

/// The closing UPDATE, guarded by `status = 'open' AND version = ?`.
async fn write_closing(
    conn: &mut SqliteConnection,
    session_id: &str,
    expected_version: i64,
    status: SessionStatus,
    closing: &SessionClosing,
) -> DbResult<CashSession> {
    if !matches!(status, SessionStatus::Closed | SessionStatus::Balanced) {
        return Err(DbError::Internal(format!(
            "close cannot move a session to {}",
            status
        )));
    }

    let breakdown_json = serde_json::to_string(&closing.cash_breakdown)
        .map_err(|e| DbError::Internal(e.to_string()))?;

    debug!(
        session_id = %session_id,
        expected_version,
        status = %status,
        difference_cents = closing.difference_cents,
        "Closing cash session"
    );

    let sql = format!(
        r#"
        UPDATE cash_sessions SET
            status = ?1,
            closed_by = ?2,
            closed_at = ?3,
            cash_breakdown = ?4,
            counted_total_cents = ?5,
            expected_total_cents = ?6,
            difference_cents = ?7,
            classification = ?8,
            closing_notes = ?9,
            ended_at = ?3,
            version = version + 1,
            updated_at = ?3
        WHERE id = ?10 AND status = 'open' AND version = ?11
        RETURNING {}
        "#,
        SESSION_COLUMNS
    );

    let row: Option<SessionRow> = sqlx::query_as(&sql)
        .bind(status)
        .bind(&closing.closed_by)
        .bind(closing.closed_at)
        .bind(&breakdown_json)
        .bind(closing.counted_total_cents)
        .bind(closing.expected_total_cents)
        .bind(closing.difference_cents)
        .bind(closing.classification)
        .bind(&closing.closing_notes)
        .bind(session_id)
        .bind(expected_version)
        .fetch_optional(&mut *conn)
        .await?;

    match row {
        Some(row) => row.into_session(),
        None => Err(DbError::conflict(
            "CashSession",
            format!("{} is no longer open at version {}", session_id, expected_version),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Database, DbConfig};
    use till_core::{reconcile, Denomination, Money};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    fn new_session(branch_id: &str, opening: i64) -> NewSession {
        NewSession {
            branch_id: branch_id.to_string(),
            opened_by: "alice".to_string(),
            opening_amount_cents: opening,
            opening_notes: None,
        }
    }

    fn closing_for(session: &CashSession, breakdown: CashBreakdown) -> (SessionStatus, SessionClosing) {
        let result = reconcile(session.opening_amount(), &session.summary, &breakdown);
        let closing = SessionClosing {
            closed_by: "bob".to_string(),
            closed_at: Utc::now(),
            cash_breakdown: breakdown,
            counted_total_cents: result.counted_total.cents(),
            expected_total_cents: result.expected_total.cents(),
            difference_cents: result.difference.cents(),
            classification: result.classification,
            closing_notes: None,
        };
        (result.resulting_status(), closing)
    }

    #[tokio::test]
    async fn test_create_and_find_open() {
        let db = test_db().await;
        let repo = db.sessions();

        let created = repo.create(&new_session("north", 50_000)).await.unwrap();
        assert_eq!(created.status, SessionStatus::Open);
        assert_eq!(created.version, 0);

        let open = repo.find_open_by_branch("north").await.unwrap().unwrap();
        assert_eq!(open, created);
        assert!(repo.find_open_by_branch("south").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_second_open_session_is_a_conflict() {
        let db = test_db().await;
        let repo = db.sessions();

        repo.create(&new_session("north", 0)).await.unwrap();
        let err = repo.create(&new_session("north", 0)).await.unwrap_err();
        assert!(err.is_conflict(), "unexpected error: {err:?}");

        // Other branches are unaffected
        repo.create(&new_session("south", 0)).await.unwrap();
        assert_eq!(repo.count_open("north").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_apply_cash_event_increments_and_records_movement() {
        let db = test_db().await;
        let repo = db.sessions();
        let session = repo.create(&new_session("north", 10_000)).await.unwrap();

        let movement = repo
            .apply_cash_event(&CashEvent::sale("north", Money::from_cents(1_250)).with_reference("R-1"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(movement.session_id.as_deref(), Some(session.id.as_str()));
        assert_eq!(movement.reference.as_deref(), Some("R-1"));

        repo.apply_cash_event(&CashEvent::expense("north", Money::from_cents(300)))
            .await
            .unwrap()
            .unwrap();

        let session = repo.get_by_id(&session.id).await.unwrap().unwrap();
        assert_eq!(session.summary.cash_sales_total_cents, 1_250);
        assert_eq!(session.summary.sales_count, 1);
        assert_eq!(session.summary.total_expenses_cents, 300);
        assert_eq!(session.summary.expenses_count, 1);
        assert_eq!(session.version, 2);

        let movements = db.movements().list_by_session(&session.id).await.unwrap();
        assert_eq!(movements.len(), 2);
    }

    #[tokio::test]
    async fn test_apply_cash_event_without_open_session_writes_nothing() {
        let db = test_db().await;
        let repo = db.sessions();

        let applied = repo
            .apply_cash_event(&CashEvent::sale("north", Money::from_cents(100)))
            .await
            .unwrap();
        assert!(applied.is_none());
        assert_eq!(db.movements().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_close_is_compare_and_swap() {
        let db = test_db().await;
        let repo = db.sessions();
        let session = repo.create(&new_session("north", 2_000)).await.unwrap();

        let breakdown = CashBreakdown::from_counts([(Denomination::Bill20, 1)]).unwrap();
        let (status, closing) = closing_for(&session, breakdown);

        // An event lands after the read, so the version moved
        repo.apply_cash_event(&CashEvent::sale("north", Money::from_cents(500)))
            .await
            .unwrap();
        let err = repo.close(&session.id, session.version, status, &closing).await.unwrap_err();
        assert!(err.is_conflict());

        let fresh = repo.get_by_id(&session.id).await.unwrap().unwrap();
        assert!(fresh.is_open());

        let (status, closing) = closing_for(&fresh, closing.cash_breakdown.clone());
        let closed = repo.close(&fresh.id, fresh.version, status, &closing).await.unwrap();
        assert_eq!(closed.status, SessionStatus::Closed);
        let record = closed.closing.as_ref().unwrap();
        assert_eq!(record.difference_cents, -500);
        assert_eq!(record.classification, Classification::Shortage);
        assert_eq!(closed.ended_at(), Some(record.closed_at));

        // Terminal rows never match again
        let err = repo.close(&closed.id, closed.version, status, &closing).await.unwrap_err();
        assert!(err.is_conflict());
        assert!(repo.find_open_by_branch("north").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_close_counted_reconciles_latest_summary() {
        let db = test_db().await;
        let repo = db.sessions();
        let session = repo.create(&new_session("north", 2_000)).await.unwrap();

        // Lands after any read the caller made; the count still sees it
        repo.apply_cash_event(&CashEvent::sale("north", Money::from_cents(500)))
            .await
            .unwrap();

        let count = CountedClose {
            closed_by: "bob".to_string(),
            cash_breakdown: CashBreakdown::from_counts([(Denomination::Bill20, 1)]).unwrap(),
            closing_notes: Some("night shift".to_string()),
        };
        let CloseOutcome::Closed {
            session: closed,
            reconciliation,
        } = repo.close_counted(&session.id, &count).await.unwrap()
        else {
            panic!("expected a closed session");
        };

        assert_eq!(reconciliation.expected_total.cents(), 2_500);
        assert_eq!(reconciliation.difference.cents(), -500);
        assert_eq!(closed.status, SessionStatus::Closed);
        assert_eq!(closed.version, 2);
        let record = closed.closing.as_ref().unwrap();
        assert_eq!(record.expected_total_cents, 2_500);
        assert_eq!(record.closing_notes.as_deref(), Some("night shift"));

        match repo.close_counted(&session.id, &count).await.unwrap() {
            CloseOutcome::NotOpen(again) => assert_eq!(again, closed),
            other => panic!("unexpected {other:?}"),
        }
        assert!(matches!(
            repo.close_counted(&Uuid::new_v4().to_string(), &count)
                .await
                .unwrap(),
            CloseOutcome::NotFound
        ));
    }

    #[tokio::test]
    async fn test_void_detaches_movements_and_keeps_summary() {
        let db = test_db().await;
        let repo = db.sessions();
        let session = repo.create(&new_session("north", 0)).await.unwrap();

        repo.apply_cash_event(&CashEvent::sale("north", Money::from_cents(700)))
            .await
            .unwrap();

        let voided = repo.void(&session.id, "manager").await.unwrap();
        assert_eq!(voided.status, SessionStatus::Voided);
        assert_eq!(voided.summary.cash_sales_total_cents, 700);
        assert_eq!(voided.voided.as_ref().unwrap().voided_by, "manager");
        assert!(voided.closing.is_none());

        assert!(db.movements().list_by_session(&session.id).await.unwrap().is_empty());
        let detached = db.movements().list_detached_from(&session.id).await.unwrap();
        assert_eq!(detached.len(), 1);
        assert_eq!(detached[0].session_id, None);

        assert!(repo.void(&session.id, "manager").await.unwrap_err().is_conflict());
    }

    #[tokio::test]
    async fn test_history_and_report() {
        let db = test_db().await;
        let repo = db.sessions();

        // Balanced: opening 1000, counted 1000
        let s1 = repo.create(&new_session("north", 1_000)).await.unwrap();
        let (status, closing) = closing_for(
            &s1,
            CashBreakdown::from_counts([(Denomination::Bill10, 1)]).unwrap(),
        );
        repo.close(&s1.id, s1.version, status, &closing).await.unwrap();

        // Voided
        let s2 = repo.create(&new_session("north", 0)).await.unwrap();
        repo.void(&s2.id, "manager").await.unwrap();

        // Short by 300
        let s3 = repo.create(&new_session("north", 500)).await.unwrap();
        let (status, closing) = closing_for(
            &s3,
            CashBreakdown::from_counts([(Denomination::Bill2, 1)]).unwrap(),
        );
        repo.close(&s3.id, s3.version, status, &closing).await.unwrap();

        // Still open, never listed
        repo.create(&new_session("north", 0)).await.unwrap();

        let page = repo
            .list_history("north", &HistoryFilter::default(), Pagination::first(10))
            .await
            .unwrap();
        assert_eq!(page.total, 3);
        let ids: Vec<&str> = page.items.iter().map(|s| s.id.as_str()).collect();
        assert_eq!(ids, vec![s3.id.as_str(), s2.id.as_str(), s1.id.as_str()]);

        let voided_only = HistoryFilter {
            statuses: vec![SessionStatus::Voided],
            ..Default::default()
        };
        let page = repo
            .list_history("north", &voided_only, Pagination::first(10))
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].id, s2.id);

        let second = repo
            .list_history("north", &HistoryFilter::default(), Pagination::new(2, 2))
            .await
            .unwrap();
        assert_eq!(second.items.len(), 1);
        assert!(!second.has_more());

        let report = repo.branch_report("north", DateRange::all()).await.unwrap();
        assert_eq!(report.sessions_balanced, 1);
        assert_eq!(report.sessions_closed, 1);
        assert_eq!(report.sessions_voided, 1);
        assert_eq!(report.shortage_sessions, 1);
        assert_eq!(report.total_shortage_cents, 300);
        assert_eq!(report.net_difference_cents, -300);

        let empty = repo.branch_report("south", DateRange::all()).await.unwrap();
        assert_eq!(empty.sessions_closed, 0);
        assert_eq!(empty.net_difference_cents, 0);
    }
}
