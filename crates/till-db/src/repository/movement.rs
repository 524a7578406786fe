//! # Cash Movement Repository
//!
//! The append-only ledger behind every session summary.
//!
//! ```text
//! cash_sessions.cash_sales_total_cents  ==  Σ cash_movements.amount_cents
//!                                           WHERE session_id = ? AND kind = 'sale'
//! ```
//!
//! Rows are only inserted by [`SessionRepository::apply_cash_event`] and only
//! rewritten by [`SessionRepository::void`], which moves `session_id` into
//! `detached_from_session_id`.
//!
//! [`SessionRepository::apply_cash_event`]: crate::SessionRepository::apply_cash_event
//! [`SessionRepository::void`]: crate::SessionRepository::void

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};

use crate::error::DbResult;
use till_core::{CashEventKind, CashMovement};

const MOVEMENT_COLUMNS: &str = r#"
    id, session_id, detached_from_session_id, branch_id,
    kind, amount_cents, reference, recorded_by,
    occurred_at, recorded_at
"#;

#[derive(Debug, sqlx::FromRow)]
struct MovementRow {
    id: String,
    session_id: Option<String>,
    detached_from_session_id: Option<String>,
    branch_id: String,
    kind: CashEventKind,
    amount_cents: i64,
    reference: Option<String>,
    recorded_by: Option<String>,
    occurred_at: DateTime<Utc>,
    recorded_at: DateTime<Utc>,
}

impl From<MovementRow> for CashMovement {
    fn from(row: MovementRow) -> Self {
        CashMovement {
            id: row.id,
            session_id: row.session_id,
            detached_from_session_id: row.detached_from_session_id,
            branch_id: row.branch_id,
            kind: row.kind,
            amount_cents: row.amount_cents,
            reference: row.reference,
            recorded_by: row.recorded_by,
            occurred_at: row.occurred_at,
            recorded_at: row.recorded_at,
        }
    }
}

/// Inserts a movement on an existing connection or transaction.
pub(crate) async fn insert_movement(
    conn: &mut SqliteConnection,
    movement: &CashMovement,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO cash_movements (
            id, session_id, detached_from_session_id, branch_id,
            kind, amount_cents, reference, recorded_by,
            occurred_at, recorded_at
        ) VALUES (
            ?1, ?2, ?3, ?4,
            ?5, ?6, ?7, ?8,
            ?9, ?10
        )
        "#,
    )
    .bind(&movement.id)
    .bind(&movement.session_id)
    .bind(&movement.detached_from_session_id)
    .bind(&movement.branch_id)
    .bind(movement.kind)
    .bind(movement.amount_cents)
    .bind(&movement.reference)
    .bind(&movement.recorded_by)
    .bind(movement.occurred_at)
    .bind(movement.recorded_at)
    .execute(conn)
    .await?;

    Ok(())
}

/// Read access to the movement ledger.
#[derive(Debug, Clone)]
pub struct MovementRepository {
    pool: SqlitePool,
}

impl MovementRepository {
    /// Creates a new MovementRepository.
    pub fn new(pool: SqlitePool) -> Self {
        MovementRepository { pool }
    }

    /// Movements currently attributed to a session, oldest first.
    pub async fn list_by_session(&self, session_id: &str) -> DbResult<Vec<CashMovement>> {
        self.list_where("session_id", session_id).await
    }

    /// Movements that belonged to a session before it was voided.
    pub async fn list_detached_from(&self, session_id: &str) -> DbResult<Vec<CashMovement>> {
        self.list_where("detached_from_session_id", session_id).await
    }

    /// Total number of ledger rows.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM cash_movements")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    async fn list_where(&self, column: &'static str, session_id: &str) -> DbResult<Vec<CashMovement>> {
        let sql = format!(
            "SELECT {} FROM cash_movements WHERE {} = ?1 ORDER BY recorded_at, id",
            MOVEMENT_COLUMNS, column
        );

        let rows: Vec<MovementRow> = sqlx::query_as(&sql)
            .bind(session_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(CashMovement::from).collect())
    }
}

#[cfg(test)]
mod tests {
    use crate::repository::session::NewSession;
    use crate::{Database, DbConfig};
    use till_core::{CashEvent, Money};

    #[tokio::test]
    async fn test_ledger_matches_summary() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let session = db
            .sessions()
            .create(&NewSession {
                branch_id: "north".to_string(),
                opened_by: "alice".to_string(),
                opening_amount_cents: 0,
                opening_notes: None,
            })
            .await
            .unwrap();

        for cents in [100, 250, 1_000] {
            db.sessions()
                .apply_cash_event(&CashEvent::sale("north", Money::from_cents(cents)))
                .await
                .unwrap();
        }

        let movements = db.movements().list_by_session(&session.id).await.unwrap();
        let ledger_total: i64 = movements.iter().map(|m| m.amount_cents).sum();

        let session = db.sessions().get_by_id(&session.id).await.unwrap().unwrap();
        assert_eq!(ledger_total, session.summary.cash_sales_total_cents);
        assert_eq!(movements.len() as i64, session.summary.sales_count);
        assert!(db.movements().list_detached_from(&session.id).await.unwrap().is_empty());
    }
}
