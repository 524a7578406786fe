//! # Session Lifecycle Controller
//!
//! Drives a cash session through its state machine.
//!
//! ## State Machine
//! ```text
//!                     open
//!        (none) ───────────────► OPEN ◄──── record_cash_event (summary only)
//!                                 │
//!               ┌─────────────────┼──────────────────┐
//!               │ close           │ close            │ reset
//!               │ difference = 0  │ difference ≠ 0   │
//!               ▼                 ▼                  ▼
//!           BALANCED           CLOSED             VOIDED
//!
//!  Terminal states accept nothing. Every transition out of OPEN is a
//!  compare-and-swap in the Session Store; losing it yields NotOpen.
//! ```
//!
//! ## Close Under Concurrent Sales
//! ```text
//! BEGIN ──► claim write lock on the open row ──► read summary (latest)
//!                                                      │
//!              concurrent sales wait on the lock       ▼
//!                                              reconcile (pure)
//!                                                      │
//!                                                      ▼
//!                     UPDATE WHERE status='open' AND version=v ──► COMMIT
//! ```
//!
//! The count is always reconciled against the summary it freezes. A store
//! conflict is retried up to `close_max_attempts`, then reported as
//! ConcurrentModification.

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use till_core::validation::{
    validate_denomination_count, validate_identifier, validate_notes, validate_opening_amount,
    validate_uuid,
};
use till_core::{CashBreakdown, CashSession, CoreError};
use till_db::{CloseOutcome, CountedClose, Database, NewSession};

use crate::error::{EngineError, EngineResult};

// =============================================================================
// Requests
// =============================================================================

/// Input of [`LifecycleController::open`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenSession {
    pub branch_id: String,
    pub opening_amount_cents: i64,
    #[serde(default)]
    pub opening_notes: Option<String>,
    pub acting_user_id: String,
}

/// Input of [`LifecycleController::close`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseSession {
    pub session_id: String,
    #[serde(default)]
    pub cash_breakdown: CashBreakdown,
    #[serde(default)]
    pub closing_notes: Option<String>,
    pub acting_user_id: String,
}

// =============================================================================
// Controller
// =============================================================================

/// Owns the open/close/reset transitions.
#[derive(Debug, Clone)]
pub struct LifecycleController {
    db: Database,
    close_max_attempts: u32,
}

impl LifecycleController {
    /// Creates a controller over the given store.
    pub fn new(db: Database, close_max_attempts: u32) -> Self {
        LifecycleController {
            db,
            close_max_attempts: close_max_attempts.max(1),
        }
    }

    /// Opens a session for a branch.
    ///
    /// ## Atomicity
    /// One INSERT. The store's partial unique index decides the race between
    /// two concurrent opens; the loser gets `AlreadyOpen`.
    pub async fn open(&self, request: OpenSession) -> EngineResult<CashSession> {
        let branch_id = validate_identifier("branch_id", &request.branch_id)?;
        let opened_by = validate_identifier("acting_user_id", &request.acting_user_id)?;
        let opening_amount = validate_opening_amount(request.opening_amount_cents)
            .map_err(|e| CoreError::invalid_amount("opening_amount", e.to_string()))?;
        let opening_notes = validate_notes("opening_notes", request.opening_notes.as_deref())?;

        let new = NewSession {
            branch_id: branch_id.clone(),
            opened_by,
            opening_amount_cents: opening_amount.cents(),
            opening_notes,
        };

        match self.db.sessions().create(&new).await {
            Ok(session) => {
                info!(
                    session_id = %session.id,
                    branch_id = %session.branch_id,
                    opened_by = %session.opened_by,
                    opening_amount = %opening_amount,
                    "Cash session opened"
                );
                Ok(session)
            }
            Err(err) if err.is_conflict() => {
                let existing_session_id = self
                    .db
                    .sessions()
                    .find_open_by_branch(&branch_id)
                    .await?
                    .map(|s| s.id);

                warn!(
                    branch_id = %branch_id,
                    existing_session_id = ?existing_session_id,
                    "Open rejected: branch already has an open session"
                );

                Err(CoreError::AlreadyOpen {
                    branch_id,
                    existing_session_id,
                }
                .into())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Closes and reconciles a session.
    ///
    /// The resulting status is `Balanced` for a zero difference and `Closed`
    /// otherwise. A second close of the same session returns `NotOpen`.
    pub async fn close(&self, request: CloseSession) -> EngineResult<CashSession> {
        validate_uuid(&request.session_id)?;
        let session_id = request.session_id.trim().to_string();
        let closed_by = validate_identifier("acting_user_id", &request.acting_user_id)?;
        let closing_notes = validate_notes("closing_notes", request.closing_notes.as_deref())?;

        // Deserialized breakdowns skip the constructor's bounds
        for (denomination, count) in request.cash_breakdown.iter() {
            validate_denomination_count(denomination, i64::from(count))?;
        }

        let count = CountedClose {
            closed_by,
            cash_breakdown: request.cash_breakdown,
            closing_notes,
        };

        for attempt in 1..=self.close_max_attempts {
            match self.db.sessions().close_counted(&session_id, &count).await {
                Ok(CloseOutcome::Closed {
                    session,
                    reconciliation,
                }) => {
                    info!(
                        session_id = %session.id,
                        branch_id = %session.branch_id,
                        status = %session.status,
                        classification = %reconciliation.classification,
                        expected = %reconciliation.expected_total,
                        counted = %reconciliation.counted_total,
                        difference = %reconciliation.difference,
                        attempt,
                        "Cash session closed"
                    );
                    return Ok(session);
                }
                Ok(CloseOutcome::NotOpen(session)) => return Err(self.not_open(session, "close")),
                Ok(CloseOutcome::NotFound) => {
                    return Err(CoreError::SessionNotFound(session_id).into())
                }
                Err(err) if err.is_conflict() => {
                    warn!(
                        session_id = %session_id,
                        attempt,
                        error = %err,
                        "Cash session changed during close, retrying"
                    );
                }
                Err(err) => return Err(err.into()),
            }
        }

        warn!(
            session_id = %session_id,
            attempts = self.close_max_attempts,
            "Close gave up: session kept changing"
        );

        Err(CoreError::ConcurrentModification {
            session_id,
            attempts: self.close_max_attempts,
        }
        .into())
    }

    /// Voids an open session without reconciliation.
    ///
    /// The record stays in history with its frozen summary; its movements
    /// lose their attribution.
    pub async fn reset(&self, session_id: &str, acting_user_id: &str) -> EngineResult<CashSession> {
        validate_uuid(session_id)?;
        let session_id = session_id.trim();
        let voided_by = validate_identifier("acting_user_id", acting_user_id)?;

        match self.db.sessions().void(session_id, &voided_by).await {
            Ok(voided) => {
                info!(
                    session_id = %voided.id,
                    branch_id = %voided.branch_id,
                    voided_by = %voided_by,
                    cash_sales_total = %voided.summary.cash_sales_total(),
                    total_expenses = %voided.summary.total_expenses(),
                    "Cash session voided"
                );
                Ok(voided)
            }
            Err(err) if err.is_conflict() => {
                let session = self.require(session_id).await?;
                Err(self.not_open(session, "reset"))
            }
            Err(err) => Err(err.into()),
        }
    }

    // =========================================================================
    // Lookups
    // =========================================================================

    /// Gets a session by id, whatever its status.
    pub async fn get(&self, session_id: &str) -> EngineResult<CashSession> {
        validate_uuid(session_id)?;
        self.require(session_id.trim()).await
    }

    /// Gets the branch's open session.
    pub async fn get_active(&self, branch_id: &str) -> EngineResult<CashSession> {
        let branch_id = validate_identifier("branch_id", branch_id)?;

        match self.db.sessions().find_open_by_branch(&branch_id).await? {
            Some(session) => Ok(session),
            None => {
                debug!(branch_id = %branch_id, "No open cash session");
                Err(CoreError::NoOpenSession { branch_id }.into())
            }
        }
    }

    async fn require(&self, session_id: &str) -> EngineResult<CashSession> {
        self.db
            .sessions()
            .get_by_id(session_id)
            .await?
            .ok_or_else(|| CoreError::SessionNotFound(session_id.to_string()).into())
    }

    fn not_open(&self, session: CashSession, operation: &str) -> EngineError {
        warn!(
            session_id = %session.id,
            status = %session.status,
            operation,
            "Rejected: cash session is not open"
        );

        CoreError::NotOpen {
            session_id: session.id,
            status: session.status,
        }
        .into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use till_core::{CashEvent, Classification, Denomination, Money, SessionStatus};
    use till_db::DbConfig;

    async fn controller() -> (LifecycleController, Database) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        (LifecycleController::new(db.clone(), 5), db)
    }

    fn open_request(branch: &str, cents: i64) -> OpenSession {
        OpenSession {
            branch_id: branch.to_string(),
            opening_amount_cents: cents,
            opening_notes: None,
            acting_user_id: "alice".to_string(),
        }
    }

    fn close_request(session_id: &str, counts: Vec<(Denomination, i64)>) -> CloseSession {
        CloseSession {
            session_id: session_id.to_string(),
            cash_breakdown: CashBreakdown::from_counts(counts).unwrap(),
            closing_notes: None,
            acting_user_id: "manager".to_string(),
        }
    }

    #[tokio::test]
    async fn test_open_trims_and_validates() {
        let (controller, _) = controller().await;

        let session = controller
            .open(OpenSession {
                branch_id: "  north ".to_string(),
                opening_amount_cents: 50_000,
                opening_notes: Some("   ".to_string()),
                acting_user_id: "alice".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(session.branch_id, "north");
        assert_eq!(session.status, SessionStatus::Open);
        assert_eq!(session.opening_notes, None);
    }

    #[tokio::test]
    async fn test_open_rejects_negative_amount() {
        let (controller, db) = controller().await;

        let err = controller.open(open_request("north", -1)).await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Core(CoreError::InvalidAmount { .. })
        ));
        assert_eq!(db.sessions().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_second_open_reports_existing_session() {
        let (controller, _) = controller().await;
        let first = controller.open(open_request("north", 0)).await.unwrap();

        let err = controller.open(open_request("north", 0)).await.unwrap_err();
        match err {
            EngineError::Core(CoreError::AlreadyOpen {
                branch_id,
                existing_session_id,
            }) => {
                assert_eq!(branch_id, "north");
                assert_eq!(existing_session_id, Some(first.id));
            }
            other => panic!("expected AlreadyOpen, got {other:?}"),
        }

        // Another branch is unaffected
        assert!(controller.open(open_request("south", 0)).await.is_ok());
    }

    #[tokio::test]
    async fn test_close_exact_is_balanced() {
        let (controller, db) = controller().await;
        let session = controller.open(open_request("north", 50_000)).await.unwrap();
        db.sessions()
            .apply_cash_event(&CashEvent::sale("north", Money::from_cents(123_000)))
            .await
            .unwrap();
        db.sessions()
            .apply_cash_event(&CashEvent::expense("north", Money::from_cents(8_000)))
            .await
            .unwrap();

        let closed = controller
            .close(close_request(&session.id, vec![(Denomination::Bill50, 33)]))
            .await
            .unwrap();

        assert_eq!(closed.status, SessionStatus::Balanced);
        let closing = closed.closing.unwrap();
        assert_eq!(closing.expected_total_cents, 165_000);
        assert_eq!(closing.difference_cents, 0);
        assert_eq!(closing.classification, Classification::Exact);
        assert_eq!(closing.closed_by, "manager");
    }

    #[tokio::test]
    async fn test_close_twice_is_not_open() {
        let (controller, _) = controller().await;
        let session = controller.open(open_request("north", 1_000)).await.unwrap();

        let closed = controller
            .close(close_request(&session.id, vec![(Denomination::Bill5, 1)]))
            .await
            .unwrap();
        assert_eq!(closed.status, SessionStatus::Closed);

        let err = controller
            .close(close_request(&session.id, vec![(Denomination::Bill10, 1)]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EngineError::Core(CoreError::NotOpen {
                status: SessionStatus::Closed,
                ..
            })
        ));

        // The first closing record is untouched
        let stored = controller.get(&session.id).await.unwrap();
        assert_eq!(stored.closing.unwrap().counted_total_cents, 500);
    }

    #[tokio::test]
    async fn test_unknown_session() {
        let (controller, _) = controller().await;
        let id = uuid::Uuid::new_v4().to_string();

        let err = controller.close(close_request(&id, vec![])).await.unwrap_err();
        assert!(matches!(err, EngineError::Core(CoreError::SessionNotFound(_))));

        let err = controller.reset(&id, "manager").await.unwrap_err();
        assert!(matches!(err, EngineError::Core(CoreError::SessionNotFound(_))));

        let err = controller.get("not-a-uuid").await.unwrap_err();
        assert!(matches!(err, EngineError::Core(CoreError::Validation(_))));
    }

    #[tokio::test]
    async fn test_reset_then_close_is_not_open() {
        let (controller, _) = controller().await;
        let session = controller.open(open_request("north", 0)).await.unwrap();

        let voided = controller.reset(&session.id, "manager").await.unwrap();
        assert_eq!(voided.status, SessionStatus::Voided);
        assert_eq!(voided.voided.unwrap().voided_by, "manager");

        let err = controller.reset(&session.id, "manager").await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Core(CoreError::NotOpen {
                status: SessionStatus::Voided,
                ..
            })
        ));

        let err = controller
            .close(close_request(&session.id, vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Core(CoreError::NotOpen { .. })));

        // The branch can open again
        assert!(controller.open(open_request("north", 0)).await.is_ok());
    }

    #[tokio::test]
    async fn test_get_active() {
        let (controller, _) = controller().await;

        let err = controller.get_active("north").await.unwrap_err();
        assert!(matches!(
            err,
            EngineError::Core(CoreError::NoOpenSession { .. })
        ));

        let session = controller.open(open_request("north", 0)).await.unwrap();
        assert_eq!(controller.get_active("north").await.unwrap().id, session.id);
    }
}
