//! # Till Service
//!
//! The single entry point collaborators call.
//!
//! ## Operation Map
//! ```text
//! ┌──────────────────────────────┬──────────────────────┬──────────────────┐
//! │ Operation                    │ Component            │ Writes?          │
//! ├──────────────────────────────┼──────────────────────┼──────────────────┤
//! │ open_session                 │ LifecycleController  │ INSERT           │
//! │ close_session                │ LifecycleController  │ CAS open→closed  │
//! │ reset_session                │ LifecycleController  │ CAS open→voided  │
//! │ get_session                  │ LifecycleController  │ -                │
//! │ get_active_session           │ LifecycleController  │ -                │
//! │ record_cash_event            │ CashEventAggregator  │ += summary       │
//! │ list_history                 │ HistoryReader        │ -                │
//! │ list_movements               │ HistoryReader        │ -                │
//! │ branch_report                │ HistoryReader        │ -                │
//! └──────────────────────────────┴──────────────────────┴──────────────────┘
//! ```
//!
//! `TillService` is cheap to clone; every clone shares one connection pool,
//! so it can be handed to as many request workers as needed.

use serde::Serialize;
use tracing::info;

use till_core::{
    BranchReport, CashEvent, CashMovement, CashSession, DateRange, HistoryFilter, Page, Pagination,
};
use till_db::{Database, MigrationStatus};

use crate::aggregator::CashEventAggregator;
use crate::config::{EngineConfig, EngineSettings};
use crate::controller::{CloseSession, LifecycleController, OpenSession};
use crate::error::EngineResult;
use crate::history::HistoryReader;

/// Store health as reported by [`TillService::health`].
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    pub database_ok: bool,
    pub migrations: MigrationStatus,
    pub sessions: i64,
    pub movements: i64,
}

/// Cash session engine facade.
#[derive(Debug, Clone)]
pub struct TillService {
    db: Database,
    controller: LifecycleController,
    aggregator: CashEventAggregator,
    history: HistoryReader,
}

impl TillService {
    /// Wraps an existing store.
    pub fn new(db: Database, settings: &EngineSettings) -> Self {
        TillService {
            controller: LifecycleController::new(db.clone(), settings.close_max_attempts),
            aggregator: CashEventAggregator::new(db.clone()),
            history: HistoryReader::new(
                db.clone(),
                settings.default_page_size,
                settings.max_page_size,
            ),
            db,
        }
    }

    /// Opens the configured store, running migrations.
    pub async fn connect(config: &EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        let db = Database::new(config.db_config()).await?;

        info!(
            path = %config.database.path.display(),
            close_max_attempts = config.engine.close_max_attempts,
            "Till service ready"
        );

        Ok(Self::new(db, &config.engine))
    }

    /// Service over a fresh in-memory store.
    pub async fn in_memory() -> EngineResult<Self> {
        Self::connect(&EngineConfig::in_memory()).await
    }

    /// The underlying store.
    pub fn database(&self) -> &Database {
        &self.db
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    pub async fn open_session(&self, request: OpenSession) -> EngineResult<CashSession> {
        self.controller.open(request).await
    }

    pub async fn close_session(&self, request: CloseSession) -> EngineResult<CashSession> {
        self.controller.close(request).await
    }

    pub async fn reset_session(
        &self,
        session_id: &str,
        acting_user_id: &str,
    ) -> EngineResult<CashSession> {
        self.controller.reset(session_id, acting_user_id).await
    }

    pub async fn get_session(&self, session_id: &str) -> EngineResult<CashSession> {
        self.controller.get(session_id).await
    }

    /// The branch's open session, or `NoOpenSession`.
    pub async fn get_active_session(&self, branch_id: &str) -> EngineResult<CashSession> {
        self.controller.get_active(branch_id).await
    }

    // =========================================================================
    // Cash Events
    // =========================================================================

    /// The only write path into a session summary.
    pub async fn record_cash_event(&self, event: CashEvent) -> EngineResult<CashMovement> {
        self.aggregator.record(event).await
    }

    // =========================================================================
    // History
    // =========================================================================

    pub async fn list_history(
        &self,
        branch_id: &str,
        filter: HistoryFilter,
        pagination: Pagination,
    ) -> EngineResult<Page<CashSession>> {
        self.history.list_history(branch_id, filter, pagination).await
    }

    /// First page at the configured default size.
    pub fn default_pagination(&self) -> Pagination {
        self.history.default_pagination()
    }

    pub async fn list_movements(&self, session_id: &str) -> EngineResult<Vec<CashMovement>> {
        self.history.list_movements(session_id).await
    }

    pub async fn list_detached_movements(&self, session_id: &str) -> EngineResult<Vec<CashMovement>> {
        self.history.list_detached_movements(session_id).await
    }

    pub async fn branch_report(&self, branch_id: &str, range: DateRange) -> EngineResult<BranchReport> {
        self.history.branch_report(branch_id, range).await
    }

    // =========================================================================
    // Maintenance
    // =========================================================================

    /// Connectivity, migration state and row counts.
    pub async fn health(&self) -> EngineResult<HealthReport> {
        let database_ok = self.db.health_check().await;
        let migrations = self.db.migration_status().await?;
        let sessions = self.db.sessions().count().await?;
        let movements = self.db.movements().count().await?;

        Ok(HealthReport {
            database_ok,
            migrations,
            sessions,
            movements,
        })
    }

    /// Closes the connection pool.
    pub async fn shutdown(&self) {
        self.db.close().await;
    }
}
