//! Shared fixtures for the engine integration tests.

#![allow(dead_code)]

use std::path::PathBuf;

use till_core::{CashBreakdown, CashEvent, CashMovement, CashSession, Denomination, Money};
use till_engine::{CloseSession, EngineConfig, EngineResult, OpenSession, TillService};

/// Service over a fresh in-memory store.
pub async fn memory_service() -> TillService {
    TillService::in_memory().await.unwrap()
}

/// Service over a temporary SQLite file, so tasks really run on separate
/// connections. The files are removed on drop.
pub struct FileStore {
    pub service: TillService,
    path: PathBuf,
}

impl FileStore {
    pub async fn new(close_max_attempts: u32) -> Self {
        let path = std::env::temp_dir().join(format!("till-test-{}.db", uuid::Uuid::new_v4()));

        let mut config = EngineConfig::default();
        config.database.path = path.clone();
        config.database.max_connections = 8;
        config.engine.close_max_attempts = close_max_attempts;

        let service = TillService::connect(&config).await.unwrap();
        FileStore { service, path }
    }
}

impl Drop for FileStore {
    fn drop(&mut self) {
        for suffix in ["", "-wal", "-shm"] {
            let mut file = self.path.clone().into_os_string();
            file.push(suffix);
            let _ = std::fs::remove_file(PathBuf::from(file));
        }
    }
}

pub fn open_request(branch: &str, opening_cents: i64) -> OpenSession {
    OpenSession {
        branch_id: branch.to_string(),
        opening_amount_cents: opening_cents,
        opening_notes: None,
        acting_user_id: "alice".to_string(),
    }
}

pub async fn open(service: &TillService, branch: &str, opening_cents: i64) -> CashSession {
    service.open_session(open_request(branch, opening_cents)).await.unwrap()
}

pub fn breakdown(counts: &[(Denomination, i64)]) -> CashBreakdown {
    CashBreakdown::from_counts(counts.iter().copied()).unwrap()
}

pub fn close_request(session_id: &str, counts: &[(Denomination, i64)]) -> CloseSession {
    CloseSession {
        session_id: session_id.to_string(),
        cash_breakdown: breakdown(counts),
        closing_notes: None,
        acting_user_id: "manager".to_string(),
    }
}

pub async fn close(
    service: &TillService,
    session_id: &str,
    counts: &[(Denomination, i64)],
) -> EngineResult<CashSession> {
    service.close_session(close_request(session_id, counts)).await
}

pub async fn sale(service: &TillService, branch: &str, cents: i64) -> EngineResult<CashMovement> {
    service
        .record_cash_event(CashEvent::sale(branch, Money::from_cents(cents)))
        .await
}

pub async fn expense(service: &TillService, branch: &str, cents: i64) -> EngineResult<CashMovement> {
    service
        .record_cash_event(CashEvent::expense(branch, Money::from_cents(cents)))
        .await
}
