//! # Repository Module
//!
//! Database repository implementations for the Session Store.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  till-engine                                                           │
//! │       │                                                                 │
//! │       │  db.sessions().apply_cash_event(&event)                        │
//! │       ▼                                                                 │
//! │  SessionRepository                                                     │
//! │  ├── find_open_by_branch / get_by_id                                   │
//! │  ├── create            (guarded by partial unique index)               │
//! │  ├── apply_cash_event  (atomic increment + ledger row)                 │
//! │  ├── close_counted     (write lock, reconcile, CAS in one transaction) │
//! │  ├── close / void      (compare-and-swap on status/version)            │
//! │  └── list_history / branch_report                                      │
//! │       │                                                                 │
//! │  MovementRepository                                                    │
//! │  └── list_by_session / list_detached_from                              │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod movement;
pub mod session;
