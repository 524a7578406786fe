//! # till-admin
//!
//! Operator and back-office CLI for cash-drawer sessions.
//!
//! ## Usage
//! ```bash
//! till-admin open --branch north --amount 500.00 --user alice
//! till-admin event --branch north --kind sale --amount 12.50 --reference R-1001
//! till-admin close <SESSION_ID> --user manager --count bill100=15 --count bill50=3
//! till-admin history --branch north --classification shortage
//! till-admin report --branch north --from 2026-10-01 --to 2026-11-01
//! ```
//!
//! Results are printed as JSON on stdout. Failures are printed as JSON on
//! stderr with a stable error code, and the exit status tells the category
//! apart: 2 validation, 3 conflict, 4 not found, 1 anything else.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::debug;

use till_core::{Denomination, ErrorCategory, Money};
use till_engine::{init_tracing, EngineConfig, EngineError, ErrorReport, TillService};

mod args;
mod commands;

use args::{ClassificationArg, EventKindArg, Instant, StatusArg};

#[derive(Parser)]
#[command(name = "till-admin")]
#[command(about = "Cash-drawer session lifecycle and reconciliation")]
#[command(version)]
struct Cli {
    /// Configuration file path (defaults to the platform config dir)
    #[arg(short, long, env = "TILL_CONFIG")]
    config: Option<PathBuf>,

    /// Database file, overriding the config
    #[arg(long)]
    db: Option<PathBuf>,

    /// Print single-line JSON
    #[arg(long)]
    compact: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Open a cash session for a branch
    Open {
        #[arg(short, long)]
        branch: String,
        /// Opening float, e.g. 500.00
        #[arg(short, long, value_parser = args::parse_money)]
        amount: Money,
        /// Acting user id
        #[arg(short, long)]
        user: String,
        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Show the branch's open session
    Active {
        #[arg(short, long)]
        branch: String,
    },

    /// Show a session by id
    Show { session_id: String },

    /// Record a cash sale or cash expense
    Event {
        #[arg(short, long)]
        branch: String,
        #[arg(short, long, value_enum)]
        kind: EventKindArg,
        /// Amount, e.g. 12.50
        #[arg(short, long, value_parser = args::parse_money)]
        amount: Money,
        /// Receipt or voucher number
        #[arg(short, long)]
        reference: Option<String>,
        #[arg(short, long)]
        user: Option<String>,
    },

    /// Count the drawer, reconcile and close the session
    Close {
        session_id: String,
        #[arg(short, long)]
        user: String,
        /// Counted units, e.g. bill20=3 or 0.25=8 (repeatable)
        #[arg(long = "count", value_parser = args::parse_count)]
        counts: Vec<(Denomination, i64)>,
        #[arg(short, long)]
        notes: Option<String>,
    },

    /// Void an open session without reconciliation
    Reset {
        session_id: String,
        #[arg(short, long)]
        user: String,
    },

    /// List ended sessions of a branch, most recent first
    History {
        #[arg(short, long)]
        branch: String,
        #[arg(long, value_enum)]
        status: Vec<StatusArg>,
        #[arg(long, value_enum)]
        classification: Option<ClassificationArg>,
        /// Inclusive lower bound (RFC 3339 or YYYY-MM-DD)
        #[arg(long)]
        from: Option<Instant>,
        /// Exclusive upper bound (RFC 3339 or YYYY-MM-DD)
        #[arg(long)]
        to: Option<Instant>,
        #[arg(long, default_value = "0")]
        offset: u32,
        #[arg(long)]
        limit: Option<u32>,
    },

    /// List the cash movements of a session
    Movements {
        session_id: String,
        /// Movements detached by a reset instead of attributed ones
        #[arg(long)]
        detached: bool,
    },

    /// Shortage/surplus report for a branch
    Report {
        #[arg(short, long)]
        branch: String,
        #[arg(long)]
        from: Option<Instant>,
        #[arg(long)]
        to: Option<Instant>,
    },

    /// Store health and migration status
    Status,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let compact = cli.compact;

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let report = ErrorReport::from(&err);
            let rendered = if compact {
                serde_json::to_string(&report)
            } else {
                serde_json::to_string_pretty(&report)
            };
            match rendered {
                Ok(json) => eprintln!("{}", json),
                Err(_) => eprintln!("Error: {}", err),
            }
            ExitCode::from(exit_code(&err))
        }
    }
}

async fn run(cli: Cli) -> Result<(), EngineError> {
    let mut config = EngineConfig::load(cli.config.clone())?;
    if let Some(db) = cli.db.clone() {
        config.database.path = db;
    }

    init_tracing(&config.logging.filter);
    debug!(path = %config.database.path.display(), "Using database");

    let service = TillService::connect(&config).await?;
    let result = commands::dispatch(&service, cli.command, cli.compact).await;
    service.shutdown().await;
    result
}

fn exit_code(err: &EngineError) -> u8 {
    match err.category() {
        ErrorCategory::Validation => 2,
        ErrorCategory::Conflict => 3,
        ErrorCategory::NotFound => 4,
        ErrorCategory::Infrastructure => 1,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_close() {
        let cli = Cli::try_parse_from([
            "till-admin",
            "close",
            "550e8400-e29b-41d4-a716-446655440000",
            "--user",
            "manager",
            "--count",
            "bill20=3",
            "--count",
            "0.25=8",
        ])
        .unwrap();

        match cli.command {
            Commands::Close { counts, user, .. } => {
                assert_eq!(user, "manager");
                assert_eq!(
                    counts,
                    vec![(Denomination::Bill20, 3), (Denomination::Coin25, 8)]
                );
            }
            _ => panic!("expected close"),
        }
    }

    #[test]
    fn test_parse_event() {
        let cli = Cli::try_parse_from([
            "till-admin", "event", "-b", "north", "-k", "expense", "-a", "12.50",
        ])
        .unwrap();

        match cli.command {
            Commands::Event { kind, amount, .. } => {
                assert_eq!(kind, EventKindArg::Expense);
                assert_eq!(amount.cents(), 1_250);
            }
            _ => panic!("expected event"),
        }
    }

    #[test]
    fn test_rejects_bad_count() {
        assert!(Cli::try_parse_from([
            "till-admin",
            "close",
            "550e8400-e29b-41d4-a716-446655440000",
            "--user",
            "manager",
            "--count",
            "bill3=1",
        ])
        .is_err());
    }

    #[test]
    fn test_exit_codes() {
        let err: EngineError = till_core::CoreError::SessionNotFound("x".into()).into();
        assert_eq!(exit_code(&err), 4);
        assert_eq!(exit_code(&EngineError::Config("bad".into())), 1);
    }
}
