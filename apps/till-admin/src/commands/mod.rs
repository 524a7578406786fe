//! # Commands
//!
//! One handler per subcommand, grouped by concern:
//!
//! - [`session`] - open, active, show, close, reset
//! - [`event`] - cash sales and expenses
//! - [`history`] - history, movements, report
//! - [`status`] - store health

use serde::Serialize;

use till_engine::{EngineError, EngineResult, TillService};

use crate::Commands;

pub mod event;
pub mod history;
pub mod session;
pub mod status;

/// Runs one parsed subcommand and prints its result.
pub async fn dispatch(service: &TillService, command: Commands, compact: bool) -> EngineResult<()> {
    let out = Output { compact };

    match command {
        Commands::Open {
            branch,
            amount,
            user,
            notes,
        } => out.print(&session::open(service, branch, amount, user, notes).await?),
        Commands::Active { branch } => out.print(&session::active(service, &branch).await?),
        Commands::Show { session_id } => out.print(&session::show(service, &session_id).await?),
        Commands::Close {
            session_id,
            user,
            counts,
            notes,
        } => out.print(&session::close(service, session_id, user, counts, notes).await?),
        Commands::Reset { session_id, user } => {
            out.print(&session::reset(service, &session_id, &user).await?)
        }
        Commands::Event {
            branch,
            kind,
            amount,
            reference,
            user,
        } => out.print(&event::record(service, branch, kind, amount, reference, user).await?),
        Commands::History {
            branch,
            status,
            classification,
            from,
            to,
            offset,
            limit,
        } => out.print(
            &history::list(
                service,
                &branch,
                history::HistoryArgs {
                    statuses: status,
                    classification,
                    from,
                    to,
                    offset,
                    limit,
                },
            )
            .await?,
        ),
        Commands::Movements {
            session_id,
            detached,
        } => out.print(&history::movements(service, &session_id, detached).await?),
        Commands::Report { branch, from, to } => {
            out.print(&history::report(service, &branch, from, to).await?)
        }
        Commands::Status => out.print(&status::health(service).await?),
    }
}

struct Output {
    compact: bool,
}

impl Output {
    fn print<T: Serialize>(&self, value: &T) -> EngineResult<()> {
        let json = if self.compact {
            serde_json::to_string(value)
        } else {
            serde_json::to_string_pretty(value)
        }
        .map_err(|e| EngineError::Io(std::io::Error::from(e)))?;

        println!("{}", json);
        Ok(())
    }
}
