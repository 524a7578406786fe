//! # Telemetry
//!
//! Tracing subscriber setup shared by every Till binary.
//!
//! ## Log Levels
//! - `RUST_LOG=debug` - Show debug messages
//! - `RUST_LOG=till_engine=trace` - Trace the engine only
//! - Default: `info,till=debug,sqlx=warn`
//!
//! Output goes to stderr so command output on stdout stays machine-readable.

use tracing_subscriber::EnvFilter;

/// Filter used when neither `RUST_LOG` nor `logging.filter` says otherwise.
pub const DEFAULT_LOG_FILTER: &str = "info,till=debug,sqlx=warn";

/// Initializes the tracing subscriber for structured logging.
///
/// `RUST_LOG` wins over `filter`. Returns false if a global subscriber was
/// already installed (tests, embedding applications).
pub fn init_tracing(filter: &str) -> bool {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
        .is_ok()
}
