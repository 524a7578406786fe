//! Argument parsers and value enums for the CLI.

use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use clap::ValueEnum;

use till_core::{CashEventKind, Classification, Denomination, Money, SessionStatus};

/// Parses a decimal amount such as `12.50`.
pub fn parse_money(s: &str) -> Result<Money, String> {
    s.parse::<Money>().map_err(|e| e.to_string())
}

/// Parses `<denomination>=<count>`.
///
/// The denomination is either its name (`bill20`, `coin25`) or its face
/// value (`20`, `0.25`).
pub fn parse_count(s: &str) -> Result<(Denomination, i64), String> {
    let (name, count) = s
        .split_once('=')
        .ok_or_else(|| format!("expected <denomination>=<count>, got '{}'", s))?;

    let denomination = match Denomination::from_str(name) {
        Ok(denomination) => denomination,
        Err(err) => name
            .trim()
            .parse::<Money>()
            .ok()
            .and_then(|face| Denomination::from_face_value(face.cents()))
            .ok_or_else(|| err.to_string())?,
    };

    let count = count
        .trim()
        .parse::<i64>()
        .map_err(|_| format!("count must be a whole number, got '{}'", count))?;

    Ok((denomination, count))
}

/// A point in time given as RFC 3339 or as a UTC calendar date.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instant(pub DateTime<Utc>);

impl FromStr for Instant {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Ok(at) = DateTime::parse_from_rfc3339(s) {
            return Ok(Instant(at.with_timezone(&Utc)));
        }

        NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .ok()
            .and_then(|date| date.and_hms_opt(0, 0, 0))
            .map(|midnight| Instant(midnight.and_utc()))
            .ok_or_else(|| format!("expected RFC 3339 or YYYY-MM-DD, got '{}'", s))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum EventKindArg {
    Sale,
    Expense,
}

impl From<EventKindArg> for CashEventKind {
    fn from(kind: EventKindArg) -> Self {
        match kind {
            EventKindArg::Sale => CashEventKind::Sale,
            EventKindArg::Expense => CashEventKind::Expense,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum StatusArg {
    Closed,
    Balanced,
    Voided,
}

impl From<StatusArg> for SessionStatus {
    fn from(status: StatusArg) -> Self {
        match status {
            StatusArg::Closed => SessionStatus::Closed,
            StatusArg::Balanced => SessionStatus::Balanced,
            StatusArg::Voided => SessionStatus::Voided,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ClassificationArg {
    Exact,
    Surplus,
    Shortage,
}

impl From<ClassificationArg> for Classification {
    fn from(classification: ClassificationArg) -> Self {
        match classification {
            ClassificationArg::Exact => Classification::Exact,
            ClassificationArg::Surplus => Classification::Surplus,
            ClassificationArg::Shortage => Classification::Shortage,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_count() {
        assert_eq!(parse_count("bill20=3"), Ok((Denomination::Bill20, 3)));
        assert_eq!(parse_count("100=2"), Ok((Denomination::Bill100, 2)));
        assert_eq!(parse_count("0.05=7"), Ok((Denomination::Coin5, 7)));
        // Range checks happen when the breakdown is built
        assert_eq!(parse_count("coin1=-1"), Ok((Denomination::Coin1, -1)));

        assert!(parse_count("bill20").is_err());
        assert!(parse_count("bill20=x").is_err());
        assert!(parse_count("3=1").is_err());
    }

    #[test]
    fn test_parse_instant() {
        let day: Instant = "2026-10-01".parse().unwrap();
        assert_eq!(day.0.to_rfc3339(), "2026-10-01T00:00:00+00:00");

        let exact: Instant = "2026-10-01T12:30:00-03:00".parse().unwrap();
        assert_eq!(exact.0.to_rfc3339(), "2026-10-01T15:30:00+00:00");

        assert!("yesterday".parse::<Instant>().is_err());
    }

    #[test]
    fn test_parse_money() {
        assert_eq!(parse_money("500.00").unwrap().cents(), 50_000);
        assert!(parse_money("5.001").is_err());
    }
}
