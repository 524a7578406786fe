//! # Seed Data Generator
//!
//! Populates the database with demo cash session history for development.
//!
//! ## Usage
//! ```bash
//! # 20 sessions per branch (default)
//! cargo run -p till-db --bin seed
//!
//! # Custom amount
//! cargo run -p till-db --bin seed -- --sessions 100
//!
//! # Specify database path
//! cargo run -p till-db --bin seed -- --db ./data/till.db
//! ```
//!
//! ## Generated History
//! For each demo branch, sessions are opened, fed sales and expenses, then
//! ended in a repeating pattern: balanced, short, over, voided. The last
//! session of every branch is left open. Amounts are derived from the
//! session index, so two runs produce the same totals.

use std::env;
use till_core::{
    CashBreakdown, CashEvent, CashEventKind, CashSession, Denomination, Money, SessionSummary,
};
use till_db::{CloseOutcome, CountedClose, Database, DbConfig, NewSession};

/// Demo branches.
const BRANCHES: &[&str] = &["north", "south", "airport"];

/// Demo cashiers, picked round-robin.
const CASHIERS: &[&str] = &["alice", "bob", "carol", "dave"];

/// How each seeded session ends, by `index % 4`.
enum Ending {
    Balanced,
    Short,
    Over,
    Voided,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut sessions_per_branch: usize = 20;
    let mut db_path = String::from("./till_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--sessions" | "-s" => {
                if i + 1 < args.len() {
                    sessions_per_branch = args[i + 1].parse().unwrap_or(20);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Till Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -s, --sessions <N>  Sessions per branch (default: 20)");
                println!("  -d, --db <PATH>     Database file path (default: ./till_dev.db)");
                println!("  -h, --help          Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Till Seed Data Generator");
    println!("===========================");
    println!("Database: {}", db_path);
    println!("Branches: {}", BRANCHES.join(", "));
    println!("Sessions per branch: {}", sessions_per_branch);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;

    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.sessions().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} sessions", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let start = std::time::Instant::now();
    let mut events = 0usize;

    for branch in BRANCHES {
        for index in 0..sessions_per_branch {
            let cashier = CASHIERS[index % CASHIERS.len()];
            let session = db
                .sessions()
                .create(&NewSession {
                    branch_id: branch.to_string(),
                    opened_by: cashier.to_string(),
                    opening_amount_cents: Money::from_major_minor(100 + (index as i64 % 5) * 25, 0)
                        .cents(),
                    opening_notes: None,
                })
                .await?;

            let mut applied = SessionSummary::default();

            for n in 0..(3 + index % 7) {
                let amount = Money::from_cents(450 + ((index * 31 + n * 17) % 60) as i64 * 25);
                applied = applied.with_event(CashEventKind::Sale, amount);
                db.sessions()
                    .apply_cash_event(
                        &CashEvent::sale(*branch, amount)
                            .with_reference(format!("R-{}-{:04}", index, n))
                            .with_recorded_by(cashier),
                    )
                    .await?;
                events += 1;
            }
            if index % 3 == 0 {
                let amount = Money::from_major_minor(15, 0);
                applied = applied.with_event(CashEventKind::Expense, amount);
                db.sessions()
                    .apply_cash_event(
                        &CashEvent::expense(*branch, amount)
                            .with_reference(format!("EXP-{}", index))
                            .with_recorded_by(cashier),
                    )
                    .await?;
                events += 1;
            }

            if index + 1 == sessions_per_branch {
                // Leave the last session open
                break;
            }

            let fresh = db
                .sessions()
                .get_by_id(&session.id)
                .await?
                .ok_or("seeded session disappeared")?;
            if fresh.summary != applied {
                return Err(format!("summary of {} drifted from its events", fresh.id).into());
            }

            let ending = match index % 4 {
                0 => Ending::Balanced,
                1 => Ending::Short,
                2 => Ending::Over,
                _ => Ending::Voided,
            };
            end_session(&db, &fresh, ending, "manager").await?;
        }

        println!("  Seeded branch {}", branch);
    }

    let elapsed = start.elapsed();
    println!();
    println!(
        "✓ Generated {} sessions and {} cash events in {:?}",
        BRANCHES.len() * sessions_per_branch,
        events,
        elapsed
    );
    println!();
    println!("✓ Seed complete!");

    Ok(())
}

/// Counts the drawer to the expected total, shifted by the ending's error.
async fn end_session(
    db: &Database,
    session: &CashSession,
    ending: Ending,
    manager: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let expected = till_core::reconcile::expected_total(session.opening_amount(), &session.summary);
    let target = match ending {
        Ending::Balanced => expected,
        Ending::Short => expected - Money::from_major_minor(5, 0),
        Ending::Over => expected + Money::from_major_minor(1, 25),
        Ending::Voided => {
            db.sessions().void(&session.id, manager).await?;
            return Ok(());
        }
    };

    let count = CountedClose {
        closed_by: session.opened_by.clone(),
        cash_breakdown: count_out(target)?,
        closing_notes: None,
    };

    match db.sessions().close_counted(&session.id, &count).await? {
        CloseOutcome::Closed { .. } => Ok(()),
        CloseOutcome::NotOpen(_) | CloseOutcome::NotFound => {
            Err(format!("seeded session {} could not be closed", session.id).into())
        }
    }
}

/// Greedy change-making: largest denominations first.
fn count_out(amount: Money) -> Result<CashBreakdown, Box<dyn std::error::Error>> {
    let mut remaining = amount.cents().max(0);
    let mut counts = Vec::new();

    for denomination in Denomination::ALL {
        let face = denomination.face_value_cents();
        let count = remaining / face;
        if count > 0 {
            counts.push((denomination, count));
            remaining -= count * face;
        }
    }

    Ok(CashBreakdown::from_counts(counts)?)
}
