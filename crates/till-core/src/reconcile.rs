//! # Reconciliation Engine
//!
//! Pure arithmetic that turns a session's running summary and a physical
//! count into the closing numbers.
//!
//! ## Formula
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   expected_total = opening_amount + cash_sales_total - total_expenses   │
//! │                                                                         │
//! │   counted_total  = Σ face_value(d) × count(d)                           │
//! │                                                                         │
//! │   difference     = counted_total - expected_total                       │
//! │                                                                         │
//! │        difference == 0  →  Exact     →  BALANCED                        │
//! │        difference  > 0  →  Surplus   →  CLOSED                          │
//! │        difference  < 0  →  Shortage  →  CLOSED                          │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Everything is integer cents. The same inputs always produce the same
//! result.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use ts_rs::TS;

use crate::denomination::{BreakdownLine, CashBreakdown};
use crate::money::Money;
use crate::types::{SessionStatus, SessionSummary};

// =============================================================================
// Classification
// =============================================================================

/// How the counted drawer compares with what the system expected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Classification {
    Exact,
    Surplus,
    Shortage,
}

impl Classification {
    /// Classifies a signed difference.
    pub fn from_difference(difference: Money) -> Self {
        match difference.cents().cmp(&0) {
            Ordering::Equal => Classification::Exact,
            Ordering::Greater => Classification::Surplus,
            Ordering::Less => Classification::Shortage,
        }
    }

    /// Status a session takes when closed with this classification.
    pub fn resulting_status(&self) -> SessionStatus {
        match self {
            Classification::Exact => SessionStatus::Balanced,
            Classification::Surplus | Classification::Shortage => SessionStatus::Closed,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Classification::Exact => "exact",
            Classification::Surplus => "surplus",
            Classification::Shortage => "shortage",
        }
    }
}

impl fmt::Display for Classification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Reconciliation Result
// =============================================================================

/// Output of [`reconcile`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reconciliation {
    pub counted_total: Money,
    pub expected_total: Money,
    /// counted - expected.
    pub difference: Money,
    pub classification: Classification,
    /// Per-denomination subtotals, largest face value first.
    pub lines: Vec<BreakdownLine>,
}

impl Reconciliation {
    /// BALANCED for an exact match, CLOSED otherwise.
    #[inline]
    pub fn resulting_status(&self) -> SessionStatus {
        self.classification.resulting_status()
    }
}

// =============================================================================
// Functions
// =============================================================================

/// `opening + cash sales - expenses`.
///
/// ## Example
/// ```rust
/// use till_core::money::Money;
/// use till_core::reconcile::expected_total;
/// use till_core::types::SessionSummary;
///
/// let summary = SessionSummary {
///     cash_sales_total_cents: 20_000,
///     sales_count: 3,
///     total_expenses_cents: 5_000,
///     expenses_count: 1,
/// };
/// assert_eq!(expected_total(Money::from_cents(10_000), &summary).cents(), 25_000);
/// ```
pub fn expected_total(opening: Money, summary: &SessionSummary) -> Money {
    opening + summary.cash_sales_total() - summary.total_expenses()
}

/// Reconciles a physical count against the session's expected cash.
///
/// An empty breakdown is a legitimate count of zero.
pub fn reconcile(
    opening: Money,
    summary: &SessionSummary,
    breakdown: &CashBreakdown,
) -> Reconciliation {
    let expected_total = expected_total(opening, summary);
    let counted_total = breakdown.total();
    let difference = counted_total - expected_total;

    Reconciliation {
        counted_total,
        expected_total,
        difference,
        classification: Classification::from_difference(difference),
        lines: breakdown.lines(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::denomination::Denomination;
    use proptest::prelude::*;

    fn summary(sales: i64, expenses: i64) -> SessionSummary {
        SessionSummary {
            cash_sales_total_cents: sales,
            sales_count: if sales > 0 { 1 } else { 0 },
            total_expenses_cents: expenses,
            expenses_count: if expenses > 0 { 1 } else { 0 },
        }
    }

    /// $500 opening, $1230 sales, $80 expenses, counted $1650 → exact.
    #[test]
    fn test_exact_count_balances() {
        let counted = CashBreakdown::from_counts([
            (Denomination::Bill100, 16),
            (Denomination::Bill50, 1),
        ])
        .unwrap();

        let result = reconcile(
            Money::from_cents(50_000),
            &summary(123_000, 8_000),
            &counted,
        );

        assert_eq!(result.expected_total.cents(), 165_000);
        assert_eq!(result.counted_total.cents(), 165_000);
        assert!(result.difference.is_zero());
        assert_eq!(result.classification, Classification::Exact);
        assert_eq!(result.resulting_status(), SessionStatus::Balanced);
    }

    /// Same session, counted $1600 → $50 short.
    #[test]
    fn test_short_count_closes_with_shortage() {
        let counted = CashBreakdown::from_counts([(Denomination::Bill100, 16)]).unwrap();

        let result = reconcile(
            Money::from_cents(50_000),
            &summary(123_000, 8_000),
            &counted,
        );

        assert_eq!(result.difference.cents(), -5_000);
        assert_eq!(result.classification, Classification::Shortage);
        assert_eq!(result.resulting_status(), SessionStatus::Closed);
    }

    #[test]
    fn test_surplus() {
        let counted = CashBreakdown::from_counts([(Denomination::Bill20, 1)]).unwrap();
        let result = reconcile(Money::from_cents(1_000), &SessionSummary::default(), &counted);

        assert_eq!(result.difference.cents(), 1_000);
        assert_eq!(result.classification, Classification::Surplus);
        assert_eq!(result.resulting_status(), SessionStatus::Closed);
    }

    #[test]
    fn test_empty_breakdown_counts_zero() {
        let result = reconcile(
            Money::zero(),
            &SessionSummary::default(),
            &CashBreakdown::new(),
        );
        assert_eq!(result.classification, Classification::Exact);
        assert!(result.lines.is_empty());

        let result = reconcile(
            Money::from_cents(2_500),
            &SessionSummary::default(),
            &CashBreakdown::new(),
        );
        assert_eq!(result.difference.cents(), -2_500);
    }

    #[test]
    fn test_expected_can_go_negative() {
        // Expenses paid from a float larger than the drawer held
        let expected = expected_total(Money::from_cents(1_000), &summary(0, 3_000));
        assert_eq!(expected.cents(), -2_000);
    }

    fn breakdown_strategy() -> impl Strategy<Value = Vec<(Denomination, i64)>> {
        proptest::sample::subsequence(Denomination::ALL.to_vec(), 0..=Denomination::ALL.len())
            .prop_flat_map(|denoms| {
                let n = denoms.len();
                (Just(denoms), proptest::collection::vec(0i64..500, n))
            })
            .prop_map(|(denoms, counts)| denoms.into_iter().zip(counts).collect())
    }

    proptest! {
        #[test]
        fn prop_difference_is_counted_minus_expected(
            opening in 0i64..10_000_000,
            sales in 0i64..10_000_000,
            expenses in 0i64..10_000_000,
            counts in breakdown_strategy(),
        ) {
            let breakdown = CashBreakdown::from_counts(counts.clone()).unwrap();
            let result = reconcile(Money::from_cents(opening), &summary(sales, expenses), &breakdown);

            let counted: i64 = counts.iter().map(|(d, c)| d.face_value_cents() * c).sum();
            prop_assert_eq!(result.counted_total.cents(), counted);
            prop_assert_eq!(result.expected_total.cents(), opening + sales - expenses);
            prop_assert_eq!(result.difference.cents(), counted - (opening + sales - expenses));
            prop_assert_eq!(
                result.classification == Classification::Exact,
                result.difference.is_zero()
            );
        }

        #[test]
        fn prop_reconcile_is_deterministic(
            opening in 0i64..1_000_000,
            sales in 0i64..1_000_000,
            counts in breakdown_strategy(),
        ) {
            let breakdown = CashBreakdown::from_counts(counts).unwrap();
            let a = reconcile(Money::from_cents(opening), &summary(sales, 0), &breakdown);
            let b = reconcile(Money::from_cents(opening), &summary(sales, 0), &breakdown);
            prop_assert_eq!(a, b);
        }

        #[test]
        fn prop_lines_sum_to_counted_total(counts in breakdown_strategy()) {
            let breakdown = CashBreakdown::from_counts(counts).unwrap();
            let lines_total: i64 = breakdown.lines().iter().map(|l| l.subtotal_cents).sum();
            prop_assert_eq!(lines_total, breakdown.total().cents());
        }
    }
}
