//! # Denominations
//!
//! The closed set of bills and coins a drawer can hold, and the counted
//! breakdown an operator submits at close.
//!
//! ## Breakdown Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Operator counts the drawer                                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  raw input: [(bill20, 7), (coin25, 12), ...]   or  {2000: 7, 25: 12}    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  CashBreakdown::from_counts / from_face_values  ← validated HERE        │
//! │       ├── negative count?       → ValidationError::Negative             │
//! │       ├── count too large?      → ValidationError::OutOfRange           │
//! │       ├── duplicate entry?      → ValidationError::Duplicate            │
//! │       └── unknown face value?   → ValidationError::NotAllowed           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  CashBreakdown (BTreeMap<Denomination, u32>)  ← always well-formed      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;
use crate::money::Money;
use crate::validation::{validate_denomination_count, ValidationResult};

// =============================================================================
// Denomination
// =============================================================================

/// Physical form of a denomination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DenominationKind {
    Bill,
    Coin,
}

/// A US dollar bill or coin.
///
/// Face values are unique across the set; a one-dollar coin is counted as
/// [`Denomination::Bill1`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Denomination {
    Bill100,
    Bill50,
    Bill20,
    Bill10,
    Bill5,
    Bill2,
    Bill1,
    Coin50,
    Coin25,
    Coin10,
    Coin5,
    Coin1,
}

impl Denomination {
    /// Every denomination, largest first.
    pub const ALL: [Denomination; 12] = [
        Denomination::Bill100,
        Denomination::Bill50,
        Denomination::Bill20,
        Denomination::Bill10,
        Denomination::Bill5,
        Denomination::Bill2,
        Denomination::Bill1,
        Denomination::Coin50,
        Denomination::Coin25,
        Denomination::Coin10,
        Denomination::Coin5,
        Denomination::Coin1,
    ];

    /// Face value in cents.
    pub const fn face_value_cents(&self) -> i64 {
        match self {
            Denomination::Bill100 => 10_000,
            Denomination::Bill50 => 5_000,
            Denomination::Bill20 => 2_000,
            Denomination::Bill10 => 1_000,
            Denomination::Bill5 => 500,
            Denomination::Bill2 => 200,
            Denomination::Bill1 => 100,
            Denomination::Coin50 => 50,
            Denomination::Coin25 => 25,
            Denomination::Coin10 => 10,
            Denomination::Coin5 => 5,
            Denomination::Coin1 => 1,
        }
    }

    /// Face value as Money.
    #[inline]
    pub const fn face_value(&self) -> Money {
        Money::from_cents(self.face_value_cents())
    }

    /// Bill or coin.
    pub const fn kind(&self) -> DenominationKind {
        match self {
            Denomination::Bill100
            | Denomination::Bill50
            | Denomination::Bill20
            | Denomination::Bill10
            | Denomination::Bill5
            | Denomination::Bill2
            | Denomination::Bill1 => DenominationKind::Bill,
            _ => DenominationKind::Coin,
        }
    }

    /// Looks up a denomination by face value in cents.
    ///
    /// ## Example
    /// ```rust
    /// use till_core::denomination::Denomination;
    ///
    /// assert_eq!(Denomination::from_face_value(2000), Some(Denomination::Bill20));
    /// assert_eq!(Denomination::from_face_value(3), None);
    /// ```
    pub fn from_face_value(cents: i64) -> Option<Self> {
        Self::ALL
            .iter()
            .copied()
            .find(|d| d.face_value_cents() == cents)
    }

    /// Stable snake-case name, as used in persisted breakdowns.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Denomination::Bill100 => "bill100",
            Denomination::Bill50 => "bill50",
            Denomination::Bill20 => "bill20",
            Denomination::Bill10 => "bill10",
            Denomination::Bill5 => "bill5",
            Denomination::Bill2 => "bill2",
            Denomination::Bill1 => "bill1",
            Denomination::Coin50 => "coin50",
            Denomination::Coin25 => "coin25",
            Denomination::Coin10 => "coin10",
            Denomination::Coin5 => "coin5",
            Denomination::Coin1 => "coin1",
        }
    }
}

impl fmt::Display for Denomination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Denomination {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .iter()
            .copied()
            .find(|d| d.as_str() == wanted)
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "denomination".to_string(),
                allowed: Self::ALL.iter().map(|d| d.as_str().to_string()).collect(),
            })
    }
}

// =============================================================================
// Cash Breakdown
// =============================================================================

/// One printed line of a counted drawer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BreakdownLine {
    pub denomination: Denomination,
    pub count: u32,
    pub subtotal_cents: i64,
}

/// Units counted per denomination.
///
/// Only constructible through validating constructors, so every value is
/// non-negative and bounded by [`crate::MAX_DENOMINATION_COUNT`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CashBreakdown(BTreeMap<Denomination, u32>);

impl CashBreakdown {
    /// An empty count (counted total zero).
    pub fn new() -> Self {
        CashBreakdown(BTreeMap::new())
    }

    /// Builds a breakdown from `(denomination, count)` pairs.
    ///
    /// Zero counts are accepted and dropped.
    pub fn from_counts<I>(counts: I) -> ValidationResult<Self>
    where
        I: IntoIterator<Item = (Denomination, i64)>,
    {
        let mut map = BTreeMap::new();
        for (denomination, count) in counts {
            let count = validate_denomination_count(denomination, count)?;
            if map.insert(denomination, count).is_some() {
                return Err(ValidationError::Duplicate {
                    field: "denomination".to_string(),
                    value: denomination.to_string(),
                });
            }
        }
        map.retain(|_, count| *count > 0);
        Ok(CashBreakdown(map))
    }

    /// Builds a breakdown from `(face value in cents, count)` pairs.
    ///
    /// ## Example
    /// ```rust
    /// use till_core::denomination::CashBreakdown;
    ///
    /// let counted = CashBreakdown::from_face_values([(2000, 3), (25, 4)]).unwrap();
    /// assert_eq!(counted.total().cents(), 6100);
    ///
    /// assert!(CashBreakdown::from_face_values([(3, 1)]).is_err());
    /// assert!(CashBreakdown::from_face_values([(2000, -1)]).is_err());
    /// ```
    pub fn from_face_values<I>(counts: I) -> ValidationResult<Self>
    where
        I: IntoIterator<Item = (i64, i64)>,
    {
        let mut pairs = Vec::new();
        for (face_value, count) in counts {
            let denomination = Denomination::from_face_value(face_value).ok_or_else(|| {
                ValidationError::NotAllowed {
                    field: format!("face value {}", face_value),
                    allowed: Denomination::ALL
                        .iter()
                        .map(|d| d.face_value_cents().to_string())
                        .collect(),
                }
            })?;
            pairs.push((denomination, count));
        }
        Self::from_counts(pairs)
    }

    /// Units counted for one denomination.
    pub fn count(&self, denomination: Denomination) -> u32 {
        self.0.get(&denomination).copied().unwrap_or(0)
    }

    /// Iterates `(denomination, count)` pairs, largest face value first.
    pub fn iter(&self) -> impl Iterator<Item = (Denomination, u32)> + '_ {
        self.0.iter().map(|(d, c)| (*d, *c))
    }

    /// True when nothing was counted.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Total number of physical units.
    pub fn unit_count(&self) -> u64 {
        self.0.values().map(|c| u64::from(*c)).sum()
    }

    /// Counted total: Σ face value × count.
    pub fn total(&self) -> Money {
        self.iter()
            .map(|(d, count)| d.face_value().times(i64::from(count)))
            .sum()
    }

    /// Per-denomination subtotals for the closing report.
    pub fn lines(&self) -> Vec<BreakdownLine> {
        self.iter()
            .map(|(denomination, count)| BreakdownLine {
                denomination,
                count,
                subtotal_cents: denomination.face_value().times(i64::from(count)).cents(),
            })
            .collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
