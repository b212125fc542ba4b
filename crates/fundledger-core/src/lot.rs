//! FIFO cost-basis lot book.
//!
//! A [`LotBook`] holds the open lots of one fund's synthetic commodity.
//! Lots are appended on acquisition and consumed oldest-first on
//! disposal. FIFO is the only matching policy: replay is chronological,
//! so insertion order equals acquisition-date order equals consumption
//! order.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A batch of synthetic units acquired together at one cost basis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lot {
    /// Acquisition date
    pub date: NaiveDate,
    /// Open units remaining in this lot (always > 0)
    pub units: Decimal,
    /// Per-unit acquisition cost
    pub cost_per_unit: Decimal,
}

/// One lot's contribution to a FIFO consumption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LotMatch {
    /// Acquisition date of the consumed lot
    pub date: NaiveDate,
    /// Units taken from this lot
    pub units: Decimal,
    /// The lot's per-unit cost
    pub cost_per_unit: Decimal,
}

/// Result of a FIFO consumption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FifoConsumption {
    /// Lots consumed, oldest first.
    pub matches: Vec<LotMatch>,
    /// Total cost basis removed: sum of units × cost over the matches.
    pub cost_basis: Decimal,
}

/// Error that can occur while mutating a lot book.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LotError {
    /// Acquisition with zero or negative units.
    #[error("cannot acquire non-positive units: {units}")]
    NonPositiveUnits {
        /// The offending unit count.
        units: Decimal,
    },
    /// Acquisition at a negative per-unit cost.
    #[error("cannot acquire at negative cost: {cost}")]
    NegativeCost {
        /// The offending cost.
        cost: Decimal,
    },
    /// Consumption beyond the total held units.
    #[error("insufficient units: requested {requested}, available {available}")]
    InsufficientUnits {
        /// Units requested.
        requested: Decimal,
        /// Units available across all open lots.
        available: Decimal,
    },
}

/// An append-ordered collection of open lots with FIFO consumption.
///
/// # Examples
///
/// ```
/// use fundledger_core::LotBook;
/// use rust_decimal_macros::dec;
/// use chrono::NaiveDate;
///
/// let date = |d| NaiveDate::from_ymd_opt(2024, 2, d).unwrap();
/// let mut book = LotBook::new();
///
/// book.acquire(date(1), dec!(500), dec!(1.0)).unwrap();
/// book.acquire(date(15), dec!(625), dec!(0.8)).unwrap();
/// assert_eq!(book.total_units(), dec!(1125));
///
/// // FIFO: the 1.0-cost lot is drained first
/// let taken = book.consume_fifo(dec!(375), dec!(0.00000001)).unwrap();
/// assert_eq!(taken.cost_basis, dec!(375.0));
/// assert_eq!(book.total_units(), dec!(750));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LotBook {
    lots: Vec<Lot>,
}

impl LotBook {
    /// Create an empty lot book.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get all open lots, oldest first.
    #[must_use]
    pub fn lots(&self) -> &[Lot] {
        &self.lots
    }

    /// Get the number of open lots.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lots.len()
    }

    /// Check if the book holds no lots at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lots.is_empty()
    }

    /// Total units held across all open lots.
    #[must_use]
    pub fn total_units(&self) -> Decimal {
        self.lots.iter().map(|l| l.units).sum()
    }

    /// Check whether total holdings are zero within tolerance.
    #[must_use]
    pub fn is_drained(&self, tolerance: Decimal) -> bool {
        self.total_units().abs() <= tolerance
    }

    /// Append a new lot.
    ///
    /// Lots must arrive in chronological order; the replay pass
    /// guarantees this.
    pub fn acquire(
        &mut self,
        date: NaiveDate,
        units: Decimal,
        cost_per_unit: Decimal,
    ) -> Result<(), LotError> {
        if units <= Decimal::ZERO {
            return Err(LotError::NonPositiveUnits { units });
        }
        if cost_per_unit < Decimal::ZERO {
            return Err(LotError::NegativeCost {
                cost: cost_per_unit,
            });
        }
        debug_assert!(
            self.lots.last().map_or(true, |l| l.date <= date),
            "lots must be acquired in date order"
        );
        self.lots.push(Lot {
            date,
            units,
            cost_per_unit,
        });
        Ok(())
    }

    /// Consume `units` oldest-first.
    ///
    /// Walks lots in acquisition order, fully draining each until the
    /// request is covered, partially draining the last lot touched.
    /// Drained lots (units within `tolerance` of zero) are removed.
    ///
    /// Returns the ordered matches and the cost basis removed, or
    /// `LotError::InsufficientUnits` if the request exceeds total
    /// holdings by more than `tolerance`. The book is not modified on
    /// error.
    pub fn consume_fifo(
        &mut self,
        units: Decimal,
        tolerance: Decimal,
    ) -> Result<FifoConsumption, LotError> {
        if units <= Decimal::ZERO {
            return Err(LotError::NonPositiveUnits { units });
        }

        let available = self.total_units();
        if units > available + tolerance {
            return Err(LotError::InsufficientUnits {
                requested: units,
                available,
            });
        }

        let mut remaining = units;
        let mut matches = Vec::new();
        let mut cost_basis = Decimal::ZERO;

        for lot in &mut self.lots {
            if remaining <= tolerance {
                break;
            }
            let take = remaining.min(lot.units);
            matches.push(LotMatch {
                date: lot.date,
                units: take,
                cost_per_unit: lot.cost_per_unit,
            });
            cost_basis += take * lot.cost_per_unit;
            lot.units -= take;
            remaining -= take;
        }

        self.lots.retain(|l| l.units.abs() > tolerance);

        Ok(FifoConsumption {
            matches,
            cost_basis,
        })
    }
}

impl fmt::Display for LotBook {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.lots.is_empty() {
            return write!(f, "(empty)");
        }
        for (i, lot) in self.lots.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{} {{{}, {}}}", lot.units, lot.cost_per_unit, lot.date)?;
        }
        Ok(())
    }
}
