//! Cost type for lot references on rewritten postings.
//!
//! A [`Cost`] records the per-unit acquisition cost of a batch of
//! synthetic units. It appears on a rewritten fund posting so the
//! posting identifies the lot it creates or disposes of.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::intern::InternedStr;
use crate::Amount;

/// The acquisition cost of a batch of units.
///
/// Buying 625 `COOL_FUND_EUR` at 0.8 EUR on 2024-03-01 produces:
/// - number: 0.8
/// - currency: "EUR"
/// - date: Some(2024-03-01)
///
/// # Examples
///
/// ```
/// use fundledger_core::Cost;
/// use rust_decimal_macros::dec;
/// use chrono::NaiveDate;
///
/// let cost = Cost::new(dec!(0.8), "EUR")
///     .with_date(NaiveDate::from_ymd_opt(2024, 3, 1).unwrap());
///
/// assert_eq!(cost.number, dec!(0.8));
/// assert_eq!(cost.currency, "EUR");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cost {
    /// Cost per unit
    pub number: Decimal,
    /// Currency of the cost
    pub currency: InternedStr,
    /// Acquisition date (identifies the lot)
    pub date: Option<NaiveDate>,
}

impl Cost {
    /// Create a new cost with the given number and currency.
    #[must_use]
    pub fn new(number: Decimal, currency: impl Into<InternedStr>) -> Self {
        Self {
            number,
            currency: currency.into(),
            date: None,
        }
    }

    /// Add a date to this cost.
    #[must_use]
    pub const fn with_date(mut self, date: NaiveDate) -> Self {
        self.date = Some(date);
        self
    }

    /// Get the cost as an amount.
    #[must_use]
    pub fn as_amount(&self) -> Amount {
        Amount::new(self.number, self.currency.clone())
    }

    /// Calculate the total cost for a given number of units.
    #[must_use]
    pub fn total_cost(&self, units: Decimal) -> Amount {
        Amount::new(units * self.number, self.currency.clone())
    }
}

impl fmt::Display for Cost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{} {}", self.number, self.currency)?;
        if let Some(date) = self.date {
            write!(f, ", {date}")?;
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn date(year: i32, month: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(year, month, day).unwrap()
    }

    #[test]
    fn test_cost_new() {
        let cost = Cost::new(dec!(1.05), "EUR");
        assert_eq!(cost.number, dec!(1.05));
        assert_eq!(cost.currency, "EUR");
        assert!(cost.date.is_none());
    }

    #[test]
    fn test_cost_total() {
        let cost = Cost::new(dec!(0.8), "EUR");
        let total = cost.total_cost(dec!(625));
        assert_eq!(total.number, dec!(500.0));
        assert_eq!(total.currency, "EUR");
    }

    #[test]
    fn test_cost_display() {
        let cost = Cost::new(dec!(0.8), "EUR").with_date(date(2024, 3, 1));
        let s = format!("{cost}");
        assert!(s.contains("0.8"));
        assert!(s.contains("EUR"));
        assert!(s.contains("2024-03-01"));
    }
}
