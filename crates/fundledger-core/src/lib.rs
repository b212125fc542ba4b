//! Core types for fundledger
//!
//! This crate provides the fundamental types used throughout the
//! fundledger project:
//!
//! - [`Amount`] - A decimal number with a currency
//! - [`Cost`] - Acquisition cost of a lot
//! - [`Lot`] / [`LotBook`] - FIFO cost-basis lot bookkeeping
//! - [`Directive`] - All directive types (Transaction, Balance,
//!   FundConfig, Valuation, etc.)
//!
//! # Example
//!
//! ```
//! use fundledger_core::LotBook;
//! use rust_decimal_macros::dec;
//! use chrono::NaiveDate;
//!
//! let mut book = LotBook::new();
//! let date = NaiveDate::from_ymd_opt(2024, 2, 1).unwrap();
//!
//! // Buy 500 units at 1.0
//! book.acquire(date, dec!(500), dec!(1.0)).unwrap();
//! assert_eq!(book.total_units(), dec!(500));
//!
//! // Sell 375 units, FIFO
//! let result = book.consume_fifo(dec!(375), dec!(0.00000001)).unwrap();
//! assert_eq!(result.cost_basis, dec!(375.0));
//! assert_eq!(book.total_units(), dec!(125));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod amount;
pub mod cost;
pub mod directive;
pub mod intern;
pub mod lot;

pub use amount::Amount;
pub use cost::Cost;
pub use directive::{
    sort_directives, Balance, Commodity, Directive, DirectivePriority, FundConfig, MetaValue,
    Metadata, Note, Open, Posting, Price, PriceAnnotation, Transaction, Valuation,
};
pub use intern::InternedStr;
pub use lot::{FifoConsumption, Lot, LotBook, LotError, LotMatch};

// Re-export commonly used external types
pub use chrono::NaiveDate;
pub use rust_decimal::Decimal;
