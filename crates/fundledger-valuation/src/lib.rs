//! Opaque-fund valuation engine.
//!
//! Some accounts report their true value only at discrete checkpoints —
//! an investment fund publishing a statement once a month, say. This
//! crate augments a double-entry ledger with support for such "opaque
//! funds": it synthesizes a fictional per-account commodity, prices it
//! from periodic total-value snapshots, converts every deposit and
//! withdrawal into a buy or sell of that commodity using FIFO cost-basis
//! lots, and realizes gains/losses into a configured PnL account.
//!
//! The engine is a pure transform over the shared directive stream: it
//! replays the chronologically sorted input once and produces a new
//! sequence in which fund-account postings are rewritten and synthetic
//! price records are inserted. Non-fund directives pass through
//! verbatim.
//!
//! # Example
//!
//! ```
//! use chrono::NaiveDate;
//! use fundledger_core::{Amount, Directive, FundConfig, Posting, Transaction, Valuation};
//! use fundledger_valuation::{apply, ValuationOptions};
//! use rust_decimal_macros::dec;
//!
//! let date = |m, d| NaiveDate::from_ymd_opt(2024, m, d).unwrap();
//!
//! let directives = vec![
//!     Directive::FundConfig(FundConfig::new(
//!         date(1, 1),
//!         "Assets:CoolFund:Total",
//!         "COOL_FUND_EUR",
//!         "Income:CoolFund:PnL",
//!     )),
//!     Directive::Transaction(
//!         Transaction::new(date(2, 1), "Initial deposit")
//!             .with_posting(Posting::new(
//!                 "Assets:CoolFund:Total",
//!                 Amount::new(dec!(500), "EUR"),
//!             ))
//!             .with_posting(Posting::new(
//!                 "Assets:Bank:Checking",
//!                 Amount::new(dec!(-500), "EUR"),
//!             )),
//!     ),
//!     Directive::Valuation(Valuation::new(
//!         date(2, 10),
//!         "Assets:CoolFund:Total",
//!         Amount::new(dec!(450), "EUR"),
//!     )),
//! ];
//!
//! let output = apply(&directives, &ValuationOptions::default()).unwrap();
//!
//! // The deposit now buys 500 COOL_FUND_EUR at cost, and the snapshot
//! // publishes an implied price of 450 / 500 = 0.9 EUR.
//! assert!(output.iter().any(|d| matches!(
//!     d,
//!     Directive::Price(p) if p.amount.number == dec!(0.9)
//! )));
//! ```
//!
//! # Operational contract
//!
//! The engine must run exactly once over the original, unrewritten
//! stream. Rewritten transactions carry the `valuation-applied` tag so
//! downstream tooling can recognize processed output, but the engine
//! does not itself refuse already-rewritten input.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod engine;
mod flow;
mod registry;

pub use engine::{apply, ValuationOptions, APPLIED_TAG};
pub use flow::{net_flow, NetFlow};
pub use registry::{FundRegistry, RegisteredFund};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

/// Errors surfaced by the valuation engine.
///
/// All are fatal: the domain is financial bookkeeping, where
/// silently-wrong numbers are worse than a hard stop. Each error names
/// the offending directive's date and account.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValuationError {
    /// A fund account was configured twice.
    #[error("{date}: fund account {account} is already configured")]
    DuplicateConfig {
        /// Date of the second configuration directive.
        date: NaiveDate,
        /// The doubly-configured account.
        account: String,
    },

    /// A configuration directive has an empty field.
    #[error("{date}: invalid fund configuration: {reason}")]
    InvalidConfig {
        /// Date of the configuration directive.
        date: NaiveDate,
        /// What was wrong.
        reason: String,
    },

    /// A lot acquisition with zero or negative units.
    #[error("{date}: {account}: acquisition of non-positive units {units}")]
    NonPositiveUnits {
        /// Date of the offending transaction.
        date: NaiveDate,
        /// The fund account.
        account: String,
        /// The offending unit count.
        units: Decimal,
    },

    /// A withdrawal exceeding total held units.
    #[error(
        "{date}: {account}: insufficient lots: requested {requested}, available {available}"
    )]
    InsufficientLots {
        /// Date of the offending transaction.
        date: NaiveDate,
        /// The fund account.
        account: String,
        /// Units the withdrawal needed.
        requested: Decimal,
        /// Units actually held.
        available: Decimal,
    },

    /// A fund posting whose currency cannot be converted into the
    /// reporting currency.
    #[error("{date}: {account}: cannot resolve conversion from {currency} to {reporting}")]
    UnresolvableConversion {
        /// Date of the offending transaction.
        date: NaiveDate,
        /// The fund account.
        account: String,
        /// The posting's currency.
        currency: String,
        /// The fund's reporting currency.
        reporting: String,
    },

    /// One transaction posts two different non-reporting currencies
    /// against the same fund account.
    #[error("{date}: {account}: mixed currencies {first} and {second} against fund account")]
    MixedCurrency {
        /// Date of the offending transaction.
        date: NaiveDate,
        /// The fund account.
        account: String,
        /// First non-reporting currency seen.
        first: String,
        /// Second non-reporting currency seen.
        second: String,
    },

    /// A valuation snapshot that cannot be applied.
    #[error("{date}: {account}: invalid valuation snapshot: {reason}")]
    InvalidSnapshot {
        /// Date of the snapshot.
        date: NaiveDate,
        /// The asserted account.
        account: String,
        /// What was wrong.
        reason: String,
    },

    /// A withdrawal from a fund that has never been priced.
    #[error("{date}: {account}: no price available for withdrawal")]
    NoPriceAvailable {
        /// Date of the offending transaction.
        date: NaiveDate,
        /// The fund account.
        account: String,
    },

    /// A balance assertion against a fund account after activity on it.
    #[error("{date}: {account}: balance assertion after fund activity")]
    LateBalanceAssertion {
        /// Date of the assertion.
        date: NaiveDate,
        /// The fund account.
        account: String,
    },

    /// A fund-account balance assertion that cannot be applied.
    #[error("{date}: {account}: invalid balance assertion: {reason}")]
    InvalidBalanceAssertion {
        /// Date of the assertion.
        date: NaiveDate,
        /// The asserted account.
        account: String,
        /// What was wrong.
        reason: String,
    },
}
