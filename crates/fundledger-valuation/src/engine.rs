//! The replay engine.
//!
//! [`apply`] makes a single chronological pass over the sorted directive
//! stream. Fund configurations register accounts, valuation snapshots
//! become synthetic price records, and every transaction touching a
//! tracked account has its fund postings rewritten into buys or sells of
//! the fund's commodity against FIFO lots. Everything else passes
//! through verbatim.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDate;
use fundledger_core::{
    sort_directives, Amount, Balance, Commodity, Cost, Directive, InternedStr, LotBook, LotError,
    Posting, Price, PriceAnnotation, Transaction, Valuation,
};
use rust_decimal::{Decimal, RoundingStrategy};
use tracing::debug;

use crate::flow::net_flow;
use crate::registry::{FundRegistry, RegisteredFund};
use crate::ValuationError;

/// Tag added to every rewritten transaction.
pub const APPLIED_TAG: &str = "valuation-applied";

/// Tunables for the replay pass.
#[derive(Debug, Clone)]
pub struct ValuationOptions {
    /// Residual below which decimal quantities count as zero.
    pub tolerance: Decimal,
    /// Decimal places kept when deriving synthetic units from a flow.
    /// Deposits round away from zero, withdrawals toward zero, so
    /// rounding never manufactures units the fund does not hold.
    pub unit_precision: u32,
}

impl Default for ValuationOptions {
    fn default() -> Self {
        Self {
            tolerance: Decimal::new(1, 8),
            unit_precision: 7,
        }
    }
}

/// Mutable per-fund replay state.
#[derive(Debug, Clone)]
struct FundState {
    fund: RegisteredFund,
    book: LotBook,
    price: Option<Decimal>,
    reporting: Option<InternedStr>,
    active: bool,
}

impl FundState {
    fn new(fund: RegisteredFund) -> Self {
        Self {
            fund,
            book: LotBook::new(),
            price: None,
            reporting: None,
            active: false,
        }
    }
}

/// Replay the directive stream and rewrite all fund activity.
///
/// The input is sorted chronologically first, so callers may pass
/// directives in file order. The returned stream contains the rewritten
/// transactions, synthetic [`Price`] and [`Commodity`] records, and
/// every untouched directive; valuation snapshots are consumed.
pub fn apply(
    directives: &[Directive],
    options: &ValuationOptions,
) -> Result<Vec<Directive>, ValuationError> {
    let mut input = directives.to_vec();
    sort_directives(&mut input);

    let mut declared: HashSet<String> = input
        .iter()
        .filter_map(|d| match d {
            Directive::Commodity(c) => Some(c.currency.clone()),
            _ => None,
        })
        .collect();

    let mut registry = FundRegistry::new();
    let mut states: HashMap<String, FundState> = HashMap::new();
    let mut output: Vec<Directive> = Vec::with_capacity(input.len());

    for directive in &input {
        match directive {
            Directive::FundConfig(config) => {
                let fund = registry.register(config)?;
                if declared.insert(fund.commodity.clone()) {
                    output.push(Directive::Commodity(Commodity::new(
                        config.date,
                        fund.commodity.clone(),
                    )));
                }
                states.insert(fund.account.clone(), FundState::new(fund));
                output.push(directive.clone());
            }
            Directive::Balance(balance) => match states.get_mut(&balance.account) {
                Some(state) => seed_balance(state, balance, options, &mut output)?,
                None => output.push(directive.clone()),
            },
            Directive::Valuation(valuation) => {
                apply_snapshot(&mut states, valuation, options, &mut output)?;
            }
            Directive::Transaction(txn) => {
                rewrite_transaction(&mut states, txn, options, &mut output)?;
            }
            _ => output.push(directive.clone()),
        }
    }

    sort_directives(&mut output);
    Ok(output)
}

/// Convert a fund-account balance assertion into seeded holdings.
///
/// Only valid before any transaction on the fund: the asserted value is
/// re-expressed as synthetic units at the current price (1.0 for a
/// still-unpriced fund), and the assertion itself is rewritten to
/// assert the units.
fn seed_balance(
    state: &mut FundState,
    balance: &Balance,
    options: &ValuationOptions,
    output: &mut Vec<Directive>,
) -> Result<(), ValuationError> {
    if state.active {
        return Err(ValuationError::LateBalanceAssertion {
            date: balance.date,
            account: balance.account.clone(),
        });
    }
    let value = balance.amount.number;
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValuationError::InvalidBalanceAssertion {
            date: balance.date,
            account: balance.account.clone(),
            reason: format!("negative asserted value {value}"),
        });
    }
    let reporting = balance.amount.currency.clone();
    if let Some(existing) = &state.reporting {
        if *existing != reporting {
            return Err(ValuationError::UnresolvableConversion {
                date: balance.date,
                account: balance.account.clone(),
                currency: reporting.to_string(),
                reporting: existing.to_string(),
            });
        }
    }
    let price = match state.price {
        Some(price) if price > options.tolerance => price,
        Some(_) => {
            return Err(ValuationError::NoPriceAvailable {
                date: balance.date,
                account: balance.account.clone(),
            });
        }
        None => {
            state.price = Some(Decimal::ONE);
            output.push(Directive::Price(Price::new(
                balance.date,
                state.fund.commodity.clone(),
                Amount::new(Decimal::ONE, reporting.clone()),
            )));
            Decimal::ONE
        }
    };
    let units = (value / price)
        .round_dp_with_strategy(options.unit_precision, RoundingStrategy::AwayFromZero);
    if !units.is_zero() {
        state
            .book
            .acquire(balance.date, units, price)
            .map_err(|e| lot_error(e, balance.date, &balance.account))?;
    }
    state.reporting = Some(reporting);
    state.active = true;
    debug!(
        account = %balance.account,
        units = %units,
        price = %price,
        "seeded holdings from balance assertion"
    );

    let mut rewritten = Balance::new(
        balance.date,
        balance.account.clone(),
        Amount::new(units, state.fund.commodity.as_str()),
    );
    rewritten.meta = balance.meta.clone();
    output.push(Directive::Balance(rewritten));
    Ok(())
}

/// Turn a valuation snapshot into an implied unit price.
fn apply_snapshot(
    states: &mut HashMap<String, FundState>,
    valuation: &Valuation,
    options: &ValuationOptions,
    output: &mut Vec<Directive>,
) -> Result<(), ValuationError> {
    let invalid = |reason: String| ValuationError::InvalidSnapshot {
        date: valuation.date,
        account: valuation.account.clone(),
        reason,
    };
    let Some(state) = states.get_mut(&valuation.account) else {
        return Err(invalid("account is not a configured fund".to_string()));
    };
    let value = &valuation.amount;
    if value.number.is_sign_negative() && !value.number.is_zero() {
        return Err(invalid(format!("negative total value {}", value.number)));
    }
    if let Some(reporting) = &state.reporting {
        if *reporting != value.currency {
            return Err(invalid(format!(
                "snapshot currency {} does not match reporting currency {reporting}",
                value.currency
            )));
        }
    } else {
        state.reporting = Some(value.currency.clone());
    }

    let units = state.book.total_units();
    let price = if units.abs() <= options.tolerance {
        if state.price.is_some() || value.number <= options.tolerance {
            // Nothing held; the last known price (if any) stays current.
            debug!(
                account = %valuation.account,
                "snapshot on empty holdings, no price derived"
            );
            return Ok(());
        }
        value.number
    } else {
        value.number / units
    };
    state.price = Some(price);
    debug!(
        account = %valuation.account,
        price = %price,
        units = %units,
        "derived implied price"
    );
    output.push(Directive::Price(Price::new(
        valuation.date,
        state.fund.commodity.clone(),
        Amount::new(price, value.currency.clone()),
    )));
    Ok(())
}

/// Rewrite a transaction's fund postings, if it touches any fund.
fn rewrite_transaction(
    states: &mut HashMap<String, FundState>,
    txn: &Transaction,
    options: &ValuationOptions,
    output: &mut Vec<Directive>,
) -> Result<(), ValuationError> {
    let mut accounts: Vec<String> = Vec::new();
    for posting in &txn.postings {
        if states.contains_key(&posting.account) && !accounts.contains(&posting.account) {
            accounts.push(posting.account.clone());
        }
    }

    let mut replacements: Vec<(String, Option<Vec<Posting>>)> = Vec::new();
    for account in accounts {
        let Some(state) = states.get_mut(&account) else {
            continue;
        };
        let Some(flow) = net_flow(txn, &account, state.reporting.as_ref())? else {
            continue;
        };
        if flow.amount.number.abs() <= options.tolerance {
            // Postings netting to nothing stay as written.
            continue;
        }
        state
            .reporting
            .get_or_insert_with(|| flow.amount.currency.clone());
        state.active = true;

        let mut postings = if flow.amount.number > Decimal::ZERO {
            record_deposit(state, txn.date, &flow.amount, options, output)?
        } else {
            record_withdrawal(state, txn.date, &flow.amount, options)?
        };
        for posting in txn.postings.iter().filter(|p| p.account == account) {
            postings.extend(conversion_pair(posting, &flow.amount.currency));
        }
        replacements.push((account, Some(postings)));
    }

    if replacements.is_empty() {
        output.push(Directive::Transaction(txn.clone()));
        return Ok(());
    }

    let mut rewritten = txn.clone();
    rewritten.postings = Vec::with_capacity(txn.postings.len());
    for posting in &txn.postings {
        match replacements.iter_mut().find(|(a, _)| *a == posting.account) {
            Some((_, slot)) => {
                // Replacement lands at the first fund posting; any
                // further postings of that account are absorbed by it.
                if let Some(new_postings) = slot.take() {
                    rewritten.postings.extend(new_postings);
                }
            }
            None => rewritten.postings.push(posting.clone()),
        }
    }
    if !rewritten.tags.iter().any(|t| t == APPLIED_TAG) {
        rewritten.tags.push(APPLIED_TAG.to_string());
    }
    output.push(Directive::Transaction(rewritten));
    Ok(())
}

/// Restate an annotated fund posting's currency exchange.
///
/// The commodity posting carries a cost, and a cost and a price cannot
/// express two currencies on one posting, so the exchange survives as a
/// separate pair on the fund account: the original units quoted at the
/// annotation, plus their negation. The pair is oriented so that,
/// combined with the commodity posting's reporting-currency weight, the
/// group weighs in at the cash side of the exchange, keeping the
/// transaction balanced against the untouched counterparty legs.
fn conversion_pair(posting: &Posting, reporting: &InternedStr) -> Vec<Posting> {
    let Some(annotation) = &posting.price else {
        return Vec::new();
    };
    let (quoted, plain) = if posting.units.currency == *reporting {
        (posting.units.clone(), -&posting.units)
    } else {
        (-&posting.units, posting.units.clone())
    };
    let mut quoted = Posting::new(posting.account.clone(), quoted).with_price(annotation.clone());
    let mut plain = Posting::new(posting.account.clone(), plain);
    quoted.flag = posting.flag;
    quoted.meta = posting.meta.clone();
    plain.flag = posting.flag;
    plain.meta = posting.meta.clone();
    vec![quoted, plain]
}

/// Book a deposit: buy synthetic units at the current price.
fn record_deposit(
    state: &mut FundState,
    date: NaiveDate,
    flow: &Amount,
    options: &ValuationOptions,
    output: &mut Vec<Directive>,
) -> Result<Vec<Posting>, ValuationError> {
    let price = match state.price {
        Some(price) => price,
        None => {
            // First flow into an unpriced fund establishes 1.0.
            state.price = Some(Decimal::ONE);
            output.push(Directive::Price(Price::new(
                date,
                state.fund.commodity.clone(),
                Amount::new(Decimal::ONE, flow.currency.clone()),
            )));
            Decimal::ONE
        }
    };
    if price <= options.tolerance {
        return Err(ValuationError::NoPriceAvailable {
            date,
            account: state.fund.account.clone(),
        });
    }
    let units = (flow.number / price)
        .round_dp_with_strategy(options.unit_precision, RoundingStrategy::AwayFromZero);
    state
        .book
        .acquire(date, units, price)
        .map_err(|e| lot_error(e, date, &state.fund.account))?;
    debug!(
        account = %state.fund.account,
        units = %units,
        price = %price,
        "recorded deposit"
    );
    Ok(vec![Posting::new(
        state.fund.account.clone(),
        Amount::new(units, state.fund.commodity.as_str()),
    )
    .with_cost(Cost::new(price, flow.currency.clone()).with_date(date))])
}

/// Book a withdrawal: sell synthetic units FIFO and realize the PnL.
fn record_withdrawal(
    state: &mut FundState,
    date: NaiveDate,
    flow: &Amount,
    options: &ValuationOptions,
) -> Result<Vec<Posting>, ValuationError> {
    let account = state.fund.account.clone();
    let price = match state.price {
        Some(price) if price > options.tolerance => price,
        _ => {
            return Err(ValuationError::NoPriceAvailable { date, account });
        }
    };
    let proceeds = flow.number.abs();
    let units =
        (proceeds / price).round_dp_with_strategy(options.unit_precision, RoundingStrategy::ToZero);
    let consumption = state
        .book
        .consume_fifo(units, options.tolerance)
        .map_err(|e| lot_error(e, date, &account))?;

    let mut postings: Vec<Posting> = consumption
        .matches
        .iter()
        .map(|m| {
            Posting::new(
                account.clone(),
                Amount::new(-m.units, state.fund.commodity.as_str()),
            )
            .with_cost(Cost::new(m.cost_per_unit, flow.currency.clone()).with_date(m.date))
            .with_price(PriceAnnotation::Unit(Amount::new(
                price,
                flow.currency.clone(),
            )))
        })
        .collect();

    // Disposal postings weigh in at cost, so the realized gain or loss
    // is exactly what balances the transaction.
    let pnl = consumption.cost_basis - proceeds;
    if pnl.abs() > options.tolerance {
        postings.push(Posting::new(
            state.fund.pnl_account.clone(),
            Amount::new(pnl, flow.currency.clone()),
        ));
    }
    debug!(
        account = %account,
        units = %units,
        price = %price,
        pnl = %pnl,
        "recorded withdrawal"
    );
    Ok(postings)
}

fn lot_error(err: LotError, date: NaiveDate, account: &str) -> ValuationError {
    match err {
        LotError::NonPositiveUnits { units } => ValuationError::NonPositiveUnits {
            date,
            account: account.to_string(),
            units,
        },
        LotError::NegativeCost { cost } => ValuationError::InvalidSnapshot {
            date,
            account: account.to_string(),
            reason: format!("negative unit price {cost}"),
        },
        LotError::InsufficientUnits {
            requested,
            available,
        } => ValuationError::InsufficientLots {
            date,
            account: account.to_string(),
            requested,
            available,
        },
    }
}
