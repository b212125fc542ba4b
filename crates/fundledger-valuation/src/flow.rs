//! Flow normalization.
//!
//! A transaction may touch a fund account with several postings and in
//! currencies other than the fund's reporting currency. This module
//! reduces them to a single signed value in the reporting currency:
//! positive for money entering the fund, negative for money leaving it.

use chrono::NaiveDate;
use fundledger_core::{Amount, InternedStr, Posting, PriceAnnotation, Transaction};
use rust_decimal::Decimal;

use crate::ValuationError;

/// The net flow of one transaction through one fund account, expressed
/// in the fund's reporting currency.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetFlow {
    /// Transaction date.
    pub date: NaiveDate,
    /// The fund account.
    pub account: String,
    /// Net signed value in the reporting currency.
    pub amount: Amount,
}

/// Compute the net reporting-currency flow of `txn` through `account`.
///
/// Returns `Ok(None)` when the transaction does not touch the account.
/// When `reporting` is `None` it is discovered from the first fund
/// posting: the quote currency of its price annotation when one is
/// present (an annotated flow states its valuation frame explicitly),
/// otherwise the posting's own currency. The returned amount carries
/// the discovered currency.
///
/// Foreign-currency postings are converted in order of preference: the
/// posting's own price annotation, then a sibling leg exchanging the
/// same currency pair. A posting left unconverted is an error, as are
/// two distinct foreign currencies against the fund in one transaction.
pub fn net_flow(
    txn: &Transaction,
    account: &str,
    reporting: Option<&InternedStr>,
) -> Result<Option<NetFlow>, ValuationError> {
    let fund_postings: Vec<&Posting> = txn
        .postings
        .iter()
        .filter(|p| p.account == account)
        .collect();
    let Some(first_posting) = fund_postings.first() else {
        return Ok(None);
    };

    let reporting = match reporting {
        Some(currency) => currency.clone(),
        None => first_posting.price.as_ref().map_or_else(
            || first_posting.units.currency.clone(),
            |price| price.amount().currency.clone(),
        ),
    };

    let mut foreign: Option<&InternedStr> = None;
    for posting in &fund_postings {
        let currency = &posting.units.currency;
        if *currency == reporting {
            continue;
        }
        match foreign {
            None => foreign = Some(currency),
            Some(seen) if seen == currency => {}
            Some(seen) => {
                return Err(ValuationError::MixedCurrency {
                    date: txn.date,
                    account: account.to_string(),
                    first: seen.to_string(),
                    second: currency.to_string(),
                });
            }
        }
    }

    let mut total = Decimal::ZERO;
    for posting in &fund_postings {
        total += convert(txn, posting, &reporting).ok_or_else(|| {
            ValuationError::UnresolvableConversion {
                date: txn.date,
                account: account.to_string(),
                currency: posting.units.currency.to_string(),
                reporting: reporting.to_string(),
            }
        })?;
    }

    Ok(Some(NetFlow {
        date: txn.date,
        account: account.to_string(),
        amount: Amount::new(total, reporting),
    }))
}

/// Convert one posting's units into the reporting currency.
fn convert(txn: &Transaction, posting: &Posting, reporting: &InternedStr) -> Option<Decimal> {
    if posting.units.currency == *reporting {
        return Some(posting.units.number);
    }
    if let Some(rate) = annotation_rate(posting, reporting) {
        return Some(posting.units.number * rate);
    }
    // A sibling leg exchanging the same currency pair carries the rate.
    for sibling in &txn.postings {
        if sibling.units.currency == posting.units.currency {
            if let Some(rate) = annotation_rate(sibling, reporting) {
                return Some(posting.units.number * rate);
            }
        }
        if sibling.units.currency == *reporting {
            if let Some(rate) = annotation_rate(sibling, &posting.units.currency) {
                if !rate.is_zero() {
                    return Some(posting.units.number / rate);
                }
            }
        }
    }
    None
}

/// Per-unit rate from a posting's price annotation, if it quotes the
/// given currency.
fn annotation_rate(posting: &Posting, quote: &InternedStr) -> Option<Decimal> {
    let price = posting.price.as_ref()?;
    if price.amount().currency != *quote {
        return None;
    }
    match price {
        PriceAnnotation::Unit(amount) => Some(amount.number),
        PriceAnnotation::Total(amount) => {
            let units = posting.units.number.abs();
            if units.is_zero() {
                None
            } else {
                Some(amount.number / units)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const FUND: &str = "Assets:CoolFund:Total";

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, 1).unwrap()
    }

    fn eur() -> InternedStr {
        InternedStr::from("EUR")
    }

    #[test]
    fn test_no_fund_postings() {
        let txn = Transaction::new(date(), "groceries")
            .with_posting(Posting::new("Expenses:Food", Amount::new(dec!(20), "EUR")))
            .with_posting(Posting::new(
                "Assets:Bank:Checking",
                Amount::new(dec!(-20), "EUR"),
            ));

        assert_eq!(net_flow(&txn, FUND, Some(&eur())).unwrap(), None);
    }

    #[test]
    fn test_single_posting_deposit() {
        let txn = Transaction::new(date(), "deposit")
            .with_posting(Posting::new(FUND, Amount::new(dec!(500), "EUR")))
            .with_posting(Posting::new(
                "Assets:Bank:Checking",
                Amount::new(dec!(-500), "EUR"),
            ));

        let flow = net_flow(&txn, FUND, Some(&eur())).unwrap().unwrap();
        assert_eq!(flow.amount, Amount::new(dec!(500), "EUR"));
        assert_eq!(flow.account, FUND);
    }

    #[test]
    fn test_multiple_fund_postings_sum() {
        let txn = Transaction::new(date(), "deposit and fee")
            .with_posting(Posting::new(FUND, Amount::new(dec!(500), "EUR")))
            .with_posting(Posting::new(FUND, Amount::new(dec!(-2.50), "EUR")))
            .with_posting(Posting::new(
                "Assets:Bank:Checking",
                Amount::new(dec!(-497.50), "EUR"),
            ));

        let flow = net_flow(&txn, FUND, Some(&eur())).unwrap().unwrap();
        assert_eq!(flow.amount.number, dec!(497.50));
    }

    #[test]
    fn test_discovers_reporting_currency() {
        let txn = Transaction::new(date(), "deposit")
            .with_posting(Posting::new(FUND, Amount::new(dec!(500), "USD")));

        let flow = net_flow(&txn, FUND, None).unwrap().unwrap();
        assert_eq!(flow.amount.currency, "USD");
    }

    #[test]
    fn test_discovery_prefers_annotation_quote() {
        // An annotated first flow states its valuation frame; the quote
        // currency wins over the posting's own
        let txn = Transaction::new(date(), "usd deposit").with_posting(
            Posting::new(FUND, Amount::new(dec!(550), "USD"))
                .with_price(PriceAnnotation::Unit(Amount::new(dec!(0.9), "EUR"))),
        );

        let flow = net_flow(&txn, FUND, None).unwrap().unwrap();
        assert_eq!(flow.amount, Amount::new(dec!(495.0), "EUR"));
    }

    #[test]
    fn test_unit_annotation_converts() {
        let txn = Transaction::new(date(), "usd deposit").with_posting(
            Posting::new(FUND, Amount::new(dec!(550), "USD"))
                .with_price(PriceAnnotation::Unit(Amount::new(dec!(0.9), "EUR"))),
        );

        let flow = net_flow(&txn, FUND, Some(&eur())).unwrap().unwrap();
        assert_eq!(flow.amount, Amount::new(dec!(495.0), "EUR"));
    }

    #[test]
    fn test_total_annotation_converts() {
        let txn = Transaction::new(date(), "usd deposit").with_posting(
            Posting::new(FUND, Amount::new(dec!(550), "USD"))
                .with_price(PriceAnnotation::Total(Amount::new(dec!(495), "EUR"))),
        );

        let flow = net_flow(&txn, FUND, Some(&eur())).unwrap().unwrap();
        assert_eq!(flow.amount.number, dec!(495));
    }

    #[test]
    fn test_sibling_leg_rate() {
        // The checking leg carries the conversion rate for the pair
        let txn = Transaction::new(date(), "usd deposit")
            .with_posting(Posting::new(FUND, Amount::new(dec!(100), "USD")))
            .with_posting(
                Posting::new("Assets:Bank:Usd", Amount::new(dec!(-100), "USD"))
                    .with_price(PriceAnnotation::Unit(Amount::new(dec!(0.9), "EUR"))),
            );

        let flow = net_flow(&txn, FUND, Some(&eur())).unwrap().unwrap();
        assert_eq!(flow.amount.number, dec!(90.0));
    }

    #[test]
    fn test_sibling_inverse_rate() {
        // A reporting-currency leg priced in the foreign currency
        let txn = Transaction::new(date(), "usd deposit")
            .with_posting(Posting::new(FUND, Amount::new(dec!(100), "USD")))
            .with_posting(
                Posting::new("Assets:Bank:Checking", Amount::new(dec!(-80), "EUR"))
                    .with_price(PriceAnnotation::Unit(Amount::new(dec!(1.25), "USD"))),
            );

        let flow = net_flow(&txn, FUND, Some(&eur())).unwrap().unwrap();
        assert_eq!(flow.amount.number, dec!(80));
    }

    #[test]
    fn test_unresolvable_conversion() {
        let txn = Transaction::new(date(), "usd deposit")
            .with_posting(Posting::new(FUND, Amount::new(dec!(100), "USD")))
            .with_posting(Posting::new(
                "Assets:Bank:Checking",
                Amount::new(dec!(-90), "EUR"),
            ));

        let err = net_flow(&txn, FUND, Some(&eur()));
        assert!(matches!(
            err,
            Err(ValuationError::UnresolvableConversion { currency, .. }) if currency == "USD"
        ));
    }

    #[test]
    fn test_mixed_foreign_currencies() {
        let txn = Transaction::new(date(), "mixed")
            .with_posting(
                Posting::new(FUND, Amount::new(dec!(100), "USD"))
                    .with_price(PriceAnnotation::Unit(Amount::new(dec!(0.9), "EUR"))),
            )
            .with_posting(
                Posting::new(FUND, Amount::new(dec!(100), "GBP"))
                    .with_price(PriceAnnotation::Unit(Amount::new(dec!(1.2), "EUR"))),
            );

        let err = net_flow(&txn, FUND, Some(&eur()));
        assert!(matches!(err, Err(ValuationError::MixedCurrency { .. })));
    }

    #[test]
    fn test_withdrawal_is_negative() {
        let txn = Transaction::new(date(), "withdrawal")
            .with_posting(Posting::new(FUND, Amount::new(dec!(-400), "EUR")))
            .with_posting(Posting::new(
                "Assets:Bank:Checking",
                Amount::new(dec!(400), "EUR"),
            ));

        let flow = net_flow(&txn, FUND, Some(&eur())).unwrap().unwrap();
        assert_eq!(flow.amount.number, dec!(-400));
    }
}
