//! Fund registry.
//!
//! Configuration directives are validated and collected here before any
//! fund activity is replayed. Each tracked account appears exactly once.

use std::collections::HashMap;

use chrono::NaiveDate;
use fundledger_core::FundConfig;
use tracing::debug;

use crate::ValuationError;

/// A validated fund configuration held by the registry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredFund {
    /// Date the fund was configured.
    pub date: NaiveDate,
    /// The tracked fund account.
    pub account: String,
    /// Synthetic commodity expressing ownership of the fund.
    pub commodity: String,
    /// Account receiving realized gains and losses.
    pub pnl_account: String,
}

/// Registry of configured opaque funds, keyed by account.
#[derive(Debug, Clone, Default)]
pub struct FundRegistry {
    funds: HashMap<String, RegisteredFund>,
}

impl FundRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate a configuration directive and register the fund.
    ///
    /// Returns the registered entry, or an error if a field is empty or
    /// the account is already registered.
    pub fn register(&mut self, config: &FundConfig) -> Result<RegisteredFund, ValuationError> {
        let invalid = |reason: &str| ValuationError::InvalidConfig {
            date: config.date,
            reason: reason.to_string(),
        };
        if config.account.is_empty() {
            return Err(invalid("empty fund account"));
        }
        if config.commodity.is_empty() {
            return Err(invalid("empty commodity"));
        }
        if config.pnl_account.is_empty() {
            return Err(invalid("empty pnl account"));
        }
        if self.funds.contains_key(&config.account) {
            return Err(ValuationError::DuplicateConfig {
                date: config.date,
                account: config.account.clone(),
            });
        }

        let fund = RegisteredFund {
            date: config.date,
            account: config.account.clone(),
            commodity: config.commodity.clone(),
            pnl_account: config.pnl_account.clone(),
        };
        debug!(
            account = %fund.account,
            commodity = %fund.commodity,
            pnl = %fund.pnl_account,
            "registered fund"
        );
        self.funds.insert(fund.account.clone(), fund.clone());
        Ok(fund)
    }

    /// Look up the fund registered for an account.
    #[must_use]
    pub fn get(&self, account: &str) -> Option<&RegisteredFund> {
        self.funds.get(account)
    }

    /// Check whether an account is a tracked fund.
    #[must_use]
    pub fn contains(&self, account: &str) -> bool {
        self.funds.contains_key(account)
    }

    /// Number of registered funds.
    #[must_use]
    pub fn len(&self) -> usize {
        self.funds.len()
    }

    /// Check whether the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.funds.is_empty()
    }

    /// Iterate over all registered funds, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &RegisteredFund> {
        self.funds.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(account: &str, commodity: &str, pnl: &str) -> FundConfig {
        FundConfig::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            account,
            commodity,
            pnl,
        )
    }

    #[test]
    fn test_register_and_lookup() {
        let mut registry = FundRegistry::new();
        let fund = registry
            .register(&config(
                "Assets:CoolFund:Total",
                "COOL_FUND_EUR",
                "Income:CoolFund:PnL",
            ))
            .unwrap();

        assert_eq!(fund.commodity, "COOL_FUND_EUR");
        assert!(registry.contains("Assets:CoolFund:Total"));
        assert!(!registry.contains("Assets:Other"));
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.get("Assets:CoolFund:Total").unwrap().pnl_account,
            "Income:CoolFund:PnL"
        );
    }

    #[test]
    fn test_duplicate_account_rejected() {
        let mut registry = FundRegistry::new();
        registry
            .register(&config("Assets:Fund", "FUND_EUR", "Income:Fund:PnL"))
            .unwrap();

        let err = registry.register(&config("Assets:Fund", "OTHER", "Income:Other"));
        assert!(matches!(
            err,
            Err(ValuationError::DuplicateConfig { account, .. }) if account == "Assets:Fund"
        ));
        // First registration survives
        assert_eq!(registry.get("Assets:Fund").unwrap().commodity, "FUND_EUR");
    }

    #[test]
    fn test_empty_fields_rejected() {
        let mut registry = FundRegistry::new();

        for cfg in [
            config("", "FUND_EUR", "Income:Fund:PnL"),
            config("Assets:Fund", "", "Income:Fund:PnL"),
            config("Assets:Fund", "FUND_EUR", ""),
        ] {
            let err = registry.register(&cfg);
            assert!(matches!(err, Err(ValuationError::InvalidConfig { .. })));
        }
        assert!(registry.is_empty());
    }
}
