//! Property-based tests for the FIFO lot book.
//!
//! These tests verify the lot-accounting invariants hold for arbitrary
//! acquisition/consumption sequences using proptest.

use chrono::NaiveDate;
use proptest::prelude::*;
use rust_decimal::Decimal;
use fundledger_core::{LotBook, LotError};

const TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 8); // 1e-8

// ============================================================================
// Arbitrary generators
// ============================================================================

fn arb_units() -> impl Strategy<Value = Decimal> {
    (1i64..1_000_000i64).prop_map(|n| Decimal::new(n, 2))
}

fn arb_cost() -> impl Strategy<Value = Decimal> {
    (1i64..100_000i64).prop_map(|n| Decimal::new(n, 4))
}

fn arb_acquisitions() -> impl Strategy<Value = Vec<(Decimal, Decimal)>> {
    prop::collection::vec((arb_units(), arb_cost()), 1..10)
}

fn day(offset: usize) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 1, 1).unwrap() + chrono::Days::new(offset as u64)
}

fn book_from(acquisitions: &[(Decimal, Decimal)]) -> LotBook {
    let mut book = LotBook::new();
    for (i, (units, cost)) in acquisitions.iter().enumerate() {
        book.acquire(day(i), *units, *cost).unwrap();
    }
    book
}

// ============================================================================
// Conservation and FIFO properties
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(256))]

    /// Acquiring adds exactly the acquired units to the total.
    #[test]
    fn prop_acquire_conserves_units(acquisitions in arb_acquisitions()) {
        let book = book_from(&acquisitions);
        let expected: Decimal = acquisitions.iter().map(|(u, _)| *u).sum();
        prop_assert_eq!(book.total_units(), expected);
    }

    /// Consuming removes exactly the consumed units from the total,
    /// and the matches account for every consumed unit.
    #[test]
    fn prop_consume_conserves_units(
        acquisitions in arb_acquisitions(),
        fraction in 1u32..100u32,
    ) {
        let mut book = book_from(&acquisitions);
        let total = book.total_units();
        let request = total * Decimal::new(i64::from(fraction), 2);

        let before = book.total_units();
        let result = book.consume_fifo(request, TOLERANCE).unwrap();

        let consumed: Decimal = result.matches.iter().map(|m| m.units).sum();
        prop_assert_eq!(consumed, request);
        prop_assert_eq!(book.total_units(), before - request);
        prop_assert!(book.total_units() >= Decimal::ZERO);
    }

    /// Matches come out oldest-first, and a lot is only touched once
    /// every older lot is fully drained.
    #[test]
    fn prop_consume_is_fifo(
        acquisitions in arb_acquisitions(),
        fraction in 1u32..100u32,
    ) {
        let mut book = book_from(&acquisitions);
        let request = book.total_units() * Decimal::new(i64::from(fraction), 2);

        let result = book.consume_fifo(request, TOLERANCE).unwrap();

        // Dates are non-decreasing across matches
        for pair in result.matches.windows(2) {
            prop_assert!(pair[0].date <= pair[1].date);
        }
        // Every match except the last drains its lot completely
        for (i, m) in result.matches.iter().enumerate() {
            if i + 1 < result.matches.len() {
                let (orig_units, _) = acquisitions[i];
                prop_assert_eq!(m.units, orig_units);
            }
        }
    }

    /// Cost basis removed equals the sum of units × cost over matches.
    #[test]
    fn prop_cost_basis_matches_lots(
        acquisitions in arb_acquisitions(),
        fraction in 1u32..100u32,
    ) {
        let mut book = book_from(&acquisitions);
        let request = book.total_units() * Decimal::new(i64::from(fraction), 2);

        let result = book.consume_fifo(request, TOLERANCE).unwrap();

        let expected: Decimal = result
            .matches
            .iter()
            .map(|m| m.units * m.cost_per_unit)
            .sum();
        prop_assert_eq!(result.cost_basis, expected);
    }

    /// Consuming everything leaves an empty book.
    #[test]
    fn prop_full_consumption_drains_book(acquisitions in arb_acquisitions()) {
        let mut book = book_from(&acquisitions);
        let total = book.total_units();

        book.consume_fifo(total, TOLERANCE).unwrap();

        prop_assert!(book.is_empty());
        prop_assert!(book.is_drained(TOLERANCE));
    }

    /// Over-consumption is an error and leaves the book untouched.
    #[test]
    fn prop_over_consumption_rejected(
        acquisitions in arb_acquisitions(),
        excess in 1i64..1000i64,
    ) {
        let mut book = book_from(&acquisitions);
        let total = book.total_units();
        let request = total + Decimal::new(excess, 0);

        let err = book.consume_fifo(request, TOLERANCE);

        prop_assert!(
            matches!(err, Err(LotError::InsufficientUnits { .. })),
            "expected LotError::InsufficientUnits, got {:?}",
            err
        );
        prop_assert_eq!(book.total_units(), total);
    }
}
