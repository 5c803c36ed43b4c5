//! FEFO allocation tests
//!
//! Covers allocation planning including:
//! - Soonest-expiry-first ordering with undated lots last
//! - All-or-nothing behavior on insufficient stock
//! - Deterministic plans for identical inputs

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use shared::{plan_fefo, sort_fefo, AllocationError, CandidateLot, EPSILON};

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn lot(id: u128, expiry: Option<&str>, balance: &str) -> CandidateLot {
    CandidateLot {
        lot_id: Uuid::from_u128(id),
        expiry_date: expiry.map(|d| chrono::NaiveDate::from_str(d).unwrap()),
        balance: dec(balance),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Two dated lots: the soonest expiry drains first, the next lot
    /// covers the rest.
    #[test]
    fn test_allocation_spans_lots_in_expiry_order() {
        let candidates = vec![
            lot(1, Some("2025-03-01"), "4"),
            lot(2, Some("2025-02-01"), "3"),
        ];

        let plan = plan_fefo(&candidates, dec("5"), "kg").unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan[0].lot_id, Uuid::from_u128(2));
        assert_eq!(plan[0].quantity, dec("3"));
        assert_eq!(plan[1].lot_id, Uuid::from_u128(1));
        assert_eq!(plan[1].quantity, dec("2"));
    }

    /// An undated lot is only touched once every dated lot is empty.
    #[test]
    fn test_undated_lot_consumed_last() {
        let candidates = vec![
            lot(1, None, "100"),
            lot(2, Some("2025-02-01"), "1"),
            lot(3, Some("2025-01-15"), "1"),
        ];

        let plan = plan_fefo(&candidates, dec("2.5"), "kg").unwrap();
        assert_eq!(plan.len(), 3);
        assert_eq!(plan[0].lot_id, Uuid::from_u128(3));
        assert_eq!(plan[1].lot_id, Uuid::from_u128(2));
        assert_eq!(plan[2].lot_id, Uuid::from_u128(1));
        assert_eq!(plan[2].quantity, dec("0.5"));
    }

    /// A shortfall fails the whole plan and reports what was available.
    #[test]
    fn test_shortfall_fails_whole_plan() {
        let candidates = vec![
            lot(1, Some("2025-02-01"), "2"),
            lot(2, Some("2025-03-01"), "1.5"),
        ];

        let err = plan_fefo(&candidates, dec("5"), "kg").unwrap_err();
        assert_eq!(
            err,
            AllocationError::InsufficientStock {
                requested: dec("5"),
                available: dec("3.5"),
            }
        );
    }

    /// Drained and negative lots never appear in a plan.
    #[test]
    fn test_non_positive_balances_ignored() {
        let candidates = vec![
            lot(1, Some("2025-01-01"), "0"),
            lot(2, Some("2025-01-02"), "-3"),
            lot(3, Some("2025-01-03"), "2"),
        ];

        let plan = plan_fefo(&candidates, dec("2"), "kg").unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].lot_id, Uuid::from_u128(3));

        // Negative balances also never count as available stock.
        let err = plan_fefo(&candidates, dec("3"), "kg").unwrap_err();
        assert_eq!(
            err,
            AllocationError::InsufficientStock {
                requested: dec("3"),
                available: dec("2"),
            }
        );
    }

    /// Equal expiry dates fall back to lot id so the order stays total.
    #[test]
    fn test_equal_expiry_breaks_ties_by_lot_id() {
        let mut candidates = vec![
            lot(9, Some("2025-02-01"), "5"),
            lot(1, Some("2025-02-01"), "5"),
        ];
        sort_fefo(&mut candidates);
        assert_eq!(candidates[0].lot_id, Uuid::from_u128(1));
        assert_eq!(candidates[1].lot_id, Uuid::from_u128(9));
    }

    /// A request within tolerance of the available total still succeeds.
    #[test]
    fn test_tolerance_on_exact_coverage() {
        let candidates = vec![lot(1, Some("2025-02-01"), "2")];
        let plan = plan_fefo(&candidates, dec("2"), "kg").unwrap();
        assert_eq!(plan.len(), 1);
        assert_eq!(plan[0].quantity, dec("2"));
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn arb_candidates() -> impl Strategy<Value = Vec<CandidateLot>> {
        prop::collection::vec(
            (1u128..1000, prop::option::of(0i64..365), 0i64..1000).prop_map(
                |(id, expiry_offset, balance)| CandidateLot {
                    lot_id: Uuid::from_u128(id),
                    expiry_date: expiry_offset.map(|d| {
                        chrono::NaiveDate::from_ymd_opt(2025, 1, 1).unwrap()
                            + chrono::Duration::days(d)
                    }),
                    balance: Decimal::from(balance),
                },
            ),
            0..8,
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// A successful plan covers exactly the requested quantity.
        #[test]
        fn prop_plan_totals_match_request(
            candidates in arb_candidates(),
            requested in 1i64..2000,
        ) {
            let requested = Decimal::from(requested);
            if let Ok(plan) = plan_fefo(&candidates, requested, "kg") {
                let total: Decimal = plan.iter().map(|a| a.quantity).sum();
                prop_assert!((total - requested).abs() <= EPSILON);
            }
        }

        /// No allocation ever exceeds its lot's balance.
        #[test]
        fn prop_allocations_bounded_by_balance(
            candidates in arb_candidates(),
            requested in 1i64..2000,
        ) {
            if let Ok(plan) = plan_fefo(&candidates, Decimal::from(requested), "kg") {
                for alloc in &plan {
                    let balance = candidates
                        .iter()
                        .find(|c| c.lot_id == alloc.lot_id)
                        .map(|c| c.balance)
                        .unwrap();
                    prop_assert!(alloc.quantity <= balance);
                    prop_assert!(alloc.quantity > Decimal::ZERO);
                }
            }
        }

        /// The plan succeeds exactly when positive balances cover the
        /// request; nothing is allocated on failure.
        #[test]
        fn prop_success_iff_covered(
            candidates in arb_candidates(),
            requested in 1i64..2000,
        ) {
            let requested = Decimal::from(requested);
            let available: Decimal = candidates
                .iter()
                .filter(|c| c.balance > Decimal::ZERO)
                .map(|c| c.balance)
                .sum();

            match plan_fefo(&candidates, requested, "kg") {
                Ok(_) => prop_assert!(available >= requested - EPSILON),
                Err(AllocationError::InsufficientStock { available: reported, .. }) => {
                    prop_assert!(available < requested - EPSILON);
                    prop_assert_eq!(reported, available);
                }
                Err(other) => prop_assert!(false, "unexpected error: {:?}", other),
            }
        }

        /// Planning is deterministic: the same input yields the same plan.
        #[test]
        fn prop_plan_is_deterministic(
            candidates in arb_candidates(),
            requested in 1i64..2000,
        ) {
            let a = plan_fefo(&candidates, Decimal::from(requested), "kg");
            let b = plan_fefo(&candidates, Decimal::from(requested), "kg");
            prop_assert_eq!(a, b);
        }

        /// Allocations come out in FEFO order: dated before undated,
        /// dates ascending.
        #[test]
        fn prop_plan_respects_fefo_order(
            candidates in arb_candidates(),
            requested in 1i64..2000,
        ) {
            if let Ok(plan) = plan_fefo(&candidates, Decimal::from(requested), "kg") {
                for pair in plan.windows(2) {
                    match (pair[0].expiry_date, pair[1].expiry_date) {
                        (Some(x), Some(y)) => prop_assert!(x <= y),
                        (None, Some(_)) => prop_assert!(false, "undated lot before dated"),
                        _ => {}
                    }
                }
            }
        }
    }
}
