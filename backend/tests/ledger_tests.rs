//! Stock ledger tests
//!
//! Covers the derived-balance rules:
//! - Fixed sign per movement kind
//! - Balance as the signed sum of an append-only log
//! - Corrections as compensating movements, never edits

use chrono::Utc;
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;
use uuid::Uuid;

use shared::{derive_balance, MovementKind, StockMovement};

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn movement(kind: MovementKind, quantity: Decimal) -> StockMovement {
    StockMovement {
        id: Uuid::new_v4(),
        kind,
        site_id: Uuid::from_u128(1),
        ingredient_id: Uuid::from_u128(2),
        lot_id: None,
        quantity,
        unit: "kg".to_string(),
        external_reference: None,
        comment: None,
        created_at: Utc::now(),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// Every kind has a fixed direction.
    #[test]
    fn test_kind_signs_are_fixed() {
        for (kind, sign) in [
            (MovementKind::Reception, 1),
            (MovementKind::Adjustment, 1),
            (MovementKind::TransferIn, 1),
            (MovementKind::InventoryCount, 1),
            (MovementKind::Consumption, -1),
            (MovementKind::Loss, -1),
            (MovementKind::TransferOut, -1),
        ] {
            assert_eq!(kind.sign(), sign, "{:?}", kind);
        }
    }

    /// A receive/consume/lose sequence lands on the expected balance.
    #[test]
    fn test_balance_from_movement_sequence() {
        let log = vec![
            movement(MovementKind::Reception, dec("10")),
            movement(MovementKind::Consumption, dec("3.5")),
            movement(MovementKind::Loss, dec("0.5")),
            movement(MovementKind::Reception, dec("2")),
        ];
        assert_eq!(derive_balance(&log), dec("8"));
    }

    /// A mistaken loss is corrected with an adjustment, not an edit;
    /// the log keeps both facts and the balance comes back.
    #[test]
    fn test_correction_is_a_compensating_movement() {
        let log = vec![
            movement(MovementKind::Reception, dec("10")),
            movement(MovementKind::Loss, dec("2")),
            movement(MovementKind::Adjustment, dec("2")),
        ];
        assert_eq!(derive_balance(&log), dec("10"));
        assert_eq!(log.len(), 3);
    }

    /// Transfers are symmetric: the out and in legs cancel across sites.
    #[test]
    fn test_transfer_legs_cancel() {
        let out = movement(MovementKind::TransferOut, dec("4"));
        let inn = movement(MovementKind::TransferIn, dec("4"));
        assert_eq!(out.signed_quantity() + inn.signed_quantity(), Decimal::ZERO);
    }

    /// An empty log has a zero balance.
    #[test]
    fn test_empty_log_balance_is_zero() {
        assert_eq!(derive_balance(&[]), Decimal::ZERO);
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn arb_kind() -> impl Strategy<Value = MovementKind> {
        prop_oneof![
            Just(MovementKind::Reception),
            Just(MovementKind::Consumption),
            Just(MovementKind::Loss),
            Just(MovementKind::Adjustment),
            Just(MovementKind::TransferOut),
            Just(MovementKind::TransferIn),
            Just(MovementKind::InventoryCount),
        ]
    }

    fn arb_log() -> impl Strategy<Value = Vec<StockMovement>> {
        prop::collection::vec(
            (arb_kind(), 1i64..1000)
                .prop_map(|(kind, qty)| movement(kind, Decimal::from(qty))),
            0..20,
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// The balance equals the sum of signed quantities, whatever the
        /// mix of kinds.
        #[test]
        fn prop_balance_is_signed_sum(log in arb_log()) {
            let expected: Decimal = log.iter().map(|m| m.signed_quantity()).sum();
            prop_assert_eq!(derive_balance(&log), expected);
        }

        /// Appending a movement shifts the balance by exactly its signed
        /// quantity; earlier movements are untouched.
        #[test]
        fn prop_append_shifts_balance(log in arb_log(), kind in arb_kind(), qty in 1i64..1000) {
            let before = derive_balance(&log);
            let mut extended = log.clone();
            extended.push(movement(kind, Decimal::from(qty)));
            let after = derive_balance(&extended);
            prop_assert_eq!(after - before, kind.signed(Decimal::from(qty)));
        }

        /// The balance is order-independent: summing a log is summing a
        /// set of signed facts.
        #[test]
        fn prop_balance_order_independent(log in arb_log()) {
            let mut reversed = log.clone();
            reversed.reverse();
            prop_assert_eq!(derive_balance(&log), derive_balance(&reversed));
        }

        /// Movement quantities are magnitudes; the kind alone decides the
        /// direction of the signed contribution.
        #[test]
        fn prop_signed_magnitude_matches(kind in arb_kind(), qty in 1i64..1000) {
            let qty = Decimal::from(qty);
            let signed = kind.signed(qty);
            prop_assert_eq!(signed.abs(), qty);
            prop_assert_eq!(signed > Decimal::ZERO, kind.sign() > 0);
        }
    }
}
