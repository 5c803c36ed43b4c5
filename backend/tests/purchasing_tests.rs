//! Purchasing and reception tests
//!
//! Covers order lifecycle and reception accounting rules:
//! - Status derivation from cumulative line totals
//! - Over-reception rejection within tolerance
//! - Idempotent purchase entry references per reception

use proptest::prelude::*;
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::str::FromStr;
use uuid::Uuid;

use shared::{
    derive_status, is_fully_received, purchase_reference, OrderStatus, PurchaseOrderLine, EPSILON,
};

// Helper to create Decimal from string
fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

fn line(ingredient: u128, ordered: &str, received: &str) -> PurchaseOrderLine {
    PurchaseOrderLine {
        id: Uuid::new_v4(),
        order_id: Uuid::from_u128(1),
        ingredient_id: Uuid::from_u128(ingredient),
        ordered_quantity: dec(ordered),
        received_quantity: dec(received),
        unit: "kg".to_string(),
    }
}

// ============================================================================
// Unit Tests
// ============================================================================

#[cfg(test)]
mod unit_tests {
    use super::*;

    /// draft -> sent is the only send transition.
    #[test]
    fn test_order_send_transition() {
        assert_eq!(OrderStatus::Draft.send().unwrap(), OrderStatus::Sent);
        for status in [OrderStatus::Sent, OrderStatus::Partial, OrderStatus::Received] {
            assert!(status.send().is_err());
        }
    }

    /// Lines are frozen once the order leaves draft.
    #[test]
    fn test_lines_editable_only_in_draft() {
        assert!(OrderStatus::Draft.allows_line_changes());
        assert!(!OrderStatus::Sent.allows_line_changes());
        assert!(!OrderStatus::Partial.allows_line_changes());
        assert!(!OrderStatus::Received.allows_line_changes());
    }

    /// Goods are accepted while anything is outstanding, and only then.
    #[test]
    fn test_reception_accepted_while_outstanding() {
        assert!(!OrderStatus::Draft.allows_reception());
        assert!(OrderStatus::Sent.allows_reception());
        assert!(OrderStatus::Partial.allows_reception());
        assert!(!OrderStatus::Received.allows_reception());
    }

    /// Status after a reception comes from the lines, not the caller.
    #[test]
    fn test_status_derived_from_lines() {
        assert_eq!(
            derive_status(&[line(1, "10", "10"), line(2, "5", "0")]),
            OrderStatus::Partial
        );
        assert_eq!(
            derive_status(&[line(1, "10", "10"), line(2, "5", "5")]),
            OrderStatus::Received
        );
    }

    /// A delivery within tolerance of the ordered quantity closes the
    /// line.
    #[test]
    fn test_full_reception_within_tolerance() {
        assert!(is_fully_received(dec("10"), dec("10")));
        assert!(is_fully_received(dec("10"), dec("9.9999999999")));
        assert!(!is_fully_received(dec("10"), dec("9.99")));
    }

    /// The over-reception guard: a delivery may not exceed the
    /// outstanding remainder beyond tolerance.
    #[test]
    fn test_over_reception_rejected() {
        let l = line(1, "10", "4");
        let remaining = l.remaining();
        assert_eq!(remaining, dec("6"));

        // At the remainder: accepted.
        assert!(dec("6") <= remaining + EPSILON);
        // Clearly past it: rejected.
        assert!(dec("6.01") > remaining + EPSILON);
    }

    /// A payload repeating an ingredient can pass the per-line remainder
    /// check while jointly overshooting the ordered quantity, so repeated
    /// ingredients are rejected up front.
    #[test]
    fn test_duplicate_reception_lines_rejected() {
        let l = line(1, "10", "0");
        let deliveries = [dec("6"), dec("6")];

        // Each delivery alone fits the remainder.
        for d in &deliveries {
            assert!(*d <= l.remaining() + EPSILON);
        }
        // Together they would breach received <= ordered.
        let total: Decimal = deliveries.iter().copied().sum();
        assert!(total > l.remaining() + EPSILON);

        // The duplicate ingredient is what gives it away.
        let ingredients = [Uuid::from_u128(1), Uuid::from_u128(1)];
        let mut seen = HashSet::new();
        assert!(!ingredients.iter().all(|i| seen.insert(*i)));
    }

    /// Distinct ingredients in one payload are fine.
    #[test]
    fn test_distinct_reception_lines_accepted() {
        let ingredients = [Uuid::from_u128(1), Uuid::from_u128(2), Uuid::from_u128(3)];
        let mut seen = HashSet::new();
        assert!(ingredients.iter().all(|i| seen.insert(*i)));
    }

    /// Defaulting a reception to the outstanding remainders skips lines
    /// that are already covered.
    #[test]
    fn test_default_reception_covers_remainders() {
        let lines = vec![line(1, "10", "10"), line(2, "5", "2"), line(3, "3", "0")];

        let defaults: Vec<(Uuid, Decimal)> = lines
            .iter()
            .filter(|l| l.remaining() > Decimal::ZERO)
            .map(|l| (l.ingredient_id, l.remaining()))
            .collect();

        assert_eq!(defaults.len(), 2);
        assert_eq!(defaults[0], (Uuid::from_u128(2), dec("3")));
        assert_eq!(defaults[1], (Uuid::from_u128(3), dec("3")));
    }

    /// Each reception of an order gets its own accounting reference.
    #[test]
    fn test_reception_references_are_sequential() {
        let order_id = Uuid::from_u128(42);

        let mut booked: HashSet<String> = HashSet::new();
        for expected_seq in 1..=3 {
            let seq = booked.len() as i64 + 1;
            assert_eq!(seq, expected_seq);
            booked.insert(purchase_reference(order_id, seq));
        }

        assert!(booked.contains(&format!("{}:1", order_id)));
        assert!(booked.contains(&format!("{}:3", order_id)));
    }

    /// The purchase pair books the net amount and a flat 20% tax amount,
    /// both as debits.
    #[test]
    fn test_purchase_pair_amounts() {
        let rate = dec("0.20");
        let net = dec("125.50");
        let tax = net * rate;
        assert_eq!(tax, dec("25.1000"));

        // The pair shares one reference and differs only by account.
        let reference = purchase_reference(Uuid::from_u128(7), 1);
        let pair = [("607", net), ("44566", tax)];
        assert_eq!(pair.len(), 2);
        assert!(!reference.is_empty());
    }
}

// ============================================================================
// Property-Based Tests
// ============================================================================

#[cfg(test)]
mod property_tests {
    use super::*;

    fn arb_lines() -> impl Strategy<Value = Vec<PurchaseOrderLine>> {
        prop::collection::vec(
            (1u128..100, 1i64..100, 0i64..100).prop_map(|(ing, ordered, received)| {
                PurchaseOrderLine {
                    id: Uuid::new_v4(),
                    order_id: Uuid::from_u128(1),
                    ingredient_id: Uuid::from_u128(ing),
                    ordered_quantity: Decimal::from(ordered),
                    received_quantity: Decimal::from(received.min(ordered)),
                    unit: "kg".to_string(),
                }
            }),
            1..8,
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// An order is received exactly when every line is covered.
        #[test]
        fn prop_received_iff_all_lines_covered(lines in arb_lines()) {
            let all_covered = lines
                .iter()
                .all(|l| is_fully_received(l.ordered_quantity, l.received_quantity));
            let status = derive_status(&lines);
            prop_assert_eq!(status == OrderStatus::Received, all_covered);
            prop_assert!(matches!(status, OrderStatus::Received | OrderStatus::Partial));
        }

        /// Applying any sequence of receptions that each respect the
        /// current remainder keeps cumulative received within ordered.
        #[test]
        fn prop_valid_receptions_never_exceed_ordered(
            ordered in 1i64..1000,
            fractions in prop::collection::vec(1u32..100, 1..6),
        ) {
            let mut l = line(1, &ordered.to_string(), "0");
            for f in fractions {
                let remaining = l.remaining();
                if remaining <= Decimal::ZERO {
                    break;
                }
                // Receive some fraction of what is still outstanding.
                let qty = remaining * Decimal::from(f) / Decimal::from(100u32);
                if qty <= Decimal::ZERO {
                    break;
                }
                prop_assert!(qty <= l.remaining() + EPSILON);
                l.received_quantity += qty;
            }
            prop_assert!(l.received_quantity <= l.ordered_quantity + EPSILON);
        }

        /// Receiving the full remainder always closes a line.
        #[test]
        fn prop_receiving_remainder_closes_line(ordered in 1i64..1000, received in 0i64..1000) {
            let mut l = line(1, &ordered.to_string(), &received.min(ordered).to_string());
            let remainder = l.remaining();
            l.received_quantity += remainder;
            prop_assert!(is_fully_received(l.ordered_quantity, l.received_quantity));
            prop_assert!(l.remaining() <= EPSILON);
        }

        /// The reference embeds the order id and the sequence, so two
        /// orders or two receptions never collide.
        #[test]
        fn prop_references_unique_per_order_and_sequence(
            a in 1u128..1000,
            b in 1u128..1000,
            seq_a in 1i64..10,
            seq_b in 1i64..10,
        ) {
            let ra = purchase_reference(Uuid::from_u128(a), seq_a);
            let rb = purchase_reference(Uuid::from_u128(b), seq_b);
            prop_assert_eq!(ra == rb, a == b && seq_a == seq_b);
        }
    }
}
