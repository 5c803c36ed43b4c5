//! Purchase order models and status rules
//!
//! Orders move through `draft -> sent -> {partial <-> ... -> received}`.
//! Status is never set directly by callers: after a reception it is derived
//! from the order's lines. A mis-entered order is corrected with a new
//! order, never mutated into a different supplier or line set.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::validation::is_fully_received;

/// Lifecycle status of a purchase order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Draft,
    Sent,
    Partial,
    Received,
}

impl OrderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Draft => "draft",
            OrderStatus::Sent => "sent",
            OrderStatus::Partial => "partial",
            OrderStatus::Received => "received",
        }
    }

    /// Lines may only be edited before the order is sent.
    pub fn allows_line_changes(&self) -> bool {
        matches!(self, OrderStatus::Draft)
    }

    /// Receptions are accepted while goods are still outstanding.
    pub fn allows_reception(&self) -> bool {
        matches!(self, OrderStatus::Sent | OrderStatus::Partial)
    }

    /// The `draft -> sent` transition.
    pub fn send(&self) -> Result<OrderStatus, &'static str> {
        match self {
            OrderStatus::Draft => Ok(OrderStatus::Sent),
            _ => Err("Only draft orders can be sent"),
        }
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(OrderStatus::Draft),
            "sent" => Ok(OrderStatus::Sent),
            "partial" => Ok(OrderStatus::Partial),
            "received" => Ok(OrderStatus::Received),
            other => Err(format!("Unknown order status: {}", other)),
        }
    }
}

/// Recompute an order's status from its lines after a reception.
///
/// `received` when every line is covered within tolerance, else `partial`.
pub fn derive_status(lines: &[PurchaseOrderLine]) -> OrderStatus {
    let all_covered = lines
        .iter()
        .all(|l| is_fully_received(l.ordered_quantity, l.received_quantity));
    if all_covered {
        OrderStatus::Received
    } else {
        OrderStatus::Partial
    }
}

/// A supplier purchase order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseOrder {
    pub id: Uuid,
    pub supplier_id: Uuid,
    pub order_date: DateTime<Utc>,
    pub status: OrderStatus,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// One ordered ingredient on a purchase order.
///
/// `received_quantity` is a cumulative total; it only ever grows, and never
/// past `ordered_quantity` (within tolerance).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PurchaseOrderLine {
    pub id: Uuid,
    pub order_id: Uuid,
    pub ingredient_id: Uuid,
    pub ordered_quantity: Decimal,
    pub received_quantity: Decimal,
    pub unit: String,
}

impl PurchaseOrderLine {
    /// Outstanding quantity still expected from the supplier.
    pub fn remaining(&self) -> Decimal {
        self.ordered_quantity - self.received_quantity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn line(ordered: &str, received: &str) -> PurchaseOrderLine {
        PurchaseOrderLine {
            id: Uuid::new_v4(),
            order_id: Uuid::new_v4(),
            ingredient_id: Uuid::new_v4(),
            ordered_quantity: dec(ordered),
            received_quantity: dec(received),
            unit: "kg".to_string(),
        }
    }

    #[test]
    fn test_send_only_from_draft() {
        assert_eq!(OrderStatus::Draft.send().unwrap(), OrderStatus::Sent);
        assert!(OrderStatus::Sent.send().is_err());
        assert!(OrderStatus::Partial.send().is_err());
        assert!(OrderStatus::Received.send().is_err());
    }

    #[test]
    fn test_reception_gate() {
        assert!(!OrderStatus::Draft.allows_reception());
        assert!(OrderStatus::Sent.allows_reception());
        assert!(OrderStatus::Partial.allows_reception());
        assert!(!OrderStatus::Received.allows_reception());
    }

    #[test]
    fn test_derive_status_partial_until_all_lines_covered() {
        let lines = vec![line("10", "10"), line("5", "2")];
        assert_eq!(derive_status(&lines), OrderStatus::Partial);

        let lines = vec![line("10", "10"), line("5", "5")];
        assert_eq!(derive_status(&lines), OrderStatus::Received);
    }

    #[test]
    fn test_remaining() {
        assert_eq!(line("10", "4").remaining(), dec("6"));
        assert_eq!(line("10", "10").remaining(), Decimal::ZERO);
    }
}
