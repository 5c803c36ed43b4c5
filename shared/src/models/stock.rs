//! Stock ledger models: immutable movements and traceability lots
//!
//! The movement log is the sole source of truth for on-hand stock. A balance
//! is always the signed sum of movements; it is never stored as a mutable
//! field anywhere in the system.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of a stock movement.
///
/// The set is closed: the sign of every kind is fixed here and adding a new
/// kind forces every match over the enum to be revisited at compile time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementKind {
    Reception,
    Consumption,
    Loss,
    Adjustment,
    TransferOut,
    TransferIn,
    InventoryCount,
}

impl MovementKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementKind::Reception => "reception",
            MovementKind::Consumption => "consumption",
            MovementKind::Loss => "loss",
            MovementKind::Adjustment => "adjustment",
            MovementKind::TransferOut => "transfer_out",
            MovementKind::TransferIn => "transfer_in",
            MovementKind::InventoryCount => "inventory_count",
        }
    }

    /// Signed contribution of this kind to a balance: +1 adds stock, -1
    /// removes it.
    pub fn sign(&self) -> i64 {
        match self {
            MovementKind::Reception
            | MovementKind::Adjustment
            | MovementKind::TransferIn
            | MovementKind::InventoryCount => 1,
            MovementKind::Consumption | MovementKind::Loss | MovementKind::TransferOut => -1,
        }
    }

    /// Signed quantity a movement of this kind contributes to a balance.
    pub fn signed(&self, quantity: Decimal) -> Decimal {
        Decimal::from(self.sign()) * quantity
    }
}

impl std::str::FromStr for MovementKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reception" => Ok(MovementKind::Reception),
            "consumption" => Ok(MovementKind::Consumption),
            "loss" => Ok(MovementKind::Loss),
            "adjustment" => Ok(MovementKind::Adjustment),
            "transfer_out" => Ok(MovementKind::TransferOut),
            "transfer_in" => Ok(MovementKind::TransferIn),
            "inventory_count" => Ok(MovementKind::InventoryCount),
            other => Err(format!("Unknown movement kind: {}", other)),
        }
    }
}

/// An immutable stock movement fact.
///
/// Movements are never updated or deleted after creation; corrections are
/// recorded as new adjustment movements.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: Uuid,
    pub kind: MovementKind,
    pub site_id: Uuid,
    pub ingredient_id: Uuid,
    pub lot_id: Option<Uuid>,
    /// Magnitude, always positive; the sign comes from `kind`.
    pub quantity: Decimal,
    pub unit: String,
    pub external_reference: Option<String>,
    pub comment: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl StockMovement {
    pub fn signed_quantity(&self) -> Decimal {
        self.kind.signed(self.quantity)
    }
}

/// Derive a balance from a sequence of movements.
pub fn derive_balance<'a, I>(movements: I) -> Decimal
where
    I: IntoIterator<Item = &'a StockMovement>,
{
    movements
        .into_iter()
        .fold(Decimal::ZERO, |acc, m| acc + m.signed_quantity())
}

/// A traceable batch of a received ingredient.
///
/// Lots are created only by reception. A lot never stores a quantity: its
/// balance is the signed sum of the movements that reference it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lot {
    pub id: Uuid,
    pub site_id: Uuid,
    pub ingredient_id: Uuid,
    pub supplier_id: Option<Uuid>,
    /// Supplier lot code when available.
    pub lot_code: Option<String>,
    /// Use-by date; lots without one are consumed last under FEFO.
    pub expiry_date: Option<NaiveDate>,
    pub unit: String,
    pub created_at: DateTime<Utc>,
}
