//! Validation helpers for quantities and units
//!
//! Quantities flow through the system as `rust_decimal::Decimal`; derived
//! values (remaining order balances, allocation remainders) are compared
//! against a fixed tolerance rather than exact equality.

use rust_decimal::Decimal;

/// Tolerance used when comparing derived quantities (1e-9).
pub const EPSILON: Decimal = Decimal::from_parts(1, 0, 0, false, 9);

/// Validate that a quantity is strictly positive.
pub fn validate_quantity(quantity: Decimal) -> Result<(), &'static str> {
    if quantity <= Decimal::ZERO {
        return Err("Quantity must be positive");
    }
    Ok(())
}

/// Validate that a unit label is present (kg, g, l, piece, ...).
pub fn validate_unit(unit: &str) -> Result<(), &'static str> {
    if unit.trim().is_empty() {
        return Err("Unit must not be blank");
    }
    Ok(())
}

/// True when `received` covers `ordered` within tolerance.
pub fn is_fully_received(ordered: Decimal, received: Decimal) -> bool {
    received >= ordered - EPSILON
}
