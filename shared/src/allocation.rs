//! FEFO (First-Expired-First-Out) allocation planning
//!
//! Pure computation: the caller loads candidate lots with their derived
//! balances, this module decides how to split a requested quantity across
//! them. Lots with the soonest expiry are consumed first; lots without an
//! expiry date come last.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use std::cmp::Ordering;
use thiserror::Error;
use uuid::Uuid;

use crate::validation::EPSILON;

/// A candidate lot with its current derived balance.
#[derive(Debug, Clone)]
pub struct CandidateLot {
    pub lot_id: Uuid,
    pub expiry_date: Option<NaiveDate>,
    pub balance: Decimal,
}

/// One slice of an allocation plan.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LotAllocation {
    pub lot_id: Uuid,
    pub quantity: Decimal,
    pub unit: String,
    pub expiry_date: Option<NaiveDate>,
}

/// Reasons an allocation plan cannot be produced.
#[derive(Debug, Error, PartialEq)]
pub enum AllocationError {
    #[error("Requested quantity must be positive")]
    NonPositiveQuantity,

    #[error("Unit must not be blank")]
    BlankUnit,

    #[error("Insufficient stock: requested {requested}, available {available}")]
    InsufficientStock {
        requested: Decimal,
        available: Decimal,
    },
}

/// Sort candidates into FEFO order: dated lots first (soonest expiry first),
/// undated lots last, lot id as the final tiebreak so the order is total.
pub fn sort_fefo(candidates: &mut [CandidateLot]) {
    candidates.sort_by(|a, b| match (a.expiry_date, b.expiry_date) {
        (Some(x), Some(y)) => x.cmp(&y).then(a.lot_id.cmp(&b.lot_id)),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.lot_id.cmp(&b.lot_id),
    });
}

/// Split `requested` across candidate lots in FEFO order.
///
/// Lots with a non-positive balance are skipped. If the positive balances do
/// not cover the request, the whole plan fails; no partial plan is returned.
pub fn plan_fefo(
    candidates: &[CandidateLot],
    requested: Decimal,
    unit: &str,
) -> Result<Vec<LotAllocation>, AllocationError> {
    if requested <= Decimal::ZERO {
        return Err(AllocationError::NonPositiveQuantity);
    }
    if unit.trim().is_empty() {
        return Err(AllocationError::BlankUnit);
    }

    let mut ordered: Vec<CandidateLot> = candidates.to_vec();
    sort_fefo(&mut ordered);

    let mut remaining = requested;
    let mut allocations = Vec::new();

    for lot in &ordered {
        if remaining <= EPSILON {
            break;
        }
        if lot.balance <= Decimal::ZERO {
            continue;
        }

        let take = lot.balance.min(remaining);
        allocations.push(LotAllocation {
            lot_id: lot.lot_id,
            quantity: take,
            unit: unit.to_string(),
            expiry_date: lot.expiry_date,
        });
        remaining -= take;
    }

    if remaining > EPSILON {
        let available: Decimal = ordered
            .iter()
            .filter(|l| l.balance > Decimal::ZERO)
            .map(|l| l.balance)
            .sum();
        return Err(AllocationError::InsufficientStock {
            requested,
            available,
        });
    }

    Ok(allocations)
}
