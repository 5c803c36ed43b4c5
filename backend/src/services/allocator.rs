//! FEFO lot allocator
//!
//! Reads per-lot balances inside the caller's transaction and plans
//! which lots satisfy a demand, earliest expiry first. The plan is
//! all-or-nothing: a shortfall produces no partial allocation.

use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::ledger::signed_sum_sql;
use crate::services::{catalog, Tx};
use shared::{
    plan_fefo, validate_quantity, validate_unit, AllocationError, CandidateLot, LotAllocation,
};

pub struct FefoAllocator;

/// One ingredient demand to satisfy from stock.
#[derive(Debug, Clone, Deserialize)]
pub struct IngredientDemand {
    pub ingredient_id: Uuid,
    pub quantity: Decimal,
    pub unit: String,
}

#[derive(Debug, FromRow)]
struct CandidateRow {
    lot_id: Uuid,
    expiry_date: Option<chrono::NaiveDate>,
    balance: Decimal,
}

impl FefoAllocator {
    /// Plan lot allocations for one demand at one site.
    ///
    /// Balances are read inside `tx` so the plan is consistent with
    /// any movements the caller has already written in it.
    pub async fn allocate(
        tx: &mut Tx<'_>,
        site_id: Uuid,
        demand: &IngredientDemand,
    ) -> AppResult<Vec<LotAllocation>> {
        // Reject malformed demands before touching any lot.
        validate_quantity(demand.quantity).map_err(|e| AppError::ValidationError(e.to_string()))?;
        validate_unit(&demand.unit).map_err(|e| AppError::ValidationError(e.to_string()))?;
        catalog::ensure_ingredient(tx, demand.ingredient_id).await?;

        let sql = format!(
            r#"
            SELECT l.id AS lot_id, l.expiry_date, {} AS balance
            FROM lots l
            LEFT JOIN stock_movements m
              ON m.lot_id = l.id AND m.site_id = l.site_id
            WHERE l.site_id = $1 AND l.ingredient_id = $2
            GROUP BY l.id, l.expiry_date
            "#,
            signed_sum_sql("m.")
        );

        let rows = sqlx::query_as::<_, CandidateRow>(&sql)
            .bind(site_id)
            .bind(demand.ingredient_id)
            .fetch_all(&mut **tx)
            .await?;

        let candidates: Vec<CandidateLot> = rows
            .into_iter()
            .map(|r| CandidateLot {
                lot_id: r.lot_id,
                expiry_date: r.expiry_date,
                balance: r.balance,
            })
            .collect();

        plan_fefo(&candidates, demand.quantity, &demand.unit).map_err(|e| match e {
            AllocationError::NonPositiveQuantity => {
                AppError::ValidationError("Quantity must be strictly positive".into())
            }
            AllocationError::BlankUnit => AppError::ValidationError("Unit must not be blank".into()),
            AllocationError::InsufficientStock {
                requested,
                available,
            } => AppError::InsufficientStock {
                requested,
                available,
                unit: demand.unit.clone(),
            },
        })
    }
}
