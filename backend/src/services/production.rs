//! Production execution service
//!
//! Executing a batch turns its recipe requirements into FEFO-allocated
//! consumption movements plus traceability lines, atomically and exactly
//! once. A batch with consumption lines can never be executed again.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::ledger::{LedgerService, NewMovement};
use crate::services::{catalog, FefoAllocator};
use crate::services::allocator::IngredientDemand;
use shared::{
    ensure_not_executed, validate_quantity, validate_unit, ConsumptionLine, ExecutionResult,
    MovementKind, ProductionBatch, RecipeLine,
};

#[derive(Clone)]
pub struct ProductionService {
    db: PgPool,
}

#[derive(Debug, Deserialize)]
pub struct CreateBatchInput {
    pub site_id: Uuid,
    pub recipe_id: Uuid,
    pub plan_id: Option<Uuid>,
    pub produced_quantity: Decimal,
    pub unit: String,
    pub produced_at: Option<DateTime<Utc>>,
}

#[derive(Debug, FromRow)]
struct BatchRow {
    id: Uuid,
    site_id: Uuid,
    plan_id: Option<Uuid>,
    recipe_id: Uuid,
    produced_quantity: Decimal,
    unit: String,
    produced_at: DateTime<Utc>,
    created_at: DateTime<Utc>,
}

impl From<BatchRow> for ProductionBatch {
    fn from(row: BatchRow) -> Self {
        ProductionBatch {
            id: row.id,
            site_id: row.site_id,
            plan_id: row.plan_id,
            recipe_id: row.recipe_id,
            produced_quantity: row.produced_quantity,
            unit: row.unit,
            produced_at: row.produced_at,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct RecipeLineRow {
    recipe_id: Uuid,
    ingredient_id: Uuid,
    quantity_per_unit: Decimal,
    unit: String,
}

impl From<RecipeLineRow> for RecipeLine {
    fn from(row: RecipeLineRow) -> Self {
        RecipeLine {
            recipe_id: row.recipe_id,
            ingredient_id: row.ingredient_id,
            quantity_per_unit: row.quantity_per_unit,
            unit: row.unit,
        }
    }
}

#[derive(Debug, FromRow)]
struct ConsumptionLineRow {
    id: Uuid,
    batch_id: Uuid,
    ingredient_id: Uuid,
    lot_id: Uuid,
    movement_id: Uuid,
    quantity: Decimal,
    unit: String,
}

impl From<ConsumptionLineRow> for ConsumptionLine {
    fn from(row: ConsumptionLineRow) -> Self {
        ConsumptionLine {
            id: row.id,
            batch_id: row.batch_id,
            ingredient_id: row.ingredient_id,
            lot_id: row.lot_id,
            movement_id: row.movement_id,
            quantity: row.quantity,
            unit: row.unit,
        }
    }
}

const BATCH_COLUMNS: &str =
    "id, site_id, plan_id, recipe_id, produced_quantity, unit, produced_at, created_at";

impl ProductionService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Record a production batch. Recording does not touch stock;
    /// consumption only happens on execution.
    pub async fn create_batch(&self, input: CreateBatchInput) -> AppResult<ProductionBatch> {
        validate_quantity(input.produced_quantity).map_err(|e| AppError::ValidationError(e.to_string()))?;
        validate_unit(&input.unit).map_err(|e| AppError::ValidationError(e.to_string()))?;

        let mut tx = self.db.begin().await?;

        catalog::ensure_site(&mut tx, input.site_id).await?;
        catalog::ensure_recipe(&mut tx, input.recipe_id).await?;

        let sql = format!(
            "INSERT INTO production_batches \
             (site_id, plan_id, recipe_id, produced_quantity, unit, produced_at) \
             VALUES ($1, $2, $3, $4, $5, $6) RETURNING {}",
            BATCH_COLUMNS
        );
        let row = sqlx::query_as::<_, BatchRow>(&sql)
            .bind(input.site_id)
            .bind(input.plan_id)
            .bind(input.recipe_id)
            .bind(input.produced_quantity)
            .bind(input.unit.trim())
            .bind(input.produced_at.unwrap_or_else(Utc::now))
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(row.into())
    }

    /// Execute a batch: consume its recipe requirements from stock.
    ///
    /// All reads and writes happen in one transaction. The existing
    /// consumption-line count is the execute-once guard; it is checked
    /// inside the transaction, before any stock validation.
    pub async fn execute(&self, batch_id: Uuid) -> AppResult<ExecutionResult> {
        let mut tx = self.db.begin().await?;

        // The row lock serializes concurrent executions of one batch, so
        // the consumption-line count below is a consistent guard read.
        let sql = format!(
            "SELECT {} FROM production_batches WHERE id = $1 FOR UPDATE",
            BATCH_COLUMNS
        );
        let batch: ProductionBatch = sqlx::query_as::<_, BatchRow>(&sql)
            .bind(batch_id)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(|| AppError::NotFound("Production batch".into()))?
            .into();

        let existing: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM consumption_lines WHERE batch_id = $1",
        )
        .bind(batch_id)
        .fetch_one(&mut *tx)
        .await?;
        ensure_not_executed(existing)
            .map_err(|_| AppError::AlreadyExecuted(format!("Batch {}", batch_id)))?;

        if batch.produced_quantity <= Decimal::ZERO {
            return Err(AppError::ValidationError(
                "Produced quantity must be strictly positive".into(),
            ));
        }

        let lines: Vec<RecipeLine> = sqlx::query_as::<_, RecipeLineRow>(
            "SELECT recipe_id, ingredient_id, quantity_per_unit, unit \
             FROM recipe_lines WHERE recipe_id = $1 ORDER BY id",
        )
        .bind(batch.recipe_id)
        .fetch_all(&mut *tx)
        .await?
        .into_iter()
        .map(RecipeLine::from)
        .collect();

        if lines.is_empty() {
            return Err(AppError::ValidationError("Recipe has no lines".into()));
        }

        let mut movements_created = 0usize;
        let mut consumption_lines_created = 0usize;

        for line in &lines {
            let required = line.required_for(batch.produced_quantity);
            if required <= Decimal::ZERO {
                continue;
            }

            let demand = IngredientDemand {
                ingredient_id: line.ingredient_id,
                quantity: required,
                unit: line.unit.clone(),
            };
            let allocations = FefoAllocator::allocate(&mut tx, batch.site_id, &demand).await?;

            for allocation in &allocations {
                let movement_id = LedgerService::append(
                    &mut tx,
                    &NewMovement {
                        kind: MovementKind::Consumption,
                        site_id: batch.site_id,
                        ingredient_id: line.ingredient_id,
                        lot_id: Some(allocation.lot_id),
                        quantity: allocation.quantity,
                        unit: allocation.unit.clone(),
                        external_reference: Some(batch.id.to_string()),
                        comment: Some(format!(
                            "Production consumption (recipe={})",
                            batch.recipe_id
                        )),
                    },
                )
                .await?;
                movements_created += 1;

                sqlx::query(
                    "INSERT INTO consumption_lines \
                     (batch_id, ingredient_id, lot_id, movement_id, quantity, unit) \
                     VALUES ($1, $2, $3, $4, $5, $6)",
                )
                .bind(batch.id)
                .bind(line.ingredient_id)
                .bind(allocation.lot_id)
                .bind(movement_id)
                .bind(allocation.quantity)
                .bind(&allocation.unit)
                .execute(&mut *tx)
                .await?;
                consumption_lines_created += 1;
            }
        }

        tx.commit().await?;

        tracing::info!(
            batch_id = %batch.id,
            movements = movements_created,
            "Executed production batch"
        );

        Ok(ExecutionResult {
            batch_id: batch.id,
            movements_created,
            consumption_lines_created,
        })
    }

    pub async fn get_batch(&self, batch_id: Uuid) -> AppResult<ProductionBatch> {
        let sql = format!(
            "SELECT {} FROM production_batches WHERE id = $1",
            BATCH_COLUMNS
        );
        let row = sqlx::query_as::<_, BatchRow>(&sql)
            .bind(batch_id)
            .fetch_optional(&self.db)
            .await?
            .ok_or_else(|| AppError::NotFound("Production batch".into()))?;
        Ok(row.into())
    }

    pub async fn list_batches(&self, site_id: Option<Uuid>) -> AppResult<Vec<ProductionBatch>> {
        let sql = format!(
            "SELECT {} FROM production_batches \
             WHERE ($1::uuid IS NULL OR site_id = $1) \
             ORDER BY produced_at DESC",
            BATCH_COLUMNS
        );
        let rows = sqlx::query_as::<_, BatchRow>(&sql)
            .bind(site_id)
            .fetch_all(&self.db)
            .await?;
        Ok(rows.into_iter().map(ProductionBatch::from).collect())
    }

    /// Traceability lines for an executed batch.
    pub async fn consumption_lines(&self, batch_id: Uuid) -> AppResult<Vec<ConsumptionLine>> {
        let exists = sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM production_batches WHERE id = $1)",
        )
        .bind(batch_id)
        .fetch_one(&self.db)
        .await?;
        if !exists {
            return Err(AppError::NotFound("Production batch".into()));
        }

        let rows = sqlx::query_as::<_, ConsumptionLineRow>(
            "SELECT id, batch_id, ingredient_id, lot_id, movement_id, quantity, unit \
             FROM consumption_lines WHERE batch_id = $1 ORDER BY id",
        )
        .bind(batch_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(ConsumptionLine::from).collect())
    }
}
