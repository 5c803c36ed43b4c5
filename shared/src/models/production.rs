//! Production models: batches, bill-of-materials lines and consumption
//! traceability

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A real production run of a recipe at a site.
///
/// At most one set of consumption lines may ever exist per batch: execution
/// happens exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductionBatch {
    pub id: Uuid,
    pub site_id: Uuid,
    /// Null for off-plan production.
    pub plan_id: Option<Uuid>,
    pub recipe_id: Uuid,
    pub produced_quantity: Decimal,
    pub unit: String,
    pub produced_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

/// Traceability join between a production batch and the lot/movement it
/// consumed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsumptionLine {
    pub id: Uuid,
    pub batch_id: Uuid,
    pub ingredient_id: Uuid,
    pub lot_id: Uuid,
    pub movement_id: Uuid,
    pub quantity: Decimal,
    pub unit: String,
}

/// One bill-of-materials line of a recipe. Reference data, read-only to the
/// stock core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecipeLine {
    pub recipe_id: Uuid,
    pub ingredient_id: Uuid,
    pub quantity_per_unit: Decimal,
    pub unit: String,
}

impl RecipeLine {
    /// Total requirement for a batch producing `produced_quantity` units.
    pub fn required_for(&self, produced_quantity: Decimal) -> Decimal {
        self.quantity_per_unit * produced_quantity
    }
}

/// Execute-once guard: a batch that already owns consumption lines has
/// been executed and may never consume again.
pub fn ensure_not_executed(existing_consumption_lines: i64) -> Result<(), &'static str> {
    if existing_consumption_lines > 0 {
        return Err("Batch already has consumption lines");
    }
    Ok(())
}

/// Summary returned by a successful batch execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub batch_id: Uuid,
    pub movements_created: usize,
    pub consumption_lines_created: usize,
}
