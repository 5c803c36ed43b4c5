//! HTTP handlers for production endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::production::{CreateBatchInput, ProductionService};
use crate::AppState;
use shared::{ConsumptionLine, ExecutionResult, ProductionBatch};

#[derive(Debug, Deserialize)]
pub struct BatchListQuery {
    pub site_id: Option<Uuid>,
}

/// Record a production batch
pub async fn create_batch(
    State(state): State<AppState>,
    Json(input): Json<CreateBatchInput>,
) -> AppResult<Json<ProductionBatch>> {
    let service = ProductionService::new(state.db);
    let batch = service.create_batch(input).await?;
    Ok(Json(batch))
}

/// List production batches
pub async fn list_batches(
    State(state): State<AppState>,
    Query(query): Query<BatchListQuery>,
) -> AppResult<Json<Vec<ProductionBatch>>> {
    let service = ProductionService::new(state.db);
    let batches = service.list_batches(query.site_id).await?;
    Ok(Json(batches))
}

/// Get a production batch
pub async fn get_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
) -> AppResult<Json<ProductionBatch>> {
    let service = ProductionService::new(state.db);
    let batch = service.get_batch(batch_id).await?;
    Ok(Json(batch))
}

/// Execute a batch, consuming stock FEFO
pub async fn execute_batch(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
) -> AppResult<Json<ExecutionResult>> {
    let service = ProductionService::new(state.db);
    let result = service.execute(batch_id).await?;
    Ok(Json(result))
}

/// Consumption traceability for a batch
pub async fn get_consumption_lines(
    State(state): State<AppState>,
    Path(batch_id): Path<Uuid>,
) -> AppResult<Json<Vec<ConsumptionLine>>> {
    let service = ProductionService::new(state.db);
    let lines = service.consumption_lines(batch_id).await?;
    Ok(Json(lines))
}
