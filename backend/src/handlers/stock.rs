//! HTTP handlers for stock ledger endpoints

use axum::{
    extract::{Query, State},
    Json,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::ledger::{AdjustmentInput, LedgerService, LotStock, TransferInput};
use crate::AppState;
use shared::StockMovement;

#[derive(Debug, Deserialize)]
pub struct BalanceQuery {
    pub site_id: Uuid,
    pub ingredient_id: Uuid,
    pub lot_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct BalanceResponse {
    pub site_id: Uuid,
    pub ingredient_id: Uuid,
    pub lot_id: Option<Uuid>,
    pub balance: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct MovementsQuery {
    pub site_id: Uuid,
    pub ingredient_id: Option<Uuid>,
    pub lot_id: Option<Uuid>,
}

#[derive(Debug, Deserialize)]
pub struct LotStockQuery {
    pub site_id: Uuid,
    pub ingredient_id: Option<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct TransferResponse {
    pub out_movement_id: Uuid,
    pub in_movement_id: Uuid,
}

/// Derived on-hand balance
pub async fn get_balance(
    State(state): State<AppState>,
    Query(query): Query<BalanceQuery>,
) -> AppResult<Json<BalanceResponse>> {
    let service = LedgerService::new(state.db);
    let balance = service
        .balance(query.site_id, query.ingredient_id, query.lot_id)
        .await?;
    Ok(Json(BalanceResponse {
        site_id: query.site_id,
        ingredient_id: query.ingredient_id,
        lot_id: query.lot_id,
        balance,
    }))
}

/// Per-lot stock levels for a site
pub async fn list_lot_stock(
    State(state): State<AppState>,
    Query(query): Query<LotStockQuery>,
) -> AppResult<Json<Vec<LotStock>>> {
    let service = LedgerService::new(state.db);
    let lots = service.lot_stock(query.site_id, query.ingredient_id).await?;
    Ok(Json(lots))
}

/// Movement history for a site
pub async fn list_movements(
    State(state): State<AppState>,
    Query(query): Query<MovementsQuery>,
) -> AppResult<Json<Vec<StockMovement>>> {
    let service = LedgerService::new(state.db);
    let movements = service
        .movements(query.site_id, query.ingredient_id, query.lot_id)
        .await?;
    Ok(Json(movements))
}

/// Record a manual adjustment, loss or inventory count
pub async fn record_adjustment(
    State(state): State<AppState>,
    Json(input): Json<AdjustmentInput>,
) -> AppResult<Json<StockMovement>> {
    let service = LedgerService::new(state.db);
    let movement = service.record_adjustment(input).await?;
    Ok(Json(movement))
}

/// Move stock between sites
pub async fn record_transfer(
    State(state): State<AppState>,
    Json(input): Json<TransferInput>,
) -> AppResult<Json<TransferResponse>> {
    let service = LedgerService::new(state.db);
    let (out_movement_id, in_movement_id) = service.transfer(input).await?;
    Ok(Json(TransferResponse {
        out_movement_id,
        in_movement_id,
    }))
}
