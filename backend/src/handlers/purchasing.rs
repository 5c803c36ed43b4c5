//! HTTP handlers for purchasing endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::purchasing::{
    AddLineInput, CreateOrderInput, OrderDetail, PurchasingService, ReceiveInput, ReceptionResult,
};
use crate::AppState;
use shared::{OrderStatus, PurchaseOrder, PurchaseOrderLine};

#[derive(Debug, Deserialize)]
pub struct OrderListQuery {
    pub status: Option<OrderStatus>,
}

/// Create a draft purchase order
pub async fn create_order(
    State(state): State<AppState>,
    Json(input): Json<CreateOrderInput>,
) -> AppResult<Json<PurchaseOrder>> {
    let service = PurchasingService::new(state.db);
    let order = service.create_order(input).await?;
    Ok(Json(order))
}

/// List purchase orders
pub async fn list_orders(
    State(state): State<AppState>,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<Vec<PurchaseOrder>>> {
    let service = PurchasingService::new(state.db);
    let orders = service.list_orders(query.status).await?;
    Ok(Json(orders))
}

/// Get an order with its lines
pub async fn get_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<OrderDetail>> {
    let service = PurchasingService::new(state.db);
    let detail = service.get_order(order_id).await?;
    Ok(Json(detail))
}

/// Add a line to a draft order
pub async fn add_order_line(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(input): Json<AddLineInput>,
) -> AppResult<Json<PurchaseOrderLine>> {
    let service = PurchasingService::new(state.db);
    let line = service.add_line(order_id, input).await?;
    Ok(Json(line))
}

/// Send a draft order to its supplier
pub async fn send_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
) -> AppResult<Json<PurchaseOrder>> {
    let service = PurchasingService::new(state.db);
    let order = service.send_order(order_id).await?;
    Ok(Json(order))
}

/// Receive goods against an order
pub async fn receive_order(
    State(state): State<AppState>,
    Path(order_id): Path<Uuid>,
    Json(input): Json<ReceiveInput>,
) -> AppResult<Json<ReceptionResult>> {
    let service = PurchasingService::new(state.db);
    let result = service.receive(order_id, input).await?;
    Ok(Json(result))
}
