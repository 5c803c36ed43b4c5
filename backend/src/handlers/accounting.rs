//! HTTP handlers for accounting endpoints

use axum::{
    extract::{Query, State},
    Json,
};
use chrono::NaiveDate;
use serde::Deserialize;

use crate::error::AppResult;
use crate::services::AccountingService;
use crate::AppState;
use shared::AccountingEntry;

#[derive(Debug, Deserialize)]
pub struct EntryListQuery {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

/// List accounting entries in a date window
pub async fn list_entries(
    State(state): State<AppState>,
    Query(query): Query<EntryListQuery>,
) -> AppResult<Json<Vec<AccountingEntry>>> {
    let service = AccountingService::new(state.db);
    let entries = service.list_entries(query.from, query.to).await?;
    Ok(Json(entries))
}
