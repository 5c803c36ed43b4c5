//! Route definitions for the Catering Operations Platform

use axum::{
    routing::{get, post},
    Router,
};

use crate::{handlers, AppState};

/// Create API routes
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(handlers::health_check))
        .nest("/catalog", catalog_routes())
        .nest("/stock", stock_routes())
        .nest("/purchasing/orders", purchasing_routes())
        .nest("/production/batches", production_routes())
        .route("/accounting/entries", get(handlers::list_entries))
}

/// Reference data routes
fn catalog_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/sites",
            get(handlers::list_sites).post(handlers::create_site),
        )
        .route(
            "/suppliers",
            get(handlers::list_suppliers).post(handlers::create_supplier),
        )
        .route(
            "/ingredients",
            get(handlers::list_ingredients).post(handlers::create_ingredient),
        )
        .route(
            "/recipes",
            get(handlers::list_recipes).post(handlers::create_recipe),
        )
        .route("/recipes/:recipe_id", get(handlers::get_recipe))
}

/// Stock ledger routes
fn stock_routes() -> Router<AppState> {
    Router::new()
        .route("/balance", get(handlers::get_balance))
        .route("/lots", get(handlers::list_lot_stock))
        .route("/movements", get(handlers::list_movements))
        .route("/adjustments", post(handlers::record_adjustment))
        .route("/transfers", post(handlers::record_transfer))
}

/// Purchase order routes
fn purchasing_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_orders).post(handlers::create_order),
        )
        .route("/:order_id", get(handlers::get_order))
        .route("/:order_id/lines", post(handlers::add_order_line))
        .route("/:order_id/send", post(handlers::send_order))
        .route("/:order_id/receive", post(handlers::receive_order))
}

/// Production batch routes
fn production_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(handlers::list_batches).post(handlers::create_batch),
        )
        .route("/:batch_id", get(handlers::get_batch))
        .route("/:batch_id/execute", post(handlers::execute_batch))
        .route(
            "/:batch_id/consumption",
            get(handlers::get_consumption_lines),
        )
}
