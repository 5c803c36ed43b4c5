//! HTTP handlers for reference data endpoints

use axum::{
    extract::{Path, State},
    Json,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::services::catalog::{
    CatalogService, CreateIngredientInput, CreateRecipeInput, CreateSiteInput,
    CreateSupplierInput, Ingredient, Recipe, RecipeDetail, Site, Supplier,
};
use crate::AppState;

pub async fn create_site(
    State(state): State<AppState>,
    Json(input): Json<CreateSiteInput>,
) -> AppResult<Json<Site>> {
    let service = CatalogService::new(state.db);
    Ok(Json(service.create_site(input).await?))
}

pub async fn list_sites(State(state): State<AppState>) -> AppResult<Json<Vec<Site>>> {
    let service = CatalogService::new(state.db);
    Ok(Json(service.list_sites().await?))
}

pub async fn create_supplier(
    State(state): State<AppState>,
    Json(input): Json<CreateSupplierInput>,
) -> AppResult<Json<Supplier>> {
    let service = CatalogService::new(state.db);
    Ok(Json(service.create_supplier(input).await?))
}

pub async fn list_suppliers(State(state): State<AppState>) -> AppResult<Json<Vec<Supplier>>> {
    let service = CatalogService::new(state.db);
    Ok(Json(service.list_suppliers().await?))
}

pub async fn create_ingredient(
    State(state): State<AppState>,
    Json(input): Json<CreateIngredientInput>,
) -> AppResult<Json<Ingredient>> {
    let service = CatalogService::new(state.db);
    Ok(Json(service.create_ingredient(input).await?))
}

pub async fn list_ingredients(State(state): State<AppState>) -> AppResult<Json<Vec<Ingredient>>> {
    let service = CatalogService::new(state.db);
    Ok(Json(service.list_ingredients().await?))
}

pub async fn create_recipe(
    State(state): State<AppState>,
    Json(input): Json<CreateRecipeInput>,
) -> AppResult<Json<Recipe>> {
    let service = CatalogService::new(state.db);
    Ok(Json(service.create_recipe(input).await?))
}

pub async fn list_recipes(State(state): State<AppState>) -> AppResult<Json<Vec<Recipe>>> {
    let service = CatalogService::new(state.db);
    Ok(Json(service.list_recipes().await?))
}

pub async fn get_recipe(
    State(state): State<AppState>,
    Path(recipe_id): Path<Uuid>,
) -> AppResult<Json<RecipeDetail>> {
    let service = CatalogService::new(state.db);
    Ok(Json(service.get_recipe(recipe_id).await?))
}
