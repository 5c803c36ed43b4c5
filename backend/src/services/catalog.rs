//! Reference data service
//!
//! Sites, suppliers, ingredients and recipes. The stock operations
//! only ever check these for existence; they never create them.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::Tx;
use shared::validate_unit;

#[derive(Clone)]
pub struct CatalogService {
    db: PgPool,
}

/// A kitchen or shop holding stock.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Site {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Supplier {
    pub id: Uuid,
    pub name: String,
    pub email: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// A purchasable ingredient.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Ingredient {
    pub id: Uuid,
    pub name: String,
    /// Stock-keeping unit (kg, g, l, piece, ...).
    pub unit: String,
    /// Reference cost per unit, used for reception valuation.
    pub unit_cost: Decimal,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Recipe {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// One ingredient requirement per unit produced.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct RecipeLineRecord {
    pub id: Uuid,
    pub recipe_id: Uuid,
    pub ingredient_id: Uuid,
    pub quantity_per_unit: Decimal,
    pub unit: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateSiteInput {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateSupplierInput {
    pub name: String,
    pub email: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateIngredientInput {
    pub name: String,
    pub unit: String,
    pub unit_cost: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct CreateRecipeInput {
    pub name: String,
    pub lines: Vec<CreateRecipeLineInput>,
}

#[derive(Debug, Deserialize)]
pub struct CreateRecipeLineInput {
    pub ingredient_id: Uuid,
    pub quantity_per_unit: Decimal,
    pub unit: String,
}

#[derive(Debug, Serialize)]
pub struct RecipeDetail {
    #[serde(flatten)]
    pub recipe: Recipe,
    pub lines: Vec<RecipeLineRecord>,
}

async fn ensure_exists(tx: &mut Tx<'_>, table: &str, label: &str, id: Uuid) -> AppResult<()> {
    let sql = format!("SELECT EXISTS(SELECT 1 FROM {} WHERE id = $1)", table);
    let exists = sqlx::query_scalar::<_, bool>(&sql)
        .bind(id)
        .fetch_one(&mut **tx)
        .await?;
    if !exists {
        return Err(AppError::ValidationError(format!(
            "Unknown {}: {}",
            label, id
        )));
    }
    Ok(())
}

pub(crate) async fn ensure_site(tx: &mut Tx<'_>, id: Uuid) -> AppResult<()> {
    ensure_exists(tx, "sites", "site", id).await
}

pub(crate) async fn ensure_supplier(tx: &mut Tx<'_>, id: Uuid) -> AppResult<()> {
    ensure_exists(tx, "suppliers", "supplier", id).await
}

pub(crate) async fn ensure_ingredient(tx: &mut Tx<'_>, id: Uuid) -> AppResult<()> {
    ensure_exists(tx, "ingredients", "ingredient", id).await
}

pub(crate) async fn ensure_recipe(tx: &mut Tx<'_>, id: Uuid) -> AppResult<()> {
    ensure_exists(tx, "recipes", "recipe", id).await
}

pub(crate) async fn ensure_lot(tx: &mut Tx<'_>, id: Uuid) -> AppResult<()> {
    ensure_exists(tx, "lots", "lot", id).await
}

impl CatalogService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn create_site(&self, input: CreateSiteInput) -> AppResult<Site> {
        if input.name.trim().is_empty() {
            return Err(AppError::Validation {
                field: "name".into(),
                message: "Name must not be blank".into(),
            });
        }
        let site = sqlx::query_as::<_, Site>(
            "INSERT INTO sites (name) VALUES ($1) RETURNING id, name, created_at",
        )
        .bind(input.name.trim())
        .fetch_one(&self.db)
        .await?;
        Ok(site)
    }

    pub async fn list_sites(&self) -> AppResult<Vec<Site>> {
        let sites =
            sqlx::query_as::<_, Site>("SELECT id, name, created_at FROM sites ORDER BY name")
                .fetch_all(&self.db)
                .await?;
        Ok(sites)
    }

    pub async fn create_supplier(&self, input: CreateSupplierInput) -> AppResult<Supplier> {
        if input.name.trim().is_empty() {
            return Err(AppError::Validation {
                field: "name".into(),
                message: "Name must not be blank".into(),
            });
        }
        let supplier = sqlx::query_as::<_, Supplier>(
            "INSERT INTO suppliers (name, email) VALUES ($1, $2) \
             RETURNING id, name, email, created_at",
        )
        .bind(input.name.trim())
        .bind(&input.email)
        .fetch_one(&self.db)
        .await?;
        Ok(supplier)
    }

    pub async fn list_suppliers(&self) -> AppResult<Vec<Supplier>> {
        let suppliers = sqlx::query_as::<_, Supplier>(
            "SELECT id, name, email, created_at FROM suppliers ORDER BY name",
        )
        .fetch_all(&self.db)
        .await?;
        Ok(suppliers)
    }

    pub async fn create_ingredient(&self, input: CreateIngredientInput) -> AppResult<Ingredient> {
        if input.name.trim().is_empty() {
            return Err(AppError::Validation {
                field: "name".into(),
                message: "Name must not be blank".into(),
            });
        }
        validate_unit(&input.unit).map_err(|e| AppError::ValidationError(e.to_string()))?;
        if input.unit_cost < Decimal::ZERO {
            return Err(AppError::Validation {
                field: "unit_cost".into(),
                message: "Unit cost must not be negative".into(),
            });
        }
        let ingredient = sqlx::query_as::<_, Ingredient>(
            "INSERT INTO ingredients (name, unit, unit_cost) VALUES ($1, $2, $3) \
             RETURNING id, name, unit, unit_cost, created_at",
        )
        .bind(input.name.trim())
        .bind(input.unit.trim())
        .bind(input.unit_cost)
        .fetch_one(&self.db)
        .await?;
        Ok(ingredient)
    }

    pub async fn list_ingredients(&self) -> AppResult<Vec<Ingredient>> {
        let ingredients = sqlx::query_as::<_, Ingredient>(
            "SELECT id, name, unit, unit_cost, created_at FROM ingredients ORDER BY name",
        )
        .fetch_all(&self.db)
        .await?;
        Ok(ingredients)
    }

    pub async fn create_recipe(&self, input: CreateRecipeInput) -> AppResult<Recipe> {
        if input.name.trim().is_empty() {
            return Err(AppError::Validation {
                field: "name".into(),
                message: "Name must not be blank".into(),
            });
        }
        for line in &input.lines {
            validate_unit(&line.unit).map_err(|e| AppError::ValidationError(e.to_string()))?;
            if line.quantity_per_unit <= Decimal::ZERO {
                return Err(AppError::Validation {
                    field: "quantity_per_unit".into(),
                    message: "Quantity per unit must be strictly positive".into(),
                });
            }
        }

        let mut tx = self.db.begin().await?;

        let recipe = sqlx::query_as::<_, Recipe>(
            "INSERT INTO recipes (name) VALUES ($1) RETURNING id, name, created_at",
        )
        .bind(input.name.trim())
        .fetch_one(&mut *tx)
        .await?;

        for line in &input.lines {
            insert_recipe_line(&mut tx, recipe.id, line).await?;
        }

        tx.commit().await?;
        Ok(recipe)
    }

    pub async fn list_recipes(&self) -> AppResult<Vec<Recipe>> {
        let recipes =
            sqlx::query_as::<_, Recipe>("SELECT id, name, created_at FROM recipes ORDER BY name")
                .fetch_all(&self.db)
                .await?;
        Ok(recipes)
    }

    pub async fn get_recipe(&self, recipe_id: Uuid) -> AppResult<RecipeDetail> {
        let recipe =
            sqlx::query_as::<_, Recipe>("SELECT id, name, created_at FROM recipes WHERE id = $1")
                .bind(recipe_id)
                .fetch_optional(&self.db)
                .await?
                .ok_or_else(|| AppError::NotFound("Recipe".into()))?;

        let lines = sqlx::query_as::<_, RecipeLineRecord>(
            "SELECT id, recipe_id, ingredient_id, quantity_per_unit, unit \
             FROM recipe_lines WHERE recipe_id = $1 ORDER BY id",
        )
        .bind(recipe_id)
        .fetch_all(&self.db)
        .await?;

        Ok(RecipeDetail { recipe, lines })
    }
}

async fn insert_recipe_line(
    tx: &mut Tx<'_>,
    recipe_id: Uuid,
    line: &CreateRecipeLineInput,
) -> AppResult<()> {
    ensure_ingredient(tx, line.ingredient_id).await?;
    sqlx::query(
        "INSERT INTO recipe_lines (recipe_id, ingredient_id, quantity_per_unit, unit) \
         VALUES ($1, $2, $3, $4)",
    )
    .bind(recipe_id)
    .bind(line.ingredient_id)
    .bind(line.quantity_per_unit)
    .bind(line.unit.trim())
    .execute(&mut **tx)
    .await
    .map_err(|e| match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => AppError::Validation {
            field: "ingredient_id".into(),
            message: format!(
                "Duplicate recipe line for ingredient {}",
                line.ingredient_id
            ),
        },
        _ => AppError::DatabaseError(e),
    })?;
    Ok(())
}
