//! Stock ledger service
//!
//! The ledger is append-only. Movements are never updated or deleted;
//! on-hand quantity is always the signed sum of movements, computed at
//! read time. Corrections are written as compensating movements.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::{catalog, Tx};
use shared::{validate_quantity, validate_unit, Lot, MovementKind, StockMovement};

#[derive(Clone)]
pub struct LedgerService {
    db: PgPool,
}

/// A movement about to be appended to the ledger.
#[derive(Debug, Clone)]
pub struct NewMovement {
    pub kind: MovementKind,
    pub site_id: Uuid,
    pub ingredient_id: Uuid,
    pub lot_id: Option<Uuid>,
    /// Magnitude, strictly positive. The kind carries the direction.
    pub quantity: Decimal,
    pub unit: String,
    pub external_reference: Option<String>,
    pub comment: Option<String>,
}

/// Input for a manual stock adjustment.
#[derive(Debug, Deserialize)]
pub struct AdjustmentInput {
    pub kind: MovementKind,
    pub site_id: Uuid,
    pub ingredient_id: Uuid,
    pub lot_id: Option<Uuid>,
    pub quantity: Decimal,
    pub unit: String,
    pub comment: Option<String>,
}

/// Input for a site-to-site transfer.
#[derive(Debug, Deserialize)]
pub struct TransferInput {
    pub from_site_id: Uuid,
    pub to_site_id: Uuid,
    pub ingredient_id: Uuid,
    pub lot_id: Option<Uuid>,
    pub quantity: Decimal,
    pub unit: String,
    pub comment: Option<String>,
}

/// A lot together with its derived balance.
#[derive(Debug, Serialize)]
pub struct LotStock {
    #[serde(flatten)]
    pub lot: Lot,
    pub balance: Decimal,
}

#[derive(Debug, FromRow)]
struct LotStockRow {
    id: Uuid,
    site_id: Uuid,
    ingredient_id: Uuid,
    supplier_id: Option<Uuid>,
    lot_code: Option<String>,
    expiry_date: Option<chrono::NaiveDate>,
    unit: String,
    created_at: DateTime<Utc>,
    balance: Decimal,
}

impl From<LotStockRow> for LotStock {
    fn from(row: LotStockRow) -> Self {
        LotStock {
            lot: Lot {
                id: row.id,
                site_id: row.site_id,
                ingredient_id: row.ingredient_id,
                supplier_id: row.supplier_id,
                lot_code: row.lot_code,
                expiry_date: row.expiry_date,
                unit: row.unit,
                created_at: row.created_at,
            },
            balance: row.balance,
        }
    }
}

#[derive(Debug, FromRow)]
struct MovementRow {
    id: Uuid,
    kind: String,
    site_id: Uuid,
    ingredient_id: Uuid,
    lot_id: Option<Uuid>,
    quantity: Decimal,
    unit: String,
    external_reference: Option<String>,
    comment: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<MovementRow> for StockMovement {
    type Error = AppError;

    fn try_from(row: MovementRow) -> Result<Self, Self::Error> {
        let kind = row
            .kind
            .parse::<MovementKind>()
            .map_err(|_| AppError::Internal(format!("Unknown movement kind: {}", row.kind)))?;
        Ok(StockMovement {
            id: row.id,
            kind,
            site_id: row.site_id,
            ingredient_id: row.ingredient_id,
            lot_id: row.lot_id,
            quantity: row.quantity,
            unit: row.unit,
            external_reference: row.external_reference,
            comment: row.comment,
            created_at: row.created_at,
        })
    }
}

/// SQL fragment computing the signed sum of movement rows.
///
/// Must stay in step with [`MovementKind::sign`]. `prefix` is the
/// table alias including the trailing dot, or "" for unqualified.
pub(crate) fn signed_sum_sql(prefix: &str) -> String {
    format!(
        "COALESCE(SUM(CASE \
         WHEN {p}kind IN ('reception', 'adjustment', 'transfer_in', 'inventory_count') THEN {p}quantity \
         WHEN {p}kind IN ('consumption', 'loss', 'transfer_out') THEN -{p}quantity \
         ELSE 0 END), 0)",
        p = prefix
    )
}

impl LedgerService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Append one movement inside the caller's transaction.
    ///
    /// Callers are expected to have validated quantity and unit and to
    /// have checked that the referenced rows exist.
    pub async fn append(tx: &mut Tx<'_>, movement: &NewMovement) -> AppResult<Uuid> {
        let id = sqlx::query_scalar::<_, Uuid>(
            r#"
            INSERT INTO stock_movements (
                kind, site_id, ingredient_id, lot_id, quantity, unit,
                external_reference, comment
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING id
            "#,
        )
        .bind(movement.kind.as_str())
        .bind(movement.site_id)
        .bind(movement.ingredient_id)
        .bind(movement.lot_id)
        .bind(movement.quantity)
        .bind(&movement.unit)
        .bind(&movement.external_reference)
        .bind(&movement.comment)
        .fetch_one(&mut **tx)
        .await?;

        Ok(id)
    }

    /// Derived on-hand balance for an ingredient at a site, optionally
    /// narrowed to a single lot.
    pub async fn balance(
        &self,
        site_id: Uuid,
        ingredient_id: Uuid,
        lot_id: Option<Uuid>,
    ) -> AppResult<Decimal> {
        let sql = format!(
            "SELECT {} FROM stock_movements \
             WHERE site_id = $1 AND ingredient_id = $2 \
             AND ($3::uuid IS NULL OR lot_id = $3)",
            signed_sum_sql("")
        );

        let balance = sqlx::query_scalar::<_, Decimal>(&sql)
            .bind(site_id)
            .bind(ingredient_id)
            .bind(lot_id)
            .fetch_one(&self.db)
            .await?;

        Ok(balance)
    }

    /// Record a manual adjustment, loss or inventory count.
    pub async fn record_adjustment(&self, input: AdjustmentInput) -> AppResult<StockMovement> {
        match input.kind {
            MovementKind::Adjustment | MovementKind::Loss | MovementKind::InventoryCount => {}
            other => {
                return Err(AppError::Validation {
                    field: "kind".into(),
                    message: format!("'{}' cannot be recorded manually", other.as_str()),
                })
            }
        }
        validate_quantity(input.quantity).map_err(|e| AppError::ValidationError(e.to_string()))?;
        validate_unit(&input.unit).map_err(|e| AppError::ValidationError(e.to_string()))?;

        let mut tx = self.db.begin().await?;

        catalog::ensure_site(&mut tx, input.site_id).await?;
        catalog::ensure_ingredient(&mut tx, input.ingredient_id).await?;
        if let Some(lot_id) = input.lot_id {
            catalog::ensure_lot(&mut tx, lot_id).await?;
        }

        let movement = NewMovement {
            kind: input.kind,
            site_id: input.site_id,
            ingredient_id: input.ingredient_id,
            lot_id: input.lot_id,
            quantity: input.quantity,
            unit: input.unit,
            external_reference: None,
            comment: input.comment,
        };
        let id = Self::append(&mut tx, &movement).await?;

        let row = sqlx::query_as::<_, MovementRow>(
            "SELECT id, kind, site_id, ingredient_id, lot_id, quantity, unit, \
             external_reference, comment, created_at \
             FROM stock_movements WHERE id = $1",
        )
        .bind(id)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        tracing::info!(
            movement_id = %id,
            kind = movement.kind.as_str(),
            "Recorded stock adjustment"
        );

        row.try_into()
    }

    /// Move stock between sites as a paired transfer_out/transfer_in.
    /// Both movements land in the same transaction or not at all.
    pub async fn transfer(&self, input: TransferInput) -> AppResult<(Uuid, Uuid)> {
        if input.from_site_id == input.to_site_id {
            return Err(AppError::Validation {
                field: "to_site_id".into(),
                message: "Source and destination sites must differ".into(),
            });
        }
        validate_quantity(input.quantity).map_err(|e| AppError::ValidationError(e.to_string()))?;
        validate_unit(&input.unit).map_err(|e| AppError::ValidationError(e.to_string()))?;

        let mut tx = self.db.begin().await?;

        catalog::ensure_site(&mut tx, input.from_site_id).await?;
        catalog::ensure_site(&mut tx, input.to_site_id).await?;
        catalog::ensure_ingredient(&mut tx, input.ingredient_id).await?;
        if let Some(lot_id) = input.lot_id {
            catalog::ensure_lot(&mut tx, lot_id).await?;
        }

        // Balance check inside the writing transaction.
        let sql = format!(
            "SELECT {} FROM stock_movements \
             WHERE site_id = $1 AND ingredient_id = $2 \
             AND ($3::uuid IS NULL OR lot_id = $3)",
            signed_sum_sql("")
        );
        let available = sqlx::query_scalar::<_, Decimal>(&sql)
            .bind(input.from_site_id)
            .bind(input.ingredient_id)
            .bind(input.lot_id)
            .fetch_one(&mut *tx)
            .await?;

        if available < input.quantity {
            return Err(AppError::InsufficientStock {
                requested: input.quantity,
                available,
                unit: input.unit,
            });
        }

        let out_id = Self::append(
            &mut tx,
            &NewMovement {
                kind: MovementKind::TransferOut,
                site_id: input.from_site_id,
                ingredient_id: input.ingredient_id,
                lot_id: input.lot_id,
                quantity: input.quantity,
                unit: input.unit.clone(),
                external_reference: None,
                comment: input.comment.clone(),
            },
        )
        .await?;

        let in_id = Self::append(
            &mut tx,
            &NewMovement {
                kind: MovementKind::TransferIn,
                site_id: input.to_site_id,
                ingredient_id: input.ingredient_id,
                lot_id: input.lot_id,
                quantity: input.quantity,
                unit: input.unit,
                external_reference: Some(out_id.to_string()),
                comment: input.comment,
            },
        )
        .await?;

        tx.commit().await?;

        tracing::info!(
            out_movement = %out_id,
            in_movement = %in_id,
            "Recorded site transfer"
        );

        Ok((out_id, in_id))
    }

    /// Per-lot stock view for a site, FEFO order (soonest expiry first,
    /// undated lots last).
    pub async fn lot_stock(
        &self,
        site_id: Uuid,
        ingredient_id: Option<Uuid>,
    ) -> AppResult<Vec<LotStock>> {
        let sql = format!(
            r#"
            SELECT l.id, l.site_id, l.ingredient_id, l.supplier_id, l.lot_code,
                   l.expiry_date, l.unit, l.created_at, {} AS balance
            FROM lots l
            LEFT JOIN stock_movements m
              ON m.lot_id = l.id AND m.site_id = l.site_id
            WHERE l.site_id = $1
              AND ($2::uuid IS NULL OR l.ingredient_id = $2)
            GROUP BY l.id
            ORDER BY l.expiry_date ASC NULLS LAST, l.id
            "#,
            signed_sum_sql("m.")
        );

        let rows = sqlx::query_as::<_, LotStockRow>(&sql)
            .bind(site_id)
            .bind(ingredient_id)
            .fetch_all(&self.db)
            .await?;

        Ok(rows.into_iter().map(LotStock::from).collect())
    }

    /// Movement history for a site, newest first.
    pub async fn movements(
        &self,
        site_id: Uuid,
        ingredient_id: Option<Uuid>,
        lot_id: Option<Uuid>,
    ) -> AppResult<Vec<StockMovement>> {
        let rows = sqlx::query_as::<_, MovementRow>(
            r#"
            SELECT id, kind, site_id, ingredient_id, lot_id, quantity, unit,
                   external_reference, comment, created_at
            FROM stock_movements
            WHERE site_id = $1
              AND ($2::uuid IS NULL OR ingredient_id = $2)
              AND ($3::uuid IS NULL OR lot_id = $3)
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(site_id)
        .bind(ingredient_id)
        .bind(lot_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(StockMovement::try_from).collect()
    }
}
