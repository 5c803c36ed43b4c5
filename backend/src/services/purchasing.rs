//! Purchasing service: supplier orders and goods reception
//!
//! Reception is the only door through which purchased stock enters the
//! ledger. One reception call is one transaction: lots, reception
//! movements, cumulative line totals, the accounting pair and the
//! derived order status all land together or not at all.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use std::collections::HashSet;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::ledger::{LedgerService, NewMovement};
use crate::services::{accounting, catalog, Tx};
use shared::{
    derive_status, validate_quantity, validate_unit, MovementKind, OrderStatus, PurchaseOrder,
    PurchaseOrderLine, EPSILON,
};

#[derive(Clone)]
pub struct PurchasingService {
    db: PgPool,
}

#[derive(Debug, Deserialize)]
pub struct CreateOrderInput {
    pub supplier_id: Uuid,
    pub comment: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AddLineInput {
    pub ingredient_id: Uuid,
    pub quantity: Decimal,
    pub unit: String,
}

/// One line of a reception. Omitted quantities are not allowed; callers
/// wanting "everything outstanding" omit `lines` entirely.
#[derive(Debug, Clone, Deserialize)]
pub struct ReceptionLineInput {
    pub ingredient_id: Uuid,
    pub quantity: Decimal,
    pub unit: String,
    pub expiry_date: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct ReceiveInput {
    pub site_id: Uuid,
    /// When absent, every line's outstanding remainder is received.
    pub lines: Option<Vec<ReceptionLineInput>>,
    /// Supplier delivery note reference; also used as the lot code.
    pub external_reference: Option<String>,
    pub comment: Option<String>,
}

/// Summary returned by a validated reception.
#[derive(Debug, Serialize)]
pub struct ReceptionResult {
    pub order_id: Uuid,
    pub status: OrderStatus,
    pub lots_created: usize,
    pub movements_created: usize,
    pub net_amount: Decimal,
    pub accounting_reference: String,
}

#[derive(Debug, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: PurchaseOrder,
    pub lines: Vec<PurchaseOrderLine>,
}

#[derive(Debug, FromRow)]
struct OrderRow {
    id: Uuid,
    supplier_id: Uuid,
    order_date: DateTime<Utc>,
    status: String,
    comment: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<OrderRow> for PurchaseOrder {
    type Error = AppError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let status = row.status.parse::<OrderStatus>().map_err(AppError::Internal)?;
        Ok(PurchaseOrder {
            id: row.id,
            supplier_id: row.supplier_id,
            order_date: row.order_date,
            status,
            comment: row.comment,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, FromRow)]
struct LineRow {
    id: Uuid,
    order_id: Uuid,
    ingredient_id: Uuid,
    ordered_quantity: Decimal,
    received_quantity: Decimal,
    unit: String,
}

impl From<LineRow> for PurchaseOrderLine {
    fn from(row: LineRow) -> Self {
        PurchaseOrderLine {
            id: row.id,
            order_id: row.order_id,
            ingredient_id: row.ingredient_id,
            ordered_quantity: row.ordered_quantity,
            received_quantity: row.received_quantity,
            unit: row.unit,
        }
    }
}

const ORDER_COLUMNS: &str = "id, supplier_id, order_date, status, comment, created_at";
const LINE_COLUMNS: &str =
    "id, order_id, ingredient_id, ordered_quantity, received_quantity, unit";

async fn load_order(tx: &mut Tx<'_>, order_id: Uuid) -> AppResult<PurchaseOrder> {
    let sql = format!("SELECT {} FROM purchase_orders WHERE id = $1", ORDER_COLUMNS);
    sqlx::query_as::<_, OrderRow>(&sql)
        .bind(order_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Purchase order".into()))?
        .try_into()
}

/// Load an order and take its row lock. Mutating operations go through
/// here so concurrent receptions (and their line updates, status
/// derivation and accounting sequence) are serialized per order.
async fn load_order_for_update(tx: &mut Tx<'_>, order_id: Uuid) -> AppResult<PurchaseOrder> {
    let sql = format!(
        "SELECT {} FROM purchase_orders WHERE id = $1 FOR UPDATE",
        ORDER_COLUMNS
    );
    sqlx::query_as::<_, OrderRow>(&sql)
        .bind(order_id)
        .fetch_optional(&mut **tx)
        .await?
        .ok_or_else(|| AppError::NotFound("Purchase order".into()))?
        .try_into()
}

async fn load_lines(tx: &mut Tx<'_>, order_id: Uuid) -> AppResult<Vec<PurchaseOrderLine>> {
    let sql = format!(
        "SELECT {} FROM purchase_order_lines WHERE order_id = $1 ORDER BY id",
        LINE_COLUMNS
    );
    let rows = sqlx::query_as::<_, LineRow>(&sql)
        .bind(order_id)
        .fetch_all(&mut **tx)
        .await?;
    Ok(rows.into_iter().map(PurchaseOrderLine::from).collect())
}

impl PurchasingService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn create_order(&self, input: CreateOrderInput) -> AppResult<PurchaseOrder> {
        let mut tx = self.db.begin().await?;

        catalog::ensure_supplier(&mut tx, input.supplier_id).await?;

        let sql = format!(
            "INSERT INTO purchase_orders (supplier_id, status, comment) \
             VALUES ($1, 'draft', $2) RETURNING {}",
            ORDER_COLUMNS
        );
        let order: PurchaseOrder = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(input.supplier_id)
            .bind(&input.comment)
            .fetch_one(&mut *tx)
            .await?
            .try_into()?;

        tx.commit().await?;
        Ok(order)
    }

    /// Add a line to a draft order. One line per ingredient.
    pub async fn add_line(
        &self,
        order_id: Uuid,
        input: AddLineInput,
    ) -> AppResult<PurchaseOrderLine> {
        validate_quantity(input.quantity).map_err(|e| AppError::ValidationError(e.to_string()))?;
        validate_unit(&input.unit).map_err(|e| AppError::ValidationError(e.to_string()))?;

        let mut tx = self.db.begin().await?;

        let order = load_order_for_update(&mut tx, order_id).await?;
        if !order.status.allows_line_changes() {
            return Err(AppError::InvalidStateTransition(format!(
                "Lines cannot be changed on a {} order",
                order.status.as_str()
            )));
        }

        catalog::ensure_ingredient(&mut tx, input.ingredient_id).await?;

        let sql = format!(
            "INSERT INTO purchase_order_lines (order_id, ingredient_id, ordered_quantity, unit) \
             VALUES ($1, $2, $3, $4) RETURNING {}",
            LINE_COLUMNS
        );
        let line: PurchaseOrderLine = sqlx::query_as::<_, LineRow>(&sql)
            .bind(order_id)
            .bind(input.ingredient_id)
            .bind(input.quantity)
            .bind(input.unit.trim())
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| match &e {
                sqlx::Error::Database(db) if db.is_unique_violation() => AppError::Validation {
                    field: "ingredient_id".into(),
                    message: format!(
                        "Ingredient {} is already on this order",
                        input.ingredient_id
                    ),
                },
                _ => AppError::DatabaseError(e),
            })?
            .into();

        tx.commit().await?;
        Ok(line)
    }

    /// The `draft -> sent` transition. An empty order cannot be sent.
    pub async fn send_order(&self, order_id: Uuid) -> AppResult<PurchaseOrder> {
        let mut tx = self.db.begin().await?;

        let mut order = load_order_for_update(&mut tx, order_id).await?;
        let next = order
            .status
            .send()
            .map_err(|msg| AppError::InvalidStateTransition(msg.into()))?;

        let line_count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM purchase_order_lines WHERE order_id = $1")
                .bind(order_id)
                .fetch_one(&mut *tx)
                .await?;
        if line_count == 0 {
            return Err(AppError::ValidationError(
                "An order without lines cannot be sent".into(),
            ));
        }

        sqlx::query("UPDATE purchase_orders SET status = $1 WHERE id = $2")
            .bind(next.as_str())
            .bind(order_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(order_id = %order_id, "Purchase order sent");
        order.status = next;
        Ok(order)
    }

    /// Receive goods against a sent or partially received order.
    ///
    /// Every input line is validated before anything is written, so a
    /// rejected reception leaves no trace.
    pub async fn receive(&self, order_id: Uuid, input: ReceiveInput) -> AppResult<ReceptionResult> {
        let mut tx = self.db.begin().await?;

        catalog::ensure_site(&mut tx, input.site_id).await?;

        let order = load_order_for_update(&mut tx, order_id).await?;
        if !order.status.allows_reception() {
            return Err(AppError::InvalidStateTransition(format!(
                "A {} order cannot receive goods",
                order.status.as_str()
            )));
        }

        let order_lines = load_lines(&mut tx, order_id).await?;

        // Defaulting: receive every outstanding remainder.
        let reception_lines: Vec<ReceptionLineInput> = match input.lines {
            Some(lines) => lines,
            None => order_lines
                .iter()
                .filter(|l| l.remaining() > Decimal::ZERO)
                .map(|l| ReceptionLineInput {
                    ingredient_id: l.ingredient_id,
                    quantity: l.remaining(),
                    unit: l.unit.clone(),
                    expiry_date: None,
                })
                .collect(),
        };

        if reception_lines.is_empty() {
            return Err(AppError::ValidationError("Nothing to receive".into()));
        }

        // One line per ingredient: the per-line remainder check below is
        // taken against a single snapshot, so repeated ingredients could
        // jointly overshoot `ordered` while each line passes alone.
        let mut seen = HashSet::new();
        for line in &reception_lines {
            if !seen.insert(line.ingredient_id) {
                return Err(AppError::ValidationError(format!(
                    "Duplicate reception line for ingredient {}",
                    line.ingredient_id
                )));
            }
        }

        // Validate everything before the first write.
        for line in &reception_lines {
            validate_quantity(line.quantity).map_err(|e| AppError::ValidationError(e.to_string()))?;
            validate_unit(&line.unit).map_err(|e| AppError::ValidationError(e.to_string()))?;

            let ordered = order_lines
                .iter()
                .find(|l| l.ingredient_id == line.ingredient_id)
                .ok_or_else(|| {
                    AppError::ValidationError(format!(
                        "Ingredient {} is not on this order",
                        line.ingredient_id
                    ))
                })?;

            if ordered.unit != line.unit.trim() {
                return Err(AppError::Validation {
                    field: "unit".into(),
                    message: format!(
                        "Unit '{}' does not match ordered unit '{}'",
                        line.unit, ordered.unit
                    ),
                });
            }

            if line.quantity > ordered.remaining() + EPSILON {
                return Err(AppError::ValidationError(format!(
                    "Received quantity {} exceeds outstanding {} for ingredient {}",
                    line.quantity,
                    ordered.remaining(),
                    line.ingredient_id
                )));
            }
        }

        let reference = input
            .external_reference
            .clone()
            .unwrap_or_else(|| order_id.to_string());

        let mut lots_created = 0usize;
        let mut movements_created = 0usize;
        let mut net_amount = Decimal::ZERO;

        for line in &reception_lines {
            let lot_id = sqlx::query_scalar::<_, Uuid>(
                "INSERT INTO lots (site_id, ingredient_id, supplier_id, lot_code, expiry_date, unit) \
                 VALUES ($1, $2, $3, $4, $5, $6) RETURNING id",
            )
            .bind(input.site_id)
            .bind(line.ingredient_id)
            .bind(order.supplier_id)
            .bind(&reference)
            .bind(line.expiry_date)
            .bind(line.unit.trim())
            .fetch_one(&mut *tx)
            .await?;
            lots_created += 1;

            LedgerService::append(
                &mut tx,
                &NewMovement {
                    kind: MovementKind::Reception,
                    site_id: input.site_id,
                    ingredient_id: line.ingredient_id,
                    lot_id: Some(lot_id),
                    quantity: line.quantity,
                    unit: line.unit.trim().to_string(),
                    external_reference: Some(reference.clone()),
                    comment: input.comment.clone(),
                },
            )
            .await?;
            movements_created += 1;

            sqlx::query(
                "UPDATE purchase_order_lines \
                 SET received_quantity = received_quantity + $1 \
                 WHERE order_id = $2 AND ingredient_id = $3",
            )
            .bind(line.quantity)
            .bind(order_id)
            .bind(line.ingredient_id)
            .execute(&mut *tx)
            .await?;

            let unit_cost = sqlx::query_scalar::<_, Decimal>(
                "SELECT unit_cost FROM ingredients WHERE id = $1",
            )
            .bind(line.ingredient_id)
            .fetch_one(&mut *tx)
            .await?;
            net_amount += line.quantity * unit_cost;
        }

        // Entries are booked on the order's date.
        let accounting_reference = accounting::record_purchase_pair(
            &mut tx,
            order_id,
            order.order_date.date_naive(),
            net_amount,
        )
        .await?;

        let updated_lines = load_lines(&mut tx, order_id).await?;
        let status = derive_status(&updated_lines);

        sqlx::query("UPDATE purchase_orders SET status = $1 WHERE id = $2")
            .bind(status.as_str())
            .bind(order_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        tracing::info!(
            order_id = %order_id,
            status = status.as_str(),
            lots = lots_created,
            "Validated goods reception"
        );

        Ok(ReceptionResult {
            order_id,
            status,
            lots_created,
            movements_created,
            net_amount,
            accounting_reference,
        })
    }

    pub async fn get_order(&self, order_id: Uuid) -> AppResult<OrderDetail> {
        let mut tx = self.db.begin().await?;
        let order = load_order(&mut tx, order_id).await?;
        let lines = load_lines(&mut tx, order_id).await?;
        tx.commit().await?;
        Ok(OrderDetail { order, lines })
    }

    pub async fn list_orders(&self, status: Option<OrderStatus>) -> AppResult<Vec<PurchaseOrder>> {
        let sql = format!(
            "SELECT {} FROM purchase_orders \
             WHERE ($1::text IS NULL OR status = $1) \
             ORDER BY order_date DESC",
            ORDER_COLUMNS
        );
        let rows = sqlx::query_as::<_, OrderRow>(&sql)
            .bind(status.map(|s| s.as_str()))
            .fetch_all(&self.db)
            .await?;
        rows.into_iter().map(PurchaseOrder::try_from).collect()
    }
}
