//! Accounting projection service
//!
//! Each validated reception books a purchase pair: the net amount on the
//! purchases account and a provisional deductible tax amount. The pair is
//! keyed by `{order_id}:{reception_sequence}` so a replayed reception can
//! never double-book.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sqlx::{FromRow, PgPool};
use std::collections::HashSet;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::services::Tx;
use shared::{
    purchase_reference, AccountingEntry, EntryKind, ACCOUNT_DEDUCTIBLE_TAX, ACCOUNT_PURCHASES,
};

/// Flat provisional tax rate applied to the net purchase amount.
/// Real per-ingredient rates are a later refinement.
pub const DEDUCTIBLE_TAX_RATE: Decimal = Decimal::from_parts(20, 0, 0, false, 2);

#[derive(Clone)]
pub struct AccountingService {
    db: PgPool,
}

#[derive(Debug, FromRow)]
struct EntryRow {
    id: Uuid,
    entry_date: NaiveDate,
    kind: String,
    internal_reference: String,
    debit_amount: Decimal,
    credit_amount: Decimal,
    account_code: String,
    exported: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<EntryRow> for AccountingEntry {
    type Error = AppError;

    fn try_from(row: EntryRow) -> Result<Self, Self::Error> {
        let kind = row
            .kind
            .parse::<EntryKind>()
            .map_err(AppError::Internal)?;
        Ok(AccountingEntry {
            id: row.id,
            entry_date: row.entry_date,
            kind,
            internal_reference: row.internal_reference,
            debit_amount: row.debit_amount,
            credit_amount: row.credit_amount,
            account_code: row.account_code,
            exported: row.exported,
            created_at: row.created_at,
        })
    }
}

/// Book the purchase entry pair for one reception of `order_id`.
///
/// Runs inside the reception's transaction. The sequence number is one
/// past the number of receptions already booked for this order, so each
/// reception gets its own reference and the unique key rejects replays.
pub(crate) async fn record_purchase_pair(
    tx: &mut Tx<'_>,
    order_id: Uuid,
    entry_date: NaiveDate,
    net_amount: Decimal,
) -> AppResult<String> {
    let prior_refs = sqlx::query_scalar::<_, String>(
        "SELECT DISTINCT internal_reference FROM accounting_entries \
         WHERE kind = 'purchase' AND internal_reference LIKE $1",
    )
    .bind(format!("{}:%", order_id))
    .fetch_all(&mut **tx)
    .await?;

    let prior: HashSet<&str> = prior_refs.iter().map(String::as_str).collect();
    let sequence = prior.len() as i64 + 1;
    let reference = purchase_reference(order_id, sequence);

    let tax_amount = net_amount * DEDUCTIBLE_TAX_RATE;

    for (account, amount) in [
        (ACCOUNT_PURCHASES, net_amount),
        (ACCOUNT_DEDUCTIBLE_TAX, tax_amount),
    ] {
        sqlx::query(
            "INSERT INTO accounting_entries \
             (entry_date, kind, internal_reference, debit_amount, credit_amount, account_code, exported) \
             VALUES ($1, 'purchase', $2, $3, 0, $4, FALSE)",
        )
        .bind(entry_date)
        .bind(&reference)
        .bind(amount)
        .bind(account)
        .execute(&mut **tx)
        .await?;
    }

    tracing::info!(
        reference = %reference,
        net = %net_amount,
        tax = %tax_amount,
        "Booked purchase entry pair"
    );

    Ok(reference)
}

impl AccountingService {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    /// Entries in date order, optionally restricted to a date window.
    pub async fn list_entries(
        &self,
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> AppResult<Vec<AccountingEntry>> {
        let rows = sqlx::query_as::<_, EntryRow>(
            r#"
            SELECT id, entry_date, kind, internal_reference, debit_amount,
                   credit_amount, account_code, exported, created_at
            FROM accounting_entries
            WHERE ($1::date IS NULL OR entry_date >= $1)
              AND ($2::date IS NULL OR entry_date <= $2)
            ORDER BY entry_date, created_at
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(AccountingEntry::try_from).collect()
    }
}
