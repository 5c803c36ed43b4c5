//! Accounting entry models
//!
//! Entries are an append-only projection for the accounting export; no
//! business logic reads them back. `(kind, internal_reference, account_code)`
//! is unique, which makes the reception entry pair naturally idempotent.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Purchases charge account.
pub const ACCOUNT_PURCHASES: &str = "607";

/// Deductible tax account.
pub const ACCOUNT_DEDUCTIBLE_TAX: &str = "44566";

/// Journal an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    Purchase,
    Sale,
}

impl EntryKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryKind::Purchase => "purchase",
            EntryKind::Sale => "sale",
        }
    }
}

impl std::str::FromStr for EntryKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "purchase" => Ok(EntryKind::Purchase),
            "sale" => Ok(EntryKind::Sale),
            other => Err(format!("Unknown entry kind: {}", other)),
        }
    }
}

/// One accounting entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccountingEntry {
    pub id: Uuid,
    pub entry_date: NaiveDate,
    pub kind: EntryKind,
    /// Identifier of the internal source, e.g. `{order_id}:{reception_seq}`.
    pub internal_reference: String,
    pub debit_amount: Decimal,
    pub credit_amount: Decimal,
    pub account_code: String,
    pub exported: bool,
    pub created_at: DateTime<Utc>,
}

/// Idempotency reference for the nth reception of a purchase order.
pub fn purchase_reference(order_id: Uuid, reception_sequence: i64) -> String {
    format!("{}:{}", order_id, reception_sequence)
}
