//! Business logic services
//!
//! Every public operation that writes stock opens one transaction,
//! performs all of its reads and writes inside it, and commits once.
//! Components that take part in a larger operation receive the caller's
//! transaction instead of opening their own.

pub mod accounting;
pub mod allocator;
pub mod catalog;
pub mod ledger;
pub mod production;
pub mod purchasing;

pub use accounting::AccountingService;
pub use allocator::FefoAllocator;
pub use catalog::CatalogService;
pub use ledger::LedgerService;
pub use production::ProductionService;
pub use purchasing::PurchasingService;

/// Alias for a Postgres transaction handed between services.
pub type Tx<'a> = sqlx::Transaction<'a, sqlx::Postgres>;
