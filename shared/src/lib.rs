//! Shared domain types and rules for the Catering Operations Platform
//!
//! This crate contains the pure parts of the stock core: movement kinds and
//! their sign rules, FEFO allocation planning, order-status derivation and
//! validation helpers. Nothing in here performs I/O.

pub mod allocation;
pub mod models;
pub mod validation;

pub use allocation::*;
pub use models::*;
pub use validation::*;
