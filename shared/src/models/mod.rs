//! Domain models for the Catering Operations Platform

mod accounting;
mod production;
mod purchasing;
mod stock;

pub use accounting::*;
pub use production::*;
pub use purchasing::*;
pub use stock::*;
