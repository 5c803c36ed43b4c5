//! HTTP request handlers

mod accounting;
mod catalog;
mod health;
mod production;
mod purchasing;
mod stock;

pub use accounting::*;
pub use catalog::*;
pub use health::*;
pub use production::*;
pub use purchasing::*;
pub use stock::*;
