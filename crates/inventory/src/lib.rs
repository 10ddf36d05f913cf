//! Inventory domain module.
//!
//! Stock is adjusted only through [`InventoryLedger::reserve`], a single
//! conditional decrement, and its inverse [`InventoryLedger::release`].

pub mod ledger;
pub mod stock;

pub use ledger::InventoryLedger;
pub use stock::{Reservation, StockLevel, validate_quantity};
