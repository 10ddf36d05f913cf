//! Infrastructure layer: stores, checkout orchestration, side effects and config.

pub mod checkout;
pub mod config;
pub mod side_effects;
pub mod store;
