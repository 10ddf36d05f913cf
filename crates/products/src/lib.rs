//! Products domain module.
//!
//! The catalog itself is managed elsewhere; this crate holds the product row
//! as seen by checkout: price, stock level and sellability.

pub mod product;

pub use product::{Product, ProductId};
