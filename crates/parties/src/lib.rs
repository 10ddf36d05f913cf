//! Parties domain module (customers and their shipping addresses).
//!
//! Pure domain logic: no IO, no HTTP, no storage.

pub mod address;
pub mod customer;

pub use address::{Address, AddressId, ShippingAddressForm};
pub use customer::{ContactDefaults, Customer, CustomerForm, CustomerId};
