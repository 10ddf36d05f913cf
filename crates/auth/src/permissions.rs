use std::borrow::Cow;

use serde::{Deserialize, Serialize};

/// Permission identifier.
///
/// Permissions are modeled as opaque strings (e.g. "orders.read").
/// The wildcard `"*"` grants everything.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Permission(Cow<'static, str>);

impl Permission {
    pub const WILDCARD: &'static str = "*";
    pub const CHECKOUT: &'static str = "checkout.create";
    pub const CART_WRITE: &'static str = "cart.write";
    pub const CART_READ: &'static str = "cart.read";
    pub const ORDERS_READ: &'static str = "orders.read";
    pub const ORDERS_CANCEL: &'static str = "orders.cancel";
    pub const ORDERS_STATUS: &'static str = "orders.status";
    /// Reach every order in the tenant, not only the caller's own.
    pub const ORDERS_ANY: &'static str = "orders.any";

    pub fn new(name: impl Into<Cow<'static, str>>) -> Self {
        Self(name.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_wildcard(&self) -> bool {
        self.as_str() == Self::WILDCARD
    }
}

impl core::fmt::Display for Permission {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(&self.0)
    }
}
