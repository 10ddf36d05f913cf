use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use forgecart_core::{DomainError, Entity, TenantId, TenantOwned, uuid_newtype};
use forgecart_parties::CustomerId;
use forgecart_products::ProductId;

uuid_newtype!(
    /// Cart line identifier.
    CartItemId,
    "CartItemId"
);

/// Who a cart belongs to: a known customer or an anonymous session.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum CartOwner {
    Customer(CustomerId),
    Session(String),
}

impl CartOwner {
    pub fn session(id: impl Into<String>) -> Result<Self, DomainError> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(DomainError::validation("session id cannot be empty"));
        }
        Ok(CartOwner::Session(id))
    }
}

/// Pre-order staging line. Never the source of truth for price or stock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CartItem {
    pub id: CartItemId,
    pub tenant_id: TenantId,
    pub owner: CartOwner,
    pub product_id: ProductId,
    pub quantity: i64,
    pub added_at: DateTime<Utc>,
}

impl CartItem {
    pub fn new(
        tenant_id: TenantId,
        owner: CartOwner,
        product_id: ProductId,
        quantity: i64,
        added_at: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        if quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        Ok(Self {
            id: CartItemId::new(),
            tenant_id,
            owner,
            product_id,
            quantity,
            added_at,
        })
    }

    /// Increase the line's quantity (re-adding the same product).
    pub fn add(&mut self, quantity: i64) -> Result<(), DomainError> {
        if quantity <= 0 {
            return Err(DomainError::validation("quantity must be positive"));
        }
        self.quantity = self
            .quantity
            .checked_add(quantity)
            .ok_or_else(|| DomainError::validation("cart quantity overflow"))?;
        Ok(())
    }
}

impl Entity for CartItem {
    type Id = CartItemId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl TenantOwned for CartItem {
    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_session_is_rejected() {
        assert!(CartOwner::session("  ").is_err());
        assert_eq!(CartOwner::session("abc").unwrap(), CartOwner::Session("abc".to_string()));
    }

    #[test]
    fn add_accumulates_quantity() {
        let mut item = CartItem::new(
            TenantId::new(),
            CartOwner::Customer(CustomerId::new()),
            ProductId::new(),
            2,
            Utc::now(),
        )
        .unwrap();
        item.add(3).unwrap();
        assert_eq!(item.quantity, 5);
        assert!(item.add(0).is_err());
    }

    #[test]
    fn owner_serializes_with_kind_tag() {
        let json = serde_json::to_value(CartOwner::Session("s-1".to_string())).unwrap();
        assert_eq!(json, serde_json::json!({"kind": "session", "id": "s-1"}));
    }
}
