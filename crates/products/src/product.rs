use serde::{Deserialize, Serialize};

use forgecart_core::{DomainError, Entity, Money, TenantId, TenantOwned, uuid_newtype};

uuid_newtype!(
    /// Product identifier (tenant-scoped via the row's `tenant_id`).
    ProductId,
    "ProductId"
);

/// Catalog product as read by checkout.
///
/// `stock_quantity` is never negative and is only decremented through the
/// inventory ledger's conditional reservation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub tenant_id: TenantId,
    pub sku: String,
    pub name: String,
    pub unit_price: Money,
    pub stock_quantity: i64,
    pub is_active: bool,
}

impl Product {
    pub fn new(
        tenant_id: TenantId,
        sku: impl Into<String>,
        name: impl Into<String>,
        unit_price: Money,
        stock_quantity: i64,
    ) -> Result<Self, DomainError> {
        let sku = sku.into();
        let name = name.into();
        if sku.trim().is_empty() {
            return Err(DomainError::validation("product SKU cannot be empty"));
        }
        if name.trim().is_empty() {
            return Err(DomainError::validation("product name cannot be empty"));
        }
        if stock_quantity < 0 {
            return Err(DomainError::validation("stock quantity cannot be negative"));
        }

        Ok(Self {
            id: ProductId::new(),
            tenant_id,
            sku,
            name,
            unit_price,
            stock_quantity,
            is_active: true,
        })
    }

    pub fn deactivated(mut self) -> Self {
        self.is_active = false;
        self
    }

    /// Check if the product can be sold (exists in this tenant and is active).
    pub fn ensure_sellable(&self, tenant_id: TenantId) -> Result<(), DomainError> {
        self.ensure_tenant(tenant_id)?;
        if !self.is_active {
            return Err(DomainError::invariant(format!("product {} is inactive", self.id)));
        }
        Ok(())
    }
}

impl Entity for Product {
    type Id = ProductId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}

impl TenantOwned for Product {
    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_tenant_id() -> TenantId {
        TenantId::new()
    }

    fn widget(tenant_id: TenantId) -> Product {
        Product::new(tenant_id, "SKU-001", "Widget", Money::from_minor(1250), 10).unwrap()
    }

    #[test]
    fn new_product_is_active() {
        let product = widget(test_tenant_id());
        assert!(product.is_active);
        assert_eq!(product.stock_quantity, 10);
    }

    #[test]
    fn new_product_rejects_blank_fields() {
        let tenant = test_tenant_id();
        match Product::new(tenant, "  ", "Widget", Money::ZERO, 1).unwrap_err() {
            DomainError::Validation(_) => {}
            other => panic!("Expected Validation error for empty SKU, got {other:?}"),
        }
        match Product::new(tenant, "SKU", "", Money::ZERO, 1).unwrap_err() {
            DomainError::Validation(_) => {}
            other => panic!("Expected Validation error for empty name, got {other:?}"),
        }
        match Product::new(tenant, "SKU", "Widget", Money::ZERO, -1).unwrap_err() {
            DomainError::Validation(_) => {}
            other => panic!("Expected Validation error for negative stock, got {other:?}"),
        }
    }

    #[test]
    fn inactive_product_is_not_sellable() {
        let tenant = test_tenant_id();
        let product = widget(tenant).deactivated();
        match product.ensure_sellable(tenant).unwrap_err() {
            DomainError::InvariantViolation(_) => {}
            other => panic!("Expected InvariantViolation, got {other:?}"),
        }
    }

    #[test]
    fn foreign_product_is_tenant_mismatch() {
        let product = widget(test_tenant_id());
        match product.ensure_sellable(test_tenant_id()).unwrap_err() {
            DomainError::TenantMismatch(_) => {}
            other => panic!("Expected TenantMismatch, got {other:?}"),
        }
    }

    mod proptest_tests {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// Property: any non-blank SKU/name with non-negative stock constructs.
            #[test]
            fn valid_inputs_construct(
                sku in "[A-Z0-9]{1,20}",
                name in "[A-Za-z][A-Za-z0-9 ]{0,99}",
                stock in 0i64..1_000_000,
                price in 0u64..10_000_000,
            ) {
                let product = Product::new(test_tenant_id(), sku.clone(), name, Money::from_minor(price), stock).unwrap();
                prop_assert_eq!(product.sku, sku);
                prop_assert_eq!(product.stock_quantity, stock);
            }
        }
    }
}
