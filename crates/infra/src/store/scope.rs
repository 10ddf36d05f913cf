use forgecart_core::{TenantId, TenantOwned, UserId};
use forgecart_inventory::{InventoryLedger, Reservation};
use forgecart_parties::{Address, AddressId, Customer};
use forgecart_products::{Product, ProductId};
use forgecart_sales::{CartItem, CartOwner, Order, OrderId, OrderStatus};

use super::{StoreError, StoreTx};

/// Tenant-predicated view over a transaction.
///
/// Every read checks the row's tenant and every write passes the tenant down,
/// so a caller holding a scope cannot touch another tenant's rows by id.
pub struct TenantScope<'a, T: StoreTx> {
    tx: &'a mut T,
    tenant_id: TenantId,
}

impl<'a, T: StoreTx> TenantScope<'a, T> {
    pub fn new(tx: &'a mut T, tenant_id: TenantId) -> Self {
        Self { tx, tenant_id }
    }

    pub fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    fn owned<E: TenantOwned>(&self, row: Option<E>, entity: &'static str, id: impl ToString) -> Result<E, StoreError> {
        let row = row.ok_or_else(|| StoreError::not_found(entity, id))?;
        row.ensure_tenant(self.tenant_id)?;
        Ok(row)
    }

    pub async fn product(&mut self, product_id: ProductId) -> Result<Product, StoreError> {
        let row = self.tx.find_product(product_id).await?;
        self.owned(row, "product", product_id)
    }

    pub async fn address(&mut self, address_id: AddressId) -> Result<Address, StoreError> {
        let row = self.tx.find_address(address_id).await?;
        self.owned(row, "address", address_id)
    }

    /// Orders of other tenants are reported as missing rather than mismatched.
    pub async fn order(&mut self, order_id: OrderId) -> Result<Order, StoreError> {
        match self.tx.find_order(order_id).await? {
            Some(order) if order.tenant_id() == self.tenant_id => Ok(order),
            _ => Err(StoreError::not_found("order", order_id)),
        }
    }

    pub async fn set_order_status(
        &mut self,
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<(), StoreError> {
        self.tx.update_order_status(self.tenant_id, order_id, from, to).await
    }

    pub async fn customer_for_user(&mut self, user_id: UserId) -> Result<Option<Customer>, StoreError> {
        self.tx.find_customer_by_user(self.tenant_id, user_id).await
    }

    pub async fn reserve(&mut self, product_id: ProductId, quantity: i64) -> Result<Reservation, StoreError> {
        self.tx.reserve(self.tenant_id, product_id, quantity).await
    }

    pub async fn release(&mut self, product_id: ProductId, quantity: i64) -> Result<i64, StoreError> {
        self.tx.release(self.tenant_id, product_id, quantity).await
    }

    pub async fn cart(&mut self, owner: &CartOwner) -> Result<Vec<CartItem>, StoreError> {
        self.tx.list_cart_items(self.tenant_id, owner).await
    }

    pub async fn add_to_cart(
        &mut self,
        owner: &CartOwner,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<CartItem, StoreError> {
        self.tx.upsert_cart_item(self.tenant_id, owner, product_id, quantity).await
    }

    pub async fn clear_cart(&mut self, owner: &CartOwner) -> Result<u64, StoreError> {
        self.tx.delete_cart_items(self.tenant_id, owner).await
    }
}
