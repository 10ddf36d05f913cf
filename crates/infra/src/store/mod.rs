//! Transactional commerce storage.
//!
//! A [`StoreTx`] is one unit of work: everything written through it becomes
//! visible on [`StoreTx::commit`] and disappears on [`StoreTx::rollback`] or
//! drop. Stock reservations go through the [`InventoryLedger`] supertrait so
//! they stay a single conditional write.

mod error;
pub mod in_memory;
pub mod postgres;
mod scope;

use async_trait::async_trait;

use forgecart_auth::UserAccount;
use forgecart_core::{TenantId, UserId};
use forgecart_inventory::InventoryLedger;
use forgecart_parties::{Address, AddressId, Customer};
use forgecart_products::{Product, ProductId};
use forgecart_sales::{CartItem, CartOwner, Order, OrderId, OrderStatus};

pub use error::StoreError;
pub use in_memory::{InMemoryCommerceStore, InMemoryTx};
pub use postgres::{PgCommerceStore, PgTx};
pub use scope::TenantScope;

/// Factory for units of work.
#[async_trait]
pub trait CommerceStore: Send + Sync {
    type Tx: StoreTx;

    async fn begin(&self) -> Result<Self::Tx, StoreError>;
}

/// Operations available inside one transaction.
///
/// Primary-key lookups return the row whatever its tenant; [`TenantScope`]
/// applies the tenant check. Writes and list queries take the tenant and use
/// it as a predicate.
#[async_trait]
pub trait StoreTx: InventoryLedger<Error = StoreError> + Send {
    async fn find_user(&mut self, user_id: UserId) -> Result<Option<UserAccount>, StoreError>;

    async fn find_customer_by_user(
        &mut self,
        tenant_id: TenantId,
        user_id: UserId,
    ) -> Result<Option<Customer>, StoreError>;

    async fn insert_customer(&mut self, customer: &Customer) -> Result<(), StoreError>;

    /// Persist name/phone changes on an existing customer.
    async fn update_customer_contact(&mut self, customer: &Customer) -> Result<(), StoreError>;

    async fn find_address(&mut self, address_id: AddressId) -> Result<Option<Address>, StoreError>;

    async fn insert_address(&mut self, address: &Address) -> Result<(), StoreError>;

    async fn find_product(&mut self, product_id: ProductId) -> Result<Option<Product>, StoreError>;

    /// Insert the order and all its items.
    async fn insert_order(&mut self, order: &Order) -> Result<(), StoreError>;

    async fn find_order(&mut self, order_id: OrderId) -> Result<Option<Order>, StoreError>;

    /// Compare-and-set on the order status: the write only applies while the
    /// stored status is still `from`, otherwise [`StoreError::Conflict`].
    async fn update_order_status(
        &mut self,
        tenant_id: TenantId,
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<(), StoreError>;

    async fn list_cart_items(
        &mut self,
        tenant_id: TenantId,
        owner: &CartOwner,
    ) -> Result<Vec<CartItem>, StoreError>;

    /// Add `quantity` to the owner's line for `product_id`, creating it if absent.
    async fn upsert_cart_item(
        &mut self,
        tenant_id: TenantId,
        owner: &CartOwner,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<CartItem, StoreError>;

    /// Bulk-delete the owner's cart lines in this tenant. Returns the number removed.
    async fn delete_cart_items(&mut self, tenant_id: TenantId, owner: &CartOwner) -> Result<u64, StoreError>;

    async fn commit(self) -> Result<(), StoreError>;

    async fn rollback(self) -> Result<(), StoreError>;
}
