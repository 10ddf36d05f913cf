//! In-memory commerce store for tests/dev.
//!
//! Stock reservations are applied to the shared table immediately (atomic
//! check-and-decrement under the table lock) and recorded in an undo log.
//! Every other write is buffered in the transaction and only becomes visible
//! on commit. Rollback, or dropping an uncommitted transaction, restores the
//! reserved stock.
//!
//! Commit re-checks what the database enforces on its own: order status
//! writes are compare-and-set against the committed status, and a user has at
//! most one customer per tenant. A failed check rejects the whole transaction.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::Utc;

use forgecart_auth::UserAccount;
use forgecart_core::{TenantId, UserId};
use forgecart_inventory::{InventoryLedger, Reservation, StockLevel, validate_quantity};
use forgecart_parties::{Address, AddressId, Customer, CustomerId};
use forgecart_products::{Product, ProductId};
use forgecart_sales::{CartItem, CartItemId, CartOwner, Order, OrderId, OrderStatus};

use super::{CommerceStore, StoreError, StoreTx};

#[derive(Debug, Default)]
struct Tables {
    users: HashMap<UserId, UserAccount>,
    customers: HashMap<CustomerId, Customer>,
    addresses: HashMap<AddressId, Address>,
    products: HashMap<ProductId, Product>,
    orders: HashMap<OrderId, Order>,
    cart: HashMap<CartItemId, CartItem>,
}

#[derive(Debug, Default)]
struct Shared {
    tables: Mutex<Tables>,
    fail_commits: AtomicBool,
}

fn lock(shared: &Shared) -> Result<MutexGuard<'_, Tables>, StoreError> {
    shared
        .tables
        .lock()
        .map_err(|_| StoreError::Backend("in-memory store lock poisoned".to_string()))
}

/// Shared in-memory tables. Cloning shares the same data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCommerceStore {
    shared: Arc<Shared>,
}

impl InMemoryCommerceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_user(&self, user: UserAccount) {
        if let Ok(mut t) = self.shared.tables.lock() {
            t.users.insert(user.id, user);
        }
    }

    pub fn seed_product(&self, product: Product) {
        if let Ok(mut t) = self.shared.tables.lock() {
            t.products.insert(product.id, product);
        }
    }

    pub fn seed_customer(&self, customer: Customer) {
        if let Ok(mut t) = self.shared.tables.lock() {
            t.customers.insert(customer.id, customer);
        }
    }

    pub fn seed_address(&self, address: Address) {
        if let Ok(mut t) = self.shared.tables.lock() {
            t.addresses.insert(address.id, address);
        }
    }

    pub fn seed_cart_item(&self, item: CartItem) {
        if let Ok(mut t) = self.shared.tables.lock() {
            t.cart.insert(item.id, item);
        }
    }

    /// Make every subsequent commit fail (simulates a lost connection at commit time).
    pub fn fail_commits(&self, fail: bool) {
        self.shared.fail_commits.store(fail, Ordering::SeqCst);
    }

    pub fn product_stock(&self, product_id: ProductId) -> Option<i64> {
        let t = self.shared.tables.lock().ok()?;
        t.products.get(&product_id).map(|p| p.stock_quantity)
    }

    pub fn orders(&self, tenant_id: TenantId) -> Vec<Order> {
        let Ok(t) = self.shared.tables.lock() else {
            return vec![];
        };
        let mut orders: Vec<Order> = t
            .orders
            .values()
            .filter(|o| forgecart_core::TenantOwned::tenant_id(*o) == tenant_id)
            .cloned()
            .collect();
        orders.sort_by_key(|o| o.order_date());
        orders
    }

    pub fn customers(&self, tenant_id: TenantId) -> Vec<Customer> {
        let Ok(t) = self.shared.tables.lock() else {
            return vec![];
        };
        t.customers.values().filter(|c| c.tenant_id == tenant_id).cloned().collect()
    }

    pub fn addresses_of(&self, customer_id: CustomerId) -> Vec<Address> {
        let Ok(t) = self.shared.tables.lock() else {
            return vec![];
        };
        t.addresses.values().filter(|a| a.customer_id == customer_id).cloned().collect()
    }

    pub fn cart_items(&self, tenant_id: TenantId, owner: &CartOwner) -> Vec<CartItem> {
        let Ok(t) = self.shared.tables.lock() else {
            return vec![];
        };
        t.cart
            .values()
            .filter(|c| c.tenant_id == tenant_id && &c.owner == owner)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl CommerceStore for InMemoryCommerceStore {
    type Tx = InMemoryTx;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        Ok(InMemoryTx {
            shared: Arc::clone(&self.shared),
            reserved: Vec::new(),
            released: Vec::new(),
            expected_status: HashMap::new(),
            overlay: Overlay::default(),
            finished: false,
        })
    }
}

#[derive(Debug, Default)]
struct Overlay {
    customers: HashMap<CustomerId, Customer>,
    addresses: HashMap<AddressId, Address>,
    orders: HashMap<OrderId, Order>,
    cart: HashMap<CartItemId, CartItem>,
    cart_deleted: HashSet<CartItemId>,
}

/// One unit of work against [`InMemoryCommerceStore`].
#[derive(Debug)]
pub struct InMemoryTx {
    shared: Arc<Shared>,
    /// Applied decrements, undone on rollback.
    reserved: Vec<(ProductId, i64)>,
    /// Increments staged until commit.
    released: Vec<(ProductId, i64)>,
    /// Committed status each updated order must still have at commit.
    expected_status: HashMap<OrderId, OrderStatus>,
    overlay: Overlay,
    finished: bool,
}

impl InMemoryTx {
    fn undo_reservations(&mut self) {
        if self.reserved.is_empty() {
            return;
        }
        // Restoring stock must happen even if another thread panicked holding the lock.
        let mut t = self.shared.tables.lock().unwrap_or_else(PoisonError::into_inner);
        for (product_id, quantity) in self.reserved.drain(..) {
            if let Some(p) = t.products.get_mut(&product_id) {
                p.stock_quantity += quantity;
            }
        }
    }

    fn check_committed_state(&self, t: &Tables) -> Result<(), StoreError> {
        for (order_id, expected) in &self.expected_status {
            let committed = t.orders.get(order_id).map(Order::status);
            if committed != Some(*expected) {
                return Err(StoreError::Conflict(format!(
                    "order {order_id} changed concurrently: expected {expected}"
                )));
            }
        }

        for customer in self.overlay.customers.values() {
            let Some(user_id) = customer.user_id else { continue };
            let taken = t
                .customers
                .values()
                .any(|c| c.id != customer.id && c.tenant_id == customer.tenant_id && c.user_id == Some(user_id));
            if taken {
                return Err(StoreError::Conflict(format!(
                    "user {user_id} already has a customer in tenant {}",
                    customer.tenant_id
                )));
            }
        }
        Ok(())
    }

    fn order_snapshot(&self, t: &Tables, order_id: OrderId) -> Option<Order> {
        self.overlay
            .orders
            .get(&order_id)
            .or_else(|| t.orders.get(&order_id))
            .cloned()
    }

    fn cart_lines(&self, t: &Tables, tenant_id: TenantId, owner: &CartOwner) -> Vec<CartItem> {
        let matches = |c: &&CartItem| c.tenant_id == tenant_id && &c.owner == owner;
        let mut lines: Vec<CartItem> = t
            .cart
            .values()
            .filter(matches)
            .filter(|c| !self.overlay.cart_deleted.contains(&c.id) && !self.overlay.cart.contains_key(&c.id))
            .chain(self.overlay.cart.values().filter(matches))
            .cloned()
            .collect();
        lines.sort_by_key(|c| c.added_at);
        lines
    }
}

impl Drop for InMemoryTx {
    fn drop(&mut self) {
        if !self.finished {
            self.undo_reservations();
        }
    }
}

#[async_trait]
impl InventoryLedger for InMemoryTx {
    type Error = StoreError;

    async fn reserve(
        &mut self,
        tenant_id: TenantId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<Reservation, StoreError> {
        validate_quantity(quantity)?;
        let mut t = lock(&self.shared)?;
        let product = t
            .products
            .get_mut(&product_id)
            .filter(|p| p.tenant_id == tenant_id)
            .ok_or_else(|| StoreError::not_found("product", product_id))?;

        let mut level = StockLevel::new(product.stock_quantity)?;
        let outcome = level.try_reserve(quantity)?;
        if outcome.is_reserved() {
            product.stock_quantity = level.on_hand();
            self.reserved.push((product_id, quantity));
        }
        Ok(outcome)
    }

    async fn release(
        &mut self,
        tenant_id: TenantId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<i64, StoreError> {
        validate_quantity(quantity)?;
        let t = lock(&self.shared)?;
        let product = t
            .products
            .get(&product_id)
            .filter(|p| p.tenant_id == tenant_id)
            .ok_or_else(|| StoreError::not_found("product", product_id))?;

        let mut level = StockLevel::new(product.stock_quantity)?;
        for (_, staged) in self.released.iter().filter(|(id, _)| *id == product_id) {
            level.release(*staged)?;
        }
        let projected = level.release(quantity)?;
        self.released.push((product_id, quantity));
        Ok(projected)
    }
}

#[async_trait]
impl StoreTx for InMemoryTx {
    async fn find_user(&mut self, user_id: UserId) -> Result<Option<UserAccount>, StoreError> {
        let t = lock(&self.shared)?;
        Ok(t.users.get(&user_id).cloned())
    }

    async fn find_customer_by_user(
        &mut self,
        tenant_id: TenantId,
        user_id: UserId,
    ) -> Result<Option<Customer>, StoreError> {
        let is_match = |c: &&Customer| c.tenant_id == tenant_id && c.user_id == Some(user_id);
        if let Some(c) = self.overlay.customers.values().find(is_match) {
            return Ok(Some(c.clone()));
        }
        let t = lock(&self.shared)?;
        Ok(t.customers.values().find(is_match).cloned())
    }

    async fn insert_customer(&mut self, customer: &Customer) -> Result<(), StoreError> {
        let t = lock(&self.shared)?;
        if t.customers.contains_key(&customer.id) || self.overlay.customers.contains_key(&customer.id) {
            return Err(StoreError::Conflict(format!("customer {} already exists", customer.id)));
        }
        drop(t);
        self.overlay.customers.insert(customer.id, customer.clone());
        Ok(())
    }

    async fn update_customer_contact(&mut self, customer: &Customer) -> Result<(), StoreError> {
        let t = lock(&self.shared)?;
        let existing = self
            .overlay
            .customers
            .get(&customer.id)
            .or_else(|| t.customers.get(&customer.id))
            .filter(|c| c.tenant_id == customer.tenant_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("customer", customer.id))?;
        drop(t);

        let updated = Customer {
            full_name: customer.full_name.clone(),
            phone: customer.phone.clone(),
            ..existing
        };
        self.overlay.customers.insert(updated.id, updated);
        Ok(())
    }

    async fn find_address(&mut self, address_id: AddressId) -> Result<Option<Address>, StoreError> {
        if let Some(a) = self.overlay.addresses.get(&address_id) {
            return Ok(Some(a.clone()));
        }
        let t = lock(&self.shared)?;
        Ok(t.addresses.get(&address_id).cloned())
    }

    async fn insert_address(&mut self, address: &Address) -> Result<(), StoreError> {
        self.overlay.addresses.insert(address.id, address.clone());
        Ok(())
    }

    async fn find_product(&mut self, product_id: ProductId) -> Result<Option<Product>, StoreError> {
        let t = lock(&self.shared)?;
        Ok(t.products.get(&product_id).cloned())
    }

    async fn insert_order(&mut self, order: &Order) -> Result<(), StoreError> {
        let id = order.id_typed();
        let t = lock(&self.shared)?;
        if t.orders.contains_key(&id) || self.overlay.orders.contains_key(&id) {
            return Err(StoreError::Conflict(format!("order {id} already exists")));
        }
        drop(t);
        self.overlay.orders.insert(id, order.clone());
        Ok(())
    }

    async fn find_order(&mut self, order_id: OrderId) -> Result<Option<Order>, StoreError> {
        let t = lock(&self.shared)?;
        Ok(self.order_snapshot(&t, order_id))
    }

    async fn update_order_status(
        &mut self,
        tenant_id: TenantId,
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<(), StoreError> {
        let t = lock(&self.shared)?;
        let current = self
            .order_snapshot(&t, order_id)
            .filter(|o| forgecart_core::TenantOwned::tenant_id(o) == tenant_id)
            .ok_or_else(|| StoreError::not_found("order", order_id))?;
        if current.status() != from {
            return Err(StoreError::Conflict(format!("order {order_id} is no longer {from}")));
        }
        if let Some(committed) = t.orders.get(&order_id) {
            self.expected_status.entry(order_id).or_insert(committed.status());
        }
        drop(t);

        let updated = Order::from_parts(
            order_id,
            tenant_id,
            current.customer_id(),
            current.address_id(),
            to,
            current.total_amount(),
            current.order_date(),
            current.items().to_vec(),
        )?;
        self.overlay.orders.insert(order_id, updated);
        Ok(())
    }

    async fn list_cart_items(
        &mut self,
        tenant_id: TenantId,
        owner: &CartOwner,
    ) -> Result<Vec<CartItem>, StoreError> {
        let t = lock(&self.shared)?;
        Ok(self.cart_lines(&t, tenant_id, owner))
    }

    async fn upsert_cart_item(
        &mut self,
        tenant_id: TenantId,
        owner: &CartOwner,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<CartItem, StoreError> {
        let t = lock(&self.shared)?;
        let existing = self
            .cart_lines(&t, tenant_id, owner)
            .into_iter()
            .find(|c| c.product_id == product_id);
        drop(t);

        let item = match existing {
            Some(mut item) => {
                item.add(quantity)?;
                item
            }
            None => CartItem::new(tenant_id, owner.clone(), product_id, quantity, Utc::now())?,
        };
        self.overlay.cart.insert(item.id, item.clone());
        Ok(item)
    }

    async fn delete_cart_items(&mut self, tenant_id: TenantId, owner: &CartOwner) -> Result<u64, StoreError> {
        let t = lock(&self.shared)?;
        let lines = self.cart_lines(&t, tenant_id, owner);
        let base_ids: HashSet<CartItemId> = lines
            .iter()
            .filter(|c| t.cart.contains_key(&c.id))
            .map(|c| c.id)
            .collect();
        drop(t);

        for line in &lines {
            self.overlay.cart.remove(&line.id);
        }
        self.overlay.cart_deleted.extend(base_ids);
        Ok(lines.len() as u64)
    }

    async fn commit(mut self) -> Result<(), StoreError> {
        if self.shared.fail_commits.load(Ordering::SeqCst) {
            // Left unfinished: drop undoes the reservations.
            return Err(StoreError::Backend("commit failed: connection lost".to_string()));
        }

        let shared = Arc::clone(&self.shared);
        let mut t = lock(&shared)?;
        // Left unfinished on conflict: drop undoes the reservations.
        self.check_committed_state(&t)?;

        for (product_id, quantity) in self.released.drain(..) {
            if let Some(p) = t.products.get_mut(&product_id) {
                p.stock_quantity = p.stock_quantity.saturating_add(quantity);
            }
        }

        let overlay = std::mem::take(&mut self.overlay);
        t.customers.extend(overlay.customers);
        t.addresses.extend(overlay.addresses);
        t.orders.extend(overlay.orders);
        for id in overlay.cart_deleted {
            t.cart.remove(&id);
        }
        t.cart.extend(overlay.cart);

        self.reserved.clear();
        self.finished = true;
        Ok(())
    }

    async fn rollback(mut self) -> Result<(), StoreError> {
        self.undo_reservations();
        self.finished = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use forgecart_core::Money;

    fn product(tenant_id: TenantId, stock: i64) -> Product {
        Product::new(tenant_id, "SKU-1", "Widget", Money::from_minor(100), stock).unwrap()
    }

    #[tokio::test]
    async fn dropped_transaction_restores_reserved_stock() {
        let store = InMemoryCommerceStore::new();
        let tenant = TenantId::new();
        let p = product(tenant, 5);
        store.seed_product(p.clone());

        {
            let mut tx = store.begin().await.unwrap();
            let r = tx.reserve(tenant, p.id, 3).await.unwrap();
            assert_eq!(r, Reservation::Reserved { remaining: 2 });
            assert_eq!(store.product_stock(p.id), Some(2));
        }

        assert_eq!(store.product_stock(p.id), Some(5));
    }

    #[tokio::test]
    async fn reserve_is_tenant_predicated() {
        let store = InMemoryCommerceStore::new();
        let p = product(TenantId::new(), 5);
        store.seed_product(p.clone());

        let mut tx = store.begin().await.unwrap();
        let err = tx.reserve(TenantId::new(), p.id, 1).await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound { entity: "product", .. }));
    }

    #[tokio::test]
    async fn release_is_staged_until_commit() {
        let store = InMemoryCommerceStore::new();
        let tenant = TenantId::new();
        let p = product(tenant, 1);
        store.seed_product(p.clone());

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.release(tenant, p.id, 2).await.unwrap(), 3);
        assert_eq!(tx.release(tenant, p.id, 1).await.unwrap(), 4);
        assert_eq!(store.product_stock(p.id), Some(1));
        tx.commit().await.unwrap();
        assert_eq!(store.product_stock(p.id), Some(4));
    }

    #[tokio::test]
    async fn writes_are_invisible_until_commit() {
        let store = InMemoryCommerceStore::new();
        let tenant = TenantId::new();
        let owner = CartOwner::session("s-1").unwrap();
        let p = product(tenant, 1);
        store.seed_product(p.clone());

        let mut tx = store.begin().await.unwrap();
        tx.upsert_cart_item(tenant, &owner, p.id, 1).await.unwrap();
        let line = tx.upsert_cart_item(tenant, &owner, p.id, 2).await.unwrap();
        assert_eq!(line.quantity, 3);
        assert!(store.cart_items(tenant, &owner).is_empty());

        tx.commit().await.unwrap();
        assert_eq!(store.cart_items(tenant, &owner).len(), 1);

        let mut tx = store.begin().await.unwrap();
        assert_eq!(tx.delete_cart_items(tenant, &owner).await.unwrap(), 1);
        assert!(tx.list_cart_items(tenant, &owner).await.unwrap().is_empty());
        tx.rollback().await.unwrap();
        assert_eq!(store.cart_items(tenant, &owner).len(), 1);
    }

    #[tokio::test]
    async fn failed_commit_behaves_like_rollback() {
        let store = InMemoryCommerceStore::new();
        let tenant = TenantId::new();
        let p = product(tenant, 5);
        store.seed_product(p.clone());
        store.fail_commits(true);

        let mut tx = store.begin().await.unwrap();
        tx.reserve(tenant, p.id, 5).await.unwrap();
        assert!(matches!(tx.commit().await, Err(StoreError::Backend(_))));
        assert_eq!(store.product_stock(p.id), Some(5));
    }
}
