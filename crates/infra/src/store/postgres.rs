//! Postgres-backed commerce store.
//!
//! ## Stock reservation
//!
//! `reserve` is a single predicate-guarded statement:
//!
//! ```sql
//! UPDATE products SET stock_quantity = stock_quantity - $3
//! WHERE company_id = $1 AND id = $2 AND stock_quantity >= $3
//! RETURNING stock_quantity
//! ```
//!
//! Concurrent reservations on the same row serialize on the row lock taken by
//! the `UPDATE`; the predicate is re-evaluated after the competing transaction
//! commits, so two transactions can never both take the last units. No
//! application-level lock is held.
//!
//! ## Error mapping
//!
//! | PostgreSQL code | StoreError |
//! |---|---|
//! | `23505` unique violation | `Conflict` |
//! | `23514` check violation | `Constraint` |
//! | `23503` foreign key violation | `InvalidData` |
//! | other / pool / IO | `Backend` |

use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions, PgRow};
use sqlx::{Postgres, Row, Transaction};
use tracing::instrument;
use uuid::Uuid;

use async_trait::async_trait;

use forgecart_auth::UserAccount;
use forgecart_core::{Money, TenantId, TenantOwned, UserId};
use forgecart_inventory::{InventoryLedger, Reservation, validate_quantity};
use forgecart_parties::{Address, AddressId, Customer, CustomerId};
use forgecart_products::{Product, ProductId};
use forgecart_sales::{CartItem, CartItemId, CartOwner, Order, OrderId, OrderItem, OrderStatus};

use super::{CommerceStore, StoreError, StoreTx};

const SCHEMA: &str = include_str!("../../migrations/0001_commerce.sql");

/// Pool-backed store; each [`CommerceStore::begin`] opens a database transaction.
#[derive(Debug, Clone)]
pub struct PgCommerceStore {
    pool: PgPool,
}

impl PgCommerceStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(16)
            .connect(database_url)
            .await
            .map_err(|e| map_sqlx_error("connect", e))?;
        Ok(Self::new(pool))
    }

    /// Apply the bundled schema (idempotent).
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(SCHEMA)
            .execute(&self.pool)
            .await
            .map_err(|e| map_sqlx_error("migrate", e))?;
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl CommerceStore for PgCommerceStore {
    type Tx = PgTx;

    async fn begin(&self) -> Result<Self::Tx, StoreError> {
        let tx = self.pool.begin().await.map_err(|e| map_sqlx_error("begin", e))?;
        Ok(PgTx { tx })
    }
}

/// One database transaction. Dropping it without commit rolls back.
#[derive(Debug)]
pub struct PgTx {
    tx: Transaction<'static, Postgres>,
}

fn owner_columns(owner: &CartOwner) -> (Option<Uuid>, Option<&str>) {
    match owner {
        CartOwner::Customer(id) => (Some(*id.as_uuid()), None),
        CartOwner::Session(s) => (None, Some(s.as_str())),
    }
}

#[async_trait]
impl InventoryLedger for PgTx {
    type Error = StoreError;

    #[instrument(skip(self), fields(tenant_id = %tenant_id, product_id = %product_id), err)]
    async fn reserve(
        &mut self,
        tenant_id: TenantId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<Reservation, StoreError> {
        validate_quantity(quantity)?;

        let reserved = sqlx::query(
            r#"
            UPDATE products
            SET stock_quantity = stock_quantity - $3
            WHERE company_id = $1 AND id = $2 AND stock_quantity >= $3
            RETURNING stock_quantity
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(product_id.as_uuid())
        .bind(quantity)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("reserve", e))?;

        if let Some(row) = reserved {
            let remaining: i64 = row.try_get("stock_quantity").map_err(decode_error)?;
            return Ok(Reservation::Reserved { remaining });
        }

        let available: Option<i64> = sqlx::query_scalar(
            "SELECT stock_quantity FROM products WHERE company_id = $1 AND id = $2",
        )
        .bind(tenant_id.as_uuid())
        .bind(product_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("reserve", e))?;

        match available {
            Some(available) => Ok(Reservation::InsufficientStock { available }),
            None => Err(StoreError::not_found("product", product_id)),
        }
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, product_id = %product_id), err)]
    async fn release(
        &mut self,
        tenant_id: TenantId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<i64, StoreError> {
        validate_quantity(quantity)?;

        let level: Option<i64> = sqlx::query_scalar(
            r#"
            UPDATE products
            SET stock_quantity = stock_quantity + $3
            WHERE company_id = $1 AND id = $2
            RETURNING stock_quantity
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(product_id.as_uuid())
        .bind(quantity)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("release", e))?;

        level.ok_or_else(|| StoreError::not_found("product", product_id))
    }
}

#[async_trait]
impl StoreTx for PgTx {
    async fn find_user(&mut self, user_id: UserId) -> Result<Option<UserAccount>, StoreError> {
        let row = sqlx::query("SELECT id, company_id, full_name, email, phone FROM users WHERE id = $1")
            .bind(user_id.as_uuid())
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("find_user", e))?;

        row.as_ref().map(user_from_row).transpose()
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, user_id = %user_id), err)]
    async fn find_customer_by_user(
        &mut self,
        tenant_id: TenantId,
        user_id: UserId,
    ) -> Result<Option<Customer>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, company_id, user_id, full_name, email, phone
            FROM customers
            WHERE company_id = $1 AND user_id = $2
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(user_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("find_customer_by_user", e))?;

        row.as_ref().map(customer_from_row).transpose()
    }

    async fn insert_customer(&mut self, customer: &Customer) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO customers (id, company_id, user_id, full_name, email, phone)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(customer.id.as_uuid())
        .bind(customer.tenant_id.as_uuid())
        .bind(customer.user_id.map(|u| *u.as_uuid()))
        .bind(&customer.full_name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_customer", e))?;
        Ok(())
    }

    async fn update_customer_contact(&mut self, customer: &Customer) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE customers SET full_name = $3, phone = $4 WHERE company_id = $1 AND id = $2",
        )
        .bind(customer.tenant_id.as_uuid())
        .bind(customer.id.as_uuid())
        .bind(&customer.full_name)
        .bind(&customer.phone)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("update_customer_contact", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("customer", customer.id));
        }
        Ok(())
    }

    async fn find_address(&mut self, address_id: AddressId) -> Result<Option<Address>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, company_id, customer_id, line1, line2, city, region, postal_code, country
            FROM addresses
            WHERE id = $1
            "#,
        )
        .bind(address_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("find_address", e))?;

        row.as_ref().map(address_from_row).transpose()
    }

    async fn insert_address(&mut self, address: &Address) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO addresses
                (id, company_id, customer_id, line1, line2, city, region, postal_code, country)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(address.id.as_uuid())
        .bind(address.tenant_id.as_uuid())
        .bind(address.customer_id.as_uuid())
        .bind(&address.line1)
        .bind(&address.line2)
        .bind(&address.city)
        .bind(&address.region)
        .bind(&address.postal_code)
        .bind(&address.country)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_address", e))?;
        Ok(())
    }

    async fn find_product(&mut self, product_id: ProductId) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query(
            r#"
            SELECT id, company_id, sku, name, unit_price, stock_quantity, is_active
            FROM products
            WHERE id = $1
            "#,
        )
        .bind(product_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("find_product", e))?;

        row.as_ref().map(product_from_row).transpose()
    }

    #[instrument(skip(self, order), fields(order_id = %order.id_typed(), items = order.items().len()), err)]
    async fn insert_order(&mut self, order: &Order) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, company_id, customer_id, address_id, status, total_amount, order_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(order.id_typed().as_uuid())
        .bind(order.tenant_id().as_uuid())
        .bind(order.customer_id().as_uuid())
        .bind(order.address_id().as_uuid())
        .bind(order.status().as_str())
        .bind(order.total_amount().to_i64()?)
        .bind(order.order_date())
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_order", e))?;

        for item in order.items() {
            sqlx::query(
                r#"
                INSERT INTO order_items (order_id, line_no, product_id, quantity, unit_price)
                VALUES ($1, $2, $3, $4, $5)
                "#,
            )
            .bind(order.id_typed().as_uuid())
            .bind(i32::try_from(item.line_no).map_err(|_| StoreError::InvalidData("line_no out of range".into()))?)
            .bind(item.product_id.as_uuid())
            .bind(item.quantity)
            .bind(item.unit_price.to_i64()?)
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("insert_order_item", e))?;
        }
        Ok(())
    }

    async fn find_order(&mut self, order_id: OrderId) -> Result<Option<Order>, StoreError> {
        let Some(row) = sqlx::query(
            r#"
            SELECT id, company_id, customer_id, address_id, status, total_amount, order_date
            FROM orders
            WHERE id = $1
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("find_order", e))?
        else {
            return Ok(None);
        };

        let item_rows = sqlx::query(
            r#"
            SELECT line_no, product_id, quantity, unit_price
            FROM order_items
            WHERE order_id = $1
            ORDER BY line_no ASC
            "#,
        )
        .bind(order_id.as_uuid())
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("find_order_items", e))?;

        let mut items = Vec::with_capacity(item_rows.len());
        for r in &item_rows {
            let line_no: i32 = r.try_get("line_no").map_err(decode_error)?;
            items.push(OrderItem {
                line_no: u32::try_from(line_no).map_err(|_| StoreError::InvalidData("negative line_no".into()))?,
                product_id: ProductId::from_uuid(r.try_get("product_id").map_err(decode_error)?),
                quantity: r.try_get("quantity").map_err(decode_error)?,
                unit_price: Money::from_i64(r.try_get("unit_price").map_err(decode_error)?)?,
            });
        }

        let status: String = row.try_get("status").map_err(decode_error)?;
        let order_date: DateTime<Utc> = row.try_get("order_date").map_err(decode_error)?;
        let order = Order::from_parts(
            OrderId::from_uuid(row.try_get("id").map_err(decode_error)?),
            TenantId::from_uuid(row.try_get("company_id").map_err(decode_error)?),
            CustomerId::from_uuid(row.try_get("customer_id").map_err(decode_error)?),
            AddressId::from_uuid(row.try_get("address_id").map_err(decode_error)?),
            status.parse::<OrderStatus>()?,
            Money::from_i64(row.try_get("total_amount").map_err(decode_error)?)?,
            order_date,
            items,
        )?;
        Ok(Some(order))
    }

    #[instrument(skip(self), fields(tenant_id = %tenant_id, order_id = %order_id, %from, %to), err)]
    async fn update_order_status(
        &mut self,
        tenant_id: TenantId,
        order_id: OrderId,
        from: OrderStatus,
        to: OrderStatus,
    ) -> Result<(), StoreError> {
        // Blocks on a concurrent writer's row lock, then re-evaluates the status predicate.
        let result = sqlx::query("UPDATE orders SET status = $4 WHERE company_id = $1 AND id = $2 AND status = $3")
            .bind(tenant_id.as_uuid())
            .bind(order_id.as_uuid())
            .bind(from.as_str())
            .bind(to.as_str())
            .execute(&mut *self.tx)
            .await
            .map_err(|e| map_sqlx_error("update_order_status", e))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::Conflict(format!("order {order_id} is no longer {from}")));
        }
        Ok(())
    }

    async fn list_cart_items(
        &mut self,
        tenant_id: TenantId,
        owner: &CartOwner,
    ) -> Result<Vec<CartItem>, StoreError> {
        let (customer_id, session_id) = owner_columns(owner);
        let rows = sqlx::query(
            r#"
            SELECT id, company_id, customer_id, session_id, product_id, quantity, added_at
            FROM cart_items
            WHERE company_id = $1
              AND customer_id IS NOT DISTINCT FROM $2
              AND session_id IS NOT DISTINCT FROM $3
            ORDER BY added_at ASC
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(customer_id)
        .bind(session_id)
        .fetch_all(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("list_cart_items", e))?;

        rows.iter().map(cart_item_from_row).collect()
    }

    async fn upsert_cart_item(
        &mut self,
        tenant_id: TenantId,
        owner: &CartOwner,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<CartItem, StoreError> {
        validate_quantity(quantity)?;
        let (customer_id, session_id) = owner_columns(owner);

        let updated = sqlx::query(
            r#"
            UPDATE cart_items
            SET quantity = quantity + $5
            WHERE company_id = $1
              AND customer_id IS NOT DISTINCT FROM $2
              AND session_id IS NOT DISTINCT FROM $3
              AND product_id = $4
            RETURNING id, company_id, customer_id, session_id, product_id, quantity, added_at
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(customer_id)
        .bind(session_id)
        .bind(product_id.as_uuid())
        .bind(quantity)
        .fetch_optional(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("upsert_cart_item", e))?;

        if let Some(row) = updated {
            return cart_item_from_row(&row);
        }

        let item = CartItem::new(tenant_id, owner.clone(), product_id, quantity, Utc::now())?;
        sqlx::query(
            r#"
            INSERT INTO cart_items (id, company_id, customer_id, session_id, product_id, quantity, added_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(item.id.as_uuid())
        .bind(tenant_id.as_uuid())
        .bind(customer_id)
        .bind(session_id)
        .bind(product_id.as_uuid())
        .bind(quantity)
        .bind(item.added_at)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("insert_cart_item", e))?;
        Ok(item)
    }

    async fn delete_cart_items(&mut self, tenant_id: TenantId, owner: &CartOwner) -> Result<u64, StoreError> {
        let (customer_id, session_id) = owner_columns(owner);
        let result = sqlx::query(
            r#"
            DELETE FROM cart_items
            WHERE company_id = $1
              AND customer_id IS NOT DISTINCT FROM $2
              AND session_id IS NOT DISTINCT FROM $3
            "#,
        )
        .bind(tenant_id.as_uuid())
        .bind(customer_id)
        .bind(session_id)
        .execute(&mut *self.tx)
        .await
        .map_err(|e| map_sqlx_error("delete_cart_items", e))?;
        Ok(result.rows_affected())
    }

    async fn commit(self) -> Result<(), StoreError> {
        self.tx.commit().await.map_err(|e| map_sqlx_error("commit", e))
    }

    async fn rollback(self) -> Result<(), StoreError> {
        self.tx.rollback().await.map_err(|e| map_sqlx_error("rollback", e))
    }
}

fn user_from_row(r: &PgRow) -> Result<UserAccount, StoreError> {
    Ok(UserAccount {
        id: UserId::from_uuid(r.try_get("id").map_err(decode_error)?),
        tenant_id: r
            .try_get::<Option<Uuid>, _>("company_id")
            .map_err(decode_error)?
            .map(TenantId::from_uuid),
        full_name: r.try_get("full_name").map_err(decode_error)?,
        email: r.try_get("email").map_err(decode_error)?,
        phone: r.try_get("phone").map_err(decode_error)?,
    })
}

fn address_from_row(r: &PgRow) -> Result<Address, StoreError> {
    Ok(Address {
        id: AddressId::from_uuid(r.try_get("id").map_err(decode_error)?),
        tenant_id: TenantId::from_uuid(r.try_get("company_id").map_err(decode_error)?),
        customer_id: CustomerId::from_uuid(r.try_get("customer_id").map_err(decode_error)?),
        line1: r.try_get("line1").map_err(decode_error)?,
        line2: r.try_get("line2").map_err(decode_error)?,
        city: r.try_get("city").map_err(decode_error)?,
        region: r.try_get("region").map_err(decode_error)?,
        postal_code: r.try_get("postal_code").map_err(decode_error)?,
        country: r.try_get("country").map_err(decode_error)?,
    })
}

fn product_from_row(r: &PgRow) -> Result<Product, StoreError> {
    Ok(Product {
        id: ProductId::from_uuid(r.try_get("id").map_err(decode_error)?),
        tenant_id: TenantId::from_uuid(r.try_get("company_id").map_err(decode_error)?),
        sku: r.try_get("sku").map_err(decode_error)?,
        name: r.try_get("name").map_err(decode_error)?,
        unit_price: Money::from_i64(r.try_get("unit_price").map_err(decode_error)?)?,
        stock_quantity: r.try_get("stock_quantity").map_err(decode_error)?,
        is_active: r.try_get("is_active").map_err(decode_error)?,
    })
}

fn customer_from_row(r: &PgRow) -> Result<Customer, StoreError> {
    Ok(Customer {
        id: CustomerId::from_uuid(r.try_get("id").map_err(decode_error)?),
        tenant_id: TenantId::from_uuid(r.try_get("company_id").map_err(decode_error)?),
        user_id: r
            .try_get::<Option<Uuid>, _>("user_id")
            .map_err(decode_error)?
            .map(UserId::from_uuid),
        full_name: r.try_get("full_name").map_err(decode_error)?,
        email: r.try_get("email").map_err(decode_error)?,
        phone: r.try_get("phone").map_err(decode_error)?,
    })
}

fn cart_item_from_row(r: &PgRow) -> Result<CartItem, StoreError> {
    let customer_id: Option<Uuid> = r.try_get("customer_id").map_err(decode_error)?;
    let session_id: Option<String> = r.try_get("session_id").map_err(decode_error)?;
    let owner = match (customer_id, session_id) {
        (Some(c), None) => CartOwner::Customer(CustomerId::from_uuid(c)),
        (None, Some(s)) => CartOwner::Session(s),
        _ => return Err(StoreError::InvalidData("cart item must have exactly one owner".into())),
    };

    Ok(CartItem {
        id: CartItemId::from_uuid(r.try_get("id").map_err(decode_error)?),
        tenant_id: TenantId::from_uuid(r.try_get("company_id").map_err(decode_error)?),
        owner,
        product_id: ProductId::from_uuid(r.try_get("product_id").map_err(decode_error)?),
        quantity: r.try_get("quantity").map_err(decode_error)?,
        added_at: r.try_get("added_at").map_err(decode_error)?,
    })
}

fn decode_error(err: sqlx::Error) -> StoreError {
    StoreError::InvalidData(format!("failed to decode row: {err}"))
}

/// Map SQLx errors to [`StoreError`] by SQLSTATE.
fn map_sqlx_error(operation: &str, err: sqlx::Error) -> StoreError {
    match err {
        sqlx::Error::Database(db_err) => {
            let msg = format!("database error in {}: {}", operation, db_err.message());
            match db_err.code().as_deref() {
                Some("23505") => StoreError::Conflict(msg),
                Some("23514") => StoreError::Constraint(msg),
                Some("23503") => StoreError::InvalidData(msg),
                _ => StoreError::Backend(msg),
            }
        }
        sqlx::Error::PoolClosed => StoreError::Backend(format!("connection pool closed in {operation}")),
        sqlx::Error::RowNotFound => StoreError::Backend(format!("unexpected row not found in {operation}")),
        other => StoreError::Backend(format!("sqlx error in {operation}: {other}")),
    }
}
