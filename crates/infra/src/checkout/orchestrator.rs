//! Order creation transaction and post-commit fan-out.
//!
//! ```text
//! Initiated → CustomerResolved → AddressResolved → PaymentAuthorized
//!           → ItemsReserved → Persisted(Committed) | Aborted
//! ```
//!
//! Every stage runs inside one store transaction. The first failure rolls the
//! transaction back (including stock already reserved for earlier lines) and
//! is returned as a [`CheckoutFailure`] naming the stage. Notifications and
//! cache invalidation run only after a successful commit.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use forgecart_core::{TenantId, UserId};
use forgecart_inventory::Reservation;
use forgecart_parties::{AddressId, Customer, CustomerForm, ShippingAddressForm};
use forgecart_sales::{
    CartOwner, LineRequest, Order, OrderCancelled, OrderEvent, OrderId, OrderStatus, OrderStatusChanged,
    PaymentAuthorizer, PaymentInstrument, PricedLine, lines_from_cart, merge_duplicate_lines,
};

use crate::side_effects::{CacheInvalidator, NotificationDispatcher};
use crate::store::{CommerceStore, StoreError, StoreTx, TenantScope};

use super::error::AtStage;
use super::{CheckoutError, CheckoutFailure, CheckoutStage, CustomerResolver};

pub const DEFAULT_PAYMENT_TIMEOUT: Duration = Duration::from_secs(5);

/// Which orders of the tenant a caller may see.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderAccess {
    /// Every order in the tenant (staff, administrators).
    AnyInTenant,
    /// Only orders placed by this user's customer.
    OwnedBy(UserId),
}

/// Everything a checkout needs besides the tenant.
#[derive(Debug, Clone)]
pub struct CheckoutRequest {
    pub principal_id: UserId,
    pub customer: CustomerForm,
    pub address_id: Option<AddressId>,
    pub shipping_address: Option<ShippingAddressForm>,
    pub payment: Option<PaymentInstrument>,
    /// Empty means "use the customer's cart".
    pub items: Vec<LineRequest>,
}

/// Transaction coordinator for order creation, cancellation and status changes.
pub struct OrderOrchestrator<S> {
    store: Arc<S>,
    payments: Arc<dyn PaymentAuthorizer>,
    customers: CustomerResolver,
    notifications: NotificationDispatcher,
    cache: CacheInvalidator,
    payment_timeout: Duration,
}

impl<S> Clone for OrderOrchestrator<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            payments: Arc::clone(&self.payments),
            customers: self.customers,
            notifications: self.notifications.clone(),
            cache: self.cache.clone(),
            payment_timeout: self.payment_timeout,
        }
    }
}

impl<S> OrderOrchestrator<S>
where
    S: CommerceStore,
{
    pub fn new(
        store: Arc<S>,
        payments: Arc<dyn PaymentAuthorizer>,
        notifications: NotificationDispatcher,
        cache: CacheInvalidator,
    ) -> Self {
        Self {
            store,
            payments,
            customers: CustomerResolver::new(),
            notifications,
            cache,
            payment_timeout: DEFAULT_PAYMENT_TIMEOUT,
        }
    }

    pub fn with_payment_timeout(mut self, timeout: Duration) -> Self {
        self.payment_timeout = timeout;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Create a paid order.
    #[instrument(
        skip(self, request),
        fields(tenant_id = %tenant_id, principal_id = %request.principal_id, lines = request.items.len()),
        err
    )]
    pub async fn place_order(&self, tenant_id: TenantId, request: CheckoutRequest) -> Result<Order, CheckoutFailure> {
        let explicit = merge_duplicate_lines(&request.items).at(CheckoutStage::Validation)?;

        let mut tx = self.store.begin().await.at(CheckoutStage::Persistence)?;
        let result = self.run_checkout(&mut tx, tenant_id, &request, explicit).await;
        let order = self.finish(tx, result).await?;

        info!(order_id = %order.id_typed(), total = %order.total_amount(), "order placed");
        self.after_commit(tenant_id, OrderEvent::placed(&order, Utc::now())).await;
        Ok(order)
    }

    /// Cancel an order and return its stock.
    #[instrument(skip(self), fields(tenant_id = %tenant_id, order_id = %order_id), err)]
    pub async fn cancel_order(
        &self,
        tenant_id: TenantId,
        order_id: OrderId,
        access: OrderAccess,
    ) -> Result<Order, CheckoutFailure> {
        let mut tx = self.store.begin().await.at(CheckoutStage::Persistence)?;
        let result = self.run_cancel(&mut tx, tenant_id, order_id, access).await;
        let (order, previous_status) = self.finish(tx, result).await?;

        info!(%previous_status, "order cancelled");
        let event = OrderEvent::OrderCancelled(OrderCancelled {
            tenant_id,
            order_id,
            previous_status,
            occurred_at: Utc::now(),
        });
        self.after_commit(tenant_id, event).await;
        Ok(order)
    }

    /// Move an order along the fulfilment path (not cancellation).
    #[instrument(skip(self), fields(tenant_id = %tenant_id, order_id = %order_id, next = %next), err)]
    pub async fn transition_order(
        &self,
        tenant_id: TenantId,
        order_id: OrderId,
        next: OrderStatus,
    ) -> Result<Order, CheckoutFailure> {
        let mut tx = self.store.begin().await.at(CheckoutStage::Persistence)?;
        let result = self.run_transition(&mut tx, tenant_id, order_id, next).await;
        let (order, from) = self.finish(tx, result).await?;

        let event = OrderEvent::OrderStatusChanged(OrderStatusChanged {
            tenant_id,
            order_id,
            from,
            to: next,
            occurred_at: Utc::now(),
        });
        self.after_commit(tenant_id, event).await;
        Ok(order)
    }

    /// Tenant-scoped read. Orders of other tenants, and of other customers when
    /// `access` is [`OrderAccess::OwnedBy`], are reported as not found.
    pub async fn find_order(
        &self,
        tenant_id: TenantId,
        order_id: OrderId,
        access: OrderAccess,
    ) -> Result<Order, CheckoutFailure> {
        let mut tx = self.store.begin().await.at(CheckoutStage::Persistence)?;
        let result = load_order(&mut TenantScope::new(&mut tx, tenant_id), order_id, access)
            .await
            .at(CheckoutStage::OrderLookup);
        if let Err(e) = tx.rollback().await {
            warn!(error = %e, "read-only transaction rollback failed");
        }
        result
    }

    async fn finish<T>(&self, tx: S::Tx, result: Result<T, CheckoutFailure>) -> Result<T, CheckoutFailure> {
        match result {
            Ok(value) => {
                tx.commit().await.at(CheckoutStage::Commit)?;
                Ok(value)
            }
            Err(failure) => {
                debug!(stage = %failure.stage, error = %failure.error, "rolling back");
                if let Err(e) = tx.rollback().await {
                    warn!(error = %e, "rollback failed");
                }
                Err(failure)
            }
        }
    }

    async fn after_commit(&self, tenant_id: TenantId, event: OrderEvent) {
        self.notifications.dispatch(&event).await;
        self.cache.invalidate_tenant(tenant_id).await;
    }

    async fn run_checkout(
        &self,
        tx: &mut S::Tx,
        tenant_id: TenantId,
        request: &CheckoutRequest,
        explicit: Vec<LineRequest>,
    ) -> Result<Order, CheckoutFailure> {
        let customer = self
            .customers
            .resolve_or_create(tx, tenant_id, request.principal_id, &request.customer)
            .await
            .at(CheckoutStage::CustomerResolution)?;

        let address_id = self
            .resolve_address(tx, tenant_id, &customer, request)
            .await
            .at(CheckoutStage::AddressResolution)?;

        let owner = CartOwner::Customer(customer.id);
        let lines = if explicit.is_empty() {
            let cart = TenantScope::new(tx, tenant_id)
                .cart(&owner)
                .await
                .at(CheckoutStage::Validation)?;
            merge_duplicate_lines(&lines_from_cart(&cart)).at(CheckoutStage::Validation)?
        } else {
            explicit
        };
        if lines.is_empty() {
            return Err(CheckoutFailure::new(
                CheckoutStage::Validation,
                CheckoutError::validation("order must contain at least one item"),
            ));
        }

        self.authorize_payment(request.payment.as_ref())
            .await
            .at(CheckoutStage::PaymentAuthorization)?;

        let priced = self
            .reserve_lines(tx, tenant_id, &lines)
            .await
            .at(CheckoutStage::StockReservation)?;

        let order = Order::place(tenant_id, customer.id, address_id, &priced, Utc::now())
            .at(CheckoutStage::Persistence)?;
        tx.insert_order(&order).await.at(CheckoutStage::Persistence)?;
        let cleared = TenantScope::new(tx, tenant_id)
            .clear_cart(&owner)
            .await
            .at(CheckoutStage::Persistence)?;

        debug!(order_id = %order.id_typed(), cleared_cart_lines = cleared, "order written");
        Ok(order)
    }

    async fn resolve_address(
        &self,
        tx: &mut S::Tx,
        tenant_id: TenantId,
        customer: &Customer,
        request: &CheckoutRequest,
    ) -> Result<AddressId, CheckoutError> {
        if let Some(address_id) = request.address_id {
            let address = TenantScope::new(tx, tenant_id).address(address_id).await?;
            address.ensure_owned_by(tenant_id, customer.id)?;
            return Ok(address.id);
        }

        let form = request
            .shipping_address
            .clone()
            .ok_or_else(|| CheckoutError::validation("either address_id or shipping_address is required"))?;
        let address = form.into_address(tenant_id, customer.id)?;
        tx.insert_address(&address).await?;
        debug!(address_id = %address.id, "shipping address created");
        Ok(address.id)
    }

    async fn authorize_payment(&self, instrument: Option<&PaymentInstrument>) -> Result<(), CheckoutError> {
        let instrument =
            instrument.ok_or_else(|| CheckoutError::PaymentDeclined("no payment instrument supplied".to_string()))?;

        match tokio::time::timeout(self.payment_timeout, self.payments.authorize(instrument)).await {
            Ok(Ok(true)) => Ok(()),
            Ok(Ok(false)) => Err(CheckoutError::PaymentDeclined("payment was declined".to_string())),
            Ok(Err(e)) => Err(e.into()),
            Err(_) => {
                warn!(timeout = ?self.payment_timeout, "payment authorization timed out");
                Err(CheckoutError::PaymentDeclined(
                    "payment authorization timed out".to_string(),
                ))
            }
        }
    }

    async fn reserve_lines(
        &self,
        tx: &mut S::Tx,
        tenant_id: TenantId,
        lines: &[LineRequest],
    ) -> Result<Vec<PricedLine>, CheckoutError> {
        let mut scope = TenantScope::new(tx, tenant_id);
        let mut priced = Vec::with_capacity(lines.len());

        for line in lines {
            let product = scope.product(line.product_id).await?;
            if !product.is_active {
                return Err(CheckoutError::InactiveProduct(product.id));
            }

            match scope.reserve(line.product_id, line.quantity).await? {
                Reservation::Reserved { remaining } => {
                    debug!(product_id = %product.id, quantity = line.quantity, remaining, "stock reserved");
                    priced.push(PricedLine {
                        product_id: product.id,
                        quantity: line.quantity,
                        unit_price: product.unit_price,
                    });
                }
                Reservation::InsufficientStock { available } => {
                    return Err(CheckoutError::InsufficientStock {
                        product_id: product.id,
                        requested: line.quantity,
                        available,
                    });
                }
            }
        }

        Ok(priced)
    }

    async fn run_cancel(
        &self,
        tx: &mut S::Tx,
        tenant_id: TenantId,
        order_id: OrderId,
        access: OrderAccess,
    ) -> Result<(Order, OrderStatus), CheckoutFailure> {
        let mut scope = TenantScope::new(tx, tenant_id);
        let mut order = load_order(&mut scope, order_id, access)
            .await
            .at(CheckoutStage::OrderLookup)?;
        let previous = order.cancel().at(CheckoutStage::StatusTransition)?;

        // Status is claimed before any stock moves.
        scope
            .set_order_status(order_id, previous, OrderStatus::Cancelled)
            .await
            .map_err(status_write_error)
            .at(CheckoutStage::StatusTransition)?;

        for item in order.items() {
            let level = scope
                .release(item.product_id, item.quantity)
                .await
                .at(CheckoutStage::StockRelease)?;
            debug!(product_id = %item.product_id, quantity = item.quantity, level, "stock released");
        }
        Ok((order, previous))
    }

    async fn run_transition(
        &self,
        tx: &mut S::Tx,
        tenant_id: TenantId,
        order_id: OrderId,
        next: OrderStatus,
    ) -> Result<(Order, OrderStatus), CheckoutFailure> {
        let mut scope = TenantScope::new(tx, tenant_id);
        let mut order = scope.order(order_id).await.at(CheckoutStage::OrderLookup)?;
        let previous = order.transition(next).at(CheckoutStage::StatusTransition)?;
        scope
            .set_order_status(order_id, previous, next)
            .await
            .map_err(status_write_error)
            .at(CheckoutStage::StatusTransition)?;
        Ok((order, previous))
    }
}

async fn load_order<T: StoreTx>(
    scope: &mut TenantScope<'_, T>,
    order_id: OrderId,
    access: OrderAccess,
) -> Result<Order, StoreError> {
    let order = scope.order(order_id).await?;
    if let OrderAccess::OwnedBy(user_id) = access {
        let owns = scope
            .customer_for_user(user_id)
            .await?
            .is_some_and(|c| c.id == order.customer_id());
        if !owns {
            return Err(StoreError::not_found("order", order_id));
        }
    }
    Ok(order)
}

/// A status that moved underneath us is reported like any other illegal transition.
fn status_write_error(err: StoreError) -> CheckoutError {
    match err {
        StoreError::Conflict(msg) => CheckoutError::Validation(msg),
        other => other.into(),
    }
}
