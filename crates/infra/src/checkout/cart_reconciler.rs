//! Cart staging around order creation.

use std::sync::Arc;

use tracing::{debug, instrument, warn};

use forgecart_core::{TenantId, UserId};
use forgecart_inventory::validate_quantity;
use forgecart_parties::CustomerForm;
use forgecart_products::ProductId;
use forgecart_sales::{CartItem, CartOwner};

use crate::store::{CommerceStore, StoreTx, TenantScope};

use super::{CheckoutError, CustomerResolver};

/// Adds, lists and merges cart lines. Each call is one transaction.
pub struct CartReconciler<S> {
    store: Arc<S>,
    customers: CustomerResolver,
}

impl<S> Clone for CartReconciler<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            customers: self.customers,
        }
    }
}

impl<S: CommerceStore> CartReconciler<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            customers: CustomerResolver::new(),
        }
    }

    /// Add `quantity` of an active product to the owner's cart.
    #[instrument(skip(self, owner), fields(tenant_id = %tenant_id, product_id = %product_id), err)]
    pub async fn add_item(
        &self,
        tenant_id: TenantId,
        owner: &CartOwner,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<CartItem, CheckoutError> {
        validate_quantity(quantity)?;
        let mut tx = self.store.begin().await?;
        let result = Self::add_in(&mut tx, tenant_id, owner, product_id, quantity).await;
        Self::finish(tx, result).await
    }

    /// Add to the cart of the principal's customer, creating the customer if needed.
    pub async fn add_item_for_principal(
        &self,
        tenant_id: TenantId,
        principal_id: UserId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<CartItem, CheckoutError> {
        validate_quantity(quantity)?;
        let mut tx = self.store.begin().await?;
        let result: Result<CartItem, CheckoutError> = async {
            let customer = self
                .customers
                .resolve_or_create(&mut tx, tenant_id, principal_id, &CustomerForm::default())
                .await?;
            let owner = CartOwner::Customer(customer.id);
            Self::add_in(&mut tx, tenant_id, &owner, product_id, quantity).await
        }
        .await;
        Self::finish(tx, result).await
    }

    /// Fold an anonymous session cart into the principal's customer cart.
    ///
    /// Quantities for the same product are summed; the session lines are removed.
    #[instrument(skip(self, session_id), fields(tenant_id = %tenant_id, principal_id = %principal_id), err)]
    pub async fn merge_session_cart(
        &self,
        tenant_id: TenantId,
        session_id: &str,
        principal_id: UserId,
    ) -> Result<Vec<CartItem>, CheckoutError> {
        let session = CartOwner::session(session_id)?;
        let mut tx = self.store.begin().await?;
        let result: Result<Vec<CartItem>, CheckoutError> = async {
            let customer = self
                .customers
                .resolve_or_create(&mut tx, tenant_id, principal_id, &CustomerForm::default())
                .await?;
            let target = CartOwner::Customer(customer.id);

            let mut scope = TenantScope::new(&mut tx, tenant_id);
            let session_lines = scope.cart(&session).await?;
            for line in &session_lines {
                scope.add_to_cart(&target, line.product_id, line.quantity).await?;
            }
            let removed = scope.clear_cart(&session).await?;
            debug!(merged = session_lines.len(), removed, "session cart merged");

            Ok(scope.cart(&target).await?)
        }
        .await;
        Self::finish(tx, result).await
    }

    pub async fn cart(&self, tenant_id: TenantId, owner: &CartOwner) -> Result<Vec<CartItem>, CheckoutError> {
        let mut tx = self.store.begin().await?;
        let result = TenantScope::new(&mut tx, tenant_id).cart(owner).await.map_err(CheckoutError::from);
        Self::discard(tx).await;
        result
    }

    /// The principal's customer cart; empty when no customer exists yet.
    pub async fn cart_for_principal(
        &self,
        tenant_id: TenantId,
        principal_id: UserId,
    ) -> Result<Vec<CartItem>, CheckoutError> {
        let mut tx = self.store.begin().await?;
        let result: Result<Vec<CartItem>, CheckoutError> = async {
            let mut scope = TenantScope::new(&mut tx, tenant_id);
            match scope.customer_for_user(principal_id).await? {
                Some(customer) => Ok(scope.cart(&CartOwner::Customer(customer.id)).await?),
                None => Ok(Vec::new()),
            }
        }
        .await;
        Self::discard(tx).await;
        result
    }

    async fn add_in(
        tx: &mut S::Tx,
        tenant_id: TenantId,
        owner: &CartOwner,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<CartItem, CheckoutError> {
        let mut scope = TenantScope::new(tx, tenant_id);
        let product = scope.product(product_id).await?;
        if !product.is_active {
            return Err(CheckoutError::InactiveProduct(product_id));
        }
        Ok(scope.add_to_cart(owner, product_id, quantity).await?)
    }

    async fn finish<T>(tx: S::Tx, result: Result<T, CheckoutError>) -> Result<T, CheckoutError> {
        match result {
            Ok(value) => {
                tx.commit().await?;
                Ok(value)
            }
            Err(e) => {
                Self::discard(tx).await;
                Err(e)
            }
        }
    }

    async fn discard(tx: S::Tx) {
        if let Err(e) = tx.rollback().await {
            warn!(error = %e, "cart transaction rollback failed");
        }
    }
}
