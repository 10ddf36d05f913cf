use serde::Serialize;
use thiserror::Error;

use forgecart_core::DomainError;
use forgecart_products::ProductId;
use forgecart_sales::PaymentError;

use crate::store::StoreError;

/// Terminal failure of an order operation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CheckoutError {
    /// Missing or malformed input (address, items, payment fields).
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error("product {0} is inactive")]
    InactiveProduct(ProductId),

    #[error("insufficient stock for product {product_id}: requested {requested}, available {available}")]
    InsufficientStock {
        product_id: ProductId,
        requested: i64,
        available: i64,
    },

    #[error("payment declined: {0}")]
    PaymentDeclined(String),

    /// A referenced entity belongs to another tenant.
    #[error("tenant mismatch: {0}")]
    TenantMismatch(String),

    /// Underlying transaction or commit failure.
    #[error("persistence failure: {0}")]
    Persistence(String),
}

impl CheckoutError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Stable machine-readable code.
    pub fn code(&self) -> &'static str {
        match self {
            CheckoutError::Validation(_) => "validation",
            CheckoutError::NotFound { .. } => "not_found",
            CheckoutError::InactiveProduct(_) => "inactive_product",
            CheckoutError::InsufficientStock { .. } => "insufficient_stock",
            CheckoutError::PaymentDeclined(_) => "payment_declined",
            CheckoutError::TenantMismatch(_) => "tenant_mismatch",
            CheckoutError::Persistence(_) => "persistence",
        }
    }
}

impl From<StoreError> for CheckoutError {
    fn from(value: StoreError) -> Self {
        match value {
            StoreError::NotFound { entity, id } => CheckoutError::NotFound { entity, id },
            StoreError::TenantIsolation(msg) => CheckoutError::TenantMismatch(msg),
            StoreError::InvalidData(msg) => CheckoutError::Validation(msg),
            other => CheckoutError::Persistence(other.to_string()),
        }
    }
}

impl From<DomainError> for CheckoutError {
    fn from(value: DomainError) -> Self {
        match value {
            DomainError::NotFound => CheckoutError::not_found("entity", "unknown"),
            DomainError::TenantMismatch(msg) => CheckoutError::TenantMismatch(msg),
            other => CheckoutError::Validation(other.to_string()),
        }
    }
}

impl From<PaymentError> for CheckoutError {
    fn from(value: PaymentError) -> Self {
        CheckoutError::PaymentDeclined(value.to_string())
    }
}

/// Stage at which an order operation failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckoutStage {
    Validation,
    CustomerResolution,
    AddressResolution,
    PaymentAuthorization,
    StockReservation,
    Persistence,
    Commit,
    OrderLookup,
    StatusTransition,
    StockRelease,
}

impl CheckoutStage {
    pub fn as_str(self) -> &'static str {
        match self {
            CheckoutStage::Validation => "validation",
            CheckoutStage::CustomerResolution => "customer_resolution",
            CheckoutStage::AddressResolution => "address_resolution",
            CheckoutStage::PaymentAuthorization => "payment_authorization",
            CheckoutStage::StockReservation => "stock_reservation",
            CheckoutStage::Persistence => "persistence",
            CheckoutStage::Commit => "commit",
            CheckoutStage::OrderLookup => "order_lookup",
            CheckoutStage::StatusTransition => "status_transition",
            CheckoutStage::StockRelease => "stock_release",
        }
    }
}

impl core::fmt::Display for CheckoutStage {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The first failing stage and its error. Nothing was persisted.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{stage} failed: {error}")]
pub struct CheckoutFailure {
    pub stage: CheckoutStage,
    #[source]
    pub error: CheckoutError,
}

impl CheckoutFailure {
    pub fn new(stage: CheckoutStage, error: impl Into<CheckoutError>) -> Self {
        Self {
            stage,
            error: error.into(),
        }
    }
}

/// Attach a stage to any error convertible into [`CheckoutError`].
pub(crate) trait AtStage<T> {
    fn at(self, stage: CheckoutStage) -> Result<T, CheckoutFailure>;
}

impl<T, E: Into<CheckoutError>> AtStage<T> for Result<T, E> {
    fn at(self, stage: CheckoutStage) -> Result<T, CheckoutFailure> {
        self.map_err(|e| CheckoutFailure::new(stage, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_errors_map_onto_taxonomy() {
        assert_eq!(
            CheckoutError::from(StoreError::not_found("product", "p1")),
            CheckoutError::not_found("product", "p1")
        );
        assert!(matches!(
            CheckoutError::from(StoreError::TenantIsolation("x".into())),
            CheckoutError::TenantMismatch(_)
        ));
        assert!(matches!(
            CheckoutError::from(StoreError::Backend("down".into())),
            CheckoutError::Persistence(_)
        ));
        assert!(matches!(
            CheckoutError::from(StoreError::Constraint("stock".into())),
            CheckoutError::Persistence(_)
        ));
    }

    #[test]
    fn failure_display_names_stage() {
        let failure = CheckoutFailure::new(
            CheckoutStage::PaymentAuthorization,
            CheckoutError::PaymentDeclined("card declined".into()),
        );
        assert_eq!(failure.to_string(), "payment_authorization failed: payment declined: card declined");
    }
}
