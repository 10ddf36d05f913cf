//! Order fulfilment: checkout orchestration, customer resolution, carts.

mod cart_reconciler;
mod customer_resolver;
mod error;
mod orchestrator;

pub use cart_reconciler::CartReconciler;
pub use customer_resolver::CustomerResolver;
pub use error::{CheckoutError, CheckoutFailure, CheckoutStage};
pub use orchestrator::{CheckoutRequest, DEFAULT_PAYMENT_TIMEOUT, OrderAccess, OrderOrchestrator};
