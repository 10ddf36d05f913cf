use async_trait::async_trait;

use forgecart_core::TenantId;
use forgecart_products::ProductId;

use crate::Reservation;

/// Race-safe stock adjustments on a single product row.
///
/// `reserve` must be one atomic conditional write ("subtract n where stock >= n").
/// Implementations never take an application-level lock around a read and a
/// separate write.
#[async_trait]
pub trait InventoryLedger {
    type Error;

    async fn reserve(
        &mut self,
        tenant_id: TenantId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<Reservation, Self::Error>;

    /// Add stock back (order cancellation). Returns the new level.
    async fn release(
        &mut self,
        tenant_id: TenantId,
        product_id: ProductId,
        quantity: i64,
    ) -> Result<i64, Self::Error>;
}
