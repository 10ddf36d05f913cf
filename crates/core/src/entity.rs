//! Entity traits: identity + tenant ownership.

use crate::{DomainError, TenantId};

/// Entity marker + minimal interface.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}

/// An entity that belongs to exactly one tenant.
///
/// Every row read or written by a tenant-scoped operation implements this, so
/// the isolation check can be applied uniformly at the repository boundary.
pub trait TenantOwned: Entity {
    fn tenant_id(&self) -> TenantId;

    /// Fail with [`DomainError::TenantMismatch`] unless the entity belongs to `tenant_id`.
    fn ensure_tenant(&self, tenant_id: TenantId) -> Result<(), DomainError> {
        let owner = self.tenant_id();
        if owner != tenant_id {
            return Err(DomainError::tenant_mismatch(format!(
                "{:?} belongs to tenant {owner}, not {tenant_id}",
                self.id()
            )));
        }
        Ok(())
    }
}
