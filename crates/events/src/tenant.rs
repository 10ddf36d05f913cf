use forgecart_core::TenantId;
use serde_json::Value as JsonValue;

use crate::EventEnvelope;

/// Helper trait for tenant-scoped messages.
///
/// Consumers (SSE streams, notification fan-out) use this to drop messages
/// that belong to another tenant.
pub trait TenantScoped {
    fn tenant_id(&self) -> TenantId;

    fn belongs_to(&self, tenant_id: TenantId) -> bool {
        self.tenant_id() == tenant_id
    }
}

impl<E> TenantScoped for EventEnvelope<E> {
    fn tenant_id(&self) -> TenantId {
        EventEnvelope::tenant_id(self)
    }
}

/// Notification group name for a tenant (one broadcast group per company).
pub fn tenant_group(tenant_id: TenantId) -> String {
    format!("company-{tenant_id}")
}

/// Convenience alias for the JSON envelopes that cross process boundaries.
pub type JsonEnvelope = EventEnvelope<JsonValue>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_name_is_stable_per_tenant() {
        let tenant = TenantId::new();
        assert_eq!(tenant_group(tenant), tenant_group(tenant));
        assert!(tenant_group(tenant).starts_with("company-"));
        assert_ne!(tenant_group(tenant), tenant_group(TenantId::new()));
    }
}
