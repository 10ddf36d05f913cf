use std::collections::HashSet;

use thiserror::Error;

use forgecart_core::{TenantId, UserId};

use crate::{JwtClaims, Permission, TenantMembership};

/// A fully resolved principal for authorization decisions.
///
/// Construction is decoupled from storage and transport: the API derives it
/// from verified claims and the resolved tenant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub principal_id: UserId,
    pub active_tenant_id: TenantId,
    pub membership: TenantMembership,
}

impl Principal {
    /// Build a principal acting in `active_tenant_id`.
    ///
    /// Membership follows the token's tenant claim; super-administrators are
    /// members of whichever tenant they act in.
    pub fn from_claims(claims: &JwtClaims, active_tenant_id: TenantId) -> Self {
        let membership_tenant = match claims.tenant_id {
            Some(t) if !claims.is_super_admin() => t,
            _ => active_tenant_id,
        };
        Self {
            principal_id: claims.sub,
            active_tenant_id,
            membership: TenantMembership::from_roles(membership_tenant, claims.roles.clone()),
        }
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthzError {
    #[error("tenant mismatch")]
    TenantMismatch,

    #[error("forbidden: missing permission '{0}'")]
    Forbidden(String),
}

/// Authorization contract for operations that require permissions.
///
/// The API layer enforces these before invoking the operation.
pub trait CommandAuthorization {
    fn required_permissions(&self) -> &[Permission];
}

/// Authorize a principal within its active tenant context.
///
/// Pure policy check: no IO, no panics.
pub fn authorize(principal: &Principal, required: &Permission) -> Result<(), AuthzError> {
    if principal.active_tenant_id != principal.membership.tenant_id {
        return Err(AuthzError::TenantMismatch);
    }

    let perms: HashSet<&str> = principal
        .membership
        .permissions
        .iter()
        .map(|p| p.as_str())
        .collect();

    if perms.contains(Permission::WILDCARD) || perms.contains(required.as_str()) {
        Ok(())
    } else {
        Err(AuthzError::Forbidden(required.as_str().to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    use crate::Role;

    fn claims(tenant: Option<TenantId>, role: &'static str) -> JwtClaims {
        let now = Utc::now();
        JwtClaims {
            sub: UserId::new(),
            tenant_id: tenant,
            roles: vec![Role::new(role)],
            issued_at: now,
            expires_at: now + Duration::minutes(5),
        }
    }

    #[test]
    fn customer_may_checkout_in_own_tenant() {
        let tenant = TenantId::new();
        let principal = Principal::from_claims(&claims(Some(tenant), Role::CUSTOMER), tenant);
        assert_eq!(authorize(&principal, &Permission::new(Permission::CHECKOUT)), Ok(()));
    }

    #[test]
    fn customer_cannot_change_status() {
        let tenant = TenantId::new();
        let principal = Principal::from_claims(&claims(Some(tenant), Role::CUSTOMER), tenant);
        assert_eq!(
            authorize(&principal, &Permission::new(Permission::ORDERS_STATUS)),
            Err(AuthzError::Forbidden(Permission::ORDERS_STATUS.to_string()))
        );
    }

    #[test]
    fn acting_outside_membership_is_tenant_mismatch() {
        let home = TenantId::new();
        let other = TenantId::new();
        let principal = Principal::from_claims(&claims(Some(home), Role::ADMIN), other);
        assert_eq!(
            authorize(&principal, &Permission::new(Permission::ORDERS_READ)),
            Err(AuthzError::TenantMismatch)
        );
    }

    #[test]
    fn super_admin_may_act_in_any_tenant() {
        let principal =
            Principal::from_claims(&claims(Some(TenantId::new()), Role::SUPER_ADMIN), TenantId::new());
        assert_eq!(authorize(&principal, &Permission::new(Permission::ORDERS_STATUS)), Ok(()));
    }
}
