//! API-side authorization guard.
//!
//! Enforced at the route boundary, before any store work, keeping the
//! orchestrator and stores auth-agnostic.

use forgecart_auth::{AuthzError, CommandAuthorization, Permission, Principal, authorize};
use forgecart_core::TenantId;

use crate::context::PrincipalContext;

/// Permissions an operation needs.
pub struct Requires(pub Vec<Permission>);

impl Requires {
    pub fn one(name: &'static str) -> Self {
        Self(vec![Permission::new(name)])
    }
}

impl CommandAuthorization for Requires {
    fn required_permissions(&self) -> &[Permission] {
        &self.0
    }
}

/// Check the principal holds every permission the operation requires in `tenant_id`.
pub fn authorize_command<C: CommandAuthorization>(
    tenant_id: TenantId,
    principal: &PrincipalContext,
    command: &C,
) -> Result<(), AuthzError> {
    let principal = Principal::from_claims(principal.claims(), tenant_id);
    for perm in command.required_permissions() {
        authorize(&principal, perm)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use forgecart_auth::{JwtClaims, Role};
    use forgecart_core::UserId;

    fn principal(tenant: Option<TenantId>, role: &'static str) -> PrincipalContext {
        let now = Utc::now();
        PrincipalContext::new(JwtClaims {
            sub: UserId::new(),
            tenant_id: tenant,
            roles: vec![Role::new(role)],
            issued_at: now,
            expires_at: now + Duration::minutes(5),
        })
    }

    #[test]
    fn customer_may_check_out_but_not_change_status() {
        let tenant = TenantId::new();
        let p = principal(Some(tenant), Role::CUSTOMER);

        assert!(authorize_command(tenant, &p, &Requires::one(Permission::CHECKOUT)).is_ok());
        assert_eq!(
            authorize_command(tenant, &p, &Requires::one(Permission::ORDERS_STATUS)),
            Err(AuthzError::Forbidden(Permission::ORDERS_STATUS.to_string()))
        );
    }

    #[test]
    fn membership_is_bound_to_the_token_tenant() {
        let p = principal(Some(TenantId::new()), Role::ADMIN);
        assert_eq!(
            authorize_command(TenantId::new(), &p, &Requires::one(Permission::CHECKOUT)),
            Err(AuthzError::TenantMismatch)
        );
    }

    #[test]
    fn super_admin_acts_in_any_tenant() {
        let p = principal(None, Role::SUPER_ADMIN);
        assert!(authorize_command(TenantId::new(), &p, &Requires::one(Permission::ORDERS_STATUS)).is_ok());
    }
}
