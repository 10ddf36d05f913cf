use serde::{Deserialize, Serialize};

use forgecart_core::TenantId;

use crate::{Permission, Role};

/// A principal's membership in a tenant.
///
/// States *which tenant* the principal is acting within and which
/// roles/permissions are granted there.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TenantMembership {
    pub tenant_id: TenantId,
    pub roles: Vec<Role>,
    pub permissions: Vec<Permission>,
}

impl TenantMembership {
    pub fn from_roles(tenant_id: TenantId, roles: Vec<Role>) -> Self {
        let permissions = permissions_for_roles(&roles);
        Self {
            tenant_id,
            roles,
            permissions,
        }
    }
}

/// Static role → permission policy.
///
/// Unknown roles grant nothing.
pub fn permissions_for_roles(roles: &[Role]) -> Vec<Permission> {
    let mut out: Vec<Permission> = Vec::new();
    let mut grant = |p: &'static str| {
        if !out.iter().any(|existing| existing.as_str() == p) {
            out.push(Permission::new(p));
        }
    };

    for role in roles {
        match role.as_str() {
            Role::ADMIN | Role::SUPER_ADMIN => grant(Permission::WILDCARD),
            Role::CUSTOMER => {
                grant(Permission::CHECKOUT);
                grant(Permission::CART_READ);
                grant(Permission::CART_WRITE);
                grant(Permission::ORDERS_READ);
                grant(Permission::ORDERS_CANCEL);
            }
            Role::STAFF => {
                grant(Permission::ORDERS_READ);
                grant(Permission::ORDERS_STATUS);
                grant(Permission::ORDERS_CANCEL);
                grant(Permission::ORDERS_ANY);
            }
            _ => {}
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(perms: &[Permission]) -> Vec<&str> {
        perms.iter().map(|p| p.as_str()).collect()
    }

    #[test]
    fn admin_roles_get_wildcard() {
        assert_eq!(names(&permissions_for_roles(&[Role::new(Role::ADMIN)])), vec!["*"]);
        assert_eq!(names(&permissions_for_roles(&[Role::new(Role::SUPER_ADMIN)])), vec!["*"]);
    }

    #[test]
    fn staff_cannot_checkout() {
        let perms = permissions_for_roles(&[Role::new(Role::STAFF)]);
        assert!(!names(&perms).contains(&Permission::CHECKOUT));
        assert!(names(&perms).contains(&Permission::ORDERS_STATUS));
    }

    #[test]
    fn only_staff_reach_other_customers_orders() {
        assert!(names(&permissions_for_roles(&[Role::new(Role::STAFF)])).contains(&Permission::ORDERS_ANY));
        assert!(!names(&permissions_for_roles(&[Role::new(Role::CUSTOMER)])).contains(&Permission::ORDERS_ANY));
    }

    #[test]
    fn overlapping_roles_do_not_duplicate_permissions() {
        let perms = permissions_for_roles(&[Role::new(Role::CUSTOMER), Role::new(Role::STAFF)]);
        let reads = perms.iter().filter(|p| p.as_str() == Permission::ORDERS_READ).count();
        assert_eq!(reads, 1);
    }

    #[test]
    fn unknown_role_grants_nothing() {
        assert!(permissions_for_roles(&[Role::new("auditor")]).is_empty());
    }
}
