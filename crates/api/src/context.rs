use forgecart_auth::{JwtClaims, Role, TenantResolutionError, effective_tenant};
use forgecart_core::{TenantId, UserId};

/// Tenant context for a request.
///
/// Resolved once by the auth middleware and passed explicitly to every
/// downstream call. `resolved` is `None` only for a super-administrator
/// acting without a tenant claim.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct TenantContext {
    resolved: Option<TenantId>,
    super_admin: bool,
}

impl TenantContext {
    pub fn new(resolved: Option<TenantId>, super_admin: bool) -> Self {
        Self { resolved, super_admin }
    }

    pub fn resolved(&self) -> Option<TenantId> {
        self.resolved
    }

    pub fn is_super_admin(&self) -> bool {
        self.super_admin
    }

    /// Reconcile a tenant named by the request (body or query) with the resolved one.
    pub fn effective(&self, requested: Option<TenantId>) -> Result<TenantId, TenantResolutionError> {
        effective_tenant(self.resolved, requested, self.super_admin)
    }
}

/// Authenticated identity for a request. Absent for anonymous (header-only) requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrincipalContext {
    claims: JwtClaims,
}

impl PrincipalContext {
    pub fn new(claims: JwtClaims) -> Self {
        Self { claims }
    }

    pub fn principal_id(&self) -> UserId {
        self.claims.sub
    }

    pub fn roles(&self) -> &[Role] {
        &self.claims.roles
    }

    pub fn claims(&self) -> &JwtClaims {
        &self.claims
    }
}
