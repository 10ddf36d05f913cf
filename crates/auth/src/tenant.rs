//! Active-tenant resolution for a request.
//!
//! The resolved tenant is computed once at the edge and then passed
//! explicitly to every downstream call.

use core::str::FromStr;

use thiserror::Error;

use forgecart_core::TenantId;

use crate::JwtClaims;

/// Header carrying an explicit tenant for anonymous callers.
pub const TENANT_HEADER: &str = "X-Company-Id";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TenantResolutionError {
    #[error("no tenant could be determined for this request")]
    Missing,

    #[error("malformed tenant id: {0}")]
    Malformed(String),

    #[error("requested tenant {requested} does not match active tenant {active}")]
    Mismatch { active: TenantId, requested: TenantId },
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TenantResolver {
    allow_header: bool,
}

impl TenantResolver {
    pub fn new(allow_header: bool) -> Self {
        Self { allow_header }
    }

    pub fn allows_header(&self) -> bool {
        self.allow_header
    }

    /// Resolve the active tenant.
    ///
    /// The verified claim always wins. The header is consulted only when the
    /// request carries no credential and header fallback is enabled.
    /// `Ok(None)` means a super-administrator acting without a tenant.
    pub fn resolve(
        &self,
        claims: Option<&JwtClaims>,
        header: Option<&str>,
    ) -> Result<Option<TenantId>, TenantResolutionError> {
        match claims {
            Some(c) => match c.tenant_id {
                Some(t) => Ok(Some(t)),
                None if c.is_super_admin() => Ok(None),
                None => Err(TenantResolutionError::Missing),
            },
            None => {
                let raw = header
                    .filter(|_| self.allow_header)
                    .map(str::trim)
                    .filter(|h| !h.is_empty())
                    .ok_or(TenantResolutionError::Missing)?;
                TenantId::from_str(raw)
                    .map(Some)
                    .map_err(|_| TenantResolutionError::Malformed(raw.to_string()))
            }
        }
    }
}

/// Reconcile the resolved tenant with a tenant named in a request body.
///
/// Only super-administrators may name a tenant other than the resolved one.
pub fn effective_tenant(
    resolved: Option<TenantId>,
    requested: Option<TenantId>,
    is_super_admin: bool,
) -> Result<TenantId, TenantResolutionError> {
    match (resolved, requested) {
        (Some(active), None) => Ok(active),
        (Some(active), Some(req)) if req == active => Ok(active),
        (Some(_), Some(req)) if is_super_admin => Ok(req),
        (Some(active), Some(requested)) => Err(TenantResolutionError::Mismatch { active, requested }),
        (None, Some(req)) => Ok(req),
        (None, None) => Err(TenantResolutionError::Missing),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};
    use forgecart_core::UserId;

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
    fn claim_wins_over_header() {
        let claimed = TenantId::new();
        let header = TenantId::new().to_string();
        let resolver = TenantResolver::new(true);

        let resolved = resolver.resolve(Some(&claims(Some(claimed), Role::CUSTOMER)), Some(&header));
        assert_eq!(resolved, Ok(Some(claimed)));
    }

    #[test]
    fn header_ignored_when_credential_present() {
        let header = TenantId::new().to_string();
        let resolver = TenantResolver::new(true);

        let resolved = resolver.resolve(Some(&claims(None, Role::CUSTOMER)), Some(&header));
        assert_eq!(resolved, Err(TenantResolutionError::Missing));
    }

    #[test]
    fn super_admin_without_tenant_resolves_to_none() {
        let resolver = TenantResolver::default();
        assert_eq!(resolver.resolve(Some(&claims(None, Role::SUPER_ADMIN)), None), Ok(None));
    }

    #[test]
    fn anonymous_header_requires_opt_in() {
        let tenant = TenantId::new();
        let header = tenant.to_string();

        assert_eq!(
            TenantResolver::new(false).resolve(None, Some(&header)),
            Err(TenantResolutionError::Missing)
        );
        assert_eq!(TenantResolver::new(true).resolve(None, Some(&header)), Ok(Some(tenant)));
    }

    #[test]
    fn malformed_header_is_rejected() {
        let resolved = TenantResolver::new(true).resolve(None, Some("acme"));
        assert_eq!(resolved, Err(TenantResolutionError::Malformed("acme".to_string())));
    }

    #[test]
    fn effective_tenant_rules() {
        let a = TenantId::new();
        let b = TenantId::new();

        assert_eq!(effective_tenant(Some(a), None, false), Ok(a));
        assert_eq!(effective_tenant(Some(a), Some(a), false), Ok(a));
        assert_eq!(
            effective_tenant(Some(a), Some(b), false),
            Err(TenantResolutionError::Mismatch { active: a, requested: b })
        );
        assert_eq!(effective_tenant(Some(a), Some(b), true), Ok(b));
        assert_eq!(effective_tenant(None, Some(b), true), Ok(b));
        assert_eq!(effective_tenant(None, None, true), Err(TenantResolutionError::Missing));
    }
}
