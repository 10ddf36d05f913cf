//! `forgecart-auth`: authentication/authorization boundary.
//!
//! This crate is decoupled from HTTP and storage: it validates tokens, maps
//! roles to permissions, and resolves which tenant a request acts in.

pub mod authorize;
pub mod claims;
pub mod jwt;
pub mod permissions;
pub mod principal;
pub mod roles;
pub mod tenant;
pub mod user;

pub use authorize::{AuthzError, CommandAuthorization, Principal, authorize};
pub use claims::{JwtClaims, TokenValidationError, validate_claims};
pub use jwt::{Hs256JwtValidator, JwtValidator};
pub use permissions::Permission;
pub use principal::{TenantMembership, permissions_for_roles};
pub use roles::Role;
pub use tenant::{TENANT_HEADER, TenantResolutionError, TenantResolver, effective_tenant};
pub use user::UserAccount;
