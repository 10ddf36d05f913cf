use axum::http::StatusCode;

use forgecart_auth::Permission;
use forgecart_core::TenantId;
use forgecart_infra::checkout::OrderAccess;

use crate::app::errors;
use crate::authz::{Requires, authorize_command};
use crate::context::{PrincipalContext, TenantContext};

/// Resolve the effective tenant and check `permission` for an authenticated caller.
pub fn authorized_tenant(
    tenant: &TenantContext,
    principal: Option<&PrincipalContext>,
    requested: Option<TenantId>,
    permission: &'static str,
) -> Result<TenantId, axum::response::Response> {
    let principal = principal
        .ok_or_else(|| errors::json_error(StatusCode::UNAUTHORIZED, "unauthorized", "authentication required"))?;
    let tenant_id = tenant.effective(requested).map_err(errors::tenant_error_to_response)?;
    authorize_command(tenant_id, principal, &Requires::one(permission)).map_err(errors::authz_error_to_response)?;
    Ok(tenant_id)
}

/// Staff reach every order in the tenant; everyone else only their own.
pub fn order_access(tenant_id: TenantId, principal: &PrincipalContext) -> OrderAccess {
    match authorize_command(tenant_id, principal, &Requires::one(Permission::ORDERS_ANY)) {
        Ok(()) => OrderAccess::AnyInTenant,
        Err(_) => OrderAccess::OwnedBy(principal.principal_id()),
    }
}

/// Resolve the effective tenant for an anonymous caller (header fallback only).
pub fn anonymous_tenant(
    tenant: &TenantContext,
    requested: Option<TenantId>,
) -> Result<TenantId, axum::response::Response> {
    tenant.effective(requested).map_err(errors::tenant_error_to_response)
}

pub fn parse_id<T: std::str::FromStr>(raw: &str, what: &'static str) -> Result<T, axum::response::Response> {
    raw.parse()
        .map_err(|_| errors::json_error(StatusCode::BAD_REQUEST, "invalid_id", format!("invalid {what} id")))
}
