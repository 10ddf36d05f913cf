use std::sync::Arc;

use axum::{
    Json,
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
};

use forgecart_auth::Permission;

use crate::app::dto::TenantQuery;
use crate::app::routes::common::authorized_tenant;
use crate::app::services::{self, AppServices};
use crate::context::{PrincipalContext, TenantContext};

pub async fn health() -> StatusCode {
    StatusCode::OK
}

pub async fn whoami(
    Extension(tenant): Extension<TenantContext>,
    principal: Option<Extension<PrincipalContext>>,
) -> impl IntoResponse {
    let principal = principal.map(|Extension(p)| p);
    Json(serde_json::json!({
        "tenant_id": tenant.resolved().map(|t| t.to_string()),
        "super_admin": tenant.is_super_admin(),
        "principal_id": principal.as_ref().map(|p| p.principal_id().to_string()),
        "roles": principal
            .as_ref()
            .map(|p| p.roles().iter().map(|r| r.as_str().to_string()).collect::<Vec<_>>())
            .unwrap_or_default(),
    }))
}

/// Tenant notification stream (order placed / status changed / cancelled).
pub async fn stream(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    principal: Option<Extension<PrincipalContext>>,
    Query(query): Query<TenantQuery>,
) -> axum::response::Response {
    let principal = principal.map(|Extension(p)| p);
    let tenant_id = match authorized_tenant(&tenant, principal.as_ref(), query.company_id, Permission::ORDERS_READ) {
        Ok(t) => t,
        Err(resp) => return resp,
    };
    services::tenant_sse_stream(services, tenant_id).into_response()
}
