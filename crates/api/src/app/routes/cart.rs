use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use forgecart_auth::Permission;
use forgecart_core::TenantId;

use crate::app::dto::{AddCartItemBody, CartQuery, CartResponse, MergeCartBody};
use crate::app::errors;
use crate::app::routes::common::{anonymous_tenant, authorized_tenant};
use crate::app::services::{AppServices, CartTarget};
use crate::context::{PrincipalContext, TenantContext};

pub fn router() -> Router {
    Router::new()
        .route("/", get(get_cart))
        .route("/items", post(add_item))
        .route("/merge", post(merge_session))
}

/// Authenticated callers use their customer cart; anonymous callers must name a session.
fn cart_target(
    tenant: &TenantContext,
    principal: Option<&PrincipalContext>,
    requested: Option<TenantId>,
    session_id: Option<String>,
    permission: &'static str,
) -> Result<(TenantId, CartTarget), axum::response::Response> {
    match principal {
        Some(p) => {
            let tenant_id = authorized_tenant(tenant, Some(p), requested, permission)?;
            Ok((tenant_id, CartTarget::Principal(p.principal_id())))
        }
        None => {
            let tenant_id = anonymous_tenant(tenant, requested)?;
            let session = session_id.ok_or_else(|| {
                errors::json_error(StatusCode::BAD_REQUEST, "validation", "session_id is required")
            })?;
            Ok((tenant_id, CartTarget::Session(session)))
        }
    }
}

pub async fn get_cart(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    principal: Option<Extension<PrincipalContext>>,
    Query(query): Query<CartQuery>,
) -> axum::response::Response {
    let principal = principal.map(|Extension(p)| p);
    let (tenant_id, target) = match cart_target(
        &tenant,
        principal.as_ref(),
        query.company_id,
        query.session_id,
        Permission::CART_READ,
    ) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.cart(tenant_id, target).await {
        Ok(items) => Json(CartResponse::new(tenant_id, &items)).into_response(),
        Err(e) => errors::checkout_error_to_response(e, None),
    }
}

pub async fn add_item(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    principal: Option<Extension<PrincipalContext>>,
    Json(body): Json<AddCartItemBody>,
) -> axum::response::Response {
    let principal = principal.map(|Extension(p)| p);
    let (tenant_id, target) = match cart_target(
        &tenant,
        principal.as_ref(),
        body.company_id,
        body.session_id,
        Permission::CART_WRITE,
    ) {
        Ok(v) => v,
        Err(resp) => return resp,
    };

    match services.add_to_cart(tenant_id, target, body.product_id, body.quantity).await {
        Ok(item) => (
            StatusCode::OK,
            Json(serde_json::json!({
                "id": item.id.to_string(),
                "product_id": item.product_id,
                "quantity": item.quantity,
            })),
        )
            .into_response(),
        Err(e) => errors::checkout_error_to_response(e, None),
    }
}

/// POST /cart/merge: fold an anonymous session cart into the caller's cart after login.
pub async fn merge_session(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    principal: Option<Extension<PrincipalContext>>,
    Json(body): Json<MergeCartBody>,
) -> axum::response::Response {
    let principal = principal.map(|Extension(p)| p);
    let tenant_id = match authorized_tenant(&tenant, principal.as_ref(), body.company_id, Permission::CART_WRITE) {
        Ok(t) => t,
        Err(resp) => return resp,
    };
    let Some(principal) = principal else {
        return errors::json_error(StatusCode::UNAUTHORIZED, "unauthorized", "authentication required");
    };

    match services
        .merge_session_cart(tenant_id, &body.session_id, principal.principal_id())
        .await
    {
        Ok(items) => Json(CartResponse::new(tenant_id, &items)).into_response(),
        Err(e) => errors::checkout_error_to_response(e, None),
    }
}
