use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    routing::{get, post},
};

use forgecart_auth::Permission;
use forgecart_sales::{OrderId, OrderStatus};

use crate::app::dto::{OrderResponse, StatusBody, TenantQuery};
use crate::app::errors;
use crate::app::routes::common::{authorized_tenant, order_access, parse_id};
use crate::app::services::AppServices;
use crate::context::{PrincipalContext, TenantContext};

pub fn router() -> Router {
    Router::new()
        .route("/:id", get(get_order))
        .route("/:id/cancel", post(cancel_order))
        .route("/:id/status", post(change_status))
}

pub async fn get_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    principal: Option<Extension<PrincipalContext>>,
    Path(id): Path<String>,
    Query(query): Query<TenantQuery>,
) -> axum::response::Response {
    let principal = principal.map(|Extension(p)| p);
    let tenant_id = match authorized_tenant(&tenant, principal.as_ref(), query.company_id, Permission::ORDERS_READ) {
        Ok(t) => t,
        Err(resp) => return resp,
    };
    let order_id: OrderId = match parse_id(&id, "order") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(principal) = principal else {
        return errors::json_error(StatusCode::UNAUTHORIZED, "unauthorized", "authentication required");
    };

    match services.find_order(tenant_id, order_id, order_access(tenant_id, &principal)).await {
        Ok(order) => Json(OrderResponse::from(&order)).into_response(),
        Err(failure) => errors::checkout_failure_to_response(failure),
    }
}

pub async fn cancel_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    principal: Option<Extension<PrincipalContext>>,
    Path(id): Path<String>,
    Query(query): Query<TenantQuery>,
) -> axum::response::Response {
    let principal = principal.map(|Extension(p)| p);
    let tenant_id = match authorized_tenant(&tenant, principal.as_ref(), query.company_id, Permission::ORDERS_CANCEL) {
        Ok(t) => t,
        Err(resp) => return resp,
    };
    let order_id: OrderId = match parse_id(&id, "order") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let Some(principal) = principal else {
        return errors::json_error(StatusCode::UNAUTHORIZED, "unauthorized", "authentication required");
    };

    match services.cancel_order(tenant_id, order_id, order_access(tenant_id, &principal)).await {
        Ok(order) => Json(OrderResponse::from(&order)).into_response(),
        Err(failure) => errors::checkout_failure_to_response(failure),
    }
}

pub async fn change_status(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    principal: Option<Extension<PrincipalContext>>,
    Path(id): Path<String>,
    Json(body): Json<StatusBody>,
) -> axum::response::Response {
    let principal = principal.map(|Extension(p)| p);
    let tenant_id = match authorized_tenant(&tenant, principal.as_ref(), body.company_id, Permission::ORDERS_STATUS) {
        Ok(t) => t,
        Err(resp) => return resp,
    };
    let order_id: OrderId = match parse_id(&id, "order") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    let next: OrderStatus = match body.status.parse() {
        Ok(s) => s,
        Err(e) => return errors::json_error(StatusCode::BAD_REQUEST, "validation", format!("{e}")),
    };
    if next == OrderStatus::Cancelled {
        return errors::json_error(
            StatusCode::BAD_REQUEST,
            "validation",
            "use POST /orders/:id/cancel to cancel an order",
        );
    }

    match services.transition_order(tenant_id, order_id, next).await {
        Ok(order) => Json(OrderResponse::from(&order)).into_response(),
        Err(failure) => errors::checkout_failure_to_response(failure),
    }
}
