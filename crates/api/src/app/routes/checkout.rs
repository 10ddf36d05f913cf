use std::sync::Arc;

use axum::{Json, extract::Extension, http::StatusCode, response::IntoResponse};

use forgecart_auth::Permission;
use forgecart_infra::checkout::CheckoutRequest;

use crate::app::dto::{CheckoutBody, OrderResponse};
use crate::app::errors;
use crate::app::routes::common::authorized_tenant;
use crate::app::services::AppServices;
use crate::context::{PrincipalContext, TenantContext};

/// POST /checkout
pub async fn create_order(
    Extension(services): Extension<Arc<AppServices>>,
    Extension(tenant): Extension<TenantContext>,
    principal: Option<Extension<PrincipalContext>>,
    Json(body): Json<CheckoutBody>,
) -> axum::response::Response {
    let principal = principal.map(|Extension(p)| p);
    let tenant_id = match authorized_tenant(&tenant, principal.as_ref(), body.company_id, Permission::CHECKOUT) {
        Ok(t) => t,
        Err(resp) => return resp,
    };
    let Some(principal) = principal else {
        return errors::json_error(StatusCode::UNAUTHORIZED, "unauthorized", "authentication required");
    };

    let acting_for = match body.user_id {
        Some(user) if user != principal.principal_id() => {
            // Ordering on behalf of someone else needs full rights in the tenant.
            if let Err(resp) = authorized_tenant(&tenant, Some(&principal), Some(tenant_id), Permission::WILDCARD) {
                return resp;
            }
            user
        }
        _ => principal.principal_id(),
    };

    let request = CheckoutRequest {
        principal_id: acting_for,
        customer: body.customer,
        address_id: body.address_id,
        shipping_address: body.shipping_address,
        payment: body.payment,
        items: body.items,
    };

    match services.place_order(tenant_id, request).await {
        Ok(order) => (StatusCode::OK, Json(OrderResponse::from(&order))).into_response(),
        Err(failure) => errors::checkout_failure_to_response(failure),
    }
}
