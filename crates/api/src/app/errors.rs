use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde_json::json;

use forgecart_auth::{AuthzError, TenantResolutionError};
use forgecart_infra::checkout::{CheckoutError, CheckoutFailure, CheckoutStage};

/// HTTP status for an order/cart failure.
pub fn status_for(err: &CheckoutError) -> StatusCode {
    match err {
        CheckoutError::Validation(_) | CheckoutError::InactiveProduct(_) | CheckoutError::TenantMismatch(_) => {
            StatusCode::BAD_REQUEST
        }
        CheckoutError::NotFound { .. } => StatusCode::NOT_FOUND,
        CheckoutError::InsufficientStock { .. } => StatusCode::CONFLICT,
        CheckoutError::PaymentDeclined(_) => StatusCode::PAYMENT_REQUIRED,
        CheckoutError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub fn checkout_failure_to_response(failure: CheckoutFailure) -> axum::response::Response {
    checkout_error_to_response(failure.error, Some(failure.stage))
}

pub fn checkout_error_to_response(err: CheckoutError, stage: Option<CheckoutStage>) -> axum::response::Response {
    let status = status_for(&err);
    if status.is_server_error() {
        tracing::error!(error = %err, stage = stage.map(|s| s.as_str()), "order operation failed");
    }
    // Backend details stay in the logs.
    let message = match &err {
        CheckoutError::Persistence(_) => "internal persistence failure".to_string(),
        other => other.to_string(),
    };

    let mut body = json!({
        "error": err.code(),
        "message": message,
    });
    if let Some(stage) = stage {
        body["stage"] = json!(stage.as_str());
    }
    (status, axum::Json(body)).into_response()
}

pub fn authz_error_to_response(err: AuthzError) -> axum::response::Response {
    match err {
        AuthzError::TenantMismatch => json_error(StatusCode::BAD_REQUEST, "tenant_mismatch", err.to_string()),
        AuthzError::Forbidden(_) => json_error(StatusCode::FORBIDDEN, "forbidden", err.to_string()),
    }
}

pub fn tenant_error_to_response(err: TenantResolutionError) -> axum::response::Response {
    match err {
        TenantResolutionError::Mismatch { .. } => json_error(StatusCode::BAD_REQUEST, "tenant_mismatch", err.to_string()),
        TenantResolutionError::Missing | TenantResolutionError::Malformed(_) => {
            json_error(StatusCode::BAD_REQUEST, "tenant_unresolved", err.to_string())
        }
    }
}

pub fn json_error(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> axum::response::Response {
    (
        status,
        axum::Json(json!({
            "error": code,
            "message": message.into(),
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use forgecart_products::ProductId;

    #[test]
    fn failures_map_to_documented_statuses() {
        assert_eq!(status_for(&CheckoutError::validation("x")), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&CheckoutError::not_found("product", "p")), StatusCode::NOT_FOUND);
        assert_eq!(
            status_for(&CheckoutError::InsufficientStock {
                product_id: ProductId::new(),
                requested: 2,
                available: 1
            }),
            StatusCode::CONFLICT
        );
        assert_eq!(status_for(&CheckoutError::PaymentDeclined("no".into())), StatusCode::PAYMENT_REQUIRED);
        assert_eq!(status_for(&CheckoutError::TenantMismatch("t".into())), StatusCode::BAD_REQUEST);
        assert_eq!(status_for(&CheckoutError::Persistence("db".into())), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
