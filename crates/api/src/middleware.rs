use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use tracing::debug;

use forgecart_auth::{JwtValidator, TENANT_HEADER, TenantResolutionError, TenantResolver};
use forgecart_core::TenantId;

use crate::app::errors;
use crate::context::{PrincipalContext, TenantContext};

#[derive(Clone)]
pub struct AuthState {
    pub jwt: Arc<dyn JwtValidator>,
    pub tenants: TenantResolver,
}

/// Verify the bearer token (if any), resolve the tenant and attach both to the request.
///
/// Without a credential the request proceeds anonymously only when the tenant
/// header fallback is enabled and the header names a tenant.
pub async fn auth_middleware(
    State(state): State<AuthState>,
    mut req: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let token = match extract_bearer(req.headers()) {
        Ok(token) => token,
        Err(status) => return errors::json_error(status, "unauthorized", "malformed authorization header"),
    };

    let claims = match token {
        Some(token) => match state.jwt.validate(token, Utc::now()) {
            Ok(claims) => Some(claims),
            Err(e) => {
                debug!(error = %e, "rejected bearer token");
                return errors::json_error(StatusCode::UNAUTHORIZED, "unauthorized", e.to_string());
            }
        },
        None => None,
    };

    let header = req.headers().get(TENANT_HEADER).and_then(|v| v.to_str().ok());
    let resolved = match state.tenants.resolve(claims.as_ref(), header) {
        Ok(resolved) => resolved,
        Err(TenantResolutionError::Missing) if claims.is_none() => {
            return errors::json_error(StatusCode::UNAUTHORIZED, "unauthorized", "missing credentials");
        }
        Err(e) => return errors::tenant_error_to_response(e),
    };

    let super_admin = claims.as_ref().is_some_and(|c| c.is_super_admin());
    // A super administrator without a tenant claim may name one in the header.
    let resolved = match (resolved, super_admin, header) {
        (None, true, Some(raw)) => match raw.trim().parse::<TenantId>() {
            Ok(tenant) => Some(tenant),
            Err(_) => {
                return errors::tenant_error_to_response(TenantResolutionError::Malformed(raw.to_string()));
            }
        },
        (resolved, _, _) => resolved,
    };

    req.extensions_mut().insert(TenantContext::new(resolved, super_admin));
    if let Some(claims) = claims {
        req.extensions_mut().insert(PrincipalContext::new(claims));
    }

    next.run(req).await.into_response()
}

fn extract_bearer(headers: &HeaderMap) -> Result<Option<&str>, StatusCode> {
    let Some(header) = headers.get(axum::http::header::AUTHORIZATION) else {
        return Ok(None);
    };

    let header = header.to_str().map_err(|_| StatusCode::UNAUTHORIZED)?;
    let token = header
        .strip_prefix("Bearer ")
        .ok_or(StatusCode::UNAUTHORIZED)?
        .trim();
    if token.is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(Some(token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn bearer_is_optional_but_must_be_well_formed() {
        let mut headers = HeaderMap::new();
        assert_eq!(extract_bearer(&headers), Ok(None));

        headers.insert(axum::http::header::AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(extract_bearer(&headers), Ok(Some("abc")));

        headers.insert(axum::http::header::AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(extract_bearer(&headers), Err(StatusCode::UNAUTHORIZED));

        headers.insert(axum::http::header::AUTHORIZATION, HeaderValue::from_static("Bearer   "));
        assert_eq!(extract_bearer(&headers), Err(StatusCode::UNAUTHORIZED));
    }
}
