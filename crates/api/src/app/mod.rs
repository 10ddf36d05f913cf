//! HTTP API application wiring (Axum router + service wiring).
//!
//! - `services.rs`: store, orchestrator and side-effect wiring
//! - `routes/`: HTTP routes + handlers (one file per area)
//! - `dto.rs`: request/response DTOs
//! - `errors.rs`: consistent error responses

use std::sync::Arc;

use axum::{Extension, Router, routing::get};
use tower::ServiceBuilder;

use forgecart_auth::{Hs256JwtValidator, JwtValidator, TenantResolver};
use forgecart_infra::config::AppConfig;

use crate::middleware;

pub mod dto;
pub mod errors;
pub mod routes;
pub mod services;

/// Build the full HTTP router from configuration (public entrypoint used by `main.rs`).
pub async fn build_app(config: &AppConfig) -> Result<Router, services::ServiceBuildError> {
    let services = Arc::new(services::build_services(config).await?);
    let jwt: Arc<dyn JwtValidator> = Arc::new(Hs256JwtValidator::new(config.jwt_secret.clone().into_bytes()));
    Ok(build_router(services, jwt, TenantResolver::new(config.allow_tenant_header)))
}

/// Assemble the router around already-built services.
pub fn build_router(services: Arc<AppServices>, jwt: Arc<dyn JwtValidator>, tenants: TenantResolver) -> Router {
    let auth_state = middleware::AuthState { jwt, tenants };

    // Protected routes: require a tenant context (and usually a principal).
    let protected = routes::router()
        .layer(Extension(services))
        .layer(axum::middleware::from_fn_with_state(
            auth_state,
            middleware::auth_middleware,
        ));

    Router::new()
        .route("/health", get(routes::system::health))
        .merge(protected)
        .layer(ServiceBuilder::new())
}

pub use services::AppServices;
