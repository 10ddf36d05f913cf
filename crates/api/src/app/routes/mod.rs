use axum::{
    Router,
    routing::{get, post},
};

pub mod cart;
pub mod checkout;
pub mod common;
pub mod orders;
pub mod system;

/// Router for all tenant-scoped endpoints (behind the auth middleware).
pub fn router() -> Router {
    Router::new()
        .route("/whoami", get(system::whoami))
        .route("/stream", get(system::stream))
        .route("/checkout", post(checkout::create_order))
        .nest("/orders", orders::router())
        .nest("/cart", cart::router())
}
