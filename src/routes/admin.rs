use crate::{AppState, handlers, policy::admin_middleware};
use axum::{
    Router, middleware,
    routing::{get, post},
};

/// Admin Router Module
///
/// Catalog management and user administration. `admin_middleware` is applied
/// as a route layer, so it only runs for requests that matched one of these
/// routes, after the authentication layer attached the caller's identity.
/// No identity is rejected with 401, a non-admin identity with 403.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // --- User ---
        .route("/api/v1/user/list", get(handlers::list_users))
        // --- Category ---
        .route("/api/v1/category/create", post(handlers::create_category))
        .route("/api/v1/category/summary", get(handlers::category_summary))
        // --- Product ---
        .route("/api/v1/product/create", post(handlers::create_product))
        .route("/api/v1/product/update", post(handlers::update_product))
        .route("/api/v1/product/delete", post(handlers::delete_product))
        .route_layer(middleware::from_fn(admin_middleware))
}
