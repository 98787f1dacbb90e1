use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Authenticated Router Module
///
/// Routes open to any identified user. Handlers receive the caller as an
/// `AuthUser` argument; row-level rules (ownership of reviews, wishlist
/// entries and profiles) are enforced in the services.
pub fn authenticated_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // --- User ---
        .route(
            "/api/v1/user/forget-password",
            post(handlers::forget_password),
        )
        .route(
            "/api/v1/user/change-password",
            post(handlers::change_password),
        )
        // POST /api/v1/user/update/{id}
        // Owner (or admin) profile update; role changes only count for admins.
        .route("/api/v1/user/update/{id}", post(handlers::update_user))
        // --- Catalog (read) ---
        .route("/api/v1/category/list", get(handlers::list_categories))
        .route("/api/v1/product/list", get(handlers::list_products))
        // --- Review ---
        .route("/api/v1/review/create", post(handlers::create_review))
        .route("/api/v1/review/update", post(handlers::update_review))
        .route("/api/v1/review/delete", post(handlers::delete_review))
        .route("/api/v1/review/list", get(handlers::list_reviews))
        .route("/api/v1/review/summary", get(handlers::review_summary))
        // --- Wishlist ---
        .route("/api/v1/wishlist/add", post(handlers::add_to_wishlist))
        .route(
            "/api/v1/wishlist/delete/{id}",
            post(handlers::delete_from_wishlist),
        )
        .route("/api/v1/wishlist/list", get(handlers::list_wishlists))
        .route("/api/v1/wishlist/summary", get(handlers::wishlist_summary))
}
