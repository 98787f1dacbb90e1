use crate::{AppState, handlers};
use axum::{Router, routing::post};

/// Public Router Module
///
/// Account entry points. The authentication layer lets these paths through
/// untouched because they appear in `auth::PUBLIC_PATHS`; adding a route here
/// without adding it there leaves it protected.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // POST /api/v1/user/register
        // Creates an account with the `user` role.
        .route("/api/v1/user/register", post(handlers::register))
        // POST /api/v1/user/login
        // Username + password in, access + refresh token out.
        .route("/api/v1/user/login", post(handlers::login))
        // POST /api/v1/user/refresh-token
        // Refresh token in, new token pair out.
        .route("/api/v1/user/refresh-token", post(handlers::refresh_token))
}
