use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
    middleware,
    routing::get,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

// Credential verification, identity loading and the admin / ownership gates.
pub mod auth;
pub mod policy;

// Request validation and the per-entity services behind the handlers.
pub mod services;
pub mod validation;

// Persistence and the rate limiter's counter store.
pub mod rate_limit;
pub mod repository;

// HTTP boundary and ambient concerns.
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod response;

// Module for routing segregation (Public, Authenticated, Admin).
pub mod routes;
use routes::{admin, authenticated, public};

// --- Public Re-exports ---

pub use auth::{AuthUser, TokenService};
pub use config::AppConfig;
pub use error::AppError;
pub use rate_limit::{CounterState, MemoryCounterStore, RedisCounterStore};
pub use repository::{MemoryRepository, PostgresRepository, RepositoryState};

/// ApiDoc
///
/// Aggregates every `#[utoipa::path]` handler and payload schema into the
/// OpenAPI document served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::health_check,
        handlers::register, handlers::login, handlers::refresh_token,
        handlers::forget_password, handlers::change_password, handlers::update_user,
        handlers::list_users,
        handlers::create_category, handlers::list_categories, handlers::category_summary,
        handlers::create_product, handlers::update_product, handlers::delete_product,
        handlers::list_products,
        handlers::create_review, handlers::update_review, handlers::delete_review,
        handlers::list_reviews, handlers::review_summary,
        handlers::add_to_wishlist, handlers::delete_from_wishlist, handlers::list_wishlists,
        handlers::wishlist_summary
    ),
    components(
        schemas(
            models::Role, models::ProductStatus, models::User, models::Category,
            models::CategorySummary, models::CategoryRef, models::Product, models::Review,
            models::Wishlist, models::CountResponse, models::CategorySummaryResponse,
            models::CreateCategoryRequest, models::CreateProductRequest,
            models::UpdateProductRequest, models::DeleteProductRequest,
            models::CreateReviewRequest, models::UpdateReviewRequest,
            models::DeleteReviewRequest, models::AddToWishlistRequest,
            models::RegisterRequest, models::LoginRequest, models::TokenPair,
            models::RefreshTokenRequest, models::ChangePasswordRequest,
            models::ForgetPasswordRequest, models::UpdateUserRequest,
            error::ErrorBody, response::Empty,
        )
    ),
    tags(
        (name = "user", description = "Accounts, tokens and profiles"),
        (name = "category", description = "Product categories"),
        (name = "product", description = "Catalog"),
        (name = "review", description = "Product reviews"),
        (name = "wishlist", description = "Per-user wishlists")
    )
)]
pub struct ApiDoc;

/// AppState
///
/// The single, cloneable container shared by every request: persistence, the
/// rate limiter's counters, the token service and the immutable configuration.
/// Nothing request-specific is ever stored here.
#[derive(Clone)]
pub struct AppState {
    pub repo: RepositoryState,
    pub counters: CounterState,
    pub tokens: TokenService,
    pub config: AppConfig,
}

impl AppState {
    /// Builds the state, deriving the token service from the config's keys.
    pub fn new(repo: RepositoryState, counters: CounterState, config: AppConfig) -> Self {
        Self {
            repo,
            counters,
            tokens: TokenService::from_config(&config),
            config,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for CounterState {
    fn from_ref(app_state: &AppState) -> CounterState {
        app_state.counters.clone()
    }
}

impl FromRef<AppState> for TokenService {
    fn from_ref(app_state: &AppState) -> TokenService {
        app_state.tokens.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the routing structure and its middleware. Per API request, the
/// order is: request id and tracing, error localization, rate limiting,
/// authentication, then the admin gate on admin routes.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    // Header name constant for Request Correlation.
    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. API Router Assembly
    // The last layer added runs first: the rate limiter sees every request,
    // including those the authentication layer goes on to reject.
    let api = Router::new()
        .merge(public::public_routes())
        .merge(authenticated::authenticated_routes())
        .merge(admin::admin_routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::auth_middleware,
        ))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            rate_limit::rate_limit_middleware,
        ));

    let base_router = Router::new()
        // Liveness probe, outside authentication and rate limiting.
        .route("/health-check", get(handlers::health_check))
        // Documentation: Serve the auto-generated Swagger UI.
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(api)
        .with_state(state)
        // Re-renders error bodies for `Accept-Language: vi`.
        .layer(middleware::from_fn(error::localize_errors));

    // 3. Observability and Correlation Layers
    base_router
        .layer(
            ServiceBuilder::new()
                // 3a. Request ID Generation: a UUID for every incoming request.
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                // 3b. Request Tracing: one span per request carrying the request id.
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                // 3c. Request ID Propagation: echo x-request-id back to the client.
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        // 4. CORS Layer
        .layer(cors)
}

/// trace_span_logger
///
/// Span factory for `TraceLayer`: method, uri and the `x-request-id` header, so
/// every log line for one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
