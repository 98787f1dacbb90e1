use axum::extract::State;
use uuid::Uuid;

use crate::{
    AppState,
    auth::AuthUser,
    error::{AppError, ErrorBody},
    models::{
        AddToWishlistRequest, Category, CategorySummaryResponse, ChangePasswordRequest,
        CountResponse, CreateCategoryRequest, CreateProductRequest, CreateReviewRequest,
        DeleteProductRequest, DeleteReviewRequest, ForgetPasswordRequest, ListCategoriesQuery,
        ListProductsQuery, ListReviewsQuery, ListUsersQuery, ListWishlistsQuery, LoginRequest,
        Page, Product, RefreshTokenRequest, RegisterRequest, Review, TokenPair,
        UpdateProductRequest, UpdateReviewRequest, UpdateUserRequest, User, Wishlist,
    },
    response::{ApiResponse, AppJson, AppPath, AppQuery, Empty},
    services::{
        CATALOG_DEADLINE, DEFAULT_DEADLINE, category, product, review, user, wishlist,
        with_deadline,
    },
};

type ApiResult<T> = Result<ApiResponse<T>, AppError>;

// --- Health ---

/// health_check
///
/// Liveness probe. Mounted outside authentication and rate limiting.
#[utoipa::path(
    get,
    path = "/health-check",
    responses((status = 200, description = "Service is up", body = String))
)]
pub async fn health_check() -> &'static str {
    "OK"
}

// --- User ---

/// register
///
/// [Public Route] Creates an account with the `user` role.
#[utoipa::path(
    post,
    path = "/api/v1/user/register",
    tag = "user",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Registered", body = User),
        (status = 400, description = "Validation failure or username taken", body = ErrorBody)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    AppJson(req): AppJson<RegisterRequest>,
) -> ApiResult<User> {
    let created = with_deadline(DEFAULT_DEADLINE, user::register(state.repo.as_ref(), req)).await?;
    Ok(ApiResponse::created(created))
}

/// login
///
/// [Public Route] Exchanges username and password for a token pair.
#[utoipa::path(
    post,
    path = "/api/v1/user/login",
    tag = "user",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token pair", body = TokenPair),
        (status = 400, description = "Unknown user or wrong password", body = ErrorBody)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    AppJson(req): AppJson<LoginRequest>,
) -> ApiResult<TokenPair> {
    let pair = with_deadline(
        DEFAULT_DEADLINE,
        user::login(state.repo.as_ref(), &state.tokens, req),
    )
    .await?;
    Ok(ApiResponse::ok(pair))
}

#[utoipa::path(
    post,
    path = "/api/v1/user/refresh-token",
    tag = "user",
    request_body = RefreshTokenRequest,
    responses(
        (status = 200, description = "New token pair", body = TokenPair),
        (status = 401, description = "Refresh token expired or invalid", body = ErrorBody)
    )
)]
pub async fn refresh_token(
    State(state): State<AppState>,
    AppJson(req): AppJson<RefreshTokenRequest>,
) -> ApiResult<TokenPair> {
    let pair = with_deadline(
        DEFAULT_DEADLINE,
        user::refresh(state.repo.as_ref(), &state.tokens, req),
    )
    .await?;
    Ok(ApiResponse::ok(pair))
}

/// forget_password
///
/// [Authenticated Route] Resets the password of the named account.
#[utoipa::path(
    post,
    path = "/api/v1/user/forget-password",
    tag = "user",
    request_body = ForgetPasswordRequest,
    responses(
        (status = 200, description = "Password reset", body = Empty),
        (status = 400, description = "Unknown user", body = ErrorBody)
    )
)]
pub async fn forget_password(
    caller: AuthUser,
    State(state): State<AppState>,
    AppJson(req): AppJson<ForgetPasswordRequest>,
) -> ApiResult<Empty> {
    with_deadline(
        DEFAULT_DEADLINE,
        user::forget_password(state.repo.as_ref(), &caller, req),
    )
    .await?;
    Ok(ApiResponse::ok(Empty {}))
}

/// change_password
///
/// [Authenticated Route] Changes a password after re-verifying the old one.
/// Subject to the ownership rule.
#[utoipa::path(
    post,
    path = "/api/v1/user/change-password",
    tag = "user",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = Empty),
        (status = 400, description = "Wrong old password", body = ErrorBody),
        (status = 401, description = "Not allowed to act on this user", body = ErrorBody)
    )
)]
pub async fn change_password(
    caller: AuthUser,
    State(state): State<AppState>,
    AppJson(req): AppJson<ChangePasswordRequest>,
) -> ApiResult<Empty> {
    with_deadline(
        DEFAULT_DEADLINE,
        user::change_password(
            state.repo.as_ref(),
            state.config.ownership_rule,
            &caller,
            req,
        ),
    )
    .await?;
    Ok(ApiResponse::ok(Empty {}))
}

/// update_user
///
/// [Authenticated Route] Partial profile update. Subject to the ownership rule.
#[utoipa::path(
    post,
    path = "/api/v1/user/update/{id}",
    tag = "user",
    params(("id" = Uuid, Path, description = "User id")),
    request_body = UpdateUserRequest,
    responses(
        (status = 200, description = "Updated user", body = User),
        (status = 400, description = "Validation failure or username taken", body = ErrorBody),
        (status = 401, description = "Not allowed to act on this user", body = ErrorBody)
    )
)]
pub async fn update_user(
    caller: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(req): AppJson<UpdateUserRequest>,
) -> ApiResult<User> {
    let updated = with_deadline(
        DEFAULT_DEADLINE,
        user::update(
            state.repo.as_ref(),
            state.config.ownership_rule,
            &caller,
            id,
            req,
        ),
    )
    .await?;
    Ok(ApiResponse::ok(updated))
}

/// list_users
///
/// [Admin Route] Paged user listing.
#[utoipa::path(
    get,
    path = "/api/v1/user/list",
    tag = "user",
    params(ListUsersQuery),
    responses(
        (status = 200, description = "Users", body = Page<User>),
        (status = 403, description = "Not an admin", body = ErrorBody)
    )
)]
pub async fn list_users(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ListUsersQuery>,
) -> ApiResult<Page<User>> {
    let page = with_deadline(DEFAULT_DEADLINE, user::list(state.repo.as_ref(), query)).await?;
    Ok(ApiResponse::ok(page))
}

// --- Category ---

/// create_category
///
/// [Admin Route]
#[utoipa::path(
    post,
    path = "/api/v1/category/create",
    tag = "category",
    request_body = CreateCategoryRequest,
    responses(
        (status = 201, description = "Created", body = Category),
        (status = 400, description = "Validation failure or name taken", body = ErrorBody),
        (status = 403, description = "Not an admin", body = ErrorBody)
    )
)]
pub async fn create_category(
    State(state): State<AppState>,
    AppJson(req): AppJson<CreateCategoryRequest>,
) -> ApiResult<Category> {
    let created =
        with_deadline(CATALOG_DEADLINE, category::create(state.repo.as_ref(), req)).await?;
    Ok(ApiResponse::created(created))
}

#[utoipa::path(
    get,
    path = "/api/v1/category/list",
    tag = "category",
    params(ListCategoriesQuery),
    responses((status = 200, description = "Categories", body = Page<Category>))
)]
pub async fn list_categories(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ListCategoriesQuery>,
) -> ApiResult<Page<Category>> {
    let page = with_deadline(CATALOG_DEADLINE, category::list(state.repo.as_ref(), query)).await?;
    Ok(ApiResponse::ok(page))
}

/// category_summary
///
/// [Admin Route] Every category with its product count.
#[utoipa::path(
    get,
    path = "/api/v1/category/summary",
    tag = "category",
    responses(
        (status = 200, description = "Summary", body = CategorySummaryResponse),
        (status = 403, description = "Not an admin", body = ErrorBody)
    )
)]
pub async fn category_summary(State(state): State<AppState>) -> ApiResult<CategorySummaryResponse> {
    let summary = with_deadline(CATALOG_DEADLINE, category::summary(state.repo.as_ref())).await?;
    Ok(ApiResponse::ok(summary))
}

// --- Product ---

/// create_product
///
/// [Admin Route] The referenced category must exist.
#[utoipa::path(
    post,
    path = "/api/v1/product/create",
    tag = "product",
    request_body = CreateProductRequest,
    responses(
        (status = 201, description = "Created", body = Product),
        (status = 400, description = "Validation failure, unknown category or name taken", body = ErrorBody),
        (status = 403, description = "Not an admin", body = ErrorBody)
    )
)]
pub async fn create_product(
    State(state): State<AppState>,
    AppJson(req): AppJson<CreateProductRequest>,
) -> ApiResult<Product> {
    let created = with_deadline(CATALOG_DEADLINE, product::create(state.repo.as_ref(), req)).await?;
    Ok(ApiResponse::created(created))
}

/// update_product
///
/// [Admin Route]
#[utoipa::path(
    post,
    path = "/api/v1/product/update",
    tag = "product",
    request_body = UpdateProductRequest,
    responses(
        (status = 200, description = "Updated", body = Product),
        (status = 400, description = "Unknown product or category", body = ErrorBody),
        (status = 403, description = "Not an admin", body = ErrorBody)
    )
)]
pub async fn update_product(
    State(state): State<AppState>,
    AppJson(req): AppJson<UpdateProductRequest>,
) -> ApiResult<Product> {
    let updated = with_deadline(CATALOG_DEADLINE, product::update(state.repo.as_ref(), req)).await?;
    Ok(ApiResponse::ok(updated))
}

/// delete_product
///
/// [Admin Route] Reviews and wishlist entries of the product go with it.
#[utoipa::path(
    post,
    path = "/api/v1/product/delete",
    tag = "product",
    request_body = DeleteProductRequest,
    responses(
        (status = 200, description = "Deleted", body = Empty),
        (status = 400, description = "Unknown product", body = ErrorBody),
        (status = 403, description = "Not an admin", body = ErrorBody)
    )
)]
pub async fn delete_product(
    State(state): State<AppState>,
    AppJson(req): AppJson<DeleteProductRequest>,
) -> ApiResult<Empty> {
    with_deadline(CATALOG_DEADLINE, product::delete(state.repo.as_ref(), req)).await?;
    Ok(ApiResponse::ok(Empty {}))
}

/// list_products
///
/// [Authenticated Route] Filtered, sorted, paged product listing.
#[utoipa::path(
    get,
    path = "/api/v1/product/list",
    tag = "product",
    params(ListProductsQuery),
    responses(
        (status = 200, description = "Products", body = Page<Product>),
        (status = 400, description = "Invalid filter", body = ErrorBody)
    )
)]
pub async fn list_products(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ListProductsQuery>,
) -> ApiResult<Page<Product>> {
    let page = with_deadline(CATALOG_DEADLINE, product::list(state.repo.as_ref(), query)).await?;
    Ok(ApiResponse::ok(page))
}

// --- Review ---

#[utoipa::path(
    post,
    path = "/api/v1/review/create",
    tag = "review",
    request_body = CreateReviewRequest,
    responses(
        (status = 201, description = "Created", body = Review),
        (status = 400, description = "Unknown product or already reviewed", body = ErrorBody)
    )
)]
pub async fn create_review(
    caller: AuthUser,
    State(state): State<AppState>,
    AppJson(req): AppJson<CreateReviewRequest>,
) -> ApiResult<Review> {
    let created = with_deadline(
        DEFAULT_DEADLINE,
        review::create(state.repo.as_ref(), &caller, req),
    )
    .await?;
    Ok(ApiResponse::created(created))
}

#[utoipa::path(
    post,
    path = "/api/v1/review/update",
    tag = "review",
    request_body = UpdateReviewRequest,
    responses(
        (status = 200, description = "Updated", body = Review),
        (status = 400, description = "No such review owned by the caller", body = ErrorBody)
    )
)]
pub async fn update_review(
    caller: AuthUser,
    State(state): State<AppState>,
    AppJson(req): AppJson<UpdateReviewRequest>,
) -> ApiResult<Review> {
    let updated = with_deadline(
        DEFAULT_DEADLINE,
        review::update(state.repo.as_ref(), &caller, req),
    )
    .await?;
    Ok(ApiResponse::ok(updated))
}

#[utoipa::path(
    post,
    path = "/api/v1/review/delete",
    tag = "review",
    request_body = DeleteReviewRequest,
    responses(
        (status = 200, description = "Deleted", body = Empty),
        (status = 400, description = "No such review owned by the caller", body = ErrorBody)
    )
)]
pub async fn delete_review(
    caller: AuthUser,
    State(state): State<AppState>,
    AppJson(req): AppJson<DeleteReviewRequest>,
) -> ApiResult<Empty> {
    with_deadline(
        DEFAULT_DEADLINE,
        review::delete(state.repo.as_ref(), &caller, req),
    )
    .await?;
    Ok(ApiResponse::ok(Empty {}))
}

#[utoipa::path(
    get,
    path = "/api/v1/review/list",
    tag = "review",
    params(ListReviewsQuery),
    responses((status = 200, description = "Reviews", body = Page<Review>))
)]
pub async fn list_reviews(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ListReviewsQuery>,
) -> ApiResult<Page<Review>> {
    let page = with_deadline(DEFAULT_DEADLINE, review::list(state.repo.as_ref(), query)).await?;
    Ok(ApiResponse::ok(page))
}

#[utoipa::path(
    get,
    path = "/api/v1/review/summary",
    tag = "review",
    responses((status = 200, description = "Total number of reviews", body = CountResponse))
)]
pub async fn review_summary(State(state): State<AppState>) -> ApiResult<CountResponse> {
    let summary = with_deadline(DEFAULT_DEADLINE, review::summary(state.repo.as_ref())).await?;
    Ok(ApiResponse::ok(summary))
}

// --- Wishlist ---

#[utoipa::path(
    post,
    path = "/api/v1/wishlist/add",
    tag = "wishlist",
    request_body = AddToWishlistRequest,
    responses(
        (status = 201, description = "Added", body = Wishlist),
        (status = 400, description = "Unknown product or already on the wishlist", body = ErrorBody)
    )
)]
pub async fn add_to_wishlist(
    caller: AuthUser,
    State(state): State<AppState>,
    AppJson(req): AppJson<AddToWishlistRequest>,
) -> ApiResult<Wishlist> {
    let created = with_deadline(
        DEFAULT_DEADLINE,
        wishlist::add(state.repo.as_ref(), &caller, req),
    )
    .await?;
    Ok(ApiResponse::created(created))
}

#[utoipa::path(
    post,
    path = "/api/v1/wishlist/delete/{id}",
    tag = "wishlist",
    params(("id" = Uuid, Path, description = "Wishlist entry id")),
    responses(
        (status = 200, description = "Removed", body = Empty),
        (status = 400, description = "No such entry owned by the caller", body = ErrorBody)
    )
)]
pub async fn delete_from_wishlist(
    caller: AuthUser,
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<Empty> {
    with_deadline(
        DEFAULT_DEADLINE,
        wishlist::delete(state.repo.as_ref(), &caller, id),
    )
    .await?;
    Ok(ApiResponse::ok(Empty {}))
}

/// list_wishlists
///
/// [Authenticated Route] The caller's own wishlist.
#[utoipa::path(
    get,
    path = "/api/v1/wishlist/list",
    tag = "wishlist",
    params(ListWishlistsQuery),
    responses((status = 200, description = "Wishlist entries", body = Page<Wishlist>))
)]
pub async fn list_wishlists(
    caller: AuthUser,
    State(state): State<AppState>,
    AppQuery(query): AppQuery<ListWishlistsQuery>,
) -> ApiResult<Page<Wishlist>> {
    let page = with_deadline(
        DEFAULT_DEADLINE,
        wishlist::list(state.repo.as_ref(), &caller, query),
    )
    .await?;
    Ok(ApiResponse::ok(page))
}

#[utoipa::path(
    get,
    path = "/api/v1/wishlist/summary",
    tag = "wishlist",
    responses((status = 200, description = "Total number of wishlist entries", body = CountResponse))
)]
pub async fn wishlist_summary(State(state): State<AppState>) -> ApiResult<CountResponse> {
    let summary = with_deadline(DEFAULT_DEADLINE, wishlist::summary(state.repo.as_ref())).await?;
    Ok(ApiResponse::ok(summary))
}
