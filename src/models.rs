use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use thiserror::Error;
use ts_rs::TS;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

// --- Closed enumerations ---

/// Role
///
/// The closed set of roles an identity can hold. Persisted as lowercase text
/// (`admin` / `user`) and matched exhaustively wherever permissions are decided.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS, ToSchema, sqlx::Type,
)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "text", rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    Admin,
    #[default]
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::User => "user",
        }
    }

    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
#[error("unknown role `{0}`")]
pub struct UnknownRole(pub String);

impl FromStr for Role {
    type Err = UnknownRole;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            other => Err(UnknownRole(other.to_string())),
        }
    }
}

/// ProductStatus
///
/// Stock status shown on product listings. Never persisted: it is recomputed
/// from `quantity` every time a product is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "snake_case")]
#[ts(export)]
pub enum ProductStatus {
    InStock,
    #[default]
    OutOfStock,
}

impl ProductStatus {
    pub fn from_quantity(quantity: i64) -> Self {
        if quantity > 0 {
            ProductStatus::InStock
        } else {
            ProductStatus::OutOfStock
        }
    }
}

// --- Core entities (mapped to database rows) ---

/// User
///
/// The persisted identity record. The password column holds an argon2id PHC
/// string and is never serialized into a response.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing, default)]
    #[ts(skip)]
    #[schema(ignore)]
    pub password: String,
    pub fullname: String,
    pub email: Option<String>,
    pub phone_number: Option<String>,
    pub role: Role,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// Category
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    pub name_slug: String,
    pub description: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// CategorySummary
///
/// A category with the number of products referencing it (admin summary).
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default, PartialEq)]
#[ts(export)]
pub struct CategorySummary {
    pub id: Uuid,
    pub name: String,
    pub product_count: i64,
}

/// CategoryRef
///
/// The slice of a category joined onto product listings.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default, PartialEq)]
#[ts(export)]
pub struct CategoryRef {
    pub id: Uuid,
    pub name: String,
}

/// Product
///
/// `category` and `status` are read-side fields: the former is filled by the
/// listing join, the latter derived from `quantity`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub name_slug: String,
    pub description: Option<String>,
    pub image: Option<String>,
    pub price: f64,
    pub quantity: i64,
    pub category_id: Uuid,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,

    #[sqlx(skip)]
    pub category: Option<CategoryRef>,
    #[sqlx(skip)]
    pub status: ProductStatus,
}

impl Product {
    /// Recomputes the read-side stock status from the current quantity.
    pub fn with_status(mut self) -> Self {
        self.status = ProductStatus::from_quantity(self.quantity);
        self
    }
}

/// Review
///
/// One rating per (user, product) pair, owned by `user_id`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Review {
    pub id: Uuid,
    pub product_id: Uuid,
    pub user_id: Uuid,
    pub rating: f64,
    pub comment: String,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Wishlist
///
/// One wishlist entry per (user, product) pair, owned by `user_id`.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Wishlist {
    pub id: Uuid,
    pub user_id: Uuid,
    pub product_id: Uuid,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

// --- Shared output schemas ---

/// Page
///
/// A page of rows plus the total number of rows matching the same filter.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Page<T> {
    pub count: i64,
    pub result: Vec<T>,
}

/// CountResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CountResponse {
    pub count: i64,
}

/// CategorySummaryResponse
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CategorySummaryResponse {
    pub categories: Vec<CategorySummary>,
}

// --- Category payloads ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateCategoryRequest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// ListCategoriesQuery
///
/// Query parameters for `GET /api/v1/category/list`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, IntoParams, Default)]
#[into_params(parameter_in = Query)]
pub struct ListCategoriesQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

// --- Product payloads ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateProductRequest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub price: f64,
    pub quantity: i64,
    pub category_id: Uuid,
}

/// UpdateProductRequest
///
/// Full overwrite of a product's mutable fields.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateProductRequest {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    pub price: f64,
    pub quantity: i64,
    pub category_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct DeleteProductRequest {
    pub id: Uuid,
}

/// ListProductsQuery
///
/// Query parameters for `GET /api/v1/product/list`. `category_ids` is a
/// comma-separated list of UUIDs; `sort_field` is one of `name`, `price`,
/// `quantity`, `created_at` and `sort_order` one of `asc`, `desc`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, IntoParams, Default)]
#[into_params(parameter_in = Query)]
pub struct ListProductsQuery {
    pub name: Option<String>,
    pub category_ids: Option<String>,
    pub status: Option<ProductStatus>,
    pub sort_field: Option<String>,
    pub sort_order: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

// --- Review payloads ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct CreateReviewRequest {
    pub product_id: Uuid,
    pub rating: f64,
    #[serde(default)]
    pub comment: String,
}

/// UpdateReviewRequest
///
/// Partial update of the caller's own review.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateReviewRequest {
    pub review_id: Uuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct DeleteReviewRequest {
    pub review_id: Uuid,
}

/// ListReviewsQuery
///
/// Query parameters for `GET /api/v1/review/list`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, IntoParams, Default)]
#[into_params(parameter_in = Query)]
pub struct ListReviewsQuery {
    pub product_name: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

// --- Wishlist payloads ---

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct AddToWishlistRequest {
    pub product_id: Uuid,
}

/// ListWishlistsQuery
///
/// Query parameters for `GET /api/v1/wishlist/list`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, IntoParams, Default)]
#[into_params(parameter_in = Query)]
pub struct ListWishlistsQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

// --- User payloads ---

/// RegisterRequest
///
/// Input payload for `POST /api/v1/user/register`. The password is hashed before
/// it reaches the repository and is never logged.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    pub confirm_password: String,
    pub fullname: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

/// TokenPair
///
/// Returned by login and refresh: a short-lived access token and a long-lived
/// refresh token, each signed with its own key.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct RefreshTokenRequest {
    pub refresh_token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ChangePasswordRequest {
    pub id: Uuid,
    pub old_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct ForgetPasswordRequest {
    pub username: String,
    pub new_password: String,
    pub confirm_password: String,
}

/// UpdateUserRequest
///
/// Partial profile update for `POST /api/v1/user/update/{id}`. `role` is only
/// honoured when the caller is an admin.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct UpdateUserRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fullname: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// ListUsersQuery
///
/// Query parameters for `GET /api/v1/user/list` (admin only).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, IntoParams, Default)]
#[into_params(parameter_in = Query)]
pub struct ListUsersQuery {
    pub name: Option<String>,
    pub role: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}
