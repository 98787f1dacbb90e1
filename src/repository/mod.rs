use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Category, CategorySummary, Product, ProductStatus, Review, Role, User, Wishlist,
};

mod memory;
mod postgres;

pub use memory::MemoryRepository;
pub use postgres::PostgresRepository;

/// RepositoryError
///
/// Failures reported by a persistence backend. Never crosses the service
/// boundary: services turn `Conflict` into the entity's "already exists" error
/// and everything else into an internal error.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// A unique constraint rejected the write. Carries the constraint name.
    #[error("unique constraint violated: {0}")]
    Conflict(String),
    /// An update or delete matched no row.
    #[error("row not found")]
    NotFound,
    #[error("database error: {0}")]
    Database(#[source] sqlx::Error),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepositoryError::Conflict(db.constraint().unwrap_or("unknown").to_string())
            }
            sqlx::Error::RowNotFound => RepositoryError::NotFound,
            _ => RepositoryError::Database(err),
        }
    }
}

// --- Filters ---

/// Pagination
///
/// 1-based page and a page size. Only honoured by `list_*` methods; `find_*` and
/// `count_*` ignore it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: i64,
    pub limit: i64,
}

impl Pagination {
    pub const DEFAULT_PAGE: i64 = 1;
    pub const DEFAULT_LIMIT: i64 = 10;
    pub const MAX_LIMIT: i64 = 100;

    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.limit)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: Self::DEFAULT_PAGE,
            limit: Self::DEFAULT_LIMIT,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

impl SortDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Asc => "ASC",
            SortDirection::Desc => "DESC",
        }
    }
}

/// Whitelisted product sort columns. Keeps user input out of `ORDER BY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProductSortField {
    Name,
    Price,
    Quantity,
    #[default]
    CreatedAt,
}

impl ProductSortField {
    pub fn column(&self) -> &'static str {
        match self {
            ProductSortField::Name => "name",
            ProductSortField::Price => "price",
            ProductSortField::Quantity => "quantity",
            ProductSortField::CreatedAt => "created_at",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Sort {
    pub field: ProductSortField,
    pub direction: SortDirection,
}

#[derive(Debug, Clone, Default)]
pub struct CategoryFilter {
    pub id: Option<Uuid>,
    /// Exact, case-sensitive match.
    pub name: Option<String>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub id: Option<Uuid>,
    /// Exact, case-sensitive match (uniqueness checks).
    pub name: Option<String>,
    /// Case-insensitive substring match (listing).
    pub name_contains: Option<String>,
    /// Empty means any category.
    pub category_ids: Vec<Uuid>,
    /// Translated to a predicate on `quantity`.
    pub status: Option<ProductStatus>,
    pub sort: Sort,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Default)]
pub struct UserFilter {
    pub id: Option<Uuid>,
    pub username: Option<String>,
    /// Case-insensitive substring match on `fullname`.
    pub name_contains: Option<String>,
    pub role: Option<Role>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Default)]
pub struct ReviewFilter {
    pub id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    /// Case-insensitive substring match on the reviewed product's name.
    pub product_name: Option<String>,
    pub pagination: Pagination,
}

#[derive(Debug, Clone, Default)]
pub struct WishlistFilter {
    pub id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub product_id: Option<Uuid>,
    pub pagination: Pagination,
}

/// Repository Trait
///
/// The persistence contract the services are written against. Each entity gets
/// the same shape of operations: writes taking a fully built row, `find_*`
/// returning at most one row, `list_*` returning one page and `count_*` counting
/// every row matching the same filter.
///
/// **Send + Sync + async_trait** make `Arc<dyn Repository>` shareable across
/// Axum's task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Categories ---
    async fn create_category(&self, category: &Category) -> Result<Category, RepositoryError>;
    async fn find_category(
        &self,
        filter: &CategoryFilter,
    ) -> Result<Option<Category>, RepositoryError>;
    async fn list_categories(
        &self,
        filter: &CategoryFilter,
    ) -> Result<Vec<Category>, RepositoryError>;
    async fn count_categories(&self, filter: &CategoryFilter) -> Result<i64, RepositoryError>;
    /// Every category with the number of products referencing it.
    async fn category_summary(&self) -> Result<Vec<CategorySummary>, RepositoryError>;

    // --- Products ---
    async fn create_product(&self, product: &Product) -> Result<Product, RepositoryError>;
    async fn update_product(&self, product: &Product) -> Result<Product, RepositoryError>;
    async fn delete_product(&self, id: Uuid) -> Result<(), RepositoryError>;
    /// Returned rows carry the joined `category`; `status` is left to the caller.
    async fn find_product(&self, filter: &ProductFilter)
    -> Result<Option<Product>, RepositoryError>;
    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError>;
    async fn count_products(&self, filter: &ProductFilter) -> Result<i64, RepositoryError>;

    // --- Users ---
    async fn create_user(&self, user: &User) -> Result<User, RepositoryError>;
    async fn update_user(&self, user: &User) -> Result<User, RepositoryError>;
    async fn find_user(&self, filter: &UserFilter) -> Result<Option<User>, RepositoryError>;
    async fn list_users(&self, filter: &UserFilter) -> Result<Vec<User>, RepositoryError>;
    async fn count_users(&self, filter: &UserFilter) -> Result<i64, RepositoryError>;

    // --- Reviews ---
    async fn create_review(&self, review: &Review) -> Result<Review, RepositoryError>;
    async fn update_review(&self, review: &Review) -> Result<Review, RepositoryError>;
    async fn delete_review(&self, id: Uuid) -> Result<(), RepositoryError>;
    async fn find_review(&self, filter: &ReviewFilter) -> Result<Option<Review>, RepositoryError>;
    async fn list_reviews(&self, filter: &ReviewFilter) -> Result<Vec<Review>, RepositoryError>;
    async fn count_reviews(&self, filter: &ReviewFilter) -> Result<i64, RepositoryError>;

    // --- Wishlists ---
    async fn create_wishlist(&self, wishlist: &Wishlist) -> Result<Wishlist, RepositoryError>;
    async fn delete_wishlist(&self, id: Uuid) -> Result<(), RepositoryError>;
    async fn find_wishlist(
        &self,
        filter: &WishlistFilter,
    ) -> Result<Option<Wishlist>, RepositoryError>;
    async fn list_wishlists(
        &self,
        filter: &WishlistFilter,
    ) -> Result<Vec<Wishlist>, RepositoryError>;
    async fn count_wishlists(&self, filter: &WishlistFilter) -> Result<i64, RepositoryError>;
}

/// RepositoryState
///
/// The concrete type used to share the persistence layer across the application state.
pub type RepositoryState = Arc<dyn Repository>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn offset_is_zero_based() {
        assert_eq!(Pagination::default().offset(), 0);
        assert_eq!(Pagination { page: 3, limit: 20 }.offset(), 40);
    }

    #[test]
    fn default_sort_is_newest_first() {
        let sort = Sort::default();
        assert_eq!(sort.field.column(), "created_at");
        assert_eq!(sort.direction.as_sql(), "DESC");
    }
}
