mod common;

use std::sync::Arc;

use async_trait::async_trait;
use axum::http::StatusCode;
use common::{PASSWORD, request, send};
use serde_json::json;
use storefront_api::{
    AppConfig, AppError, AppState, MemoryCounterStore, MemoryRepository, auth, create_router,
    models::{
        Category, CategorySummary, ListProductsQuery, ListUsersQuery, Product, Review, Role, User,
        Wishlist,
    },
    rate_limit::CounterState,
    repository::{
        CategoryFilter, ProductFilter, Repository, RepositoryError, RepositoryState, ReviewFilter,
        UserFilter, WishlistFilter,
    },
    services::{product, user},
};
use uuid::Uuid;

// --- Test double ---

/// In-memory storage whose product and user counts always fail, so a listing
/// gets a good page and a failing count from the same filter.
struct BrokenCounts {
    inner: MemoryRepository,
}

fn broken() -> RepositoryError {
    RepositoryError::Database(sqlx::Error::PoolTimedOut)
}

#[async_trait]
impl Repository for BrokenCounts {
    async fn create_category(&self, category: &Category) -> Result<Category, RepositoryError> {
        self.inner.create_category(category).await
    }
    async fn find_category(
        &self,
        filter: &CategoryFilter,
    ) -> Result<Option<Category>, RepositoryError> {
        self.inner.find_category(filter).await
    }
    async fn list_categories(
        &self,
        filter: &CategoryFilter,
    ) -> Result<Vec<Category>, RepositoryError> {
        self.inner.list_categories(filter).await
    }
    async fn count_categories(&self, filter: &CategoryFilter) -> Result<i64, RepositoryError> {
        self.inner.count_categories(filter).await
    }
    async fn category_summary(&self) -> Result<Vec<CategorySummary>, RepositoryError> {
        self.inner.category_summary().await
    }

    async fn create_product(&self, product: &Product) -> Result<Product, RepositoryError> {
        self.inner.create_product(product).await
    }
    async fn update_product(&self, product: &Product) -> Result<Product, RepositoryError> {
        self.inner.update_product(product).await
    }
    async fn delete_product(&self, id: Uuid) -> Result<(), RepositoryError> {
        self.inner.delete_product(id).await
    }
    async fn find_product(
        &self,
        filter: &ProductFilter,
    ) -> Result<Option<Product>, RepositoryError> {
        self.inner.find_product(filter).await
    }
    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        self.inner.list_products(filter).await
    }
    async fn count_products(&self, _: &ProductFilter) -> Result<i64, RepositoryError> {
        Err(broken())
    }

    async fn create_user(&self, user: &User) -> Result<User, RepositoryError> {
        self.inner.create_user(user).await
    }
    async fn update_user(&self, user: &User) -> Result<User, RepositoryError> {
        self.inner.update_user(user).await
    }
    async fn find_user(&self, filter: &UserFilter) -> Result<Option<User>, RepositoryError> {
        self.inner.find_user(filter).await
    }
    async fn list_users(&self, filter: &UserFilter) -> Result<Vec<User>, RepositoryError> {
        self.inner.list_users(filter).await
    }
    async fn count_users(&self, _: &UserFilter) -> Result<i64, RepositoryError> {
        Err(broken())
    }

    async fn create_review(&self, review: &Review) -> Result<Review, RepositoryError> {
        self.inner.create_review(review).await
    }
    async fn update_review(&self, review: &Review) -> Result<Review, RepositoryError> {
        self.inner.update_review(review).await
    }
    async fn delete_review(&self, id: Uuid) -> Result<(), RepositoryError> {
        self.inner.delete_review(id).await
    }
    async fn find_review(&self, filter: &ReviewFilter) -> Result<Option<Review>, RepositoryError> {
        self.inner.find_review(filter).await
    }
    async fn list_reviews(&self, filter: &ReviewFilter) -> Result<Vec<Review>, RepositoryError> {
        self.inner.list_reviews(filter).await
    }
    async fn count_reviews(&self, filter: &ReviewFilter) -> Result<i64, RepositoryError> {
        self.inner.count_reviews(filter).await
    }

    async fn create_wishlist(&self, wishlist: &Wishlist) -> Result<Wishlist, RepositoryError> {
        self.inner.create_wishlist(wishlist).await
    }
    async fn delete_wishlist(&self, id: Uuid) -> Result<(), RepositoryError> {
        self.inner.delete_wishlist(id).await
    }
    async fn find_wishlist(
        &self,
        filter: &WishlistFilter,
    ) -> Result<Option<Wishlist>, RepositoryError> {
        self.inner.find_wishlist(filter).await
    }
    async fn list_wishlists(
        &self,
        filter: &WishlistFilter,
    ) -> Result<Vec<Wishlist>, RepositoryError> {
        self.inner.list_wishlists(filter).await
    }
    async fn count_wishlists(&self, filter: &WishlistFilter) -> Result<i64, RepositoryError> {
        self.inner.count_wishlists(filter).await
    }
}

// --- Setup ---

async fn broken_repo_with_admin() -> (Arc<BrokenCounts>, User) {
    let repo = Arc::new(BrokenCounts {
        inner: MemoryRepository::new(),
    });
    let now = chrono::Utc::now();
    let admin = repo
        .create_user(&User {
            id: Uuid::new_v4(),
            username: "root".into(),
            password: auth::hash_password(PASSWORD).expect("hash"),
            fullname: "Root".into(),
            role: Role::Admin,
            created_at: now,
            updated_at: now,
            ..Default::default()
        })
        .await
        .expect("seed admin");
    (repo, admin)
}

// --- Tests ---

#[tokio::test]
async fn failing_count_fails_the_whole_listing() {
    let (repo, _) = broken_repo_with_admin().await;

    let products = product::list(repo.as_ref(), ListProductsQuery::default()).await;
    assert!(matches!(products, Err(AppError::Internal(_))));

    let users = user::list(repo.as_ref(), ListUsersQuery::default()).await;
    assert!(matches!(users, Err(AppError::Internal(_))));
}

#[tokio::test]
async fn failing_count_is_a_500_without_a_page() {
    let (repo, admin) = broken_repo_with_admin().await;
    let counters = Arc::new(MemoryCounterStore::new()) as CounterState;
    let state = AppState::new(repo as RepositoryState, counters, AppConfig::default());
    let token = state
        .tokens
        .issue(auth::TokenKind::Access, admin.id)
        .expect("token");

    for uri in ["/api/v1/product/list", "/api/v1/user/list"] {
        let (status, body) = send(
            create_router(state.clone()),
            request("GET", uri, Some(&token), None),
        )
        .await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{uri}");
        assert_eq!(body["success"], json!(false));
        assert_eq!(body["data"]["code"], json!(500));
        assert!(body["data"].get("result").is_none());
    }
}
