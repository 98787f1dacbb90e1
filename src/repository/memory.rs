use std::cmp::Ordering;

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    CategoryFilter, Pagination, ProductFilter, ProductSortField, Repository, RepositoryError,
    ReviewFilter, SortDirection, UserFilter, WishlistFilter,
};
use crate::models::{
    Category, CategoryRef, CategorySummary, Product, ProductStatus, Review, User, Wishlist,
};

#[derive(Default)]
struct Store {
    categories: Vec<Category>,
    products: Vec<Product>,
    users: Vec<User>,
    reviews: Vec<Review>,
    wishlists: Vec<Wishlist>,
}

/// MemoryRepository
///
/// In-process `Repository` with the same filter semantics and unique constraints
/// as the Postgres schema (including the review/wishlist cascade on product
/// delete). Used by the test suites and for running the API without a database.
#[derive(Default)]
pub struct MemoryRepository {
    store: RwLock<Store>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

fn page<T: Clone>(rows: Vec<&T>, pagination: Pagination) -> Vec<T> {
    rows.into_iter()
        .skip(pagination.offset().max(0) as usize)
        .take(pagination.limit.max(0) as usize)
        .cloned()
        .collect()
}

fn newest_first<T>(rows: &mut [&T], created: impl Fn(&T) -> (chrono::DateTime<chrono::Utc>, Uuid)) {
    rows.sort_by(|a, b| {
        let (a_at, a_id) = created(a);
        let (b_at, b_id) = created(b);
        b_at.cmp(&a_at).then(a_id.cmp(&b_id))
    });
}

fn conflict(constraint: &str) -> RepositoryError {
    RepositoryError::Conflict(constraint.to_string())
}

impl Store {
    fn category_matches(category: &Category, filter: &CategoryFilter) -> bool {
        filter.id.is_none_or(|id| category.id == id)
            && filter.name.as_ref().is_none_or(|name| &category.name == name)
    }

    fn product_matches(product: &Product, filter: &ProductFilter) -> bool {
        filter.id.is_none_or(|id| product.id == id)
            && filter.name.as_ref().is_none_or(|name| &product.name == name)
            && filter
                .name_contains
                .as_ref()
                .is_none_or(|fragment| contains_ci(&product.name, fragment))
            && (filter.category_ids.is_empty() || filter.category_ids.contains(&product.category_id))
            && filter.status.is_none_or(|status| match status {
                ProductStatus::InStock => product.quantity > 0,
                ProductStatus::OutOfStock => product.quantity <= 0,
            })
    }

    fn user_matches(user: &User, filter: &UserFilter) -> bool {
        filter.id.is_none_or(|id| user.id == id)
            && filter.username.as_ref().is_none_or(|name| &user.username == name)
            && filter
                .name_contains
                .as_ref()
                .is_none_or(|fragment| contains_ci(&user.fullname, fragment))
            && filter.role.is_none_or(|role| user.role == role)
    }

    fn review_matches(&self, review: &Review, filter: &ReviewFilter) -> bool {
        filter.id.is_none_or(|id| review.id == id)
            && filter.user_id.is_none_or(|id| review.user_id == id)
            && filter.product_id.is_none_or(|id| review.product_id == id)
            && filter.product_name.as_ref().is_none_or(|fragment| {
                self.products
                    .iter()
                    .find(|product| product.id == review.product_id)
                    .is_some_and(|product| contains_ci(&product.name, fragment))
            })
    }

    fn wishlist_matches(wishlist: &Wishlist, filter: &WishlistFilter) -> bool {
        filter.id.is_none_or(|id| wishlist.id == id)
            && filter.user_id.is_none_or(|id| wishlist.user_id == id)
            && filter.product_id.is_none_or(|id| wishlist.product_id == id)
    }

    /// Mirrors the LEFT JOIN on categories done by the Postgres listing.
    fn with_category(&self, product: &Product) -> Product {
        let mut product = product.clone();
        product.category = self
            .categories
            .iter()
            .find(|category| category.id == product.category_id)
            .map(|category| CategoryRef {
                id: category.id,
                name: category.name.clone(),
            });
        product
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    // --- Categories ---

    async fn create_category(&self, category: &Category) -> Result<Category, RepositoryError> {
        let mut store = self.store.write().await;
        if store.categories.iter().any(|c| c.name == category.name) {
            return Err(conflict("categories_name_key"));
        }
        store.categories.push(category.clone());
        Ok(category.clone())
    }

    async fn find_category(
        &self,
        filter: &CategoryFilter,
    ) -> Result<Option<Category>, RepositoryError> {
        let store = self.store.read().await;
        Ok(store
            .categories
            .iter()
            .find(|c| Store::category_matches(c, filter))
            .cloned())
    }

    async fn list_categories(
        &self,
        filter: &CategoryFilter,
    ) -> Result<Vec<Category>, RepositoryError> {
        let store = self.store.read().await;
        let mut rows: Vec<&Category> = store
            .categories
            .iter()
            .filter(|c| Store::category_matches(c, filter))
            .collect();
        newest_first(&mut rows, |c| (c.created_at, c.id));
        Ok(page(rows, filter.pagination))
    }

    async fn count_categories(&self, filter: &CategoryFilter) -> Result<i64, RepositoryError> {
        let store = self.store.read().await;
        Ok(store
            .categories
            .iter()
            .filter(|c| Store::category_matches(c, filter))
            .count() as i64)
    }

    async fn category_summary(&self) -> Result<Vec<CategorySummary>, RepositoryError> {
        let store = self.store.read().await;
        let mut summary: Vec<CategorySummary> = store
            .categories
            .iter()
            .map(|category| CategorySummary {
                id: category.id,
                name: category.name.clone(),
                product_count: store
                    .products
                    .iter()
                    .filter(|p| p.category_id == category.id)
                    .count() as i64,
            })
            .collect();
        summary.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(summary)
    }

    // --- Products ---

    async fn create_product(&self, product: &Product) -> Result<Product, RepositoryError> {
        let mut store = self.store.write().await;
        if store.products.iter().any(|p| p.name == product.name) {
            return Err(conflict("products_name_key"));
        }
        store.products.push(product.clone());
        Ok(product.clone())
    }

    async fn update_product(&self, product: &Product) -> Result<Product, RepositoryError> {
        let mut store = self.store.write().await;
        if store
            .products
            .iter()
            .any(|p| p.id != product.id && p.name == product.name)
        {
            return Err(conflict("products_name_key"));
        }
        let row = store
            .products
            .iter_mut()
            .find(|p| p.id == product.id)
            .ok_or(RepositoryError::NotFound)?;
        *row = Product {
            created_at: row.created_at,
            category: None,
            ..product.clone()
        };
        Ok(row.clone())
    }

    async fn delete_product(&self, id: Uuid) -> Result<(), RepositoryError> {
        let mut store = self.store.write().await;
        let before = store.products.len();
        store.products.retain(|p| p.id != id);
        if store.products.len() == before {
            return Err(RepositoryError::NotFound);
        }
        // ON DELETE CASCADE
        store.reviews.retain(|r| r.product_id != id);
        store.wishlists.retain(|w| w.product_id != id);
        Ok(())
    }

    async fn find_product(
        &self,
        filter: &ProductFilter,
    ) -> Result<Option<Product>, RepositoryError> {
        let store = self.store.read().await;
        Ok(store
            .products
            .iter()
            .find(|p| Store::product_matches(p, filter))
            .map(|p| store.with_category(p)))
    }

    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        let store = self.store.read().await;
        let mut rows: Vec<&Product> = store
            .products
            .iter()
            .filter(|p| Store::product_matches(p, filter))
            .collect();

        rows.sort_by(|a, b| {
            let ordering = match filter.sort.field {
                ProductSortField::Name => a.name.cmp(&b.name),
                ProductSortField::Price => a.price.partial_cmp(&b.price).unwrap_or(Ordering::Equal),
                ProductSortField::Quantity => a.quantity.cmp(&b.quantity),
                ProductSortField::CreatedAt => a.created_at.cmp(&b.created_at),
            };
            let ordering = match filter.sort.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            };
            ordering.then(a.id.cmp(&b.id))
        });

        Ok(page(rows, filter.pagination)
            .iter()
            .map(|p| store.with_category(p))
            .collect())
    }

    async fn count_products(&self, filter: &ProductFilter) -> Result<i64, RepositoryError> {
        let store = self.store.read().await;
        Ok(store
            .products
            .iter()
            .filter(|p| Store::product_matches(p, filter))
            .count() as i64)
    }

    // --- Users ---

    async fn create_user(&self, user: &User) -> Result<User, RepositoryError> {
        let mut store = self.store.write().await;
        if store.users.iter().any(|u| u.username == user.username) {
            return Err(conflict("users_username_key"));
        }
        store.users.push(user.clone());
        Ok(user.clone())
    }

    async fn update_user(&self, user: &User) -> Result<User, RepositoryError> {
        let mut store = self.store.write().await;
        if store
            .users
            .iter()
            .any(|u| u.id != user.id && u.username == user.username)
        {
            return Err(conflict("users_username_key"));
        }
        let row = store
            .users
            .iter_mut()
            .find(|u| u.id == user.id)
            .ok_or(RepositoryError::NotFound)?;
        *row = User {
            created_at: row.created_at,
            ..user.clone()
        };
        Ok(row.clone())
    }

    async fn find_user(&self, filter: &UserFilter) -> Result<Option<User>, RepositoryError> {
        let store = self.store.read().await;
        Ok(store
            .users
            .iter()
            .find(|u| Store::user_matches(u, filter))
            .cloned())
    }

    async fn list_users(&self, filter: &UserFilter) -> Result<Vec<User>, RepositoryError> {
        let store = self.store.read().await;
        let mut rows: Vec<&User> = store
            .users
            .iter()
            .filter(|u| Store::user_matches(u, filter))
            .collect();
        newest_first(&mut rows, |u| (u.created_at, u.id));
        Ok(page(rows, filter.pagination))
    }

    async fn count_users(&self, filter: &UserFilter) -> Result<i64, RepositoryError> {
        let store = self.store.read().await;
        Ok(store
            .users
            .iter()
            .filter(|u| Store::user_matches(u, filter))
            .count() as i64)
    }

    // --- Reviews ---

    async fn create_review(&self, review: &Review) -> Result<Review, RepositoryError> {
        let mut store = self.store.write().await;
        if store
            .reviews
            .iter()
            .any(|r| r.user_id == review.user_id && r.product_id == review.product_id)
        {
            return Err(conflict("reviews_user_id_product_id_key"));
        }
        store.reviews.push(review.clone());
        Ok(review.clone())
    }

    async fn update_review(&self, review: &Review) -> Result<Review, RepositoryError> {
        let mut store = self.store.write().await;
        let row = store
            .reviews
            .iter_mut()
            .find(|r| r.id == review.id)
            .ok_or(RepositoryError::NotFound)?;
        row.rating = review.rating;
        row.comment = review.comment.clone();
        row.updated_at = review.updated_at;
        Ok(row.clone())
    }

    async fn delete_review(&self, id: Uuid) -> Result<(), RepositoryError> {
        let mut store = self.store.write().await;
        let before = store.reviews.len();
        store.reviews.retain(|r| r.id != id);
        if store.reviews.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn find_review(&self, filter: &ReviewFilter) -> Result<Option<Review>, RepositoryError> {
        let store = self.store.read().await;
        Ok(store
            .reviews
            .iter()
            .find(|r| store.review_matches(r, filter))
            .cloned())
    }

    async fn list_reviews(&self, filter: &ReviewFilter) -> Result<Vec<Review>, RepositoryError> {
        let store = self.store.read().await;
        let mut rows: Vec<&Review> = store
            .reviews
            .iter()
            .filter(|r| store.review_matches(r, filter))
            .collect();
        newest_first(&mut rows, |r| (r.created_at, r.id));
        Ok(page(rows, filter.pagination))
    }

    async fn count_reviews(&self, filter: &ReviewFilter) -> Result<i64, RepositoryError> {
        let store = self.store.read().await;
        Ok(store
            .reviews
            .iter()
            .filter(|r| store.review_matches(r, filter))
            .count() as i64)
    }

    // --- Wishlists ---

    async fn create_wishlist(&self, wishlist: &Wishlist) -> Result<Wishlist, RepositoryError> {
        let mut store = self.store.write().await;
        if store
            .wishlists
            .iter()
            .any(|w| w.user_id == wishlist.user_id && w.product_id == wishlist.product_id)
        {
            return Err(conflict("wishlists_user_id_product_id_key"));
        }
        store.wishlists.push(wishlist.clone());
        Ok(wishlist.clone())
    }

    async fn delete_wishlist(&self, id: Uuid) -> Result<(), RepositoryError> {
        let mut store = self.store.write().await;
        let before = store.wishlists.len();
        store.wishlists.retain(|w| w.id != id);
        if store.wishlists.len() == before {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    async fn find_wishlist(
        &self,
        filter: &WishlistFilter,
    ) -> Result<Option<Wishlist>, RepositoryError> {
        let store = self.store.read().await;
        Ok(store
            .wishlists
            .iter()
            .find(|w| Store::wishlist_matches(w, filter))
            .cloned())
    }

    async fn list_wishlists(
        &self,
        filter: &WishlistFilter,
    ) -> Result<Vec<Wishlist>, RepositoryError> {
        let store = self.store.read().await;
        let mut rows: Vec<&Wishlist> = store
            .wishlists
            .iter()
            .filter(|w| Store::wishlist_matches(w, filter))
            .collect();
        newest_first(&mut rows, |w| (w.created_at, w.id));
        Ok(page(rows, filter.pagination))
    }

    async fn count_wishlists(&self, filter: &WishlistFilter) -> Result<i64, RepositoryError> {
        let store = self.store.read().await;
        Ok(store
            .wishlists
            .iter()
            .filter(|w| Store::wishlist_matches(w, filter))
            .count() as i64)
    }
}
