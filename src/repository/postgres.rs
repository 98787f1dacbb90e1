use async_trait::async_trait;
use sqlx::{FromRow, PgPool, Postgres, query_builder::QueryBuilder};
use uuid::Uuid;

use super::{
    CategoryFilter, Pagination, ProductFilter, Repository, RepositoryError, ReviewFilter,
    UserFilter, WishlistFilter,
};
use crate::models::{
    Category, CategoryRef, CategorySummary, Product, ProductStatus, Review, User, Wishlist,
};

const CATEGORY_COLUMNS: &str = "id, name, name_slug, description, created_at, updated_at";
const PRODUCT_COLUMNS: &str = "id, name, name_slug, description, image, price, quantity, \
     category_id, created_at, updated_at";
const USER_COLUMNS: &str = "id, username, password, fullname, email, phone_number, role, \
     created_at, updated_at";
const REVIEW_COLUMNS: &str = "id, product_id, user_id, rating, comment, created_at, updated_at";
const WISHLIST_COLUMNS: &str = "id, user_id, product_id, created_at, updated_at";

/// A product row joined with its category's name.
#[derive(FromRow)]
struct ProductRow {
    #[sqlx(flatten)]
    product: Product,
    category_name: Option<String>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        let mut product = row.product;
        product.category = row.category_name.map(|name| CategoryRef {
            id: product.category_id,
            name,
        });
        product
    }
}

/// PostgresRepository
///
/// The `Repository` implementation backed by PostgreSQL. Every dynamic query is
/// assembled with `QueryBuilder` so user input only ever reaches the database
/// as a bound parameter.
pub struct PostgresRepository {
    pool: PgPool,
}

impl PostgresRepository {
    /// Creates a new repository instance using the initialized connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// --- Condition builders (shared by find / list / count) ---

fn push_pagination(builder: &mut QueryBuilder<'_, Postgres>, pagination: Pagination) {
    builder.push(" LIMIT ");
    builder.push_bind(pagination.limit);
    builder.push(" OFFSET ");
    builder.push_bind(pagination.offset());
}

/// `%fragment%` with the LIKE wildcards inside the fragment escaped, so the
/// match is a literal substring. Pair with `ESCAPE '\'`.
fn contains_pattern(fragment: &str) -> String {
    let mut pattern = String::with_capacity(fragment.len() + 2);
    pattern.push('%');
    for c in fragment.chars() {
        if matches!(c, '\\' | '%' | '_') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}

fn push_contains(builder: &mut QueryBuilder<'_, Postgres>, column: &str, fragment: &str) {
    builder.push(format!(" AND {column} ILIKE "));
    builder.push_bind(contains_pattern(fragment));
    builder.push(" ESCAPE '\\'");
}

fn push_category_conditions(builder: &mut QueryBuilder<'_, Postgres>, filter: &CategoryFilter) {
    if let Some(id) = filter.id {
        builder.push(" AND id = ");
        builder.push_bind(id);
    }
    if let Some(name) = &filter.name {
        builder.push(" AND name = ");
        builder.push_bind(name.clone());
    }
}

fn push_product_conditions(builder: &mut QueryBuilder<'_, Postgres>, filter: &ProductFilter) {
    if let Some(id) = filter.id {
        builder.push(" AND p.id = ");
        builder.push_bind(id);
    }
    if let Some(name) = &filter.name {
        builder.push(" AND p.name = ");
        builder.push_bind(name.clone());
    }
    if let Some(fragment) = &filter.name_contains {
        push_contains(builder, "p.name", fragment);
    }
    if !filter.category_ids.is_empty() {
        builder.push(" AND p.category_id = ANY(");
        builder.push_bind(filter.category_ids.clone());
        builder.push(")");
    }
    match filter.status {
        Some(ProductStatus::InStock) => {
            builder.push(" AND p.quantity > 0");
        }
        Some(ProductStatus::OutOfStock) => {
            builder.push(" AND p.quantity <= 0");
        }
        None => {}
    }
}

fn push_user_conditions(builder: &mut QueryBuilder<'_, Postgres>, filter: &UserFilter) {
    if let Some(id) = filter.id {
        builder.push(" AND id = ");
        builder.push_bind(id);
    }
    if let Some(username) = &filter.username {
        builder.push(" AND username = ");
        builder.push_bind(username.clone());
    }
    if let Some(fragment) = &filter.name_contains {
        push_contains(builder, "fullname", fragment);
    }
    if let Some(role) = filter.role {
        builder.push(" AND role = ");
        builder.push_bind(role);
    }
}

fn push_review_conditions(builder: &mut QueryBuilder<'_, Postgres>, filter: &ReviewFilter) {
    if let Some(id) = filter.id {
        builder.push(" AND r.id = ");
        builder.push_bind(id);
    }
    if let Some(user_id) = filter.user_id {
        builder.push(" AND r.user_id = ");
        builder.push_bind(user_id);
    }
    if let Some(product_id) = filter.product_id {
        builder.push(" AND r.product_id = ");
        builder.push_bind(product_id);
    }
    if let Some(fragment) = &filter.product_name {
        push_contains(builder, "p.name", fragment);
    }
}

fn push_wishlist_conditions(builder: &mut QueryBuilder<'_, Postgres>, filter: &WishlistFilter) {
    if let Some(id) = filter.id {
        builder.push(" AND id = ");
        builder.push_bind(id);
    }
    if let Some(user_id) = filter.user_id {
        builder.push(" AND user_id = ");
        builder.push_bind(user_id);
    }
    if let Some(product_id) = filter.product_id {
        builder.push(" AND product_id = ");
        builder.push_bind(product_id);
    }
}

fn select_products<'a>() -> QueryBuilder<'a, Postgres> {
    QueryBuilder::new(
        r#"
        SELECT
            p.id, p.name, p.name_slug, p.description, p.image, p.price, p.quantity,
            p.category_id, p.created_at, p.updated_at, c.name AS category_name
        FROM products p
        LEFT JOIN categories c ON c.id = p.category_id
        WHERE 1 = 1
        "#,
    )
}

fn select_reviews<'a>(head: &str) -> QueryBuilder<'a, Postgres> {
    QueryBuilder::new(format!(
        "{head} FROM reviews r JOIN products p ON p.id = r.product_id WHERE 1 = 1"
    ))
}

fn affected(rows: u64) -> Result<(), RepositoryError> {
    if rows == 0 {
        Err(RepositoryError::NotFound)
    } else {
        Ok(())
    }
}

#[async_trait]
impl Repository for PostgresRepository {
    // --- Categories ---

    async fn create_category(&self, category: &Category) -> Result<Category, RepositoryError> {
        let created = sqlx::query_as::<_, Category>(&format!(
            "INSERT INTO categories ({CATEGORY_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6) \
             RETURNING {CATEGORY_COLUMNS}"
        ))
        .bind(category.id)
        .bind(&category.name)
        .bind(&category.name_slug)
        .bind(&category.description)
        .bind(category.created_at)
        .bind(category.updated_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn find_category(
        &self,
        filter: &CategoryFilter,
    ) -> Result<Option<Category>, RepositoryError> {
        let mut builder =
            QueryBuilder::new(format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE 1 = 1"));
        push_category_conditions(&mut builder, filter);
        builder.push(" LIMIT 1");
        Ok(builder
            .build_query_as::<Category>()
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_categories(
        &self,
        filter: &CategoryFilter,
    ) -> Result<Vec<Category>, RepositoryError> {
        let mut builder =
            QueryBuilder::new(format!("SELECT {CATEGORY_COLUMNS} FROM categories WHERE 1 = 1"));
        push_category_conditions(&mut builder, filter);
        builder.push(" ORDER BY created_at DESC, id");
        push_pagination(&mut builder, filter.pagination);
        Ok(builder
            .build_query_as::<Category>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn count_categories(&self, filter: &CategoryFilter) -> Result<i64, RepositoryError> {
        let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM categories WHERE 1 = 1");
        push_category_conditions(&mut builder, filter);
        Ok(builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?)
    }

    /// category_summary
    ///
    /// LEFT JOIN so categories without products still appear with a zero count.
    async fn category_summary(&self) -> Result<Vec<CategorySummary>, RepositoryError> {
        let rows = sqlx::query_as::<_, CategorySummary>(
            r#"
            SELECT c.id, c.name, COUNT(p.id) AS product_count
            FROM categories c
            LEFT JOIN products p ON p.category_id = c.id
            GROUP BY c.id, c.name
            ORDER BY c.name
            "#,
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    // --- Products ---

    async fn create_product(&self, product: &Product) -> Result<Product, RepositoryError> {
        let created = sqlx::query_as::<_, Product>(&format!(
            "INSERT INTO products ({PRODUCT_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {PRODUCT_COLUMNS}"
        ))
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.name_slug)
        .bind(&product.description)
        .bind(&product.image)
        .bind(product.price)
        .bind(product.quantity)
        .bind(product.category_id)
        .bind(product.created_at)
        .bind(product.updated_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn update_product(&self, product: &Product) -> Result<Product, RepositoryError> {
        let updated = sqlx::query_as::<_, Product>(&format!(
            r#"
            UPDATE products
            SET name = $2, name_slug = $3, description = $4, image = $5,
                price = $6, quantity = $7, category_id = $8, updated_at = $9
            WHERE id = $1
            RETURNING {PRODUCT_COLUMNS}
            "#
        ))
        .bind(product.id)
        .bind(&product.name)
        .bind(&product.name_slug)
        .bind(&product.description)
        .bind(&product.image)
        .bind(product.price)
        .bind(product.quantity)
        .bind(product.category_id)
        .bind(product.updated_at)
        .fetch_optional(&self.pool)
        .await?;
        updated.ok_or(RepositoryError::NotFound)
    }

    async fn delete_product(&self, id: Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM products WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        affected(result.rows_affected())
    }

    async fn find_product(
        &self,
        filter: &ProductFilter,
    ) -> Result<Option<Product>, RepositoryError> {
        let mut builder = select_products();
        push_product_conditions(&mut builder, filter);
        builder.push(" LIMIT 1");
        let row = builder
            .build_query_as::<ProductRow>()
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Product::from))
    }

    /// list_products
    ///
    /// Sort column and direction come from closed enums, so pushing them as raw
    /// SQL cannot inject anything. `p.id` breaks ties to keep paging stable.
    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, RepositoryError> {
        let mut builder = select_products();
        push_product_conditions(&mut builder, filter);
        builder.push(format!(
            " ORDER BY p.{} {}, p.id",
            filter.sort.field.column(),
            filter.sort.direction.as_sql()
        ));
        push_pagination(&mut builder, filter.pagination);
        let rows = builder
            .build_query_as::<ProductRow>()
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Product::from).collect())
    }

    async fn count_products(&self, filter: &ProductFilter) -> Result<i64, RepositoryError> {
        let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM products p WHERE 1 = 1");
        push_product_conditions(&mut builder, filter);
        Ok(builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?)
    }

    // --- Users ---

    async fn create_user(&self, user: &User) -> Result<User, RepositoryError> {
        let created = sqlx::query_as::<_, User>(&format!(
            "INSERT INTO users ({USER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {USER_COLUMNS}"
        ))
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.password)
        .bind(&user.fullname)
        .bind(&user.email)
        .bind(&user.phone_number)
        .bind(user.role)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn update_user(&self, user: &User) -> Result<User, RepositoryError> {
        let updated = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users
            SET username = $2, password = $3, fullname = $4, email = $5,
                phone_number = $6, role = $7, updated_at = $8
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(user.id)
        .bind(&user.username)
        .bind(&user.password)
        .bind(&user.fullname)
        .bind(&user.email)
        .bind(&user.phone_number)
        .bind(user.role)
        .bind(user.updated_at)
        .fetch_optional(&self.pool)
        .await?;
        updated.ok_or(RepositoryError::NotFound)
    }

    async fn find_user(&self, filter: &UserFilter) -> Result<Option<User>, RepositoryError> {
        let mut builder =
            QueryBuilder::new(format!("SELECT {USER_COLUMNS} FROM users WHERE 1 = 1"));
        push_user_conditions(&mut builder, filter);
        builder.push(" LIMIT 1");
        Ok(builder
            .build_query_as::<User>()
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_users(&self, filter: &UserFilter) -> Result<Vec<User>, RepositoryError> {
        let mut builder =
            QueryBuilder::new(format!("SELECT {USER_COLUMNS} FROM users WHERE 1 = 1"));
        push_user_conditions(&mut builder, filter);
        builder.push(" ORDER BY created_at DESC, id");
        push_pagination(&mut builder, filter.pagination);
        Ok(builder.build_query_as::<User>().fetch_all(&self.pool).await?)
    }

    async fn count_users(&self, filter: &UserFilter) -> Result<i64, RepositoryError> {
        let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM users WHERE 1 = 1");
        push_user_conditions(&mut builder, filter);
        Ok(builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?)
    }

    // --- Reviews ---

    async fn create_review(&self, review: &Review) -> Result<Review, RepositoryError> {
        let created = sqlx::query_as::<_, Review>(&format!(
            "INSERT INTO reviews ({REVIEW_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {REVIEW_COLUMNS}"
        ))
        .bind(review.id)
        .bind(review.product_id)
        .bind(review.user_id)
        .bind(review.rating)
        .bind(&review.comment)
        .bind(review.created_at)
        .bind(review.updated_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn update_review(&self, review: &Review) -> Result<Review, RepositoryError> {
        let updated = sqlx::query_as::<_, Review>(&format!(
            "UPDATE reviews SET rating = $2, comment = $3, updated_at = $4 WHERE id = $1 \
             RETURNING {REVIEW_COLUMNS}"
        ))
        .bind(review.id)
        .bind(review.rating)
        .bind(&review.comment)
        .bind(review.updated_at)
        .fetch_optional(&self.pool)
        .await?;
        updated.ok_or(RepositoryError::NotFound)
    }

    async fn delete_review(&self, id: Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM reviews WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        affected(result.rows_affected())
    }

    async fn find_review(&self, filter: &ReviewFilter) -> Result<Option<Review>, RepositoryError> {
        let mut builder = select_reviews(
            "SELECT r.id, r.product_id, r.user_id, r.rating, r.comment, r.created_at, r.updated_at",
        );
        push_review_conditions(&mut builder, filter);
        builder.push(" LIMIT 1");
        Ok(builder
            .build_query_as::<Review>()
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_reviews(&self, filter: &ReviewFilter) -> Result<Vec<Review>, RepositoryError> {
        let mut builder = select_reviews(
            "SELECT r.id, r.product_id, r.user_id, r.rating, r.comment, r.created_at, r.updated_at",
        );
        push_review_conditions(&mut builder, filter);
        builder.push(" ORDER BY r.created_at DESC, r.id");
        push_pagination(&mut builder, filter.pagination);
        Ok(builder
            .build_query_as::<Review>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn count_reviews(&self, filter: &ReviewFilter) -> Result<i64, RepositoryError> {
        let mut builder = select_reviews("SELECT COUNT(*)");
        push_review_conditions(&mut builder, filter);
        Ok(builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?)
    }

    // --- Wishlists ---

    async fn create_wishlist(&self, wishlist: &Wishlist) -> Result<Wishlist, RepositoryError> {
        let created = sqlx::query_as::<_, Wishlist>(&format!(
            "INSERT INTO wishlists ({WISHLIST_COLUMNS}) VALUES ($1, $2, $3, $4, $5) \
             RETURNING {WISHLIST_COLUMNS}"
        ))
        .bind(wishlist.id)
        .bind(wishlist.user_id)
        .bind(wishlist.product_id)
        .bind(wishlist.created_at)
        .bind(wishlist.updated_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn delete_wishlist(&self, id: Uuid) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM wishlists WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        affected(result.rows_affected())
    }

    async fn find_wishlist(
        &self,
        filter: &WishlistFilter,
    ) -> Result<Option<Wishlist>, RepositoryError> {
        let mut builder =
            QueryBuilder::new(format!("SELECT {WISHLIST_COLUMNS} FROM wishlists WHERE 1 = 1"));
        push_wishlist_conditions(&mut builder, filter);
        builder.push(" LIMIT 1");
        Ok(builder
            .build_query_as::<Wishlist>()
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn list_wishlists(
        &self,
        filter: &WishlistFilter,
    ) -> Result<Vec<Wishlist>, RepositoryError> {
        let mut builder =
            QueryBuilder::new(format!("SELECT {WISHLIST_COLUMNS} FROM wishlists WHERE 1 = 1"));
        push_wishlist_conditions(&mut builder, filter);
        builder.push(" ORDER BY created_at DESC, id");
        push_pagination(&mut builder, filter.pagination);
        Ok(builder
            .build_query_as::<Wishlist>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn count_wishlists(&self, filter: &WishlistFilter) -> Result<i64, RepositoryError> {
        let mut builder = QueryBuilder::new("SELECT COUNT(*) FROM wishlists WHERE 1 = 1");
        push_wishlist_conditions(&mut builder, filter);
        Ok(builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substring_patterns_match_wildcards_literally() {
        assert_eq!(contains_pattern("atlas"), "%atlas%");
        assert_eq!(contains_pattern("50%"), "%50\\%%");
        assert_eq!(contains_pattern("a_b\\c"), "%a\\_b\\\\c%");
    }

    #[test]
    fn product_name_filter_declares_the_escape() {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT 1 FROM products p WHERE TRUE");
        let filter = ProductFilter {
            name_contains: Some("50%".into()),
            ..Default::default()
        };
        push_product_conditions(&mut builder, &filter);
        assert!(builder.sql().ends_with(" AND p.name ILIKE $1 ESCAPE '\\'"));
    }
}
