use chrono::Utc;
use sqlx::PgPool;
use storefront_api::{
    models::{Category, Product, Review, Role, User, Wishlist},
    repository::{
        CategoryFilter, PostgresRepository, ProductFilter, Repository, RepositoryError,
        ReviewFilter, WishlistFilter,
    },
};
use uuid::Uuid;

// These tests need a disposable Postgres: `DATABASE_URL=... cargo test -- --ignored`.

// --- Test Context and Setup ---

struct DbTestContext {
    pool: PgPool,
}

impl DbTestContext {
    async fn setup() -> Self {
        dotenv::dotenv().ok();

        let db_url = std::env::var("DATABASE_URL")
            .expect("DATABASE_URL must be set to run integration tests");

        let pool = PgPool::connect(&db_url)
            .await
            .expect("Failed to connect to database for integration tests.");

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .expect("Failed to run database migrations.");

        DbTestContext { pool }
    }

    fn repository(&self) -> PostgresRepository {
        PostgresRepository::new(self.pool.clone())
    }
}

// --- Test Data Helpers ---

/// Names are suffixed so repeated runs against the same database never clash.
fn unique(prefix: &str) -> String {
    format!("{prefix}-{}", Uuid::new_v4().simple())
}

async fn create_test_user(repo: &PostgresRepository) -> User {
    let now = Utc::now();
    repo.create_user(&User {
        id: Uuid::new_v4(),
        username: unique("user"),
        password: "$argon2id$placeholder".into(),
        fullname: "Integration Tester".into(),
        role: Role::User,
        created_at: now,
        updated_at: now,
        ..Default::default()
    })
    .await
    .expect("insert user")
}

async fn create_test_category(repo: &PostgresRepository) -> Category {
    let now = Utc::now();
    let name = unique("Category");
    repo.create_category(&Category {
        id: Uuid::new_v4(),
        name_slug: name.to_lowercase(),
        name,
        description: None,
        created_at: now,
        updated_at: now,
    })
    .await
    .expect("insert category")
}

async fn create_test_product(repo: &PostgresRepository, category_id: Uuid, quantity: i64) -> Product {
    let now = Utc::now();
    let name = unique("Product");
    repo.create_product(&Product {
        id: Uuid::new_v4(),
        name_slug: name.to_lowercase(),
        name,
        price: 9.99,
        quantity,
        category_id,
        created_at: now,
        updated_at: now,
        ..Default::default()
    })
    .await
    .expect("insert product")
}

// --- Tests ---

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_duplicate_category_name_is_a_conflict() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let existing = create_test_category(&repo).await;

    let now = Utc::now();
    let err = repo
        .create_category(&Category {
            id: Uuid::new_v4(),
            name: existing.name.clone(),
            name_slug: existing.name_slug.clone(),
            description: None,
            created_at: now,
            updated_at: now,
        })
        .await
        .unwrap_err();

    assert!(matches!(err, RepositoryError::Conflict(ref c) if c == "categories_name_key"));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_product_listing_joins_category_and_filters() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let category = create_test_category(&repo).await;
    let stocked = create_test_product(&repo, category.id, 5).await;
    create_test_product(&repo, category.id, 0).await;

    let filter = ProductFilter {
        category_ids: vec![category.id],
        ..Default::default()
    };
    assert_eq!(repo.count_products(&filter).await.unwrap(), 2);

    let in_stock = ProductFilter {
        category_ids: vec![category.id],
        status: Some(storefront_api::models::ProductStatus::InStock),
        ..Default::default()
    };
    let rows = repo.list_products(&in_stock).await.unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].id, stocked.id);
    assert_eq!(
        rows[0].category.as_ref().map(|c| c.name.as_str()),
        Some(category.name.as_str())
    );

    let by_fragment = ProductFilter {
        name_contains: Some(stocked.name.to_uppercase()),
        ..Default::default()
    };
    assert_eq!(repo.count_products(&by_fragment).await.unwrap(), 1);
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_review_and_wishlist_uniqueness_and_cascade() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let user = create_test_user(&repo).await;
    let category = create_test_category(&repo).await;
    let product = create_test_product(&repo, category.id, 1).await;
    let now = Utc::now();

    let review = Review {
        id: Uuid::new_v4(),
        product_id: product.id,
        user_id: user.id,
        rating: 4.0,
        comment: "fine".into(),
        created_at: now,
        updated_at: now,
    };
    repo.create_review(&review).await.unwrap();
    let duplicate = repo
        .create_review(&Review {
            id: Uuid::new_v4(),
            ..review.clone()
        })
        .await
        .unwrap_err();
    assert!(matches!(duplicate, RepositoryError::Conflict(_)));

    let wishlist = Wishlist {
        id: Uuid::new_v4(),
        user_id: user.id,
        product_id: product.id,
        created_at: now,
        updated_at: now,
    };
    repo.create_wishlist(&wishlist).await.unwrap();

    repo.delete_product(product.id).await.unwrap();

    let by_product = ReviewFilter {
        product_id: Some(product.id),
        ..Default::default()
    };
    assert_eq!(repo.count_reviews(&by_product).await.unwrap(), 0);
    let wishlisted = WishlistFilter {
        product_id: Some(product.id),
        ..Default::default()
    };
    assert_eq!(repo.count_wishlists(&wishlisted).await.unwrap(), 0);

    assert!(matches!(
        repo.delete_product(product.id).await,
        Err(RepositoryError::NotFound)
    ));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_category_summary_includes_empty_categories() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let empty = create_test_category(&repo).await;

    let summary = repo.category_summary().await.unwrap();
    let row = summary.iter().find(|c| c.id == empty.id).expect("listed");
    assert_eq!(row.product_count, 0);

    let found = repo
        .find_category(&CategoryFilter {
            name: Some(empty.name.clone()),
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(found.map(|c| c.id), Some(empty.id));
}

#[tokio::test]
#[ignore = "requires DATABASE_URL"]
async fn test_name_search_treats_wildcards_literally() {
    let ctx = DbTestContext::setup().await;
    let repo = ctx.repository();
    let category = create_test_category(&repo).await;
    let now = Utc::now();
    let marker = Uuid::new_v4().simple().to_string();

    for name in [format!("{marker} 50% off"), format!("{marker} 500 off")] {
        repo.create_product(&Product {
            id: Uuid::new_v4(),
            name_slug: name.to_lowercase(),
            name,
            price: 1.0,
            category_id: category.id,
            created_at: now,
            updated_at: now,
            ..Default::default()
        })
        .await
        .unwrap();
    }

    let percent = ProductFilter {
        name_contains: Some(format!("{marker} 50%")),
        ..Default::default()
    };
    assert_eq!(repo.count_products(&percent).await.unwrap(), 1);

    let underscore = ProductFilter {
        name_contains: Some(format!("{marker} 50_")),
        ..Default::default()
    };
    assert_eq!(repo.count_products(&underscore).await.unwrap(), 0);
}
