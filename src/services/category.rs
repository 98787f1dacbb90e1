use chrono::Utc;
use uuid::Uuid;

use super::{internal, write_error};
use crate::{
    error::AppError,
    models::{
        Category, CategorySummaryResponse, CreateCategoryRequest, ListCategoriesQuery, Page,
    },
    repository::{CategoryFilter, Repository},
    validation::{self, Validate},
};

/// create
///
/// Rejects a name that is already taken (exact, case-sensitive) with
/// `CategoryExisted`; otherwise stores the category with a fresh id and a slug
/// derived from the name.
pub async fn create(
    repo: &dyn Repository,
    req: CreateCategoryRequest,
) -> Result<Category, AppError> {
    req.validate()?;

    let by_name = CategoryFilter {
        name: Some(req.name.clone()),
        ..Default::default()
    };
    if repo.find_category(&by_name).await.map_err(internal)?.is_some() {
        tracing::debug!(name = %req.name, "category name already taken");
        return Err(AppError::CategoryExisted);
    }

    let now = Utc::now();
    let category = Category {
        id: Uuid::new_v4(),
        name_slug: validation::slugify(&req.name),
        name: req.name,
        description: req.description,
        created_at: now,
        updated_at: now,
    };

    let created = repo
        .create_category(&category)
        .await
        .map_err(|e| write_error(e, AppError::CategoryExisted, AppError::CategoryNotFound))?;
    tracing::info!(category_id = %created.id, "category created");
    Ok(created)
}

pub async fn list(
    repo: &dyn Repository,
    query: ListCategoriesQuery,
) -> Result<Page<Category>, AppError> {
    let filter = CategoryFilter {
        pagination: validation::pagination(query.page, query.limit)?,
        ..Default::default()
    };

    let (result, count) = tokio::try_join!(
        repo.list_categories(&filter),
        repo.count_categories(&filter)
    )
    .map_err(internal)?;

    Ok(Page { count, result })
}

/// Every category with its product count.
pub async fn summary(repo: &dyn Repository) -> Result<CategorySummaryResponse, AppError> {
    let categories = repo.category_summary().await.map_err(internal)?;
    Ok(CategorySummaryResponse { categories })
}
