use chrono::Utc;
use uuid::Uuid;

use super::{internal, write_error};
use crate::{
    error::AppError,
    models::{
        Category, CategoryRef, CreateProductRequest, DeleteProductRequest, ListProductsQuery,
        Page, Product, UpdateProductRequest,
    },
    repository::{CategoryFilter, ProductFilter, Repository},
    validation::{self, Validate},
};

/// Looks up the referenced category, failing with `CategoryNotFound`.
async fn existing_category(repo: &dyn Repository, id: Uuid) -> Result<Category, AppError> {
    let filter = CategoryFilter {
        id: Some(id),
        ..Default::default()
    };
    repo.find_category(&filter)
        .await
        .map_err(internal)?
        .ok_or(AppError::CategoryNotFound)
}

async fn existing_product(repo: &dyn Repository, id: Uuid) -> Result<Product, AppError> {
    let filter = ProductFilter {
        id: Some(id),
        ..Default::default()
    };
    repo.find_product(&filter)
        .await
        .map_err(internal)?
        .ok_or(AppError::ProductNotFound)
}

fn category_ref(category: &Category) -> CategoryRef {
    CategoryRef {
        id: category.id,
        name: category.name.clone(),
    }
}

/// create
///
/// The category must exist and the name must be free; both are checked
/// before the insert.
pub async fn create(repo: &dyn Repository, req: CreateProductRequest) -> Result<Product, AppError> {
    req.validate()?;

    let category = existing_category(repo, req.category_id).await?;

    let by_name = ProductFilter {
        name: Some(req.name.clone()),
        ..Default::default()
    };
    if repo.find_product(&by_name).await.map_err(internal)?.is_some() {
        tracing::debug!(name = %req.name, "product name already taken");
        return Err(AppError::ProductExisted);
    }

    let now = Utc::now();
    let product = Product {
        id: Uuid::new_v4(),
        name_slug: validation::slugify(&req.name),
        name: req.name,
        description: req.description,
        image: req.image,
        price: req.price,
        quantity: req.quantity,
        category_id: category.id,
        created_at: now,
        updated_at: now,
        ..Default::default()
    };

    let mut created = repo
        .create_product(&product)
        .await
        .map_err(|e| write_error(e, AppError::ProductExisted, AppError::CategoryNotFound))?;
    created.category = Some(category_ref(&category));
    tracing::info!(product_id = %created.id, "product created");
    Ok(created.with_status())
}

/// update
///
/// Overwrites every mutable field. A changed category must exist; a rename is
/// not pre-checked, the unique index reports a clash as `ProductExisted`.
pub async fn update(repo: &dyn Repository, req: UpdateProductRequest) -> Result<Product, AppError> {
    req.validate()?;

    let current = existing_product(repo, req.id).await?;
    let category = if req.category_id != current.category_id {
        Some(category_ref(&existing_category(repo, req.category_id).await?))
    } else {
        current.category.clone()
    };

    let product = Product {
        name_slug: validation::slugify(&req.name),
        name: req.name,
        description: req.description,
        image: req.image,
        price: req.price,
        quantity: req.quantity,
        category_id: req.category_id,
        updated_at: Utc::now(),
        ..current
    };

    let mut updated = repo
        .update_product(&product)
        .await
        .map_err(|e| write_error(e, AppError::ProductExisted, AppError::ProductNotFound))?;
    updated.category = category;
    tracing::info!(product_id = %updated.id, "product updated");
    Ok(updated.with_status())
}

pub async fn delete(repo: &dyn Repository, req: DeleteProductRequest) -> Result<(), AppError> {
    req.validate()?;

    let product = existing_product(repo, req.id).await?;
    repo.delete_product(product.id)
        .await
        .map_err(|e| write_error(e, AppError::ProductExisted, AppError::ProductNotFound))?;
    tracing::info!(product_id = %product.id, "product deleted");
    Ok(())
}

/// list
///
/// Name is matched as a case-insensitive substring; `status` filters on
/// quantity. Page and total are fetched concurrently and every row's status is
/// recomputed from its quantity.
pub async fn list(repo: &dyn Repository, query: ListProductsQuery) -> Result<Page<Product>, AppError> {
    let filter = ProductFilter {
        name_contains: query.name.filter(|name| !name.trim().is_empty()),
        category_ids: validation::category_ids(query.category_ids.as_deref())?,
        status: query.status,
        sort: validation::sort(query.sort_field.as_deref(), query.sort_order.as_deref())?,
        pagination: validation::pagination(query.page, query.limit)?,
        ..Default::default()
    };

    let (rows, count) = tokio::try_join!(
        repo.list_products(&filter),
        repo.count_products(&filter)
    )
    .map_err(internal)?;

    Ok(Page {
        count,
        result: rows.into_iter().map(Product::with_status).collect(),
    })
}
