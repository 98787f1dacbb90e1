use chrono::Utc;
use uuid::Uuid;

use super::{internal, write_error};
use crate::{
    auth::AuthUser,
    error::AppError,
    models::{
        CountResponse, CreateReviewRequest, DeleteReviewRequest, ListReviewsQuery, Page, Review,
        UpdateReviewRequest,
    },
    repository::{ProductFilter, Repository, ReviewFilter},
    validation::{self, Validate},
};

/// The caller's own review with the given id. Someone else's review is
/// indistinguishable from a missing one.
async fn owned_review(
    repo: &dyn Repository,
    caller: &AuthUser,
    review_id: Uuid,
) -> Result<Review, AppError> {
    let filter = ReviewFilter {
        id: Some(review_id),
        user_id: Some(caller.id),
        ..Default::default()
    };
    repo.find_review(&filter)
        .await
        .map_err(internal)?
        .ok_or(AppError::ReviewNotFound)
}

/// create
///
/// The product must exist and the caller must not have reviewed it yet.
pub async fn create(
    repo: &dyn Repository,
    caller: &AuthUser,
    req: CreateReviewRequest,
) -> Result<Review, AppError> {
    req.validate()?;

    let product = repo
        .find_product(&ProductFilter {
            id: Some(req.product_id),
            ..Default::default()
        })
        .await
        .map_err(internal)?
        .ok_or(AppError::ProductNotFound)?;

    let duplicate = ReviewFilter {
        user_id: Some(caller.id),
        product_id: Some(product.id),
        ..Default::default()
    };
    if repo.find_review(&duplicate).await.map_err(internal)?.is_some() {
        return Err(AppError::ReviewAlreadyExists);
    }

    let now = Utc::now();
    let review = Review {
        id: Uuid::new_v4(),
        product_id: product.id,
        user_id: caller.id,
        rating: req.rating,
        comment: req.comment,
        created_at: now,
        updated_at: now,
    };

    repo.create_review(&review)
        .await
        .map_err(|e| write_error(e, AppError::ReviewAlreadyExists, AppError::ProductNotFound))
}

/// Changes the rating and/or comment of one of the caller's reviews.
pub async fn update(
    repo: &dyn Repository,
    caller: &AuthUser,
    req: UpdateReviewRequest,
) -> Result<Review, AppError> {
    req.validate()?;

    let current = owned_review(repo, caller, req.review_id).await?;
    let review = Review {
        rating: req.rating.unwrap_or(current.rating),
        comment: req.comment.unwrap_or_else(|| current.comment.clone()),
        updated_at: Utc::now(),
        ..current
    };

    repo.update_review(&review)
        .await
        .map_err(|e| write_error(e, AppError::ReviewAlreadyExists, AppError::ReviewNotFound))
}

pub async fn delete(
    repo: &dyn Repository,
    caller: &AuthUser,
    req: DeleteReviewRequest,
) -> Result<(), AppError> {
    req.validate()?;

    let review = owned_review(repo, caller, req.review_id).await?;
    repo.delete_review(review.id)
        .await
        .map_err(|e| write_error(e, AppError::ReviewAlreadyExists, AppError::ReviewNotFound))
}

pub async fn list(repo: &dyn Repository, query: ListReviewsQuery) -> Result<Page<Review>, AppError> {
    let filter = ReviewFilter {
        product_name: query.product_name.filter(|name| !name.trim().is_empty()),
        pagination: validation::pagination(query.page, query.limit)?,
        ..Default::default()
    };

    let (result, count) = tokio::try_join!(
        repo.list_reviews(&filter),
        repo.count_reviews(&filter)
    )
    .map_err(internal)?;

    Ok(Page { count, result })
}

pub async fn summary(repo: &dyn Repository) -> Result<CountResponse, AppError> {
    let count = repo
        .count_reviews(&ReviewFilter::default())
        .await
        .map_err(internal)?;
    Ok(CountResponse { count })
}
