use chrono::Utc;
use uuid::Uuid;

use super::{internal, write_error};
use crate::{
    auth::AuthUser,
    error::AppError,
    models::{AddToWishlistRequest, CountResponse, ListWishlistsQuery, Page, Wishlist},
    repository::{ProductFilter, Repository, WishlistFilter},
    validation::{self, Validate},
};

/// add
///
/// The product must exist and must not already be on the caller's wishlist.
pub async fn add(
    repo: &dyn Repository,
    caller: &AuthUser,
    req: AddToWishlistRequest,
) -> Result<Wishlist, AppError> {
    req.validate()?;

    let product = repo
        .find_product(&ProductFilter {
            id: Some(req.product_id),
            ..Default::default()
        })
        .await
        .map_err(internal)?
        .ok_or(AppError::ProductNotFound)?;

    let duplicate = WishlistFilter {
        user_id: Some(caller.id),
        product_id: Some(product.id),
        ..Default::default()
    };
    if repo.find_wishlist(&duplicate).await.map_err(internal)?.is_some() {
        return Err(AppError::ProductAlreadyInWishlist);
    }

    let now = Utc::now();
    let wishlist = Wishlist {
        id: Uuid::new_v4(),
        user_id: caller.id,
        product_id: product.id,
        created_at: now,
        updated_at: now,
    };

    repo.create_wishlist(&wishlist).await.map_err(|e| {
        write_error(e, AppError::ProductAlreadyInWishlist, AppError::ProductNotFound)
    })
}

/// delete
///
/// Only entries owned by the caller can be removed; anything else is
/// `WishlistNotFound`.
pub async fn delete(repo: &dyn Repository, caller: &AuthUser, id: Uuid) -> Result<(), AppError> {
    validation::required_id("ID", id)?;

    let filter = WishlistFilter {
        id: Some(id),
        user_id: Some(caller.id),
        ..Default::default()
    };
    let wishlist = repo
        .find_wishlist(&filter)
        .await
        .map_err(internal)?
        .ok_or(AppError::WishlistNotFound)?;

    repo.delete_wishlist(wishlist.id).await.map_err(|e| {
        write_error(e, AppError::ProductAlreadyInWishlist, AppError::WishlistNotFound)
    })
}

/// The caller's own entries, newest first.
pub async fn list(
    repo: &dyn Repository,
    caller: &AuthUser,
    query: ListWishlistsQuery,
) -> Result<Page<Wishlist>, AppError> {
    let filter = WishlistFilter {
        user_id: Some(caller.id),
        pagination: validation::pagination(query.page, query.limit)?,
        ..Default::default()
    };

    let (result, count) = tokio::try_join!(
        repo.list_wishlists(&filter),
        repo.count_wishlists(&filter)
    )
    .map_err(internal)?;

    Ok(Page { count, result })
}

pub async fn summary(repo: &dyn Repository) -> Result<CountResponse, AppError> {
    let count = repo
        .count_wishlists(&WishlistFilter::default())
        .await
        .map_err(internal)?;
    Ok(CountResponse { count })
}
