// Mutation orchestration per entity.
//
// Every operation follows the same order: structural validation, referential
// and business-rule checks against the repository, then exactly one write.
// Nothing is written unless every check before it passed.

use std::{future::Future, time::Duration};

use crate::{error::AppError, repository::RepositoryError};

pub mod category;
pub mod product;
pub mod review;
pub mod user;
pub mod wishlist;

/// Deadline for user, review and wishlist endpoints.
pub const DEFAULT_DEADLINE: Duration = Duration::from_secs(10);
/// Deadline for category and product endpoints.
pub const CATALOG_DEADLINE: Duration = Duration::from_secs(30);

/// with_deadline
///
/// Runs `operation` under a deadline. When it expires the future is dropped,
/// which cancels any persistence call still in flight, and the caller gets
/// `AppError::Timeout`.
pub async fn with_deadline<T, F>(limit: Duration, operation: F) -> Result<T, AppError>
where
    F: Future<Output = Result<T, AppError>>,
{
    tokio::time::timeout(limit, operation)
        .await
        .map_err(|_| AppError::Timeout)?
}

/// Any repository failure on a read path is internal.
pub(crate) fn internal(err: RepositoryError) -> AppError {
    AppError::Internal(err.to_string())
}

/// Maps a failed write: a unique violation becomes `on_conflict`, a vanished
/// row `on_missing`, anything else is internal.
pub(crate) fn write_error(
    err: RepositoryError,
    on_conflict: AppError,
    on_missing: AppError,
) -> AppError {
    match err {
        RepositoryError::Conflict(constraint) => {
            tracing::debug!(%constraint, "write rejected by unique constraint");
            on_conflict
        }
        RepositoryError::NotFound => on_missing,
        other => internal(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn deadline_expiry_is_a_timeout() {
        let slow = async {
            tokio::time::sleep(Duration::from_secs(5)).await;
            Ok::<_, AppError>(())
        };
        assert_eq!(
            with_deadline(Duration::from_millis(10), slow).await,
            Err(AppError::Timeout)
        );
    }

    #[tokio::test]
    async fn inner_errors_pass_through() {
        let failing = async { Err::<(), _>(AppError::ProductNotFound) };
        assert_eq!(
            with_deadline(CATALOG_DEADLINE, failing).await,
            Err(AppError::ProductNotFound)
        );
    }

    #[test]
    fn write_errors() {
        assert_eq!(
            write_error(
                RepositoryError::Conflict("products_name_key".into()),
                AppError::ProductExisted,
                AppError::ProductNotFound
            ),
            AppError::ProductExisted
        );
        assert_eq!(
            write_error(
                RepositoryError::NotFound,
                AppError::ProductExisted,
                AppError::ProductNotFound
            ),
            AppError::ProductNotFound
        );
    }
}
