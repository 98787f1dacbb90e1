use axum::{
    Json,
    extract::Request,
    http::{StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::response::Envelope;

/// Lang
///
/// Languages the error message catalog is translated into. English is the
/// default; Vietnamese is selected per request through `Accept-Language`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Lang {
    #[default]
    En,
    Vi,
}

impl Lang {
    /// Picks the catalog language from a raw `Accept-Language` header value.
    /// Only the primary tag of the first entry is considered.
    pub fn from_accept_language(value: &str) -> Self {
        let primary = value
            .split(',')
            .next()
            .unwrap_or_default()
            .trim()
            .split(['-', ';'])
            .next()
            .unwrap_or_default();

        if primary.eq_ignore_ascii_case("vi") {
            Lang::Vi
        } else {
            Lang::En
        }
    }
}

/// ValidationKind
///
/// The three structural validation failures a request payload can produce.
/// Each one has its own stable numeric code and message template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationKind {
    /// A required field is missing or blank.
    Required,
    /// A field is present but malformed (email, phone, role, range...).
    Format,
    /// A confirmation field does not match the field it confirms.
    VerifiedData,
}

/// ErrorCategory
///
/// Coarse taxonomy every `AppError` falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    NotFound,
    Conflict,
    Auth,
    Internal,
}

/// AppError
///
/// The single error type that crosses the service boundary. Every lower-level
/// failure (token decoding, persistence, timeouts) is mapped into one of these
/// variants before it reaches a handler, so the HTTP layer never sees a
/// persistence-specific error shape.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AppError {
    #[error("validation failed for `{field}` ({kind:?})")]
    Validation { kind: ValidationKind, field: String },

    #[error("user not found")]
    UserNotFound,
    #[error("user already exists")]
    UserExisted,
    #[error("wishlist entry not found")]
    WishlistNotFound,

    #[error("token expired")]
    TokenExpired,
    #[error("incorrect password")]
    IncorrectPassword,

    #[error("category already exists")]
    CategoryExisted,
    #[error("category not found")]
    CategoryNotFound,

    #[error("product not found")]
    ProductNotFound,
    #[error("product already exists")]
    ProductExisted,
    #[error("product already in wishlist")]
    ProductAlreadyInWishlist,
    #[error("review not found")]
    ReviewNotFound,
    #[error("review already exists")]
    ReviewAlreadyExists,

    #[error("unauthorized")]
    Unauthorized,
    #[error("forbidden")]
    Forbidden,
    #[error("request timed out")]
    Timeout,
    #[error("rate limit exceeded")]
    RateLimitExceeded,

    /// The detail is logged server-side and never rendered to the client.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    pub fn required(field: impl Into<String>) -> Self {
        AppError::Validation {
            kind: ValidationKind::Required,
            field: field.into(),
        }
    }

    pub fn format(field: impl Into<String>) -> Self {
        AppError::Validation {
            kind: ValidationKind::Format,
            field: field.into(),
        }
    }

    pub fn mismatch(field: impl Into<String>) -> Self {
        AppError::Validation {
            kind: ValidationKind::VerifiedData,
            field: field.into(),
        }
    }

    /// Stable numeric code carried in every error body.
    pub fn code(&self) -> i32 {
        match self {
            AppError::Validation { kind, .. } => match kind {
                ValidationKind::Required => 1,
                ValidationKind::Format => 2,
                ValidationKind::VerifiedData => 3,
            },
            AppError::UserNotFound => 10,
            AppError::UserExisted => 11,
            AppError::WishlistNotFound => 12,
            AppError::TokenExpired => 20,
            AppError::IncorrectPassword => 21,
            AppError::CategoryExisted => 30,
            AppError::CategoryNotFound => 31,
            AppError::ProductNotFound => 40,
            AppError::ProductExisted => 41,
            AppError::ProductAlreadyInWishlist => 42,
            AppError::ReviewNotFound => 43,
            AppError::ReviewAlreadyExists => 44,
            AppError::Unauthorized => 402,
            AppError::Forbidden => 403,
            AppError::Timeout => 408,
            AppError::RateLimitExceeded => 429,
            AppError::Internal(_) => 500,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            AppError::Validation { .. } => ErrorCategory::Validation,
            AppError::UserNotFound
            | AppError::WishlistNotFound
            | AppError::CategoryNotFound
            | AppError::ProductNotFound
            | AppError::ReviewNotFound => ErrorCategory::NotFound,
            AppError::UserExisted
            | AppError::CategoryExisted
            | AppError::ProductExisted
            | AppError::ProductAlreadyInWishlist
            | AppError::ReviewAlreadyExists => ErrorCategory::Conflict,
            AppError::TokenExpired
            | AppError::IncorrectPassword
            | AppError::Unauthorized
            | AppError::Forbidden
            | AppError::RateLimitExceeded => ErrorCategory::Auth,
            AppError::Timeout | AppError::Internal(_) => ErrorCategory::Internal,
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthorized | AppError::TokenExpired => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::RateLimitExceeded => StatusCode::TOO_MANY_REQUESTS,
            AppError::Timeout | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            _ => StatusCode::BAD_REQUEST,
        }
    }

    /// Renders the templated, human-readable message in the requested language.
    pub fn message(&self, lang: Lang) -> String {
        let (en, vi) = match self {
            AppError::Validation { kind, field } => {
                return match (kind, lang) {
                    (ValidationKind::Required, Lang::En) => {
                        format!("{field} is required. Please check again")
                    }
                    (ValidationKind::Required, Lang::Vi) => {
                        format!("{field} không được bỏ trống. Vui lòng kiểm tra lại")
                    }
                    (ValidationKind::Format, Lang::En) => {
                        format!("{field} is invalid. Please check again")
                    }
                    (ValidationKind::Format, Lang::Vi) => {
                        format!("{field} không hợp lệ. Vui lòng kiểm tra lại")
                    }
                    (ValidationKind::VerifiedData, Lang::En) => {
                        format!("{field} is incorrect. Please check again")
                    }
                    (ValidationKind::VerifiedData, Lang::Vi) => {
                        format!("{field} không chính xác. Vui lòng kiểm tra lại")
                    }
                };
            }
            AppError::UserNotFound => (
                "User not found. Please check again",
                "Không tìm thấy người dùng. Vui lòng kiểm tra lại",
            ),
            AppError::UserExisted => (
                "User already exists. Please check again",
                "Người dùng đã đăng ký tài khoản. Vui lòng kiểm tra lại",
            ),
            AppError::WishlistNotFound => (
                "Wishlist not found. Please check again",
                "Không tìm thấy danh sách yêu thích. Vui lòng kiểm tra lại",
            ),
            AppError::TokenExpired => ("Token has expired", "Token đã hết hạn"),
            AppError::IncorrectPassword => ("Password is incorrect", "Mật khẩu không chính xác"),
            AppError::CategoryExisted => (
                "Category already exists. Please check again",
                "Danh mục đã tồn tại. Vui lòng kiểm tra lại",
            ),
            AppError::CategoryNotFound => (
                "Category not found. Please check again",
                "Danh mục không tồn tại. Vui lòng kiểm tra lại",
            ),
            AppError::ProductNotFound => (
                "Product not found. Please check again",
                "Sản phẩm không tồn tại. Vui lòng kiểm tra lại",
            ),
            AppError::ProductExisted => (
                "Product already exists. Please check again",
                "Sản phẩm đã tồn tại. Vui lòng kiểm tra lại",
            ),
            AppError::ProductAlreadyInWishlist => (
                "Product already exists in wishlist. Please check again",
                "Sản phẩm đã tồn tại trong danh sách yêu thích. Vui lòng kiểm tra lại",
            ),
            AppError::ReviewNotFound => (
                "Review not found. Please check again",
                "Không tìm thấy đánh giá. Vui lòng kiểm tra lại",
            ),
            AppError::ReviewAlreadyExists => (
                "You have already reviewed this product. Please check again",
                "Bạn đã đánh giá sản phẩm này. Vui lòng kiểm tra lại",
            ),
            AppError::Unauthorized => ("Unauthorized", "Chưa xác thực"),
            AppError::Forbidden => ("Access forbidden", "Không có quyền truy cập"),
            AppError::Timeout => ("Request timeout", "Hết thời gian xử lý"),
            AppError::RateLimitExceeded => {
                ("Rate limit exceeded", "Đã vượt quá giới hạn yêu cầu")
            }
            AppError::Internal(_) => ("Internal server error", "Lỗi hệ thống"),
        };

        match lang {
            Lang::En => en.to_string(),
            Lang::Vi => vi.to_string(),
        }
    }

    pub fn body(&self, lang: Lang) -> ErrorBody {
        ErrorBody {
            code: self.code(),
            message: self.message(lang),
        }
    }

    fn render(&self, lang: Lang) -> Response {
        let mut response = (self.status(), Json(Envelope::failure(self.body(lang)))).into_response();
        // Kept on the response so `localize_errors` can re-render it.
        response.extensions_mut().insert(self.clone());
        response
    }
}

/// ErrorBody
///
/// The `{code, message}` payload placed under `data` in every error response.
#[derive(Debug, Clone, Serialize, ToSchema, PartialEq)]
pub struct ErrorBody {
    pub code: i32,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        match &self {
            AppError::Internal(detail) => tracing::error!(detail = %detail, "internal error"),
            AppError::Timeout => tracing::warn!("request deadline exceeded"),
            other => tracing::debug!(code = other.code(), "request rejected: {other}"),
        }
        self.render(Lang::En)
    }
}

/// localize_errors
///
/// Middleware re-rendering error responses in the caller's language. Success
/// responses and non-`AppError` failures pass through untouched.
pub async fn localize_errors(request: Request, next: Next) -> Response {
    let lang = request
        .headers()
        .get(header::ACCEPT_LANGUAGE)
        .and_then(|value| value.to_str().ok())
        .map(Lang::from_accept_language)
        .unwrap_or_default();

    let response = next.run(request).await;
    if lang == Lang::En {
        return response;
    }

    match response.extensions().get::<AppError>().cloned() {
        Some(error) => error.render(lang),
        None => response,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(AppError::required("Name").code(), 1);
        assert_eq!(AppError::format("Email").code(), 2);
        assert_eq!(AppError::mismatch("ConfirmPassword").code(), 3);
        assert_eq!(AppError::CategoryExisted.code(), 30);
        assert_eq!(AppError::ReviewAlreadyExists.code(), 44);
        assert_eq!(AppError::Unauthorized.code(), 402);
        assert_eq!(AppError::Internal("boom".into()).code(), 500);
    }

    #[test]
    fn statuses_follow_the_http_contract() {
        assert_eq!(AppError::ProductNotFound.status(), StatusCode::BAD_REQUEST);
        assert_eq!(AppError::TokenExpired.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::RateLimitExceeded.status(), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            AppError::Internal("db".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn validation_messages_name_the_field() {
        let err = AppError::required("Username");
        assert_eq!(err.message(Lang::En), "Username is required. Please check again");
        assert!(err.message(Lang::Vi).starts_with("Username không được bỏ trống"));
    }

    #[test]
    fn internal_detail_never_reaches_the_message() {
        let err = AppError::Internal("relation \"users\" does not exist".into());
        assert_eq!(err.message(Lang::En), "Internal server error");
    }

    #[test]
    fn accept_language_parsing() {
        assert_eq!(Lang::from_accept_language("vi-VN,vi;q=0.9"), Lang::Vi);
        assert_eq!(Lang::from_accept_language("en-US,en;q=0.8"), Lang::En);
        assert_eq!(Lang::from_accept_language(""), Lang::En);
    }

    #[test]
    fn taxonomy() {
        assert_eq!(AppError::ReviewNotFound.category(), ErrorCategory::NotFound);
        assert_eq!(AppError::UserExisted.category(), ErrorCategory::Conflict);
        assert_eq!(AppError::Forbidden.category(), ErrorCategory::Auth);
        assert_eq!(AppError::format("Role").category(), ErrorCategory::Validation);
    }
}
