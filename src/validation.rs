use once_cell::sync::Lazy;
use regex::Regex;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        ChangePasswordRequest, CreateCategoryRequest, CreateProductRequest, CreateReviewRequest,
        DeleteProductRequest, DeleteReviewRequest, ForgetPasswordRequest, LoginRequest,
        RefreshTokenRequest, RegisterRequest, UpdateProductRequest, UpdateReviewRequest,
        UpdateUserRequest, AddToWishlistRequest,
    },
    repository::{Pagination, ProductSortField, Sort, SortDirection},
};

static EMAIL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$").expect("static regex")
});

// Vietnamese mobile numbers: ten digits for current carrier prefixes, eleven
// for the retired 01x prefixes.
static PHONE_NUMBER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(?:03[2-9]|07[06-9]|08[1-5]|09[0-9])[0-9]{7}|01[2689][0-9]{8})$")
        .expect("static regex")
});

static NON_ALPHANUMERIC: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^a-zA-Z0-9]+").expect("static regex"));

/// Validate
///
/// Structural checks on a request payload. Runs before any repository call, so
/// a failing payload never causes a write. Returns the first failing field.
pub trait Validate {
    fn validate(&self) -> Result<(), AppError>;
}

// --- Field rules ---

pub fn required(field: &str, value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        Err(AppError::required(field))
    } else {
        Ok(())
    }
}

pub fn required_id(field: &str, id: Uuid) -> Result<(), AppError> {
    if id.is_nil() {
        Err(AppError::required(field))
    } else {
        Ok(())
    }
}

/// Confirmation fields must repeat the value they confirm.
pub fn equal_field(field: &str, value: &str, confirmed: &str) -> Result<(), AppError> {
    if value == confirmed {
        Ok(())
    } else {
        Err(AppError::mismatch(field))
    }
}

pub fn email(field: &str, value: &str) -> Result<(), AppError> {
    if EMAIL.is_match(value) {
        Ok(())
    } else {
        Err(AppError::format(field))
    }
}

pub fn phone_number(field: &str, value: &str) -> Result<(), AppError> {
    if PHONE_NUMBER.is_match(value) {
        Ok(())
    } else {
        Err(AppError::format(field))
    }
}

/// Zero is a missing price; a negative or non-finite one is malformed.
pub fn price(value: f64) -> Result<(), AppError> {
    if value == 0.0 {
        Err(AppError::required("Price"))
    } else if !value.is_finite() || value < 0.0 {
        Err(AppError::format("Price"))
    } else {
        Ok(())
    }
}

pub fn quantity(value: i64) -> Result<(), AppError> {
    if value < 0 {
        Err(AppError::format("Quantity"))
    } else {
        Ok(())
    }
}

pub fn rating(value: f64) -> Result<(), AppError> {
    if (1.0..=5.0).contains(&value) {
        Ok(())
    } else {
        Err(AppError::format("Rating"))
    }
}

fn optional<F>(value: Option<&String>, rule: F) -> Result<(), AppError>
where
    F: Fn(&str) -> Result<(), AppError>,
{
    match value {
        Some(value) => rule(value),
        None => Ok(()),
    }
}

// --- Query parameter parsing ---

/// Resolves optional `page` / `limit` query values, defaulting to 1 / 10. A page
/// whose offset does not fit in an `i64` is malformed.
pub fn pagination(page: Option<i64>, limit: Option<i64>) -> Result<Pagination, AppError> {
    let page = page.unwrap_or(Pagination::DEFAULT_PAGE);
    let limit = limit.unwrap_or(Pagination::DEFAULT_LIMIT);
    if page < 1 {
        return Err(AppError::format("Page"));
    }
    if !(1..=Pagination::MAX_LIMIT).contains(&limit) {
        return Err(AppError::format("Limit"));
    }
    if (page - 1).checked_mul(limit).is_none() {
        return Err(AppError::format("Page"));
    }
    Ok(Pagination { page, limit })
}

/// Parses a comma-separated list of category ids. Blank entries are skipped.
pub fn category_ids(raw: Option<&str>) -> Result<Vec<Uuid>, AppError> {
    raw.unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| Uuid::parse_str(part).map_err(|_| AppError::format("CategoryIDs")))
        .collect()
}

pub fn sort(field: Option<&str>, order: Option<&str>) -> Result<Sort, AppError> {
    let field = match field {
        None => ProductSortField::default(),
        Some("name") => ProductSortField::Name,
        Some("price") => ProductSortField::Price,
        Some("quantity") => ProductSortField::Quantity,
        Some("created_at") => ProductSortField::CreatedAt,
        Some(_) => return Err(AppError::format("SortField")),
    };
    let direction = match order.map(str::to_ascii_lowercase).as_deref() {
        None => SortDirection::default(),
        Some("asc") => SortDirection::Asc,
        Some("desc") => SortDirection::Desc,
        Some(_) => return Err(AppError::format("SortOrder")),
    };
    Ok(Sort { field, direction })
}

/// Lowercase slug: every run of non-alphanumeric characters becomes one `-`.
pub fn slugify(name: &str) -> String {
    NON_ALPHANUMERIC
        .replace_all(name.trim(), "-")
        .trim_matches('-')
        .to_lowercase()
}

// --- Payload rules ---

impl Validate for CreateCategoryRequest {
    fn validate(&self) -> Result<(), AppError> {
        required("Name", &self.name)
    }
}

impl Validate for CreateProductRequest {
    fn validate(&self) -> Result<(), AppError> {
        required("Name", &self.name)?;
        price(self.price)?;
        quantity(self.quantity)?;
        required_id("CategoryID", self.category_id)
    }
}

impl Validate for UpdateProductRequest {
    fn validate(&self) -> Result<(), AppError> {
        required_id("ID", self.id)?;
        required("Name", &self.name)?;
        price(self.price)?;
        quantity(self.quantity)?;
        required_id("CategoryID", self.category_id)
    }
}

impl Validate for DeleteProductRequest {
    fn validate(&self) -> Result<(), AppError> {
        required_id("ID", self.id)
    }
}

impl Validate for CreateReviewRequest {
    fn validate(&self) -> Result<(), AppError> {
        required_id("ProductID", self.product_id)?;
        rating(self.rating)
    }
}

impl Validate for UpdateReviewRequest {
    fn validate(&self) -> Result<(), AppError> {
        required_id("ReviewID", self.review_id)?;
        match self.rating {
            Some(value) => rating(value),
            None => Ok(()),
        }
    }
}

impl Validate for DeleteReviewRequest {
    fn validate(&self) -> Result<(), AppError> {
        required_id("ReviewID", self.review_id)
    }
}

impl Validate for AddToWishlistRequest {
    fn validate(&self) -> Result<(), AppError> {
        required_id("ProductID", self.product_id)
    }
}

impl Validate for RegisterRequest {
    fn validate(&self) -> Result<(), AppError> {
        required("Username", &self.username)?;
        required("Password", &self.password)?;
        required("Fullname", &self.fullname)?;
        required("ConfirmPassword", &self.confirm_password)?;
        equal_field("ConfirmPassword", &self.password, &self.confirm_password)?;
        optional(self.email.as_ref(), |value| email("Email", value))?;
        optional(self.phone_number.as_ref(), |value| {
            phone_number("PhoneNumber", value)
        })
    }
}

impl Validate for LoginRequest {
    fn validate(&self) -> Result<(), AppError> {
        required("Username", &self.username)?;
        required("Password", &self.password)
    }
}

impl Validate for RefreshTokenRequest {
    fn validate(&self) -> Result<(), AppError> {
        required("RefreshToken", &self.refresh_token)
    }
}

impl Validate for ChangePasswordRequest {
    fn validate(&self) -> Result<(), AppError> {
        required_id("ID", self.id)?;
        required("OldPassword", &self.old_password)?;
        required("NewPassword", &self.new_password)?;
        required("ConfirmPassword", &self.confirm_password)?;
        equal_field("ConfirmPassword", &self.new_password, &self.confirm_password)
    }
}

impl Validate for ForgetPasswordRequest {
    fn validate(&self) -> Result<(), AppError> {
        required("Username", &self.username)?;
        required("NewPassword", &self.new_password)?;
        required("ConfirmPassword", &self.confirm_password)?;
        equal_field("ConfirmPassword", &self.new_password, &self.confirm_password)
    }
}

impl Validate for UpdateUserRequest {
    fn validate(&self) -> Result<(), AppError> {
        optional(self.username.as_ref(), |value| required("Username", value))?;
        optional(self.fullname.as_ref(), |value| required("Fullname", value))?;
        optional(self.email.as_ref(), |value| email("Email", value))?;
        optional(self.phone_number.as_ref(), |value| {
            phone_number("PhoneNumber", value)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationKind;

    fn register() -> RegisterRequest {
        RegisterRequest {
            username: "alice".into(),
            password: "123456".into(),
            confirm_password: "123456".into(),
            fullname: "Alice".into(),
            email: None,
            phone_number: None,
        }
    }

    #[test]
    fn register_checks_fields_in_order() {
        assert!(register().validate().is_ok());

        let blank = RegisterRequest {
            username: "  ".into(),
            ..register()
        };
        assert_eq!(blank.validate(), Err(AppError::required("Username")));

        let mismatched = RegisterRequest {
            confirm_password: "1234567".into(),
            ..register()
        };
        let err = mismatched.validate().unwrap_err();
        assert_eq!(err.code(), 3);
        assert!(matches!(
            err,
            AppError::Validation {
                kind: ValidationKind::VerifiedData,
                ..
            }
        ));
    }

    #[test]
    fn email_and_phone_formats() {
        assert!(email("Email", "alice@example.com").is_ok());
        assert_eq!(email("Email", "alice@"), Err(AppError::format("Email")));

        assert!(phone_number("PhoneNumber", "0912345678").is_ok());
        assert!(phone_number("PhoneNumber", "0321234567").is_ok());
        assert!(phone_number("PhoneNumber", "0111234567").is_err());
        assert!(phone_number("PhoneNumber", "01212345678").is_ok());
        assert!(phone_number("PhoneNumber", "0121234567").is_err());
        assert!(phone_number("PhoneNumber", "091234567890").is_err());
        assert!(phone_number("PhoneNumber", "12345").is_err());
    }

    #[test]
    fn numeric_ranges() {
        assert!(rating(1.0).is_ok());
        assert!(rating(5.0).is_ok());
        assert!(rating(0.5).is_err());
        assert!(rating(f64::NAN).is_err());

        assert_eq!(price(0.0), Err(AppError::required("Price")));
        assert_eq!(price(-3.0), Err(AppError::format("Price")));
        assert!(quantity(0).is_ok());
        assert!(quantity(-1).is_err());
    }

    #[test]
    fn pagination_defaults_and_bounds() {
        assert_eq!(pagination(None, None), Ok(Pagination { page: 1, limit: 10 }));
        assert_eq!(pagination(Some(0), None), Err(AppError::format("Page")));
        assert_eq!(pagination(None, Some(101)), Err(AppError::format("Limit")));
        assert_eq!(pagination(Some(2), Some(100)), Ok(Pagination { page: 2, limit: 100 }));
    }

    #[test]
    fn pagination_offset_overflow_is_malformed() {
        assert_eq!(pagination(Some(i64::MAX), None), Err(AppError::format("Page")));
        assert_eq!(
            pagination(Some(i64::MAX / 100 + 2), Some(100)),
            Err(AppError::format("Page"))
        );
        let last = pagination(Some(i64::MAX / 10), None).unwrap();
        assert!(last.offset() > 0);
    }

    #[test]
    fn category_id_lists() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(category_ids(None), Ok(vec![]));
        assert_eq!(category_ids(Some(&format!("{a}, {b},"))), Ok(vec![a, b]));
        assert_eq!(
            category_ids(Some("not-a-uuid")),
            Err(AppError::format("CategoryIDs"))
        );
    }

    #[test]
    fn sort_whitelist() {
        assert_eq!(
            sort(Some("price"), Some("ASC")),
            Ok(Sort {
                field: ProductSortField::Price,
                direction: SortDirection::Asc
            })
        );
        assert_eq!(
            sort(Some("id; DROP TABLE products"), None),
            Err(AppError::format("SortField"))
        );
    }

    #[test]
    fn slugs() {
        assert_eq!(slugify("Hello World"), "hello-world");
        assert_eq!(slugify("  Board Games & Puzzles! "), "board-games-puzzles");
        assert_eq!(slugify("Atlas"), "atlas");
    }
}
