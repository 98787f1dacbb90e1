use axum::{
    Json,
    extract::{
        FromRequest, FromRequestParts, Path, Query, Request,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Response},
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Serialize, de::DeserializeOwned};
use utoipa::ToSchema;

use crate::error::AppError;

/// Envelope
///
/// The `{success, data}` wrapper shared by every response body, success or failure.
#[derive(Debug, Serialize, ToSchema)]
pub struct Envelope<T> {
    pub success: bool,
    pub data: T,
}

impl<T> Envelope<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data,
        }
    }

    pub fn failure(data: T) -> Self {
        Self {
            success: false,
            data,
        }
    }
}

/// ApiResponse
///
/// Successful handler output: the payload plus the status code to send it with.
/// Serialized inside a success `Envelope`.
#[derive(Debug)]
pub struct ApiResponse<T: Serialize> {
    pub data: T,
    pub status: StatusCode,
}

impl<T: Serialize> ApiResponse<T> {
    /// 200 OK
    pub fn ok(data: T) -> Self {
        Self {
            data,
            status: StatusCode::OK,
        }
    }

    /// 201 Created
    pub fn created(data: T) -> Self {
        Self {
            data,
            status: StatusCode::CREATED,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (self.status, Json(Envelope::success(self.data))).into_response()
    }
}

/// Empty
///
/// `{}` payload for operations that have nothing to return.
#[derive(Debug, Default, Serialize, ToSchema, PartialEq)]
pub struct Empty {}

// --- Extractors with envelope-shaped rejections ---

static MISSING_FIELD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"missing field `([^`]+)`").expect("static regex"));

/// Renders a serde field name the way validators name fields:
/// `category_id` becomes `CategoryID`, `confirm_password` `ConfirmPassword`.
fn field_label(serde_name: &str) -> String {
    serde_name
        .split('_')
        .map(|part| match part {
            "id" => "ID".to_string(),
            "ids" => "IDs".to_string(),
            _ => {
                let mut chars = part.chars();
                match chars.next() {
                    Some(first) => first.to_ascii_uppercase().to_string() + chars.as_str(),
                    None => String::new(),
                }
            }
        })
        .collect()
}

/// Maps a serde failure message onto the validation taxonomy: a missing field
/// is a `Required` failure on that field, anything else a `Format` failure.
fn rejection_to_validation(detail: &str, fallback_field: &str) -> AppError {
    match MISSING_FIELD.captures(detail).and_then(|caps| caps.get(1)) {
        Some(field) => AppError::required(field_label(field.as_str())),
        None => AppError::format(fallback_field),
    }
}

impl From<JsonRejection> for AppError {
    fn from(rejection: JsonRejection) -> Self {
        rejection_to_validation(&rejection.body_text(), "Body")
    }
}

impl From<QueryRejection> for AppError {
    fn from(rejection: QueryRejection) -> Self {
        rejection_to_validation(&rejection.body_text(), "Query")
    }
}

impl From<PathRejection> for AppError {
    fn from(_: PathRejection) -> Self {
        AppError::format("ID")
    }
}

/// AppJson
///
/// `Json<T>` whose rejection is an `AppError` validation failure.
pub struct AppJson<T>(pub T);

impl<T, S> FromRequest<S> for AppJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state).await?;
        Ok(Self(value))
    }
}

/// AppQuery
///
/// `Query<T>` whose rejection is an `AppError` validation failure.
pub struct AppQuery<T>(pub T);

impl<T, S> FromRequestParts<S> for AppQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

/// AppPath
///
/// `Path<T>` whose rejection is an `AppError` validation failure.
pub struct AppPath<T>(pub T);

impl<T, S> FromRequestParts<S> for AppPath<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(value) = Path::<T>::from_request_parts(parts, state).await?;
        Ok(Self(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ValidationKind;

    #[test]
    fn missing_field_becomes_required() {
        let err = rejection_to_validation(
            "Failed to deserialize the JSON body into the target type: missing field `name` at line 1 column 2",
            "Body",
        );
        assert_eq!(
            err,
            AppError::Validation {
                kind: ValidationKind::Required,
                field: "Name".into()
            }
        );
    }

    #[test]
    fn missing_field_uses_validator_names() {
        assert_eq!(field_label("price"), "Price");
        assert_eq!(field_label("category_id"), "CategoryID");
        assert_eq!(field_label("category_ids"), "CategoryIDs");
        assert_eq!(field_label("confirm_password"), "ConfirmPassword");
        assert_eq!(field_label("phone_number"), "PhoneNumber");

        let err = rejection_to_validation("missing field `price` at line 1 column 20", "Body");
        assert_eq!(err, AppError::required("Price"));
    }

    #[test]
    fn other_serde_errors_become_format() {
        let err = rejection_to_validation("invalid type: string \"x\", expected f64", "Body");
        assert_eq!(err, AppError::format("Body"));
    }
}
