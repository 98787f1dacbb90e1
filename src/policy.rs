use std::str::FromStr;

use axum::{extract::Request, middleware::Next, response::Response};
use uuid::Uuid;

use crate::{auth::AuthUser, error::AppError, models::Role};

/// OwnershipRule
///
/// How a caller's identity is compared with the owner of the row it wants to
/// mutate (currently user profiles: change password, update user).
///
/// `SelfOrAdmin` lets owners act on their own rows and admins act on anyone's.
/// `SelfAndAdmin` only lets an admin act on their own row; it exists to keep
/// deployments that depend on that stricter behaviour working.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OwnershipRule {
    #[default]
    SelfOrAdmin,
    SelfAndAdmin,
}

impl FromStr for OwnershipRule {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "self-or-admin" => Ok(OwnershipRule::SelfOrAdmin),
            "self-and-admin" => Ok(OwnershipRule::SelfAndAdmin),
            other => Err(other.to_string()),
        }
    }
}

/// is_valid_permission
///
/// Ownership gate. Pure function of the caller, the target row's owner and the
/// configured rule.
pub fn is_valid_permission(rule: OwnershipRule, caller: &AuthUser, target_id: Uuid) -> bool {
    let owns = caller.id == target_id;
    match (rule, caller.role) {
        (OwnershipRule::SelfOrAdmin, Role::Admin) => true,
        (OwnershipRule::SelfOrAdmin, Role::User) => owns,
        (OwnershipRule::SelfAndAdmin, Role::Admin) => owns,
        (OwnershipRule::SelfAndAdmin, Role::User) => false,
    }
}

/// Same as `is_valid_permission`, as a `Result` for use with `?`.
pub fn ensure_permission(
    rule: OwnershipRule,
    caller: &AuthUser,
    target_id: Uuid,
) -> Result<(), AppError> {
    if is_valid_permission(rule, caller, target_id) {
        Ok(())
    } else {
        tracing::debug!(caller = %caller.id, target = %target_id, "ownership check failed");
        Err(AppError::Unauthorized)
    }
}

/// require_admin
///
/// Admin gate: no identity at all is `Unauthorized`, a non-admin identity is
/// `Forbidden`.
pub fn require_admin(identity: Option<&AuthUser>) -> Result<(), AppError> {
    match identity.map(|user| user.role) {
        None => Err(AppError::Unauthorized),
        Some(Role::Admin) => Ok(()),
        Some(Role::User) => Err(AppError::Forbidden),
    }
}

/// admin_middleware
///
/// Route layer applied to admin-only routes. Runs after `auth_middleware`, so it
/// only inspects the identity already attached to the request.
pub async fn admin_middleware(request: Request, next: Next) -> Result<Response, AppError> {
    require_admin(request.extensions().get::<AuthUser>())?;
    Ok(next.run(request).await)
}
