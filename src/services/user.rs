use chrono::Utc;
use uuid::Uuid;

use super::{internal, write_error};
use crate::{
    auth::{self, AuthUser, TokenKind, TokenService},
    error::AppError,
    models::{
        ChangePasswordRequest, ForgetPasswordRequest, ListUsersQuery, LoginRequest, Page,
        RefreshTokenRequest, RegisterRequest, Role, TokenPair, UpdateUserRequest, User,
    },
    policy::{self, OwnershipRule},
    repository::{Repository, UserFilter},
    validation::{self, Validate},
};

async fn find_by_username(repo: &dyn Repository, username: &str) -> Result<Option<User>, AppError> {
    let filter = UserFilter {
        username: Some(username.to_string()),
        ..Default::default()
    };
    repo.find_user(&filter).await.map_err(internal)
}

async fn find_by_id(repo: &dyn Repository, id: Uuid) -> Result<User, AppError> {
    let filter = UserFilter {
        id: Some(id),
        ..Default::default()
    };
    repo.find_user(&filter)
        .await
        .map_err(internal)?
        .ok_or(AppError::UserNotFound)
}

async fn save(repo: &dyn Repository, user: &User) -> Result<User, AppError> {
    repo.update_user(user)
        .await
        .map_err(|e| write_error(e, AppError::UserExisted, AppError::UserNotFound))
}

fn token_pair(tokens: &TokenService, subject: Uuid) -> Result<TokenPair, AppError> {
    Ok(TokenPair {
        access_token: tokens.issue(TokenKind::Access, subject)?,
        refresh_token: tokens.issue(TokenKind::Refresh, subject)?,
    })
}

/// register
///
/// New accounts always get the `user` role; the password is stored as an
/// argon2id hash.
pub async fn register(repo: &dyn Repository, req: RegisterRequest) -> Result<User, AppError> {
    req.validate()?;

    if find_by_username(repo, &req.username).await?.is_some() {
        tracing::debug!(username = %req.username, "username already registered");
        return Err(AppError::UserExisted);
    }

    let now = Utc::now();
    let user = User {
        id: Uuid::new_v4(),
        password: auth::hash_password(&req.password)?,
        username: req.username,
        fullname: req.fullname,
        email: req.email,
        phone_number: req.phone_number,
        role: Role::User,
        created_at: now,
        updated_at: now,
    };

    let created = repo
        .create_user(&user)
        .await
        .map_err(|e| write_error(e, AppError::UserExisted, AppError::UserNotFound))?;
    tracing::info!(user_id = %created.id, "user registered");
    Ok(created)
}

/// login
///
/// Unknown username is `UserNotFound`, a wrong password `IncorrectPassword`.
/// On success returns a fresh access/refresh pair.
pub async fn login(
    repo: &dyn Repository,
    tokens: &TokenService,
    req: LoginRequest,
) -> Result<TokenPair, AppError> {
    req.validate()?;

    let user = find_by_username(repo, &req.username)
        .await?
        .ok_or(AppError::UserNotFound)?;

    if !auth::verify_password(&req.password, &user.password) {
        tracing::debug!(user_id = %user.id, "login with incorrect password");
        return Err(AppError::IncorrectPassword);
    }

    token_pair(tokens, user.id)
}

/// refresh
///
/// Trades a valid refresh token for a new pair. The account must still exist.
pub async fn refresh(
    repo: &dyn Repository,
    tokens: &TokenService,
    req: RefreshTokenRequest,
) -> Result<TokenPair, AppError> {
    req.validate()?;

    let claims = tokens.verify(TokenKind::Refresh, &req.refresh_token)?;
    let filter = UserFilter {
        id: Some(claims.sub),
        ..Default::default()
    };
    let user = repo
        .find_user(&filter)
        .await
        .map_err(internal)?
        .ok_or(AppError::Unauthorized)?;

    token_pair(tokens, user.id)
}

/// change_password
///
/// Ownership is checked against the target id before anything else, including
/// payload validation; then the old password has to verify.
pub async fn change_password(
    repo: &dyn Repository,
    rule: OwnershipRule,
    caller: &AuthUser,
    req: ChangePasswordRequest,
) -> Result<(), AppError> {
    policy::ensure_permission(rule, caller, req.id)?;
    req.validate()?;

    let mut user = find_by_id(repo, req.id).await?;
    if !auth::verify_password(&req.old_password, &user.password) {
        return Err(AppError::IncorrectPassword);
    }

    user.password = auth::hash_password(&req.new_password)?;
    user.updated_at = Utc::now();
    save(repo, &user).await?;
    tracing::info!(user_id = %user.id, "password changed");
    Ok(())
}

/// forget_password
///
/// Resets the password of the named account without any proof of possession.
/// Every use is logged at WARN with the caller's id.
pub async fn forget_password(
    repo: &dyn Repository,
    caller: &AuthUser,
    req: ForgetPasswordRequest,
) -> Result<(), AppError> {
    req.validate()?;

    let mut user = find_by_username(repo, &req.username)
        .await?
        .ok_or(AppError::UserNotFound)?;

    user.password = auth::hash_password(&req.new_password)?;
    user.updated_at = Utc::now();
    save(repo, &user).await?;
    tracing::warn!(caller = %caller.id, target = %user.id, "password reset without old password");
    Ok(())
}

/// update
///
/// Applies the provided profile fields. A new username must be free. `role` is
/// only looked at when the caller is an admin; anyone else sending it has it
/// silently ignored.
pub async fn update(
    repo: &dyn Repository,
    rule: OwnershipRule,
    caller: &AuthUser,
    id: Uuid,
    req: UpdateUserRequest,
) -> Result<User, AppError> {
    policy::ensure_permission(rule, caller, id)?;
    validation::required_id("ID", id)?;
    req.validate()?;

    let mut user = find_by_id(repo, id).await?;

    if let Some(username) = req.username {
        if username != user.username {
            if find_by_username(repo, &username).await?.is_some() {
                return Err(AppError::UserExisted);
            }
            user.username = username;
        }
    }
    if let Some(fullname) = req.fullname {
        user.fullname = fullname;
    }
    if let Some(email) = req.email {
        user.email = Some(email);
    }
    if let Some(phone_number) = req.phone_number {
        user.phone_number = Some(phone_number);
    }
    if caller.is_admin() {
        if let Some(role) = req.role.as_deref() {
            user.role = role.parse().map_err(|_| AppError::format("Role"))?;
        }
    }
    user.updated_at = Utc::now();

    let updated = save(repo, &user).await?;
    tracing::info!(user_id = %updated.id, caller = %caller.id, "user updated");
    Ok(updated)
}

/// list
///
/// `name` matches the full name as a case-insensitive substring; `role` must be
/// a known role.
pub async fn list(repo: &dyn Repository, query: ListUsersQuery) -> Result<Page<User>, AppError> {
    let role = query
        .role
        .as_deref()
        .map(str::parse::<Role>)
        .transpose()
        .map_err(|_| AppError::format("Role"))?;

    let filter = UserFilter {
        name_contains: query.name.filter(|name| !name.trim().is_empty()),
        role,
        pagination: validation::pagination(query.page, query.limit)?,
        ..Default::default()
    };

    let (result, count) = tokio::try_join!(repo.list_users(&filter), repo.count_users(&filter))
        .map_err(internal)?;

    Ok(Page { count, result })
}
