use std::time::Duration;

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode, errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::{
    AppState,
    config::AppConfig,
    error::AppError,
    models::Role,
    repository::{Repository, RepositoryState, UserFilter},
};

/// Routes reachable without a bearer token. Matched exactly against the
/// request path before any header is looked at.
pub const PUBLIC_PATHS: [&str; 3] = [
    "/api/v1/user/login",
    "/api/v1/user/register",
    "/api/v1/user/refresh-token",
];

const ACCESS_TOKEN_TTL: Duration = Duration::from_secs(15 * 60);
const REFRESH_TOKEN_TTL: Duration = Duration::from_secs(30 * 24 * 60 * 60);

/// Claims
///
/// The payload signed into every token.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Claims {
    /// Subject (sub): the id of the user the token was issued to.
    pub sub: Uuid,
    /// Issuer (iss): must equal the configured issuer on verification.
    pub iss: String,
    /// Issued At (iat), seconds since the epoch.
    pub iat: usize,
    /// Expiration Time (exp), seconds since the epoch. Checked with zero leeway.
    pub exp: usize,
}

/// TokenKind
///
/// Access and refresh tokens are signed with different keys, so one can never
/// be presented in place of the other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

impl TokenKind {
    pub fn ttl(&self) -> Duration {
        match self {
            TokenKind::Access => ACCESS_TOKEN_TTL,
            TokenKind::Refresh => REFRESH_TOKEN_TTL,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum TokenError {
    #[error("token is malformed")]
    Malformed,
    #[error("token has expired")]
    Expired,
    #[error("token signature is invalid")]
    InvalidSignature,
}

impl From<TokenError> for AppError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::Expired => AppError::TokenExpired,
            TokenError::Malformed | TokenError::InvalidSignature => AppError::Unauthorized,
        }
    }
}

#[derive(Clone)]
struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl KeyPair {
    fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

/// TokenService
///
/// Issues and verifies HS256 tokens. Cheap to clone; built once from the config
/// and shared through `AppState`.
#[derive(Clone)]
pub struct TokenService {
    issuer: String,
    access: KeyPair,
    refresh: KeyPair,
}

impl TokenService {
    pub fn new(issuer: impl Into<String>, access_key: &str, refresh_key: &str) -> Self {
        Self {
            issuer: issuer.into(),
            access: KeyPair::from_secret(access_key),
            refresh: KeyPair::from_secret(refresh_key),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(
            config.jwt_issuer.clone(),
            &config.jwt_access_key,
            &config.jwt_refresh_key,
        )
    }

    fn keys(&self, kind: TokenKind) -> &KeyPair {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    pub fn issue(&self, kind: TokenKind, subject: Uuid) -> Result<String, AppError> {
        self.issue_at(kind, subject, Utc::now())
    }

    /// issue_at
    ///
    /// Same as `issue` with an explicit clock. Passing a time far enough in the
    /// past yields a token that is already expired.
    pub fn issue_at(
        &self,
        kind: TokenKind,
        subject: Uuid,
        now: DateTime<Utc>,
    ) -> Result<String, AppError> {
        let iat = now.timestamp().max(0) as usize;
        let claims = Claims {
            sub: subject,
            iss: self.issuer.clone(),
            iat,
            exp: iat + kind.ttl().as_secs() as usize,
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.keys(kind).encoding)
            .map_err(|e| AppError::Internal(format!("token signing failed: {e}")))
    }

    /// verify
    ///
    /// Checks the signature with the key for `kind`, then expiry (no leeway) and
    /// issuer. A wrong issuer is reported as `Malformed`.
    pub fn verify(&self, kind: TokenKind, token: &str) -> Result<Claims, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = true;
        validation.set_issuer(&[self.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "iss", "sub"]);

        decode::<Claims>(token, &self.keys(kind).decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                _ => TokenError::Malformed,
            })
    }
}

// --- Password hashing ---

/// Hash a plain password with argon2id.
pub fn hash_password(password: &str) -> Result<String, AppError> {
    use argon2::Argon2;
    use password_hash::rand_core::OsRng;
    use password_hash::{PasswordHasher, SaltString};

    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))
}

/// Verify a password against an argon2id hash. An unparsable hash never verifies.
pub fn verify_password(password: &str, hash: &str) -> bool {
    use argon2::Argon2;
    use password_hash::{PasswordHash, PasswordVerifier};

    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

// --- Identity ---

/// AuthUser
///
/// The resolved identity of an authenticated request. Handlers receive it as an
/// argument and hand `&AuthUser` to the services; it lives for one request only.
#[derive(Debug, Clone, PartialEq)]
pub struct AuthUser {
    pub id: Uuid,
    pub role: Role,
}

impl AuthUser {
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }
}

/// Pulls the token out of `Authorization: Bearer <token>`. The header must hold
/// exactly two space separated parts.
fn bearer_token(headers: &HeaderMap) -> Result<&str, AppError> {
    let value = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .ok_or(AppError::Unauthorized)?;

    let parts: Vec<&str> = value.split(' ').collect();
    match parts.as_slice() {
        ["Bearer", token] if !token.is_empty() => Ok(*token),
        _ => Err(AppError::Unauthorized),
    }
}

/// resolve_identity
///
/// Verifies the bearer token as an access token and loads the user it names.
/// The user is read fresh on every call, so a deleted account or a changed role
/// takes effect on the next request. A token naming a missing user is
/// `Unauthorized`.
pub async fn resolve_identity(
    repo: &dyn Repository,
    tokens: &TokenService,
    headers: &HeaderMap,
) -> Result<AuthUser, AppError> {
    let token = bearer_token(headers)?;
    let claims = tokens.verify(TokenKind::Access, token).inspect_err(|e| {
        tracing::debug!(error = %e, "bearer token rejected");
    })?;

    let filter = UserFilter {
        id: Some(claims.sub),
        ..Default::default()
    };
    let user = repo
        .find_user(&filter)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?
        .ok_or_else(|| {
            tracing::debug!(sub = %claims.sub, "token subject no longer exists");
            AppError::Unauthorized
        })?;

    Ok(AuthUser {
        id: user.id,
        role: user.role,
    })
}

/// auth_middleware
///
/// Applied to the whole API router. Paths in `PUBLIC_PATHS` pass straight
/// through; every other request must resolve to an identity, which is attached
/// to the request extensions for the extractor and the admin gate.
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    if PUBLIC_PATHS.contains(&request.uri().path()) {
        return Ok(next.run(request).await);
    }

    let identity = resolve_identity(state.repo.as_ref(), &state.tokens, request.headers()).await?;
    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// AuthUser Extractor Implementation
///
/// Reads the identity attached by `auth_middleware`. When a route is mounted
/// without the middleware, it runs the same resolution itself.
///
/// Rejection: `AppError::Unauthorized` / `AppError::TokenExpired`.
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
    RepositoryState: FromRef<S>,
    TokenService: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        if let Some(identity) = parts.extensions.get::<AuthUser>() {
            return Ok(identity.clone());
        }

        let repo = RepositoryState::from_ref(state);
        let tokens = TokenService::from_ref(state);
        let identity = resolve_identity(repo.as_ref(), &tokens, &parts.headers).await?;
        parts.extensions.insert(identity.clone());
        Ok(identity)
    }
}
