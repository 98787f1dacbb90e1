#![allow(dead_code)]

use std::{sync::Arc, time::Duration};

use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use chrono::Utc;
use serde_json::Value;
use storefront_api::{
    AppConfig, AppState, AuthUser, MemoryCounterStore, MemoryRepository, TokenService,
    auth::{self, TokenKind},
    create_router,
    models::{Role, User},
    rate_limit::CounterState,
    repository::{Repository, RepositoryState},
};
use tower::ServiceExt;
use uuid::Uuid;

pub const PASSWORD: &str = "s3cret-pass";

/// Everything a test needs to drive the app and inspect its storage.
pub struct TestContext {
    pub state: AppState,
    pub memory: Arc<MemoryRepository>,
}

impl TestContext {
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    pub fn with_config(config: AppConfig) -> Self {
        let memory = Arc::new(MemoryRepository::new());
        let repo = memory.clone() as RepositoryState;
        let counters = Arc::new(MemoryCounterStore::new()) as CounterState;
        Self {
            state: AppState::new(repo, counters, config),
            memory,
        }
    }

    pub fn repo(&self) -> &dyn Repository {
        self.memory.as_ref()
    }

    pub fn tokens(&self) -> &TokenService {
        &self.state.tokens
    }

    pub fn router(&self) -> Router {
        create_router(self.state.clone())
    }

    /// Inserts a user directly, bypassing registration, with `PASSWORD`.
    pub async fn seed_user(&self, username: &str, role: Role) -> User {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password: auth::hash_password(PASSWORD).expect("hash"),
            fullname: format!("{username} tester"),
            email: None,
            phone_number: None,
            role,
            created_at: now,
            updated_at: now,
        };
        self.repo().create_user(&user).await.expect("seed user")
    }

    pub fn access_token(&self, user: &User) -> String {
        self.tokens()
            .issue(TokenKind::Access, user.id)
            .expect("issue access token")
    }
}

pub fn caller(user: &User) -> AuthUser {
    AuthUser {
        id: user.id,
        role: user.role,
    }
}

/// Test config with a short window and a small budget for rate limit tests.
pub fn limited_config(max: i64) -> AppConfig {
    AppConfig {
        rate_limit_max: max,
        rate_limit_window: Duration::from_secs(60),
        ..AppConfig::default()
    }
}

/// Builds a request from a fixed client address so the rate limiter can key it.
pub fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("x-real-ip", "198.51.100.10");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(json) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    }
}

/// Sends one request through the router and decodes the JSON envelope.
pub async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.oneshot(request).await.expect("router is infallible");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::String(
            String::from_utf8_lossy(&bytes).into_owned(),
        ))
    };
    (status, body)
}
