use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};

use async_trait::async_trait;
use axum::{
    extract::{ConnectInfo, Request, State},
    http::HeaderMap,
    middleware::Next,
    response::Response,
};
use redis::{Client, Pipeline, aio::ConnectionManager};
use thiserror::Error;
use tokio::sync::Mutex;

use crate::{AppState, error::AppError};

#[derive(Debug, Error)]
pub enum CounterError {
    #[error("redis: {0}")]
    Redis(#[from] redis::RedisError),
}

/// CounterStore
///
/// A shared counter keyed by string. `incr` bumps the counter and returns the
/// new value; the counter starts over once `window` has elapsed since its
/// first increment.
#[async_trait]
pub trait CounterStore: Send + Sync {
    async fn incr(&self, key: &str, window: Duration) -> Result<i64, CounterError>;
}

pub type CounterState = Arc<dyn CounterStore>;

/// RedisCounterStore
///
/// `INCR` and `EXPIRE ... NX` sent as one `MULTI`/`EXEC` transaction, so a
/// counter can never be left without a TTL. `NX` keeps the TTL set by the
/// first increment of the window (Redis 7 or later).
/// `ConnectionManager` reconnects on its own and is cheap to clone per call.
#[derive(Clone)]
pub struct RedisCounterStore {
    manager: ConnectionManager,
}

impl RedisCounterStore {
    pub async fn connect(redis_url: &str) -> Result<Self, CounterError> {
        let client = Client::open(redis_url)?;
        let manager = ConnectionManager::new(client).await?;
        Ok(Self { manager })
    }
}

fn counter_pipeline(key: &str, window: Duration) -> Pipeline {
    let mut pipe = redis::pipe();
    pipe.atomic()
        .incr(key, 1)
        .cmd("EXPIRE")
        .arg(key)
        .arg(window.as_secs().max(1))
        .arg("NX")
        .ignore();
    pipe
}

#[async_trait]
impl CounterStore for RedisCounterStore {
    async fn incr(&self, key: &str, window: Duration) -> Result<i64, CounterError> {
        let mut conn = self.manager.clone();
        let (count,): (i64,) = counter_pipeline(key, window)
            .query_async(&mut conn)
            .await?;
        Ok(count)
    }
}

/// MemoryCounterStore
///
/// Process-local counters with the same windowing as Redis.
#[derive(Default)]
pub struct MemoryCounterStore {
    counters: Mutex<HashMap<String, (i64, Instant)>>,
}

impl MemoryCounterStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CounterStore for MemoryCounterStore {
    async fn incr(&self, key: &str, window: Duration) -> Result<i64, CounterError> {
        let mut counters = self.counters.lock().await;
        let now = Instant::now();
        let entry = counters.entry(key.to_string()).or_insert((0, now));
        if now.duration_since(entry.1) >= window {
            *entry = (0, now);
        }
        entry.0 += 1;
        Ok(entry.0)
    }
}

/// Resolves the caller's address: the first `X-Forwarded-For` hop, then
/// `X-Real-IP`, then the socket peer address.
fn client_ip(headers: &HeaderMap, peer: Option<SocketAddr>) -> Option<String> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split(',').next())
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .map(str::to_string)
    };

    header("x-forwarded-for")
        .or_else(|| header("x-real-ip"))
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
}

/// rate_limit_middleware
///
/// Counts requests per client address under `ip:<address>` and rejects with
/// 429 once the count exceeds the configured maximum within the window. A
/// request whose address cannot be determined is rejected the same way.
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);

    let Some(ip) = client_ip(request.headers(), peer) else {
        tracing::warn!("rejecting request without a resolvable client address");
        return Err(AppError::RateLimitExceeded);
    };

    let count = state
        .counters
        .incr(&format!("ip:{ip}"), state.config.rate_limit_window)
        .await
        .map_err(|e| AppError::Internal(e.to_string()))?;

    if count > state.config.rate_limit_max {
        tracing::warn!(%ip, count, "rate limit exceeded");
        return Err(AppError::RateLimitExceeded);
    }

    Ok(next.run(request).await)
}
