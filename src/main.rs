use std::{net::SocketAddr, sync::Arc};

use sqlx::postgres::PgPoolOptions;
use storefront_api::{
    AppState,
    config::{AppConfig, Env},
    create_router,
    rate_limit::{CounterState, RedisCounterStore},
    repository::{PostgresRepository, RepositoryState},
};
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// main
///
/// Loads configuration, installs logging, connects Postgres (running pending
/// migrations) and Redis, then serves the API until SIGINT/SIGTERM.
#[tokio::main]
async fn main() {
    // 1. Configuration & Environment Loading (Fail-Fast)
    dotenv::dotenv().ok();
    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(err) => {
            eprintln!("FATAL: invalid configuration: {err}");
            std::process::exit(1);
        }
    };

    // 2. Logging Filter Setup
    // RUST_LOG wins when set.
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "storefront_api=debug,tower_http=info,axum=info".into());

    // 3. Pretty output locally, JSON lines in production.
    match config.env {
        Env::Local => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().pretty())
                .init();
        }
        Env::Production => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
    }

    tracing::info!("Application starting in {:?} mode", config.env);

    // 4. Database Initialization (Postgres)
    let pool = match PgPoolOptions::new()
        .max_connections(5)
        .connect(&config.db_url)
        .await
    {
        Ok(pool) => pool,
        Err(err) => {
            tracing::error!(error = %err, "FATAL: failed to connect to Postgres, check DATABASE_URL");
            std::process::exit(1);
        }
    };

    if let Err(err) = sqlx::migrate!("./migrations").run(&pool).await {
        tracing::error!(error = %err, "FATAL: database migration failed");
        std::process::exit(1);
    }

    let repo = Arc::new(PostgresRepository::new(pool)) as RepositoryState;

    // 5. Rate limiter counters (Redis)
    let counters = match RedisCounterStore::connect(&config.redis_url).await {
        Ok(store) => Arc::new(store) as CounterState,
        Err(err) => {
            tracing::error!(error = %err, "FATAL: failed to connect to Redis, check REDIS_URL");
            std::process::exit(1);
        }
    };

    // 6. Unified State Assembly
    let port = config.port;
    let app = create_router(AppState::new(repo, counters, config));

    // 7. Server Startup
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(error = %err, %addr, "FATAL: failed to bind listener");
            std::process::exit(1);
        }
    };

    tracing::info!("Listening on {addr}");
    tracing::info!("API Documentation (Swagger UI) available at: http://localhost:{port}/swagger-ui");

    // ConnectInfo feeds the rate limiter's fallback client address.
    let server = axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal());

    if let Err(err) = server.await {
        tracing::error!(error = %err, "server terminated with an error");
        std::process::exit(1);
    }

    tracing::info!("shutdown complete");
}

/// Resolves on Ctrl+C, or SIGTERM on unix.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %err, "failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("shutdown signal received, draining connections");
}
