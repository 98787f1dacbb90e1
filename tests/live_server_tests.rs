mod common;

use std::net::SocketAddr;

use common::{PASSWORD, TestContext};
use reqwest::StatusCode;
use serde_json::{Value, json};
use storefront_api::{AppConfig, models::Role};
use tokio::net::TcpListener;

#[derive(Debug)]
pub struct TestApp {
    pub address: String,
}

/// Serves the app on an ephemeral port, with connection info so the rate
/// limiter keys requests by the real peer address.
async fn spawn_app(ctx: &TestContext) -> TestApp {
    let router = ctx.router();

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .await
        .unwrap();
    });

    TestApp { address }
}

#[tokio::test]
async fn test_health_check() {
    let ctx = TestContext::new();
    let app = spawn_app(&ctx).await;

    let response = reqwest::get(format!("{}/health-check", app.address))
        .await
        .expect("req fail");
    assert!(response.status().is_success());
    assert_eq!(response.text().await.unwrap(), "OK");
}

#[tokio::test]
async fn test_login_and_browse_over_tcp() {
    let ctx = TestContext::new();
    ctx.seed_user("alice", Role::User).await;
    let app = spawn_app(&ctx).await;
    let client = reqwest::Client::new();

    let login: Value = client
        .post(format!("{}/api/v1/user/login", app.address))
        .json(&json!({ "username": "alice", "password": PASSWORD }))
        .send()
        .await
        .expect("login request")
        .json()
        .await
        .expect("login body");
    let token = login["data"]["access_token"].as_str().expect("token");

    let response = client
        .get(format!("{}/api/v1/product/list", app.address))
        .bearer_auth(token)
        .send()
        .await
        .expect("list request");
    assert_eq!(response.status(), StatusCode::OK);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body, json!({ "success": true, "data": { "count": 0, "result": [] } }));
}

#[tokio::test]
async fn test_peer_address_is_rate_limited() {
    let ctx = TestContext::with_config(AppConfig {
        rate_limit_max: 1,
        ..AppConfig::default()
    });
    let app = spawn_app(&ctx).await;
    let client = reqwest::Client::new();
    let url = format!("{}/api/v1/category/list", app.address);

    let first = client.get(&url).send().await.unwrap();
    assert_eq!(first.status(), StatusCode::UNAUTHORIZED);

    let second = client.get(&url).send().await.unwrap();
    assert_eq!(second.status(), StatusCode::TOO_MANY_REQUESTS);
}
