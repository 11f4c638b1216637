#![allow(dead_code)]

use std::sync::Arc;

use ailingo_api::auth::jwt::{generate_access_token, JwtConfig};
use ailingo_api::config::ServerConfig;
use ailingo_api::router::build_app_router;
use ailingo_api::state::AppState;
use ailingo_events::{ChangeBus, FinalizerConfig, SweepConfig};
use axum::body::Body;
use axum::http::{Method, Request, Response};
use axum::Router;
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

pub const TEST_UID: &str = "learner-1";

/// Build a test `ServerConfig` with safe defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 30,
        jwt: JwtConfig {
            secret: "test-secret-that-is-long-enough-for-hmac".to_string(),
            access_token_expiry_mins: 15,
        },
        finalizer: FinalizerConfig::default(),
        sweep: SweepConfig::default(),
    }
}

/// Build the full application router over `pool` with a fresh change bus.
pub fn build_test_app(pool: PgPool) -> Router {
    build_test_app_with_bus(pool, Arc::new(ChangeBus::default()))
}

/// Build the full application router publishing onto `bus`, so a test can
/// subscribe before issuing writes.
pub fn build_test_app_with_bus(pool: PgPool, bus: Arc<ChangeBus>) -> Router {
    let config = test_config();
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        bus,
    };
    build_app_router(state, &config)
}

/// A valid bearer token for `uid` signed with the test secret.
pub fn token_for(uid: &str) -> String {
    generate_access_token(uid, &test_config().jwt).expect("token generation should succeed")
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should be readable")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

/// Unauthenticated GET.
pub async fn get(app: Router, uri: &str) -> Response<Body> {
    let request = Request::builder()
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    app.oneshot(request).await.unwrap()
}

/// Request authenticated as `uid`, with an optional JSON body.
pub async fn send_as(
    app: Router,
    uid: &str,
    method: Method,
    uri: &str,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", format!("Bearer {}", token_for(uid)));

    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    app.oneshot(request).await.unwrap()
}
