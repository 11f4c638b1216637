//! Integration tests for the authenticated `ping` callable.

mod common;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use common::{body_json, send_as, TEST_UID};
use sqlx::PgPool;
use tower::ServiceExt;

async fn post_ping(pool: PgPool, authorization: Option<&str>) -> axum::http::Response<Body> {
    let app = common::build_test_app(pool);
    let mut builder = Request::builder().method(Method::POST).uri("/api/v1/ping");
    if let Some(value) = authorization {
        builder = builder.header("authorization", value);
    }
    app.oneshot(builder.body(Body::empty()).unwrap())
        .await
        .unwrap()
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn ping_echoes_caller_uid(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = send_as(app, TEST_UID, Method::POST, "/api/v1/ping", None).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["ok"], true);
    assert_eq!(json["uid"], TEST_UID);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn ping_without_token_is_unauthenticated(pool: PgPool) {
    let response = post_ping(pool, None).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["code"], "UNAUTHENTICATED");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn ping_with_bad_token_is_unauthenticated(pool: PgPool) {
    let response = post_ping(pool, Some("Bearer not-a-jwt")).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["code"], "UNAUTHENTICATED");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn ping_with_non_bearer_scheme_is_unauthenticated(pool: PgPool) {
    let response = post_ping(pool, Some("Basic dXNlcjpwYXNz")).await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let json = body_json(response).await;
    assert_eq!(json["code"], "UNAUTHENTICATED");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn ping_does_not_touch_the_database(pool: PgPool) {
    let app = common::build_test_app(pool.clone());
    send_as(app, TEST_UID, Method::POST, "/api/v1/ping", None).await;

    let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(users, 0);
}
