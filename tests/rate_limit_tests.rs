// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Rate limiting through the full router.

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
};
use learnrithm_backend::config::Config;
use tower::ServiceExt;

mod common;
use common::{body_json, create_test_app_with, test_db_offline};

fn login_request(client_ip: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri("/api/v1/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", client_ip)
        .body(Body::from(r#"{"email":"bad","password":"x"}"#))
        .unwrap()
}

fn health_request(client_ip: &str) -> Request<Body> {
    Request::builder()
        .uri("/health")
        .header("x-forwarded-for", client_ip)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_auth_routes_have_stricter_limit() {
    let mut config = Config::test_default();
    config.auth_rate_limit_max_requests = 2;
    config.rate_limit_window_secs = 60;
    let (app, _) = create_test_app_with(config, test_db_offline());

    for _ in 0..2 {
        let response = app.clone().oneshot(login_request("203.0.113.9")).await.unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    let response = app.clone().oneshot(login_request("203.0.113.9")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    let retry_after: u64 = response
        .headers()
        .get(header::RETRY_AFTER)
        .unwrap()
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!((1..=60).contains(&retry_after));
    let json = body_json(response).await;
    assert_eq!(json["error"], "too_many_requests");

    // The Study variant shares the auth limiter
    let study = Request::builder()
        .method("POST")
        .uri("/v2/auth/login")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-forwarded-for", "203.0.113.9")
        .body(Body::from(r#"{"email":"bad","password":"x"}"#))
        .unwrap();
    let response = app.clone().oneshot(study).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

    // Non-auth routes are still available to the same client
    let response = app.clone().oneshot(health_request("203.0.113.9")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Other clients are unaffected
    let response = app.oneshot(login_request("198.51.100.4")).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_general_limit_applies_to_all_routes() {
    let mut config = Config::test_default();
    config.rate_limit_max_requests = 3;
    let (app, _) = create_test_app_with(config, test_db_offline());

    for _ in 0..3 {
        let response = app.clone().oneshot(health_request("192.0.2.1")).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app.clone().oneshot(health_request("192.0.2.1")).await.unwrap();
    assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
    // Security headers are still applied to rejections
    assert_eq!(
        response.headers().get("X-Content-Type-Options").unwrap(),
        "nosniff"
    );

    let response = app.oneshot(health_request("192.0.2.2")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
