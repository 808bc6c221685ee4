// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Middleware Integration Tests
//!
//! - `test_auth_*`: Bearer extraction and public paths
//! - `test_permission_*`: Admin route guards and the permission cache
//! - `test_rate_limit_*`: Sliding window limiting over the full stack
//! - `test_cors_*`: Preflight handling
//! - `test_headers_*`: Security and request ID headers on every response

use std::net::SocketAddr;
use std::time::Duration;

use axum::body::Body;
use axum::extract::ConnectInfo;
use axum::http::{Method, Request, header};
use serde_json::json;
use warden_api::response::{CacheClearResponse, PermissionsResponse, RateLimitStatusResponse};
use warden_api::{RateLimitKey, RateLimiter};
use warden_tests::prelude::*;

const WINDOW: Duration = Duration::from_secs(60);

// =============================================================================
// Authentication
// =============================================================================

#[tokio::test]
async fn test_auth_missing_header() {
    let gateway = TestGateway::new();
    let body = gateway
        .get("/api/v1/auth/me", None)
        .await
        .assert_error(StatusCode::UNAUTHORIZED, "UNAUTHORIZED");
    assert!(body.message.contains("Missing"));
}

#[tokio::test]
async fn test_auth_non_bearer_scheme() {
    let gateway = TestGateway::new();
    let req = Request::builder()
        .uri("/api/v1/auth/me")
        .header(header::AUTHORIZATION, "Basic YWxpY2U6c2VjcmV0")
        .body(Body::empty())
        .unwrap();

    gateway
        .send(req)
        .await
        .assert_error(StatusCode::UNAUTHORIZED, "UNAUTHORIZED");
}

#[tokio::test]
async fn test_auth_public_paths_skip_authentication() {
    let gateway = TestGateway::new();
    gateway
        .get("/health", None)
        .await
        .assert_status(StatusCode::OK);
    gateway
        .get("/ready", None)
        .await
        .assert_status(StatusCode::OK);
}

#[tokio::test]
async fn test_auth_unknown_route_still_requires_token() {
    let gateway = TestGateway::new();
    gateway
        .get("/api/v1/nope", None)
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    let token = gateway.access_token("alice");
    gateway
        .get("/api/v1/nope", Some(&token))
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

// =============================================================================
// Permissions
// =============================================================================

#[tokio::test]
async fn test_permission_denied_for_viewer() {
    let gateway = TestGateway::new();
    let token = gateway.access_token("alice");

    gateway
        .post_json("/api/v1/admin/permissions/cache/clear", Some(&token), json!({}))
        .await
        .assert_error(StatusCode::FORBIDDEN, "FORBIDDEN");
    gateway
        .get("/api/v1/admin/rate-limits/user/alice", Some(&token))
        .await
        .assert_error(StatusCode::FORBIDDEN, "FORBIDDEN");
}

#[tokio::test]
async fn test_permission_user_without_roles() {
    let gateway = TestGateway::new();
    let token = gateway.access_token("dave");

    let permissions: PermissionsResponse = gateway
        .get("/api/v1/auth/me/permissions", Some(&token))
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert!(permissions.permissions.is_empty());

    gateway
        .get("/api/v1/admin/rate-limits/user/dave", Some(&token))
        .await
        .assert_status(StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_permission_auditor_reads_rate_limits() {
    let gateway = TestGateway::new();
    let token = gateway.access_token("carol");

    let status: RateLimitStatusResponse = gateway
        .get("/api/v1/admin/rate-limits/user/carol", Some(&token))
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(status.kind, "user");
    assert_eq!(status.identifier, "carol");
    assert_eq!(status.limit, 60);
    // The status request itself was counted.
    assert_eq!(status.remaining, 59);

    // Auditors may not manage.
    gateway
        .post_json("/api/v1/admin/permissions/cache/clear", Some(&token), json!({}))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    gateway
        .get("/api/v1/admin/rate-limits/device/carol", Some(&token))
        .await
        .assert_error(StatusCode::BAD_REQUEST, "BAD_REQUEST");
}

#[tokio::test]
async fn test_permission_cache_is_stale_until_cleared() {
    let gateway = TestGateway::new();
    let alice = gateway.access_token("alice");
    let root = gateway.access_token("root");

    gateway
        .get("/api/v1/admin/rate-limits/user/alice", Some(&alice))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    assert!(gateway.directory().assign_role("alice", "auditor"));

    // Alice's permission set is cached from the denied request.
    gateway
        .get("/api/v1/admin/rate-limits/user/alice", Some(&alice))
        .await
        .assert_status(StatusCode::FORBIDDEN);

    let cleared: CacheClearResponse = gateway
        .post_json(
            "/api/v1/admin/permissions/cache/clear",
            Some(&root),
            json!({ "user_id": "alice" }),
        )
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(cleared.user_id.as_deref(), Some("alice"));
    assert_eq!(cleared.cleared, 1);

    gateway
        .get("/api/v1/admin/rate-limits/user/alice", Some(&alice))
        .await
        .assert_status(StatusCode::OK);
}

#[tokio::test]
async fn test_permission_admin_clears_whole_cache() {
    let gateway = TestGateway::new();
    let root = gateway.access_token("root");

    for user in ["alice", "bob"] {
        let token = gateway.access_token(user);
        gateway
            .get("/api/v1/auth/me/permissions", Some(&token))
            .await
            .assert_status(StatusCode::OK);
    }

    let cleared: CacheClearResponse = gateway
        .post_json("/api/v1/admin/permissions/cache/clear", Some(&root), json!({}))
        .await
        .assert_status(StatusCode::OK)
        .json();
    // alice, bob and root itself, resolved by the permission guard.
    assert_eq!(cleared.cleared, 3);
    assert_eq!(gateway.state().permissions().cached_users(), 0);
}

// =============================================================================
// Rate Limiting
// =============================================================================

#[test]
fn test_rate_limit_window_sequence() {
    let limiter = RateLimiter::new();
    let key = RateLimitKey::user("alice");

    let results: Vec<bool> = (0..3)
        .map(|_| limiter.allow_request(&key, 2, WINDOW))
        .collect();
    assert_eq!(results, vec![true, true, false]);
    assert_eq!(limiter.remaining_attempts(&key, 2, WINDOW), 0);
}

#[tokio::test]
async fn test_rate_limit_rejects_after_limit() {
    let gateway = TestGateway::with_config(ConfigFixtures::rate_limited(2, WINDOW));

    let mut statuses = Vec::new();
    let mut last = None;
    for _ in 0..3 {
        let response = gateway.get("/health", None).await;
        statuses.push(response.status);
        last = Some(response);
    }
    assert_eq!(
        statuses,
        vec![StatusCode::OK, StatusCode::OK, StatusCode::TOO_MANY_REQUESTS]
    );

    let rejected = last.unwrap();
    rejected
        .assert_has_header("retry-after")
        .assert_header("x-ratelimit-limit", "2")
        .assert_header("x-ratelimit-remaining", "0")
        .assert_has_header("x-ratelimit-reset");

    let body: serde_json::Value = rejected.json();
    assert_eq!(body["error"], "RATE_LIMIT_EXCEEDED");
    assert!(body["message"].is_string());
    let retry_after = body["retry_after"].as_u64().unwrap();
    assert!((1..=60).contains(&retry_after));
    assert_eq!(
        rejected.header("retry-after").unwrap(),
        retry_after.to_string()
    );
}

#[tokio::test]
async fn test_rate_limit_headers_on_success() {
    let gateway = TestGateway::with_config(ConfigFixtures::rate_limited(5, WINDOW));
    gateway
        .get("/health", None)
        .await
        .assert_status(StatusCode::OK)
        .assert_header("x-ratelimit-limit", "5")
        .assert_header("x-ratelimit-remaining", "4");
}

#[tokio::test]
async fn test_rate_limit_keys_users_separately() {
    let gateway = TestGateway::with_config(ConfigFixtures::rate_limited(1, WINDOW));
    let alice = gateway.access_token("alice");
    let bob = gateway.access_token("bob");

    // Same peer address, different users.
    gateway
        .get("/api/v1/auth/me", Some(&alice))
        .await
        .assert_status(StatusCode::OK);
    gateway
        .get("/api/v1/auth/me", Some(&bob))
        .await
        .assert_status(StatusCode::OK);
    gateway
        .get("/api/v1/auth/me", Some(&alice))
        .await
        .assert_status(StatusCode::TOO_MANY_REQUESTS);

    // Anonymous traffic from the same address has its own budget.
    gateway
        .get("/health", None)
        .await
        .assert_status(StatusCode::OK);
}

#[tokio::test]
async fn test_rate_limit_keys_peers_separately() {
    let gateway = TestGateway::with_config(ConfigFixtures::rate_limited(1, WINDOW));
    gateway.get("/health", None).await.assert_status(StatusCode::OK);
    gateway
        .get("/health", None)
        .await
        .assert_status(StatusCode::TOO_MANY_REQUESTS);

    let mut req = request(Method::GET, "/health", None, Body::empty());
    let other: SocketAddr = "198.51.100.20:5000".parse().unwrap();
    req.extensions_mut().insert(ConnectInfo(other));
    gateway.send(req).await.assert_status(StatusCode::OK);

    let limiter = gateway.state().limiter();
    assert_eq!(
        limiter.remaining_attempts(&RateLimitKey::ip("203.0.113.7"), 1, WINDOW),
        0
    );
    assert_eq!(
        limiter.remaining_attempts(&RateLimitKey::ip("198.51.100.20"), 1, WINDOW),
        0
    );
}

#[tokio::test]
async fn test_rate_limit_unauthenticated_rejection_is_not_counted() {
    let gateway = TestGateway::with_config(ConfigFixtures::rate_limited(1, WINDOW));

    for _ in 0..3 {
        gateway
            .get("/api/v1/auth/me", None)
            .await
            .assert_status(StatusCode::UNAUTHORIZED);
    }
    gateway.get("/health", None).await.assert_status(StatusCode::OK);
}

// =============================================================================
// CORS
// =============================================================================

fn preflight(origin: &str) -> Request<Body> {
    Request::builder()
        .method(Method::OPTIONS)
        .uri("/api/v1/auth/me")
        .header(header::ORIGIN, origin)
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "GET")
        .header(header::ACCESS_CONTROL_REQUEST_HEADERS, "authorization")
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn test_cors_preflight_without_token() {
    let gateway = TestGateway::new();
    let response = gateway.send(preflight("https://app.example.com")).await;

    response
        .assert_status(StatusCode::OK)
        .assert_header("access-control-allow-origin", "*")
        .assert_has_header("access-control-allow-methods");
}

#[tokio::test]
async fn test_cors_restricted_origins() {
    let mut config = ConfigFixtures::api_config();
    config.cors.allowed_origins = vec!["https://app.example.com".to_string()];
    config.cors.allow_credentials = true;
    let gateway = TestGateway::with_config(config);

    gateway
        .send(preflight("https://app.example.com"))
        .await
        .assert_header("access-control-allow-origin", "https://app.example.com")
        .assert_header("access-control-allow-credentials", "true");

    let denied = gateway.send(preflight("https://evil.example.net")).await;
    assert!(denied.header("access-control-allow-origin").is_none());
}

#[tokio::test]
async fn test_cors_exposes_rate_limit_headers() {
    let gateway = TestGateway::new();
    let req = Request::builder()
        .uri("/health")
        .header(header::ORIGIN, "https://app.example.com")
        .body(Body::empty())
        .unwrap();

    let response = gateway.send(req).await;
    let exposed = response
        .header("access-control-expose-headers")
        .unwrap()
        .to_ascii_lowercase();
    assert!(exposed.contains("x-ratelimit-remaining"));
    assert!(exposed.contains("retry-after"));
}

// =============================================================================
// Response Headers
// =============================================================================

fn assert_security_headers(response: &TestResponse) {
    response
        .assert_header("x-content-type-options", "nosniff")
        .assert_header("x-frame-options", "DENY")
        .assert_header("referrer-policy", "no-referrer")
        .assert_has_header("content-security-policy")
        .assert_has_header("strict-transport-security")
        .assert_has_header("x-request-id");
}

#[tokio::test]
async fn test_headers_on_success_and_rejections() {
    let gateway = TestGateway::with_config(ConfigFixtures::rate_limited(1, WINDOW));

    let ok = gateway.get("/health", None).await;
    ok.assert_status(StatusCode::OK);
    assert_security_headers(&ok);

    let unauthorized = gateway.get("/api/v1/auth/me", None).await;
    unauthorized.assert_status(StatusCode::UNAUTHORIZED);
    assert_security_headers(&unauthorized);

    let limited = gateway.get("/health", None).await;
    limited.assert_status(StatusCode::TOO_MANY_REQUESTS);
    assert_security_headers(&limited);

    let token = gateway.access_token("alice");
    let forbidden = gateway
        .get("/api/v1/admin/rate-limits/user/alice", Some(&token))
        .await;
    forbidden.assert_status(StatusCode::FORBIDDEN);
    assert_security_headers(&forbidden);
}

#[tokio::test]
async fn test_headers_request_id_is_propagated() {
    let gateway = TestGateway::new();
    let req = Request::builder()
        .uri("/health")
        .header("x-request-id", "req-1234")
        .body(Body::empty())
        .unwrap();

    gateway
        .send(req)
        .await
        .assert_header("x-request-id", "req-1234");
}
