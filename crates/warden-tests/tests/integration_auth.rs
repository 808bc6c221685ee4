// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Authentication Integration Tests
//!
//! - `test_login_*`: Credential login
//! - `test_token_*`: Token validation through the auth middleware
//! - `test_refresh_*`: Refresh token rotation
//! - `test_logout_*`: Revocation on logout

use chrono::{Duration as ChronoDuration, Utc};
use serde_json::json;
use warden_api::auth::{Claims, JwtService, TokenType};
use warden_api::response::{CurrentUserResponse, PermissionsResponse, TokenPairResponse};
use warden_tests::prelude::*;

// =============================================================================
// Login
// =============================================================================

#[tokio::test]
async fn test_login_by_id_and_email() {
    let gateway = TestGateway::new();

    let pair = gateway.login("alice", AccessFixtures::PASSWORD).await;
    assert_eq!(pair.token_type, "Bearer");
    assert_eq!(pair.expires_in, 15 * 60);
    assert_eq!(pair.refresh_expires_in, 7 * 24 * 60 * 60);

    let claims = gateway
        .state()
        .jwt()
        .validate_access_token(&pair.access_token)
        .unwrap();
    assert_eq!(claims.user_id(), "alice");
    assert_eq!(claims.roles(), ["viewer".to_string()]);

    let pair = gateway
        .login("alice@example.com", AccessFixtures::PASSWORD)
        .await;
    assert!(!pair.access_token.is_empty());
}

#[tokio::test]
async fn test_login_rejects_bad_credentials() {
    let gateway = TestGateway::new();

    let wrong_password = gateway
        .post_json(
            "/api/v1/auth/login",
            None,
            json!({ "login": "alice", "password": "wrong" }),
        )
        .await;
    let body = wrong_password.assert_error(StatusCode::UNAUTHORIZED, "UNAUTHORIZED");

    // Unknown users look exactly like wrong passwords.
    let unknown = gateway
        .post_json(
            "/api/v1/auth/login",
            None,
            json!({ "login": "mallory", "password": "wrong" }),
        )
        .await;
    let unknown_body = unknown.assert_error(StatusCode::UNAUTHORIZED, "UNAUTHORIZED");
    assert_eq!(body.message, unknown_body.message);

    // Bob has no password at all.
    gateway
        .post_json(
            "/api/v1/auth/login",
            None,
            json!({ "login": "bob", "password": "" }),
        )
        .await
        .assert_status(StatusCode::BAD_REQUEST);
}

// =============================================================================
// Token Validation
// =============================================================================

#[tokio::test]
async fn test_token_current_user_and_permissions() {
    let gateway = TestGateway::new();
    let token = gateway.access_token("bob");

    let me: CurrentUserResponse = gateway
        .get("/api/v1/auth/me", Some(&token))
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(me.user_id, "bob");
    assert_eq!(me.roles, vec!["operator"]);

    let permissions: PermissionsResponse = gateway
        .get("/api/v1/auth/me/permissions", Some(&token))
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_eq!(
        permissions.permissions,
        vec!["alarm.*", "device.read", "device.write"]
    );
}

#[tokio::test]
async fn test_token_expired_is_rejected() {
    let gateway = TestGateway::new();
    let jwt = gateway.state().jwt();

    let now = Utc::now();
    let claims = Claims::new(
        "alice",
        TokenType::Access,
        now - ChronoDuration::hours(2),
        now - ChronoDuration::hours(1),
    )
    .unwrap()
    .with_issuer(jwt.issuer());
    let token = jwt.sign(&claims).unwrap();

    let body = gateway
        .get("/api/v1/auth/me", Some(&token))
        .await
        .assert_error(StatusCode::UNAUTHORIZED, "UNAUTHORIZED");
    assert!(body.message.to_lowercase().contains("expired"));
}

#[tokio::test]
async fn test_token_foreign_signature_is_rejected() {
    let gateway = TestGateway::new();
    let foreign = JwtService::new(JwtFixtures::foreign_rs256()).unwrap();
    let token = foreign
        .generate_access_token("root", None, &["admin".to_string()])
        .unwrap()
        .token;

    let body = gateway
        .get("/api/v1/auth/me", Some(&token))
        .await
        .assert_error(StatusCode::UNAUTHORIZED, "UNAUTHORIZED");
    assert!(body.message.to_lowercase().contains("signature"));
}

#[tokio::test]
async fn test_token_malformed_and_wrong_type() {
    let gateway = TestGateway::new();

    gateway
        .get("/api/v1/auth/me", Some("not-a-jwt"))
        .await
        .assert_error(StatusCode::UNAUTHORIZED, "UNAUTHORIZED");

    let refresh = gateway
        .state()
        .jwt()
        .generate_refresh_token("alice")
        .unwrap()
        .token;
    gateway
        .get("/api/v1/auth/me", Some(&refresh))
        .await
        .assert_error(StatusCode::UNAUTHORIZED, "UNAUTHORIZED");
}

// =============================================================================
// Refresh
// =============================================================================

#[tokio::test]
async fn test_refresh_rotates_tokens() {
    let gateway = TestGateway::new();
    let first = gateway.login("alice", AccessFixtures::PASSWORD).await;

    let second: TokenPairResponse = gateway
        .post_json(
            "/api/v1/auth/refresh",
            None,
            json!({ "refresh_token": first.refresh_token }),
        )
        .await
        .assert_status(StatusCode::OK)
        .json();
    assert_ne!(second.refresh_token, first.refresh_token);

    gateway
        .get("/api/v1/auth/me", Some(&second.access_token))
        .await
        .assert_status(StatusCode::OK);

    // The old refresh token was revoked by the rotation.
    gateway
        .post_json(
            "/api/v1/auth/refresh",
            None,
            json!({ "refresh_token": first.refresh_token }),
        )
        .await
        .assert_error(StatusCode::UNAUTHORIZED, "UNAUTHORIZED");
}

#[tokio::test]
async fn test_refresh_rejects_access_token() {
    let gateway = TestGateway::new();
    let access = gateway.access_token("alice");

    gateway
        .post_json(
            "/api/v1/auth/refresh",
            None,
            json!({ "refresh_token": access }),
        )
        .await
        .assert_error(StatusCode::UNAUTHORIZED, "UNAUTHORIZED");
}

// =============================================================================
// Logout
// =============================================================================

#[tokio::test]
async fn test_logout_revokes_tokens() {
    let gateway = TestGateway::new();
    let pair = gateway.login("alice", AccessFixtures::PASSWORD).await;

    gateway
        .post_json(
            "/api/v1/auth/logout",
            Some(&pair.access_token),
            json!({ "refresh_token": pair.refresh_token }),
        )
        .await
        .assert_status(StatusCode::OK);

    let body = gateway
        .get("/api/v1/auth/me", Some(&pair.access_token))
        .await
        .assert_error(StatusCode::UNAUTHORIZED, "UNAUTHORIZED");
    assert!(body.message.to_lowercase().contains("revoked"));

    gateway
        .post_json(
            "/api/v1/auth/refresh",
            None,
            json!({ "refresh_token": pair.refresh_token }),
        )
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    assert_eq!(gateway.state().jwt().revoked_count(), 2);
}

#[tokio::test]
async fn test_logout_with_spent_refresh_token() {
    let gateway = TestGateway::new();
    let first = gateway.login("alice", AccessFixtures::PASSWORD).await;
    let second: TokenPairResponse = gateway
        .post_json(
            "/api/v1/auth/refresh",
            None,
            json!({ "refresh_token": first.refresh_token }),
        )
        .await
        .assert_status(StatusCode::OK)
        .json();

    gateway
        .post_json(
            "/api/v1/auth/logout",
            Some(&second.access_token),
            json!({ "refresh_token": first.refresh_token }),
        )
        .await
        .assert_status(StatusCode::OK);

    gateway
        .get("/api/v1/auth/me", Some(&second.access_token))
        .await
        .assert_error(StatusCode::UNAUTHORIZED, "UNAUTHORIZED");
}

#[tokio::test]
async fn test_logout_requires_authentication() {
    let gateway = TestGateway::new();
    gateway
        .post_json("/api/v1/auth/logout", None, json!({}))
        .await
        .assert_error(StatusCode::UNAUTHORIZED, "UNAUTHORIZED");
}
