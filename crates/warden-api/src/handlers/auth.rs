// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Authentication handlers.

use axum::{Json, body::Bytes, extract::State, response::IntoResponse};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::extractors::{Auth, ClientIp, JsonBody};
use crate::response::{CurrentUserResponse, MessageResponse, PermissionsResponse, TokenPairResponse};
use crate::state::AppState;

// =============================================================================
// Login
// =============================================================================

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    /// User ID or email.
    #[serde(alias = "username", alias = "email")]
    pub login: String,
    /// Password.
    pub password: String,
}

/// POST /api/v1/auth/login
///
/// Verifies credentials and returns an access/refresh token pair.
pub async fn login(
    State(state): State<AppState>,
    ClientIp(client_ip): ClientIp,
    JsonBody(request): JsonBody<LoginRequest>,
) -> ApiResult<impl IntoResponse> {
    if request.login.trim().is_empty() || request.password.is_empty() {
        return Err(ApiError::bad_request("Login and password are required"));
    }

    let pair = state
        .auth()
        .login(request.login.trim(), &request.password)
        .await
        .inspect_err(|e| {
            tracing::info!(login = %request.login, client_ip = ?client_ip, error = %e, "Login rejected");
        })?;

    Ok(Json(TokenPairResponse::from(pair)))
}

// =============================================================================
// Refresh Token
// =============================================================================

/// Refresh token request body.
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    /// Refresh token.
    pub refresh_token: String,
}

/// POST /api/v1/auth/refresh
///
/// Exchanges a refresh token for a new pair. The presented refresh token is
/// revoked.
pub async fn refresh_token(
    State(state): State<AppState>,
    JsonBody(request): JsonBody<RefreshRequest>,
) -> ApiResult<impl IntoResponse> {
    let pair = state.auth().refresh(&request.refresh_token).await?;
    Ok(Json(TokenPairResponse::from(pair)))
}

// =============================================================================
// Logout
// =============================================================================

/// Logout request body. The body itself is optional.
#[derive(Debug, Default, Deserialize)]
pub struct LogoutRequest {
    /// Refresh token to revoke along with the access token.
    #[serde(default)]
    pub refresh_token: Option<String>,
}

/// POST /api/v1/auth/logout
///
/// Revokes the caller's access token and, if supplied, their refresh token.
pub async fn logout(
    State(state): State<AppState>,
    Auth(auth_ctx): Auth,
    body: Bytes,
) -> ApiResult<impl IntoResponse> {
    let request: LogoutRequest = if body.is_empty() {
        LogoutRequest::default()
    } else {
        serde_json::from_slice(&body)?
    };

    let claims = auth_ctx
        .claims()
        .ok_or_else(|| ApiError::unauthorized("Authentication required"))?;
    state.auth().logout(claims, request.refresh_token.as_deref());

    Ok(Json(MessageResponse::new("Logged out successfully")))
}

// =============================================================================
// Current User
// =============================================================================

/// GET /api/v1/auth/me
///
/// Returns information about the currently authenticated user.
pub async fn current_user(Auth(auth_ctx): Auth) -> impl IntoResponse {
    Json(CurrentUserResponse::from(auth_ctx))
}

/// GET /api/v1/auth/me/permissions
///
/// Returns the caller's effective permission set.
pub async fn current_permissions(
    State(state): State<AppState>,
    Auth(auth_ctx): Auth,
) -> ApiResult<impl IntoResponse> {
    let permissions = state
        .permissions()
        .get_user_permissions(&auth_ctx.user_id)
        .await?;
    Ok(Json(PermissionsResponse::new(auth_ctx.user_id, &permissions)))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthContext, InMemoryDirectory, JwtConfig, Permission, Role, UserAccount, hash_password};
    use crate::config::ApiConfig;
    use axum::http::StatusCode;
    use std::sync::Arc;

    fn test_state() -> AppState {
        let config = ApiConfig::default().with_jwt(JwtConfig::rs256(
            include_str!("../../testdata/rsa_private.pem"),
            include_str!("../../testdata/rsa_public.pem"),
        ));
        let directory = InMemoryDirectory::builder()
            .role(Role::new("viewer", [Permission::parse("device.read").unwrap()]))
            .user(
                UserAccount::new("alice")
                    .with_email("alice@example.com")
                    .with_password_hash(hash_password("correct horse").unwrap())
                    .with_roles(["viewer"]),
            )
            .build();
        AppState::builder()
            .config(config)
            .directory(Arc::new(directory))
            .build()
            .unwrap()
    }

    fn login_request(login: &str, password: &str) -> JsonBody<LoginRequest> {
        JsonBody(LoginRequest {
            login: login.to_string(),
            password: password.to_string(),
        })
    }

    #[tokio::test]
    async fn test_login_success() {
        let state = test_state();
        let response = login(
            State(state.clone()),
            ClientIp(None),
            login_request("alice@example.com", "correct horse"),
        )
        .await
        .unwrap()
        .into_response();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: TokenPairResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.token_type, "Bearer");
        assert_eq!(body.expires_in, 900);

        let claims = state.jwt().validate_access_token(&body.access_token).unwrap();
        assert_eq!(claims.user_id(), "alice");
        assert!(claims.has_role("viewer"));
    }

    #[tokio::test]
    async fn test_login_rejections() {
        let state = test_state();

        let err = login(State(state.clone()), ClientIp(None), login_request("alice", "nope"))
            .await
            .err()
            .unwrap();
        assert_eq!(err.status_code(), StatusCode::UNAUTHORIZED);

        let err = login(State(state), ClientIp(None), login_request("  ", "x"))
            .await
            .err()
            .unwrap();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_logout_revokes_access_token() {
        let state = test_state();
        let token = state
            .jwt()
            .generate_access_token("alice", None, &[])
            .unwrap();
        let ctx = AuthContext::from_claims(token.claims.clone());

        logout(State(state.clone()), Auth(ctx), Bytes::new())
            .await
            .unwrap();
        assert!(state.jwt().validate_access_token(&token.token).is_err());
    }

    #[tokio::test]
    async fn test_logout_rejects_bad_body() {
        let state = test_state();
        let token = state.jwt().generate_access_token("alice", None, &[]).unwrap();
        let ctx = AuthContext::from_claims(token.claims);

        let err = logout(State(state), Auth(ctx), Bytes::from_static(b"{not json"))
            .await
            .err()
            .unwrap();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_current_permissions() {
        let state = test_state();
        let token = state.jwt().generate_access_token("alice", None, &[]).unwrap();
        let ctx = AuthContext::from_claims(token.claims);

        let response = current_permissions(State(state), Auth(ctx))
            .await
            .unwrap()
            .into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: PermissionsResponse = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body.user_id, "alice");
        assert_eq!(body.permissions, vec!["device.read"]);
    }
}
