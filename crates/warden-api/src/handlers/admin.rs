// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Administrative handlers for the permission cache and rate limiter.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, State},
    response::IntoResponse,
};
use serde::Deserialize;

use crate::error::{ApiError, ApiResult};
use crate::extractors::Auth;
use crate::limiter::{KeyKind, RateLimitKey};
use crate::response::{CacheClearResponse, RateLimitStatusResponse};
use crate::state::AppState;

// =============================================================================
// Permission Cache
// =============================================================================

/// Cache clear request body. An absent body or `user_id` clears everything.
#[derive(Debug, Default, Deserialize)]
pub struct ClearCacheRequest {
    /// Limit the flush to one user.
    #[serde(default)]
    pub user_id: Option<String>,
}

/// POST /api/v1/admin/permissions/cache/clear
pub async fn clear_permission_cache(
    State(state): State<AppState>,
    Auth(auth_ctx): Auth,
    body: Bytes,
) -> ApiResult<impl IntoResponse> {
    let request: ClearCacheRequest = if body.is_empty() {
        ClearCacheRequest::default()
    } else {
        serde_json::from_slice(&body)?
    };

    let permissions = state.permissions();
    let cleared = match &request.user_id {
        Some(user_id) => usize::from(permissions.clear_user_cache(user_id)),
        None => {
            let count = permissions.cached_users();
            permissions.clear_cache();
            count
        }
    };

    tracing::info!(
        admin = %auth_ctx.user_id,
        target = request.user_id.as_deref().unwrap_or("*"),
        cleared,
        "Permission cache flushed"
    );

    Ok(Json(CacheClearResponse {
        user_id: request.user_id,
        cleared,
    }))
}

// =============================================================================
// Rate Limits
// =============================================================================

/// GET /api/v1/admin/rate-limits/{kind}/{identifier}
///
/// Reports remaining attempts and the reset time of a key under the
/// configured limit.
pub async fn rate_limit_status(
    State(state): State<AppState>,
    Path((kind, identifier)): Path<(String, String)>,
) -> ApiResult<impl IntoResponse> {
    let kind: KeyKind = kind.parse().map_err(ApiError::bad_request)?;
    if identifier.is_empty() {
        return Err(ApiError::bad_request("Identifier must not be empty"));
    }
    let key = RateLimitKey { identifier, kind };

    let config = &state.config.rate_limit;
    let window = config.window();
    let limiter = state.limiter();

    Ok(Json(RateLimitStatusResponse::new(
        &key,
        config.max_requests,
        config.window_secs,
        limiter.remaining_attempts(&key, config.max_requests, window),
        limiter.reset_time(&key, window),
    )))
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{AuthContext, Claims, InMemoryDirectory, JwtConfig, TokenType, UserAccount};
    use crate::config::ApiConfig;
    use axum::http::StatusCode;
    use std::sync::Arc;
    use std::time::Duration;

    fn test_state() -> AppState {
        let config = ApiConfig::default().with_jwt(JwtConfig::rs256(
            include_str!("../../testdata/rsa_private.pem"),
            include_str!("../../testdata/rsa_public.pem"),
        ));
        let directory = InMemoryDirectory::builder()
            .user(UserAccount::new("alice"))
            .user(UserAccount::new("bob"))
            .build();
        AppState::builder()
            .config(config)
            .directory(Arc::new(directory))
            .build()
            .unwrap()
    }

    fn admin() -> Auth {
        let claims = Claims::issue("root", TokenType::Access, Duration::from_secs(60)).unwrap();
        Auth(AuthContext::from_claims(claims))
    }

    async fn json_body<T: serde::de::DeserializeOwned>(response: impl IntoResponse) -> T {
        let bytes = axum::body::to_bytes(response.into_response().into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_clear_single_user_and_all() {
        let state = test_state();
        state.permissions().get_user_permissions("alice").await.unwrap();
        state.permissions().get_user_permissions("bob").await.unwrap();

        let response = clear_permission_cache(
            State(state.clone()),
            admin(),
            Bytes::from_static(br#"{"user_id":"alice"}"#),
        )
        .await
        .unwrap();
        let body: CacheClearResponse = json_body(response).await;
        assert_eq!(body.cleared, 1);
        assert_eq!(state.permissions().cached_users(), 1);

        let response = clear_permission_cache(State(state.clone()), admin(), Bytes::new())
            .await
            .unwrap();
        let body: CacheClearResponse = json_body(response).await;
        assert_eq!(body.cleared, 1);
        assert!(body.user_id.is_none());
        assert_eq!(state.permissions().cached_users(), 0);
    }

    #[tokio::test]
    async fn test_rate_limit_status() {
        let state = test_state();
        let key = RateLimitKey::user("alice");
        let config = state.config.rate_limit.clone();
        state.limiter().allow_request(&key, config.max_requests, config.window());

        let response = rate_limit_status(
            State(state),
            Path(("user".to_string(), "alice".to_string())),
        )
        .await
        .unwrap();
        let body: RateLimitStatusResponse = json_body(response).await;
        assert_eq!(body.kind, "user");
        assert_eq!(body.limit, config.max_requests);
        assert_eq!(body.remaining, config.max_requests - 1);
    }

    #[tokio::test]
    async fn test_rate_limit_status_rejects_unknown_kind() {
        let err = rate_limit_status(
            State(test_state()),
            Path(("device".to_string(), "x".to_string())),
        )
        .await
        .err()
        .unwrap();
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
    }
}
