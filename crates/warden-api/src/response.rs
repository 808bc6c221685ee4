// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! API response types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::{AuthContext, PermissionSet, TokenPair};
use crate::limiter::RateLimitKey;

// =============================================================================
// Health
// =============================================================================

/// Body of `GET /health`.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `ok` when the process answers.
    pub status: String,
    /// Crate version.
    pub version: String,
}

impl HealthResponse {
    /// The only answer a live process gives.
    pub fn ok() -> Self {
        Self {
            status: "ok".to_string(),
            version: crate::VERSION.to_string(),
        }
    }
}

/// Body of `GET /ready`: what the auth pipeline is holding right now.
#[derive(Debug, Serialize, Deserialize)]
pub struct ReadinessResponse {
    /// Whether requests can be served.
    pub ready: bool,
    /// Token signing setup.
    pub signing: SigningStatus,
    /// Tokens revoked by logout or refresh rotation.
    pub revoked_tokens: usize,
    /// Users with a resolved permission set in cache.
    pub cached_users: usize,
    /// Limiter state; absent when rate limiting is disabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rate_limit: Option<LimiterStatus>,
}

/// Token signing setup.
#[derive(Debug, Serialize, Deserialize)]
pub struct SigningStatus {
    /// JWS algorithm, e.g. `RS256`.
    pub algorithm: String,
    /// `iss` stamped on issued tokens.
    pub issuer: String,
}

/// Limiter state.
#[derive(Debug, Serialize, Deserialize)]
pub struct LimiterStatus {
    /// Requests allowed per window.
    pub max_requests: u32,
    /// Window length in seconds.
    pub window_secs: u64,
    /// Keys the limiter holds a window for.
    pub tracked_keys: usize,
}

// =============================================================================
// Auth
// =============================================================================

/// Token pair returned by login and refresh.
#[derive(Debug, Serialize, Deserialize)]
pub struct TokenPairResponse {
    /// Access token.
    pub access_token: String,
    /// Refresh token.
    pub refresh_token: String,
    /// Token type (always "Bearer").
    pub token_type: String,
    /// Access token lifetime in seconds.
    pub expires_in: i64,
    /// Refresh token lifetime in seconds.
    pub refresh_expires_in: i64,
}

impl From<TokenPair> for TokenPairResponse {
    fn from(pair: TokenPair) -> Self {
        Self {
            expires_in: pair.access.expires_in(),
            refresh_expires_in: pair.refresh.expires_in(),
            access_token: pair.access.token,
            refresh_token: pair.refresh.token,
            token_type: "Bearer".to_string(),
        }
    }
}

/// The authenticated caller.
#[derive(Debug, Serialize, Deserialize)]
pub struct CurrentUserResponse {
    /// User ID.
    pub user_id: String,
    /// User's email.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// Roles carried by the token.
    pub roles: Vec<String>,
    /// When the access token expires.
    pub expires_at: DateTime<Utc>,
}

impl From<AuthContext> for CurrentUserResponse {
    fn from(ctx: AuthContext) -> Self {
        Self {
            user_id: ctx.user_id,
            email: ctx.email,
            roles: ctx.roles,
            expires_at: ctx.expires_at,
        }
    }
}

/// Effective permissions of a user.
#[derive(Debug, Serialize, Deserialize)]
pub struct PermissionsResponse {
    /// User ID.
    pub user_id: String,
    /// Sorted permission names.
    pub permissions: Vec<String>,
}

impl PermissionsResponse {
    /// Creates a response from a resolved permission set.
    pub fn new(user_id: impl Into<String>, permissions: &PermissionSet) -> Self {
        Self {
            user_id: user_id.into(),
            permissions: permissions.to_sorted_vec(),
        }
    }
}

/// Generic acknowledgement.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Human-readable message.
    pub message: String,
}

impl MessageResponse {
    /// Creates a message response.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// =============================================================================
// Admin
// =============================================================================

/// Result of a permission cache flush.
#[derive(Debug, Serialize, Deserialize)]
pub struct CacheClearResponse {
    /// The user whose entry was cleared; absent when the whole cache was.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// Number of cache entries removed.
    pub cleared: usize,
}

/// Current rate limit state of a key.
#[derive(Debug, Serialize, Deserialize)]
pub struct RateLimitStatusResponse {
    /// Key kind (`user` or `ip`).
    pub kind: String,
    /// User ID or IP address.
    pub identifier: String,
    /// Configured limit per window.
    pub limit: u32,
    /// Window length in seconds.
    pub window_secs: u64,
    /// Admissions left in the current window.
    pub remaining: u32,
    /// When the oldest counted request leaves the window.
    pub reset_at: DateTime<Utc>,
}

impl RateLimitStatusResponse {
    /// Creates a status response for a key.
    pub fn new(
        key: &RateLimitKey,
        limit: u32,
        window_secs: u64,
        remaining: u32,
        reset_at: DateTime<Utc>,
    ) -> Self {
        Self {
            kind: key.kind.as_str().to_string(),
            identifier: key.identifier.clone(),
            limit,
            window_secs,
            remaining,
            reset_at,
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Permission;

    #[test]
    fn test_health_response() {
        let response = HealthResponse::ok();
        assert_eq!(response.status, "ok");
        assert_eq!(response.version, crate::VERSION);
    }

    #[test]
    fn test_permissions_response_is_sorted() {
        let set: PermissionSet = ["user.write", "device.read", "user.read"]
            .into_iter()
            .map(|p| Permission::parse(p).unwrap())
            .collect();
        let response = PermissionsResponse::new("alice", &set);
        assert_eq!(response.permissions, vec!["device.read", "user.read", "user.write"]);
    }

    #[test]
    fn test_cache_clear_omits_missing_user() {
        let json = serde_json::to_value(CacheClearResponse {
            user_id: None,
            cleared: 3,
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({ "cleared": 3 }));
    }
}
