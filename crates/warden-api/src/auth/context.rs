// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Authentication context.

use std::net::IpAddr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::Claims;

/// Authentication context for a request.
///
/// Inserted into the request extensions by the authentication middleware
/// and read by the rate limiter, permission checks and handlers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthContext {
    /// User ID.
    pub user_id: String,
    /// User's email.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    /// User roles, as carried by the token.
    pub roles: Vec<String>,
    /// ID of the access token that authenticated the request.
    pub token_id: String,
    /// When the access token expires.
    pub expires_at: DateTime<Utc>,
    /// Client IP address.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_ip: Option<IpAddr>,
    /// Request ID for tracing.
    pub request_id: Uuid,
    /// The validated claims.
    #[serde(skip)]
    claims: Option<Claims>,
}

impl AuthContext {
    /// Creates a new authentication context from validated claims.
    pub fn from_claims(claims: Claims) -> Self {
        Self {
            user_id: claims.user_id().to_string(),
            email: claims.email().map(str::to_string),
            roles: claims.roles().to_vec(),
            token_id: claims.token_id().to_string(),
            expires_at: claims.expires_at(),
            client_ip: None,
            request_id: Uuid::now_v7(),
            claims: Some(claims),
        }
    }

    /// Sets the client IP.
    pub fn with_client_ip(mut self, ip: Option<IpAddr>) -> Self {
        self.client_ip = ip;
        self
    }

    /// Sets the request ID.
    pub fn with_request_id(mut self, request_id: Uuid) -> Self {
        self.request_id = request_id;
        self
    }

    /// Returns the validated claims.
    ///
    /// `None` only for contexts that were deserialized rather than built from
    /// a token.
    pub fn claims(&self) -> Option<&Claims> {
        self.claims.as_ref()
    }

    /// Returns `true` if the token carries the given role.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r == role)
    }
}
