// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! HTTP rejections.
//!
//! Handlers and middleware reject with an [`ApiError`], rendered as a flat
//! JSON body:
//!
//! ```json
//! { "error": "UNAUTHORIZED", "message": "Token has expired" }
//! ```
//!
//! 401 responses carry a `WWW-Authenticate: Bearer` challenge. 429 responses
//! carry `retry_after` in the body and a matching `Retry-After` header.

use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::{AuthError, PermissionError};

/// Result type alias for API operations.
pub type ApiResult<T> = Result<T, ApiError>;

const BEARER_CHALLENGE: &str = r#"Bearer realm="warden", error="invalid_token""#;

/// A rejection with its HTTP mapping.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Missing or unusable credentials (401).
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but lacking a permission (403).
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// The caller's window is full (429).
    #[error("Rate limit exceeded, retry in {retry_after}s")]
    RateLimited {
        /// Seconds until the oldest counted request leaves the window.
        retry_after: u64,
    },

    /// Malformed request (400).
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Well-formed but semantically invalid input (422).
    #[error("Validation error: {0}")]
    Validation(String),

    /// Unknown resource (404).
    #[error("Not found: {0}")]
    NotFound(String),

    /// A dependency is not ready (503).
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    /// Anything else (500). The message is logged, never returned.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// 401 with `message`.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    /// 403 with `message`.
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    /// 429. A zero hint is raised to one second.
    pub fn rate_limited(retry_after: u64) -> Self {
        Self::RateLimited {
            retry_after: retry_after.max(1),
        }
    }

    /// 400 with `message`.
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    /// 422 with `message`.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// 404 for `resource`.
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::NotFound(resource.into())
    }

    /// 503 with `message`.
    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    /// 500. `message` is only logged.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Status code and machine-readable error code.
    pub fn kind(&self) -> (StatusCode, &'static str) {
        match self {
            Self::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            Self::Forbidden(_) => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            Self::RateLimited { .. } => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMIT_EXCEEDED"),
            Self::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            Self::Validation(_) => (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_ERROR"),
            Self::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            Self::Unavailable(_) => (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE"),
            Self::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    /// The HTTP status code.
    pub fn status_code(&self) -> StatusCode {
        self.kind().0
    }

    /// The `error` field of the body.
    pub fn error_code(&self) -> &'static str {
        self.kind().1
    }

    /// `true` for 5xx rejections.
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// The body for this rejection.
    pub fn body(&self) -> ErrorResponseBody {
        let (message, retry_after) = match self {
            Self::Unauthorized(m)
            | Self::Forbidden(m)
            | Self::BadRequest(m)
            | Self::Validation(m)
            | Self::Unavailable(m) => (m.clone(), None),
            Self::NotFound(resource) => (format!("{resource} not found"), None),
            Self::RateLimited { retry_after } => (
                format!("Too many requests, retry in {retry_after} seconds"),
                Some(*retry_after),
            ),
            Self::Internal(_) => ("Internal server error".to_string(), None),
        };
        ErrorResponseBody {
            error: self.error_code().to_string(),
            message,
            retry_after,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if self.is_server_error() {
            tracing::error!(error = %self, status = status.as_u16(), "Request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        let body = self.body();
        let mut response = (status, Json(&body)).into_response();
        let headers = response.headers_mut();
        match &self {
            Self::Unauthorized(_) => {
                headers.insert(
                    header::WWW_AUTHENTICATE,
                    HeaderValue::from_static(BEARER_CHALLENGE),
                );
            }
            Self::RateLimited { retry_after } => {
                headers.insert(header::RETRY_AFTER, HeaderValue::from(*retry_after));
            }
            _ => {}
        }
        response
    }
}

/// JSON body of every rejection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponseBody {
    /// Machine-readable code such as `UNAUTHORIZED`.
    pub error: String,
    /// Human-readable message.
    pub message: String,
    /// Seconds until retry; present on 429 only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retry_after: Option<u64>,
}

// Token and credential failures are the caller's problem; key and signing
// failures are ours.
impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        if err.is_client_error() {
            Self::Unauthorized(err.to_string())
        } else {
            Self::Internal(err.to_string())
        }
    }
}

impl From<PermissionError> for ApiError {
    fn from(err: PermissionError) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        Self::BadRequest(format!("Invalid JSON: {err}"))
    }
}
