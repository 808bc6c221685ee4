// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Security response headers.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    body::Body,
    http::{HeaderName, HeaderValue, Request, header},
    response::Response,
};
use serde::{Deserialize, Serialize};
use tower::{Layer, Service};

use crate::error::{ApiError, ApiResult};

// =============================================================================
// SecurityHeadersConfig
// =============================================================================

/// Values for the security headers added to every response.
///
/// An empty string (or `None` for HSTS) disables that header.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecurityHeadersConfig {
    /// Whether security headers are emitted.
    pub enabled: bool,
    /// `Content-Security-Policy`.
    pub content_security_policy: String,
    /// `X-Content-Type-Options`.
    pub x_content_type_options: String,
    /// `X-Frame-Options`.
    pub x_frame_options: String,
    /// `Referrer-Policy`.
    pub referrer_policy: String,
    /// `Permissions-Policy`.
    pub permissions_policy: String,
    /// `Strict-Transport-Security`.
    pub strict_transport_security: Option<String>,
}

impl Default for SecurityHeadersConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            content_security_policy: "default-src 'none'; frame-ancestors 'none'".to_string(),
            x_content_type_options: "nosniff".to_string(),
            x_frame_options: "DENY".to_string(),
            referrer_policy: "no-referrer".to_string(),
            permissions_policy: "geolocation=(), microphone=(), camera=()".to_string(),
            strict_transport_security: Some("max-age=31536000; includeSubDomains".to_string()),
        }
    }
}

impl SecurityHeadersConfig {
    /// Creates a configuration that emits nothing.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Drops `Strict-Transport-Security`, for plain-HTTP deployments.
    pub fn without_hsts(mut self) -> Self {
        self.strict_transport_security = None;
        self
    }

    fn header_pairs(&self) -> ApiResult<Vec<(HeaderName, HeaderValue)>> {
        if !self.enabled {
            return Ok(Vec::new());
        }

        let permissions_policy = HeaderName::from_static("permissions-policy");
        let candidates = [
            (header::CONTENT_SECURITY_POLICY, Some(&self.content_security_policy)),
            (header::X_CONTENT_TYPE_OPTIONS, Some(&self.x_content_type_options)),
            (header::X_FRAME_OPTIONS, Some(&self.x_frame_options)),
            (header::REFERRER_POLICY, Some(&self.referrer_policy)),
            (permissions_policy, Some(&self.permissions_policy)),
            (
                header::STRICT_TRANSPORT_SECURITY,
                self.strict_transport_security.as_ref(),
            ),
        ];

        candidates
            .into_iter()
            .filter_map(|(name, value)| value.filter(|v| !v.is_empty()).map(|v| (name, v)))
            .map(|(name, value)| {
                HeaderValue::from_str(value)
                    .map(|v| (name.clone(), v))
                    .map_err(|_| ApiError::internal(format!("Invalid value for {name}: {value:?}")))
            })
            .collect()
    }
}

// =============================================================================
// SecurityHeadersLayer
// =============================================================================

/// Layer that adds security headers to every response.
///
/// Headers already set by an inner service are left untouched.
#[derive(Debug, Clone)]
pub struct SecurityHeadersLayer {
    headers: Arc<[(HeaderName, HeaderValue)]>,
}

impl SecurityHeadersLayer {
    /// Creates the layer, validating every configured header value.
    pub fn new(config: &SecurityHeadersConfig) -> ApiResult<Self> {
        Ok(Self {
            headers: config.header_pairs()?.into(),
        })
    }
}

impl<S> Layer<S> for SecurityHeadersLayer {
    type Service = SecurityHeadersMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        SecurityHeadersMiddleware {
            inner,
            headers: self.headers.clone(),
        }
    }
}

/// Middleware adding security headers.
#[derive(Debug, Clone)]
pub struct SecurityHeadersMiddleware<S> {
    inner: S,
    headers: Arc<[(HeaderName, HeaderValue)]>,
}

impl<S> Service<Request<Body>> for SecurityHeadersMiddleware<S>
where
    S: Service<Request<Body>, Response = Response> + Clone + Send + 'static,
    S::Future: Send + 'static,
{
    type Response = S::Response;
    type Error = S::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Self::Response, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        let headers = self.headers.clone();
        let future = self.inner.call(req);

        Box::pin(async move {
            let mut response = future.await?;
            let target = response.headers_mut();
            for (name, value) in headers.iter() {
                target.entry(name).or_insert_with(|| value.clone());
            }
            Ok(response)
        })
    }
}

// =============================================================================
// Tests
// =============================================================================
