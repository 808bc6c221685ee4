// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Rate limiting middleware.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;

use axum::{
    body::Body,
    http::{HeaderMap, HeaderName, HeaderValue, Request},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tower::{Layer, Service};

use crate::auth::AuthContext;
use crate::error::ApiError;
use crate::extractors::resolve_client_ip;
use crate::limiter::{RateLimitDecision, RateLimitKey, RateLimiter};

/// `X-RateLimit-Limit` response header.
pub const RATE_LIMIT_LIMIT: HeaderName = HeaderName::from_static("x-ratelimit-limit");
/// `X-RateLimit-Remaining` response header.
pub const RATE_LIMIT_REMAINING: HeaderName = HeaderName::from_static("x-ratelimit-remaining");
/// `X-RateLimit-Reset` response header (Unix seconds).
pub const RATE_LIMIT_RESET: HeaderName = HeaderName::from_static("x-ratelimit-reset");

// =============================================================================
// RateLimitConfig
// =============================================================================

/// Configuration for rate limiting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Whether rate limiting is enabled.
    pub enabled: bool,
    /// Requests admitted per key within one window.
    pub max_requests: u32,
    /// Window length in seconds.
    pub window_secs: u64,
    /// How often idle keys are swept, in seconds.
    pub sweep_interval_secs: u64,
    /// Whether to take the client IP from `X-Forwarded-For` / `X-Real-IP`.
    ///
    /// Enable only behind a proxy that overwrites these headers.
    pub trust_forwarded_headers: bool,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 60,
            window_secs: 60,
            sweep_interval_secs: 60,
            trust_forwarded_headers: false,
        }
    }
}

impl RateLimitConfig {
    /// Creates a disabled rate limiter configuration.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Creates a configuration admitting `max_requests` per `window`.
    pub fn per_window(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window_secs: window.as_secs(),
            ..Default::default()
        }
    }

    /// Trusts proxy headers for the client IP.
    pub fn with_trusted_proxy_headers(mut self) -> Self {
        self.trust_forwarded_headers = true;
        self
    }

    /// Returns the window length.
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    /// Returns the sweep interval.
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs.max(1))
    }
}

// =============================================================================
// RateLimitLayer
// =============================================================================

/// Layer for rate limiting.
///
/// Must sit inside [`AuthLayer`](super::AuthLayer) so that authenticated
/// requests are counted per user rather than per address.
#[derive(Clone)]
pub struct RateLimitLayer {
    limiter: Arc<RateLimiter>,
    config: Arc<RateLimitConfig>,
}

impl RateLimitLayer {
    /// Creates a new rate limit layer over a shared limiter.
    pub fn new(limiter: Arc<RateLimiter>, config: RateLimitConfig) -> Self {
        Self {
            limiter,
            config: Arc::new(config),
        }
    }

    /// Returns the shared limiter for monitoring.
    pub fn limiter(&self) -> Arc<RateLimiter> {
        self.limiter.clone()
    }
}

impl<S> Layer<S> for RateLimitLayer {
    type Service = RateLimitMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RateLimitMiddleware {
            inner,
            limiter: self.limiter.clone(),
            config: self.config.clone(),
        }
    }
}

// =============================================================================
// RateLimitMiddleware
// =============================================================================

/// Middleware for rate limiting.
#[derive(Clone)]
pub struct RateLimitMiddleware<S> {
    inner: S,
    limiter: Arc<RateLimiter>,
    config: Arc<RateLimitConfig>,
}

impl<S> Service<Request<Body>> for RateLimitMiddleware<S>
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
        let limiter = self.limiter.clone();
        let config = self.config.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            if !config.enabled {
                return inner.call(req).await;
            }

            let key = rate_limit_key(&req, config.trust_forwarded_headers);
            let decision = limiter.check(&key, config.max_requests, config.window());

            if !decision.allowed {
                tracing::info!(
                    key = %key,
                    limit = decision.limit,
                    retry_after = ?decision.retry_after,
                    "Rate limit exceeded"
                );
                let mut response = ApiError::rate_limited(decision.retry_after.unwrap_or(1)).into_response();
                apply_headers(response.headers_mut(), &decision);
                return Ok(response);
            }

            let mut response = inner.call(req).await?;
            apply_headers(response.headers_mut(), &decision);
            Ok(response)
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Chooses the counting key: the authenticated user, else the client IP.
fn rate_limit_key<B>(req: &Request<B>, trust_forwarded: bool) -> RateLimitKey {
    if let Some(ctx) = req.extensions().get::<AuthContext>() {
        return RateLimitKey::user(ctx.user_id.clone());
    }
    match resolve_client_ip(req.headers(), req.extensions(), trust_forwarded) {
        Some(ip) => RateLimitKey::ip(ip),
        None => RateLimitKey::ip("unknown"),
    }
}

fn apply_headers(headers: &mut HeaderMap, decision: &RateLimitDecision) {
    headers.insert(RATE_LIMIT_LIMIT, HeaderValue::from(decision.limit));
    headers.insert(RATE_LIMIT_REMAINING, HeaderValue::from(decision.remaining));
    headers.insert(RATE_LIMIT_RESET, HeaderValue::from(decision.reset_epoch_secs()));
}

// =============================================================================
// Tests
// =============================================================================
