// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Request ID propagation and access logging.

use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Instant;

use axum::{
    body::Body,
    http::{HeaderMap, HeaderName, HeaderValue, Request},
    response::Response,
};
use tower::{Layer, Service};
use tracing::Instrument;
use uuid::Uuid;

/// Header carrying the request ID.
pub const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// Headers whose values never reach the logs.
const REDACTED_HEADERS: &[&str] = &["authorization", "cookie", "set-cookie", "x-api-key"];

/// Request ID stored in the request extensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestId(pub Uuid);

// =============================================================================
// RequestLogLayer
// =============================================================================

/// Layer that tags every request with an ID and logs its outcome.
///
/// An incoming `X-Request-ID` that parses as a UUID is kept; otherwise a
/// fresh UUID v7 is generated. The ID is echoed on the response.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestLogLayer;

impl RequestLogLayer {
    /// Creates a new request log layer.
    pub fn new() -> Self {
        Self
    }
}

impl<S> Layer<S> for RequestLogLayer {
    type Service = RequestLogMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequestLogMiddleware { inner }
    }
}

// =============================================================================
// RequestLogMiddleware
// =============================================================================

/// Middleware for request logging.
#[derive(Debug, Clone)]
pub struct RequestLogMiddleware<S> {
    inner: S,
}

impl<S> Service<Request<Body>> for RequestLogMiddleware<S>
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

    fn call(&mut self, mut req: Request<Body>) -> Self::Future {
        let mut inner = self.inner.clone();

        let request_id = req
            .headers()
            .get(&REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| Uuid::parse_str(v).ok())
            .unwrap_or_else(Uuid::now_v7);
        req.extensions_mut().insert(RequestId(request_id));

        let method = req.method().clone();
        let path = req.uri().path().to_string();

        let span = tracing::info_span!(
            "request",
            request_id = %request_id,
            method = %method,
            path = %path,
            user_id = tracing::field::Empty,
        );

        Box::pin(
            async move {
                if tracing::enabled!(tracing::Level::DEBUG) {
                    tracing::debug!(headers = ?redacted_headers(req.headers()), "Request received");
                }

                let start = Instant::now();
                let mut response = inner.call(req).await?;
                let latency_ms = start.elapsed().as_millis() as u64;
                let status = response.status().as_u16();

                if let Ok(value) = HeaderValue::from_str(&request_id.to_string()) {
                    response.headers_mut().insert(REQUEST_ID_HEADER.clone(), value);
                }

                if status >= 500 {
                    tracing::error!(status, latency_ms, "Request failed");
                } else if status >= 400 {
                    tracing::warn!(status, latency_ms, "Request rejected");
                } else {
                    tracing::info!(status, latency_ms, "Request completed");
                }

                Ok(response)
            }
            .instrument(span),
        )
    }
}

/// Returns header pairs suitable for logging, with credentials masked.
pub fn redacted_headers(headers: &HeaderMap) -> Vec<(String, String)> {
    headers
        .iter()
        .map(|(name, value)| {
            let shown = if is_sensitive(name) {
                "[REDACTED]".to_string()
            } else {
                value.to_str().unwrap_or("[binary]").to_string()
            };
            (name.as_str().to_string(), shown)
        })
        .collect()
}

fn is_sensitive(name: &HeaderName) -> bool {
    REDACTED_HEADERS.contains(&name.as_str())
}

// =============================================================================
// Tests
// =============================================================================
