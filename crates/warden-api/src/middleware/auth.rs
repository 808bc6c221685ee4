// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! JWT authentication middleware.

use std::collections::HashSet;
use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    body::Body,
    extract::ConnectInfo,
    http::{Request, header},
    response::{IntoResponse, Response},
};
use tower::{Layer, Service};
use uuid::Uuid;

use super::RequestId;
use crate::auth::{AuthContext, JwtService};
use crate::error::ApiError;

// =============================================================================
// AuthLayer
// =============================================================================

/// Layer for JWT authentication.
///
/// Requests outside the public paths must carry `Authorization: Bearer
/// <access token>`. On success an [`AuthContext`] is inserted into the
/// request extensions; otherwise the request is answered with 401.
#[derive(Clone)]
pub struct AuthLayer {
    jwt: JwtService,
    public_paths: Arc<PublicPaths>,
}

impl AuthLayer {
    /// Creates a new auth layer with no public paths.
    pub fn new(jwt: JwtService) -> Self {
        Self {
            jwt,
            public_paths: Arc::new(PublicPaths::default()),
        }
    }

    /// Sets the paths that don't require authentication.
    pub fn with_public_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.public_paths = Arc::new(PublicPaths::new(paths));
        self
    }

    /// Uses the default public paths (health probes, login and refresh).
    pub fn with_default_public_paths(self) -> Self {
        self.with_public_paths(crate::config::default_public_paths())
    }
}

impl<S> Layer<S> for AuthLayer {
    type Service = AuthMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        AuthMiddleware {
            inner,
            jwt: self.jwt.clone(),
            public_paths: self.public_paths.clone(),
        }
    }
}

// =============================================================================
// PublicPaths
// =============================================================================

/// Exact paths plus `prefix*` patterns.
#[derive(Debug, Default)]
struct PublicPaths {
    exact: HashSet<String>,
    prefixes: Vec<String>,
}

impl PublicPaths {
    fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut public = Self::default();
        for path in paths.into_iter().map(Into::into) {
            match path.strip_suffix('*') {
                Some(prefix) => public.prefixes.push(prefix.to_string()),
                None => {
                    public.exact.insert(path);
                }
            }
        }
        public
    }

    fn matches(&self, path: &str) -> bool {
        self.exact.contains(path) || self.prefixes.iter().any(|p| path.starts_with(p.as_str()))
    }
}

// =============================================================================
// AuthMiddleware
// =============================================================================

/// Middleware for JWT authentication.
#[derive(Clone)]
pub struct AuthMiddleware<S> {
    inner: S,
    jwt: JwtService,
    public_paths: Arc<PublicPaths>,
}

impl<S> AuthMiddleware<S> {
    /// Checks if a path is public.
    fn is_public_path(&self, path: &str) -> bool {
        self.public_paths.matches(path)
    }
}

impl<S> Service<Request<Body>> for AuthMiddleware<S>
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
        let jwt = self.jwt.clone();
        let is_public = self.is_public_path(req.uri().path());
        let mut inner = self.inner.clone();

        Box::pin(async move {
            if is_public {
                return inner.call(req).await;
            }

            let token = match extract_bearer_token(&req) {
                Ok(token) => token,
                Err(reason) => {
                    tracing::debug!(reason, "Authentication rejected");
                    return Ok(ApiError::unauthorized(reason).into_response());
                }
            };

            let claims = match jwt.validate_access_token(&token) {
                Ok(claims) => claims,
                Err(e) => {
                    tracing::debug!(error = %e, "Token validation failed");
                    return Ok(ApiError::from(e).into_response());
                }
            };

            let client_ip = req
                .extensions()
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ci| ci.0.ip());
            let request_id = req
                .extensions()
                .get::<RequestId>()
                .map_or_else(Uuid::now_v7, |id| id.0);

            let auth_ctx = AuthContext::from_claims(claims)
                .with_client_ip(client_ip)
                .with_request_id(request_id);

            tracing::Span::current().record("user_id", auth_ctx.user_id.as_str());
            req.extensions_mut().insert(auth_ctx);

            inner.call(req).await
        })
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Extracts the bearer token from the Authorization header.
///
/// The scheme is matched case-insensitively.
fn extract_bearer_token<B>(req: &Request<B>) -> Result<String, &'static str> {
    let value = req
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or("Missing authorization header")?
        .to_str()
        .map_err(|_| "Malformed authorization header")?;

    let (scheme, token) = value
        .split_once(' ')
        .ok_or("Malformed authorization header")?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err("Unsupported authorization scheme");
    }

    let token = token.trim();
    if token.is_empty() {
        return Err("Empty bearer token");
    }
    Ok(token.to_string())
}

// =============================================================================
// Tests
// =============================================================================
