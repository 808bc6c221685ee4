// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Per-route permission enforcement.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::{
    body::Body,
    http::Request,
    response::{IntoResponse, Response},
};
use tower::{Layer, Service};

use crate::auth::{AuthContext, Permission, PermissionService};
use crate::error::ApiError;

// =============================================================================
// Requirement
// =============================================================================

#[derive(Debug, Clone)]
enum Requirement {
    One(Permission),
    Any(Vec<Permission>),
    All(Vec<Permission>),
}

impl Requirement {
    fn describe(&self) -> String {
        let join = |perms: &[Permission], sep: &str| {
            perms
                .iter()
                .map(Permission::as_str)
                .collect::<Vec<_>>()
                .join(sep)
        };
        match self {
            Requirement::One(p) => p.to_string(),
            Requirement::Any(perms) => join(perms, " or "),
            Requirement::All(perms) => join(perms, " and "),
        }
    }
}

// =============================================================================
// RequirePermissionLayer
// =============================================================================

/// Layer that rejects requests whose user lacks a statically configured
/// permission.
///
/// Must run after [`AuthLayer`](super::AuthLayer); typically attached with
/// `Router::route_layer`. Answers 401 when no [`AuthContext`] is present and
/// 403 when the permission check fails.
#[derive(Clone)]
pub struct RequirePermissionLayer {
    permissions: Arc<PermissionService>,
    requirement: Arc<Requirement>,
}

impl RequirePermissionLayer {
    /// Requires a single permission.
    pub fn new(permissions: Arc<PermissionService>, permission: Permission) -> Self {
        Self {
            permissions,
            requirement: Arc::new(Requirement::One(permission)),
        }
    }

    /// Requires at least one of the permissions. An empty list denies everyone.
    pub fn any(permissions: Arc<PermissionService>, required: Vec<Permission>) -> Self {
        Self {
            permissions,
            requirement: Arc::new(Requirement::Any(required)),
        }
    }

    /// Requires every one of the permissions. An empty list admits every
    /// authenticated user.
    pub fn all(permissions: Arc<PermissionService>, required: Vec<Permission>) -> Self {
        Self {
            permissions,
            requirement: Arc::new(Requirement::All(required)),
        }
    }
}

impl<S> Layer<S> for RequirePermissionLayer {
    type Service = RequirePermissionMiddleware<S>;

    fn layer(&self, inner: S) -> Self::Service {
        RequirePermissionMiddleware {
            inner,
            permissions: self.permissions.clone(),
            requirement: self.requirement.clone(),
        }
    }
}

// =============================================================================
// RequirePermissionMiddleware
// =============================================================================

/// Middleware for permission enforcement.
#[derive(Clone)]
pub struct RequirePermissionMiddleware<S> {
    inner: S,
    permissions: Arc<PermissionService>,
    requirement: Arc<Requirement>,
}

impl<S> Service<Request<Body>> for RequirePermissionMiddleware<S>
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
        let permissions = self.permissions.clone();
        let requirement = self.requirement.clone();
        let mut inner = self.inner.clone();

        Box::pin(async move {
            let Some(user_id) = req
                .extensions()
                .get::<AuthContext>()
                .map(|ctx| ctx.user_id.clone())
            else {
                tracing::warn!("No auth context found, denying access");
                return Ok(ApiError::unauthorized("Authentication required").into_response());
            };

            let granted = match requirement.as_ref() {
                Requirement::One(p) => permissions.user_has_permission(&user_id, p).await,
                Requirement::Any(perms) => permissions.user_has_any_permission(&user_id, perms).await,
                Requirement::All(perms) => permissions.user_has_all_permissions(&user_id, perms).await,
            };

            match granted {
                Ok(true) => inner.call(req).await,
                Ok(false) => {
                    let required = requirement.describe();
                    tracing::warn!(
                        user_id = %user_id,
                        required = %required,
                        "Permission denied"
                    );
                    Ok(ApiError::forbidden(format!("Missing required permission: {required}"))
                        .into_response())
                }
                Err(e) => {
                    tracing::error!(user_id = %user_id, error = %e, "Permission lookup failed");
                    Ok(ApiError::from(e).into_response())
                }
            }
        })
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Claims, InMemoryDirectory, Role, TokenType, UserAccount};
    use axum::http::StatusCode;
    use std::convert::Infallible;
    use std::time::Duration;
    use tower::ServiceExt;

    fn p(name: &str) -> Permission {
        Permission::parse(name).unwrap()
    }

    fn service() -> Arc<PermissionService> {
        let directory = InMemoryDirectory::builder()
            .role(Role::new("viewer", [p("device.read")]))
            .role(Role::new("operator", [p("device.read"), p("device.write")]))
            .user(UserAccount::new("alice").with_roles(["viewer"]))
            .user(UserAccount::new("bob").with_roles(["operator"]))
            .build();
        Arc::new(PermissionService::new(Arc::new(directory)))
    }

    async fn ok(_req: Request<Body>) -> Result<Response, Infallible> {
        Ok(Response::new(Body::empty()))
    }

    fn request_as(user_id: Option<&str>) -> Request<Body> {
        let mut req = Request::builder().uri("/test").body(Body::empty()).unwrap();
        if let Some(user_id) = user_id {
            let claims = Claims::issue(user_id, TokenType::Access, Duration::from_secs(60)).unwrap();
            req.extensions_mut().insert(AuthContext::from_claims(claims));
        }
        req
    }

    #[tokio::test]
    async fn test_permission_granted() {
        let layer = RequirePermissionLayer::new(service(), p("device.read"));
        let mut service = layer.layer(tower::service_fn(ok));

        let response = service
            .ready()
            .await
            .unwrap()
            .call(request_as(Some("alice")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_permission_denied() {
        let layer = RequirePermissionLayer::new(service(), p("device.write"));
        let response = layer
            .layer(tower::service_fn(ok))
            .oneshot(request_as(Some("alice")))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["error"], "FORBIDDEN");
        assert_eq!(body["message"], "Missing required permission: device.write");
    }

    #[tokio::test]
    async fn test_missing_context_is_unauthorized() {
        let layer = RequirePermissionLayer::new(service(), p("device.read"));
        let response = layer
            .layer(tower::service_fn(ok))
            .oneshot(request_as(None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_any_and_all() {
        let permissions = service();

        let any = RequirePermissionLayer::any(permissions.clone(), vec![p("device.write"), p("system.manage")]);
        let all = RequirePermissionLayer::all(permissions.clone(), vec![p("device.read"), p("device.write")]);

        let status = |layer: RequirePermissionLayer, user: &'static str| async move {
            layer
                .layer(tower::service_fn(ok))
                .oneshot(request_as(Some(user)))
                .await
                .unwrap()
                .status()
        };

        assert_eq!(status(any.clone(), "bob").await, StatusCode::OK);
        assert_eq!(status(any, "alice").await, StatusCode::FORBIDDEN);
        assert_eq!(status(all.clone(), "bob").await, StatusCode::OK);
        assert_eq!(status(all, "alice").await, StatusCode::FORBIDDEN);
    }
}
