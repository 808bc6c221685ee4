// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! API server implementation.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::StatusCode,
    routing::{get, post},
};
use tokio::task::JoinHandle;
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, timeout::TimeoutLayer};
use tracing::info;

use crate::auth::{InMemoryDirectory, JwtService, Permission, RoleRepository, UserStore};
use crate::config::ApiConfig;
use crate::error::{ApiError, ApiResult};
use crate::handlers;
use crate::limiter::RateLimiter;
use crate::middleware::{
    AuthLayer, RateLimitLayer, RequestLogLayer, RequirePermissionLayer, SecurityHeadersLayer,
    cors_layer,
};
use crate::state::{AppState, AppStateBuilder};

/// Permission required to flush the permission cache.
pub const SYSTEM_MANAGE: &str = "system.manage";
/// Permission required to inspect rate limit state.
pub const SYSTEM_AUDIT: &str = "system.audit";

// =============================================================================
// ApiServer
// =============================================================================

/// The API server.
///
/// This is the main entry point for creating and running the HTTP server.
pub struct ApiServer {
    state: AppState,
    config: Arc<ApiConfig>,
}

impl ApiServer {
    /// Creates a new API server with the given state.
    pub fn new(state: AppState) -> Self {
        let config = state.config.clone();
        Self { state, config }
    }

    /// Returns the shared state.
    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Creates the router with all routes and middleware.
    ///
    /// Layers, outermost first: compression, timeout, request log, security
    /// headers, CORS, authentication, rate limiting. Admin routes add a
    /// permission check on top.
    pub fn router(&self) -> ApiResult<Router> {
        let security_headers = SecurityHeadersLayer::new(&self.config.security_headers)?;
        let cors = self.config.cors.enabled.then(|| cors_layer(&self.config.cors));
        let auth = AuthLayer::new(self.state.jwt.clone())
            .with_public_paths(self.config.public_paths.iter().cloned());
        let rate_limit =
            RateLimitLayer::new(self.state.limiter.clone(), self.config.rate_limit.clone());

        let middleware_stack = ServiceBuilder::new()
            .layer(CompressionLayer::new())
            .layer(TimeoutLayer::with_status_code(
                StatusCode::REQUEST_TIMEOUT,
                self.config.request_timeout,
            ))
            .layer(RequestLogLayer::new())
            .layer(security_headers)
            .option_layer(cors)
            .layer(auth)
            .layer(rate_limit);

        let permissions = self.state.permissions.clone();
        let manage = Router::new()
            .route(
                "/api/v1/admin/permissions/cache/clear",
                post(handlers::clear_permission_cache),
            )
            .route_layer(RequirePermissionLayer::new(
                permissions.clone(),
                Permission::parse(SYSTEM_MANAGE)?,
            ));
        let audit = Router::new()
            .route(
                "/api/v1/admin/rate-limits/{kind}/{identifier}",
                get(handlers::rate_limit_status),
            )
            .route_layer(RequirePermissionLayer::new(
                permissions,
                Permission::parse(SYSTEM_AUDIT)?,
            ));

        Ok(Router::new()
            // Health endpoints (public)
            .route("/health", get(handlers::health))
            .route("/ready", get(handlers::ready))
            // Auth endpoints
            .route("/api/v1/auth/login", post(handlers::login))
            .route("/api/v1/auth/refresh", post(handlers::refresh_token))
            .route("/api/v1/auth/logout", post(handlers::logout))
            .route("/api/v1/auth/me", get(handlers::current_user))
            .route("/api/v1/auth/me/permissions", get(handlers::current_permissions))
            // Admin endpoints
            .merge(manage)
            .merge(audit)
            // Apply middleware and state
            .layer(DefaultBodyLimit::max(self.config.max_body_size))
            .layer(middleware_stack)
            .with_state(self.state.clone()))
    }

    /// Runs the server until the process is killed.
    pub async fn run(self) -> ApiResult<()> {
        self.run_with_shutdown(std::future::pending()).await
    }

    /// Runs the server with graceful shutdown.
    ///
    /// A background task sweeps idle rate limit windows and expired
    /// revocations while the server runs.
    pub async fn run_with_shutdown(
        self,
        shutdown_signal: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> ApiResult<()> {
        let addr = self.config.socket_addr();
        let router = self.router()?;

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ApiError::internal(format!("Failed to bind {addr}: {e}")))?;

        info!(addr = %addr, "Starting API server");
        let sweeper = spawn_sweeper(&self.state);

        let served = axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown_signal)
        .await
        .map_err(|e| ApiError::internal(format!("Server error: {e}")));

        sweeper.abort();
        served?;

        info!("API server shutdown complete");
        Ok(())
    }

    /// Returns the server address.
    pub fn addr(&self) -> SocketAddr {
        self.config.socket_addr()
    }
}

// =============================================================================
// Background Maintenance
// =============================================================================

/// Spawns the task that drops idle rate limit keys and expired revocations.
pub fn spawn_sweeper(state: &AppState) -> JoinHandle<()> {
    let limiter = state.limiter.clone();
    let jwt = state.jwt.clone();
    let window = state.config.rate_limit.window();
    let period = state.config.rate_limit.sweep_interval();

    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let keys = limiter.sweep(window);
            let revocations = jwt.purge_revoked();
            if keys > 0 || revocations > 0 {
                tracing::debug!(keys, revocations, "Swept expired state");
            }
        }
    })
}

// =============================================================================
// Server Builder
// =============================================================================

/// Builder for creating the API server.
#[derive(Default)]
pub struct ApiServerBuilder {
    state_builder: AppStateBuilder,
}

impl ApiServerBuilder {
    /// Creates a new server builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the configuration.
    pub fn config(mut self, config: ApiConfig) -> Self {
        self.state_builder = self.state_builder.config(config);
        self
    }

    /// Uses an existing JWT service.
    pub fn jwt(mut self, jwt: JwtService) -> Self {
        self.state_builder = self.state_builder.jwt(jwt);
        self
    }

    /// Sets the role repository.
    pub fn role_repository(mut self, roles: Arc<dyn RoleRepository>) -> Self {
        self.state_builder = self.state_builder.role_repository(roles);
        self
    }

    /// Sets the user store.
    pub fn user_store(mut self, users: Arc<dyn UserStore>) -> Self {
        self.state_builder = self.state_builder.user_store(users);
        self
    }

    /// Uses one in-memory directory for roles and users.
    pub fn directory(mut self, directory: Arc<InMemoryDirectory>) -> Self {
        self.state_builder = self.state_builder.directory(directory);
        self
    }

    /// Shares an existing rate limiter.
    pub fn limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.state_builder = self.state_builder.limiter(limiter);
        self
    }

    /// Builds the server.
    pub fn build(self) -> ApiResult<ApiServer> {
        let state = self.state_builder.build()?;
        Ok(ApiServer::new(state))
    }
}

impl std::fmt::Debug for ApiServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiServer")
            .field("addr", &self.addr())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// Tests
// =============================================================================
