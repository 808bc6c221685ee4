// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Application state shared across handlers.

use std::sync::Arc;

use crate::auth::{
    AuthService, InMemoryDirectory, JwtService, PermissionService, RoleRepository, UserStore,
};
use crate::config::ApiConfig;
use crate::error::ApiResult;
use crate::limiter::RateLimiter;

// =============================================================================
// AppState
// =============================================================================

/// Application state shared across all handlers and middleware.
#[derive(Clone)]
pub struct AppState {
    /// API configuration.
    pub config: Arc<ApiConfig>,
    /// Token issuance and validation.
    pub jwt: JwtService,
    /// Cached permission resolution.
    pub permissions: Arc<PermissionService>,
    /// Shared rate limiter.
    pub limiter: Arc<RateLimiter>,
    /// Login, refresh and logout.
    pub auth: AuthService,
}

impl AppState {
    /// Creates a new app state builder.
    pub fn builder() -> AppStateBuilder {
        AppStateBuilder::new()
    }

    /// Returns the JWT service.
    pub fn jwt(&self) -> &JwtService {
        &self.jwt
    }

    /// Returns the permission service.
    pub fn permissions(&self) -> &Arc<PermissionService> {
        &self.permissions
    }

    /// Returns the rate limiter.
    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// Returns the session service.
    pub fn auth(&self) -> &AuthService {
        &self.auth
    }
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("jwt", &self.jwt)
            .field("rate_limited_keys", &self.limiter.len())
            .finish_non_exhaustive()
    }
}

// =============================================================================
// AppStateBuilder
// =============================================================================

/// Builder for constructing AppState.
#[derive(Default)]
pub struct AppStateBuilder {
    config: Option<ApiConfig>,
    jwt: Option<JwtService>,
    roles: Option<Arc<dyn RoleRepository>>,
    users: Option<Arc<dyn UserStore>>,
    limiter: Option<Arc<RateLimiter>>,
}

impl AppStateBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the configuration.
    pub fn config(mut self, config: ApiConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Uses an existing JWT service instead of building one from the config.
    pub fn jwt(mut self, jwt: JwtService) -> Self {
        self.jwt = Some(jwt);
        self
    }

    /// Sets the role repository.
    pub fn role_repository(mut self, roles: Arc<dyn RoleRepository>) -> Self {
        self.roles = Some(roles);
        self
    }

    /// Sets the user store.
    pub fn user_store(mut self, users: Arc<dyn UserStore>) -> Self {
        self.users = Some(users);
        self
    }

    /// Uses one in-memory directory as both role repository and user store.
    pub fn directory(self, directory: Arc<InMemoryDirectory>) -> Self {
        self.role_repository(directory.clone()).user_store(directory)
    }

    /// Shares an existing rate limiter.
    pub fn limiter(mut self, limiter: Arc<RateLimiter>) -> Self {
        self.limiter = Some(limiter);
        self
    }

    /// Builds the AppState.
    ///
    /// Missing components default to an empty directory and a fresh limiter.
    /// Fails if no JWT service was given and the configured keys can't be
    /// loaded.
    pub fn build(self) -> ApiResult<AppState> {
        let config = self.config.unwrap_or_default();

        let jwt = match self.jwt {
            Some(jwt) => jwt,
            None => JwtService::new(config.jwt.clone())?,
        };

        let empty = Arc::new(InMemoryDirectory::new());
        let roles: Arc<dyn RoleRepository> = match self.roles {
            Some(roles) => roles,
            None => empty.clone(),
        };
        let users: Arc<dyn UserStore> = match self.users {
            Some(users) => users,
            None => empty,
        };

        Ok(AppState {
            config: Arc::new(config),
            permissions: Arc::new(PermissionService::new(roles)),
            limiter: self.limiter.unwrap_or_else(|| Arc::new(RateLimiter::new())),
            auth: AuthService::new(jwt.clone(), users),
            jwt,
        })
    }
}

// =============================================================================
// FromRef implementations for extracting parts of state
// =============================================================================

impl axum::extract::FromRef<AppState> for Arc<PermissionService> {
    fn from_ref(state: &AppState) -> Self {
        state.permissions.clone()
    }
}

impl axum::extract::FromRef<AppState> for Arc<RateLimiter> {
    fn from_ref(state: &AppState) -> Self {
        state.limiter.clone()
    }
}

impl axum::extract::FromRef<AppState> for Arc<ApiConfig> {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

// =============================================================================
// Tests
// =============================================================================
