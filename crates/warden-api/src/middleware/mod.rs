// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Middleware implementations for the API server.
//!
//! This module provides a layered middleware stack for security and observability:
//!
//! - [`RequestLogLayer`]: Request IDs and access logging
//! - [`SecurityHeadersLayer`]: Security response headers
//! - [`cors_layer`]: CORS from configuration
//! - [`AuthLayer`]: JWT authentication
//! - [`RateLimitLayer`]: Sliding-window rate limiting
//! - [`RequirePermissionLayer`]: Per-route permission checks

mod auth;
mod cors;
mod permission;
mod rate_limit;
mod request_log;
mod security_headers;

pub use auth::{AuthLayer, AuthMiddleware};
pub use cors::cors_layer;
pub use permission::{RequirePermissionLayer, RequirePermissionMiddleware};
pub use rate_limit::{
    RATE_LIMIT_LIMIT, RATE_LIMIT_REMAINING, RATE_LIMIT_RESET, RateLimitConfig, RateLimitLayer,
    RateLimitMiddleware,
};
pub use request_log::{
    REQUEST_ID_HEADER, RequestId, RequestLogLayer, RequestLogMiddleware, redacted_headers,
};
pub use security_headers::{
    SecurityHeadersConfig, SecurityHeadersLayer, SecurityHeadersMiddleware,
};
