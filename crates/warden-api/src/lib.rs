// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # warden-api
//!
//! Authentication and authorization pipeline for axum services.
//!
//! This crate provides RS256 JWT issuance and validation, role-based
//! permission resolution with a per-user cache, a sliding-window rate
//! limiter, and the tower middleware that ties them together:
//!
//! ```text
//! request ─▶ RequestLog ─▶ SecurityHeaders ─▶ CORS ─▶ Auth ─▶ RateLimit ─▶ RequirePermission ─▶ handler
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod auth;
pub mod config;
pub mod error;
pub mod extractors;
pub mod handlers;
pub mod limiter;
pub mod middleware;
pub mod response;
pub mod server;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult, ErrorResponseBody};
pub use limiter::{RateLimitDecision, RateLimitKey, RateLimiter};
pub use server::{ApiServer, ApiServerBuilder};
pub use state::AppState;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
