// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Settings for the HTTP gateway.
//!
//! Every field has a default, so a config file only names what it changes:
//!
//! ```yaml
//! port: 9443
//! rate_limit:
//!   max_requests: 10
//! cors:
//!   allowed_origins: ["https://app.example.com"]
//!   allow_credentials: true
//! ```
//!
//! [`ApiConfig::check`] rejects combinations the server cannot run with.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::auth::JwtConfig;
use crate::middleware::{RateLimitConfig, SecurityHeadersConfig, SecurityHeadersLayer};

const WILDCARD: &str = "*";

/// Gateway settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// Listen address.
    pub host: IpAddr,
    /// Listen port. `0` picks a free port.
    pub port: u16,
    /// Cross-origin policy.
    pub cors: CorsConfig,
    /// Headers stamped on every response.
    pub security_headers: SecurityHeadersConfig,
    /// Token signing and lifetimes.
    pub jwt: JwtConfig,
    /// Sliding-window request limit.
    pub rate_limit: RateLimitConfig,
    /// Paths served without a bearer token. A trailing `*` matches a prefix.
    pub public_paths: Vec<String>,
    /// Requests running longer are answered with 408.
    #[serde(with = "whole_seconds")]
    pub request_timeout: Duration,
    /// Grace period for in-flight requests on shutdown.
    #[serde(with = "whole_seconds")]
    pub shutdown_timeout: Duration,
    /// Largest accepted request body, in bytes.
    pub max_body_size: usize,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: IpAddr::V4(Ipv4Addr::UNSPECIFIED),
            port: 8080,
            cors: CorsConfig::default(),
            security_headers: SecurityHeadersConfig::default(),
            jwt: JwtConfig::default(),
            rate_limit: RateLimitConfig::default(),
            public_paths: default_public_paths(),
            request_timeout: Duration::from_secs(30),
            shutdown_timeout: Duration::from_secs(30),
            max_body_size: 1 << 20,
        }
    }
}

/// Health probes plus the two endpoints that hand out tokens.
pub fn default_public_paths() -> Vec<String> {
    to_strings([
        "/health",
        "/ready",
        "/api/v1/auth/login",
        "/api/v1/auth/refresh",
    ])
}

impl ApiConfig {
    /// Defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Where the listener binds.
    pub fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    /// Binds to `addr`.
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.host = addr.ip();
        self.port = addr.port();
        self
    }

    /// Replaces the token settings.
    pub fn with_jwt(mut self, jwt: JwtConfig) -> Self {
        self.jwt = jwt;
        self
    }

    /// Replaces the request limit.
    pub fn with_rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    /// Replaces the cross-origin policy.
    pub fn with_cors(mut self, cors: CorsConfig) -> Self {
        self.cors = cors;
        self
    }

    /// Replaces the unauthenticated paths.
    pub fn with_public_paths<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.public_paths = paths.into_iter().map(Into::into).collect();
        self
    }

    /// Rejects settings the server cannot start with.
    ///
    /// Reports the first problem found, keyed by its path under `api`.
    pub fn check(&self) -> Result<(), InvalidSetting> {
        self.jwt
            .validate()
            .map_err(|e| InvalidSetting::new("jwt", e.to_string()))?;

        if self.rate_limit.enabled {
            positive("rate_limit.max_requests", u64::from(self.rate_limit.max_requests))?;
            positive("rate_limit.window_secs", self.rate_limit.window_secs)?;
        }
        positive("request_timeout", self.request_timeout.as_secs())?;
        positive("max_body_size", self.max_body_size as u64)?;

        if let Some(path) = self
            .public_paths
            .iter()
            .find(|p| !p.starts_with('/'))
        {
            return Err(InvalidSetting::new(
                "public_paths",
                format!("'{path}' must start with '/'"),
            ));
        }

        if self.cors.enabled && self.cors.allowed_origins.is_empty() {
            return Err(InvalidSetting::new(
                "cors.allowed_origins",
                "at least one origin is required while CORS is enabled",
            ));
        }

        SecurityHeadersLayer::new(&self.security_headers)
            .map_err(|e| InvalidSetting::new("security_headers", e.to_string()))?;

        Ok(())
    }
}

fn positive(field: &'static str, value: u64) -> Result<(), InvalidSetting> {
    if value == 0 {
        Err(InvalidSetting::new(field, "must be greater than 0"))
    } else {
        Ok(())
    }
}

/// A setting [`ApiConfig::check`] refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {reason}")]
pub struct InvalidSetting {
    /// Dotted path relative to the `api` section.
    pub field: &'static str,
    /// Why it was refused.
    pub reason: String,
}

impl InvalidSetting {
    fn new(field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            field,
            reason: reason.into(),
        }
    }
}

/// Cross-origin policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CorsConfig {
    /// When `false` no CORS headers are sent.
    pub enabled: bool,
    /// Origins allowed to call the API; `*` allows all.
    pub allowed_origins: Vec<String>,
    /// Methods answered in preflight.
    pub allowed_methods: Vec<String>,
    /// Request headers answered in preflight; `*` allows all.
    pub allowed_headers: Vec<String>,
    /// Response headers readable by browser scripts.
    pub exposed_headers: Vec<String>,
    /// Sends `Access-Control-Allow-Credentials: true`.
    pub allow_credentials: bool,
    /// Seconds a preflight answer may be cached.
    pub max_age: u64,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            allowed_origins: to_strings([WILDCARD]),
            allowed_methods: to_strings(["GET", "POST", "PUT", "DELETE", "OPTIONS"]),
            allowed_headers: to_strings(["Content-Type", "Authorization", "X-Request-ID"]),
            // Clients need the limit headers to back off.
            exposed_headers: to_strings([
                "X-Request-ID",
                "X-RateLimit-Limit",
                "X-RateLimit-Remaining",
                "X-RateLimit-Reset",
                "Retry-After",
            ]),
            allow_credentials: false,
            max_age: 3600,
        }
    }
}

impl CorsConfig {
    /// Named origins only, with credentials, for `GET` and `POST`.
    pub fn strict(origins: Vec<String>) -> Self {
        Self {
            allowed_origins: origins,
            allowed_methods: to_strings(["GET", "POST"]),
            allow_credentials: true,
            ..Self::default()
        }
    }

    /// `true` when `*` is among the allowed origins.
    pub fn allows_any_origin(&self) -> bool {
        self.allowed_origins.iter().any(|o| o == WILDCARD)
    }
}

fn to_strings<const N: usize>(items: [&str; N]) -> Vec<String> {
    items.iter().map(|s| (*s).to_owned()).collect()
}

/// `Duration` as an integer number of seconds.
mod whole_seconds {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}
