// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # warden-config
//!
//! Configuration schema and loading for the warden gateway.
//!
//! ## Quick Start
//!
//! ```no_run
//! use warden_config::loader::load_config;
//!
//! let config = load_config("warden.yaml").unwrap();
//! let directory = config.build_directory().unwrap();
//!
//! println!("Listening on {}", config.api.socket_addr());
//! println!("Users: {}", directory.user_count());
//! ```
//!
//! ## Configuration Schema
//!
//! - `api` - server address, CORS, security headers, JWT keys, rate limits
//! - `access` - roles with their permissions, users with their roles
//! - `logging` - level and output format
//!
//! Values can reference environment variables, and selected fields can be
//! overridden with `WARDEN_*` variables:
//!
//! ```yaml
//! api:
//!   jwt:
//!     issuer: "${WARDEN_ISSUER:warden}"
//!     private_key_path: keys/jwt_private.pem
//!     public_key_path: keys/jwt_public.pem
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod loader;
pub mod schema;

pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigFormat, ConfigLoader, ConfigLoaderBuilder, load_config, load_config_str};
pub use schema::{
    AccessConfig, LogFormat, LogLevel, LoggingConfig, RoleDefinition, UserDefinition, WardenConfig,
};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Convenience re-exports for common use cases.
pub mod prelude {
    pub use crate::error::{ConfigError, ConfigResult};
    pub use crate::loader::{ConfigLoader, load_config};
    pub use crate::schema::WardenConfig;
}
