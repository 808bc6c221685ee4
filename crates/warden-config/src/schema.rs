// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Configuration schema for the warden gateway.
//!
//! ```text
//! WardenConfig
//! ├── api: ApiConfig        (server, CORS, security headers, JWT, rate limit)
//! ├── access: AccessConfig
//! │   ├── roles: [RoleDefinition]
//! │   └── users: [UserDefinition]
//! └── logging: LoggingConfig
//! ```

use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use warden_api::ApiConfig;
use warden_api::auth::{InMemoryDirectory, Permission, Role, UserAccount};

use crate::error::{ConfigError, ConfigResult};

// =============================================================================
// WardenConfig
// =============================================================================

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WardenConfig {
    /// HTTP server and middleware settings.
    #[serde(default)]
    pub api: ApiConfig,

    /// Roles and users.
    #[serde(default)]
    pub access: AccessConfig,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl WardenConfig {
    /// Validates the whole configuration.
    pub fn validate(&self) -> ConfigResult<()> {
        self.validate_api()?;
        self.access.validate()?;
        Ok(())
    }

    fn validate_api(&self) -> ConfigResult<()> {
        self.api.check().map_err(|e| {
            ConfigError::validation(format!("api.{}", e.field), e.reason)
        })
    }

    /// Builds the in-memory role and user directory.
    ///
    /// Call [`validate`](Self::validate) first; this only re-checks
    /// permission names.
    pub fn build_directory(&self) -> ConfigResult<InMemoryDirectory> {
        let mut builder = InMemoryDirectory::builder();
        for role in &self.access.roles {
            builder = builder.role(role.to_role()?);
        }
        for user in &self.access.users {
            builder = builder.user(user.to_account());
        }
        Ok(builder.build())
    }
}

// =============================================================================
// Access
// =============================================================================

/// Role and user definitions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AccessConfig {
    /// Role definitions.
    #[serde(default)]
    pub roles: Vec<RoleDefinition>,

    /// User definitions.
    #[serde(default)]
    pub users: Vec<UserDefinition>,
}

impl AccessConfig {
    /// Validates names, permissions and role references.
    pub fn validate(&self) -> ConfigResult<()> {
        let mut role_names = HashSet::new();
        for role in &self.roles {
            if role.name.is_empty() {
                return Err(ConfigError::validation("access.roles.name", "cannot be empty"));
            }
            if !role_names.insert(role.name.as_str()) {
                return Err(ConfigError::duplicate("role", &role.name));
            }
            role.to_role()?;
        }

        let mut user_ids = HashSet::new();
        for user in &self.users {
            if user.id.is_empty() {
                return Err(ConfigError::validation("access.users.id", "cannot be empty"));
            }
            if !user_ids.insert(user.id.as_str()) {
                return Err(ConfigError::duplicate("user", &user.id));
            }
            if let Some(role) = user.roles.iter().find(|r| !role_names.contains(r.as_str())) {
                return Err(ConfigError::undefined_role(&user.id, role));
            }
        }

        Ok(())
    }
}

/// A named set of permissions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoleDefinition {
    /// Role name.
    pub name: String,

    /// Description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Permission names, e.g. `device.read` or `device.*`.
    #[serde(default)]
    pub permissions: Vec<String>,
}

impl RoleDefinition {
    /// Converts into a [`Role`], parsing every permission.
    pub fn to_role(&self) -> ConfigResult<Role> {
        let permissions = self
            .permissions
            .iter()
            .map(|p| {
                Permission::parse(p).map_err(|e| {
                    ConfigError::validation(
                        format!("access.roles.{}.permissions", self.name),
                        e.to_string(),
                    )
                })
            })
            .collect::<ConfigResult<Vec<_>>>()?;

        let role = Role::new(&self.name, permissions);
        Ok(match &self.description {
            Some(description) => role.with_description(description),
            None => role,
        })
    }
}

/// A user account.
#[derive(Clone, Serialize, Deserialize)]
pub struct UserDefinition {
    /// User ID.
    pub id: String,

    /// Email, usable as an alternative login.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    /// Argon2 PHC string. Users without one cannot log in with a password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,

    /// Assigned role names.
    #[serde(default)]
    pub roles: Vec<String>,

    /// `false` keeps the account configured but refuses its logins.
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

impl UserDefinition {
    /// Converts into a [`UserAccount`].
    pub fn to_account(&self) -> UserAccount {
        let mut account = UserAccount::new(&self.id).with_roles(self.roles.iter().cloned());
        if let Some(email) = &self.email {
            account = account.with_email(email);
        }
        if let Some(hash) = &self.password_hash {
            account = account.with_password_hash(hash);
        }
        if !self.active {
            account = account.disabled();
        }
        account
    }
}

impl fmt::Debug for UserDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserDefinition")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("password_hash", &self.password_hash.as_ref().map(|_| "[REDACTED]"))
            .field("roles", &self.roles)
            .field("active", &self.active)
            .finish()
    }
}

// =============================================================================
// Logging
// =============================================================================

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level.
    #[serde(default)]
    pub level: LogLevel,

    /// Log format.
    #[serde(default)]
    pub format: LogFormat,
}

/// Log level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level.
    Trace,
    /// Debug level.
    Debug,
    /// Info level.
    #[default]
    Info,
    /// Warning level.
    Warn,
    /// Error level.
    Error,
}

impl LogLevel {
    /// Returns the level as an `EnvFilter` directive.
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            other => Err(format!("unknown log level '{other}'")),
        }
    }
}

/// Log format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text.
    #[default]
    Text,
    /// Single-line compact text.
    Compact,
    /// JSON for log aggregation.
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "pretty" => Ok(LogFormat::Text),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
