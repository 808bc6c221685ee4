// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Why a configuration could not be loaded.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias for this crate.
pub type ConfigResult<T> = Result<T, ConfigError>;

/// Load and validation failures, from reading the file to checking that
/// every user's roles exist.
#[derive(Debug, Error)]
pub enum ConfigError {
    // --- reading -----------------------------------------------------------
    /// No file at the given path.
    #[error("File not found: {path}")]
    FileNotFound {
        /// Requested path.
        path: PathBuf,
    },

    /// The file exists but could not be read.
    #[error("Cannot read '{path}': {source}")]
    Io {
        /// Requested path.
        path: PathBuf,
        /// OS error.
        #[source]
        source: std::io::Error,
    },

    /// The extension is not `.yaml`, `.yml`, `.toml` or `.json`.
    #[error("Unsupported configuration format: {format}")]
    UnsupportedFormat {
        /// The extension or format name given.
        format: String,
    },

    // --- decoding ----------------------------------------------------------
    /// The document did not decode. Raised for in-memory content.
    #[error("Cannot decode configuration: {message}")]
    Serialization {
        /// Decoder message.
        message: String,
    },

    /// As [`ConfigError::Serialization`], for a document read from `path`.
    #[error("Cannot decode '{path}': {message}")]
    Parse {
        /// Source file.
        path: PathBuf,
        /// Decoder message.
        message: String,
    },

    // --- environment -------------------------------------------------------
    /// `${NAME}` has no default and `NAME` is unset.
    #[error("Environment variable not found: {name}")]
    EnvVarNotFound {
        /// Variable name.
        name: String,
    },

    /// A `WARDEN_*` override did not parse.
    #[error("Invalid value for environment variable '{name}': {message}")]
    InvalidEnvVar {
        /// Variable name.
        name: String,
        /// Parse failure.
        message: String,
    },

    // --- content -----------------------------------------------------------
    /// A setting was out of range or malformed.
    #[error("Invalid '{field}': {message}")]
    Validation {
        /// Dotted path of the setting, e.g. `api.rate_limit.window_secs`.
        field: String,
        /// What is wrong with it.
        message: String,
    },

    /// Two roles, or two users, share a name.
    #[error("Duplicate {kind} '{name}'")]
    Duplicate {
        /// `role` or `user`.
        kind: &'static str,
        /// The repeated name.
        name: String,
    },

    /// A user lists a role no `access.roles` entry defines.
    #[error("User '{user}' references undefined role '{role}'")]
    UndefinedRole {
        /// User id.
        user: String,
        /// Missing role name.
        role: String,
    },
}

impl ConfigError {
    /// `FileNotFound` for `path`.
    pub fn file_not_found(path: impl Into<PathBuf>) -> Self {
        Self::FileNotFound { path: path.into() }
    }

    /// `Io` for `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// `UnsupportedFormat`.
    pub fn unsupported_format(format: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
        }
    }

    /// `Serialization`.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// `Parse` for `path`.
    pub fn parse(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.into(),
        }
    }

    /// `EnvVarNotFound`.
    pub fn env_var_not_found(name: impl Into<String>) -> Self {
        Self::EnvVarNotFound { name: name.into() }
    }

    /// `InvalidEnvVar`.
    pub fn invalid_env_var(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidEnvVar {
            name: name.into(),
            message: message.into(),
        }
    }

    /// `Validation` for `field`.
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// `Duplicate` for a `role` or `user`.
    pub fn duplicate(kind: &'static str, name: impl Into<String>) -> Self {
        Self::Duplicate {
            kind,
            name: name.into(),
        }
    }

    /// `UndefinedRole`.
    pub fn undefined_role(user: impl Into<String>, role: impl Into<String>) -> Self {
        Self::UndefinedRole {
            user: user.into(),
            role: role.into(),
        }
    }

    /// Attaches the source file to a decode error raised for in-memory
    /// content. Other errors pass through.
    pub fn in_file(self, path: impl Into<PathBuf>) -> Self {
        match self {
            Self::Serialization { message } => Self::parse(path, message),
            other => other,
        }
    }

    /// `true` when the file itself was the problem rather than its content.
    pub fn is_io_error(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::FileNotFound { .. })
    }
}
