// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Error types for the warden binary.
//!
//! Exit codes follow `sysexits.h` so that service managers and scripts can
//! tell a bad config file apart from a crashed server.

use thiserror::Error;
use warden_api::ApiError;
use warden_api::auth::AuthError;
use warden_config::ConfigError;

/// Result type alias for warden-bin operations.
pub type BinResult<T> = Result<T, BinError>;

/// `EX_USAGE`
pub const EXIT_USAGE: i32 = 64;
/// `EX_DATAERR`
pub const EXIT_DATA: i32 = 65;
/// `EX_NOINPUT`
pub const EXIT_NOINPUT: i32 = 66;
/// `EX_UNAVAILABLE`
pub const EXIT_UNAVAILABLE: i32 = 69;
/// `EX_SOFTWARE`
pub const EXIT_SOFTWARE: i32 = 70;
/// `EX_IOERR`
pub const EXIT_IO: i32 = 74;
/// `EX_NOPERM`
pub const EXIT_NOPERM: i32 = 77;
/// `EX_CONFIG`
pub const EXIT_CONFIG: i32 = 78;

/// Errors surfaced by the `warden` commands.
#[derive(Debug, Error)]
pub enum BinError {
    /// The config file could not be loaded or failed validation.
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// Bad command-line input.
    #[error("Invalid input: {0}")]
    Usage(String),

    /// A subsystem failed to come up.
    #[error("Failed to start {stage}: {message}")]
    Startup {
        /// Subsystem being started.
        stage: &'static str,
        /// What went wrong.
        message: String,
    },

    /// The HTTP server failed.
    #[error("Server error: {0}")]
    Server(#[from] ApiError),

    /// Signing keys, token issuance or password hashing failed.
    #[error("Credential error: {0}")]
    Credentials(#[from] AuthError),

    /// `validate --strict` found warnings.
    #[error("{count} warning(s) found in strict mode")]
    StrictWarnings {
        /// Number of warnings.
        count: usize,
    },

    /// Rendering command output failed.
    #[error("Failed to render output: {0}")]
    Render(#[from] serde_json::Error),

    /// Terminal or signal I/O failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A background task panicked or was cancelled.
    #[error("Task failed: {0}")]
    Task(String),

    /// An error annotated with what was being attempted.
    #[error("{context}")]
    Context {
        /// What was being attempted.
        context: String,
        /// The underlying error.
        #[source]
        source: Box<BinError>,
    },
}

impl BinError {
    /// Creates a usage error.
    pub fn usage(msg: impl Into<String>) -> Self {
        Self::Usage(msg.into())
    }

    /// Creates a startup error for `stage`.
    pub fn startup(stage: &'static str, msg: impl Into<String>) -> Self {
        Self::Startup {
            stage,
            message: msg.into(),
        }
    }

    /// Wraps the error with what was being attempted.
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// The innermost error, skipping context wrappers.
    pub fn root(&self) -> &BinError {
        match self {
            Self::Context { source, .. } => source.root(),
            other => other,
        }
    }

    /// Returns the process exit code for this error.
    pub fn exit_code(&self) -> i32 {
        match self.root() {
            Self::Config(e) if e.is_io_error() => EXIT_NOINPUT,
            Self::Config(_) => EXIT_CONFIG,
            Self::Usage(_) => EXIT_USAGE,
            Self::StrictWarnings { .. } => EXIT_DATA,
            Self::Startup { .. } => EXIT_UNAVAILABLE,
            Self::Credentials(_) => EXIT_NOPERM,
            Self::Io(_) => EXIT_IO,
            Self::Server(_) | Self::Render(_) | Self::Task(_) | Self::Context { .. } => {
                EXIT_SOFTWARE
            }
        }
    }
}

impl From<anyhow::Error> for BinError {
    fn from(err: anyhow::Error) -> Self {
        Self::Task(format!("{err:#}"))
    }
}

// =============================================================================
// Error Reporting
// =============================================================================

/// Prints the error and its cause chain on stderr.
pub fn report_error(error: &BinError) {
    eprintln!("error: {error}");

    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        eprintln!("  caused by: {cause}");
        source = cause.source();
    }
}

/// Reports an error and exits with its code.
pub fn report_error_and_exit(error: BinError) -> ! {
    report_error(&error);
    std::process::exit(error.exit_code())
}

// =============================================================================
// Tests
// =============================================================================
