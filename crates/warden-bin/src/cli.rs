// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Command line.
//!
//! ```text
//! warden [-c FILE] [LOG FLAGS] [run] [--host IP] [--port N]
//! warden validate [--strict] [--show-config] [-f text|json]
//! warden token <USER> [--refresh] [-f text|json]
//! warden hash-password (<PASSWORD> | --stdin)
//! warden version
//! ```

use std::net::IpAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Authentication and authorization gateway.
///
/// Checks RS256 bearer tokens, resolves role permissions and applies a
/// sliding-window rate limit before requests reach the API.
#[derive(Parser, Debug)]
#[command(
    name = "warden",
    author = "Sylvex <contact@sylvex.io>",
    version = warden_api::VERSION,
    propagate_version = true
)]
pub struct Cli {
    /// Config file (YAML, TOML or JSON)
    #[arg(
        short,
        long,
        env = "WARDEN_CONFIG",
        default_value = "warden.yaml",
        global = true
    )]
    pub config: PathBuf,

    #[command(flatten)]
    pub log: LogArgs,

    /// What to do; serves when omitted
    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Flags shared by every command that control log output.
#[derive(Args, Debug, Default, Clone)]
pub struct LogArgs {
    /// Log level; the config file's `logging.level` when absent
    #[arg(short = 'l', long = "log-level", env = "WARDEN_LOG_LEVEL", global = true)]
    pub level: Option<String>,

    /// Log format; the config file's `logging.format` when absent
    #[arg(id = "log_format", long = "log-format", env = "WARDEN_LOG_FORMAT", global = true)]
    pub format: Option<LogFormat>,

    /// Warnings and errors only
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl LogArgs {
    /// `-q` and `-v` beat `--log-level`, which beats `fallback`.
    pub fn level<'a>(&'a self, fallback: &'a str) -> &'a str {
        match (self.quiet, self.verbose) {
            (true, _) => "warn",
            (_, true) => "debug",
            _ => self.level.as_deref().unwrap_or(fallback),
        }
    }

    /// `--log-format`, else `fallback`.
    pub fn format(&self, fallback: LogFormat) -> LogFormat {
        self.format.unwrap_or(fallback)
    }
}

/// Subcommands. Without one, `warden` serves.
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Serve the gateway
    Run(RunArgs),

    /// Load and check the config file without serving
    Validate(ValidateArgs),

    /// Print versions and built-in defaults
    Version,

    /// Print an argon2 hash for a user's `password_hash`
    #[command(name = "hash-password")]
    HashPassword(HashPasswordArgs),

    /// Issue a token for a configured user
    Token(TokenArgs),
}

/// `run`
#[derive(Args, Debug, Default, Clone)]
pub struct RunArgs {
    /// Listen address, replacing `api.host`
    #[arg(long)]
    pub host: Option<IpAddr>,

    /// Listen port, replacing `api.port`
    #[arg(short, long)]
    pub port: Option<u16>,
}

/// `validate`
#[derive(Args, Debug, Default, Clone)]
pub struct ValidateArgs {
    /// Print the effective configuration
    #[arg(short, long)]
    pub show_config: bool,

    /// Report format
    #[arg(short, long, value_enum, default_value_t)]
    pub format: OutputFormat,

    /// Fail on warnings too
    #[arg(long)]
    pub strict: bool,
}

/// `hash-password`
#[derive(Args, Debug, Clone)]
pub struct HashPasswordArgs {
    /// Plain-text password
    #[arg(required_unless_present = "stdin", conflicts_with = "stdin")]
    pub password: Option<String>,

    /// Read the password from the first line of stdin
    #[arg(long)]
    pub stdin: bool,
}

/// `token`
#[derive(Args, Debug, Clone)]
pub struct TokenArgs {
    /// User id or email
    pub user: String,

    /// Print a refresh token as well
    #[arg(long)]
    pub refresh: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

/// How log lines are rendered.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Multi-line, colored on a terminal
    #[default]
    Text,
    /// One JSON object per line
    Json,
    /// Single line, no target
    Compact,
}

impl From<warden_config::LogFormat> for LogFormat {
    fn from(format: warden_config::LogFormat) -> Self {
        use warden_config::LogFormat as File;
        match format {
            File::Text => Self::Text,
            File::Json => Self::Json,
            File::Compact => Self::Compact,
        }
    }
}

/// How command results are printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// For people
    #[default]
    Text,
    /// For scripts
    Json,
}

impl Cli {
    /// Parses `std::env::args`, exiting on bad input.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// The subcommand, `run` with no overrides when none was given.
    pub fn effective_command(&self) -> Commands {
        match &self.command {
            Some(command) => command.clone(),
            None => Commands::Run(RunArgs::default()),
        }
    }
}
