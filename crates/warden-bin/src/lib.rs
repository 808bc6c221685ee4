// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! The `warden` executable.
//!
//! `main` parses a [`Cli`] and hands it to [`commands::execute`]. Serving
//! goes through [`RuntimeBuilder`], which loads the config file, builds the
//! user directory and API server, and stops on SIGINT or SIGTERM after
//! draining in-flight requests.
//!
//! ```bash
//! warden -c /etc/warden/warden.yaml          # serve
//! warden validate --strict                   # check a config file
//! echo 's3cret' | warden hash-password --stdin
//! warden token alice --refresh -f json
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod cli;
pub mod commands;
pub mod error;
pub mod logging;
pub mod runtime;
pub mod shutdown;

pub use cli::{Cli, Commands};
pub use error::{BinError, BinResult};
pub use logging::init_logging;
pub use runtime::{GatewayRuntime, RuntimeBuilder};
pub use shutdown::{ShutdownCoordinator, ShutdownReason};

/// Crate version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
