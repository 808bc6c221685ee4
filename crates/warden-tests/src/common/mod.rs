// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Shared by the integration tests: RSA key and user fixtures, an
//! in-process gateway, and response assertions.

pub mod assertions;
pub mod fixtures;
pub mod harness;

pub use assertions::*;
pub use fixtures::*;
pub use harness::*;

use std::sync::OnceLock;

use tracing_subscriber::EnvFilter;

/// Routes `tracing` output through the test harness once per process.
///
/// `RUST_LOG` overrides the default of gateway debug logs only.
pub fn init_test_logging() {
    static INSTALLED: OnceLock<()> = OnceLock::new();
    INSTALLED.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new("warn,warden_api=debug"));
        // Another test binary's subscriber may already be global.
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// A fresh directory removed when the handle drops.
pub fn temp_test_dir(prefix: &str) -> tempfile::TempDir {
    tempfile::Builder::new()
        .prefix(&format!("{prefix}-"))
        .tempdir()
        .expect("create temp dir")
}
