// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Gateway runtime orchestration.
//!
//! Builds the role/user directory and the API server from configuration,
//! serves until a shutdown signal arrives, then drains connections within
//! the configured shutdown timeout.

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use warden_api::{ApiError, ApiServer, ApiServerBuilder};
use warden_config::{WardenConfig, load_config};

use crate::error::{BinError, BinResult};
use crate::shutdown::ShutdownCoordinator;

// =============================================================================
// GatewayRuntime
// =============================================================================

/// The gateway runtime.
pub struct GatewayRuntime {
    config: Arc<WardenConfig>,
    shutdown: ShutdownCoordinator,
}

impl GatewayRuntime {
    /// Creates a new gateway runtime.
    pub fn new(config: WardenConfig) -> Self {
        Self {
            config: Arc::new(config),
            shutdown: ShutdownCoordinator::new(),
        }
    }

    /// Returns the configuration.
    pub fn config(&self) -> &WardenConfig {
        &self.config
    }

    /// Returns a handle that can stop the runtime.
    pub fn shutdown_handle(&self) -> ShutdownCoordinator {
        self.shutdown.clone()
    }

    /// Builds the API server from configuration.
    pub fn build_server(&self) -> BinResult<ApiServer> {
        let directory = self
            .config
            .build_directory()
            .map_err(|e| BinError::from(e).context("Building the user directory"))?;

        let server = ApiServerBuilder::new()
            .config(self.config.api.clone())
            .directory(Arc::new(directory))
            .build()
            .map_err(|e| BinError::from(e).context("Initializing the API server"))?;
        Ok(server)
    }

    /// Runs the gateway until shutdown is signaled.
    pub async fn run(self) -> BinResult<()> {
        info!(version = warden_api::VERSION, "Starting Warden gateway");

        let server = self.build_server()?;
        info!(
            addr = %server.addr(),
            roles = self.config.access.roles.len(),
            users = self.config.access.users.len(),
            rate_limit = self.config.api.rate_limit.enabled,
            "Gateway components initialized"
        );

        let signals = tokio::spawn(self.shutdown.clone().listen_for_signals());
        let mut serving = tokio::spawn(server.run_with_shutdown(self.shutdown.shutdown_signal()));

        let result = tokio::select! {
            // The server stopped on its own, e.g. the port was taken.
            joined = &mut serving => flatten(joined),
            _ = self.shutdown.shutdown_signal() => {
                if let Some(reason) = self.shutdown.reason() {
                    info!(%reason, "Draining connections");
                }
                let grace = self.config.api.shutdown_timeout;
                match tokio::time::timeout(grace, &mut serving).await {
                    Ok(joined) => flatten(joined),
                    Err(_) => {
                        warn!(timeout_secs = grace.as_secs(), "Graceful shutdown timed out");
                        serving.abort();
                        Ok(())
                    }
                }
            }
        };

        signals.abort();
        info!("Warden gateway shutdown complete");
        result
    }
}

fn flatten(joined: Result<Result<(), ApiError>, tokio::task::JoinError>) -> BinResult<()> {
    match joined {
        Ok(result) => result.map_err(BinError::from),
        Err(e) => Err(BinError::Task(format!("server task: {e}"))),
    }
}

// =============================================================================
// RuntimeBuilder
// =============================================================================

/// Builder for constructing the gateway runtime.
#[derive(Default)]
pub struct RuntimeBuilder {
    config_path: Option<PathBuf>,
    config: Option<WardenConfig>,
    host: Option<IpAddr>,
    port: Option<u16>,
}

impl RuntimeBuilder {
    /// Creates a new runtime builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the configuration file path.
    pub fn config_path(mut self, path: impl AsRef<Path>) -> Self {
        self.config_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Sets the configuration directly.
    pub fn config(mut self, config: WardenConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Overrides the listen address and port where given.
    pub fn listen(mut self, host: Option<IpAddr>, port: Option<u16>) -> Self {
        self.host = host;
        self.port = port;
        self
    }

    /// Builds the runtime.
    pub fn build(self) -> BinResult<GatewayRuntime> {
        let mut config = match self.config {
            Some(cfg) => cfg,
            None => {
                let path = self
                    .config_path
                    .ok_or_else(|| BinError::usage("No configuration provided"))?;
                load_config(&path).map_err(|e| {
                    BinError::from(e).context(format!("Loading {}", path.display()))
                })?
            }
        };

        if let Some(host) = self.host {
            config.api.host = host;
        }
        if let Some(port) = self.port {
            config.api.port = port;
        }

        Ok(GatewayRuntime::new(config))
    }
}

// =============================================================================
// Tests
// =============================================================================
