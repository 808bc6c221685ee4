// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Global `tracing` subscriber.

use std::io::IsTerminal;

use tracing::Level;
use tracing_subscriber::{
    EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

use crate::cli::LogFormat;
use crate::error::{BinError, BinResult};

/// Appended to the level directive unless `RUST_LOG` is set.
const DEPENDENCY_DIRECTIVES: &str = "hyper=warn,tower=warn,tower_http=info,axum=info";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Installs the subscriber. Fails if one is already installed.
///
/// `RUST_LOG`, when set and valid, replaces `level` entirely.
pub fn init_logging(level: &str, format: LogFormat) -> BinResult<()> {
    let filter = build_filter(level)?;
    tracing_subscriber::registry()
        .with(output_layer(format))
        .with(filter)
        .try_init()
        .map_err(|e| BinError::startup("logging", e.to_string()))
}

fn output_layer(format: LogFormat) -> BoxedLayer {
    let ansi = std::io::stdout().is_terminal();
    match format {
        LogFormat::Text => fmt::layer().with_ansi(ansi).boxed(),
        LogFormat::Compact => fmt::layer()
            .compact()
            .with_target(false)
            .with_ansi(ansi)
            .boxed(),
        // Request spans carry the request id; keep only the innermost.
        LogFormat::Json => fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .boxed(),
    }
}

/// `RUST_LOG` if usable, else `level` followed by the dependency directives.
pub fn build_filter(level: &str) -> BinResult<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => {
            let directive = format!("{},{DEPENDENCY_DIRECTIVES}", parse_level(level))
                .to_ascii_lowercase();
            EnvFilter::try_new(&directive).map_err(|e| {
                BinError::startup("logging", format!("invalid filter '{directive}': {e}"))
            })
        }
    }
}

/// Reads a level name case-insensitively. `warning` is accepted; anything
/// unrecognized is `INFO`.
pub fn parse_level(level: &str) -> Level {
    let level = level.trim();
    if level.eq_ignore_ascii_case("warning") {
        return Level::WARN;
    }
    level.parse().unwrap_or(Level::INFO)
}
