// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `run` command.

use crate::cli::{Cli, RunArgs};
use crate::error::BinResult;
use crate::logging::init_logging;
use crate::runtime::RuntimeBuilder;

/// Executes the `run` command to start the gateway.
///
/// Logging is installed after the config is loaded so the file's `logging`
/// section can supply defaults for the CLI flags.
pub async fn run(cli: &Cli, args: RunArgs) -> BinResult<()> {
    let runtime = RuntimeBuilder::new()
        .config_path(&cli.config)
        .listen(args.host, args.port)
        .build()?;

    let logging = &runtime.config().logging;
    init_logging(
        cli.log.level(logging.level.as_str()),
        cli.log.format(logging.format.into()),
    )?;

    runtime.run().await
}
