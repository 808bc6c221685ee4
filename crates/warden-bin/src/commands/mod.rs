// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! One module per subcommand.

mod password;
mod run;
mod token;
mod validate;
mod version;

pub use password::hash_password;
pub use run::run;
pub use token::token;
pub use validate::validate;
pub use version::version;

use crate::cli::{Cli, Commands};
use crate::error::BinResult;

/// Runs the selected subcommand; `run` when none was given.
pub async fn execute(cli: Cli) -> BinResult<()> {
    let command = cli.effective_command();
    match command {
        Commands::Run(args) => run(&cli, args).await,
        Commands::Token(args) => token(&cli, args).await,
        Commands::Validate(args) => validate(&cli, args),
        Commands::HashPassword(args) => hash_password(&cli, args),
        Commands::Version => version(&cli),
    }
}
