// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `token` command.

use warden_api::auth::{JwtService, UserStore};
use warden_api::response::TokenPairResponse;
use warden_config::WardenConfig;

use crate::cli::{Cli, LogFormat, OutputFormat, TokenArgs};
use crate::error::{BinError, BinResult};
use crate::logging::init_logging;

/// Mints an access token for a configured user, looked up by ID or email.
pub async fn token(cli: &Cli, args: TokenArgs) -> BinResult<()> {
    init_logging(
        cli.log.level("warn"),
        cli.log.format(LogFormat::Text),
    )?;

    let config = warden_config::load_config(&cli.config)?;
    let minted = mint(&config, &args.user, args.refresh).await?;

    match args.format {
        OutputFormat::Text => {
            println!("{}", minted.access_token);
            if !minted.refresh_token.is_empty() {
                println!("{}", minted.refresh_token);
            }
        }
        OutputFormat::Json => {
            let output = serde_json::to_string_pretty(&minted)?;
            println!("{output}");
        }
    }
    Ok(())
}

/// Issues tokens for `login`. The refresh token is empty unless requested.
pub(crate) async fn mint(
    config: &WardenConfig,
    login: &str,
    with_refresh: bool,
) -> BinResult<TokenPairResponse> {
    let directory = config.build_directory()?;
    let account = directory
        .find_by_login(login)
        .await?
        .ok_or_else(|| BinError::usage(format!("User '{login}' is not configured")))?;

    let jwt = JwtService::new(config.api.jwt.clone())?;
    let access = jwt.generate_access_token(&account.id, account.email.as_deref(), &account.roles)?;

    let (refresh_token, refresh_expires_in) = if with_refresh {
        let refresh = jwt.generate_refresh_token(&account.id)?;
        let expires_in = refresh.expires_in();
        (refresh.token, expires_in)
    } else {
        (String::new(), 0)
    };

    Ok(TokenPairResponse {
        access_token: access.token.clone(),
        refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: access.expires_in(),
        refresh_expires_in,
    })
}
