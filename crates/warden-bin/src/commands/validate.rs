// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `validate` command.

use std::collections::HashSet;
use std::path::Path;

use warden_config::WardenConfig;

use crate::cli::{Cli, LogFormat, OutputFormat, ValidateArgs};
use crate::error::{BinError, BinResult};
use crate::logging::init_logging;

/// Executes the `validate` command.
pub fn validate(cli: &Cli, args: ValidateArgs) -> BinResult<()> {
    init_logging(
        cli.log.level("warn"),
        cli.log.format(LogFormat::Text),
    )?;

    let config_path = &cli.config;
    let config = warden_config::load_config(config_path)
        .map_err(|e| BinError::from(e).context(format!("Validating {}", config_path.display())))?;

    let warnings = collect_warnings(&config);

    match args.format {
        OutputFormat::Text => print_text(config_path, &config, &warnings, args.show_config)?,
        OutputFormat::Json => {
            let output = serde_json::json!({
                "valid": true,
                "config_path": config_path.display().to_string(),
                "summary": {
                    "address": config.api.socket_addr().to_string(),
                    "roles": config.access.roles.len(),
                    "users": config.access.users.len(),
                    "rate_limit_enabled": config.api.rate_limit.enabled,
                    "cors_enabled": config.api.cors.enabled,
                },
                "warnings": warnings,
                "config": if args.show_config { Some(redacted(&config)) } else { None },
            });
            println!("{}", to_pretty(&output)?);
        }
    }

    if args.strict && !warnings.is_empty() {
        return Err(BinError::StrictWarnings {
            count: warnings.len(),
        });
    }

    Ok(())
}

fn print_text(
    path: &Path,
    config: &WardenConfig,
    warnings: &[String],
    show_config: bool,
) -> BinResult<()> {
    println!("Configuration is valid: {}", path.display());
    println!();
    println!("Summary:");
    println!("  Address:    {}", config.api.socket_addr());
    println!("  Roles:      {}", config.access.roles.len());
    println!("  Users:      {}", config.access.users.len());
    println!(
        "  Rate limit: {}",
        if config.api.rate_limit.enabled {
            format!(
                "{} requests / {}s",
                config.api.rate_limit.max_requests, config.api.rate_limit.window_secs
            )
        } else {
            "disabled".to_string()
        }
    );
    println!(
        "  CORS:       {}",
        if config.api.cors.enabled { "enabled" } else { "disabled" }
    );

    if !warnings.is_empty() {
        println!();
        println!("Warnings:");
        for warning in warnings {
            println!("  - {warning}");
        }
    }

    if show_config {
        println!();
        println!("Parsed configuration:");
        println!("{}", to_pretty(&redacted(config))?);
    }
    Ok(())
}

/// Findings that are legal but probably unintended.
pub(crate) fn collect_warnings(config: &WardenConfig) -> Vec<String> {
    let mut warnings = Vec::new();
    let api = &config.api;

    if api.jwt.is_hmac() {
        warnings.push("JWT uses a shared HMAC secret instead of an RSA key pair".to_string());
    }
    for path in [&api.jwt.private_key_path, &api.jwt.public_key_path]
        .into_iter()
        .flatten()
    {
        if !path.exists() {
            warnings.push(format!("JWT key file does not exist: {}", path.display()));
        }
    }

    if !api.rate_limit.enabled {
        warnings.push("Rate limiting is disabled".to_string());
    }
    if api.cors.enabled && api.cors.allows_any_origin() && api.cors.allow_credentials {
        warnings.push("CORS allows credentials from any origin".to_string());
    }
    if !api.security_headers.enabled {
        warnings.push("Security headers are disabled".to_string());
    }

    if config.access.users.is_empty() {
        warnings.push("No users configured".to_string());
    }
    for user in &config.access.users {
        if !user.active {
            warnings.push(format!("User '{}' is disabled", user.id));
        } else if user.password_hash.is_none() {
            warnings.push(format!("User '{}' has no password and cannot log in", user.id));
        }
    }

    let assigned: HashSet<&str> = config
        .access
        .users
        .iter()
        .flat_map(|u| u.roles.iter().map(String::as_str))
        .collect();
    for role in &config.access.roles {
        if !assigned.contains(role.name.as_str()) {
            warnings.push(format!("Role '{}' is not assigned to any user", role.name));
        }
    }

    warnings
}

fn redacted(config: &WardenConfig) -> WardenConfig {
    let mut config = config.clone();
    for user in &mut config.access.users {
        if user.password_hash.is_some() {
            user.password_hash = Some("[REDACTED]".to_string());
        }
    }
    config
}

fn to_pretty<T: serde::Serialize>(value: &T) -> BinResult<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

// =============================================================================
// Tests
// =============================================================================
