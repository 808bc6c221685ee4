// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! `version`: crate versions and the built-in token defaults.

use std::fmt::Write as _;
use std::time::Duration;

use warden_api::auth::JwtConfig;
use warden_api::middleware::RateLimitConfig;

use crate::cli::Cli;
use crate::error::BinResult;

/// Prints version information.
pub fn version(_cli: &Cli) -> BinResult<()> {
    print!("{}", version_text());
    Ok(())
}

fn version_text() -> String {
    let jwt = JwtConfig::default();
    let limit = RateLimitConfig::default();
    let mut out = String::new();

    // Writing to a String cannot fail.
    let _ = writeln!(out, "warden {}", crate::VERSION);
    let _ = writeln!(out, "  warden-api     {}", warden_api::VERSION);
    let _ = writeln!(out, "  warden-config  {}", warden_config::VERSION);
    let _ = writeln!(
        out,
        "  platform       {}-{}",
        std::env::consts::ARCH,
        std::env::consts::OS
    );
    let _ = writeln!(out);
    let _ = writeln!(out, "defaults:");
    let _ = writeln!(out, "  signing        {:?}", jwt.algorithm);
    let _ = writeln!(out, "  access token   {}", human(Duration::from_secs(jwt.access_ttl_secs)));
    let _ = writeln!(out, "  refresh token  {}", human(Duration::from_secs(jwt.refresh_ttl_secs)));
    let _ = writeln!(
        out,
        "  rate limit     {} per {}",
        limit.max_requests,
        human(limit.window())
    );
    out
}

fn human(d: Duration) -> String {
    let secs = d.as_secs();
    match secs {
        s if s % 86_400 == 0 => format!("{}d", s / 86_400),
        s if s % 3_600 == 0 => format!("{}h", s / 3_600),
        s if s % 60 == 0 => format!("{}m", s / 60),
        s => format!("{s}s"),
    }
}
