// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Implementation of the `hash-password` command.

use std::io::{self, BufRead};

use crate::cli::{Cli, HashPasswordArgs};
use crate::error::{BinError, BinResult};

/// Prints an argon2id PHC string for the `password_hash` field of a user.
pub fn hash_password(_cli: &Cli, args: HashPasswordArgs) -> BinResult<()> {
    let password = match args.password {
        Some(password) if !args.stdin => password,
        _ => read_line(io::stdin().lock())?,
    };

    println!("{}", hash(&password)?);
    Ok(())
}

fn hash(password: &str) -> BinResult<String> {
    if password.is_empty() {
        return Err(BinError::usage("Password must not be empty"));
    }
    Ok(warden_api::auth::hash_password(password)?)
}

/// Reads one line without its trailing newline.
fn read_line(mut reader: impl BufRead) -> BinResult<String> {
    let mut line = String::new();
    reader.read_line(&mut line)?;
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}
