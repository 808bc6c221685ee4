// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Route handlers. Authentication, permission checks and rate limiting
//! happen in middleware before any of these run.

mod admin;
mod auth;
mod health;

pub use admin::*;
pub use auth::*;
pub use health::*;
