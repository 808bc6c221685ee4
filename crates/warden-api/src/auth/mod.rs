// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Authentication and authorization module.
//!
//! This module provides:
//! - JWT issuance and validation with token revocation
//! - Permission names, wildcard grants and permission sets
//! - Role repositories and the cached permission resolver
//! - Credential login and refresh token rotation
//! - Authentication context

mod claims;
mod context;
mod error;
mod jwt;
pub mod permission;
mod rbac;
mod revocation;
mod service;
mod session;

pub use claims::{Claims, TokenType};
pub use context::AuthContext;
pub use error::{AuthError, AuthResult};
pub use jwt::{JwtConfig, JwtService, SignedToken};
pub use permission::{Permission, PermissionError, PermissionSet};
pub use rbac::{InMemoryDirectory, InMemoryDirectoryBuilder, Role, RoleRepository, UserAccount, UserStore};
pub use revocation::TokenBlacklist;
pub use service::PermissionService;
pub use session::{AuthService, TokenPair, hash_password};
