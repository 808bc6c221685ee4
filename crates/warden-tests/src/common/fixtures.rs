// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Test Fixtures
//!
//! Keys, access definitions and configurations shared by the integration
//! suites.
//!
//! | user    | roles    | notes                               |
//! |---------|----------|-------------------------------------|
//! | alice   | viewer   | has email and password              |
//! | bob     | operator |                                     |
//! | carol   | auditor  | may read rate limit state           |
//! | root    | admin    | `*`                                 |
//! | dave    | (none)   |                                     |

use std::path::PathBuf;
use std::sync::OnceLock;
use std::time::Duration;

use warden_api::ApiConfig;
use warden_api::auth::{InMemoryDirectory, JwtConfig, Permission, Role, UserAccount, hash_password};
use warden_api::middleware::RateLimitConfig;

// =============================================================================
// Key Fixtures
// =============================================================================

/// RSA key material checked in under `warden-api/testdata`.
pub struct KeyFixtures;

impl KeyFixtures {
    /// Signing key.
    pub fn private_pem() -> &'static str {
        include_str!("../../../warden-api/testdata/rsa_private.pem")
    }

    /// Verification key matching [`private_pem`](Self::private_pem).
    pub fn public_pem() -> &'static str {
        include_str!("../../../warden-api/testdata/rsa_public.pem")
    }

    /// A second, unrelated signing key.
    pub fn foreign_private_pem() -> &'static str {
        include_str!("../../../warden-api/testdata/rsa_other_private.pem")
    }

    /// Verification key matching [`foreign_private_pem`](Self::foreign_private_pem).
    pub fn foreign_public_pem() -> &'static str {
        include_str!("../../../warden-api/testdata/rsa_other_public.pem")
    }

    /// Absolute path of the signing key on disk.
    pub fn private_key_path() -> PathBuf {
        testdata_dir().join("rsa_private.pem")
    }

    /// Absolute path of the verification key on disk.
    pub fn public_key_path() -> PathBuf {
        testdata_dir().join("rsa_public.pem")
    }
}

fn testdata_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("..")
        .join("warden-api")
        .join("testdata")
}

// =============================================================================
// JWT Fixtures
// =============================================================================

/// JWT configurations.
pub struct JwtFixtures;

impl JwtFixtures {
    /// RS256 with the default lifetimes.
    pub fn rs256() -> JwtConfig {
        JwtConfig::rs256(KeyFixtures::private_pem(), KeyFixtures::public_pem())
    }

    /// RS256 with another key pair, for signature mismatch tests.
    pub fn foreign_rs256() -> JwtConfig {
        JwtConfig::rs256(
            KeyFixtures::foreign_private_pem(),
            KeyFixtures::foreign_public_pem(),
        )
    }
}

// =============================================================================
// Access Fixtures
// =============================================================================

/// Roles, users and credentials.
pub struct AccessFixtures;

impl AccessFixtures {
    /// Alice's password.
    pub const PASSWORD: &'static str = "correct horse battery staple";

    /// Argon2 hash of [`PASSWORD`](Self::PASSWORD), computed once per process.
    pub fn password_hash() -> &'static str {
        static HASH: OnceLock<String> = OnceLock::new();
        HASH.get_or_init(|| hash_password(Self::PASSWORD).expect("Failed to hash password"))
    }

    /// The fixture roles.
    pub fn roles() -> Vec<Role> {
        vec![
            role("viewer", &["device.read"]),
            role("operator", &["device.read", "device.write", "alarm.*"]),
            role("auditor", &["system.audit"]),
            role("admin", &["*"]),
        ]
    }

    /// The fixture users.
    pub fn users() -> Vec<UserAccount> {
        vec![
            UserAccount::new("alice")
                .with_email("alice@example.com")
                .with_password_hash(Self::password_hash())
                .with_roles(["viewer"]),
            UserAccount::new("bob").with_roles(["operator"]),
            UserAccount::new("carol").with_roles(["auditor"]),
            UserAccount::new("root").with_roles(["admin"]),
            UserAccount::new("dave"),
        ]
    }

    /// A directory holding every fixture role and user.
    pub fn directory() -> InMemoryDirectory {
        let mut builder = InMemoryDirectory::builder();
        for role in Self::roles() {
            builder = builder.role(role);
        }
        for user in Self::users() {
            builder = builder.user(user);
        }
        builder.build()
    }
}

fn role(name: &str, permissions: &[&str]) -> Role {
    Role::new(
        name,
        permissions
            .iter()
            .map(|p| Permission::parse(p).expect("fixture permission")),
    )
}

// =============================================================================
// Config Fixtures
// =============================================================================

/// API and file configurations.
pub struct ConfigFixtures;

impl ConfigFixtures {
    /// API config with RS256 keys and a generous rate limit.
    pub fn api_config() -> ApiConfig {
        ApiConfig::default().with_jwt(JwtFixtures::rs256())
    }

    /// API config that admits `max_requests` per `window`.
    pub fn rate_limited(max_requests: u32, window: Duration) -> ApiConfig {
        Self::api_config().with_rate_limit(RateLimitConfig::per_window(max_requests, window))
    }

    /// A complete YAML config file referencing the on-disk fixture keys.
    pub fn yaml() -> String {
        format!(
            r#"
api:
  host: 127.0.0.1
  port: 0
  jwt:
    algorithm: RS256
    issuer: warden-test
    private_key_path: "{private}"
    public_key_path: "{public}"
  rate_limit:
    max_requests: 2
    window_secs: 60
  cors:
    allowed_origins: ["https://app.example.com"]
    allow_credentials: true

access:
  roles:
    - name: viewer
      description: Read-only access
      permissions: ["device.read"]
    - name: admin
      permissions: ["*"]
  users:
    - id: alice
      email: alice@example.com
      password_hash: "{hash}"
      roles: [viewer]
    - id: root
      roles: [admin]

logging:
  level: debug
  format: json
"#,
            private = KeyFixtures::private_key_path().display(),
            public = KeyFixtures::public_key_path().display(),
            hash = AccessFixtures::password_hash(),
        )
    }
}
