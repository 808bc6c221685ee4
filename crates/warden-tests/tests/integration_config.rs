// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! # Configuration Integration Tests
//!
//! Loading configuration files and serving from them end to end.
//!
//! ## Test Categories
//!
//! - `test_load_*`: File formats and environment handling
//! - `test_validate_*`: Access definition errors
//! - `test_serve_*`: A gateway assembled from a loaded file

use std::fs;
use std::path::{Path, PathBuf};

use serde_json::json;
use warden_config::{
    ConfigError, ConfigFormat, ConfigLoader, LogFormat, LogLevel, WardenConfig, load_config,
};
use warden_tests::common::temp_test_dir;
use warden_tests::prelude::*;

fn write(dir: &Path, name: &str, content: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, content).unwrap();
    path
}

/// YAML with the fixture keys and the given `access` section.
fn yaml_with_access(access: &str) -> String {
    format!(
        r#"
api:
  jwt:
    private_key_path: "{private}"
    public_key_path: "{public}"
access:
{access}
"#,
        private = KeyFixtures::private_key_path().display(),
        public = KeyFixtures::public_key_path().display(),
    )
}

// =============================================================================
// Loading
// =============================================================================

#[test]
fn test_load_yaml_fixture() {
    let dir = temp_test_dir("warden-config");
    let path = write(dir.path(), "warden.yaml", &ConfigFixtures::yaml());

    let config = load_config(&path).unwrap();
    assert_eq!(config.api.port, 0);
    assert_eq!(config.api.jwt.issuer, "warden-test");
    assert_eq!(config.api.rate_limit.max_requests, 2);
    assert_eq!(config.api.rate_limit.window_secs, 60);
    assert!(config.api.cors.allow_credentials);
    assert_eq!(config.access.roles.len(), 2);
    assert_eq!(config.access.users.len(), 2);
    assert_eq!(config.logging.level, LogLevel::Debug);
    assert_eq!(config.logging.format, LogFormat::Json);

    let directory = config.build_directory().unwrap();
    assert_eq!(directory.user_count(), 2);
    assert!(directory.user("root").is_some());
}

#[test]
fn test_load_toml_with_relative_key_paths() {
    let dir = temp_test_dir("warden-config");
    fs::copy(KeyFixtures::private_key_path(), dir.path().join("private.pem")).unwrap();
    fs::copy(KeyFixtures::public_key_path(), dir.path().join("public.pem")).unwrap();

    let path = write(
        dir.path(),
        "warden.toml",
        r#"
[api]
port = 9090

[api.jwt]
private_key_path = "private.pem"
public_key_path = "public.pem"

[[access.roles]]
name = "viewer"
permissions = ["device.read"]

[[access.users]]
id = "alice"
roles = ["viewer"]
"#,
    );

    let config = ConfigLoader::new().load(&path).unwrap();
    assert_eq!(config.api.port, 9090);
    assert_eq!(
        config.api.jwt.private_key_path.as_deref(),
        Some(dir.path().join("private.pem").as_path())
    );

    // Relative paths were resolved against the file's directory.
    warden_api::auth::JwtService::new(config.api.jwt.clone()).unwrap();
}

#[test]
fn test_load_json_with_inline_keys() {
    let content = json!({
        "api": {
            "jwt": {
                "private_key_pem": KeyFixtures::private_pem(),
                "public_key_pem": KeyFixtures::public_pem(),
                "access_ttl_secs": 300
            }
        },
        "access": {
            "roles": [{ "name": "admin", "permissions": ["*"] }],
            "users": [{ "id": "root", "roles": ["admin"] }]
        }
    })
    .to_string();

    let config = ConfigLoader::new()
        .load_from_str(&content, ConfigFormat::Json)
        .unwrap();
    assert_eq!(config.api.jwt.access_ttl_secs, 300);
    assert_eq!(config.access.users[0].id, "root");
}

#[test]
fn test_load_placeholders_and_overrides() {
    let dir = temp_test_dir("warden-config");
    let content = format!(
        "{}\nlogging:\n  level: ${{WARDEN_TEST_LEVEL:info}}\n",
        yaml_with_access("  roles: []")
    )
    .replace("jwt:\n", "jwt:\n    issuer: ${ISSUER_NAME}\n");
    let path = write(dir.path(), "warden.yaml", &content);

    let config = ConfigLoader::builder()
        .var("ISSUER_NAME", "edge")
        .var("WARDEN_API_PORT", "7000")
        .var("WARDEN_RATE_LIMIT_MAX_REQUESTS", "5")
        .var("WARDEN_RATE_LIMIT_ENABLED", "false")
        .build()
        .load(&path)
        .unwrap();

    assert_eq!(config.api.jwt.issuer, "edge");
    assert_eq!(config.logging.level, LogLevel::Info);
    assert_eq!(config.api.port, 7000);
    assert_eq!(config.api.rate_limit.max_requests, 5);
    assert!(!config.api.rate_limit.enabled);
}

#[test]
fn test_load_missing_placeholder_and_bad_override() {
    let dir = temp_test_dir("warden-config");
    let content = yaml_with_access("  roles: []")
        .replace("jwt:\n", "jwt:\n    issuer: ${UNSET_WARDEN_ISSUER}\n");
    let path = write(dir.path(), "warden.yaml", &content);

    let err = ConfigLoader::new().load(&path).unwrap_err();
    assert!(matches!(err, ConfigError::EnvVarNotFound { ref name } if name == "UNSET_WARDEN_ISSUER"));

    let path = write(dir.path(), "plain.yaml", &yaml_with_access("  roles: []"));
    let err = ConfigLoader::new()
        .with_var("WARDEN_API_PORT", "not-a-port")
        .load(&path)
        .unwrap_err();
    assert!(matches!(err, ConfigError::InvalidEnvVar { .. }));
}

#[test]
fn test_load_missing_file_and_unknown_extension() {
    let dir = temp_test_dir("warden-config");

    let err = load_config(dir.path().join("absent.yaml")).unwrap_err();
    assert!(matches!(err, ConfigError::FileNotFound { .. }));

    let path = write(dir.path(), "warden.ini", "[api]");
    let err = load_config(&path).unwrap_err();
    assert!(matches!(err, ConfigError::UnsupportedFormat { .. }));
}

// =============================================================================
// Validation
// =============================================================================

#[test]
fn test_validate_undefined_role() {
    let content = yaml_with_access(
        "  roles:\n    - name: viewer\n      permissions: [device.read]\n  users:\n    - id: alice\n      roles: [viewer, ghost]",
    );
    let err = ConfigLoader::new()
        .load_from_str(&content, ConfigFormat::Yaml)
        .unwrap_err();
    assert!(matches!(
        err,
        ConfigError::UndefinedRole { ref user, ref role } if user == "alice" && role == "ghost"
    ));
}

#[test]
fn test_validate_duplicates() {
    let roles = yaml_with_access(
        "  roles:\n    - name: viewer\n      permissions: []\n    - name: viewer\n      permissions: []",
    );
    let err = ConfigLoader::new()
        .load_from_str(&roles, ConfigFormat::Yaml)
        .unwrap_err();
    assert!(matches!(err, ConfigError::Duplicate { kind: "role", .. }));

    let users = yaml_with_access("  users:\n    - id: alice\n    - id: alice");
    let err = ConfigLoader::new()
        .load_from_str(&users, ConfigFormat::Yaml)
        .unwrap_err();
    assert!(matches!(err, ConfigError::Duplicate { kind: "user", .. }));
}

#[test]
fn test_validate_bad_permission_and_rate_limit() {
    let content = yaml_with_access(
        "  roles:\n    - name: broken\n      permissions: [\"Device..Read\"]",
    );
    let err = ConfigLoader::new()
        .load_from_str(&content, ConfigFormat::Yaml)
        .unwrap_err();
    match err {
        ConfigError::Validation { field, .. } => {
            assert_eq!(field, "access.roles.broken.permissions")
        }
        other => panic!("unexpected error: {other}"),
    }

    let mut config = WardenConfig::default();
    config.api = ConfigFixtures::api_config();
    config.api.rate_limit.max_requests = 0;
    assert!(matches!(
        config.validate(),
        Err(ConfigError::Validation { .. })
    ));
}

// =============================================================================
// Serving
// =============================================================================

#[tokio::test]
async fn test_serve_from_loaded_file() {
    let dir = temp_test_dir("warden-config");
    let path = write(dir.path(), "warden.yaml", &ConfigFixtures::yaml());
    let config = load_config(&path).unwrap();
    let directory = config.build_directory().unwrap();

    let gateway = TestGateway::with_directory(config.api.clone(), directory);

    let pair = gateway.login("alice", AccessFixtures::PASSWORD).await;
    let claims = gateway
        .state()
        .jwt()
        .validate_access_token(&pair.access_token)
        .unwrap();
    assert_eq!(claims.issuer(), "warden-test");

    // root has no password configured.
    gateway
        .post_json(
            "/api/v1/auth/login",
            None,
            json!({ "login": "root", "password": "anything" }),
        )
        .await
        .assert_status(StatusCode::UNAUTHORIZED);

    // Login consumed one of two requests for this peer; /me is keyed by user.
    gateway
        .get("/api/v1/auth/me", Some(&pair.access_token))
        .await
        .assert_status(StatusCode::OK)
        .assert_header("x-ratelimit-limit", "2");
    gateway
        .get("/health", None)
        .await
        .assert_status(StatusCode::TOO_MANY_REQUESTS);
}

#[tokio::test]
async fn test_serve_cors_from_loaded_file() {
    let dir = temp_test_dir("warden-config");
    let path = write(dir.path(), "warden.yaml", &ConfigFixtures::yaml());
    let config = load_config(&path).unwrap();
    let gateway = TestGateway::with_directory(config.api.clone(), config.build_directory().unwrap());

    let req = axum::http::Request::builder()
        .method(axum::http::Method::OPTIONS)
        .uri("/api/v1/auth/login")
        .header("origin", "https://app.example.com")
        .header("access-control-request-method", "POST")
        .body(axum::body::Body::empty())
        .unwrap();

    gateway
        .send(req)
        .await
        .assert_status(StatusCode::OK)
        .assert_header("access-control-allow-origin", "https://app.example.com")
        .assert_header("access-control-allow-credentials", "true");
}
