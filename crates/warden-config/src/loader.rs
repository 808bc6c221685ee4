// SPDX-License-Identifier: PolyForm-Noncommercial-1.0.0
// Copyright (c) 2025 Sylvex. All rights reserved.

//! Reading a [`WardenConfig`] from disk or a string.
//!
//! Loading a file goes:
//!
//! 1. read it; the extension picks YAML, TOML or JSON
//! 2. replace `${NAME}` and `${NAME:default}` with variable values
//! 3. decode
//! 4. apply `WARDEN_*` overrides (see [`OVERRIDES`])
//! 5. make relative key paths relative to the file's directory
//! 6. [`WardenConfig::validate`]
//!
//! Variables come from [`ConfigLoader::with_var`] first, then the process
//! environment.

use std::collections::HashMap;
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::error::{ConfigError, ConfigResult};
use crate::schema::WardenConfig;

/// Prefix of override variables, as in `WARDEN_API_PORT`.
pub const DEFAULT_ENV_PREFIX: &str = "WARDEN";

type Apply = fn(&mut WardenConfig, &str) -> Result<(), String>;

/// Settings that can be replaced from the environment, by variable suffix.
pub const OVERRIDES: &[(&str, Apply)] = &[
    ("API_HOST", |c, v| assign(&mut c.api.host, v)),
    ("API_PORT", |c, v| assign(&mut c.api.port, v)),
    ("JWT_ISSUER", |c, v| assign(&mut c.api.jwt.issuer, v)),
    ("RATE_LIMIT_ENABLED", |c, v| {
        c.api.rate_limit.enabled = parse_switch(v)?;
        Ok(())
    }),
    ("RATE_LIMIT_MAX_REQUESTS", |c, v| {
        assign(&mut c.api.rate_limit.max_requests, v)
    }),
    ("RATE_LIMIT_WINDOW_SECS", |c, v| {
        assign(&mut c.api.rate_limit.window_secs, v)
    }),
    ("LOG_LEVEL", |c, v| assign(&mut c.logging.level, v)),
];

fn assign<T>(slot: &mut T, raw: &str) -> Result<(), String>
where
    T: FromStr,
    T::Err: Display,
{
    *slot = raw.trim().parse().map_err(|e: T::Err| e.to_string())?;
    Ok(())
}

fn parse_switch(raw: &str) -> Result<bool, String> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        other => Err(format!("expected a boolean, got '{other}'")),
    }
}

/// Loads and validates configuration.
///
/// ```no_run
/// use warden_config::loader::ConfigLoader;
///
/// let config = ConfigLoader::new()
///     .with_var("WARDEN_API_PORT", "9443")
///     .load("warden.yaml")
///     .unwrap();
/// assert_eq!(config.api.port, 9443);
/// ```
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    prefix: String,
    substitute: bool,
    base_dir: Option<PathBuf>,
    vars: HashMap<String, String>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// `WARDEN_` overrides, substitution on, no extra variables.
    pub fn new() -> Self {
        Self {
            prefix: DEFAULT_ENV_PREFIX.to_string(),
            substitute: true,
            base_dir: None,
            vars: HashMap::new(),
        }
    }

    /// Starts a [`ConfigLoaderBuilder`].
    pub fn builder() -> ConfigLoaderBuilder {
        ConfigLoaderBuilder::default()
    }

    /// Defines `name`, shadowing the process environment.
    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.vars.insert(name.into(), value.into());
        self
    }

    /// Reads overrides from `{prefix}_API_PORT` and so on.
    pub fn with_env_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = prefix.into();
        self
    }

    /// Turns placeholder substitution and overrides on or off.
    pub fn with_env_vars(mut self, enabled: bool) -> Self {
        self.substitute = enabled;
        self
    }

    /// Directory relative key paths are resolved against. Defaults to the
    /// config file's directory; strings are only resolved when this is set.
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// Loads `path`, choosing the format by extension.
    pub fn load(&self, path: impl AsRef<Path>) -> ConfigResult<WardenConfig> {
        let path = path.as_ref();
        info!(path = %path.display(), "Loading configuration");

        let format = ConfigFormat::from_path(path)?;
        if !path.is_file() {
            return Err(ConfigError::file_not_found(path));
        }
        let text = fs::read_to_string(path).map_err(|e| ConfigError::io(path, e))?;

        let file_dir = path.parent().unwrap_or(Path::new("."));
        let base = self.base_dir.as_deref().unwrap_or(file_dir);

        let config = self
            .decode(&text, format, Some(base))
            .map_err(|e| e.in_file(path))?;
        debug!(
            roles = config.access.roles.len(),
            users = config.access.users.len(),
            "Configuration loaded"
        );
        Ok(config)
    }

    /// Loads from `text` in the given format.
    pub fn load_from_str(&self, text: &str, format: ConfigFormat) -> ConfigResult<WardenConfig> {
        self.decode(text, format, self.base_dir.as_deref())
    }

    fn decode(
        &self,
        text: &str,
        format: ConfigFormat,
        base: Option<&Path>,
    ) -> ConfigResult<WardenConfig> {
        let mut config: WardenConfig = if self.substitute {
            format.decode(&self.substitute_vars(text)?)?
        } else {
            format.decode(text)?
        };

        if self.substitute {
            self.apply_overrides(&mut config)?;
        }
        if let Some(base) = base {
            config.api.jwt.resolve_paths(base);
        }

        config.validate()?;
        Ok(config)
    }

    fn var(&self, name: &str) -> Option<String> {
        match self.vars.get(name) {
            Some(value) => Some(value.clone()),
            None => std::env::var(name).ok(),
        }
    }

    /// Replaces `${NAME}` and `${NAME:default}`. An unterminated `${` is
    /// left as written; a missing variable without a default is an error.
    fn substitute_vars(&self, text: &str) -> ConfigResult<String> {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(open) = rest.find("${") {
            out.push_str(&rest[..open]);
            let body = &rest[open + 2..];
            let Some(close) = body.find('}') else {
                out.push_str(&rest[open..]);
                return Ok(out);
            };

            let placeholder = &body[..close];
            let (name, default) = match placeholder.split_once(':') {
                Some((name, default)) => (name, Some(default)),
                None => (placeholder, None),
            };
            match self.var(name) {
                Some(value) => out.push_str(&value),
                None => out.push_str(default.ok_or_else(|| ConfigError::env_var_not_found(name))?),
            }

            rest = &body[close + 1..];
        }

        out.push_str(rest);
        Ok(out)
    }

    fn apply_overrides(&self, config: &mut WardenConfig) -> ConfigResult<()> {
        for (suffix, apply) in OVERRIDES {
            let name = format!("{}_{suffix}", self.prefix);
            if let Some(raw) = self.var(&name) {
                debug!(variable = %name, "Applying override");
                apply(config, &raw).map_err(|e| ConfigError::invalid_env_var(name, e))?;
            }
        }
        Ok(())
    }
}

/// Collects loader options, for call sites that set several at once.
#[derive(Debug, Default)]
pub struct ConfigLoaderBuilder {
    loader: Option<ConfigLoader>,
}

impl ConfigLoaderBuilder {
    fn map(self, f: impl FnOnce(ConfigLoader) -> ConfigLoader) -> Self {
        Self {
            loader: Some(f(self.loader.unwrap_or_default())),
        }
    }

    /// See [`ConfigLoader::with_var`].
    pub fn var(self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.map(|l| l.with_var(name, value))
    }

    /// See [`ConfigLoader::with_env_prefix`].
    pub fn env_prefix(self, prefix: impl Into<String>) -> Self {
        self.map(|l| l.with_env_prefix(prefix))
    }

    /// See [`ConfigLoader::with_base_dir`].
    pub fn base_dir(self, dir: impl Into<PathBuf>) -> Self {
        self.map(|l| l.with_base_dir(dir))
    }

    /// The configured loader.
    pub fn build(self) -> ConfigLoader {
        self.loader.unwrap_or_default()
    }
}

/// Document syntax.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// `.yaml` or `.yml`
    Yaml,
    /// `.toml`
    Toml,
    /// `.json`
    Json,
}

impl ConfigFormat {
    /// Picks the format from the extension, ignoring case.
    pub fn from_path(path: &Path) -> ConfigResult<Self> {
        let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
            return Err(ConfigError::unsupported_format("(no extension)"));
        };
        match ext.to_ascii_lowercase().as_str() {
            "yaml" | "yml" => Ok(Self::Yaml),
            "toml" => Ok(Self::Toml),
            "json" => Ok(Self::Json),
            _ => Err(ConfigError::unsupported_format(ext)),
        }
    }

    /// Canonical extension.
    pub fn extension(self) -> &'static str {
        match self {
            Self::Yaml => "yaml",
            Self::Toml => "toml",
            Self::Json => "json",
        }
    }

    fn decode<T: DeserializeOwned>(self, text: &str) -> ConfigResult<T> {
        let decoded = match self {
            Self::Yaml => config::Config::builder()
                .add_source(config::File::from_str(text, config::FileFormat::Yaml))
                .build()
                .and_then(|c| c.try_deserialize())
                .map_err(|e| e.to_string()),
            Self::Toml => toml::from_str(text).map_err(|e| e.to_string()),
            Self::Json => serde_json::from_str(text).map_err(|e| e.to_string()),
        };
        decoded.map_err(ConfigError::serialization)
    }
}

/// [`ConfigLoader::load`] with defaults.
pub fn load_config(path: impl AsRef<Path>) -> ConfigResult<WardenConfig> {
    ConfigLoader::new().load(path)
}

/// [`ConfigLoader::load_from_str`] with defaults.
pub fn load_config_str(text: &str, format: ConfigFormat) -> ConfigResult<WardenConfig> {
    ConfigLoader::new().load_from_str(text, format)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::LogLevel;
    use std::net::Ipv4Addr;
    use tempfile::TempDir;

    const SECRET: &str = "a-test-secret-that-is-at-least-32-bytes-long";

    fn yaml() -> String {
        format!(
            r#"
api:
  port: 8181
  jwt:
    algorithm: HS256
    secret: "{SECRET}"
access:
  roles:
    - name: viewer
      permissions: ["device.read"]
  users:
    - id: alice
      roles: [viewer]
"#
        )
    }

    fn file(dir: &TempDir, name: &str, text: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, text).unwrap();
        path
    }

    #[test]
    fn test_load_yaml() {
        let dir = TempDir::new().unwrap();
        let config = load_config(file(&dir, "warden.yaml", &yaml())).unwrap();
        assert_eq!(config.api.port, 8181);
        assert_eq!(config.access.users[0].roles, ["viewer"]);
        assert_eq!(config.api.rate_limit.max_requests, 60);
    }

    #[test]
    fn test_load_toml_and_json_strings() {
        let toml = format!(
            "[api]\nport = 9000\n\n[api.jwt]\nalgorithm = \"HS256\"\nsecret = \"{SECRET}\"\n\n[[access.roles]]\nname = \"admin\"\npermissions = [\"*\"]\n"
        );
        let config = load_config_str(&toml, ConfigFormat::Toml).unwrap();
        assert_eq!(config.api.port, 9000);
        assert_eq!(config.access.roles[0].permissions, ["*"]);

        let json = serde_json::json!({ "api": { "jwt": { "algorithm": "HS256", "secret": SECRET } } });
        let config = load_config_str(&json.to_string(), ConfigFormat::Json).unwrap();
        assert_eq!(config.api.port, 8080);
    }

    #[test]
    fn test_file_errors() {
        let err = load_config("/nonexistent/warden.yaml").unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound { .. }));

        let dir = TempDir::new().unwrap();
        let path = file(&dir, "broken.json", "{ not json");
        let err = load_config(&path).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { path: ref p, .. } if p == &path));
    }

    #[test]
    fn test_format_from_path() {
        assert_eq!(ConfigFormat::from_path(Path::new("a.YML")).unwrap(), ConfigFormat::Yaml);
        assert_eq!(ConfigFormat::from_path(Path::new("a.toml")).unwrap().extension(), "toml");
        assert!(matches!(
            ConfigFormat::from_path(Path::new("a.ini")),
            Err(ConfigError::UnsupportedFormat { ref format }) if format == "ini"
        ));
        let err = ConfigFormat::from_path(Path::new("warden")).unwrap_err();
        assert!(err.to_string().contains("no extension"));
    }

    #[test]
    fn test_substitution() {
        let loader = ConfigLoader::new().with_var("WARDEN_TEST_PORT", "7000");
        let sub = |text: &str| loader.substitute_vars(text);

        assert_eq!(sub("port: ${WARDEN_TEST_PORT}").unwrap(), "port: 7000");
        assert_eq!(sub("a ${WARDEN_TEST_PORT} b ${WARDEN_TEST_PORT}").unwrap(), "a 7000 b 7000");
        assert_eq!(
            sub("host: ${WARDEN_TEST_UNSET_HOST:127.0.0.1}").unwrap(),
            "host: 127.0.0.1"
        );
        assert_eq!(sub("empty: ${WARDEN_TEST_UNSET_HOST:}").unwrap(), "empty: ");
        assert_eq!(sub("text ${unclosed").unwrap(), "text ${unclosed");
        assert_eq!(sub("cost: $5").unwrap(), "cost: $5");

        let err = sub("secret: ${WARDEN_TEST_DEFINITELY_UNSET}").unwrap_err();
        assert!(matches!(err, ConfigError::EnvVarNotFound { ref name } if name == "WARDEN_TEST_DEFINITELY_UNSET"));
    }

    #[test]
    fn test_substitution_can_be_disabled() {
        let text = yaml().replace("8181", "${WARDEN_TEST_DEFINITELY_UNSET:8181}");
        let config = ConfigLoader::new().load_from_str(&text, ConfigFormat::Yaml).unwrap();
        assert_eq!(config.api.port, 8181);

        let err = ConfigLoader::new()
            .with_env_vars(false)
            .load_from_str(&text, ConfigFormat::Yaml)
            .unwrap_err();
        assert!(matches!(err, ConfigError::Serialization { .. }));
    }

    #[test]
    fn test_overrides() {
        let config = ConfigLoader::builder()
            .var("WARDEN_API_HOST", "127.0.0.1")
            .var("WARDEN_API_PORT", " 9443 ")
            .var("WARDEN_JWT_ISSUER", "auth.example.com")
            .var("WARDEN_RATE_LIMIT_MAX_REQUESTS", "2")
            .var("WARDEN_RATE_LIMIT_WINDOW_SECS", "30")
            .var("WARDEN_RATE_LIMIT_ENABLED", "off")
            .var("WARDEN_LOG_LEVEL", "warning")
            .build()
            .load_from_str(&yaml(), ConfigFormat::Yaml)
            .unwrap();

        assert_eq!(config.api.host, Ipv4Addr::LOCALHOST);
        assert_eq!(config.api.port, 9443);
        assert_eq!(config.api.jwt.issuer, "auth.example.com");
        assert_eq!(config.api.rate_limit.max_requests, 2);
        assert_eq!(config.api.rate_limit.window_secs, 30);
        assert!(!config.api.rate_limit.enabled);
        assert_eq!(config.logging.level, LogLevel::Warn);
    }

    #[test]
    fn test_bad_overrides_name_the_variable() {
        for (name, value) in [
            ("WARDEN_API_PORT", "not-a-port"),
            ("WARDEN_RATE_LIMIT_ENABLED", "maybe"),
        ] {
            let err = ConfigLoader::new()
                .with_var(name, value)
                .load_from_str(&yaml(), ConfigFormat::Yaml)
                .unwrap_err();
            assert!(
                matches!(err, ConfigError::InvalidEnvVar { name: ref n, .. } if n == name),
                "{name}"
            );
        }
    }

    #[test]
    fn test_custom_prefix() {
        let config = ConfigLoader::builder()
            .env_prefix("GATE")
            .var("GATE_API_PORT", "7001")
            .var("WARDEN_API_PORT", "7002")
            .build()
            .load_from_str(&yaml(), ConfigFormat::Yaml)
            .unwrap();
        assert_eq!(config.api.port, 7001);
    }

    #[test]
    fn test_relative_key_paths() {
        let dir = TempDir::new().unwrap();
        let text = "api:\n  jwt:\n    private_key_path: keys/private.pem\n    public_key_path: /etc/warden/public.pem\n";
        let path = file(&dir, "warden.yml", text);

        let config = load_config(&path).unwrap();
        assert_eq!(
            config.api.jwt.private_key_path,
            Some(dir.path().join("keys/private.pem"))
        );
        assert_eq!(
            config.api.jwt.public_key_path,
            Some(PathBuf::from("/etc/warden/public.pem"))
        );

        let config = ConfigLoader::builder()
            .base_dir("/srv/warden")
            .build()
            .load_from_str(text, ConfigFormat::Yaml)
            .unwrap();
        assert_eq!(
            config.api.jwt.private_key_path,
            Some(PathBuf::from("/srv/warden/keys/private.pem"))
        );
    }

    #[test]
    fn test_validation_runs_on_load() {
        let text = yaml().replace("roles: [viewer]", "roles: [ghost]");
        let err = load_config_str(&text, ConfigFormat::Yaml).unwrap_err();
        assert!(matches!(err, ConfigError::UndefinedRole { .. }));
    }
}
