//! Configuration management for the coffee shop server.
//!
//! This module provides configuration loading with multiple sources:
//! 1. Default values (hardcoded)
//! 2. Configuration file (YAML)
//! 3. Environment variables (override)
//!
//! # Configuration Hierarchy
//!
//! Environment variables take precedence over config file values,
//! which take precedence over defaults.
//!
//! # Example
//!
//! ```ignore
//! use coffeeshop_server::config::ServerConfig;
//!
//! // Load from file with env overrides
//! let config = ServerConfig::load("config.yaml")?;
//!
//! // Or load from environment only
//! let config = ServerConfig::from_env()?;
//! ```

use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Prefix for environment variable overrides.
pub const ENV_PREFIX: &str = "COFFEESHOP";

/// Server configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct ServerConfig {
    /// Server settings
    #[serde(default)]
    pub server: ServerSettings,

    /// Storage settings
    #[serde(default)]
    pub storage: StorageSettings,

    /// Token verification settings
    #[serde(default)]
    pub auth: AuthSettings,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSettings,

    /// Metrics settings
    #[serde(default)]
    pub metrics: MetricsSettings,
}

/// Server network settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ServerSettings {
    /// Host to bind to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to listen on
    #[serde(default = "default_port")]
    pub port: u16,

    /// Maximum accepted request body size in bytes
    #[serde(default = "default_body_limit")]
    pub body_limit_bytes: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            body_limit_bytes: default_body_limit(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_body_limit() -> usize {
    1024 * 1024
}

/// Storage backend settings.
#[derive(Clone, Deserialize, Serialize, PartialEq)]
pub struct StorageSettings {
    /// Storage backend type: "memory", "postgres" or "sqlite"
    #[serde(default = "default_storage_backend")]
    pub backend: String,

    /// Database connection URL (required unless backend is "memory")
    pub database_url: Option<String>,

    /// Connection pool size
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_secs: u64,

    /// Per-query timeout in seconds
    #[serde(default = "default_query_timeout")]
    pub query_timeout_secs: u64,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: default_storage_backend(),
            database_url: None,
            pool_size: default_pool_size(),
            connection_timeout_secs: default_connection_timeout(),
            query_timeout_secs: default_query_timeout(),
        }
    }
}

// Custom Debug implementation to hide credentials in database_url
impl std::fmt::Debug for StorageSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageSettings")
            .field("backend", &self.backend)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[REDACTED]"),
            )
            .field("pool_size", &self.pool_size)
            .field("connection_timeout_secs", &self.connection_timeout_secs)
            .field("query_timeout_secs", &self.query_timeout_secs)
            .finish()
    }
}

fn default_storage_backend() -> String {
    "memory".to_string()
}

fn default_pool_size() -> u32 {
    10
}

fn default_connection_timeout() -> u64 {
    5
}

fn default_query_timeout() -> u64 {
    30
}

/// Bearer token verification settings.
///
/// Either an identity provider (`domain` or an explicit `jwks_uri`) or a
/// `shared_secret` must be configured. When both are present the identity
/// provider wins.
///
/// # Example YAML Configuration
///
/// ```yaml
/// auth:
///   domain: example.us.auth0.com
///   audience: coffee
/// ```
#[derive(Clone, Deserialize, Serialize, PartialEq)]
pub struct AuthSettings {
    /// Identity provider domain, e.g. `example.us.auth0.com`.
    ///
    /// Derives the JWKS location (`https://<domain>/.well-known/jwks.json`)
    /// and the default issuer (`https://<domain>/`).
    pub domain: Option<String>,

    /// Explicit JWKS URL, overriding the one derived from `domain`.
    pub jwks_uri: Option<String>,

    /// Expected `iss` claim. Defaults to `https://<domain>/` when a domain is set.
    pub issuer: Option<String>,

    /// Expected `aud` claim. Not checked when absent.
    pub audience: Option<String>,

    /// HS256 secret for local development and tests.
    pub shared_secret: Option<String>,

    /// Clock skew tolerance for `exp` in seconds
    #[serde(default = "default_leeway")]
    pub leeway_secs: u64,

    /// How long fetched signing keys are cached, in seconds
    #[serde(default = "default_jwks_cache_ttl")]
    pub jwks_cache_ttl_secs: u64,
}

impl Default for AuthSettings {
    fn default() -> Self {
        Self {
            domain: None,
            jwks_uri: None,
            issuer: None,
            audience: None,
            shared_secret: None,
            leeway_secs: default_leeway(),
            jwks_cache_ttl_secs: default_jwks_cache_ttl(),
        }
    }
}

impl std::fmt::Debug for AuthSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSettings")
            .field("domain", &self.domain)
            .field("jwks_uri", &self.jwks_uri)
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field(
                "shared_secret",
                &self.shared_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("leeway_secs", &self.leeway_secs)
            .field("jwks_cache_ttl_secs", &self.jwks_cache_ttl_secs)
            .finish()
    }
}

impl AuthSettings {
    /// Returns true if tokens can be verified against a JWKS endpoint.
    pub fn has_identity_provider(&self) -> bool {
        non_blank(&self.domain) || non_blank(&self.jwks_uri)
    }

    /// Returns true if a non-empty shared secret is configured.
    pub fn has_shared_secret(&self) -> bool {
        non_blank(&self.shared_secret)
    }
}

fn non_blank(value: &Option<String>) -> bool {
    value.as_deref().is_some_and(|s| !s.trim().is_empty())
}

fn default_leeway() -> u64 {
    60
}

fn default_jwks_cache_ttl() -> u64 {
    3600
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggingSettings {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Use JSON format (true for production, false for development)
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Metrics settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct MetricsSettings {
    /// Enable metrics endpoint
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Metrics endpoint path
    #[serde(default = "default_metrics_path")]
    pub path: String,
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            path: default_metrics_path(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_metrics_path() -> String {
    "/metrics".to_string()
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ConfigError),

    #[error("configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

/// Result type for configuration loading.
pub type ConfigResult<T> = Result<T, ConfigLoadError>;

impl ServerConfig {
    /// Load configuration from a YAML file with environment variable overrides.
    ///
    /// Environment variables are prefixed with `COFFEESHOP_` and use `__` as separator.
    /// For example:
    /// - `COFFEESHOP_SERVER__PORT=9090` overrides `server.port`
    /// - `COFFEESHOP_STORAGE__DATABASE_URL=...` overrides `storage.database_url`
    pub fn load<P: AsRef<Path>>(path: P) -> ConfigResult<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigLoadError::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let config = Config::builder()
            .add_source(Config::try_from(&ServerConfig::default())?)
            .add_source(File::from(path).format(FileFormat::Yaml))
            .add_source(env_source())
            .build()?;

        let server_config: ServerConfig = config.try_deserialize()?;
        server_config.validate()?;

        Ok(server_config)
    }

    /// Load configuration from environment variables only.
    ///
    /// Uses default values and allows overrides via COFFEESHOP_ prefixed env vars.
    pub fn from_env() -> ConfigResult<Self> {
        let config = Config::builder()
            .add_source(Config::try_from(&ServerConfig::default())?)
            .add_source(env_source())
            .build()?;

        let server_config: ServerConfig = config.try_deserialize()?;
        server_config.validate()?;

        Ok(server_config)
    }

    /// Address the HTTP listener binds to.
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Validate the configuration.
    ///
    /// Returns an error if the configuration is invalid.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.server.port == 0 {
            return Err(invalid("server.port must be greater than 0"));
        }

        if self.server.body_limit_bytes == 0 {
            return Err(invalid("server.body_limit_bytes must be greater than 0"));
        }

        let valid_backends = ["memory", "postgres", "sqlite"];
        if !valid_backends.contains(&self.storage.backend.as_str()) {
            return Err(invalid(format!(
                "storage.backend must be one of: {:?}, got: {}",
                valid_backends, self.storage.backend
            )));
        }

        // SQL backends require a non-empty database_url
        if self.storage.backend != "memory" && !non_blank(&self.storage.database_url) {
            return Err(invalid(format!(
                "storage.database_url is required when backend is '{}'",
                self.storage.backend
            )));
        }

        if self.storage.query_timeout_secs == 0 {
            return Err(invalid("storage.query_timeout_secs must be greater than 0"));
        }

        if !self.auth.has_identity_provider() && !self.auth.has_shared_secret() {
            return Err(invalid(
                "auth requires either auth.domain / auth.jwks_uri or auth.shared_secret",
            ));
        }

        if let Some(uri) = self.auth.jwks_uri.as_deref().filter(|s| !s.trim().is_empty()) {
            if url::Url::parse(uri).is_err() {
                return Err(invalid(format!("auth.jwks_uri is not a valid URL: {uri}")));
            }
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(invalid(format!(
                "logging.level must be one of: {:?}, got: {}",
                valid_levels, self.logging.level
            )));
        }

        if self.metrics.enabled && !self.metrics.path.starts_with('/') {
            return Err(invalid(format!(
                "metrics.path must start with '/', got: {}",
                self.metrics.path
            )));
        }

        if self.metrics.enabled && RESERVED_PATHS.contains(&self.metrics.path.as_str()) {
            return Err(invalid(format!(
                "metrics.path must not collide with an API route, got: {}",
                self.metrics.path
            )));
        }

        Ok(())
    }
}

/// Routes served by the API router; the metrics endpoint cannot reuse them.
const RESERVED_PATHS: &[&str] = &["/drinks", "/drinks-detail", "/health", "/ready"];

// Use __ as separator for nested keys: COFFEESHOP_SERVER__PORT -> server.port
fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
}

fn invalid(message: impl Into<String>) -> ConfigLoadError {
    ConfigLoadError::Invalid {
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn config_with_secret() -> ServerConfig {
        let mut config = ServerConfig::default();
        config.auth.shared_secret = Some("dev-secret".to_string());
        config
    }

    #[test]
    #[serial]
    fn test_can_load_config_from_yaml_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
server:
  host: "127.0.0.1"
  port: 9090
  body_limit_bytes: 4096

storage:
  backend: sqlite
  database_url: "sqlite://drinks.db"
  pool_size: 2

auth:
  domain: coffee.example.com
  audience: coffee

logging:
  level: debug
  json: true

metrics:
  path: /custom-metrics
"#
        )
        .unwrap();

        let config = ServerConfig::load(file.path()).unwrap();

        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.server.body_limit_bytes, 4096);
        assert_eq!(config.storage.backend, "sqlite");
        assert_eq!(
            config.storage.database_url.as_deref(),
            Some("sqlite://drinks.db")
        );
        assert_eq!(config.storage.pool_size, 2);
        assert_eq!(config.storage.query_timeout_secs, 30);
        assert_eq!(config.auth.domain.as_deref(), Some("coffee.example.com"));
        assert_eq!(config.auth.audience.as_deref(), Some("coffee"));
        assert_eq!(config.auth.leeway_secs, 60);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
        assert!(config.metrics.enabled);
        assert_eq!(config.metrics.path, "/custom-metrics");
        assert_eq!(config.bind_address(), "127.0.0.1:9090");
    }

    #[test]
    #[serial]
    fn test_can_override_config_with_env_vars() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
server:
  host: "127.0.0.1"
  port: 8080

auth:
  shared_secret: from-file
"#
        )
        .unwrap();

        std::env::set_var("COFFEESHOP_SERVER__PORT", "9999");
        std::env::set_var("COFFEESHOP_LOGGING__LEVEL", "warn");
        std::env::set_var("COFFEESHOP_AUTH__SHARED_SECRET", "from-env");

        let config = ServerConfig::load(file.path());

        std::env::remove_var("COFFEESHOP_SERVER__PORT");
        std::env::remove_var("COFFEESHOP_LOGGING__LEVEL");
        std::env::remove_var("COFFEESHOP_AUTH__SHARED_SECRET");

        let config = config.unwrap();
        assert_eq!(config.server.port, 9999);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.logging.level, "warn");
        assert_eq!(config.auth.shared_secret.as_deref(), Some("from-env"));
    }

    #[test]
    #[serial]
    fn test_from_env_loads_defaults_with_env_overrides() {
        std::env::set_var("COFFEESHOP_SERVER__HOST", "192.168.1.1");
        std::env::set_var("COFFEESHOP_AUTH__DOMAIN", "coffee.example.com");

        let config = ServerConfig::from_env();

        std::env::remove_var("COFFEESHOP_SERVER__HOST");
        std::env::remove_var("COFFEESHOP_AUTH__DOMAIN");

        let config = config.unwrap();
        assert_eq!(config.server.host, "192.168.1.1");
        assert_eq!(config.server.port, 8080);
        assert!(config.auth.has_identity_provider());
    }

    #[test]
    #[serial]
    fn test_from_env_without_auth_is_rejected() {
        let err = ServerConfig::from_env().unwrap_err();
        assert!(err.to_string().contains("auth"));
    }

    #[test]
    fn test_config_validation_catches_errors() {
        let mut config = config_with_secret();
        config.storage.backend = "mysql".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("storage.backend"));

        for backend in ["postgres", "sqlite"] {
            for url in [None, Some(""), Some("   ")] {
                let mut config = config_with_secret();
                config.storage.backend = backend.to_string();
                config.storage.database_url = url.map(str::to_string);
                let err = config.validate().unwrap_err();
                assert!(
                    err.to_string().contains("database_url"),
                    "Error for '{backend}' should contain 'database_url'"
                );
            }
        }

        let mut config = config_with_secret();
        config.logging.level = "verbose".to_string();
        assert!(config
            .validate()
            .unwrap_err()
            .to_string()
            .contains("logging.level"));

        let mut config = config_with_secret();
        config.server.port = 0;
        assert!(config.validate().unwrap_err().to_string().contains("port"));

        let mut config = config_with_secret();
        config.metrics.path = "metrics".to_string();
        assert!(config
            .validate()
            .unwrap_err()
            .to_string()
            .contains("metrics.path"));

        for path in ["/drinks", "/drinks-detail", "/health", "/ready"] {
            let mut config = config_with_secret();
            config.metrics.path = path.to_string();
            let err = config.validate().unwrap_err();
            assert!(matches!(err, ConfigLoadError::Invalid { .. }));
            assert!(err.to_string().contains("metrics.path"), "{path}");
        }

        let mut config = config_with_secret();
        config.metrics.enabled = false;
        config.metrics.path = "/drinks".to_string();
        assert!(config.validate().is_ok());

        let mut config = config_with_secret();
        config.auth.jwks_uri = Some("not a url".to_string());
        assert!(config
            .validate()
            .unwrap_err()
            .to_string()
            .contains("jwks_uri"));

        let mut config = config_with_secret();
        config.auth.shared_secret = Some("  ".to_string());
        assert!(config.validate().unwrap_err().to_string().contains("auth"));
    }

    #[test]
    fn test_invalid_config_returns_clear_error() {
        let result = ServerConfig::load("/nonexistent/path/config.yaml");
        let err = result.unwrap_err();
        assert!(matches!(err, ConfigLoadError::FileNotFound { .. }));
        assert!(err.to_string().contains("not found"));

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "invalid: yaml: syntax: [").unwrap();
        let err = ServerConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigLoadError::Load(_)));
    }

    #[test]
    fn test_default_values() {
        let config = ServerConfig::default();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.server.body_limit_bytes, 1024 * 1024);
        assert_eq!(config.storage.backend, "memory");
        assert_eq!(config.storage.query_timeout_secs, 30);
        assert_eq!(config.auth.jwks_cache_ttl_secs, 3600);
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json);
        assert!(config.metrics.enabled);

        // Defaults carry no signing authority.
        assert!(config.validate().is_err());
        assert!(config_with_secret().validate().is_ok());
    }

    #[test]
    fn test_debug_output_redacts_secrets() {
        let mut config = config_with_secret();
        config.storage.database_url = Some("postgres://admin:hunter2@db/coffee".to_string());

        let debug = format!("{config:?}");
        assert!(!debug.contains("hunter2"));
        assert!(!debug.contains("dev-secret"));
        assert!(debug.contains("[REDACTED]"));
    }
}
