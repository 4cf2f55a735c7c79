// crates/remediation-config/src/config.rs
// ============================================================================
// Module: Remediation Engine Configuration
// Description: Configuration loading and validation for the remediation engine.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: remediation-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! Every section is optional and defaults to a loopback-only development
//! setup; anything present is validated and rejected when out of range.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;

use remediation_store_sqlite::DatabaseConfig;
use serde::Deserialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "remediation-engine.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "REMEDIATION_CONFIG";
/// Maximum configuration file size in bytes.
const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Default bind address.
const DEFAULT_BIND: &str = "127.0.0.1:8080";
/// Default request body limit.
const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;
/// Upper bound for the request body limit.
const MAX_BODY_BYTES_LIMIT: usize = 16 * 1024 * 1024;
/// Default database filename.
const DEFAULT_DATABASE_PATH: &str = "remediation-engine.db";
/// Default access token lifetime.
const DEFAULT_TOKEN_TTL_SECS: u64 = 60 * 60;
/// Upper bound for the access token lifetime.
const MAX_TOKEN_TTL_SECS: u64 = 30 * 24 * 60 * 60;
/// Default environment variable holding the sealing key.
const DEFAULT_SECRET_KEY_ENV: &str = "REMEDIATION_SECRET_KEY";
/// Accepted log levels.
const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

// ============================================================================
// SECTION: Config
// ============================================================================

/// Remediation engine configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RemediationConfig {
    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,
    /// Database settings.
    #[serde(default = "default_database")]
    pub database: DatabaseConfig,
    /// Authentication settings.
    #[serde(default)]
    pub auth: AuthConfig,
    /// Secret sealing settings.
    #[serde(default)]
    pub secrets: SecretsConfig,
    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for RemediationConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            database: default_database(),
            auth: AuthConfig::default(),
            secrets: SecretsConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl RemediationConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// Resolution order: explicit `path`, then `REMEDIATION_CONFIG`, then
    /// `remediation-engine.toml` in the working directory.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml_str(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.server.validate()?;
        validate_database(&self.database)?;
        self.auth.validate()?;
        self.secrets.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServerConfig {
    /// Socket address to bind.
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Maximum request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: default_bind(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl ServerConfig {
    /// Returns the parsed bind address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] when the address does not parse.
    pub fn bind_addr(&self) -> Result<SocketAddr, ConfigError> {
        self.bind
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid("invalid bind address".to_string()))
    }

    /// Validates server configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        self.bind_addr()?;
        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid(
                "max_body_bytes must be greater than zero".to_string(),
            ));
        }
        if self.max_body_bytes > MAX_BODY_BYTES_LIMIT {
            return Err(ConfigError::Invalid(format!(
                "max_body_bytes must not exceed {MAX_BODY_BYTES_LIMIT}"
            )));
        }
        Ok(())
    }
}

/// Authentication configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AuthConfig {
    /// Lifetime of issued access tokens in seconds.
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            token_ttl_secs: default_token_ttl_secs(),
        }
    }
}

impl AuthConfig {
    /// Validates authentication configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.token_ttl_secs == 0 || self.token_ttl_secs > MAX_TOKEN_TTL_SECS {
            return Err(ConfigError::Invalid(format!(
                "auth.token_ttl_secs must be between 1 and {MAX_TOKEN_TTL_SECS}"
            )));
        }
        Ok(())
    }
}

/// Secret sealing configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SecretsConfig {
    /// Environment variable holding the base64 sealing key.
    #[serde(default = "default_secret_key_env")]
    pub key_env: String,
}

impl Default for SecretsConfig {
    fn default() -> Self {
        Self {
            key_env: default_secret_key_env(),
        }
    }
}

impl SecretsConfig {
    /// Reads the sealing key from the configured environment variable.
    #[must_use]
    pub fn read_key(&self) -> Option<String> {
        env::var(&self.key_env).ok().filter(|value| !value.trim().is_empty())
    }

    /// Validates secret configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        let valid = !self.key_env.is_empty()
            && self
                .key_env
                .chars()
                .all(|ch| ch.is_ascii_uppercase() || ch.is_ascii_digit() || ch == '_');
        if !valid {
            return Err(ConfigError::Invalid(
                "secrets.key_env must be an uppercase environment variable name".to_string(),
            ));
        }
        Ok(())
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default log level filter.
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Optional JSON-lines file for authentication audit events.
    #[serde(default)]
    pub audit_log_path: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            audit_log_path: None,
        }
    }
}

impl LoggingConfig {
    /// Validates logging configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if !LOG_LEVELS.contains(&self.level.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "logging.level must be one of {}",
                LOG_LEVELS.join(", ")
            )));
        }
        if let Some(path) = &self.audit_log_path {
            validate_path(path)?;
        }
        Ok(())
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Default server bind address.
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}

/// Default request body limit.
const fn default_max_body_bytes() -> usize {
    DEFAULT_MAX_BODY_BYTES
}

/// Default database settings.
fn default_database() -> DatabaseConfig {
    DatabaseConfig::for_path(DEFAULT_DATABASE_PATH)
}

/// Default bearer token lifetime.
const fn default_token_ttl_secs() -> u64 {
    DEFAULT_TOKEN_TTL_SECS
}

/// Default sealing key environment variable.
fn default_secret_key_env() -> String {
    DEFAULT_SECRET_KEY_ENV.to_string()
}

/// Default log level.
fn default_log_level() -> String {
    "info".to_string()
}

/// Validates database settings that the store itself does not check.
fn validate_database(database: &DatabaseConfig) -> Result<(), ConfigError> {
    let text = database.path.to_string_lossy();
    if text.trim().is_empty() {
        return Err(ConfigError::Invalid("database.path must be set".to_string()));
    }
    if text == ":memory:" {
        return Err(ConfigError::Invalid("database.path must be a file".to_string()));
    }
    if database.busy_timeout_ms == 0 {
        return Err(ConfigError::Invalid(
            "database.busy_timeout_ms must be greater than zero".to_string(),
        ));
    }
    validate_path(&database.path)
}

/// Resolves the config path from an explicit value or the environment.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates a path against length limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}
