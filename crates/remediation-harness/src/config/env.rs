// crates/remediation-harness/src/config/env.rs
// ============================================================================
// Module: Harness Environment
// Description: Environment-backed configuration for the test harness.
// Purpose: Parse harness inputs once into an explicit value with strict UTF-8.
// Dependencies: url
// ============================================================================

//! ## Overview
//! Harness inputs are read from the environment exactly once, by
//! [`HarnessConfig::load`], and then passed around as a value. Nothing in the
//! harness consults or mutates process state afterward, so parallel harnesses
//! with different configurations do not interfere. Invalid values fail closed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::ffi::OsString;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::credentials::ADMIN_USERNAME;
use crate::credentials::TEST_PASSWORD;
use crate::error::HarnessError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Lower bound for networked request timeouts.
pub const MIN_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);
/// URL scheme accepted for database locations.
const SQLITE_SCHEME: &str = "sqlite://";

// ============================================================================
// SECTION: Environment Constants
// ============================================================================

/// Environment keys for harness configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HarnessEnv {
    /// Test database location (`sqlite://<path>` or a bare path).
    DatabaseUrl,
    /// Base URL of a deployed instance for networked mode.
    BaseUrl,
    /// Admin username override.
    AdminUsername,
    /// Admin password override.
    AdminPassword,
    /// Request timeout in seconds; acts as a minimum over the default.
    TimeoutSeconds,
    /// Root directory for test summaries.
    RunRoot,
}

impl HarnessEnv {
    /// All keys, in documentation order.
    pub const ALL: [Self; 6] = [
        Self::DatabaseUrl,
        Self::BaseUrl,
        Self::AdminUsername,
        Self::AdminPassword,
        Self::TimeoutSeconds,
        Self::RunRoot,
    ];

    /// Returns the canonical environment variable name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::DatabaseUrl => "REMEDIATION_TEST_DATABASE_URL",
            Self::BaseUrl => "REMEDIATION_TEST_BASE_URL",
            Self::AdminUsername => "REMEDIATION_TEST_ADMIN_USERNAME",
            Self::AdminPassword => "REMEDIATION_TEST_ADMIN_PASSWORD",
            Self::TimeoutSeconds => "REMEDIATION_TEST_TIMEOUT_SEC",
            Self::RunRoot => "REMEDIATION_TEST_RUN_ROOT",
        }
    }
}

// ============================================================================
// SECTION: Config Types
// ============================================================================

/// Typed harness configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    /// Shared test database for isolated sessions; a private temporary
    /// database when `None`. Spawned local targets never use it.
    pub database: Option<PathBuf>,
    /// Deployed instance for networked mode; a locally spawned server when `None`.
    pub base_url: Option<Url>,
    /// Username of the pre-provisioned admin principal.
    pub admin_username: String,
    /// Password of the pre-provisioned admin principal.
    pub admin_password: String,
    /// Networked request timeout.
    pub timeout: Duration,
    /// Root directory for test summaries.
    pub run_root: Option<PathBuf>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            database: None,
            base_url: None,
            admin_username: ADMIN_USERNAME.to_string(),
            admin_password: TEST_PASSWORD.to_string(),
            timeout: MIN_REQUEST_TIMEOUT,
            run_root: None,
        }
    }
}

impl HarnessConfig {
    /// Loads configuration from process environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Config`] when a value is not valid UTF-8, is
    /// empty, or fails validation.
    pub fn load() -> Result<Self, HarnessError> {
        Self::from_lookup(|name| std::env::var_os(name))
    }

    /// Builds configuration from an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Config`] when a value is invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, HarnessError>
    where
        F: Fn(&str) -> Option<OsString>,
    {
        let read = |key: HarnessEnv| read_nonempty(key.as_str(), lookup(key.as_str()));
        let defaults = Self::default();
        let database = read(HarnessEnv::DatabaseUrl)?
            .map(|raw| parse_database_url(HarnessEnv::DatabaseUrl.as_str(), &raw))
            .transpose()?;
        let base_url = read(HarnessEnv::BaseUrl)?
            .map(|raw| parse_base_url(HarnessEnv::BaseUrl.as_str(), &raw))
            .transpose()?;
        let timeout = read(HarnessEnv::TimeoutSeconds)?
            .map(|raw| parse_timeout_seconds(HarnessEnv::TimeoutSeconds.as_str(), &raw))
            .transpose()?
            .map_or(defaults.timeout, |requested| requested.max(MIN_REQUEST_TIMEOUT));
        Ok(Self {
            database,
            base_url,
            admin_username: read(HarnessEnv::AdminUsername)?.unwrap_or(defaults.admin_username),
            admin_password: read(HarnessEnv::AdminPassword)?.unwrap_or(defaults.admin_password),
            timeout,
            run_root: read(HarnessEnv::RunRoot)?.map(PathBuf::from),
        })
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Enforces UTF-8 and rejects empty values.
fn read_nonempty(name: &str, raw: Option<OsString>) -> Result<Option<String>, HarnessError> {
    let Some(raw) = raw else {
        return Ok(None);
    };
    let value =
        raw.into_string().map_err(|_| HarnessError::Config(format!("{name} must be valid UTF-8")))?;
    if value.trim().is_empty() {
        return Err(HarnessError::Config(format!("{name} must not be empty")));
    }
    Ok(Some(value))
}

/// Parses `sqlite://<path>` or a bare filesystem path.
fn parse_database_url(name: &str, raw: &str) -> Result<PathBuf, HarnessError> {
    let trimmed = raw.trim();
    let path = if let Some(rest) = trimmed.strip_prefix(SQLITE_SCHEME) {
        rest
    } else if let Some((scheme, _)) = trimmed.split_once("://") {
        return Err(HarnessError::Config(format!(
            "{name} scheme {scheme} is not supported; use sqlite://<path>"
        )));
    } else {
        trimmed
    };
    if path.is_empty() || path == ":memory:" {
        return Err(HarnessError::Config(format!("{name} must name a database file")));
    }
    Ok(PathBuf::from(path))
}

/// Parses an http(s) base URL.
fn parse_base_url(name: &str, raw: &str) -> Result<Url, HarnessError> {
    let url = Url::parse(raw.trim())
        .map_err(|err| HarnessError::Config(format!("{name} is not a valid url: {err}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(HarnessError::Config(format!("{name} scheme {other} must be http or https"))),
    }
}

/// Parses a positive number of seconds.
fn parse_timeout_seconds(name: &str, raw: &str) -> Result<Duration, HarnessError> {
    let secs: u64 = raw.trim().parse().map_err(|_| {
        HarnessError::Config(format!("{name} must be a positive integer number of seconds"))
    })?;
    if secs == 0 {
        return Err(HarnessError::Config(format!("{name} must be greater than zero")));
    }
    Ok(Duration::from_secs(secs))
}
