// crates/remediation-store-sqlite/src/store.rs
// ============================================================================
// Module: SQLite Database Engine
// Description: Connection setup, schema migration, and store errors.
// Purpose: Open a migrated remediation database with durable defaults.
// Dependencies: rusqlite, serde, thiserror
// ============================================================================

//! ## Overview
//! [`Database`] opens (and migrates) a `SQLite` file, hands out the shared
//! production [`Session`], and opens fresh connections for isolated sessions.
//! The schema is versioned through `store_meta`; an unknown version fails
//! closed. Security posture: database contents are untrusted and every label
//! read back is parsed strictly.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;
use std::time::SystemTime;
use std::time::UNIX_EPOCH;

use rusqlite::Connection;
use rusqlite::ErrorCode;
use rusqlite::OpenFlags;
use rusqlite::OptionalExtension;
use rusqlite::TransactionBehavior;
use rusqlite::params;
use serde::Deserialize;
use thiserror::Error;

use crate::session::Session;
use crate::session::SessionSource;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// `SQLite` schema version for the store.
pub const SCHEMA_VERSION: i64 = 1;
/// Default busy timeout (ms).
const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;
/// Maximum length of a single path component.
const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Path `SQLite` interprets as a private in-memory database.
const IN_MEMORY_PATH: &str = ":memory:";

/// Schema for a fresh database.
const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    username TEXT NOT NULL UNIQUE,
    email TEXT NOT NULL UNIQUE,
    full_name TEXT,
    password_hash TEXT NOT NULL,
    role TEXT NOT NULL CHECK (role IN ('admin', 'engineer', 'user')),
    is_active INTEGER NOT NULL DEFAULT 1,
    created_at INTEGER NOT NULL
);
CREATE TABLE IF NOT EXISTS access_tokens (
    token_digest TEXT PRIMARY KEY,
    user_id INTEGER NOT NULL,
    issued_at INTEGER NOT NULL,
    expires_at INTEGER NOT NULL,
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS idx_access_tokens_user_id ON access_tokens (user_id);
CREATE TABLE IF NOT EXISTS alerts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    fingerprint TEXT NOT NULL,
    alert_name TEXT NOT NULL,
    severity TEXT NOT NULL,
    instance TEXT NOT NULL,
    job TEXT NOT NULL,
    status TEXT NOT NULL,
    labels_json TEXT NOT NULL,
    annotations_json TEXT NOT NULL,
    raw_alert_json TEXT NOT NULL,
    received_at INTEGER NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_alerts_fingerprint ON alerts (fingerprint);
CREATE TABLE IF NOT EXISTS server_credentials (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    hostname TEXT NOT NULL,
    port INTEGER NOT NULL,
    username TEXT NOT NULL,
    os_type TEXT NOT NULL,
    protocol TEXT NOT NULL,
    auth_type TEXT NOT NULL,
    ssh_key_encrypted TEXT,
    password_encrypted TEXT,
    environment TEXT NOT NULL,
    created_by INTEGER NOT NULL,
    created_at INTEGER NOT NULL,
    FOREIGN KEY (created_by) REFERENCES users(id)
);
CREATE TABLE IF NOT EXISTS llm_providers (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL UNIQUE,
    provider_type TEXT NOT NULL,
    model_id TEXT NOT NULL,
    api_key_encrypted TEXT,
    is_default INTEGER NOT NULL DEFAULT 0,
    enabled INTEGER NOT NULL DEFAULT 1,
    created_at INTEGER NOT NULL
);";

/// Drops every table owned by the store.
const DROP_SCHEMA_SQL: &str = "
DROP TABLE IF EXISTS access_tokens;
DROP TABLE IF EXISTS server_credentials;
DROP TABLE IF EXISTS llm_providers;
DROP TABLE IF EXISTS alerts;
DROP TABLE IF EXISTS users;
DROP TABLE IF EXISTS store_meta;";

// ============================================================================
// SECTION: Config
// ============================================================================

/// `SQLite` journal mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteJournalMode {
    /// WAL journal mode (recommended).
    #[default]
    Wal,
    /// Delete journal mode (legacy).
    Delete,
}

impl SqliteJournalMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Wal => "wal",
            Self::Delete => "delete",
        }
    }
}

/// `SQLite` sync mode configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum SqliteSyncMode {
    /// Full synchronous mode (safest).
    #[default]
    Full,
    /// Normal synchronous mode (balanced).
    Normal,
}

impl SqliteSyncMode {
    /// Returns the `SQLite` pragma value.
    #[must_use]
    pub const fn pragma_value(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Normal => "normal",
        }
    }
}

/// Configuration for the remediation database.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DatabaseConfig {
    /// Path to the `SQLite` database file.
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteJournalMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl DatabaseConfig {
    /// Builds a config for `path` with default tuning.
    #[must_use]
    pub fn for_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            journal_mode: SqliteJournalMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Store errors.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Store I/O error.
    #[error("store io error: {0}")]
    Io(String),
    /// `SQLite` engine error.
    #[error("store db error: {0}")]
    Db(String),
    /// Store schema version mismatch.
    #[error("store version mismatch: {0}")]
    VersionMismatch(String),
    /// Invalid store data or configuration.
    #[error("store invalid data: {0}")]
    Invalid(String),
    /// Uniqueness or foreign key constraint violated.
    #[error("store constraint violated: {0}")]
    Conflict(String),
    /// Addressed row does not exist.
    #[error("store record not found: {0}")]
    NotFound(String),
    /// Session was rolled back and closed.
    #[error("store session closed")]
    SessionClosed,
    /// Session source can no longer provide sessions.
    #[error("store unavailable: {0}")]
    Unavailable(String),
    /// Another connection held the lock past the busy timeout.
    #[error("store busy: {0}")]
    Busy(String),
}

impl From<rusqlite::Error> for StoreError {
    fn from(error: rusqlite::Error) -> Self {
        match &error {
            rusqlite::Error::SqliteFailure(failure, _)
                if failure.code == ErrorCode::ConstraintViolation =>
            {
                Self::Conflict(error.to_string())
            }
            rusqlite::Error::SqliteFailure(failure, _)
                if matches!(failure.code, ErrorCode::DatabaseBusy | ErrorCode::DatabaseLocked) =>
            {
                Self::Busy(error.to_string())
            }
            _ => Self::Db(error.to_string()),
        }
    }
}

// ============================================================================
// SECTION: Database
// ============================================================================

/// Migrated remediation database.
pub struct Database {
    /// Database configuration.
    config: DatabaseConfig,
    /// Shared production session.
    primary: Session,
}

impl Database {
    /// Opens the database, creating and migrating it when needed.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the path is invalid or the database cannot
    /// be opened or migrated.
    pub fn open(config: DatabaseConfig) -> Result<Self, StoreError> {
        validate_store_path(&config.path)?;
        ensure_parent_dir(&config.path)?;
        let mut connection = open_connection(&config)?;
        initialize_schema(&mut connection)?;
        Ok(Self {
            config,
            primary: Session::shared(connection),
        })
    }

    /// Returns the database path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    /// Opens a new connection with the configured pragmas.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the connection cannot be opened.
    pub fn connect(&self) -> Result<Connection, StoreError> {
        open_connection(&self.config)
    }

    /// Opens a session on a private connection inside an outer write
    /// transaction that is discarded by [`Session::rollback_and_close`].
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the connection or transaction cannot be
    /// opened.
    pub fn isolated_session(&self) -> Result<Session, StoreError> {
        Session::begin_isolated(self.connect()?)
    }

    /// Drops every store table.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the statements fail.
    pub fn drop_schema(&self) -> Result<(), StoreError> {
        self.primary.unit_of_work(|conn| {
            conn.execute_batch(DROP_SCHEMA_SQL)?;
            Ok(())
        })
    }
}

impl SessionSource for Database {
    fn session(&self) -> Result<Session, StoreError> {
        Ok(self.primary.clone())
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Returns the current unix epoch in milliseconds.
#[must_use]
pub fn unix_millis() -> i64 {
    let now = SystemTime::now().duration_since(UNIX_EPOCH).unwrap_or_default();
    i64::try_from(now.as_millis()).unwrap_or(i64::MAX)
}

/// Ensures the parent directory for the store exists.
fn ensure_parent_dir(path: &Path) -> Result<(), StoreError> {
    let Some(parent) = path.parent() else {
        return Err(StoreError::Io("store path missing parent directory".to_string()));
    };
    if parent.as_os_str().is_empty() {
        return Ok(());
    }
    std::fs::create_dir_all(parent).map_err(|err| StoreError::Io(err.to_string()))
}

/// Validates store paths for safety limits.
fn validate_store_path(path: &Path) -> Result<(), StoreError> {
    let path_string = path.display().to_string();
    if path_string.is_empty() {
        return Err(StoreError::Invalid("store path is empty".to_string()));
    }
    if path_string == IN_MEMORY_PATH {
        return Err(StoreError::Invalid(
            "in-memory databases cannot be shared between connections".to_string(),
        ));
    }
    if path_string.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(StoreError::Invalid("store path exceeds length limit".to_string()));
    }
    for component in path.components() {
        let name = component.as_os_str().to_string_lossy();
        if name.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(StoreError::Invalid(
                "store path contains an overlong component".to_string(),
            ));
        }
    }
    if path.exists() && path.is_dir() {
        return Err(StoreError::Invalid(
            "store path must be a file, not a directory".to_string(),
        ));
    }
    Ok(())
}

/// Opens an `SQLite` connection with secure defaults.
fn open_connection(config: &DatabaseConfig) -> Result<Connection, StoreError> {
    let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
        | OpenFlags::SQLITE_OPEN_CREATE
        | OpenFlags::SQLITE_OPEN_FULL_MUTEX;
    let connection = Connection::open_with_flags(&config.path, flags)
        .map_err(|err| StoreError::Unavailable(err.to_string()))?;
    apply_pragmas(&connection, config)?;
    Ok(connection)
}

/// Applies `SQLite` pragmas required for durability.
fn apply_pragmas(connection: &Connection, config: &DatabaseConfig) -> Result<(), StoreError> {
    connection.busy_timeout(Duration::from_millis(config.busy_timeout_ms))?;
    connection.execute_batch("PRAGMA foreign_keys = ON;")?;
    connection
        .execute_batch(&format!("PRAGMA journal_mode = {};", config.journal_mode.pragma_value()))?;
    connection
        .execute_batch(&format!("PRAGMA synchronous = {};", config.sync_mode.pragma_value()))?;
    Ok(())
}

/// Returns the recorded schema version without taking the write lock.
fn current_schema_version(connection: &Connection) -> Result<Option<i64>, StoreError> {
    let has_meta: Option<String> = connection
        .query_row(
            "SELECT name FROM sqlite_master WHERE type = 'table' AND name = 'store_meta'",
            params![],
            |row| row.get(0),
        )
        .optional()?;
    if has_meta.is_none() {
        return Ok(None);
    }
    Ok(connection
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()?)
}

/// Initializes the `SQLite` schema or validates the existing version.
///
/// A current schema is detected with reads only, so opening a shared
/// database never waits on a writer.
fn initialize_schema(connection: &mut Connection) -> Result<(), StoreError> {
    if current_schema_version(connection)? == Some(SCHEMA_VERSION) {
        return Ok(());
    }
    let tx = connection.transaction_with_behavior(TransactionBehavior::Immediate)?;
    tx.execute_batch("CREATE TABLE IF NOT EXISTS store_meta (version INTEGER NOT NULL);")?;
    let version: Option<i64> = tx
        .query_row("SELECT version FROM store_meta LIMIT 1", params![], |row| row.get(0))
        .optional()?;
    match version {
        None => {
            tx.execute("INSERT INTO store_meta (version) VALUES (?1)", params![SCHEMA_VERSION])?;
            tx.execute_batch(SCHEMA_SQL)?;
        }
        Some(value) if value == SCHEMA_VERSION => {}
        Some(value) => {
            return Err(StoreError::VersionMismatch(format!(
                "unsupported schema version: {value}"
            )));
        }
    }
    tx.commit()?;
    Ok(())
}

// ============================================================================
// SECTION: Tests
// ============================================================================
