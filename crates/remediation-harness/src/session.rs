// crates/remediation-harness/src/session.rs
// ============================================================================
// Module: Isolated Session Provider
// Description: Per-test database sessions that always roll back.
// Purpose: Give each test a private unit of work over a migrated schema.
// Dependencies: remediation-store-sqlite, tempfile, tracing
// ============================================================================

//! ## Overview
//! A [`TestDatabase`] is opened once per harness. Each test then acquires an
//! [`IsolatedSession`]; its writes, including those committed inside the
//! test, are discarded when the guard is released or dropped on any exit
//! path, panics included.
//!
//! Opening failures are infrastructure failures. The first one is cached in
//! an [`InfraGate`]; every later acquisition in the process fails immediately
//! with the same diagnosis instead of retrying. Write-lock contention on a
//! shared database is not such a failure: it surfaces as a store error and
//! the next acquisition waits for the lock again.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::OnceLock;

use remediation_store_sqlite::Database;
use remediation_store_sqlite::DatabaseConfig;
use remediation_store_sqlite::Session;
use remediation_store_sqlite::StoreError;
use tempfile::TempDir;

use crate::config::HarnessConfig;
use crate::error::HarnessError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// File name of a private temporary database.
const TEMP_DATABASE_FILE: &str = "remediation-test.db";

// ============================================================================
// SECTION: Infrastructure Gate
// ============================================================================

/// First infrastructure failure seen by the process.
#[derive(Debug, Default)]
pub struct InfraGate {
    /// Cached diagnosis.
    failure: OnceLock<String>,
}

impl InfraGate {
    /// Builds an open gate.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            failure: OnceLock::new(),
        }
    }

    /// Returns the process-wide gate.
    #[must_use]
    pub fn global() -> &'static Self {
        /// Process-wide failure cache.
        static GATE: InfraGate = InfraGate::new();
        &GATE
    }

    /// Fails with the cached diagnosis once a failure was recorded.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::InfrastructureUnavailable`] after any failure.
    pub fn check(&self) -> Result<(), HarnessError> {
        match self.failure.get() {
            Some(diagnosis) => Err(HarnessError::InfrastructureUnavailable(diagnosis.clone())),
            None => Ok(()),
        }
    }

    /// Returns the cached diagnosis, if any.
    #[must_use]
    pub fn diagnosis(&self) -> Option<&str> {
        self.failure.get().map(String::as_str)
    }

    /// Converts a store failure, caching it unless it is lock contention.
    ///
    /// A busy database is reachable; the caller may retry once the other
    /// writer releases its session.
    fn store_failure(&self, context: &str, error: StoreError) -> HarnessError {
        if let StoreError::Busy(_) = error {
            tracing::warn!(context, error = %error, "test database busy");
            return HarnessError::Store(error);
        }
        self.record(format!("{context}: {error}"))
    }

    /// Records `diagnosis` unless one is already cached and returns the error.
    fn record(&self, diagnosis: String) -> HarnessError {
        let cached = self.failure.get_or_init(|| diagnosis);
        tracing::error!(diagnosis = %cached, "test infrastructure unavailable");
        HarnessError::InfrastructureUnavailable(cached.clone())
    }
}

// ============================================================================
// SECTION: Test Database
// ============================================================================

/// Migrated test database shared by the sessions of one harness.
pub struct TestDatabase {
    /// Opened database.
    database: Arc<Database>,
    /// Owning directory of a private temporary database.
    temp: Option<TempDir>,
    /// Failure cache consulted on every acquisition.
    gate: &'static InfraGate,
}

impl TestDatabase {
    /// Opens the configured database, or a private temporary one.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::InfrastructureUnavailable`] when the database
    /// cannot be opened or an earlier open failed.
    pub fn open(config: &HarnessConfig) -> Result<Self, HarnessError> {
        Self::open_with_gate(config, InfraGate::global())
    }

    /// Opens the database, caching failures in `gate`.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::InfrastructureUnavailable`] when the database
    /// cannot be opened or `gate` already holds a failure.
    pub fn open_with_gate(
        config: &HarnessConfig,
        gate: &'static InfraGate,
    ) -> Result<Self, HarnessError> {
        gate.check()?;
        let (path, temp) = match &config.database {
            Some(path) => (path.clone(), None),
            None => {
                let temp = tempfile::Builder::new()
                    .prefix("remediation-test-")
                    .tempdir()
                    .map_err(|err| gate.record(format!("temporary database directory: {err}")))?;
                (temp.path().join(TEMP_DATABASE_FILE), Some(temp))
            }
        };
        let database = Database::open(DatabaseConfig::for_path(&path)).map_err(|err| {
            gate.store_failure(&format!("test database {}", path.display()), err)
        })?;
        tracing::debug!(path = %path.display(), temporary = temp.is_some(), "test database ready");
        Ok(Self {
            database: Arc::new(database),
            temp,
            gate,
        })
    }

    /// Returns the database path.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.database.path()
    }

    /// Returns the directory removed on drop, for temporary databases.
    #[must_use]
    pub fn temp_dir(&self) -> Option<PathBuf> {
        self.temp.as_ref().map(|temp| temp.path().to_path_buf())
    }

    /// Returns the shared engine, for wiring a production-style application.
    #[must_use]
    pub fn database(&self) -> Arc<Database> {
        Arc::clone(&self.database)
    }

    /// Acquires an isolated session.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::InfrastructureUnavailable`] when the session
    /// cannot be opened or an earlier acquisition failed, and
    /// [`HarnessError::Store`] with [`StoreError::Busy`] when another session
    /// held the write lock past the busy timeout. Contention is not cached.
    pub fn isolated(&self) -> Result<IsolatedSession, HarnessError> {
        self.gate.check()?;
        let session = self
            .database
            .isolated_session()
            .map_err(|err| self.gate.store_failure("isolated session", err))?;
        Ok(IsolatedSession {
            session,
        })
    }

    /// Runs `scope` with a fresh isolated session and releases it afterward.
    ///
    /// # Errors
    ///
    /// Returns the error from acquisition, from `scope`, or from release, in
    /// that order of precedence.
    pub fn with_session<T, F>(&self, scope: F) -> Result<T, HarnessError>
    where
        F: FnOnce(&IsolatedSession) -> Result<T, HarnessError>,
    {
        let isolated = self.isolated()?;
        let outcome = scope(&isolated);
        let released = isolated.release();
        let value = outcome?;
        released?;
        Ok(value)
    }
}

impl Drop for TestDatabase {
    fn drop(&mut self) {
        if self.temp.is_none() {
            return;
        }
        if let Err(err) = self.database.drop_schema() {
            tracing::warn!(error = %err, "temporary schema teardown failed");
        }
    }
}

// ============================================================================
// SECTION: Isolated Session
// ============================================================================

/// Session guard that rolls back on release or drop.
pub struct IsolatedSession {
    /// Isolated store session.
    session: Session,
}

impl IsolatedSession {
    /// Returns the underlying session.
    #[must_use]
    pub const fn session(&self) -> &Session {
        &self.session
    }

    /// Rolls back every change and closes the session.
    ///
    /// # Errors
    ///
    /// Returns [`HarnessError::Store`] when the rollback statement fails.
    pub fn release(self) -> Result<(), HarnessError> {
        self.session.rollback_and_close()?;
        Ok(())
    }
}

impl Drop for IsolatedSession {
    fn drop(&mut self) {
        if let Err(err) = self.session.rollback_and_close() {
            tracing::warn!(error = %err, "isolated session rollback failed");
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
