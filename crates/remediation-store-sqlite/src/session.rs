// crates/remediation-store-sqlite/src/session.rs
// ============================================================================
// Module: Store Sessions
// Description: Unit-of-work sessions over a single SQLite connection.
// Purpose: Give the application one persistence seam that tests can redirect.
// Dependencies: rusqlite
// ============================================================================

//! ## Overview
//! A [`Session`] is a cloneable handle to one connection. Every
//! [`Session::unit_of_work`] runs inside a savepoint: returning `Ok` releases
//! it, returning `Err` or unwinding rolls it back.
//!
//! A *shared* session sits on an autocommit connection, so a released
//! savepoint is durable. An *isolated* session first opens an outer
//! `BEGIN IMMEDIATE` transaction; released savepoints fold into it and are
//! visible to every holder of the handle, but [`Session::rollback_and_close`]
//! discards all of them and closes the handle for good.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::MutexGuard;
use std::sync::PoisonError;

use rusqlite::Connection;

use crate::store::StoreError;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Connection state guarded by the session mutex.
struct SessionState {
    /// Underlying connection.
    connection: Connection,
    /// Whether the session holds an outer transaction.
    isolated: bool,
    /// Set once the session has been rolled back.
    closed: bool,
}

/// Cloneable unit-of-work handle over one connection.
#[derive(Clone)]
pub struct Session {
    /// Shared connection state.
    state: Arc<Mutex<SessionState>>,
}

/// Source of sessions for request handling.
pub trait SessionSource: Send + Sync {
    /// Returns the session the next unit of work should use.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when no session can be provided.
    fn session(&self) -> Result<Session, StoreError>;
}

impl SessionSource for Session {
    fn session(&self) -> Result<Session, StoreError> {
        if self.is_closed() {
            return Err(StoreError::SessionClosed);
        }
        Ok(self.clone())
    }
}

// ============================================================================
// SECTION: Session
// ============================================================================

impl Session {
    /// Wraps an autocommit connection.
    #[must_use]
    pub fn shared(connection: Connection) -> Self {
        Self::with_state(SessionState {
            connection,
            isolated: false,
            closed: false,
        })
    }

    /// Opens an outer write transaction on `connection` and wraps it.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the transaction cannot be started, for
    /// example when another writer holds the lock past the busy timeout.
    pub fn begin_isolated(connection: Connection) -> Result<Self, StoreError> {
        connection.execute_batch("BEGIN IMMEDIATE;")?;
        Ok(Self::with_state(SessionState {
            connection,
            isolated: true,
            closed: false,
        }))
    }

    /// Wraps session state in a shared handle.
    fn with_state(state: SessionState) -> Self {
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }

    /// Runs `work` inside a savepoint that is released only on `Ok`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::SessionClosed`] after rollback, or the error
    /// produced by `work` or the savepoint.
    pub fn unit_of_work<T, E, F>(&self, work: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce(&Connection) -> Result<T, E>,
    {
        let mut guard = self.lock()?;
        if guard.closed {
            return Err(StoreError::SessionClosed.into());
        }
        let savepoint = guard.connection.savepoint().map_err(StoreError::from)?;
        let value = work(&savepoint)?;
        savepoint.commit().map_err(StoreError::from)?;
        drop(guard);
        Ok(value)
    }

    /// Runs read-only `work` without opening a savepoint.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::SessionClosed`] after rollback, or the error
    /// produced by `work`.
    pub fn read<T, E, F>(&self, work: F) -> Result<T, E>
    where
        E: From<StoreError>,
        F: FnOnce(&Connection) -> Result<T, E>,
    {
        let guard = self.lock()?;
        if guard.closed {
            return Err(StoreError::SessionClosed.into());
        }
        let value = work(&guard.connection)?;
        drop(guard);
        Ok(value)
    }

    /// Returns true once the session has been rolled back.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).closed
    }

    /// Returns true when the session holds an outer transaction.
    #[must_use]
    pub fn is_isolated(&self) -> bool {
        self.state.lock().unwrap_or_else(PoisonError::into_inner).isolated
    }

    /// Discards the outer transaction and closes the session. Idempotent.
    ///
    /// Recovers from a poisoned lock so a panicking test still rolls back.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] when the rollback statement fails; the session
    /// is closed regardless.
    pub fn rollback_and_close(&self) -> Result<(), StoreError> {
        let mut guard = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        if guard.closed {
            return Ok(());
        }
        guard.closed = true;
        if !guard.isolated || guard.connection.is_autocommit() {
            return Ok(());
        }
        guard.connection.execute_batch("ROLLBACK;")?;
        drop(guard);
        Ok(())
    }

    /// Locks the session state.
    fn lock(&self) -> Result<MutexGuard<'_, SessionState>, StoreError> {
        self.state.lock().map_err(|_| StoreError::Db("session mutex poisoned".to_string()))
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
