// crates/remediation-harness/src/error.rs
// ============================================================================
// Module: Harness Errors
// Description: Failure taxonomy for harness setup and requests.
// Purpose: Keep infrastructure outages distinguishable from regressions.
// Dependencies: thiserror, remediation-store-sqlite
// ============================================================================

//! ## Overview
//! A test that sees [`HarnessError::InfrastructureUnavailable`] never reached
//! the behavior under test; [`HarnessError::Assertion`] means it did and the
//! behavior was wrong. Skips are not errors; see [`crate::Gate`].

// ============================================================================
// SECTION: Imports
// ============================================================================

use remediation_core::PasswordError;
use remediation_core::SecretError;
use remediation_store_sqlite::StoreError;
use thiserror::Error;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Harness errors.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// Database or deployment could not be reached.
    #[error("infrastructure unavailable: {0}")]
    InfrastructureUnavailable(String),
    /// Observed behavior contradicts the expected contract.
    #[error("assertion failed: {0}")]
    Assertion(String),
    /// Networked request failed before a response arrived.
    #[error("transport error: {0}")]
    Transport(String),
    /// Harness configuration was invalid.
    #[error("harness config error: {0}")]
    Config(String),
    /// Fixture persistence failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<PasswordError> for HarnessError {
    fn from(error: PasswordError) -> Self {
        Self::Config(format!("principal password: {error}"))
    }
}

impl From<SecretError> for HarnessError {
    fn from(error: SecretError) -> Self {
        Self::Config(format!("secret sealing: {error}"))
    }
}
