// crates/remediation-harness/src/config/mod.rs
// ============================================================================
// Module: Harness Configuration
// Description: Typed harness settings derived from the environment.
// Purpose: Give harness construction one explicit configuration value.
// Dependencies: url
// ============================================================================

//! ## Overview
//! Harness configuration is read from environment variables and mapped into
//! a small typed structure that is passed into harness construction.

// ============================================================================
// SECTION: Modules
// ============================================================================

mod env;

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod env_tests;

// ============================================================================
// SECTION: Re-exports
// ============================================================================

pub use env::HarnessConfig;
pub use env::HarnessEnv;
pub use env::MIN_REQUEST_TIMEOUT;
