// crates/remediation-config/src/lib.rs
// ============================================================================
// Module: Remediation Config Library
// Description: Canonical config model and validation.
// Purpose: Single source of truth for remediation-engine.toml semantics.
// Dependencies: remediation-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! `remediation-config` defines the configuration model for the remediation
//! engine binary and validates it fail-closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod config;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use config::AuthConfig;
pub use config::CONFIG_ENV_VAR;
pub use config::ConfigError;
pub use config::LoggingConfig;
pub use config::RemediationConfig;
pub use config::SecretsConfig;
pub use config::ServerConfig;
