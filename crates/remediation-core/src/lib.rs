// crates/remediation-core/src/lib.rs
// ============================================================================
// Module: Remediation Core
// Description: Domain model and credential primitives for the remediation engine.
// Purpose: Share typed records, password hashing, and secret sealing across crates.
// Dependencies: argon2, chacha20poly1305, serde
// ============================================================================

//! ## Overview
//! Remediation core defines the records persisted by the remediation engine
//! (users, alerts, server credentials, LLM providers) together with the two
//! credential primitives every other crate relies on: one-way password
//! hashing and reversible at-rest sealing of secret-bearing fields.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod model;
pub mod password;
pub mod secrets;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use model::Alert;
pub use model::AlertId;
pub use model::AlertSeverity;
pub use model::AlertStatus;
pub use model::CredentialAuthType;
pub use model::LlmProvider;
pub use model::LlmProviderId;
pub use model::LlmProviderType;
pub use model::NewAlert;
pub use model::NewLlmProvider;
pub use model::NewServerCredential;
pub use model::NewUser;
pub use model::ParseEnumError;
pub use model::RemoteProtocol;
pub use model::Role;
pub use model::ServerCredential;
pub use model::ServerCredentialId;
pub use model::ServerOsType;
pub use model::User;
pub use model::UserId;
pub use model::UserSummary;
pub use password::HashCost;
pub use password::PasswordError;
pub use password::PasswordHash;
pub use password::hash_password;
pub use password::hash_password_with_cost;
pub use password::verify_password;
pub use secrets::SEALER_KEY_BYTES;
pub use secrets::SealedSecret;
pub use secrets::SecretError;
pub use secrets::SecretSealer;
pub use secrets::XChaChaSealer;
