// crates/remediation-api/src/lib.rs
// ============================================================================
// Module: Remediation API
// Description: Reference HTTP application for the remediation engine.
// Purpose: Serve login, protected user listing, and health endpoints.
// Dependencies: axum, remediation-core, remediation-store-sqlite, tokio
// ============================================================================

//! ## Overview
//! The API crate exposes [`build_router`] for in-process use and
//! [`ApiServer`] for running over TCP. Authentication is bearer-token based;
//! tokens are minted by password login and stored as digests only.
//! Security posture: request inputs are untrusted and fail closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod audit;
pub mod auth;
pub mod server;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use audit::AuditSink;
pub use audit::AuthAction;
pub use audit::AuthAuditEvent;
pub use audit::FileAuditSink;
pub use audit::NoopAuditSink;
pub use audit::StderrAuditSink;
pub use auth::AuthError;
pub use auth::IssuedToken;
pub use auth::TokenService;
pub use auth::parse_bearer_token;
pub use server::ApiError;
pub use server::ApiServer;
pub use server::ApiServerError;
pub use server::AppDependencies;
pub use server::build_router;
