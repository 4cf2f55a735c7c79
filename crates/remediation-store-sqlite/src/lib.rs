// crates/remediation-store-sqlite/src/lib.rs
// ============================================================================
// Module: Remediation SQLite Store
// Description: SQLite persistence for the remediation engine.
// Purpose: Provide the database engine, sessions, and repositories.
// Dependencies: remediation-core, rusqlite
// ============================================================================

//! ## Overview
//! This crate owns the remediation schema and every query against it. The
//! application reaches storage only through [`SessionSource`], which lets a
//! test harness substitute an isolated, always-rolled-back [`Session`] for
//! the shared production one. Security posture: storage inputs are
//! untrusted; labels and JSON columns are parsed fail-closed.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub mod records;
pub mod session;
pub mod store;
pub mod tokens;
pub mod users;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use rusqlite::Connection;
pub use session::Session;
pub use session::SessionSource;
pub use store::Database;
pub use store::DatabaseConfig;
pub use store::SCHEMA_VERSION;
pub use store::SqliteJournalMode;
pub use store::SqliteSyncMode;
pub use store::StoreError;
pub use store::unix_millis;
