// crates/remediation-store-sqlite/src/tokens.rs
// ============================================================================
// Module: Access Token Repository
// Description: Persist and resolve bearer token digests.
// Purpose: Map issued tokens to users without storing the tokens themselves.
// Dependencies: remediation-core, rusqlite
// ============================================================================

//! ## Overview
//! Only a digest of each issued token reaches storage. Resolution joins the
//! owning user and ignores expired rows; callers decide whether an inactive
//! user may proceed.

// ============================================================================
// SECTION: Imports
// ============================================================================

use remediation_core::User;
use remediation_core::UserId;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::params;

use crate::store::StoreError;
use crate::users::get_user;

// ============================================================================
// SECTION: Queries
// ============================================================================

/// Records an issued token digest.
///
/// # Errors
///
/// Returns [`StoreError::Conflict`] when the digest already exists or the
/// user is unknown.
pub fn insert_token(
    conn: &Connection,
    token_digest: &str,
    user_id: UserId,
    issued_at_ms: i64,
    expires_at_ms: i64,
) -> Result<(), StoreError> {
    conn.execute(
        "INSERT INTO access_tokens (token_digest, user_id, issued_at, expires_at) VALUES (?1, \
         ?2, ?3, ?4)",
        params![token_digest, user_id.get(), issued_at_ms, expires_at_ms],
    )?;
    Ok(())
}

/// Resolves an unexpired token digest to its user.
///
/// # Errors
///
/// Returns [`StoreError`] when the query fails.
pub fn find_token_user(
    conn: &Connection,
    token_digest: &str,
    now_ms: i64,
) -> Result<Option<User>, StoreError> {
    let user_id: Option<i64> = conn
        .query_row(
            "SELECT user_id FROM access_tokens WHERE token_digest = ?1 AND expires_at > ?2",
            params![token_digest, now_ms],
            |row| row.get(0),
        )
        .optional()?;
    match user_id {
        Some(id) => get_user(conn, UserId::new(id)),
        None => Ok(None),
    }
}

/// Removes expired tokens and returns how many were deleted.
///
/// # Errors
///
/// Returns [`StoreError`] when the statement fails.
pub fn delete_expired_tokens(conn: &Connection, now_ms: i64) -> Result<usize, StoreError> {
    Ok(conn.execute("DELETE FROM access_tokens WHERE expires_at <= ?1", params![now_ms])?)
}
