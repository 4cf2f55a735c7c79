// crates/remediation-store-sqlite/src/users.rs
// ============================================================================
// Module: User Repository
// Description: Insert, look up, list, and deactivate users.
// Purpose: Persist principals with hashed credentials only.
// Dependencies: remediation-core, rusqlite
// ============================================================================

// ============================================================================
// SECTION: Imports
// ============================================================================

use remediation_core::NewUser;
use remediation_core::PasswordHash;
use remediation_core::Role;
use remediation_core::User;
use remediation_core::UserId;
use rusqlite::Connection;
use rusqlite::OptionalExtension;
use rusqlite::Row;
use rusqlite::params;

use crate::store::StoreError;
use crate::store::unix_millis;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Column list shared by every user query.
const USER_COLUMNS: &str =
    "id, username, email, full_name, password_hash, role, is_active, created_at";

// ============================================================================
// SECTION: Queries
// ============================================================================

/// Inserts a user and returns the stored row.
///
/// # Errors
///
/// Returns [`StoreError::Conflict`] when the username or email is taken.
pub fn insert_user(conn: &Connection, user: &NewUser) -> Result<User, StoreError> {
    conn.execute(
        "INSERT INTO users (username, email, full_name, password_hash, role, is_active, \
         created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            user.username,
            user.email,
            user.full_name,
            user.password_hash.as_str(),
            user.role.as_str(),
            user.is_active,
            unix_millis()
        ],
    )?;
    let id = UserId::new(conn.last_insert_rowid());
    get_user(conn, id)?.ok_or_else(|| StoreError::NotFound(format!("user {id}")))
}

/// Loads a user by identifier.
///
/// # Errors
///
/// Returns [`StoreError`] when the query fails or the row is malformed.
pub fn get_user(conn: &Connection, id: UserId) -> Result<Option<User>, StoreError> {
    let row = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE id = ?1"),
            params![id.get()],
            read_row,
        )
        .optional()?;
    row.map(into_user).transpose()
}

/// Loads a user by login name.
///
/// # Errors
///
/// Returns [`StoreError`] when the query fails or the row is malformed.
pub fn find_user_by_username(conn: &Connection, username: &str) -> Result<Option<User>, StoreError> {
    let row = conn
        .query_row(
            &format!("SELECT {USER_COLUMNS} FROM users WHERE username = ?1"),
            params![username],
            read_row,
        )
        .optional()?;
    row.map(into_user).transpose()
}

/// Lists all users ordered by identifier.
///
/// # Errors
///
/// Returns [`StoreError`] when the query fails or a row is malformed.
pub fn list_users(conn: &Connection) -> Result<Vec<User>, StoreError> {
    let mut stmt = conn.prepare(&format!("SELECT {USER_COLUMNS} FROM users ORDER BY id"))?;
    let rows = stmt.query_map([], read_row)?;
    let mut users = Vec::new();
    for row in rows {
        users.push(into_user(row?)?);
    }
    Ok(users)
}

/// Sets the active flag of a user.
///
/// # Errors
///
/// Returns [`StoreError::NotFound`] when the user does not exist.
pub fn set_user_active(conn: &Connection, id: UserId, is_active: bool) -> Result<(), StoreError> {
    let changed =
        conn.execute("UPDATE users SET is_active = ?1 WHERE id = ?2", params![is_active, id.get()])?;
    if changed == 0 {
        return Err(StoreError::NotFound(format!("user {id}")));
    }
    Ok(())
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Raw user columns prior to label parsing.
struct UserRow {
    /// Row identifier.
    id: i64,
    /// Login name.
    username: String,
    /// Email address.
    email: String,
    /// Display name.
    full_name: Option<String>,
    /// PHC hash string.
    password_hash: String,
    /// Role label.
    role: String,
    /// Active flag.
    is_active: bool,
    /// Creation time.
    created_at: i64,
}

/// Reads raw user columns.
fn read_row(row: &Row<'_>) -> rusqlite::Result<UserRow> {
    Ok(UserRow {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        full_name: row.get(3)?,
        password_hash: row.get(4)?,
        role: row.get(5)?,
        is_active: row.get(6)?,
        created_at: row.get(7)?,
    })
}

/// Parses raw user columns into a [`User`].
fn into_user(row: UserRow) -> Result<User, StoreError> {
    let role = Role::parse(&row.role).map_err(|err| StoreError::Invalid(err.to_string()))?;
    Ok(User {
        id: UserId::new(row.id),
        username: row.username,
        email: row.email,
        full_name: row.full_name,
        password_hash: PasswordHash::from_stored(row.password_hash),
        role,
        is_active: row.is_active,
        created_at_ms: row.created_at,
    })
}
