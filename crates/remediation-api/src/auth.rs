// crates/remediation-api/src/auth.rs
// ============================================================================
// Module: API Authentication
// Description: Password login, bearer token issuance, and token resolution.
// Purpose: Provide strict, fail-closed authentication for API requests.
// Dependencies: remediation-core, remediation-store-sqlite, sha2, rand, base64
// ============================================================================

//! ## Overview
//! Logins verify a password against the stored Argon2id hash and mint an
//! opaque bearer token. Only the SHA-256 digest of a token is persisted, so a
//! database read never yields a usable credential. Unknown users are checked
//! against a dummy hash to keep login timing independent of user existence.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt::Write as _;
use std::time::Duration;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use rand::RngCore;
use rand::rngs::OsRng;
use remediation_core::HashCost;
use remediation_core::PasswordError;
use remediation_core::PasswordHash;
use remediation_core::User;
use remediation_core::hash_password_with_cost;
use remediation_core::verify_password;
use remediation_store_sqlite::Connection;
use remediation_store_sqlite::StoreError;
use remediation_store_sqlite::tokens;
use remediation_store_sqlite::unix_millis;
use remediation_store_sqlite::users;
use sha2::Digest;
use sha2::Sha256;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Maximum accepted `Authorization` header size.
pub const MAX_AUTH_HEADER_BYTES: usize = 8 * 1024;
/// Random bytes per issued token.
const TOKEN_BYTES: usize = 32;
/// Plaintext hashed into the dummy verification hash.
const DUMMY_PASSWORD: &str = "remediation-engine-dummy-password";
/// Hex characters of a digest kept as an audit fingerprint.
const FINGERPRINT_CHARS: usize = 12;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Authentication errors.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Missing or invalid credentials.
    #[error("{0}")]
    Unauthenticated(String),
    /// Credentials were valid but the account is disabled.
    #[error("Inactive user")]
    Inactive,
    /// Storage failure during authentication.
    #[error(transparent)]
    Store(#[from] StoreError),
    /// Password hashing failure.
    #[error("password error: {0}")]
    Password(String),
}

impl From<PasswordError> for AuthError {
    fn from(error: PasswordError) -> Self {
        Self::Password(error.to_string())
    }
}

// ============================================================================
// SECTION: Token Service
// ============================================================================

/// Issued bearer token.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// Opaque token value returned to the caller once.
    pub value: String,
    /// Short digest prefix for audit correlation.
    pub fingerprint: String,
}

/// Password login and bearer token lifecycle.
#[derive(Clone)]
pub struct TokenService {
    /// Lifetime of issued tokens.
    ttl: Duration,
    /// Hash used when the username is unknown.
    dummy_hash: PasswordHash,
}

impl TokenService {
    /// Builds a token service whose dummy hash matches `cost`.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Password`] when the dummy hash cannot be built.
    pub fn new(ttl: Duration, cost: HashCost) -> Result<Self, AuthError> {
        Ok(Self {
            ttl,
            dummy_hash: hash_password_with_cost(DUMMY_PASSWORD, cost)?,
        })
    }

    /// Returns the configured token lifetime.
    #[must_use]
    pub const fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Verifies a username and password.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Unauthenticated`] for unknown users or wrong
    /// passwords and [`AuthError::Inactive`] for disabled accounts.
    pub fn authenticate(
        &self,
        conn: &Connection,
        username: &str,
        password: &str,
    ) -> Result<User, AuthError> {
        let Some(user) = users::find_user_by_username(conn, username)? else {
            let _ = verify_password(password, &self.dummy_hash);
            return Err(AuthError::Unauthenticated("Incorrect username or password".to_string()));
        };
        if !verify_password(password, &user.password_hash) {
            return Err(AuthError::Unauthenticated("Incorrect username or password".to_string()));
        }
        if !user.is_active {
            return Err(AuthError::Inactive);
        }
        Ok(user)
    }

    /// Mints a token for `user` and records its digest.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Store`] when the digest cannot be stored.
    pub fn issue(&self, conn: &Connection, user: &User) -> Result<IssuedToken, AuthError> {
        let mut raw = [0u8; TOKEN_BYTES];
        OsRng.fill_bytes(&mut raw);
        let value = URL_SAFE_NO_PAD.encode(raw);
        let digest = token_digest(&value);
        let issued_at = unix_millis();
        let ttl_ms = i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX);
        tokens::insert_token(conn, &digest, user.id, issued_at, issued_at.saturating_add(ttl_ms))?;
        Ok(IssuedToken {
            value,
            fingerprint: fingerprint(&digest),
        })
    }

    /// Resolves a bearer token to an active user.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::Unauthenticated`] when the token is unknown or
    /// expired and [`AuthError::Inactive`] when its user is disabled.
    pub fn resolve(&self, conn: &Connection, token: &str) -> Result<User, AuthError> {
        let digest = token_digest(token);
        let user = tokens::find_token_user(conn, &digest, unix_millis())?
            .ok_or_else(|| AuthError::Unauthenticated("Could not validate credentials".to_string()))?;
        if !user.is_active {
            return Err(AuthError::Inactive);
        }
        Ok(user)
    }
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Extracts the token from a `Bearer` authorization header.
///
/// # Errors
///
/// Returns [`AuthError::Unauthenticated`] when the header is missing,
/// oversized, or not a bearer credential.
pub fn parse_bearer_token(auth_header: Option<&str>) -> Result<String, AuthError> {
    let header =
        auth_header.ok_or_else(|| AuthError::Unauthenticated("Not authenticated".to_string()))?;
    if header.len() > MAX_AUTH_HEADER_BYTES {
        return Err(AuthError::Unauthenticated("Authorization header too large".to_string()));
    }
    let mut parts = header.trim().splitn(2, ' ');
    let scheme = parts.next().unwrap_or_default();
    let token = parts.next().unwrap_or_default().trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthError::Unauthenticated("Invalid authorization header".to_string()));
    }
    Ok(token.to_string())
}

/// Returns the lowercase hex SHA-256 digest of a token.
#[must_use]
pub fn token_digest(token: &str) -> String {
    let digest = Sha256::digest(token.as_bytes());
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        let _ = write!(out, "{byte:02x}");
    }
    out
}

/// Returns the audit fingerprint of a digest.
#[must_use]
pub fn fingerprint(digest: &str) -> String {
    digest.chars().take(FINGERPRINT_CHARS).collect()
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    #![allow(
        clippy::unwrap_used,
        clippy::expect_used,
        reason = "Test-only assertions use unwrap for clarity."
    )]

    use proptest::prelude::*;

    use super::AuthError;
    use super::MAX_AUTH_HEADER_BYTES;
    use super::parse_bearer_token;
    use super::token_digest;

    #[test]
    fn missing_header_is_unauthenticated() {
        assert!(matches!(parse_bearer_token(None), Err(AuthError::Unauthenticated(_))));
    }

    #[test]
    fn scheme_is_case_insensitive() {
        assert_eq!(parse_bearer_token(Some("bearer abc")).unwrap(), "abc");
        assert_eq!(parse_bearer_token(Some("BEARER  abc ")).unwrap(), "abc");
    }

    #[test]
    fn basic_scheme_is_rejected() {
        assert!(parse_bearer_token(Some("Basic dXNlcjpwYXNz")).is_err());
        assert!(parse_bearer_token(Some("Bearer")).is_err());
    }

    #[test]
    fn oversized_header_is_rejected() {
        let header = format!("Bearer {}", "a".repeat(MAX_AUTH_HEADER_BYTES));
        assert!(parse_bearer_token(Some(&header)).is_err());
    }

    #[test]
    fn digest_is_lowercase_hex() {
        let digest = token_digest("token");
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|ch| ch.is_ascii_hexdigit() && !ch.is_ascii_uppercase()));
    }

    proptest! {
        #[test]
        fn well_formed_bearer_headers_round_trip(token in "[A-Za-z0-9_-]{1,64}") {
            let header = format!("Bearer {token}");
            prop_assert_eq!(parse_bearer_token(Some(&header)).unwrap(), token);
        }
    }
}
