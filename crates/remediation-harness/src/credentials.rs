// crates/remediation-harness/src/credentials.rs
// ============================================================================
// Module: Credential Materializer
// Description: Deterministic test principals with known passwords.
// Purpose: Produce role-named users whose stored hash matches a fixed plaintext.
// Dependencies: remediation-core, remediation-store-sqlite
// ============================================================================

//! ## Overview
//! [`make_principal`] builds a value and nothing else; persisting it is a
//! separate step through [`persist_principal`] on the test's isolated
//! session. Fixture hashes use [`HashCost::Fast`], which keeps the Argon2id
//! format while making per-test hashing cheap.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use remediation_core::HashCost;
use remediation_core::NewUser;
use remediation_core::PasswordHash;
use remediation_core::Role;
use remediation_core::User;
use remediation_core::hash_password_with_cost;
use remediation_core::verify_password;
use remediation_store_sqlite::Session;
use remediation_store_sqlite::users;

use crate::broker::LoginCredentials;
use crate::config::HarnessConfig;
use crate::error::HarnessError;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Plaintext password shared by every default principal.
pub const TEST_PASSWORD: &str = "TestPassw0rd!";
/// Username of the default admin principal.
pub const ADMIN_USERNAME: &str = "test_admin";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Test-created identity with known credentials.
#[derive(Clone)]
pub struct Principal {
    /// Login name.
    pub username: String,
    /// Email address.
    pub email: String,
    /// Display name.
    pub full_name: Option<String>,
    /// Plaintext password. Never persisted.
    pub password: String,
    /// Access role.
    pub role: Role,
    /// Whether the principal may log in.
    pub is_active: bool,
    /// Stored form of `password`.
    pub password_hash: PasswordHash,
}

impl fmt::Debug for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Principal")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("full_name", &self.full_name)
            .field("password", &"<redacted>")
            .field("role", &self.role)
            .field("is_active", &self.is_active)
            .finish_non_exhaustive()
    }
}

impl Principal {
    /// Returns the row to insert for this principal.
    #[must_use]
    pub fn new_user(&self) -> NewUser {
        NewUser {
            username: self.username.clone(),
            email: self.email.clone(),
            full_name: self.full_name.clone(),
            password_hash: self.password_hash.clone(),
            role: self.role,
            is_active: self.is_active,
        }
    }

    /// Returns the login body for this principal.
    #[must_use]
    pub fn credentials(&self) -> LoginCredentials {
        LoginCredentials::new(&self.username, &self.password)
    }

    /// Checks `plaintext` against the stored hash.
    #[must_use]
    pub fn verifies(&self, plaintext: &str) -> bool {
        verify_password(plaintext, &self.password_hash)
    }
}

/// Field overrides applied on top of role defaults.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PrincipalOverrides {
    /// Login name.
    username: Option<String>,
    /// Email address.
    email: Option<String>,
    /// Display name.
    full_name: Option<String>,
    /// Plaintext password.
    password: Option<String>,
    /// Active flag.
    is_active: Option<bool>,
}

impl PrincipalOverrides {
    /// Overrides the login name.
    #[must_use]
    pub fn username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Overrides the email address.
    #[must_use]
    pub fn email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Overrides the display name.
    #[must_use]
    pub fn full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = Some(full_name.into());
        self
    }

    /// Overrides the plaintext password.
    #[must_use]
    pub fn password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Marks the principal inactive.
    #[must_use]
    pub const fn inactive(mut self) -> Self {
        self.is_active = Some(false);
        self
    }
}

// ============================================================================
// SECTION: Materializer
// ============================================================================

/// Builds a principal for `role` with optional overrides.
///
/// Defaults are `test_<role>`, `<role>@test.com`, `Test <Role>`,
/// [`TEST_PASSWORD`], active.
///
/// # Errors
///
/// Returns [`HarnessError::Config`] when the password cannot be hashed.
pub fn make_principal(role: Role, overrides: PrincipalOverrides) -> Result<Principal, HarnessError> {
    let label = role.as_str();
    let password = overrides.password.unwrap_or_else(|| TEST_PASSWORD.to_string());
    let password_hash = hash_password_with_cost(&password, HashCost::Fast)?;
    Ok(Principal {
        username: overrides.username.unwrap_or_else(|| format!("test_{label}")),
        email: overrides.email.unwrap_or_else(|| format!("{label}@test.com")),
        full_name: Some(overrides.full_name.unwrap_or_else(|| format!("Test {}", role.title()))),
        password,
        role,
        is_active: overrides.is_active.unwrap_or(true),
        password_hash,
    })
}

/// Builds the admin principal named by the harness configuration.
///
/// # Errors
///
/// Returns [`HarnessError::Config`] when the password cannot be hashed.
pub fn admin_principal(config: &HarnessConfig) -> Result<Principal, HarnessError> {
    make_principal(
        Role::Admin,
        PrincipalOverrides::default()
            .username(config.admin_username.clone())
            .password(config.admin_password.clone()),
    )
}

/// Inserts `principal` through `session` and returns the stored user.
///
/// # Errors
///
/// Returns [`HarnessError::Store`] when the insert fails, for example on a
/// duplicate username.
pub fn persist_principal(session: &Session, principal: &Principal) -> Result<User, HarnessError> {
    let user = session.unit_of_work(|conn| users::insert_user(conn, &principal.new_user()))?;
    Ok(user)
}

// ============================================================================
// SECTION: Tests
// ============================================================================
