// crates/remediation-core/src/password.rs
// ============================================================================
// Module: Password Hashing
// Description: One-way Argon2id password hashing and verification.
// Purpose: Guarantee stored credentials are never plaintext.
// Dependencies: argon2, rand
// ============================================================================

//! ## Overview
//! Passwords are hashed into PHC strings (`$argon2id$v=19$...`). Verification
//! reads the cost parameters from the stored string, so hashes produced with
//! [`HashCost::Fast`] verify exactly like [`HashCost::Standard`] ones.
//! Verification never errors: a malformed stored hash simply does not match.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use argon2::Algorithm;
use argon2::Argon2;
use argon2::Params;
use argon2::PasswordHasher;
use argon2::PasswordVerifier;
use argon2::Version;
use argon2::password_hash::SaltString;
use rand::rngs::OsRng;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Memory cost (KiB) for [`HashCost::Fast`].
const FAST_MEMORY_KIB: u32 = 4 * 1024;
/// Iteration count for [`HashCost::Fast`].
const FAST_ITERATIONS: u32 = 1;
/// Maximum accepted plaintext length in bytes.
pub const MAX_PASSWORD_BYTES: usize = 1024;

// ============================================================================
// SECTION: Types
// ============================================================================

/// Stored one-way password hash in PHC string form.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Wraps a PHC string loaded from storage.
    #[must_use]
    pub const fn from_stored(value: String) -> Self {
        Self(value)
    }

    /// Returns the PHC string for storage.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PasswordHash").field(&"<argon2id>").finish()
    }
}

/// Cost profile for new hashes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HashCost {
    /// Library defaults (production).
    #[default]
    Standard,
    /// Reduced memory and time cost for test fixtures.
    Fast,
}

/// Password hashing errors.
#[derive(Debug, Error)]
pub enum PasswordError {
    /// Plaintext exceeded [`MAX_PASSWORD_BYTES`].
    #[error("password exceeds {MAX_PASSWORD_BYTES} bytes")]
    TooLong,
    /// Underlying hasher failure.
    #[error("password hashing failed: {0}")]
    Hash(String),
}

// ============================================================================
// SECTION: Hashing
// ============================================================================

/// Hashes a plaintext password with production cost.
///
/// # Errors
///
/// Returns [`PasswordError`] when the plaintext is too long or hashing fails.
pub fn hash_password(plaintext: &str) -> Result<PasswordHash, PasswordError> {
    hash_password_with_cost(plaintext, HashCost::Standard)
}

/// Hashes a plaintext password with an explicit cost profile.
///
/// # Errors
///
/// Returns [`PasswordError`] when the plaintext is too long or hashing fails.
pub fn hash_password_with_cost(
    plaintext: &str,
    cost: HashCost,
) -> Result<PasswordHash, PasswordError> {
    if plaintext.len() > MAX_PASSWORD_BYTES {
        return Err(PasswordError::TooLong);
    }
    let hasher = hasher_for(cost)?;
    let salt = SaltString::generate(&mut OsRng);
    let hash = hasher
        .hash_password(plaintext.as_bytes(), &salt)
        .map_err(|err| PasswordError::Hash(err.to_string()))?;
    Ok(PasswordHash(hash.to_string()))
}

/// Returns true when `plaintext` matches the stored hash.
#[must_use]
pub fn verify_password(plaintext: &str, hash: &PasswordHash) -> bool {
    if plaintext.len() > MAX_PASSWORD_BYTES {
        return false;
    }
    let Ok(parsed) = argon2::PasswordHash::new(hash.as_str()) else {
        return false;
    };
    Argon2::default().verify_password(plaintext.as_bytes(), &parsed).is_ok()
}

/// Builds an Argon2id hasher for `cost`.
fn hasher_for(cost: HashCost) -> Result<Argon2<'static>, PasswordError> {
    match cost {
        HashCost::Standard => Ok(Argon2::default()),
        HashCost::Fast => {
            let params = Params::new(FAST_MEMORY_KIB, FAST_ITERATIONS, 1, None)
                .map_err(|err| PasswordError::Hash(err.to_string()))?;
            Ok(Argon2::new(Algorithm::Argon2id, Version::V0x13, params))
        }
    }
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

    use super::HashCost;
    use super::PasswordHash;
    use super::hash_password;
    use super::hash_password_with_cost;
    use super::verify_password;

    #[test]
    fn hash_is_never_the_plaintext() {
        let hash = hash_password("TestPassword123!").unwrap();
        assert_ne!(hash.as_str(), "TestPassword123!");
        assert!(hash.as_str().starts_with("$argon2id$"));
        assert!(verify_password("TestPassword123!", &hash));
        assert!(!verify_password("WrongPassword", &hash));
    }

    #[test]
    fn fast_cost_hash_verifies() {
        let hash = hash_password_with_cost("TestPassw0rd!", HashCost::Fast).unwrap();
        assert!(verify_password("TestPassw0rd!", &hash));
    }

    #[test]
    fn salts_differ_between_hashes() {
        let first = hash_password_with_cost("same", HashCost::Fast).unwrap();
        let second = hash_password_with_cost("same", HashCost::Fast).unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn malformed_stored_hash_never_matches() {
        let hash = PasswordHash::from_stored("plaintext-password".to_string());
        assert!(!verify_password("plaintext-password", &hash));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(8))]

        #[test]
        fn only_the_original_plaintext_verifies(
            password in "[ -~]{1,32}",
            other in "[ -~]{1,32}",
        ) {
            let hash = hash_password_with_cost(&password, HashCost::Fast).unwrap();
            prop_assert!(verify_password(&password, &hash));
            prop_assert_eq!(verify_password(&other, &hash), other == password);
        }
    }
}
