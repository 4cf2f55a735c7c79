// crates/remediation-core/src/secrets.rs
// ============================================================================
// Module: Secret Sealing
// Description: Encrypt-at-rest for secret-bearing record fields.
// Purpose: Keep SSH keys and API keys out of storage in plaintext.
// Dependencies: chacha20poly1305, base64, rand
// ============================================================================

//! ## Overview
//! [`SecretSealer`] is the seam for at-rest encryption. The bundled
//! [`XChaChaSealer`] produces `v1:<base64url(nonce || ciphertext)>` strings
//! using XChaCha20-Poly1305 with a random 24-byte nonce per value.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chacha20poly1305::Key;
use chacha20poly1305::XChaCha20Poly1305;
use chacha20poly1305::XNonce;
use chacha20poly1305::aead::Aead;
use chacha20poly1305::aead::KeyInit;
use rand::RngCore;
use rand::rngs::OsRng;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Key length in bytes.
pub const SEALER_KEY_BYTES: usize = 32;
/// Nonce length in bytes.
const NONCE_BYTES: usize = 24;
/// Version prefix of sealed values.
const SEALED_PREFIX: &str = "v1:";

// ============================================================================
// SECTION: Types
// ============================================================================

/// Sealed secret as stored. Only ever holds ciphertext.
#[derive(Clone, PartialEq, Eq)]
pub struct SealedSecret(String);

impl SealedSecret {
    /// Wraps a sealed value loaded from storage.
    #[must_use]
    pub const fn from_stored(value: String) -> Self {
        Self(value)
    }

    /// Returns the sealed value for storage.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SealedSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SealedSecret").field(&"<sealed>").finish()
    }
}

/// Secret sealing errors.
#[derive(Debug, Error)]
pub enum SecretError {
    /// Key material was malformed.
    #[error("invalid sealing key: {0}")]
    InvalidKey(String),
    /// Sealed value was malformed.
    #[error("malformed sealed secret")]
    Malformed,
    /// Authentication tag mismatch or wrong key.
    #[error("sealed secret failed authentication")]
    Unauthentic,
    /// Encryption failed.
    #[error("secret sealing failed")]
    Seal,
}

// ============================================================================
// SECTION: Traits
// ============================================================================

/// Encrypt-at-rest collaborator for secret-bearing fields.
pub trait SecretSealer: Send + Sync {
    /// Seals a plaintext secret.
    ///
    /// # Errors
    ///
    /// Returns [`SecretError`] when sealing fails.
    fn seal(&self, plaintext: &str) -> Result<SealedSecret, SecretError>;

    /// Opens a sealed secret.
    ///
    /// # Errors
    ///
    /// Returns [`SecretError`] when the value is malformed or unauthentic.
    fn open(&self, sealed: &SealedSecret) -> Result<String, SecretError>;
}

// ============================================================================
// SECTION: XChaCha20-Poly1305
// ============================================================================

/// XChaCha20-Poly1305 sealer.
#[derive(Clone)]
pub struct XChaChaSealer {
    /// Keyed cipher.
    cipher: XChaCha20Poly1305,
}

impl XChaChaSealer {
    /// Builds a sealer from raw key bytes.
    #[must_use]
    pub fn from_key(key: &[u8; SEALER_KEY_BYTES]) -> Self {
        Self {
            cipher: XChaCha20Poly1305::new(Key::from_slice(key)),
        }
    }

    /// Builds a sealer from a standard base64 encoded 32-byte key.
    ///
    /// # Errors
    ///
    /// Returns [`SecretError::InvalidKey`] when decoding fails or the length is wrong.
    pub fn from_base64(encoded: &str) -> Result<Self, SecretError> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|err| SecretError::InvalidKey(err.to_string()))?;
        let key: [u8; SEALER_KEY_BYTES] = bytes.try_into().map_err(|_| {
            SecretError::InvalidKey(format!("key must be {SEALER_KEY_BYTES} bytes"))
        })?;
        Ok(Self::from_key(&key))
    }

    /// Builds a sealer with a fresh random key. The key is not recoverable.
    #[must_use]
    pub fn ephemeral() -> Self {
        let mut key = [0u8; SEALER_KEY_BYTES];
        OsRng.fill_bytes(&mut key);
        Self::from_key(&key)
    }
}

impl SecretSealer for XChaChaSealer {
    fn seal(&self, plaintext: &str) -> Result<SealedSecret, SecretError> {
        let mut nonce = [0u8; NONCE_BYTES];
        OsRng.fill_bytes(&mut nonce);
        let ciphertext = self
            .cipher
            .encrypt(XNonce::from_slice(&nonce), plaintext.as_bytes())
            .map_err(|_| SecretError::Seal)?;
        let mut payload = Vec::with_capacity(NONCE_BYTES + ciphertext.len());
        payload.extend_from_slice(&nonce);
        payload.extend_from_slice(&ciphertext);
        Ok(SealedSecret(format!("{SEALED_PREFIX}{}", URL_SAFE_NO_PAD.encode(payload))))
    }

    fn open(&self, sealed: &SealedSecret) -> Result<String, SecretError> {
        let encoded = sealed.as_str().strip_prefix(SEALED_PREFIX).ok_or(SecretError::Malformed)?;
        let payload = URL_SAFE_NO_PAD.decode(encoded).map_err(|_| SecretError::Malformed)?;
        if payload.len() <= NONCE_BYTES {
            return Err(SecretError::Malformed);
        }
        let (nonce, ciphertext) = payload.split_at(NONCE_BYTES);
        let plaintext = self
            .cipher
            .decrypt(XNonce::from_slice(nonce), ciphertext)
            .map_err(|_| SecretError::Unauthentic)?;
        String::from_utf8(plaintext).map_err(|_| SecretError::Malformed)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================
