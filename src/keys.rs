//! Key material and signature-based key derivation.
//!
//! This module owns two responsibilities:
//! 1. Holding raw 256-bit keys in a type that is opaque, non-cloneable and
//!    zeroised on drop, with a lossless portable string form.
//! 2. Deriving an account's master key from a wallet signature.
//!
//! ## Derivation structure
//!
//! ```text
//! ikm = SHA-256( utf8(signature || salt) )
//! key = PBKDF2-HMAC-SHA256(
//!     secret     = ikm,
//!     salt       = app_salt,          // "decentradrive-salt-v1"
//!     iterations = pbkdf2_iterations, // 100_000
//! )
//! ```
//!
//! The derivation is deterministic. Re-signing the fixed session message
//! yields the same signature and so the same key every session: there is
//! no rotation and no forward secrecy, and anyone holding the signature
//! can derive the key. Wrapped keys already on the ledger depend on this.

use std::fmt;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::config::SealdriveConfig;
use crate::error::{Result, SealdriveError};
use crate::provider::{CryptoProvider, KEY_LEN};

// ---------------------------------------------------------------------------
// Symmetric key
// ---------------------------------------------------------------------------

/// A raw AES-256 key: a per-file key or an account's derived master key.
///
/// - Not `Clone`. Duplicating key material takes an explicit export.
/// - Zeroised on drop.
/// - `Debug` never prints the bytes.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct SymmetricKey {
    bytes: [u8; KEY_LEN],
}

impl SymmetricKey {
    pub fn from_bytes(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Build a key from a slice that must be exactly 32 bytes long.
    pub fn from_slice(data: &[u8]) -> Result<Self> {
        let bytes: [u8; KEY_LEN] = data.try_into().map_err(|_| {
            SealdriveError::InvalidKeyMaterial(format!(
                "expected {} key bytes, got {}",
                KEY_LEN,
                data.len()
            ))
        })?;
        Ok(Self { bytes })
    }

    /// Borrow the raw bytes for cipher operations.
    ///
    /// `pub(crate)`: raw bytes never leave the crate except through `export`.
    pub(crate) fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    /// Portable form: standard base64 of the raw 32 bytes.
    pub fn export(&self) -> String {
        BASE64.encode(self.bytes)
    }

    /// Inverse of [`SymmetricKey::export`], byte-exact.
    pub fn import(encoded: &str) -> Result<Self> {
        let decoded = Zeroizing::new(
            BASE64
                .decode(encoded.trim())
                .map_err(|e| SealdriveError::InvalidKeyMaterial(e.to_string()))?,
        );
        Self::from_slice(&decoded)
    }

    /// Constant-time equality.
    pub fn ct_eq(&self, other: &Self) -> bool {
        self.bytes[..].ct_eq(&other.bytes[..]).into()
    }
}

impl PartialEq for SymmetricKey {
    fn eq(&self, other: &Self) -> bool {
        self.ct_eq(other)
    }
}

impl Eq for SymmetricKey {}

impl fmt::Debug for SymmetricKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("SymmetricKey(<redacted>)")
    }
}

// ---------------------------------------------------------------------------
// Derivation
// ---------------------------------------------------------------------------

/// Derive an account key from a wallet signature.
///
/// `salt` is appended to the signature before hashing; the session master
/// key and every share wrap use the empty salt.
pub fn derive_key_from_signature(
    provider: &dyn CryptoProvider,
    config: &SealdriveConfig,
    signature: &str,
    salt: &str,
) -> Result<SymmetricKey> {
    let mut input = Zeroizing::new(String::with_capacity(signature.len() + salt.len()));
    input.push_str(signature);
    input.push_str(salt);

    let ikm = Zeroizing::new(provider.digest(input.as_bytes()));

    let mut derived = Zeroizing::new([0u8; KEY_LEN]);
    provider.pbkdf2(
        config.pbkdf2_iterations,
        config.app_salt.as_bytes(),
        &ikm[..],
        &mut derived,
    )?;

    tracing::debug!(
        iterations = config.pbkdf2_iterations,
        "derived account key from signature"
    );
    Ok(SymmetricKey::from_bytes(*derived))
}
