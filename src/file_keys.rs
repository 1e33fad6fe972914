//! Per-file key lifecycle.
//!
//! Every file gets its own random key, independent of every other file's
//! key. Payloads are never encrypted here; that is `crypto`'s job.
//!
//! A wrapped key is the *exported* (base64) key string, encrypted under an
//! account key and base64-encoded again for ledger storage:
//!
//! ```text
//! wrapped = base64( nonce || AES-GCM(account_key, utf8(export(file_key))) || tag )
//! ```
//!
//! The owner's `wrappedKey` and a grantee's `wrappedKeyForGrantee` share
//! this format, so one account key opens both.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use zeroize::Zeroizing;

use crate::crypto;
use crate::error::{Result, SealdriveError};
use crate::keys::SymmetricKey;
use crate::provider::{CryptoProvider, KEY_LEN, NONCE_LEN, TAG_LEN};

/// Length of an exported key string (base64 of 32 bytes).
pub const EXPORTED_KEY_LEN: usize = 44;

/// Decoded length of every wrapped key blob.
pub const WRAPPED_KEY_BLOB_LEN: usize = NONCE_LEN + EXPORTED_KEY_LEN + TAG_LEN;

/// A fresh random 256-bit file key.
pub fn generate_file_key(provider: &dyn CryptoProvider) -> Result<SymmetricKey> {
    let mut bytes = Zeroizing::new([0u8; KEY_LEN]);
    provider.random_bytes(&mut bytes[..])?;
    Ok(SymmetricKey::from_bytes(*bytes))
}

pub fn export_key(key: &SymmetricKey) -> String {
    key.export()
}

pub fn import_key(encoded: &str) -> Result<SymmetricKey> {
    SymmetricKey::import(encoded)
}

/// Encrypt `file_key` under `wrapping_key` for storage on the ledger.
pub fn wrap_file_key(
    provider: &dyn CryptoProvider,
    wrapping_key: &SymmetricKey,
    file_key: &SymmetricKey,
) -> Result<String> {
    let exported = Zeroizing::new(file_key.export());
    wrap_exported_key(provider, wrapping_key, &exported)
}

/// Wrap an already exported key string. The string is validated first so a
/// malformed export never reaches the ledger.
pub(crate) fn wrap_exported_key(
    provider: &dyn CryptoProvider,
    wrapping_key: &SymmetricKey,
    exported: &str,
) -> Result<String> {
    SymmetricKey::import(exported)?;
    let blob = crypto::encrypt(provider, wrapping_key, exported.as_bytes())?;
    Ok(BASE64.encode(blob))
}

/// Inverse of [`wrap_file_key`].
///
/// Malformed base64 or a blob of the wrong length is
/// [`SealdriveError::InvalidKeyMaterial`]; a wrong account key is
/// [`SealdriveError::Authentication`].
pub fn unwrap_file_key(
    provider: &dyn CryptoProvider,
    wrapping_key: &SymmetricKey,
    wrapped: &str,
) -> Result<SymmetricKey> {
    let blob = BASE64
        .decode(wrapped.trim())
        .map_err(|e| SealdriveError::InvalidKeyMaterial(e.to_string()))?;
    if blob.len() != WRAPPED_KEY_BLOB_LEN {
        return Err(SealdriveError::InvalidKeyMaterial(format!(
            "wrapped key has {} bytes, expected {}",
            blob.len(),
            WRAPPED_KEY_BLOB_LEN
        )));
    }
    let exported = Zeroizing::new(crypto::decrypt(provider, wrapping_key, &blob)?);
    let exported = std::str::from_utf8(&exported)
        .map_err(|_| SealdriveError::InvalidKeyMaterial("wrapped key is not utf-8".into()))?;
    SymmetricKey::import(exported)
}
