//! Symmetric payload encryption.
//!
//! All file payloads and wrapped keys pass through the two functions here.
//!
//! Primitive choices:
//! - **Cipher**: AES-256-GCM (authenticated encryption)
//! - **Nonce**: 96-bit (12 bytes), drawn fresh from the provider on every call
//! - **Key size**: 256 bits (32 bytes)
//!
//! # Blob layout
//! ```text
//! [ nonce (12 bytes) ][ ciphertext ][ GCM tag (16 bytes) ]
//! ```
//! The blob is self-describing; no separate nonce channel exists.

use crate::error::{Result, SealdriveError};
use crate::keys::SymmetricKey;
use crate::provider::{CryptoProvider, NONCE_LEN, TAG_LEN};

/// Encrypt `plaintext` under `key`.
///
/// A new nonce is generated for every call, so encrypting the same
/// plaintext twice yields two different blobs.
pub fn encrypt(
    provider: &dyn CryptoProvider,
    key: &SymmetricKey,
    plaintext: &[u8],
) -> Result<Vec<u8>> {
    let mut nonce = [0u8; NONCE_LEN];
    provider.random_bytes(&mut nonce)?;

    let sealed = provider.aead_encrypt(key.as_bytes(), &nonce, plaintext)?;

    let mut output = Vec::with_capacity(NONCE_LEN + sealed.len());
    output.extend_from_slice(&nonce);
    output.extend_from_slice(&sealed);
    Ok(output)
}

/// Decrypt a blob produced by [`encrypt`].
///
/// A wrong key, a truncated blob and a flipped bit all surface as
/// [`SealdriveError::Authentication`]. No partial plaintext is ever returned.
pub fn decrypt(provider: &dyn CryptoProvider, key: &SymmetricKey, blob: &[u8]) -> Result<Vec<u8>> {
    if blob.len() < NONCE_LEN + TAG_LEN {
        return Err(SealdriveError::Authentication);
    }

    let (nonce_bytes, ciphertext) = blob.split_at(NONCE_LEN);
    let nonce: [u8; NONCE_LEN] = nonce_bytes
        .try_into()
        .map_err(|_| SealdriveError::Authentication)?;

    provider.aead_decrypt(key.as_bytes(), &nonce, ciphertext)
}
