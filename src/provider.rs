//! Platform crypto capability interface.
//!
//! Every primitive the crate needs is reached through [`CryptoProvider`]:
//! secure random bytes, AES-256-GCM seal/open, SHA-256 and PBKDF2. The
//! default [`RingProvider`] is the only place in the crate that imports
//! `ring`. Tests substitute a provider with a seeded RNG so outputs are
//! reproducible while the real primitives stay in place.

use std::num::NonZeroU32;

use ring::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM};
use ring::digest;
use ring::pbkdf2;
use ring::rand::{SecureRandom, SystemRandom};

use crate::error::{Result, SealdriveError};

/// Size of an AES-256 key in bytes.
pub const KEY_LEN: usize = 32;

/// Size of a GCM nonce in bytes (96 bits).
pub const NONCE_LEN: usize = 12;

/// Size of a GCM authentication tag in bytes.
pub const TAG_LEN: usize = 16;

/// Size of a SHA-256 digest in bytes.
pub const DIGEST_LEN: usize = 32;

/// The narrow set of primitives the core depends on.
pub trait CryptoProvider: Send + Sync {
    /// Fill `out` from a cryptographically secure source.
    fn random_bytes(&self, out: &mut [u8]) -> Result<()>;

    /// AES-256-GCM seal. Returns `ciphertext || tag`.
    fn aead_encrypt(
        &self,
        key: &[u8; KEY_LEN],
        nonce: &[u8; NONCE_LEN],
        plaintext: &[u8],
    ) -> Result<Vec<u8>>;

    /// AES-256-GCM open of `ciphertext || tag`. All or nothing.
    fn aead_decrypt(
        &self,
        key: &[u8; KEY_LEN],
        nonce: &[u8; NONCE_LEN],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>>;

    /// SHA-256.
    fn digest(&self, data: &[u8]) -> [u8; DIGEST_LEN];

    /// PBKDF2-HMAC-SHA256 producing a 256-bit key.
    fn pbkdf2(
        &self,
        iterations: u32,
        salt: &[u8],
        secret: &[u8],
        out: &mut [u8; KEY_LEN],
    ) -> Result<()>;
}

/// [`CryptoProvider`] backed by `ring` and the operating system RNG.
#[derive(Debug, Clone)]
pub struct RingProvider {
    rng: SystemRandom,
}

impl RingProvider {
    pub fn new() -> Self {
        Self {
            rng: SystemRandom::new(),
        }
    }
}

impl Default for RingProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl CryptoProvider for RingProvider {
    fn random_bytes(&self, out: &mut [u8]) -> Result<()> {
        self.rng.fill(out).map_err(|_| SealdriveError::Randomness)
    }

    fn aead_encrypt(
        &self,
        key: &[u8; KEY_LEN],
        nonce: &[u8; NONCE_LEN],
        plaintext: &[u8],
    ) -> Result<Vec<u8>> {
        let unbound = UnboundKey::new(&AES_256_GCM, key)
            .map_err(|_| SealdriveError::InvalidKeyMaterial("rejected AES-256 key".into()))?;
        let key = LessSafeKey::new(unbound);

        let mut output = Vec::with_capacity(plaintext.len() + TAG_LEN);
        output.extend_from_slice(plaintext);

        let tag = key
            .seal_in_place_separate_tag(
                Nonce::assume_unique_for_key(*nonce),
                Aad::empty(),
                &mut output,
            )
            .map_err(|_| SealdriveError::Encryption)?;
        output.extend_from_slice(tag.as_ref());

        Ok(output)
    }

    fn aead_decrypt(
        &self,
        key: &[u8; KEY_LEN],
        nonce: &[u8; NONCE_LEN],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>> {
        let unbound = UnboundKey::new(&AES_256_GCM, key)
            .map_err(|_| SealdriveError::InvalidKeyMaterial("rejected AES-256 key".into()))?;
        let key = LessSafeKey::new(unbound);

        let mut payload = ciphertext.to_vec();
        let plaintext = key
            .open_in_place(
                Nonce::assume_unique_for_key(*nonce),
                Aad::empty(),
                &mut payload,
            )
            .map_err(|_| SealdriveError::Authentication)?;

        Ok(plaintext.to_vec())
    }

    fn digest(&self, data: &[u8]) -> [u8; DIGEST_LEN] {
        sha256(data)
    }

    fn pbkdf2(
        &self,
        iterations: u32,
        salt: &[u8],
        secret: &[u8],
        out: &mut [u8; KEY_LEN],
    ) -> Result<()> {
        let iterations = NonZeroU32::new(iterations).ok_or(SealdriveError::KeyDerivation)?;
        pbkdf2::derive(pbkdf2::PBKDF2_HMAC_SHA256, iterations, salt, secret, out);
        Ok(())
    }
}

/// SHA-256 for content addressing, independent of any provider instance.
pub(crate) fn sha256(data: &[u8]) -> [u8; DIGEST_LEN] {
    let hash = digest::digest(&digest::SHA256, data);
    let mut out = [0u8; DIGEST_LEN];
    out.copy_from_slice(hash.as_ref());
    out
}
