//! The two sharing flows.
//!
//! **Address-based re-encryption.** The owner unwraps the file key, then
//! re-wraps the exported key under a key derived from the *recipient's*
//! signature over the session message. The recipient has to hand that
//! signature over first; there is no path that encrypts to a recipient who
//! never acts. Re-encryption preserves the key: the grantee recovers the
//! same raw key the owner holds.
//!
//! **Password links.** Nothing is re-encrypted. A random (or owner-chosen)
//! password is hashed with unsalted SHA-256 and only the hash is stored.
//! Without a salt, equal passwords on two links hash identically and a
//! low-entropy password is guessable from its hash. Download limits and
//! expiry are checked by whatever component enforces access, not here.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use subtle::ConstantTimeEq;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::config::SealdriveConfig;
use crate::error::{Result, SealdriveError};
use crate::file_keys;
use crate::keys::{derive_key_from_signature, SymmetricKey};
use crate::provider::{CryptoProvider, DIGEST_LEN};

/// Characters a generated password is drawn from (70 symbols).
pub const PASSWORD_ALPHABET: &[u8] =
    b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*";

/// Largest multiple of the alphabet size that fits in a byte. Bytes at or
/// above it are discarded so every index stays uniform.
const REJECTION_BOUND: usize = 256 - (256 % PASSWORD_ALPHABET.len());

/// Refills of the random pool before a source that keeps producing
/// rejected bytes is treated as broken.
const MAX_REFILL_ROUNDS: usize = 64;

// ---------------------------------------------------------------------------
// Address-based re-encryption
// ---------------------------------------------------------------------------

/// Wrap an exported file key for the account that produced
/// `recipient_signature`.
pub fn re_encrypt_key_for_user(
    provider: &dyn CryptoProvider,
    config: &SealdriveConfig,
    raw_file_key_exported: &str,
    recipient_signature: &str,
) -> Result<String> {
    let recipient_key = derive_key_from_signature(provider, config, recipient_signature, "")?;
    let wrapped = file_keys::wrap_exported_key(provider, &recipient_key, raw_file_key_exported)?;
    debug!("re-encrypted file key for recipient");
    Ok(wrapped)
}

/// Recover the raw file key from a grant, using the grantee's own signature.
pub fn decrypt_re_encrypted_key(
    provider: &dyn CryptoProvider,
    config: &SealdriveConfig,
    wrapped_key_for_grantee: &str,
    grantee_signature: &str,
) -> Result<SymmetricKey> {
    let grantee_key = derive_key_from_signature(provider, config, grantee_signature, "")?;
    file_keys::unwrap_file_key(provider, &grantee_key, wrapped_key_for_grantee)
}

// ---------------------------------------------------------------------------
// Password links
// ---------------------------------------------------------------------------

/// Draw `length` characters uniformly and independently from
/// [`PASSWORD_ALPHABET`].
///
/// Fails with [`SealdriveError::Randomness`] if the provider keeps
/// returning bytes that all fall outside the sampling range.
pub fn generate_random_password(provider: &dyn CryptoProvider, length: usize) -> Result<String> {
    let mut password = String::with_capacity(length);
    let mut pool = Zeroizing::new(vec![0u8; length.max(16)]);
    let mut rounds = 0;

    while password.len() < length {
        if rounds == MAX_REFILL_ROUNDS {
            warn!(length, "random source produced no usable password bytes");
            return Err(SealdriveError::Randomness);
        }
        rounds += 1;
        provider.random_bytes(&mut pool[..])?;
        for &byte in pool.iter() {
            if password.len() == length {
                break;
            }
            let byte = byte as usize;
            if byte < REJECTION_BOUND {
                password.push(PASSWORD_ALPHABET[byte % PASSWORD_ALPHABET.len()] as char);
            }
        }
    }

    Ok(password)
}

/// One-way, deterministic, unsalted: `base64(SHA-256(utf8(password)))`.
pub fn hash_password(provider: &dyn CryptoProvider, password: &str) -> String {
    BASE64.encode(provider.digest(password.as_bytes()))
}

/// Compare a candidate password against a stored hash in constant time.
///
/// Provided for access-checking collaborators; nothing in this crate gates
/// downloads on it.
pub fn verify_password(provider: &dyn CryptoProvider, password: &str, stored_hash: &str) -> bool {
    let Ok(stored) = BASE64.decode(stored_hash.trim()) else {
        return false;
    };
    if stored.len() != DIGEST_LEN {
        return false;
    }
    let candidate = provider.digest(password.as_bytes());
    candidate[..].ct_eq(&stored[..]).into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::file_keys::{export_key, generate_file_key};
    use crate::provider::RingProvider;

    fn fast_config() -> SealdriveConfig {
        SealdriveConfig {
            pbkdf2_iterations: 3,
            ..SealdriveConfig::default()
        }
    }

    #[test]
    fn test_alphabet_has_seventy_distinct_symbols() {
        let mut sorted = PASSWORD_ALPHABET.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), 70);
        assert_eq!(REJECTION_BOUND, 210);
    }

    #[test]
    fn test_share_roundtrip_preserves_key() {
        let provider = RingProvider::new();
        let config = fast_config();
        let file_key = generate_file_key(&provider).unwrap();

        let wrapped =
            re_encrypt_key_for_user(&provider, &config, &export_key(&file_key), "0xgrantee")
                .unwrap();
        let recovered =
            decrypt_re_encrypted_key(&provider, &config, &wrapped, "0xgrantee").unwrap();
        assert_eq!(recovered, file_key);
    }

    #[test]
    fn test_other_signature_cannot_open_grant() {
        let provider = RingProvider::new();
        let config = fast_config();
        let file_key = generate_file_key(&provider).unwrap();

        let wrapped =
            re_encrypt_key_for_user(&provider, &config, &export_key(&file_key), "0xgrantee")
                .unwrap();
        assert!(matches!(
            decrypt_re_encrypted_key(&provider, &config, &wrapped, "0xintruder"),
            Err(SealdriveError::Authentication)
        ));
    }

    #[test]
    fn test_short_grant_is_invalid_key_material() {
        let provider = RingProvider::new();
        let config = fast_config();
        assert!(matches!(
            decrypt_re_encrypted_key(&provider, &config, "AAAA", "0xgrantee"),
            Err(SealdriveError::InvalidKeyMaterial(_))
        ));
    }

    #[test]
    fn test_re_encrypt_rejects_malformed_export() {
        let provider = RingProvider::new();
        let config = fast_config();
        assert!(matches!(
            re_encrypt_key_for_user(&provider, &config, "not a key", "0xgrantee"),
            Err(SealdriveError::InvalidKeyMaterial(_))
        ));
    }

    #[test]
    fn test_generated_password_shape() {
        let provider = RingProvider::new();
        for length in [1, 12, 64] {
            let password = generate_random_password(&provider, length).unwrap();
            assert_eq!(password.chars().count(), length);
            assert!(password.bytes().all(|b| PASSWORD_ALPHABET.contains(&b)));
        }
        assert!(generate_random_password(&provider, 0).unwrap().is_empty());
    }

    /// Real primitives, but every random byte is above the sampling range.
    struct SaturatedRng(RingProvider);

    impl CryptoProvider for SaturatedRng {
        fn random_bytes(&self, out: &mut [u8]) -> Result<()> {
            out.fill(0xFF);
            Ok(())
        }

        fn aead_encrypt(&self, key: &[u8; 32], nonce: &[u8; 12], pt: &[u8]) -> Result<Vec<u8>> {
            self.0.aead_encrypt(key, nonce, pt)
        }

        fn aead_decrypt(&self, key: &[u8; 32], nonce: &[u8; 12], ct: &[u8]) -> Result<Vec<u8>> {
            self.0.aead_decrypt(key, nonce, ct)
        }

        fn digest(&self, data: &[u8]) -> [u8; DIGEST_LEN] {
            self.0.digest(data)
        }

        fn pbkdf2(
            &self,
            iterations: u32,
            salt: &[u8],
            secret: &[u8],
            out: &mut [u8; 32],
        ) -> Result<()> {
            self.0.pbkdf2(iterations, salt, secret, out)
        }
    }

    #[test]
    fn test_password_generation_gives_up_on_unusable_randomness() {
        let provider = SaturatedRng(RingProvider::new());
        assert!(matches!(
            generate_random_password(&provider, 12),
            Err(SealdriveError::Randomness)
        ));
        assert!(generate_random_password(&provider, 0).unwrap().is_empty());
    }

    #[test]
    fn test_generated_passwords_differ() {
        let provider = RingProvider::new();
        let a = generate_random_password(&provider, 12).unwrap();
        let b = generate_random_password(&provider, 12).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_hash_password_known_vector() {
        let provider = RingProvider::new();
        // base64(SHA-256("abc"))
        assert_eq!(
            hash_password(&provider, "abc"),
            "ungWv48Bz+pBQUDeXa4iI7ADYaOWF3qctBD/YfIAFa0="
        );
    }

    #[test]
    fn test_hash_password_sensitivity() {
        let provider = RingProvider::new();
        let stored = hash_password(&provider, "abc123");
        assert_eq!(stored, hash_password(&provider, "abc123"));
        assert_ne!(stored, hash_password(&provider, "abc124"));
    }

    #[test]
    fn test_verify_password() {
        let provider = RingProvider::new();
        let stored = hash_password(&provider, "abc123");
        assert!(verify_password(&provider, "abc123", &stored));
        assert!(!verify_password(&provider, "abc124", &stored));
        assert!(!verify_password(&provider, "abc123", "garbage"));
    }
}
