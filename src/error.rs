//! Error types for sealdrive.
//!
//! Each variant is a distinct failure mode. Messages are intentionally
//! minimal: they say *what* failed without echoing key bytes, signatures,
//! passwords or plaintext.

/// The single error type for all sealdrive operations.
#[derive(Debug, thiserror::Error)]
pub enum SealdriveError {
    /// The wallet refused (or was unable) to sign the session message.
    /// No master key exists for the session afterwards.
    #[error("signing declined")]
    SigningDeclined,

    /// AEAD tag verification failed: wrong key, corrupted blob, or tampering.
    /// This is the only signal of a wrong key.
    #[error("cannot decrypt: authentication failed")]
    Authentication,

    /// A key or wrapped blob had malformed encoding or the wrong length.
    #[error("invalid key material: {0}")]
    InvalidKeyMaterial(String),

    /// A download limit or expiry was exceeded. Raised by access-checking
    /// collaborators, never by the crypto core itself.
    #[error("policy violation: {0}")]
    PolicyViolation(String),

    /// The AEAD seal operation was rejected (oversized input).
    #[error("encryption failed")]
    Encryption,

    /// The platform random source failed to produce bytes.
    #[error("randomness source failed")]
    Randomness,

    /// PBKDF2 parameters were rejected.
    #[error("key derivation failed")]
    KeyDerivation,

    /// An operation needed a master key but the session never signed in.
    #[error("no signed-in session")]
    NoSession,

    /// A ledger record violates its invariants.
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("not found: {0}")]
    NotFound(String),

    /// Only the owner of a file may share or delete it.
    #[error("caller does not own the file")]
    NotOwner,

    #[error("payload of {size} bytes exceeds the {limit} byte limit")]
    PayloadTooLarge { size: u64, limit: u64 },

    /// A blob store or ledger collaborator failed.
    #[error("storage error: {0}")]
    Storage(String),

    #[error("configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, SealdriveError>;
