//! # sealdrive
//!
//! Client-side key management for files whose bytes live in a public,
//! content-addressed blob store and whose metadata lives on a public
//! ledger.
//!
//! Private payloads are encrypted under a per-file AES-256-GCM key before
//! they leave the client. The file key is only ever written to the ledger
//! wrapped under the owner's master key, which is derived from a wallet
//! signature over a fixed message. No server holds a secret.
//!
//! Two sharing paths exist:
//! - **by address**: the file key is re-wrapped for the recipient's own
//!   signature-derived key ([`share::re_encrypt_key_for_user`]);
//! - **by password**: only an unsalted SHA-256 of the password is stored
//!   ([`share::hash_password`]); who can decrypt does not change.
//!
//! ## Public API
//!
//! [`Drive`] runs the full upload/download/share flows over a
//! [`external::BlobStore`] and an [`external::Ledger`]. The lower-level
//! modules are public so each operation can be used on its own.

pub mod audit;
pub mod config;
pub mod crypto;
pub mod drive;
pub mod error;
pub mod external;
pub mod file_keys;
pub mod keys;
pub mod provider;
pub mod record;
pub mod session;
pub mod share;

pub use config::SealdriveConfig;
pub use drive::{Drive, IssuedLink, NewUpload};
pub use error::{Result, SealdriveError};
pub use keys::SymmetricKey;
pub use provider::{CryptoProvider, RingProvider};
pub use record::{FileId, FileRecord, LinkId, PasswordLink, ShareGrant};
pub use session::Session;

/// Generate a fresh per-file key with the system RNG.
pub fn generate_file_key() -> Result<SymmetricKey> {
    file_keys::generate_file_key(&RingProvider::new())
}
