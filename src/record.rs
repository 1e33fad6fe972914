//! Ledger-held metadata: files, grants and password links.
//!
//! Field names serialize in the ledger's camelCase layout. The crate never
//! decides how these are stored, only what they must contain.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SealdriveError};
use crate::file_keys::WRAPPED_KEY_BLOB_LEN;
use crate::provider::DIGEST_LEN;

/// Ledger-assigned file identifier.
pub type FileId = u64;

/// Ledger-assigned password link identifier.
pub type LinkId = u64;

/// `expiresAt` value meaning "never expires".
pub const NO_EXPIRY: u64 = 0;

/// `maxDownloads` value meaning "unlimited".
pub const UNLIMITED_DOWNLOADS: u64 = 0;

/// Wallet addresses compare case-insensitively (checksummed hex).
pub fn same_address(a: &str, b: &str) -> bool {
    a.eq_ignore_ascii_case(b)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub file_id: FileId,
    pub owner_address: String,
    pub folder_id: u64,
    pub file_name: String,
    pub content_pointer: String,
    pub size_bytes: u64,
    pub mime_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thumbnail_pointer: Option<String>,
    pub created_at: u64,
    pub is_deleted: bool,
    pub is_private: bool,
    /// Non-empty iff `is_private`.
    pub wrapped_key: String,
}

impl FileRecord {
    pub fn is_owned_by(&self, address: &str) -> bool {
        same_address(&self.owner_address, address)
    }

    /// Check the structural invariants. Whether `wrapped_key` really opens
    /// under the owner's key can only be checked by the owner.
    pub fn validate(&self) -> Result<()> {
        if self.owner_address.is_empty() {
            return Err(SealdriveError::InvalidRecord("missing owner address".into()));
        }
        if self.file_name.is_empty() {
            return Err(SealdriveError::InvalidRecord("missing file name".into()));
        }
        if self.content_pointer.is_empty() {
            return Err(SealdriveError::InvalidRecord("missing content pointer".into()));
        }
        match (self.is_private, self.wrapped_key.is_empty()) {
            (true, true) => Err(SealdriveError::InvalidRecord(
                "private file without a wrapped key".into(),
            )),
            (false, false) => Err(SealdriveError::InvalidRecord(
                "public file carries a wrapped key".into(),
            )),
            (true, false) => validate_wrapped_key(&self.wrapped_key),
            (false, true) => Ok(()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareGrant {
    pub file_id: FileId,
    pub grantee_address: String,
    /// Empty for grants on public files, which need no key.
    pub wrapped_key_for_grantee: String,
    pub expires_at: u64,
}

impl ShareGrant {
    /// Check the grant against the file it points at.
    pub fn validate_for(&self, file: &FileRecord) -> Result<()> {
        if self.file_id != file.file_id {
            return Err(SealdriveError::InvalidRecord("grant targets another file".into()));
        }
        if self.grantee_address.is_empty() {
            return Err(SealdriveError::InvalidRecord("missing grantee address".into()));
        }
        if file.is_private {
            validate_wrapped_key(&self.wrapped_key_for_grantee)
        } else if self.wrapped_key_for_grantee.is_empty() {
            Ok(())
        } else {
            Err(SealdriveError::InvalidRecord(
                "grant on a public file carries a wrapped key".into(),
            ))
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordLink {
    pub file_id: FileId,
    pub password_hash: String,
    pub max_downloads: u64,
    /// Advanced by the access-enforcing collaborator, never by this crate.
    pub used_downloads: u64,
    pub expires_at: u64,
}

impl PasswordLink {
    pub fn new(file_id: FileId, password_hash: String, max_downloads: u64, expires_at: u64) -> Self {
        Self {
            file_id,
            password_hash,
            max_downloads,
            used_downloads: 0,
            expires_at,
        }
    }

    pub fn validate(&self) -> Result<()> {
        let digest = BASE64
            .decode(&self.password_hash)
            .map_err(|_| SealdriveError::InvalidRecord("password hash is not base64".into()))?;
        if digest.len() != DIGEST_LEN {
            return Err(SealdriveError::InvalidRecord(
                "password hash is not a SHA-256 digest".into(),
            ));
        }
        Ok(())
    }
}

fn validate_wrapped_key(wrapped: &str) -> Result<()> {
    let blob = BASE64
        .decode(wrapped)
        .map_err(|e| SealdriveError::InvalidKeyMaterial(e.to_string()))?;
    if blob.len() != WRAPPED_KEY_BLOB_LEN {
        return Err(SealdriveError::InvalidKeyMaterial(format!(
            "wrapped key has {} bytes",
            blob.len()
        )));
    }
    Ok(())
}
