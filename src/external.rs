//! Collaborators the core talks to: the wallet, the blob store and the
//! ledger.
//!
//! Only the narrow surface the key-management flows need is modelled.
//! The in-memory implementations back tests and demos; production code
//! plugs in a pinning service and a contract client behind the same traits.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::error::{Result, SealdriveError};
use crate::provider::sha256;
use crate::record::{same_address, FileId, FileRecord, LinkId, PasswordLink, ShareGrant};

/// The account's wallet. The sole source of secret input for derivation.
pub trait WalletSigner: Send + Sync {
    fn address(&self) -> Result<String>;

    /// Sign `message`. A refusal must surface as
    /// [`SealdriveError::SigningDeclined`].
    fn sign(&self, message: &str) -> Result<String>;
}

/// Content-addressed byte storage.
pub trait BlobStore: Send + Sync {
    /// Store `bytes` and return a stable pointer to them.
    fn put(&self, bytes: &[u8]) -> Result<String>;

    /// Fetch the byte-exact content behind `pointer`.
    fn get(&self, pointer: &str) -> Result<Vec<u8>>;
}

/// Public metadata store. Writes are taken verbatim; ids are ledger-assigned.
pub trait Ledger: Send + Sync {
    /// Append a file record. The `file_id` of `record` is ignored and the
    /// assigned id returned.
    fn record_file(&self, record: FileRecord) -> Result<FileId>;

    fn file(&self, file_id: FileId) -> Result<Option<FileRecord>>;

    /// Soft delete. The record stays on the ledger.
    fn mark_deleted(&self, file_id: FileId) -> Result<()>;

    /// Add or replace the grant for `(file_id, grantee)`.
    fn add_share_grant(&self, grant: ShareGrant) -> Result<()>;

    fn share_grant(&self, file_id: FileId, grantee_address: &str) -> Result<Option<ShareGrant>>;

    fn add_password_link(&self, link: PasswordLink) -> Result<LinkId>;

    fn password_link(&self, link_id: LinkId) -> Result<Option<PasswordLink>>;
}

// ---------------------------------------------------------------------------
// In-memory blob store
// ---------------------------------------------------------------------------

/// Blob store keyed by the hex SHA-256 of each blob.
#[derive(Debug, Clone, Default)]
pub struct MemoryBlobStore {
    blobs: Arc<RwLock<HashMap<String, Vec<u8>>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.read()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.len()? == 0)
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, HashMap<String, Vec<u8>>>> {
        self.blobs
            .read()
            .map_err(|e| SealdriveError::Storage(format!("failed to acquire read lock: {}", e)))
    }
}

impl BlobStore for MemoryBlobStore {
    fn put(&self, bytes: &[u8]) -> Result<String> {
        let pointer = hex::encode(sha256(bytes));
        let mut blobs = self
            .blobs
            .write()
            .map_err(|e| SealdriveError::Storage(format!("failed to acquire write lock: {}", e)))?;
        blobs.entry(pointer.clone()).or_insert_with(|| bytes.to_vec());
        Ok(pointer)
    }

    fn get(&self, pointer: &str) -> Result<Vec<u8>> {
        self.read()?
            .get(pointer)
            .cloned()
            .ok_or_else(|| SealdriveError::NotFound(format!("blob {}", pointer)))
    }
}

// ---------------------------------------------------------------------------
// In-memory ledger
// ---------------------------------------------------------------------------

/// Ledger kept in process memory. Ids start at 1. Every write is checked
/// against the record invariants before it is accepted.
#[derive(Debug, Clone, Default)]
pub struct MemoryLedger {
    inner: Arc<RwLock<MemoryLedgerInner>>,
}

#[derive(Debug, Default)]
struct MemoryLedgerInner {
    files: HashMap<FileId, FileRecord>,
    /// file_id -> grants, one per grantee
    grants: HashMap<FileId, Vec<ShareGrant>>,
    links: HashMap<LinkId, PasswordLink>,
    next_file_id: FileId,
    next_link_id: LinkId,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, MemoryLedgerInner>> {
        self.inner
            .read()
            .map_err(|e| SealdriveError::Storage(format!("failed to acquire read lock: {}", e)))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, MemoryLedgerInner>> {
        self.inner
            .write()
            .map_err(|e| SealdriveError::Storage(format!("failed to acquire write lock: {}", e)))
    }
}

impl Ledger for MemoryLedger {
    fn record_file(&self, mut record: FileRecord) -> Result<FileId> {
        record.validate()?;
        let mut inner = self.write()?;
        inner.next_file_id += 1;
        let file_id = inner.next_file_id;
        record.file_id = file_id;
        inner.files.insert(file_id, record);
        Ok(file_id)
    }

    fn file(&self, file_id: FileId) -> Result<Option<FileRecord>> {
        Ok(self.read()?.files.get(&file_id).cloned())
    }

    fn mark_deleted(&self, file_id: FileId) -> Result<()> {
        let mut inner = self.write()?;
        let file = inner
            .files
            .get_mut(&file_id)
            .ok_or_else(|| SealdriveError::NotFound(format!("file {}", file_id)))?;
        file.is_deleted = true;
        Ok(())
    }

    fn add_share_grant(&self, grant: ShareGrant) -> Result<()> {
        let mut inner = self.write()?;
        let file = inner
            .files
            .get(&grant.file_id)
            .ok_or_else(|| SealdriveError::NotFound(format!("file {}", grant.file_id)))?;
        grant.validate_for(file)?;

        let grants = inner.grants.entry(grant.file_id).or_default();
        grants.retain(|g| !same_address(&g.grantee_address, &grant.grantee_address));
        grants.push(grant);
        Ok(())
    }

    fn share_grant(&self, file_id: FileId, grantee_address: &str) -> Result<Option<ShareGrant>> {
        Ok(self.read()?.grants.get(&file_id).and_then(|grants| {
            grants
                .iter()
                .find(|g| same_address(&g.grantee_address, grantee_address))
                .cloned()
        }))
    }

    fn add_password_link(&self, link: PasswordLink) -> Result<LinkId> {
        link.validate()?;
        let mut inner = self.write()?;
        if !inner.files.contains_key(&link.file_id) {
            return Err(SealdriveError::NotFound(format!("file {}", link.file_id)));
        }
        inner.next_link_id += 1;
        let link_id = inner.next_link_id;
        inner.links.insert(link_id, link);
        Ok(link_id)
    }

    fn password_link(&self, link_id: LinkId) -> Result<Option<PasswordLink>> {
        Ok(self.read()?.links.get(&link_id).cloned())
    }
}
