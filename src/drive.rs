//! Upload, download and sharing flows over a blob store and a ledger.
//!
//! `Drive` wires the key-management pieces to the collaborators:
//!
//! - **upload**: public payloads go to the blob store as is. Private
//!   payloads get a fresh file key, are encrypted before they leave the
//!   process, and the key is stored wrapped under the owner's master key.
//! - **share by address**: the owner unwraps the file key and re-wraps it
//!   for the grantee's signature.
//! - **share by password**: only the password hash reaches the ledger.
//!
//! Enforcing expiry, revocation and download counts is the ledger's job.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tracing::{debug, info};
use zeroize::Zeroizing;

use crate::audit::{AuditEvent, AuditLog, AuditRecord, AuditSink};
use crate::config::SealdriveConfig;
use crate::crypto;
use crate::error::{Result, SealdriveError};
use crate::external::{BlobStore, Ledger, WalletSigner};
use crate::file_keys;
use crate::keys::SymmetricKey;
use crate::provider::{CryptoProvider, RingProvider};
use crate::record::{FileId, FileRecord, LinkId, PasswordLink, ShareGrant, NO_EXPIRY};
use crate::session::Session;
use crate::share;

const SECONDS_PER_DAY: u64 = 24 * 60 * 60;

/// Current unix time in seconds.
pub fn unix_now() -> u64 {
    Utc::now().timestamp().max(0) as u64
}

/// Absolute expiry `days` from `now`; zero days means never.
pub fn expires_in_days(now: u64, days: u64) -> u64 {
    if days == 0 {
        NO_EXPIRY
    } else {
        now.saturating_add(days.saturating_mul(SECONDS_PER_DAY))
    }
}

/// A file about to be uploaded.
#[derive(Debug, Clone)]
pub struct NewUpload<'a> {
    pub folder_id: u64,
    pub file_name: String,
    pub mime_type: String,
    pub thumbnail_pointer: Option<String>,
    pub is_private: bool,
    pub content: &'a [u8],
}

/// A freshly created password link. `password` must reach the recipient
/// out of band; it is not recorded anywhere.
pub struct IssuedLink {
    pub link_id: LinkId,
    pub password: Zeroizing<String>,
    pub link: PasswordLink,
}

pub struct Drive<S, L> {
    provider: Arc<dyn CryptoProvider>,
    config: SealdriveConfig,
    blobs: S,
    ledger: L,
    audit: Mutex<AuditLog>,
}

impl<S: BlobStore, L: Ledger> Drive<S, L> {
    pub fn new(blobs: S, ledger: L) -> Self {
        Self {
            provider: Arc::new(RingProvider::new()),
            config: SealdriveConfig::default(),
            blobs,
            ledger,
            audit: Mutex::new(AuditLog::new()),
        }
    }

    pub fn with_provider(mut self, provider: Arc<dyn CryptoProvider>) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_config(mut self, config: SealdriveConfig) -> Result<Self> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    pub fn provider(&self) -> &dyn CryptoProvider {
        self.provider.as_ref()
    }

    pub fn config(&self) -> &SealdriveConfig {
        &self.config
    }

    pub fn blobs(&self) -> &S {
        &self.blobs
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    /// Sign `session` in with this drive's provider and config.
    pub fn sign_in(&self, session: &Session, signer: &dyn WalletSigner) -> Result<()> {
        session.sign_in(signer, self.provider(), &self.config)
    }

    pub fn add_audit_sink(&self, sink: Box<dyn AuditSink>) {
        self.audit_log().add_forward_sink(sink);
    }

    pub fn audit_records(&self) -> Vec<AuditRecord> {
        self.audit_log().snapshot()
    }

    fn audit_log(&self) -> MutexGuard<'_, AuditLog> {
        self.audit.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // -----------------------------------------------------------------------
    // Upload / download
    // -----------------------------------------------------------------------

    /// Store a file and record it on the ledger.
    ///
    /// Private uploads need a signed-in session; without one they fail with
    /// [`SealdriveError::NoSession`] before anything is stored.
    pub fn upload(&self, session: &Session, upload: NewUpload<'_>) -> Result<FileId> {
        let size = upload.content.len() as u64;
        if size > self.config.max_upload_bytes {
            return Err(SealdriveError::PayloadTooLarge {
                size,
                limit: self.config.max_upload_bytes,
            });
        }

        let (content_pointer, wrapped_key) = if upload.is_private {
            let master = session.master_key()?;
            let file_key = file_keys::generate_file_key(self.provider())?;
            let ciphertext = crypto::encrypt(self.provider(), &file_key, upload.content)?;
            let wrapped = file_keys::wrap_file_key(self.provider(), master, &file_key)?;
            (self.blobs.put(&ciphertext)?, wrapped)
        } else {
            (self.blobs.put(upload.content)?, String::new())
        };

        let record = FileRecord {
            file_id: 0,
            owner_address: session.address().to_string(),
            folder_id: upload.folder_id,
            file_name: upload.file_name,
            content_pointer,
            size_bytes: size,
            mime_type: upload.mime_type,
            thumbnail_pointer: upload.thumbnail_pointer,
            created_at: unix_now(),
            is_deleted: false,
            is_private: upload.is_private,
            wrapped_key,
        };
        let file_id = self.ledger.record_file(record)?;

        info!(
            file_id,
            owner = %session.address(),
            size_bytes = size,
            private = upload.is_private,
            "file uploaded"
        );
        self.audit_log()
            .append(AuditRecord::now(AuditEvent::Uploaded, file_id, session.address()));
        Ok(file_id)
    }

    /// Fetch a file's plaintext.
    ///
    /// Public files need no session. Private files open for the owner
    /// through `wrappedKey`, and for grantees through their grant.
    pub fn download(&self, session: Option<&Session>, file_id: FileId) -> Result<Vec<u8>> {
        let file = self.live_file(file_id)?;
        let blob = self.blobs.get(&file.content_pointer)?;
        if !file.is_private {
            return Ok(blob);
        }

        let session = session.ok_or(SealdriveError::NoSession)?;
        let file_key = self.file_key_for(session, &file)?;
        let plaintext = crypto::decrypt(self.provider(), &file_key, &blob)?;
        debug!(file_id, reader = %session.address(), "private file decrypted");
        Ok(plaintext)
    }

    /// Recover the raw key of a private file for `session`, as owner or
    /// as grantee.
    pub fn file_key_for(&self, session: &Session, file: &FileRecord) -> Result<SymmetricKey> {
        if !file.is_private {
            return Err(SealdriveError::InvalidRecord("public files have no key".into()));
        }
        let master = session.master_key()?;
        if file.is_owned_by(session.address()) {
            return file_keys::unwrap_file_key(self.provider(), master, &file.wrapped_key);
        }

        let grant = self
            .ledger
            .share_grant(file.file_id, session.address())?
            .ok_or_else(|| {
                SealdriveError::NotFound(format!(
                    "grant on file {} for {}",
                    file.file_id,
                    session.address()
                ))
            })?;
        file_keys::unwrap_file_key(self.provider(), master, &grant.wrapped_key_for_grantee)
    }

    // -----------------------------------------------------------------------
    // Sharing
    // -----------------------------------------------------------------------

    /// Grant `grantee_address` access to a file.
    ///
    /// Private files need the grantee's signature over the session message;
    /// without it the share fails with [`SealdriveError::SigningDeclined`].
    /// Public files get a grant with an empty wrapped key.
    pub fn share_with_address(
        &self,
        owner: &Session,
        file_id: FileId,
        grantee_address: &str,
        grantee_signature: Option<&str>,
        expires_at: u64,
    ) -> Result<ShareGrant> {
        let file = self.owned_file(owner, file_id)?;

        let wrapped_key_for_grantee = if file.is_private {
            let signature = grantee_signature
                .filter(|s| !s.is_empty())
                .ok_or(SealdriveError::SigningDeclined)?;
            let file_key =
                file_keys::unwrap_file_key(self.provider(), owner.master_key()?, &file.wrapped_key)?;
            let exported = Zeroizing::new(file_keys::export_key(&file_key));
            share::re_encrypt_key_for_user(self.provider(), &self.config, &exported, signature)?
        } else {
            String::new()
        };

        let grant = ShareGrant {
            file_id,
            grantee_address: grantee_address.to_string(),
            wrapped_key_for_grantee,
            expires_at,
        };
        self.ledger.add_share_grant(grant.clone())?;

        info!(file_id, grantee = %grantee_address, expires_at, "file shared");
        self.audit_log().append(
            AuditRecord::now(AuditEvent::Shared, file_id, owner.address())
                .with_counterparty(grantee_address),
        );
        Ok(grant)
    }

    /// Create a password-gated link. A password is generated when the
    /// owner does not supply one.
    pub fn create_password_link(
        &self,
        owner: &Session,
        file_id: FileId,
        password: Option<&str>,
        max_downloads: u64,
        expires_at: u64,
    ) -> Result<IssuedLink> {
        self.owned_file(owner, file_id)?;

        let password = match password {
            Some("") => {
                return Err(SealdriveError::InvalidRecord("empty link password".into()));
            }
            Some(chosen) => Zeroizing::new(chosen.to_string()),
            None => Zeroizing::new(share::generate_random_password(
                self.provider(),
                self.config.password_length,
            )?),
        };

        let link = PasswordLink::new(
            file_id,
            share::hash_password(self.provider(), &password),
            max_downloads,
            expires_at,
        );
        let link_id = self.ledger.add_password_link(link.clone())?;

        info!(file_id, link_id, max_downloads, expires_at, "password link created");
        self.audit_log().append(AuditRecord::now(
            AuditEvent::PasswordLinkCreated,
            file_id,
            owner.address(),
        ));
        Ok(IssuedLink {
            link_id,
            password,
            link,
        })
    }

    /// Soft-delete a file. The ledger entry remains.
    pub fn delete(&self, owner: &Session, file_id: FileId) -> Result<()> {
        self.owned_file(owner, file_id)?;
        self.ledger.mark_deleted(file_id)?;
        info!(file_id, "file deleted");
        self.audit_log()
            .append(AuditRecord::now(AuditEvent::Deleted, file_id, owner.address()));
        Ok(())
    }

    fn live_file(&self, file_id: FileId) -> Result<FileRecord> {
        match self.ledger.file(file_id)? {
            Some(file) if !file.is_deleted => Ok(file),
            _ => Err(SealdriveError::NotFound(format!("file {}", file_id))),
        }
    }

    fn owned_file(&self, owner: &Session, file_id: FileId) -> Result<FileRecord> {
        let file = self.live_file(file_id)?;
        if !file.is_owned_by(owner.address()) {
            return Err(SealdriveError::NotOwner);
        }
        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::external::{MemoryBlobStore, MemoryLedger};

    fn drive() -> Drive<MemoryBlobStore, MemoryLedger> {
        Drive::new(MemoryBlobStore::new(), MemoryLedger::new())
            .with_config(SealdriveConfig {
                pbkdf2_iterations: 2,
                max_upload_bytes: 64,
                ..SealdriveConfig::default()
            })
            .unwrap()
    }

    fn signed_in(drive: &Drive<MemoryBlobStore, MemoryLedger>, address: &str, sig: &str) -> Session {
        let session = Session::new(address);
        session
            .sign_in_with_signature(sig, drive.provider(), drive.config())
            .unwrap();
        session
    }

    fn upload<'a>(content: &'a [u8], is_private: bool) -> NewUpload<'a> {
        NewUpload {
            folder_id: 0,
            file_name: "hello.txt".into(),
            mime_type: "text/plain".into(),
            thumbnail_pointer: None,
            is_private,
            content,
        }
    }

    #[test]
    fn test_expires_in_days() {
        assert_eq!(expires_in_days(1_000, 0), NO_EXPIRY);
        assert_eq!(expires_in_days(1_000, 2), 1_000 + 2 * 86_400);
    }

    #[test]
    fn test_public_upload_stores_plaintext() {
        let drive = drive();
        let session = Session::new("0xowner");
        let id = drive.upload(&session, upload(b"hello", false)).unwrap();

        let record = drive.ledger().file(id).unwrap().unwrap();
        assert!(record.wrapped_key.is_empty());
        assert_eq!(drive.blobs().get(&record.content_pointer).unwrap(), b"hello");
        assert_eq!(drive.download(None, id).unwrap(), b"hello");
    }

    #[test]
    fn test_private_upload_needs_session_key() {
        let drive = drive();
        let session = Session::new("0xowner");
        assert!(matches!(
            drive.upload(&session, upload(b"hello", true)),
            Err(SealdriveError::NoSession)
        ));
        assert!(drive.blobs().is_empty().unwrap());
    }

    #[test]
    fn test_upload_limit() {
        let drive = drive();
        let session = Session::new("0xowner");
        let big = vec![0u8; 65];
        assert!(matches!(
            drive.upload(&session, upload(&big, false)),
            Err(SealdriveError::PayloadTooLarge { size: 65, limit: 64 })
        ));
    }

    #[test]
    fn test_private_upload_hides_content() {
        let drive = drive();
        let owner = signed_in(&drive, "0xowner", "0xsig-owner");
        let id = drive.upload(&owner, upload(b"hello", true)).unwrap();

        let record = drive.ledger().file(id).unwrap().unwrap();
        assert!(record.is_private);
        let stored = drive.blobs().get(&record.content_pointer).unwrap();
        assert_ne!(stored, b"hello");
        assert_eq!(drive.download(Some(&owner), id).unwrap(), b"hello");
    }

    #[test]
    fn test_only_owner_shares_and_deletes() {
        let drive = drive();
        let owner = signed_in(&drive, "0xowner", "0xsig-owner");
        let other = signed_in(&drive, "0xother", "0xsig-other");
        let id = drive.upload(&owner, upload(b"hello", true)).unwrap();

        assert!(matches!(
            drive.share_with_address(&other, id, "0xthird", Some("0xsig-third"), NO_EXPIRY),
            Err(SealdriveError::NotOwner)
        ));
        assert!(matches!(
            drive.delete(&other, id),
            Err(SealdriveError::NotOwner)
        ));
        assert!(matches!(
            drive.create_password_link(&other, id, None, 0, NO_EXPIRY),
            Err(SealdriveError::NotOwner)
        ));
    }

    #[test]
    fn test_private_share_requires_grantee_signature() {
        let drive = drive();
        let owner = signed_in(&drive, "0xowner", "0xsig-owner");
        let id = drive.upload(&owner, upload(b"hello", true)).unwrap();
        assert!(matches!(
            drive.share_with_address(&owner, id, "0xgrantee", None, NO_EXPIRY),
            Err(SealdriveError::SigningDeclined)
        ));
    }

    #[test]
    fn test_deleted_file_is_gone_for_readers() {
        let drive = drive();
        let owner = Session::new("0xowner");
        let id = drive.upload(&owner, upload(b"hello", false)).unwrap();
        drive.delete(&owner, id).unwrap();

        assert!(drive.ledger().file(id).unwrap().unwrap().is_deleted);
        assert!(matches!(
            drive.download(None, id),
            Err(SealdriveError::NotFound(_))
        ));
    }

    #[test]
    fn test_password_link_stores_hash_only() {
        let drive = drive();
        let owner = Session::new("0xowner");
        let id = drive.upload(&owner, upload(b"hello", false)).unwrap();

        let issued = drive
            .create_password_link(&owner, id, None, 1, NO_EXPIRY)
            .unwrap();
        assert_eq!(issued.password.len(), 12);

        let stored = drive.ledger().password_link(issued.link_id).unwrap().unwrap();
        assert_ne!(stored.password_hash, *issued.password);
        assert!(share::verify_password(
            drive.provider(),
            &issued.password,
            &stored.password_hash
        ));
        assert_eq!(stored.used_downloads, 0);
        assert!(matches!(
            drive.create_password_link(&owner, id, Some(""), 1, NO_EXPIRY),
            Err(SealdriveError::InvalidRecord(_))
        ));
    }

    #[test]
    fn test_audit_trail_follows_operations() {
        let drive = drive();
        let owner = Session::new("0xowner");
        let id = drive.upload(&owner, upload(b"hello", false)).unwrap();
        drive
            .share_with_address(&owner, id, "0xgrantee", None, NO_EXPIRY)
            .unwrap();
        drive.delete(&owner, id).unwrap();

        let events: Vec<_> = drive.audit_records().iter().map(|r| r.event).collect();
        assert_eq!(
            events,
            vec![AuditEvent::Uploaded, AuditEvent::Shared, AuditEvent::Deleted]
        );
    }
}
