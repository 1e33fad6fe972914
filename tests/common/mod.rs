//! Shared fakes for integration tests.
#![allow(dead_code)]

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use sealdrive::external::{MemoryBlobStore, MemoryLedger, WalletSigner};
use sealdrive::provider::{CryptoProvider, RingProvider, DIGEST_LEN, KEY_LEN, NONCE_LEN};
use sealdrive::{Drive, NewUpload, Result, SealdriveConfig, SealdriveError, Session};

/// Real primitives, reproducible randomness: every request for bytes is
/// served from `SHA-256(seed || counter)` blocks.
pub struct SeededProvider {
    inner: RingProvider,
    seed: u64,
    counter: AtomicU64,
}

impl SeededProvider {
    pub fn new(seed: u64) -> Self {
        Self {
            inner: RingProvider::new(),
            seed,
            counter: AtomicU64::new(0),
        }
    }
}

impl CryptoProvider for SeededProvider {
    fn random_bytes(&self, out: &mut [u8]) -> Result<()> {
        for chunk in out.chunks_mut(DIGEST_LEN) {
            let n = self.counter.fetch_add(1, Ordering::SeqCst);
            let mut input = self.seed.to_le_bytes().to_vec();
            input.extend_from_slice(&n.to_le_bytes());
            let block = self.inner.digest(&input);
            chunk.copy_from_slice(&block[..chunk.len()]);
        }
        Ok(())
    }

    fn aead_encrypt(
        &self,
        key: &[u8; KEY_LEN],
        nonce: &[u8; NONCE_LEN],
        plaintext: &[u8],
    ) -> Result<Vec<u8>> {
        self.inner.aead_encrypt(key, nonce, plaintext)
    }

    fn aead_decrypt(
        &self,
        key: &[u8; KEY_LEN],
        nonce: &[u8; NONCE_LEN],
        ciphertext: &[u8],
    ) -> Result<Vec<u8>> {
        self.inner.aead_decrypt(key, nonce, ciphertext)
    }

    fn digest(&self, data: &[u8]) -> [u8; DIGEST_LEN] {
        self.inner.digest(data)
    }

    fn pbkdf2(
        &self,
        iterations: u32,
        salt: &[u8],
        secret: &[u8],
        out: &mut [u8; KEY_LEN],
    ) -> Result<()> {
        self.inner.pbkdf2(iterations, salt, secret, out)
    }
}

/// A wallet whose signature is a pure function of address and message,
/// like a deterministic ECDSA signer. `declining` refuses every request.
pub struct TestSigner {
    pub address: String,
    pub declining: bool,
}

impl TestSigner {
    pub fn new(address: &str) -> Self {
        Self {
            address: address.to_string(),
            declining: false,
        }
    }

    pub fn declining(address: &str) -> Self {
        Self {
            address: address.to_string(),
            declining: true,
        }
    }
}

impl WalletSigner for TestSigner {
    fn address(&self) -> Result<String> {
        Ok(self.address.clone())
    }

    fn sign(&self, message: &str) -> Result<String> {
        if self.declining {
            return Err(SealdriveError::SigningDeclined);
        }
        Ok(format!("0xsig:{}:{}", self.address.to_lowercase(), message))
    }
}

/// Default config with a cheap PBKDF2 so tests stay fast.
pub fn fast_config() -> SealdriveConfig {
    SealdriveConfig {
        pbkdf2_iterations: 10,
        ..SealdriveConfig::default()
    }
}

pub fn new_drive() -> Drive<MemoryBlobStore, MemoryLedger> {
    Drive::new(MemoryBlobStore::new(), MemoryLedger::new())
        .with_provider(Arc::new(RingProvider::new()))
        .with_config(fast_config())
        .unwrap()
}

/// Connect and sign in an account on `drive`.
pub fn sign_in(drive: &Drive<MemoryBlobStore, MemoryLedger>, address: &str) -> (Session, TestSigner) {
    let signer = TestSigner::new(address);
    let session = Session::connect(&signer).unwrap();
    drive.sign_in(&session, &signer).unwrap();
    (session, signer)
}

pub fn text_upload<'a>(name: &str, content: &'a [u8], is_private: bool) -> NewUpload<'a> {
    NewUpload {
        folder_id: 0,
        file_name: name.to_string(),
        mime_type: "text/plain".to_string(),
        thumbnail_pointer: None,
        is_private,
        content,
    }
}
