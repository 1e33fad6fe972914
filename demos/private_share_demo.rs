//! Private upload, address share and password link on in-memory stores.
//!
//! Run with: `cargo run --example private_share_demo`
//! Set `RUST_LOG=sealdrive=debug` to see the key lifecycle events.
//!
//! The audit trail is written as JSON lines to the temp directory.

use sealdrive::audit::FileAuditSink;
use sealdrive::drive::{expires_in_days, unix_now};
use sealdrive::external::{MemoryBlobStore, MemoryLedger, WalletSigner};
use sealdrive::record::UNLIMITED_DOWNLOADS;
use sealdrive::share::verify_password;
use sealdrive::{Drive, NewUpload, Session};
use tracing_subscriber::EnvFilter;

/// Stand-in wallet: the signature is a function of address and message.
struct DemoWallet(&'static str);

impl WalletSigner for DemoWallet {
    fn address(&self) -> sealdrive::Result<String> {
        Ok(self.0.to_string())
    }

    fn sign(&self, message: &str) -> sealdrive::Result<String> {
        Ok(format!("0xdemo:{}:{}", self.0, message))
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let drive = Drive::new(MemoryBlobStore::new(), MemoryLedger::new());

    let audit_path = std::env::temp_dir().join("sealdrive_audit.jsonl");
    drive.add_audit_sink(Box::new(FileAuditSink::new(&audit_path)?));

    // 1. Owner and recipient each sign the session message once.
    let alice_wallet = DemoWallet("0xA11CE");
    let bob_wallet = DemoWallet("0xB0B");
    let alice = Session::connect(&alice_wallet)?;
    let bob = Session::connect(&bob_wallet)?;
    drive.sign_in(&alice, &alice_wallet)?;
    drive.sign_in(&bob, &bob_wallet)?;

    // 2. Alice uploads a private file. Only ciphertext reaches the blob store.
    let file_id = drive.upload(
        &alice,
        NewUpload {
            folder_id: 0,
            file_name: "notes.txt".into(),
            mime_type: "text/plain".into(),
            thumbnail_pointer: None,
            is_private: true,
            content: b"meet at the usual place",
        },
    )?;
    println!("alice uploaded file {}", file_id);

    // 3. Alice shares with Bob for a week, wrapping the key for his signature.
    let expires_at = expires_in_days(unix_now(), 7);
    drive.share_with_address(&alice, file_id, bob.address(), Some(bob.signature()?), expires_at)?;
    let content = drive.download(Some(&bob), file_id)?;
    println!("bob reads: {}", String::from_utf8_lossy(&content));

    // 4. A password link with a generated password.
    let issued = drive.create_password_link(&alice, file_id, None, UNLIMITED_DOWNLOADS, expires_at)?;
    println!(
        "link {} password {} verifies: {}",
        issued.link_id,
        issued.password.as_str(),
        verify_password(drive.provider(), &issued.password, &issued.link.password_hash)
    );

    println!("audit trail: {}", audit_path.display());
    for record in drive.audit_records() {
        println!("  {:?} file={} actor={}", record.event, record.file_id, record.actor);
    }
    Ok(())
}
