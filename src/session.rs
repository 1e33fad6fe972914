//! Per-account session context.
//!
//! A session is created for a wallet address and can hold at most one
//! master key. The key is written once, on the first successful signature,
//! and only read afterwards. Nothing here is persisted: the next session
//! re-signs the same message and re-derives the same key.
//!
//! Sessions are plain values, so one process can hold several accounts at
//! once (a test harness playing owner and grantee, for instance).

use std::fmt;
use std::sync::OnceLock;

use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::config::SealdriveConfig;
use crate::error::{Result, SealdriveError};
use crate::external::WalletSigner;
use crate::keys::{derive_key_from_signature, SymmetricKey};
use crate::provider::CryptoProvider;

struct SessionSecret {
    signature: Zeroizing<String>,
    master_key: SymmetricKey,
}

pub struct Session {
    address: String,
    secret: OnceLock<SessionSecret>,
}

impl Session {
    /// A session for `address` with no master key yet. Public files and
    /// password links are usable in this state.
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            secret: OnceLock::new(),
        }
    }

    /// Ask the signer for its address and open a session for it.
    pub fn connect(signer: &dyn WalletSigner) -> Result<Self> {
        Ok(Self::new(signer.address()?))
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Sign the fixed session message and derive the master key.
    ///
    /// Returns immediately if the session already holds a key. If the
    /// wallet declines, the session stays without a key and the error is
    /// returned as is; there is nothing to roll back.
    pub fn sign_in(
        &self,
        signer: &dyn WalletSigner,
        provider: &dyn CryptoProvider,
        config: &SealdriveConfig,
    ) -> Result<()> {
        if self.secret.get().is_some() {
            return Ok(());
        }

        let signature = match signer.sign(&config.sign_message) {
            Ok(signature) => Zeroizing::new(signature),
            Err(err) => {
                warn!(address = %self.address, error = %err, "session signature not obtained");
                return Err(err);
            }
        };
        self.install(provider, config, signature)
    }

    /// Sign in with a signature obtained elsewhere (a recipient pasting the
    /// signature they produced in their own wallet, for instance).
    pub fn sign_in_with_signature(
        &self,
        signature: &str,
        provider: &dyn CryptoProvider,
        config: &SealdriveConfig,
    ) -> Result<()> {
        if self.secret.get().is_some() {
            return Ok(());
        }
        self.install(provider, config, Zeroizing::new(signature.to_string()))
    }

    fn install(
        &self,
        provider: &dyn CryptoProvider,
        config: &SealdriveConfig,
        signature: Zeroizing<String>,
    ) -> Result<()> {
        // The empty signature derives a key anyone can compute.
        if signature.is_empty() {
            warn!(address = %self.address, "empty session signature refused");
            return Err(SealdriveError::SigningDeclined);
        }
        let master_key = derive_key_from_signature(provider, config, &signature, "")?;
        // A concurrent sign-in may have won the race; derivation is
        // deterministic, so the stored key is identical either way.
        let _ = self.secret.set(SessionSecret {
            signature,
            master_key,
        });
        debug!(address = %self.address, "session master key ready");
        Ok(())
    }

    pub fn is_signed_in(&self) -> bool {
        self.secret.get().is_some()
    }

    pub fn master_key(&self) -> Result<&SymmetricKey> {
        self.secret
            .get()
            .map(|s| &s.master_key)
            .ok_or(SealdriveError::NoSession)
    }

    /// The session signature. A recipient hands this to a sharer so the
    /// sharer can wrap a file key for them.
    pub fn signature(&self) -> Result<&str> {
        self.secret
            .get()
            .map(|s| s.signature.as_str())
            .ok_or(SealdriveError::NoSession)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("address", &self.address)
            .field("signed_in", &self.is_signed_in())
            .finish()
    }
}
