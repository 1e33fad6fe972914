//! Tunable parameters for key derivation and sharing.
//!
//! Defaults reproduce the deployed application exactly. Changing
//! `sign_message`, `app_salt` or `pbkdf2_iterations` changes every derived
//! key, so existing wrapped keys would no longer open.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Result, SealdriveError};

pub const DEFAULT_SIGN_MESSAGE: &str = "Sign to derive encryption key";
pub const DEFAULT_APP_SALT: &str = "decentradrive-salt-v1";
pub const DEFAULT_PBKDF2_ITERATIONS: u32 = 100_000;
pub const DEFAULT_PASSWORD_LENGTH: usize = 12;
pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 100 * 1024 * 1024;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SealdriveConfig {
    /// The fixed, human-readable message every account signs once per session.
    pub sign_message: String,
    /// Application-wide PBKDF2 salt.
    pub app_salt: String,
    pub pbkdf2_iterations: u32,
    /// Length of generated link passwords.
    pub password_length: usize,
    pub max_upload_bytes: u64,
}

impl Default for SealdriveConfig {
    fn default() -> Self {
        Self {
            sign_message: DEFAULT_SIGN_MESSAGE.to_string(),
            app_salt: DEFAULT_APP_SALT.to_string(),
            pbkdf2_iterations: DEFAULT_PBKDF2_ITERATIONS,
            password_length: DEFAULT_PASSWORD_LENGTH,
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

impl SealdriveConfig {
    /// Parse and validate a JSON config. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| SealdriveError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())
            .map_err(|e| SealdriveError::Config(e.to_string()))?;
        Self::from_json_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if self.pbkdf2_iterations == 0 {
            return Err(SealdriveError::Config(
                "pbkdf2_iterations must be at least 1".into(),
            ));
        }
        if self.password_length == 0 {
            return Err(SealdriveError::Config(
                "password_length must be at least 1".into(),
            ));
        }
        if self.sign_message.is_empty() {
            return Err(SealdriveError::Config("sign_message must not be empty".into()));
        }
        if self.pbkdf2_iterations < DEFAULT_PBKDF2_ITERATIONS {
            warn!(
                iterations = self.pbkdf2_iterations,
                recommended = DEFAULT_PBKDF2_ITERATIONS,
                "pbkdf2 iterations below the deployed value; derived keys will not match production"
            );
        }
        Ok(())
    }
}
