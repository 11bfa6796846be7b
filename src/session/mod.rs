// src/session/mod.rs
//
// Encrypted persistence for the dashboard login. The session file is small
// and short-lived, but it is still a credential: it goes to disk sealed
// with AES-256-GCM under a key that never sits next to it.
pub mod keys;
pub mod manager;

use std::path::{Path, PathBuf};

use aes_gcm::aead::{Aead, AeadCore, KeyInit, OsRng};
use aes_gcm::{Aes256Gcm, Key, Nonce};
use tracing::{debug, info};

use crate::config::Config;
use crate::supplier::models::SessionState;
use crate::utils::error::VaultError;
use keys::KeyProvider;

pub use manager::SessionManager;

const NONCE_LEN: usize = 12;
const TAG_LEN: usize = 16;

/// Sealed file store for the login session.
///
/// On-disk layout: `nonce (12) || tag (16) || ciphertext`. Any mismatch
/// between key, nonce, tag and ciphertext surfaces as `VaultError::Crypto`;
/// the file carries nothing that distinguishes tampering from a key change.
pub struct SessionVault {
    path: PathBuf,
    provider: Box<dyn KeyProvider>,
}

impl SessionVault {
    pub fn open(cfg: &Config) -> Self {
        SessionVault {
            path: cfg.vault_path(),
            provider: keys::provider_for(cfg.key_strategy),
        }
    }

    pub fn with_parts(path: PathBuf, provider: Box<dyn KeyProvider>) -> Self {
        SessionVault { path, provider }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Seals the state to disk and returns the path it was written to.
    pub fn save(&self, state: &SessionState) -> Result<PathBuf, VaultError> {
        let plaintext = serde_json::to_vec(state)?;

        let key = self.provider.key()?;
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let sealed = cipher
            .encrypt(&nonce, plaintext.as_slice())
            .map_err(|_| VaultError::Crypto)?;

        // The AEAD hands back ciphertext || tag; the file keeps the tag up
        // front next to the nonce.
        let (ciphertext, tag) = sealed.split_at(sealed.len().saturating_sub(TAG_LEN));
        let mut out = Vec::with_capacity(NONCE_LEN + TAG_LEN + ciphertext.len());
        out.extend_from_slice(&nonce);
        out.extend_from_slice(tag);
        out.extend_from_slice(ciphertext);

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, &out)?;
        info!(
            "Session saved to {} ({} cookies)",
            self.path.display(),
            state.cookies.len()
        );
        Ok(self.path.clone())
    }

    pub fn load(&self) -> Result<SessionState, VaultError> {
        if !self.path.exists() {
            return Err(VaultError::NotFound);
        }
        let raw = std::fs::read(&self.path)?;
        if raw.len() < NONCE_LEN + TAG_LEN {
            debug!("Vault file is too short to hold a session");
            return Err(VaultError::Crypto);
        }
        let (nonce, rest) = raw.split_at(NONCE_LEN);
        let (tag, ciphertext) = rest.split_at(TAG_LEN);
        let mut sealed = Vec::with_capacity(ciphertext.len() + TAG_LEN);
        sealed.extend_from_slice(ciphertext);
        sealed.extend_from_slice(tag);

        let key = self.provider.key()?;
        let cipher = Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&key));
        let plaintext = cipher
            .decrypt(Nonce::from_slice(nonce), sealed.as_slice())
            .map_err(|_| VaultError::Crypto)?;
        Ok(serde_json::from_slice(&plaintext)?)
    }

    /// Removes the stored session, if any.
    pub fn clear(&self) -> Result<(), VaultError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => {
                info!("Session file removed");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
