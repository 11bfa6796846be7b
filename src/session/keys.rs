// src/session/keys.rs
//
// Where the vault's AES key comes from. Desktop machines keep it in the OS
// keyring; headless boxes without a secret service derive it from stable
// machine identity instead.
use aes_gcm::aead::rand_core::RngCore;
use aes_gcm::aead::OsRng;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use crate::config::KeyStrategy;
use crate::utils::error::VaultError;

pub const KEY_LEN: usize = 32;

const KEYRING_SERVICE: &str = "fleet-reporter";
const KEYRING_ENTRY: &str = "aes-key";
const MACHINE_SALT: &str = "fleet-reporter-session-vault-v1";

pub trait KeyProvider: Send + Sync {
    /// 32-byte AES-256 key. Providers may mint and persist one on first use.
    fn key(&self) -> Result<[u8; KEY_LEN], VaultError>;
}

pub fn provider_for(strategy: KeyStrategy) -> Box<dyn KeyProvider> {
    match strategy {
        KeyStrategy::Keyring => Box::new(KeyringProvider),
        KeyStrategy::Machine => Box::new(MachineKeyProvider),
    }
}

/// Key held in the OS keyring, hex-encoded. Generated on first use.
pub struct KeyringProvider;

impl KeyProvider for KeyringProvider {
    fn key(&self) -> Result<[u8; KEY_LEN], VaultError> {
        let entry = keyring::Entry::new(KEYRING_SERVICE, KEYRING_ENTRY)
            .map_err(|e| VaultError::Key(e.to_string()))?;
        match entry.get_password() {
            Ok(stored) => decode_key(&stored),
            Err(keyring::Error::NoEntry) => {
                debug!("No vault key in the keyring yet, generating one");
                let mut key = [0u8; KEY_LEN];
                OsRng.fill_bytes(&mut key);
                entry
                    .set_password(&hex::encode(key))
                    .map_err(|e| VaultError::Key(e.to_string()))?;
                Ok(key)
            }
            Err(e) => Err(VaultError::Key(e.to_string())),
        }
    }
}

/// Key derived from machine identity. Weaker than the keyring (anyone on
/// the machine can derive it) but works where no secret service runs, and
/// the session it protects expires on its own anyway.
pub struct MachineKeyProvider;

impl KeyProvider for MachineKeyProvider {
    fn key(&self) -> Result<[u8; KEY_LEN], VaultError> {
        let mut hasher = Sha256::new();
        hasher.update(MACHINE_SALT.as_bytes());
        hasher.update(machine_identity().as_bytes());
        Ok(hasher.finalize().into())
    }
}

fn machine_identity() -> String {
    for path in ["/etc/machine-id", "/var/lib/dbus/machine-id"] {
        if let Ok(id) = std::fs::read_to_string(path) {
            let id = id.trim();
            if !id.is_empty() {
                return id.to_string();
            }
        }
    }
    warn!("No machine-id available, deriving the vault key from the hostname");
    std::env::var("HOSTNAME")
        .or_else(|_| std::env::var("COMPUTERNAME"))
        .unwrap_or_else(|_| "fleet-reporter-host".to_string())
}

fn decode_key(stored: &str) -> Result<[u8; KEY_LEN], VaultError> {
    let bytes = hex::decode(stored.trim())
        .map_err(|e| VaultError::Key(format!("stored key is not hex: {}", e)))?;
    <[u8; KEY_LEN]>::try_from(bytes.as_slice())
        .map_err(|_| VaultError::Key(format!("stored key is {} bytes, want {}", bytes.len(), KEY_LEN)))
}
