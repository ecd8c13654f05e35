//! Owner key files
//!
//! Each owner key lives in `<dir>/<address>.json` and is used to act as that
//! owner or to co-sign requests for the signature path.

use crate::core::Address;
use crate::crypto::{KeyError, KeyPair};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum KeystoreError {
    #[error("Key not found: {0}")]
    KeyNotFound(Address),
    #[error("Invalid key address: {0}")]
    InvalidAddress(Address),
    #[error("Key file does not match its address: expected {expected}, found {found}")]
    AddressMismatch { expected: Address, found: Address },
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Crypto error: {0}")]
    CryptoError(#[from] KeyError),
}

/// On-disk form of an owner key
#[derive(Debug, Serialize, Deserialize)]
struct KeyFile {
    private_key_hex: String,
    address: Address,
    label: Option<String>,
}

/// A key pair with an optional human label
pub struct OwnerKey {
    key_pair: KeyPair,
    pub label: Option<String>,
}

impl OwnerKey {
    pub fn generate(label: Option<&str>) -> Self {
        Self {
            key_pair: KeyPair::generate(),
            label: label.map(str::to_string),
        }
    }

    /// Import a key from its private key hex
    pub fn from_private_key(private_key_hex: &str) -> Result<Self, KeystoreError> {
        Ok(Self {
            key_pair: KeyPair::from_private_key_hex(private_key_hex)?,
            label: None,
        })
    }

    pub fn address(&self) -> Address {
        self.key_pair.address()
    }

    pub fn public_key(&self) -> String {
        self.key_pair.public_key_hex()
    }

    pub fn key_pair(&self) -> &KeyPair {
        &self.key_pair
    }

    pub fn save(&self, path: &Path) -> Result<(), KeystoreError> {
        let data = KeyFile {
            private_key_hex: self.key_pair.private_key_hex(),
            address: self.address(),
            label: self.label.clone(),
        };

        fs::write(path, serde_json::to_string_pretty(&data)?)?;
        Ok(())
    }

    pub fn load(path: &Path) -> Result<Self, KeystoreError> {
        let json = fs::read_to_string(path)?;
        let data: KeyFile = serde_json::from_str(&json)?;

        let mut key = Self::from_private_key(&data.private_key_hex)?;
        if key.address() != data.address {
            return Err(KeystoreError::AddressMismatch {
                expected: data.address,
                found: key.address(),
            });
        }
        key.label = data.label;
        Ok(key)
    }
}

/// Directory of owner key files
pub struct Keystore {
    keys_dir: PathBuf,
}

impl Keystore {
    pub fn new(keys_dir: &Path) -> Result<Self, KeystoreError> {
        fs::create_dir_all(keys_dir)?;
        Ok(Self {
            keys_dir: keys_dir.to_path_buf(),
        })
    }

    /// Key file for `address`; only alphanumeric addresses name a file
    fn key_path(&self, address: &Address) -> Result<PathBuf, KeystoreError> {
        let name = address.as_str();
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(KeystoreError::InvalidAddress(address.clone()));
        }
        Ok(self.keys_dir.join(format!("{}.json", name)))
    }

    /// Generate and store a new key
    pub fn create(&self, label: Option<&str>) -> Result<OwnerKey, KeystoreError> {
        let key = OwnerKey::generate(label);
        key.save(&self.key_path(&key.address())?)?;
        log::info!("Stored new key {}", key.address());
        Ok(key)
    }

    pub fn load(&self, address: &Address) -> Result<OwnerKey, KeystoreError> {
        let path = self.key_path(address)?;
        if !path.exists() {
            return Err(KeystoreError::KeyNotFound(address.clone()));
        }
        OwnerKey::load(&path)
    }

    /// All stored keys, skipping unreadable files
    pub fn list(&self) -> Result<Vec<OwnerKey>, KeystoreError> {
        let mut keys = Vec::new();

        for entry in fs::read_dir(&self.keys_dir)? {
            let path = entry?.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                match OwnerKey::load(&path) {
                    Ok(key) => keys.push(key),
                    Err(e) => log::warn!("Skipping key file {}: {}", path.display(), e),
                }
            }
        }

        keys.sort_by_key(|k| k.address());
        Ok(keys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_import() {
        let key = OwnerKey::generate(None);
        let imported = OwnerKey::from_private_key(&key.key_pair().private_key_hex()).unwrap();
        assert_eq!(key.address(), imported.address());
        assert_eq!(key.public_key(), imported.public_key());
    }

    #[test]
    fn test_keystore_create_load_list() {
        let temp_dir = tempfile::tempdir().unwrap();
        let keystore = Keystore::new(temp_dir.path()).unwrap();

        let alice = keystore.create(Some("alice")).unwrap();
        let bob = keystore.create(None).unwrap();

        let loaded = keystore.load(&alice.address()).unwrap();
        assert_eq!(loaded.address(), alice.address());
        assert_eq!(loaded.label.as_deref(), Some("alice"));

        let listed: Vec<Address> = keystore.list().unwrap().iter().map(|k| k.address()).collect();
        assert_eq!(listed.len(), 2);
        assert!(listed.contains(&bob.address()));
    }

    #[test]
    fn test_missing_key() {
        let temp_dir = tempfile::tempdir().unwrap();
        let keystore = Keystore::new(temp_dir.path()).unwrap();
        assert!(matches!(
            keystore.load(&"1Nobody".into()),
            Err(KeystoreError::KeyNotFound(_))
        ));
    }

    #[test]
    fn test_key_path_stays_in_keys_dir() {
        let temp_dir = tempfile::tempdir().unwrap();
        let keys_dir = temp_dir.path().join("keys");
        let keystore = Keystore::new(&keys_dir).unwrap();

        let outside = OwnerKey::generate(None);
        outside.save(&temp_dir.path().join("x.json")).unwrap();

        for name in ["../x", "..", "a/b", "a\\b", ""] {
            assert!(matches!(
                keystore.load(&name.into()),
                Err(KeystoreError::InvalidAddress(_))
            ));
        }
    }

    #[test]
    fn test_tampered_key_file_rejected() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("key.json");
        let key = OwnerKey::generate(None);
        let other = OwnerKey::generate(None);

        let data = KeyFile {
            private_key_hex: key.key_pair().private_key_hex(),
            address: other.address(),
            label: None,
        };
        fs::write(&path, serde_json::to_string(&data).unwrap()).unwrap();

        assert!(matches!(
            OwnerKey::load(&path),
            Err(KeystoreError::AddressMismatch { .. })
        ));
    }
}
