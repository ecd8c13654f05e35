//! Wallet configuration
//!
//! The initial owner set, confirmation threshold and daily allowance of a
//! wallet, plus the salt that makes its instance address unique.

use crate::core::{Address, Amount};
use crate::crypto::{base58check, hash160};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

/// Upper bound on the number of owners
pub const MAX_OWNERS: usize = 250;

/// Address version byte for wallet instances (script-hash style)
const WALLET_ADDRESS_VERSION: u8 = 0x05;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid threshold: {0}")]
    InvalidThreshold(String),
    #[error("At least one owner is required")]
    NoOwners,
    #[error("Too many owners: {0} (maximum {MAX_OWNERS})")]
    TooManyOwners(usize),
    #[error("Duplicate owner: {0}")]
    DuplicateOwner(Address),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Configuration for a multisig wallet
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct WalletConfig {
    /// Initial owners (N)
    pub owners: Vec<Address>,
    /// Minimum confirmations required (M in M-of-N)
    pub threshold: u32,
    /// Ceiling on single-owner spend per day
    #[serde(default)]
    pub daily_limit: Amount,
    /// Distinguishes wallets created with identical owner sets
    #[serde(default)]
    pub salt: u64,
    /// Optional human-readable label
    #[serde(default)]
    pub label: Option<String>,
}

impl WalletConfig {
    /// Create a new wallet configuration with a random salt
    ///
    /// # Errors
    /// Returns error if the threshold or the owner list is invalid
    pub fn new(
        owners: Vec<Address>,
        threshold: u32,
        daily_limit: Amount,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            owners,
            threshold,
            daily_limit,
            salt: rand::random(),
            label: None,
        };
        config.validate()?;
        Ok(config)
    }

    pub fn with_salt(mut self, salt: u64) -> Self {
        self.salt = salt;
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Check owner uniqueness and 1 <= threshold <= N
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.owners.is_empty() {
            return Err(ConfigError::NoOwners);
        }
        if self.owners.len() > MAX_OWNERS {
            return Err(ConfigError::TooManyOwners(self.owners.len()));
        }
        if self.threshold == 0 {
            return Err(ConfigError::InvalidThreshold(
                "threshold must be at least 1".to_string(),
            ));
        }
        if self.threshold as usize > self.owners.len() {
            return Err(ConfigError::InvalidThreshold(format!(
                "threshold {} exceeds owner count {}",
                self.threshold,
                self.owners.len()
            )));
        }

        let mut sorted = self.owners.clone();
        sorted.sort();
        if let Some(pair) = sorted.windows(2).find(|w| w[0] == w[1]) {
            return Err(ConfigError::DuplicateOwner(pair[0].clone()));
        }

        Ok(())
    }

    /// Load and validate a configuration from a JSON file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&json)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration as pretty JSON
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Instance address of the wallet built from this configuration
    ///
    /// Address = Base58Check(0x05 || HASH160(threshold || sorted owners || salt))
    pub fn instance_address(&self) -> Address {
        let mut sorted = self.owners.clone();
        sorted.sort();

        let mut data = self.threshold.to_be_bytes().to_vec();
        for owner in &sorted {
            data.extend_from_slice(&(owner.as_bytes().len() as u32).to_be_bytes());
            data.extend_from_slice(owner.as_bytes());
        }
        data.extend_from_slice(&self.salt.to_be_bytes());

        Address::new(base58check(WALLET_ADDRESS_VERSION, &hash160(&data)))
    }

    /// Get description like "2-of-3"
    pub fn description(&self) -> String {
        format!("{}-of-{}", self.threshold, self.owners.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn owners() -> Vec<Address> {
        vec!["1Alice".into(), "1Bob".into(), "1Carol".into()]
    }

    #[test]
    fn test_config_creation() {
        let config = WalletConfig::new(owners(), 2, 100)
            .unwrap()
            .with_label("Treasury");

        assert_eq!(config.description(), "2-of-3");
        assert_eq!(config.daily_limit, 100);
        assert_eq!(config.label.as_deref(), Some("Treasury"));
    }

    #[test]
    fn test_config_validation() {
        // Zero threshold
        assert!(WalletConfig::new(owners(), 0, 0).is_err());

        // Threshold > owners
        assert!(WalletConfig::new(owners(), 4, 0).is_err());

        // No owners
        assert!(matches!(
            WalletConfig::new(vec![], 1, 0),
            Err(ConfigError::NoOwners)
        ));

        // Duplicate owners
        assert!(matches!(
            WalletConfig::new(vec!["1Same".into(), "1Same".into()], 1, 0),
            Err(ConfigError::DuplicateOwner(_))
        ));

        // A single owner with threshold 1 is allowed
        assert!(WalletConfig::new(vec!["1Solo".into()], 1, 0).is_ok());
    }

    #[test]
    fn test_instance_address_determinism() {
        let config1 = WalletConfig::new(owners(), 2, 0).unwrap().with_salt(9);
        let mut reordered = owners();
        reordered.reverse();
        let config2 = WalletConfig::new(reordered, 2, 50).unwrap().with_salt(9);

        // Owner order and allowance do not affect the address
        assert_eq!(config1.instance_address(), config2.instance_address());
        assert!(config1.instance_address().as_str().starts_with('3'));

        let salted = config1.clone().with_salt(10);
        assert_ne!(config1.instance_address(), salted.instance_address());
    }

    #[test]
    fn test_config_file_roundtrip() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("wallet.json");

        let config = WalletConfig::new(owners(), 2, 10).unwrap();
        config.save(&path).unwrap();

        assert_eq!(WalletConfig::from_file(&path).unwrap(), config);
    }

    #[test]
    fn test_config_file_defaults() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("wallet.json");
        std::fs::write(&path, r#"{"owners": ["1A", "1B"], "threshold": 2}"#).unwrap();

        let config = WalletConfig::from_file(&path).unwrap();
        assert_eq!(config.daily_limit, 0);
        assert_eq!(config.salt, 0);
        assert!(config.label.is_none());
    }
}
