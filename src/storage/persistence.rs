//! Wallet persistence layer
//!
//! Saves and restores [`WalletSnapshot`]s as JSON, with rotating backups.

use crate::multisig::WalletSnapshot;
use std::fs;
use std::io::{self, BufReader, BufWriter};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Storage configuration
#[derive(Debug, Clone)]
pub struct StorageConfig {
    pub data_dir: PathBuf,
    pub snapshot_file: String,
    pub backup_enabled: bool,
    pub max_backups: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(".quorum_wallet"),
            snapshot_file: "wallet.json".to_string(),
            backup_enabled: true,
            max_backups: 5,
        }
    }
}

/// Wallet snapshot storage
pub struct Storage {
    config: StorageConfig,
}

impl Storage {
    pub fn new(config: StorageConfig) -> Result<Self, StorageError> {
        fs::create_dir_all(&config.data_dir)?;
        Ok(Self { config })
    }

    fn snapshot_path(&self) -> PathBuf {
        self.config.data_dir.join(&self.config.snapshot_file)
    }

    fn backup_path(&self, index: usize) -> PathBuf {
        self.config
            .data_dir
            .join(format!("{}.backup.{}", self.config.snapshot_file, index))
    }

    /// Write the snapshot, keeping the previous one as backup 0
    pub fn save(&self, snapshot: &WalletSnapshot) -> Result<(), StorageError> {
        let path = self.snapshot_path();

        if self.config.backup_enabled && self.config.max_backups > 0 && path.exists() {
            self.rotate_backups()?;
            fs::copy(&path, self.backup_path(0))?;
        }

        let temp_path = self
            .config
            .data_dir
            .join(format!("{}.tmp", self.config.snapshot_file));
        serde_json::to_writer_pretty(BufWriter::new(fs::File::create(&temp_path)?), snapshot)?;
        fs::rename(&temp_path, &path)?;

        log::debug!(
            "Saved wallet {} ({} events, {} pending) to {}",
            snapshot.state.address,
            snapshot.events.len(),
            snapshot.state.operations.len(),
            path.display()
        );
        Ok(())
    }

    pub fn load(&self) -> Result<WalletSnapshot, StorageError> {
        let path = self.snapshot_path();
        if !path.exists() {
            return Err(StorageError::InvalidData(format!(
                "No wallet found in {}",
                self.config.data_dir.display()
            )));
        }

        let snapshot = read_snapshot(&path)?;
        log::debug!(
            "Loaded wallet {} with {} events",
            snapshot.state.address,
            snapshot.events.len()
        );
        Ok(snapshot)
    }

    pub fn exists(&self) -> bool {
        self.snapshot_path().exists()
    }

    fn rotate_backups(&self) -> Result<(), StorageError> {
        let oldest = self.backup_path(self.config.max_backups - 1);
        if oldest.exists() {
            fs::remove_file(&oldest)?;
        }

        for i in (0..self.config.max_backups - 1).rev() {
            let current = self.backup_path(i);
            if current.exists() {
                fs::rename(&current, self.backup_path(i + 1))?;
            }
        }

        Ok(())
    }

    /// Load a backup; 0 is the most recent
    ///
    /// A backup of a different wallet than the current snapshot is refused.
    pub fn restore_backup(&self, backup_index: usize) -> Result<WalletSnapshot, StorageError> {
        let backup_path = self.backup_path(backup_index);
        if !backup_path.exists() {
            return Err(StorageError::InvalidData(format!(
                "Backup {} not found",
                backup_index
            )));
        }

        let backup = read_snapshot(&backup_path)?;
        if self.exists() {
            let current = self.load()?;
            if current.state.address != backup.state.address {
                return Err(StorageError::InvalidData(format!(
                    "Backup {} belongs to wallet {}, not {}",
                    backup_index, backup.state.address, current.state.address
                )));
            }
        }

        log::info!(
            "Restoring wallet {} from backup {} ({} events)",
            backup.state.address,
            backup_index,
            backup.events.len()
        );
        Ok(backup)
    }

    pub fn list_backups(&self) -> Vec<usize> {
        (0..self.config.max_backups)
            .filter(|i| self.backup_path(*i).exists())
            .collect()
    }
}

fn read_snapshot(path: &Path) -> Result<WalletSnapshot, StorageError> {
    let file = fs::File::open(path)?;
    let reader = BufReader::new(file);
    Ok(serde_json::from_reader(reader)?)
}
