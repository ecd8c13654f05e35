//! Quorum Wallet: an M-of-N multisig wallet engine in Rust
//!
//! This crate provides a shared wallet controlled by a set of owners:
//! - M-of-N quorum confirmation of transfers and policy changes
//! - A per-day allowance that one owner may spend alone
//! - Co-signed execution with recoverable secp256k1 signatures and
//!   replay-protected sequence ids
//! - Owner registry management, safe mode and deposit forwarders
//! - An append-only event log and JSON persistence with backups
//!
//! # Example
//!
//! ```rust
//! use quorum_wallet::crypto::KeyPair;
//! use quorum_wallet::multisig::{ExecutionEngine, WalletConfig};
//!
//! let keys: Vec<KeyPair> = (0..3).map(|_| KeyPair::generate()).collect();
//! let owners = keys.iter().map(|k| k.address()).collect();
//!
//! // 2-of-3, with a daily allowance of 100
//! let config = WalletConfig::new(owners, 2, 100).unwrap();
//! let mut wallet = ExecutionEngine::with_system_clock(config).unwrap();
//!
//! let funder = "1Funder".into();
//! wallet.ledger_mut().credit(&funder, 1_000).unwrap();
//! wallet.deposit(&funder, 1_000).unwrap();
//!
//! // Above the allowance: needs a second owner
//! let alice = keys[0].address();
//! let outcome = wallet.execute(&alice, &"1Shop".into(), 500, b"").unwrap();
//! let operation = outcome.pending_operation().unwrap();
//! wallet.confirm(&keys[1].address(), &operation).unwrap();
//! assert_eq!(wallet.balance(), 500);
//! ```

pub mod cli;
pub mod core;
pub mod crypto;
pub mod forwarder;
pub mod keystore;
pub mod ledger;
pub mod multisig;
pub mod storage;

// Re-export commonly used types
pub use crate::core::{Address, Amount, Clock, Fingerprint, ManualClock, SystemClock};
pub use crypto::KeyPair;
pub use forwarder::{Forwarder, ForwarderRegistry};
pub use keystore::{Keystore, OwnerKey};
pub use ledger::Ledger;
pub use multisig::{
    ExecutionEngine, MultisigError, Outcome, Request, SignedRequest, WalletConfig, WalletEvent,
};
pub use storage::{Storage, StorageConfig};
