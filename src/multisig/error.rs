//! Error taxonomy of the multisig engine

use crate::core::{Address, Fingerprint, SequenceId};
use crate::crypto::KeyError;
use crate::ledger::LedgerError;
use crate::multisig::config::ConfigError;
use thiserror::Error;

/// Errors related to multisig operations
///
/// Every variant aborts the call that produced it with no state change.
#[derive(Error, Debug)]
pub enum MultisigError {
    #[error("Caller is not an owner: {0}")]
    Unauthorized(Address),
    #[error("Operation not found: {0}")]
    OperationNotFound(Fingerprint),
    #[error("Owner {owner} already confirmed operation {operation}")]
    AlreadyConfirmed {
        owner: Address,
        operation: Fingerprint,
    },
    #[error("Owner {owner} joined after operation {operation} was proposed")]
    NotEligible {
        owner: Address,
        operation: Fingerprint,
    },
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Co-signer must be a different owner than the sender")]
    SignerIsSender,
    #[error("Signature expired at {expire_time}")]
    Expired { expire_time: i64 },
    #[error("Sequence id {0} already used")]
    SequenceIdReused(SequenceId),
    #[error("Invalid sequence id: {0}")]
    InvalidSequenceId(SequenceId),
    #[error("Invalid threshold: {0}")]
    InvalidThreshold(String),
    #[error("Owner already exists: {0}")]
    OwnerExists(Address),
    #[error("Owner not found: {0}")]
    OwnerNotFound(Address),
    #[error("Cannot remove the last owner")]
    LastOwner,
    #[error("Too many owners: maximum is {0}")]
    TooManyOwners(usize),
    #[error("Safe mode is active: {0} is not an owner")]
    SafeModeViolation(Address),
    #[error("Unknown forwarder: {0}")]
    UnknownForwarder(Address),
    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
    #[error("Crypto error: {0}")]
    Crypto(#[from] KeyError),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}
