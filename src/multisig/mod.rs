//! Multi-signature quorum wallet
//!
//! An M-of-N owner set shares one wallet. Transfers within a daily allowance
//! run on one owner's authority; everything else needs M distinct
//! confirmations, or one owner carrying another owner's signature.
//!
//! # Example
//!
//! ```ignore
//! use quorum_wallet::multisig::{ExecutionEngine, WalletConfig};
//!
//! // Create a 2-of-3 wallet with a daily allowance of 100
//! let config = WalletConfig::new(vec![alice, bob, carol], 2, 100)?;
//! let mut engine = ExecutionEngine::with_system_clock(config)?;
//!
//! // Over the allowance: proposed, then executed by the second confirmation
//! let op = engine.execute(&alice, &recipient, 500, b"")?.pending_operation();
//! engine.confirm(&bob, &op.unwrap())?;
//! ```

pub mod config;
pub mod daily_limit;
pub mod engine;
pub mod error;
pub mod events;
pub mod operation;
pub mod owners;
pub mod request;
pub mod signature;

pub use config::{ConfigError, WalletConfig, MAX_OWNERS};
pub use daily_limit::DailyLimitTracker;
pub use engine::{ExecutionEngine, WalletSnapshot, WalletState};
pub use error::MultisigError;
pub use events::{EventLog, LoggedEvent, WalletEvent};
pub use operation::{
    operation_fingerprint, signed_fingerprint, Action, OperationLog, PendingOperation,
};
pub use owners::OwnerRegistry;
pub use request::{Outcome, Request};
pub use signature::{authorize, sign_request, Authorization, SequenceTracker, SignedRequest};
