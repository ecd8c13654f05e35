//! Account ledger used as the wallet's execution environment
//!
//! Tracks one fungible balance per account and which addresses carry code.
//! Transfers and calls out of the wallet are delivered through it.

pub mod ledger;

pub use ledger::{CallRecord, Ledger, LedgerError};
