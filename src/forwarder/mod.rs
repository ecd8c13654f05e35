//! Deposit forwarders
//!
//! Per-nonce sub-accounts that collect funds on behalf of a wallet. They carry
//! no quorum logic: derivation and sweeping are all they do.

pub mod forwarder;

pub use forwarder::{derive_forwarding_address, sweep, Forwarder, ForwarderRegistry};
