//! Cryptographic utilities for the wallet
//!
//! This module provides:
//! - SHA-256 hashing and Base58Check address encoding
//! - ECDSA key management (secp256k1) with recoverable signatures

pub mod hash;
pub mod keys;

pub use hash::{base58check, double_sha256, hash160, sha256, sha256_hex};
pub use keys::{
    public_key_to_address, recover_address, recover_public_key,
    sign_recoverable, KeyError, KeyPair, SIGNATURE_LENGTH,
};
