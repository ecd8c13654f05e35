//! ECDSA key management for wallet owners
//!
//! Provides key pair generation and recoverable signatures using the
//! secp256k1 curve. A signature carries its recovery id, so the signer's
//! address can be recovered from the signature and the signed digest alone.

use rand::rngs::OsRng;
use secp256k1::ecdsa::{RecoverableSignature, RecoveryId};
use secp256k1::{Message, PublicKey, Secp256k1, SecretKey};
use thiserror::Error;

use super::hash::{base58check, hash160};
use crate::core::Address;

/// Length of an encoded recoverable signature: r (32) || s (32) || v (1)
pub const SIGNATURE_LENGTH: usize = 65;

/// Offset added to the recovery id in the trailing `v` byte
const RECOVERY_ID_OFFSET: u8 = 27;

/// Address version byte for owner (key-hash) addresses
const KEY_ADDRESS_VERSION: u8 = 0x00;

/// Errors that can occur during key operations
#[derive(Error, Debug)]
pub enum KeyError {
    #[error("Invalid private key")]
    InvalidPrivateKey,
    #[error("Invalid signature")]
    InvalidSignature,
    #[error("Invalid signature length: expected {SIGNATURE_LENGTH}, got {0}")]
    InvalidSignatureLength(usize),
    #[error("Secp256k1 error: {0}")]
    Secp256k1Error(#[from] secp256k1::Error),
}

/// A key pair consisting of a private key and its corresponding public key
#[derive(Clone)]
pub struct KeyPair {
    pub secret_key: SecretKey,
    pub public_key: PublicKey,
}

impl KeyPair {
    /// Generate a new random key pair
    pub fn generate() -> Self {
        let secp = Secp256k1::new();
        let (secret_key, public_key) = secp.generate_keypair(&mut OsRng);
        Self {
            secret_key,
            public_key,
        }
    }

    /// Create a key pair from an existing secret key
    pub fn from_secret_key(secret_key: SecretKey) -> Self {
        let secp = Secp256k1::new();
        let public_key = PublicKey::from_secret_key(&secp, &secret_key);
        Self {
            secret_key,
            public_key,
        }
    }

    /// Create a key pair from a hex-encoded private key
    pub fn from_private_key_hex(hex_key: &str) -> Result<Self, KeyError> {
        let bytes = hex::decode(hex_key.trim()).map_err(|_| KeyError::InvalidPrivateKey)?;
        let secret_key =
            SecretKey::from_slice(&bytes).map_err(|_| KeyError::InvalidPrivateKey)?;
        Ok(Self::from_secret_key(secret_key))
    }

    /// Get the private key as a hex string
    pub fn private_key_hex(&self) -> String {
        hex::encode(self.secret_key.secret_bytes())
    }

    /// Get the public key as a hex string (compressed format)
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key.serialize())
    }

    /// Owner address of this key: Base58Check(HASH160(pubkey))
    pub fn address(&self) -> Address {
        public_key_to_address(&self.public_key)
    }

    /// Sign a 32-byte digest, returning `r || s || v`
    pub fn sign(&self, digest: &[u8]) -> Result<Vec<u8>, KeyError> {
        sign_recoverable(&self.secret_key, digest)
    }
}

/// Convert a public key to an owner address
pub fn public_key_to_address(public_key: &PublicKey) -> Address {
    Address::new(base58check(
        KEY_ADDRESS_VERSION,
        &hash160(&public_key.serialize()),
    ))
}

/// Sign a digest with a secret key, producing a 65-byte recoverable signature
pub fn sign_recoverable(secret_key: &SecretKey, digest: &[u8]) -> Result<Vec<u8>, KeyError> {
    let secp = Secp256k1::new();
    let message = Message::from_digest_slice(digest)?;
    let signature = secp.sign_ecdsa_recoverable(&message, secret_key);

    let (recovery_id, compact) = signature.serialize_compact();
    let mut bytes = Vec::with_capacity(SIGNATURE_LENGTH);
    bytes.extend_from_slice(&compact);
    bytes.push(recovery_id.to_i32() as u8 + RECOVERY_ID_OFFSET);
    Ok(bytes)
}

/// Recover the public key that produced `signature` over `digest`
///
/// The trailing `v` byte may be given either raw (0..=3) or offset by 27.
pub fn recover_public_key(digest: &[u8], signature: &[u8]) -> Result<PublicKey, KeyError> {
    if signature.len() != SIGNATURE_LENGTH {
        return Err(KeyError::InvalidSignatureLength(signature.len()));
    }

    let v = signature[SIGNATURE_LENGTH - 1];
    let v = if v >= RECOVERY_ID_OFFSET {
        v - RECOVERY_ID_OFFSET
    } else {
        v
    };
    let recovery_id =
        RecoveryId::from_i32(i32::from(v)).map_err(|_| KeyError::InvalidSignature)?;
    let signature = RecoverableSignature::from_compact(&signature[..64], recovery_id)
        .map_err(|_| KeyError::InvalidSignature)?;

    let secp = Secp256k1::new();
    let message = Message::from_digest_slice(digest)?;
    secp.recover_ecdsa(&message, &signature)
        .map_err(|_| KeyError::InvalidSignature)
}

/// Recover the owner address that produced `signature` over `digest`
pub fn recover_address(digest: &[u8], signature: &[u8]) -> Result<Address, KeyError> {
    recover_public_key(digest, signature).map(|pk| public_key_to_address(&pk))
}
