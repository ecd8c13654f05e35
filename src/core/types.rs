//! Primitive identifiers shared across the wallet

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Amount of the single fungible balance unit
pub type Amount = u64;

/// Once-usable token protecting the co-signed execution path against replay
pub type SequenceId = u64;

/// An account identifier (owner, recipient, wallet or forwarder)
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Address(String);

impl Address {
    pub fn new(address: impl Into<String>) -> Self {
        Self(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Address {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for Address {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl FromStr for Address {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s.trim()))
    }
}

/// Errors parsing a fingerprint from text
#[derive(Error, Debug, PartialEq, Eq)]
pub enum FingerprintError {
    #[error("Invalid hex: {0}")]
    InvalidHex(String),
    #[error("Invalid fingerprint length: expected 32 bytes, got {0}")]
    InvalidLength(usize),
}

/// Deterministic 32-byte digest identifying a proposed action
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Build from a digest slice of exactly 32 bytes
    pub fn from_slice(bytes: &[u8]) -> Result<Self, FingerprintError> {
        let array: [u8; 32] = bytes
            .try_into()
            .map_err(|_| FingerprintError::InvalidLength(bytes.len()))?;
        Ok(Self(array))
    }

    pub fn from_hex(s: &str) -> Result<Self, FingerprintError> {
        let s = s.trim();
        let s = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(s).map_err(|e| FingerprintError::InvalidHex(e.to_string()))?;
        Self::from_slice(&bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({}..)", &self.to_hex()[..16])
    }
}

impl FromStr for Fingerprint {
    type Err = FingerprintError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_hex(s)
    }
}

// Hex text keeps fingerprints usable as JSON map keys
impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

/// Serde helper storing byte payloads as hex text
pub mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&hex::encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        hex::decode(s).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    #[test]
    fn test_fingerprint_hex() {
        let fp = Fingerprint::from_bytes([0xab; 32]);
        assert_eq!(fp.to_hex().len(), 64);
        assert_eq!(Fingerprint::from_hex(&fp.to_hex()).unwrap(), fp);
        assert_eq!(
            Fingerprint::from_hex(&format!("0x{}", fp.to_hex())).unwrap(),
            fp
        );
    }

    #[test]
    fn test_fingerprint_rejects_bad_input() {
        assert_eq!(
            Fingerprint::from_hex("abcd"),
            Err(FingerprintError::InvalidLength(2))
        );
        assert!(matches!(
            Fingerprint::from_hex("zz"),
            Err(FingerprintError::InvalidHex(_))
        ));
    }

    #[test]
    fn test_fingerprint_as_json_map_key() {
        let mut map = BTreeMap::new();
        map.insert(Fingerprint::from_bytes([1; 32]), 7u32);

        let json = serde_json::to_string(&map).unwrap();
        let back: BTreeMap<Fingerprint, u32> = serde_json::from_str(&json).unwrap();
        assert_eq!(back, map);
    }

    #[test]
    fn test_hex_bytes_field() {
        #[derive(Serialize, Deserialize, PartialEq, Debug)]
        struct Payload {
            #[serde(with = "hex_bytes")]
            data: Vec<u8>,
        }

        let payload = Payload {
            data: vec![0xca, 0xfe],
        };
        let json = serde_json::to_string(&payload).unwrap();
        assert_eq!(json, r#"{"data":"cafe"}"#);
        assert_eq!(serde_json::from_str::<Payload>(&json).unwrap(), payload);
    }

    #[test]
    fn test_address_display() {
        let address = Address::from("1Owner");
        assert_eq!(address.to_string(), "1Owner");
        assert_eq!(serde_json::to_string(&address).unwrap(), "\"1Owner\"");
    }
}
