//! Owner key management

pub mod keystore;

pub use keystore::{Keystore, KeystoreError, OwnerKey};
