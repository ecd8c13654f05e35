//! Deposit-forwarding sub-accounts
//!
//! A forwarder is an address derived from its parent wallet and a nonce. It
//! passively collects funds; a sweep moves its whole balance to the parent.

use crate::core::{Address, Amount};
use crate::crypto::{base58check, hash160};
use crate::ledger::{Ledger, LedgerError};
use serde::{Deserialize, Serialize};

/// Address version byte for forwarders (script-hash style)
const FORWARDER_ADDRESS_VERSION: u8 = 0x05;

/// Derive the forwarding address for `(parent, nonce)`
///
/// Address = Base58Check(0x05 || HASH160("forwarder" || parent || nonce))
pub fn derive_forwarding_address(parent: &Address, nonce: u64) -> Address {
    let mut data = b"forwarder".to_vec();
    data.extend_from_slice(&(parent.as_bytes().len() as u32).to_be_bytes());
    data.extend_from_slice(parent.as_bytes());
    data.extend_from_slice(&nonce.to_be_bytes());

    Address::new(base58check(FORWARDER_ADDRESS_VERSION, &hash160(&data)))
}

/// Move the whole balance of `forwarder` to `parent`, returning the amount
pub fn sweep(
    ledger: &mut Ledger,
    forwarder: &Address,
    parent: &Address,
) -> Result<Amount, LedgerError> {
    let amount = ledger.balance_of(forwarder);
    if amount > 0 {
        ledger.transfer(forwarder, parent, amount)?;
    }
    Ok(amount)
}

/// A forwarder created for a parent wallet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Forwarder {
    pub address: Address,
    pub nonce: u64,
}

/// Forwarders created for one parent wallet
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForwarderRegistry {
    forwarders: Vec<Forwarder>,
    next_nonce: u64,
}

impl ForwarderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Derive and remember the next forwarder for `parent`
    pub fn create(&mut self, parent: &Address) -> Forwarder {
        let forwarder = Forwarder {
            address: derive_forwarding_address(parent, self.next_nonce),
            nonce: self.next_nonce,
        };
        self.next_nonce += 1;
        self.forwarders.push(forwarder.clone());
        forwarder
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.forwarders.iter().any(|f| &f.address == address)
    }

    pub fn list(&self) -> &[Forwarder] {
        &self.forwarders
    }
}
