//! In-memory account ledger
//!
//! Holds the single fungible balance of every account, the code deployed at
//! contract-like addresses, and a record of every call delivered through it.

use crate::core::{Address, Amount};
use crate::crypto::sha256_hex;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Ledger errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Insufficient funds in {account}: have {have}, need {need}")]
    InsufficientFunds {
        account: Address,
        have: Amount,
        need: Amount,
    },
    #[error("Balance overflow for {0}")]
    BalanceOverflow(Address),
    #[error("Invalid code: code must not be empty")]
    InvalidCode,
    #[error("Code already deployed at {0}")]
    AlreadyDeployed(Address),
}

/// A value transfer or call delivered to a target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallRecord {
    pub from: Address,
    pub to: Address,
    pub value: Amount,
    /// Call payload; empty for plain transfers
    pub data: Vec<u8>,
}

/// Balances and deployed code for every known account
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ledger {
    balances: HashMap<Address, Amount>,
    /// Code deployed at contract-like addresses
    code: HashMap<Address, Vec<u8>>,
    /// Every transfer or call delivered, in order
    calls: Vec<CallRecord>,
    /// Deployment counter for address generation
    nonce: u64,
}

impl Ledger {
    /// Create an empty ledger
    pub fn new() -> Self {
        Self::default()
    }

    /// Balance of an account (zero when unknown)
    pub fn balance_of(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// Mint funds into an external account
    pub fn credit(&mut self, account: &Address, amount: Amount) -> Result<(), LedgerError> {
        let balance = self.balances.entry(account.clone()).or_insert(0);
        *balance = balance
            .checked_add(amount)
            .ok_or_else(|| LedgerError::BalanceOverflow(account.clone()))?;
        Ok(())
    }

    /// Whether code is deployed at `account`
    pub fn has_code(&self, account: &Address) -> bool {
        self.code.contains_key(account)
    }

    /// Deploy code at a fresh address derived from the deployer and nonce
    pub fn deploy(&mut self, code: Vec<u8>, deployer: &Address) -> Result<Address, LedgerError> {
        let address = self.generate_address(deployer);
        self.nonce += 1;
        self.install_code(&address, code)?;
        Ok(address)
    }

    /// Install code at a specific address
    pub fn install_code(&mut self, address: &Address, code: Vec<u8>) -> Result<(), LedgerError> {
        if code.is_empty() {
            return Err(LedgerError::InvalidCode);
        }
        if self.code.contains_key(address) {
            return Err(LedgerError::AlreadyDeployed(address.clone()));
        }

        self.code.insert(address.clone(), code);
        log::info!("Code deployed at {}", address);
        Ok(())
    }

    /// Move `value` from one account to another
    ///
    /// Either both balances change or neither does.
    pub fn transfer(
        &mut self,
        from: &Address,
        to: &Address,
        value: Amount,
    ) -> Result<(), LedgerError> {
        let have = self.balance_of(from);
        if have < value {
            return Err(LedgerError::InsufficientFunds {
                account: from.clone(),
                have,
                need: value,
            });
        }
        if from == to {
            return Ok(());
        }

        let credited = self
            .balance_of(to)
            .checked_add(value)
            .ok_or_else(|| LedgerError::BalanceOverflow(to.clone()))?;

        self.balances.insert(from.clone(), have - value);
        self.balances.insert(to.clone(), credited);
        Ok(())
    }

    /// Deliver a transfer or call, recording it once the value has moved
    pub fn call(
        &mut self,
        from: &Address,
        to: &Address,
        value: Amount,
        data: &[u8],
    ) -> Result<(), LedgerError> {
        self.transfer(from, to, value)?;
        self.calls.push(CallRecord {
            from: from.clone(),
            to: to.clone(),
            value,
            data: data.to_vec(),
        });
        Ok(())
    }

    /// Working copy for a pending change, without the call history
    ///
    /// Calls delivered through the draft are appended to this ledger's
    /// history by [`Ledger::commit`].
    pub fn draft(&self) -> Ledger {
        Ledger {
            balances: self.balances.clone(),
            code: self.code.clone(),
            calls: Vec::new(),
            nonce: self.nonce,
        }
    }

    /// Adopt a draft's balances and code, appending the calls it delivered
    pub fn commit(&mut self, draft: Ledger) {
        let Ledger {
            balances,
            code,
            mut calls,
            nonce,
        } = draft;
        self.balances = balances;
        self.code = code;
        self.nonce = nonce;
        self.calls.append(&mut calls);
    }

    /// Calls delivered to date
    pub fn calls(&self) -> &[CallRecord] {
        &self.calls
    }

    /// Calls delivered to a specific target
    pub fn calls_to<'a>(&'a self, target: &'a Address) -> impl Iterator<Item = &'a CallRecord> {
        self.calls.iter().filter(move |c| &c.to == target)
    }

    /// Generate a contract address from deployer and nonce
    fn generate_address(&self, deployer: &Address) -> Address {
        let hex = sha256_hex(format!("{}:{}", deployer, self.nonce).as_bytes());
        Address::new(format!("0x{}", &hex[..40]))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(s: &str) -> Address {
        Address::from(s)
    }

    #[test]
    fn test_credit_and_transfer() {
        let mut ledger = Ledger::new();
        ledger.credit(&addr("alice"), 100).unwrap();

        ledger.transfer(&addr("alice"), &addr("bob"), 30).unwrap();
        assert_eq!(ledger.balance_of(&addr("alice")), 70);
        assert_eq!(ledger.balance_of(&addr("bob")), 30);
    }

    #[test]
    fn test_insufficient_funds_leaves_balances() {
        let mut ledger = Ledger::new();
        ledger.credit(&addr("alice"), 10).unwrap();

        let result = ledger.transfer(&addr("alice"), &addr("bob"), 11);
        assert!(matches!(
            result,
            Err(LedgerError::InsufficientFunds { have: 10, need: 11, .. })
        ));
        assert_eq!(ledger.balance_of(&addr("alice")), 10);
        assert_eq!(ledger.balance_of(&addr("bob")), 0);
    }

    #[test]
    fn test_credit_overflow() {
        let mut ledger = Ledger::new();
        ledger.credit(&addr("alice"), u64::MAX).unwrap();
        assert!(matches!(
            ledger.credit(&addr("alice"), 1),
            Err(LedgerError::BalanceOverflow(_))
        ));
    }

    #[test]
    fn test_deploy_marks_contract_like() {
        let mut ledger = Ledger::new();

        let first = ledger.deploy(vec![0x60, 0x00], &addr("deployer")).unwrap();
        let second = ledger.deploy(vec![0x60, 0x01], &addr("deployer")).unwrap();

        assert!(first.as_str().starts_with("0x"));
        assert_ne!(first, second);
        assert!(ledger.has_code(&first));
        assert!(!ledger.has_code(&addr("deployer")));
        assert_eq!(
            ledger.deploy(vec![], &addr("deployer")),
            Err(LedgerError::InvalidCode)
        );
    }

    #[test]
    fn test_call_records_payload() {
        let mut ledger = Ledger::new();
        ledger.credit(&addr("wallet"), 5).unwrap();

        ledger
            .call(&addr("wallet"), &addr("target"), 5, &[0xde, 0xad])
            .unwrap();

        let target = addr("target");
        let calls: Vec<_> = ledger.calls_to(&target).collect();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].data, vec![0xde, 0xad]);
        assert_eq!(ledger.balance_of(&addr("target")), 5);
    }

    #[test]
    fn test_draft_commit_appends_calls() {
        let mut ledger = Ledger::new();
        ledger.credit(&addr("wallet"), 10).unwrap();
        ledger.call(&addr("wallet"), &addr("a"), 3, &[]).unwrap();

        let mut draft = ledger.draft();
        assert!(draft.calls().is_empty());
        assert_eq!(draft.balance_of(&addr("wallet")), 7);

        draft.call(&addr("wallet"), &addr("b"), 4, &[0x01]).unwrap();
        // Nothing changes until the draft is committed
        assert_eq!(ledger.balance_of(&addr("b")), 0);
        assert_eq!(ledger.calls().len(), 1);

        ledger.commit(draft);
        assert_eq!(ledger.balance_of(&addr("wallet")), 3);
        assert_eq!(ledger.balance_of(&addr("b")), 4);
        let targets: Vec<_> = ledger.calls().iter().map(|c| c.to.clone()).collect();
        assert_eq!(targets, vec![addr("a"), addr("b")]);
    }
}
