//! Pending operations and their fingerprints
//!
//! An operation is identified by a SHA-256 fingerprint over a tagged,
//! length-prefixed encoding of the proposed action and the wallet instance
//! address. Entries live in the [`OperationLog`] from their first
//! confirmation until they execute, are revoked, or become unreachable.

use crate::core::{hex_bytes, Address, Amount, Fingerprint, SequenceId};
use crate::crypto::sha256;
use crate::multisig::owners::OwnerRegistry;
use crate::multisig::MultisigError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Domain tag for fingerprints of on-chain proposals
const PROPOSAL_DOMAIN: &[u8] = b"quorum-wallet/proposal/v1";

/// Domain tag for fingerprints signed off-chain by a co-signer
const SIGNED_DOMAIN: &[u8] = b"quorum-wallet/signed/v1";

/// A quorum-gated action
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Action {
    /// Value transfer or call out of the wallet
    Transfer {
        to: Address,
        value: Amount,
        #[serde(with = "hex_bytes")]
        data: Vec<u8>,
    },
    AddOwner { owner: Address },
    RemoveOwner { owner: Address },
    ReplaceOwner { old: Address, new: Address },
    ChangeThreshold { threshold: u32 },
    SetDailyLimit { limit: Amount },
    ResetSpentToday,
}

impl Action {
    fn tag(&self) -> u8 {
        match self {
            Action::Transfer { .. } => 0x01,
            Action::AddOwner { .. } => 0x02,
            Action::RemoveOwner { .. } => 0x03,
            Action::ReplaceOwner { .. } => 0x04,
            Action::ChangeThreshold { .. } => 0x05,
            Action::SetDailyLimit { .. } => 0x06,
            Action::ResetSpentToday => 0x07,
        }
    }

    /// Whether applying the action changes the owner set or threshold
    pub fn changes_registry(&self) -> bool {
        matches!(
            self,
            Action::AddOwner { .. }
                | Action::RemoveOwner { .. }
                | Action::ReplaceOwner { .. }
                | Action::ChangeThreshold { .. }
        )
    }
}

/// Order-sensitive, length-prefixed encoder feeding a fingerprint
struct FingerprintBuilder {
    bytes: Vec<u8>,
}

impl FingerprintBuilder {
    fn new(domain: &[u8]) -> Self {
        let mut builder = Self { bytes: Vec::new() };
        builder.put_bytes(domain);
        builder
    }

    fn put_bytes(&mut self, data: &[u8]) -> &mut Self {
        self.bytes
            .extend_from_slice(&(data.len() as u64).to_be_bytes());
        self.bytes.extend_from_slice(data);
        self
    }

    fn put_address(&mut self, address: &Address) -> &mut Self {
        self.put_bytes(address.as_bytes())
    }

    fn put_u8(&mut self, value: u8) -> &mut Self {
        self.bytes.push(value);
        self
    }

    fn put_u64(&mut self, value: u64) -> &mut Self {
        self.bytes.extend_from_slice(&value.to_be_bytes());
        self
    }

    fn put_i64(&mut self, value: i64) -> &mut Self {
        self.bytes.extend_from_slice(&value.to_be_bytes());
        self
    }

    fn finish(&self) -> Fingerprint {
        let mut digest = [0u8; 32];
        digest.copy_from_slice(&sha256(&self.bytes));
        Fingerprint::from_bytes(digest)
    }
}

/// Fingerprint of an on-chain proposal of `action` against wallet `instance`
pub fn operation_fingerprint(instance: &Address, action: &Action) -> Fingerprint {
    let mut builder = FingerprintBuilder::new(PROPOSAL_DOMAIN);
    builder.put_address(instance).put_u8(action.tag());

    match action {
        Action::Transfer { to, value, data } => {
            builder.put_address(to).put_u64(*value).put_bytes(data);
        }
        Action::AddOwner { owner } | Action::RemoveOwner { owner } => {
            builder.put_address(owner);
        }
        Action::ReplaceOwner { old, new } => {
            builder.put_address(old).put_address(new);
        }
        Action::ChangeThreshold { threshold } => {
            builder.put_u64(u64::from(*threshold));
        }
        Action::SetDailyLimit { limit } => {
            builder.put_u64(*limit);
        }
        Action::ResetSpentToday => {}
    }

    builder.finish()
}

/// Fingerprint a co-signer signs for the one-shot signature path
pub fn signed_fingerprint(
    instance: &Address,
    to: &Address,
    value: Amount,
    data: &[u8],
    expire_time: i64,
    sequence_id: SequenceId,
) -> Fingerprint {
    FingerprintBuilder::new(SIGNED_DOMAIN)
        .put_address(instance)
        .put_address(to)
        .put_u64(value)
        .put_bytes(data)
        .put_i64(expire_time)
        .put_u64(sequence_id)
        .finish()
}

/// An operation awaiting confirmations
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingOperation {
    pub fingerprint: Fingerprint,
    pub action: Action,
    /// Owner that proposed the operation; attributed on execution
    pub initiator: Address,
    /// Owners that have confirmed so far
    pub confirmations: BTreeSet<Address>,
    /// Owner set at proposal time; later owners cannot confirm
    pub eligible: BTreeSet<Address>,
    pub proposed_at: DateTime<Utc>,
}

impl PendingOperation {
    /// Create an operation confirmed by its initiator
    pub fn new(
        fingerprint: Fingerprint,
        action: Action,
        initiator: Address,
        owners: &[Address],
        proposed_at: DateTime<Utc>,
    ) -> Self {
        let mut confirmations = BTreeSet::new();
        confirmations.insert(initiator.clone());

        Self {
            fingerprint,
            action,
            initiator,
            confirmations,
            eligible: owners.iter().cloned().collect(),
            proposed_at,
        }
    }

    pub fn confirmation_count(&self) -> usize {
        self.confirmations.len()
    }

    pub fn has_confirmed(&self, owner: &Address) -> bool {
        self.confirmations.contains(owner)
    }

    /// Confirmations still needed under `threshold`
    pub fn confirmations_needed(&self, threshold: u32) -> u32 {
        let have = u32::try_from(self.confirmations.len()).unwrap_or(u32::MAX);
        threshold.saturating_sub(have)
    }

    /// Current owners who may still confirm
    pub fn outstanding<'a>(
        &'a self,
        registry: &'a OwnerRegistry,
    ) -> impl Iterator<Item = &'a Address> + 'a {
        registry
            .owners()
            .iter()
            .filter(move |o| self.eligible.contains(*o) && !self.confirmations.contains(*o))
    }

    /// Whether some sequence of further confirmations can still execute it
    pub fn is_reachable(&self, registry: &OwnerRegistry) -> bool {
        let outstanding = self.outstanding(registry).count();
        outstanding > 0
            && self.confirmation_count() + outstanding >= registry.threshold() as usize
    }
}

/// In-flight operations keyed by fingerprint
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct OperationLog {
    pending: BTreeMap<Fingerprint, PendingOperation>,
}

impl OperationLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, fingerprint: &Fingerprint) -> Option<&PendingOperation> {
        self.pending.get(fingerprint)
    }

    pub fn contains(&self, fingerprint: &Fingerprint) -> bool {
        self.pending.contains_key(fingerprint)
    }

    pub fn insert(&mut self, operation: PendingOperation) {
        self.pending.insert(operation.fingerprint, operation);
    }

    pub fn remove(&mut self, fingerprint: &Fingerprint) -> Option<PendingOperation> {
        self.pending.remove(fingerprint)
    }

    /// Record `owner`'s confirmation, returning the updated entry
    pub fn confirm(
        &mut self,
        fingerprint: &Fingerprint,
        owner: &Address,
    ) -> Result<&PendingOperation, MultisigError> {
        let operation = self
            .pending
            .get_mut(fingerprint)
            .ok_or(MultisigError::OperationNotFound(*fingerprint))?;

        if operation.has_confirmed(owner) {
            return Err(MultisigError::AlreadyConfirmed {
                owner: owner.clone(),
                operation: *fingerprint,
            });
        }
        if !operation.eligible.contains(owner) {
            return Err(MultisigError::NotEligible {
                owner: owner.clone(),
                operation: *fingerprint,
            });
        }

        operation.confirmations.insert(owner.clone());
        Ok(operation)
    }

    /// Drop operations that can no longer execute, returning their fingerprints
    pub fn prune_unreachable(&mut self, registry: &OwnerRegistry) -> Vec<Fingerprint> {
        let dropped: Vec<Fingerprint> = self
            .pending
            .values()
            .filter(|op| !op.is_reachable(registry))
            .map(|op| op.fingerprint)
            .collect();

        for fingerprint in &dropped {
            self.pending.remove(fingerprint);
        }
        dropped
    }

    pub fn iter(&self) -> impl Iterator<Item = &PendingOperation> {
        self.pending.values()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}
