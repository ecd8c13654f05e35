//! Co-signed execution path
//!
//! An owner submits a transfer together with another owner's off-chain
//! signature over the transfer's fingerprint. Sequence ids guard against
//! replay: each id is accepted at most once, in any order.

use crate::core::{hex_bytes, Address, Amount, Fingerprint, SequenceId};
use crate::crypto::{recover_address, KeyError, KeyPair};
use crate::multisig::operation::signed_fingerprint;
use crate::multisig::owners::OwnerRegistry;
use crate::multisig::MultisigError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A transfer authorized by a co-signer's signature
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignedRequest {
    pub to: Address,
    pub value: Amount,
    #[serde(with = "hex_bytes")]
    pub data: Vec<u8>,
    /// Unix seconds after which the signature is no longer valid
    pub expire_time: i64,
    pub sequence_id: SequenceId,
    /// 65-byte recoverable signature `r || s || v`
    #[serde(with = "hex_bytes")]
    pub signature: Vec<u8>,
}

impl SignedRequest {
    /// Fingerprint the co-signer signed, bound to wallet `instance`
    pub fn fingerprint(&self, instance: &Address) -> Fingerprint {
        signed_fingerprint(
            instance,
            &self.to,
            self.value,
            &self.data,
            self.expire_time,
            self.sequence_id,
        )
    }
}

/// Produce a co-signer's signature for a transfer out of wallet `instance`
pub fn sign_request(
    key: &KeyPair,
    instance: &Address,
    to: &Address,
    value: Amount,
    data: &[u8],
    expire_time: i64,
    sequence_id: SequenceId,
) -> Result<SignedRequest, KeyError> {
    let fingerprint = signed_fingerprint(instance, to, value, data, expire_time, sequence_id);
    let signature = key.sign(fingerprint.as_bytes())?;

    Ok(SignedRequest {
        to: to.clone(),
        value,
        data: data.to_vec(),
        expire_time,
        sequence_id,
        signature,
    })
}

/// Sequence ids accepted so far
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SequenceTracker {
    used: BTreeSet<SequenceId>,
    next: SequenceId,
}

impl Default for SequenceTracker {
    fn default() -> Self {
        Self {
            used: BTreeSet::new(),
            next: 1,
        }
    }
}

impl SequenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// One more than the highest id ever accepted; advisory only
    pub fn next_sequence_id(&self) -> SequenceId {
        self.next
    }

    pub fn is_used(&self, id: SequenceId) -> bool {
        self.used.contains(&id)
    }

    pub fn used_count(&self) -> usize {
        self.used.len()
    }

    /// Any non-zero id that has never been accepted is valid
    pub fn check(&self, id: SequenceId) -> Result<(), MultisigError> {
        if id == 0 {
            return Err(MultisigError::InvalidSequenceId(id));
        }
        if self.is_used(id) {
            return Err(MultisigError::SequenceIdReused(id));
        }
        Ok(())
    }

    pub fn consume(&mut self, id: SequenceId) -> Result<(), MultisigError> {
        self.check(id)?;
        self.used.insert(id);
        self.next = self.next.max(id.saturating_add(1));
        Ok(())
    }
}

/// Outcome of validating a co-signed request
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Authorization {
    pub fingerprint: Fingerprint,
    pub co_signer: Address,
}

/// Validate `request` submitted by `sender` without changing any state
///
/// Checks, in order: the recovered co-signer is a current owner distinct from
/// the sender, the signature has not expired, and the sequence id is unused.
pub fn authorize(
    registry: &OwnerRegistry,
    sequences: &SequenceTracker,
    instance: &Address,
    sender: &Address,
    request: &SignedRequest,
    now: DateTime<Utc>,
) -> Result<Authorization, MultisigError> {
    let fingerprint = request.fingerprint(instance);

    let co_signer = recover_address(fingerprint.as_bytes(), &request.signature)
        .map_err(|_| MultisigError::InvalidSignature)?;
    if !registry.is_owner(&co_signer) {
        return Err(MultisigError::InvalidSignature);
    }
    if &co_signer == sender {
        return Err(MultisigError::SignerIsSender);
    }
    if request.expire_time <= now.timestamp() {
        return Err(MultisigError::Expired {
            expire_time: request.expire_time,
        });
    }
    sequences.check(request.sequence_id)?;

    Ok(Authorization {
        fingerprint,
        co_signer,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::to_datetime;
    use crate::multisig::config::WalletConfig;

    struct Fixture {
        keys: Vec<KeyPair>,
        registry: OwnerRegistry,
        instance: Address,
    }

    fn fixture() -> Fixture {
        let keys: Vec<KeyPair> = (0..3).map(|_| KeyPair::generate()).collect();
        let config = WalletConfig::new(keys.iter().map(|k| k.address()).collect(), 2, 0).unwrap();
        Fixture {
            registry: OwnerRegistry::from_config(&config).unwrap(),
            instance: config.instance_address(),
            keys,
        }
    }

    fn request(f: &Fixture, signer: usize, sequence_id: SequenceId) -> SignedRequest {
        sign_request(
            &f.keys[signer],
            &f.instance,
            &"1Recipient".into(),
            10,
            b"",
            2_000,
            sequence_id,
        )
        .unwrap()
    }

    #[test]
    fn test_sequence_ids_non_monotonic() {
        let mut tracker = SequenceTracker::new();
        assert_eq!(tracker.next_sequence_id(), 1);

        tracker.consume(100).unwrap();
        assert_eq!(tracker.next_sequence_id(), 101);

        tracker.consume(80).unwrap();
        assert_eq!(tracker.next_sequence_id(), 101);

        assert!(matches!(
            tracker.consume(100),
            Err(MultisigError::SequenceIdReused(100))
        ));
        assert!(matches!(
            tracker.consume(0),
            Err(MultisigError::InvalidSequenceId(0))
        ));
        assert_eq!(tracker.used_count(), 2);
    }

    #[test]
    fn test_authorize_valid_request() {
        let f = fixture();
        let req = request(&f, 1, 1);
        let sender = f.keys[0].address();

        let auth = authorize(
            &f.registry,
            &SequenceTracker::new(),
            &f.instance,
            &sender,
            &req,
            to_datetime(1_000),
        )
        .unwrap();
        assert_eq!(auth.co_signer, f.keys[1].address());
        assert_eq!(auth.fingerprint, req.fingerprint(&f.instance));
    }

    #[test]
    fn test_authorize_rejects_sender_as_cosigner() {
        let f = fixture();
        let req = request(&f, 0, 1);
        let result = authorize(
            &f.registry,
            &SequenceTracker::new(),
            &f.instance,
            &f.keys[0].address(),
            &req,
            to_datetime(1_000),
        );
        assert!(matches!(result, Err(MultisigError::SignerIsSender)));
    }

    #[test]
    fn test_authorize_rejects_tampered_fields() {
        let f = fixture();
        let mut req = request(&f, 1, 1);
        req.value = 11;

        let result = authorize(
            &f.registry,
            &SequenceTracker::new(),
            &f.instance,
            &f.keys[0].address(),
            &req,
            to_datetime(1_000),
        );
        assert!(matches!(result, Err(MultisigError::InvalidSignature)));
    }

    #[test]
    fn test_authorize_rejects_non_owner_signer() {
        let f = fixture();
        let outsider = KeyPair::generate();
        let req = sign_request(&outsider, &f.instance, &"1R".into(), 1, b"", 2_000, 1).unwrap();

        let result = authorize(
            &f.registry,
            &SequenceTracker::new(),
            &f.instance,
            &f.keys[0].address(),
            &req,
            to_datetime(1_000),
        );
        assert!(matches!(result, Err(MultisigError::InvalidSignature)));
    }

    #[test]
    fn test_authorize_rejects_expired_and_replayed() {
        let f = fixture();
        let req = request(&f, 1, 7);
        let sender = f.keys[0].address();

        // Expiry equal to now is already expired
        let expired = authorize(
            &f.registry,
            &SequenceTracker::new(),
            &f.instance,
            &sender,
            &req,
            to_datetime(2_000),
        );
        assert!(matches!(
            expired,
            Err(MultisigError::Expired { expire_time: 2_000 })
        ));

        let mut sequences = SequenceTracker::new();
        sequences.consume(7).unwrap();
        let replayed = authorize(
            &f.registry,
            &sequences,
            &f.instance,
            &sender,
            &req,
            to_datetime(1_000),
        );
        assert!(matches!(replayed, Err(MultisigError::SequenceIdReused(7))));
    }

    #[test]
    fn test_malformed_signature_rejected() {
        let f = fixture();
        let mut req = request(&f, 1, 1);
        req.signature.truncate(10);

        let result = authorize(
            &f.registry,
            &SequenceTracker::new(),
            &f.instance,
            &f.keys[0].address(),
            &req,
            to_datetime(1_000),
        );
        assert!(matches!(result, Err(MultisigError::InvalidSignature)));
    }
}
