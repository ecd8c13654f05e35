//! Request shapes for every public entry point
//!
//! Each call into the engine can be expressed as one [`Request`] variant,
//! parsed and typed before it reaches any state.

use crate::core::{hex_bytes, Address, Amount, Fingerprint};
use crate::forwarder::Forwarder;
use crate::multisig::signature::SignedRequest;
use serde::{Deserialize, Serialize};

/// A call into the wallet
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "request", rename_all = "snake_case")]
pub enum Request {
    Execute {
        to: Address,
        value: Amount,
        #[serde(default, with = "hex_bytes")]
        data: Vec<u8>,
    },
    Confirm {
        operation: Fingerprint,
    },
    Revoke {
        operation: Fingerprint,
    },
    ExecuteAndConfirm(SignedRequest),
    AddOwner {
        owner: Address,
    },
    RemoveOwner {
        owner: Address,
    },
    ReplaceOwner {
        old: Address,
        new: Address,
    },
    ChangeThreshold {
        threshold: u32,
    },
    SetDailyLimit {
        limit: Amount,
    },
    ResetSpentToday,
    ActivateSafeMode,
    Deposit {
        value: Amount,
    },
    CreateForwarder,
    SweepForwarder {
        forwarder: Address,
    },
}

impl Request {
    pub fn name(&self) -> &'static str {
        match self {
            Request::Execute { .. } => "execute",
            Request::Confirm { .. } => "confirm",
            Request::Revoke { .. } => "revoke",
            Request::ExecuteAndConfirm(_) => "execute_and_confirm",
            Request::AddOwner { .. } => "add_owner",
            Request::RemoveOwner { .. } => "remove_owner",
            Request::ReplaceOwner { .. } => "replace_owner",
            Request::ChangeThreshold { .. } => "change_threshold",
            Request::SetDailyLimit { .. } => "set_daily_limit",
            Request::ResetSpentToday => "reset_spent_today",
            Request::ActivateSafeMode => "activate_safe_mode",
            Request::Deposit { .. } => "deposit",
            Request::CreateForwarder => "create_forwarder",
            Request::SweepForwarder { .. } => "sweep_forwarder",
        }
    }

    /// Administrative requests fail loudly for non-owners
    pub fn is_administrative(&self) -> bool {
        matches!(
            self,
            Request::AddOwner { .. }
                | Request::RemoveOwner { .. }
                | Request::ReplaceOwner { .. }
                | Request::ChangeThreshold { .. }
                | Request::SetDailyLimit { .. }
                | Request::ResetSpentToday
                | Request::ActivateSafeMode
        )
    }
}

/// Result of a committed call
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The action ran; `operation` is set when it ran through quorum
    Executed { operation: Option<Fingerprint> },
    /// The action is recorded and waits for more confirmations
    Pending {
        operation: Fingerprint,
        confirmations_needed: u32,
    },
    /// The caller is not an owner; nothing happened
    Ignored,
    /// Result of a revoke; `false` when nothing was pending
    Revoked { operation: Fingerprint, removed: bool },
    SafeModeActive,
    Deposited { value: Amount },
    ForwarderCreated(Forwarder),
    Swept { forwarder: Address, value: Amount },
}

impl Outcome {
    pub fn is_executed(&self) -> bool {
        matches!(self, Outcome::Executed { .. })
    }

    /// Fingerprint of the pending operation, if the call left one
    pub fn pending_operation(&self) -> Option<Fingerprint> {
        match self {
            Outcome::Pending { operation, .. } => Some(*operation),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_json_shape() {
        let json = r#"{"request": "execute", "to": "1Bob", "value": 5}"#;
        let request: Request = serde_json::from_str(json).unwrap();
        assert_eq!(
            request,
            Request::Execute {
                to: "1Bob".into(),
                value: 5,
                data: vec![],
            }
        );
        assert_eq!(request.name(), "execute");
        assert!(!request.is_administrative());

        let reset: Request = serde_json::from_str(r#"{"request": "reset_spent_today"}"#).unwrap();
        assert!(reset.is_administrative());
    }

    #[test]
    fn test_signed_request_variant() {
        let request = Request::ExecuteAndConfirm(SignedRequest {
            to: "1Bob".into(),
            value: 1,
            data: vec![0x01],
            expire_time: 10,
            sequence_id: 3,
            signature: vec![0xaa; 65],
        });

        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains(r#""request":"execute_and_confirm""#));
        assert_eq!(serde_json::from_str::<Request>(&json).unwrap(), request);
    }
}
