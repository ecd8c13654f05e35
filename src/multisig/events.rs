//! Wallet lifecycle events
//!
//! The engine appends to the [`EventLog`] only when a call commits; watchers
//! read it with a cursor via [`EventLog::since`].

use crate::core::{hex_bytes, Address, Amount, Fingerprint, SequenceId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An externally observable lifecycle event
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WalletEvent {
    /// A transfer needs more confirmations before it executes
    ConfirmationNeeded {
        initiator: Address,
        to: Address,
        value: Amount,
        #[serde(with = "hex_bytes")]
        data: Vec<u8>,
        operation: Fingerprint,
    },
    Confirmation {
        owner: Address,
        operation: Fingerprint,
    },
    Revoke {
        owner: Address,
        operation: Fingerprint,
    },
    /// Transfer executed on a single owner's authority
    SingleTransact {
        owner: Address,
        to: Address,
        value: Amount,
    },
    /// Transfer executed after reaching quorum
    MultiTransact {
        owner: Address,
        operation: Fingerprint,
        to: Address,
        value: Amount,
        #[serde(with = "hex_bytes")]
        data: Vec<u8>,
    },
    /// Transfer executed by a sender carrying a co-signer's signature
    CoSignedTransact {
        sender: Address,
        co_signer: Address,
        operation: Fingerprint,
        to: Address,
        value: Amount,
        #[serde(with = "hex_bytes")]
        data: Vec<u8>,
        sequence_id: SequenceId,
    },
    OwnerAdded {
        owner: Address,
    },
    OwnerRemoved {
        owner: Address,
    },
    OwnerChanged {
        old: Address,
        new: Address,
    },
    RequirementChanged {
        new_requirement: u32,
    },
    DailyLimitChanged {
        new_limit: Amount,
    },
    SpentTodayReset,
    /// A pending operation can no longer reach quorum after a registry change
    OperationDropped {
        operation: Fingerprint,
    },
    SafeModeActivated {
        owner: Address,
    },
    Deposit {
        from: Address,
        value: Amount,
    },
}

impl WalletEvent {
    pub fn name(&self) -> &'static str {
        match self {
            WalletEvent::ConfirmationNeeded { .. } => "ConfirmationNeeded",
            WalletEvent::Confirmation { .. } => "Confirmation",
            WalletEvent::Revoke { .. } => "Revoke",
            WalletEvent::SingleTransact { .. } => "SingleTransact",
            WalletEvent::MultiTransact { .. } => "MultiTransact",
            WalletEvent::CoSignedTransact { .. } => "CoSignedTransact",
            WalletEvent::OwnerAdded { .. } => "OwnerAdded",
            WalletEvent::OwnerRemoved { .. } => "OwnerRemoved",
            WalletEvent::OwnerChanged { .. } => "OwnerChanged",
            WalletEvent::RequirementChanged { .. } => "RequirementChanged",
            WalletEvent::DailyLimitChanged { .. } => "DailyLimitChanged",
            WalletEvent::SpentTodayReset => "SpentTodayReset",
            WalletEvent::OperationDropped { .. } => "OperationDropped",
            WalletEvent::SafeModeActivated { .. } => "SafeModeActivated",
            WalletEvent::Deposit { .. } => "Deposit",
        }
    }
}

/// An event with its position in the log
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggedEvent {
    pub index: u64,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: WalletEvent,
}

/// Append-only event log
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct EventLog {
    entries: Vec<LoggedEvent>,
}

impl EventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn append(&mut self, event: WalletEvent, timestamp: DateTime<Utc>) {
        log::debug!("Event {}: {:?}", self.entries.len(), event);
        self.entries.push(LoggedEvent {
            index: self.entries.len() as u64,
            timestamp,
            event,
        });
    }

    pub fn entries(&self) -> &[LoggedEvent] {
        &self.entries
    }

    /// Entries from `cursor` onwards
    pub fn since(&self, cursor: u64) -> &[LoggedEvent] {
        let start = usize::try_from(cursor)
            .unwrap_or(usize::MAX)
            .min(self.entries.len());
        &self.entries[start..]
    }

    /// Events only, without positions
    pub fn events(&self) -> impl Iterator<Item = &WalletEvent> {
        self.entries.iter().map(|e| &e.event)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_and_cursor() {
        let mut log = EventLog::new();
        let now = Utc::now();
        log.append(
            WalletEvent::Deposit {
                from: "1Alice".into(),
                value: 5,
            },
            now,
        );
        log.append(WalletEvent::SpentTodayReset, now);

        assert_eq!(log.len(), 2);
        assert_eq!(log.since(1).len(), 1);
        assert_eq!(log.since(1)[0].index, 1);
        assert!(log.since(10).is_empty());
        assert_eq!(log.events().next().map(|e| e.name()), Some("Deposit"));
    }

    #[test]
    fn test_logged_event_json_shape() {
        let mut log = EventLog::new();
        log.append(
            WalletEvent::SingleTransact {
                owner: "1Alice".into(),
                to: "1Bob".into(),
                value: 3,
            },
            Utc::now(),
        );

        let json = serde_json::to_value(&log.entries()[0]).unwrap();
        assert_eq!(json["event"], "single_transact");
        assert_eq!(json["value"], 3);

        let back: LoggedEvent = serde_json::from_value(json).unwrap();
        assert_eq!(back, log.entries()[0]);
    }
}
