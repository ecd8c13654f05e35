//! Execution engine
//!
//! The single entry point of a multisig wallet. Every public call decides
//! whether its action runs immediately, records a confirmation toward a
//! pending operation, or is rejected.
//!
//! Calls are all-or-nothing: each one runs against a draft copy of the wallet
//! state and ledger, and the draft (with the events it produced) replaces the
//! live state only when the call returns `Ok`.

use crate::core::{Address, Amount, Clock, Fingerprint, SequenceId, SystemClock};
use crate::forwarder::{self, Forwarder, ForwarderRegistry};
use crate::ledger::Ledger;
use crate::multisig::config::WalletConfig;
use crate::multisig::daily_limit::DailyLimitTracker;
use crate::multisig::events::{EventLog, WalletEvent};
use crate::multisig::operation::{operation_fingerprint, Action, OperationLog, PendingOperation};
use crate::multisig::owners::OwnerRegistry;
use crate::multisig::request::{Outcome, Request};
use crate::multisig::signature::{authorize, SequenceTracker, SignedRequest};
use crate::multisig::MultisigError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// All mutable state of one wallet instance
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WalletState {
    /// Instance address; holds the wallet's funds and separates fingerprints
    pub address: Address,
    pub label: Option<String>,
    pub owners: OwnerRegistry,
    pub operations: OperationLog,
    pub daily_limit: DailyLimitTracker,
    pub sequences: SequenceTracker,
    pub forwarders: ForwarderRegistry,
    pub safe_mode: bool,
    pub created_at: DateTime<Utc>,
}

/// Everything needed to restore an engine
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WalletSnapshot {
    pub state: WalletState,
    pub ledger: Ledger,
    pub events: EventLog,
}

/// Draft of one call: committed only if the call succeeds
struct Txn {
    state: WalletState,
    ledger: Ledger,
    events: Vec<WalletEvent>,
    now: DateTime<Utc>,
}

impl Txn {
    fn require_owner(&self, caller: &Address) -> Result<(), MultisigError> {
        if self.state.owners.is_owner(caller) {
            Ok(())
        } else {
            Err(MultisigError::Unauthorized(caller.clone()))
        }
    }

    fn check_safe_mode(&self, to: &Address) -> Result<(), MultisigError> {
        if self.state.safe_mode && !self.state.owners.is_owner(to) {
            return Err(MultisigError::SafeModeViolation(to.clone()));
        }
        Ok(())
    }

    fn execute(
        &mut self,
        caller: &Address,
        to: Address,
        value: Amount,
        data: Vec<u8>,
    ) -> Result<Outcome, MultisigError> {
        if !self.state.owners.is_owner(caller) {
            log::debug!("Ignoring execute from non-owner {}", caller);
            return Ok(Outcome::Ignored);
        }
        self.check_safe_mode(&to)?;

        // Calls and contract targets always go through quorum
        let is_call = !data.is_empty() || self.ledger.has_code(&to);
        if !is_call && self.state.daily_limit.try_reserve(value, self.now) {
            self.perform(caller, Action::Transfer { to, value, data }, None)?;
            return Ok(Outcome::Executed { operation: None });
        }

        self.submit(caller, Action::Transfer { to, value, data })
    }

    /// Record `owner`'s confirmation of `action`, proposing it if new
    fn submit(&mut self, owner: &Address, action: Action) -> Result<Outcome, MultisigError> {
        let fingerprint = operation_fingerprint(&self.state.address, &action);
        if self.state.operations.contains(&fingerprint) {
            return self.confirm(owner, fingerprint);
        }

        let threshold = self.state.owners.threshold();
        if threshold <= 1 {
            self.perform(owner, action, None)?;
            return Ok(Outcome::Executed { operation: None });
        }

        if let Action::Transfer { to, value, data } = &action {
            self.events.push(WalletEvent::ConfirmationNeeded {
                initiator: owner.clone(),
                to: to.clone(),
                value: *value,
                data: data.clone(),
                operation: fingerprint,
            });
        }
        self.events.push(WalletEvent::Confirmation {
            owner: owner.clone(),
            operation: fingerprint,
        });

        let operation = PendingOperation::new(
            fingerprint,
            action,
            owner.clone(),
            self.state.owners.owners(),
            self.now,
        );
        let confirmations_needed = operation.confirmations_needed(threshold);
        self.state.operations.insert(operation);

        log::info!(
            "Operation {} proposed by {}, {} more confirmation(s) needed",
            fingerprint,
            owner,
            confirmations_needed
        );
        Ok(Outcome::Pending {
            operation: fingerprint,
            confirmations_needed,
        })
    }

    fn confirm(
        &mut self,
        owner: &Address,
        fingerprint: Fingerprint,
    ) -> Result<Outcome, MultisigError> {
        self.require_owner(owner)?;

        let threshold = self.state.owners.threshold();
        let confirmations_needed = self
            .state
            .operations
            .confirm(&fingerprint, owner)?
            .confirmations_needed(threshold);
        self.events.push(WalletEvent::Confirmation {
            owner: owner.clone(),
            operation: fingerprint,
        });

        if confirmations_needed > 0 {
            log::info!(
                "Operation {} confirmed by {}, {} more needed",
                fingerprint,
                owner,
                confirmations_needed
            );
            return Ok(Outcome::Pending {
                operation: fingerprint,
                confirmations_needed,
            });
        }

        let operation = self
            .state
            .operations
            .remove(&fingerprint)
            .ok_or(MultisigError::OperationNotFound(fingerprint))?;
        log::info!("Operation {} reached quorum", fingerprint);
        self.perform(&operation.initiator, operation.action, Some(fingerprint))?;

        Ok(Outcome::Executed {
            operation: Some(fingerprint),
        })
    }

    fn revoke(&mut self, owner: &Address, fingerprint: Fingerprint) -> Result<bool, MultisigError> {
        self.require_owner(owner)?;

        if self.state.operations.remove(&fingerprint).is_none() {
            log::debug!("Nothing pending to revoke for {}", fingerprint);
            return Ok(false);
        }

        self.events.push(WalletEvent::Revoke {
            owner: owner.clone(),
            operation: fingerprint,
        });
        log::info!("Operation {} revoked by {}", fingerprint, owner);
        Ok(true)
    }

    fn execute_and_confirm(
        &mut self,
        sender: &Address,
        request: SignedRequest,
    ) -> Result<Outcome, MultisigError> {
        self.require_owner(sender)?;

        let auth = authorize(
            &self.state.owners,
            &self.state.sequences,
            &self.state.address,
            sender,
            &request,
            self.now,
        )?;
        self.check_safe_mode(&request.to)?;
        self.state.sequences.consume(request.sequence_id)?;

        let threshold = self.state.owners.threshold();
        let SignedRequest {
            to,
            value,
            data,
            sequence_id,
            ..
        } = request;

        if threshold <= 2 {
            let wallet = self.state.address.clone();
            self.ledger.call(&wallet, &to, value, &data)?;
            log::info!(
                "Co-signed transfer of {} to {} by {} and {} (sequence {})",
                value,
                to,
                sender,
                auth.co_signer,
                sequence_id
            );
            self.events.push(WalletEvent::CoSignedTransact {
                sender: sender.clone(),
                co_signer: auth.co_signer,
                operation: auth.fingerprint,
                to,
                value,
                data,
                sequence_id,
            });
            return Ok(Outcome::Executed {
                operation: Some(auth.fingerprint),
            });
        }

        // Above 2-of-N the two signatures count as two confirmations
        let action = Action::Transfer {
            to: to.clone(),
            value,
            data: data.clone(),
        };
        let mut operation = PendingOperation::new(
            auth.fingerprint,
            action,
            sender.clone(),
            self.state.owners.owners(),
            self.now,
        );
        operation.confirmations.insert(auth.co_signer.clone());
        let confirmations_needed = operation.confirmations_needed(threshold);
        self.state.operations.insert(operation);

        self.events.push(WalletEvent::ConfirmationNeeded {
            initiator: sender.clone(),
            to,
            value,
            data,
            operation: auth.fingerprint,
        });
        for owner in [sender.clone(), auth.co_signer] {
            self.events.push(WalletEvent::Confirmation {
                owner,
                operation: auth.fingerprint,
            });
        }

        Ok(Outcome::Pending {
            operation: auth.fingerprint,
            confirmations_needed,
        })
    }

    /// Apply an authorized action
    fn perform(
        &mut self,
        initiator: &Address,
        action: Action,
        operation: Option<Fingerprint>,
    ) -> Result<(), MultisigError> {
        let changes_registry = action.changes_registry();

        match action {
            Action::Transfer { to, value, data } => {
                self.check_safe_mode(&to)?;
                let wallet = self.state.address.clone();
                self.ledger.call(&wallet, &to, value, &data)?;

                log::info!("Transferred {} to {} (initiated by {})", value, to, initiator);
                self.events.push(match operation {
                    Some(operation) => WalletEvent::MultiTransact {
                        owner: initiator.clone(),
                        operation,
                        to,
                        value,
                        data,
                    },
                    None => WalletEvent::SingleTransact {
                        owner: initiator.clone(),
                        to,
                        value,
                    },
                });
            }
            Action::AddOwner { owner } => {
                self.state.owners.add(&owner)?;
                log::info!("Owner added: {}", owner);
                self.events.push(WalletEvent::OwnerAdded { owner });
            }
            Action::RemoveOwner { owner } => {
                self.state.owners.remove(&owner)?;
                log::info!("Owner removed: {}", owner);
                self.events.push(WalletEvent::OwnerRemoved { owner });
            }
            Action::ReplaceOwner { old, new } => {
                self.state.owners.replace(&old, &new)?;
                log::info!("Owner {} replaced by {}", old, new);
                self.events.push(WalletEvent::OwnerChanged { old, new });
            }
            Action::ChangeThreshold { threshold } => {
                self.state.owners.set_threshold(threshold)?;
                log::info!("Threshold changed to {}", threshold);
                self.events.push(WalletEvent::RequirementChanged {
                    new_requirement: threshold,
                });
            }
            Action::SetDailyLimit { limit } => {
                self.state.daily_limit.set_limit(limit);
                log::info!("Daily limit set to {}", limit);
                self.events
                    .push(WalletEvent::DailyLimitChanged { new_limit: limit });

                // Reset confirmations given under the old ceiling no longer apply
                let reset = operation_fingerprint(&self.state.address, &Action::ResetSpentToday);
                if self.state.operations.remove(&reset).is_some() {
                    log::warn!("Dropping operation {}: daily limit changed", reset);
                    self.events
                        .push(WalletEvent::OperationDropped { operation: reset });
                }
            }
            Action::ResetSpentToday => {
                self.state.daily_limit.reset_spent(self.now);
                log::info!("Spent-today counter reset");
                self.events.push(WalletEvent::SpentTodayReset);
            }
        }

        if changes_registry {
            self.drop_unreachable();
        }
        Ok(())
    }

    fn drop_unreachable(&mut self) {
        for operation in self.state.operations.prune_unreachable(&self.state.owners) {
            log::warn!("Dropping operation {}: quorum no longer reachable", operation);
            self.events.push(WalletEvent::OperationDropped { operation });
        }
    }

    fn administer(&mut self, caller: &Address, action: Action) -> Result<Outcome, MultisigError> {
        self.require_owner(caller)?;

        let owners = &self.state.owners;
        match &action {
            Action::AddOwner { owner } => owners.check_add(owner)?,
            Action::RemoveOwner { owner } => owners.check_remove(owner)?,
            Action::ReplaceOwner { old, new } => owners.check_replace(old, new)?,
            Action::ChangeThreshold { threshold } => owners.check_threshold(*threshold)?,
            Action::SetDailyLimit { .. } | Action::ResetSpentToday | Action::Transfer { .. } => {}
        }

        self.submit(caller, action)
    }

    fn deposit(&mut self, from: &Address, value: Amount) -> Result<Outcome, MultisigError> {
        if value > 0 {
            let wallet = self.state.address.clone();
            self.ledger.transfer(from, &wallet, value)?;
            self.events.push(WalletEvent::Deposit {
                from: from.clone(),
                value,
            });
            log::info!("Deposit of {} from {}", value, from);
        }
        Ok(Outcome::Deposited { value })
    }

    fn sweep_forwarder(&mut self, forwarder: &Address) -> Result<Outcome, MultisigError> {
        if !self.state.forwarders.contains(forwarder) {
            return Err(MultisigError::UnknownForwarder(forwarder.clone()));
        }

        let wallet = self.state.address.clone();
        let value = forwarder::sweep(&mut self.ledger, forwarder, &wallet)?;
        if value > 0 {
            self.events.push(WalletEvent::Deposit {
                from: forwarder.clone(),
                value,
            });
            log::info!("Swept {} from forwarder {}", value, forwarder);
        }
        Ok(Outcome::Swept {
            forwarder: forwarder.clone(),
            value,
        })
    }
}

/// A multisig wallet: owner quorum, daily allowance and co-signed execution
pub struct ExecutionEngine {
    state: WalletState,
    ledger: Ledger,
    events: EventLog,
    clock: Arc<dyn Clock>,
}

impl ExecutionEngine {
    /// Create a wallet from a configuration on top of an existing ledger
    pub fn new(
        config: WalletConfig,
        ledger: Ledger,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, MultisigError> {
        let owners = OwnerRegistry::from_config(&config)?;
        let now = clock.now();

        let state = WalletState {
            address: config.instance_address(),
            label: config.label.clone(),
            owners,
            operations: OperationLog::new(),
            daily_limit: DailyLimitTracker::new(config.daily_limit, now),
            sequences: SequenceTracker::new(),
            forwarders: ForwarderRegistry::new(),
            safe_mode: false,
            created_at: now,
        };

        log::info!(
            "Created {} wallet {} with daily limit {}",
            config.description(),
            state.address,
            config.daily_limit
        );
        Ok(Self {
            state,
            ledger,
            events: EventLog::new(),
            clock,
        })
    }

    /// Create a wallet on an empty ledger with wall-clock time
    pub fn with_system_clock(config: WalletConfig) -> Result<Self, MultisigError> {
        Self::new(config, Ledger::new(), Arc::new(SystemClock))
    }

    /// Restore a wallet from a snapshot
    pub fn from_snapshot(snapshot: WalletSnapshot, clock: Arc<dyn Clock>) -> Self {
        Self {
            state: snapshot.state,
            ledger: snapshot.ledger,
            events: snapshot.events,
            clock,
        }
    }

    pub fn snapshot(&self) -> WalletSnapshot {
        WalletSnapshot {
            state: self.state.clone(),
            ledger: self.ledger.clone(),
            events: self.events.clone(),
        }
    }

    /// Run `f` against a draft and commit it only on success
    fn transact<T>(
        &mut self,
        name: &str,
        f: impl FnOnce(&mut Txn) -> Result<T, MultisigError>,
    ) -> Result<T, MultisigError> {
        let mut txn = Txn {
            state: self.state.clone(),
            ledger: self.ledger.draft(),
            events: Vec::new(),
            now: self.clock.now(),
        };

        let out = f(&mut txn).map_err(|e| {
            log::debug!("{} rejected: {}", name, e);
            e
        })?;

        let Txn {
            state,
            ledger,
            events,
            now,
        } = txn;
        self.state = state;
        self.ledger.commit(ledger);
        for event in events {
            self.events.append(event, now);
        }
        Ok(out)
    }

    // ---------------------------------------------------------------------
    // Entry points
    // ---------------------------------------------------------------------

    /// Send `value` (and optionally call with `data`) to `to`
    ///
    /// Plain transfers within the daily allowance run immediately. Calls,
    /// contract targets and transfers over the allowance need quorum.
    /// Non-owners are ignored.
    pub fn execute(
        &mut self,
        caller: &Address,
        to: &Address,
        value: Amount,
        data: &[u8],
    ) -> Result<Outcome, MultisigError> {
        self.transact("execute", |txn| {
            txn.execute(caller, to.clone(), value, data.to_vec())
        })
    }

    /// Confirm a pending operation; the confirmation that reaches the
    /// threshold executes it
    pub fn confirm(
        &mut self,
        caller: &Address,
        operation: &Fingerprint,
    ) -> Result<Outcome, MultisigError> {
        self.transact("confirm", |txn| txn.confirm(caller, *operation))
    }

    /// Remove a pending operation; returns `false` when nothing was pending
    pub fn revoke(
        &mut self,
        caller: &Address,
        operation: &Fingerprint,
    ) -> Result<bool, MultisigError> {
        self.transact("revoke", |txn| txn.revoke(caller, *operation))
    }

    /// Execute a transfer carried by `sender` with a co-signer's signature
    pub fn execute_and_confirm(
        &mut self,
        sender: &Address,
        request: SignedRequest,
    ) -> Result<Outcome, MultisigError> {
        self.transact("execute_and_confirm", |txn| {
            txn.execute_and_confirm(sender, request)
        })
    }

    pub fn add_owner(&mut self, caller: &Address, owner: &Address) -> Result<Outcome, MultisigError> {
        let action = Action::AddOwner {
            owner: owner.clone(),
        };
        self.transact("add_owner", |txn| txn.administer(caller, action))
    }

    pub fn remove_owner(
        &mut self,
        caller: &Address,
        owner: &Address,
    ) -> Result<Outcome, MultisigError> {
        let action = Action::RemoveOwner {
            owner: owner.clone(),
        };
        self.transact("remove_owner", |txn| txn.administer(caller, action))
    }

    pub fn replace_owner(
        &mut self,
        caller: &Address,
        old: &Address,
        new: &Address,
    ) -> Result<Outcome, MultisigError> {
        let action = Action::ReplaceOwner {
            old: old.clone(),
            new: new.clone(),
        };
        self.transact("replace_owner", |txn| txn.administer(caller, action))
    }

    pub fn change_threshold(
        &mut self,
        caller: &Address,
        threshold: u32,
    ) -> Result<Outcome, MultisigError> {
        let action = Action::ChangeThreshold { threshold };
        self.transact("change_threshold", |txn| txn.administer(caller, action))
    }

    pub fn set_daily_limit(
        &mut self,
        caller: &Address,
        limit: Amount,
    ) -> Result<Outcome, MultisigError> {
        let action = Action::SetDailyLimit { limit };
        self.transact("set_daily_limit", |txn| txn.administer(caller, action))
    }

    pub fn reset_spent_today(&mut self, caller: &Address) -> Result<Outcome, MultisigError> {
        self.transact("reset_spent_today", |txn| {
            txn.administer(caller, Action::ResetSpentToday)
        })
    }

    /// Restrict all outgoing value to owner addresses; cannot be undone
    pub fn activate_safe_mode(&mut self, caller: &Address) -> Result<Outcome, MultisigError> {
        self.transact("activate_safe_mode", |txn| {
            txn.require_owner(caller)?;
            if !txn.state.safe_mode {
                txn.state.safe_mode = true;
                txn.events.push(WalletEvent::SafeModeActivated {
                    owner: caller.clone(),
                });
                log::warn!("Safe mode activated by {}", caller);
            }
            Ok(Outcome::SafeModeActive)
        })
    }

    /// Move `value` from `from` into the wallet
    pub fn deposit(&mut self, from: &Address, value: Amount) -> Result<Outcome, MultisigError> {
        self.transact("deposit", |txn| txn.deposit(from, value))
    }

    /// Derive the next deposit forwarder for this wallet
    pub fn create_forwarder(&mut self, caller: &Address) -> Result<Forwarder, MultisigError> {
        self.transact("create_forwarder", |txn| {
            txn.require_owner(caller)?;
            let wallet = txn.state.address.clone();
            let forwarder = txn.state.forwarders.create(&wallet);
            log::info!("Forwarder {} created (nonce {})", forwarder.address, forwarder.nonce);
            Ok(forwarder)
        })
    }

    /// Credit a forwarder's whole balance to the wallet
    pub fn sweep_forwarder(&mut self, forwarder: &Address) -> Result<Amount, MultisigError> {
        let outcome = self.transact("sweep_forwarder", |txn| txn.sweep_forwarder(forwarder))?;
        match outcome {
            Outcome::Swept { value, .. } => Ok(value),
            _ => Ok(0),
        }
    }

    /// Route a typed request to its entry point
    pub fn dispatch(&mut self, caller: &Address, request: Request) -> Result<Outcome, MultisigError> {
        if request.is_administrative() {
            log::info!("Administrative request {} from {}", request.name(), caller);
        } else {
            log::debug!("Dispatching {} from {}", request.name(), caller);
        }
        match request {
            Request::Execute { to, value, data } => self.execute(caller, &to, value, &data),
            Request::Confirm { operation } => self.confirm(caller, &operation),
            Request::Revoke { operation } => {
                let removed = self.revoke(caller, &operation)?;
                Ok(Outcome::Revoked { operation, removed })
            }
            Request::ExecuteAndConfirm(signed) => self.execute_and_confirm(caller, signed),
            Request::AddOwner { owner } => self.add_owner(caller, &owner),
            Request::RemoveOwner { owner } => self.remove_owner(caller, &owner),
            Request::ReplaceOwner { old, new } => self.replace_owner(caller, &old, &new),
            Request::ChangeThreshold { threshold } => self.change_threshold(caller, threshold),
            Request::SetDailyLimit { limit } => self.set_daily_limit(caller, limit),
            Request::ResetSpentToday => self.reset_spent_today(caller),
            Request::ActivateSafeMode => self.activate_safe_mode(caller),
            Request::Deposit { value } => self.deposit(caller, value),
            Request::CreateForwarder => self.create_forwarder(caller).map(Outcome::ForwarderCreated),
            Request::SweepForwarder { forwarder } => {
                let value = self.sweep_forwarder(&forwarder)?;
                Ok(Outcome::Swept { forwarder, value })
            }
        }
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    /// Instance address holding the wallet's funds
    pub fn address(&self) -> &Address {
        &self.state.address
    }

    pub fn label(&self) -> Option<&str> {
        self.state.label.as_deref()
    }

    pub fn is_owner(&self, id: &Address) -> bool {
        self.state.owners.is_owner(id)
    }

    pub fn owner_count(&self) -> usize {
        self.state.owners.owner_count()
    }

    pub fn owner_at(&self, index: usize) -> Option<&Address> {
        self.state.owners.owner_at(index)
    }

    pub fn owners(&self) -> &[Address] {
        self.state.owners.owners()
    }

    pub fn threshold(&self) -> u32 {
        self.state.owners.threshold()
    }

    pub fn pending_operations(&self) -> Vec<&PendingOperation> {
        self.state.operations.iter().collect()
    }

    pub fn pending_operation(&self, operation: &Fingerprint) -> Option<&PendingOperation> {
        self.state.operations.get(operation)
    }

    pub fn has_confirmed(&self, operation: &Fingerprint, owner: &Address) -> bool {
        self.state
            .operations
            .get(operation)
            .map_or(false, |op| op.has_confirmed(owner))
    }

    /// Confirmations still needed under the current threshold
    pub fn confirmations_needed(&self, operation: &Fingerprint) -> Option<u32> {
        self.state
            .operations
            .get(operation)
            .map(|op| op.confirmations_needed(self.threshold()))
    }

    /// Current owners who have not yet confirmed and may still do so
    pub fn outstanding_owners(&self, operation: &Fingerprint) -> Vec<Address> {
        self.state
            .operations
            .get(operation)
            .map(|op| op.outstanding(&self.state.owners).cloned().collect())
            .unwrap_or_default()
    }

    pub fn daily_limit(&self) -> Amount {
        self.state.daily_limit.limit()
    }

    pub fn spent_today(&self) -> Amount {
        self.state.daily_limit.spent_at(self.clock.now())
    }

    pub fn remaining_allowance(&self) -> Amount {
        self.state.daily_limit.remaining_at(self.clock.now())
    }

    pub fn next_sequence_id(&self) -> SequenceId {
        self.state.sequences.next_sequence_id()
    }

    pub fn is_sequence_id_used(&self, id: SequenceId) -> bool {
        self.state.sequences.is_used(id)
    }

    pub fn is_safe_mode(&self) -> bool {
        self.state.safe_mode
    }

    pub fn forwarders(&self) -> &[Forwarder] {
        self.state.forwarders.list()
    }

    /// Wallet balance on the ledger
    pub fn balance(&self) -> Amount {
        self.ledger.balance_of(&self.state.address)
    }

    pub fn events(&self) -> &EventLog {
        &self.events
    }

    pub fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// The execution environment's ledger, for funding accounts and deploying code
    pub fn ledger_mut(&mut self) -> &mut Ledger {
        &mut self.ledger
    }
}
