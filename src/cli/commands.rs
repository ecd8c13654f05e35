//! CLI commands for the quorum wallet
//!
//! Implements all command handlers for the CLI interface. Every command that
//! changes the wallet saves a fresh snapshot before returning.

use crate::core::{Address, Amount, Fingerprint, SequenceId, SystemClock};
use crate::keystore::{Keystore, OwnerKey};
use crate::ledger::Ledger;
use crate::multisig::{
    sign_request, ExecutionEngine, Outcome, Request, SignedRequest, WalletConfig, WalletEvent,
};
use crate::storage::{Storage, StorageConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Application state
pub struct AppState {
    pub engine: ExecutionEngine,
    pub storage: Storage,
    pub keystore: Keystore,
    pub data_dir: PathBuf,
}

impl AppState {
    /// Load the wallet stored in `data_dir`
    pub fn load(data_dir: PathBuf) -> CliResult<Self> {
        let storage = open_storage(&data_dir)?;
        if !storage.exists() {
            return Err(format!(
                "No wallet in {:?}. Create one with: quorum-wallet init",
                data_dir
            )
            .into());
        }

        let engine = ExecutionEngine::from_snapshot(storage.load()?, Arc::new(SystemClock));
        Ok(Self {
            engine,
            storage,
            keystore: open_keystore(&data_dir)?,
            data_dir,
        })
    }

    pub fn save(&self) -> CliResult<()> {
        self.storage.save(&self.engine.snapshot())?;
        Ok(())
    }

    /// Resolve `owner` to a stored key, proving the caller holds it
    pub fn signer(&self, owner: &str) -> CliResult<OwnerKey> {
        Ok(self.keystore.load(&Address::from(owner))?)
    }
}

fn open_storage(data_dir: &Path) -> CliResult<Storage> {
    Ok(Storage::new(StorageConfig {
        data_dir: data_dir.to_path_buf(),
        ..Default::default()
    })?)
}

pub fn open_keystore(data_dir: &Path) -> CliResult<Keystore> {
    Ok(Keystore::new(&data_dir.join("keys"))?)
}

/// Parse hex call data, with or without a `0x` prefix
pub fn parse_data(data: Option<&str>) -> CliResult<Vec<u8>> {
    match data {
        Some(d) => Ok(hex::decode(d.trim_start_matches("0x"))?),
        None => Ok(Vec::new()),
    }
}

/// Parse a comma-separated owner list
pub fn parse_owners(owners: &str) -> Vec<Address> {
    owners
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(Address::from)
        .collect()
}

fn print_outcome(outcome: &Outcome) {
    match outcome {
        Outcome::Executed { operation: None } => println!("✅ Executed"),
        Outcome::Executed {
            operation: Some(op),
        } => println!("✅ Executed operation {}", op),
        Outcome::Pending {
            operation,
            confirmations_needed,
        } => {
            println!("⏳ Operation pending: {}", operation);
            println!("   Confirmations needed: {}", confirmations_needed);
        }
        Outcome::Ignored => println!("⚠️  Caller is not an owner; nothing happened"),
        Outcome::Revoked {
            operation,
            removed: true,
        } => println!("🗑️  Revoked operation {}", operation),
        Outcome::Revoked {
            operation,
            removed: false,
        } => println!("ℹ️  Nothing pending for {}", operation),
        Outcome::SafeModeActive => println!("🔒 Safe mode is active"),
        Outcome::Deposited { value } => println!("💰 Deposited {}", value),
        Outcome::ForwarderCreated(f) => {
            println!("📮 Forwarder created: {}", f.address);
            println!("   Nonce: {}", f.nonce);
        }
        Outcome::Swept { forwarder, value } => {
            println!("🧹 Swept {} from {}", value, forwarder)
        }
    }
}

/// Generate a new owner key
pub fn cmd_keygen(data_dir: &Path, label: Option<&str>) -> CliResult<()> {
    let key = open_keystore(data_dir)?.create(label)?;

    println!("🔐 New owner key created!");
    println!("   📍 Address: {}", key.address());
    println!("   🔑 Public Key: {}...", &key.public_key()[..32]);
    if let Some(l) = &key.label {
        println!("   🏷️  Label: {}", l);
    }
    println!("\n   ⚠️  IMPORTANT: The private key is stored in the keys directory.");

    Ok(())
}

/// List stored owner keys
pub fn cmd_keys(data_dir: &Path) -> CliResult<()> {
    let keys = open_keystore(data_dir)?.list()?;

    if keys.is_empty() {
        println!("📭 No keys found. Create one with: quorum-wallet keygen");
        return Ok(());
    }

    println!("📋 Keys:");
    for key in &keys {
        println!("   {} ({})", key.address(), key.label.as_deref().unwrap_or("-"));
    }

    Ok(())
}

/// Create a new wallet from `config`
pub fn cmd_init(data_dir: &Path, config: WalletConfig, force: bool) -> CliResult<()> {
    let storage = open_storage(data_dir)?;

    if storage.exists() && !force {
        println!("⚠️  Wallet already exists at {:?}", data_dir);
        println!("   Use --force to reinitialize (this will replace existing data)");
        return Ok(());
    }

    let engine = ExecutionEngine::new(config.clone(), Ledger::new(), Arc::new(SystemClock))?;
    storage.save(&engine.snapshot())?;

    println!("✅ Wallet initialized!");
    println!("   📍 Address: {}", engine.address());
    println!("   👥 Policy: {}", config.description());
    println!("   📅 Daily limit: {}", engine.daily_limit());
    println!("   📁 Data directory: {:?}", data_dir);

    Ok(())
}

/// Run one request as `owner` and save the result
pub fn cmd_request(state: &mut AppState, owner: &str, request: Request) -> CliResult<()> {
    let caller = state.signer(owner)?.address();
    let outcome = state.engine.dispatch(&caller, request)?;
    state.save()?;

    print_outcome(&outcome);
    Ok(())
}

/// Credit an external account and move the funds to `to`, or into the wallet
pub fn cmd_fund(
    state: &mut AppState,
    from: &str,
    amount: Amount,
    to: Option<&str>,
) -> CliResult<()> {
    let from = Address::from(from);
    state.engine.ledger_mut().credit(&from, amount)?;

    match to {
        Some(to) => {
            state.engine.ledger_mut().transfer(&from, &Address::from(to), amount)?;
            println!("💸 Sent {} from {} to {}", amount, from, to);
        }
        None => {
            let outcome = state.engine.deposit(&from, amount)?;
            print_outcome(&outcome);
        }
    }

    state.save()?;
    Ok(())
}

/// Sign a transfer as co-signer and print the request to hand to the sender
#[allow(clippy::too_many_arguments)]
pub fn cmd_sign(
    state: &AppState,
    owner: &str,
    to: &str,
    value: Amount,
    data: Option<&str>,
    expiry: i64,
    sequence_id: Option<SequenceId>,
) -> CliResult<()> {
    let key = state.signer(owner)?;
    let sequence_id = sequence_id.unwrap_or_else(|| state.engine.next_sequence_id());

    let request = sign_request(
        key.key_pair(),
        state.engine.address(),
        &Address::from(to),
        value,
        &parse_data(data)?,
        expiry,
        sequence_id,
    )?;

    println!("✍️  Signed by {}", key.address());
    println!("   Sequence id: {}", request.sequence_id);
    println!("   Expires: {}", request.expire_time);
    println!("   Signature: {}", hex::encode(&request.signature));
    println!("\n{}", serde_json::to_string_pretty(&request)?);

    Ok(())
}

/// Submit a co-signed transfer as `owner`
#[allow(clippy::too_many_arguments)]
pub fn cmd_send_signed(
    state: &mut AppState,
    owner: &str,
    to: &str,
    value: Amount,
    data: Option<&str>,
    expiry: i64,
    sequence_id: SequenceId,
    signature: &str,
) -> CliResult<()> {
    let request = SignedRequest {
        to: Address::from(to),
        value,
        data: parse_data(data)?,
        expire_time: expiry,
        sequence_id,
        signature: hex::decode(signature.trim_start_matches("0x"))?,
    };

    cmd_request(state, owner, Request::ExecuteAndConfirm(request))
}

/// Mark an address as contract-like in the local ledger
pub fn cmd_deploy_code(state: &mut AppState, address: &str, code: &str) -> CliResult<()> {
    let code = hex::decode(code.trim_start_matches("0x"))?;
    state
        .engine
        .ledger_mut()
        .install_code(&Address::from(address), code)?;
    state.save()?;

    println!("📜 Code installed at {}", address);
    println!("   Transfers to it now always need quorum");
    Ok(())
}

/// Display wallet status
pub fn cmd_status(state: &AppState) -> CliResult<()> {
    let engine = &state.engine;

    println!("🏦 Wallet {}", engine.address());
    if let Some(label) = engine.label() {
        println!("   ├─ Label: {}", label);
    }
    println!("   ├─ Balance: {}", engine.balance());
    println!(
        "   ├─ Policy: {}-of-{}",
        engine.threshold(),
        engine.owner_count()
    );
    println!(
        "   ├─ Daily limit: {} (spent today: {}, remaining: {})",
        engine.daily_limit(),
        engine.spent_today(),
        engine.remaining_allowance()
    );
    println!("   ├─ Pending operations: {}", engine.pending_operations().len());
    println!("   ├─ Next sequence id: {}", engine.next_sequence_id());
    println!("   ├─ Calls made: {}", engine.ledger().calls().len());
    println!(
        "   ├─ Safe mode: {}",
        if engine.is_safe_mode() { "on" } else { "off" }
    );
    println!("   └─ Owners:");
    for (i, owner) in engine.owners().iter().enumerate() {
        println!("      {}. {}", i, owner);
    }

    let forwarders = engine.forwarders();
    if !forwarders.is_empty() {
        println!("\n📮 Forwarders:");
        for f in forwarders {
            println!(
                "   {} (nonce {}) - {} waiting",
                f.address,
                f.nonce,
                engine.ledger().balance_of(&f.address)
            );
        }
    }

    Ok(())
}

/// List pending operations, or show one in detail
pub fn cmd_pending(state: &AppState, operation: Option<&str>) -> CliResult<()> {
    let engine = &state.engine;

    if let Some(op) = operation {
        let fingerprint: Fingerprint = op.parse()?;
        let Some(pending) = engine.pending_operation(&fingerprint) else {
            println!("ℹ️  Nothing pending for {}", fingerprint);
            return Ok(());
        };

        println!("⏳ Operation {}", fingerprint);
        println!("   ├─ Action: {}", serde_json::to_string(&pending.action)?);
        println!("   ├─ Proposed by: {}", pending.initiator);
        println!(
            "   ├─ Proposed at: {}",
            pending.proposed_at.format("%Y-%m-%d %H:%M:%S")
        );
        println!(
            "   ├─ Confirmations needed: {}",
            pending.confirmations_needed(engine.threshold())
        );
        println!("   ├─ Confirmed by:");
        for owner in &pending.confirmations {
            println!("   │  └─ {}", owner);
        }
        println!("   └─ Awaiting:");
        for owner in engine.outstanding_owners(&fingerprint) {
            println!("      └─ {}", owner);
        }
        return Ok(());
    }

    let pending = engine.pending_operations();
    println!("📬 Pending operations: {}", pending.len());
    for op in pending {
        println!(
            "   └─ {} | {} | {}/{} confirmations",
            op.fingerprint,
            serde_json::to_string(&op.action)?,
            op.confirmation_count(),
            engine.threshold()
        );
    }

    Ok(())
}

/// Show the event log from `since`
pub fn cmd_events(state: &AppState, since: u64, json: bool) -> CliResult<()> {
    let entries = state.engine.events().since(since);

    if json {
        println!("{}", serde_json::to_string_pretty(entries)?);
        return Ok(());
    }

    println!("📜 Events ({} total):", state.engine.events().len());
    for entry in entries {
        let detail = match &entry.event {
            WalletEvent::SpentTodayReset => String::new(),
            event => serde_json::to_string(event)?,
        };
        println!(
            "   #{} | {} | {} {}",
            entry.index,
            entry.timestamp.format("%Y-%m-%d %H:%M:%S"),
            entry.event.name(),
            detail
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup(threshold: u32, daily_limit: Amount) -> (tempfile::TempDir, Vec<Address>) {
        let temp_dir = tempfile::tempdir().unwrap();
        let keystore = open_keystore(temp_dir.path()).unwrap();
        let owners: Vec<Address> = (0..3)
            .map(|_| keystore.create(None).unwrap().address())
            .collect();

        let config = WalletConfig::new(owners.clone(), threshold, daily_limit).unwrap();
        cmd_init(temp_dir.path(), config, false).unwrap();
        (temp_dir, owners)
    }

    #[test]
    fn test_parse_helpers() {
        assert_eq!(parse_data(Some("0x0a0b")).unwrap(), vec![0x0a, 0x0b]);
        assert!(parse_data(None).unwrap().is_empty());
        assert!(parse_data(Some("zz")).is_err());

        let owners = parse_owners("1Alice, 1Bob,,1Carol");
        assert_eq!(owners.len(), 3);
        assert_eq!(owners[1], Address::from("1Bob"));
    }

    #[test]
    fn test_state_persists_between_commands() {
        let (dir, owners) = setup(2, 50);

        let mut state = AppState::load(dir.path().to_path_buf()).unwrap();
        cmd_fund(&mut state, "1Faucet", 100, None).unwrap();
        cmd_request(
            &mut state,
            owners[0].as_str(),
            Request::Execute {
                to: "1Shop".into(),
                value: 30,
                data: vec![],
            },
        )
        .unwrap();

        let reloaded = AppState::load(dir.path().to_path_buf()).unwrap();
        assert_eq!(reloaded.engine.balance(), 70);
        assert_eq!(reloaded.engine.spent_today(), 30);
        assert_eq!(reloaded.engine.events().len(), 2);
    }

    #[test]
    fn test_unknown_owner_key_rejected() {
        let (dir, _) = setup(2, 0);
        let mut state = AppState::load(dir.path().to_path_buf()).unwrap();

        let result = cmd_request(&mut state, "1Stranger", Request::ActivateSafeMode);
        assert!(result.is_err());
        assert!(!state.engine.is_safe_mode());
    }

    #[test]
    fn test_sign_and_send_signed() {
        let (dir, owners) = setup(2, 0);
        let mut state = AppState::load(dir.path().to_path_buf()).unwrap();
        cmd_fund(&mut state, "1Faucet", 100, None).unwrap();

        let co_signer = state.signer(owners[1].as_str()).unwrap();
        let expiry = chrono::Utc::now().timestamp() + 3_600;
        let request = sign_request(
            co_signer.key_pair(),
            state.engine.address(),
            &"1Shop".into(),
            40,
            b"",
            expiry,
            7,
        )
        .unwrap();

        cmd_send_signed(
            &mut state,
            owners[0].as_str(),
            "1Shop",
            40,
            None,
            expiry,
            7,
            &hex::encode(&request.signature),
        )
        .unwrap();

        assert_eq!(state.engine.balance(), 60);
        assert!(state.engine.is_sequence_id_used(7));
    }

    #[test]
    fn test_init_refuses_to_overwrite() {
        let (dir, owners) = setup(2, 0);
        let before = AppState::load(dir.path().to_path_buf()).unwrap();

        let config = WalletConfig::new(owners, 3, 0).unwrap();
        cmd_init(dir.path(), config, false).unwrap();

        let after = AppState::load(dir.path().to_path_buf()).unwrap();
        assert_eq!(after.engine.address(), before.engine.address());
        assert_eq!(after.engine.threshold(), 2);
    }
}
