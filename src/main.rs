//! Quorum Wallet CLI Application
//!
//! A command-line interface for operating an M-of-N multisig wallet.

use clap::{Parser, Subcommand};
use quorum_wallet::cli::{self, AppState};
use quorum_wallet::core::Address;
use quorum_wallet::multisig::{Request, WalletConfig};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "quorum-wallet")]
#[command(version = "0.1.0")]
#[command(about = "M-of-N multisig wallet with a daily allowance", long_about = None)]
struct Cli {
    /// Data directory for wallet storage
    #[arg(short, long, default_value = ".quorum_wallet")]
    data_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new owner key
    Keygen {
        /// Optional label for the key
        #[arg(short, long)]
        label: Option<String>,
    },

    /// List owner keys
    Keys,

    /// Initialize a new wallet
    Init {
        /// Comma-separated owner addresses
        #[arg(long, required_unless_present = "config")]
        owners: Option<String>,

        /// Confirmations required (M)
        #[arg(long, required_unless_present = "config")]
        threshold: Option<u32>,

        /// Amount a single owner may send per day
        #[arg(long, default_value = "0")]
        daily_limit: u64,

        /// Salt for the instance address
        #[arg(long)]
        salt: Option<u64>,

        /// Human-readable wallet label
        #[arg(short, long)]
        label: Option<String>,

        /// Wallet configuration file (JSON)
        #[arg(long, conflicts_with_all = ["owners", "threshold"])]
        config: Option<PathBuf>,

        /// Replace an existing wallet
        #[arg(long)]
        force: bool,
    },

    /// Credit an external account and deposit into the wallet
    Fund {
        #[arg(short, long)]
        from: String,

        #[arg(short, long)]
        amount: u64,

        /// Send to this address instead of the wallet (e.g. a forwarder)
        #[arg(short, long)]
        to: Option<String>,
    },

    /// Send funds, immediately if within the daily limit
    Execute {
        #[arg(short, long)]
        owner: String,

        #[arg(short, long)]
        to: String,

        #[arg(short, long)]
        value: u64,

        /// Call data (hex)
        #[arg(long)]
        data: Option<String>,
    },

    /// Confirm a pending operation
    Confirm {
        #[arg(short, long)]
        owner: String,

        /// Operation fingerprint (hex)
        #[arg(long)]
        operation: String,
    },

    /// Revoke a pending operation
    Revoke {
        #[arg(short, long)]
        owner: String,

        #[arg(long)]
        operation: String,
    },

    /// Co-sign a transfer for another owner to submit
    Sign {
        #[arg(short, long)]
        owner: String,

        #[arg(short, long)]
        to: String,

        #[arg(short, long)]
        value: u64,

        #[arg(long)]
        data: Option<String>,

        /// Unix time the signature expires (default: one hour from now)
        #[arg(long)]
        expiry: Option<i64>,

        /// Sequence id (default: next suggested id)
        #[arg(long)]
        sequence_id: Option<u64>,
    },

    /// Submit a transfer co-signed by another owner
    SendSigned {
        #[arg(short, long)]
        owner: String,

        #[arg(short, long)]
        to: String,

        #[arg(short, long)]
        value: u64,

        #[arg(long)]
        data: Option<String>,

        #[arg(long)]
        expiry: i64,

        #[arg(long)]
        sequence_id: u64,

        /// Co-signer's signature (hex)
        #[arg(long)]
        signature: String,
    },

    /// Propose or confirm adding an owner
    AddOwner {
        #[arg(short, long)]
        owner: String,

        #[arg(long)]
        new_owner: String,
    },

    /// Propose or confirm removing an owner
    RemoveOwner {
        #[arg(short, long)]
        owner: String,

        #[arg(long)]
        target: String,
    },

    /// Propose or confirm replacing an owner
    ReplaceOwner {
        #[arg(short, long)]
        owner: String,

        #[arg(long)]
        old: String,

        #[arg(long)]
        new: String,
    },

    /// Propose or confirm a new threshold
    ChangeThreshold {
        #[arg(short, long)]
        owner: String,

        #[arg(long)]
        threshold: u32,
    },

    /// Propose or confirm a new daily limit
    SetDailyLimit {
        #[arg(short, long)]
        owner: String,

        #[arg(long)]
        limit: u64,
    },

    /// Propose or confirm resetting today's spend
    ResetSpentToday {
        #[arg(short, long)]
        owner: String,
    },

    /// Restrict transfers to owner addresses (irreversible)
    SafeMode {
        #[arg(short, long)]
        owner: String,
    },

    /// Deposit forwarder operations
    Forwarder {
        #[command(subcommand)]
        action: ForwarderCommands,
    },

    /// Install code at an address so transfers to it need quorum
    DeployCode {
        #[arg(short, long)]
        address: String,

        /// Code bytes (hex)
        #[arg(long)]
        code: String,
    },

    /// Show wallet status
    Status,

    /// List pending operations
    Pending {
        /// Show one operation in detail
        #[arg(long)]
        operation: Option<String>,
    },

    /// Show the event log
    Events {
        /// First event index to show
        #[arg(long, default_value = "0")]
        since: u64,

        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
}

#[derive(Subcommand)]
enum ForwarderCommands {
    /// Create a new forwarding address
    New {
        #[arg(short, long)]
        owner: String,
    },

    /// Move a forwarder's balance into the wallet
    Sweep {
        #[arg(short, long)]
        address: String,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    // Commands that don't need a loaded wallet
    match &cli.command {
        Commands::Keygen { label } => return cli::cmd_keygen(&cli.data_dir, label.as_deref()),
        Commands::Keys => return cli::cmd_keys(&cli.data_dir),
        Commands::Init {
            owners,
            threshold,
            daily_limit,
            salt,
            label,
            config,
            force,
        } => {
            let config = match config {
                Some(path) => WalletConfig::from_file(path)?,
                None => {
                    let owners = cli::parse_owners(owners.as_deref().unwrap_or_default());
                    let config =
                        WalletConfig::new(owners, threshold.unwrap_or_default(), *daily_limit)?;
                    match salt {
                        Some(salt) => config.with_salt(*salt),
                        None => config,
                    }
                }
            };
            let config = match label {
                Some(label) => config.with_label(label.as_str()),
                None => config,
            };
            return cli::cmd_init(&cli.data_dir, config, *force);
        }
        _ => {}
    }

    let mut state = AppState::load(cli.data_dir.clone())?;

    match cli.command {
        Commands::Keygen { .. } | Commands::Keys | Commands::Init { .. } => unreachable!(),

        Commands::Fund { from, amount, to } => {
            cli::cmd_fund(&mut state, &from, amount, to.as_deref())?;
        }

        Commands::Execute {
            owner,
            to,
            value,
            data,
        } => {
            let data = cli::parse_data(data.as_deref())?;
            let request = Request::Execute {
                to: Address::from(to),
                value,
                data,
            };
            cli::cmd_request(&mut state, &owner, request)?;
        }

        Commands::Confirm { owner, operation } => {
            let operation = operation.parse()?;
            cli::cmd_request(&mut state, &owner, Request::Confirm { operation })?;
        }

        Commands::Revoke { owner, operation } => {
            let operation = operation.parse()?;
            cli::cmd_request(&mut state, &owner, Request::Revoke { operation })?;
        }

        Commands::Sign {
            owner,
            to,
            value,
            data,
            expiry,
            sequence_id,
        } => {
            let expiry = expiry.unwrap_or_else(|| chrono::Utc::now().timestamp() + 3_600);
            cli::cmd_sign(
                &state,
                &owner,
                &to,
                value,
                data.as_deref(),
                expiry,
                sequence_id,
            )?;
        }

        Commands::SendSigned {
            owner,
            to,
            value,
            data,
            expiry,
            sequence_id,
            signature,
        } => {
            cli::cmd_send_signed(
                &mut state,
                &owner,
                &to,
                value,
                data.as_deref(),
                expiry,
                sequence_id,
                &signature,
            )?;
        }

        Commands::AddOwner { owner, new_owner } => {
            let request = Request::AddOwner {
                owner: Address::from(new_owner),
            };
            cli::cmd_request(&mut state, &owner, request)?;
        }

        Commands::RemoveOwner { owner, target } => {
            let request = Request::RemoveOwner {
                owner: Address::from(target),
            };
            cli::cmd_request(&mut state, &owner, request)?;
        }

        Commands::ReplaceOwner { owner, old, new } => {
            let request = Request::ReplaceOwner {
                old: Address::from(old),
                new: Address::from(new),
            };
            cli::cmd_request(&mut state, &owner, request)?;
        }

        Commands::ChangeThreshold { owner, threshold } => {
            cli::cmd_request(&mut state, &owner, Request::ChangeThreshold { threshold })?;
        }

        Commands::SetDailyLimit { owner, limit } => {
            cli::cmd_request(&mut state, &owner, Request::SetDailyLimit { limit })?;
        }

        Commands::ResetSpentToday { owner } => {
            cli::cmd_request(&mut state, &owner, Request::ResetSpentToday)?;
        }

        Commands::SafeMode { owner } => {
            cli::cmd_request(&mut state, &owner, Request::ActivateSafeMode)?;
        }

        Commands::Forwarder { action } => match action {
            ForwarderCommands::New { owner } => {
                cli::cmd_request(&mut state, &owner, Request::CreateForwarder)?;
            }
            ForwarderCommands::Sweep { address } => {
                let forwarder = Address::from(address);
                let value = state.engine.sweep_forwarder(&forwarder)?;
                state.save()?;
                println!("🧹 Swept {} from {}", value, forwarder);
            }
        },

        Commands::DeployCode { address, code } => {
            cli::cmd_deploy_code(&mut state, &address, &code)?;
        }

        Commands::Status => {
            cli::cmd_status(&state)?;
        }

        Commands::Pending { operation } => {
            cli::cmd_pending(&state, operation.as_deref())?;
        }

        Commands::Events { since, json } => {
            cli::cmd_events(&state, since, json)?;
        }
    }

    Ok(())
}
