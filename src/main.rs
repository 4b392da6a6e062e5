//! Generalized-account multisig CLI
//!
//! A local host for M-of-N generalized accounts: fund accounts, attach
//! signer sets, collect confirmations and send authorized spends.

use clap::{Args, Parser, Subcommand};
use ga_multisig::cli::{self, AppState};
use ga_multisig::config::Config;
use ga_multisig::crypto::{AccountId, TxHash};
use ga_multisig::multisig::FeeCeilings;
use ga_multisig::runtime::SpendTx;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "ga-multisig")]
#[command(author = "Darshan")]
#[command(version = "0.1.0")]
#[command(about = "M-of-N multisig authorization for generalized accounts", long_about = None)]
struct Cli {
    /// Data directory for ledger storage (overrides the config file)
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// JSON config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a new key pair and address
    Keygen,

    /// Credit coins to an address
    Fund {
        #[arg(short, long)]
        address: String,

        #[arg(short = 'n', long)]
        amount: u64,
    },

    /// Attach M-of-N authorization to an account
    Attach {
        /// Account to convert
        #[arg(short, long)]
        account: String,

        /// Co-signer addresses (comma separated or repeated)
        #[arg(short, long, value_delimiter = ',', required = true)]
        signers: Vec<String>,

        /// Confirmations required to authorize a transaction
        #[arg(short = 'm', long)]
        required: usize,

        #[command(flatten)]
        ceilings: CeilingArgs,
    },

    /// Propose a transaction
    Propose {
        #[command(flatten)]
        target: ProposalTarget,

        /// Lifetime in blocks from the current height
        #[arg(long, conflicts_with = "expires_at")]
        ttl: Option<u64>,

        /// Absolute expiration height
        #[arg(long)]
        expires_at: Option<u64>,
    },

    /// Confirm the open proposal
    Confirm {
        #[command(flatten)]
        target: ProposalTarget,
    },

    /// Refuse the open proposal
    Refuse {
        #[command(flatten)]
        target: ProposalTarget,
    },

    /// Revoke the open proposal (proposer only)
    Revoke {
        #[command(flatten)]
        target: ProposalTarget,
    },

    /// Authorize and execute a spend
    Send {
        #[command(flatten)]
        spend: SpendArgs,

        /// Replay nonce (defaults to the account's current nonce)
        #[arg(long)]
        nonce: Option<u64>,
    },

    /// Show ledger or account information
    Info {
        #[arg(short, long)]
        account: Option<String>,
    },

    /// Fee protection operations
    Fee {
        #[command(subcommand)]
        action: FeeCommands,
    },

    /// Mine empty blocks
    Advance {
        #[arg(short, long, default_value = "1")]
        blocks: u64,
    },

    /// Show an account's event log
    Events {
        #[arg(short, long)]
        account: String,

        /// Clear the log after printing
        #[arg(long)]
        drain: bool,
    },

    /// Save a named checkpoint of the ledger
    Snapshot {
        #[arg(short, long)]
        name: String,
    },

    /// Restore a named checkpoint
    Rollback {
        #[arg(short, long)]
        name: String,
    },

    /// Restore one of the rotating backups (0 is the most recent)
    Restore {
        #[arg(short, long, default_value = "0")]
        backup: usize,
    },
}

#[derive(Subcommand)]
enum FeeCommands {
    /// Show the current ceilings
    Show {
        #[arg(short, long)]
        account: String,
    },
    /// Raise the ceilings
    Update {
        #[arg(short, long)]
        account: String,

        #[arg(long)]
        caller: String,

        #[arg(long)]
        max_fee: u64,

        #[arg(long)]
        max_gasprice: u64,
    },
    /// Disable fee protection permanently
    Disable {
        #[arg(short, long)]
        account: String,

        #[arg(long)]
        caller: String,
    },
}

#[derive(Args)]
struct CeilingArgs {
    /// Maximum fee (defaults to the config value)
    #[arg(long)]
    max_fee: Option<u64>,

    /// Maximum gas price (defaults to the config value)
    #[arg(long)]
    max_gasprice: Option<u64>,
}

impl CeilingArgs {
    fn resolve(&self, defaults: FeeCeilings) -> FeeCeilings {
        FeeCeilings {
            max_fee: self.max_fee.unwrap_or(defaults.max_fee),
            max_gasprice: self.max_gasprice.unwrap_or(defaults.max_gasprice),
        }
    }
}

/// Which account, who is acting, and which transaction
#[derive(Args)]
struct ProposalTarget {
    #[arg(short, long)]
    account: String,

    /// Signer address performing the operation
    #[arg(long)]
    caller: String,

    /// Transaction hash (hex); otherwise built from the spend fields
    #[arg(long)]
    tx_hash: Option<String>,

    #[arg(long)]
    to: Option<String>,

    #[arg(long)]
    amount: Option<u64>,

    #[arg(long, default_value = "1000")]
    fee: u64,

    #[arg(long, default_value = "1000000000")]
    gas_price: u64,

    #[arg(long, default_value = "")]
    payload: String,
}

impl ProposalTarget {
    fn tx_hash(&self) -> cli::CliResult<TxHash> {
        if let Some(hex) = &self.tx_hash {
            return cli::parse_tx_hash(hex);
        }
        let (Some(to), Some(amount)) = (&self.to, self.amount) else {
            return Err("either --tx-hash or --to and --amount are required".into());
        };
        let tx = SpendTx::new(
            AccountId::from(self.account.as_str()),
            AccountId::from(to.as_str()),
            amount,
            self.fee,
            self.gas_price,
        )
        .with_payload(self.payload.clone());
        Ok(tx.hash())
    }
}

#[derive(Args)]
struct SpendArgs {
    /// Generalized account sending the coins
    #[arg(short, long)]
    account: String,

    #[arg(long)]
    to: String,

    #[arg(long)]
    amount: u64,

    #[arg(long, default_value = "1000")]
    fee: u64,

    #[arg(long, default_value = "1000000000")]
    gas_price: u64,

    #[arg(long, default_value = "")]
    payload: String,
}

impl SpendArgs {
    fn build(&self) -> SpendTx {
        SpendTx::new(
            AccountId::from(self.account.as_str()),
            AccountId::from(self.to.as_str()),
            self.amount,
            self.fee,
            self.gas_price,
        )
        .with_payload(self.payload.clone())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    match cli.command {
        // Key generation needs no ledger
        Commands::Keygen => cli::cmd_keygen(),
        command => {
            let config = Config::load(cli.config.as_deref())?.with_data_dir(cli.data_dir);
            let mut state = AppState::new(config)?;
            run(command, &mut state)
        }
    }
}

fn run(command: Commands, state: &mut AppState) -> cli::CliResult<()> {
    match command {
        Commands::Keygen => {
            cli::cmd_keygen()?;
        }

        Commands::Fund { address, amount } => {
            cli::cmd_fund(state, &address, amount)?;
        }

        Commands::Attach {
            account,
            signers,
            required,
            ceilings,
        } => {
            let ceilings = ceilings.resolve(state.config.fee_protection);
            cli::cmd_attach(state, &account, &signers, required, ceilings)?;
        }

        Commands::Propose {
            target,
            ttl,
            expires_at,
        } => {
            let ttl = cli::resolve_ttl(&state.config, ttl, expires_at);
            let tx_hash = target.tx_hash()?;
            cli::cmd_propose(state, &target.account, &target.caller, tx_hash, ttl)?;
        }

        Commands::Confirm { target } => {
            let tx_hash = target.tx_hash()?;
            cli::cmd_confirm(state, &target.account, &target.caller, tx_hash)?;
        }

        Commands::Refuse { target } => {
            let tx_hash = target.tx_hash()?;
            cli::cmd_refuse(state, &target.account, &target.caller, tx_hash)?;
        }

        Commands::Revoke { target } => {
            let tx_hash = target.tx_hash()?;
            cli::cmd_revoke(state, &target.account, &target.caller, tx_hash)?;
        }

        Commands::Send { spend, nonce } => {
            cli::cmd_send(state, &spend.build(), nonce)?;
        }

        Commands::Info { account } => {
            cli::cmd_info(state, account.as_deref())?;
        }

        Commands::Fee { action } => match action {
            FeeCommands::Show { account } => {
                cli::cmd_fee_show(state, &account)?;
            }
            FeeCommands::Update {
                account,
                caller,
                max_fee,
                max_gasprice,
            } => {
                let ceilings = FeeCeilings {
                    max_fee,
                    max_gasprice,
                };
                cli::cmd_fee_update(state, &account, &caller, ceilings)?;
            }
            FeeCommands::Disable { account, caller } => {
                cli::cmd_fee_disable(state, &account, &caller)?;
            }
        },

        Commands::Advance { blocks } => {
            cli::cmd_advance(state, blocks)?;
        }

        Commands::Events { account, drain } => {
            cli::cmd_events(state, &account, drain)?;
        }

        Commands::Snapshot { name } => {
            cli::cmd_snapshot(state, &name)?;
        }

        Commands::Rollback { name } => {
            cli::cmd_rollback(state, &name)?;
        }

        Commands::Restore { backup } => {
            cli::cmd_restore(state, backup)?;
        }
    }

    Ok(())
}
