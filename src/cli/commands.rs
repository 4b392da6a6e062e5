//! CLI commands for generalized-account multisig
//!
//! Every handler loads the persisted ledger through `AppState`, runs one
//! operation and saves the result. The local tool is the trusted host, so
//! caller addresses are taken as already authenticated.

use crate::config::Config;
use crate::crypto::{AccountId, Caller, KeyPair, TxHash};
use crate::multisig::{ConsensusInfo, FeeCeilings, Ttl};
use crate::runtime::{Ledger, SpendTx};
use crate::storage::Storage;

/// Result type for CLI operations
pub type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

/// Application state
pub struct AppState {
    pub ledger: Ledger,
    pub storage: Storage,
    pub config: Config,
}

impl AppState {
    pub fn new(config: Config) -> CliResult<Self> {
        let storage = Storage::new(config.storage.clone())?;
        if !storage.exists() {
            log::info!("No ledger at {:?}, starting fresh", config.storage.data_dir);
        }
        let ledger = storage.load_or_default()?;

        Ok(Self {
            ledger,
            storage,
            config,
        })
    }

    pub fn save(&self) -> CliResult<()> {
        self.storage.save(&self.ledger)?;
        Ok(())
    }
}

/// Parse a transaction hash argument
pub fn parse_tx_hash(hex: &str) -> CliResult<TxHash> {
    Ok(TxHash::from_hex(hex)?)
}

/// Pick the proposal lifetime from the flags, falling back to the config
pub fn resolve_ttl(config: &Config, ttl: Option<u64>, expires_at: Option<u64>) -> Ttl {
    match (ttl, expires_at) {
        (_, Some(height)) => Ttl::Fixed(height),
        (Some(blocks), None) => Ttl::Relative(blocks),
        (None, None) => config.default_ttl,
    }
}

/// Generate a new identity
pub fn cmd_keygen() -> CliResult<()> {
    let keypair = KeyPair::generate();

    println!("🔐 New key pair generated!");
    println!("   Address: {}", keypair.address());
    println!("   Public key: {}", keypair.public_key_hex());
    println!("   Private key: {}", keypair.private_key_hex());
    println!("\n⚠️  Keep the private key secret.");

    Ok(())
}

/// Credit coins to an address
pub fn cmd_fund(state: &mut AppState, address: &str, amount: u64) -> CliResult<()> {
    let id = AccountId::from(address);
    let balance = state.ledger.credit(&id, amount)?;
    state.save()?;

    println!("💰 Credited {} coins to {}", amount, id);
    println!("   New balance: {} coins", balance);

    Ok(())
}

/// Turn an account into an M-of-N generalized account
pub fn cmd_attach(
    state: &mut AppState,
    account: &str,
    signers: &[String],
    required: usize,
    ceilings: FeeCeilings,
) -> CliResult<()> {
    let id = AccountId::from(account);
    let signers: Vec<AccountId> = signers.iter().map(|s| AccountId::from(s.as_str())).collect();

    let attached = state
        .ledger
        .attach_generalized_account(id, signers, required, ceilings)?;
    let description = attached.registry().description();
    let attached_id = attached.id().clone();
    state.save()?;

    println!("✅ Generalized account attached!");
    println!("   Account: {}", attached_id);
    println!("   Type: {}", description);
    println!("   Max fee: {}", ceilings.max_fee);
    println!("   Max gas price: {}", ceilings.max_gasprice);

    Ok(())
}

/// Open a new proposal
pub fn cmd_propose(
    state: &mut AppState,
    account: &str,
    caller: &str,
    tx_hash: TxHash,
    ttl: Ttl,
) -> CliResult<()> {
    let id = AccountId::from(account);
    let caller = Caller::verified(AccountId::from(caller));

    let expires_at = state
        .ledger
        .with_account(&id, |a, chain| a.propose(&caller, tx_hash, ttl, chain))?;
    state.save()?;

    println!("📝 Proposal created!");
    println!("   Tx hash: {}", tx_hash);
    println!("   Proposed by: {}", caller.id());
    println!(
        "   Expires at height: {} (current {})",
        expires_at,
        state.ledger.height()
    );

    Ok(())
}

/// Confirm the open proposal
pub fn cmd_confirm(
    state: &mut AppState,
    account: &str,
    caller: &str,
    tx_hash: TxHash,
) -> CliResult<()> {
    let id = AccountId::from(account);
    let caller = Caller::verified(AccountId::from(caller));

    let info = state.ledger.with_account(&id, |a, chain| {
        a.confirm(&caller, &tx_hash, chain)?;
        Ok(a.consensus_info(chain))
    })?;
    state.save()?;

    println!("✍️  {} confirmed {}", caller.id(), tx_hash.short());
    println!(
        "   Confirmations: {}/{}",
        info.confirmed_by.len(),
        info.confirmations_required
    );
    if info.has_consensus {
        println!("\n✅ Consensus reached. The transaction can now be sent.");
    }

    Ok(())
}

/// Refuse the open proposal
pub fn cmd_refuse(
    state: &mut AppState,
    account: &str,
    caller: &str,
    tx_hash: TxHash,
) -> CliResult<()> {
    let id = AccountId::from(account);
    let caller = Caller::verified(AccountId::from(caller));

    let invalidated = state
        .ledger
        .with_account(&id, |a, chain| a.refuse(&caller, &tx_hash, chain))?;
    state.save()?;

    println!("🚫 {} refused {}", caller.id(), tx_hash.short());
    if invalidated {
        println!("   Quorum is no longer reachable; the proposal was discarded.");
    }

    Ok(())
}

/// Withdraw the open proposal
pub fn cmd_revoke(
    state: &mut AppState,
    account: &str,
    caller: &str,
    tx_hash: TxHash,
) -> CliResult<()> {
    let id = AccountId::from(account);
    let caller = Caller::verified(AccountId::from(caller));

    state
        .ledger
        .with_account(&id, |a, chain| a.revoke(&caller, &tx_hash, chain))?;
    state.save()?;

    println!("↩️  Proposal {} revoked by {}", tx_hash.short(), caller.id());

    Ok(())
}

/// Authorize and execute a spend
pub fn cmd_send(state: &mut AppState, tx: &SpendTx, nonce: Option<u64>) -> CliResult<()> {
    let nonce = match nonce {
        Some(n) => n,
        None => state
            .ledger
            .account(&tx.sender)
            .map(|a| a.nonce())
            .unwrap_or(0),
    };

    println!("📤 Submitting transaction:");
    println!("   Hash: {}", tx.hash());
    println!("   From: {}", tx.sender);
    println!("   To: {}", tx.recipient);
    println!("   Amount: {} coins (fee {})", tx.amount, tx.fee);

    let receipt = state.ledger.submit(tx, nonce)?;
    state.save()?;

    println!("\n✅ Transaction executed at height {}", receipt.height);
    println!("   Nonce used: {}", receipt.nonce);
    println!(
        "   Sender balance: {} coins",
        state.ledger.balance(&receipt.sender)
    );

    Ok(())
}

/// Show the ledger overview, or one account in detail
pub fn cmd_info(state: &AppState, account: Option<&str>) -> CliResult<()> {
    let ledger = &state.ledger;

    let Some(account) = account else {
        println!("⛓️  Ledger Info");
        println!("   ├─ Height: {}", ledger.height());
        println!("   ├─ Generalized accounts: {}", ledger.accounts().count());
        println!("   ├─ Executed spends: {}", ledger.receipts().len());
        let stats = state.storage.stats()?;
        println!(
            "   └─ Storage: {} bytes, {} backup(s), {} snapshot(s) in {:?}",
            stats.file_size, stats.backup_count, stats.snapshot_count, stats.data_dir
        );
        for a in ledger.accounts() {
            println!(
                "\n   {} ({}) - {} coins",
                a.id(),
                a.registry().description(),
                ledger.balance(a.id())
            );
        }
        return Ok(());
    };

    let id = AccountId::from(account);
    let Some(ga) = ledger.account(&id) else {
        println!("💰 {} - {} coins", id, ledger.balance(&id));
        println!("   Not a generalized account");
        return Ok(());
    };

    println!("🔐 Generalized Account {}", ga.id());
    println!("   ├─ Type: {}", ga.registry().description());
    println!("   ├─ Version: {}", ga.version());
    println!(
        "   ├─ Attached: {}",
        ga.attached_at().format("%Y-%m-%d %H:%M:%S")
    );
    println!("   ├─ Balance: {} coins", ledger.balance(ga.id()));
    println!("   ├─ Nonce: {}", ga.nonce());
    match ga.fee_protection() {
        Some(c) => println!(
            "   ├─ Fee protection: max fee {}, max gas price {}",
            c.max_fee, c.max_gasprice
        ),
        None => println!("   ├─ Fee protection: disabled"),
    }
    println!("   └─ Signers:");
    for signer in ga.signers() {
        println!("      - {}", signer);
    }

    print_consensus(&ga.consensus_info(ledger));

    Ok(())
}

fn print_consensus(info: &ConsensusInfo) {
    let Some(tx_hash) = info.tx_hash else {
        println!("\n📭 No open proposal");
        return;
    };

    println!("\n📝 Open proposal {}", tx_hash);
    if let Some(proposer) = &info.proposed_by {
        println!("   ├─ Proposed by: {}", proposer);
    }
    println!(
        "   ├─ Confirmations: {}/{}",
        info.confirmed_by.len(),
        info.confirmations_required
    );
    for signer in &info.confirmed_by {
        println!("   │  ✓ {}", signer);
    }
    for signer in &info.refused_by {
        println!("   │  ✗ {}", signer);
    }
    println!(
        "   ├─ Expires at height: {}{}",
        info.expiration_height,
        if info.expired { " (expired)" } else { "" }
    );
    println!("   └─ Consensus: {}", if info.has_consensus { "yes" } else { "no" });
}

/// Show the fee ceilings
pub fn cmd_fee_show(state: &AppState, account: &str) -> CliResult<()> {
    let id = AccountId::from(account);
    let ga = state
        .ledger
        .account(&id)
        .ok_or_else(|| format!("{} is not a generalized account", id))?;

    match ga.fee_protection() {
        Some(c) => {
            println!("🛡️  Fee protection enabled");
            println!("   Max fee: {}", c.max_fee);
            println!("   Max gas price: {}", c.max_gasprice);
        }
        None => println!("🛡️  Fee protection disabled"),
    }

    Ok(())
}

/// Raise the fee ceilings
pub fn cmd_fee_update(
    state: &mut AppState,
    account: &str,
    caller: &str,
    ceilings: FeeCeilings,
) -> CliResult<()> {
    let id = AccountId::from(account);
    let caller = Caller::verified(AccountId::from(caller));

    state.ledger.with_account(&id, |a, chain| {
        a.update_fee_protection(&caller, ceilings, chain)
    })?;
    state.save()?;

    println!("🛡️  Fee protection updated");
    println!("   Max fee: {}", ceilings.max_fee);
    println!("   Max gas price: {}", ceilings.max_gasprice);

    Ok(())
}

/// Turn fee protection off for good
pub fn cmd_fee_disable(state: &mut AppState, account: &str, caller: &str) -> CliResult<()> {
    let id = AccountId::from(account);
    let caller = Caller::verified(AccountId::from(caller));

    state
        .ledger
        .with_account(&id, |a, chain| a.disable_fee_protection(&caller, chain))?;
    state.save()?;

    println!("⚠️  Fee protection disabled for {}", id);

    Ok(())
}

/// Mine empty blocks
pub fn cmd_advance(state: &mut AppState, blocks: u64) -> CliResult<()> {
    let height = state.ledger.advance_height(blocks);
    state.save()?;

    println!("⛏️  Advanced {} block(s), height is now {}", blocks, height);

    Ok(())
}

/// Print the event log, optionally clearing it
pub fn cmd_events(state: &mut AppState, account: &str, drain: bool) -> CliResult<()> {
    let id = AccountId::from(account);

    let events = if drain {
        let events = state.ledger.with_account(&id, |a, _| Ok(a.drain_events()))?;
        state.save()?;
        events
    } else {
        state
            .ledger
            .account(&id)
            .map(|a| a.events().to_vec())
            .ok_or_else(|| format!("{} is not a generalized account", id))?
    };

    if events.is_empty() {
        println!("📭 No events");
        return Ok(());
    }

    println!("📜 Events for {} ({})", id, events.len());
    for record in &events {
        println!("   #{} {}", record.height, serde_json::to_string(&record.event)?);
    }

    Ok(())
}

/// Save a named checkpoint
pub fn cmd_snapshot(state: &AppState, name: &str) -> CliResult<()> {
    let path = state.storage.snapshot(name, &state.ledger)?;

    println!("📸 Snapshot '{}' saved", name);
    println!("   Height: {}", state.ledger.height());
    println!("   File: {:?}", path);

    Ok(())
}

/// Restore a named checkpoint
pub fn cmd_rollback(state: &mut AppState, name: &str) -> CliResult<()> {
    let snapshot = state.storage.rollback(name)?;
    state.ledger = snapshot.ledger;
    state.save()?;

    println!("⏪ Rolled back to snapshot '{}'", name);
    println!("   Height: {}", state.ledger.height());
    println!(
        "   Taken at: {}",
        snapshot.saved_at.format("%Y-%m-%d %H:%M:%S")
    );

    Ok(())
}

/// Replace the ledger with one of the rotating backups
pub fn cmd_restore(state: &mut AppState, backup: usize) -> CliResult<()> {
    let available = state.storage.list_backups();
    if !available.contains(&backup) {
        println!("❌ Backup {} not found. Available: {:?}", backup, available);
        return Ok(());
    }

    state.ledger = state.storage.restore_backup(backup)?;
    state.save()?;

    println!("⏪ Restored backup {}", backup);
    println!("   Height: {}", state.ledger.height());

    Ok(())
}
