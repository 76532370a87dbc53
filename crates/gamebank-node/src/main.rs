//! gamebank-node — the GameBank chain binary.
//!
//! Startup sequence:
//!   1. Open (or initialise) the chain database under the data directory
//!   2. Replay the block log if one exists
//!   3. Optionally run the development producer loop, signing blocks with a
//!      seed-derived key
//!
//! Networking and RPC run as separate processes against the same core; this
//! binary is the consensus half.

use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::Parser;
use tracing::{info, warn};

use gamebank_chain::{skip, Database};
use gamebank_crypto::PrivateKey;
use gamebank_protocol::config;
use gamebank_protocol::types::AccountName;

#[derive(Parser, Debug)]
#[command(name = "gamebank-node", version, about = "GameBank consensus node")]
struct Args {
    /// Directory for the block log and chain data.
    #[arg(long, default_value = "~/.gamebank/data")]
    data_dir: PathBuf,

    /// Initial liquid supply (development chains only).
    #[arg(long, default_value_t = config::INIT_SUPPLY)]
    init_supply: i64,

    /// Rebuild state from the block log and exit.
    #[arg(long)]
    replay: bool,

    /// Produce blocks with the given witness account.
    #[arg(long)]
    produce: Option<String>,

    /// Seed string for the producing witness's signing key.
    #[arg(long, default_value = "initminer")]
    signing_seed: String,

    /// Stop the producer after this many blocks (0 = run forever).
    #[arg(long, default_value_t = 0)]
    block_limit: u64,
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,gamebank=debug".parse().unwrap()),
        )
        .init();

    let args = Args::parse();
    info!("GameBank node starting");

    let data_dir = expand_tilde(&args.data_dir);
    let mut db = Database::open(&data_dir, args.init_supply)
        .with_context(|| format!("opening chain database in {}", data_dir.display()))?;
    info!(
        head = db.head_block_num(),
        irreversible = db.last_irreversible_block_num(),
        "chain open"
    );

    if args.replay {
        let head = db.reindex().context("replaying the block log")?;
        info!(head, "replay complete");
        return Ok(());
    }

    if let Some(witness) = args.produce {
        let witness = AccountName::new(&witness).context("invalid witness name")?;
        run_producer(&mut db, &witness, &args.signing_seed, args.block_limit)?;
    }

    Ok(())
}

/// The development producer: sleep to each slot and produce when scheduled.
fn run_producer(
    db: &mut Database,
    witness: &AccountName,
    signing_seed: &str,
    block_limit: u64,
) -> anyhow::Result<()> {
    let key = PrivateKey::from_seed(signing_seed);
    info!(witness = %witness, key = %key.public_key(), "producer loop starting");

    let mut produced = 0u64;
    loop {
        let now = chrono::Utc::now().timestamp();
        let next_slot_time = {
            let slot = db.get_slot_at_time(now);
            if slot == 0 {
                db.get_slot_time(1)
            } else {
                db.get_slot_time(slot)
            }
        };
        if next_slot_time > now {
            std::thread::sleep(std::time::Duration::from_millis(
                ((next_slot_time - now) * 1000).min(3000) as u64,
            ));
            continue;
        }

        // declining to produce a stale slot beats forking ourselves
        if now - next_slot_time > config::BLOCK_INTERVAL {
            std::thread::sleep(std::time::Duration::from_millis(250));
            continue;
        }

        // a mostly-empty participation window means this node is forked off
        // or isolated; producing would only deepen the split
        if db.witness_participation_rate() < config::REQUIRED_PARTICIPATION_PERCENT {
            warn!(
                participation = db.witness_participation_rate(),
                "participation below threshold, holding production"
            );
            std::thread::sleep(std::time::Duration::from_millis(3000));
            continue;
        }

        let slot = db.get_slot_at_time(now);
        match db.get_scheduled_witness(slot) {
            Ok(scheduled) if &scheduled == witness => {
                match db.generate_block(db.get_slot_time(slot), witness, &key, skip::NOTHING) {
                    Ok(block) => {
                        produced += 1;
                        info!(
                            num = block.block_num(),
                            id = %block.id(),
                            "block produced"
                        );
                        if block_limit > 0 && produced >= block_limit {
                            info!(produced, "block limit reached, stopping producer");
                            return Ok(());
                        }
                    }
                    Err(e) => warn!(error = %e, "block production failed"),
                }
            }
            Ok(_) => {
                std::thread::sleep(std::time::Duration::from_millis(250));
            }
            Err(e) => {
                warn!(error = %e, "no witness schedule available");
                std::thread::sleep(std::time::Duration::from_millis(1000));
            }
        }
    }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Ok(home) = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE")) {
            return PathBuf::from(home).join(stripped);
        }
    }
    path.to_path_buf()
}
