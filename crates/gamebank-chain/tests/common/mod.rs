//! Shared chain fixture for the integration suites.
//!
//! Every account and witness key is derived from its name, so any test can
//! sign for any fixture-created identity.

use std::path::PathBuf;

use gamebank_chain::{skip, Database};
use gamebank_crypto::PrivateKey;
use gamebank_protocol::asset::{Asset, Symbol, GBC, GBD};
use gamebank_protocol::authority::Authority;
use gamebank_protocol::block::SignedBlock;
use gamebank_protocol::config;
use gamebank_protocol::error::ChainError;
use gamebank_protocol::operations::{AccountCreateOperation, Operation, TransferToVestingOperation};
use gamebank_protocol::transaction::{SignedTransaction, Transaction};
use gamebank_protocol::types::AccountName;

/// 10,000,000.000 GBC starting supply for development chains.
pub const TEST_SUPPLY: i64 = 10_000_000_000;

pub struct TestChain {
    pub db: Database,
    dir: PathBuf,
    preserve: bool,
}

impl Drop for TestChain {
    fn drop(&mut self) {
        if !self.preserve {
            let _ = std::fs::remove_dir_all(&self.dir);
        }
    }
}

#[allow(dead_code)]
impl TestChain {
    pub fn new(tag: &str) -> Self {
        let dir = std::env::temp_dir().join(format!(
            "gamebank_test_{tag}_{}_{:?}",
            std::process::id(),
            std::thread::current().id()
        ));
        let _ = std::fs::remove_dir_all(&dir);
        let db = Database::open(&dir, TEST_SUPPLY).expect("open test chain");
        TestChain { db, dir, preserve: false }
    }

    /// Reopen the same data directory (replays the block log).
    pub fn reopen(mut self) -> Self {
        let dir = self.dir.clone();
        self.preserve = true;
        drop(self);
        let db = Database::open(&dir, TEST_SUPPLY).expect("reopen test chain");
        TestChain { db, dir, preserve: false }
    }

    pub fn key(seed: &str) -> PrivateKey {
        PrivateKey::from_seed(seed)
    }

    // ── Block production ─────────────────────────────────────────────────────

    /// Produce the next block at `slot` slots past the head.
    pub fn produce_block_at_slot(&mut self, slot: u32) -> SignedBlock {
        let when = self.db.get_slot_time(slot);
        let witness = self.db.get_scheduled_witness(slot).expect("scheduled witness");
        let key = Self::key(witness.as_str());
        self.db
            .generate_block(when, &witness, &key, skip::NOTHING)
            .expect("produce block")
    }

    pub fn produce_block(&mut self) -> SignedBlock {
        self.produce_block_at_slot(1)
    }

    pub fn produce_blocks(&mut self, count: u32) {
        for _ in 0..count {
            self.produce_block();
        }
    }

    /// Produce one block roughly `seconds` ahead of the head time.
    pub fn skip_time(&mut self, seconds: i64) -> SignedBlock {
        let slots = (seconds / config::BLOCK_INTERVAL).max(1) as u32 + 1;
        self.produce_block_at_slot(slots)
    }

    // ── Transactions ─────────────────────────────────────────────────────────

    pub fn sign_tx(&self, operations: Vec<Operation>, key_seeds: &[&str]) -> SignedTransaction {
        let mut trx = Transaction {
            ref_block_num: 0,
            ref_block_prefix: 0,
            expiration: self.db.head_block_time() + 60,
            operations,
            extensions: vec![],
        };
        trx.set_reference_block(&self.db.head_block_id());
        let digest = trx.sig_digest(&self.db.chain_id());
        let signatures = key_seeds
            .iter()
            .map(|seed| Self::key(seed).sign(&digest))
            .collect();
        SignedTransaction { trx, signatures }
    }

    pub fn push_ops(&mut self, operations: Vec<Operation>, key_seeds: &[&str]) -> Result<(), ChainError> {
        let trx = self.sign_tx(operations, key_seeds);
        self.db.push_transaction(trx)
    }

    /// Create an account whose every role is controlled by a key seeded from
    /// its own name.
    pub fn create_account(&mut self, name: &str) {
        let key = Self::key(name).public_key();
        let median_fee = self.db.state.schedule().median_props.account_creation_fee;
        let op = Operation::AccountCreate(AccountCreateOperation {
            fee: Asset::new(
                median_fee.amount * config::CREATE_ACCOUNT_WITH_GBC_MODIFIER,
                GBC,
            ),
            creator: config::INIT_MINER_NAME.into(),
            new_account_name: name.into(),
            owner: Authority::single_key(key),
            active: Authority::single_key(key),
            posting: Authority::single_key(key),
            memo_key: key,
            json_metadata: String::new(),
        });
        self.push_ops(vec![op], &[config::INIT_MINER_NAME])
            .expect("create account");
        self.produce_block();
    }

    /// Mint directly into an account; test plumbing, not an operation.
    pub fn fund(&mut self, name: &str, amount: Asset) {
        let account_name = AccountName::from(name);
        let id = self
            .db
            .state
            .accounts
            .find_by_key(&account_name)
            .expect("funded account exists")
            .id;
        self.db.state.accounts.modify(id, |a| match amount.symbol {
            s if s == GBC => a.balance += amount,
            s if s == GBD => a.gbd_balance += amount,
            _ => panic!("fund with GBC or GBD"),
        });
        self.db.state.modify_dgp(|dgp| match amount.symbol {
            s if s == GBC => {
                dgp.current_supply += amount;
                dgp.virtual_supply += amount;
            }
            s if s == GBD => dgp.current_gbd_supply += amount,
            _ => {}
        });
    }

    /// Power up liquid GBC into vesting through the real operation.
    pub fn vest(&mut self, name: &str, amount: i64) {
        self.push_ops(
            vec![Operation::TransferToVesting(TransferToVestingOperation {
                from: name.into(),
                to: AccountName::default(),
                amount: Asset::new(amount, GBC),
            })],
            &[name],
        )
        .expect("vest");
        self.produce_block();
    }

    pub fn balance(&self, name: &str, symbol: Symbol) -> Asset {
        self.db
            .get_balance(&AccountName::from(name), symbol)
            .expect("account exists")
    }
}
