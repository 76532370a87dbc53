//! The top-level chain controller.
//!
//! Owns the state tables, the fork tree, the block log, the pending and
//! popped transaction pools, and the notification signals. Externally
//! supplied blocks and transactions enter through [`Database::push_block`]
//! and [`Database::push_transaction`]; block production goes through
//! [`Database::generate_block`] and re-enters through the same push path as
//! a received block.

mod apply;
mod authority;
mod balance;
mod feed;
mod invariants;
mod market;
pub mod process;
mod schedule;

use std::path::Path;

use tracing::{debug, error, info, warn};

use gamebank_contract::ScriptEngine;
use gamebank_forkdb::{BlockLog, ForkTree};
use gamebank_protocol::block::SignedBlock;
use gamebank_protocol::config;
use gamebank_protocol::ensure;
use gamebank_protocol::error::ChainError;
use gamebank_protocol::operations::{Operation, VirtualOperation};
use gamebank_protocol::transaction::{chain_id, SignedTransaction};
use gamebank_protocol::types::{AccountName, BlockId, Digest, Timestamp, TransactionId};
use gamebank_protocol::version::BlockHeaderExtension;

use crate::state::State;

/// Integrity checks that may be bypassed during replay and tests.
pub mod skip {
    pub const NOTHING: u32 = 0;
    pub const WITNESS_SIGNATURE: u32 = 1 << 0;
    pub const TRANSACTION_SIGNATURES: u32 = 1 << 1;
    pub const TRANSACTION_DUPE_CHECK: u32 = 1 << 2;
    pub const MERKLE_CHECK: u32 = 1 << 4;
    pub const TAPOS_CHECK: u32 = 1 << 5;
    pub const AUTHORITY_CHECK: u32 = 1 << 6;
    pub const WITNESS_SCHEDULE_CHECK: u32 = 1 << 8;
    pub const VALIDATE: u32 = 1 << 9;
    pub const BLOCK_SIZE_CHECK: u32 = 1 << 10;
    pub const BLOCK_LOG: u32 = 1 << 13;
}

/// Notification payload for block application.
#[derive(Clone, Debug)]
pub struct BlockNotification {
    pub block_id: BlockId,
    pub block_num: u32,
    pub block: SignedBlock,
}

/// Notification payload for transaction application.
#[derive(Clone, Debug)]
pub struct TransactionNotification {
    pub transaction_id: TransactionId,
    pub transaction: SignedTransaction,
}

/// Notification payload for operations, real and virtual.
#[derive(Clone, Debug)]
pub struct OperationNotification {
    pub trx_id: TransactionId,
    pub block: u32,
    pub trx_in_block: i32,
    pub op_in_trx: u32,
    pub op: NotifiedOperation,
}

#[derive(Clone, Debug)]
pub enum NotifiedOperation {
    Applied(Operation),
    Virtual(VirtualOperation),
}

type Handler<T> = Box<dyn FnMut(&T) -> Result<(), ChainError> + Send>;

#[derive(Default)]
struct Signals {
    pre_apply_block: Vec<Handler<BlockNotification>>,
    post_apply_block: Vec<Handler<BlockNotification>>,
    pre_apply_transaction: Vec<Handler<TransactionNotification>>,
    post_apply_transaction: Vec<Handler<TransactionNotification>>,
    pre_apply_operation: Vec<Handler<OperationNotification>>,
    post_apply_operation: Vec<Handler<OperationNotification>>,
    irreversible_block: Vec<Handler<u32>>,
    pre_reindex: Vec<Handler<u32>>,
    post_reindex: Vec<Handler<u32>>,
}

fn dispatch<T>(handlers: &mut [Handler<T>], payload: &T, signal: &str) {
    for handler in handlers {
        if let Err(e) = handler(payload) {
            // a failing subscriber never unwinds applied state; it only
            // silences the rest of the chain for this event
            warn!(signal, error = %e, "notification subscriber failed");
            break;
        }
    }
}

/// The chain database: state machine, fork tree, block log, pools, signals.
pub struct Database {
    pub state: State,
    pub(crate) fork_db: ForkTree,
    pub block_log: BlockLog,
    chain_id: Digest,
    pub(crate) genesis_supply: i64,

    pending_tx: Vec<SignedTransaction>,
    popped_tx: Vec<SignedTransaction>,
    pending_session_open: bool,

    pub(crate) skip_flags: u32,
    signals: Signals,

    pub(crate) script_engine: Option<Box<dyn ScriptEngine>>,

    // position bookkeeping for notifications
    pub(crate) current_trx_id: TransactionId,
    pub(crate) current_trx_in_block: i32,
    pub(crate) current_op_in_trx: u32,

    block_virtual_ops: Vec<VirtualOperation>,
    block_contract_events: Vec<gamebank_contract::ContractEvent>,
}

impl Database {
    /// Open a database backed by a block log under `data_dir`, seed genesis
    /// state, and replay any persisted blocks.
    pub fn open(data_dir: &Path, init_supply: i64) -> Result<Self, ChainError> {
        std::fs::create_dir_all(data_dir)
            .map_err(|e| ChainError::Storage(format!("creating {}: {e}", data_dir.display())))?;
        let block_log = BlockLog::open(data_dir.join("block_log"))?;

        let mut db = Database {
            state: State::new(),
            fork_db: ForkTree::new(),
            block_log,
            chain_id: chain_id(),
            genesis_supply: init_supply,
            pending_tx: Vec::new(),
            popped_tx: Vec::new(),
            pending_session_open: false,
            skip_flags: skip::NOTHING,
            signals: Signals::default(),
            script_engine: None,
            current_trx_id: TransactionId::default(),
            current_trx_in_block: 0,
            current_op_in_trx: 0,
            block_virtual_ops: Vec::new(),
            block_contract_events: Vec::new(),
        };
        crate::genesis::init_genesis(&mut db.state, init_supply)?;

        if db.block_log.head().is_some() {
            db.reindex()?;
        }
        Ok(db)
    }

    /// Install the script interpreter used by contract operations.
    pub fn set_script_engine(&mut self, engine: Box<dyn ScriptEngine>) {
        self.script_engine = Some(engine);
    }

    pub fn chain_id(&self) -> Digest {
        self.chain_id
    }

    // ── Head accessors ───────────────────────────────────────────────────────

    pub fn head_block_num(&self) -> u32 {
        self.state.dgp().head_block_number
    }

    pub fn head_block_id(&self) -> BlockId {
        self.state.dgp().head_block_id
    }

    pub fn head_block_time(&self) -> Timestamp {
        self.state.dgp().time
    }

    pub fn last_irreversible_block_num(&self) -> u32 {
        self.state.dgp().last_irreversible_block_num
    }

    /// Virtual operations emitted while applying the most recent block.
    pub fn last_block_virtual_ops(&self) -> &[VirtualOperation] {
        &self.block_virtual_ops
    }

    /// Contract-log events recorded while applying the most recent block.
    pub fn last_block_contract_events(&self) -> &[gamebank_contract::ContractEvent] {
        &self.block_contract_events
    }

    pub(crate) fn record_contract_events(
        &mut self,
        events: Vec<gamebank_contract::ContractEvent>,
    ) {
        self.block_contract_events.extend(events);
    }

    pub fn pending_transactions(&self) -> &[SignedTransaction] {
        &self.pending_tx
    }

    pub fn popped_transactions(&self) -> &[SignedTransaction] {
        &self.popped_tx
    }

    /// Fetch a block by number: from the log if irreversible, else from the
    /// main branch of the fork tree.
    pub fn fetch_block_by_number(&mut self, num: u32) -> Result<Option<SignedBlock>, ChainError> {
        if num == 0 || num > self.head_block_num() {
            return Ok(None);
        }
        if let Some(b) = self.fork_db.fetch_block_on_main_branch_by_number(num) {
            return Ok(Some(b));
        }
        self.block_log.read_block_by_num(num)
    }

    pub fn is_known_transaction(&self, id: &TransactionId) -> bool {
        self.state.transactions.contains_key(id)
    }

    /// Producer participation over the last 128 slots, in percent.
    pub fn witness_participation_rate(&self) -> u32 {
        let dgp = self.state.dgp();
        dgp.participation_count as u32 * 100 / config::PARTICIPATION_SLOTS
    }

    // ── Notifications ────────────────────────────────────────────────────────

    pub fn add_pre_apply_block_handler(&mut self, h: Handler<BlockNotification>) {
        self.signals.pre_apply_block.push(h);
    }
    pub fn add_post_apply_block_handler(&mut self, h: Handler<BlockNotification>) {
        self.signals.post_apply_block.push(h);
    }
    pub fn add_pre_apply_transaction_handler(&mut self, h: Handler<TransactionNotification>) {
        self.signals.pre_apply_transaction.push(h);
    }
    pub fn add_post_apply_transaction_handler(&mut self, h: Handler<TransactionNotification>) {
        self.signals.post_apply_transaction.push(h);
    }
    pub fn add_pre_apply_operation_handler(&mut self, h: Handler<OperationNotification>) {
        self.signals.pre_apply_operation.push(h);
    }
    pub fn add_post_apply_operation_handler(&mut self, h: Handler<OperationNotification>) {
        self.signals.post_apply_operation.push(h);
    }
    pub fn add_irreversible_block_handler(&mut self, h: Handler<u32>) {
        self.signals.irreversible_block.push(h);
    }
    pub fn add_pre_reindex_handler(&mut self, h: Handler<u32>) {
        self.signals.pre_reindex.push(h);
    }
    pub fn add_post_reindex_handler(&mut self, h: Handler<u32>) {
        self.signals.post_reindex.push(h);
    }

    pub(crate) fn notify_pre_apply_block(&mut self, note: &BlockNotification) {
        dispatch(&mut self.signals.pre_apply_block, note, "pre_apply_block");
    }
    pub(crate) fn notify_post_apply_block(&mut self, note: &BlockNotification) {
        dispatch(&mut self.signals.post_apply_block, note, "post_apply_block");
    }
    pub(crate) fn notify_pre_apply_transaction(&mut self, note: &TransactionNotification) {
        dispatch(&mut self.signals.pre_apply_transaction, note, "pre_apply_transaction");
    }
    pub(crate) fn notify_post_apply_transaction(&mut self, note: &TransactionNotification) {
        dispatch(&mut self.signals.post_apply_transaction, note, "post_apply_transaction");
    }
    pub(crate) fn notify_irreversible_block(&mut self, num: u32) {
        dispatch(&mut self.signals.irreversible_block, &num, "irreversible_block");
    }

    fn operation_note(&self, op: NotifiedOperation) -> OperationNotification {
        OperationNotification {
            trx_id: self.current_trx_id,
            block: self.state.dgp().head_block_number + 1,
            trx_in_block: self.current_trx_in_block,
            op_in_trx: self.current_op_in_trx,
            op,
        }
    }

    pub(crate) fn notify_pre_apply_operation(&mut self, op: &Operation) {
        let note = self.operation_note(NotifiedOperation::Applied(op.clone()));
        dispatch(&mut self.signals.pre_apply_operation, &note, "pre_apply_operation");
    }

    pub(crate) fn notify_post_apply_operation(&mut self, op: &Operation) {
        let note = self.operation_note(NotifiedOperation::Applied(op.clone()));
        dispatch(&mut self.signals.post_apply_operation, &note, "post_apply_operation");
    }

    /// Record and announce a virtual operation.
    pub(crate) fn push_virtual_operation(&mut self, vop: VirtualOperation) {
        let note = self.operation_note(NotifiedOperation::Virtual(vop.clone()));
        dispatch(&mut self.signals.pre_apply_operation, &note, "pre_apply_operation");
        self.block_virtual_ops.push(vop);
        dispatch(&mut self.signals.post_apply_operation, &note, "post_apply_operation");
    }

    pub(crate) fn clear_block_virtual_ops(&mut self) {
        self.block_virtual_ops.clear();
        self.block_contract_events.clear();
    }

    // ── Skip-flag scoping ────────────────────────────────────────────────────

    pub(crate) fn with_skip<R>(
        &mut self,
        skip: u32,
        f: impl FnOnce(&mut Self) -> Result<R, ChainError>,
    ) -> Result<R, ChainError> {
        let old = self.skip_flags;
        self.skip_flags = skip;
        let result = f(self);
        self.skip_flags = old;
        result
    }

    pub(crate) fn skipping(&self, flag: u32) -> bool {
        self.skip_flags & flag != 0
    }

    // ── Pending pool ─────────────────────────────────────────────────────────

    /// Discard the pending-transaction session, keeping the transactions
    /// themselves for later re-application.
    pub fn clear_pending(&mut self) {
        if self.pending_session_open {
            self.state.undo_session();
            self.pending_session_open = false;
        }
    }

    fn restore_pending(&mut self, previous_pending: Vec<SignedTransaction>) {
        let popped: Vec<_> = std::mem::take(&mut self.popped_tx);
        self.pending_tx.clear();
        for tx in popped.into_iter().chain(previous_pending) {
            // silently drop transactions invalidated by the new head
            let _ = self.push_transaction_with_skip(tx, self.skip_flags);
        }
    }

    // ── Push transaction ─────────────────────────────────────────────────────

    pub fn push_transaction(&mut self, trx: SignedTransaction) -> Result<(), ChainError> {
        self.push_transaction_with_skip(trx, skip::NOTHING)
    }

    pub fn push_transaction_with_skip(
        &mut self,
        trx: SignedTransaction,
        skip: u32,
    ) -> Result<(), ChainError> {
        ensure!(
            trx.serialized_size() <= config::MAX_TRANSACTION_SIZE,
            ChainError::Validation,
            "transaction exceeds maximum size"
        );
        self.with_skip(skip, |db| db._push_transaction(trx))
    }

    fn _push_transaction(&mut self, trx: SignedTransaction) -> Result<(), ChainError> {
        // the pending session holds the cumulative effect of the pool; each
        // transaction applies in a child session that is squashed on success
        if !self.pending_session_open {
            self.state.begin_session();
            self.pending_session_open = true;
        }
        self.state.begin_session();
        match self.apply_transaction_internal(&trx) {
            Ok(()) => {
                self.state.squash_session();
                self.pending_tx.push(trx);
                Ok(())
            }
            Err(e) => {
                self.state.undo_session();
                Err(e)
            }
        }
    }

    // ── Push block ───────────────────────────────────────────────────────────

    /// Insert an externally received block, switching forks if it extends a
    /// longer branch. Returns true when a fork switch occurred.
    pub fn push_block(&mut self, block: SignedBlock, skip: u32) -> Result<bool, ChainError> {
        let pending = std::mem::take(&mut self.pending_tx);
        self.clear_pending();

        let result = self.with_skip(skip, |db| db._push_block(block));

        self.restore_pending(pending);
        result
    }

    fn _push_block(&mut self, new_block: SignedBlock) -> Result<bool, ChainError> {
        self.maybe_warn_multiple_production(new_block.block_num());

        let head_id = self.fork_db.push_block(new_block.clone())?;
        let new_head = self
            .fork_db
            .fetch_block(&head_id)
            .expect("fork tree returned its own head")
            .clone();

        // the new head does not extend the current chain tip
        if new_head.previous != self.head_block_id() {
            if new_head.num <= self.head_block_num() {
                // shorter or equal fork: remember the block, nothing to do
                return Ok(false);
            }
            debug!(
                new_head = %new_head.id,
                new_num = new_head.num,
                "switching to a longer fork"
            );
            return self.switch_forks(&new_head.id).map(|_| true);
        }

        // fast path: the block extends the current head
        self.state.begin_session();
        match self.apply_block_internal(&new_block) {
            Ok(()) => {
                // leave the session open ("push"); commit happens when the
                // block becomes irreversible
                Ok(false)
            }
            Err(e) => {
                self.state.undo_session();
                self.fork_db.remove(&new_block.id());
                Err(e)
            }
        }
    }

    fn switch_forks(&mut self, new_head_id: &BlockId) -> Result<(), ChainError> {
        let (new_branch, old_branch) = self
            .fork_db
            .fetch_branch_from(new_head_id, &self.head_block_id())?;

        // pop to the common ancestor
        for _ in &old_branch {
            self.pop_block()?;
        }

        // apply the new branch, oldest first
        let mut applied: Vec<BlockId> = Vec::new();
        for block in new_branch.iter().rev() {
            self.state.begin_session();
            match self.apply_block_internal(block) {
                Ok(()) => applied.push(block.id()),
                Err(e) => {
                    error!(block = %block.id(), error = %e, "fork block failed, rewinding");
                    self.state.undo_session();

                    // drop the failing block and everything above it
                    let bad_index = new_branch
                        .iter()
                        .position(|b| b.id() == block.id())
                        .unwrap_or(0);
                    for b in &new_branch[..=bad_index] {
                        self.fork_db.remove(&b.id());
                    }

                    // rewind whatever applied and restore the old branch
                    for _ in &applied {
                        self.pop_block()?;
                    }
                    for block in old_branch.iter().rev() {
                        self.state.begin_session();
                        self.apply_block_internal(block)?;
                        self.fork_db.set_head(&block.id());
                    }
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    /// Undo the head block, returning its transactions to the popped pool.
    pub fn pop_block(&mut self) -> Result<(), ChainError> {
        let head_id = self.head_block_id();
        let head = self
            .fork_db
            .fetch_block(&head_id)
            .ok_or_else(|| {
                ChainError::Fork("there are no blocks to pop: head left the fork tree".into())
            })?
            .block
            .clone();

        self.fork_db.pop_head();
        self.state.undo_session();

        let mut txs = head.transactions;
        txs.extend(std::mem::take(&mut self.popped_tx));
        self.popped_tx = txs;
        Ok(())
    }

    fn maybe_warn_multiple_production(&self, height: u32) {
        let blocks = self.fork_db.fetch_blocks_by_number(height);
        if blocks.len() > 1 {
            warn!(
                height,
                witnesses = ?blocks
                    .iter()
                    .map(|b| (b.block.witness().clone(), b.id))
                    .collect::<Vec<_>>(),
                "encountered multiple blocks at the same height"
            );
        }
    }

    // ── Generate block ───────────────────────────────────────────────────────

    /// Assemble, sign, and push a block for `when` as `witness_owner`.
    pub fn generate_block(
        &mut self,
        when: Timestamp,
        witness_owner: &AccountName,
        signing_key: &gamebank_crypto::PrivateKey,
        skip: u32,
    ) -> Result<SignedBlock, ChainError> {
        self.with_skip(skip, |db| db._generate_block(when, witness_owner, signing_key))
    }

    fn _generate_block(
        &mut self,
        when: Timestamp,
        witness_owner: &AccountName,
        signing_key: &gamebank_crypto::PrivateKey,
    ) -> Result<SignedBlock, ChainError> {
        let slot = self.get_slot_at_time(when);
        ensure!(slot > 0, ChainError::StatePrecondition, "generation slot is in the past");
        let scheduled = self.get_scheduled_witness(slot)?;
        ensure!(
            &scheduled == witness_owner,
            ChainError::StatePrecondition,
            "scheduled witness for this slot is {scheduled}, not {witness_owner}"
        );
        let witness = self.state.get_witness(witness_owner)?.clone();
        if !self.skipping(skip::WITNESS_SIGNATURE) {
            ensure!(
                witness.signing_key == signing_key.public_key(),
                ChainError::Authority,
                "signing key does not match the witness's declared key"
            );
        }

        // rebuild the pending state from scratch under production skips
        let pending = std::mem::take(&mut self.pending_tx);
        self.clear_pending();
        let candidates: Vec<SignedTransaction> = std::mem::take(&mut self.popped_tx)
            .into_iter()
            .chain(pending)
            .collect();

        let mut included: Vec<SignedTransaction> = Vec::new();
        let mut postponed: Vec<SignedTransaction> = Vec::new();
        let mut total_size: usize = 256; // header allowance
        let maximum_block_size = self.state.dgp().maximum_block_size as usize;

        self.state.begin_session();
        self.pending_session_open = true;

        for tx in candidates.iter() {
            if tx.trx.expiration < when {
                continue;
            }
            let tx_size = tx.serialized_size();
            if total_size + tx_size > maximum_block_size {
                postponed.push(tx.clone());
                continue;
            }
            self.state.begin_session();
            match self.apply_transaction_internal(tx) {
                Ok(()) => {
                    self.state.squash_session();
                    total_size += tx_size;
                    included.push(tx.clone());
                }
                Err(e) => {
                    // failed transactions are silently dropped from the block
                    self.state.undo_session();
                    debug!(trx = %tx.id(), error = %e, "dropping failed pending transaction");
                }
            }
        }
        if !postponed.is_empty() {
            debug!(postponed = postponed.len(), "postponed transactions exceeding block size");
        }
        self.clear_pending();
        // postponed transactions re-enter the pool once the block is pushed
        self.popped_tx = postponed;

        let mut block = SignedBlock {
            signed_header: Default::default(),
            transactions: included,
        };
        block.signed_header.header.previous = self.head_block_id();
        block.signed_header.header.timestamp = when;
        block.signed_header.header.witness = witness_owner.clone();
        block.signed_header.header.transaction_merkle_root = block.calculate_merkle_root();

        // attach a version vote when ours differs from what the chain saw
        let hf = self.state.hardforks().clone();
        if witness.running_version != gamebank_protocol::version::BLOCKCHAIN_VERSION {
            block
                .signed_header
                .header
                .extensions
                .push(BlockHeaderExtension::Version(
                    gamebank_protocol::version::BLOCKCHAIN_VERSION,
                ));
        }
        if hf.current_hardfork_version
            < gamebank_protocol::version::blockchain_hardfork_version()
            && (witness.hardfork_version_vote
                != gamebank_protocol::version::blockchain_hardfork_version()
                || witness.hardfork_time_vote != hf.next_hardfork_time)
        {
            block.signed_header.header.extensions.push(
                BlockHeaderExtension::HardforkVersionVote(
                    gamebank_protocol::version::blockchain_hardfork_version(),
                    hf.next_hardfork_time,
                ),
            );
        }

        if !self.skipping(skip::WITNESS_SIGNATURE) {
            let digest = block.signed_header.header.digest();
            let sig_digest = {
                let mut data = self.chain_id.0.to_vec();
                data.extend_from_slice(&digest.0);
                Digest::hash(&data)
            };
            block.signed_header.witness_signature = signing_key.sign(&sig_digest);
        }

        ensure!(
            block.serialized_size() <= maximum_block_size,
            ChainError::Validation,
            "generated block exceeds the maximum block size"
        );

        // the produced block follows the same path as a received one
        let skip_now = self.skip_flags;
        self.push_block(block.clone(), skip_now)?;
        info!(
            num = block.block_num(),
            witness = %witness_owner,
            transactions = block.transactions.len(),
            "produced block"
        );
        Ok(block)
    }
}
