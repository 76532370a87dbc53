use tracing::{debug, info};

use gamebank_protocol::block::SignedBlock;
use gamebank_protocol::config;
use gamebank_protocol::ensure;
use gamebank_protocol::error::ChainError;
use gamebank_protocol::transaction::SignedTransaction;
use gamebank_protocol::types::{Digest, PublicKey, TransactionId};
use gamebank_protocol::version::BlockHeaderExtension;

use crate::objects::TransactionObject;

use super::{skip, BlockNotification, Database, TransactionNotification};

impl Database {
    /// Apply one block inside the caller's undo session.
    pub(crate) fn apply_block_internal(&mut self, block: &SignedBlock) -> Result<(), ChainError> {
        let note = BlockNotification {
            block_id: block.id(),
            block_num: block.block_num(),
            block: block.clone(),
        };
        self.clear_block_virtual_ops();
        self.notify_pre_apply_block(&note);

        if !self.skipping(skip::MERKLE_CHECK) {
            let computed = block.calculate_merkle_root();
            ensure!(
                computed == block.signed_header.header.transaction_merkle_root,
                ChainError::Fork,
                "merkle root mismatch in block {}",
                block.block_num()
            );
        }

        let signing_witness = self.validate_block_header(block)?;

        if !self.skipping(skip::BLOCK_SIZE_CHECK) {
            let size = block.serialized_size();
            ensure!(
                size >= config::MIN_BLOCK_SIZE,
                ChainError::Fork,
                "block is below the minimum size"
            );
            ensure!(
                size <= self.state.dgp().maximum_block_size as usize,
                ChainError::Fork,
                "block exceeds the declared maximum size"
            );
        }

        let witness_name = block.witness().clone();
        self.state.modify_dgp(|dgp| dgp.current_witness = witness_name);

        self.process_header_extensions(block)?;

        self.current_trx_in_block = 0;
        for trx in &block.transactions {
            self.apply_transaction_internal(trx)?;
            self.current_trx_in_block += 1;
        }
        self.current_trx_id = TransactionId::default();
        self.current_trx_in_block = -1;
        self.current_op_in_trx = 0;

        self.update_global_dynamic_data(block)?;
        self.update_signing_witness(&signing_witness, block);
        self.update_last_irreversible_block()?;
        self.create_block_summary(block);

        self.clear_expired_transactions();
        self.clear_expired_orders()?;
        self.clear_expired_nonfungible_funds_on_sale();
        self.clear_expired_delegations();

        self.update_witness_schedule()?;
        self.update_median_feed();
        self.update_virtual_supply();

        self.clear_null_account_balance()?;
        self.process_funds()?;
        self.process_conversions();
        self.process_comment_cashout()?;
        self.process_vesting_withdrawals()?;
        self.process_savings_withdraws()?;
        self.process_crowdfunding()?;
        self.pay_liquidity_reward()?;

        self.update_virtual_supply();

        self.account_recovery_processing();
        self.expire_escrow_ratification()?;
        self.process_decline_voting_rights()?;
        self.process_hardforks()?;

        self.notify_post_apply_block(&note);
        Ok(())
    }

    /// Header checks: linkage, monotonic timestamp, slot alignment, witness
    /// signature. Returns the signing witness's name.
    fn validate_block_header(
        &mut self,
        block: &SignedBlock,
    ) -> Result<gamebank_protocol::types::AccountName, ChainError> {
        let head_id = self.head_block_id();
        let head_time = self.head_block_time();
        ensure!(
            block.previous() == head_id,
            ChainError::Fork,
            "block {} does not link to the current head",
            block.block_num()
        );
        ensure!(
            block.timestamp() > head_time,
            ChainError::Fork,
            "block timestamp {} is not after the head time {head_time}",
            block.timestamp()
        );

        let witness = self.state.get_witness(block.witness())?.clone();

        if !self.skipping(skip::WITNESS_SIGNATURE) {
            let recovered = self.recover_block_signer(block)?;
            ensure!(
                recovered == witness.signing_key,
                ChainError::Fork,
                "block is not signed by {}'s declared signing key",
                witness.owner
            );
        }

        if !self.skipping(skip::WITNESS_SCHEDULE_CHECK) {
            let slot = self.get_slot_at_time(block.timestamp());
            ensure!(slot > 0, ChainError::Fork, "block timestamp is before the next slot");
            let scheduled = self.get_scheduled_witness(slot)?;
            ensure!(
                &scheduled == block.witness(),
                ChainError::Fork,
                "witness {} produced at a slot scheduled for {scheduled}",
                block.witness()
            );
        }

        Ok(witness.owner)
    }

    pub(crate) fn recover_block_signer(&self, block: &SignedBlock) -> Result<PublicKey, ChainError> {
        let digest = block.signed_header.header.digest();
        let mut data = self.chain_id().0.to_vec();
        data.extend_from_slice(&digest.0);
        let sig_digest = Digest::hash(&data);
        gamebank_crypto::recover_public_key(&block.signed_header.witness_signature, &sig_digest)
    }

    /// Version and hardfork votes carried in the block header.
    fn process_header_extensions(&mut self, block: &SignedBlock) -> Result<(), ChainError> {
        let witness_name = block.witness().clone();
        for ext in &block.signed_header.header.extensions {
            match ext {
                BlockHeaderExtension::Void => {}
                BlockHeaderExtension::Version(version) => {
                    let version = *version;
                    let witness_id = self.state.get_witness(&witness_name)?.id;
                    self.state
                        .witnesses
                        .modify(witness_id, |w| w.running_version = version);
                }
                BlockHeaderExtension::HardforkVersionVote(hf_version, hf_time) => {
                    let (hf_version, hf_time) = (*hf_version, *hf_time);
                    let witness_id = self.state.get_witness(&witness_name)?.id;
                    self.state.witnesses.modify(witness_id, |w| {
                        w.hardfork_version_vote = hf_version;
                        w.hardfork_time_vote = hf_time;
                    });
                }
            }
        }
        Ok(())
    }

    // ── Transactions ─────────────────────────────────────────────────────────

    /// Apply one transaction inside the caller's undo session.
    pub(crate) fn apply_transaction_internal(
        &mut self,
        trx: &SignedTransaction,
    ) -> Result<(), ChainError> {
        let trx_id = trx.id();
        let note = TransactionNotification {
            transaction_id: trx_id,
            transaction: trx.clone(),
        };
        self.notify_pre_apply_transaction(&note);

        if !self.skipping(skip::VALIDATE) {
            trx.validate()?;
        }

        if !self.skipping(skip::TRANSACTION_DUPE_CHECK) {
            ensure!(
                !self.is_known_transaction(&trx_id),
                ChainError::Duplicate,
                "transaction {trx_id} was already applied"
            );
        }

        if !self.skipping(skip::AUTHORITY_CHECK) {
            self.verify_transaction_authority(trx)?;
        }

        let now = self.head_block_time();

        if !self.skipping(skip::TAPOS_CHECK) {
            let summary = self
                .state
                .block_summaries
                .find(trx.trx.ref_block_num as u64)
                .ok_or_else(|| ChainError::Tapos("reference block slot missing".into()))?;
            ensure!(
                summary.block_id.tapos_prefix() == trx.trx.ref_block_prefix,
                ChainError::Tapos,
                "transaction references a block absent from this fork"
            );
        }

        ensure!(
            trx.trx.expiration > now,
            ChainError::Expiration,
            "transaction expired at {}",
            trx.trx.expiration
        );
        ensure!(
            trx.trx.expiration <= now + config::MAX_TIME_UNTIL_EXPIRATION,
            ChainError::Expiration,
            "transaction expiration is too far in the future"
        );

        let expiration = trx.trx.expiration;
        if !self.is_known_transaction(&trx_id) {
            self.state.transactions.insert(|id| TransactionObject {
                id,
                trx_id,
                expiration,
            });
        }

        self.current_trx_id = trx_id;
        self.current_op_in_trx = 0;
        for op in &trx.trx.operations {
            self.apply_operation(op)?;
            self.current_op_in_trx += 1;
        }

        self.notify_post_apply_transaction(&note);
        Ok(())
    }

    pub(crate) fn apply_operation(
        &mut self,
        op: &gamebank_protocol::operations::Operation,
    ) -> Result<(), ChainError> {
        self.notify_pre_apply_operation(op);
        crate::evaluator::apply(self, op)?;
        self.notify_post_apply_operation(op);
        Ok(())
    }

    // ── Per-block global updates ─────────────────────────────────────────────

    fn update_global_dynamic_data(&mut self, block: &SignedBlock) -> Result<(), ChainError> {
        let missed_slots = if self.head_block_num() == 0 {
            0
        } else {
            self.get_slot_at_time(block.timestamp()).saturating_sub(1)
        };

        // charge witnesses that failed to fill their scheduled slots
        if missed_slots > 0 {
            for slot in 1..=missed_slots {
                let name = self.get_scheduled_witness(slot)?;
                if &name == block.witness() {
                    continue;
                }
                let witness = self.state.get_witness(&name)?.clone();
                let shutdown = witness.last_confirmed_block_num + config::BLOCKS_PER_DAY
                    < self.head_block_num();
                self.state.witnesses.modify(witness.id, |w| {
                    w.total_missed += 1;
                    if shutdown {
                        w.signing_key = PublicKey::null();
                    }
                });
                if shutdown {
                    info!(witness = %name, "disabling witness that missed a full day of blocks");
                    self.push_virtual_operation(
                        gamebank_protocol::operations::VirtualOperation::ShutdownWitness {
                            owner: name,
                        },
                    );
                }
            }
        }

        let block_id = block.id();
        let block_num = block.block_num();
        let timestamp = block.timestamp();
        self.state.modify_dgp(|dgp| {
            dgp.head_block_number = block_num;
            dgp.head_block_id = block_id;
            dgp.time = timestamp;
            dgp.current_aslot += missed_slots as u64 + 1;
            let shift = (missed_slots + 1).min(127);
            dgp.recent_slots_filled = (dgp.recent_slots_filled << shift) | 1;
            dgp.participation_count = dgp.recent_slots_filled.count_ones() as u8;
        });
        Ok(())
    }

    fn update_signing_witness(
        &mut self,
        signing_witness: &gamebank_protocol::types::AccountName,
        block: &SignedBlock,
    ) {
        let Some(witness) = self.state.witnesses.find_by_key(signing_witness) else {
            return;
        };
        if witness.last_confirmed_block_num > block.block_num() {
            return;
        }
        let witness_id = witness.id;
        let new_aslot = self.state.dgp().current_aslot;
        let block_num = block.block_num();
        self.state.witnesses.modify(witness_id, |w| {
            w.last_aslot = new_aslot;
            w.last_confirmed_block_num = block_num;
        });
    }

    pub(crate) fn update_last_irreversible_block(&mut self) -> Result<(), ChainError> {
        let dgp = self.state.dgp().clone();
        let old_lib = dgp.last_irreversible_block_num;
        let head = dgp.head_block_number;

        let new_lib = if head < config::START_MINER_VOTING_BLOCK {
            // young chain: irreversibility trails head by one full round
            if head > config::MAX_WITNESSES as u32 {
                head - config::MAX_WITNESSES as u32
            } else {
                old_lib
            }
        } else {
            let schedule = self.state.schedule().clone();
            let confirmations: Vec<u32> = schedule
                .current_shuffled_witnesses
                .iter()
                .map(|name| {
                    self.state
                        .get_witness(name)
                        .map(|w| w.last_confirmed_block_num)
                })
                .collect::<Result<_, _>>()?;
            threshold_confirmation(confirmations).max(old_lib)
        };

        if new_lib > old_lib {
            self.state.modify_dgp(|dgp| dgp.last_irreversible_block_num = new_lib);
            self.state.commit(new_lib as u64);
            for num in (old_lib + 1)..=new_lib {
                self.notify_irreversible_block(num);
            }
        }

        if !self.skipping(skip::BLOCK_LOG) {
            let mut log_head_num = self.block_log.head().map(|b| b.block_num()).unwrap_or(0);
            while log_head_num < new_lib {
                let block = self
                    .fork_db
                    .fetch_block_on_main_branch_by_number(log_head_num + 1)
                    .ok_or_else(|| {
                        ChainError::Storage(
                            "fork tree no longer contains a newly irreversible block".into(),
                        )
                    })?;
                self.block_log.append(&block)?;
                log_head_num += 1;
            }
            if new_lib > old_lib {
                self.block_log.flush()?;
            }
        }

        let head_num = self.state.dgp().head_block_number;
        self.fork_db
            .set_max_size(head_num.saturating_sub(new_lib).max(1) + 1);
        Ok(())
    }

    fn create_block_summary(&mut self, block: &SignedBlock) {
        let slot = (block.block_num() & 0xffff) as u64;
        let id = block.id();
        self.state.block_summaries.modify(slot, |s| s.block_id = id);
    }

    // ── Expiry sweeps ────────────────────────────────────────────────────────

    fn clear_expired_transactions(&mut self) {
        let now = self.head_block_time();
        while let Some(first) = self.state.transactions.first_by_sort() {
            if first.expiration >= now {
                break;
            }
            let id = first.id;
            self.state.transactions.remove(id);
        }
    }

    fn clear_expired_orders(&mut self) -> Result<(), ChainError> {
        let now = self.head_block_time();
        loop {
            let Some(first) = self.state.limit_orders.first_by_sort() else {
                break;
            };
            if first.expiration >= now {
                break;
            }
            let order = first.clone();
            debug!(seller = %order.seller, order_id = order.order_id, "cancelling expired order");
            self.cancel_order(&order)?;
        }
        Ok(())
    }

    fn clear_expired_nonfungible_funds_on_sale(&mut self) {
        let now = self.head_block_time();
        while let Some(first) = self.state.nonfungible_funds_on_sale.first_by_sort() {
            if first.expiration >= now {
                break;
            }
            let id = first.id;
            self.state.nonfungible_funds_on_sale.remove(id);
        }
    }

    fn clear_expired_delegations(&mut self) {
        let now = self.head_block_time();
        loop {
            let Some(first) = self.state.delegation_expirations.first_by_sort() else {
                break;
            };
            if first.expiration > now {
                break;
            }
            let expired = first.clone();
            if let Some(account) = self.state.accounts.find_by_key(&expired.delegator) {
                let account_id = account.id;
                self.state.accounts.modify(account_id, |a| {
                    a.delegated_vesting_shares -= expired.vesting_shares;
                });
            }
            self.push_virtual_operation(
                gamebank_protocol::operations::VirtualOperation::ReturnVestingDelegation {
                    account: expired.delegator.clone(),
                    vesting_shares: expired.vesting_shares,
                },
            );
            self.state.delegation_expirations.remove(expired.id);
        }
    }

    // ── Reindex ──────────────────────────────────────────────────────────────

    /// Wipe state and replay the block log with every safe check disabled.
    pub fn reindex(&mut self) -> Result<u32, ChainError> {
        let log_head = match self.block_log.head() {
            Some(h) => h.block_num(),
            None => return Ok(0),
        };
        info!(log_head, "reindexing from the block log");
        self.notify_pre_reindex(log_head);

        self.state.clear();
        let genesis_supply = self.genesis_supply;
        crate::genesis::init_genesis(&mut self.state, genesis_supply)?;
        self.fork_db.reset();

        let replay_skip = skip::WITNESS_SIGNATURE
            | skip::TRANSACTION_SIGNATURES
            | skip::TRANSACTION_DUPE_CHECK
            | skip::MERKLE_CHECK
            | skip::TAPOS_CHECK
            | skip::AUTHORITY_CHECK
            | skip::WITNESS_SCHEDULE_CHECK
            | skip::VALIDATE
            | skip::BLOCK_SIZE_CHECK
            | skip::BLOCK_LOG;

        let mut last: Option<SignedBlock> = None;
        for num in 1..=log_head {
            let block = self
                .block_log
                .read_block_by_num(num)?
                .ok_or_else(|| ChainError::Storage(format!("block {num} missing from log")))?;
            self.with_skip(replay_skip, |db| db.apply_block_internal(&block))?;
            last = Some(block);
        }
        if let Some(head) = last {
            self.fork_db.start_block(head);
        }
        self.state.set_revision(self.head_block_num() as u64);

        self.notify_post_reindex(log_head);
        info!(head = self.head_block_num(), "reindex complete");
        Ok(log_head)
    }

    fn notify_pre_reindex(&mut self, num: u32) {
        super::dispatch(&mut self.signals.pre_reindex, &num, "pre_reindex");
    }

    fn notify_post_reindex(&mut self, num: u32) {
        super::dispatch(&mut self.signals.post_reindex, &num, "post_reindex");
    }

}

/// The highest block number confirmed by the irreversibility supermajority:
/// with threshold t over n scheduled witnesses, the ⌊(1−t)·n⌋-th smallest
/// of their last confirmed block numbers.
pub(crate) fn threshold_confirmation(mut confirmations: Vec<u32>) -> u32 {
    let offset = ((config::PERCENT_100 - config::IRREVERSIBLE_THRESHOLD) as usize
        * confirmations.len())
        / config::PERCENT_100 as usize;
    confirmations.select_nth_unstable(offset);
    confirmations[offset]
}

#[cfg(test)]
mod tests {
    use super::threshold_confirmation;

    #[test]
    fn sixteen_of_twenty_one_confirmations_advance_irreversibility() {
        // 16 witnesses confirmed block 100, 5 lag behind
        let mut confirmations = vec![100u32; 16];
        confirmations.extend([40, 41, 42, 43, 44]);
        assert_eq!(threshold_confirmation(confirmations), 100);
    }

    #[test]
    fn a_large_minority_cannot_advance_irreversibility(){
        // only 5 of 21 confirmed block 100
        let mut confirmations = vec![50u32; 16];
        confirmations.extend([100; 5]);
        assert_eq!(threshold_confirmation(confirmations), 50);
    }

    #[test]
    fn unanimous_confirmation_is_taken_whole() {
        assert_eq!(threshold_confirmation(vec![7; 21]), 7);
    }
}
