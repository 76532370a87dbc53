use std::collections::BTreeMap;

use tracing::debug;

use gamebank_protocol::config;
use gamebank_protocol::ensure;
use gamebank_protocol::error::ChainError;
use gamebank_protocol::types::{AccountName, Timestamp};
use gamebank_protocol::version::{HardforkVersion, Version};

use crate::objects::WitnessScheduleKind;

use super::balance::VIRTUAL_SCHEDULE_LAP_LENGTH;
use super::Database;

impl Database {
    // ── Slot arithmetic ──────────────────────────────────────────────────────

    /// Wall-clock time of the slot `slot_num` slots past the head block
    /// (slot 0 is the head slot itself).
    pub fn get_slot_time(&self, slot_num: u32) -> Timestamp {
        if slot_num == 0 {
            return 0;
        }
        let interval = config::BLOCK_INTERVAL;
        if self.head_block_num() == 0 {
            // the genesis slot: anything before it maps to slot 1
            return config::GENESIS_TIME + slot_num as i64 * interval;
        }
        let head_slot_time = (self.head_block_time() / interval) * interval;
        head_slot_time + slot_num as i64 * interval
    }

    /// Which future slot `when` falls into; 0 when `when` precedes slot 1.
    pub fn get_slot_at_time(&self, when: Timestamp) -> u32 {
        let first_slot_time = self.get_slot_time(1);
        if when < first_slot_time {
            return 0;
        }
        ((when - first_slot_time) / config::BLOCK_INTERVAL) as u32 + 1
    }

    /// The witness scheduled to produce at `slot_num`.
    pub fn get_scheduled_witness(&self, slot_num: u32) -> Result<AccountName, ChainError> {
        let dgp = self.state.dgp();
        let schedule = self.state.schedule();
        ensure!(
            !schedule.current_shuffled_witnesses.is_empty(),
            ChainError::StatePrecondition,
            "the witness schedule is empty"
        );
        let index = (dgp.current_aslot + slot_num as u64)
            % schedule.current_shuffled_witnesses.len() as u64;
        Ok(schedule.current_shuffled_witnesses[index as usize].clone())
    }

    // ── Round rotation ───────────────────────────────────────────────────────

    /// Rebuild the shuffled producer set at the end of each round: the top
    /// voted witnesses plus one timeshare slot picked by virtual scheduled
    /// time, then a deterministic shuffle keyed by the head timestamp.
    pub(crate) fn update_witness_schedule(&mut self) -> Result<(), ChainError> {
        let head = self.head_block_num();
        let num_scheduled = self.state.schedule().num_scheduled_witnesses as u32;
        if head % num_scheduled.max(1) != 0 {
            return Ok(());
        }

        let schedule = self.state.schedule().clone();
        let mut active: Vec<AccountName> = Vec::new();

        // elected seats: top by vote, producing key required
        let mut by_votes: Vec<(i64, u64, AccountName)> = self
            .state
            .witnesses
            .iter()
            .filter(|w| !w.signing_key.is_null())
            .map(|w| (w.votes, w.id, w.owner.clone()))
            .collect();
        by_votes.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
        for (_, id, owner) in by_votes.iter().take(schedule.max_voted_witnesses as usize) {
            active.push(owner.clone());
            self.state
                .witnesses
                .modify(*id, |w| w.schedule = WitnessScheduleKind::Elected);
        }

        // timeshare seats: smallest virtual scheduled time not already seated
        let mut new_virtual_time = schedule.current_virtual_time;
        let mut by_schedule: Vec<(u128, u64, AccountName)> = self
            .state
            .witnesses
            .iter()
            .filter(|w| !w.signing_key.is_null() && !active.contains(&w.owner))
            .map(|w| (w.virtual_scheduled_time, w.id, w.owner.clone()))
            .collect();
        by_schedule.sort();
        for (vtime, id, owner) in by_schedule
            .iter()
            .take(schedule.max_runner_witnesses as usize)
        {
            new_virtual_time = *vtime;
            active.push(owner.clone());
            let votes = self.state.witnesses.find(*id).map(|w| w.votes).unwrap_or(0);
            let scheduled =
                new_virtual_time.wrapping_add(VIRTUAL_SCHEDULE_LAP_LENGTH / (votes.max(0) as u128 + 1));
            self.state.witnesses.modify(*id, |w| {
                w.schedule = WitnessScheduleKind::Timeshare;
                w.virtual_position = 0;
                w.virtual_scheduled_time = scheduled;
            });
        }

        if active.is_empty() {
            return Ok(());
        }

        self.update_median_witness_props(&active)?;
        self.update_witness_majority_version(&active);
        self.update_hardfork_votes(&active);

        // deterministic shuffle keyed by the head timestamp
        let mut shuffled = active;
        let now_hi = (self.head_block_time() as u64) << 32;
        let n = shuffled.len();
        for i in 0..n {
            let mut k = now_hi + i as u64 * 2_685_821_657_736_338_717u64;
            k ^= k >> 12;
            k ^= k << 25;
            k ^= k >> 27;
            k = k.wrapping_mul(2_685_821_657_736_338_717u64);
            let jmax = (n - i) as u64;
            let j = i + (k % jmax) as usize;
            shuffled.swap(i, j);
        }

        let count = shuffled.len() as u8;
        debug!(round = head, witnesses = count, "rotated witness schedule");
        self.state.modify_schedule(|s| {
            s.current_virtual_time = new_virtual_time;
            s.current_shuffled_witnesses = shuffled;
            s.num_scheduled_witnesses = count.max(1);
            s.next_shuffle_block_num = head + count as u32;
        });
        Ok(())
    }

    /// Median of each producer-declared chain parameter across the round.
    fn update_median_witness_props(&mut self, active: &[AccountName]) -> Result<(), ChainError> {
        let mut fees = Vec::with_capacity(active.len());
        let mut sizes = Vec::with_capacity(active.len());
        let mut rates = Vec::with_capacity(active.len());
        for name in active {
            let w = self.state.get_witness(name)?;
            fees.push(w.props.account_creation_fee.amount);
            sizes.push(w.props.maximum_block_size);
            rates.push(w.props.gbd_interest_rate);
        }
        fees.sort_unstable();
        sizes.sort_unstable();
        rates.sort_unstable();
        let mid = active.len() / 2;
        let (fee, size, rate) = (fees[mid], sizes[mid], rates[mid]);

        self.state.modify_schedule(|s| {
            s.median_props.account_creation_fee =
                gamebank_protocol::asset::Asset::new(fee, gamebank_protocol::asset::GBC);
            s.median_props.maximum_block_size = size;
            s.median_props.gbd_interest_rate = rate;
        });
        self.state.modify_dgp(|dgp| {
            dgp.maximum_block_size = size.max(config::MIN_BLOCK_SIZE_LIMIT);
            dgp.gbd_interest_rate = rate;
        });
        Ok(())
    }

    /// The highest version run by more than half of the scheduled set.
    fn update_witness_majority_version(&mut self, active: &[AccountName]) {
        let mut counts: BTreeMap<Version, u32> = BTreeMap::new();
        for name in active {
            if let Some(w) = self.state.witnesses.find_by_key(name) {
                *counts.entry(w.running_version).or_insert(0) += 1;
            }
        }
        let threshold = active.len() as u32 / 2;
        let mut running = 0;
        let mut majority = Version::default();
        for (version, count) in counts.iter().rev() {
            running += count;
            if running > threshold {
                majority = *version;
                break;
            }
        }
        self.state.modify_schedule(|s| s.majority_version = majority);
    }

    /// Adopt a pending hardfork once enough of the round votes for the same
    /// (version, time) pair.
    fn update_hardfork_votes(&mut self, active: &[AccountName]) {
        let mut counts: BTreeMap<(HardforkVersion, Timestamp), u32> = BTreeMap::new();
        for name in active {
            if let Some(w) = self.state.witnesses.find_by_key(name) {
                *counts.entry((w.hardfork_version_vote, w.hardfork_time_vote)).or_insert(0) += 1;
            }
        }
        let required = self.state.schedule().hardfork_required_witnesses as u32;
        let hf = self.state.hardforks().clone();
        let mut next_version = HardforkVersion::default();
        let mut next_time: Timestamp = 0;
        for ((version, time), count) in counts.iter().rev() {
            if *count >= required && *version > hf.current_hardfork_version {
                next_version = *version;
                next_time = *time;
                break;
            }
        }
        if next_version != HardforkVersion::default() {
            self.state.modify_hardforks(|h| {
                h.next_hardfork = next_version;
                h.next_hardfork_time = next_time;
            });
        }
    }
}
