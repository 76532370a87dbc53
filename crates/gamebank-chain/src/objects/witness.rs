use serde::{Deserialize, Serialize};

use gamebank_protocol::asset::Price;
use gamebank_protocol::config;
use gamebank_protocol::operations::ChainProperties;
use gamebank_protocol::types::{AccountName, PublicKey, Timestamp};
use gamebank_protocol::version::{HardforkVersion, Version};
use gamebank_store::TableObject;

/// How a witness earned its place in the current schedule.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WitnessScheduleKind {
    /// Top slots by stake-weighted vote.
    Elected,
    /// The virtual-round slot, rotating by accumulated virtual time.
    Timeshare,
    /// Retired mining slot, kept for historical blocks.
    Miner,
    /// Not currently scheduled.
    None,
}

/// A block-producer candidacy.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WitnessObject {
    pub id: u64,
    pub owner: AccountName,
    pub created: Timestamp,
    pub url: String,
    pub total_missed: u32,
    /// Absolute slot of the last block this witness produced.
    pub last_aslot: u64,
    pub last_confirmed_block_num: u32,
    pub signing_key: PublicKey,
    pub props: ChainProperties,
    /// The witness's published GBD-per-GBC quote.
    pub gbd_exchange_rate: Price,
    pub last_gbd_exchange_update: Timestamp,
    /// Vote tally in vesting-share satoshis.
    pub votes: i64,
    pub schedule: WitnessScheduleKind,

    // Virtual-round scheduling state (128-bit to survive vote-weighted laps).
    pub virtual_last_update: u128,
    pub virtual_position: u128,
    pub virtual_scheduled_time: u128,

    pub running_version: Version,
    pub hardfork_version_vote: HardforkVersion,
    pub hardfork_time_vote: Timestamp,
}

impl WitnessObject {
    pub fn new(id: u64, owner: AccountName, created: Timestamp) -> Self {
        WitnessObject {
            id,
            owner,
            created,
            url: String::new(),
            total_missed: 0,
            last_aslot: 0,
            last_confirmed_block_num: 0,
            signing_key: PublicKey::null(),
            props: ChainProperties::default(),
            gbd_exchange_rate: Price::null(),
            last_gbd_exchange_update: 0,
            votes: 0,
            schedule: WitnessScheduleKind::None,
            virtual_last_update: 0,
            virtual_position: 0,
            virtual_scheduled_time: u128::MAX,
            running_version: Version::default(),
            hardfork_version_vote: HardforkVersion::default(),
            hardfork_time_vote: 0,
        }
    }
}

impl TableObject for WitnessObject {
    type Key = AccountName;
    type SortKey = ();

    fn id(&self) -> u64 {
        self.id
    }
    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
    fn key(&self) -> AccountName {
        self.owner.clone()
    }
    fn sort_key(&self) {}
}

/// One account's approval of one witness.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WitnessVoteObject {
    pub id: u64,
    pub witness: AccountName,
    pub account: AccountName,
}

impl TableObject for WitnessVoteObject {
    type Key = (AccountName, AccountName);
    type SortKey = AccountName;

    fn id(&self) -> u64 {
        self.id
    }
    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
    fn key(&self) -> (AccountName, AccountName) {
        (self.witness.clone(), self.account.clone())
    }
    /// Ordered by voting account, for clearing an account's votes.
    fn sort_key(&self) -> AccountName {
        self.account.clone()
    }
}

/// The singleton schedule: the shuffled producer set for the current round
/// plus the medians and weights derived at the last rotation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WitnessScheduleObject {
    pub id: u64,
    /// Virtual time consumed so far by the timeshare rotation.
    pub current_virtual_time: u128,
    pub next_shuffle_block_num: u32,
    pub current_shuffled_witnesses: Vec<AccountName>,
    pub num_scheduled_witnesses: u8,

    pub elected_weight: u8,
    pub timeshare_weight: u8,
    pub miner_weight: u8,
    pub witness_pay_normalization_factor: u32,

    pub median_props: ChainProperties,
    pub majority_version: Version,

    pub max_voted_witnesses: u8,
    pub max_runner_witnesses: u8,
    pub hardfork_required_witnesses: u8,
}

impl WitnessScheduleObject {
    pub fn new(id: u64) -> Self {
        WitnessScheduleObject {
            id,
            current_virtual_time: 0,
            next_shuffle_block_num: 1,
            current_shuffled_witnesses: Vec::new(),
            num_scheduled_witnesses: 1,
            elected_weight: 1,
            timeshare_weight: 5,
            miner_weight: 1,
            witness_pay_normalization_factor: 25,
            median_props: ChainProperties::default(),
            majority_version: Version::default(),
            max_voted_witnesses: config::MAX_VOTED_WITNESSES as u8,
            max_runner_witnesses: config::MAX_RUNNER_WITNESSES as u8,
            hardfork_required_witnesses: config::HARDFORK_REQUIRED_WITNESSES as u8,
        }
    }
}

impl TableObject for WitnessScheduleObject {
    type Key = u64;
    type SortKey = ();

    fn id(&self) -> u64 {
        self.id
    }
    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
    fn key(&self) -> u64 {
        self.id
    }
    fn sort_key(&self) {}
}
