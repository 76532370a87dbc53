use serde::{Deserialize, Serialize};

use gamebank_protocol::asset::{Asset, Price, GBC, GBD, GBS};
use gamebank_protocol::config;
use gamebank_protocol::types::{AccountName, BlockId, Timestamp, TransactionId};
use gamebank_protocol::version::HardforkVersion;
use gamebank_store::TableObject;

/// The singleton of chain-wide dynamic state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DynamicGlobalPropertyObject {
    pub id: u64,
    pub head_block_number: u32,
    pub head_block_id: BlockId,
    pub time: Timestamp,
    pub current_witness: AccountName,

    /// Absolute slot count since genesis, including missed slots.
    pub current_aslot: u64,

    pub current_supply: Asset,
    pub current_gbd_supply: Asset,
    /// GBC-denominated total across both tokens at the median feed.
    pub virtual_supply: Asset,

    pub total_vesting_fund_gbc: Asset,
    pub total_vesting_shares: Asset,
    pub total_reward_fund_gbc: Asset,
    pub pending_rewarded_vesting_shares: Asset,
    pub pending_rewarded_vesting_gbc: Asset,

    /// Basis points of newly minted GBD actually printed (debt throttle).
    pub gbd_print_rate: u16,
    pub gbd_interest_rate: u16,

    pub maximum_block_size: u32,
    pub last_irreversible_block_num: u32,

    /// Bitmap of the last 128 slots; bit 0 is the most recent.
    pub recent_slots_filled: u128,
    /// Popcount of `recent_slots_filled`.
    pub participation_count: u8,

    pub vote_power_reserve_rate: u32,
    /// Accounts grantable via `create_claimed_account` across all claimants.
    pub pending_claimed_accounts: i64,
}

impl DynamicGlobalPropertyObject {
    pub fn new(id: u64) -> Self {
        DynamicGlobalPropertyObject {
            id,
            head_block_number: 0,
            head_block_id: BlockId::default(),
            time: config::GENESIS_TIME,
            current_witness: AccountName::default(),
            current_aslot: 0,
            current_supply: Asset::zero(GBC),
            current_gbd_supply: Asset::zero(GBD),
            virtual_supply: Asset::zero(GBC),
            total_vesting_fund_gbc: Asset::zero(GBC),
            total_vesting_shares: Asset::zero(GBS),
            total_reward_fund_gbc: Asset::zero(GBC),
            pending_rewarded_vesting_shares: Asset::zero(GBS),
            pending_rewarded_vesting_gbc: Asset::zero(GBC),
            gbd_print_rate: config::PERCENT_100 as u16,
            gbd_interest_rate: config::DEFAULT_GBD_INTEREST_RATE as u16,
            maximum_block_size: config::SOFT_MAX_BLOCK_SIZE,
            last_irreversible_block_num: 0,
            recent_slots_filled: u128::MAX,
            participation_count: 128,
            vote_power_reserve_rate: config::INITIAL_VOTE_POWER_RATE,
            pending_claimed_accounts: 0,
        }
    }

    /// GBS per GBC for power-ups and power-downs.
    pub fn vesting_share_price(&self) -> Price {
        if self.total_vesting_fund_gbc.amount == 0 || self.total_vesting_shares.amount == 0 {
            // bootstrap price: 1_000_000 GBS micro-units per 1_000 GBC milli-units
            return Price::new(Asset::new(1_000_000, GBS), Asset::new(1_000, GBC));
        }
        Price::new(self.total_vesting_shares, self.total_vesting_fund_gbc)
    }

    /// Share price used for pending reward vesting, which tracks its own
    /// fund so reward accrual cannot move the main share price.
    pub fn reward_vesting_share_price(&self) -> Price {
        if self.total_vesting_fund_gbc.amount + self.pending_rewarded_vesting_gbc.amount == 0 {
            return self.vesting_share_price();
        }
        Price::new(
            self.total_vesting_shares + self.pending_rewarded_vesting_shares,
            self.total_vesting_fund_gbc + self.pending_rewarded_vesting_gbc,
        )
    }
}

impl TableObject for DynamicGlobalPropertyObject {
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

/// The rolling window of hourly median feeds and its overall median.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FeedHistoryObject {
    pub id: u64,
    pub current_median_history: Price,
    pub price_history: Vec<Price>,
}

impl FeedHistoryObject {
    pub fn new(id: u64) -> Self {
        FeedHistoryObject {
            id,
            current_median_history: Price::null(),
            price_history: Vec::new(),
        }
    }
}

impl TableObject for FeedHistoryObject {
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

/// Hardfork bookkeeping: what has run, what is scheduled, what the
/// witnesses are voting for.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HardforkPropertyObject {
    pub id: u64,
    pub processed_hardforks: Vec<Timestamp>,
    pub last_hardfork: u32,
    pub current_hardfork_version: HardforkVersion,
    pub next_hardfork: HardforkVersion,
    pub next_hardfork_time: Timestamp,
}

impl TableObject for HardforkPropertyObject {
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

/// One slot of the 2^16-entry ring of recent block ids (TaPoS).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BlockSummaryObject {
    pub id: u64,
    pub block_id: BlockId,
}

impl TableObject for BlockSummaryObject {
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

/// Recently applied transaction ids, kept until expiration (replay guard).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TransactionObject {
    pub id: u64,
    pub trx_id: TransactionId,
    pub expiration: Timestamp,
}

impl TableObject for TransactionObject {
    type Key = TransactionId;
    type SortKey = Timestamp;

    fn id(&self) -> u64 {
        self.id
    }
    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
    fn key(&self) -> TransactionId {
        self.trx_id
    }
    fn sort_key(&self) -> Timestamp {
        self.expiration
    }
}

/// How a reward fund maps accumulated rshares onto payouts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum RewardCurve {
    Quadratic,
    Linear,
    /// `r·2⁶⁴ / (2s + r)` — the curation curve, bounded above by 2⁶⁴.
    BoundedCuration,
}

/// A content reward pool.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RewardFundObject {
    pub id: u64,
    pub name: String,
    pub reward_balance: Asset,
    pub recent_claims: u128,
    pub last_update: Timestamp,
    pub content_constant: u128,
    pub percent_curation_rewards: u16,
    /// Share of the per-block content reward routed to this fund.
    pub percent_content_rewards: u16,
    pub author_reward_curve: RewardCurve,
    pub curation_reward_curve: RewardCurve,
}

impl TableObject for RewardFundObject {
    type Key = String;
    type SortKey = ();

    fn id(&self) -> u64 {
        self.id
    }
    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
    fn key(&self) -> String {
        self.name.clone()
    }
    fn sort_key(&self) {}
}
