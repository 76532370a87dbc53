use serde::{Deserialize, Serialize};

use gamebank_protocol::asset::{Asset, GBC, GBD, GBS};
use gamebank_protocol::authority::Authority;
use gamebank_protocol::types::{AccountName, PublicKey, Timestamp, TIMESTAMP_MAX};
use gamebank_store::TableObject;

use gamebank_protocol::config;

/// Full on-chain account state.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AccountObject {
    pub id: u64,
    pub name: AccountName,
    pub owner: Authority,
    pub active: Authority,
    pub posting: Authority,
    pub memo_key: PublicKey,
    pub json_metadata: String,
    pub proxy: AccountName,
    pub recovery_account: AccountName,

    pub created: Timestamp,
    pub last_owner_update: Timestamp,
    pub last_account_update: Timestamp,
    pub last_account_recovery: Timestamp,
    /// Account came from the retired mining path rather than a creation fee.
    pub mined: bool,
    pub can_vote: bool,

    /// Regenerating voting power in basis points (0..=10000).
    pub voting_power: u16,
    pub last_vote_time: Timestamp,
    pub last_post: Timestamp,
    pub last_root_post: Timestamp,
    pub post_count: u32,

    // ── Balances ─────────────────────────────────────────────────────────────
    pub balance: Asset,
    pub savings_balance: Asset,
    pub gbd_balance: Asset,
    pub savings_gbd_balance: Asset,
    pub savings_withdraw_requests: u32,

    // Interest accrual scratch: ∫ balance dt since the last payment.
    pub gbd_seconds: u128,
    pub gbd_seconds_last_update: Timestamp,
    pub gbd_last_interest_payment: Timestamp,
    pub savings_gbd_seconds: u128,
    pub savings_gbd_seconds_last_update: Timestamp,
    pub savings_gbd_last_interest_payment: Timestamp,

    // ── Pending reward buckets ───────────────────────────────────────────────
    pub reward_gbc_balance: Asset,
    pub reward_gbd_balance: Asset,
    pub reward_vesting_balance: Asset,
    /// Liquid value backing `reward_vesting_balance` at accrual time.
    pub reward_vesting_gbc: Asset,

    // ── Vesting ──────────────────────────────────────────────────────────────
    pub vesting_shares: Asset,
    pub delegated_vesting_shares: Asset,
    pub received_vesting_shares: Asset,
    pub vesting_withdraw_rate: Asset,
    pub next_vesting_withdrawal: Timestamp,
    pub withdrawn: i64,
    pub to_withdraw: i64,
    pub withdraw_routes: u16,

    // ── Witness voting ───────────────────────────────────────────────────────
    /// Stake-weighted votes flowing through proxy chains, by recursion depth.
    pub proxied_vsf_votes: [i64; config::MAX_PROXY_RECURSION_DEPTH as usize],
    pub witnesses_voted_for: u16,

    // ── Lifetime tallies ─────────────────────────────────────────────────────
    pub curation_rewards: i64,
    pub posting_rewards: i64,

    pub pending_claimed_accounts: i64,

    // ── Crowdfunding ─────────────────────────────────────────────────────────
    pub last_crowdfunding_expire: Timestamp,
    pub crowdfunding_count: u32,
}

impl AccountObject {
    pub fn new(id: u64, name: AccountName, created: Timestamp) -> Self {
        AccountObject {
            id,
            name,
            owner: Authority::default(),
            active: Authority::default(),
            posting: Authority::default(),
            memo_key: PublicKey::null(),
            json_metadata: String::new(),
            proxy: AccountName::default(),
            recovery_account: AccountName::default(),
            created,
            last_owner_update: 0,
            last_account_update: 0,
            last_account_recovery: 0,
            mined: false,
            can_vote: true,
            voting_power: config::PERCENT_100 as u16,
            last_vote_time: 0,
            last_post: 0,
            last_root_post: 0,
            post_count: 0,
            balance: Asset::zero(GBC),
            savings_balance: Asset::zero(GBC),
            gbd_balance: Asset::zero(GBD),
            savings_gbd_balance: Asset::zero(GBD),
            savings_withdraw_requests: 0,
            gbd_seconds: 0,
            gbd_seconds_last_update: 0,
            gbd_last_interest_payment: 0,
            savings_gbd_seconds: 0,
            savings_gbd_seconds_last_update: 0,
            savings_gbd_last_interest_payment: 0,
            reward_gbc_balance: Asset::zero(GBC),
            reward_gbd_balance: Asset::zero(GBD),
            reward_vesting_balance: Asset::zero(GBS),
            reward_vesting_gbc: Asset::zero(GBC),
            vesting_shares: Asset::zero(GBS),
            delegated_vesting_shares: Asset::zero(GBS),
            received_vesting_shares: Asset::zero(GBS),
            vesting_withdraw_rate: Asset::zero(GBS),
            next_vesting_withdrawal: TIMESTAMP_MAX,
            withdrawn: 0,
            to_withdraw: 0,
            withdraw_routes: 0,
            proxied_vsf_votes: [0; config::MAX_PROXY_RECURSION_DEPTH as usize],
            witnesses_voted_for: 0,
            curation_rewards: 0,
            posting_rewards: 0,
            pending_claimed_accounts: 0,
            last_crowdfunding_expire: 0,
            crowdfunding_count: 0,
        }
    }

    /// Own stake plus proxied stake at every depth, in GBS satoshis. This is
    /// the weight the account contributes to witness votes.
    pub fn witness_vote_weight(&self) -> i64 {
        self.vesting_shares.amount + self.proxied_vsf_votes.iter().sum::<i64>()
    }

    pub fn has_proxy(&self) -> bool {
        !self.proxy.is_empty()
    }
}

impl TableObject for AccountObject {
    type Key = AccountName;
    type SortKey = Timestamp;

    fn id(&self) -> u64 {
        self.id
    }
    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
    fn key(&self) -> AccountName {
        self.name.clone()
    }
    /// Ordered by the next pending vesting withdrawal.
    fn sort_key(&self) -> Timestamp {
        self.next_vesting_withdrawal
    }
}

/// A snapshot of a previous owner authority, kept for the recovery window.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct OwnerAuthorityHistoryObject {
    pub id: u64,
    pub account: AccountName,
    pub previous_owner_authority: Authority,
    pub last_valid_time: Timestamp,
}

impl TableObject for OwnerAuthorityHistoryObject {
    type Key = u64;
    type SortKey = (AccountName, Timestamp);

    fn id(&self) -> u64 {
        self.id
    }
    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
    fn key(&self) -> u64 {
        self.id
    }
    fn sort_key(&self) -> (AccountName, Timestamp) {
        (self.account.clone(), self.last_valid_time)
    }
}

/// An open request by a recovery partner to replace an account's owner key.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AccountRecoveryRequestObject {
    pub id: u64,
    pub account_to_recover: AccountName,
    pub new_owner_authority: Authority,
    pub expires: Timestamp,
}

impl TableObject for AccountRecoveryRequestObject {
    type Key = AccountName;
    type SortKey = Timestamp;

    fn id(&self) -> u64 {
        self.id
    }
    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
    fn key(&self) -> AccountName {
        self.account_to_recover.clone()
    }
    fn sort_key(&self) -> Timestamp {
        self.expires
    }
}

/// A pending change of recovery partner; effective after the recovery window.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChangeRecoveryAccountRequestObject {
    pub id: u64,
    pub account_to_recover: AccountName,
    pub recovery_account: AccountName,
    pub effective_on: Timestamp,
}

impl TableObject for ChangeRecoveryAccountRequestObject {
    type Key = AccountName;
    type SortKey = Timestamp;

    fn id(&self) -> u64 {
        self.id
    }
    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
    fn key(&self) -> AccountName {
        self.account_to_recover.clone()
    }
    fn sort_key(&self) -> Timestamp {
        self.effective_on
    }
}

/// A pending decline-voting-rights request.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeclineVotingRightsRequestObject {
    pub id: u64,
    pub account: AccountName,
    pub effective_date: Timestamp,
}

impl TableObject for DeclineVotingRightsRequestObject {
    type Key = AccountName;
    type SortKey = Timestamp;

    fn id(&self) -> u64 {
        self.id
    }
    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
    fn key(&self) -> AccountName {
        self.account.clone()
    }
    fn sort_key(&self) -> Timestamp {
        self.effective_date
    }
}

/// Routes a slice of each vesting-withdrawal interval to a destination.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WithdrawVestingRouteObject {
    pub id: u64,
    pub from_account: AccountName,
    pub to_account: AccountName,
    pub percent: u16,
    pub auto_vest: bool,
}

impl TableObject for WithdrawVestingRouteObject {
    type Key = (AccountName, AccountName);
    type SortKey = AccountName;

    fn id(&self) -> u64 {
        self.id
    }
    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
    fn key(&self) -> (AccountName, AccountName) {
        (self.from_account.clone(), self.to_account.clone())
    }
    fn sort_key(&self) -> AccountName {
        self.from_account.clone()
    }
}

/// An active delegation of vesting voting power.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VestingDelegationObject {
    pub id: u64,
    pub delegator: AccountName,
    pub delegatee: AccountName,
    pub vesting_shares: Asset,
    pub min_delegation_time: Timestamp,
}

impl TableObject for VestingDelegationObject {
    type Key = (AccountName, AccountName);
    type SortKey = ();

    fn id(&self) -> u64 {
        self.id
    }
    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
    fn key(&self) -> (AccountName, AccountName) {
        (self.delegator.clone(), self.delegatee.clone())
    }
    fn sort_key(&self) {}
}

/// Stake withdrawn from a delegation, queued until its return date.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VestingDelegationExpirationObject {
    pub id: u64,
    pub delegator: AccountName,
    pub vesting_shares: Asset,
    pub expiration: Timestamp,
}

impl TableObject for VestingDelegationExpirationObject {
    type Key = u64;
    type SortKey = Timestamp;

    fn id(&self) -> u64 {
        self.id
    }
    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
    fn key(&self) -> u64 {
        self.id
    }
    fn sort_key(&self) -> Timestamp {
        self.expiration
    }
}
