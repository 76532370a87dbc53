//! Genesis state construction.

use tracing::info;

use gamebank_protocol::asset::{Asset, GBC};
use gamebank_protocol::authority::Authority;
use gamebank_protocol::config;
use gamebank_protocol::error::ChainError;
use gamebank_protocol::types::{AccountName, PublicKey};

use crate::objects::*;
use crate::state::State;

/// The well-known key controlling `initminer` on fresh chains. Derived from
/// a fixed seed so development networks are reproducible; production chains
/// replace it at the first owner update.
pub fn init_public_key() -> PublicKey {
    gamebank_crypto::PrivateKey::from_seed("initminer").public_key()
}

/// Build the founding state: system accounts, the first witness, the reward
/// funds, the schedule, and the block-summary ring.
///
/// `init_supply` is nonzero only on development/test configurations; a share
/// of it is pre-vested once, as a one-shot migration.
pub fn init_genesis(state: &mut State, init_supply: i64) -> Result<(), ChainError> {
    assert!(state.accounts.is_empty(), "genesis may only run on an empty state");
    let now = config::GENESIS_TIME;
    let init_key = init_public_key();

    // system accounts: the unclaimable null sink, the anyone-can-sign temp
    // account, and the witness aggregate account
    state.accounts.insert(|id| {
        let mut a = AccountObject::new(id, config::MINER_ACCOUNT.into(), now);
        a.owner = Authority::impossible();
        a.active = Authority::impossible();
        a.posting = Authority::impossible();
        a
    });
    state.accounts.insert(|id| {
        let mut a = AccountObject::new(id, config::NULL_ACCOUNT.into(), now);
        a.owner = Authority::impossible();
        a.active = Authority::impossible();
        a.posting = Authority::impossible();
        a
    });
    state.accounts.insert(|id| {
        let mut a = AccountObject::new(id, config::TEMP_ACCOUNT.into(), now);
        a.owner = Authority {
            weight_threshold: 0,
            ..Authority::default()
        };
        a.active = a.owner.clone();
        a.posting = a.owner.clone();
        a
    });

    // the bootstrap producer
    state.accounts.insert(|id| {
        let mut a = AccountObject::new(id, config::INIT_MINER_NAME.into(), now);
        a.owner = Authority::single_key(init_key);
        a.active = Authority::single_key(init_key);
        a.posting = Authority::single_key(init_key);
        a.memo_key = init_key;
        a.balance = Asset::new(init_supply, GBC);
        a
    });
    state.witnesses.insert(|id| {
        let mut w = WitnessObject::new(id, config::INIT_MINER_NAME.into(), now);
        w.signing_key = init_key;
        w.schedule = WitnessScheduleKind::Elected;
        w
    });

    // global singletons
    state.globals.insert(|id| {
        let mut dgp = DynamicGlobalPropertyObject::new(id);
        dgp.current_witness = config::INIT_MINER_NAME.into();
        dgp.current_supply = Asset::new(init_supply, GBC);
        dgp.virtual_supply = dgp.current_supply;
        dgp.maximum_block_size = config::SOFT_MAX_BLOCK_SIZE;
        dgp
    });
    state.feed_history.insert(FeedHistoryObject::new);
    state.hardfork_property.insert(|id| HardforkPropertyObject {
        id,
        processed_hardforks: vec![now],
        last_hardfork: 0,
        current_hardfork_version: Default::default(),
        next_hardfork: Default::default(),
        next_hardfork_time: 0,
    });
    state.witness_schedule.insert(|id| {
        let mut s = WitnessScheduleObject::new(id);
        s.current_shuffled_witnesses = vec![config::INIT_MINER_NAME.into()];
        s.num_scheduled_witnesses = 1;
        s.median_props.account_creation_fee = Asset::new(config::MIN_ACCOUNT_CREATION_FEE, GBC);
        s
    });

    // reward funds: root posts and replies draw from separate pools
    state.reward_funds.insert(|id| RewardFundObject {
        id,
        name: config::POST_REWARD_FUND_NAME.to_string(),
        reward_balance: Asset::zero(GBC),
        recent_claims: 0,
        last_update: now,
        content_constant: config::CONTENT_CONSTANT,
        percent_curation_rewards: config::CURATION_REWARD_PERCENT as u16,
        percent_content_rewards: (75 * config::PERCENT_1) as u16,
        author_reward_curve: RewardCurve::Quadratic,
        curation_reward_curve: RewardCurve::BoundedCuration,
    });
    state.reward_funds.insert(|id| RewardFundObject {
        id,
        name: config::COMMENT_REWARD_FUND_NAME.to_string(),
        reward_balance: Asset::zero(GBC),
        recent_claims: 0,
        last_update: now,
        content_constant: config::CONTENT_CONSTANT,
        percent_curation_rewards: config::CURATION_REWARD_PERCENT as u16,
        percent_content_rewards: (25 * config::PERCENT_1) as u16,
        author_reward_curve: RewardCurve::Quadratic,
        curation_reward_curve: RewardCurve::BoundedCuration,
    });

    // the TaPoS ring: one summary slot per low-16-bit block number
    for _ in 0..config::BLOCK_SUMMARY_SLOTS {
        state.block_summaries.insert(|id| BlockSummaryObject {
            id,
            block_id: Default::default(),
        });
    }

    // one-shot migration for chains that begin with a nonzero supply: a
    // fixed share of it starts as vesting stake
    if init_supply > 0 && config::INIT_VESTING_SUPPLY_PERCENT > 0 {
        let to_vest = init_supply * config::INIT_VESTING_SUPPLY_PERCENT as i64
            / config::PERCENT_100 as i64;
        let init_account_id = state
            .accounts
            .find_by_key(&AccountName::from(config::INIT_MINER_NAME))
            .expect("created above")
            .id;
        let share_price = state.dgp().vesting_share_price();
        let vests = gamebank_protocol::asset::asset_times_price(Asset::new(to_vest, GBC), share_price);
        state.accounts.modify(init_account_id, |a| {
            a.balance -= Asset::new(to_vest, GBC);
            a.vesting_shares += vests;
        });
        state.modify_dgp(|dgp| {
            dgp.total_vesting_fund_gbc += Asset::new(to_vest, GBC);
            dgp.total_vesting_shares += vests;
        });
    }

    info!(init_supply, "genesis state initialized");
    Ok(())
}
