use gamebank_protocol::asset::{asset_times_price, Asset, GBC};
use gamebank_protocol::authority::Authority;
use gamebank_protocol::config;
use gamebank_protocol::ensure;
use gamebank_protocol::error::ChainError;
use gamebank_protocol::operations::{
    AccountCreateOperation, AccountCreateWithDelegationOperation, AccountUpdateOperation,
    ClaimAccountOperation, CreateClaimedAccountOperation,
};
use gamebank_protocol::types::{AccountName, PublicKey, Timestamp};

use crate::database::{process::HARDFORK_0_1, Database};
use crate::objects::{AccountObject, VestingDelegationObject};

fn check_authority_accounts_exist(db: &Database, auth: &Authority) -> Result<(), ChainError> {
    for name in auth.account_auths.keys() {
        ensure!(
            db.state.accounts.contains_key(name),
            ChainError::StatePrecondition,
            "authority references the unknown account {name}"
        );
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn build_account(
    db: &mut Database,
    name: &AccountName,
    creator: &AccountName,
    owner: &Authority,
    active: &Authority,
    posting: &Authority,
    memo_key: PublicKey,
    json_metadata: &str,
    now: Timestamp,
) -> Result<(), ChainError> {
    ensure!(
        !db.state.accounts.contains_key(name),
        ChainError::StatePrecondition,
        "account {name} already exists"
    );
    for auth in [owner, active, posting] {
        check_authority_accounts_exist(db, auth)?;
    }
    let name = name.clone();
    let creator = creator.clone();
    let (owner, active, posting) = (owner.clone(), active.clone(), posting.clone());
    let json_metadata = json_metadata.to_string();
    db.state.accounts.insert(|id| {
        let mut a = AccountObject::new(id, name, now);
        a.owner = owner;
        a.active = active;
        a.posting = posting;
        a.memo_key = memo_key;
        a.json_metadata = json_metadata;
        a.recovery_account = creator;
        a
    });
    Ok(())
}

pub fn account_create(db: &mut Database, o: &AccountCreateOperation) -> Result<(), ChainError> {
    let now = db.head_block_time();
    db.state.get_account(&o.creator)?;

    let median_fee = db.state.schedule().median_props.account_creation_fee;
    let required = Asset::new(
        median_fee.amount * config::CREATE_ACCOUNT_WITH_GBC_MODIFIER,
        GBC,
    );
    ensure!(
        o.fee >= required,
        ChainError::StatePrecondition,
        "insufficient fee: account creation requires {required}"
    );

    db.adjust_balance(&o.creator, -o.fee)?;
    build_account(
        db,
        &o.new_account_name,
        &o.creator,
        &o.owner,
        &o.active,
        &o.posting,
        o.memo_key,
        &o.json_metadata,
        now,
    )?;

    // the burned fee becomes the new account's initial stake
    if o.fee.amount > 0 {
        db.create_vesting(&o.new_account_name, o.fee, false)?;
    }
    Ok(())
}

pub fn account_create_with_delegation(
    db: &mut Database,
    o: &AccountCreateWithDelegationOperation,
) -> Result<(), ChainError> {
    let now = db.head_block_time();
    let creator = db.state.get_account(&o.creator)?.clone();

    ensure!(
        creator.balance >= o.fee,
        ChainError::StatePrecondition,
        "insufficient balance to pay the creation fee"
    );
    let available = creator.vesting_shares - creator.delegated_vesting_shares;
    ensure!(
        available >= o.delegation,
        ChainError::StatePrecondition,
        "insufficient vesting shares to delegate"
    );

    let share_price = db.state.dgp().vesting_share_price();
    let median_fee = db.state.schedule().median_props.account_creation_fee;
    let target_fee = Asset::new(
        median_fee.amount * config::CREATE_ACCOUNT_WITH_GBC_MODIFIER,
        GBC,
    );
    let target_delegation = asset_times_price(
        Asset::new(
            target_fee.amount * config::CREATE_ACCOUNT_DELEGATION_RATIO,
            GBC,
        ),
        share_price,
    );
    let current_delegation = asset_times_price(
        Asset::new(o.fee.amount * config::CREATE_ACCOUNT_DELEGATION_RATIO, GBC),
        share_price,
    ) + o.delegation;
    ensure!(
        current_delegation >= target_delegation,
        ChainError::StatePrecondition,
        "insufficient fee plus delegation for account creation"
    );
    ensure!(
        o.fee >= median_fee,
        ChainError::StatePrecondition,
        "the liquid fee may not be below the median creation fee"
    );

    db.adjust_balance(&o.creator, -o.fee)?;
    build_account(
        db,
        &o.new_account_name,
        &o.creator,
        &o.owner,
        &o.active,
        &o.posting,
        o.memo_key,
        &o.json_metadata,
        now,
    )?;

    if o.delegation.amount > 0 {
        let creator_id = creator.id;
        let new_account_id = db.state.get_account(&o.new_account_name)?.id;
        db.state
            .accounts
            .modify(creator_id, |a| a.delegated_vesting_shares += o.delegation);
        db.state
            .accounts
            .modify(new_account_id, |a| a.received_vesting_shares += o.delegation);
        let (delegator, delegatee) = (o.creator.clone(), o.new_account_name.clone());
        let shares = o.delegation;
        db.state.vesting_delegations.insert(|id| VestingDelegationObject {
            id,
            delegator,
            delegatee,
            vesting_shares: shares,
            min_delegation_time: now + config::CREATE_ACCOUNT_DELEGATION_TIME,
        });
    }

    if o.fee.amount > 0 {
        db.create_vesting(&o.new_account_name, o.fee, false)?;
    }
    Ok(())
}

pub fn account_update(db: &mut Database, o: &AccountUpdateOperation) -> Result<(), ChainError> {
    let account = db.state.get_account(&o.account)?.clone();
    let now = db.head_block_time();

    if let Some(owner) = &o.owner {
        ensure!(
            now > account.last_owner_update + config::OWNER_UPDATE_LIMIT,
            ChainError::StatePrecondition,
            "the owner authority can only be updated once per hour"
        );
        check_authority_accounts_exist(db, owner)?;
        db.update_owner_authority(&account, owner.clone())?;
    }
    if let Some(active) = &o.active {
        check_authority_accounts_exist(db, active)?;
    }
    if let Some(posting) = &o.posting {
        check_authority_accounts_exist(db, posting)?;
    }

    db.state.accounts.modify(account.id, |a| {
        if let Some(active) = &o.active {
            a.active = active.clone();
        }
        if let Some(posting) = &o.posting {
            a.posting = posting.clone();
        }
        a.memo_key = o.memo_key;
        a.json_metadata = o.json_metadata.clone();
        a.last_account_update = now;
    });
    Ok(())
}

pub fn claim_account(db: &mut Database, o: &ClaimAccountOperation) -> Result<(), ChainError> {
    ensure!(
        db.has_hardfork(HARDFORK_0_1),
        ChainError::StatePrecondition,
        "claimed accounts are not yet enabled"
    );
    let creator = db.state.get_account(&o.creator)?.clone();
    let median_fee = db.state.schedule().median_props.account_creation_fee;
    ensure!(
        o.fee >= median_fee,
        ChainError::StatePrecondition,
        "insufficient fee to claim an account"
    );

    // the claim fee is burned
    db.adjust_balance(&o.creator, -o.fee)?;
    let null_name = AccountName::from(config::NULL_ACCOUNT);
    db.adjust_balance(&null_name, o.fee)?;

    db.state
        .accounts
        .modify(creator.id, |a| a.pending_claimed_accounts += 1);
    Ok(())
}

pub fn create_claimed_account(
    db: &mut Database,
    o: &CreateClaimedAccountOperation,
) -> Result<(), ChainError> {
    ensure!(
        db.has_hardfork(HARDFORK_0_1),
        ChainError::StatePrecondition,
        "claimed accounts are not yet enabled"
    );
    let creator = db.state.get_account(&o.creator)?.clone();
    ensure!(
        creator.pending_claimed_accounts > 0,
        ChainError::StatePrecondition,
        "account {creator} has no claimed account credits",
        creator = o.creator
    );
    let now = db.head_block_time();

    db.state
        .accounts
        .modify(creator.id, |a| a.pending_claimed_accounts -= 1);
    build_account(
        db,
        &o.new_account_name,
        &o.creator,
        &o.owner,
        &o.active,
        &o.posting,
        o.memo_key,
        &o.json_metadata,
        now,
    )
}
