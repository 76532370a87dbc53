use gamebank_protocol::asset::{asset_times_price, Asset, GBS};
use gamebank_protocol::config;
use gamebank_protocol::ensure;
use gamebank_protocol::error::ChainError;
use gamebank_protocol::operations::{
    CancelTransferFromSavingsOperation, ClaimRewardBalanceOperation,
    DelegateVestingSharesOperation, SetWithdrawVestingRouteOperation, TransferFromSavingsOperation,
    TransferOperation, TransferToSavingsOperation, TransferToVestingOperation,
    WithdrawVestingOperation,
};
use gamebank_protocol::transaction::effective_account;
use gamebank_protocol::types::TIMESTAMP_MAX;

use crate::database::Database;
use crate::objects::{
    SavingsWithdrawObject, VestingDelegationExpirationObject, VestingDelegationObject,
    WithdrawVestingRouteObject,
};

pub fn transfer(db: &mut Database, o: &TransferOperation) -> Result<(), ChainError> {
    db.state.get_account(&o.to)?;
    db.adjust_balance(&o.from, -o.amount)?;
    db.adjust_balance(&o.to, o.amount)?;
    Ok(())
}

pub fn transfer_to_vesting(db: &mut Database, o: &TransferToVestingOperation) -> Result<(), ChainError> {
    let to = effective_account(&o.to, &o.from).clone();
    db.state.get_account(&to)?;
    db.adjust_balance(&o.from, -o.amount)?;
    db.create_vesting(&to, o.amount, false)?;
    Ok(())
}

pub fn withdraw_vesting(db: &mut Database, o: &WithdrawVestingOperation) -> Result<(), ChainError> {
    let account = db.state.get_account(&o.account)?.clone();

    ensure!(
        account.vesting_shares.amount >= 0,
        ChainError::StatePrecondition,
        "account does not have sufficient vesting for withdrawal"
    );
    ensure!(
        account.vesting_shares - account.delegated_vesting_shares >= o.vesting_shares,
        ChainError::StatePrecondition,
        "account does not have sufficient undelegated vesting for withdrawal"
    );

    if o.vesting_shares.amount == 0 {
        ensure!(
            account.vesting_withdraw_rate.amount != 0,
            ChainError::StatePrecondition,
            "this operation would not change the vesting withdraw rate"
        );
        db.state.accounts.modify(account.id, |a| {
            a.vesting_withdraw_rate = Asset::zero(GBS);
            a.next_vesting_withdrawal = TIMESTAMP_MAX;
            a.to_withdraw = 0;
            a.withdrawn = 0;
        });
        return Ok(());
    }

    let mut rate = Asset::new(
        o.vesting_shares.amount / config::VESTING_WITHDRAW_INTERVALS as i64,
        GBS,
    );
    if rate.amount == 0 {
        rate.amount = 1;
    }
    ensure!(
        account.vesting_withdraw_rate != rate || account.to_withdraw != o.vesting_shares.amount,
        ChainError::StatePrecondition,
        "this operation would not change the vesting withdraw rate"
    );

    let now = db.head_block_time();
    db.state.accounts.modify(account.id, |a| {
        a.vesting_withdraw_rate = rate;
        a.next_vesting_withdrawal = now + config::VESTING_WITHDRAW_INTERVAL_SECONDS;
        a.to_withdraw = o.vesting_shares.amount;
        a.withdrawn = 0;
    });
    Ok(())
}

pub fn set_withdraw_vesting_route(
    db: &mut Database,
    o: &SetWithdrawVestingRouteOperation,
) -> Result<(), ChainError> {
    let from = db.state.get_account(&o.from_account)?.clone();
    db.state.get_account(&o.to_account)?;

    let key = (o.from_account.clone(), o.to_account.clone());
    let existing = db.state.withdraw_routes.find_by_key(&key).cloned();

    match (existing, o.percent) {
        (None, 0) => {
            return Err(ChainError::StatePrecondition(
                "cannot delete a nonexistent withdraw route".into(),
            ))
        }
        (None, _) => {
            ensure!(
                (from.withdraw_routes as usize) < config::MAX_WITHDRAW_ROUTES,
                ChainError::StatePrecondition,
                "account already has the maximum number of withdraw routes"
            );
            let (from_account, to_account) = key;
            db.state.withdraw_routes.insert(|id| WithdrawVestingRouteObject {
                id,
                from_account,
                to_account,
                percent: o.percent,
                auto_vest: o.auto_vest,
            });
            db.state
                .accounts
                .modify(from.id, |a| a.withdraw_routes += 1);
        }
        (Some(route), 0) => {
            db.state.withdraw_routes.remove(route.id);
            db.state
                .accounts
                .modify(from.id, |a| a.withdraw_routes -= 1);
        }
        (Some(route), _) => {
            db.state.withdraw_routes.modify(route.id, |r| {
                r.percent = o.percent;
                r.auto_vest = o.auto_vest;
            });
        }
    }

    let total: u32 = db
        .state
        .withdraw_routes
        .iter()
        .filter(|r| r.from_account == o.from_account)
        .map(|r| r.percent as u32)
        .sum();
    ensure!(
        total <= config::PERCENT_100,
        ChainError::StatePrecondition,
        "the sum of withdraw routes exceeds 100%"
    );
    Ok(())
}

pub fn transfer_to_savings(db: &mut Database, o: &TransferToSavingsOperation) -> Result<(), ChainError> {
    db.state.get_account(&o.to)?;
    db.adjust_balance(&o.from, -o.amount)?;
    db.adjust_savings_balance(&o.to, o.amount)?;
    Ok(())
}

pub fn transfer_from_savings(
    db: &mut Database,
    o: &TransferFromSavingsOperation,
) -> Result<(), ChainError> {
    let from = db.state.get_account(&o.from)?.clone();
    db.state.get_account(&o.to)?;
    ensure!(
        from.savings_withdraw_requests < config::SAVINGS_WITHDRAW_REQUEST_LIMIT,
        ChainError::StatePrecondition,
        "account has too many open savings withdrawals"
    );
    ensure!(
        db.state
            .savings_withdraws
            .find_by_key(&(o.from.clone(), o.request_id))
            .is_none(),
        ChainError::StatePrecondition,
        "a savings withdrawal with this request id already exists"
    );

    db.adjust_savings_balance(&o.from, -o.amount)?;
    let now = db.head_block_time();
    let (from_name, to_name, memo) = (o.from.clone(), o.to.clone(), o.memo.clone());
    let (amount, request_id) = (o.amount, o.request_id);
    db.state.savings_withdraws.insert(|id| SavingsWithdrawObject {
        id,
        from: from_name,
        to: to_name,
        memo,
        request_id,
        amount,
        complete: now + config::SAVINGS_WITHDRAW_TIME,
    });
    db.state
        .accounts
        .modify(from.id, |a| a.savings_withdraw_requests += 1);
    Ok(())
}

pub fn cancel_transfer_from_savings(
    db: &mut Database,
    o: &CancelTransferFromSavingsOperation,
) -> Result<(), ChainError> {
    let withdraw = db
        .state
        .savings_withdraws
        .find_by_key(&(o.from.clone(), o.request_id))
        .cloned()
        .ok_or_else(|| {
            ChainError::StatePrecondition("no savings withdrawal with this request id".into())
        })?;
    db.adjust_savings_balance(&withdraw.from, withdraw.amount)?;
    let from_id = db.state.get_account(&withdraw.from)?.id;
    db.state
        .accounts
        .modify(from_id, |a| a.savings_withdraw_requests -= 1);
    db.state.savings_withdraws.remove(withdraw.id);
    Ok(())
}

pub fn claim_reward_balance(
    db: &mut Database,
    o: &ClaimRewardBalanceOperation,
) -> Result<(), ChainError> {
    let account = db.state.get_account(&o.account)?.clone();
    ensure!(
        o.reward_gbc <= account.reward_gbc_balance,
        ChainError::StatePrecondition,
        "cannot claim more GBC than the pending reward balance"
    );
    ensure!(
        o.reward_gbd <= account.reward_gbd_balance,
        ChainError::StatePrecondition,
        "cannot claim more GBD than the pending reward balance"
    );
    ensure!(
        o.reward_vests <= account.reward_vesting_balance,
        ChainError::StatePrecondition,
        "cannot claim more vesting than the pending reward balance"
    );

    // the liquid backing moves in proportion to the claimed shares
    let reward_vesting_gbc_to_move = if o.reward_vests == account.reward_vesting_balance {
        account.reward_vesting_gbc
    } else {
        Asset::new(
            (o.reward_vests.amount as i128 * account.reward_vesting_gbc.amount as i128
                / account.reward_vesting_balance.amount.max(1) as i128) as i64,
            gamebank_protocol::asset::GBC,
        )
    };

    db.state.accounts.modify(account.id, |a| {
        a.reward_gbc_balance -= o.reward_gbc;
        a.balance += o.reward_gbc;
        a.reward_gbd_balance -= o.reward_gbd;
        a.gbd_balance += o.reward_gbd;
        a.reward_vesting_balance -= o.reward_vests;
        a.vesting_shares += o.reward_vests;
        a.reward_vesting_gbc -= reward_vesting_gbc_to_move;
    });
    db.state.modify_dgp(|dgp| {
        dgp.pending_rewarded_vesting_shares -= o.reward_vests;
        dgp.pending_rewarded_vesting_gbc -= reward_vesting_gbc_to_move;
        dgp.total_vesting_shares += o.reward_vests;
        dgp.total_vesting_fund_gbc += reward_vesting_gbc_to_move;
    });

    let account = db.state.get_account(&o.account)?.clone();
    db.adjust_proxied_witness_votes(&account, o.reward_vests.amount)?;
    Ok(())
}

pub fn delegate_vesting_shares(
    db: &mut Database,
    o: &DelegateVestingSharesOperation,
) -> Result<(), ChainError> {
    let delegator = db.state.get_account(&o.delegator)?.clone();
    let delegatee = db.state.get_account(&o.delegatee)?.clone();
    let now = db.head_block_time();

    let available = delegator.vesting_shares
        - delegator.delegated_vesting_shares
        - Asset::new(delegator.to_withdraw - delegator.withdrawn, GBS);

    let share_price = db.state.dgp().vesting_share_price();
    let median_fee = db.state.schedule().median_props.account_creation_fee;
    let fee_vests = asset_times_price(median_fee, share_price);
    let min_delegation = Asset::new(fee_vests.amount / 3, GBS);
    let min_update = Asset::new(fee_vests.amount / 30, GBS);

    let existing = db
        .state
        .vesting_delegations
        .find_by_key(&(o.delegator.clone(), o.delegatee.clone()))
        .cloned();

    match existing {
        None => {
            ensure!(
                o.vesting_shares.amount > 0,
                ChainError::StatePrecondition,
                "cannot delegate zero vesting shares"
            );
            ensure!(
                o.vesting_shares >= min_delegation,
                ChainError::StatePrecondition,
                "delegation is below the minimum"
            );
            ensure!(
                available >= o.vesting_shares,
                ChainError::StatePrecondition,
                "account does not have enough undelegated vesting"
            );
            let (delegator_name, delegatee_name) = (o.delegator.clone(), o.delegatee.clone());
            let shares = o.vesting_shares;
            db.state.vesting_delegations.insert(|id| VestingDelegationObject {
                id,
                delegator: delegator_name,
                delegatee: delegatee_name,
                vesting_shares: shares,
                min_delegation_time: now,
            });
            db.state
                .accounts
                .modify(delegator.id, |a| a.delegated_vesting_shares += shares);
            db.state
                .accounts
                .modify(delegatee.id, |a| a.received_vesting_shares += shares);
        }
        Some(delegation) if o.vesting_shares > delegation.vesting_shares => {
            let delta = o.vesting_shares - delegation.vesting_shares;
            ensure!(
                delta >= min_update,
                ChainError::StatePrecondition,
                "delegation increase is below the minimum update step"
            );
            ensure!(
                available >= delta,
                ChainError::StatePrecondition,
                "account does not have enough undelegated vesting"
            );
            db.state
                .vesting_delegations
                .modify(delegation.id, |d| d.vesting_shares = o.vesting_shares);
            db.state
                .accounts
                .modify(delegator.id, |a| a.delegated_vesting_shares += delta);
            db.state
                .accounts
                .modify(delegatee.id, |a| a.received_vesting_shares += delta);
        }
        Some(delegation) => {
            let delta = delegation.vesting_shares - o.vesting_shares;
            ensure!(
                delta.amount > 0,
                ChainError::StatePrecondition,
                "delegation is unchanged"
            );
            ensure!(
                o.vesting_shares.amount == 0 || o.vesting_shares >= min_delegation,
                ChainError::StatePrecondition,
                "a nonzero delegation must stay above the minimum"
            );
            ensure!(
                o.vesting_shares.amount == 0 || delta >= min_update,
                ChainError::StatePrecondition,
                "delegation decrease is below the minimum update step"
            );
            ensure!(
                now >= delegation.min_delegation_time,
                ChainError::StatePrecondition,
                "the delegation cannot be reduced yet"
            );

            // the withdrawn stake returns to the delegator after a delay
            let delegator_name = o.delegator.clone();
            let return_period = if db.has_hardfork(crate::database::process::HARDFORK_0_1) {
                config::DELEGATION_RETURN_PERIOD_HF1
            } else {
                config::DELEGATION_RETURN_PERIOD
            };
            db.state
                .delegation_expirations
                .insert(|id| VestingDelegationExpirationObject {
                    id,
                    delegator: delegator_name,
                    vesting_shares: delta,
                    expiration: now + return_period,
                });
            db.state
                .accounts
                .modify(delegatee.id, |a| a.received_vesting_shares -= delta);

            if o.vesting_shares.amount == 0 {
                db.state.vesting_delegations.remove(delegation.id);
            } else {
                db.state
                    .vesting_delegations
                    .modify(delegation.id, |d| d.vesting_shares = o.vesting_shares);
            }
        }
    }
    Ok(())
}
