use gamebank_protocol::config;
use gamebank_protocol::ensure;
use gamebank_protocol::error::ChainError;
use gamebank_protocol::operations::{
    ChangeRecoveryAccountOperation, DeclineVotingRightsOperation, RecoverAccountOperation,
    RequestAccountRecoveryOperation,
};

use crate::database::Database;
use crate::objects::{
    AccountRecoveryRequestObject, ChangeRecoveryAccountRequestObject,
    DeclineVotingRightsRequestObject,
};

pub fn request_account_recovery(
    db: &mut Database,
    o: &RequestAccountRecoveryOperation,
) -> Result<(), ChainError> {
    let account = db.state.get_account(&o.account_to_recover)?.clone();
    ensure!(
        account.recovery_account == o.recovery_account,
        ChainError::StatePrecondition,
        "only {}'s recovery partner may request recovery",
        account.name
    );
    for key in o.new_owner_authority.account_auths.keys() {
        db.state.get_account(key)?;
    }
    ensure!(
        !o.new_owner_authority.is_impossible(),
        ChainError::StatePrecondition,
        "the proposed owner authority cannot be satisfied"
    );

    let now = db.head_block_time();
    let existing = db
        .state
        .account_recovery_requests
        .find_by_key(&o.account_to_recover)
        .cloned();

    match existing {
        Some(request) => {
            if o.new_owner_authority.num_auths() == 0 {
                // an empty authority withdraws the request
                db.state.account_recovery_requests.remove(request.id);
            } else {
                db.state.account_recovery_requests.modify(request.id, |r| {
                    r.new_owner_authority = o.new_owner_authority.clone();
                    r.expires = now + config::ACCOUNT_RECOVERY_REQUEST_EXPIRATION_PERIOD;
                });
            }
        }
        None => {
            ensure!(
                o.new_owner_authority.num_auths() > 0,
                ChainError::StatePrecondition,
                "cannot withdraw a nonexistent recovery request"
            );
            let account_to_recover = o.account_to_recover.clone();
            let authority = o.new_owner_authority.clone();
            db.state
                .account_recovery_requests
                .insert(|id| AccountRecoveryRequestObject {
                    id,
                    account_to_recover,
                    new_owner_authority: authority,
                    expires: now + config::ACCOUNT_RECOVERY_REQUEST_EXPIRATION_PERIOD,
                });
        }
    }
    Ok(())
}

pub fn recover_account(db: &mut Database, o: &RecoverAccountOperation) -> Result<(), ChainError> {
    let account = db.state.get_account(&o.account_to_recover)?.clone();
    let now = db.head_block_time();

    ensure!(
        now - account.last_account_recovery > config::OWNER_UPDATE_LIMIT,
        ChainError::StatePrecondition,
        "an account may only be recovered once per hour"
    );

    let request = db
        .state
        .account_recovery_requests
        .find_by_key(&o.account_to_recover)
        .cloned()
        .ok_or_else(|| {
            ChainError::StatePrecondition("no active recovery request for this account".into())
        })?;
    ensure!(
        request.new_owner_authority == o.new_owner_authority,
        ChainError::StatePrecondition,
        "the new owner authority does not match the pending request"
    );

    // the cosigned recent authority must genuinely be a recent owner
    let recent_is_valid = account.owner == o.recent_owner_authority
        || db.state.owner_auth_history.iter().any(|h| {
            h.account == o.account_to_recover
                && h.previous_owner_authority == o.recent_owner_authority
                && h.last_valid_time + config::OWNER_AUTH_RECOVERY_PERIOD > now
        });
    ensure!(
        recent_is_valid,
        ChainError::StatePrecondition,
        "the recent owner authority is not a recent owner of this account"
    );

    db.update_owner_authority(&account, o.new_owner_authority.clone())?;
    db.state
        .accounts
        .modify(account.id, |a| a.last_account_recovery = now);
    db.state.account_recovery_requests.remove(request.id);
    Ok(())
}

pub fn change_recovery_account(
    db: &mut Database,
    o: &ChangeRecoveryAccountOperation,
) -> Result<(), ChainError> {
    db.state.get_account(&o.new_recovery_account)?;
    let account = db.state.get_account(&o.account_to_recover)?.clone();
    let now = db.head_block_time();

    let existing = db
        .state
        .change_recovery_requests
        .find_by_key(&o.account_to_recover)
        .cloned();

    match existing {
        Some(request) => {
            if account.recovery_account == o.new_recovery_account {
                // changing back to the current partner cancels the request
                db.state.change_recovery_requests.remove(request.id);
            } else {
                db.state.change_recovery_requests.modify(request.id, |r| {
                    r.recovery_account = o.new_recovery_account.clone();
                    r.effective_on = now + config::OWNER_AUTH_RECOVERY_PERIOD;
                });
            }
        }
        None => {
            ensure!(
                account.recovery_account != o.new_recovery_account,
                ChainError::StatePrecondition,
                "this is already the account's recovery partner"
            );
            let account_to_recover = o.account_to_recover.clone();
            let recovery_account = o.new_recovery_account.clone();
            db.state
                .change_recovery_requests
                .insert(|id| ChangeRecoveryAccountRequestObject {
                    id,
                    account_to_recover,
                    recovery_account,
                    effective_on: now + config::OWNER_AUTH_RECOVERY_PERIOD,
                });
        }
    }
    Ok(())
}

pub fn decline_voting_rights(
    db: &mut Database,
    o: &DeclineVotingRightsOperation,
) -> Result<(), ChainError> {
    let account = db.state.get_account(&o.account)?.clone();
    let existing = db
        .state
        .decline_voting_requests
        .find_by_key(&o.account)
        .cloned();
    let now = db.head_block_time();

    if o.decline {
        ensure!(account.can_vote, ChainError::StatePrecondition, "voting rights are already declined");
        ensure!(
            existing.is_none(),
            ChainError::StatePrecondition,
            "a decline request is already pending"
        );
        let name = o.account.clone();
        db.state
            .decline_voting_requests
            .insert(|id| DeclineVotingRightsRequestObject {
                id,
                account: name,
                effective_date: now + config::OWNER_AUTH_RECOVERY_PERIOD,
            });
    } else {
        let request = existing.ok_or_else(|| {
            ChainError::StatePrecondition("no pending decline request to withdraw".into())
        })?;
        db.state.decline_voting_requests.remove(request.id);
    }
    Ok(())
}
