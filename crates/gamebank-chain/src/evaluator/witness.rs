use gamebank_protocol::config;
use gamebank_protocol::ensure;
use gamebank_protocol::error::ChainError;
use gamebank_protocol::operations::{
    AccountWitnessProxyOperation, AccountWitnessVoteOperation, Pow2Operation, PowOperation,
    ReportOverProductionOperation, WitnessSetPropertiesOperation, WitnessUpdateOperation,
};
use gamebank_protocol::types::AccountName;

use crate::database::Database;
use crate::objects::{WitnessObject, WitnessVoteObject};

pub fn witness_update(db: &mut Database, o: &WitnessUpdateOperation) -> Result<(), ChainError> {
    db.state.get_account(&o.owner)?;
    let now = db.head_block_time();

    match db.state.witnesses.find_by_key(&o.owner).map(|w| w.id) {
        Some(id) => {
            db.state.witnesses.modify(id, |w| {
                w.url = o.url.clone();
                w.signing_key = o.block_signing_key;
                w.props = o.props.clone();
            });
        }
        None => {
            let owner = o.owner.clone();
            db.state.witnesses.insert(|id| {
                let mut w = WitnessObject::new(id, owner, now);
                w.url = o.url.clone();
                w.signing_key = o.block_signing_key;
                w.props = o.props.clone();
                w
            });
        }
    }
    Ok(())
}

pub fn witness_set_properties(
    db: &mut Database,
    o: &WitnessSetPropertiesOperation,
) -> Result<(), ChainError> {
    let witness = db.state.get_witness(&o.owner)?.clone();
    ensure!(
        witness.signing_key == o.current_signing_key,
        ChainError::StatePrecondition,
        "current signing key does not match the witness's declared key"
    );
    db.state.witnesses.modify(witness.id, |w| {
        w.props = o.props.clone();
        if let Some(key) = o.new_signing_key {
            w.signing_key = key;
        }
        if let Some(url) = &o.url {
            w.url = url.clone();
        }
    });
    Ok(())
}

pub fn account_witness_vote(
    db: &mut Database,
    o: &AccountWitnessVoteOperation,
) -> Result<(), ChainError> {
    let voter = db.state.get_account(&o.account)?.clone();
    ensure!(
        !voter.has_proxy(),
        ChainError::StatePrecondition,
        "a proxy is set; witness votes flow through the proxy"
    );
    ensure!(voter.can_vote, ChainError::StatePrecondition, "account has declined its voting rights");
    db.state.get_witness(&o.witness)?;

    let existing = db
        .state
        .witness_votes
        .find_by_key(&(o.witness.clone(), o.account.clone()))
        .cloned();

    if o.approve {
        ensure!(
            existing.is_none(),
            ChainError::StatePrecondition,
            "this witness is already approved"
        );
        ensure!(
            (voter.witnesses_voted_for as u32) < config::MAX_ACCOUNT_WITNESS_VOTES,
            ChainError::StatePrecondition,
            "account has voted for the maximum number of witnesses"
        );
        let (witness, account) = (o.witness.clone(), o.account.clone());
        db.state.witness_votes.insert(|id| WitnessVoteObject { id, witness, account });
        db.state
            .accounts
            .modify(voter.id, |a| a.witnesses_voted_for += 1);
        db.adjust_witness_vote(&o.witness, voter.witness_vote_weight())?;
    } else {
        let vote = existing.ok_or_else(|| {
            ChainError::StatePrecondition("this witness was not approved".into())
        })?;
        db.adjust_witness_vote(&o.witness, -voter.witness_vote_weight())?;
        db.state.witness_votes.remove(vote.id);
        db.state
            .accounts
            .modify(voter.id, |a| a.witnesses_voted_for -= 1);
    }
    Ok(())
}

pub fn account_witness_proxy(
    db: &mut Database,
    o: &AccountWitnessProxyOperation,
) -> Result<(), ChainError> {
    let account = db.state.get_account(&o.account)?.clone();
    ensure!(
        account.proxy != o.proxy,
        ChainError::StatePrecondition,
        "the proxy is already set to this value"
    );
    ensure!(account.can_vote, ChainError::StatePrecondition, "account has declined its voting rights");

    // retract the account's current influence wherever it points
    let mut deltas = [0i64; config::MAX_PROXY_RECURSION_DEPTH as usize + 1];
    deltas[0] = -account.vesting_shares.amount;
    for (i, v) in account.proxied_vsf_votes.iter().enumerate() {
        deltas[i + 1] = -v;
    }
    db.adjust_proxied_witness_votes_array(&account, &deltas, 0)?;

    if o.proxy.is_empty() {
        db.state
            .accounts
            .modify(account.id, |a| a.proxy = AccountName::default());
    } else {
        db.state.get_account(&o.proxy)?;

        // no cycles: walking the new chain must never return here
        let mut cursor = o.proxy.clone();
        for _ in 0..config::MAX_PROXY_RECURSION_DEPTH {
            ensure!(
                cursor != o.account,
                ChainError::StatePrecondition,
                "setting this proxy would create a cycle"
            );
            let next = db.state.get_account(&cursor)?.proxy.clone();
            if next.is_empty() {
                break;
            }
            cursor = next;
        }
        ensure!(
            cursor != o.account,
            ChainError::StatePrecondition,
            "setting this proxy would create a cycle"
        );

        let proxy = o.proxy.clone();
        db.state.accounts.modify(account.id, |a| a.proxy = proxy);
    }

    // push the influence down the new chain
    let account = db.state.get_account(&o.account)?.clone();
    for d in deltas.iter_mut() {
        *d = -*d;
    }
    db.adjust_proxied_witness_votes_array(&account, &deltas, 0)?;
    Ok(())
}

pub fn pow(db: &mut Database, o: &PowOperation) -> Result<(), ChainError> {
    let _ = (db, o);
    Err(ChainError::StatePrecondition(
        "proof-of-work submissions are no longer accepted".into(),
    ))
}

pub fn pow2(db: &mut Database, o: &Pow2Operation) -> Result<(), ChainError> {
    let _ = (db, o);
    Err(ChainError::StatePrecondition(
        "proof-of-work submissions are no longer accepted".into(),
    ))
}

pub fn report_over_production(
    db: &mut Database,
    o: &ReportOverProductionOperation,
) -> Result<(), ChainError> {
    let _ = (db, o);
    Err(ChainError::StatePrecondition(
        "over-production reports are retired".into(),
    ))
}
