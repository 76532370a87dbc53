use gamebank_contract::StepBudget;
use gamebank_protocol::ensure;
use gamebank_protocol::error::ChainError;
use gamebank_protocol::operations::{ContractCallOperation, ContractDeployOperation};
use gamebank_protocol::types::Digest;

use crate::database::Database;
use crate::host::ContractHost;
use crate::objects::ContractObject;

pub fn contract_deploy(db: &mut Database, o: &ContractDeployOperation) -> Result<(), ChainError> {
    db.state.get_account(&o.creator)?;
    ensure!(
        db.state.contracts.find_by_key(&o.name).is_none(),
        ChainError::StatePrecondition,
        "a contract named {} already exists",
        o.name
    );
    let now = db.head_block_time();

    let op = o.clone();
    db.state.contracts.insert(|id| {
        let mut c = ContractObject::new(id, op.name, op.creator, now);
        c.version = Digest::hash(op.code.as_bytes());
        c.code = op.code;
        c.abi = op.abi;
        c
    });

    // run the script's top level once; a failing initializer fails the deploy
    let engine = db
        .script_engine
        .take()
        .ok_or_else(|| ChainError::Contract("no script engine configured".into()))?;
    let mut host = ContractHost::new(db, o.name.clone(), o.creator.clone(), o.creator.clone());
    let mut budget = StepBudget::default();
    let result = engine.deploy(&o.code, &mut host, &mut budget);
    let persisted = match result {
        Ok(()) => host.persist().map(Some),
        Err(e) => Err(e),
    };
    db.script_engine = Some(engine);
    let events = persisted?;
    if let Some(events) = events {
        db.record_contract_events(events);
    }
    Ok(())
}

pub fn contract_call(db: &mut Database, o: &ContractCallOperation) -> Result<(), ChainError> {
    db.state.get_account(&o.caller)?;
    let contract = db
        .state
        .contracts
        .find_by_key(&o.contract_name)
        .cloned()
        .ok_or_else(|| {
            ChainError::StatePrecondition(format!("unknown contract: {}", o.contract_name))
        })?;

    let args: Vec<serde_json::Value> = serde_json::from_str(&o.args)
        .map_err(|e| ChainError::Contract(format!("arguments are not a JSON array: {e}")))?;

    let engine = db
        .script_engine
        .take()
        .ok_or_else(|| ChainError::Contract("no script engine configured".into()))?;
    let mut host = ContractHost::new(
        db,
        contract.name.clone(),
        o.caller.clone(),
        contract.creator.clone(),
    );
    let mut budget = StepBudget::default();
    let result = engine.call(&contract.code, &o.method, &args, &mut host, &mut budget);
    let persisted = match result {
        Ok(()) => host.persist().map(Some),
        Err(e) => Err(e),
    };
    db.script_engine = Some(engine);
    let events = persisted?;
    if let Some(events) = events {
        db.record_contract_events(events);
    }

    let now = db.head_block_time();
    db.state
        .contracts
        .modify(contract.id, |c| c.last_update = now);
    Ok(())
}
