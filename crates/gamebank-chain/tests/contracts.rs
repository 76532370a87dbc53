mod common;

use common::TestChain;
use gamebank_contract::{ContractEvent, HostApi, ScriptEngine, StepBudget};
use gamebank_protocol::asset::{Asset, GBC};
use gamebank_protocol::error::ChainError;
use gamebank_protocol::operations::{ContractCallOperation, ContractDeployOperation, Operation};
use serde_json::{json, Value};

/// A minimal deterministic engine for exercising the host surface: the
/// "code" is ignored and methods are built in.
struct CounterEngine;

impl ScriptEngine for CounterEngine {
    fn deploy(
        &self,
        _code: &str,
        host: &mut dyn HostApi,
        budget: &mut StepBudget,
    ) -> Result<(), ChainError> {
        budget.consume(10)?;
        let name = host.contract_name().clone();
        host.set_user_data(&name, json!({ "deploys": 1 }))
    }

    fn call(
        &self,
        _code: &str,
        method: &str,
        args: &[Value],
        host: &mut dyn HostApi,
        budget: &mut StepBudget,
    ) -> Result<(), ChainError> {
        budget.consume(10)?;
        match method {
            "increment" => {
                let caller = host.caller().clone();
                let mut data = host.get_user_data(&caller)?;
                let count = data.get("count").and_then(Value::as_i64).unwrap_or(0);
                data["count"] = json!(count + 1);
                host.set_user_data(&caller, data)?;
                host.emit("incremented", json!({ "by": caller.as_str() }))
            }
            "deposit" => {
                let amount = args
                    .first()
                    .and_then(Value::as_i64)
                    .ok_or_else(|| ChainError::Contract("deposit takes an amount".into()))?;
                let caller = host.caller().clone();
                let contract = host.contract_name().clone();
                host.transfer(&caller, &contract, Asset::new(amount, GBC))
            }
            "payout" => {
                let amount = args
                    .first()
                    .and_then(Value::as_i64)
                    .ok_or_else(|| ChainError::Contract("payout takes an amount".into()))?;
                let caller = host.caller().clone();
                let contract = host.contract_name().clone();
                host.transfer(&contract, &caller, Asset::new(amount, GBC))
            }
            "prove_chain" => {
                let head = host.head_block_num();
                let hash = host.get_block_hash(head, 2.min(head), 1)?;
                host.emit("proof", json!({ "hash": hash }))
            }
            "fail" => Err(ChainError::Contract("scripted failure".into())),
            _ => Err(ChainError::Contract(format!("unknown method {method}"))),
        }
    }
}

fn deploy(chain: &mut TestChain, name: &str) {
    chain.db.set_script_engine(Box::new(CounterEngine));
    chain
        .push_ops(
            vec![Operation::ContractDeploy(ContractDeployOperation {
                creator: "alice".into(),
                name: name.into(),
                code: "counter-v1".into(),
                abi: "{}".into(),
            })],
            &["alice"],
        )
        .unwrap();
    chain.produce_block();
}

fn call(chain: &mut TestChain, caller: &str, contract: &str, method: &str, args: Value) -> Result<(), ChainError> {
    chain.push_ops(
        vec![Operation::ContractCall(ContractCallOperation {
            caller: caller.into(),
            contract_name: contract.into(),
            method: method.into(),
            args: args.to_string(),
        })],
        &[caller],
    )
}

#[test]
fn deploy_runs_the_initializer_and_persists_state() {
    let mut chain = TestChain::new("deploy");
    chain.create_account("alice");
    deploy(&mut chain, "counter");

    let contract = chain
        .db
        .state
        .contracts
        .find_by_key(&"counter".into())
        .unwrap();
    assert_eq!(contract.creator, "alice".into());
    assert!(!contract.version.0.iter().all(|b| *b == 0));

    // the initializer wrote the contract's own state table
    let state = chain
        .db
        .state
        .contract_users
        .find_by_key(&("counter".into(), "counter".into()))
        .unwrap();
    assert!(state.data.contains("deploys"));
}

#[test]
fn calls_mutate_per_user_state_and_emit_events() {
    let mut chain = TestChain::new("calls");
    chain.create_account("alice");
    chain.create_account("bob");
    deploy(&mut chain, "counter");

    call(&mut chain, "bob", "counter", "increment", json!([1])).unwrap();
    chain.produce_block();
    call(&mut chain, "bob", "counter", "increment", json!([1])).unwrap();
    chain.produce_block();

    let bob_state = chain
        .db
        .state
        .contract_users
        .find_by_key(&("counter".into(), "bob".into()))
        .unwrap();
    let data: Value = serde_json::from_str(&bob_state.data).unwrap();
    assert_eq!(data["count"], json!(2));

    assert!(chain
        .db
        .last_block_contract_events()
        .iter()
        .any(|e| matches!(e, ContractEvent::Emit { key, .. } if key == "incremented")));
}

#[test]
fn contract_funds_move_through_the_host() {
    let mut chain = TestChain::new("funds");
    chain.create_account("alice");
    chain.create_account("bob");
    chain.fund("bob", Asset::new(10_000, GBC));
    deploy(&mut chain, "bank");

    call(&mut chain, "bob", "bank", "deposit", json!([4_000])).unwrap();
    chain.produce_block();
    assert_eq!(chain.balance("bob", GBC).amount, 6_000);
    let contract = chain.db.state.contracts.find_by_key(&"bank".into()).unwrap();
    assert_eq!(contract.balance.amount, 4_000);

    call(&mut chain, "bob", "bank", "payout", json!([1_500])).unwrap();
    chain.produce_block();
    assert_eq!(chain.balance("bob", GBC).amount, 7_500);
    let contract = chain.db.state.contracts.find_by_key(&"bank".into()).unwrap();
    assert_eq!(contract.balance.amount, 2_500);

    // overdrawing the contract fails and rolls back
    let err = call(&mut chain, "bob", "bank", "payout", json!([99_999])).unwrap_err();
    assert!(matches!(err, ChainError::Contract(_)));
    assert_eq!(chain.balance("bob", GBC).amount, 7_500);
    chain.db.validate_invariants().unwrap();
}

#[test]
fn failed_calls_leave_no_trace() {
    let mut chain = TestChain::new("rollback");
    chain.create_account("alice");
    chain.create_account("bob");
    deploy(&mut chain, "counter");

    let err = call(&mut chain, "bob", "counter", "fail", json!([1])).unwrap_err();
    assert!(matches!(err, ChainError::Contract(_)));
    assert!(chain
        .db
        .state
        .contract_users
        .find_by_key(&("counter".into(), "bob".into()))
        .is_none());
}

#[test]
fn chain_introspection_is_available_to_scripts() {
    let mut chain = TestChain::new("introspect");
    chain.create_account("alice");
    deploy(&mut chain, "counter");
    chain.produce_blocks(3);

    call(&mut chain, "alice", "counter", "prove_chain", json!([1])).unwrap();
    chain.produce_block();
    assert!(chain
        .db
        .last_block_contract_events()
        .iter()
        .any(|e| matches!(e, ContractEvent::Emit { key, .. } if key == "proof")));
}

#[test]
fn contract_ops_require_an_engine() {
    let mut chain = TestChain::new("noengine");
    chain.create_account("alice");

    let err = chain
        .push_ops(
            vec![Operation::ContractDeploy(ContractDeployOperation {
                creator: "alice".into(),
                name: "counter".into(),
                code: "counter-v1".into(),
                abi: "{}".into(),
            })],
            &["alice"],
        )
        .unwrap_err();
    assert!(matches!(err, ChainError::Contract(_)));
}
