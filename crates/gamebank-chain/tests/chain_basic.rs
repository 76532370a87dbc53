mod common;

use common::TestChain;
use gamebank_protocol::asset::{Asset, GBC, GBD};
use gamebank_protocol::config;
use gamebank_protocol::error::ChainError;
use gamebank_protocol::operations::{
    Operation, TransferOperation, WithdrawVestingOperation,
};

#[test]
fn transfer_moves_funds_and_preserves_supply() {
    let mut chain = TestChain::new("transfer");
    chain.create_account("alice");
    chain.create_account("bob");
    chain.fund("alice", Asset::new(1_000_000, GBC));

    let supply_before = chain.db.state.dgp().current_supply;
    let alice_before = chain.balance("alice", GBC);

    chain
        .push_ops(
            vec![Operation::Transfer(TransferOperation {
                from: "alice".into(),
                to: "bob".into(),
                amount: Asset::new(12_500, GBC),
                memo: "rent".into(),
            })],
            &["alice"],
        )
        .unwrap();
    chain.produce_block();

    assert_eq!(chain.balance("alice", GBC), alice_before - Asset::new(12_500, GBC));
    assert_eq!(chain.balance("bob", GBC), Asset::new(12_500, GBC));
    // inflation minted by the block is the only supply change
    let minted = chain.db.state.dgp().current_supply - supply_before;
    assert!(minted.amount >= 0);
    chain.db.validate_invariants().unwrap();
}

#[test]
fn transfer_with_insufficient_funds_is_rejected() {
    let mut chain = TestChain::new("overdraft");
    chain.create_account("alice");
    chain.create_account("bob");
    chain.fund("alice", Asset::new(100, GBC));

    let err = chain
        .push_ops(
            vec![Operation::Transfer(TransferOperation {
                from: "alice".into(),
                to: "bob".into(),
                amount: Asset::new(101, GBC),
                memo: String::new(),
            })],
            &["alice"],
        )
        .unwrap_err();
    assert!(matches!(err, ChainError::StatePrecondition(_)));

    // the rejected transaction left no trace
    assert_eq!(chain.balance("alice", GBC).amount, 100);
    assert_eq!(chain.balance("bob", GBC).amount, 0);
    chain.db.validate_invariants().unwrap();
}

#[test]
fn wrong_signature_is_an_authority_failure() {
    let mut chain = TestChain::new("badsig");
    chain.create_account("alice");
    chain.create_account("bob");
    chain.fund("alice", Asset::new(1_000, GBC));

    let err = chain
        .push_ops(
            vec![Operation::Transfer(TransferOperation {
                from: "alice".into(),
                to: "bob".into(),
                amount: Asset::new(10, GBC),
                memo: String::new(),
            })],
            &["bob"], // not alice's key
        )
        .unwrap_err();
    assert!(matches!(err, ChainError::Authority(_)));
}

#[test]
fn duplicate_transaction_is_rejected() {
    let mut chain = TestChain::new("dupe");
    chain.create_account("alice");
    chain.create_account("bob");
    chain.fund("alice", Asset::new(1_000, GBC));

    let trx = chain.sign_tx(
        vec![Operation::Transfer(TransferOperation {
            from: "alice".into(),
            to: "bob".into(),
            amount: Asset::new(10, GBC),
            memo: String::new(),
        })],
        &["alice"],
    );
    chain.db.push_transaction(trx.clone()).unwrap();
    let err = chain.db.push_transaction(trx).unwrap_err();
    assert!(matches!(err, ChainError::Duplicate(_)));
}

#[test]
fn expiration_bounds_are_enforced() {
    let mut chain = TestChain::new("expiry");
    chain.create_account("alice");
    chain.create_account("bob");
    chain.fund("alice", Asset::new(1_000, GBC));

    let op = Operation::Transfer(TransferOperation {
        from: "alice".into(),
        to: "bob".into(),
        amount: Asset::new(10, GBC),
        memo: String::new(),
    });

    // expiring exactly at head time: rejected
    let mut trx = chain.sign_tx(vec![op.clone()], &["alice"]);
    trx.trx.expiration = chain.db.head_block_time();
    let digest = trx.trx.sig_digest(&chain.db.chain_id());
    trx.signatures = vec![TestChain::key("alice").sign(&digest)];
    assert!(matches!(
        chain.db.push_transaction(trx),
        Err(ChainError::Expiration(_))
    ));

    // expiring one second inside the window: accepted
    let mut trx = chain.sign_tx(vec![op.clone()], &["alice"]);
    trx.trx.expiration = chain.db.head_block_time() + config::MAX_TIME_UNTIL_EXPIRATION - 1;
    let digest = trx.trx.sig_digest(&chain.db.chain_id());
    trx.signatures = vec![TestChain::key("alice").sign(&digest)];
    chain.db.push_transaction(trx).unwrap();

    // expiring past the window: rejected
    let mut trx = chain.sign_tx(vec![op], &["alice"]);
    trx.trx.expiration = chain.db.head_block_time() + config::MAX_TIME_UNTIL_EXPIRATION + 1;
    let digest = trx.trx.sig_digest(&chain.db.chain_id());
    trx.signatures = vec![TestChain::key("alice").sign(&digest)];
    assert!(matches!(
        chain.db.push_transaction(trx),
        Err(ChainError::Expiration(_))
    ));
}

#[test]
fn tapos_rejects_foreign_reference_blocks() {
    let mut chain = TestChain::new("tapos");
    chain.create_account("alice");
    chain.create_account("bob");
    chain.fund("alice", Asset::new(1_000, GBC));

    let mut trx = chain.sign_tx(
        vec![Operation::Transfer(TransferOperation {
            from: "alice".into(),
            to: "bob".into(),
            amount: Asset::new(10, GBC),
            memo: String::new(),
        })],
        &["alice"],
    );
    trx.trx.ref_block_prefix ^= 0xdead_beef;
    let digest = trx.trx.sig_digest(&chain.db.chain_id());
    trx.signatures = vec![TestChain::key("alice").sign(&digest)];
    assert!(matches!(
        chain.db.push_transaction(trx),
        Err(ChainError::Tapos(_))
    ));
}

#[test]
fn vesting_round_trip_returns_the_stake() {
    let mut chain = TestChain::new("vesting");
    chain.create_account("alice");
    let deposit = 1_000_000_000; // 1,000,000.000 GBC
    chain.fund("alice", Asset::new(deposit, GBC));

    let fund_before = chain.db.state.dgp().total_vesting_fund_gbc;
    chain.vest("alice", deposit);

    let alice = chain.db.state.get_account(&"alice".into()).unwrap().clone();
    assert_eq!(chain.balance("alice", GBC).amount, 0);
    assert!(alice.vesting_shares.amount > 0);
    // the fund grew by the deposit plus the produced block's 15% inflation slice
    let fund_delta = chain.db.state.dgp().total_vesting_fund_gbc.amount - fund_before.amount;
    assert!(fund_delta >= deposit, "fund grew by {fund_delta}");

    // power everything down
    chain
        .push_ops(
            vec![Operation::WithdrawVesting(WithdrawVestingOperation {
                account: "alice".into(),
                vesting_shares: alice.vesting_shares,
            })],
            &["alice"],
        )
        .unwrap();
    chain.produce_block();

    // thirteen full intervals plus one more for the integer remainder
    for _ in 0..=config::VESTING_WITHDRAW_INTERVALS {
        chain.skip_time(config::VESTING_WITHDRAW_INTERVAL_SECONDS);
    }

    let alice = chain.db.state.get_account(&"alice".into()).unwrap().clone();
    assert_eq!(alice.vesting_shares.amount, 0);
    assert_eq!(alice.vesting_withdraw_rate.amount, 0);
    // the share price only rises while powering down, so alice gets at
    // least her deposit back, less one satoshi of rounding per interval
    let balance = chain.balance("alice", GBC).amount;
    assert!(
        balance >= deposit - (config::VESTING_WITHDRAW_INTERVALS as i64 + 1),
        "got {balance}, deposited {deposit}"
    );
    chain.db.validate_invariants().unwrap();
}

#[test]
fn savings_withdrawal_takes_three_days() {
    use gamebank_protocol::operations::{
        TransferFromSavingsOperation, TransferToSavingsOperation,
    };
    let mut chain = TestChain::new("savings");
    chain.create_account("alice");
    chain.fund("alice", Asset::new(10_000, GBC));

    chain
        .push_ops(
            vec![Operation::TransferToSavings(TransferToSavingsOperation {
                from: "alice".into(),
                to: "alice".into(),
                amount: Asset::new(5_000, GBC),
                memo: String::new(),
            })],
            &["alice"],
        )
        .unwrap();
    chain.produce_block();
    assert_eq!(chain.balance("alice", GBC).amount, 5_000);

    chain
        .push_ops(
            vec![Operation::TransferFromSavings(TransferFromSavingsOperation {
                from: "alice".into(),
                request_id: 1,
                to: "alice".into(),
                amount: Asset::new(5_000, GBC),
                memo: String::new(),
            })],
            &["alice"],
        )
        .unwrap();
    chain.produce_block();

    // not yet: the three-day delay has not elapsed
    chain.produce_block();
    assert_eq!(chain.balance("alice", GBC).amount, 5_000);

    chain.skip_time(config::SAVINGS_WITHDRAW_TIME);
    assert_eq!(chain.balance("alice", GBC).amount, 10_000);
    chain.db.validate_invariants().unwrap();
}

#[test]
fn gbd_symbol_checks_on_vesting_ops() {
    let mut chain = TestChain::new("symbols");
    chain.create_account("alice");
    chain.fund("alice", Asset::new(1_000, GBD));

    // powering up GBD is statically invalid
    let err = chain
        .push_ops(
            vec![Operation::TransferToVesting(
                gamebank_protocol::operations::TransferToVestingOperation {
                    from: "alice".into(),
                    to: "alice".into(),
                    amount: Asset::new(100, GBD),
                },
            )],
            &["alice"],
        )
        .unwrap_err();
    assert!(matches!(err, ChainError::Validation(_)));

    let err = chain
        .push_ops(
            vec![Operation::WithdrawVesting(WithdrawVestingOperation {
                account: "alice".into(),
                vesting_shares: Asset::new(100, GBC),
            })],
            &["alice"],
        )
        .unwrap_err();
    assert!(matches!(err, ChainError::Validation(_)));
}
