mod common;

use common::TestChain;
use gamebank_chain::skip;
use gamebank_protocol::asset::{Asset, GBC};
use gamebank_protocol::config;
use gamebank_protocol::error::ChainError;
use gamebank_protocol::operations::{Operation, TransferOperation};

fn transfer(from: &str, to: &str, amount: i64) -> Operation {
    Operation::Transfer(TransferOperation {
        from: from.into(),
        to: to.into(),
        amount: Asset::new(amount, GBC),
        memo: String::new(),
    })
}

/// Mirror every block of `src` beyond `dst`'s head into `dst`.
fn sync(dst: &mut TestChain, src: &mut TestChain) {
    for num in (dst.db.head_block_num() + 1)..=src.db.head_block_num() {
        let block = src.db.fetch_block_by_number(num).unwrap().unwrap();
        dst.db.push_block(block, skip::NOTHING).unwrap();
    }
    assert_eq!(dst.db.head_block_id(), src.db.head_block_id());
}

#[test]
fn longer_branch_wins_and_transactions_are_popped() {
    let mut chain_a = TestChain::new("fork_a");
    let mut chain_b = TestChain::new("fork_b");

    // a shared prefix: accounts and funding through real operations so both
    // chains replay to identical state
    chain_a.produce_block_at_slot(1);
    chain_a.create_account("alice");
    chain_a.create_account("bob");
    chain_a
        .push_ops(vec![transfer(config::INIT_MINER_NAME, "alice", 1_000)], &[config::INIT_MINER_NAME])
        .unwrap();
    chain_a.produce_block_at_slot(1);
    sync(&mut chain_b, &mut chain_a);

    // alice's transfer is anchored to the shared prefix so it stays valid
    // on either branch
    let mut popped_trx = chain_a.sign_tx(vec![transfer("alice", "bob", 100)], &[]);
    popped_trx.trx.ref_block_num = 0;
    popped_trx.trx.ref_block_prefix = 0;
    let digest = popped_trx.trx.sig_digest(&chain_a.db.chain_id());
    popped_trx.signatures = vec![TestChain::key("alice").sign(&digest)];

    // branch A: two blocks, the second carrying the transfer
    chain_a.produce_block_at_slot(1);
    chain_a.db.push_transaction(popped_trx.clone()).unwrap();
    chain_a.produce_block_at_slot(1);
    assert_eq!(chain_a.balance("bob", GBC).amount, 100);

    // branch B: three blocks on different slots
    let b1 = chain_b.produce_block_at_slot(2);
    let b2 = chain_b.produce_block_at_slot(1);
    let b3 = chain_b.produce_block_at_slot(1);

    // feeding branch B into A triggers the switch at the third block
    chain_a.db.push_block(b1, skip::NOTHING).unwrap();
    chain_a.db.push_block(b2, skip::NOTHING).unwrap();
    let switched = chain_a.db.push_block(b3.clone(), skip::NOTHING).unwrap();
    assert!(switched);
    assert_eq!(chain_a.db.head_block_id(), b3.id());

    // the orphaned transfer returned to the pending pool
    assert!(chain_a
        .db
        .pending_transactions()
        .iter()
        .any(|t| t.id() == popped_trx.id()));
    // its effect is gone from the switched-to state until re-included
    assert_eq!(chain_a.balance("bob", GBC).amount, 0);

    // the next produced block folds it back in
    chain_a.produce_block_at_slot(1);
    assert_eq!(chain_a.balance("bob", GBC).amount, 100);
    chain_a.db.validate_invariants().unwrap();
}

#[test]
fn shorter_fork_does_not_displace_the_head() {
    let mut chain_a = TestChain::new("short_a");
    let mut chain_b = TestChain::new("short_b");

    let shared = chain_a.produce_block_at_slot(1);
    chain_b.produce_block_at_slot(1);

    chain_a.produce_block_at_slot(1);
    chain_a.produce_block_at_slot(1);
    let head_before = chain_a.db.head_block_id();

    // B's one-block branch from the shared prefix is shorter
    let b1 = chain_b.produce_block_at_slot(2);
    assert_eq!(b1.previous(), shared.id());
    let moved = chain_a.db.push_block(b1, skip::NOTHING).unwrap();
    assert!(!moved);
    assert_eq!(chain_a.db.head_block_id(), head_before);
}

#[test]
fn pop_block_rewinds_state() {
    let mut chain = TestChain::new("pop");
    chain.create_account("alice");
    chain.create_account("bob");
    chain
        .push_ops(vec![transfer(config::INIT_MINER_NAME, "alice", 1_000)], &[config::INIT_MINER_NAME])
        .unwrap();
    chain.produce_block();

    chain.push_ops(vec![transfer("alice", "bob", 250)], &["alice"]).unwrap();
    chain.produce_block();
    assert_eq!(chain.balance("bob", GBC).amount, 250);
    let head_before = chain.db.head_block_num();

    chain.db.pop_block().unwrap();

    // the indexed state rewound with the block
    assert_eq!(chain.db.head_block_num(), head_before - 1);
    assert_eq!(chain.balance("bob", GBC).amount, 0);
    assert_eq!(chain.balance("alice", GBC).amount, 1_000);
    // the popped transaction waits for re-application
    assert_eq!(chain.db.popped_transactions().len(), 1);
    chain.db.validate_invariants().unwrap();
}

#[test]
fn irreversible_blocks_reach_the_log_with_valid_offsets() {
    let mut chain = TestChain::new("lib");
    chain.produce_blocks(30);

    let head = chain.db.head_block_num();
    let lib = chain.db.last_irreversible_block_num();
    // a young chain trails the head by one full round of 21
    assert_eq!(lib, head - config::MAX_WITNESSES as u32);
    assert_eq!(chain.db.block_log.head().unwrap().block_num(), lib);

    for num in 1..=lib {
        let logged = chain.db.block_log.read_block_by_num(num).unwrap().unwrap();
        assert_eq!(logged.block_num(), num);
        let in_tree = chain.db.fetch_block_by_number(num).unwrap().unwrap();
        assert_eq!(logged.id(), in_tree.id());
    }
}

#[test]
fn reindex_reproduces_the_irreversible_chain() {
    let mut chain = TestChain::new("reindex");
    chain.create_account("alice");
    chain.create_account("bob");
    chain
        .push_ops(vec![transfer(config::INIT_MINER_NAME, "alice", 5_000)], &[config::INIT_MINER_NAME])
        .unwrap();
    chain.produce_block();
    chain.push_ops(vec![transfer("alice", "bob", 500)], &["alice"]).unwrap();
    chain.produce_blocks(30);

    let lib = chain.db.last_irreversible_block_num();
    let lib_id = chain.db.fetch_block_by_number(lib).unwrap().unwrap().id();
    let bob_balance = chain.balance("bob", GBC);

    let chain = chain.reopen();
    // replay rebuilds the chain up to the logged head
    assert_eq!(chain.db.head_block_num(), lib);
    assert_eq!(chain.db.head_block_id(), lib_id);
    assert_eq!(chain.balance("bob", GBC), bob_balance);
    chain.db.validate_invariants().unwrap();
}

#[test]
fn unlinkable_blocks_are_reported() {
    let mut chain_a = TestChain::new("unlink_a");
    let mut chain_b = TestChain::new("unlink_b");

    chain_a.produce_block_at_slot(1);
    chain_b.produce_block_at_slot(1);
    chain_b.produce_block_at_slot(1);
    chain_b.produce_block_at_slot(1);
    let orphan = chain_b.produce_block_at_slot(1);

    // A never saw blocks 2 and 3 of branch B, so its tip cannot link yet
    let err = chain_a.db.push_block(orphan, skip::NOTHING).unwrap_err();
    assert!(matches!(err, ChainError::UnlinkableBlock(_)));
}
