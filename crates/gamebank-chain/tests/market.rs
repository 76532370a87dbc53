mod common;

use common::TestChain;
use gamebank_protocol::asset::{Asset, Price, GBC, GBD};
use gamebank_protocol::config;
use gamebank_protocol::error::ChainError;
use gamebank_protocol::operations::{
    ConvertOperation, LimitOrderCancelOperation, LimitOrderCreateOperation, Operation,
    VirtualOperation,
};

fn sell(chain: &TestChain, owner: &str, order_id: u32, amount: Asset, wants: Asset) -> Operation {
    Operation::LimitOrderCreate(LimitOrderCreateOperation {
        owner: owner.into(),
        order_id,
        amount_to_sell: amount,
        min_to_receive: wants,
        fill_or_kill: false,
        expiration: chain.db.head_block_time() + 24 * 3600,
    })
}

#[test]
fn partial_fill_leaves_the_remainder_on_the_book() {
    let mut chain = TestChain::new("orderbook");
    chain.create_account("alice");
    chain.create_account("bob");
    chain.fund("alice", Asset::new(10_000, GBC));
    chain.fund("bob", Asset::new(7_500, GBD));

    chain
        .push_ops(
            vec![sell(&chain, "alice", 1, Asset::new(10_000, GBC), Asset::new(15_000, GBD))],
            &["alice"],
        )
        .unwrap();
    chain.produce_block();

    chain
        .push_ops(
            vec![sell(&chain, "bob", 1, Asset::new(7_500, GBD), Asset::new(5_000, GBC))],
            &["bob"],
        )
        .unwrap();
    chain.produce_block();

    // bob's order was consumed entirely; alice's is half filled
    assert_eq!(chain.balance("alice", GBD).amount, 7_500);
    assert_eq!(chain.balance("bob", GBC).amount, 5_000);
    assert!(chain
        .db
        .state
        .limit_orders
        .find_by_key(&("bob".into(), 1))
        .is_none());
    let alice_order = chain
        .db
        .state
        .limit_orders
        .find_by_key(&("alice".into(), 1))
        .unwrap();
    assert_eq!(alice_order.for_sale, 5_000);

    // the fill was announced
    assert!(chain
        .db
        .last_block_virtual_ops()
        .iter()
        .any(|v| matches!(v, VirtualOperation::FillOrder { .. })));
    chain.db.validate_invariants().unwrap();
}

#[test]
fn cancelled_orders_refund_the_remainder() {
    let mut chain = TestChain::new("cancel");
    chain.create_account("alice");
    chain.fund("alice", Asset::new(10_000, GBC));

    chain
        .push_ops(
            vec![sell(&chain, "alice", 7, Asset::new(10_000, GBC), Asset::new(15_000, GBD))],
            &["alice"],
        )
        .unwrap();
    chain.produce_block();
    assert_eq!(chain.balance("alice", GBC).amount, 0);

    chain
        .push_ops(
            vec![Operation::LimitOrderCancel(LimitOrderCancelOperation {
                owner: "alice".into(),
                order_id: 7,
            })],
            &["alice"],
        )
        .unwrap();
    chain.produce_block();
    assert_eq!(chain.balance("alice", GBC).amount, 10_000);
    chain.db.validate_invariants().unwrap();
}

#[test]
fn duplicate_order_ids_are_rejected() {
    let mut chain = TestChain::new("orderdupe");
    chain.create_account("alice");
    chain.fund("alice", Asset::new(10_000, GBC));

    chain
        .push_ops(
            vec![sell(&chain, "alice", 1, Asset::new(1_000, GBC), Asset::new(1_500, GBD))],
            &["alice"],
        )
        .unwrap();
    chain.produce_block();

    let err = chain
        .push_ops(
            vec![sell(&chain, "alice", 1, Asset::new(1_000, GBC), Asset::new(1_500, GBD))],
            &["alice"],
        )
        .unwrap_err();
    assert!(matches!(err, ChainError::StatePrecondition(_)));
}

#[test]
fn expired_orders_are_swept_and_refunded() {
    let mut chain = TestChain::new("orderexpiry");
    chain.create_account("alice");
    chain.fund("alice", Asset::new(10_000, GBC));

    let expiration = chain.db.head_block_time() + 60;
    chain
        .push_ops(
            vec![Operation::LimitOrderCreate(LimitOrderCreateOperation {
                owner: "alice".into(),
                order_id: 3,
                amount_to_sell: Asset::new(10_000, GBC),
                min_to_receive: Asset::new(15_000, GBD),
                fill_or_kill: false,
                expiration,
            })],
            &["alice"],
        )
        .unwrap();
    chain.produce_block();
    assert_eq!(chain.balance("alice", GBC).amount, 0);

    chain.skip_time(120);
    assert!(chain
        .db
        .state
        .limit_orders
        .find_by_key(&("alice".into(), 3))
        .is_none());
    assert_eq!(chain.balance("alice", GBC).amount, 10_000);
    chain.db.validate_invariants().unwrap();
}

#[test]
fn fill_or_kill_requires_a_complete_fill() {
    let mut chain = TestChain::new("fok");
    chain.create_account("alice");
    chain.fund("alice", Asset::new(10_000, GBC));

    let err = chain
        .push_ops(
            vec![Operation::LimitOrderCreate(LimitOrderCreateOperation {
                owner: "alice".into(),
                order_id: 9,
                amount_to_sell: Asset::new(10_000, GBC),
                min_to_receive: Asset::new(15_000, GBD),
                fill_or_kill: true,
                expiration: chain.db.head_block_time() + 24 * 3600,
            })],
            &["alice"],
        )
        .unwrap_err();
    assert!(matches!(err, ChainError::StatePrecondition(_)));
    // rollback returned the funds
    assert_eq!(chain.balance("alice", GBC).amount, 10_000);
}

#[test]
fn conversion_executes_at_the_median_after_the_delay() {
    let mut chain = TestChain::new("convert");
    chain.create_account("alice");
    chain.fund("alice", Asset::new(0, GBC));
    chain.fund("alice", Asset::new(2_000, GBD));

    // plant a 2 GBD / 1 GBC median; a real chain reaches this through
    // witness feeds, which need a full schedule
    chain.db.state.modify_feed(|f| {
        f.current_median_history = Price::new(Asset::new(2_000, GBD), Asset::new(1_000, GBC));
        f.price_history = vec![f.current_median_history];
    });

    chain
        .push_ops(
            vec![Operation::Convert(ConvertOperation {
                owner: "alice".into(),
                request_id: 1,
                amount: Asset::new(2_000, GBD),
            })],
            &["alice"],
        )
        .unwrap();
    chain.produce_block();
    assert_eq!(chain.balance("alice", GBD).amount, 0);
    assert_eq!(chain.balance("alice", GBC).amount, 0);

    let gbd_supply_before = chain.db.state.dgp().current_gbd_supply;
    chain.skip_time(config::CONVERSION_DELAY_SECONDS);

    // 2.000 GBD at 2 GBD/GBC → 1.000 GBC
    assert_eq!(chain.balance("alice", GBC).amount, 1_000);
    assert_eq!(chain.balance("alice", GBD).amount, 0);
    assert_eq!(
        chain.db.state.dgp().current_gbd_supply.amount,
        gbd_supply_before.amount - 2_000
    );
    assert!(chain
        .db
        .last_block_virtual_ops()
        .iter()
        .any(|v| matches!(v, VirtualOperation::FillConvertRequest { .. })));
    chain.db.validate_invariants().unwrap();
}

#[test]
fn dust_remainders_cancel_instead_of_resting() {
    let mut chain = TestChain::new("dustorder");
    chain.create_account("alice");
    chain.create_account("bob");
    chain.fund("alice", Asset::new(10, GBC));
    chain.fund("bob", Asset::new(1_000, GBD));

    // alice asks 1 GBD satoshi per 10 GBC satoshis; a nearly-full fill can
    // leave her a remainder whose ask rounds to zero
    chain
        .push_ops(
            vec![sell(&chain, "alice", 1, Asset::new(10, GBC), Asset::new(1, GBD))],
            &["alice"],
        )
        .unwrap();
    chain
        .push_ops(
            vec![sell(&chain, "bob", 1, Asset::new(1, GBD), Asset::new(9, GBC))],
            &["bob"],
        )
        .unwrap();
    chain.produce_block();

    // whatever happened, no order may rest asking for nothing
    for order in chain.db.state.limit_orders.iter() {
        assert!(order.amount_to_receive().amount > 0);
    }
    chain.db.validate_invariants().unwrap();
}
