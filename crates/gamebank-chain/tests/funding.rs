mod common;

use common::TestChain;
use gamebank_protocol::asset::{Asset, GBC};
use gamebank_protocol::error::ChainError;
use gamebank_protocol::operations::{
    CrowdfundingOperation, InvestOperation, NonfungibleFundBuyOperation,
    NonfungibleFundCreateOperation, NonfungibleFundPutUpForSaleOperation,
    NonfungibleFundTransferOperation, Operation,
};

fn crowdfunding(originator: &str, permlink: &str, target: i64) -> Operation {
    Operation::Crowdfunding(CrowdfundingOperation {
        originator: originator.into(),
        permlink: permlink.into(),
        title: "fund my game".into(),
        body: "pitch".into(),
        json_metadata: String::new(),
        raise: Asset::new(target, GBC),
    })
}

fn invest(invester: &str, originator: &str, permlink: &str, amount: i64) -> Operation {
    Operation::Invest(InvestOperation {
        invester: invester.into(),
        originator: originator.into(),
        permlink: permlink.into(),
        raise: Asset::new(amount, GBC),
    })
}

#[test]
fn a_funded_round_pays_the_originator() {
    let mut chain = TestChain::new("cffunded");
    chain.create_account("alice");
    chain.create_account("bob");
    chain.create_account("carol");
    chain.fund("bob", Asset::new(6_000, GBC));
    chain.fund("carol", Asset::new(6_000, GBC));

    chain.push_ops(vec![crowdfunding("alice", "game", 10_000)], &["alice"]).unwrap();
    chain.produce_block();

    chain.push_ops(vec![invest("bob", "alice", "game", 6_000)], &["bob"]).unwrap();
    chain.push_ops(vec![invest("carol", "alice", "game", 4_000)], &["carol"]).unwrap();
    chain.produce_block();
    assert_eq!(chain.balance("bob", GBC).amount, 0);
    assert_eq!(chain.balance("carol", GBC).amount, 2_000);

    // overshooting the target is rejected
    let err = chain
        .push_ops(vec![invest("carol", "alice", "game", 2_000)], &["carol"])
        .unwrap_err();
    assert!(matches!(err, ChainError::StatePrecondition(_)));

    // expiry settles in the originator's favor
    chain.skip_time(3 * 24 * 60 * 60 + 60);
    assert_eq!(chain.balance("alice", GBC).amount, 10_000);
    let cf = chain
        .db
        .state
        .crowdfundings
        .find_by_key(&("alice".into(), "game".into()))
        .unwrap();
    assert_eq!(cf.finish, gamebank_chain::objects::CROWDFUNDING_FUNDED);
    chain.db.validate_invariants().unwrap();
}

#[test]
fn a_missed_target_refunds_every_investor() {
    let mut chain = TestChain::new("cfrefund");
    chain.create_account("alice");
    chain.create_account("bob");
    chain.fund("bob", Asset::new(6_000, GBC));

    chain.push_ops(vec![crowdfunding("alice", "game", 10_000)], &["alice"]).unwrap();
    chain.produce_block();
    chain.push_ops(vec![invest("bob", "alice", "game", 6_000)], &["bob"]).unwrap();
    chain.produce_block();
    assert_eq!(chain.balance("bob", GBC).amount, 0);

    chain.skip_time(3 * 24 * 60 * 60 + 60);
    assert_eq!(chain.balance("bob", GBC).amount, 6_000);
    assert_eq!(chain.balance("alice", GBC).amount, 0);
    let cf = chain
        .db
        .state
        .crowdfundings
        .find_by_key(&("alice".into(), "game".into()))
        .unwrap();
    assert_eq!(cf.finish, gamebank_chain::objects::CROWDFUNDING_REFUNDED);
    chain.db.validate_invariants().unwrap();
}

#[test]
fn one_active_round_per_originator() {
    let mut chain = TestChain::new("cfserial");
    chain.create_account("alice");

    chain.push_ops(vec![crowdfunding("alice", "one", 1_000)], &["alice"]).unwrap();
    chain.produce_block();

    let err = chain
        .push_ops(vec![crowdfunding("alice", "two", 1_000)], &["alice"])
        .unwrap_err();
    assert!(matches!(err, ChainError::StatePrecondition(_)));
}

#[test]
fn nonfungible_funds_trade_hands() {
    let mut chain = TestChain::new("nft");
    chain.create_account("alice");
    chain.create_account("bob");
    chain.fund("bob", Asset::new(10_000, GBC));

    chain
        .push_ops(
            vec![Operation::NonfungibleFundCreate(NonfungibleFundCreateOperation {
                creator: "alice".into(),
                owner: "alice".into(),
                meta_data: "{\"sword\":1}".into(),
            })],
            &["alice"],
        )
        .unwrap();
    chain.produce_block();

    let fund = chain.db.state.nonfungible_funds.iter().next().unwrap().clone();
    assert_eq!(fund.owner, "alice".into());

    // list it, then sell it to bob
    chain
        .push_ops(
            vec![Operation::NonfungibleFundPutUpForSale(
                NonfungibleFundPutUpForSaleOperation {
                    seller: "alice".into(),
                    fund_id: fund.id,
                    selling_price: Asset::new(2_500, GBC),
                    expiration: chain.db.head_block_time() + 3_600,
                },
            )],
            &["alice"],
        )
        .unwrap();
    chain.produce_block();

    // a listed fund cannot be transferred away
    let err = chain
        .push_ops(
            vec![Operation::NonfungibleFundTransfer(NonfungibleFundTransferOperation {
                from: "alice".into(),
                to: "bob".into(),
                fund_id: fund.id,
            })],
            &["alice"],
        )
        .unwrap_err();
    assert!(matches!(err, ChainError::StatePrecondition(_)));

    chain
        .push_ops(
            vec![Operation::NonfungibleFundBuy(NonfungibleFundBuyOperation {
                buyer: "bob".into(),
                fund_id: fund.id,
            })],
            &["bob"],
        )
        .unwrap();
    chain.produce_block();

    let fund = chain.db.state.nonfungible_funds.find(fund.id).unwrap().clone();
    assert_eq!(fund.owner, "bob".into());
    assert_eq!(chain.balance("alice", GBC).amount, 2_500);
    assert_eq!(chain.balance("bob", GBC).amount, 7_500);
    assert!(chain
        .db
        .state
        .nonfungible_funds_on_sale
        .find_by_key(&fund.id)
        .is_none());
    chain.db.validate_invariants().unwrap();
}
