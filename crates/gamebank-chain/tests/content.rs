mod common;

use common::TestChain;
use gamebank_protocol::asset::{Asset, GBC, GBD};
use gamebank_protocol::config;
use gamebank_protocol::error::ChainError;
use gamebank_protocol::operations::{
    ClaimRewardBalanceOperation, CommentOperation, DeleteCommentOperation, Operation,
    VirtualOperation, VoteOperation,
};
use gamebank_protocol::types::AccountName;

fn post(author: &str, permlink: &str) -> Operation {
    Operation::Comment(CommentOperation {
        parent_author: AccountName::default(),
        parent_permlink: "games".into(),
        author: author.into(),
        permlink: permlink.into(),
        title: "title".into(),
        body: "body".into(),
        json_metadata: String::new(),
    })
}

fn vote(voter: &str, author: &str, permlink: &str, weight: i16) -> Operation {
    Operation::Vote(VoteOperation {
        voter: voter.into(),
        author: author.into(),
        permlink: permlink.into(),
        weight,
    })
}

#[test]
fn vote_accrues_rshares_and_consumes_power() {
    let mut chain = TestChain::new("voting");
    chain.create_account("alice");
    chain.create_account("bob");
    chain.fund("bob", Asset::new(1_000_000_000, GBC));
    chain.vest("bob", 1_000_000_000);

    chain.push_ops(vec![post("alice", "first")], &["alice"]).unwrap();
    chain.produce_block();

    chain.push_ops(vec![vote("bob", "alice", "first", 10_000)], &["bob"]).unwrap();
    chain.produce_block();

    let comment = chain
        .db
        .state
        .get_comment(&"alice".into(), "first")
        .unwrap()
        .clone();
    assert!(comment.net_rshares > 0);
    assert_eq!(comment.net_rshares, comment.abs_rshares);
    assert_eq!(comment.net_votes, 1);
    assert!(comment.total_vote_weight > 0);

    let bob = chain.db.state.get_account(&"bob".into()).unwrap().clone();
    assert!(bob.voting_power < config::PERCENT_100 as u16);

    // immediately revoting the same way is rejected
    let err = chain
        .push_ops(vec![vote("bob", "alice", "first", 10_000)], &["bob"])
        .unwrap_err();
    assert!(matches!(err, ChainError::StatePrecondition(_)));
    chain.db.validate_invariants().unwrap();
}

#[test]
fn cashout_pays_author_and_curators() {
    let mut chain = TestChain::new("cashout");
    chain.create_account("alice");
    chain.create_account("bob");
    chain.fund("bob", Asset::new(1_000_000_000, GBC));
    chain.vest("bob", 1_000_000_000);

    chain.push_ops(vec![post("alice", "first")], &["alice"]).unwrap();
    chain.produce_block();

    // vote one hour after creation, past the reverse auction window
    chain.skip_time(60 * 60);
    chain.push_ops(vec![vote("bob", "alice", "first", 10_000)], &["bob"]).unwrap();
    chain.produce_block();

    // cross the cashout boundary
    chain.skip_time(config::CASHOUT_WINDOW_SECONDS);

    let vops = chain.db.last_block_virtual_ops();
    assert!(vops.iter().any(|v| matches!(v, VirtualOperation::AuthorReward { .. })));
    assert!(vops.iter().any(|v| matches!(v, VirtualOperation::CurationReward { .. })));
    assert!(vops.iter().any(|v| matches!(v, VirtualOperation::CommentPayoutUpdate { .. })));

    let alice = chain.db.state.get_account(&"alice".into()).unwrap().clone();
    assert!(alice.reward_gbc_balance.amount > 0, "author liquid reward");
    assert!(alice.reward_vesting_balance.amount > 0, "author vesting reward");

    let bob = chain.db.state.get_account(&"bob".into()).unwrap().clone();
    assert!(bob.reward_vesting_balance.amount > 0, "curation reward");

    let comment = chain
        .db
        .state
        .get_comment(&"alice".into(), "first")
        .unwrap()
        .clone();
    assert!(comment.is_archived());
    assert_eq!(comment.net_rshares, 0);
    assert_eq!(comment.total_vote_weight, 0);

    // the pending rewards are spendable through the claim operation
    chain
        .push_ops(
            vec![Operation::ClaimRewardBalance(ClaimRewardBalanceOperation {
                account: "alice".into(),
                reward_gbc: alice.reward_gbc_balance,
                reward_gbd: Asset::zero(GBD),
                reward_vests: alice.reward_vesting_balance,
            })],
            &["alice"],
        )
        .unwrap();
    chain.produce_block();
    let alice_after = chain.db.state.get_account(&"alice".into()).unwrap().clone();
    assert_eq!(alice_after.balance, alice.reward_gbc_balance);
    assert_eq!(alice_after.vesting_shares, alice.reward_vesting_balance);
    assert_eq!(alice_after.reward_vesting_balance.amount, 0);

    chain.db.validate_invariants().unwrap();
}

#[test]
fn votes_after_payout_are_bookkeeping_only() {
    let mut chain = TestChain::new("latevote");
    chain.create_account("alice");
    chain.create_account("bob");
    chain.fund("bob", Asset::new(1_000_000_000, GBC));
    chain.vest("bob", 1_000_000_000);

    chain.push_ops(vec![post("alice", "first")], &["alice"]).unwrap();
    chain.produce_block();
    chain.skip_time(config::CASHOUT_WINDOW_SECONDS + 60);

    chain.push_ops(vec![vote("bob", "alice", "first", 10_000)], &["bob"]).unwrap();
    chain.produce_block();

    let comment = chain
        .db
        .state
        .get_comment(&"alice".into(), "first")
        .unwrap()
        .clone();
    assert_eq!(comment.net_rshares, 0);
    assert!(comment.is_archived());
}

#[test]
fn upvote_lockout_blocks_late_payout_increases() {
    let mut chain = TestChain::new("lockout");
    chain.create_account("alice");
    chain.create_account("bob");
    chain.fund("bob", Asset::new(1_000_000_000, GBC));
    chain.vest("bob", 1_000_000_000);

    chain.push_ops(vec![post("alice", "first")], &["alice"]).unwrap();
    chain.produce_block();

    // jump inside the final twelve hours of the window
    chain.skip_time(config::CASHOUT_WINDOW_SECONDS - config::UPVOTE_LOCKOUT_SECONDS / 2);
    let err = chain
        .push_ops(vec![vote("bob", "alice", "first", 10_000)], &["bob"])
        .unwrap_err();
    assert!(matches!(err, ChainError::StatePrecondition(_)));
}

#[test]
fn root_post_rate_limit_applies() {
    let mut chain = TestChain::new("postrate");
    chain.create_account("alice");

    chain.push_ops(vec![post("alice", "one")], &["alice"]).unwrap();
    chain.produce_block();

    let err = chain.push_ops(vec![post("alice", "two")], &["alice"]).unwrap_err();
    assert!(matches!(err, ChainError::StatePrecondition(_)));

    chain.skip_time(config::MIN_ROOT_COMMENT_INTERVAL + 10);
    chain.push_ops(vec![post("alice", "two")], &["alice"]).unwrap();
}

#[test]
fn replies_nest_and_count() {
    let mut chain = TestChain::new("replies");
    chain.create_account("alice");
    chain.create_account("bob");

    chain.push_ops(vec![post("alice", "root")], &["alice"]).unwrap();
    chain.produce_block();

    chain
        .push_ops(
            vec![Operation::Comment(CommentOperation {
                parent_author: "alice".into(),
                parent_permlink: "root".into(),
                author: "bob".into(),
                permlink: "re-root".into(),
                title: String::new(),
                body: "reply".into(),
                json_metadata: String::new(),
            })],
            &["bob"],
        )
        .unwrap();
    chain.produce_block();

    let root = chain.db.state.get_comment(&"alice".into(), "root").unwrap().clone();
    let reply = chain.db.state.get_comment(&"bob".into(), "re-root").unwrap().clone();
    assert_eq!(root.children, 1);
    assert_eq!(reply.depth, 1);
    assert_eq!(reply.root_comment, root.id);

    // a voted comment cannot be deleted, an unvoted reply can
    chain
        .push_ops(
            vec![Operation::DeleteComment(DeleteCommentOperation {
                author: "bob".into(),
                permlink: "re-root".into(),
            })],
            &["bob"],
        )
        .unwrap();
    chain.produce_block();
    assert!(chain.db.state.get_comment(&"bob".into(), "re-root").is_err());
    let root = chain.db.state.get_comment(&"alice".into(), "root").unwrap().clone();
    assert_eq!(root.children, 0);
}

#[test]
fn reward_fund_accrues_from_inflation() {
    let mut chain = TestChain::new("fund");
    chain.produce_blocks(5);
    let fund = chain
        .db
        .state
        .reward_funds
        .find_by_key(&config::POST_REWARD_FUND_NAME.to_string())
        .unwrap();
    assert!(fund.reward_balance.amount > 0);
}
