mod common;

use common::TestChain;
use gamebank_protocol::asset::{Asset, GBC, GBD, GBS};
use gamebank_protocol::authority::Authority;
use gamebank_protocol::config;
use gamebank_protocol::error::ChainError;
use gamebank_protocol::operations::{
    AccountUpdateOperation, AccountWitnessProxyOperation, AccountWitnessVoteOperation,
    ChainProperties, DeclineVotingRightsOperation, DelegateVestingSharesOperation,
    EscrowApproveOperation, EscrowReleaseOperation, EscrowTransferOperation, Operation,
    RecoverAccountOperation, RequestAccountRecoveryOperation, VoteOperation,
    WitnessUpdateOperation,
};
use gamebank_protocol::types::AccountName;

fn witness_update(owner: &str) -> Operation {
    Operation::WitnessUpdate(WitnessUpdateOperation {
        owner: owner.into(),
        url: format!("https://{owner}.example"),
        block_signing_key: TestChain::key(owner).public_key(),
        props: ChainProperties::default(),
        fee: Asset::zero(GBC),
    })
}

#[test]
fn witness_votes_weigh_by_stake() {
    let mut chain = TestChain::new("witvote");
    chain.create_account("alice");
    chain.create_account("carol");
    chain.fund("alice", Asset::new(1_000_000_000, GBC));
    chain.vest("alice", 1_000_000_000);

    chain.push_ops(vec![witness_update("carol")], &["carol"]).unwrap();
    chain.produce_block();

    chain
        .push_ops(
            vec![Operation::AccountWitnessVote(AccountWitnessVoteOperation {
                account: "alice".into(),
                witness: "carol".into(),
                approve: true,
            })],
            &["alice"],
        )
        .unwrap();
    chain.produce_block();

    let alice = chain.db.state.get_account(&"alice".into()).unwrap().clone();
    let carol = chain.db.state.get_witness(&"carol".into()).unwrap().clone();
    assert_eq!(carol.votes, alice.vesting_shares.amount);
    assert_eq!(alice.witnesses_voted_for, 1);

    // unvoting removes exactly the same weight
    chain
        .push_ops(
            vec![Operation::AccountWitnessVote(AccountWitnessVoteOperation {
                account: "alice".into(),
                witness: "carol".into(),
                approve: false,
            })],
            &["alice"],
        )
        .unwrap();
    chain.produce_block();
    let carol = chain.db.state.get_witness(&"carol".into()).unwrap().clone();
    assert_eq!(carol.votes, 0);
}

#[test]
fn proxied_stake_flows_to_the_proxy_target() {
    let mut chain = TestChain::new("proxy");
    chain.create_account("alice");
    chain.create_account("proxied");
    chain.create_account("carol");
    chain.fund("proxied", Asset::new(500_000_000, GBC));
    chain.vest("proxied", 500_000_000);
    chain.fund("alice", Asset::new(500_000_000, GBC));
    chain.vest("alice", 500_000_000);

    chain.push_ops(vec![witness_update("carol")], &["carol"]).unwrap();
    chain.produce_block();

    // alice votes; then "proxied" hands its stake to alice
    chain
        .push_ops(
            vec![Operation::AccountWitnessVote(AccountWitnessVoteOperation {
                account: "alice".into(),
                witness: "carol".into(),
                approve: true,
            })],
            &["alice"],
        )
        .unwrap();
    chain
        .push_ops(
            vec![Operation::AccountWitnessProxy(AccountWitnessProxyOperation {
                account: "proxied".into(),
                proxy: "alice".into(),
            })],
            &["proxied"],
        )
        .unwrap();
    chain.produce_block();

    let alice = chain.db.state.get_account(&"alice".into()).unwrap().clone();
    let proxied = chain.db.state.get_account(&"proxied".into()).unwrap().clone();
    let carol = chain.db.state.get_witness(&"carol".into()).unwrap().clone();
    assert_eq!(
        carol.votes,
        alice.vesting_shares.amount + proxied.vesting_shares.amount
    );

    // an account with a proxy cannot vote directly
    let err = chain
        .push_ops(
            vec![Operation::AccountWitnessVote(AccountWitnessVoteOperation {
                account: "proxied".into(),
                witness: "carol".into(),
                approve: true,
            })],
            &["proxied"],
        )
        .unwrap_err();
    assert!(matches!(err, ChainError::StatePrecondition(_)));
}

#[test]
fn a_full_round_of_witnesses_rotates_into_the_schedule() {
    let mut chain = TestChain::new("schedule");
    chain.create_account("alice");
    chain.fund("alice", Asset::new(2_000_000_000, GBC));
    chain.vest("alice", 2_000_000_000);

    let names: Vec<String> = (0..21).map(|i| format!("wit{}{}", (b'a' + i / 5) as char, (b'a' + i % 5) as char)).collect();
    for name in &names {
        chain.create_account(name);
        chain.push_ops(vec![witness_update(name)], &[name.as_str()]).unwrap();
        chain
            .push_ops(
                vec![Operation::AccountWitnessVote(AccountWitnessVoteOperation {
                    account: "alice".into(),
                    witness: name.as_str().into(),
                    approve: true,
                })],
                &["alice"],
            )
            .unwrap();
        chain.produce_block();
    }

    // the next rotation seats a full round
    chain.produce_block();
    let schedule = chain.db.state.schedule().clone();
    assert_eq!(schedule.num_scheduled_witnesses, 21);

    // the chain keeps producing across two whole rounds with the fixture
    // signing as whichever witness is scheduled
    for _ in 0..42 {
        chain.produce_block();
    }
    chain.db.validate_invariants().unwrap();

    // skipping a slot charges the scheduled witness with a miss
    let missed_before: u32 = chain.db.state.witnesses.iter().map(|w| w.total_missed).sum();
    chain.produce_block_at_slot(2);
    let missed_after: u32 = chain.db.state.witnesses.iter().map(|w| w.total_missed).sum();
    assert_eq!(missed_after, missed_before + 1);
}

#[test]
fn owner_recovery_restores_control() {
    let mut chain = TestChain::new("recovery");
    chain.create_account("alice");

    // the owner key is replaced (as after a compromise)
    chain
        .push_ops(
            vec![Operation::AccountUpdate(AccountUpdateOperation {
                account: "alice".into(),
                owner: Some(Authority::single_key(TestChain::key("attacker").public_key())),
                active: None,
                posting: None,
                memo_key: TestChain::key("alice").public_key(),
                json_metadata: String::new(),
            })],
            &["alice"],
        )
        .unwrap();
    chain.produce_block();

    // the recovery partner (the creator) files a request for a fresh key
    chain
        .push_ops(
            vec![Operation::RequestAccountRecovery(RequestAccountRecoveryOperation {
                recovery_account: config::INIT_MINER_NAME.into(),
                account_to_recover: "alice".into(),
                new_owner_authority: Authority::single_key(
                    TestChain::key("alice-fresh").public_key(),
                ),
            })],
            &[config::INIT_MINER_NAME],
        )
        .unwrap();
    chain.produce_block();

    // alice proves the old owner key alongside the new one
    chain
        .push_ops(
            vec![Operation::RecoverAccount(RecoverAccountOperation {
                account_to_recover: "alice".into(),
                new_owner_authority: Authority::single_key(
                    TestChain::key("alice-fresh").public_key(),
                ),
                recent_owner_authority: Authority::single_key(
                    TestChain::key("alice").public_key(),
                ),
            })],
            &["alice-fresh", "alice"],
        )
        .unwrap();
    chain.produce_block();

    let alice = chain.db.state.get_account(&"alice".into()).unwrap().clone();
    assert_eq!(
        alice.owner,
        Authority::single_key(TestChain::key("alice-fresh").public_key())
    );
}

#[test]
fn declined_voting_rights_take_effect_after_the_delay() {
    let mut chain = TestChain::new("decline");
    chain.create_account("alice");
    chain.create_account("bob");
    chain.fund("bob", Asset::new(1_000_000_000, GBC));
    chain.vest("bob", 1_000_000_000);

    chain
        .push_ops(
            vec![Operation::DeclineVotingRights(DeclineVotingRightsOperation {
                account: "bob".into(),
                decline: true,
            })],
            &["bob"],
        )
        .unwrap();
    chain.produce_block();

    // still allowed until the delay elapses
    let bob = chain.db.state.get_account(&"bob".into()).unwrap().clone();
    assert!(bob.can_vote);

    chain.skip_time(config::OWNER_AUTH_RECOVERY_PERIOD + 60);
    let bob = chain.db.state.get_account(&"bob".into()).unwrap().clone();
    assert!(!bob.can_vote);

    chain.push_ops(vec![post_op("alice", "p")], &["alice"]).unwrap();
    chain.produce_block();
    let err = chain
        .push_ops(
            vec![Operation::Vote(VoteOperation {
                voter: "bob".into(),
                author: "alice".into(),
                permlink: "p".into(),
                weight: 10_000,
            })],
            &["bob"],
        )
        .unwrap_err();
    assert!(matches!(err, ChainError::StatePrecondition(_)));
}

fn post_op(author: &str, permlink: &str) -> Operation {
    Operation::Comment(gamebank_protocol::operations::CommentOperation {
        parent_author: AccountName::default(),
        parent_permlink: "games".into(),
        author: author.into(),
        permlink: permlink.into(),
        title: "t".into(),
        body: "b".into(),
        json_metadata: String::new(),
    })
}

#[test]
fn escrow_ratification_fee_and_release() {
    let mut chain = TestChain::new("escrow");
    chain.create_account("alice");
    chain.create_account("bob");
    chain.create_account("carol");
    chain.fund("alice", Asset::new(10_000, GBC));

    let now = chain.db.head_block_time();
    chain
        .push_ops(
            vec![Operation::EscrowTransfer(EscrowTransferOperation {
                from: "alice".into(),
                to: "bob".into(),
                agent: "carol".into(),
                escrow_id: 1,
                gbd_amount: Asset::zero(GBD),
                gbc_amount: Asset::new(5_000, GBC),
                fee: Asset::new(100, GBC),
                ratification_deadline: now + 3600,
                escrow_expiration: now + 7200,
                json_meta: String::new(),
            })],
            &["alice"],
        )
        .unwrap();
    chain.produce_block();
    assert_eq!(chain.balance("alice", GBC).amount, 4_900);

    for who in ["bob", "carol"] {
        chain
            .push_ops(
                vec![Operation::EscrowApprove(EscrowApproveOperation {
                    from: "alice".into(),
                    to: "bob".into(),
                    agent: "carol".into(),
                    who: who.into(),
                    escrow_id: 1,
                    approve: true,
                })],
                &[who],
            )
            .unwrap();
    }
    chain.produce_block();
    // the agent collected the fee at full ratification
    assert_eq!(chain.balance("carol", GBC).amount, 100);

    chain
        .push_ops(
            vec![Operation::EscrowRelease(EscrowReleaseOperation {
                from: "alice".into(),
                to: "bob".into(),
                agent: "carol".into(),
                who: "alice".into(),
                receiver: "bob".into(),
                escrow_id: 1,
                gbd_amount: Asset::zero(GBD),
                gbc_amount: Asset::new(5_000, GBC),
            })],
            &["alice"],
        )
        .unwrap();
    chain.produce_block();
    assert_eq!(chain.balance("bob", GBC).amount, 5_000);
    assert!(chain
        .db
        .state
        .escrows
        .find_by_key(&("alice".into(), 1))
        .is_none());
    chain.db.validate_invariants().unwrap();
}

#[test]
fn unratified_escrows_refund_at_the_deadline() {
    let mut chain = TestChain::new("escrowexp");
    chain.create_account("alice");
    chain.create_account("bob");
    chain.create_account("carol");
    chain.fund("alice", Asset::new(10_000, GBC));

    let now = chain.db.head_block_time();
    chain
        .push_ops(
            vec![Operation::EscrowTransfer(EscrowTransferOperation {
                from: "alice".into(),
                to: "bob".into(),
                agent: "carol".into(),
                escrow_id: 2,
                gbd_amount: Asset::zero(GBD),
                gbc_amount: Asset::new(5_000, GBC),
                fee: Asset::new(100, GBC),
                ratification_deadline: now + 600,
                escrow_expiration: now + 7200,
                json_meta: String::new(),
            })],
            &["alice"],
        )
        .unwrap();
    chain.produce_block();

    chain.skip_time(1200);
    assert_eq!(chain.balance("alice", GBC).amount, 10_000);
    chain.db.validate_invariants().unwrap();
}

#[test]
fn delegation_decrease_returns_after_the_delay() {
    let mut chain = TestChain::new("delegate");
    chain.create_account("alice");
    chain.create_account("bob");
    chain.fund("alice", Asset::new(1_000_000_000, GBC));
    chain.vest("alice", 1_000_000_000);

    let alice = chain.db.state.get_account(&"alice".into()).unwrap().clone();
    let half = Asset::new(alice.vesting_shares.amount / 2, GBS);

    chain
        .push_ops(
            vec![Operation::DelegateVestingShares(DelegateVestingSharesOperation {
                delegator: "alice".into(),
                delegatee: "bob".into(),
                vesting_shares: half,
            })],
            &["alice"],
        )
        .unwrap();
    chain.produce_block();

    let bob = chain.db.state.get_account(&"bob".into()).unwrap().clone();
    assert_eq!(bob.received_vesting_shares, half);
    let alice_now = chain.db.state.get_account(&"alice".into()).unwrap().clone();
    assert_eq!(alice_now.delegated_vesting_shares, half);

    // withdraw it entirely; the stake is in limbo until the return period
    chain
        .push_ops(
            vec![Operation::DelegateVestingShares(DelegateVestingSharesOperation {
                delegator: "alice".into(),
                delegatee: "bob".into(),
                vesting_shares: Asset::zero(GBS),
            })],
            &["alice"],
        )
        .unwrap();
    chain.produce_block();

    let bob = chain.db.state.get_account(&"bob".into()).unwrap().clone();
    assert_eq!(bob.received_vesting_shares.amount, 0);
    let alice_now = chain.db.state.get_account(&"alice".into()).unwrap().clone();
    assert_eq!(alice_now.delegated_vesting_shares, half, "still locked");

    chain.skip_time(config::DELEGATION_RETURN_PERIOD + 60);
    let alice_now = chain.db.state.get_account(&"alice".into()).unwrap().clone();
    assert_eq!(alice_now.delegated_vesting_shares.amount, 0);
    chain.db.validate_invariants().unwrap();
}

#[test]
fn hardfork_enables_claimed_accounts_and_reduces_vote_power_rate() {
    use gamebank_protocol::operations::{ClaimAccountOperation, CreateClaimedAccountOperation};

    let mut chain = TestChain::new("hardfork");
    chain.create_account("alice");
    chain.fund("alice", Asset::new(10_000, GBC));

    // before the fork, the claimed-account pair is rejected
    let err = chain
        .push_ops(
            vec![Operation::ClaimAccount(ClaimAccountOperation {
                creator: "alice".into(),
                fee: Asset::new(100, GBC),
            })],
            &["alice"],
        )
        .unwrap_err();
    assert!(matches!(err, ChainError::StatePrecondition(_)));

    // cross the scheduled fork time
    chain.skip_time(61 * 24 * 60 * 60);
    assert!(chain.db.has_hardfork(gamebank_chain::database::process::HARDFORK_0_1));
    assert_eq!(
        chain.db.state.dgp().vote_power_reserve_rate,
        config::REDUCED_VOTE_POWER_RATE
    );

    chain
        .push_ops(
            vec![Operation::ClaimAccount(ClaimAccountOperation {
                creator: "alice".into(),
                fee: Asset::new(100, GBC),
            })],
            &["alice"],
        )
        .unwrap();
    chain.produce_block();

    let key = TestChain::key("dave").public_key();
    chain
        .push_ops(
            vec![Operation::CreateClaimedAccount(CreateClaimedAccountOperation {
                creator: "alice".into(),
                new_account_name: "dave".into(),
                owner: Authority::single_key(key),
                active: Authority::single_key(key),
                posting: Authority::single_key(key),
                memo_key: key,
                json_metadata: String::new(),
            })],
            &["alice"],
        )
        .unwrap();
    chain.produce_block();
    assert!(chain.db.state.accounts.contains_key(&"dave".into()));
    chain.db.validate_invariants().unwrap();
}
