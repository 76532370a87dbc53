use gamebank_protocol::config;
use gamebank_protocol::ensure;
use gamebank_protocol::error::ChainError;
use gamebank_protocol::operations::{
    CommentOperation, CommentOptionsOperation, DeleteCommentOperation, VoteOperation,
};
use gamebank_protocol::types::TIMESTAMP_MAX;

use crate::database::{process::HARDFORK_0_1, Database};
use crate::objects::{CommentObject, CommentVoteObject};
use crate::rewards::evaluate_reward_curve;

pub fn vote(db: &mut Database, o: &VoteOperation) -> Result<(), ChainError> {
    let comment = db.state.get_comment(&o.author, &o.permlink)?.clone();
    let voter = db.state.get_account(&o.voter)?.clone();
    let now = db.head_block_time();

    ensure!(voter.can_vote, ChainError::StatePrecondition, "voter has declined voting rights");
    if o.weight > 0 {
        ensure!(comment.allow_votes, ChainError::StatePrecondition, "votes are not allowed on this comment");
    }

    let existing = db
        .state
        .comment_votes
        .find_by_key(&(comment.id, voter.id))
        .cloned();

    // archived comments only record bookkeeping edits
    if comment.is_archived() {
        match existing {
            None => {
                db.state.comment_votes.insert(|id| CommentVoteObject {
                    id,
                    voter: voter.id,
                    comment: comment.id,
                    weight: 0,
                    rshares: 0,
                    vote_percent: o.weight,
                    last_update: now,
                    num_changes: -1,
                });
            }
            Some(vote) => {
                ensure!(
                    vote.num_changes != -1,
                    ChainError::StatePrecondition,
                    "cannot vote again on a comment after payout"
                );
                db.state.comment_votes.modify(vote.id, |v| {
                    v.vote_percent = o.weight;
                    v.last_update = now;
                });
            }
        }
        return Ok(());
    }

    let elapsed = now - voter.last_vote_time;
    ensure!(
        elapsed >= config::MIN_VOTE_INTERVAL_SEC,
        ChainError::StatePrecondition,
        "can only vote once every {} seconds",
        config::MIN_VOTE_INTERVAL_SEC
    );

    let regenerated = (config::PERCENT_100 as i64 * elapsed) / config::VOTE_REGENERATION_SECONDS;
    let current_power = (voter.voting_power as i64 + regenerated).min(config::PERCENT_100 as i64);
    ensure!(current_power > 0, ChainError::StatePrecondition, "account has no voting power");

    let abs_weight = o.weight.unsigned_abs() as i64;
    let mut used_power = (current_power * abs_weight / config::PERCENT_100 as i64) * (60 * 60 * 24);
    let max_vote_denom =
        db.state.dgp().vote_power_reserve_rate as i64 * config::VOTE_REGENERATION_SECONDS;
    used_power = (used_power + max_vote_denom - 1) / max_vote_denom;
    ensure!(
        used_power <= current_power,
        ChainError::StatePrecondition,
        "account does not have enough power to vote"
    );

    let effective = db.get_effective_vesting_shares(&voter);
    let mut abs_rshares =
        (effective.amount as i128 * used_power as i128 / config::PERCENT_100 as i128) as i64;

    if db.has_hardfork(HARDFORK_0_1) {
        abs_rshares = (abs_rshares - config::VOTE_DUST_THRESHOLD).max(0);
    } else {
        ensure!(
            abs_rshares > config::VOTE_DUST_THRESHOLD || o.weight == 0,
            ChainError::StatePrecondition,
            "voting weight is too small, please accumulate more voting power"
        );
    }

    if let Some(vote) = existing {
        ensure!(
            vote.num_changes != -1,
            ChainError::StatePrecondition,
            "cannot vote again on a comment after payout"
        );
        ensure!(
            vote.num_changes < config::MAX_VOTE_CHANGES,
            ChainError::StatePrecondition,
            "voter has used the maximum number of vote changes on this comment"
        );
        ensure!(
            vote.vote_percent != o.weight,
            ChainError::StatePrecondition,
            "you have already voted in a similar way"
        );
        let rshares = if o.weight < 0 { -abs_rshares } else { abs_rshares };
        if rshares > 0 {
            ensure!(
                now < comment.cashout_time - config::UPVOTE_LOCKOUT_SECONDS,
                ChainError::StatePrecondition,
                "cannot increase payout within the upvote lockout window"
            );
        }

        db.state.accounts.modify(voter.id, |a| {
            a.voting_power = (current_power - used_power) as u16;
            a.last_vote_time = now;
        });

        let old_rshares = vote.rshares;
        db.state.comments.modify(comment.id, |c| {
            c.net_rshares -= old_rshares;
            c.net_rshares += rshares;
            c.abs_rshares += abs_rshares;
            c.net_votes += match (rshares.signum(), old_rshares.signum()) {
                (1, -1) => 2,
                (1, 0) => 1,
                (0, -1) => 1,
                (0, 1) => -1,
                (-1, 0) => -1,
                (-1, 1) => -2,
                _ => 0,
            };
            // an edited vote forfeits its curation weight
            c.total_vote_weight -= vote.weight;
        });
        let root_id = comment.root_comment;
        db.state
            .comments
            .modify(root_id, |c| c.children_abs_rshares += abs_rshares);
        db.state.comment_votes.modify(vote.id, |v| {
            v.rshares = rshares;
            v.vote_percent = o.weight;
            v.last_update = now;
            v.weight = 0;
            v.num_changes += 1;
        });
        return Ok(());
    }

    // first vote on this comment by this account
    ensure!(o.weight != 0, ChainError::StatePrecondition, "vote weight cannot be 0");
    ensure!(abs_rshares > 0, ChainError::StatePrecondition, "cannot vote with 0 rshares");
    let rshares = if o.weight < 0 { -abs_rshares } else { abs_rshares };
    if rshares > 0 {
        ensure!(
            now < comment.cashout_time - config::UPVOTE_LOCKOUT_SECONDS,
            ChainError::StatePrecondition,
            "cannot increase payout within the upvote lockout window"
        );
    }

    db.state.accounts.modify(voter.id, |a| {
        a.voting_power = (current_power - used_power) as u16;
        a.last_vote_time = now;
    });

    let old_vote_rshares = comment.vote_rshares;
    db.state.comments.modify(comment.id, |c| {
        c.net_rshares += rshares;
        c.abs_rshares += abs_rshares;
        if rshares > 0 {
            c.vote_rshares += rshares;
            c.net_votes += 1;
        } else {
            c.net_votes -= 1;
        }
    });
    let root_id = comment.root_comment;
    db.state
        .comments
        .modify(root_id, |c| c.children_abs_rshares += abs_rshares);

    // curation weight: the marginal claim this vote adds to the comment's
    // vote-rshares curve, discounted linearly inside the reverse auction
    let comment_after = db.state.comments.find(comment.id).unwrap().clone();
    let curation_eligible = rshares > 0
        && comment.last_payout == 0
        && comment.allow_curation_rewards
        && db.get_curation_rewards_percent(&comment) > 0;
    let weight: u64 = if curation_eligible {
        let fund = db.get_reward_fund(&comment)?;
        let curve = fund.curation_reward_curve;
        let constant = fund.content_constant;
        let old_weight =
            evaluate_reward_curve(old_vote_rshares.max(0) as u128, curve, constant);
        let new_weight =
            evaluate_reward_curve(comment_after.vote_rshares.max(0) as u128, curve, constant);
        let raw = (new_weight - old_weight).min(u64::MAX as u128) as u64;

        let delta_t =
            ((now - comment.created).min(config::REVERSE_AUCTION_WINDOW_SECONDS)).max(0) as u128;
        (raw as u128 * delta_t / config::REVERSE_AUCTION_WINDOW_SECONDS as u128) as u64
    } else {
        0
    };

    db.state.comment_votes.insert(|id| CommentVoteObject {
        id,
        voter: voter.id,
        comment: comment.id,
        weight,
        rshares,
        vote_percent: o.weight,
        last_update: now,
        num_changes: 0,
    });
    if weight > 0 {
        db.state
            .comments
            .modify(comment.id, |c| c.total_vote_weight += weight);
    }
    Ok(())
}

pub fn comment(db: &mut Database, o: &CommentOperation) -> Result<(), ChainError> {
    let now = db.head_block_time();
    let author = db.state.get_account(&o.author)?.clone();

    let existing = db
        .state
        .comments
        .find_by_key(&(o.author.clone(), o.permlink.clone()))
        .cloned();

    if let Some(comment) = existing {
        // edit
        ensure!(
            comment.parent_author == o.parent_author
                && comment.parent_permlink == o.parent_permlink,
            ChainError::StatePrecondition,
            "the parent of a comment cannot be changed"
        );
        db.state.comments.modify(comment.id, |c| {
            c.title = o.title.clone();
            c.body = o.body.clone();
            c.json_metadata = o.json_metadata.clone();
            c.last_update = now;
            c.active = now;
        });
        return Ok(());
    }

    let parent = if o.parent_author.is_empty() {
        ensure!(
            now - author.last_root_post >= config::MIN_ROOT_COMMENT_INTERVAL,
            ChainError::StatePrecondition,
            "you may only post once every {} seconds",
            config::MIN_ROOT_COMMENT_INTERVAL
        );
        None
    } else {
        let parent = db.state.get_comment(&o.parent_author, &o.parent_permlink)?.clone();
        ensure!(
            parent.depth < config::MAX_COMMENT_DEPTH,
            ChainError::StatePrecondition,
            "comment is nested too deeply"
        );
        ensure!(parent.allow_replies, ChainError::StatePrecondition, "the parent does not allow replies");
        let reply_interval = if db.has_hardfork(HARDFORK_0_1) {
            config::MIN_REPLY_INTERVAL_HF1
        } else {
            config::MIN_REPLY_INTERVAL
        };
        ensure!(
            now - author.last_post >= reply_interval,
            ChainError::StatePrecondition,
            "you may only reply once every {reply_interval} seconds"
        );
        Some(parent)
    };

    db.state.accounts.modify(author.id, |a| {
        a.last_post = now;
        if o.parent_author.is_empty() {
            a.last_root_post = now;
        }
        a.post_count += 1;
    });

    let author_name = o.author.clone();
    let permlink = o.permlink.clone();
    let parent_ref = parent.as_ref();
    let depth = parent_ref.map(|p| p.depth + 1).unwrap_or(0);
    let root = parent_ref.map(|p| p.root_comment);
    db.state.comments.insert(|id| {
        let mut c = CommentObject::new(id, author_name, permlink, now);
        c.parent_author = o.parent_author.clone();
        c.parent_permlink = o.parent_permlink.clone();
        c.depth = depth;
        c.root_comment = root.unwrap_or(id);
        c.title = o.title.clone();
        c.body = o.body.clone();
        c.json_metadata = o.json_metadata.clone();
        c.cashout_time = now + config::CASHOUT_WINDOW_SECONDS;
        c.max_cashout_time = TIMESTAMP_MAX;
        c
    });

    if let Some(parent) = parent {
        db.state.comments.modify(parent.id, |c| {
            c.children += 1;
            c.active = now;
        });
    }
    Ok(())
}

pub fn comment_options(db: &mut Database, o: &CommentOptionsOperation) -> Result<(), ChainError> {
    let comment = db.state.get_comment(&o.author, &o.permlink)?.clone();

    ensure!(
        comment.abs_rshares == 0
            || (o.max_accepted_payout <= comment.max_accepted_payout
                && o.percent_gamebank_dollars <= comment.percent_gamebank_dollars
                && o.allow_votes <= comment.allow_votes
                && o.allow_curation_rewards <= comment.allow_curation_rewards),
        ChainError::StatePrecondition,
        "comment options may only be tightened once the comment has votes"
    );

    if !o.beneficiaries.is_empty() {
        ensure!(
            comment.beneficiaries.is_empty(),
            ChainError::StatePrecondition,
            "beneficiaries may only be specified once"
        );
        ensure!(
            comment.abs_rshares == 0,
            ChainError::StatePrecondition,
            "beneficiaries must be set before the comment receives votes"
        );
        for route in &o.beneficiaries {
            db.state.get_account(&route.account)?;
        }
    }

    db.state.comments.modify(comment.id, |c| {
        c.max_accepted_payout = o.max_accepted_payout;
        c.percent_gamebank_dollars = o.percent_gamebank_dollars;
        c.allow_votes = o.allow_votes;
        c.allow_curation_rewards = o.allow_curation_rewards;
        if !o.beneficiaries.is_empty() {
            c.beneficiaries = o.beneficiaries.clone();
        }
    });
    Ok(())
}

pub fn delete_comment(db: &mut Database, o: &DeleteCommentOperation) -> Result<(), ChainError> {
    let comment = db.state.get_comment(&o.author, &o.permlink)?.clone();
    ensure!(
        comment.children == 0,
        ChainError::StatePrecondition,
        "cannot delete a comment with replies"
    );
    ensure!(
        comment.net_rshares <= 0,
        ChainError::StatePrecondition,
        "cannot delete a comment with net positive votes"
    );
    ensure!(
        !comment.is_archived(),
        ChainError::StatePrecondition,
        "cannot delete a comment past its payout"
    );

    let vote_ids: Vec<u64> = db
        .state
        .comment_votes
        .iter_by_key_range((comment.id, 0)..(comment.id, u64::MAX))
        .map(|v| v.id)
        .collect();
    for id in vote_ids {
        db.state.comment_votes.remove(id);
    }

    if !comment.parent_author.is_empty() {
        if let Some(parent) = db
            .state
            .comments
            .find_by_key(&(comment.parent_author.clone(), comment.parent_permlink.clone()))
        {
            let parent_id = parent.id;
            db.state.comments.modify(parent_id, |c| c.children -= 1);
        }
    }
    db.state.comments.remove(comment.id);
    Ok(())
}
