use serde::{Deserialize, Serialize};

use gamebank_protocol::asset::{Asset, GBC, GBD};
use gamebank_protocol::operations::BeneficiaryRoute;
use gamebank_protocol::types::{AccountName, Timestamp, TIMESTAMP_MAX};
use gamebank_store::TableObject;

/// A content item: a root post or a reply.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CommentObject {
    pub id: u64,
    pub author: AccountName,
    pub permlink: String,
    /// Empty for a root post.
    pub parent_author: AccountName,
    pub parent_permlink: String,
    /// Id of the root of this reply tree (self for a root post).
    pub root_comment: u64,
    pub depth: u16,
    pub children: u32,

    pub title: String,
    pub body: String,
    pub json_metadata: String,

    pub created: Timestamp,
    pub last_update: Timestamp,
    pub active: Timestamp,
    pub last_payout: Timestamp,
    /// When the payout runs; `TIMESTAMP_MAX` once archived.
    pub cashout_time: Timestamp,
    pub max_cashout_time: Timestamp,

    pub net_rshares: i64,
    pub abs_rshares: i64,
    pub vote_rshares: i64,
    pub children_abs_rshares: i64,
    pub total_vote_weight: u64,
    pub net_votes: i32,
    /// Basis-point scaling applied to the payout (rate limiting).
    pub reward_weight: u16,

    pub total_payout_value: Asset,
    pub curator_payout_value: Asset,
    pub beneficiary_payout_value: Asset,
    pub author_rewards: i64,

    pub max_accepted_payout: Asset,
    pub percent_gamebank_dollars: u16,
    pub allow_replies: bool,
    pub allow_votes: bool,
    pub allow_curation_rewards: bool,
    pub beneficiaries: Vec<BeneficiaryRoute>,
}

impl CommentObject {
    pub fn new(id: u64, author: AccountName, permlink: String, created: Timestamp) -> Self {
        CommentObject {
            id,
            author,
            permlink,
            parent_author: AccountName::default(),
            parent_permlink: String::new(),
            root_comment: id,
            depth: 0,
            children: 0,
            title: String::new(),
            body: String::new(),
            json_metadata: String::new(),
            created,
            last_update: created,
            active: created,
            last_payout: 0,
            cashout_time: TIMESTAMP_MAX,
            max_cashout_time: TIMESTAMP_MAX,
            net_rshares: 0,
            abs_rshares: 0,
            vote_rshares: 0,
            children_abs_rshares: 0,
            total_vote_weight: 0,
            net_votes: 0,
            reward_weight: gamebank_protocol::config::PERCENT_100 as u16,
            total_payout_value: Asset::zero(GBC),
            curator_payout_value: Asset::zero(GBC),
            beneficiary_payout_value: Asset::zero(GBC),
            author_rewards: 0,
            max_accepted_payout: Asset::new(1_000_000_000_000, GBD),
            percent_gamebank_dollars: gamebank_protocol::config::PERCENT_100 as u16,
            allow_replies: true,
            allow_votes: true,
            allow_curation_rewards: true,
            beneficiaries: Vec::new(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.parent_author.is_empty()
    }

    /// A comment stops accruing votes once its payout has run.
    pub fn is_archived(&self) -> bool {
        self.cashout_time == TIMESTAMP_MAX
    }
}

impl TableObject for CommentObject {
    type Key = (AccountName, String);
    type SortKey = Timestamp;

    fn id(&self) -> u64 {
        self.id
    }
    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
    fn key(&self) -> (AccountName, String) {
        (self.author.clone(), self.permlink.clone())
    }
    /// Ordered by cashout time for payout processing.
    fn sort_key(&self) -> Timestamp {
        self.cashout_time
    }
}

/// One account's live vote on one comment.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CommentVoteObject {
    pub id: u64,
    pub voter: u64,
    pub comment: u64,
    /// Pro-rata curation weight earned by this vote.
    pub weight: u64,
    pub rshares: i64,
    pub vote_percent: i16,
    pub last_update: Timestamp,
    /// −1 marks a vote whose comment has paid out (no further edits).
    pub num_changes: i32,
}

impl TableObject for CommentVoteObject {
    type Key = (u64, u64);
    type SortKey = ();

    fn id(&self) -> u64 {
        self.id
    }
    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
    fn key(&self) -> (u64, u64) {
        (self.comment, self.voter)
    }
    fn sort_key(&self) {}
}
