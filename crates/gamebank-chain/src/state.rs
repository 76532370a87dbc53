use gamebank_protocol::error::ChainError;
use gamebank_protocol::types::AccountName;
use gamebank_store::Table;

use crate::objects::*;

/// Every chain table plus the store-wide revision counter.
///
/// The revision tracks the head block number; undo layers opened while
/// applying block N are tagged N so that `commit(lib)` can discard exactly
/// the layers that became irreversible.
#[derive(Default)]
pub struct State {
    pub accounts: Table<AccountObject>,
    pub owner_auth_history: Table<OwnerAuthorityHistoryObject>,
    pub account_recovery_requests: Table<AccountRecoveryRequestObject>,
    pub change_recovery_requests: Table<ChangeRecoveryAccountRequestObject>,
    pub decline_voting_requests: Table<DeclineVotingRightsRequestObject>,
    pub withdraw_routes: Table<WithdrawVestingRouteObject>,
    pub vesting_delegations: Table<VestingDelegationObject>,
    pub delegation_expirations: Table<VestingDelegationExpirationObject>,

    pub witnesses: Table<WitnessObject>,
    pub witness_votes: Table<WitnessVoteObject>,
    pub witness_schedule: Table<WitnessScheduleObject>,

    pub comments: Table<CommentObject>,
    pub comment_votes: Table<CommentVoteObject>,

    pub limit_orders: Table<LimitOrderObject>,
    pub convert_requests: Table<ConvertRequestObject>,
    pub liquidity_rewards: Table<LiquidityRewardBalanceObject>,

    pub escrows: Table<EscrowObject>,
    pub savings_withdraws: Table<SavingsWithdrawObject>,

    pub crowdfundings: Table<CrowdfundingObject>,
    pub crowdfunding_invests: Table<CrowdfundingInvestObject>,
    pub nonfungible_funds: Table<NonfungibleFundObject>,
    pub nonfungible_funds_on_sale: Table<NonfungibleFundOnSaleObject>,

    pub contracts: Table<ContractObject>,
    pub contract_users: Table<ContractUserObject>,

    pub globals: Table<DynamicGlobalPropertyObject>,
    pub feed_history: Table<FeedHistoryObject>,
    pub hardfork_property: Table<HardforkPropertyObject>,
    pub block_summaries: Table<BlockSummaryObject>,
    pub transactions: Table<TransactionObject>,
    pub reward_funds: Table<RewardFundObject>,

    revision: u64,
    session_depth: usize,
}

macro_rules! for_each_table {
    ($self:ident, $method:ident $( ( $($arg:expr),* ) )? ) => {{
        $self.accounts.$method($($($arg),*)?);
        $self.owner_auth_history.$method($($($arg),*)?);
        $self.account_recovery_requests.$method($($($arg),*)?);
        $self.change_recovery_requests.$method($($($arg),*)?);
        $self.decline_voting_requests.$method($($($arg),*)?);
        $self.withdraw_routes.$method($($($arg),*)?);
        $self.vesting_delegations.$method($($($arg),*)?);
        $self.delegation_expirations.$method($($($arg),*)?);
        $self.witnesses.$method($($($arg),*)?);
        $self.witness_votes.$method($($($arg),*)?);
        $self.witness_schedule.$method($($($arg),*)?);
        $self.comments.$method($($($arg),*)?);
        $self.comment_votes.$method($($($arg),*)?);
        $self.limit_orders.$method($($($arg),*)?);
        $self.convert_requests.$method($($($arg),*)?);
        $self.liquidity_rewards.$method($($($arg),*)?);
        $self.escrows.$method($($($arg),*)?);
        $self.savings_withdraws.$method($($($arg),*)?);
        $self.crowdfundings.$method($($($arg),*)?);
        $self.crowdfunding_invests.$method($($($arg),*)?);
        $self.nonfungible_funds.$method($($($arg),*)?);
        $self.nonfungible_funds_on_sale.$method($($($arg),*)?);
        $self.contracts.$method($($($arg),*)?);
        $self.contract_users.$method($($($arg),*)?);
        $self.globals.$method($($($arg),*)?);
        $self.feed_history.$method($($($arg),*)?);
        $self.hardfork_property.$method($($($arg),*)?);
        $self.block_summaries.$method($($($arg),*)?);
        $self.transactions.$method($($($arg),*)?);
        $self.reward_funds.$method($($($arg),*)?);
    }};
}

impl State {
    pub fn new() -> Self {
        State::default()
    }

    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn set_revision(&mut self, revision: u64) {
        assert_eq!(self.session_depth, 0, "cannot set revision inside a session");
        self.revision = revision;
    }

    pub fn session_depth(&self) -> usize {
        self.session_depth
    }

    /// Open a nested undo session across every table.
    pub fn begin_session(&mut self) {
        self.revision += 1;
        let revision = self.revision;
        for_each_table!(self, begin(revision));
        self.session_depth += 1;
    }

    /// Roll back the newest session.
    pub fn undo_session(&mut self) {
        if self.session_depth == 0 {
            return;
        }
        for_each_table!(self, undo());
        self.session_depth -= 1;
        self.revision -= 1;
    }

    /// Merge the newest session into its parent.
    pub fn squash_session(&mut self) {
        if self.session_depth < 2 {
            return;
        }
        for_each_table!(self, squash());
        self.session_depth -= 1;
        self.revision -= 1;
    }

    /// Make every session at or below `revision` permanent.
    pub fn commit(&mut self, revision: u64) {
        // sessions carry contiguous revisions ending at self.revision
        let depth = self.session_depth as u64;
        if depth == 0 {
            return;
        }
        let first = self.revision + 1 - depth;
        let dropped = if revision < first {
            0
        } else {
            (revision - first + 1).min(depth)
        };
        for_each_table!(self, commit(revision));
        self.session_depth -= dropped as usize;
    }

    /// Roll back every open session.
    pub fn undo_all(&mut self) {
        while self.session_depth > 0 {
            self.undo_session();
        }
    }

    /// Wipe all state (reindex).
    pub fn clear(&mut self) {
        *self = State::default();
    }

    // ── Typed getters ────────────────────────────────────────────────────────

    pub fn dgp(&self) -> &DynamicGlobalPropertyObject {
        self.globals.find(0).expect("global properties exist after genesis")
    }

    pub fn modify_dgp(&mut self, f: impl FnOnce(&mut DynamicGlobalPropertyObject)) {
        self.globals.modify(0, f);
    }

    pub fn feed(&self) -> &FeedHistoryObject {
        self.feed_history.find(0).expect("feed history exists after genesis")
    }

    pub fn modify_feed(&mut self, f: impl FnOnce(&mut FeedHistoryObject)) {
        self.feed_history.modify(0, f);
    }

    pub fn schedule(&self) -> &WitnessScheduleObject {
        self.witness_schedule.find(0).expect("witness schedule exists after genesis")
    }

    pub fn modify_schedule(&mut self, f: impl FnOnce(&mut WitnessScheduleObject)) {
        self.witness_schedule.modify(0, f);
    }

    pub fn hardforks(&self) -> &HardforkPropertyObject {
        self.hardfork_property.find(0).expect("hardfork property exists after genesis")
    }

    pub fn modify_hardforks(&mut self, f: impl FnOnce(&mut HardforkPropertyObject)) {
        self.hardfork_property.modify(0, f);
    }

    pub fn get_account(&self, name: &AccountName) -> Result<&AccountObject, ChainError> {
        self.accounts
            .find_by_key(name)
            .ok_or_else(|| ChainError::StatePrecondition(format!("unknown account: {name}")))
    }

    pub fn get_witness(&self, name: &AccountName) -> Result<&WitnessObject, ChainError> {
        self.witnesses
            .find_by_key(name)
            .ok_or_else(|| ChainError::StatePrecondition(format!("unknown witness: {name}")))
    }

    pub fn get_comment(
        &self,
        author: &AccountName,
        permlink: &str,
    ) -> Result<&CommentObject, ChainError> {
        self.comments
            .find_by_key(&(author.clone(), permlink.to_string()))
            .ok_or_else(|| {
                ChainError::StatePrecondition(format!("unknown comment: {author}/{permlink}"))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gamebank_protocol::asset::{Asset, GBC};

    fn seeded_state() -> State {
        let mut s = State::new();
        s.globals.insert(DynamicGlobalPropertyObject::new);
        s.accounts
            .insert(|id| AccountObject::new(id, "alice".into(), 0));
        s
    }

    #[test]
    fn session_undo_spans_all_tables() {
        let mut s = seeded_state();
        s.begin_session();
        let alice_id = s.get_account(&"alice".into()).unwrap().id;
        s.accounts.modify(alice_id, |a| a.balance = Asset::new(5, GBC));
        s.witnesses
            .insert(|id| WitnessObject::new(id, "alice".into(), 0));
        s.undo_session();

        assert_eq!(s.get_account(&"alice".into()).unwrap().balance.amount, 0);
        assert!(s.witnesses.find_by_key(&"alice".into()).is_none());
    }

    #[test]
    fn commit_makes_layers_permanent() {
        let mut s = seeded_state();
        s.set_revision(10);
        let alice_id = s.get_account(&"alice".into()).unwrap().id;

        s.begin_session(); // revision 11
        s.accounts.modify(alice_id, |a| a.balance = Asset::new(1, GBC));
        s.begin_session(); // revision 12
        s.accounts.modify(alice_id, |a| a.balance = Asset::new(2, GBC));

        s.commit(11);
        assert_eq!(s.session_depth(), 1);
        s.undo_all();
        assert_eq!(s.get_account(&"alice".into()).unwrap().balance.amount, 1);
    }

    #[test]
    fn squash_folds_into_parent() {
        let mut s = seeded_state();
        let alice_id = s.get_account(&"alice".into()).unwrap().id;
        s.begin_session();
        s.begin_session();
        s.accounts.modify(alice_id, |a| a.balance = Asset::new(9, GBC));
        s.squash_session();
        assert_eq!(s.session_depth(), 1);
        s.undo_session();
        assert_eq!(s.get_account(&"alice".into()).unwrap().balance.amount, 0);
    }
}
