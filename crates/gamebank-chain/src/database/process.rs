use tracing::{debug, info};

use gamebank_protocol::asset::{asset_times_price, Asset, GBC, GBD, GBS};
use gamebank_protocol::config;
use gamebank_protocol::error::ChainError;
use gamebank_protocol::operations::VirtualOperation;
use gamebank_protocol::types::{AccountName, Timestamp, TIMESTAMP_MAX};
use gamebank_protocol::version::HardforkVersion;

use crate::objects::{CommentObject, WitnessScheduleKind, CROWDFUNDING_FUNDED, CROWDFUNDING_REFUNDED};
use crate::rewards::{
    evaluate_reward_curve, get_rshare_reward, CommentRewardContext,
};

use super::Database;

/// The activation calendar. One entry per hardfork, in order.
pub const HARDFORK_0_1: u32 = 1;
pub const HARDFORK_0_1_VERSION: HardforkVersion = HardforkVersion(
    gamebank_protocol::version::Version((0 << 24) | (1 << 16)),
);
/// 60 days past genesis.
pub const HARDFORK_0_1_TIME: Timestamp = config::GENESIS_TIME + 60 * 24 * 60 * 60;

impl Database {
    pub fn has_hardfork(&self, hardfork: u32) -> bool {
        self.state.hardforks().last_hardfork >= hardfork
    }

    // ── Inflation ────────────────────────────────────────────────────────────

    /// Mint the per-block inflation: 75% to the content reward funds, 15% to
    /// the vesting fund, the rest to the producing witness as vesting.
    pub(crate) fn process_funds(&mut self) -> Result<(), ChainError> {
        let dgp = self.state.dgp().clone();
        let schedule = self.state.schedule().clone();

        let inflation_rate = crate::rewards::current_inflation_rate(dgp.head_block_number);
        let new_gbc = (dgp.virtual_supply.amount as i128 * inflation_rate as i128
            / (config::PERCENT_100 as i128 * config::BLOCKS_PER_YEAR as i128))
            as i64;

        let content_reward = new_gbc * config::CONTENT_REWARD_PERCENT as i64 / config::PERCENT_100 as i64;
        let content_reward = self.pay_reward_funds(content_reward);
        let vesting_reward = new_gbc * config::VESTING_FUND_PERCENT as i64 / config::PERCENT_100 as i64;
        let mut witness_reward = new_gbc - content_reward - vesting_reward;

        let cwit = self.state.get_witness(&dgp.current_witness)?.clone();
        witness_reward *= config::MAX_WITNESSES as i64;
        witness_reward *= match cwit.schedule {
            WitnessScheduleKind::Timeshare => schedule.timeshare_weight as i64,
            WitnessScheduleKind::Miner => schedule.miner_weight as i64,
            WitnessScheduleKind::Elected => schedule.elected_weight as i64,
            WitnessScheduleKind::None => {
                debug!(witness = %cwit.owner, "producing witness has no schedule kind");
                schedule.elected_weight as i64
            }
        };
        witness_reward /= schedule.witness_pay_normalization_factor as i64;

        let new_gbc = content_reward + vesting_reward + witness_reward;
        self.state.modify_dgp(|dgp| {
            dgp.total_vesting_fund_gbc += Asset::new(vesting_reward, GBC);
            dgp.current_supply += Asset::new(new_gbc, GBC);
            dgp.virtual_supply += Asset::new(new_gbc, GBC);
        });

        let producer_vests =
            self.create_vesting(&cwit.owner, Asset::new(witness_reward, GBC), false)?;
        self.push_virtual_operation(VirtualOperation::ProducerReward {
            producer: cwit.owner.clone(),
            vesting_shares: producer_vests,
        });
        Ok(())
    }

    /// Distribute the per-block content reward across the reward funds
    /// pro-rata to their declared percent. Returns the amount actually paid.
    fn pay_reward_funds(&mut self, reward: i64) -> i64 {
        let funds: Vec<u64> = self.state.reward_funds.iter().map(|f| f.id).collect();
        let mut used = 0;
        for id in funds {
            let percent = self
                .state
                .reward_funds
                .find(id)
                .map(|f| f.percent_content_rewards)
                .unwrap_or(0) as i64;
            let share = reward * percent / config::PERCENT_100 as i64;
            self.state
                .reward_funds
                .modify(id, |f| f.reward_balance += Asset::new(share, GBC));
            used += share;
        }
        used
    }

    // ── Conversions ──────────────────────────────────────────────────────────

    /// Execute matured GBD → GBC conversion requests at the current median.
    pub(crate) fn process_conversions(&mut self) {
        let now = self.head_block_time();
        let feed = self.state.feed().current_median_history;
        if feed.is_null() {
            return;
        }

        let mut net_gbd = Asset::zero(GBD);
        let mut net_gbc = Asset::zero(GBC);

        loop {
            let Some(first) = self.state.convert_requests.first_by_sort() else {
                break;
            };
            if first.conversion_date > now {
                break;
            }
            let request = first.clone();
            let amount_out = asset_times_price(request.amount, feed);

            if let Ok(owner) = self.state.get_account(&request.owner) {
                let owner_id = owner.id;
                self.state
                    .accounts
                    .modify(owner_id, |a| a.balance += amount_out);
            }
            net_gbd += request.amount;
            net_gbc += amount_out;

            self.push_virtual_operation(VirtualOperation::FillConvertRequest {
                owner: request.owner.clone(),
                request_id: request.request_id,
                amount_in: request.amount,
                amount_out,
            });
            self.state.convert_requests.remove(request.id);
        }

        if net_gbd.amount > 0 {
            self.state.modify_dgp(|dgp| {
                dgp.current_supply += net_gbc;
                dgp.current_gbd_supply -= net_gbd;
                dgp.virtual_supply += net_gbc;
                dgp.virtual_supply -= asset_times_price(net_gbd, feed);
            });
        }
    }

    // ── Comment cashout ──────────────────────────────────────────────────────

    /// Pay out every comment whose cashout window has closed.
    pub(crate) fn process_comment_cashout(&mut self) -> Result<(), ChainError> {
        let now = self.head_block_time();
        let feed = self.state.feed().current_median_history;

        // decay each fund's recent claims, then snapshot
        let fund_ids: Vec<u64> = self.state.reward_funds.iter().map(|f| f.id).collect();
        for id in &fund_ids {
            self.state.reward_funds.modify(*id, |rfo| {
                // a gap longer than the decay horizon empties the pool
                let elapsed = ((now - rfo.last_update).max(0) as u128)
                    .min(config::RECENT_RSHARES_DECAY_SECONDS as u128);
                rfo.recent_claims -= rfo.recent_claims * elapsed
                    / config::RECENT_RSHARES_DECAY_SECONDS as u128;
                rfo.last_update = now;
            });
        }

        // add the due comments' claims first so every payout in this block
        // sees the same per-rshare price
        let due: Vec<u64> = self
            .state
            .comments
            .iter_by_sort()
            .take_while(|c| c.cashout_time <= now)
            .map(|c| c.id)
            .collect();
        if due.is_empty() {
            return Ok(());
        }

        for comment_id in &due {
            let comment = self.state.comments.find(*comment_id).unwrap().clone();
            if comment.net_rshares > 0 {
                let fund = self.get_reward_fund(&comment)?.clone();
                let claim = evaluate_reward_curve(
                    comment.net_rshares as u128,
                    fund.author_reward_curve,
                    fund.content_constant,
                );
                self.state
                    .reward_funds
                    .modify(fund.id, |f| f.recent_claims += claim);
            }
        }

        let forward_curation_remainder = !self.has_hardfork(HARDFORK_0_1);
        for comment_id in due {
            let comment = self.state.comments.find(comment_id).unwrap().clone();
            let fund = self.get_reward_fund(&comment)?.clone();
            let ctx = CommentRewardContext {
                rshares: comment.net_rshares,
                reward_weight: comment.reward_weight,
                max_gbd: comment.max_accepted_payout,
                total_reward_shares: fund.recent_claims,
                total_reward_fund_gbc: fund.reward_balance,
                current_gbc_price: feed,
                reward_curve: fund.author_reward_curve,
                content_constant: fund.content_constant,
            };
            let awarded =
                self.cashout_comment_helper(&ctx, &comment, forward_curation_remainder)?;
            if awarded > 0 {
                self.state
                    .reward_funds
                    .modify(fund.id, |f| f.reward_balance -= Asset::new(awarded, GBC));
            }
        }
        Ok(())
    }

    pub(crate) fn get_reward_fund(
        &self,
        comment: &CommentObject,
    ) -> Result<&crate::objects::RewardFundObject, ChainError> {
        let name = if comment.is_root() {
            config::POST_REWARD_FUND_NAME
        } else {
            config::COMMENT_REWARD_FUND_NAME
        };
        self.state
            .reward_funds
            .find_by_key(&name.to_string())
            .ok_or_else(|| ChainError::Invariant(format!("reward fund {name} missing")))
    }

    /// Pay one comment: curators pro-rata by recorded weight, beneficiaries
    /// by declared route, and the author half liquid, half vesting.
    fn cashout_comment_helper(
        &mut self,
        ctx: &CommentRewardContext,
        comment: &CommentObject,
        forward_curation_remainder: bool,
    ) -> Result<i64, ChainError> {
        let mut claimed_reward = 0i64;

        if comment.net_rshares > 0 {
            let reward = get_rshare_reward(ctx);
            if reward > 0 {
                let mut curation_tokens = (reward as i128
                    * self.get_curation_rewards_percent(comment) as i128
                    / config::PERCENT_100 as i128) as i64;
                let mut author_tokens = reward - curation_tokens;

                let curation_remainder = self.pay_curators(comment, &mut curation_tokens)?;
                if forward_curation_remainder {
                    author_tokens += curation_remainder;
                }

                let mut total_beneficiary = 0i64;
                claimed_reward = author_tokens + curation_tokens;

                for route in &comment.beneficiaries {
                    let benefactor_tokens =
                        author_tokens * route.weight as i64 / config::PERCENT_100 as i64;
                    let vest_created = self.create_vesting(
                        &route.account,
                        Asset::new(benefactor_tokens, GBC),
                        true,
                    )?;
                    self.push_virtual_operation(VirtualOperation::CommentBenefactorReward {
                        benefactor: route.account.clone(),
                        author: comment.author.clone(),
                        permlink: comment.permlink.clone(),
                        reward: vest_created,
                    });
                    total_beneficiary += benefactor_tokens;
                }
                let author_tokens = author_tokens - total_beneficiary;

                let gbc_to_author = author_tokens / 2;
                let vesting_gbc = author_tokens - gbc_to_author;

                let vest_created =
                    self.create_vesting(&comment.author, Asset::new(vesting_gbc, GBC), true)?;
                self.adjust_reward_balance(
                    &comment.author,
                    Asset::new(gbc_to_author, GBC),
                    Asset::zero(GBS),
                )?;

                self.state.comments.modify(comment.id, |c| {
                    c.total_payout_value += Asset::new(gbc_to_author, GBC);
                    c.curator_payout_value += Asset::new(curation_tokens, GBC);
                    c.beneficiary_payout_value += Asset::new(total_beneficiary, GBC);
                    c.author_rewards += author_tokens;
                });
                let author_id = self.state.get_account(&comment.author)?.id;
                self.state
                    .accounts
                    .modify(author_id, |a| a.posting_rewards += author_tokens);

                self.push_virtual_operation(VirtualOperation::AuthorReward {
                    author: comment.author.clone(),
                    permlink: comment.permlink.clone(),
                    gbd_payout: Asset::zero(GBD),
                    gbc_payout: Asset::new(gbc_to_author, GBC),
                    vesting_payout: vest_created,
                });
                self.push_virtual_operation(VirtualOperation::CommentReward {
                    author: comment.author.clone(),
                    permlink: comment.permlink.clone(),
                    payout: Asset::new(claimed_reward, GBC),
                });
            }
        }

        let now = self.head_block_time();
        self.state.comments.modify(comment.id, |c| {
            if c.net_rshares > 0 {
                c.net_rshares = 0;
            }
            c.children_abs_rshares = 0;
            c.abs_rshares = 0;
            c.vote_rshares = 0;
            c.total_vote_weight = 0;
            c.max_cashout_time = TIMESTAMP_MAX;
            c.cashout_time = TIMESTAMP_MAX;
            c.last_payout = now;
        });
        self.push_virtual_operation(VirtualOperation::CommentPayoutUpdate {
            author: comment.author.clone(),
            permlink: comment.permlink.clone(),
        });

        // votes on an archived comment can never be edited again
        let vote_ids: Vec<u64> = self
            .state
            .comment_votes
            .iter_by_key_range((comment.id, 0)..(comment.id, u64::MAX))
            .map(|v| v.id)
            .collect();
        for vote_id in vote_ids {
            self.state.comment_votes.modify(vote_id, |v| v.num_changes = -1);
        }

        Ok(claimed_reward)
    }

    pub(crate) fn get_curation_rewards_percent(&self, comment: &CommentObject) -> u16 {
        if !comment.allow_curation_rewards {
            return 0;
        }
        self.get_reward_fund(comment)
            .map(|f| f.percent_curation_rewards)
            .unwrap_or(0)
    }

    /// Split `max_rewards` across the comment's voters pro-rata to their
    /// recorded curation weight. Unclaimed dust is returned and removed from
    /// `max_rewards`.
    fn pay_curators(
        &mut self,
        comment: &CommentObject,
        max_rewards: &mut i64,
    ) -> Result<i64, ChainError> {
        let total_weight = comment.total_vote_weight as u128;
        let mut unclaimed = *max_rewards;

        if !comment.allow_curation_rewards {
            *max_rewards = 0;
            return Ok(0);
        }
        if total_weight > 0 {
            let mut votes: Vec<(u64, u64)> = self
                .state
                .comment_votes
                .iter_by_key_range((comment.id, 0)..(comment.id, u64::MAX))
                .map(|v| (v.weight, v.voter))
                .collect();
            // strongest votes claim first
            votes.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));

            for (weight, voter_id) in votes {
                let claim = (*max_rewards as u128 * weight as u128 / total_weight) as i64;
                if claim > 0 {
                    unclaimed -= claim;
                    let voter = self
                        .state
                        .accounts
                        .find(voter_id)
                        .ok_or_else(|| ChainError::Invariant("vote by a missing account".into()))?
                        .clone();
                    let reward = self.create_vesting(&voter.name, Asset::new(claim, GBC), true)?;
                    self.push_virtual_operation(VirtualOperation::CurationReward {
                        curator: voter.name.clone(),
                        reward,
                        comment_author: comment.author.clone(),
                        comment_permlink: comment.permlink.clone(),
                    });
                    self.state
                        .accounts
                        .modify(voter_id, |a| a.curation_rewards += claim);
                }
            }
        }
        *max_rewards -= unclaimed;
        Ok(unclaimed)
    }

    // ── Vesting withdrawals ──────────────────────────────────────────────────

    /// Run every account whose weekly power-down interval has come due.
    pub(crate) fn process_vesting_withdrawals(&mut self) -> Result<(), ChainError> {
        let now = self.head_block_time();
        loop {
            let Some(account) = self
                .state
                .accounts
                .first_by_sort()
                .filter(|a| a.next_vesting_withdrawal <= now)
                .cloned()
            else {
                break;
            };

            let share_price = self.state.dgp().vesting_share_price();
            let remaining = account.to_withdraw - account.withdrawn;
            let to_withdraw = if remaining < account.vesting_withdraw_rate.amount {
                account
                    .vesting_shares
                    .amount
                    .min(account.to_withdraw % account.vesting_withdraw_rate.amount.max(1))
            } else {
                account.vesting_shares.amount.min(account.vesting_withdraw_rate.amount)
            };

            let routes: Vec<_> = self
                .state
                .withdraw_routes
                .iter()
                .filter(|r| r.from_account == account.name)
                .cloned()
                .collect();

            let mut vests_deposited_as_vests = 0i64;
            let mut vests_deposited_as_gbc = 0i64;

            // vest-routed destinations first, to keep share math exact
            for route in routes.iter().filter(|r| r.auto_vest) {
                let to_deposit =
                    (to_withdraw as i128 * route.percent as i128 / config::PERCENT_100 as i128) as i64;
                vests_deposited_as_vests += to_deposit;
                if to_deposit > 0 {
                    let to_account = self.state.get_account(&route.to_account)?.clone();
                    self.state.accounts.modify(to_account.id, |a| {
                        a.vesting_shares += Asset::new(to_deposit, GBS);
                    });
                    let to_account = self.state.get_account(&route.to_account)?.clone();
                    self.adjust_proxied_witness_votes(&to_account, to_deposit)?;
                    self.push_virtual_operation(VirtualOperation::FillVestingWithdraw {
                        from_account: account.name.clone(),
                        to_account: route.to_account.clone(),
                        withdrawn: Asset::new(to_deposit, GBS),
                        deposited: Asset::new(to_deposit, GBS),
                    });
                }
            }

            for route in routes.iter().filter(|r| !r.auto_vest) {
                let to_deposit =
                    (to_withdraw as i128 * route.percent as i128 / config::PERCENT_100 as i128) as i64;
                vests_deposited_as_gbc += to_deposit;
                if to_deposit > 0 {
                    let converted = asset_times_price(Asset::new(to_deposit, GBS), share_price);
                    let to_account = self.state.get_account(&route.to_account)?.clone();
                    self.state
                        .accounts
                        .modify(to_account.id, |a| a.balance += converted);
                    self.state.modify_dgp(|dgp| {
                        dgp.total_vesting_fund_gbc -= converted;
                        dgp.total_vesting_shares -= Asset::new(to_deposit, GBS);
                    });
                    self.push_virtual_operation(VirtualOperation::FillVestingWithdraw {
                        from_account: account.name.clone(),
                        to_account: route.to_account.clone(),
                        withdrawn: Asset::new(to_deposit, GBS),
                        deposited: converted,
                    });
                }
            }

            let to_convert = to_withdraw - vests_deposited_as_gbc - vests_deposited_as_vests;
            let converted = asset_times_price(Asset::new(to_convert, GBS), share_price);

            self.state.accounts.modify(account.id, |a| {
                a.vesting_shares -= Asset::new(to_withdraw, GBS);
                a.balance += converted;
                a.withdrawn += to_withdraw;
                if a.withdrawn >= a.to_withdraw || a.vesting_shares.amount == 0 {
                    a.vesting_withdraw_rate = Asset::zero(GBS);
                    a.next_vesting_withdrawal = TIMESTAMP_MAX;
                } else {
                    a.next_vesting_withdrawal += config::VESTING_WITHDRAW_INTERVAL_SECONDS;
                }
            });
            self.state.modify_dgp(|dgp| {
                dgp.total_vesting_fund_gbc -= converted;
                dgp.total_vesting_shares -= Asset::new(to_convert, GBS);
            });

            if to_withdraw > 0 {
                let account = self.state.accounts.find(account.id).unwrap().clone();
                self.adjust_proxied_witness_votes(&account, -to_withdraw)?;
            }
            self.push_virtual_operation(VirtualOperation::FillVestingWithdraw {
                from_account: account.name.clone(),
                to_account: account.name.clone(),
                withdrawn: Asset::new(to_convert, GBS),
                deposited: converted,
            });
        }
        Ok(())
    }

    // ── Savings ──────────────────────────────────────────────────────────────

    pub(crate) fn process_savings_withdraws(&mut self) -> Result<(), ChainError> {
        let now = self.head_block_time();
        loop {
            let Some(first) = self.state.savings_withdraws.first_by_sort() else {
                break;
            };
            if first.complete > now {
                break;
            }
            let withdraw = first.clone();
            self.adjust_balance(&withdraw.to, withdraw.amount)?;
            let from_id = self.state.get_account(&withdraw.from)?.id;
            self.state
                .accounts
                .modify(from_id, |a| a.savings_withdraw_requests -= 1);
            self.push_virtual_operation(VirtualOperation::FillTransferFromSavings {
                from: withdraw.from.clone(),
                to: withdraw.to.clone(),
                amount: withdraw.amount,
                request_id: withdraw.request_id,
                memo: withdraw.memo.clone(),
            });
            self.state.savings_withdraws.remove(withdraw.id);
        }
        Ok(())
    }

    // ── Crowdfunding expiry ──────────────────────────────────────────────────

    pub(crate) fn process_crowdfunding(&mut self) -> Result<(), ChainError> {
        let now = self.head_block_time();
        loop {
            let Some(first) = self
                .state
                .crowdfundings
                .iter_by_sort()
                .find(|c| c.finish == crate::objects::CROWDFUNDING_OPEN)
            else {
                break;
            };
            if first.expire > now {
                break;
            }
            let cf = first.clone();

            let finish = if cf.total_raise_value > cf.curator_raise_value {
                // target missed: refund every investor
                let invests: Vec<_> = self
                    .state
                    .crowdfunding_invests
                    .iter_by_key_range((cf.id, AccountName::default())..(cf.id + 1, AccountName::default()))
                    .cloned()
                    .collect();
                for invest in invests {
                    self.adjust_balance(&invest.invester, invest.raise)?;
                    self.state.crowdfunding_invests.remove(invest.id);
                }
                CROWDFUNDING_REFUNDED
            } else {
                self.adjust_balance(&cf.originator, cf.curator_raise_value)?;
                CROWDFUNDING_FUNDED
            };
            self.state.crowdfundings.modify(cf.id, |c| c.finish = finish);
            info!(originator = %cf.originator, permlink = %cf.permlink, finish, "crowdfunding settled");
        }
        Ok(())
    }

    // ── Liquidity reward ─────────────────────────────────────────────────────

    fn get_liquidity_reward(&self) -> Asset {
        let supply = self.state.dgp().virtual_supply.amount as i128;
        let hourly = supply * config::LIQUIDITY_APR_PERCENT as i128
            / config::PERCENT_100 as i128
            / (config::SECONDS_PER_YEAR / config::LIQUIDITY_REWARD_PERIOD_SEC) as i128;
        Asset::new((hourly as i64).max(config::MIN_LIQUIDITY_REWARD), GBC)
    }

    /// Once per hour of blocks, the account with the deepest two-sided
    /// market-making volume collects the liquidity reward.
    pub(crate) fn pay_liquidity_reward(&mut self) -> Result<(), ChainError> {
        if self.head_block_num() % config::LIQUIDITY_REWARD_BLOCKS != 0 {
            return Ok(());
        }
        let Some(winner) = self
            .state
            .liquidity_rewards
            .iter()
            .filter(|r| r.weight > 0)
            .max_by_key(|r| (r.weight, std::cmp::Reverse(r.id)))
            .cloned()
        else {
            return Ok(());
        };

        let reward = self.get_liquidity_reward();
        self.adjust_supply(reward);
        self.adjust_balance(&winner.owner, reward)?;
        self.state.liquidity_rewards.modify(winner.id, |r| {
            r.gbc_volume = 0;
            r.gbd_volume = 0;
            r.weight = 0;
        });
        self.push_virtual_operation(VirtualOperation::LiquidityReward {
            owner: winner.owner.clone(),
            payout: reward,
        });
        Ok(())
    }

    // ── Recovery / escrow / voting-rights expirations ────────────────────────

    pub(crate) fn account_recovery_processing(&mut self) {
        let now = self.head_block_time();

        // expire unused recovery requests
        while let Some(first) = self.state.account_recovery_requests.first_by_sort() {
            if first.expires > now {
                break;
            }
            let id = first.id;
            self.state.account_recovery_requests.remove(id);
        }

        // drop owner-authority snapshots past the recovery window
        let stale: Vec<u64> = self
            .state
            .owner_auth_history
            .iter()
            .filter(|h| h.last_valid_time + config::OWNER_AUTH_RECOVERY_PERIOD < now)
            .map(|h| h.id)
            .collect();
        for id in stale {
            self.state.owner_auth_history.remove(id);
        }

        // apply effective recovery-partner changes
        loop {
            let Some(first) = self.state.change_recovery_requests.first_by_sort() else {
                break;
            };
            if first.effective_on > now {
                break;
            }
            let request = first.clone();
            if let Some(account) = self.state.accounts.find_by_key(&request.account_to_recover) {
                let account_id = account.id;
                self.state
                    .accounts
                    .modify(account_id, |a| a.recovery_account = request.recovery_account.clone());
            }
            self.state.change_recovery_requests.remove(request.id);
        }
    }

    /// Refund escrows that were never fully ratified by their deadline.
    pub(crate) fn expire_escrow_ratification(&mut self) -> Result<(), ChainError> {
        let now = self.head_block_time();
        loop {
            let Some(escrow) = self
                .state
                .escrows
                .iter_by_sort()
                .find(|e| !e.is_approved() && e.ratification_deadline <= now)
                .cloned()
            else {
                break;
            };
            self.adjust_balance(&escrow.from, escrow.gbc_balance)?;
            self.adjust_balance(&escrow.from, escrow.gbd_balance)?;
            self.adjust_balance(&escrow.from, escrow.pending_fee)?;
            self.state.escrows.remove(escrow.id);
        }
        Ok(())
    }

    pub(crate) fn process_decline_voting_rights(&mut self) -> Result<(), ChainError> {
        let now = self.head_block_time();
        loop {
            let Some(first) = self.state.decline_voting_requests.first_by_sort() else {
                break;
            };
            if first.effective_date > now {
                break;
            }
            let request = first.clone();
            let account = self.state.get_account(&request.account)?.clone();

            // retract this account's entire voting influence
            let mut deltas = [0i64; config::MAX_PROXY_RECURSION_DEPTH as usize + 1];
            deltas[0] = -account.vesting_shares.amount;
            for (i, v) in account.proxied_vsf_votes.iter().enumerate() {
                deltas[i + 1] = -v;
            }
            self.adjust_proxied_witness_votes_array(&account, &deltas, 0)?;

            self.clear_witness_votes(&account);
            self.state.accounts.modify(account.id, |a| {
                a.can_vote = false;
                a.proxy = AccountName::default();
            });
            self.state.decline_voting_requests.remove(request.id);
        }
        Ok(())
    }

    // ── Hardforks ────────────────────────────────────────────────────────────

    /// Run at most one hardfork per block once its scheduled time arrives
    /// and (after the chain matures) the witness majority approves.
    pub(crate) fn process_hardforks(&mut self) -> Result<(), ChainError> {
        let now = self.head_block_time();
        let hf = self.state.hardforks().clone();

        if hf.last_hardfork < HARDFORK_0_1
            && now >= HARDFORK_0_1_TIME
            && (hf.next_hardfork >= HARDFORK_0_1_VERSION || self.head_block_num() < config::START_MINER_VOTING_BLOCK)
        {
            self.apply_hardfork(HARDFORK_0_1)?;
        }
        Ok(())
    }

    fn apply_hardfork(&mut self, hardfork: u32) -> Result<(), ChainError> {
        info!(hardfork, "applying hardfork");
        let now = self.head_block_time();
        match hardfork {
            HARDFORK_0_1 => {
                self.state.modify_dgp(|dgp| {
                    dgp.vote_power_reserve_rate = config::REDUCED_VOTE_POWER_RATE;
                });
            }
            _ => {
                return Err(ChainError::Invariant(format!("unknown hardfork {hardfork}")));
            }
        }
        self.state.modify_hardforks(|h| {
            h.last_hardfork = hardfork;
            h.current_hardfork_version = HARDFORK_0_1_VERSION;
            h.processed_hardforks.push(now);
        });
        self.push_virtual_operation(VirtualOperation::Hardfork { hardfork_id: hardfork });
        Ok(())
    }
}
