use gamebank_protocol::asset::{asset_times_price, Asset, Symbol, GBC, GBD, GBS};
use gamebank_protocol::config;
use gamebank_protocol::ensure;
use gamebank_protocol::error::ChainError;
use gamebank_protocol::operations::VirtualOperation;
use gamebank_protocol::types::AccountName;

use crate::objects::AccountObject;

use super::Database;

/// Virtual-round lap length: one full rotation of scheduling credit.
pub(crate) const VIRTUAL_SCHEDULE_LAP_LENGTH: u128 = u128::MAX;

impl Database {
    pub fn get_balance(&self, name: &AccountName, symbol: Symbol) -> Result<Asset, ChainError> {
        let account = self.state.get_account(name)?;
        Ok(match symbol {
            s if s == GBC => account.balance,
            s if s == GBD => account.gbd_balance,
            s if s == GBS => account.vesting_shares,
            _ => return Err(ChainError::StatePrecondition("unknown asset symbol".into())),
        })
    }

    pub fn get_savings_balance(
        &self,
        name: &AccountName,
        symbol: Symbol,
    ) -> Result<Asset, ChainError> {
        let account = self.state.get_account(name)?;
        Ok(match symbol {
            s if s == GBC => account.savings_balance,
            s if s == GBD => account.savings_gbd_balance,
            _ => return Err(ChainError::StatePrecondition("savings hold GBC or GBD only".into())),
        })
    }

    /// Own stake adjusted for delegations in and out.
    pub fn get_effective_vesting_shares(&self, account: &AccountObject) -> Asset {
        account.vesting_shares - account.delegated_vesting_shares
            + account.received_vesting_shares
    }

    // ── Liquid / debt balances ───────────────────────────────────────────────

    /// Apply a signed delta to an account's liquid or debt balance. GBD
    /// movements first settle the pending interest integral.
    pub fn adjust_balance(
        &mut self,
        name: &AccountName,
        delta: Asset,
    ) -> Result<(), ChainError> {
        let account = self.state.get_account(name)?.clone();
        if delta.symbol == GBD {
            self.settle_gbd_interest(&account, false)?;
        }
        let account = self.state.get_account(name)?.clone();
        match delta.symbol {
            s if s == GBC => {
                ensure!(
                    account.balance.amount + delta.amount >= 0,
                    ChainError::StatePrecondition,
                    "account {name} has insufficient funds: {} < {}",
                    account.balance,
                    -delta
                );
                self.state.accounts.modify(account.id, |a| a.balance += delta);
            }
            s if s == GBD => {
                ensure!(
                    account.gbd_balance.amount + delta.amount >= 0,
                    ChainError::StatePrecondition,
                    "account {name} has insufficient GBD: {} < {}",
                    account.gbd_balance,
                    -delta
                );
                self.state.accounts.modify(account.id, |a| a.gbd_balance += delta);
            }
            _ => {
                return Err(ChainError::StatePrecondition(
                    "adjust_balance takes GBC or GBD".into(),
                ))
            }
        }
        Ok(())
    }

    /// Apply a signed delta to a savings balance, settling GBD interest.
    pub fn adjust_savings_balance(
        &mut self,
        name: &AccountName,
        delta: Asset,
    ) -> Result<(), ChainError> {
        let account = self.state.get_account(name)?.clone();
        if delta.symbol == GBD {
            self.settle_gbd_interest(&account, true)?;
        }
        let account = self.state.get_account(name)?.clone();
        match delta.symbol {
            s if s == GBC => {
                ensure!(
                    account.savings_balance.amount + delta.amount >= 0,
                    ChainError::StatePrecondition,
                    "account {name} has insufficient savings"
                );
                self.state
                    .accounts
                    .modify(account.id, |a| a.savings_balance += delta);
            }
            s if s == GBD => {
                ensure!(
                    account.savings_gbd_balance.amount + delta.amount >= 0,
                    ChainError::StatePrecondition,
                    "account {name} has insufficient GBD savings"
                );
                self.state
                    .accounts
                    .modify(account.id, |a| a.savings_gbd_balance += delta);
            }
            _ => {
                return Err(ChainError::StatePrecondition(
                    "savings hold GBC or GBD only".into(),
                ))
            }
        }
        Ok(())
    }

    /// Accrue the seconds-of-balance integral and pay interest once the
    /// compounding interval has elapsed.
    fn settle_gbd_interest(
        &mut self,
        account: &AccountObject,
        savings: bool,
    ) -> Result<(), ChainError> {
        let now = self.head_block_time();
        let interest_rate = self.state.dgp().gbd_interest_rate as u128;

        let (balance, seconds, last_update, last_payment) = if savings {
            (
                account.savings_gbd_balance,
                account.savings_gbd_seconds,
                account.savings_gbd_seconds_last_update,
                account.savings_gbd_last_interest_payment,
            )
        } else {
            (
                account.gbd_balance,
                account.gbd_seconds,
                account.gbd_seconds_last_update,
                account.gbd_last_interest_payment,
            )
        };

        let elapsed = (now - last_update).max(0) as u128;
        let new_seconds = seconds + balance.amount.max(0) as u128 * elapsed;

        let pay_due = now - last_payment > config::GBD_INTEREST_COMPOUND_INTERVAL_SEC
            && new_seconds > 0;
        let interest = if pay_due {
            let i = new_seconds / config::SECONDS_PER_YEAR as u128 * interest_rate
                / config::PERCENT_100 as u128;
            Asset::new(i as i64, GBD)
        } else {
            Asset::zero(GBD)
        };

        let account_id = account.id;
        self.state.accounts.modify(account_id, |a| {
            if savings {
                a.savings_gbd_seconds = if pay_due { 0 } else { new_seconds };
                a.savings_gbd_seconds_last_update = now;
                if pay_due {
                    a.savings_gbd_last_interest_payment = now;
                    a.savings_gbd_balance += interest;
                }
            } else {
                a.gbd_seconds = if pay_due { 0 } else { new_seconds };
                a.gbd_seconds_last_update = now;
                if pay_due {
                    a.gbd_last_interest_payment = now;
                    a.gbd_balance += interest;
                }
            }
        });

        if interest.amount > 0 {
            self.state.modify_dgp(|dgp| {
                dgp.current_gbd_supply += interest;
                dgp.virtual_supply += Asset::new(interest.amount, GBC);
            });
            self.push_virtual_operation(VirtualOperation::Interest {
                owner: account.name.clone(),
                interest,
            });
        }
        Ok(())
    }

    // ── Reward buckets ───────────────────────────────────────────────────────

    /// Credit or debit the pending-reward buckets. `share_delta` moves the
    /// vesting bucket; `value_delta` moves liquid/debt buckets.
    pub fn adjust_reward_balance(
        &mut self,
        name: &AccountName,
        value_delta: Asset,
        share_delta: Asset,
    ) -> Result<(), ChainError> {
        let account = self.state.get_account(name)?.clone();
        ensure!(
            share_delta.symbol == GBS,
            ChainError::StatePrecondition,
            "share delta must be GBS"
        );
        if share_delta.amount != 0 {
            ensure!(
                value_delta.symbol == GBC,
                ChainError::StatePrecondition,
                "vesting rewards are backed by GBC"
            );
            ensure!(
                account.reward_vesting_balance.amount + share_delta.amount >= 0,
                ChainError::StatePrecondition,
                "insufficient pending vesting rewards"
            );
            self.state.accounts.modify(account.id, |a| {
                a.reward_vesting_balance += share_delta;
                a.reward_vesting_gbc += value_delta;
            });
        } else {
            match value_delta.symbol {
                s if s == GBC => {
                    ensure!(
                        account.reward_gbc_balance.amount + value_delta.amount >= 0,
                        ChainError::StatePrecondition,
                        "insufficient pending GBC rewards"
                    );
                    self.state
                        .accounts
                        .modify(account.id, |a| a.reward_gbc_balance += value_delta);
                }
                s if s == GBD => {
                    ensure!(
                        account.reward_gbd_balance.amount + value_delta.amount >= 0,
                        ChainError::StatePrecondition,
                        "insufficient pending GBD rewards"
                    );
                    self.state
                        .accounts
                        .modify(account.id, |a| a.reward_gbd_balance += value_delta);
                }
                _ => {
                    return Err(ChainError::StatePrecondition(
                        "reward value must be GBC or GBD".into(),
                    ))
                }
            }
        }
        Ok(())
    }

    /// Apply a delta to the global supply counters.
    pub fn adjust_supply(&mut self, delta: Asset) {
        let feed = self.state.feed().current_median_history;
        self.state.modify_dgp(|dgp| match delta.symbol {
            s if s == GBC => {
                dgp.current_supply += delta;
                dgp.virtual_supply += delta;
            }
            s if s == GBD => {
                dgp.current_gbd_supply += delta;
                if !feed.is_null() {
                    dgp.virtual_supply += asset_times_price(delta, feed);
                }
            }
            _ => {}
        });
    }

    // ── Vesting ──────────────────────────────────────────────────────────────

    /// Convert liquid tokens into vesting shares at the current share price,
    /// preserving the shares-to-fund ratio. With `to_reward_balance` the
    /// shares land in the pending reward bucket instead of the live stake.
    pub fn create_vesting(
        &mut self,
        name: &AccountName,
        liquid: Asset,
        to_reward_balance: bool,
    ) -> Result<Asset, ChainError> {
        ensure!(
            liquid.symbol == GBC,
            ChainError::StatePrecondition,
            "only GBC can be vested"
        );
        let dgp = self.state.dgp().clone();
        let price = if to_reward_balance {
            dgp.reward_vesting_share_price()
        } else {
            dgp.vesting_share_price()
        };
        let new_vesting = asset_times_price(liquid, price);

        if to_reward_balance {
            self.adjust_reward_balance(name, liquid, new_vesting)?;
        } else {
            let account_id = self.state.get_account(name)?.id;
            self.state
                .accounts
                .modify(account_id, |a| a.vesting_shares += new_vesting);
        }

        self.state.modify_dgp(|dgp| {
            if to_reward_balance {
                dgp.pending_rewarded_vesting_shares += new_vesting;
                dgp.pending_rewarded_vesting_gbc += liquid;
            } else {
                dgp.total_vesting_fund_gbc += liquid;
                dgp.total_vesting_shares += new_vesting;
            }
        });

        if !to_reward_balance {
            let account = self.state.get_account(name)?.clone();
            self.adjust_proxied_witness_votes(&account, new_vesting.amount)?;
        }
        Ok(new_vesting)
    }

    // ── Witness vote plumbing ────────────────────────────────────────────────

    /// Apply a stake delta to one witness's tally and reschedule its
    /// virtual-round position.
    pub(crate) fn adjust_witness_vote(
        &mut self,
        witness_name: &AccountName,
        delta: i64,
    ) -> Result<(), ChainError> {
        let schedule_time = self.state.schedule().current_virtual_time;
        let witness_id = self.state.get_witness(witness_name)?.id;
        self.state.witnesses.modify(witness_id, |w| {
            w.virtual_position = w.virtual_position.wrapping_add(
                (w.votes.max(0) as u128)
                    .wrapping_mul(schedule_time.wrapping_sub(w.virtual_last_update)),
            );
            w.virtual_last_update = schedule_time;
            w.votes += delta;

            let remaining = VIRTUAL_SCHEDULE_LAP_LENGTH - w.virtual_position;
            w.virtual_scheduled_time =
                schedule_time.wrapping_add(remaining / (w.votes.max(0) as u128 + 1));
        });
        Ok(())
    }

    /// Apply a stake delta to every witness the account votes for.
    pub(crate) fn adjust_witness_votes(
        &mut self,
        account: &AccountObject,
        delta: i64,
    ) -> Result<(), ChainError> {
        let witnesses: Vec<AccountName> = self
            .state
            .witness_votes
            .iter()
            .filter(|v| v.account == account.name)
            .map(|v| v.witness.clone())
            .collect();
        for witness in witnesses {
            self.adjust_witness_vote(&witness, delta)?;
        }
        Ok(())
    }

    /// Propagate a stake delta through the proxy chain; the terminal account
    /// applies it to its witness votes.
    pub(crate) fn adjust_proxied_witness_votes(
        &mut self,
        account: &AccountObject,
        delta: i64,
    ) -> Result<(), ChainError> {
        self.adjust_proxied_witness_votes_at_depth(account, delta, 0)
    }

    fn adjust_proxied_witness_votes_at_depth(
        &mut self,
        account: &AccountObject,
        delta: i64,
        depth: u32,
    ) -> Result<(), ChainError> {
        if account.has_proxy() {
            if depth >= config::MAX_PROXY_RECURSION_DEPTH {
                return Ok(());
            }
            let proxy = self.state.get_account(&account.proxy)?.clone();
            let proxy_id = proxy.id;
            self.state.accounts.modify(proxy_id, |a| {
                a.proxied_vsf_votes[depth as usize] += delta;
            });
            let proxy = self.state.get_account(&account.proxy)?.clone();
            self.adjust_proxied_witness_votes_at_depth(&proxy, delta, depth + 1)
        } else {
            self.adjust_witness_votes(account, delta)
        }
    }

    /// Propagate a full per-depth delta array (used when switching proxies).
    pub(crate) fn adjust_proxied_witness_votes_array(
        &mut self,
        account: &AccountObject,
        deltas: &[i64; config::MAX_PROXY_RECURSION_DEPTH as usize + 1],
        depth: u32,
    ) -> Result<(), ChainError> {
        if account.has_proxy() {
            if depth >= config::MAX_PROXY_RECURSION_DEPTH {
                return Ok(());
            }
            let proxy = self.state.get_account(&account.proxy)?.clone();
            let proxy_id = proxy.id;
            self.state.accounts.modify(proxy_id, |a| {
                for i in 0..(config::MAX_PROXY_RECURSION_DEPTH as usize - depth as usize) {
                    a.proxied_vsf_votes[i + depth as usize] += deltas[i];
                }
            });
            let proxy = self.state.get_account(&account.proxy)?.clone();
            self.adjust_proxied_witness_votes_array(&proxy, deltas, depth + 1)
        } else {
            let total: i64 = deltas
                .iter()
                .take(config::MAX_PROXY_RECURSION_DEPTH as usize + 1 - depth as usize)
                .sum();
            self.adjust_witness_votes(account, total)
        }
    }

    /// Remove every witness-vote object cast by the account.
    pub(crate) fn clear_witness_votes(&mut self, account: &AccountObject) {
        let votes: Vec<u64> = self
            .state
            .witness_votes
            .iter()
            .filter(|v| v.account == account.name)
            .map(|v| v.id)
            .collect();
        for id in votes {
            self.state.witness_votes.remove(id);
        }
        let account_id = account.id;
        self.state
            .accounts
            .modify(account_id, |a| a.witnesses_voted_for = 0);
    }

    /// Replace an account's owner authority, snapshotting the previous one
    /// for the recovery window.
    pub(crate) fn update_owner_authority(
        &mut self,
        account: &AccountObject,
        new_owner: gamebank_protocol::authority::Authority,
    ) -> Result<(), ChainError> {
        let now = self.head_block_time();
        let (name, previous) = (account.name.clone(), account.owner.clone());
        self.state
            .owner_auth_history
            .insert(|id| crate::objects::OwnerAuthorityHistoryObject {
                id,
                account: name,
                previous_owner_authority: previous,
                last_valid_time: now,
            });
        self.state.accounts.modify(account.id, |a| {
            a.owner = new_owner;
            a.last_owner_update = now;
        });
        Ok(())
    }

    /// Burn whatever landed in the null account.
    pub(crate) fn clear_null_account_balance(&mut self) -> Result<(), ChainError> {
        let null_name = AccountName::from(config::NULL_ACCOUNT);
        let Some(null) = self.state.accounts.find_by_key(&null_name) else {
            return Ok(());
        };
        let null = null.clone();

        let mut burned_gbc = Asset::zero(GBC);
        let mut burned_gbd = Asset::zero(GBD);
        burned_gbc += null.balance + null.savings_balance + null.reward_gbc_balance;
        burned_gbd += null.gbd_balance + null.savings_gbd_balance + null.reward_gbd_balance;

        let vesting_value = if null.vesting_shares.amount > 0 {
            let price = self.state.dgp().vesting_share_price();
            asset_times_price(null.vesting_shares, price.invert())
        } else {
            Asset::zero(GBC)
        };
        let reward_vesting = null.reward_vesting_balance;
        let reward_vesting_gbc = null.reward_vesting_gbc;

        if burned_gbc.amount == 0
            && burned_gbd.amount == 0
            && null.vesting_shares.amount == 0
            && reward_vesting.amount == 0
        {
            return Ok(());
        }

        let vesting_shares = null.vesting_shares;
        self.state.accounts.modify(null.id, |a| {
            a.balance = Asset::zero(GBC);
            a.savings_balance = Asset::zero(GBC);
            a.gbd_balance = Asset::zero(GBD);
            a.savings_gbd_balance = Asset::zero(GBD);
            a.reward_gbc_balance = Asset::zero(GBC);
            a.reward_gbd_balance = Asset::zero(GBD);
            a.vesting_shares = Asset::zero(GBS);
            a.reward_vesting_balance = Asset::zero(GBS);
            a.reward_vesting_gbc = Asset::zero(GBC);
        });

        self.state.modify_dgp(|dgp| {
            dgp.total_vesting_shares -= vesting_shares;
            dgp.total_vesting_fund_gbc -= vesting_value;
            dgp.pending_rewarded_vesting_shares -= reward_vesting;
            dgp.pending_rewarded_vesting_gbc -= reward_vesting_gbc;
        });
        self.adjust_supply(-(burned_gbc + vesting_value + reward_vesting_gbc));
        self.adjust_supply(-burned_gbd);
        Ok(())
    }
}
