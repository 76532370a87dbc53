use gamebank_protocol::asset::{Asset, GBC, GBD, GBS};
use gamebank_protocol::ensure;
use gamebank_protocol::error::ChainError;

use super::Database;

impl Database {
    /// Audit the cross-table accounting identities. A failure here means the
    /// state is corrupt and the node must halt rather than advance.
    pub fn validate_invariants(&self) -> Result<(), ChainError> {
        let dgp = self.state.dgp().clone();

        let mut total_supply = Asset::zero(GBC);
        let mut total_gbd = Asset::zero(GBD);
        let mut total_vesting = Asset::zero(GBS);
        let mut pending_vesting_gbc = Asset::zero(GBC);
        let mut total_vsf_votes: i64 = 0;

        for account in self.state.accounts.iter() {
            ensure!(
                account.balance.amount >= 0
                    && account.savings_balance.amount >= 0
                    && account.gbd_balance.amount >= 0
                    && account.savings_gbd_balance.amount >= 0
                    && account.vesting_shares.amount >= 0
                    && account.reward_gbc_balance.amount >= 0
                    && account.reward_gbd_balance.amount >= 0
                    && account.reward_vesting_balance.amount >= 0,
                ChainError::Invariant,
                "account {} holds a negative balance",
                account.name
            );
            total_supply += account.balance + account.savings_balance + account.reward_gbc_balance;
            total_gbd += account.gbd_balance + account.savings_gbd_balance + account.reward_gbd_balance;
            total_vesting += account.vesting_shares + account.reward_vesting_balance;
            pending_vesting_gbc += account.reward_vesting_gbc;
            total_vsf_votes += if account.has_proxy() {
                0
            } else {
                account.witness_vote_weight()
            };
        }

        for order in self.state.limit_orders.iter() {
            match order.sell_price.base.symbol {
                s if s == GBC => total_supply += Asset::new(order.for_sale, GBC),
                s if s == GBD => total_gbd += Asset::new(order.for_sale, GBD),
                _ => {}
            }
        }
        for escrow in self.state.escrows.iter() {
            total_supply += escrow.gbc_balance;
            total_gbd += escrow.gbd_balance;
            match escrow.pending_fee.symbol {
                s if s == GBC => total_supply += escrow.pending_fee,
                s if s == GBD => total_gbd += escrow.pending_fee,
                _ => {}
            }
        }
        for withdraw in self.state.savings_withdraws.iter() {
            match withdraw.amount.symbol {
                s if s == GBC => total_supply += withdraw.amount,
                s if s == GBD => total_gbd += withdraw.amount,
                _ => {}
            }
        }
        for request in self.state.convert_requests.iter() {
            total_gbd += request.amount;
        }
        for fund in self.state.reward_funds.iter() {
            total_supply += fund.reward_balance;
        }
        // open crowdfunding rounds hold their raised funds until settlement
        for cf in self.state.crowdfundings.iter() {
            if cf.finish == crate::objects::CROWDFUNDING_OPEN {
                total_supply += cf.curator_raise_value;
            }
        }
        for contract in self.state.contracts.iter() {
            total_supply += contract.balance;
        }

        total_supply += dgp.total_vesting_fund_gbc + dgp.pending_rewarded_vesting_gbc;

        ensure!(
            total_supply == dgp.current_supply,
            ChainError::Invariant,
            "current supply mismatch: accounted {total_supply}, declared {}",
            dgp.current_supply
        );
        ensure!(
            total_gbd == dgp.current_gbd_supply,
            ChainError::Invariant,
            "GBD supply mismatch: accounted {total_gbd}, declared {}",
            dgp.current_gbd_supply
        );
        ensure!(
            total_vesting == dgp.total_vesting_shares + dgp.pending_rewarded_vesting_shares,
            ChainError::Invariant,
            "vesting share mismatch: accounted {total_vesting}"
        );

        for witness in self.state.witnesses.iter() {
            ensure!(
                witness.votes <= total_vsf_votes,
                ChainError::Invariant,
                "witness {} has more votes than exist",
                witness.owner
            );
        }

        for comment in self.state.comments.iter() {
            ensure!(
                comment.net_rshares.abs() <= comment.abs_rshares,
                ChainError::Invariant,
                "comment {}/{} has inconsistent rshares",
                comment.author,
                comment.permlink
            );
        }
        Ok(())
    }
}
