use gamebank_protocol::asset::{asset_times_price, Asset, GBD};
use gamebank_protocol::config;
use gamebank_protocol::ensure;
use gamebank_protocol::error::ChainError;
use gamebank_protocol::operations::VirtualOperation;

use crate::objects::{LimitOrderObject, LiquidityRewardBalanceObject};

use super::Database;

impl Database {
    /// Match a freshly placed order against the opposite side of the book.
    /// Returns true when the new order was completely filled (and thus no
    /// longer rests on the book).
    pub(crate) fn apply_order(&mut self, new_order_id: u64) -> Result<bool, ChainError> {
        loop {
            let Some(new_order) = self.state.limit_orders.find(new_order_id).cloned() else {
                // consumed by a previous round
                return Ok(true);
            };

            // best-priced opposite order the new order can cross
            let buy_symbol = new_order.sell_price.quote.symbol;
            let sell_symbol = new_order.sell_price.base.symbol;
            let best = self
                .state
                .limit_orders
                .iter()
                .filter(|o| {
                    o.id != new_order.id
                        && o.sell_price.base.symbol == buy_symbol
                        && o.sell_price.quote.symbol == sell_symbol
                })
                .max_by(|a, b| {
                    a.sell_price
                        .partial_cmp(&b.sell_price)
                        .expect("same symbol pair")
                        // older order wins a price tie
                        .then(b.id.cmp(&a.id))
                })
                .cloned();

            let Some(old_order) = best else {
                return Ok(false);
            };

            // crossing test: the resting order's ask must not exceed what
            // the new order offers. In resting-order units:
            //   old.base/old.quote ≥ ... equivalently compare inverted price
            let cross = {
                let lhs = new_order.sell_price.base.amount as i128
                    * old_order.sell_price.base.amount as i128;
                let rhs = new_order.sell_price.quote.amount as i128
                    * old_order.sell_price.quote.amount as i128;
                lhs >= rhs
            };
            if !cross {
                return Ok(false);
            }

            let result = self.match_orders(&new_order, &old_order)?;
            // stop unless only the resting order was consumed
            if result & 0x1 != 0 {
                return Ok(self.state.limit_orders.find(new_order_id).is_none());
            }
        }
    }

    /// Fill two crossing orders at the resting order's price. Bit 0 of the
    /// result marks the new order finished, bit 1 the old order finished.
    fn match_orders(
        &mut self,
        new_order: &LimitOrderObject,
        old_order: &LimitOrderObject,
    ) -> Result<i32, ChainError> {
        let match_price = old_order.sell_price;
        ensure!(
            new_order.sell_price.quote.symbol == old_order.sell_price.base.symbol
                && new_order.sell_price.base.symbol == old_order.sell_price.quote.symbol,
            ChainError::Invariant,
            "order match with mismatched symbol pairs"
        );

        let new_for_sale = new_order.amount_for_sale();
        let old_for_sale = old_order.amount_for_sale();

        // the smaller side fills exactly; the other side keeps any remainder
        let (new_pays, new_receives, old_pays, old_receives);
        let new_in_old_units = asset_times_price(new_for_sale, match_price);
        if new_in_old_units <= old_for_sale {
            old_receives = new_for_sale;
            new_receives = new_in_old_units;
        } else {
            new_receives = old_for_sale;
            old_receives = asset_times_price(old_for_sale, match_price);
        }
        old_pays = new_receives;
        new_pays = old_receives;

        self.push_virtual_operation(VirtualOperation::FillOrder {
            current_owner: new_order.seller.clone(),
            current_order_id: new_order.order_id,
            current_pays: new_pays,
            open_owner: old_order.seller.clone(),
            open_order_id: old_order.order_id,
            open_pays: old_pays,
        });

        let mut result = 0;
        result |= i32::from(self.fill_order(new_order.id, new_pays, new_receives)?);
        result |= i32::from(self.fill_order(old_order.id, old_pays, old_receives)?) << 1;
        ensure!(result != 0, ChainError::Invariant, "order match consumed neither side");
        Ok(result)
    }

    /// Credit the seller and shrink or remove the order. Returns true when
    /// the order is gone from the book.
    fn fill_order(&mut self, order_id: u64, pays: Asset, receives: Asset) -> Result<bool, ChainError> {
        let order = self
            .state
            .limit_orders
            .find(order_id)
            .cloned()
            .ok_or_else(|| ChainError::Invariant("filling a removed order".into()))?;
        ensure!(
            order.amount_for_sale().symbol == pays.symbol && pays.symbol != receives.symbol,
            ChainError::Invariant,
            "fill symbols disagree with the order"
        );

        self.adjust_liquidity_reward(&order.seller, receives)?;
        self.adjust_balance(&order.seller, receives)?;

        if pays == order.amount_for_sale() {
            self.state.limit_orders.remove(order.id);
            return Ok(true);
        }
        ensure!(
            pays < order.amount_for_sale(),
            ChainError::Invariant,
            "order overfilled"
        );
        self.state
            .limit_orders
            .modify(order.id, |o| o.for_sale -= pays.amount);

        // a remainder asking for nothing cannot trade; refund it
        let order = self.state.limit_orders.find(order_id).cloned().unwrap();
        if order.amount_to_receive().amount == 0 {
            self.cancel_order(&order)?;
            return Ok(true);
        }
        Ok(false)
    }

    /// Refund the unfilled remainder and delete the order.
    pub(crate) fn cancel_order(&mut self, order: &LimitOrderObject) -> Result<(), ChainError> {
        self.adjust_balance(&order.seller, order.amount_for_sale())?;
        self.state.limit_orders.remove(order.id);
        Ok(())
    }

    /// Track maker volume for the hourly liquidity reward. Volume on both
    /// sides is remembered for a week of activity.
    fn adjust_liquidity_reward(
        &mut self,
        owner: &gamebank_protocol::types::AccountName,
        volume: Asset,
    ) -> Result<(), ChainError> {
        let now = self.head_block_time();
        let is_gbd = volume.symbol == GBD;
        if let Some(existing) = self.state.liquidity_rewards.find_by_key(owner) {
            let id = existing.id;
            self.state.liquidity_rewards.modify(id, |r| {
                if now - r.last_update >= config::LIQUIDITY_TIMEOUT_SEC {
                    r.gbc_volume = 0;
                    r.gbd_volume = 0;
                    r.weight = 0;
                }
                if is_gbd {
                    r.gbd_volume += volume.amount;
                } else {
                    r.gbc_volume += volume.amount;
                }
                r.weight = r.compute_weight();
                r.last_update = now;
            });
        } else {
            let owner = owner.clone();
            self.state.liquidity_rewards.insert(|id| {
                let mut r = LiquidityRewardBalanceObject {
                    id,
                    owner,
                    gbc_volume: 0,
                    gbd_volume: 0,
                    weight: 0,
                    last_update: now,
                };
                if is_gbd {
                    r.gbd_volume = volume.amount;
                } else {
                    r.gbc_volume = volume.amount;
                }
                r.weight = r.compute_weight();
                r
            });
        }
        Ok(())
    }
}
