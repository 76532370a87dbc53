use serde::{Deserialize, Serialize};

use gamebank_protocol::asset::{asset_times_price, Asset, Price, GBC, GBD};
use gamebank_protocol::types::{AccountName, Timestamp};
use gamebank_store::TableObject;

/// A resting limit order. Both sides of the book share this table; the side
/// is implied by `sell_price.base.symbol`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LimitOrderObject {
    pub id: u64,
    pub created: Timestamp,
    pub expiration: Timestamp,
    pub seller: AccountName,
    pub order_id: u32,
    /// Remaining amount for sale, in `sell_price.base` satoshis.
    pub for_sale: i64,
    pub sell_price: Price,
}

impl LimitOrderObject {
    pub fn amount_for_sale(&self) -> Asset {
        Asset::new(self.for_sale, self.sell_price.base.symbol)
    }

    pub fn amount_to_receive(&self) -> Asset {
        asset_times_price(self.amount_for_sale(), self.sell_price)
    }
}

impl TableObject for LimitOrderObject {
    type Key = (AccountName, u32);
    type SortKey = Timestamp;

    fn id(&self) -> u64 {
        self.id
    }
    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
    fn key(&self) -> (AccountName, u32) {
        (self.seller.clone(), self.order_id)
    }
    /// Ordered by expiration for expiry sweeps.
    fn sort_key(&self) -> Timestamp {
        self.expiration
    }
}

/// A pending GBD → GBC conversion, executed at the median feed after the
/// conversion delay.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConvertRequestObject {
    pub id: u64,
    pub owner: AccountName,
    pub request_id: u32,
    pub amount: Asset,
    pub conversion_date: Timestamp,
}

impl TableObject for ConvertRequestObject {
    type Key = (AccountName, u32);
    type SortKey = Timestamp;

    fn id(&self) -> u64 {
        self.id
    }
    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
    fn key(&self) -> (AccountName, u32) {
        (self.owner.clone(), self.request_id)
    }
    fn sort_key(&self) -> Timestamp {
        self.conversion_date
    }
}

/// Rolling market-making volume used to pick the hourly liquidity-reward
/// winner. The weight favors balanced two-sided volume.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LiquidityRewardBalanceObject {
    pub id: u64,
    pub owner: AccountName,
    pub gbc_volume: i64,
    pub gbd_volume: i64,
    pub weight: u128,
    pub last_update: Timestamp,
}

impl LiquidityRewardBalanceObject {
    /// `min(gbc, gbd)² ` — rewards providing depth on both sides.
    pub fn compute_weight(&self) -> u128 {
        let min = self.gbc_volume.min(self.gbd_volume).max(0) as u128;
        min * min
    }
}

impl TableObject for LiquidityRewardBalanceObject {
    type Key = AccountName;
    type SortKey = ();

    fn id(&self) -> u64 {
        self.id
    }
    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
    fn key(&self) -> AccountName {
        self.owner.clone()
    }
    fn sort_key(&self) {}
}

/// Convenience for tests and matching code: the GBC-for-GBD side or the
/// GBD-for-GBC side of the book.
pub fn is_gbc_side(order: &LimitOrderObject) -> bool {
    order.sell_price.base.symbol == GBC && order.sell_price.quote.symbol == GBD
}

pub fn is_gbd_side(order: &LimitOrderObject) -> bool {
    order.sell_price.base.symbol == GBD && order.sell_price.quote.symbol == GBC
}
