use serde::{Deserialize, Serialize};

use gamebank_protocol::asset::Asset;
use gamebank_protocol::types::{AccountName, Timestamp};
use gamebank_store::TableObject;

/// How a crowdfunding round ended.
pub const CROWDFUNDING_OPEN: i32 = 0;
pub const CROWDFUNDING_FUNDED: i32 = 1;
pub const CROWDFUNDING_REFUNDED: i32 = 2;

/// A crowdfunding round. One active round per originator at a time; expiry
/// either pays the originator or refunds every investor.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CrowdfundingObject {
    pub id: u64,
    pub originator: AccountName,
    pub permlink: String,
    pub title: String,
    pub body: String,
    pub json_metadata: String,
    pub created: Timestamp,
    pub expire: Timestamp,
    pub last_raise: Timestamp,
    /// Funding target.
    pub total_raise_value: Asset,
    /// Running sum of investments.
    pub curator_raise_value: Asset,
    pub finish: i32,
}

impl TableObject for CrowdfundingObject {
    type Key = (AccountName, String);
    type SortKey = Timestamp;

    fn id(&self) -> u64 {
        self.id
    }
    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
    fn key(&self) -> (AccountName, String) {
        (self.originator.clone(), self.permlink.clone())
    }
    fn sort_key(&self) -> Timestamp {
        self.expire
    }
}

/// One investor's stake in one crowdfunding round.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CrowdfundingInvestObject {
    pub id: u64,
    pub crowdfunding: u64,
    pub invester: AccountName,
    pub raise: Asset,
    pub expire: Timestamp,
    pub last_update: Timestamp,
}

impl TableObject for CrowdfundingInvestObject {
    type Key = (u64, AccountName);
    type SortKey = Timestamp;

    fn id(&self) -> u64 {
        self.id
    }
    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
    fn key(&self) -> (u64, AccountName) {
        (self.crowdfunding, self.invester.clone())
    }
    fn sort_key(&self) -> Timestamp {
        self.expire
    }
}

/// A non-fungible asset. The primary id doubles as the world-visible
/// fund id.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NonfungibleFundObject {
    pub id: u64,
    pub creator: AccountName,
    pub owner: AccountName,
    pub meta_data: String,
    pub created: Timestamp,
    pub last_update: Timestamp,
}

impl TableObject for NonfungibleFundObject {
    type Key = u64;
    type SortKey = AccountName;

    fn id(&self) -> u64 {
        self.id
    }
    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
    fn key(&self) -> u64 {
        self.id
    }
    /// Ordered by owner for per-account listings.
    fn sort_key(&self) -> AccountName {
        self.owner.clone()
    }
}

/// An active sale listing for a non-fungible fund.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct NonfungibleFundOnSaleObject {
    pub id: u64,
    pub fund_id: u64,
    pub seller: AccountName,
    pub selling_price: Asset,
    pub created: Timestamp,
    pub expiration: Timestamp,
}

impl TableObject for NonfungibleFundOnSaleObject {
    type Key = u64;
    type SortKey = Timestamp;

    fn id(&self) -> u64 {
        self.id
    }
    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
    fn key(&self) -> u64 {
        self.fund_id
    }
    fn sort_key(&self) -> Timestamp {
        self.expiration
    }
}
