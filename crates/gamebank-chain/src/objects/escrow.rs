use serde::{Deserialize, Serialize};

use gamebank_protocol::asset::Asset;
use gamebank_protocol::types::{AccountName, Timestamp};
use gamebank_store::TableObject;

/// A four-party escrow: funds held until both `to` and `agent` ratify, with
/// an optional dispute handing release control to the agent.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EscrowObject {
    pub id: u64,
    pub escrow_id: u32,
    pub from: AccountName,
    pub to: AccountName,
    pub agent: AccountName,
    pub ratification_deadline: Timestamp,
    pub escrow_expiration: Timestamp,
    pub gbd_balance: Asset,
    pub gbc_balance: Asset,
    pub pending_fee: Asset,
    pub to_approved: bool,
    pub agent_approved: bool,
    pub disputed: bool,
}

impl EscrowObject {
    pub fn is_approved(&self) -> bool {
        self.to_approved && self.agent_approved
    }
}

impl TableObject for EscrowObject {
    type Key = (AccountName, u32);
    type SortKey = Timestamp;

    fn id(&self) -> u64 {
        self.id
    }
    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
    fn key(&self) -> (AccountName, u32) {
        (self.from.clone(), self.escrow_id)
    }
    /// Ordered by ratification deadline for the expiry sweep.
    fn sort_key(&self) -> Timestamp {
        self.ratification_deadline
    }
}

/// A delayed withdrawal out of savings.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SavingsWithdrawObject {
    pub id: u64,
    pub from: AccountName,
    pub to: AccountName,
    pub memo: String,
    pub request_id: u32,
    pub amount: Asset,
    pub complete: Timestamp,
}

impl TableObject for SavingsWithdrawObject {
    type Key = (AccountName, u32);
    type SortKey = Timestamp;

    fn id(&self) -> u64 {
        self.id
    }
    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
    fn key(&self) -> (AccountName, u32) {
        (self.from.clone(), self.request_id)
    }
    fn sort_key(&self) -> Timestamp {
        self.complete
    }
}
