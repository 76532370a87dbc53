use serde::{Deserialize, Serialize};

use gamebank_protocol::asset::{Asset, GBC};
use gamebank_protocol::types::{AccountName, Digest, Timestamp};
use gamebank_store::TableObject;

/// A deployed script artifact.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ContractObject {
    pub id: u64,
    pub name: AccountName,
    pub creator: AccountName,
    /// Digest of the deployed code.
    pub version: Digest,
    pub code: String,
    pub abi: String,
    /// Liquid funds held by the contract itself.
    pub balance: Asset,
    pub created: Timestamp,
    pub last_update: Timestamp,
}

impl ContractObject {
    pub fn new(id: u64, name: AccountName, creator: AccountName, now: Timestamp) -> Self {
        ContractObject {
            id,
            name,
            creator,
            version: Digest::default(),
            code: String::new(),
            abi: String::new(),
            balance: Asset::zero(GBC),
            created: now,
            last_update: now,
        }
    }
}

impl TableObject for ContractObject {
    type Key = AccountName;
    type SortKey = Timestamp;

    fn id(&self) -> u64 {
        self.id
    }
    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
    fn key(&self) -> AccountName {
        self.name.clone()
    }
    fn sort_key(&self) -> Timestamp {
        self.created
    }
}

/// Per-(contract, user) JSON state written by script executions.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ContractUserObject {
    pub id: u64,
    pub contract_name: AccountName,
    pub user_name: AccountName,
    /// Opaque JSON payload owned by the script.
    pub data: String,
    pub created: Timestamp,
    pub last_update: Timestamp,
}

impl TableObject for ContractUserObject {
    type Key = (AccountName, AccountName);
    type SortKey = ();

    fn id(&self) -> u64 {
        self.id
    }
    fn set_id(&mut self, id: u64) {
        self.id = id;
    }
    fn key(&self) -> (AccountName, AccountName) {
        (self.contract_name.clone(), self.user_name.clone())
    }
    fn sort_key(&self) {}
}
