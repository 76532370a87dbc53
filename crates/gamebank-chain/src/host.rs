//! The host-call implementation backing script execution.
//!
//! A [`ContractHost`] borrows the database for the duration of one script
//! invocation. Every write goes through the same undo session as the
//! enclosing operation, so a failed script unwinds with its transaction.
//! Modified per-user state is buffered and persisted only after the script
//! returns successfully.

use std::collections::BTreeMap;

use serde_json::Value;

use gamebank_contract::{ContractEvent, HostApi};
use gamebank_protocol::asset::{Asset, GBC};
use gamebank_protocol::ensure;
use gamebank_protocol::error::ChainError;
use gamebank_protocol::types::{AccountName, Digest};

use crate::database::Database;
use crate::objects::ContractUserObject;

pub struct ContractHost<'a> {
    db: &'a mut Database,
    contract_name: AccountName,
    caller: AccountName,
    creator: AccountName,
    /// user → state table; populated lazily, flushed on success.
    modified_data: BTreeMap<AccountName, Value>,
    events: Vec<ContractEvent>,
}

impl<'a> ContractHost<'a> {
    pub fn new(
        db: &'a mut Database,
        contract_name: AccountName,
        caller: AccountName,
        creator: AccountName,
    ) -> Self {
        ContractHost {
            db,
            contract_name,
            caller,
            creator,
            modified_data: BTreeMap::new(),
            events: Vec::new(),
        }
    }

    fn load_user_data(&mut self, user: &AccountName) -> Result<Value, ChainError> {
        if let Some(v) = self.modified_data.get(user) {
            return Ok(v.clone());
        }
        let stored = self
            .db
            .state
            .contract_users
            .find_by_key(&(self.contract_name.clone(), user.clone()))
            .map(|u| u.data.clone());
        match stored {
            Some(json) => gamebank_contract::jsonstr_to_table(&json),
            None => Ok(Value::Object(Default::default())),
        }
    }

    /// Write back every touched user table; create absent rows.
    pub fn persist(self) -> Result<Vec<ContractEvent>, ChainError> {
        let now = self.db.head_block_time();
        for (user, value) in self.modified_data {
            let json = value.to_string();
            let key = (self.contract_name.clone(), user.clone());
            match self.db.state.contract_users.find_by_key(&key).map(|u| u.id) {
                Some(id) => {
                    self.db.state.contract_users.modify(id, |u| {
                        u.data = json;
                        u.last_update = now;
                    });
                }
                None => {
                    let contract_name = self.contract_name.clone();
                    self.db.state.contract_users.insert(|id| ContractUserObject {
                        id,
                        contract_name,
                        user_name: user,
                        data: json,
                        created: now,
                        last_update: now,
                    });
                }
            }
        }
        Ok(self.events)
    }
}

impl HostApi for ContractHost<'_> {
    fn head_block_num(&self) -> u32 {
        self.db.head_block_num()
    }

    fn get_block_hash(
        &mut self,
        block_num: u32,
        count: u32,
        interval: u32,
    ) -> Result<String, ChainError> {
        ensure!(
            (1..=100).contains(&count),
            ChainError::Contract,
            "block count must be between 1 and 100"
        );
        ensure!(
            block_num > 0 && block_num <= self.db.head_block_num(),
            ChainError::Contract,
            "block number out of range"
        );
        ensure!(block_num >= count, ChainError::Contract, "block number must cover the count");
        ensure!(
            (1..=count).contains(&interval),
            ChainError::Contract,
            "interval must be between 1 and the count"
        );

        let mut digests: Vec<Digest> = Vec::with_capacity(count as usize);
        for i in 0..count {
            let num = block_num - i * interval;
            let block = self
                .db
                .fetch_block_by_number(num)?
                .ok_or_else(|| ChainError::Contract(format!("block {num} not found")))?;
            let digest = if block.transactions.is_empty() {
                block.signed_header.header.digest()
            } else {
                Digest::hash(&block.signed_header.header.transaction_merkle_root.0)
            };
            digests.push(digest);
        }
        Ok(gamebank_crypto::hash::chained_ripemd160(digests.into_iter()).to_hex())
    }

    fn contract_name(&self) -> &AccountName {
        &self.contract_name
    }

    fn caller(&self) -> &AccountName {
        &self.caller
    }

    fn creator(&self) -> &AccountName {
        &self.creator
    }

    fn get_data(&mut self) -> Result<Value, ChainError> {
        let name = self.contract_name.clone();
        self.load_user_data(&name)
    }

    fn get_user_data(&mut self, user: &AccountName) -> Result<Value, ChainError> {
        self.load_user_data(user)
    }

    fn set_user_data(&mut self, user: &AccountName, data: Value) -> Result<(), ChainError> {
        self.modified_data.insert(user.clone(), data);
        Ok(())
    }

    fn transfer(
        &mut self,
        from: &AccountName,
        to: &AccountName,
        amount: Asset,
    ) -> Result<(), ChainError> {
        ensure!(
            amount.symbol == GBC && amount.amount > 0,
            ChainError::Contract,
            "contract transfers move a positive GBC amount"
        );

        let contract_id = self
            .db
            .state
            .contracts
            .find_by_key(&self.contract_name)
            .map(|c| c.id)
            .ok_or_else(|| ChainError::Contract("contract object missing".into()))?;

        if *from == self.caller {
            // deposits may only flow from the caller into the contract
            ensure!(
                *to == self.contract_name,
                ChainError::Contract,
                "caller funds may only be sent to the contract"
            );
            self.db
                .adjust_balance(from, -amount)
                .map_err(|e| ChainError::Contract(e.to_string()))?;
            self.db
                .state
                .contracts
                .modify(contract_id, |c| c.balance += amount);
        } else if *from == self.contract_name {
            let balance = self
                .db
                .state
                .contracts
                .find(contract_id)
                .map(|c| c.balance)
                .unwrap_or_else(|| Asset::zero(GBC));
            ensure!(
                balance >= amount,
                ChainError::Contract,
                "contract has insufficient balance"
            );
            self.db
                .state
                .contracts
                .modify(contract_id, |c| c.balance -= amount);
            self.db
                .adjust_balance(to, amount)
                .map_err(|e| ChainError::Contract(e.to_string()))?;
        } else {
            return Err(ChainError::Contract(
                "transfers must originate from the caller or the contract".into(),
            ));
        }

        self.events.push(ContractEvent::Transfer {
            from: from.clone(),
            to: to.clone(),
            amount,
        });
        Ok(())
    }

    fn emit(&mut self, key: &str, data: Value) -> Result<(), ChainError> {
        self.events.push(ContractEvent::Emit {
            key: key.to_string(),
            data,
        });
        Ok(())
    }
}
