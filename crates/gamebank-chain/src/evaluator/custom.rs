use gamebank_protocol::error::ChainError;
use gamebank_protocol::operations::{
    CustomBinaryOperation, CustomJsonOperation, CustomOperation,
};

use crate::database::Database;

// Custom payloads carry application data for off-chain observers. The core
// authority-checks them and records them in the chain, but applies no state
// transition of its own.

pub fn custom(db: &mut Database, o: &CustomOperation) -> Result<(), ChainError> {
    for name in &o.required_auths {
        db.state.get_account(name)?;
    }
    Ok(())
}

pub fn custom_json(db: &mut Database, o: &CustomJsonOperation) -> Result<(), ChainError> {
    for name in o.required_auths.iter().chain(&o.required_posting_auths) {
        db.state.get_account(name)?;
    }
    Ok(())
}

pub fn custom_binary(db: &mut Database, o: &CustomBinaryOperation) -> Result<(), ChainError> {
    for name in o
        .required_owner_auths
        .iter()
        .chain(&o.required_active_auths)
        .chain(&o.required_posting_auths)
    {
        db.state.get_account(name)?;
    }
    Ok(())
}
