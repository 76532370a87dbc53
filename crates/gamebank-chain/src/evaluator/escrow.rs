use gamebank_protocol::ensure;
use gamebank_protocol::error::ChainError;
use gamebank_protocol::operations::{
    EscrowApproveOperation, EscrowDisputeOperation, EscrowReleaseOperation,
    EscrowTransferOperation,
};

use crate::database::Database;
use crate::objects::EscrowObject;

pub fn escrow_transfer(db: &mut Database, o: &EscrowTransferOperation) -> Result<(), ChainError> {
    let now = db.head_block_time();
    db.state.get_account(&o.to)?;
    db.state.get_account(&o.agent)?;
    ensure!(
        o.ratification_deadline > now,
        ChainError::StatePrecondition,
        "the ratification deadline is in the past"
    );
    ensure!(
        o.escrow_expiration > now,
        ChainError::StatePrecondition,
        "the escrow expiration is in the past"
    );
    ensure!(
        db.state
            .escrows
            .find_by_key(&(o.from.clone(), o.escrow_id))
            .is_none(),
        ChainError::StatePrecondition,
        "an escrow with this id already exists"
    );

    if o.gbd_amount.amount > 0 {
        db.adjust_balance(&o.from, -o.gbd_amount)?;
    }
    if o.gbc_amount.amount > 0 {
        db.adjust_balance(&o.from, -o.gbc_amount)?;
    }
    if o.fee.amount > 0 {
        db.adjust_balance(&o.from, -o.fee)?;
    }

    let op = o.clone();
    db.state.escrows.insert(|id| EscrowObject {
        id,
        escrow_id: op.escrow_id,
        from: op.from,
        to: op.to,
        agent: op.agent,
        ratification_deadline: op.ratification_deadline,
        escrow_expiration: op.escrow_expiration,
        gbd_balance: op.gbd_amount,
        gbc_balance: op.gbc_amount,
        pending_fee: op.fee,
        to_approved: false,
        agent_approved: false,
        disputed: false,
    });
    Ok(())
}

pub fn escrow_approve(db: &mut Database, o: &EscrowApproveOperation) -> Result<(), ChainError> {
    let escrow = db
        .state
        .escrows
        .find_by_key(&(o.from.clone(), o.escrow_id))
        .cloned()
        .ok_or_else(|| ChainError::StatePrecondition("no escrow with this id".into()))?;
    ensure!(
        escrow.to == o.to && escrow.agent == o.agent,
        ChainError::StatePrecondition,
        "escrow parties do not match the operation"
    );

    let already = if o.who == escrow.to {
        escrow.to_approved
    } else {
        escrow.agent_approved
    };
    ensure!(!already, ChainError::StatePrecondition, "{} has already approved this escrow", o.who);

    if !o.approve {
        // any rejection dissolves the escrow and refunds the sender
        db.adjust_balance(&escrow.from, escrow.gbc_balance)?;
        db.adjust_balance(&escrow.from, escrow.gbd_balance)?;
        db.adjust_balance(&escrow.from, escrow.pending_fee)?;
        db.state.escrows.remove(escrow.id);
        return Ok(());
    }

    let to_approved = escrow.to_approved || o.who == escrow.to;
    let agent_approved = escrow.agent_approved || o.who == escrow.agent;
    db.state.escrows.modify(escrow.id, |e| {
        e.to_approved = to_approved;
        e.agent_approved = agent_approved;
    });

    // once both sides ratify, the agent collects its fee
    if to_approved && agent_approved && escrow.pending_fee.amount > 0 {
        db.adjust_balance(&escrow.agent, escrow.pending_fee)?;
        db.state.escrows.modify(escrow.id, |e| {
            e.pending_fee.amount = 0;
        });
    }
    Ok(())
}

pub fn escrow_dispute(db: &mut Database, o: &EscrowDisputeOperation) -> Result<(), ChainError> {
    let escrow = db
        .state
        .escrows
        .find_by_key(&(o.from.clone(), o.escrow_id))
        .cloned()
        .ok_or_else(|| ChainError::StatePrecondition("no escrow with this id".into()))?;
    let now = db.head_block_time();

    ensure!(
        escrow.to == o.to && escrow.agent == o.agent,
        ChainError::StatePrecondition,
        "escrow parties do not match the operation"
    );
    ensure!(
        escrow.is_approved(),
        ChainError::StatePrecondition,
        "the escrow must be fully ratified before a dispute"
    );
    ensure!(
        now < escrow.escrow_expiration,
        ChainError::StatePrecondition,
        "the escrow has already expired"
    );
    ensure!(!escrow.disputed, ChainError::StatePrecondition, "the escrow is already disputed");

    db.state.escrows.modify(escrow.id, |e| e.disputed = true);
    Ok(())
}

pub fn escrow_release(db: &mut Database, o: &EscrowReleaseOperation) -> Result<(), ChainError> {
    let escrow = db
        .state
        .escrows
        .find_by_key(&(o.from.clone(), o.escrow_id))
        .cloned()
        .ok_or_else(|| ChainError::StatePrecondition("no escrow with this id".into()))?;
    let now = db.head_block_time();

    ensure!(
        escrow.to == o.to && escrow.agent == o.agent,
        ChainError::StatePrecondition,
        "escrow parties do not match the operation"
    );
    ensure!(
        escrow.is_approved(),
        ChainError::StatePrecondition,
        "funds can only be released from a ratified escrow"
    );

    if escrow.disputed {
        ensure!(
            o.who == escrow.agent,
            ChainError::StatePrecondition,
            "only the agent may release a disputed escrow"
        );
    } else {
        ensure!(
            o.who == escrow.from || o.who == escrow.to,
            ChainError::StatePrecondition,
            "only from or to may release an undisputed escrow"
        );
        if now < escrow.escrow_expiration {
            // before expiration each party may only release to the other
            if o.who == escrow.from {
                ensure!(
                    o.receiver == escrow.to,
                    ChainError::StatePrecondition,
                    "from may only release to the recipient before expiration"
                );
            } else {
                ensure!(
                    o.receiver == escrow.from,
                    ChainError::StatePrecondition,
                    "to may only release back to the sender before expiration"
                );
            }
        }
    }

    ensure!(
        o.gbc_amount <= escrow.gbc_balance && o.gbd_amount <= escrow.gbd_balance,
        ChainError::StatePrecondition,
        "release exceeds the escrow balance"
    );

    if o.gbc_amount.amount > 0 {
        db.adjust_balance(&o.receiver, o.gbc_amount)?;
    }
    if o.gbd_amount.amount > 0 {
        db.adjust_balance(&o.receiver, o.gbd_amount)?;
    }
    let remaining_gbc = escrow.gbc_balance - o.gbc_amount;
    let remaining_gbd = escrow.gbd_balance - o.gbd_amount;
    if remaining_gbc.amount == 0 && remaining_gbd.amount == 0 {
        db.state.escrows.remove(escrow.id);
    } else {
        db.state.escrows.modify(escrow.id, |e| {
            e.gbc_balance = remaining_gbc;
            e.gbd_balance = remaining_gbd;
        });
    }
    Ok(())
}
