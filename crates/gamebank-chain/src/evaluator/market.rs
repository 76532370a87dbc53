use gamebank_protocol::asset::Price;
use gamebank_protocol::config;
use gamebank_protocol::ensure;
use gamebank_protocol::error::ChainError;
use gamebank_protocol::operations::{
    ConvertOperation, FeedPublishOperation, LimitOrderCancelOperation, LimitOrderCreate2Operation,
    LimitOrderCreateOperation,
};

use crate::database::Database;
use crate::objects::{ConvertRequestObject, LimitOrderObject};

fn place_order(
    db: &mut Database,
    owner: &gamebank_protocol::types::AccountName,
    order_id: u32,
    amount_to_sell: gamebank_protocol::asset::Asset,
    sell_price: Price,
    fill_or_kill: bool,
    expiration: i64,
) -> Result<(), ChainError> {
    let now = db.head_block_time();
    ensure!(expiration > now, ChainError::StatePrecondition, "limit order has already expired");
    ensure!(
        expiration <= now + config::MAX_LIMIT_ORDER_EXPIRATION,
        ChainError::StatePrecondition,
        "limit order expiration is too far in the future"
    );
    ensure!(
        db.state
            .limit_orders
            .find_by_key(&(owner.clone(), order_id))
            .is_none(),
        ChainError::StatePrecondition,
        "an order with this id already exists"
    );

    db.adjust_balance(owner, -amount_to_sell)?;

    let owner_name = owner.clone();
    let table_id = db.state.limit_orders.insert(|id| LimitOrderObject {
        id,
        created: now,
        expiration,
        seller: owner_name,
        order_id,
        for_sale: amount_to_sell.amount,
        sell_price,
    });

    let filled = db.apply_order(table_id)?;
    ensure!(
        !fill_or_kill || filled,
        ChainError::StatePrecondition,
        "a fill-or-kill order was not completely filled"
    );
    Ok(())
}

pub fn limit_order_create(db: &mut Database, o: &LimitOrderCreateOperation) -> Result<(), ChainError> {
    let sell_price = Price::new(o.amount_to_sell, o.min_to_receive);
    place_order(
        db,
        &o.owner,
        o.order_id,
        o.amount_to_sell,
        sell_price,
        o.fill_or_kill,
        o.expiration,
    )
}

pub fn limit_order_create2(
    db: &mut Database,
    o: &LimitOrderCreate2Operation,
) -> Result<(), ChainError> {
    place_order(
        db,
        &o.owner,
        o.order_id,
        o.amount_to_sell,
        o.exchange_rate,
        o.fill_or_kill,
        o.expiration,
    )
}

pub fn limit_order_cancel(db: &mut Database, o: &LimitOrderCancelOperation) -> Result<(), ChainError> {
    let order = db
        .state
        .limit_orders
        .find_by_key(&(o.owner.clone(), o.order_id))
        .cloned()
        .ok_or_else(|| ChainError::StatePrecondition("no order with this id".into()))?;
    db.cancel_order(&order)
}

pub fn convert(db: &mut Database, o: &ConvertOperation) -> Result<(), ChainError> {
    ensure!(
        !db.state.feed().current_median_history.is_null(),
        ChainError::StatePrecondition,
        "cannot convert before a price feed is established"
    );
    ensure!(
        db.state
            .convert_requests
            .find_by_key(&(o.owner.clone(), o.request_id))
            .is_none(),
        ChainError::StatePrecondition,
        "a conversion with this request id already exists"
    );

    db.adjust_balance(&o.owner, -o.amount)?;

    let now = db.head_block_time();
    let (owner, request_id, amount) = (o.owner.clone(), o.request_id, o.amount);
    db.state.convert_requests.insert(|id| ConvertRequestObject {
        id,
        owner,
        request_id,
        amount,
        conversion_date: now + config::CONVERSION_DELAY_SECONDS,
    });
    Ok(())
}

pub fn feed_publish(db: &mut Database, o: &FeedPublishOperation) -> Result<(), ChainError> {
    let witness = db.state.get_witness(&o.publisher)?.clone();
    let now = db.head_block_time();
    db.state.witnesses.modify(witness.id, |w| {
        w.gbd_exchange_rate = o.exchange_rate;
        w.last_gbd_exchange_update = now;
    });
    Ok(())
}
