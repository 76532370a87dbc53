use gamebank_protocol::ensure;
use gamebank_protocol::error::ChainError;
use gamebank_protocol::operations::{
    CrowdfundingOperation, InvestOperation, NonfungibleFundBuyOperation,
    NonfungibleFundCreateOperation, NonfungibleFundPutUpForSaleOperation,
    NonfungibleFundTransferOperation, NonfungibleFundWithdrawFromSaleOperation,
};

use crate::database::Database;
use crate::objects::{
    CrowdfundingInvestObject, CrowdfundingObject, NonfungibleFundObject,
    NonfungibleFundOnSaleObject, CROWDFUNDING_OPEN,
};

/// A crowdfunding round runs for a fixed three days.
const CROWDFUNDING_DURATION: i64 = 3 * 24 * 60 * 60;

pub fn crowdfunding(db: &mut Database, o: &CrowdfundingOperation) -> Result<(), ChainError> {
    let originator = db.state.get_account(&o.originator)?.clone();
    let now = db.head_block_time();

    ensure!(
        now > originator.last_crowdfunding_expire,
        ChainError::StatePrecondition,
        "a crowdfunding by this account is still in progress"
    );
    ensure!(
        db.state
            .crowdfundings
            .find_by_key(&(o.originator.clone(), o.permlink.clone()))
            .is_none(),
        ChainError::StatePrecondition,
        "a crowdfunding with this permlink already exists"
    );

    let expire = now + CROWDFUNDING_DURATION;
    db.state.accounts.modify(originator.id, |a| {
        a.last_crowdfunding_expire = expire;
        a.crowdfunding_count += 1;
    });

    let op = o.clone();
    db.state.crowdfundings.insert(|id| CrowdfundingObject {
        id,
        originator: op.originator,
        permlink: op.permlink,
        title: op.title,
        body: op.body,
        json_metadata: op.json_metadata,
        created: now,
        expire,
        last_raise: 0,
        total_raise_value: op.raise,
        curator_raise_value: gamebank_protocol::asset::Asset::zero(gamebank_protocol::asset::GBC),
        finish: CROWDFUNDING_OPEN,
    });
    Ok(())
}

pub fn invest(db: &mut Database, o: &InvestOperation) -> Result<(), ChainError> {
    let cf = db
        .state
        .crowdfundings
        .find_by_key(&(o.originator.clone(), o.permlink.clone()))
        .cloned()
        .ok_or_else(|| ChainError::StatePrecondition("unknown crowdfunding".into()))?;
    let invester = db.state.get_account(&o.invester)?.clone();
    let now = db.head_block_time();

    ensure!(now < cf.expire, ChainError::StatePrecondition, "the crowdfunding is complete");
    ensure!(
        cf.curator_raise_value + o.raise <= cf.total_raise_value,
        ChainError::StatePrecondition,
        "investment would exceed the funding target"
    );

    db.adjust_balance(&o.invester, -o.raise)?;
    db.state.crowdfundings.modify(cf.id, |c| {
        c.curator_raise_value += o.raise;
        c.last_raise = now;
    });

    let existing = db
        .state
        .crowdfunding_invests
        .find_by_key(&(cf.id, o.invester.clone()))
        .map(|i| i.id);
    match existing {
        Some(id) => {
            db.state.crowdfunding_invests.modify(id, |i| {
                i.raise += o.raise;
                i.last_update = now;
            });
        }
        None => {
            let invester_name = invester.name.clone();
            let (cf_id, raise, expire) = (cf.id, o.raise, cf.expire);
            db.state
                .crowdfunding_invests
                .insert(|id| CrowdfundingInvestObject {
                    id,
                    crowdfunding: cf_id,
                    invester: invester_name,
                    raise,
                    expire,
                    last_update: now,
                });
        }
    }
    Ok(())
}

pub fn nonfungible_fund_create(
    db: &mut Database,
    o: &NonfungibleFundCreateOperation,
) -> Result<(), ChainError> {
    db.state.get_account(&o.creator)?;
    db.state.get_account(&o.owner)?;
    let now = db.head_block_time();

    let op = o.clone();
    db.state.nonfungible_funds.insert(|id| NonfungibleFundObject {
        id,
        creator: op.creator,
        owner: op.owner,
        meta_data: op.meta_data,
        created: now,
        last_update: now,
    });
    Ok(())
}

fn get_fund(db: &Database, fund_id: u64) -> Result<NonfungibleFundObject, ChainError> {
    db.state
        .nonfungible_funds
        .find_by_key(&fund_id)
        .cloned()
        .ok_or_else(|| ChainError::StatePrecondition(format!("unknown fund {fund_id}")))
}

pub fn nonfungible_fund_transfer(
    db: &mut Database,
    o: &NonfungibleFundTransferOperation,
) -> Result<(), ChainError> {
    let from = db.state.get_account(&o.from)?.clone();
    db.state.get_account(&o.to)?;
    let fund = get_fund(db, o.fund_id)?;
    ensure!(
        fund.owner == from.name,
        ChainError::StatePrecondition,
        "only the fund's owner may transfer it"
    );
    ensure!(
        db.state.nonfungible_funds_on_sale.find_by_key(&o.fund_id).is_none(),
        ChainError::StatePrecondition,
        "the fund is listed for sale"
    );

    let now = db.head_block_time();
    let to = o.to.clone();
    db.state.nonfungible_funds.modify(fund.id, |f| {
        f.owner = to;
        f.last_update = now;
    });
    Ok(())
}

pub fn nonfungible_fund_put_up_for_sale(
    db: &mut Database,
    o: &NonfungibleFundPutUpForSaleOperation,
) -> Result<(), ChainError> {
    let now = db.head_block_time();
    ensure!(o.expiration > now, ChainError::StatePrecondition, "the listing has already expired");
    let seller = db.state.get_account(&o.seller)?.clone();
    let fund = get_fund(db, o.fund_id)?;
    ensure!(
        fund.owner == seller.name,
        ChainError::StatePrecondition,
        "only the fund's owner may list it"
    );
    ensure!(
        db.state.nonfungible_funds_on_sale.find_by_key(&o.fund_id).is_none(),
        ChainError::StatePrecondition,
        "the fund is already listed for sale"
    );

    let op = o.clone();
    db.state
        .nonfungible_funds_on_sale
        .insert(|id| NonfungibleFundOnSaleObject {
            id,
            fund_id: op.fund_id,
            seller: op.seller,
            selling_price: op.selling_price,
            created: now,
            expiration: op.expiration,
        });
    Ok(())
}

pub fn nonfungible_fund_withdraw_from_sale(
    db: &mut Database,
    o: &NonfungibleFundWithdrawFromSaleOperation,
) -> Result<(), ChainError> {
    let seller = db.state.get_account(&o.seller)?.clone();
    let fund = get_fund(db, o.fund_id)?;
    ensure!(
        fund.owner == seller.name,
        ChainError::StatePrecondition,
        "only the fund's owner may withdraw the listing"
    );
    let listing = db
        .state
        .nonfungible_funds_on_sale
        .find_by_key(&o.fund_id)
        .cloned()
        .ok_or_else(|| ChainError::StatePrecondition("the fund is not listed for sale".into()))?;
    db.state.nonfungible_funds_on_sale.remove(listing.id);
    Ok(())
}

pub fn nonfungible_fund_buy(
    db: &mut Database,
    o: &NonfungibleFundBuyOperation,
) -> Result<(), ChainError> {
    db.state.get_account(&o.buyer)?;
    let fund = get_fund(db, o.fund_id)?;
    let listing = db
        .state
        .nonfungible_funds_on_sale
        .find_by_key(&o.fund_id)
        .cloned()
        .ok_or_else(|| ChainError::StatePrecondition("the fund is not listed for sale".into()))?;

    db.adjust_balance(&o.buyer, -listing.selling_price)?;
    db.adjust_balance(&listing.seller, listing.selling_price)?;

    db.state.nonfungible_funds_on_sale.remove(listing.id);
    let now = db.head_block_time();
    let buyer = o.buyer.clone();
    db.state.nonfungible_funds.modify(fund.id, |f| {
        f.owner = buyer;
        f.last_update = now;
    });
    Ok(())
}
