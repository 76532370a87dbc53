//! Per-operation evaluators.
//!
//! Each evaluator is a pure function over `(&mut Database, &op)`; evaluators
//! never know about each other and share no mutable state outside the store.
//! Errors roll back the enclosing transaction session.

mod account;
mod comment;
mod contract;
mod custom;
mod escrow;
mod funding;
mod market;
mod recovery;
mod transfer;
mod witness;

use gamebank_protocol::error::ChainError;
use gamebank_protocol::operations::Operation;

use crate::database::Database;

pub fn apply(db: &mut Database, op: &Operation) -> Result<(), ChainError> {
    use Operation::*;
    match op {
        Vote(o) => comment::vote(db, o),
        Comment(o) => comment::comment(db, o),
        CommentOptions(o) => comment::comment_options(db, o),
        DeleteComment(o) => comment::delete_comment(db, o),

        Transfer(o) => transfer::transfer(db, o),
        TransferToVesting(o) => transfer::transfer_to_vesting(db, o),
        WithdrawVesting(o) => transfer::withdraw_vesting(db, o),
        SetWithdrawVestingRoute(o) => transfer::set_withdraw_vesting_route(db, o),
        TransferToSavings(o) => transfer::transfer_to_savings(db, o),
        TransferFromSavings(o) => transfer::transfer_from_savings(db, o),
        CancelTransferFromSavings(o) => transfer::cancel_transfer_from_savings(db, o),
        ClaimRewardBalance(o) => transfer::claim_reward_balance(db, o),
        DelegateVestingShares(o) => transfer::delegate_vesting_shares(db, o),

        LimitOrderCreate(o) => market::limit_order_create(db, o),
        LimitOrderCreate2(o) => market::limit_order_create2(db, o),
        LimitOrderCancel(o) => market::limit_order_cancel(db, o),
        Convert(o) => market::convert(db, o),
        FeedPublish(o) => market::feed_publish(db, o),

        AccountCreate(o) => account::account_create(db, o),
        AccountCreateWithDelegation(o) => account::account_create_with_delegation(db, o),
        AccountUpdate(o) => account::account_update(db, o),
        ClaimAccount(o) => account::claim_account(db, o),
        CreateClaimedAccount(o) => account::create_claimed_account(db, o),

        WitnessUpdate(o) => witness::witness_update(db, o),
        WitnessSetProperties(o) => witness::witness_set_properties(db, o),
        AccountWitnessVote(o) => witness::account_witness_vote(db, o),
        AccountWitnessProxy(o) => witness::account_witness_proxy(db, o),
        Pow(o) => witness::pow(db, o),
        Pow2(o) => witness::pow2(db, o),
        ReportOverProduction(o) => witness::report_over_production(db, o),

        RequestAccountRecovery(o) => recovery::request_account_recovery(db, o),
        RecoverAccount(o) => recovery::recover_account(db, o),
        ChangeRecoveryAccount(o) => recovery::change_recovery_account(db, o),
        DeclineVotingRights(o) => recovery::decline_voting_rights(db, o),

        EscrowTransfer(o) => escrow::escrow_transfer(db, o),
        EscrowApprove(o) => escrow::escrow_approve(db, o),
        EscrowDispute(o) => escrow::escrow_dispute(db, o),
        EscrowRelease(o) => escrow::escrow_release(db, o),

        Custom(o) => custom::custom(db, o),
        CustomJson(o) => custom::custom_json(db, o),
        CustomBinary(o) => custom::custom_binary(db, o),

        Crowdfunding(o) => funding::crowdfunding(db, o),
        Invest(o) => funding::invest(db, o),
        NonfungibleFundCreate(o) => funding::nonfungible_fund_create(db, o),
        NonfungibleFundTransfer(o) => funding::nonfungible_fund_transfer(db, o),
        NonfungibleFundPutUpForSale(o) => funding::nonfungible_fund_put_up_for_sale(db, o),
        NonfungibleFundWithdrawFromSale(o) => funding::nonfungible_fund_withdraw_from_sale(db, o),
        NonfungibleFundBuy(o) => funding::nonfungible_fund_buy(db, o),

        ContractDeploy(o) => contract::contract_deploy(db, o),
        ContractCall(o) => contract::contract_call(db, o),
    }
}
