//! State object definitions, one table per type.

pub mod account;
pub mod comment;
pub mod contract;
pub mod escrow;
pub mod funding;
pub mod global;
pub mod market;
pub mod witness;

pub use account::{
    AccountObject, AccountRecoveryRequestObject, ChangeRecoveryAccountRequestObject,
    DeclineVotingRightsRequestObject, OwnerAuthorityHistoryObject, VestingDelegationExpirationObject,
    VestingDelegationObject, WithdrawVestingRouteObject,
};
pub use comment::{CommentObject, CommentVoteObject};
pub use contract::{ContractObject, ContractUserObject};
pub use escrow::{EscrowObject, SavingsWithdrawObject};
pub use funding::{
    CrowdfundingInvestObject, CrowdfundingObject, NonfungibleFundObject,
    NonfungibleFundOnSaleObject, CROWDFUNDING_FUNDED, CROWDFUNDING_OPEN, CROWDFUNDING_REFUNDED,
};
pub use global::{
    BlockSummaryObject, DynamicGlobalPropertyObject, FeedHistoryObject, HardforkPropertyObject,
    RewardCurve, RewardFundObject, TransactionObject,
};
pub use market::{ConvertRequestObject, LimitOrderObject, LiquidityRewardBalanceObject};
pub use witness::{WitnessObject, WitnessScheduleKind, WitnessScheduleObject, WitnessVoteObject};
