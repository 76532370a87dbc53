//! The operation set.
//!
//! Every state transition a transaction can request is one variant of
//! [`Operation`]. Each operation carries its own static `validate()` (field
//! ranges, name syntax, asset symbols) and declares which authority roles
//! must sign for it. Virtual operations are emitted by the chain for
//! observers and are never accepted inside a transaction.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::asset::{Asset, Price, GBC, GBD, GBS};
use crate::authority::Authority;
use crate::config;
use crate::ensure;
use crate::error::ChainError;
use crate::types::{AccountName, PublicKey, Timestamp};

fn validate_account_name(name: &AccountName) -> Result<(), ChainError> {
    ensure!(name.is_valid(), ChainError::Validation, "invalid account name: {name}");
    Ok(())
}

fn validate_permlink(permlink: &str) -> Result<(), ChainError> {
    ensure!(
        permlink.len() <= config::MAX_PERMLINK_LENGTH,
        ChainError::Validation,
        "permlink is too long"
    );
    Ok(())
}

fn validate_json(json: &str) -> Result<(), ChainError> {
    if !json.is_empty() {
        ensure!(
            serde_json::from_str::<serde_json::Value>(json).is_ok(),
            ChainError::Validation,
            "metadata is not valid JSON"
        );
    }
    Ok(())
}

// ── Content ──────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VoteOperation {
    pub voter: AccountName,
    pub author: AccountName,
    pub permlink: String,
    /// Signed percent in basis points: −10000 ..= 10000.
    pub weight: i16,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommentOperation {
    /// Empty for a root post.
    pub parent_author: AccountName,
    pub parent_permlink: String,
    pub author: AccountName,
    pub permlink: String,
    pub title: String,
    pub body: String,
    pub json_metadata: String,
}

/// A payout route attached to a comment before it receives votes.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BeneficiaryRoute {
    pub account: AccountName,
    pub weight: u16,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommentOptionsOperation {
    pub author: AccountName,
    pub permlink: String,
    /// Payout ceiling; GBD-denominated.
    pub max_accepted_payout: Asset,
    pub percent_gamebank_dollars: u16,
    pub allow_votes: bool,
    pub allow_curation_rewards: bool,
    pub beneficiaries: Vec<BeneficiaryRoute>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeleteCommentOperation {
    pub author: AccountName,
    pub permlink: String,
}

// ── Token movement ───────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransferOperation {
    pub from: AccountName,
    pub to: AccountName,
    pub amount: Asset,
    pub memo: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransferToVestingOperation {
    pub from: AccountName,
    /// Empty means "vest to self".
    pub to: AccountName,
    pub amount: Asset,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WithdrawVestingOperation {
    pub account: AccountName,
    pub vesting_shares: Asset,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SetWithdrawVestingRouteOperation {
    pub from_account: AccountName,
    pub to_account: AccountName,
    pub percent: u16,
    pub auto_vest: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransferToSavingsOperation {
    pub from: AccountName,
    pub to: AccountName,
    pub amount: Asset,
    pub memo: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransferFromSavingsOperation {
    pub from: AccountName,
    pub request_id: u32,
    pub to: AccountName,
    pub amount: Asset,
    pub memo: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CancelTransferFromSavingsOperation {
    pub from: AccountName,
    pub request_id: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClaimRewardBalanceOperation {
    pub account: AccountName,
    pub reward_gbc: Asset,
    pub reward_gbd: Asset,
    pub reward_vests: Asset,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DelegateVestingSharesOperation {
    pub delegator: AccountName,
    pub delegatee: AccountName,
    pub vesting_shares: Asset,
}

// ── Market ───────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LimitOrderCreateOperation {
    pub owner: AccountName,
    pub order_id: u32,
    pub amount_to_sell: Asset,
    pub min_to_receive: Asset,
    pub fill_or_kill: bool,
    pub expiration: Timestamp,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LimitOrderCreate2Operation {
    pub owner: AccountName,
    pub order_id: u32,
    pub amount_to_sell: Asset,
    pub exchange_rate: Price,
    pub fill_or_kill: bool,
    pub expiration: Timestamp,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LimitOrderCancelOperation {
    pub owner: AccountName,
    pub order_id: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConvertOperation {
    pub owner: AccountName,
    pub request_id: u32,
    pub amount: Asset,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FeedPublishOperation {
    pub publisher: AccountName,
    /// GBD per GBC.
    pub exchange_rate: Price,
}

// ── Accounts ─────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccountCreateOperation {
    pub fee: Asset,
    pub creator: AccountName,
    pub new_account_name: AccountName,
    pub owner: Authority,
    pub active: Authority,
    pub posting: Authority,
    pub memo_key: PublicKey,
    pub json_metadata: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccountCreateWithDelegationOperation {
    pub fee: Asset,
    pub delegation: Asset,
    pub creator: AccountName,
    pub new_account_name: AccountName,
    pub owner: Authority,
    pub active: Authority,
    pub posting: Authority,
    pub memo_key: PublicKey,
    pub json_metadata: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccountUpdateOperation {
    pub account: AccountName,
    pub owner: Option<Authority>,
    pub active: Option<Authority>,
    pub posting: Option<Authority>,
    pub memo_key: PublicKey,
    pub json_metadata: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClaimAccountOperation {
    pub creator: AccountName,
    pub fee: Asset,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreateClaimedAccountOperation {
    pub creator: AccountName,
    pub new_account_name: AccountName,
    pub owner: Authority,
    pub active: Authority,
    pub posting: Authority,
    pub memo_key: PublicKey,
    pub json_metadata: String,
}

// ── Recovery ─────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RequestAccountRecoveryOperation {
    pub recovery_account: AccountName,
    pub account_to_recover: AccountName,
    pub new_owner_authority: Authority,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RecoverAccountOperation {
    pub account_to_recover: AccountName,
    pub new_owner_authority: Authority,
    pub recent_owner_authority: Authority,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChangeRecoveryAccountOperation {
    pub account_to_recover: AccountName,
    pub new_recovery_account: AccountName,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DeclineVotingRightsOperation {
    pub account: AccountName,
    pub decline: bool,
}

// ── Witnesses ────────────────────────────────────────────────────────────────

/// The chain parameters a witness publishes alongside its candidacy.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChainProperties {
    pub account_creation_fee: Asset,
    pub maximum_block_size: u32,
    pub gbd_interest_rate: u16,
}

impl Default for ChainProperties {
    fn default() -> Self {
        ChainProperties {
            account_creation_fee: Asset::new(config::MIN_ACCOUNT_CREATION_FEE, GBC),
            maximum_block_size: config::MIN_BLOCK_SIZE_LIMIT,
            gbd_interest_rate: config::DEFAULT_GBD_INTEREST_RATE as u16,
        }
    }
}

impl ChainProperties {
    pub fn validate(&self) -> Result<(), ChainError> {
        ensure!(
            self.account_creation_fee.symbol == GBC && self.account_creation_fee.amount >= config::MIN_ACCOUNT_CREATION_FEE,
            ChainError::Validation,
            "account creation fee is below the minimum"
        );
        ensure!(
            self.maximum_block_size >= config::MIN_BLOCK_SIZE_LIMIT,
            ChainError::Validation,
            "maximum block size is below the minimum"
        );
        ensure!(
            self.gbd_interest_rate as u32 <= config::PERCENT_100,
            ChainError::Validation,
            "interest rate out of range"
        );
        Ok(())
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WitnessUpdateOperation {
    pub owner: AccountName,
    pub url: String,
    pub block_signing_key: PublicKey,
    pub props: ChainProperties,
    pub fee: Asset,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WitnessSetPropertiesOperation {
    pub owner: AccountName,
    /// The witness's current signing key; the operation is authorized by it
    /// rather than by the owner account.
    pub current_signing_key: PublicKey,
    pub props: ChainProperties,
    pub new_signing_key: Option<PublicKey>,
    pub url: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccountWitnessVoteOperation {
    pub account: AccountName,
    pub witness: AccountName,
    pub approve: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccountWitnessProxyOperation {
    pub account: AccountName,
    /// Empty clears the proxy.
    pub proxy: AccountName,
}

// ── Legacy mining ────────────────────────────────────────────────────────────

/// Retired proof-of-work submission. Kept in the wire format so historical
/// blocks deserialize; new submissions are rejected by the evaluator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PowOperation {
    pub worker_account: AccountName,
    pub block_id: crate::types::BlockId,
    pub nonce: u64,
    pub work: Vec<u8>,
    pub props: ChainProperties,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Pow2Operation {
    pub worker_account: AccountName,
    pub nonce: u64,
    pub pow_summary: u32,
    pub props: ChainProperties,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ReportOverProductionOperation {
    pub reporter: AccountName,
    pub first_block_header_digest: crate::types::Digest,
    pub second_block_header_digest: crate::types::Digest,
}

// ── Escrow ───────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EscrowTransferOperation {
    pub from: AccountName,
    pub to: AccountName,
    pub agent: AccountName,
    pub escrow_id: u32,
    pub gbd_amount: Asset,
    pub gbc_amount: Asset,
    pub fee: Asset,
    pub ratification_deadline: Timestamp,
    pub escrow_expiration: Timestamp,
    pub json_meta: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EscrowApproveOperation {
    pub from: AccountName,
    pub to: AccountName,
    pub agent: AccountName,
    /// Either `to` or `agent`.
    pub who: AccountName,
    pub escrow_id: u32,
    pub approve: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EscrowDisputeOperation {
    pub from: AccountName,
    pub to: AccountName,
    pub agent: AccountName,
    pub who: AccountName,
    pub escrow_id: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EscrowReleaseOperation {
    pub from: AccountName,
    pub to: AccountName,
    pub agent: AccountName,
    /// The party releasing funds.
    pub who: AccountName,
    /// Funds move to this party (`from` or `to`).
    pub receiver: AccountName,
    pub escrow_id: u32,
    pub gbd_amount: Asset,
    pub gbc_amount: Asset,
}

// ── Custom payloads ──────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CustomOperation {
    pub required_auths: Vec<AccountName>,
    pub id: u16,
    pub data: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CustomJsonOperation {
    pub required_auths: Vec<AccountName>,
    pub required_posting_auths: Vec<AccountName>,
    pub id: String,
    pub json: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CustomBinaryOperation {
    pub required_owner_auths: Vec<AccountName>,
    pub required_active_auths: Vec<AccountName>,
    pub required_posting_auths: Vec<AccountName>,
    pub required_auths: Vec<Authority>,
    pub id: String,
    pub data: Vec<u8>,
}

// ── Crowdfunding ─────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CrowdfundingOperation {
    pub originator: AccountName,
    pub permlink: String,
    pub title: String,
    pub body: String,
    pub json_metadata: String,
    /// Funding target (GBC).
    pub raise: Asset,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct InvestOperation {
    pub invester: AccountName,
    pub originator: AccountName,
    pub permlink: String,
    /// Amount invested (GBC).
    pub raise: Asset,
}

// ── Non-fungible funds ───────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NonfungibleFundCreateOperation {
    pub creator: AccountName,
    pub owner: AccountName,
    pub meta_data: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NonfungibleFundTransferOperation {
    pub from: AccountName,
    pub to: AccountName,
    pub fund_id: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NonfungibleFundPutUpForSaleOperation {
    pub seller: AccountName,
    pub fund_id: u64,
    pub selling_price: Asset,
    pub expiration: Timestamp,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NonfungibleFundWithdrawFromSaleOperation {
    pub seller: AccountName,
    pub fund_id: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NonfungibleFundBuyOperation {
    pub buyer: AccountName,
    pub fund_id: u64,
}

// ── Contracts ────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContractDeployOperation {
    pub creator: AccountName,
    pub name: AccountName,
    pub code: String,
    pub abi: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContractCallOperation {
    pub caller: AccountName,
    pub contract_name: AccountName,
    pub method: String,
    /// JSON-encoded positional arguments.
    pub args: String,
}

// ── Operation ────────────────────────────────────────────────────────────────

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Operation {
    Vote(VoteOperation),
    Comment(CommentOperation),
    Transfer(TransferOperation),
    TransferToVesting(TransferToVestingOperation),
    WithdrawVesting(WithdrawVestingOperation),
    LimitOrderCreate(LimitOrderCreateOperation),
    LimitOrderCancel(LimitOrderCancelOperation),
    FeedPublish(FeedPublishOperation),
    Convert(ConvertOperation),
    AccountCreate(AccountCreateOperation),
    AccountUpdate(AccountUpdateOperation),
    WitnessUpdate(WitnessUpdateOperation),
    AccountWitnessVote(AccountWitnessVoteOperation),
    AccountWitnessProxy(AccountWitnessProxyOperation),
    Pow(PowOperation),
    Custom(CustomOperation),
    ReportOverProduction(ReportOverProductionOperation),
    DeleteComment(DeleteCommentOperation),
    CustomJson(CustomJsonOperation),
    CommentOptions(CommentOptionsOperation),
    SetWithdrawVestingRoute(SetWithdrawVestingRouteOperation),
    LimitOrderCreate2(LimitOrderCreate2Operation),
    ClaimAccount(ClaimAccountOperation),
    CreateClaimedAccount(CreateClaimedAccountOperation),
    RequestAccountRecovery(RequestAccountRecoveryOperation),
    RecoverAccount(RecoverAccountOperation),
    ChangeRecoveryAccount(ChangeRecoveryAccountOperation),
    EscrowTransfer(EscrowTransferOperation),
    EscrowDispute(EscrowDisputeOperation),
    EscrowRelease(EscrowReleaseOperation),
    Pow2(Pow2Operation),
    EscrowApprove(EscrowApproveOperation),
    TransferToSavings(TransferToSavingsOperation),
    TransferFromSavings(TransferFromSavingsOperation),
    CancelTransferFromSavings(CancelTransferFromSavingsOperation),
    CustomBinary(CustomBinaryOperation),
    DeclineVotingRights(DeclineVotingRightsOperation),
    ClaimRewardBalance(ClaimRewardBalanceOperation),
    DelegateVestingShares(DelegateVestingSharesOperation),
    AccountCreateWithDelegation(AccountCreateWithDelegationOperation),
    WitnessSetProperties(WitnessSetPropertiesOperation),
    Crowdfunding(CrowdfundingOperation),
    Invest(InvestOperation),
    NonfungibleFundCreate(NonfungibleFundCreateOperation),
    NonfungibleFundTransfer(NonfungibleFundTransferOperation),
    NonfungibleFundPutUpForSale(NonfungibleFundPutUpForSaleOperation),
    NonfungibleFundWithdrawFromSale(NonfungibleFundWithdrawFromSaleOperation),
    NonfungibleFundBuy(NonfungibleFundBuyOperation),
    ContractDeploy(ContractDeployOperation),
    ContractCall(ContractCallOperation),
}

impl Operation {
    /// Static validation; no chain state consulted.
    pub fn validate(&self) -> Result<(), ChainError> {
        use Operation::*;
        match self {
            Vote(op) => {
                validate_account_name(&op.voter)?;
                validate_account_name(&op.author)?;
                validate_permlink(&op.permlink)?;
                ensure!(
                    op.weight.unsigned_abs() as u32 <= config::PERCENT_100,
                    ChainError::Validation,
                    "vote weight out of range"
                );
                Ok(())
            }
            Comment(op) => {
                validate_account_name(&op.author)?;
                if !op.parent_author.is_empty() {
                    validate_account_name(&op.parent_author)?;
                }
                validate_permlink(&op.parent_permlink)?;
                validate_permlink(&op.permlink)?;
                ensure!(!op.body.is_empty(), ChainError::Validation, "comment body is empty");
                ensure!(op.title.len() < 256, ChainError::Validation, "comment title is too long");
                validate_json(&op.json_metadata)
            }
            CommentOptions(op) => {
                validate_account_name(&op.author)?;
                validate_permlink(&op.permlink)?;
                ensure!(
                    op.percent_gamebank_dollars as u32 <= config::PERCENT_100,
                    ChainError::Validation,
                    "percent out of range"
                );
                ensure!(
                    op.max_accepted_payout.symbol == GBD && op.max_accepted_payout.amount >= 0,
                    ChainError::Validation,
                    "max accepted payout must be a non-negative GBD amount"
                );
                ensure!(
                    op.beneficiaries.len() <= config::MAX_COMMENT_BENEFICIARIES,
                    ChainError::Validation,
                    "too many beneficiary routes"
                );
                let mut total: u32 = 0;
                let mut prev: Option<&BeneficiaryRoute> = None;
                for route in &op.beneficiaries {
                    validate_account_name(&route.account)?;
                    ensure!(
                        route.weight as u32 <= config::PERCENT_100,
                        ChainError::Validation,
                        "beneficiary weight out of range"
                    );
                    if let Some(p) = prev {
                        ensure!(
                            p.account < route.account,
                            ChainError::Validation,
                            "beneficiaries must be sorted and unique"
                        );
                    }
                    total += route.weight as u32;
                    prev = Some(route);
                }
                ensure!(
                    total <= config::PERCENT_100,
                    ChainError::Validation,
                    "beneficiary weights exceed 100%"
                );
                Ok(())
            }
            DeleteComment(op) => {
                validate_account_name(&op.author)?;
                validate_permlink(&op.permlink)
            }
            Transfer(op) => {
                validate_account_name(&op.from)?;
                validate_account_name(&op.to)?;
                ensure!(op.amount.symbol != GBS, ChainError::Validation, "vesting shares cannot be transferred");
                ensure!(op.amount.amount > 0, ChainError::Validation, "transfer amount must be positive");
                ensure!(op.memo.len() <= config::MAX_MEMO_SIZE, ChainError::Validation, "memo is too large");
                Ok(())
            }
            TransferToVesting(op) => {
                validate_account_name(&op.from)?;
                if !op.to.is_empty() {
                    validate_account_name(&op.to)?;
                }
                ensure!(
                    op.amount.symbol == GBC && op.amount.amount > 0,
                    ChainError::Validation,
                    "amount must be a positive GBC amount"
                );
                Ok(())
            }
            WithdrawVesting(op) => {
                validate_account_name(&op.account)?;
                ensure!(op.vesting_shares.symbol == GBS, ChainError::Validation, "amount must be GBS");
                ensure!(op.vesting_shares.amount >= 0, ChainError::Validation, "cannot withdraw a negative amount");
                Ok(())
            }
            SetWithdrawVestingRoute(op) => {
                validate_account_name(&op.from_account)?;
                validate_account_name(&op.to_account)?;
                ensure!(
                    op.percent as u32 <= config::PERCENT_100,
                    ChainError::Validation,
                    "route percent out of range"
                );
                Ok(())
            }
            TransferToSavings(op) => {
                validate_account_name(&op.from)?;
                validate_account_name(&op.to)?;
                ensure!(op.amount.amount > 0, ChainError::Validation, "amount must be positive");
                ensure!(
                    matches!(op.amount.symbol, s if s == GBC || s == GBD),
                    ChainError::Validation,
                    "savings hold GBC or GBD only"
                );
                ensure!(op.memo.len() <= config::MAX_MEMO_SIZE, ChainError::Validation, "memo is too large");
                Ok(())
            }
            TransferFromSavings(op) => {
                validate_account_name(&op.from)?;
                validate_account_name(&op.to)?;
                ensure!(op.amount.amount > 0, ChainError::Validation, "amount must be positive");
                ensure!(
                    matches!(op.amount.symbol, s if s == GBC || s == GBD),
                    ChainError::Validation,
                    "savings hold GBC or GBD only"
                );
                ensure!(op.memo.len() <= config::MAX_MEMO_SIZE, ChainError::Validation, "memo is too large");
                Ok(())
            }
            CancelTransferFromSavings(op) => validate_account_name(&op.from),
            ClaimRewardBalance(op) => {
                validate_account_name(&op.account)?;
                ensure!(op.reward_gbc.symbol == GBC, ChainError::Validation, "reward_gbc must be GBC");
                ensure!(op.reward_gbd.symbol == GBD, ChainError::Validation, "reward_gbd must be GBD");
                ensure!(op.reward_vests.symbol == GBS, ChainError::Validation, "reward_vests must be GBS");
                ensure!(
                    op.reward_gbc.amount >= 0 && op.reward_gbd.amount >= 0 && op.reward_vests.amount >= 0,
                    ChainError::Validation,
                    "cannot claim a negative amount"
                );
                ensure!(
                    op.reward_gbc.amount > 0 || op.reward_gbd.amount > 0 || op.reward_vests.amount > 0,
                    ChainError::Validation,
                    "must claim something"
                );
                Ok(())
            }
            DelegateVestingShares(op) => {
                validate_account_name(&op.delegator)?;
                validate_account_name(&op.delegatee)?;
                ensure!(op.delegator != op.delegatee, ChainError::Validation, "cannot delegate to self");
                ensure!(
                    op.vesting_shares.symbol == GBS && op.vesting_shares.amount >= 0,
                    ChainError::Validation,
                    "delegation must be a non-negative GBS amount"
                );
                Ok(())
            }
            LimitOrderCreate(op) => {
                validate_account_name(&op.owner)?;
                ensure!(
                    (op.amount_to_sell.symbol == GBC && op.min_to_receive.symbol == GBD)
                        || (op.amount_to_sell.symbol == GBD && op.min_to_receive.symbol == GBC),
                    ChainError::Validation,
                    "limit orders trade GBC against GBD"
                );
                ensure!(
                    op.amount_to_sell.amount > 0 && op.min_to_receive.amount > 0,
                    ChainError::Validation,
                    "order amounts must be positive"
                );
                Ok(())
            }
            LimitOrderCreate2(op) => {
                validate_account_name(&op.owner)?;
                ensure!(op.exchange_rate.is_valid(), ChainError::Validation, "invalid exchange rate");
                ensure!(
                    op.amount_to_sell.symbol == op.exchange_rate.base.symbol,
                    ChainError::Validation,
                    "sell asset must be the base of the price"
                );
                ensure!(
                    (op.amount_to_sell.symbol == GBC && op.exchange_rate.quote.symbol == GBD)
                        || (op.amount_to_sell.symbol == GBD && op.exchange_rate.quote.symbol == GBC),
                    ChainError::Validation,
                    "limit orders trade GBC against GBD"
                );
                ensure!(op.amount_to_sell.amount > 0, ChainError::Validation, "order amounts must be positive");
                Ok(())
            }
            LimitOrderCancel(op) => validate_account_name(&op.owner),
            Convert(op) => {
                validate_account_name(&op.owner)?;
                ensure!(
                    op.amount.symbol == GBD && op.amount.amount > 0,
                    ChainError::Validation,
                    "conversion takes a positive GBD amount"
                );
                Ok(())
            }
            FeedPublish(op) => {
                validate_account_name(&op.publisher)?;
                ensure!(op.exchange_rate.is_valid(), ChainError::Validation, "invalid exchange rate");
                ensure!(
                    op.exchange_rate.base.symbol == GBD && op.exchange_rate.quote.symbol == GBC,
                    ChainError::Validation,
                    "feed must quote GBD against GBC"
                );
                Ok(())
            }
            AccountCreate(op) => {
                validate_account_name(&op.creator)?;
                validate_account_name(&op.new_account_name)?;
                ensure!(
                    op.fee.symbol == GBC && op.fee.amount >= 0,
                    ChainError::Validation,
                    "fee must be a non-negative GBC amount"
                );
                for auth in [&op.owner, &op.active, &op.posting] {
                    ensure!(auth.is_valid(), ChainError::Validation, "invalid authority");
                }
                validate_json(&op.json_metadata)
            }
            AccountCreateWithDelegation(op) => {
                validate_account_name(&op.creator)?;
                validate_account_name(&op.new_account_name)?;
                ensure!(op.fee.symbol == GBC && op.fee.amount >= 0, ChainError::Validation, "fee must be GBC");
                ensure!(
                    op.delegation.symbol == GBS && op.delegation.amount >= 0,
                    ChainError::Validation,
                    "delegation must be GBS"
                );
                for auth in [&op.owner, &op.active, &op.posting] {
                    ensure!(auth.is_valid(), ChainError::Validation, "invalid authority");
                }
                validate_json(&op.json_metadata)
            }
            AccountUpdate(op) => {
                validate_account_name(&op.account)?;
                for auth in [&op.owner, &op.active, &op.posting].into_iter().flatten() {
                    ensure!(auth.is_valid(), ChainError::Validation, "invalid authority");
                }
                validate_json(&op.json_metadata)
            }
            ClaimAccount(op) => {
                validate_account_name(&op.creator)?;
                ensure!(
                    op.fee.symbol == GBC && op.fee.amount >= 0,
                    ChainError::Validation,
                    "fee must be a non-negative GBC amount"
                );
                Ok(())
            }
            CreateClaimedAccount(op) => {
                validate_account_name(&op.creator)?;
                validate_account_name(&op.new_account_name)?;
                for auth in [&op.owner, &op.active, &op.posting] {
                    ensure!(auth.is_valid(), ChainError::Validation, "invalid authority");
                }
                validate_json(&op.json_metadata)
            }
            RequestAccountRecovery(op) => {
                validate_account_name(&op.recovery_account)?;
                validate_account_name(&op.account_to_recover)?;
                ensure!(op.new_owner_authority.is_valid(), ChainError::Validation, "invalid authority");
                Ok(())
            }
            RecoverAccount(op) => {
                validate_account_name(&op.account_to_recover)?;
                ensure!(
                    op.new_owner_authority != op.recent_owner_authority,
                    ChainError::Validation,
                    "new and recent owner authorities must differ"
                );
                ensure!(
                    !op.new_owner_authority.is_impossible() && !op.recent_owner_authority.is_impossible(),
                    ChainError::Validation,
                    "recovery authorities must be satisfiable"
                );
                ensure!(op.new_owner_authority.is_valid(), ChainError::Validation, "invalid authority");
                Ok(())
            }
            ChangeRecoveryAccount(op) => {
                validate_account_name(&op.account_to_recover)?;
                validate_account_name(&op.new_recovery_account)
            }
            DeclineVotingRights(op) => validate_account_name(&op.account),
            WitnessUpdate(op) => {
                validate_account_name(&op.owner)?;
                ensure!(op.url.len() <= config::MAX_WITNESS_URL_LENGTH, ChainError::Validation, "url is too long");
                ensure!(!op.url.is_empty(), ChainError::Validation, "url is empty");
                ensure!(op.fee.symbol == GBC && op.fee.amount >= 0, ChainError::Validation, "fee must be GBC");
                op.props.validate()
            }
            WitnessSetProperties(op) => {
                validate_account_name(&op.owner)?;
                ensure!(
                    !op.current_signing_key.is_null(),
                    ChainError::Validation,
                    "current signing key must be set"
                );
                if let Some(url) = &op.url {
                    ensure!(!url.is_empty() && url.len() <= config::MAX_WITNESS_URL_LENGTH, ChainError::Validation, "bad url");
                }
                op.props.validate()
            }
            AccountWitnessVote(op) => {
                validate_account_name(&op.account)?;
                validate_account_name(&op.witness)
            }
            AccountWitnessProxy(op) => {
                validate_account_name(&op.account)?;
                if !op.proxy.is_empty() {
                    validate_account_name(&op.proxy)?;
                    ensure!(op.proxy != op.account, ChainError::Validation, "cannot proxy to self");
                }
                Ok(())
            }
            Pow(op) => validate_account_name(&op.worker_account),
            Pow2(op) => validate_account_name(&op.worker_account),
            ReportOverProduction(op) => validate_account_name(&op.reporter),
            Custom(op) => {
                ensure!(!op.required_auths.is_empty(), ChainError::Validation, "at least one authority required");
                ensure!(op.data.len() <= config::MAX_CUSTOM_OP_DATA_SIZE, ChainError::Validation, "payload too large");
                Ok(())
            }
            CustomJson(op) => {
                ensure!(
                    !op.required_auths.is_empty() || !op.required_posting_auths.is_empty(),
                    ChainError::Validation,
                    "at least one authority required"
                );
                ensure!(op.id.len() <= 32, ChainError::Validation, "id is too long");
                ensure!(op.json.len() <= config::MAX_CUSTOM_OP_DATA_SIZE, ChainError::Validation, "payload too large");
                validate_json(&op.json)
            }
            CustomBinary(op) => {
                ensure!(
                    !op.required_owner_auths.is_empty()
                        || !op.required_active_auths.is_empty()
                        || !op.required_posting_auths.is_empty()
                        || !op.required_auths.is_empty(),
                    ChainError::Validation,
                    "at least one authority required"
                );
                ensure!(op.id.len() <= 32, ChainError::Validation, "id is too long");
                ensure!(op.data.len() <= config::MAX_CUSTOM_OP_DATA_SIZE, ChainError::Validation, "payload too large");
                Ok(())
            }
            EscrowTransfer(op) => {
                validate_account_name(&op.from)?;
                validate_account_name(&op.to)?;
                validate_account_name(&op.agent)?;
                ensure!(op.fee.amount >= 0, ChainError::Validation, "fee cannot be negative");
                ensure!(
                    op.gbd_amount.symbol == GBD && op.gbd_amount.amount >= 0,
                    ChainError::Validation,
                    "gbd amount must be non-negative GBD"
                );
                ensure!(
                    op.gbc_amount.symbol == GBC && op.gbc_amount.amount >= 0,
                    ChainError::Validation,
                    "gbc amount must be non-negative GBC"
                );
                ensure!(
                    op.gbd_amount.amount > 0 || op.gbc_amount.amount > 0,
                    ChainError::Validation,
                    "escrow must transfer something"
                );
                ensure!(
                    op.fee.symbol == GBC || op.fee.symbol == GBD,
                    ChainError::Validation,
                    "fee must be GBC or GBD"
                );
                ensure!(op.from != op.to, ChainError::Validation, "from and to must differ");
                ensure!(op.from != op.agent && op.to != op.agent, ChainError::Validation, "agent must be a third party");
                ensure!(
                    op.ratification_deadline < op.escrow_expiration,
                    ChainError::Validation,
                    "ratification deadline must precede expiration"
                );
                validate_json(&op.json_meta)
            }
            EscrowApprove(op) => {
                validate_account_name(&op.from)?;
                validate_account_name(&op.to)?;
                validate_account_name(&op.agent)?;
                validate_account_name(&op.who)?;
                ensure!(
                    op.who == op.to || op.who == op.agent,
                    ChainError::Validation,
                    "only to or agent may approve"
                );
                Ok(())
            }
            EscrowDispute(op) => {
                validate_account_name(&op.from)?;
                validate_account_name(&op.to)?;
                validate_account_name(&op.agent)?;
                validate_account_name(&op.who)?;
                ensure!(
                    op.who == op.from || op.who == op.to,
                    ChainError::Validation,
                    "only from or to may dispute"
                );
                Ok(())
            }
            EscrowRelease(op) => {
                validate_account_name(&op.from)?;
                validate_account_name(&op.to)?;
                validate_account_name(&op.agent)?;
                validate_account_name(&op.who)?;
                validate_account_name(&op.receiver)?;
                ensure!(
                    op.who == op.from || op.who == op.to || op.who == op.agent,
                    ChainError::Validation,
                    "who must be a party to the escrow"
                );
                ensure!(
                    op.receiver == op.from || op.receiver == op.to,
                    ChainError::Validation,
                    "receiver must be from or to"
                );
                ensure!(
                    op.gbd_amount.symbol == GBD && op.gbd_amount.amount >= 0,
                    ChainError::Validation,
                    "gbd amount must be non-negative GBD"
                );
                ensure!(
                    op.gbc_amount.symbol == GBC && op.gbc_amount.amount >= 0,
                    ChainError::Validation,
                    "gbc amount must be non-negative GBC"
                );
                ensure!(
                    op.gbd_amount.amount > 0 || op.gbc_amount.amount > 0,
                    ChainError::Validation,
                    "release must move something"
                );
                Ok(())
            }
            Crowdfunding(op) => {
                validate_account_name(&op.originator)?;
                validate_permlink(&op.permlink)?;
                ensure!(op.title.len() < 256, ChainError::Validation, "title is too long");
                ensure!(!op.body.is_empty(), ChainError::Validation, "body is empty");
                validate_json(&op.json_metadata)?;
                ensure!(
                    op.raise.symbol == GBC && op.raise.amount >= 0,
                    ChainError::Validation,
                    "raise must be a non-negative GBC amount"
                );
                Ok(())
            }
            Invest(op) => {
                validate_account_name(&op.invester)?;
                validate_account_name(&op.originator)?;
                validate_permlink(&op.permlink)?;
                ensure!(
                    op.raise.symbol == GBC && op.raise.amount >= 0,
                    ChainError::Validation,
                    "investment must be a non-negative GBC amount"
                );
                Ok(())
            }
            NonfungibleFundCreate(op) => {
                validate_account_name(&op.creator)?;
                validate_account_name(&op.owner)?;
                ensure!(
                    !op.meta_data.is_empty() && op.meta_data.len() < 256,
                    ChainError::Validation,
                    "metadata size out of range"
                );
                Ok(())
            }
            NonfungibleFundTransfer(op) => {
                validate_account_name(&op.from)?;
                validate_account_name(&op.to)?;
                ensure!(op.from != op.to, ChainError::Validation, "from and to must differ");
                Ok(())
            }
            NonfungibleFundPutUpForSale(op) => {
                validate_account_name(&op.seller)?;
                ensure!(
                    op.selling_price.symbol == GBC || op.selling_price.symbol == GBD,
                    ChainError::Validation,
                    "price must be GBC or GBD"
                );
                ensure!(op.selling_price.amount > 0, ChainError::Validation, "price must be positive");
                Ok(())
            }
            NonfungibleFundWithdrawFromSale(op) => validate_account_name(&op.seller),
            NonfungibleFundBuy(op) => validate_account_name(&op.buyer),
            ContractDeploy(op) => {
                validate_account_name(&op.creator)?;
                validate_account_name(&op.name)?;
                ensure!(
                    !op.code.is_empty() && op.code.len() < 1024 * 1024,
                    ChainError::Validation,
                    "code size out of range"
                );
                ensure!(
                    !op.abi.is_empty() && op.abi.len() < 1024 * 64,
                    ChainError::Validation,
                    "abi size out of range"
                );
                Ok(())
            }
            ContractCall(op) => {
                validate_account_name(&op.caller)?;
                validate_account_name(&op.contract_name)?;
                ensure!(
                    !op.method.is_empty() && op.method.len() < 256,
                    ChainError::Validation,
                    "method name size out of range"
                );
                ensure!(
                    !op.args.is_empty() && op.args.len() < 1024 * 64,
                    ChainError::Validation,
                    "args size out of range"
                );
                validate_json(&op.args)
            }
        }
    }

    /// Collect the accounts whose roles must sign this operation, plus any
    /// free-standing authorities (`other`) that must be satisfied directly.
    pub fn get_required_authorities(
        &self,
        owner: &mut BTreeSet<AccountName>,
        active: &mut BTreeSet<AccountName>,
        posting: &mut BTreeSet<AccountName>,
        other: &mut Vec<Authority>,
    ) {
        use Operation::*;
        match self {
            Vote(op) => {
                posting.insert(op.voter.clone());
            }
            Comment(op) => {
                posting.insert(op.author.clone());
            }
            CommentOptions(op) => {
                posting.insert(op.author.clone());
            }
            DeleteComment(op) => {
                posting.insert(op.author.clone());
            }
            ClaimRewardBalance(op) => {
                posting.insert(op.account.clone());
            }
            Crowdfunding(op) => {
                posting.insert(op.originator.clone());
            }
            Transfer(op) => {
                active.insert(op.from.clone());
            }
            TransferToVesting(op) => {
                active.insert(op.from.clone());
            }
            WithdrawVesting(op) => {
                active.insert(op.account.clone());
            }
            SetWithdrawVestingRoute(op) => {
                active.insert(op.from_account.clone());
            }
            TransferToSavings(op) => {
                active.insert(op.from.clone());
            }
            TransferFromSavings(op) => {
                active.insert(op.from.clone());
            }
            CancelTransferFromSavings(op) => {
                active.insert(op.from.clone());
            }
            DelegateVestingShares(op) => {
                active.insert(op.delegator.clone());
            }
            LimitOrderCreate(op) => {
                active.insert(op.owner.clone());
            }
            LimitOrderCreate2(op) => {
                active.insert(op.owner.clone());
            }
            LimitOrderCancel(op) => {
                active.insert(op.owner.clone());
            }
            Convert(op) => {
                active.insert(op.owner.clone());
            }
            FeedPublish(op) => {
                active.insert(op.publisher.clone());
            }
            AccountCreate(op) => {
                active.insert(op.creator.clone());
            }
            AccountCreateWithDelegation(op) => {
                active.insert(op.creator.clone());
            }
            ClaimAccount(op) => {
                active.insert(op.creator.clone());
            }
            CreateClaimedAccount(op) => {
                active.insert(op.creator.clone());
            }
            AccountUpdate(op) => {
                if op.owner.is_some() {
                    owner.insert(op.account.clone());
                } else {
                    active.insert(op.account.clone());
                }
            }
            RequestAccountRecovery(op) => {
                active.insert(op.recovery_account.clone());
            }
            RecoverAccount(op) => {
                other.push(op.new_owner_authority.clone());
                other.push(op.recent_owner_authority.clone());
            }
            ChangeRecoveryAccount(op) => {
                owner.insert(op.account_to_recover.clone());
            }
            DeclineVotingRights(op) => {
                owner.insert(op.account.clone());
            }
            WitnessUpdate(op) => {
                active.insert(op.owner.clone());
            }
            WitnessSetProperties(op) => {
                other.push(Authority::single_key(op.current_signing_key));
            }
            AccountWitnessVote(op) => {
                active.insert(op.account.clone());
            }
            AccountWitnessProxy(op) => {
                active.insert(op.account.clone());
            }
            Pow(op) => {
                active.insert(op.worker_account.clone());
            }
            Pow2(op) => {
                active.insert(op.worker_account.clone());
            }
            ReportOverProduction(op) => {
                active.insert(op.reporter.clone());
            }
            Custom(op) => {
                for name in &op.required_auths {
                    active.insert(name.clone());
                }
            }
            CustomJson(op) => {
                for name in &op.required_auths {
                    active.insert(name.clone());
                }
                for name in &op.required_posting_auths {
                    posting.insert(name.clone());
                }
            }
            CustomBinary(op) => {
                for name in &op.required_owner_auths {
                    owner.insert(name.clone());
                }
                for name in &op.required_active_auths {
                    active.insert(name.clone());
                }
                for name in &op.required_posting_auths {
                    posting.insert(name.clone());
                }
                other.extend(op.required_auths.iter().cloned());
            }
            EscrowTransfer(op) => {
                active.insert(op.from.clone());
            }
            EscrowApprove(op) => {
                active.insert(op.who.clone());
            }
            EscrowDispute(op) => {
                active.insert(op.who.clone());
            }
            EscrowRelease(op) => {
                active.insert(op.who.clone());
            }
            Invest(op) => {
                active.insert(op.invester.clone());
            }
            NonfungibleFundCreate(op) => {
                active.insert(op.creator.clone());
            }
            NonfungibleFundTransfer(op) => {
                active.insert(op.from.clone());
            }
            NonfungibleFundPutUpForSale(op) => {
                active.insert(op.seller.clone());
            }
            NonfungibleFundWithdrawFromSale(op) => {
                active.insert(op.seller.clone());
            }
            NonfungibleFundBuy(op) => {
                active.insert(op.buyer.clone());
            }
            ContractDeploy(op) => {
                active.insert(op.creator.clone());
            }
            ContractCall(op) => {
                active.insert(op.caller.clone());
            }
        }
    }

    /// True when the operation requires only a posting authority.
    pub fn is_posting_only(&self) -> bool {
        let mut owner = BTreeSet::new();
        let mut active = BTreeSet::new();
        let mut posting = BTreeSet::new();
        let mut other = Vec::new();
        self.get_required_authorities(&mut owner, &mut active, &mut posting, &mut other);
        !posting.is_empty() && owner.is_empty() && active.is_empty() && other.is_empty()
    }
}

// ── Virtual operations ───────────────────────────────────────────────────────

/// Events emitted during block application for observers. Never valid inside
/// a transaction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum VirtualOperation {
    FillConvertRequest {
        owner: AccountName,
        request_id: u32,
        amount_in: Asset,
        amount_out: Asset,
    },
    AuthorReward {
        author: AccountName,
        permlink: String,
        gbd_payout: Asset,
        gbc_payout: Asset,
        vesting_payout: Asset,
    },
    CurationReward {
        curator: AccountName,
        reward: Asset,
        comment_author: AccountName,
        comment_permlink: String,
    },
    CommentReward {
        author: AccountName,
        permlink: String,
        payout: Asset,
    },
    LiquidityReward {
        owner: AccountName,
        payout: Asset,
    },
    Interest {
        owner: AccountName,
        interest: Asset,
    },
    FillVestingWithdraw {
        from_account: AccountName,
        to_account: AccountName,
        withdrawn: Asset,
        deposited: Asset,
    },
    FillOrder {
        current_owner: AccountName,
        current_order_id: u32,
        current_pays: Asset,
        open_owner: AccountName,
        open_order_id: u32,
        open_pays: Asset,
    },
    ShutdownWitness {
        owner: AccountName,
    },
    FillTransferFromSavings {
        from: AccountName,
        to: AccountName,
        amount: Asset,
        request_id: u32,
        memo: String,
    },
    Hardfork {
        hardfork_id: u32,
    },
    CommentPayoutUpdate {
        author: AccountName,
        permlink: String,
    },
    ReturnVestingDelegation {
        account: AccountName,
        vesting_shares: Asset,
    },
    CommentBenefactorReward {
        benefactor: AccountName,
        author: AccountName,
        permlink: String,
        reward: Asset,
    },
    ProducerReward {
        producer: AccountName,
        vesting_shares: Asset,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn transfer() -> Operation {
        Operation::Transfer(TransferOperation {
            from: "alice".into(),
            to: "bob".into(),
            amount: Asset::new(1000, GBC),
            memo: String::new(),
        })
    }

    #[test]
    fn transfer_validates() {
        assert!(transfer().validate().is_ok());
    }

    #[test]
    fn transfer_rejects_vesting_symbol() {
        let op = Operation::Transfer(TransferOperation {
            from: "alice".into(),
            to: "bob".into(),
            amount: Asset::new(1000, GBS),
            memo: String::new(),
        });
        assert!(matches!(op.validate(), Err(ChainError::Validation(_))));
    }

    #[test]
    fn transfer_requires_active_authority() {
        let mut owner = BTreeSet::new();
        let mut active = BTreeSet::new();
        let mut posting = BTreeSet::new();
        let mut other = Vec::new();
        transfer().get_required_authorities(&mut owner, &mut active, &mut posting, &mut other);
        assert!(active.contains(&AccountName::from("alice")));
        assert!(owner.is_empty() && posting.is_empty() && other.is_empty());
    }

    #[test]
    fn vote_is_posting_only() {
        let op = Operation::Vote(VoteOperation {
            voter: "alice".into(),
            author: "bob".into(),
            permlink: "post".into(),
            weight: 10_000,
        });
        assert!(op.is_posting_only());
        assert!(!transfer().is_posting_only());
    }

    #[test]
    fn vote_weight_bounds() {
        let mut op = VoteOperation {
            voter: "alice".into(),
            author: "bob".into(),
            permlink: "post".into(),
            weight: 10_000,
        };
        assert!(Operation::Vote(op.clone()).validate().is_ok());
        op.weight = -10_000;
        assert!(Operation::Vote(op.clone()).validate().is_ok());
        // i16 cannot exceed 32767; only the basis-point bound applies
        op.weight = 10_001;
        assert!(Operation::Vote(op).validate().is_err());
    }

    #[test]
    fn beneficiaries_must_be_sorted() {
        let op = Operation::CommentOptions(CommentOptionsOperation {
            author: "alice".into(),
            permlink: "post".into(),
            max_accepted_payout: Asset::new(1_000_000, GBD),
            percent_gamebank_dollars: 10_000,
            allow_votes: true,
            allow_curation_rewards: true,
            beneficiaries: vec![
                BeneficiaryRoute { account: "zed".into(), weight: 100 },
                BeneficiaryRoute { account: "bob".into(), weight: 100 },
            ],
        });
        assert!(op.validate().is_err());
    }

    #[test]
    fn escrow_agent_must_be_third_party() {
        let op = Operation::EscrowTransfer(EscrowTransferOperation {
            from: "alice".into(),
            to: "bob".into(),
            agent: "alice".into(),
            escrow_id: 1,
            gbd_amount: Asset::zero(GBD),
            gbc_amount: Asset::new(1000, GBC),
            fee: Asset::new(10, GBC),
            ratification_deadline: 100,
            escrow_expiration: 200,
            json_meta: String::new(),
        });
        assert!(op.validate().is_err());
    }
}
