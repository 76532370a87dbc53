//! Reward-share curves and comment payout arithmetic.

use primitive_types::U256;

use gamebank_protocol::asset::{to_gbd, Asset, Price, GBC};
use gamebank_protocol::config;

use crate::objects::RewardCurve;

/// Map raw reward shares onto claim units per the fund's configured curve.
///
/// Quadratic: `(r + s)² − s²  =  r² + 2rs`, dampening small payouts.
/// Linear: `r`.
/// BoundedCuration: `r·2⁶⁴ / (2s + r)`, bounded above by 2⁶⁴ so per-vote
/// weight deltas always fit the comment's u64 weight accumulator.
pub fn evaluate_reward_curve(rshares: u128, curve: RewardCurve, content_constant: u128) -> u128 {
    match curve {
        RewardCurve::Quadratic => {
            let r = U256::from(rshares);
            let s = U256::from(content_constant);
            let claim = (r + s) * (r + s) - s * s;
            // claims are consumed as u128; saturate rather than wrap
            if claim > U256::from(u128::MAX) {
                u128::MAX
            } else {
                claim.as_u128()
            }
        }
        RewardCurve::Linear => rshares,
        RewardCurve::BoundedCuration => {
            let denom = U256::from(content_constant) * U256::from(2u8) + U256::from(rshares);
            if denom.is_zero() {
                return 0;
            }
            ((U256::from(rshares) << 64) / denom).as_u128()
        }
    }
}

/// Everything needed to price one comment's payout against its fund.
#[derive(Debug, Clone)]
pub struct CommentRewardContext {
    pub rshares: i64,
    pub reward_weight: u16,
    pub max_gbd: Asset,
    pub total_reward_shares: u128,
    pub total_reward_fund_gbc: Asset,
    pub current_gbc_price: Price,
    pub reward_curve: RewardCurve,
    pub content_constant: u128,
}

/// The comment's slice of the fund: `fund × f(rshares) / recent_claims`,
/// weighted, then capped by the comment's accepted maximum.
pub fn get_rshare_reward(ctx: &CommentRewardContext) -> i64 {
    if ctx.rshares <= 0 || ctx.total_reward_shares == 0 {
        return 0;
    }
    let rf = U256::from(ctx.total_reward_fund_gbc.amount as u128);
    let total_claims = U256::from(ctx.total_reward_shares);
    let claim = U256::from(evaluate_reward_curve(
        ctx.rshares as u128,
        ctx.reward_curve,
        ctx.content_constant,
    ));

    let mut payout = rf * claim / total_claims;
    payout = payout * U256::from(ctx.reward_weight) / U256::from(config::PERCENT_100);

    let mut payout = payout.min(U256::from(i64::MAX as u64)).as_u128() as i64;

    // dust payouts are forfeited
    if is_comment_payout_dust(ctx.current_gbc_price, payout) {
        payout = 0;
    }

    // cap by the comment's declared maximum, converted at the current feed
    let max_gbc = if ctx.current_gbc_price.is_null() {
        i64::MAX
    } else {
        gamebank_protocol::asset::to_gbc(ctx.current_gbc_price, ctx.max_gbd).amount
    };
    payout.min(max_gbc)
}

/// Payouts under 0.020 GBD equivalent are forfeited.
pub fn is_comment_payout_dust(price: Price, gbc_payout: i64) -> bool {
    if price.is_null() {
        return gbc_payout == 0;
    }
    to_gbd(price, Asset::new(gbc_payout, GBC)).amount < config::MIN_PAYOUT_GBD
}

/// The per-block inflation rate in basis points: starts at 9.78%, narrows
/// 0.01% every 250k blocks, floors at 0.95%.
pub fn current_inflation_rate(head_block_num: u32) -> u32 {
    let adjustment = head_block_num / config::INFLATION_NARROWING_PERIOD;
    config::INFLATION_RATE_START_PERCENT
        .saturating_sub(adjustment)
        .max(config::INFLATION_RATE_STOP_PERCENT)
}
