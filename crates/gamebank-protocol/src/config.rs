//! Consensus constants.
//!
//! Percent quantities use basis points: `PERCENT_100 == 10_000`.

/// Chain name hashed into the chain id. Every signing digest is prefixed by
/// `sha256(CHAIN_ID_NAME)`.
pub const CHAIN_ID_NAME: &str = "gamebank";

/// Prefix for base58-encoded public keys.
pub const ADDRESS_PREFIX: &str = "GBK";

// ── Time ─────────────────────────────────────────────────────────────────────

pub const BLOCK_INTERVAL: i64 = 3;
pub const BLOCKS_PER_YEAR: u32 = (365 * 24 * 60 * 60 / BLOCK_INTERVAL) as u32;
pub const BLOCKS_PER_DAY: u32 = (24 * 60 * 60 / BLOCK_INTERVAL) as u32;
pub const BLOCKS_PER_HOUR: u32 = (60 * 60 / BLOCK_INTERVAL) as u32;

/// Witness-vote-based irreversibility only applies after this height;
/// earlier the chain is young and LIB trails head by one full round.
pub const START_MINER_VOTING_BLOCK: u32 = BLOCKS_PER_DAY * 30;

// ── Witnesses & schedule ─────────────────────────────────────────────────────

pub const MAX_WITNESSES: usize = 21;
pub const MAX_VOTED_WITNESSES: usize = 20;
pub const MAX_RUNNER_WITNESSES: usize = 1;

/// Votes required of the 21 scheduled witnesses to adopt a hardfork.
pub const HARDFORK_REQUIRED_WITNESSES: usize = 17;

/// Basis points of scheduled witnesses that must confirm a block before it
/// becomes irreversible.
pub const IRREVERSIBLE_THRESHOLD: u32 = 75 * PERCENT_1;

/// A witness producing no block for this long has its signing key disabled.
pub const WITNESS_SHUTDOWN_SECONDS: i64 = 60 * 60 * 24;

// ── Percent arithmetic ───────────────────────────────────────────────────────

pub const PERCENT_100: u32 = 10_000;
pub const PERCENT_1: u32 = PERCENT_100 / 100;

// ── Supply & inflation ───────────────────────────────────────────────────────

pub const INFLATION_RATE_START_PERCENT: u32 = 978; // 9.78% in basis points
pub const INFLATION_RATE_STOP_PERCENT: u32 = 95; // 0.95%
pub const INFLATION_NARROWING_PERIOD: u32 = 250_000; // blocks per 0.01% step
pub const CONTENT_REWARD_PERCENT: u32 = 75 * PERCENT_1;
pub const VESTING_FUND_PERCENT: u32 = 15 * PERCENT_1;

pub const MAX_SHARE_SUPPLY: i64 = 1_000_000_000_000_000;

// ── Debt token (GBD) controls ────────────────────────────────────────────────

pub const GBD_STOP_PERCENT: u32 = 5 * PERCENT_1; // stop printing at 5% of cap
pub const GBD_START_PERCENT: u32 = 2 * PERCENT_1; // start throttling at 2%
pub const DEFAULT_GBD_INTEREST_RATE: u32 = 10 * PERCENT_1; // 10% APR
pub const GBD_INTEREST_COMPOUND_INTERVAL_SEC: i64 = 60 * 60 * 24 * 30;
pub const SECONDS_PER_YEAR: i64 = 60 * 60 * 24 * 365;

// ── Feed ─────────────────────────────────────────────────────────────────────

pub const FEED_INTERVAL_BLOCKS: u32 = BLOCKS_PER_HOUR;
pub const FEED_HISTORY_WINDOW: usize = 12 * 7; // 3.5 days of hourly medians
pub const MAX_FEED_AGE_SECONDS: i64 = 60 * 60 * 24 * 7;
pub const MIN_FEEDS: usize = MAX_WITNESSES / 3;
pub const CONVERSION_DELAY_SECONDS: i64 = 60 * 60 * FEED_HISTORY_WINDOW as i64; // 3.5 days

// ── Content & voting ─────────────────────────────────────────────────────────

pub const CASHOUT_WINDOW_SECONDS: i64 = 60 * 60 * 24 * 7;
pub const UPVOTE_LOCKOUT_SECONDS: i64 = 60 * 60 * 12;
pub const VOTE_REGENERATION_SECONDS: i64 = 5 * 60 * 60 * 24;
pub const MIN_VOTE_INTERVAL_SEC: i64 = 3;
pub const MAX_VOTE_CHANGES: i32 = 5;
pub const REVERSE_AUCTION_WINDOW_SECONDS: i64 = 60 * 30;
pub const VOTE_DUST_THRESHOLD: i64 = 50_000_000;
pub const INITIAL_VOTE_POWER_RATE: u32 = 40;
pub const REDUCED_VOTE_POWER_RATE: u32 = 10;

pub const MIN_ROOT_COMMENT_INTERVAL: i64 = 60 * 5;
pub const MIN_REPLY_INTERVAL: i64 = 20;
pub const MIN_REPLY_INTERVAL_HF1: i64 = 3;
pub const MAX_COMMENT_DEPTH: u16 = 0xff;
pub const MAX_PERMLINK_LENGTH: usize = 256;

pub const CONTENT_CONSTANT: u128 = 2_000_000_000_000;
pub const RECENT_RSHARES_DECAY_SECONDS: i64 = 60 * 60 * 24 * 15;
/// Minimum comment payout, denominated in GBD satoshis (0.020 GBD).
pub const MIN_PAYOUT_GBD: i64 = 20;
pub const MAX_COMMENT_BENEFICIARIES: usize = 8;

/// Share of a comment payout routed to curators.
pub const CURATION_REWARD_PERCENT: u32 = 25 * PERCENT_1;

pub const POST_REWARD_FUND_NAME: &str = "post";
pub const COMMENT_REWARD_FUND_NAME: &str = "comment";

// ── Vesting ──────────────────────────────────────────────────────────────────

pub const VESTING_WITHDRAW_INTERVALS: u32 = 13;
pub const VESTING_WITHDRAW_INTERVAL_SECONDS: i64 = 60 * 60 * 24 * 7;
pub const MAX_WITHDRAW_ROUTES: usize = 10;
pub const DELEGATION_RETURN_PERIOD: i64 = CASHOUT_WINDOW_SECONDS;
pub const DELEGATION_RETURN_PERIOD_HF1: i64 = VOTE_REGENERATION_SECONDS * 2;

// ── Savings ──────────────────────────────────────────────────────────────────

pub const SAVINGS_WITHDRAW_TIME: i64 = 60 * 60 * 24 * 3;
pub const SAVINGS_WITHDRAW_REQUEST_LIMIT: u32 = 100;

// ── Accounts & authorities ───────────────────────────────────────────────────

pub const MIN_ACCOUNT_NAME_LENGTH: usize = 3;
pub const MAX_ACCOUNT_NAME_LENGTH: usize = 16;
pub const MAX_MEMO_SIZE: usize = 2048;
pub const MAX_AUTHORITY_MEMBERSHIP: usize = 10;
pub const MAX_SIG_CHECK_DEPTH: u32 = 2;
pub const MAX_PROXY_RECURSION_DEPTH: u32 = 4;
pub const MAX_ACCOUNT_WITNESS_VOTES: u32 = 30;
pub const MAX_WITNESS_URL_LENGTH: usize = 2048;
pub const MAX_URL_LENGTH: usize = 127;

/// Multiplier over the median account-creation fee burned by account_create.
pub const CREATE_ACCOUNT_WITH_GBC_MODIFIER: i64 = 30;
/// Delegation counts for 1/5 of fee value when creating with delegation.
pub const CREATE_ACCOUNT_DELEGATION_RATIO: i64 = 5;
pub const CREATE_ACCOUNT_DELEGATION_TIME: i64 = 60 * 60 * 24 * 30;

pub const OWNER_AUTH_RECOVERY_PERIOD: i64 = 60 * 60 * 24 * 30;
pub const ACCOUNT_RECOVERY_REQUEST_EXPIRATION_PERIOD: i64 = 60 * 60 * 24;
pub const OWNER_UPDATE_LIMIT: i64 = 60 * 60;

// ── Market ───────────────────────────────────────────────────────────────────

pub const MAX_LIMIT_ORDER_EXPIRATION: i64 = 60 * 60 * 24 * 28;
pub const LIQUIDITY_REWARD_PERIOD_SEC: i64 = 60 * 60;
pub const LIQUIDITY_REWARD_BLOCKS: u32 = (LIQUIDITY_REWARD_PERIOD_SEC / BLOCK_INTERVAL) as u32;
pub const LIQUIDITY_TIMEOUT_SEC: i64 = 60 * 60 * 24 * 7;
pub const LIQUIDITY_APR_PERCENT: u32 = 750;
/// Minimum liquidity payout in GBC satoshis.
pub const MIN_LIQUIDITY_REWARD: i64 = 1000 * LIQUIDITY_REWARD_BLOCKS as i64;

// ── Transactions & blocks ────────────────────────────────────────────────────

pub const MAX_TIME_UNTIL_EXPIRATION: i64 = 60 * 60;
pub const MAX_TRANSACTION_SIZE: usize = 1024 * 64;
pub const MIN_BLOCK_SIZE_LIMIT: u32 = MAX_TRANSACTION_SIZE as u32;
pub const MAX_BLOCK_SIZE: u32 = MAX_TRANSACTION_SIZE as u32 * BLOCK_INTERVAL as u32 * 2000;
pub const SOFT_MAX_BLOCK_SIZE: u32 = 2 * 1024 * 1024;
pub const MIN_BLOCK_SIZE: usize = 115;
pub const MAX_CUSTOM_OP_DATA_SIZE: usize = 8192;

pub const MIN_UNDO_HISTORY: u32 = 10;
pub const MAX_UNDO_HISTORY: u32 = 10_000;

/// Ring size of recent block summaries used for TaPoS checks.
pub const BLOCK_SUMMARY_SLOTS: usize = 0x10000;

/// Producer slots remembered in the participation bitmap.
pub const PARTICIPATION_SLOTS: u32 = 128;
/// Participation (in percent of 128 slots) below which production halts.
pub const REQUIRED_PARTICIPATION_PERCENT: u32 = 33;

// ── Reserved account names ───────────────────────────────────────────────────

pub const MINER_ACCOUNT: &str = "miners";
pub const NULL_ACCOUNT: &str = "null";
pub const TEMP_ACCOUNT: &str = "temp";
pub const INIT_MINER_NAME: &str = "initminer";
/// Empty name: vote for witnesses directly rather than through a proxy.
pub const PROXY_TO_SELF_ACCOUNT: &str = "";

// ── Genesis ──────────────────────────────────────────────────────────────────

pub const GENESIS_TIME: i64 = 1_458_835_200;
pub const INIT_SUPPLY: i64 = 0;
/// One-shot migration switch: basis points of the initial supply converted to
/// vesting when a chain starts from a nonzero supply.
pub const INIT_VESTING_SUPPLY_PERCENT: u32 = 10 * PERCENT_1;
pub const MIN_ACCOUNT_CREATION_FEE: i64 = 1;
