use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use crate::error::ChainError;

// ── Symbol ───────────────────────────────────────────────────────────────────

/// A 4-byte asset identifier. The low 4 bits encode decimal precision, the
/// upper bits identify the token kind.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Symbol(pub u32);

/// The liquid token (precision 3).
pub const GBC: Symbol = Symbol((1 << 4) | 3);
/// The debt token (precision 3).
pub const GBD: Symbol = Symbol((2 << 4) | 3);
/// The vesting stake token (precision 6).
pub const GBS: Symbol = Symbol((3 << 4) | 6);

impl Symbol {
    pub fn precision(&self) -> u32 {
        self.0 & 0x0f
    }

    /// One whole unit in satoshis (10^precision).
    pub fn unit(&self) -> i64 {
        10i64.pow(self.precision())
    }

    pub fn ticker(&self) -> &'static str {
        match *self {
            GBC => "GBC",
            GBD => "GBD",
            GBS => "GBS",
            _ => "???",
        }
    }

    pub fn from_ticker(s: &str) -> Result<Self, ChainError> {
        match s {
            "GBC" => Ok(GBC),
            "GBD" => Ok(GBD),
            "GBS" => Ok(GBS),
            _ => Err(ChainError::Serialization(format!("unknown asset ticker: {s}"))),
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(*self, GBC | GBD | GBS)
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Symbol({})", self.ticker())
    }
}

// ── Asset ────────────────────────────────────────────────────────────────────

/// An amount of one token, in satoshis of the symbol's precision.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Asset {
    pub amount: i64,
    pub symbol: Symbol,
}

impl Asset {
    pub const fn new(amount: i64, symbol: Symbol) -> Self {
        Asset { amount, symbol }
    }

    pub fn zero(symbol: Symbol) -> Self {
        Asset { amount: 0, symbol }
    }

    pub fn is_valid(&self) -> bool {
        self.symbol.is_valid() && self.amount >= -crate::config::MAX_SHARE_SUPPLY
            && self.amount <= crate::config::MAX_SHARE_SUPPLY
    }

    /// Legacy text form, e.g. `1.000 GBC`.
    pub fn to_legacy_string(&self) -> String {
        let unit = self.symbol.unit();
        let sign = if self.amount < 0 { "-" } else { "" };
        let abs = self.amount.unsigned_abs() as i64;
        format!(
            "{}{}.{:0width$} {}",
            sign,
            abs / unit,
            abs % unit,
            self.symbol.ticker(),
            width = self.symbol.precision() as usize
        )
    }
}

impl fmt::Debug for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Asset({})", self.to_legacy_string())
    }
}

impl fmt::Display for Asset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_legacy_string())
    }
}

impl Add for Asset {
    type Output = Asset;
    fn add(self, rhs: Asset) -> Asset {
        assert_eq!(self.symbol, rhs.symbol, "asset symbol mismatch");
        Asset::new(self.amount.checked_add(rhs.amount).expect("asset overflow"), self.symbol)
    }
}

impl Sub for Asset {
    type Output = Asset;
    fn sub(self, rhs: Asset) -> Asset {
        assert_eq!(self.symbol, rhs.symbol, "asset symbol mismatch");
        Asset::new(self.amount.checked_sub(rhs.amount).expect("asset underflow"), self.symbol)
    }
}

impl AddAssign for Asset {
    fn add_assign(&mut self, rhs: Asset) {
        *self = *self + rhs;
    }
}

impl SubAssign for Asset {
    fn sub_assign(&mut self, rhs: Asset) {
        *self = *self - rhs;
    }
}

impl Neg for Asset {
    type Output = Asset;
    fn neg(self) -> Asset {
        Asset::new(-self.amount, self.symbol)
    }
}

impl PartialOrd for Asset {
    fn partial_cmp(&self, other: &Asset) -> Option<Ordering> {
        if self.symbol != other.symbol {
            return None;
        }
        Some(self.amount.cmp(&other.amount))
    }
}

// ── Price ────────────────────────────────────────────────────────────────────

/// An exchange ratio between two assets: `base.amount` of `base.symbol` per
/// `quote.amount` of `quote.symbol`.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    pub base: Asset,
    pub quote: Asset,
}

impl Price {
    pub fn new(base: Asset, quote: Asset) -> Self {
        Price { base, quote }
    }

    /// The all-zero price, meaning "no feed established".
    pub fn null() -> Self {
        Price {
            base: Asset::zero(GBD),
            quote: Asset::zero(GBC),
        }
    }

    pub fn is_null(&self) -> bool {
        self.base.amount == 0 && self.quote.amount == 0
    }

    pub fn is_valid(&self) -> bool {
        self.base.amount > 0 && self.quote.amount > 0 && self.base.symbol != self.quote.symbol
    }

    /// Swap base and quote.
    pub fn invert(&self) -> Price {
        Price {
            base: self.quote,
            quote: self.base,
        }
    }

    /// The highest price expressible with this price's symbol pair.
    pub fn max(base_symbol: Symbol, quote_symbol: Symbol) -> Price {
        Price {
            base: Asset::new(crate::config::MAX_SHARE_SUPPLY, base_symbol),
            quote: Asset::new(1, quote_symbol),
        }
    }

    /// The lowest nonzero price expressible with this price's symbol pair.
    pub fn min(base_symbol: Symbol, quote_symbol: Symbol) -> Price {
        Price {
            base: Asset::new(1, base_symbol),
            quote: Asset::new(crate::config::MAX_SHARE_SUPPLY, quote_symbol),
        }
    }
}

impl fmt::Debug for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Price({} / {})", self.base, self.quote)
    }
}

impl PartialOrd for Price {
    /// Cross-multiplied comparison. Prices are comparable only when their
    /// symbol pairs match.
    fn partial_cmp(&self, other: &Price) -> Option<Ordering> {
        if self.base.symbol != other.base.symbol || self.quote.symbol != other.quote.symbol {
            return None;
        }
        let lhs = self.base.amount as i128 * other.quote.amount as i128;
        let rhs = other.base.amount as i128 * self.quote.amount as i128;
        Some(lhs.cmp(&rhs))
    }
}

/// `asset × price`. The asset must carry one of the price's two symbols; the
/// result is denominated in the other, rounding toward zero.
pub fn asset_times_price(a: Asset, p: Price) -> Asset {
    if a.symbol == p.base.symbol {
        assert!(p.base.amount > 0, "multiplying by a null price");
        let result = a.amount as i128 * p.quote.amount as i128 / p.base.amount as i128;
        Asset::new(result as i64, p.quote.symbol)
    } else if a.symbol == p.quote.symbol {
        assert!(p.quote.amount > 0, "multiplying by a null price");
        let result = a.amount as i128 * p.base.amount as i128 / p.quote.amount as i128;
        Asset::new(result as i64, p.base.symbol)
    } else {
        panic!("asset {:?} not convertible at price {:?}", a, p)
    }
}

/// Convert a liquid amount into debt-token units at the given feed.
pub fn to_gbd(feed: Price, gbc: Asset) -> Asset {
    assert_eq!(gbc.symbol, GBC);
    if feed.is_null() {
        return Asset::zero(GBD);
    }
    asset_times_price(gbc, feed)
}

/// Convert a debt amount into liquid units at the given feed.
pub fn to_gbc(feed: Price, gbd: Asset) -> Asset {
    assert_eq!(gbd.symbol, GBD);
    if feed.is_null() {
        return Asset::zero(GBC);
    }
    asset_times_price(gbd, feed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn symbol_precision() {
        assert_eq!(GBC.precision(), 3);
        assert_eq!(GBS.precision(), 6);
        assert_eq!(GBC.unit(), 1000);
    }

    #[test]
    fn legacy_string() {
        assert_eq!(Asset::new(1_500, GBC).to_legacy_string(), "1.500 GBC");
        assert_eq!(Asset::new(-20, GBD).to_legacy_string(), "-0.020 GBD");
        assert_eq!(Asset::new(1, GBS).to_legacy_string(), "0.000001 GBS");
    }

    #[test]
    fn price_multiplication_both_directions() {
        // 2 GBD per 1 GBC
        let p = Price::new(Asset::new(2_000, GBD), Asset::new(1_000, GBC));
        assert_eq!(asset_times_price(Asset::new(500, GBC), p), Asset::new(1_000, GBD));
        assert_eq!(asset_times_price(Asset::new(1_000, GBD), p), Asset::new(500, GBC));
    }

    #[test]
    fn price_ordering_is_cross_multiplied() {
        let cheap = Price::new(Asset::new(1_000, GBD), Asset::new(1_000, GBC));
        let dear = Price::new(Asset::new(3_000, GBD), Asset::new(2_000, GBC));
        assert!(cheap < dear);
        assert!(dear > cheap);
    }

    #[test]
    fn rounding_truncates_toward_zero() {
        let p = Price::new(Asset::new(3, GBD), Asset::new(2, GBC));
        // 1 * 2 / 3 == 0
        assert_eq!(asset_times_price(Asset::new(1, GBD), p).amount, 0);
    }
}
