//! Fixed-point monetary types for the exchange.
//!
//! Prices carry a signed number of cents, or the `Market` sentinel meaning
//! "trade at any price". All arithmetic is integer arithmetic on cents;
//! floating point only appears at the parsing boundary.

use crate::error::{ExchangeError, Result};
use derive_more::{Add, AddAssign, From, Into, Sub, SubAssign, Sum};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

// =============================================================================
// Volume Type (Newtype for shares)
// =============================================================================

/// Number of shares (newtype for type safety).
#[derive(
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Serialize,
    Deserialize,
    Default,
    Add,
    Sub,
    AddAssign,
    SubAssign,
    Sum,
    From,
    Into,
)]
pub struct Volume(pub u32);

impl Volume {
    pub const ZERO: Volume = Volume(0);

    /// Get raw value.
    #[inline]
    pub fn raw(self) -> u32 {
        self.0
    }

    /// Check if zero.
    #[inline]
    pub fn is_zero(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Debug for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Vol({})", self.0)
    }
}

impl fmt::Display for Volume {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Allow `volume == 50` comparisons
impl PartialEq<u32> for Volume {
    fn eq(&self, other: &u32) -> bool {
        self.0 == *other
    }
}

// =============================================================================
// Price
// =============================================================================

/// A price on the book: a fixed number of cents, or the market sentinel.
///
/// # Examples
/// - `Price::Limit(1000)` = $10.00
/// - `Price::Limit(-250)` = $-2.50
/// - `Price::Market` = MKT
///
/// Two limit prices with equal cents are indistinguishable, and there is a
/// single market variant — the canonical-instance guarantee of the price
/// factory, expressed as value semantics.
///
/// The derived `Ord` is a storage order only (`Market` first, then cents
/// ascending); it is what the book's sell side iterates. Domain comparisons
/// go through [`Price::cmp_value`] and the `greater_*`/`less_*` methods.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Price {
    /// Sentinel meaning "any price"; unconditionally best on its side.
    Market,
    /// Signed cents.
    Limit(i64),
}

impl Price {
    pub const ZERO: Price = Price::Limit(0);
    pub const MARKET: Price = Price::Market;

    /// Create a limit price from a cents value.
    #[inline]
    pub fn limit_from_cents(cents: i64) -> Self {
        Price::Limit(cents)
    }

    /// Parse an optionally `$`-prefixed, comma-grouped decimal amount into a
    /// limit price. The amount is multiplied by 100 and rounded half away
    /// from zero to yield cents.
    pub fn parse(text: &str) -> Result<Self> {
        let cleaned: String = text
            .chars()
            .filter(|c| !matches!(c, '$' | ',' | ' '))
            .collect();
        if cleaned.is_empty() {
            return Err(ExchangeError::InvalidData(format!(
                "cannot parse an empty price from {text:?}"
            )));
        }
        let amount: f64 = cleaned.parse().map_err(|_| {
            ExchangeError::InvalidData(format!("{text:?} is not a dollar amount"))
        })?;
        Ok(Price::Limit((amount * 100.0).round() as i64))
    }

    /// Cents value; the market sentinel counts as zero cents, which is what
    /// the total order below and the ticker comparison rely on.
    #[inline]
    pub fn cents(self) -> i64 {
        match self {
            Price::Market => 0,
            Price::Limit(cents) => cents,
        }
    }

    #[inline]
    pub fn is_market(self) -> bool {
        matches!(self, Price::Market)
    }

    /// False for the market sentinel, otherwise `cents < 0`.
    #[inline]
    pub fn is_negative(self) -> bool {
        match self {
            Price::Market => false,
            Price::Limit(cents) => cents < 0,
        }
    }

    /// Total order over cents (market counts as zero). This is the ordering
    /// used to pick the last-sale fill and the ticker direction.
    #[inline]
    pub fn cmp_value(self, other: Price) -> Ordering {
        self.cents().cmp(&other.cents())
    }

    /// `self >= other`; false whenever either operand is market.
    pub fn greater_or_equal(self, other: Price) -> bool {
        if self.is_market() || other.is_market() {
            return false;
        }
        self.cents() >= other.cents()
    }

    /// `self > other`; false whenever either operand is market.
    pub fn greater_than(self, other: Price) -> bool {
        if self.is_market() || other.is_market() {
            return false;
        }
        self.cents() > other.cents()
    }

    /// `self <= other`; false whenever either operand is market.
    pub fn less_or_equal(self, other: Price) -> bool {
        if self.is_market() || other.is_market() {
            return false;
        }
        self.cents() <= other.cents()
    }

    /// `self < other`; false whenever either operand is market.
    pub fn less_than(self, other: Price) -> bool {
        if self.is_market() || other.is_market() {
            return false;
        }
        self.cents() < other.cents()
    }

    /// Value equality of two limit prices; false whenever either is market.
    pub fn limit_eq(self, other: Price) -> bool {
        if self.is_market() || other.is_market() {
            return false;
        }
        self.cents() == other.cents()
    }

    /// Sum of two limit prices.
    pub fn add(self, other: Price) -> Result<Price> {
        if self.is_market() || other.is_market() {
            return Err(ExchangeError::InvalidPriceOperation(
                "cannot add a market price".to_string(),
            ));
        }
        Ok(Price::Limit(self.cents() + other.cents()))
    }

    /// Difference of two limit prices.
    pub fn subtract(self, other: Price) -> Result<Price> {
        if self.is_market() || other.is_market() {
            return Err(ExchangeError::InvalidPriceOperation(
                "cannot subtract a market price".to_string(),
            ));
        }
        Ok(Price::Limit(self.cents() - other.cents()))
    }

    /// Limit price scaled by a (possibly negative) share count.
    pub fn multiply(self, shares: i64) -> Result<Price> {
        if self.is_market() {
            return Err(ExchangeError::InvalidPriceOperation(
                "cannot multiply a market price".to_string(),
            ));
        }
        Ok(Price::Limit(self.cents() * shares))
    }
}

impl fmt::Debug for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Price({self})")
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Price::Market => write!(f, "MKT"),
            Price::Limit(cents) => {
                let sign = if cents < 0 { "-" } else { "" };
                let abs = cents.unsigned_abs();
                write!(f, "${}{}.{:02}", sign, group_thousands(abs / 100), abs % 100)
            }
        }
    }
}

/// Comma-group an unsigned dollar amount: 1234567 -> "1,234,567".
fn group_thousands(mut dollars: u64) -> String {
    let mut groups = Vec::new();
    loop {
        let chunk = dollars % 1000;
        dollars /= 1000;
        if dollars == 0 {
            groups.push(chunk.to_string());
            break;
        }
        groups.push(format!("{chunk:03}"));
    }
    groups.reverse();
    groups.join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_and_prefixed() {
        assert_eq!(Price::parse("10.00").unwrap(), Price::Limit(1000));
        assert_eq!(Price::parse("$10.00").unwrap(), Price::Limit(1000));
        assert_eq!(Price::parse("$1,234.56").unwrap(), Price::Limit(123_456));
        assert_eq!(Price::parse("0.005").unwrap(), Price::Limit(1));
        assert_eq!(Price::parse("-2.50").unwrap(), Price::Limit(-250));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Price::parse("").is_err());
        assert!(Price::parse("$").is_err());
        assert!(Price::parse("ten dollars").is_err());
    }

    #[test]
    fn test_display_formats() {
        assert_eq!(Price::limit_from_cents(1000).to_string(), "$10.00");
        assert_eq!(Price::Limit(123_456_789).to_string(), "$1,234,567.89");
        assert_eq!(Price::Limit(-250).to_string(), "$-2.50");
        assert_eq!(Price::Limit(5).to_string(), "$0.05");
        assert_eq!(Price::Market.to_string(), "MKT");
    }

    #[test]
    fn test_comparisons_refuse_market() {
        let ten = Price::Limit(1000);
        assert!(!Price::Market.greater_than(ten));
        assert!(!ten.greater_than(Price::Market));
        assert!(!Price::Market.less_or_equal(ten));
        assert!(!ten.limit_eq(Price::Market));
        assert!(!Price::Market.limit_eq(Price::Market));
    }

    #[test]
    fn test_limit_comparisons() {
        let nine = Price::Limit(900);
        let ten = Price::Limit(1000);
        assert!(nine.less_than(ten));
        assert!(nine.less_or_equal(nine));
        assert!(ten.greater_than(nine));
        assert!(ten.greater_or_equal(ten));
        assert!(ten.limit_eq(Price::Limit(1000)));
    }

    #[test]
    fn test_cmp_value_counts_market_as_zero() {
        assert_eq!(Price::Market.cmp_value(Price::Limit(0)), Ordering::Equal);
        assert_eq!(Price::Market.cmp_value(Price::Limit(100)), Ordering::Less);
        assert_eq!(Price::Limit(-1).cmp_value(Price::Market), Ordering::Less);
    }

    #[test]
    fn test_arithmetic() {
        let a = Price::Limit(1050);
        let b = Price::Limit(950);
        assert_eq!(a.add(b).unwrap(), Price::Limit(2000));
        assert_eq!(a.subtract(b).unwrap(), Price::Limit(100));
        assert_eq!(b.multiply(3).unwrap(), Price::Limit(2850));
        assert_eq!(a.multiply(-2).unwrap(), Price::Limit(-2100));
    }

    #[test]
    fn test_arithmetic_refuses_market() {
        let ten = Price::Limit(1000);
        assert!(Price::Market.add(ten).is_err());
        assert!(ten.subtract(Price::Market).is_err());
        assert!(Price::Market.multiply(2).is_err());
    }

    #[test]
    fn test_is_negative() {
        assert!(Price::Limit(-1).is_negative());
        assert!(!Price::Limit(0).is_negative());
        assert!(!Price::Market.is_negative());
    }

    #[test]
    fn test_storage_order_puts_market_first() {
        let mut prices = vec![Price::Limit(1000), Price::Market, Price::Limit(900)];
        prices.sort();
        assert_eq!(
            prices,
            vec![Price::Market, Price::Limit(900), Price::Limit(1000)]
        );
    }

    #[test]
    fn test_volume_arithmetic() {
        let a = Volume(60);
        let b = Volume(40);
        assert_eq!(a + b, 100);
        assert_eq!(a - b, 20);
        let total: Volume = [a, b].into_iter().sum();
        assert_eq!(total, 100);
    }
}
