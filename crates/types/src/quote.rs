//! Two-sided quotes.

use crate::error::Result;
use crate::price::{Price, Volume};
use crate::tradable::{normalize, Side, Tradable};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A user's two-sided interest in one product: a BUY quote side and a SELL
/// quote side that enter and leave the book together. Booking a quote
/// replaces any earlier quote from the same user on both sides.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quote {
    user: String,
    product: String,
    buy: Tradable,
    sell: Tradable,
}

impl Quote {
    pub fn new(
        user: &str,
        product: &str,
        buy_price: Price,
        buy_volume: Volume,
        sell_price: Price,
        sell_volume: Volume,
    ) -> Result<Self> {
        let user = normalize(user, "user name")?;
        let product = normalize(product, "product symbol")?;
        let buy = Tradable::quote_side(&user, &product, buy_price, buy_volume, Side::Buy)?;
        let sell = Tradable::quote_side(&user, &product, sell_price, sell_volume, Side::Sell)?;
        Ok(Self {
            user,
            product,
            buy,
            sell,
        })
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn product(&self) -> &str {
        &self.product
    }

    /// The quote side for the given book side.
    pub fn side(&self, side: Side) -> &Tradable {
        match side {
            Side::Buy => &self.buy,
            Side::Sell => &self.sell,
        }
    }
}

impl fmt::Display for Quote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} quote: {} {} x {} - {} x {}",
            self.user,
            self.product,
            self.buy.price(),
            self.buy.remaining_volume(),
            self.sell.price(),
            self.sell.remaining_volume()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quote_builds_both_sides() {
        let q = Quote::new(
            "ann",
            "ge",
            Price::Limit(999),
            Volume(10),
            Price::Limit(1001),
            Volume(20),
        )
        .unwrap();
        assert_eq!(q.user(), "ANN");
        assert_eq!(q.product(), "GE");
        assert_eq!(q.side(Side::Buy).side(), Side::Buy);
        assert_eq!(q.side(Side::Buy).remaining_volume(), 10);
        assert_eq!(q.side(Side::Sell).side(), Side::Sell);
        assert_eq!(q.side(Side::Sell).remaining_volume(), 20);
        assert!(q.side(Side::Buy).is_quote());
        assert_ne!(q.side(Side::Buy).id(), q.side(Side::Sell).id());
    }

    #[test]
    fn test_quote_rejects_zero_volumes() {
        assert!(Quote::new(
            "ann",
            "ge",
            Price::Limit(999),
            Volume(0),
            Price::Limit(1001),
            Volume(20)
        )
        .is_err());
    }
}
