//! Top-of-book market data.

use crate::price::{Price, Volume};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The current market for one product: best price and total resting volume on
/// each side. An empty side is materialized as `$0.00` with zero volume so
/// observers never see an absent price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketDataSnapshot {
    pub product: String,
    pub buy_price: Price,
    pub buy_volume: Volume,
    pub sell_price: Price,
    pub sell_volume: Volume,
}

impl MarketDataSnapshot {
    pub fn new(
        product: impl Into<String>,
        buy_price: Option<Price>,
        buy_volume: Volume,
        sell_price: Option<Price>,
        sell_volume: Volume,
    ) -> Self {
        Self {
            product: product.into(),
            buy_price: buy_price.unwrap_or(Price::ZERO),
            buy_volume,
            sell_price: sell_price.unwrap_or(Price::ZERO),
            sell_volume,
        }
    }
}

impl fmt::Display for MarketDataSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Product: {}, Buy Price: {}, Buy Volume: {}, Sell Price: {}, Sell Volume: {}",
            self.product, self.buy_price, self.buy_volume, self.sell_price, self.sell_volume
        )
    }
}
