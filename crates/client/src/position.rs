//! Per-user cost and holding accounting.

use std::collections::HashMap;
use types::{ExchangeError, Price, Result, Side, Volume};

/// A user's trading position: share holdings per product (positive = long),
/// the running account costs (buys subtract, sells add), and the latest sale
/// price seen per product, which values the holdings.
pub struct Position {
    holdings: HashMap<String, i64>,
    account_costs: Price,
    last_sales: HashMap<String, Price>,
}

impl Position {
    pub fn new() -> Self {
        Self {
            holdings: HashMap::new(),
            account_costs: Price::ZERO,
            last_sales: HashMap::new(),
        }
    }

    /// Apply one fill: BUY adds shares and subtracts `price x volume` from
    /// the account costs, SELL subtracts shares and adds. A product whose
    /// holding reaches zero is dropped from the ledger.
    pub fn update_position(
        &mut self,
        product: &str,
        price: Price,
        side: Side,
        volume: Volume,
    ) -> Result<()> {
        let product = normalize_product(product)?;
        let total = price.multiply(volume.raw() as i64)?;
        let adjusted = match side {
            Side::Buy => volume.raw() as i64,
            Side::Sell => -(volume.raw() as i64),
        };
        let updated = self.holdings.get(&product).copied().unwrap_or(0) + adjusted;
        if updated == 0 {
            self.holdings.remove(&product);
        } else {
            self.holdings.insert(product, updated);
        }
        self.account_costs = match side {
            Side::Buy => self.account_costs.subtract(total)?,
            Side::Sell => self.account_costs.add(total)?,
        };
        Ok(())
    }

    /// Remember the latest sale price for a product.
    pub fn update_last_sale(&mut self, product: &str, price: Price) -> Result<()> {
        let product = normalize_product(product)?;
        self.last_sales.insert(product, price);
        Ok(())
    }

    /// Signed share balance for a product; zero when not held.
    pub fn stock_position_volume(&self, product: &str) -> Result<i64> {
        let product = normalize_product(product)?;
        Ok(self.holdings.get(&product).copied().unwrap_or(0))
    }

    /// Products currently held, sorted.
    pub fn holdings(&self) -> Vec<String> {
        let mut products: Vec<String> = self.holdings.keys().cloned().collect();
        products.sort();
        products
    }

    /// `last sale x holdings` for one product; `$0.00` when the product is
    /// not held or has no recorded sale.
    pub fn stock_position_value(&self, product: &str) -> Result<Price> {
        let product = normalize_product(product)?;
        let Some(shares) = self.holdings.get(&product).copied() else {
            return Ok(Price::ZERO);
        };
        let Some(last_sale) = self.last_sales.get(&product).copied() else {
            return Ok(Price::ZERO);
        };
        last_sale.multiply(shares)
    }

    pub fn account_costs(&self) -> Price {
        self.account_costs
    }

    /// Sum of the position values of every held product.
    pub fn all_stock_value(&self) -> Result<Price> {
        let mut total = Price::ZERO;
        for product in self.holdings.keys() {
            total = total.add(self.stock_position_value(product)?)?;
        }
        Ok(total)
    }

    /// Account costs plus the value of all holdings.
    pub fn net_account_value(&self) -> Result<Price> {
        self.all_stock_value()?.add(self.account_costs)
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_product(product: &str) -> Result<String> {
    let trimmed = product.trim();
    if trimmed.is_empty() {
        return Err(ExchangeError::InvalidData(
            "position updates need a non-empty product".to_string(),
        ));
    }
    Ok(trimmed.to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buy_then_sell_round_trip() {
        let mut position = Position::new();
        position
            .update_position("IBM", Price::Limit(1000), Side::Buy, Volume(100))
            .unwrap();
        assert_eq!(position.stock_position_volume("IBM").unwrap(), 100);
        // Bought 100 @ $10.00: costs -$1,000.00
        assert_eq!(position.account_costs(), Price::Limit(-100_000));

        position
            .update_position("IBM", Price::Limit(1100), Side::Sell, Volume(100))
            .unwrap();
        // Flat again; the zero entry is dropped.
        assert_eq!(position.stock_position_volume("IBM").unwrap(), 0);
        assert!(position.holdings().is_empty());
        // Sold 100 @ $11.00: net +$100.00
        assert_eq!(position.account_costs(), Price::Limit(10_000));
    }

    #[test]
    fn test_short_position_is_negative() {
        let mut position = Position::new();
        position
            .update_position("GE", Price::Limit(500), Side::Sell, Volume(30))
            .unwrap();
        assert_eq!(position.stock_position_volume("GE").unwrap(), -30);
        assert_eq!(position.account_costs(), Price::Limit(15_000));
    }

    #[test]
    fn test_position_value_needs_last_sale() {
        let mut position = Position::new();
        position
            .update_position("IBM", Price::Limit(1000), Side::Buy, Volume(10))
            .unwrap();
        assert_eq!(position.stock_position_value("IBM").unwrap(), Price::ZERO);

        position.update_last_sale("IBM", Price::Limit(1200)).unwrap();
        assert_eq!(
            position.stock_position_value("IBM").unwrap(),
            Price::Limit(12_000)
        );
    }

    #[test]
    fn test_net_account_value() {
        let mut position = Position::new();
        position
            .update_position("IBM", Price::Limit(1000), Side::Buy, Volume(10))
            .unwrap();
        position.update_last_sale("IBM", Price::Limit(1100)).unwrap();
        // Costs -$100.00, holdings worth $110.00.
        assert_eq!(position.all_stock_value().unwrap(), Price::Limit(11_000));
        assert_eq!(position.net_account_value().unwrap(), Price::Limit(1_000));
    }

    #[test]
    fn test_holdings_sorted() {
        let mut position = Position::new();
        for product in ["MSFT", "AAPL", "IBM"] {
            position
                .update_position(product, Price::Limit(100), Side::Buy, Volume(1))
                .unwrap();
        }
        assert_eq!(position.holdings(), vec!["AAPL", "IBM", "MSFT"]);
    }

    #[test]
    fn test_rejects_empty_product() {
        let mut position = Position::new();
        assert!(position
            .update_position(" ", Price::Limit(100), Side::Buy, Volume(1))
            .is_err());
        assert!(position.update_last_sale("", Price::Limit(100)).is_err());
    }
}
