//! Central configuration for the demo session.
//!
//! All session parameters live here for easy tuning.

/// Master configuration for the wiring demo.
#[derive(Debug, Clone)]
pub struct ExchangeConfig {
    /// Symbols to create before the market opens.
    pub symbols: Vec<String>,
    /// Name of the quoting user.
    pub maker: String,
    /// Name of the order-sending user.
    pub taker: String,
    /// Shares on each side of the maker's quote.
    pub quote_size: u32,
    /// Shares on the taker's aggressive orders.
    pub order_size: u32,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            symbols: vec!["IBM".to_string(), "GE".to_string()],
            maker: "MIA".to_string(),
            taker: "TOM".to_string(),
            quote_size: 100,
            order_size: 60,
        }
    }
}
