//! Product registry and the market state machine.

use crate::product_book::ProductBook;
use parking_lot::Mutex;
use publishers::PublisherSet;
use std::collections::HashMap;
use std::sync::Arc;
use types::{
    ExchangeError, MarketDataSnapshot, MarketMessage, MarketState, Quote, Result, Side, Tradable,
    TradableSnapshot,
};

struct ServiceState {
    books: HashMap<String, Arc<ProductBook>>,
    market_state: MarketState,
}

/// Facade over every product book plus the CLOSED -> PREOPEN -> OPEN ->
/// CLOSED state machine. One instance per exchange; wired with the
/// publisher set at construction.
pub struct ProductService {
    publishers: Arc<PublisherSet>,
    state: Mutex<ServiceState>,
}

impl ProductService {
    pub fn new(publishers: Arc<PublisherSet>) -> Self {
        Self {
            publishers,
            state: Mutex::new(ServiceState {
                books: HashMap::new(),
                market_state: MarketState::Closed,
            }),
        }
    }

    pub fn market_state(&self) -> MarketState {
        self.state.lock().market_state
    }

    pub fn product_list(&self) -> Vec<String> {
        self.state.lock().books.keys().cloned().collect()
    }

    /// Register a new symbol; its book starts empty.
    pub fn create_product(&self, product: &str) -> Result<()> {
        let symbol = normalize_product(product)?;
        let mut state = self.state.lock();
        if state.books.contains_key(&symbol) {
            return Err(ExchangeError::ProductAlreadyExists(symbol));
        }
        let book = Arc::new(ProductBook::new(&symbol, self.publishers.clone())?);
        tracing::info!(%symbol, "product created");
        state.books.insert(symbol, book);
        Ok(())
    }

    /// Drive the state machine. Publishes the new state to every message
    /// subscription, then opens or closes every book as the state demands.
    pub fn set_market_state(&self, requested: &str) -> Result<()> {
        let next: MarketState = requested.parse()?;
        let mut state = self.state.lock();
        let current = state.market_state;
        let legal = matches!(
            (current, next),
            (MarketState::Closed, MarketState::Preopen)
                | (MarketState::Preopen, MarketState::Open)
                | (MarketState::Open, MarketState::Closed)
        );
        if !legal {
            return Err(ExchangeError::InvalidMarketStateTransition {
                from: current,
                to: next,
            });
        }
        state.market_state = next;
        tracing::info!(from = %current, to = %next, "market state changed");
        self.publishers
            .message
            .publish_market_message(&MarketMessage::new(next));
        match next {
            MarketState::Open => {
                for book in state.books.values() {
                    book.open_market()?;
                }
            }
            MarketState::Closed => {
                for book in state.books.values() {
                    book.close_market()?;
                }
            }
            MarketState::Preopen => {}
        }
        Ok(())
    }

    /// Submit an order to its product's book; returns the engine-assigned
    /// order id.
    pub fn submit_order(&self, order: Tradable) -> Result<String> {
        let state = self.state.lock();
        if state.market_state == MarketState::Closed {
            return Err(ExchangeError::InvalidMarketState(MarketState::Closed));
        }
        if state.market_state == MarketState::Preopen && order.price().is_market() {
            return Err(ExchangeError::InvalidData(
                "market-priced orders cannot be submitted while the market is PREOPEN"
                    .to_string(),
            ));
        }
        let book = lookup(&state, order.product())?;
        let id = order.id().to_string();
        book.add_order(state.market_state, order)?;
        Ok(id)
    }

    /// Submit a quote to its product's book.
    pub fn submit_quote(&self, quote: &Quote) -> Result<()> {
        let state = self.state.lock();
        if state.market_state == MarketState::Closed {
            return Err(ExchangeError::InvalidMarketState(MarketState::Closed));
        }
        let book = lookup(&state, quote.product())?;
        book.add_quote(state.market_state, quote)
    }

    /// Cancel an order on one side of a product's book.
    pub fn submit_order_cancel(&self, product: &str, side: Side, order_id: &str) -> Result<()> {
        if order_id.trim().is_empty() {
            return Err(ExchangeError::InvalidData(
                "cannot cancel an empty order id".to_string(),
            ));
        }
        let state = self.state.lock();
        if state.market_state == MarketState::Closed {
            return Err(ExchangeError::InvalidMarketState(MarketState::Closed));
        }
        let book = lookup(&state, &normalize_product(product)?)?;
        book.cancel_order(side, order_id)
    }

    /// Cancel a user's quote on a product's book.
    pub fn submit_quote_cancel(&self, user: &str, product: &str) -> Result<()> {
        if user.trim().is_empty() {
            return Err(ExchangeError::InvalidData(
                "cannot cancel a quote for an empty user name".to_string(),
            ));
        }
        let state = self.state.lock();
        if state.market_state == MarketState::Closed {
            return Err(ExchangeError::InvalidMarketState(MarketState::Closed));
        }
        let book = lookup(&state, &normalize_product(product)?)?;
        book.cancel_quote(&user.trim().to_uppercase())
    }

    /// `[buy_rows, sell_rows]` depth for one product.
    pub fn book_depth(&self, product: &str) -> Result<[Vec<String>; 2]> {
        let state = self.state.lock();
        Ok(lookup(&state, &normalize_product(product)?)?.book_depth())
    }

    /// Top-of-book for one product.
    pub fn market_data(&self, product: &str) -> Result<MarketDataSnapshot> {
        let state = self.state.lock();
        Ok(lookup(&state, &normalize_product(product)?)?.market_data())
    }

    /// A user's live interest with remaining volume on one product.
    pub fn orders_with_remaining_qty(
        &self,
        user: &str,
        product: &str,
    ) -> Result<Vec<TradableSnapshot>> {
        let state = self.state.lock();
        lookup(&state, &normalize_product(product)?)?.orders_with_remaining_qty(user)
    }
}

fn normalize_product(product: &str) -> Result<String> {
    let trimmed = product.trim();
    if trimmed.is_empty() {
        return Err(ExchangeError::InvalidData(
            "product symbol cannot be empty".to_string(),
        ));
    }
    Ok(trimmed.to_uppercase())
}

fn lookup(state: &ServiceState, product: &str) -> Result<Arc<ProductBook>> {
    state
        .books
        .get(product)
        .cloned()
        .ok_or_else(|| ExchangeError::NoSuchProduct(product.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use types::{Price, Volume};

    fn service() -> ProductService {
        ProductService::new(Arc::new(PublisherSet::new()))
    }

    fn buy(volume: u32) -> Tradable {
        Tradable::order("REX", "IBM", Price::Limit(1000), Volume(volume), Side::Buy).unwrap()
    }

    #[test]
    fn test_starts_closed_with_no_products() {
        let svc = service();
        assert_eq!(svc.market_state(), MarketState::Closed);
        assert!(svc.product_list().is_empty());
    }

    #[test]
    fn test_create_product_rejects_duplicates() {
        let svc = service();
        svc.create_product(" ibm ").unwrap();
        assert_eq!(svc.product_list(), vec!["IBM".to_string()]);
        assert!(matches!(
            svc.create_product("IBM").unwrap_err(),
            ExchangeError::ProductAlreadyExists(_)
        ));
        assert!(svc.create_product("").is_err());
    }

    #[test]
    fn test_state_machine_accepts_only_legal_edges() {
        let svc = service();
        assert!(matches!(
            svc.set_market_state("OPEN").unwrap_err(),
            ExchangeError::InvalidMarketStateTransition { .. }
        ));
        svc.set_market_state("preopen").unwrap();
        assert_eq!(svc.market_state(), MarketState::Preopen);
        assert!(svc.set_market_state("CLOSED").is_err());
        svc.set_market_state("OPEN").unwrap();
        assert!(svc.set_market_state("PREOPEN").is_err());
        svc.set_market_state("CLOSED").unwrap();
        assert_eq!(svc.market_state(), MarketState::Closed);
    }

    #[test]
    fn test_state_parse_failures_are_invalid_data() {
        let svc = service();
        assert!(matches!(
            svc.set_market_state("HALTED").unwrap_err(),
            ExchangeError::InvalidData(_)
        ));
    }

    #[test]
    fn test_submissions_rejected_while_closed() {
        let svc = service();
        svc.create_product("IBM").unwrap();
        assert!(matches!(
            svc.submit_order(buy(10)).unwrap_err(),
            ExchangeError::InvalidMarketState(MarketState::Closed)
        ));
        let quote = Quote::new(
            "REX",
            "IBM",
            Price::Limit(999),
            Volume(10),
            Price::Limit(1001),
            Volume(10),
        )
        .unwrap();
        assert!(svc.submit_quote(&quote).is_err());
        assert!(svc.submit_order_cancel("IBM", Side::Buy, "some-id").is_err());
        assert!(svc.submit_quote_cancel("REX", "IBM").is_err());
    }

    #[test]
    fn test_market_order_rejected_in_preopen() {
        let svc = service();
        svc.create_product("IBM").unwrap();
        svc.set_market_state("PREOPEN").unwrap();
        let market_order =
            Tradable::order("REX", "IBM", Price::Market, Volume(10), Side::Buy).unwrap();
        assert!(matches!(
            svc.submit_order(market_order).unwrap_err(),
            ExchangeError::InvalidData(_)
        ));
        // A limit order is fine.
        svc.submit_order(buy(10)).unwrap();
    }

    #[test]
    fn test_unknown_product_is_rejected() {
        let svc = service();
        svc.set_market_state("PREOPEN").unwrap();
        assert!(matches!(
            svc.submit_order(buy(10)).unwrap_err(),
            ExchangeError::NoSuchProduct(_)
        ));
        assert!(svc.book_depth("GE").is_err());
        assert!(svc.market_data("GE").is_err());
        assert!(svc.orders_with_remaining_qty("REX", "GE").is_err());
    }

    #[test]
    fn test_open_transition_crosses_books() {
        let svc = service();
        svc.create_product("IBM").unwrap();
        svc.set_market_state("PREOPEN").unwrap();
        svc.submit_order(buy(100)).unwrap();
        svc.submit_order(
            Tradable::order("ANN", "IBM", Price::Limit(1000), Volume(100), Side::Sell).unwrap(),
        )
        .unwrap();
        svc.set_market_state("OPEN").unwrap();

        let depth = svc.book_depth("IBM").unwrap();
        assert_eq!(depth[0], vec!["<Empty>".to_string()]);
        assert_eq!(depth[1], vec!["<Empty>".to_string()]);
    }

    #[test]
    fn test_close_transition_empties_books() {
        let svc = service();
        svc.create_product("IBM").unwrap();
        svc.set_market_state("PREOPEN").unwrap();
        svc.submit_order(buy(100)).unwrap();
        svc.set_market_state("OPEN").unwrap();
        svc.set_market_state("CLOSED").unwrap();
        let depth = svc.book_depth("IBM").unwrap();
        assert_eq!(depth[0], vec!["<Empty>".to_string()]);
    }

    #[test]
    fn test_order_lifecycle_queries() {
        let svc = service();
        svc.create_product("IBM").unwrap();
        svc.set_market_state("PREOPEN").unwrap();
        let id = svc.submit_order(buy(100)).unwrap();
        let working = svc.orders_with_remaining_qty("REX", "IBM").unwrap();
        assert_eq!(working.len(), 1);
        assert_eq!(working[0].id, id);

        svc.submit_order_cancel("IBM", Side::Buy, &id).unwrap();
        assert!(svc
            .orders_with_remaining_qty("REX", "IBM")
            .unwrap()
            .is_empty());
    }
}
