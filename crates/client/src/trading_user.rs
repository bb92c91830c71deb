//! A connected market participant.
//!
//! `TradingUser` is the default [`Subscriber`] implementation: its callbacks
//! perform only local updates (position ledger, logging) and never re-enter
//! the engine. The command-side methods proxy through the
//! [`UserCommandService`] using the session established by [`TradingUser::connect`].

use crate::command_service::UserCommandService;
use crate::order_record::OrderRecord;
use crate::position::Position;
use parking_lot::Mutex;
use publishers::Subscriber;
use std::sync::{Arc, Weak};
use types::{
    CancelMessage, ExchangeError, FillMessage, MarketState, Price, Result, TradableSnapshot,
    Volume,
};

pub struct TradingUser {
    name: String,
    services: Arc<UserCommandService>,
    // Handle to the Arc this user lives in; connect registers it as the
    // session's observer.
    weak_self: Weak<TradingUser>,
    connection_id: Mutex<Option<u64>>,
    available_products: Mutex<Option<Vec<String>>>,
    position: Mutex<Position>,
    orders: Mutex<Vec<OrderRecord>>,
}

impl TradingUser {
    pub fn new(name: &str, services: Arc<UserCommandService>) -> Result<Arc<Self>> {
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(ExchangeError::InvalidData(
                "a user needs a non-empty name".to_string(),
            ));
        }
        let name = trimmed.to_uppercase();
        Ok(Arc::new_cyclic(|weak_self| Self {
            name,
            services,
            weak_self: weak_self.clone(),
            connection_id: Mutex::new(None),
            available_products: Mutex::new(None),
            position: Mutex::new(Position::new()),
            orders: Mutex::new(Vec::new()),
        }))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn connection_id(&self) -> Result<u64> {
        self.connection_id
            .lock()
            .ok_or_else(|| ExchangeError::UserNotConnected(self.name.clone()))
    }

    /// Establish a session and cache the product list.
    pub fn connect(&self) -> Result<u64> {
        let subscriber: Arc<dyn Subscriber> = self
            .weak_self
            .upgrade()
            .ok_or_else(|| ExchangeError::UserNotConnected(self.name.clone()))?;
        let id = self.services.connect_user(subscriber)?;
        *self.connection_id.lock() = Some(id);
        let products = self.services.get_products(&self.name, id)?;
        *self.available_products.lock() = Some(products);
        Ok(id)
    }

    pub fn disconnect(&self) -> Result<()> {
        let id = self.connection_id()?;
        self.services.disconnect(&self.name, id)?;
        *self.connection_id.lock() = None;
        Ok(())
    }

    /// Submit an order and remember its id.
    pub fn submit_order(
        &self,
        product: &str,
        price: Price,
        volume: Volume,
        side: &str,
    ) -> Result<String> {
        let id = self.connection_id()?;
        let order_id = self
            .services
            .submit_order(&self.name, id, product, price, volume, side)?;
        self.orders
            .lock()
            .push(OrderRecord::new(&self.name, product, side.parse()?, &order_id)?);
        Ok(order_id)
    }

    pub fn submit_order_cancel(&self, product: &str, side: &str, order_id: &str) -> Result<()> {
        let id = self.connection_id()?;
        self.services
            .submit_order_cancel(&self.name, id, product, side, order_id)
    }

    pub fn submit_quote(
        &self,
        product: &str,
        buy_price: Price,
        buy_volume: Volume,
        sell_price: Price,
        sell_volume: Volume,
    ) -> Result<()> {
        let id = self.connection_id()?;
        self.services.submit_quote(
            &self.name, id, product, buy_price, buy_volume, sell_price, sell_volume,
        )
    }

    pub fn submit_quote_cancel(&self, product: &str) -> Result<()> {
        let id = self.connection_id()?;
        self.services.submit_quote_cancel(&self.name, id, product)
    }

    pub fn subscribe_current_market(&self, product: &str) -> Result<()> {
        let id = self.connection_id()?;
        self.services.subscribe_current_market(&self.name, id, product)
    }

    pub fn subscribe_last_sale(&self, product: &str) -> Result<()> {
        let id = self.connection_id()?;
        self.services.subscribe_last_sale(&self.name, id, product)
    }

    pub fn subscribe_messages(&self, product: &str) -> Result<()> {
        let id = self.connection_id()?;
        self.services.subscribe_messages(&self.name, id, product)
    }

    pub fn subscribe_ticker(&self, product: &str) -> Result<()> {
        let id = self.connection_id()?;
        self.services.subscribe_ticker(&self.name, id, product)
    }

    pub fn get_book_depth(&self, product: &str) -> Result<[Vec<String>; 2]> {
        let id = self.connection_id()?;
        self.services.get_book_depth(&self.name, id, product)
    }

    pub fn get_market_state(&self) -> Result<MarketState> {
        let id = self.connection_id()?;
        self.services.get_market_state(&self.name, id)
    }

    pub fn get_orders_with_remaining_qty(&self, product: &str) -> Result<Vec<TradableSnapshot>> {
        let id = self.connection_id()?;
        self.services
            .get_orders_with_remaining_qty(&self.name, id, product)
    }

    /// Products cached at connect time.
    pub fn product_list(&self) -> Vec<String> {
        self.available_products.lock().clone().unwrap_or_default()
    }

    /// Ids of every order this user has submitted.
    pub fn order_ids(&self) -> Vec<OrderRecord> {
        self.orders.lock().clone()
    }

    pub fn account_costs(&self) -> Price {
        self.position.lock().account_costs()
    }

    pub fn all_stock_value(&self) -> Result<Price> {
        self.position.lock().all_stock_value()
    }

    pub fn net_account_value(&self) -> Result<Price> {
        self.position.lock().net_account_value()
    }

    pub fn stock_position_value(&self, product: &str) -> Result<Price> {
        self.position.lock().stock_position_value(product)
    }

    pub fn stock_position_volume(&self, product: &str) -> Result<i64> {
        self.position.lock().stock_position_volume(product)
    }

    pub fn holdings(&self) -> Vec<String> {
        self.position.lock().holdings()
    }
}

impl Subscriber for TradingUser {
    fn user_name(&self) -> &str {
        &self.name
    }

    fn accept_last_sale(&self, product: &str, price: Price, volume: Volume) {
        tracing::info!(user = %self.name, product, %price, %volume, "last sale");
        if let Err(error) = self.position.lock().update_last_sale(product, price) {
            tracing::warn!(user = %self.name, %error, "dropping last-sale update");
        }
    }

    fn accept_fill(&self, fill: &FillMessage) {
        tracing::info!(user = %self.name, %fill, "fill");
        let result = self.position.lock().update_position(
            fill.product(),
            fill.price(),
            fill.side(),
            fill.volume(),
        );
        if let Err(error) = result {
            tracing::warn!(user = %self.name, %error, "dropping position update");
        }
    }

    fn accept_cancel(&self, cancel: &CancelMessage) {
        tracing::info!(user = %self.name, %cancel, "cancel");
    }

    fn accept_market_message(&self, message: &str) {
        tracing::info!(user = %self.name, message, "market state");
    }

    fn accept_ticker(&self, product: &str, price: Price, direction: char) {
        tracing::debug!(user = %self.name, product, %price, %direction, "ticker");
    }

    fn accept_current_market(
        &self,
        product: &str,
        buy_price: Price,
        buy_volume: Volume,
        sell_price: Price,
        sell_volume: Volume,
    ) {
        tracing::debug!(
            user = %self.name,
            product,
            %buy_price,
            %buy_volume,
            %sell_price,
            %sell_volume,
            "current market"
        );
    }
}
