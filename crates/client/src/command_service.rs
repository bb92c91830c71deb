//! Client-facing command gateway: session identity, authorization, and
//! proxying into the engine and publishers.

use parking_lot::Mutex;
use publishers::{PublisherSet, Subscriber};
use sim_core::ProductService;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use types::{
    ExchangeError, MarketState, Price, Result, Side, Tradable, TradableSnapshot, Volume,
};

struct Session {
    connection_id: u64,
    subscriber: Arc<dyn Subscriber>,
    #[allow(dead_code)] // diagnostic record, mirrors the connection ledger
    connected_at: SystemTime,
}

/// The facade users interact with. Each connected user holds a connection id
/// that every subsequent operation must present; operations are authorized
/// before anything is delegated to the product service or a publisher.
pub struct UserCommandService {
    product_service: Arc<ProductService>,
    publishers: Arc<PublisherSet>,
    sessions: Mutex<HashMap<String, Session>>,
}

impl UserCommandService {
    pub fn new(product_service: Arc<ProductService>, publishers: Arc<PublisherSet>) -> Self {
        Self {
            product_service,
            publishers,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Connect a user and hand back their connection id. A user name can
    /// hold at most one session.
    pub fn connect_user(&self, user: Arc<dyn Subscriber>) -> Result<u64> {
        let name = normalize_name(user.user_name())?;
        let mut sessions = self.sessions.lock();
        if sessions.contains_key(&name) {
            return Err(ExchangeError::AlreadyConnected(name));
        }
        let connection_id = connection_stamp();
        tracing::info!(user = %name, connection_id, "user connected");
        sessions.insert(
            name,
            Session {
                connection_id,
                subscriber: user,
                connected_at: SystemTime::now(),
            },
        );
        Ok(connection_id)
    }

    /// Tear down a session after verifying it.
    pub fn disconnect(&self, user_name: &str, connection_id: u64) -> Result<()> {
        let name = normalize_name(user_name)?;
        let mut sessions = self.sessions.lock();
        verify_user(&sessions, &name, connection_id)?;
        sessions.remove(&name);
        tracing::info!(user = %name, "user disconnected");
        Ok(())
    }

    /// Book depth for one product: `[buy_rows, sell_rows]`.
    pub fn get_book_depth(
        &self,
        user_name: &str,
        connection_id: u64,
        product: &str,
    ) -> Result<[Vec<String>; 2]> {
        self.authorize(user_name, connection_id)?;
        self.product_service.book_depth(product)
    }

    pub fn get_market_state(&self, user_name: &str, connection_id: u64) -> Result<MarketState> {
        self.authorize(user_name, connection_id)?;
        Ok(self.product_service.market_state())
    }

    pub fn get_orders_with_remaining_qty(
        &self,
        user_name: &str,
        connection_id: u64,
        product: &str,
    ) -> Result<Vec<TradableSnapshot>> {
        let name = self.authorize(user_name, connection_id)?;
        self.product_service.orders_with_remaining_qty(&name, product)
    }

    /// Every known product, sorted.
    pub fn get_products(&self, user_name: &str, connection_id: u64) -> Result<Vec<String>> {
        self.authorize(user_name, connection_id)?;
        let mut products = self.product_service.product_list();
        products.sort();
        Ok(products)
    }

    /// Build and submit an order; returns the engine-assigned id.
    pub fn submit_order(
        &self,
        user_name: &str,
        connection_id: u64,
        product: &str,
        price: Price,
        volume: Volume,
        side: &str,
    ) -> Result<String> {
        let side: Side = side.parse()?;
        let name = self.authorize(user_name, connection_id)?;
        let order = Tradable::order(&name, product, price, volume, side)?;
        self.product_service.submit_order(order)
    }

    pub fn submit_order_cancel(
        &self,
        user_name: &str,
        connection_id: u64,
        product: &str,
        side: &str,
        order_id: &str,
    ) -> Result<()> {
        let side: Side = side.parse()?;
        self.authorize(user_name, connection_id)?;
        self.product_service
            .submit_order_cancel(product, side, order_id)
    }

    pub fn submit_quote(
        &self,
        user_name: &str,
        connection_id: u64,
        product: &str,
        buy_price: Price,
        buy_volume: Volume,
        sell_price: Price,
        sell_volume: Volume,
    ) -> Result<()> {
        let name = self.authorize(user_name, connection_id)?;
        let quote = types::Quote::new(
            &name,
            product,
            buy_price,
            buy_volume,
            sell_price,
            sell_volume,
        )?;
        self.product_service.submit_quote(&quote)
    }

    pub fn submit_quote_cancel(
        &self,
        user_name: &str,
        connection_id: u64,
        product: &str,
    ) -> Result<()> {
        let name = self.authorize(user_name, connection_id)?;
        self.product_service.submit_quote_cancel(&name, product)
    }

    pub fn subscribe_current_market(
        &self,
        user_name: &str,
        connection_id: u64,
        product: &str,
    ) -> Result<()> {
        let (subscriber, product) = self.subscription_target(user_name, connection_id, product)?;
        self.publishers.current_market.subscribe(subscriber, &product)
    }

    pub fn subscribe_last_sale(
        &self,
        user_name: &str,
        connection_id: u64,
        product: &str,
    ) -> Result<()> {
        let (subscriber, product) = self.subscription_target(user_name, connection_id, product)?;
        self.publishers.last_sale.subscribe(subscriber, &product)
    }

    pub fn subscribe_messages(
        &self,
        user_name: &str,
        connection_id: u64,
        product: &str,
    ) -> Result<()> {
        let (subscriber, product) = self.subscription_target(user_name, connection_id, product)?;
        self.publishers.message.subscribe(subscriber, &product)
    }

    pub fn subscribe_ticker(
        &self,
        user_name: &str,
        connection_id: u64,
        product: &str,
    ) -> Result<()> {
        let (subscriber, product) = self.subscription_target(user_name, connection_id, product)?;
        self.publishers.ticker.subscribe(subscriber, &product)
    }

    pub fn unsubscribe_current_market(
        &self,
        user_name: &str,
        connection_id: u64,
        product: &str,
    ) -> Result<()> {
        let name = self.authorize(user_name, connection_id)?;
        let product = normalize_name(product)?;
        self.publishers.current_market.unsubscribe(&name, &product)
    }

    pub fn unsubscribe_last_sale(
        &self,
        user_name: &str,
        connection_id: u64,
        product: &str,
    ) -> Result<()> {
        let name = self.authorize(user_name, connection_id)?;
        let product = normalize_name(product)?;
        self.publishers.last_sale.unsubscribe(&name, &product)
    }

    pub fn unsubscribe_messages(
        &self,
        user_name: &str,
        connection_id: u64,
        product: &str,
    ) -> Result<()> {
        let name = self.authorize(user_name, connection_id)?;
        let product = normalize_name(product)?;
        self.publishers.message.unsubscribe(&name, &product)
    }

    pub fn unsubscribe_ticker(
        &self,
        user_name: &str,
        connection_id: u64,
        product: &str,
    ) -> Result<()> {
        let name = self.authorize(user_name, connection_id)?;
        let product = normalize_name(product)?;
        self.publishers.ticker.unsubscribe(&name, &product)
    }

    /// Verify the session and return the normalized user name.
    fn authorize(&self, user_name: &str, connection_id: u64) -> Result<String> {
        let name = normalize_name(user_name)?;
        let sessions = self.sessions.lock();
        verify_user(&sessions, &name, connection_id)?;
        Ok(name)
    }

    /// Verify the session and return the registered observer plus the
    /// normalized product for a subscription call.
    fn subscription_target(
        &self,
        user_name: &str,
        connection_id: u64,
        product: &str,
    ) -> Result<(Arc<dyn Subscriber>, String)> {
        let name = normalize_name(user_name)?;
        let product = normalize_name(product)?;
        let sessions = self.sessions.lock();
        verify_user(&sessions, &name, connection_id)?;
        let session = sessions
            .get(&name)
            .ok_or_else(|| ExchangeError::UserNotConnected(name.clone()))?;
        Ok((session.subscriber.clone(), product))
    }
}

fn verify_user(
    sessions: &HashMap<String, Session>,
    name: &str,
    connection_id: u64,
) -> Result<()> {
    let session = sessions
        .get(name)
        .ok_or_else(|| ExchangeError::UserNotConnected(name.to_string()))?;
    if session.connection_id != connection_id {
        return Err(ExchangeError::InvalidConnectionId(name.to_string()));
    }
    Ok(())
}

fn normalize_name(value: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ExchangeError::InvalidData(
            "name cannot be empty".to_string(),
        ));
    }
    Ok(trimmed.to_uppercase())
}

/// Strictly monotonic connection stamp, seeded from the wall clock.
fn connection_stamp() -> u64 {
    static LAST: AtomicU64 = AtomicU64::new(0);
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default();
    let mut prev = LAST.load(Ordering::Relaxed);
    loop {
        let next = now.max(prev + 1);
        match LAST.compare_exchange_weak(prev, next, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(observed) => prev = observed,
        }
    }
}
