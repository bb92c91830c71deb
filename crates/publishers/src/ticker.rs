//! Price-direction ticker.

use crate::registry::SubscriptionRegistry;
use crate::subscriber::Subscriber;
use parking_lot::Mutex;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use types::{Price, Result};

/// Direction character on the first observation of a product.
const FIRST_OBSERVATION: char = ' ';

/// Publishes `(product, price, direction)` events derived from the last-sale
/// stream. The direction compares the new price to the previously observed
/// one for the product: space on first observation, `=` when equal, U+2193
/// when the previous price was greater, U+2191 otherwise.
#[derive(Default)]
pub struct TickerPublisher {
    subscriptions: Mutex<SubscriptionRegistry>,
    last_prices: Mutex<HashMap<String, Price>>,
}

impl TickerPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, subscriber: Arc<dyn Subscriber>, product: &str) -> Result<()> {
        self.subscriptions.lock().subscribe(subscriber, product)
    }

    pub fn unsubscribe(&self, user_name: &str, product: &str) -> Result<()> {
        self.subscriptions.lock().unsubscribe(user_name, product)
    }

    /// Compute the direction against the remembered price, remember the new
    /// price, and fan the tick out to the product's subscribers.
    pub fn publish_ticker(&self, product: &str, price: Price) {
        let direction = {
            let mut last_prices = self.last_prices.lock();
            match last_prices.insert(product.to_string(), price) {
                None => FIRST_OBSERVATION,
                Some(previous) => match previous.cmp_value(price) {
                    Ordering::Equal => '=',
                    Ordering::Greater => '\u{2193}',
                    Ordering::Less => '\u{2191}',
                },
            }
        };
        tracing::trace!(product, %price, %direction, "ticker");
        let subscriptions = self.subscriptions.lock();
        for subscriber in subscriptions.registered(product) {
            subscriber.accept_ticker(product, price, direction);
        }
    }
}
