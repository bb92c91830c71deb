//! Top-of-book fan-out.

use crate::registry::SubscriptionRegistry;
use crate::subscriber::Subscriber;
use parking_lot::Mutex;
use std::sync::Arc;
use types::{MarketDataSnapshot, Result};

/// Publishes the current market (best price and volume on both sides) to
/// the subscribers of the affected product.
#[derive(Default)]
pub struct CurrentMarketPublisher {
    subscriptions: Mutex<SubscriptionRegistry>,
}

impl CurrentMarketPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, subscriber: Arc<dyn Subscriber>, product: &str) -> Result<()> {
        self.subscriptions.lock().subscribe(subscriber, product)
    }

    pub fn unsubscribe(&self, user_name: &str, product: &str) -> Result<()> {
        self.subscriptions.lock().unsubscribe(user_name, product)
    }

    /// Deliver a top-of-book update to every subscriber of its product.
    pub fn publish_current_market(&self, md: &MarketDataSnapshot) {
        tracing::trace!(product = %md.product, data = %md, "current market");
        let subscriptions = self.subscriptions.lock();
        for subscriber in subscriptions.registered(&md.product) {
            subscriber.accept_current_market(
                &md.product,
                md.buy_price,
                md.buy_volume,
                md.sell_price,
                md.sell_volume,
            );
        }
    }
}
