//! Last-sale fan-out.

use crate::registry::SubscriptionRegistry;
use crate::subscriber::Subscriber;
use crate::ticker::TickerPublisher;
use parking_lot::Mutex;
use std::sync::Arc;
use types::{Price, Result, Volume};

/// Publishes the representative `(price, volume)` of each matching round to
/// the product's subscribers, then forwards the price to the ticker.
pub struct LastSalePublisher {
    subscriptions: Mutex<SubscriptionRegistry>,
    ticker: Arc<TickerPublisher>,
}

impl LastSalePublisher {
    pub fn new(ticker: Arc<TickerPublisher>) -> Self {
        Self {
            subscriptions: Mutex::new(SubscriptionRegistry::new()),
            ticker,
        }
    }

    pub fn subscribe(&self, subscriber: Arc<dyn Subscriber>, product: &str) -> Result<()> {
        self.subscriptions.lock().subscribe(subscriber, product)
    }

    pub fn unsubscribe(&self, user_name: &str, product: &str) -> Result<()> {
        self.subscriptions.lock().unsubscribe(user_name, product)
    }

    /// Deliver the last sale to the product's subscribers, then publish the
    /// ticker for the same product and price.
    pub fn publish_last_sale(&self, product: &str, price: Price, volume: Volume) {
        tracing::trace!(product, %price, %volume, "last sale");
        {
            let subscriptions = self.subscriptions.lock();
            for subscriber in subscriptions.registered(product) {
                subscriber.accept_last_sale(product, price, volume);
            }
        }
        self.ticker.publish_ticker(product, price);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingSubscriber;

    #[test]
    fn test_last_sale_chains_into_ticker() {
        let ticker = Arc::new(TickerPublisher::new());
        let publisher = LastSalePublisher::new(ticker.clone());
        let rex = RecordingSubscriber::shared("REX");
        publisher.subscribe(rex.clone(), "IBM").unwrap();
        ticker.subscribe(rex.clone(), "IBM").unwrap();

        publisher.publish_last_sale("IBM", Price::Limit(1000), Volume(60));

        assert_eq!(
            rex.last_sales(),
            vec![("IBM".to_string(), Price::Limit(1000), Volume(60))]
        );
        assert_eq!(rex.tickers().len(), 1);
    }

    #[test]
    fn test_ticker_fires_even_without_last_sale_subscribers() {
        let ticker = Arc::new(TickerPublisher::new());
        let publisher = LastSalePublisher::new(ticker.clone());
        let rex = RecordingSubscriber::shared("REX");
        ticker.subscribe(rex.clone(), "IBM").unwrap();

        publisher.publish_last_sale("IBM", Price::Limit(1000), Volume(60));
        assert!(rex.last_sales().is_empty());
        assert_eq!(rex.tickers().len(), 1);
    }
}
