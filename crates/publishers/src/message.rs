//! Fill, cancel, and market-state message fan-out.

use crate::registry::SubscriptionRegistry;
use crate::subscriber::Subscriber;
use parking_lot::Mutex;
use std::sync::Arc;
use types::{CancelMessage, FillMessage, MarketMessage, Result};

/// Publishes fills and cancels to their owning user, and market-state
/// changes to every subscription.
#[derive(Default)]
pub struct MessagePublisher {
    subscriptions: Mutex<SubscriptionRegistry>,
}

impl MessagePublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, subscriber: Arc<dyn Subscriber>, product: &str) -> Result<()> {
        self.subscriptions.lock().subscribe(subscriber, product)
    }

    pub fn unsubscribe(&self, user_name: &str, product: &str) -> Result<()> {
        self.subscriptions.lock().unsubscribe(user_name, product)
    }

    /// Deliver a fill to the subscribers of its product whose name matches
    /// the message user.
    pub fn publish_fill(&self, fill: &FillMessage) {
        tracing::trace!(user = fill.user(), product = fill.product(), fill = %fill, "fill");
        let subscriptions = self.subscriptions.lock();
        for subscriber in subscriptions.registered(fill.product()) {
            if subscriber.user_name() == fill.user() {
                subscriber.accept_fill(fill);
            }
        }
    }

    /// Deliver a cancel to the subscribers of its product whose name matches
    /// the message user.
    pub fn publish_cancel(&self, cancel: &CancelMessage) {
        tracing::trace!(user = cancel.user(), product = cancel.product(), cancel = %cancel, "cancel");
        let subscriptions = self.subscriptions.lock();
        for subscriber in subscriptions.registered(cancel.product()) {
            if subscriber.user_name() == cancel.user() {
                subscriber.accept_cancel(cancel);
            }
        }
    }

    /// Deliver a market-state change to every registration; a user
    /// subscribed to several products hears it once per product.
    pub fn publish_market_message(&self, message: &MarketMessage) {
        let rendered = message.to_string();
        tracing::debug!(state = %message.state(), "market state published");
        let subscriptions = self.subscriptions.lock();
        for subscriber in subscriptions.all() {
            subscriber.accept_market_message(&rendered);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::RecordingSubscriber;
    use types::{MarketState, Price, Side, Volume};

    fn fill_for(user: &str) -> FillMessage {
        FillMessage::new(
            user,
            "IBM",
            Price::Limit(1000),
            Volume(60),
            "leaving 0",
            Side::Buy,
            "some-id",
        )
        .unwrap()
    }

    #[test]
    fn test_fills_routed_by_user_name() {
        let publisher = MessagePublisher::new();
        let rex = RecordingSubscriber::shared("REX");
        let ann = RecordingSubscriber::shared("ANN");
        publisher.subscribe(rex.clone(), "IBM").unwrap();
        publisher.subscribe(ann.clone(), "IBM").unwrap();

        publisher.publish_fill(&fill_for("REX"));

        assert_eq!(rex.fills().len(), 1);
        assert!(ann.fills().is_empty());
    }

    #[test]
    fn test_fill_requires_subscription_to_product() {
        let publisher = MessagePublisher::new();
        let rex = RecordingSubscriber::shared("REX");
        publisher.subscribe(rex.clone(), "GE").unwrap();

        publisher.publish_fill(&fill_for("REX"));
        assert!(rex.fills().is_empty());
    }

    #[test]
    fn test_market_message_delivered_per_subscription() {
        let publisher = MessagePublisher::new();
        let rex = RecordingSubscriber::shared("REX");
        publisher.subscribe(rex.clone(), "IBM").unwrap();
        publisher.subscribe(rex.clone(), "GE").unwrap();

        publisher.publish_market_message(&MarketMessage::new(MarketState::Open));
        assert_eq!(rex.market_messages(), vec!["[OPEN]", "[OPEN]"]);
    }
}
