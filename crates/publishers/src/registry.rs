//! Subscription bookkeeping shared by the four publishers.

use crate::subscriber::Subscriber;
use std::collections::HashMap;
use std::sync::Arc;
use types::{ExchangeError, Result};

/// Product -> insertion-ordered subscriber list. A subscriber (identified by
/// user name) is registered at most once per product.
#[derive(Default)]
pub(crate) struct SubscriptionRegistry {
    records: HashMap<String, Vec<Arc<dyn Subscriber>>>,
}

impl SubscriptionRegistry {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn subscribe(
        &mut self,
        subscriber: Arc<dyn Subscriber>,
        product: &str,
    ) -> Result<()> {
        let list = self.records.entry(product.to_string()).or_default();
        if list.iter().any(|s| s.user_name() == subscriber.user_name()) {
            return Err(ExchangeError::AlreadySubscribed {
                user: subscriber.user_name().to_string(),
                product: product.to_string(),
            });
        }
        list.push(subscriber);
        Ok(())
    }

    pub(crate) fn unsubscribe(&mut self, user_name: &str, product: &str) -> Result<()> {
        let not_subscribed = || ExchangeError::NotSubscribed {
            user: user_name.to_string(),
            product: product.to_string(),
        };
        let list = self.records.get_mut(product).ok_or_else(not_subscribed)?;
        let position = list
            .iter()
            .position(|s| s.user_name() == user_name)
            .ok_or_else(not_subscribed)?;
        list.remove(position);
        Ok(())
    }

    /// Subscribers registered for one product, in registration order.
    pub(crate) fn registered(&self, product: &str) -> &[Arc<dyn Subscriber>] {
        self.records.get(product).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every registration across every product; a subscriber appears once
    /// per product it is registered for.
    pub(crate) fn all(&self) -> impl Iterator<Item = &Arc<dyn Subscriber>> {
        self.records.values().flatten()
    }
}
