//! Event fan-out for the exchange: subscription registries and the four
//! publishers surfacing book state to connected users.
//!
//! Publishers are explicitly constructed components (no process-global
//! singletons): the application builds one [`PublisherSet`] and wires it
//! through the engine via `Arc`. Tests build a fresh set per case to keep
//! state isolated.
//!
//! Delivery callbacks run on the publishing thread while the publisher's
//! lock is held; see [`Subscriber`] for the re-entrancy rules. A failure
//! inside a subscriber is the subscriber's problem — publishers never roll
//! back the operation that emitted the event.

mod current_market;
mod last_sale;
mod message;
mod registry;
mod subscriber;
mod ticker;

pub use current_market::CurrentMarketPublisher;
pub use last_sale::LastSalePublisher;
pub use message::MessagePublisher;
pub use subscriber::Subscriber;
pub use ticker::TickerPublisher;

use std::sync::Arc;

/// The four publishers of the exchange, constructed and wired together.
///
/// The last-sale publisher forwards into the ticker, so the set owns the
/// wiring; everything is shared by `Arc` so the engine, the gateway, and the
/// application can hold the same instances.
pub struct PublisherSet {
    pub current_market: Arc<CurrentMarketPublisher>,
    pub last_sale: Arc<LastSalePublisher>,
    pub ticker: Arc<TickerPublisher>,
    pub message: Arc<MessagePublisher>,
}

impl PublisherSet {
    pub fn new() -> Self {
        let ticker = Arc::new(TickerPublisher::new());
        Self {
            current_market: Arc::new(CurrentMarketPublisher::new()),
            last_sale: Arc::new(LastSalePublisher::new(ticker.clone())),
            ticker,
            message: Arc::new(MessagePublisher::new()),
        }
    }
}

impl Default for PublisherSet {
    fn default() -> Self {
        Self::new()
    }
}
