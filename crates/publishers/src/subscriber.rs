//! Observer contract consumed by the client layer.
//!
//! Subscribers are **observers**: they receive market events and may not
//! modify engine state from inside a callback.
//!
//! # Thread Safety
//!
//! Callbacks run on the publishing thread while the publisher's lock is
//! held. Implementations must be `Send + Sync`, use interior mutability
//! (`Mutex`, atomics) for their own state, and must not re-enter the engine
//! from a callback — any follow-up engine call belongs to a later operation.

use types::{CancelMessage, FillMessage, Price, Volume};

/// A connected market participant receiving event fan-out.
pub trait Subscriber: Send + Sync {
    /// Name identifying this subscriber; fills and cancels are routed by it.
    fn user_name(&self) -> &str;

    /// A trade printed for a product this subscriber watches.
    fn accept_last_sale(&self, product: &str, price: Price, volume: Volume);

    /// One of this subscriber's own tradables (partially) traded.
    fn accept_fill(&self, fill: &FillMessage);

    /// One of this subscriber's own tradables had volume cancelled.
    fn accept_cancel(&self, cancel: &CancelMessage);

    /// The market changed state; `message` is the `[STATE]` rendering.
    fn accept_market_message(&self, message: &str);

    /// Tick event: last-sale price plus a direction character
    /// (space, `=`, U+2193, or U+2191).
    fn accept_ticker(&self, product: &str, price: Price, direction: char);

    /// Top-of-book update for a product this subscriber watches.
    fn accept_current_market(
        &self,
        product: &str,
        buy_price: Price,
        buy_volume: Volume,
        sell_price: Price,
        sell_volume: Volume,
    );
}
