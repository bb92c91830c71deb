//! Shared data model for the exchange simulation.
//!
//! This crate provides the types every other crate speaks in: fixed-point
//! prices with the market sentinel, the tradable model for orders and quote
//! sides, the immutable event messages the engine emits, and the error
//! taxonomy used across component boundaries.

mod error;
mod market_data;
mod message;
mod price;
mod quote;
mod tradable;

pub use error::{ExchangeError, Result};
pub use market_data::MarketDataSnapshot;
pub use message::{CancelMessage, FillMessage, MarketMessage, MarketState};
pub use price::{Price, Volume};
pub use quote::Quote;
pub use tradable::{Side, Tradable, TradableKind, TradableSnapshot};
