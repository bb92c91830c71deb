//! Error taxonomy shared across the exchange.

use crate::message::MarketState;
use thiserror::Error;

/// Result type for exchange operations.
pub type Result<T> = std::result::Result<T, ExchangeError>;

/// Typed failures used across component boundaries.
///
/// Validation failures are raised at the outermost layer where the offending
/// argument is first observed, before any state is mutated, so a rejected
/// operation leaves the book untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExchangeError {
    /// Empty, malformed, or out-of-range argument.
    #[error("invalid data: {0}")]
    InvalidData(String),

    /// Arithmetic or ordering involving the market price sentinel.
    #[error("invalid price operation: {0}")]
    InvalidPriceOperation(String),

    /// Operation not allowed in the current market state.
    #[error("operation not allowed while the market is {0}")]
    InvalidMarketState(MarketState),

    /// Illegal market state transition.
    #[error("the market cannot transition from {from} to {to}")]
    InvalidMarketStateTransition { from: MarketState, to: MarketState },

    /// Unknown product symbol.
    #[error("no such product: {0}")]
    NoSuchProduct(String),

    /// Duplicate product creation.
    #[error("product already exists: {0}")]
    ProductAlreadyExists(String),

    /// A cancel could locate the order neither live nor in the archive.
    #[error("order not found: {0}")]
    OrderNotFound(String),

    /// Duplicate connect for a user name.
    #[error("{0} is already connected")]
    AlreadyConnected(String),

    /// Operation attempted for a user with no session.
    #[error("{0} is not connected")]
    UserNotConnected(String),

    /// Session check failed: the connection id does not match.
    #[error("invalid connection id for {0}")]
    InvalidConnectionId(String),

    /// Duplicate publisher subscription.
    #[error("{user} is already subscribed to {product}")]
    AlreadySubscribed { user: String, product: String },

    /// Unsubscribe without a matching subscription.
    #[error("{user} is not subscribed to {product}")]
    NotSubscribed { user: String, product: String },
}
