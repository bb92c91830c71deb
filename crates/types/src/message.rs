//! Immutable events emitted by the engine: fills, cancels, and market-state
//! changes.

use crate::error::{ExchangeError, Result};
use crate::price::{Price, Volume};
use crate::tradable::{normalize, Side};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// =============================================================================
// Fill
// =============================================================================

/// Records that some volume of a tradable traded at a given price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FillMessage {
    user: String,
    product: String,
    price: Price,
    volume: Volume,
    details: String,
    side: Side,
    id: String,
}

impl FillMessage {
    pub fn new(
        user: &str,
        product: &str,
        price: Price,
        volume: Volume,
        details: &str,
        side: Side,
        id: &str,
    ) -> Result<Self> {
        let (user, product, details, id) = validate_message_fields(user, product, details, id)?;
        Ok(Self {
            user,
            product,
            price,
            volume,
            details,
            side,
            id,
        })
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn product(&self) -> &str {
        &self.product
    }

    pub fn price(&self) -> Price {
        self.price
    }

    pub fn volume(&self) -> Volume {
        self.volume
    }

    pub fn details(&self) -> &str {
        &self.details
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Replace the volume; used when fills for the same tradable aggregate.
    pub fn set_volume(&mut self, volume: Volume) {
        self.volume = volume;
    }

    /// Replace the details; used when fills for the same tradable aggregate.
    pub fn set_details(&mut self, details: &str) {
        self.details = details.to_string();
    }
}

impl fmt::Display for FillMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "User: {}, Product: {}, Price: {}, Volume: {}, Details: {}, Side: {}",
            self.user, self.product, self.price, self.volume, self.details, self.side
        )
    }
}

// =============================================================================
// Cancel
// =============================================================================

/// Records the removal of outstanding volume from a tradable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelMessage {
    user: String,
    product: String,
    price: Price,
    volume: Volume,
    details: String,
    side: Side,
    id: String,
}

impl CancelMessage {
    pub fn new(
        user: &str,
        product: &str,
        price: Price,
        volume: Volume,
        details: &str,
        side: Side,
        id: &str,
    ) -> Result<Self> {
        let (user, product, details, id) = validate_message_fields(user, product, details, id)?;
        Ok(Self {
            user,
            product,
            price,
            volume,
            details,
            side,
            id,
        })
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn product(&self) -> &str {
        &self.product
    }

    pub fn price(&self) -> Price {
        self.price
    }

    pub fn volume(&self) -> Volume {
        self.volume
    }

    pub fn details(&self) -> &str {
        &self.details
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for CancelMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "User: {}, Product: {}, Price: {}, Volume: {}, Details: {}, Side: {}, Id: {}",
            self.user, self.product, self.price, self.volume, self.details, self.side, self.id
        )
    }
}

/// Shared field validation for fills and cancels: user/product normalized and
/// non-empty, details and id non-empty.
fn validate_message_fields(
    user: &str,
    product: &str,
    details: &str,
    id: &str,
) -> Result<(String, String, String, String)> {
    let user = normalize(user, "message user")?;
    let product = normalize(product, "message product")?;
    if details.trim().is_empty() {
        return Err(ExchangeError::InvalidData(
            "message details cannot be empty".to_string(),
        ));
    }
    if id.trim().is_empty() {
        return Err(ExchangeError::InvalidData(
            "message id cannot be empty".to_string(),
        ));
    }
    Ok((user, product, details.to_string(), id.to_string()))
}

// =============================================================================
// Market state
// =============================================================================

/// Trading phase of the whole market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketState {
    Closed,
    Preopen,
    Open,
}

impl fmt::Display for MarketState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MarketState::Closed => write!(f, "CLOSED"),
            MarketState::Preopen => write!(f, "PREOPEN"),
            MarketState::Open => write!(f, "OPEN"),
        }
    }
}

impl FromStr for MarketState {
    type Err = ExchangeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "CLOSED" => Ok(MarketState::Closed),
            "PREOPEN" => Ok(MarketState::Preopen),
            "OPEN" => Ok(MarketState::Open),
            other => Err(ExchangeError::InvalidData(format!(
                "a market state can only be CLOSED, PREOPEN, or OPEN, got {other:?}"
            ))),
        }
    }
}

/// Announcement of a market-state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarketMessage {
    state: MarketState,
}

impl MarketMessage {
    pub fn new(state: MarketState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> MarketState {
        self.state
    }
}

impl fmt::Display for MarketMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}]", self.state)
    }
}
