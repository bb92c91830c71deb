//! Working interest on the book: orders and quote sides.
//!
//! Orders and quote sides share one concrete [`Tradable`] record distinguished
//! by a kind tag; only id generation differs between the two.

use crate::error::{ExchangeError, Result};
use crate::price::{Price, Volume};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

// =============================================================================
// Side
// =============================================================================

/// Which side of the book a tradable rests on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

impl Side {
    /// Returns the opposite side.
    pub fn opposite(self) -> Self {
        match self {
            Side::Buy => Side::Sell,
            Side::Sell => Side::Buy,
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Side::Buy => write!(f, "BUY"),
            Side::Sell => write!(f, "SELL"),
        }
    }
}

impl FromStr for Side {
    type Err = ExchangeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_uppercase().as_str() {
            "BUY" => Ok(Side::Buy),
            "SELL" => Ok(Side::Sell),
            other => Err(ExchangeError::InvalidData(format!(
                "a side can only be BUY or SELL, got {other:?}"
            ))),
        }
    }
}

// =============================================================================
// Tradable
// =============================================================================

/// Distinguishes a standalone order from one side of a quote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradableKind {
    Order,
    QuoteSide,
}

/// A unit of working interest that can rest on the book or match.
///
/// Invariant: `remaining_volume + cancelled_volume <= original_volume` at all
/// times; the two volume setters are the only mutators and enforce it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tradable {
    user: String,
    product: String,
    side: Side,
    price: Price,
    original_volume: Volume,
    remaining_volume: Volume,
    cancelled_volume: Volume,
    id: String,
    kind: TradableKind,
}

impl Tradable {
    /// Create an order. Id shape: `<USER><PRODUCT><price><stamp>`.
    pub fn order(
        user: &str,
        product: &str,
        price: Price,
        original_volume: Volume,
        side: Side,
    ) -> Result<Self> {
        Self::new(user, product, price, original_volume, side, TradableKind::Order)
    }

    /// Create one side of a quote. Id shape: `<USER><PRODUCT><stamp>`.
    pub fn quote_side(
        user: &str,
        product: &str,
        price: Price,
        original_volume: Volume,
        side: Side,
    ) -> Result<Self> {
        Self::new(
            user,
            product,
            price,
            original_volume,
            side,
            TradableKind::QuoteSide,
        )
    }

    fn new(
        user: &str,
        product: &str,
        price: Price,
        original_volume: Volume,
        side: Side,
        kind: TradableKind,
    ) -> Result<Self> {
        let user = normalize(user, "user name")?;
        let product = normalize(product, "product symbol")?;
        if original_volume.is_zero() {
            return Err(ExchangeError::InvalidData(
                "original volume must be greater than zero".to_string(),
            ));
        }
        let stamp = next_stamp();
        let id = match kind {
            TradableKind::Order => format!("{user}{product}{price}{stamp}"),
            TradableKind::QuoteSide => format!("{user}{product}{stamp}"),
        };
        Ok(Self {
            user,
            product,
            side,
            price,
            original_volume,
            remaining_volume: original_volume,
            cancelled_volume: Volume::ZERO,
            id,
            kind,
        })
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn product(&self) -> &str {
        &self.product
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn price(&self) -> Price {
        self.price
    }

    pub fn original_volume(&self) -> Volume {
        self.original_volume
    }

    pub fn remaining_volume(&self) -> Volume {
        self.remaining_volume
    }

    pub fn cancelled_volume(&self) -> Volume {
        self.cancelled_volume
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn is_quote(&self) -> bool {
        self.kind == TradableKind::QuoteSide
    }

    /// Set the remaining volume; rejects any value that would push
    /// `remaining + cancelled` past the original volume.
    pub fn set_remaining_volume(&mut self, volume: Volume) -> Result<()> {
        if volume.raw() as u64 + self.cancelled_volume.raw() as u64
            > self.original_volume.raw() as u64
        {
            return Err(ExchangeError::InvalidData(format!(
                "remaining volume {volume} plus cancelled {} would exceed original {} on {}",
                self.cancelled_volume, self.original_volume, self.id
            )));
        }
        self.remaining_volume = volume;
        Ok(())
    }

    /// Set the cancelled volume; symmetric to [`Self::set_remaining_volume`].
    pub fn set_cancelled_volume(&mut self, volume: Volume) -> Result<()> {
        if volume.raw() as u64 + self.remaining_volume.raw() as u64
            > self.original_volume.raw() as u64
        {
            return Err(ExchangeError::InvalidData(format!(
                "cancelled volume {volume} plus remaining {} would exceed original {} on {}",
                self.remaining_volume, self.original_volume, self.id
            )));
        }
        self.cancelled_volume = volume;
        Ok(())
    }
}

impl fmt::Display for Tradable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}: {} {} {} at {} (Original Vol: {}, CXL'd Vol: {}), ID: {}",
            self.user,
            if self.is_quote() { "quote side" } else { "order" },
            self.side,
            self.remaining_volume,
            self.product,
            self.price,
            self.original_volume,
            self.cancelled_volume,
            self.id
        )
    }
}

// =============================================================================
// TradableSnapshot
// =============================================================================

/// Point-in-time copy of a tradable's observable attributes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradableSnapshot {
    pub product: String,
    pub price: Price,
    pub original_volume: Volume,
    pub remaining_volume: Volume,
    pub cancelled_volume: Volume,
    pub user: String,
    pub side: Side,
    pub is_quote: bool,
    pub id: String,
}

impl From<&Tradable> for TradableSnapshot {
    fn from(trd: &Tradable) -> Self {
        Self {
            product: trd.product.clone(),
            price: trd.price,
            original_volume: trd.original_volume,
            remaining_volume: trd.remaining_volume,
            cancelled_volume: trd.cancelled_volume,
            user: trd.user.clone(),
            side: trd.side,
            is_quote: trd.is_quote(),
            id: trd.id.clone(),
        }
    }
}

impl fmt::Display for TradableSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Product: {}, Price: {}, OriginalVolume: {}, RemainingVolume: {}, \
             CancelledVolume: {}, User: {}, Side: {}, IsQuote: {}, Id: {}",
            self.product,
            self.price,
            self.original_volume,
            self.remaining_volume,
            self.cancelled_volume,
            self.user,
            self.side,
            self.is_quote,
            self.id
        )
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Trim and upper-case an externally supplied name, rejecting empty input.
pub(crate) fn normalize(value: &str, what: &str) -> Result<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ExchangeError::InvalidData(format!(
            "{what} cannot be empty"
        )));
    }
    Ok(trimmed.to_uppercase())
}

/// Strictly monotonic stamp for tradable ids, seeded from the wall clock.
fn next_stamp() -> u64 {
    static LAST: AtomicU64 = AtomicU64::new(0);
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or_default();
    let mut prev = LAST.load(Ordering::Relaxed);
    loop {
        let next = now.max(prev + 1);
        match LAST.compare_exchange_weak(prev, next, Ordering::Relaxed, Ordering::Relaxed) {
            Ok(_) => return next,
            Err(observed) => prev = observed,
        }
    }
}
