//! One side of a product's book.
//!
//! A side maps prices to arrival-ordered queues of tradables. The BUY side
//! ranks prices descending (best = highest), the SELL side ascending
//! (best = lowest); the market sentinel, when present, is unconditionally
//! best on either side. A price whose queue empties is removed immediately,
//! so an empty bucket is never observable.

use crate::product_book::OldEntries;
use crate::trade_processor::{self, FillMap};
use std::collections::BTreeMap;
use types::{
    CancelMessage, ExchangeError, Price, Result, Side, Tradable, TradableSnapshot, Volume,
};

pub struct BookSide {
    side: Side,
    entries: BTreeMap<Price, Vec<Tradable>>,
}

impl BookSide {
    pub fn new(side: Side) -> Self {
        Self {
            side,
            entries: BTreeMap::new(),
        }
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Best price under this side's ordering; `None` when the side is empty.
    pub fn top_of_book_price(&self) -> Option<Price> {
        match self.side {
            // Storage order already puts the market sentinel first, then
            // ascending cents.
            Side::Sell => self.entries.keys().next().copied(),
            Side::Buy => {
                if self.entries.contains_key(&Price::MARKET) {
                    Some(Price::MARKET)
                } else {
                    self.entries.keys().next_back().copied()
                }
            }
        }
    }

    /// Sum of remaining volumes at the best price; zero when empty.
    pub fn top_of_book_volume(&self) -> Volume {
        let Some(top) = self.top_of_book_price() else {
            return Volume::ZERO;
        };
        self.entries
            .get(&top)
            .map(|bucket| bucket.iter().map(Tradable::remaining_volume).sum())
            .unwrap_or(Volume::ZERO)
    }

    /// `"<price> x <volume>"` rows in side order; `["<Empty>"]` when empty.
    pub fn book_depth(&self) -> Vec<String> {
        if self.entries.is_empty() {
            return vec!["<Empty>".to_string()];
        }
        self.sorted_prices()
            .into_iter()
            .map(|price| {
                let volume: Volume = self
                    .entries
                    .get(&price)
                    .map(|bucket| bucket.iter().map(Tradable::remaining_volume).sum())
                    .unwrap_or(Volume::ZERO);
                format!("{price} x {volume}")
            })
            .collect()
    }

    /// Prices in side order, best first.
    fn sorted_prices(&self) -> Vec<Price> {
        match self.side {
            Side::Sell => self.entries.keys().copied().collect(),
            Side::Buy => {
                let mut prices = Vec::with_capacity(self.entries.len());
                if self.entries.contains_key(&Price::MARKET) {
                    prices.push(Price::MARKET);
                }
                prices.extend(
                    self.entries
                        .keys()
                        .rev()
                        .copied()
                        .filter(|p| !p.is_market()),
                );
                prices
            }
        }
    }

    /// Append to the queue at the tradable's price, creating the bucket if
    /// absent.
    pub fn add_to_book(&mut self, trd: Tradable) {
        self.entries.entry(trd.price()).or_default().push(trd);
    }

    /// Remove a tradable by id; drops the bucket if it empties. No-op when
    /// the id is not on this side.
    pub fn remove_tradable(&mut self, id: &str) {
        let location = self.locate(|t| t.id() == id);
        if let Some((price, index)) = location {
            if let Some(bucket) = self.entries.get_mut(&price) {
                bucket.remove(index);
                if bucket.is_empty() {
                    self.entries.remove(&price);
                }
            }
        }
    }

    /// Snapshots of this user's interest that still has remaining volume.
    pub fn orders_with_remaining_qty(&self, user: &str) -> Result<Vec<TradableSnapshot>> {
        if user.trim().is_empty() {
            return Err(ExchangeError::InvalidData(
                "cannot look up orders for an empty user name".to_string(),
            ));
        }
        let user = user.trim().to_uppercase();
        Ok(self
            .entries
            .values()
            .flatten()
            .filter(|t| t.user() == user && !t.remaining_volume().is_zero())
            .map(TradableSnapshot::from)
            .collect())
    }

    /// Remove this user's interest from this side and return its snapshot.
    /// Under the quote-replaces invariant there is at most one such entry.
    pub(crate) fn remove_quote(&mut self, user: &str) -> Option<TradableSnapshot> {
        let (price, index) = self.locate(|t| t.user() == user)?;
        let bucket = self.entries.get_mut(&price)?;
        let removed = bucket.remove(index);
        let snapshot = TradableSnapshot::from(&removed);
        if bucket.is_empty() {
            self.entries.remove(&price);
        }
        Some(snapshot)
    }

    /// Remove the order and return its cancel message after archiving it.
    /// `Ok(None)` means the order is not on this side and the caller should
    /// consult the archive for a too-late-to-cancel diagnosis.
    pub(crate) fn submit_order_cancel(
        &mut self,
        order_id: &str,
        old: &mut OldEntries,
    ) -> Result<Option<CancelMessage>> {
        if order_id.trim().is_empty() {
            return Err(ExchangeError::InvalidData(
                "cannot cancel an empty order id".to_string(),
            ));
        }
        let Some((price, index)) = self.locate(|t| t.id() == order_id) else {
            return Ok(None);
        };
        let Some(bucket) = self.entries.get_mut(&price) else {
            return Ok(None);
        };
        let removed = bucket.remove(index);
        if bucket.is_empty() {
            self.entries.remove(&price);
        }
        let message = CancelMessage::new(
            removed.user(),
            removed.product(),
            removed.price(),
            removed.remaining_volume(),
            &format!("{} Order Cancelled", removed.side()),
            removed.side(),
            removed.id(),
        )?;
        old.add(removed)?;
        Ok(Some(message))
    }

    /// Remove this user's quote side and return its cancel message; `None`
    /// when the user has no quote here.
    pub(crate) fn submit_quote_cancel(&mut self, user: &str) -> Result<Option<CancelMessage>> {
        if user.trim().is_empty() {
            return Err(ExchangeError::InvalidData(
                "cannot cancel a quote for an empty user name".to_string(),
            ));
        }
        let Some(snapshot) = self.remove_quote(&user.trim().to_uppercase()) else {
            return Ok(None);
        };
        let message = CancelMessage::new(
            &snapshot.user,
            &snapshot.product,
            snapshot.price,
            snapshot.remaining_volume,
            &format!("Quote {}-Side Cancelled", snapshot.side),
            snapshot.side,
            &snapshot.id,
        )?;
        Ok(Some(message))
    }

    /// Cancel every entry: quotes through the quote path, orders through the
    /// order path. Works off a snapshot because each cancel mutates the map
    /// being walked.
    pub(crate) fn cancel_all(&mut self, old: &mut OldEntries) -> Result<Vec<CancelMessage>> {
        let snapshot: Vec<(bool, String)> = self
            .sorted_prices()
            .into_iter()
            .filter_map(|price| self.entries.get(&price))
            .flatten()
            .map(|t| {
                let key = if t.is_quote() {
                    t.user().to_string()
                } else {
                    t.id().to_string()
                };
                (t.is_quote(), key)
            })
            .collect();

        let mut messages = Vec::new();
        for (is_quote, key) in snapshot {
            let message = if is_quote {
                self.submit_quote_cancel(&key)?
            } else {
                self.submit_order_cancel(&key, old)?
            };
            messages.extend(message);
        }
        Ok(messages)
    }

    /// Repeatedly run the matcher while the incoming tradable still has
    /// volume, this side still has entries, and the incoming price reaches
    /// the top of this side (the market sentinel reaches any top). Fills
    /// from successive rounds are merged under the cross-round overwrite
    /// rule.
    pub(crate) fn try_trade(
        &mut self,
        incoming: &mut Tradable,
        old: &mut OldEntries,
    ) -> Result<FillMap> {
        let mut merged = FillMap::new();
        while !incoming.remaining_volume().is_zero()
            && !self.is_empty()
            && (incoming.price().is_market()
                || self
                    .top_of_book_price()
                    .is_some_and(|top| incoming.price().less_or_equal(top)))
        {
            let round = trade_processor::do_trade(self, incoming, old)?;
            trade_processor::merge_fills(&mut merged, round);
        }
        Ok(merged)
    }

    /// Drop the bucket at `price` if it has become empty.
    pub(crate) fn clear_if_empty(&mut self, price: Price) {
        if self.entries.get(&price).is_some_and(Vec::is_empty) {
            self.entries.remove(&price);
        }
    }

    pub(crate) fn bucket(&self, price: Price) -> Option<&Vec<Tradable>> {
        self.entries.get(&price)
    }

    pub(crate) fn bucket_mut(&mut self, price: Price) -> Option<&mut Vec<Tradable>> {
        self.entries.get_mut(&price)
    }

    /// Find one entry at a price by id.
    pub(crate) fn find_mut(&mut self, price: Price, id: &str) -> Option<&mut Tradable> {
        self.entries
            .get_mut(&price)?
            .iter_mut()
            .find(|t| t.id() == id)
    }

    /// Remove the listed ids from the bucket at `price`, dropping the bucket
    /// if it empties.
    pub(crate) fn remove_entries(&mut self, price: Price, ids: &[String]) {
        if let Some(bucket) = self.entries.get_mut(&price) {
            bucket.retain(|t| !ids.iter().any(|id| id == t.id()));
        }
        self.clear_if_empty(price);
    }

    /// Remove fully consumed entries at `price`, dropping the bucket if it
    /// empties.
    pub(crate) fn remove_filled(&mut self, price: Price) {
        if let Some(bucket) = self.entries.get_mut(&price) {
            bucket.retain(|t| !t.remaining_volume().is_zero());
        }
        self.clear_if_empty(price);
    }

    fn locate(&self, mut matches: impl FnMut(&Tradable) -> bool) -> Option<(Price, usize)> {
        self.entries.iter().find_map(|(price, bucket)| {
            bucket
                .iter()
                .position(&mut matches)
                .map(|index| (*price, index))
        })
    }
}
