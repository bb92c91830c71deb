//! The two-sided book for one product.

use crate::book_side::BookSide;
use crate::trade_processor::FillMap;
use parking_lot::Mutex;
use publishers::PublisherSet;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use types::{
    CancelMessage, ExchangeError, FillMessage, MarketDataSnapshot, MarketState, Price, Quote,
    Result, Side, Tradable, TradableSnapshot,
};

// =============================================================================
// Archive
// =============================================================================

/// Fully consumed or cancelled tradables, bucketed by price. Used to tell a
/// cancel that arrived too late apart from one for an order that never
/// existed.
pub(crate) struct OldEntries {
    entries: HashMap<Price, Vec<Tradable>>,
}

impl OldEntries {
    pub(crate) fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Retire a tradable: stash its remaining volume, zero the remaining,
    /// then mark the stashed amount cancelled. The order of the two updates
    /// matters — swapping them trips the `remaining + cancelled <= original`
    /// check.
    pub(crate) fn add(&mut self, mut trd: Tradable) -> Result<()> {
        let old_remaining = trd.remaining_volume();
        trd.set_remaining_volume(types::Volume::ZERO)?;
        trd.set_cancelled_volume(old_remaining)?;
        self.entries.entry(trd.price()).or_default().push(trd);
        Ok(())
    }

    pub(crate) fn find(&self, order_id: &str) -> Option<&Tradable> {
        self.entries
            .values()
            .flatten()
            .find(|t| t.id() == order_id)
    }
}

// =============================================================================
// ProductBook
// =============================================================================

struct BookState {
    buy: BookSide,
    sell: BookSide,
    quote_users: HashSet<String>,
    old_entries: OldEntries,
    last_market_fingerprint: String,
}

/// Owns the BUY and SELL sides for one symbol, routes submissions and
/// cancellations, crosses the book when the market opens, and keeps the
/// archive of retired interest.
///
/// All public operations serialize under the book's lock; publisher calls
/// happen while it is held (lock order: service -> book -> publisher ->
/// subscriber).
pub struct ProductBook {
    symbol: String,
    publishers: Arc<PublisherSet>,
    state: Mutex<BookState>,
}

impl ProductBook {
    pub fn new(symbol: &str, publishers: Arc<PublisherSet>) -> Result<Self> {
        let trimmed = symbol.trim();
        if trimmed.is_empty() {
            return Err(ExchangeError::InvalidData(
                "a product book needs a non-empty symbol".to_string(),
            ));
        }
        Ok(Self {
            symbol: trimmed.to_uppercase(),
            publishers,
            state: Mutex::new(BookState {
                buy: BookSide::new(Side::Buy),
                sell: BookSide::new(Side::Sell),
                quote_users: HashSet::new(),
                old_entries: OldEntries::new(),
                last_market_fingerprint: String::new(),
            }),
        })
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Snapshots of this user's live interest with remaining volume, both
    /// sides.
    pub fn orders_with_remaining_qty(&self, user: &str) -> Result<Vec<TradableSnapshot>> {
        let state = self.state.lock();
        let mut results = state.buy.orders_with_remaining_qty(user)?;
        results.extend(state.sell.orders_with_remaining_qty(user)?);
        Ok(results)
    }

    /// Depth rows for both sides: `[buy_rows, sell_rows]`.
    pub fn book_depth(&self) -> [Vec<String>; 2] {
        let state = self.state.lock();
        [state.buy.book_depth(), state.sell.book_depth()]
    }

    /// Current top-of-book for both sides; empty sides read as `$0.00`.
    pub fn market_data(&self) -> MarketDataSnapshot {
        let state = self.state.lock();
        MarketDataSnapshot::new(
            &self.symbol,
            state.buy.top_of_book_price(),
            state.buy.top_of_book_volume(),
            state.sell.top_of_book_price(),
            state.sell.top_of_book_volume(),
        )
    }

    /// Submit an order. In PREOPEN it books quietly; otherwise it trades
    /// against the opposite side first, and a market-priced remainder is
    /// cancelled rather than booked.
    pub fn add_order(&self, market_state: MarketState, order: Tradable) -> Result<()> {
        if order.is_quote() {
            return Err(ExchangeError::InvalidData(
                "expected an order, got a quote side".to_string(),
            ));
        }
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let side = order.side();
        self.add_to_side(state, market_state, side, order)?;
        self.update_current_market(state);
        Ok(())
    }

    /// Submit a quote. Replaces any live quote of the same user on both
    /// sides, then books each quote side through the order path.
    pub fn add_quote(&self, market_state: MarketState, quote: &Quote) -> Result<()> {
        let buy = quote.side(Side::Buy).clone();
        let sell = quote.side(Side::Sell).clone();
        if !sell.price().greater_than(buy.price()) {
            return Err(ExchangeError::InvalidData(format!(
                "quote sell price {} must be greater than buy price {}",
                sell.price(),
                buy.price()
            )));
        }
        if !buy.price().greater_than(Price::ZERO) || !sell.price().greater_than(Price::ZERO) {
            return Err(ExchangeError::InvalidData(
                "quote prices must be greater than zero".to_string(),
            ));
        }

        let mut guard = self.state.lock();
        let state = &mut *guard;
        if state.quote_users.contains(quote.user()) {
            state.buy.remove_quote(quote.user());
            state.sell.remove_quote(quote.user());
            self.update_current_market(state);
        }
        self.add_to_side(state, market_state, Side::Buy, buy)?;
        self.add_to_side(state, market_state, Side::Sell, sell)?;
        state.quote_users.insert(quote.user().to_string());
        self.update_current_market(state);
        Ok(())
    }

    /// Cancel a live order; if it is not on the side, diagnose a too-late
    /// cancel from the archive, else fail with `OrderNotFound`.
    pub fn cancel_order(&self, side: Side, order_id: &str) -> Result<()> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let cancelled = match side {
            Side::Buy => state.buy.submit_order_cancel(order_id, &mut state.old_entries)?,
            Side::Sell => state
                .sell
                .submit_order_cancel(order_id, &mut state.old_entries)?,
        };
        match cancelled {
            Some(message) => self.publishers.message.publish_cancel(&message),
            None => self.check_too_late_to_cancel(state, order_id)?,
        }
        self.update_current_market(state);
        Ok(())
    }

    /// Cancel a user's quote on both sides; silently ignores sides without
    /// a quote.
    pub fn cancel_quote(&self, user: &str) -> Result<()> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        for message in [
            state.buy.submit_quote_cancel(user)?,
            state.sell.submit_quote_cancel(user)?,
        ]
        .into_iter()
        .flatten()
        {
            self.publishers.message.publish_cancel(&message);
        }
        self.update_current_market(state);
        Ok(())
    }

    /// Cross resting interest while the book is locked or crossed: trade the
    /// BUY top bucket against the SELL side, round after round, until no
    /// crossing remains or a side empties.
    pub fn open_market(&self) -> Result<()> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        loop {
            let (Some(buy_top), Some(sell_top)) =
                (state.buy.top_of_book_price(), state.sell.top_of_book_price())
            else {
                break;
            };
            if !(buy_top.greater_or_equal(sell_top)
                || buy_top.is_market()
                || sell_top.is_market())
            {
                break;
            }

            let ids: Vec<String> = state
                .buy
                .bucket(buy_top)
                .map(|bucket| bucket.iter().map(|t| t.id().to_string()).collect())
                .unwrap_or_default();
            let mut last_round = FillMap::new();
            for id in &ids {
                let Some(entry) = state.buy.find_mut(buy_top, id) else {
                    continue;
                };
                let fills = state.sell.try_trade(entry, &mut state.old_entries)?;
                for fill in fills.values() {
                    self.publishers.message.publish_fill(fill);
                }
                if !fills.is_empty() {
                    last_round = fills;
                }
            }
            if last_round.is_empty() {
                // The tops nominally cross but nothing can execute (a buy
                // resting above the sell top never reaches it); stop rather
                // than spin on an unchanged book.
                break;
            }
            state.buy.remove_filled(buy_top);

            self.update_current_market(state);
            if let Some(best) = lowest_priced_fill(&last_round) {
                self.publishers
                    .last_sale
                    .publish_last_sale(&self.symbol, best.price(), best.volume());
            }
        }
        Ok(())
    }

    /// Cancel everything on both sides and refresh the current market.
    pub fn close_market(&self) -> Result<()> {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        let mut messages = state.buy.cancel_all(&mut state.old_entries)?;
        messages.extend(state.sell.cancel_all(&mut state.old_entries)?);
        for message in &messages {
            self.publishers.message.publish_cancel(message);
        }
        self.update_current_market(state);
        Ok(())
    }

    /// Book (PREOPEN) or trade-then-book one tradable on its side.
    fn add_to_side(
        &self,
        state: &mut BookState,
        market_state: MarketState,
        side: Side,
        mut trd: Tradable,
    ) -> Result<()> {
        if market_state == MarketState::Preopen {
            side_mut(state, side).add_to_book(trd);
            return Ok(());
        }

        let fills = match side {
            Side::Buy => state.sell.try_trade(&mut trd, &mut state.old_entries)?,
            Side::Sell => state.buy.try_trade(&mut trd, &mut state.old_entries)?,
        };
        for fill in fills.values() {
            self.publishers.message.publish_fill(fill);
        }
        if !fills.is_empty() {
            self.update_current_market(state);
            let executed = trd.original_volume() - trd.remaining_volume();
            if let Some(best) = lowest_priced_fill(&fills) {
                self.publishers
                    .last_sale
                    .publish_last_sale(&self.symbol, best.price(), executed);
            }
        }

        if !trd.remaining_volume().is_zero() {
            if trd.price().is_market() {
                let message = CancelMessage::new(
                    trd.user(),
                    trd.product(),
                    trd.price(),
                    trd.remaining_volume(),
                    "Cancelled",
                    trd.side(),
                    trd.id(),
                )?;
                self.publishers.message.publish_cancel(&message);
            } else {
                side_mut(state, side).add_to_book(trd);
            }
        }
        Ok(())
    }

    /// Publish a "Too late to cancel." for an archived order, or fail with
    /// `OrderNotFound` when the archive has never seen the id either.
    fn check_too_late_to_cancel(&self, state: &BookState, order_id: &str) -> Result<()> {
        let Some(entry) = state.old_entries.find(order_id) else {
            return Err(ExchangeError::OrderNotFound(order_id.to_string()));
        };
        let message = CancelMessage::new(
            entry.user(),
            entry.product(),
            entry.price(),
            entry.remaining_volume(),
            "Too late to cancel.",
            entry.side(),
            entry.id(),
        )?;
        self.publishers.message.publish_cancel(&message);
        Ok(())
    }

    /// Publish the current market unless its fingerprint matches the last
    /// published one.
    fn update_current_market(&self, state: &mut BookState) {
        let md = MarketDataSnapshot::new(
            &self.symbol,
            state.buy.top_of_book_price(),
            state.buy.top_of_book_volume(),
            state.sell.top_of_book_price(),
            state.sell.top_of_book_volume(),
        );
        let fingerprint = format!(
            "{}{}{}{}",
            md.buy_price, md.buy_volume, md.sell_price, md.sell_volume
        );
        if state.last_market_fingerprint != fingerprint {
            self.publishers.current_market.publish_current_market(&md);
            state.last_market_fingerprint = fingerprint;
        }
    }
}

fn side_mut(state: &mut BookState, side: Side) -> &mut BookSide {
    match side {
        Side::Buy => &mut state.buy,
        Side::Sell => &mut state.sell,
    }
}

/// The fill with the lowest price under the cents total order; its price
/// (and, on the open-market path, its volume) is reported as the last sale.
fn lowest_priced_fill(fills: &FillMap) -> Option<&FillMessage> {
    fills.values().min_by(|a, b| a.price().cmp_value(b.price()))
}
