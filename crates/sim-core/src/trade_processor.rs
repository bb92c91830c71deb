//! Price-time matching.
//!
//! One `do_trade` round consumes the resting side's top bucket in arrival
//! order against an incoming tradable. Fill messages are keyed by
//! `user + id + price`; within one round, fills under the same key sum
//! their volumes and take the latest details. Across rounds (see
//! [`crate::BookSide::try_trade`]) a repeated key *overwrites* volume and
//! details instead of summing — the downstream last-sale derivation depends
//! on exactly this asymmetry.

use crate::book_side::BookSide;
use crate::product_book::OldEntries;
use std::collections::BTreeMap;
use types::{FillMessage, Result, Tradable, Volume};

/// Accumulated fills of a matching run, keyed by `user + id + price`.
pub type FillMap = BTreeMap<String, FillMessage>;

/// Trade the incoming tradable against the resting side's top bucket.
///
/// Trade price rule: a resting market price crosses at the incoming price,
/// otherwise at the resting price. Resting entries taken out entirely are
/// archived and removed after the walk; the incoming tradable is archived
/// the moment its remaining volume reaches zero, so a fully consumed
/// aggressor is always diagnosable as too late to cancel.
pub(crate) fn do_trade(
    owner: &mut BookSide,
    incoming: &mut Tradable,
    old: &mut OldEntries,
) -> Result<FillMap> {
    let mut fills = FillMap::new();
    let Some(top_price) = owner.top_of_book_price() else {
        return Ok(fills);
    };
    let mut traded_out: Vec<String> = Vec::new();

    let Some(bucket) = owner.bucket_mut(top_price) else {
        return Ok(fills);
    };
    for resting in bucket.iter_mut() {
        if incoming.remaining_volume().is_zero() {
            break;
        }
        let trade_price = if resting.price().is_market() {
            incoming.price()
        } else {
            resting.price()
        };

        if incoming.remaining_volume() >= resting.remaining_volume() {
            // Full takeout of the resting entry.
            traded_out.push(resting.id().to_string());
            let volume = resting.remaining_volume();
            let leaving = incoming.remaining_volume() - volume;
            add_fill(
                &mut fills,
                FillMessage::new(
                    resting.user(),
                    resting.product(),
                    trade_price,
                    volume,
                    "leaving 0",
                    resting.side(),
                    resting.id(),
                )?,
            );
            add_fill(
                &mut fills,
                FillMessage::new(
                    incoming.user(),
                    incoming.product(),
                    trade_price,
                    volume,
                    &format!("leaving {leaving}"),
                    incoming.side(),
                    incoming.id(),
                )?,
            );
            incoming.set_remaining_volume(leaving)?;
            resting.set_remaining_volume(Volume::ZERO)?;
            old.add(resting.clone())?;
            if incoming.remaining_volume().is_zero() {
                old.add(incoming.clone())?;
            }
        } else {
            // Partial takeout: the incoming tradable is consumed.
            let volume = incoming.remaining_volume();
            let remainder = resting.remaining_volume() - volume;
            add_fill(
                &mut fills,
                FillMessage::new(
                    resting.user(),
                    resting.product(),
                    trade_price,
                    volume,
                    &format!("leaving {remainder}"),
                    resting.side(),
                    resting.id(),
                )?,
            );
            add_fill(
                &mut fills,
                FillMessage::new(
                    incoming.user(),
                    incoming.product(),
                    trade_price,
                    volume,
                    "leaving 0",
                    incoming.side(),
                    incoming.id(),
                )?,
            );
            incoming.set_remaining_volume(Volume::ZERO)?;
            resting.set_remaining_volume(remainder)?;
            old.add(incoming.clone())?;
            break;
        }
    }

    owner.remove_entries(top_price, &traded_out);
    Ok(fills)
}

fn fill_key(fill: &FillMessage) -> String {
    format!("{}{}{}", fill.user(), fill.id(), fill.price())
}

/// In-round aggregation: a fill for an already-seen tradable at the same
/// price sums into the stored message and takes the newest details.
fn add_fill(fills: &mut FillMap, fill: FillMessage) {
    let key = fill_key(&fill);
    if let Some(existing) = fills.get_mut(&key) {
        if existing.side() == fill.side() && existing.id() == fill.id() {
            existing.set_volume(existing.volume() + fill.volume());
            existing.set_details(fill.details());
            return;
        }
    }
    fills.insert(key, fill);
}

/// Cross-round merge: keys not yet present are added; a repeated key has
/// its volume and details **overwritten** by the newer round (not summed).
pub(crate) fn merge_fills(merged: &mut FillMap, newer: FillMap) {
    for (key, fill) in newer {
        if let Some(existing) = merged.get_mut(&key) {
            existing.set_volume(fill.volume());
            existing.set_details(fill.details());
        } else {
            merged.insert(key, fill);
        }
    }
}
