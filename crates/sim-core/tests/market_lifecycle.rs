//! Lifecycle tests for the product service: books filled during PREOPEN,
//! crossed at OPEN, drained at CLOSED, with the event stream observed
//! through real publisher subscriptions.

use parking_lot::Mutex;
use publishers::{PublisherSet, Subscriber};
use sim_core::ProductService;
use std::sync::Arc;
use types::{
    CancelMessage, ExchangeError, FillMessage, Price, Quote, Side, Tradable, Volume,
};

#[derive(Default)]
struct Recorder {
    name: String,
    fills: Mutex<Vec<FillMessage>>,
    cancels: Mutex<Vec<CancelMessage>>,
    last_sales: Mutex<Vec<(Price, Volume)>>,
    current_markets: Mutex<Vec<(Price, Volume, Price, Volume)>>,
    market_messages: Mutex<Vec<String>>,
}

impl Recorder {
    fn shared(name: &str) -> Arc<Self> {
        Arc::new(Self {
            name: name.to_string(),
            ..Self::default()
        })
    }
}

impl Subscriber for Recorder {
    fn user_name(&self) -> &str {
        &self.name
    }

    fn accept_last_sale(&self, _product: &str, price: Price, volume: Volume) {
        self.last_sales.lock().push((price, volume));
    }

    fn accept_fill(&self, fill: &FillMessage) {
        self.fills.lock().push(fill.clone());
    }

    fn accept_cancel(&self, cancel: &CancelMessage) {
        self.cancels.lock().push(cancel.clone());
    }

    fn accept_market_message(&self, message: &str) {
        self.market_messages.lock().push(message.to_string());
    }

    fn accept_ticker(&self, _product: &str, _price: Price, _direction: char) {}

    fn accept_current_market(
        &self,
        _product: &str,
        buy_price: Price,
        buy_volume: Volume,
        sell_price: Price,
        sell_volume: Volume,
    ) {
        self.current_markets
            .lock()
            .push((buy_price, buy_volume, sell_price, sell_volume));
    }
}

fn service_with(symbol: &str) -> (Arc<PublisherSet>, ProductService) {
    let publishers = Arc::new(PublisherSet::new());
    let service = ProductService::new(publishers.clone());
    service.create_product(symbol).unwrap();
    (publishers, service)
}

fn order(user: &str, price: &str, volume: u32, side: Side) -> Tradable {
    Tradable::order(user, "IBM", Price::parse(price).unwrap(), Volume(volume), side).unwrap()
}

#[test]
fn open_crosses_matched_tops_in_arrival_order() {
    let (publishers, service) = service_with("IBM");
    let cal = Recorder::shared("CAL");
    publishers.message.subscribe(cal.clone(), "IBM").unwrap();
    publishers.last_sale.subscribe(cal.clone(), "IBM").unwrap();

    service.set_market_state("PREOPEN").unwrap();
    service
        .submit_order(order("ANN", "10.00", 30, Side::Sell))
        .unwrap();
    service
        .submit_order(order("BOB", "10.00", 20, Side::Sell))
        .unwrap();
    service
        .submit_order(order("CAL", "10.00", 40, Side::Buy))
        .unwrap();
    service.set_market_state("OPEN").unwrap();

    // CAL's 40 sweep ANN's 30 first (arrival order), then 10 of BOB's 20.
    let cal_fills = cal.fills.lock().clone();
    assert_eq!(cal_fills.len(), 1);
    assert_eq!(cal_fills[0].volume(), Volume(40));
    assert_eq!(cal_fills[0].price(), Price::parse("10.00").unwrap());
    assert_eq!(cal_fills[0].details(), "leaving 0");

    let sales = cal.last_sales.lock().clone();
    assert_eq!(sales.len(), 1);
    assert_eq!(sales[0].0, Price::parse("10.00").unwrap());

    let depth = service.book_depth("IBM").unwrap();
    assert_eq!(depth[0], vec!["<Empty>".to_string()]);
    assert_eq!(depth[1], vec!["$10.00 x 10".to_string()]);
}

#[test]
fn open_handles_unreachable_cross_without_trading() {
    let (publishers, service) = service_with("IBM");
    let cal = Recorder::shared("CAL");
    publishers.message.subscribe(cal.clone(), "IBM").unwrap();

    service.set_market_state("PREOPEN").unwrap();
    service
        .submit_order(order("ANN", "10.00", 30, Side::Sell))
        .unwrap();
    // A buy resting above the sell top never reaches it under the engine's
    // crossing relation; opening must leave the book intact.
    service
        .submit_order(order("CAL", "10.10", 30, Side::Buy))
        .unwrap();
    service.set_market_state("OPEN").unwrap();

    assert!(cal.fills.lock().is_empty());
    let depth = service.book_depth("IBM").unwrap();
    assert_eq!(depth[0], vec!["$10.10 x 30".to_string()]);
    assert_eq!(depth[1], vec!["$10.00 x 30".to_string()]);
}

#[test]
fn preopen_quotes_cross_at_open() {
    let (publishers, service) = service_with("IBM");
    let mia = Recorder::shared("MIA");
    let tom = Recorder::shared("TOM");
    publishers.message.subscribe(mia.clone(), "IBM").unwrap();
    publishers.message.subscribe(tom.clone(), "IBM").unwrap();

    service.set_market_state("PREOPEN").unwrap();
    let quote = Quote::new(
        "MIA",
        "IBM",
        Price::parse("10.00").unwrap(),
        Volume(25),
        Price::parse("10.10").unwrap(),
        Volume(40),
    )
    .unwrap();
    service.submit_quote(&quote).unwrap();
    service
        .submit_order(order("TOM", "10.00", 25, Side::Sell))
        .unwrap();
    service.set_market_state("OPEN").unwrap();

    // MIA's bid absorbs TOM's sell at the bid price.
    let mia_fills = mia.fills.lock().clone();
    assert_eq!(mia_fills.len(), 1);
    assert_eq!(mia_fills[0].volume(), Volume(25));
    assert_eq!(mia_fills[0].price(), Price::parse("10.00").unwrap());
    assert_eq!(mia_fills[0].side(), Side::Buy);
    assert_eq!(mia_fills[0].details(), "leaving 0");

    let tom_fills = tom.fills.lock().clone();
    assert_eq!(tom_fills.len(), 1);
    assert_eq!(tom_fills[0].details(), "leaving 0");

    // Only MIA's ask is still working.
    let working = service.orders_with_remaining_qty("MIA", "IBM").unwrap();
    assert_eq!(working.len(), 1);
    assert_eq!(working[0].side, Side::Sell);
    assert_eq!(working[0].remaining_volume, Volume(40));
    assert!(working[0].is_quote);

    let depth = service.book_depth("IBM").unwrap();
    assert_eq!(depth[0], vec!["<Empty>".to_string()]);
    assert_eq!(depth[1], vec!["$10.10 x 40".to_string()]);
}

#[test]
fn cancelled_order_diagnosed_too_late_on_second_cancel() {
    let (publishers, service) = service_with("IBM");
    let ann = Recorder::shared("ANN");
    publishers.message.subscribe(ann.clone(), "IBM").unwrap();

    service.set_market_state("PREOPEN").unwrap();
    let resting = order("ANN", "10.00", 30, Side::Buy);
    let id = service.submit_order(resting).unwrap();

    service.submit_order_cancel("IBM", Side::Buy, &id).unwrap();
    // The order is archived now; a second cancel finds it there.
    service.submit_order_cancel("IBM", Side::Buy, &id).unwrap();

    let cancels = ann.cancels.lock().clone();
    assert_eq!(cancels.len(), 2);
    assert_eq!(cancels[0].details(), "BUY Order Cancelled");
    assert_eq!(cancels[0].volume(), Volume(30));
    assert_eq!(cancels[1].details(), "Too late to cancel.");
    assert_eq!(cancels[1].volume(), Volume::ZERO);
}

#[test]
fn current_market_stream_across_lifecycle() {
    let (publishers, service) = service_with("IBM");
    let wyn = Recorder::shared("WYN");
    publishers
        .current_market
        .subscribe(wyn.clone(), "IBM")
        .unwrap();

    service.set_market_state("PREOPEN").unwrap();
    service
        .submit_order(order("ANN", "10.00", 30, Side::Buy))
        .unwrap();
    // Same price again: the volume change still republishes.
    service
        .submit_order(order("ANN", "10.00", 30, Side::Buy))
        .unwrap();

    let markets = wyn.current_markets.lock().clone();
    assert_eq!(
        markets,
        vec![
            (
                Price::parse("10.00").unwrap(),
                Volume(30),
                Price::ZERO,
                Volume::ZERO
            ),
            (
                Price::parse("10.00").unwrap(),
                Volume(60),
                Price::ZERO,
                Volume::ZERO
            ),
        ]
    );

    service.set_market_state("OPEN").unwrap();
    service.set_market_state("CLOSED").unwrap();
    let (buy_top, buy_vol, sell_top, sell_vol) =
        *wyn.current_markets.lock().last().expect("close update");
    assert_eq!(
        (buy_top, buy_vol, sell_top, sell_vol),
        (Price::ZERO, Volume::ZERO, Price::ZERO, Volume::ZERO)
    );
}

#[test]
fn market_messages_announce_every_transition() {
    let (publishers, service) = service_with("IBM");
    let wyn = Recorder::shared("WYN");
    publishers.message.subscribe(wyn.clone(), "IBM").unwrap();

    service.set_market_state("PREOPEN").unwrap();
    service.set_market_state("OPEN").unwrap();
    service.set_market_state("CLOSED").unwrap();

    assert_eq!(
        wyn.market_messages.lock().clone(),
        vec!["[PREOPEN]", "[OPEN]", "[CLOSED]"]
    );
}

#[test]
fn cancel_after_close_is_rejected() {
    let (_publishers, service) = service_with("IBM");
    service.set_market_state("PREOPEN").unwrap();
    let id = service
        .submit_order(order("ANN", "10.00", 30, Side::Buy))
        .unwrap();
    service.set_market_state("OPEN").unwrap();
    service.set_market_state("CLOSED").unwrap();

    assert!(matches!(
        service.submit_order_cancel("IBM", Side::Buy, &id).unwrap_err(),
        ExchangeError::InvalidMarketState(_)
    ));
}
