//! Exchange simulation - wiring binary.
//!
//! Builds the component graph (publishers -> product service -> command
//! gateway -> users) and drives one deterministic session through the whole
//! market lifecycle so every event path is visible in the logs. Random
//! trading drivers and display front-ends live outside this crate; users
//! here log what they observe.

mod config;

use client::{TradingUser, UserCommandService};
use publishers::PublisherSet;
use sim_core::ProductService;
use std::sync::Arc;
use types::{ExchangeError, Price, Result, Volume};

pub use config::ExchangeConfig;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = ExchangeConfig::default();
    if let Err(error) = run(&config) {
        tracing::error!(%error, "session failed");
        std::process::exit(1);
    }
}

fn run(config: &ExchangeConfig) -> Result<()> {
    let publishers = Arc::new(PublisherSet::new());
    let product_service = Arc::new(ProductService::new(publishers.clone()));
    let gateway = Arc::new(UserCommandService::new(product_service.clone(), publishers));

    for symbol in &config.symbols {
        product_service.create_product(symbol)?;
    }
    let symbol = config
        .symbols
        .first()
        .ok_or_else(|| ExchangeError::InvalidData("no symbols configured".to_string()))?;

    let maker = TradingUser::new(&config.maker, gateway.clone())?;
    let taker = TradingUser::new(&config.taker, gateway.clone())?;
    for user in [&maker, &taker] {
        user.connect()?;
        for product in &config.symbols {
            user.subscribe_messages(product)?;
            user.subscribe_last_sale(product)?;
            user.subscribe_ticker(product)?;
            user.subscribe_current_market(product)?;
        }
    }

    // Preopen: the maker quotes, the taker parks a limit buy inside nothing.
    product_service.set_market_state("PREOPEN")?;
    maker.submit_quote(
        symbol,
        Price::parse("9.95")?,
        Volume(config.quote_size),
        Price::parse("10.05")?,
        Volume(config.quote_size),
    )?;
    let resting_buy = taker.submit_order(symbol, Price::parse("10.00")?, Volume(50), "BUY")?;

    // Open: nothing crosses yet, then the taker lifts the maker's offer,
    // pulls the parked buy, and hits the bid with a market sell.
    product_service.set_market_state("OPEN")?;
    taker.submit_order(
        symbol,
        Price::parse("10.05")?,
        Volume(config.order_size),
        "BUY",
    )?;
    taker.submit_order_cancel(symbol, "BUY", &resting_buy)?;
    taker.submit_order(symbol, Price::MARKET, Volume(config.order_size), "SELL")?;

    // The maker refreshes the quote.
    maker.submit_quote(
        symbol,
        Price::parse("9.90")?,
        Volume(config.quote_size),
        Price::parse("10.10")?,
        Volume(config.quote_size),
    )?;

    let [buy_rows, sell_rows] = taker.get_book_depth(symbol)?;
    tracing::info!(symbol = %symbol, ?buy_rows, ?sell_rows, "book depth before close");

    product_service.set_market_state("CLOSED")?;

    for user in [&maker, &taker] {
        let net_account_value = user.net_account_value()?;
        tracing::info!(
            user = user.name(),
            holdings = ?user.holdings(),
            account_costs = %user.account_costs(),
            %net_account_value,
            "final position"
        );
    }
    Ok(())
}
