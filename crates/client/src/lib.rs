//! Client layer of the exchange: session gateway, the default user
//! observer, and per-user position accounting.

mod command_service;
mod order_record;
mod position;
mod trading_user;

pub use command_service::UserCommandService;
pub use order_record::OrderRecord;
pub use position::Position;
pub use trading_user::TradingUser;
