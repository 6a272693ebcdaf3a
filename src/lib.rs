pub mod core;
pub mod exchanges;
pub mod utils;

pub use crate::core::{
    config::{ConnectorConfig, Credentials},
    connector::VenueConnector,
    errors::ExchangeError,
    types::*,
};
pub use exchanges::binance::BinanceConnector;
pub use exchanges::bitmart::BitmartConnector;
pub use exchanges::bybit::BybitConnector;
pub use exchanges::gate::GateConnector;
pub use exchanges::mexc::MexcConnector;
pub use exchanges::okx::OkxConnector;
pub use utils::exchange_factory::{AnyConnector, ExchangeFactory, Venue};
