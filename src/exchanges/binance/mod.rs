pub mod codec;
pub mod signer;

use crate::core::config::ConnectorConfig;
use crate::core::connector::VenueConnector;
use crate::core::errors::ExchangeError;
use crate::core::kernel::{RestClientBuilder, RestClientConfig, StatusEnvelope};
use crate::core::types::{BodyFormat, QueryOrder};
use std::sync::Arc;

pub use codec::BinanceCodec;
pub use signer::auth_scheme;

pub const NAME: &str = "binance";
pub const REST_URL: &str = "https://api.binance.com";
pub const REST_TESTNET_URL: &str = "https://testnet.binance.vision";
pub const WS_URL: &str = "wss://stream.binance.com:9443/stream";
pub const WS_TESTNET_URL: &str = "wss://testnet.binance.vision/stream";

pub type BinanceConnector = VenueConnector<BinanceCodec>;

/// Plain HTTP status; failures carry `{"code": -1121, "msg": "..."}`
pub fn envelope() -> StatusEnvelope {
    StatusEnvelope::new("code", "msg")
}

/// Create a Binance connector
///
/// Parameters of every method travel in the query string, in the order the
/// caller inserted them.
pub fn create_binance_connector(config: ConnectorConfig) -> Result<BinanceConnector, ExchangeError> {
    let rest_config = RestClientConfig::new(
        config.resolve_base_url(REST_URL, REST_TESTNET_URL),
        NAME.to_string(),
    )
    .with_query_order(QueryOrder::Insertion)
    .with_body_format(BodyFormat::Query);

    let rest = RestClientBuilder::new(rest_config)
        .with_credentials(Arc::clone(&config.credentials))
        .with_auth_scheme(auth_scheme())
        .with_envelope(Arc::new(envelope()))
        .build()?;

    Ok(VenueConnector::new(
        NAME,
        rest,
        config.resolve_ws_url(WS_URL, WS_TESTNET_URL),
        config.ws,
        BinanceCodec::new(),
    ))
}
