pub mod codec;
pub mod signer;

use crate::core::config::ConnectorConfig;
use crate::core::connector::VenueConnector;
use crate::core::errors::ExchangeError;
use crate::core::kernel::{RestClientBuilder, RestClientConfig, StatusEnvelope};
use crate::core::types::{BodyFormat, QueryOrder};
use std::sync::Arc;

pub use codec::MexcCodec;
pub use signer::auth_scheme;

pub const NAME: &str = "mexc";
pub const REST_URL: &str = "https://api.mexc.com";
pub const WS_URL: &str = "wss://wbs.mexc.com/ws";

pub type MexcConnector = VenueConnector<MexcCodec>;

/// Plain HTTP status; failures carry `{"code": 700002, "msg": "..."}`
pub fn envelope() -> StatusEnvelope {
    StatusEnvelope::new("code", "msg")
}

/// Create a MEXC connector
///
/// Parameters travel in the query string sorted by key. MEXC has no public
/// testnet, so the sandbox flag keeps the production endpoints.
pub fn create_mexc_connector(config: ConnectorConfig) -> Result<MexcConnector, ExchangeError> {
    let rest_config = RestClientConfig::new(
        config.resolve_base_url(REST_URL, REST_URL),
        NAME.to_string(),
    )
    .with_query_order(QueryOrder::Lexicographic)
    .with_body_format(BodyFormat::Query);

    let rest = RestClientBuilder::new(rest_config)
        .with_credentials(Arc::clone(&config.credentials))
        .with_auth_scheme(auth_scheme())
        .with_envelope(Arc::new(envelope()))
        .build()?;

    Ok(VenueConnector::new(
        NAME,
        rest,
        config.resolve_ws_url(WS_URL, WS_URL),
        config.ws,
        MexcCodec::new(),
    ))
}
