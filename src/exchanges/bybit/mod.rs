pub mod codec;
pub mod signer;

use crate::core::config::ConnectorConfig;
use crate::core::connector::VenueConnector;
use crate::core::errors::ExchangeError;
use crate::core::kernel::{CodeEnvelope, RestClientBuilder, RestClientConfig};
use std::sync::Arc;

pub use codec::BybitCodec;
pub use signer::{auth_scheme, login_frame};

pub const NAME: &str = "bybit";
pub const REST_URL: &str = "https://api.bybit.com";
pub const REST_TESTNET_URL: &str = "https://api-testnet.bybit.com";
pub const WS_URL: &str = "wss://stream.bybit.com/v5/public/spot";
pub const WS_TESTNET_URL: &str = "wss://stream-testnet.bybit.com/v5/public/spot";
pub const WS_PRIVATE_URL: &str = "wss://stream.bybit.com/v5/private";

pub type BybitConnector = VenueConnector<BybitCodec>;

/// `{"retCode": 0, "retMsg": "OK", "result": {...}}`
pub fn envelope() -> CodeEnvelope {
    CodeEnvelope::with_success_code("retCode", "retMsg", 0).with_data_field("result")
}

pub fn create_bybit_connector(config: ConnectorConfig) -> Result<BybitConnector, ExchangeError> {
    let rest_config = RestClientConfig::new(
        config.resolve_base_url(REST_URL, REST_TESTNET_URL),
        NAME.to_string(),
    );

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
        BybitCodec::new(),
    ))
}
