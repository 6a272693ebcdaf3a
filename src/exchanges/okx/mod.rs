pub mod codec;
pub mod signer;

use crate::core::config::ConnectorConfig;
use crate::core::connector::VenueConnector;
use crate::core::errors::ExchangeError;
use crate::core::kernel::{CodeEnvelope, RestClientBuilder, RestClientConfig};
use std::sync::Arc;

pub use codec::OkxCodec;
pub use signer::{auth_scheme, login_frame};

pub const NAME: &str = "okx";
pub const REST_URL: &str = "https://www.okx.com";
pub const WS_URL: &str = "wss://ws.okx.com:8443/ws/v5/public";
pub const WS_TESTNET_URL: &str = "wss://wspap.okx.com:8443/ws/v5/public";
pub const WS_PRIVATE_URL: &str = "wss://ws.okx.com:8443/ws/v5/private";

pub type OkxConnector = VenueConnector<OkxCodec>;

/// `{"code": "0", "msg": "", "data": [...]}`
pub fn envelope() -> CodeEnvelope {
    CodeEnvelope::with_success_code("code", "msg", 0).with_data_field("data")
}

/// Create an OKX connector
///
/// OKX serves demo trading from the production REST host; only the stream
/// host changes with `testnet`.
pub fn create_okx_connector(config: ConnectorConfig) -> Result<OkxConnector, ExchangeError> {
    let rest_config = RestClientConfig::new(
        config.resolve_base_url(REST_URL, REST_URL),
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
        OkxCodec::new(),
    ))
}
