pub mod codec;
pub mod signer;

use crate::core::config::ConnectorConfig;
use crate::core::connector::VenueConnector;
use crate::core::errors::ExchangeError;
use crate::core::kernel::{CodeEnvelope, RestClientBuilder, RestClientConfig};
use std::sync::Arc;

pub use codec::BitmartCodec;
pub use signer::{auth_scheme, login_frame};

pub const NAME: &str = "bitmart";
pub const REST_URL: &str = "https://api-cloud.bitmart.com";
pub const WS_URL: &str = "wss://ws-manager-compress.bitmart.com/api?protocol=1.1";
pub const WS_PRIVATE_URL: &str = "wss://ws-manager-compress.bitmart.com/user?protocol=1.1";

pub type BitmartConnector = VenueConnector<BitmartCodec>;

/// `{"code": 1000, "message": "OK", "data": {...}}`
pub fn envelope() -> CodeEnvelope {
    CodeEnvelope::with_success_code("code", "message", 1000).with_data_field("data")
}

/// Create a Bitmart connector
///
/// The memo configured for the API key goes in the credentials' passphrase
/// slot. Bitmart has no public testnet.
pub fn create_bitmart_connector(config: ConnectorConfig) -> Result<BitmartConnector, ExchangeError> {
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
        config.resolve_ws_url(WS_URL, WS_URL),
        config.ws,
        BitmartCodec::new(),
    ))
}
