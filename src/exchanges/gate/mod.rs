pub mod codec;
pub mod signer;

use crate::core::config::ConnectorConfig;
use crate::core::connector::VenueConnector;
use crate::core::errors::ExchangeError;
use crate::core::kernel::{RestClientBuilder, RestClientConfig, StatusEnvelope};
use std::sync::Arc;

pub use codec::GateCodec;
pub use signer::{auth_scheme, private_subscription};

pub const NAME: &str = "gate";
pub const REST_URL: &str = "https://api.gateio.ws";
pub const REST_TESTNET_URL: &str = "https://fx-api-testnet.gateio.ws";
pub const WS_URL: &str = "wss://api.gateio.ws/ws/v4/";
/// Routes are absolute, this prefix included, because it is part of the signed path
pub const API_PREFIX: &str = "/api/v4";

pub type GateConnector = VenueConnector<GateCodec>;

/// Plain HTTP status; failures carry `{"label": "INVALID_KEY", "message": "..."}`
pub fn envelope() -> StatusEnvelope {
    StatusEnvelope::new("label", "message")
}

pub fn create_gate_connector(config: ConnectorConfig) -> Result<GateConnector, ExchangeError> {
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
        config.resolve_ws_url(WS_URL, WS_URL),
        config.ws,
        GateCodec::new(),
    ))
}
