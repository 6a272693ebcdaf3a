/// Venuelink kernel - venue-agnostic transport layer
///
/// The kernel holds only transport logic and the seams venues plug into.
/// Nothing in here knows about a particular exchange.
///
/// # Architecture
///
/// ## Call pipeline
/// - `SigningStrategy`: pure `(secret, canonical bytes) -> signature`
/// - `Params`: ordered request parameters with query/JSON encoding
/// - `RequestBuilder`: method + route + params + `AuthLevel` -> `RequestDescriptor`
/// - `RestClient` / `ReqwestRest`: executes a descriptor, decodes through a `ResponseEnvelope`
///
/// ## Streaming transport
/// - `Connection`: one socket with a shared writer lock and read/write deadlines
/// - `SubscriptionRegistry`: subscribe frames kept for replay
/// - `Dispatcher`: routing peek and bounded per-topic channels
/// - `ResilientStream`: the reconnect state machine tying the three together
///
/// ## Venue seams
/// - `AuthScheme` + `Canonicalizer`: how a venue signs
/// - `ResponseEnvelope`: how a venue reports success
/// - `WsCodec`: how a venue frames subscriptions and routes inbound frames
///
/// # Example
/// ```rust,no_run
/// use venuelink::core::config::Credentials;
/// use venuelink::core::kernel::*;
/// use venuelink::core::types::AuthLevel;
/// use reqwest::Method;
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let credentials = Arc::new(Credentials::new("key".into(), "secret".into(), None));
/// let scheme = AuthScheme::new(
///     Arc::new(HmacSigner::sha256_hex()),
///     Arc::new(|req: &CanonicalRequest, _: &Credentials| req.query.as_bytes().to_vec()),
///     Placement::header("X-MBX-APIKEY"),
///     Placement::query("signature"),
/// )
/// .with_timestamp_param("timestamp");
///
/// let rest = RestClientBuilder::new(RestClientConfig::new(
///     "https://api.binance.com".to_string(),
///     "binance".to_string(),
/// ))
/// .with_credentials(credentials)
/// .with_auth_scheme(scheme)
/// .build()?;
///
/// let params = Params::new().with("symbol", "BTCUSDT")?;
/// let orders: serde_json::Value = rest
///     .call(Method::GET, "/api/v3/openOrders", params, AuthLevel::Signed)
///     .await?;
/// # Ok(())
/// # }
/// ```
pub mod backoff;
pub mod codec;
pub mod connection;
pub mod dispatcher;
pub mod params;
pub mod registry;
pub mod request;
pub mod rest;
pub mod signer;
pub mod ws;

// Re-export key types for convenience
pub use backoff::Backoff;
pub use codec::{JsonRouteCodec, JsonRouter, KeyPath, Route, WsCodec};
pub use connection::{Connection, Heartbeat, WsConfig};
pub use dispatcher::{Dispatched, Dispatcher};
pub use params::Params;
pub use registry::{SubscriptionEntry, SubscriptionRegistry};
pub use request::{
    AuthScheme, CanonicalRequest, Canonicalizer, HeaderInjector, Placement, RequestBuilder,
    RequestDescriptor,
};
pub use rest::{
    decode_response, CodeEnvelope, ReqwestRest, ResponseEnvelope, RestClient, RestClientBuilder,
    RestClientConfig, StatusEnvelope, SuccessPredicate,
};
pub use signer::{HmacAlgorithm, HmacSigner, SignatureEncoding, SigningStrategy};
pub use ws::ResilientStream;
