use crate::core::errors::ExchangeError;
use crate::core::kernel::{Params, ReqwestRest, ResilientStream, RestClient, WsCodec, WsConfig};
use crate::core::types::AuthLevel;
use reqwest::Method;
use serde::de::DeserializeOwned;
use tracing::instrument;

/// Per-venue facade over the call pipeline and the streaming transport
///
/// Holds only immutable venue constants: the REST client already carries
/// the base URL, auth scheme and response envelope; the stream URL, stream
/// settings and codec are handed to every stream opened here.
#[derive(Debug, Clone)]
pub struct VenueConnector<C: WsCodec + Clone> {
    name: &'static str,
    rest: ReqwestRest,
    ws_url: String,
    ws_config: WsConfig,
    codec: C,
}

impl<C: WsCodec + Clone> VenueConnector<C> {
    pub fn new(
        name: &'static str,
        rest: ReqwestRest,
        ws_url: String,
        ws_config: WsConfig,
        codec: C,
    ) -> Self {
        Self {
            name,
            rest,
            ws_url,
            ws_config,
            codec,
        }
    }

    pub const fn name(&self) -> &'static str {
        self.name
    }

    pub fn rest(&self) -> &ReqwestRest {
        &self.rest
    }

    pub fn ws_url(&self) -> &str {
        &self.ws_url
    }

    pub fn codec(&self) -> &C {
        &self.codec
    }

    /// Make a REST call through the venue's signing pipeline
    #[instrument(skip(self, params), fields(exchange = %self.name, route = %route))]
    pub async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        route: &str,
        params: Params,
        auth: AuthLevel,
    ) -> Result<T, ExchangeError> {
        self.rest.call(method, route, params, auth).await
    }

    /// A new, not yet connected stream with the venue's codec and settings
    pub fn stream(&self) -> ResilientStream<C> {
        ResilientStream::new(self.name, self.codec.clone(), self.ws_config.clone())
    }

    /// Open a stream to the venue's public endpoint
    pub async fn connect_stream(&self) -> Result<ResilientStream<C>, ExchangeError> {
        self.connect_stream_to(&self.ws_url).await
    }

    /// Open a stream to another endpoint of the venue (private streams, ...)
    pub async fn connect_stream_to(&self, url: &str) -> Result<ResilientStream<C>, ExchangeError> {
        let stream = self.stream();
        stream.connect(url).await?;
        Ok(stream)
    }
}
