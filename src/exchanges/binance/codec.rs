use crate::core::errors::ExchangeError;
use crate::core::kernel::{JsonRouter, Route, WsCodec};
use serde_json::json;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio_tungstenite::tungstenite::Message;

/// Combined-stream codec: frames arrive as `{"stream": "<topic>", "data": ...}`
///
/// Topics are Binance stream names such as `btcusdt@trade` or
/// `ethusdt@depth20@100ms`.
#[derive(Debug, Clone)]
pub struct BinanceCodec {
    router: JsonRouter,
    next_id: Arc<AtomicU64>,
}

impl Default for BinanceCodec {
    fn default() -> Self {
        Self {
            router: JsonRouter::new(&["stream"]),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }
}

impl BinanceCodec {
    pub fn new() -> Self {
        Self::default()
    }

    fn request(&self, method: &str, topic: &str) -> Message {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        Message::Text(
            json!({
                "method": method,
                "params": [topic],
                "id": id
            })
            .to_string(),
        )
    }
}

impl WsCodec for BinanceCodec {
    fn encode_subscription(&self, topic: &str) -> Result<Message, ExchangeError> {
        Ok(self.request("SUBSCRIBE", topic))
    }

    fn encode_unsubscription(&self, topic: &str) -> Result<Message, ExchangeError> {
        Ok(self.request("UNSUBSCRIBE", topic))
    }

    fn route(&self, frame: &Message) -> Result<Route, ExchangeError> {
        self.router.route(frame)
    }
}

/// Stream name for `symbol` and a channel suffix, e.g. `("BTCUSDT", "trade")`
pub fn stream_name(symbol: &str, channel: &str) -> String {
    format!("{}@{}", symbol.to_lowercase(), channel)
}
