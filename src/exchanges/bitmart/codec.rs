use crate::core::errors::ExchangeError;
use crate::core::kernel::{Heartbeat, JsonRouter, Route, WsCodec};
use serde_json::json;
use tokio_tungstenite::tungstenite::Message;

/// Spot stream codec
///
/// Topics use Bitmart's own `table:symbol` form (`spot/ticker:BTC_USDT`),
/// which data frames echo as `table` plus `data[0].symbol`.
#[derive(Debug, Clone)]
pub struct BitmartCodec {
    router: JsonRouter,
}

impl Default for BitmartCodec {
    fn default() -> Self {
        Self {
            router: JsonRouter::new(&["table", "data.0.symbol"]).ignoring("pong"),
        }
    }
}

impl BitmartCodec {
    pub fn new() -> Self {
        Self::default()
    }

    fn request(op: &str, topic: &str) -> Message {
        Message::Text(json!({ "op": op, "args": [topic] }).to_string())
    }
}

impl WsCodec for BitmartCodec {
    fn encode_subscription(&self, topic: &str) -> Result<Message, ExchangeError> {
        Ok(Self::request("subscribe", topic))
    }

    fn encode_unsubscription(&self, topic: &str) -> Result<Message, ExchangeError> {
        Ok(Self::request("unsubscribe", topic))
    }

    fn route(&self, frame: &Message) -> Result<Route, ExchangeError> {
        self.router.route(frame)
    }

    fn heartbeat(&self) -> Heartbeat {
        Heartbeat::Text("ping".to_string())
    }
}
