use crate::core::errors::ExchangeError;
use crate::core::kernel::{Heartbeat, JsonRouter, KeyPath, Route, WsCodec};
use serde_json::json;
use tokio_tungstenite::tungstenite::Message;

pub const PING: &str = r#"{"op":"ping"}"#;

/// v5 codec: frames carry their topic (`tickers.BTCUSDT`, `orderbook.50.BTCUSDT`)
#[derive(Debug, Clone)]
pub struct BybitCodec {
    router: JsonRouter,
    op: KeyPath,
}

impl Default for BybitCodec {
    fn default() -> Self {
        Self {
            router: JsonRouter::new(&["topic"]),
            op: KeyPath::parse("op"),
        }
    }
}

impl BybitCodec {
    pub fn new() -> Self {
        Self::default()
    }

    fn request(op: &str, topic: &str) -> Message {
        Message::Text(json!({ "op": op, "args": [topic] }).to_string())
    }
}

impl WsCodec for BybitCodec {
    fn encode_subscription(&self, topic: &str) -> Result<Message, ExchangeError> {
        Ok(Self::request("subscribe", topic))
    }

    fn encode_unsubscription(&self, topic: &str) -> Result<Message, ExchangeError> {
        Ok(Self::request("unsubscribe", topic))
    }

    fn route(&self, frame: &Message) -> Result<Route, ExchangeError> {
        match self.router.route(frame)? {
            Route::Unrouted => {
                let Message::Text(text) = frame else {
                    return Ok(Route::Unrouted);
                };
                // heartbeat replies carry "op":"ping" or "op":"pong"
                match self.op.peek(text)?.as_deref() {
                    Some("ping" | "pong") => Ok(Route::Ignore),
                    _ => Ok(Route::Unrouted),
                }
            }
            route => Ok(route),
        }
    }

    fn heartbeat(&self) -> Heartbeat {
        Heartbeat::Text(PING.to_string())
    }
}
