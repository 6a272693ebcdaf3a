use crate::core::errors::ExchangeError;
use crate::core::kernel::{Heartbeat, JsonRouter, KeyPath, Route, WsCodec};
use serde_json::{json, Map, Value};
use tokio_tungstenite::tungstenite::Message;

/// v5 codec
///
/// Topics are `channel:instId` (`tickers:BTC-USDT`) or a bare channel
/// (`account`). Data frames echo the same pair under `arg`; event frames
/// (`subscribe`, `login`, `error`) also carry `arg` and are left unrouted.
#[derive(Debug, Clone)]
pub struct OkxCodec {
    router: JsonRouter,
    event: KeyPath,
}

impl Default for OkxCodec {
    fn default() -> Self {
        Self {
            router: JsonRouter::new(&["arg.channel", "arg.instId"]).ignoring("pong"),
            event: KeyPath::parse("event"),
        }
    }
}

impl OkxCodec {
    pub fn new() -> Self {
        Self::default()
    }

    fn request(op: &str, topic: &str) -> Message {
        let mut arg = Map::new();
        match topic.split_once(':') {
            Some((channel, inst_id)) => {
                arg.insert("channel".to_string(), Value::from(channel));
                arg.insert("instId".to_string(), Value::from(inst_id));
            }
            None => {
                arg.insert("channel".to_string(), Value::from(topic));
            }
        }
        Message::Text(json!({ "op": op, "args": [arg] }).to_string())
    }
}

impl WsCodec for OkxCodec {
    fn encode_subscription(&self, topic: &str) -> Result<Message, ExchangeError> {
        Ok(Self::request("subscribe", topic))
    }

    fn encode_unsubscription(&self, topic: &str) -> Result<Message, ExchangeError> {
        Ok(Self::request("unsubscribe", topic))
    }

    fn route(&self, frame: &Message) -> Result<Route, ExchangeError> {
        if let Message::Text(text) = frame {
            if text != "pong" && self.event.peek(text)?.is_some() {
                return Ok(Route::Unrouted);
            }
        }
        self.router.route(frame)
    }

    fn heartbeat(&self) -> Heartbeat {
        Heartbeat::Text("ping".to_string())
    }
}
