use crate::core::errors::ExchangeError;
use crate::core::kernel::{Heartbeat, JsonRouter, KeyPath, Route, WsCodec};
use serde_json::json;
use tokio_tungstenite::tungstenite::Message;

pub const PING: &str = r#"{"method":"PING"}"#;

/// Spot v3 codec
///
/// Topics are full channel names (`spot@public.deals.v3.api@BTCUSDT`) and
/// push frames echo them back in `c`.
#[derive(Debug, Clone)]
pub struct MexcCodec {
    router: JsonRouter,
    msg: KeyPath,
}

impl Default for MexcCodec {
    fn default() -> Self {
        Self {
            router: JsonRouter::new(&["c"]),
            msg: KeyPath::parse("msg"),
        }
    }
}

impl MexcCodec {
    pub fn new() -> Self {
        Self::default()
    }

    fn request(method: &str, topic: &str) -> Message {
        Message::Text(json!({ "method": method, "params": [topic] }).to_string())
    }
}

impl WsCodec for MexcCodec {
    fn encode_subscription(&self, topic: &str) -> Result<Message, ExchangeError> {
        Ok(Self::request("SUBSCRIPTION", topic))
    }

    fn encode_unsubscription(&self, topic: &str) -> Result<Message, ExchangeError> {
        Ok(Self::request("UNSUBSCRIPTION", topic))
    }

    fn route(&self, frame: &Message) -> Result<Route, ExchangeError> {
        match self.router.route(frame)? {
            Route::Unrouted => {
                let Message::Text(text) = frame else {
                    return Ok(Route::Unrouted);
                };
                // acks and pongs share `{"id":0,"code":0,"msg":...}`
                match self.msg.peek(text)?.as_deref() {
                    Some("PONG") => Ok(Route::Ignore),
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

/// Public channel for `symbol`, e.g. `("deals", "btcusdt")` gives
/// `spot@public.deals.v3.api@BTCUSDT`
pub fn public_channel(channel: &str, symbol: &str) -> String {
    format!("spot@public.{}.v3.api@{}", channel, symbol.to_uppercase())
}
