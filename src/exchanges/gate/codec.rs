use crate::core::errors::ExchangeError;
use crate::core::kernel::{JsonRouter, KeyPath, Route, WsCodec};
use chrono::Utc;
use serde_json::json;
use tokio_tungstenite::tungstenite::Message;

/// Spot v4 codec
///
/// Topics are `channel:currency_pair` (`spot.tickers:BTC_USDT`). Update
/// frames name the pair as `result.currency_pair` or, on order book
/// channels, `result.s`.
#[derive(Debug, Clone)]
pub struct GateCodec {
    router: JsonRouter,
    event: KeyPath,
    channel: KeyPath,
}

impl Default for GateCodec {
    fn default() -> Self {
        Self {
            router: JsonRouter::new(&["channel", "result.currency_pair", "result.s"]),
            event: KeyPath::parse("event"),
            channel: KeyPath::parse("channel"),
        }
    }
}

impl GateCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frame for `channel` with an explicit payload list, e.g.
    /// `("spot.order_book_update", &["BTC_USDT", "100ms"])`
    pub fn frame(channel: &str, event: &str, payload: &[&str]) -> Message {
        Message::Text(
            json!({
                "time": Utc::now().timestamp(),
                "channel": channel,
                "event": event,
                "payload": payload
            })
            .to_string(),
        )
    }

    fn request(event: &str, topic: &str) -> Message {
        match topic.split_once(':') {
            Some((channel, pair)) => Self::frame(channel, event, &[pair]),
            None => Self::frame(topic, event, &[]),
        }
    }
}

impl WsCodec for GateCodec {
    fn encode_subscription(&self, topic: &str) -> Result<Message, ExchangeError> {
        Ok(Self::request("subscribe", topic))
    }

    fn encode_unsubscription(&self, topic: &str) -> Result<Message, ExchangeError> {
        Ok(Self::request("unsubscribe", topic))
    }

    fn route(&self, frame: &Message) -> Result<Route, ExchangeError> {
        let Message::Text(text) = frame else {
            return self.router.route(frame);
        };
        if self.channel.peek(text)?.as_deref() == Some("spot.pong") {
            return Ok(Route::Ignore);
        }
        match self.event.peek(text)?.as_deref() {
            Some("update") | None => self.router.route_text(text),
            Some(_) => Ok(Route::Unrouted),
        }
    }
}
