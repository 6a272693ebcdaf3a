use crate::core::errors::ExchangeError;
use crate::core::kernel::connection::Heartbeat;
use serde_json::value::RawValue;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use tokio_tungstenite::tungstenite::Message;

/// Where an inbound frame should go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Route {
    /// Deliver to the channel registered for this topic
    Topic(String),
    /// No routing key (acks, login replies, ...); goes to the fallback channel
    Unrouted,
    /// Heartbeat replies and other frames nobody consumes
    Ignore,
}

/// Codec trait for handling exchange-specific WebSocket framing
///
/// Implementations encode subscribe/unsubscribe requests and peek the
/// routing key of inbound frames. Routing must stay cheap: it runs on the
/// reader task for every frame, so it should not materialize the payload.
/// Control frames (ping, pong, close) never reach the codec.
pub trait WsCodec: Send + Sync + 'static {
    /// Encode a subscription request for `topic`
    fn encode_subscription(&self, topic: &str) -> Result<Message, ExchangeError>;

    /// Encode an unsubscription request for `topic`
    fn encode_unsubscription(&self, topic: &str) -> Result<Message, ExchangeError>;

    /// Peek the routing key of a data frame
    ///
    /// # Returns
    /// - `Ok(route)` - where the frame goes
    /// - `Err(error)` - the frame is malformed and will be dropped
    fn route(&self, frame: &Message) -> Result<Route, ExchangeError>;

    /// Keep-alive mechanism for this venue
    fn heartbeat(&self) -> Heartbeat {
        Heartbeat::ProtocolPing
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Key(String),
    Index(usize),
}

/// Dotted path into a JSON frame, e.g. `arg.channel` or `data.0.symbol`
///
/// Numeric segments index into arrays.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPath {
    segments: Vec<Segment>,
}

impl KeyPath {
    pub fn parse(path: &str) -> Self {
        let segments = path
            .split('.')
            .map(|s| {
                s.parse::<usize>()
                    .map_or_else(|_| Segment::Key(s.to_string()), Segment::Index)
            })
            .collect();
        Self { segments }
    }

    /// Resolve the path against `text` without building a full `Value` tree
    ///
    /// Returns `Ok(None)` when any segment is absent, `Err` when the frame is
    /// not JSON or the leaf is not a scalar.
    pub fn peek(&self, text: &str) -> Result<Option<String>, ExchangeError> {
        let mut current: &RawValue = serde_json::from_str(text).map_err(malformed)?;
        for segment in &self.segments {
            let next = match segment {
                Segment::Key(key) => {
                    let object: HashMap<String, &RawValue> =
                        match serde_json::from_str(current.get()) {
                            Ok(object) => object,
                            Err(_) => return Ok(None),
                        };
                    object.get(key).copied()
                }
                Segment::Index(index) => {
                    let array: Vec<&RawValue> = match serde_json::from_str(current.get()) {
                        Ok(array) => array,
                        Err(_) => return Ok(None),
                    };
                    array.get(*index).copied()
                }
            };
            match next {
                Some(raw) => current = raw,
                None => return Ok(None),
            }
        }

        match serde_json::from_str::<Value>(current.get()).map_err(malformed)? {
            Value::String(s) => Ok(Some(s)),
            Value::Number(n) => Ok(Some(n.to_string())),
            Value::Bool(b) => Ok(Some(b.to_string())),
            Value::Null => Ok(None),
            Value::Array(_) | Value::Object(_) => Err(ExchangeError::DeserializationError(
                "Routing key is not a scalar".to_string(),
            )),
        }
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, segment) in self.segments.iter().enumerate() {
            if i > 0 {
                write!(f, ".")?;
            }
            match segment {
                Segment::Key(key) => write!(f, "{}", key)?,
                Segment::Index(index) => write!(f, "{}", index)?,
            }
        }
        Ok(())
    }
}

fn malformed(e: serde_json::Error) -> ExchangeError {
    ExchangeError::DeserializationError(format!("Malformed frame: {}", e))
}

/// Routing rule shared by JSON venues
///
/// The topic is the present key values joined with `:`. A frame missing the
/// first key is unrouted. Literal texts listed as ignored (`pong`) are
/// swallowed.
#[derive(Debug, Clone)]
pub struct JsonRouter {
    keys: Vec<KeyPath>,
    ignored: Vec<String>,
}

impl JsonRouter {
    pub fn new(keys: &[&str]) -> Self {
        Self {
            keys: keys.iter().map(|k| KeyPath::parse(k)).collect(),
            ignored: Vec::new(),
        }
    }

    pub fn ignoring(mut self, literal: impl Into<String>) -> Self {
        self.ignored.push(literal.into());
        self
    }

    pub fn route_text(&self, text: &str) -> Result<Route, ExchangeError> {
        let trimmed = text.trim();
        if self.ignored.iter().any(|literal| literal == trimmed) {
            return Ok(Route::Ignore);
        }

        let mut parts = Vec::with_capacity(self.keys.len());
        for (i, key) in self.keys.iter().enumerate() {
            match key.peek(trimmed)? {
                Some(part) => parts.push(part),
                None if i == 0 => return Ok(Route::Unrouted),
                None => {}
            }
        }
        Ok(Route::Topic(parts.join(":")))
    }

    /// Route a whole frame; binary frames are unrouted
    pub fn route(&self, frame: &Message) -> Result<Route, ExchangeError> {
        match frame {
            Message::Text(text) => self.route_text(text),
            Message::Binary(_) => Ok(Route::Unrouted),
            _ => Ok(Route::Ignore),
        }
    }
}

/// General-purpose codec: `{"op":"subscribe","args":[topic]}` requests,
/// frames routed by a [`JsonRouter`]
#[derive(Debug, Clone)]
pub struct JsonRouteCodec {
    router: JsonRouter,
    heartbeat: Heartbeat,
}

impl JsonRouteCodec {
    pub fn new(router: JsonRouter) -> Self {
        Self {
            router,
            heartbeat: Heartbeat::ProtocolPing,
        }
    }

    pub fn with_heartbeat(mut self, heartbeat: Heartbeat) -> Self {
        self.heartbeat = heartbeat;
        self
    }

    fn op(op: &str, topic: &str) -> Message {
        Message::Text(serde_json::json!({ "op": op, "args": [topic] }).to_string())
    }
}

impl WsCodec for JsonRouteCodec {
    fn encode_subscription(&self, topic: &str) -> Result<Message, ExchangeError> {
        Ok(Self::op("subscribe", topic))
    }

    fn encode_unsubscription(&self, topic: &str) -> Result<Message, ExchangeError> {
        Ok(Self::op("unsubscribe", topic))
    }

    fn route(&self, frame: &Message) -> Result<Route, ExchangeError> {
        self.router.route(frame)
    }

    fn heartbeat(&self) -> Heartbeat {
        self.heartbeat.clone()
    }
}
