use crate::core::errors::ExchangeError;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, trace, warn};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// WebSocket transport configuration
#[derive(Debug, Clone)]
pub struct WsConfig {
    /// Dial timeout in milliseconds
    pub connect_timeout_ms: u64,
    /// Read deadline, refreshed by every inbound frame including pongs
    pub read_timeout_ms: u64,
    /// Deadline for a single outbound frame
    pub write_timeout_ms: u64,
    /// Keep-alive period; 0 disables the keep-alive task
    pub heartbeat_interval_ms: u64,
    /// Capacity of each per-topic channel and of the fallback channel
    pub channel_capacity: usize,
    /// First reconnect delay
    pub reconnect_delay_ms: u64,
    /// Reconnect delay ceiling
    pub reconnect_delay_max_ms: u64,
    /// Random extra delay added to each reconnect wait
    pub reconnect_jitter_ms: u64,
    /// `None` retries forever
    pub max_reconnect_attempts: Option<u32>,
}

impl Default for WsConfig {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 10_000,
            read_timeout_ms: 30_000,
            write_timeout_ms: 30_000,
            heartbeat_interval_ms: 15_000,
            channel_capacity: 100,
            reconnect_delay_ms: 1_000,
            reconnect_delay_max_ms: 30_000,
            reconnect_jitter_ms: 0,
            max_reconnect_attempts: None,
        }
    }
}

impl WsConfig {
    pub fn with_heartbeat_interval(mut self, interval: Duration) -> Self {
        self.heartbeat_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn with_read_timeout(mut self, deadline: Duration) -> Self {
        self.read_timeout_ms = deadline.as_millis() as u64;
        self
    }

    pub fn with_write_timeout(mut self, deadline: Duration) -> Self {
        self.write_timeout_ms = deadline.as_millis() as u64;
        self
    }

    pub fn with_connect_timeout(mut self, deadline: Duration) -> Self {
        self.connect_timeout_ms = deadline.as_millis() as u64;
        self
    }

    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    pub fn with_reconnect_delay(mut self, base: Duration, cap: Duration) -> Self {
        self.reconnect_delay_ms = base.as_millis() as u64;
        self.reconnect_delay_max_ms = cap.as_millis() as u64;
        self
    }

    pub fn with_reconnect_jitter(mut self, jitter: Duration) -> Self {
        self.reconnect_jitter_ms = jitter.as_millis() as u64;
        self
    }

    pub fn with_max_reconnect_attempts(mut self, attempts: Option<u32>) -> Self {
        self.max_reconnect_attempts = attempts;
        self
    }

    pub(crate) fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub(crate) fn read_timeout(&self) -> Duration {
        Duration::from_millis(self.read_timeout_ms)
    }

    pub(crate) fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.write_timeout_ms)
    }
}

/// How a venue wants to be kept alive
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Heartbeat {
    Disabled,
    /// WebSocket ping control frames
    ProtocolPing,
    /// An application-level text frame, e.g. `ping` or `{"op":"ping"}`
    Text(String),
}

/// One physical socket
///
/// Reads and writes are split so the reader never waits on a writer. All
/// outbound frames, pings and pong replies included, go through one writer
/// lock. `abort` wakes a blocked reader immediately.
pub struct Connection {
    writer: Mutex<SplitSink<WsStream, Message>>,
    reader: Mutex<SplitStream<WsStream>>,
    aborted: CancellationToken,
    read_timeout: Duration,
    write_timeout: Duration,
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("aborted", &self.aborted.is_cancelled())
            .field("read_timeout", &self.read_timeout)
            .field("write_timeout", &self.write_timeout)
            .finish_non_exhaustive()
    }
}

impl Connection {
    #[instrument(skip(config), fields(url = %url))]
    pub async fn dial(url: &str, config: &WsConfig) -> Result<Self, ExchangeError> {
        let (stream, _) = timeout(config.connect_timeout(), connect_async(url))
            .await
            .map_err(|_| {
                ExchangeError::ConnectionTimeout("WebSocket connection timeout".to_string())
            })??;
        debug!("dialed");

        let (writer, reader) = stream.split();
        Ok(Self {
            writer: Mutex::new(writer),
            reader: Mutex::new(reader),
            aborted: CancellationToken::new(),
            read_timeout: config.read_timeout(),
            write_timeout: config.write_timeout(),
        })
    }

    pub fn is_aborted(&self) -> bool {
        self.aborted.is_cancelled()
    }

    /// Send one frame under the writer lock with the write deadline
    pub async fn write(&self, message: Message) -> Result<(), ExchangeError> {
        if self.is_aborted() {
            return Err(ExchangeError::TransportError(
                "WebSocket connection aborted".to_string(),
            ));
        }

        let mut writer = self.writer.lock().await;
        let result = match timeout(self.write_timeout, writer.send(message)).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(ExchangeError::from(e)),
            Err(_) => Err(ExchangeError::ConnectionTimeout(
                "WebSocket write deadline exceeded".to_string(),
            )),
        };
        drop(writer);

        if result.is_err() {
            self.abort();
        }
        result
    }

    /// Next data frame
    ///
    /// Pings are answered, pongs only refresh the deadline. A close frame, a
    /// missed deadline, an I/O error or `abort` end the connection.
    pub async fn read_next(&self) -> Result<Message, ExchangeError> {
        let mut reader = self.reader.lock().await;
        loop {
            let frame = tokio::select! {
                () = self.aborted.cancelled() => {
                    return Err(ExchangeError::TransportError(
                        "WebSocket connection aborted".to_string(),
                    ));
                }
                frame = timeout(self.read_timeout, reader.next()) => frame,
            };

            let message = match frame {
                Err(_) => {
                    return Err(ExchangeError::ConnectionTimeout(
                        "WebSocket read deadline exceeded".to_string(),
                    ))
                }
                Ok(None) => {
                    return Err(ExchangeError::TransportError(
                        "WebSocket stream ended".to_string(),
                    ))
                }
                Ok(Some(Err(e))) => return Err(e.into()),
                Ok(Some(Ok(message))) => message,
            };

            match message {
                Message::Ping(data) => {
                    trace!("ping received");
                    if let Err(e) = self.write(Message::Pong(data)).await {
                        warn!("Failed to send pong response: {}", e);
                    }
                }
                Message::Pong(_) => trace!("pong received"),
                Message::Close(frame) => {
                    debug!(?frame, "close frame received");
                    return Err(ExchangeError::TransportError(
                        "WebSocket closed by peer".to_string(),
                    ));
                }
                Message::Frame(_) => {}
                data => return Ok(data),
            }
        }
    }

    pub async fn ping(&self, heartbeat: &Heartbeat) -> Result<(), ExchangeError> {
        match heartbeat {
            Heartbeat::Disabled => Ok(()),
            Heartbeat::ProtocolPing => self.write(Message::Ping(Vec::new())).await,
            Heartbeat::Text(text) => self.write(Message::Text(text.clone())).await,
        }
    }

    /// Mark the connection dead and wake its reader
    pub fn abort(&self) {
        self.aborted.cancel();
    }

    /// Abort and send a close frame; safe to call more than once
    pub async fn close(&self) {
        self.abort();
        let mut writer = self.writer.lock().await;
        if let Ok(Err(e)) = timeout(self.write_timeout, writer.close()).await {
            trace!("close after close: {}", e);
        }
    }
}
