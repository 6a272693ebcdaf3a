use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExchangeError {
    /// A request parameter or body could not be serialized. Never retried.
    #[error("Encoding error: {0}")]
    EncodingError(String),

    /// Network or socket failure (DNS, refused, reset, timeout).
    #[error("Transport error: {0}")]
    TransportError(String),

    /// The venue rejected the request.
    #[error("Remote error: {code} - {message}")]
    RemoteError { code: i64, message: String },

    /// Operation attempted after `close`.
    #[error("Stream closed")]
    Closed,

    #[error("Connection timeout: {0}")]
    ConnectionTimeout(String),

    #[error("Authentication error: {0}")]
    AuthError(String),

    #[error("Invalid parameters: {0}")]
    InvalidParameters(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    #[error("Configuration error: {0}")]
    ConfigError(#[from] crate::core::config::ConfigError),
}

impl ExchangeError {
    /// Whether a caller (or the reconnect loop) may reasonably try again.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::TransportError(_) | Self::ConnectionTimeout(_))
    }
}

/// HTTP failures, timeouts included, are transport errors; `ConnectionTimeout`
/// is left to the stream's dial and deadlines.
impl From<reqwest::Error> for ExchangeError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_builder() {
            Self::InvalidParameters(e.to_string())
        } else {
            Self::TransportError(e.to_string())
        }
    }
}

impl From<tokio_tungstenite::tungstenite::Error> for ExchangeError {
    fn from(e: tokio_tungstenite::tungstenite::Error) -> Self {
        use tokio_tungstenite::tungstenite::Error as WsError;
        match e {
            WsError::AlreadyClosed | WsError::ConnectionClosed => {
                Self::TransportError("WebSocket connection closed".to_string())
            }
            WsError::Url(e) => Self::InvalidParameters(format!("Invalid WebSocket URL: {}", e)),
            other => Self::TransportError(format!("WebSocket error: {}", other)),
        }
    }
}
