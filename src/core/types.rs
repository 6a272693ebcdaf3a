use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Authentication level attached to every REST call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuthLevel {
    /// Public endpoint, no credential material attached
    None,
    /// Only the API key identifier is attached
    Keyed,
    /// Canonicalized, signed, and the signature placed per the venue's scheme
    Signed,
}

/// Lifecycle of a resilient stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    Closed,
}

impl ConnectionState {
    pub const fn is_closed(self) -> bool {
        matches!(self, Self::Closed)
    }

    pub const fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Disconnected => write!(f, "disconnected"),
            Self::Connecting => write!(f, "connecting"),
            Self::Connected => write!(f, "connected"),
            Self::Reconnecting => write!(f, "reconnecting"),
            Self::Closed => write!(f, "closed"),
        }
    }
}

/// Order in which query parameters are joined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum QueryOrder {
    /// Keep the order the caller inserted parameters in
    #[default]
    Insertion,
    /// Sort by key. Needed when the server recomputes the signature from sorted keys.
    Lexicographic,
}

/// Where non-GET parameters travel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BodyFormat {
    /// JSON object in the request body
    #[default]
    Json,
    /// Always in the query string, even for POST/PUT/DELETE
    Query,
}

/// How a venue expects request timestamps to be rendered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimestampUnit {
    Seconds,
    #[default]
    Milliseconds,
    Nanoseconds,
    /// `2020-12-08T09:08:57.715Z`
    Iso8601,
}

impl TimestampUnit {
    pub fn format(self, at: DateTime<Utc>) -> String {
        match self {
            Self::Seconds => at.timestamp().to_string(),
            Self::Milliseconds => at.timestamp_millis().to_string(),
            Self::Nanoseconds => at
                .timestamp_nanos_opt()
                .unwrap_or_else(|| at.timestamp_millis().saturating_mul(1_000_000))
                .to_string(),
            Self::Iso8601 => at.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
        }
    }
}
