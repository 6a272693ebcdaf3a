use crate::core::config::{ConfigError, ConnectorConfig};
use crate::core::errors::ExchangeError;
use crate::core::kernel::{Params, ReqwestRest};
use crate::core::types::AuthLevel;
use crate::exchanges::{
    binance::{self, BinanceConnector},
    bitmart::{self, BitmartConnector},
    bybit::{self, BybitConnector},
    gate::{self, GateConnector},
    mexc::{self, MexcConnector},
    okx::{self, OkxConnector},
};
use reqwest::Method;
use serde::de::DeserializeOwned;
use std::str::FromStr;

/// Supported venues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Venue {
    Binance,
    Bybit,
    Okx,
    Bitmart,
    Gate,
    Mexc,
}

impl Venue {
    pub const fn all() -> [Self; 6] {
        [
            Self::Binance,
            Self::Bybit,
            Self::Okx,
            Self::Bitmart,
            Self::Gate,
            Self::Mexc,
        ]
    }

    /// Prefix of the venue's environment variables (`BINANCE_API_KEY`, ...)
    pub const fn env_prefix(self) -> &'static str {
        match self {
            Self::Binance => "BINANCE",
            Self::Bybit => "BYBIT",
            Self::Okx => "OKX",
            Self::Bitmart => "BITMART",
            Self::Gate => "GATE",
            Self::Mexc => "MEXC",
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Binance => binance::NAME,
            Self::Bybit => bybit::NAME,
            Self::Okx => okx::NAME,
            Self::Bitmart => bitmart::NAME,
            Self::Gate => gate::NAME,
            Self::Mexc => mexc::NAME,
        }
    }
}

impl std::fmt::Display for Venue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Binance => write!(f, "Binance"),
            Self::Bybit => write!(f, "Bybit"),
            Self::Okx => write!(f, "OKX"),
            Self::Bitmart => write!(f, "BitMart"),
            Self::Gate => write!(f, "Gate"),
            Self::Mexc => write!(f, "MEXC"),
        }
    }
}

impl FromStr for Venue {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "binance" => Ok(Self::Binance),
            "bybit" => Ok(Self::Bybit),
            "okx" => Ok(Self::Okx),
            "bitmart" => Ok(Self::Bitmart),
            "gate" | "gateio" | "gate.io" => Ok(Self::Gate),
            "mexc" => Ok(Self::Mexc),
            other => Err(ConfigError::InvalidConfiguration(format!(
                "Unknown venue: {}",
                other
            ))),
        }
    }
}

/// A connector for any venue
///
/// Each venue streams through its own codec type, so stream access goes
/// through the matching variant; REST calls are uniform.
#[derive(Debug, Clone)]
pub enum AnyConnector {
    Binance(BinanceConnector),
    Bybit(BybitConnector),
    Okx(OkxConnector),
    Bitmart(BitmartConnector),
    Gate(GateConnector),
    Mexc(MexcConnector),
}

impl AnyConnector {
    pub const fn venue(&self) -> Venue {
        match self {
            Self::Binance(_) => Venue::Binance,
            Self::Bybit(_) => Venue::Bybit,
            Self::Okx(_) => Venue::Okx,
            Self::Bitmart(_) => Venue::Bitmart,
            Self::Gate(_) => Venue::Gate,
            Self::Mexc(_) => Venue::Mexc,
        }
    }

    pub fn rest(&self) -> &ReqwestRest {
        match self {
            Self::Binance(c) => c.rest(),
            Self::Bybit(c) => c.rest(),
            Self::Okx(c) => c.rest(),
            Self::Bitmart(c) => c.rest(),
            Self::Gate(c) => c.rest(),
            Self::Mexc(c) => c.rest(),
        }
    }

    pub fn ws_url(&self) -> &str {
        match self {
            Self::Binance(c) => c.ws_url(),
            Self::Bybit(c) => c.ws_url(),
            Self::Okx(c) => c.ws_url(),
            Self::Bitmart(c) => c.ws_url(),
            Self::Gate(c) => c.ws_url(),
            Self::Mexc(c) => c.ws_url(),
        }
    }

    pub async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        route: &str,
        params: Params,
        auth: AuthLevel,
    ) -> Result<T, ExchangeError> {
        match self {
            Self::Binance(c) => c.call(method, route, params, auth).await,
            Self::Bybit(c) => c.call(method, route, params, auth).await,
            Self::Okx(c) => c.call(method, route, params, auth).await,
            Self::Bitmart(c) => c.call(method, route, params, auth).await,
            Self::Gate(c) => c.call(method, route, params, auth).await,
            Self::Mexc(c) => c.call(method, route, params, auth).await,
        }
    }
}

/// Factory for creating venue connectors
pub struct ExchangeFactory;

impl ExchangeFactory {
    /// Create a connector for `venue`, read-only when no config is given
    pub fn create_connector(
        venue: Venue,
        config: Option<ConnectorConfig>,
    ) -> Result<AnyConnector, ExchangeError> {
        let cfg = config.unwrap_or_else(ConnectorConfig::read_only);
        Ok(match venue {
            Venue::Binance => AnyConnector::Binance(binance::create_binance_connector(cfg)?),
            Venue::Bybit => AnyConnector::Bybit(bybit::create_bybit_connector(cfg)?),
            Venue::Okx => AnyConnector::Okx(okx::create_okx_connector(cfg)?),
            Venue::Bitmart => AnyConnector::Bitmart(bitmart::create_bitmart_connector(cfg)?),
            Venue::Gate => AnyConnector::Gate(gate::create_gate_connector(cfg)?),
            Venue::Mexc => AnyConnector::Mexc(mexc::create_mexc_connector(cfg)?),
        })
    }

    /// Create a connector from the venue's environment variables
    pub fn from_env(venue: Venue) -> Result<AnyConnector, ExchangeError> {
        let cfg = ConnectorConfig::from_env(venue.env_prefix())?;
        Self::create_connector(venue, Some(cfg))
    }
}
