use crate::core::kernel::connection::WsConfig;
use secrecy::{ExposeSecret, Secret};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::env;
use std::sync::Arc;

/// API credentials for one venue.
///
/// Immutable once built. Share it behind an `Arc` between a venue's REST
/// pipeline and its streams.
#[derive(Debug, Clone)]
pub struct Credentials {
    api_key: Secret<String>,
    api_secret: Secret<String>,
    /// OKX passphrase, Bitmart memo, ...
    passphrase: Option<Secret<String>>,
}

// Never expose secrets in serialization
impl Serialize for Credentials {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        use serde::ser::SerializeStruct;
        let mut state = serializer.serialize_struct("Credentials", 3)?;
        state.serialize_field("api_key", "[REDACTED]")?;
        state.serialize_field("api_secret", "[REDACTED]")?;
        state.serialize_field(
            "passphrase",
            &self.passphrase.as_ref().map(|_| "[REDACTED]"),
        )?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for Credentials {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct CredentialsHelper {
            api_key: String,
            api_secret: String,
            passphrase: Option<String>,
        }

        let helper = CredentialsHelper::deserialize(deserializer)?;
        Ok(Self::new(helper.api_key, helper.api_secret, helper.passphrase))
    }
}

impl Credentials {
    pub fn new(api_key: String, api_secret: String, passphrase: Option<String>) -> Self {
        Self {
            api_key: Secret::new(api_key),
            api_secret: Secret::new(api_secret),
            passphrase: passphrase.map(Secret::new),
        }
    }

    /// Credentials for public endpoints only
    pub fn read_only() -> Self {
        Self::new(String::new(), String::new(), None)
    }

    /// Create credentials from environment variables
    ///
    /// Expected environment variables:
    /// - `{VENUE}_API_KEY` (e.g., `BINANCE_API_KEY`)
    /// - `{VENUE}_SECRET_KEY` (e.g., `BINANCE_SECRET_KEY`)
    /// - `{VENUE}_PASSPHRASE` (optional)
    pub fn from_env(venue_prefix: &str) -> Result<Self, ConfigError> {
        let prefix = venue_prefix.to_uppercase();
        let api_key_var = format!("{}_API_KEY", prefix);
        let secret_key_var = format!("{}_SECRET_KEY", prefix);
        let passphrase_var = format!("{}_PASSPHRASE", prefix);

        let api_key = env::var(&api_key_var)
            .map_err(|_| ConfigError::MissingEnvironmentVariable(api_key_var))?;
        let api_secret = env::var(&secret_key_var)
            .map_err(|_| ConfigError::MissingEnvironmentVariable(secret_key_var))?;
        let passphrase = env::var(&passphrase_var).ok();

        Ok(Self::new(api_key, api_secret, passphrase))
    }

    /// Load a `.env` file (if present) and then read the environment.
    ///
    /// **Security Warning**: Never commit .env files to version control!
    #[cfg(feature = "env-file")]
    pub fn from_env_file(venue_prefix: &str) -> Result<Self, ConfigError> {
        Self::from_env_file_with_path(venue_prefix, ".env")
    }

    #[cfg(feature = "env-file")]
    pub fn from_env_file_with_path(
        venue_prefix: &str,
        env_file_path: &str,
    ) -> Result<Self, ConfigError> {
        match dotenv::from_path(env_file_path) {
            Ok(()) => {}
            Err(dotenv::Error::Io(io_err)) if io_err.kind() == std::io::ErrorKind::NotFound => {
                // fall back to the process environment
            }
            Err(e) => {
                return Err(ConfigError::InvalidConfiguration(format!(
                    "Failed to load .env file '{}': {}",
                    env_file_path, e
                )));
            }
        }

        Self::from_env(venue_prefix)
    }

    pub fn has_credentials(&self) -> bool {
        !self.api_key.expose_secret().is_empty() && !self.api_secret.expose_secret().is_empty()
    }

    /// Get API key (use carefully - exposes secret)
    pub fn api_key(&self) -> &str {
        self.api_key.expose_secret()
    }

    /// Get secret key (use carefully - exposes secret)
    pub fn api_secret(&self) -> &str {
        self.api_secret.expose_secret()
    }

    pub fn passphrase(&self) -> Option<&str> {
        self.passphrase.as_ref().map(|p| p.expose_secret().as_str())
    }
}

/// Everything a venue connector needs besides the venue's own constants
#[derive(Debug, Clone)]
pub struct ConnectorConfig {
    pub credentials: Arc<Credentials>,
    pub testnet: bool,
    /// Overrides the venue's REST base URL
    pub base_url: Option<String>,
    /// Overrides the venue's public stream URL
    pub ws_url: Option<String>,
    pub ws: WsConfig,
}

impl ConnectorConfig {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials: Arc::new(credentials),
            testnet: false,
            base_url: None,
            ws_url: None,
            ws: WsConfig::default(),
        }
    }

    pub fn read_only() -> Self {
        Self::new(Credentials::read_only())
    }

    /// Credentials plus optional `{VENUE}_TESTNET`, `{VENUE}_BASE_URL` and
    /// `{VENUE}_WS_URL`
    pub fn from_env(venue_prefix: &str) -> Result<Self, ConfigError> {
        let prefix = venue_prefix.to_uppercase();
        let mut config = Self::new(Credentials::from_env(&prefix)?);
        config.testnet = env::var(format!("{}_TESTNET", prefix))
            .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
            .unwrap_or(false);
        config.base_url = env::var(format!("{}_BASE_URL", prefix)).ok();
        config.ws_url = env::var(format!("{}_WS_URL", prefix)).ok();
        Ok(config)
    }

    pub fn testnet(mut self, testnet: bool) -> Self {
        self.testnet = testnet;
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn ws_url(mut self, ws_url: impl Into<String>) -> Self {
        self.ws_url = Some(ws_url.into());
        self
    }

    pub fn ws_config(mut self, ws: WsConfig) -> Self {
        self.ws = ws;
        self
    }

    pub fn has_credentials(&self) -> bool {
        self.credentials.has_credentials()
    }

    /// Pick the override, else the testnet or production URL
    pub(crate) fn resolve_base_url(&self, production: &str, testnet: &str) -> String {
        self.base_url
            .clone()
            .unwrap_or_else(|| pick(self.testnet, production, testnet))
    }

    pub(crate) fn resolve_ws_url(&self, production: &str, testnet: &str) -> String {
        self.ws_url
            .clone()
            .unwrap_or_else(|| pick(self.testnet, production, testnet))
    }
}

fn pick(testnet: bool, production: &str, testnet_url: &str) -> String {
    if testnet {
        testnet_url.to_string()
    } else {
        production.to_string()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvironmentVariable(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}
