use crate::core::config::Credentials;
use crate::core::errors::ExchangeError;
use crate::core::kernel::params::Params;
use crate::core::kernel::signer::SigningStrategy;
use crate::core::types::{AuthLevel, BodyFormat, QueryOrder, TimestampUnit};
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::trace;
use zeroize::Zeroizing;

/// The exact inputs a venue hashes for one call. Lives for one call only.
#[derive(Debug, Clone)]
pub struct CanonicalRequest {
    pub method: Method,
    /// Route, without the base URL
    pub path: String,
    /// Encoded query string without the leading `?`
    pub query: String,
    pub body: Vec<u8>,
    /// Rendered in the venue's [`TimestampUnit`]
    pub timestamp: String,
}

impl CanonicalRequest {
    /// `path` or `path?query`
    pub fn path_with_query(&self) -> String {
        if self.query.is_empty() {
            self.path.clone()
        } else {
            format!("{}?{}", self.path, self.query)
        }
    }

    /// The query string for GET-like requests, the body otherwise
    pub fn payload(&self) -> &[u8] {
        if self.body.is_empty() {
            self.query.as_bytes()
        } else {
            &self.body
        }
    }
}

/// Venue-supplied construction of the bytes to sign
pub type Canonicalizer = Arc<dyn Fn(&CanonicalRequest, &Credentials) -> Vec<u8> + Send + Sync>;

/// Venue-supplied extra headers for signed calls (timestamp, passphrase, ...)
pub type HeaderInjector =
    Arc<dyn Fn(&CanonicalRequest, &Credentials) -> Vec<(String, String)> + Send + Sync>;

/// Where a piece of credential material goes on the wire
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Placement {
    Header(String),
    /// Appended as `&name=value` after the encoded query. It is not part of
    /// the `QueryOrder` sort, so a query-placed signature always comes last
    /// and never covers itself.
    QueryParam(String),
}

impl Placement {
    pub fn header(name: impl Into<String>) -> Self {
        Self::Header(name.into())
    }

    pub fn query(name: impl Into<String>) -> Self {
        Self::QueryParam(name.into())
    }
}

/// Everything venue-specific about authenticating a call
#[derive(Clone)]
pub struct AuthScheme {
    strategy: Arc<dyn SigningStrategy>,
    canonicalizer: Canonicalizer,
    key_placement: Placement,
    signature_placement: Placement,
    timestamp_unit: TimestampUnit,
    /// Inject the timestamp into the params under this name before signing
    timestamp_param: Option<String>,
    /// Extra params injected before signing (`recvWindow`, ...)
    signed_params: Vec<(String, Value)>,
    signed_headers: Option<HeaderInjector>,
}

impl fmt::Debug for AuthScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthScheme")
            .field("key_placement", &self.key_placement)
            .field("signature_placement", &self.signature_placement)
            .field("timestamp_unit", &self.timestamp_unit)
            .field("timestamp_param", &self.timestamp_param)
            .field("signed_params", &self.signed_params)
            .finish_non_exhaustive()
    }
}

impl AuthScheme {
    pub fn new(
        strategy: Arc<dyn SigningStrategy>,
        canonicalizer: Canonicalizer,
        key_placement: Placement,
        signature_placement: Placement,
    ) -> Self {
        Self {
            strategy,
            canonicalizer,
            key_placement,
            signature_placement,
            timestamp_unit: TimestampUnit::default(),
            timestamp_param: None,
            signed_params: Vec::new(),
            signed_headers: None,
        }
    }

    pub fn with_timestamp_unit(mut self, unit: TimestampUnit) -> Self {
        self.timestamp_unit = unit;
        self
    }

    pub fn with_timestamp_param(mut self, name: impl Into<String>) -> Self {
        self.timestamp_param = Some(name.into());
        self
    }

    pub fn with_signed_param(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.signed_params.push((name.into(), value.into()));
        self
    }

    pub fn with_signed_headers(mut self, injector: HeaderInjector) -> Self {
        self.signed_headers = Some(injector);
        self
    }

    pub const fn timestamp_unit(&self) -> TimestampUnit {
        self.timestamp_unit
    }
}

/// A fully formed outbound HTTP request
#[derive(Debug, Clone)]
pub struct RequestDescriptor {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<Vec<u8>>,
    canonical: Option<Vec<u8>>,
}

impl RequestDescriptor {
    /// The signed bytes, if the request was signed
    pub fn canonical_payload(&self) -> Option<&[u8]> {
        self.canonical.as_deref()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Value of a query parameter, still percent-encoded
    pub fn query_param(&self, name: &str) -> Option<&str> {
        let (_, query) = self.url.split_once('?')?;
        query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .find(|(k, _)| *k == name)
            .map(|(_, v)| v)
    }
}

/// Composes method, route, params and auth level into a [`RequestDescriptor`]
#[derive(Clone)]
pub struct RequestBuilder {
    base_url: String,
    query_order: QueryOrder,
    body_format: BodyFormat,
    credentials: Arc<Credentials>,
    scheme: Option<AuthScheme>,
}

impl fmt::Debug for RequestBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestBuilder")
            .field("base_url", &self.base_url)
            .field("query_order", &self.query_order)
            .field("body_format", &self.body_format)
            .field("scheme", &self.scheme)
            .finish_non_exhaustive()
    }
}

impl RequestBuilder {
    pub fn new(base_url: impl Into<String>, credentials: Arc<Credentials>) -> Self {
        Self {
            base_url: base_url.into(),
            query_order: QueryOrder::default(),
            body_format: BodyFormat::default(),
            credentials,
            scheme: None,
        }
    }

    pub fn with_query_order(mut self, order: QueryOrder) -> Self {
        self.query_order = order;
        self
    }

    pub fn with_body_format(mut self, format: BodyFormat) -> Self {
        self.body_format = format;
        self
    }

    pub fn with_auth_scheme(mut self, scheme: AuthScheme) -> Self {
        self.scheme = Some(scheme);
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build a request stamped with the current time
    pub fn build(
        &self,
        method: Method,
        route: &str,
        params: Params,
        auth: AuthLevel,
    ) -> Result<RequestDescriptor, ExchangeError> {
        self.build_at(method, route, params, auth, Utc::now())
    }

    /// Build a request stamped with `now`
    pub fn build_at(
        &self,
        method: Method,
        route: &str,
        mut params: Params,
        auth: AuthLevel,
        now: DateTime<Utc>,
    ) -> Result<RequestDescriptor, ExchangeError> {
        let scheme = match auth {
            AuthLevel::None => None,
            AuthLevel::Keyed | AuthLevel::Signed => {
                if !self.credentials.has_credentials() {
                    return Err(ExchangeError::AuthError(
                        "Authentication required but no credentials configured".to_string(),
                    ));
                }
                Some(self.scheme.as_ref().ok_or_else(|| {
                    ExchangeError::AuthError(
                        "Authentication required but no auth scheme configured".to_string(),
                    )
                })?)
            }
        };

        let timestamp = scheme
            .map(|s| s.timestamp_unit.format(now))
            .unwrap_or_else(|| TimestampUnit::Milliseconds.format(now));

        if let (AuthLevel::Signed, Some(scheme)) = (auth, scheme) {
            for (name, value) in &scheme.signed_params {
                if !params.contains_key(name) {
                    params.insert(name.clone(), value)?;
                }
            }
            if let Some(name) = &scheme.timestamp_param {
                params.insert(name.clone(), &timestamp)?;
            }
        }

        let in_query = self.body_format == BodyFormat::Query
            || method == Method::GET
            || method == Method::DELETE;
        let (mut query, body) = if in_query {
            (params.to_query(self.query_order)?, Vec::new())
        } else if params.is_empty() {
            (String::new(), Vec::new())
        } else {
            (String::new(), params.to_json_body()?)
        };

        let mut headers = Vec::new();
        let mut canonical_payload = None;

        if let Some(scheme) = scheme {
            place(
                &scheme.key_placement,
                self.credentials.api_key(),
                &mut headers,
                &mut query,
            )?;
        }

        if let (AuthLevel::Signed, Some(scheme)) = (auth, scheme) {
            let canonical = CanonicalRequest {
                method: method.clone(),
                path: route.to_string(),
                query: query.clone(),
                body: body.clone(),
                timestamp,
            };
            let payload = (scheme.canonicalizer)(&canonical, &self.credentials);
            let secret = Zeroizing::new(self.credentials.api_secret().as_bytes().to_vec());
            let signature = scheme.strategy.sign(&secret, &payload)?;
            trace!(
                canonical = %String::from_utf8_lossy(&payload),
                "signed request"
            );

            if let Some(injector) = &scheme.signed_headers {
                headers.extend(injector(&canonical, &self.credentials));
            }
            place(
                &scheme.signature_placement,
                &signature,
                &mut headers,
                &mut query,
            )?;
            canonical_payload = Some(payload);
        }

        let url = if query.is_empty() {
            format!("{}{}", self.base_url, route)
        } else {
            format!("{}{}?{}", self.base_url, route, query)
        };

        Ok(RequestDescriptor {
            method,
            url,
            headers,
            body: (!body.is_empty()).then_some(body),
            canonical: canonical_payload,
        })
    }
}

fn place(
    placement: &Placement,
    value: &str,
    headers: &mut Vec<(String, String)>,
    query: &mut String,
) -> Result<(), ExchangeError> {
    match placement {
        Placement::Header(name) => headers.push((name.clone(), value.to_string())),
        Placement::QueryParam(name) => {
            let pair = serde_urlencoded::to_string([(name.as_str(), value)]).map_err(|e| {
                ExchangeError::EncodingError(format!("Failed to encode '{}': {}", name, e))
            })?;
            if !query.is_empty() {
                query.push('&');
            }
            query.push_str(&pair);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::kernel::signer::HmacSigner;
    use chrono::TimeZone;

    fn query_scheme() -> AuthScheme {
        AuthScheme::new(
            Arc::new(HmacSigner::sha256_hex()),
            Arc::new(|req: &CanonicalRequest, _: &Credentials| req.query.as_bytes().to_vec()),
            Placement::header("X-API-KEY"),
            Placement::query("signature"),
        )
        .with_timestamp_param("timestamp")
    }

    fn builder() -> RequestBuilder {
        let creds = Arc::new(Credentials::new("K".into(), "S".into(), None));
        RequestBuilder::new("https://api.example.com", creds).with_auth_scheme(query_scheme())
    }

    fn at(ms: i64) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(ms).unwrap()
    }

    #[test]
    fn test_none_attaches_nothing() {
        let params = Params::new().with("symbol", "BTCUSDT").unwrap();
        let req = builder()
            .build_at(Method::GET, "/ticker", params, AuthLevel::None, at(1))
            .unwrap();
        assert!(req.headers.is_empty());
        assert_eq!(req.url, "https://api.example.com/ticker?symbol=BTCUSDT");
        assert!(req.canonical_payload().is_none());
    }

    #[test]
    fn test_keyed_attaches_only_key() {
        let req = builder()
            .build_at(Method::GET, "/me", Params::new(), AuthLevel::Keyed, at(1))
            .unwrap();
        assert_eq!(req.header("x-api-key"), Some("K"));
        assert_eq!(req.query_param("signature"), None);
        assert_eq!(req.query_param("timestamp"), None);
    }

    #[test]
    fn test_signature_is_appended_after_canonical_query() {
        let params = Params::new().with("symbol", "BTCUSDT").unwrap();
        let req = builder()
            .build_at(Method::GET, "/order", params, AuthLevel::Signed, at(1_000))
            .unwrap();
        let canonical = String::from_utf8(req.canonical_payload().unwrap().to_vec()).unwrap();
        assert_eq!(canonical, "symbol=BTCUSDT&timestamp=1000");
        let expected = HmacSigner::sha256_hex()
            .sign(b"S", canonical.as_bytes())
            .unwrap();
        assert_eq!(req.query_param("signature"), Some(expected.as_str()));
        assert!(req.url.ends_with(&format!("&signature={}", expected)));
    }

    #[test]
    fn test_post_goes_to_json_body() {
        let params = Params::new().with("qty", 2).unwrap();
        let req = builder()
            .build_at(Method::POST, "/order", params, AuthLevel::None, at(1))
            .unwrap();
        assert_eq!(req.body.as_deref(), Some(br#"{"qty":2}"#.as_slice()));
        assert_eq!(req.url, "https://api.example.com/order");
    }

    #[test]
    fn test_query_body_format_keeps_post_in_query() {
        let params = Params::new().with("qty", 2).unwrap();
        let req = builder()
            .with_body_format(BodyFormat::Query)
            .build_at(Method::POST, "/order", params, AuthLevel::None, at(1))
            .unwrap();
        assert!(req.body.is_none());
        assert_eq!(req.url, "https://api.example.com/order?qty=2");
    }

    #[test]
    fn test_signed_without_credentials_fails() {
        let req = RequestBuilder::new("https://x", Arc::new(Credentials::read_only()))
            .with_auth_scheme(query_scheme())
            .build_at(Method::GET, "/o", Params::new(), AuthLevel::Signed, at(1));
        assert!(matches!(req, Err(ExchangeError::AuthError(_))));
    }

    #[test]
    fn test_signed_without_scheme_fails() {
        let creds = Arc::new(Credentials::new("K".into(), "S".into(), None));
        let req = RequestBuilder::new("https://x", creds).build_at(
            Method::GET,
            "/o",
            Params::new(),
            AuthLevel::Signed,
            at(1),
        );
        assert!(matches!(req, Err(ExchangeError::AuthError(_))));
    }

    #[test]
    fn test_nested_query_param_is_encoding_error() {
        let params = Params::new().with("ids", vec!["a", "b"]).unwrap();
        let req = builder().build_at(Method::GET, "/o", params, AuthLevel::Signed, at(1));
        assert!(matches!(req, Err(ExchangeError::EncodingError(_))));
    }

    #[test]
    fn test_signed_params_do_not_override_caller() {
        let scheme = query_scheme().with_signed_param("recvWindow", 5000);
        let creds = Arc::new(Credentials::new("K".into(), "S".into(), None));
        let b = RequestBuilder::new("https://x", creds).with_auth_scheme(scheme);

        let req = b
            .build_at(Method::GET, "/o", Params::new(), AuthLevel::Signed, at(7))
            .unwrap();
        assert_eq!(req.canonical_payload(), Some(b"recvWindow=5000&timestamp=7".as_slice()));

        let params = Params::new().with("recvWindow", 10_000).unwrap();
        let req = b
            .build_at(Method::GET, "/o", params, AuthLevel::Signed, at(7))
            .unwrap();
        assert_eq!(req.canonical_payload(), Some(b"recvWindow=10000&timestamp=7".as_slice()));
    }

    #[test]
    fn test_query_placement_stays_after_sorted_query() {
        let params = Params::new()
            .with("symbol", "BTCUSDT")
            .and_then(|p| p.with("amount", 1))
            .unwrap();
        let req = builder()
            .with_query_order(QueryOrder::Lexicographic)
            .build_at(Method::GET, "/order", params, AuthLevel::Signed, at(5))
            .unwrap();

        assert_eq!(
            req.canonical_payload(),
            Some(b"amount=1&symbol=BTCUSDT&timestamp=5".as_slice())
        );
        let expected = HmacSigner::sha256_hex()
            .sign(b"S", b"amount=1&symbol=BTCUSDT&timestamp=5")
            .unwrap();
        assert_eq!(
            req.url,
            format!("https://api.example.com/order?amount=1&symbol=BTCUSDT&timestamp=5&signature={expected}")
        );
    }
}
