use crate::core::config::Credentials;
use crate::core::errors::ExchangeError;
use crate::core::kernel::params::Params;
use crate::core::kernel::request::{AuthScheme, RequestBuilder, RequestDescriptor};
use crate::core::types::{AuthLevel, BodyFormat, QueryOrder};
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{instrument, trace};

/// REST client trait for making HTTP requests
///
/// One generic entry point serves every venue: the venue only contributes
/// its [`AuthScheme`] and [`ResponseEnvelope`]. Calls are never retried here.
#[async_trait]
pub trait RestClient: Send + Sync {
    /// Send an already built request and decode the typed result
    async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestDescriptor,
    ) -> Result<T, ExchangeError>;

    /// Build, authenticate and send a request in one step
    ///
    /// # Arguments
    /// * `method` - HTTP method
    /// * `route` - Path relative to the base URL
    /// * `params` - Ordered parameters, query or body depending on method
    /// * `auth` - Credential material to attach
    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        route: &str,
        params: Params,
        auth: AuthLevel,
    ) -> Result<T, ExchangeError>;
}

/// How a venue wraps success and failure in its response bodies
pub trait ResponseEnvelope: Send + Sync {
    fn is_success(&self, status: StatusCode, body: &Value) -> bool;

    /// Unwrap the payload from a successful body
    fn extract_data(&self, body: Value) -> Value;

    /// Build the error for an unsuccessful body
    fn remote_error(&self, status: StatusCode, body: &Value) -> ExchangeError;
}

/// Read a numeric code that a venue may send as a number or a string
fn code_of(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn message_of(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Success decided by the HTTP status alone; the body is the data
///
/// Errors carry a code and message in the body (`{code,msg}` on Binance,
/// `{label,message}` on Gate). A non-numeric code is folded into the message.
#[derive(Debug, Clone)]
pub struct StatusEnvelope {
    code_field: String,
    message_field: String,
}

impl StatusEnvelope {
    pub fn new(code_field: impl Into<String>, message_field: impl Into<String>) -> Self {
        Self {
            code_field: code_field.into(),
            message_field: message_field.into(),
        }
    }
}

impl Default for StatusEnvelope {
    fn default() -> Self {
        Self::new("code", "msg")
    }
}

impl ResponseEnvelope for StatusEnvelope {
    fn is_success(&self, status: StatusCode, _body: &Value) -> bool {
        status.is_success()
    }

    fn extract_data(&self, body: Value) -> Value {
        body
    }

    fn remote_error(&self, status: StatusCode, body: &Value) -> ExchangeError {
        let raw_code = body.get(&self.code_field);
        let message = message_of(body.get(&self.message_field));
        let (code, message) = match (raw_code.and_then(code_of), raw_code, message) {
            (Some(code), _, Some(message)) => (code, message),
            (Some(code), _, None) => (code, body.to_string()),
            (None, Some(Value::String(label)), Some(message)) => {
                (i64::from(status.as_u16()), format!("{}: {}", label, message))
            }
            (None, _, Some(message)) => (i64::from(status.as_u16()), message),
            (None, _, None) => (i64::from(status.as_u16()), body.to_string()),
        };
        ExchangeError::RemoteError { code, message }
    }
}

/// Predicate over the envelope's code field
pub type SuccessPredicate = Arc<dyn Fn(&Value) -> bool + Send + Sync>;

/// Success decided by a code field in the body, the payload under a data field
#[derive(Clone)]
pub struct CodeEnvelope {
    code_field: String,
    message_field: String,
    data_field: Option<String>,
    is_success: SuccessPredicate,
}

impl fmt::Debug for CodeEnvelope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CodeEnvelope")
            .field("code_field", &self.code_field)
            .field("message_field", &self.message_field)
            .field("data_field", &self.data_field)
            .finish_non_exhaustive()
    }
}

impl CodeEnvelope {
    pub fn new(
        code_field: impl Into<String>,
        message_field: impl Into<String>,
        is_success: SuccessPredicate,
    ) -> Self {
        Self {
            code_field: code_field.into(),
            message_field: message_field.into(),
            data_field: None,
            is_success,
        }
    }

    /// Success when the code, numeric or string, equals `expected`
    pub fn with_success_code(
        code_field: impl Into<String>,
        message_field: impl Into<String>,
        expected: i64,
    ) -> Self {
        Self::new(
            code_field,
            message_field,
            Arc::new(move |code: &Value| code_of(code) == Some(expected)),
        )
    }

    pub fn with_data_field(mut self, field: impl Into<String>) -> Self {
        self.data_field = Some(field.into());
        self
    }
}

impl ResponseEnvelope for CodeEnvelope {
    fn is_success(&self, status: StatusCode, body: &Value) -> bool {
        status.is_success()
            && body
                .get(&self.code_field)
                .is_some_and(|code| (self.is_success)(code))
    }

    fn extract_data(&self, mut body: Value) -> Value {
        match &self.data_field {
            Some(field) => body
                .get_mut(field)
                .map(Value::take)
                .unwrap_or(Value::Null),
            None => body,
        }
    }

    fn remote_error(&self, status: StatusCode, body: &Value) -> ExchangeError {
        let code = body
            .get(&self.code_field)
            .and_then(code_of)
            .unwrap_or_else(|| i64::from(status.as_u16()));
        let message =
            message_of(body.get(&self.message_field)).unwrap_or_else(|| body.to_string());
        ExchangeError::RemoteError { code, message }
    }
}

/// Decode a complete response body through `envelope`
///
/// The success path and the error path are mutually exclusive: an
/// unsuccessful body never reaches `extract_data` or the typed decoder.
pub fn decode_response<T: DeserializeOwned>(
    envelope: &dyn ResponseEnvelope,
    status: StatusCode,
    body: &[u8],
) -> Result<T, ExchangeError> {
    let value = if body.iter().all(u8::is_ascii_whitespace) {
        Value::Null
    } else {
        match serde_json::from_slice::<Value>(body) {
            Ok(value) => value,
            Err(_) if !status.is_success() => {
                return Err(ExchangeError::RemoteError {
                    code: i64::from(status.as_u16()),
                    message: String::from_utf8_lossy(body).into_owned(),
                });
            }
            Err(e) => {
                return Err(ExchangeError::DeserializationError(format!(
                    "Failed to parse JSON response: {}",
                    e
                )));
            }
        }
    };

    if !envelope.is_success(status, &value) {
        return Err(envelope.remote_error(status, &value));
    }

    serde_json::from_value(envelope.extract_data(value)).map_err(|e| {
        ExchangeError::DeserializationError(format!("Failed to deserialize JSON: {}", e))
    })
}

/// Configuration for the REST client
#[derive(Clone, Debug)]
pub struct RestClientConfig {
    /// Base URL for the API
    pub base_url: String,
    /// Exchange name for logging and tracing
    pub exchange_name: String,
    /// Request timeout in seconds
    pub timeout_seconds: u64,
    pub user_agent: String,
    pub query_order: QueryOrder,
    pub body_format: BodyFormat,
}

impl RestClientConfig {
    pub fn new(base_url: String, exchange_name: String) -> Self {
        Self {
            base_url,
            exchange_name,
            timeout_seconds: 30,
            user_agent: "venuelink/0.1".to_string(),
            query_order: QueryOrder::default(),
            body_format: BodyFormat::default(),
        }
    }

    pub fn with_timeout(mut self, timeout_seconds: u64) -> Self {
        self.timeout_seconds = timeout_seconds;
        self
    }

    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }

    pub fn with_query_order(mut self, order: QueryOrder) -> Self {
        self.query_order = order;
        self
    }

    pub fn with_body_format(mut self, format: BodyFormat) -> Self {
        self.body_format = format;
        self
    }
}

/// Builder for creating REST client instances
pub struct RestClientBuilder {
    config: RestClientConfig,
    credentials: Arc<Credentials>,
    scheme: Option<AuthScheme>,
    envelope: Arc<dyn ResponseEnvelope>,
}

impl RestClientBuilder {
    pub fn new(config: RestClientConfig) -> Self {
        Self {
            config,
            credentials: Arc::new(Credentials::read_only()),
            scheme: None,
            envelope: Arc::new(StatusEnvelope::default()),
        }
    }

    pub fn with_credentials(mut self, credentials: Arc<Credentials>) -> Self {
        self.credentials = credentials;
        self
    }

    /// Set the venue's signing scheme for `Keyed` and `Signed` calls
    pub fn with_auth_scheme(mut self, scheme: AuthScheme) -> Self {
        self.scheme = Some(scheme);
        self
    }

    pub fn with_envelope(mut self, envelope: Arc<dyn ResponseEnvelope>) -> Self {
        self.envelope = envelope;
        self
    }

    pub fn build(self) -> Result<ReqwestRest, ExchangeError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(self.config.timeout_seconds))
            .user_agent(&self.config.user_agent)
            .build()
            .map_err(|e| {
                ExchangeError::InvalidParameters(format!("Failed to build HTTP client: {}", e))
            })?;

        let mut requests = RequestBuilder::new(self.config.base_url.clone(), self.credentials)
            .with_query_order(self.config.query_order)
            .with_body_format(self.config.body_format);
        if let Some(scheme) = self.scheme {
            requests = requests.with_auth_scheme(scheme);
        }

        Ok(ReqwestRest {
            client,
            config: self.config,
            requests,
            envelope: self.envelope,
        })
    }
}

/// Implementation of `RestClient` using reqwest
#[derive(Clone)]
pub struct ReqwestRest {
    client: Client,
    config: RestClientConfig,
    requests: RequestBuilder,
    envelope: Arc<dyn ResponseEnvelope>,
}

impl fmt::Debug for ReqwestRest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReqwestRest")
            .field("config", &self.config)
            .field("requests", &self.requests)
            .finish_non_exhaustive()
    }
}

impl ReqwestRest {
    pub fn config(&self) -> &RestClientConfig {
        &self.config
    }

    /// The request builder this client signs with
    pub fn request_builder(&self) -> &RequestBuilder {
        &self.requests
    }
}

#[async_trait]
impl RestClient for ReqwestRest {
    #[instrument(skip(self, request), fields(exchange = %self.config.exchange_name, method = %request.method))]
    async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestDescriptor,
    ) -> Result<T, ExchangeError> {
        let mut builder = self.client.request(request.method.clone(), &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder
                .header("Content-Type", "application/json")
                .body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?;
        trace!(status = %status, body = %String::from_utf8_lossy(&body), "response");

        decode_response(self.envelope.as_ref(), status, &body)
    }

    #[instrument(skip(self, params), fields(exchange = %self.config.exchange_name, method = %method, route = %route, auth = ?auth))]
    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        route: &str,
        params: Params,
        auth: AuthLevel,
    ) -> Result<T, ExchangeError> {
        let request = self.requests.build(method, route, params, auth)?;
        self.execute(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Deserialize, PartialEq)]
    struct Ticker {
        symbol: String,
    }

    /// Wraps an envelope and counts how often the success path is taken
    struct Counting<E> {
        inner: E,
        extracted: AtomicUsize,
    }

    impl<E: ResponseEnvelope> ResponseEnvelope for Counting<E> {
        fn is_success(&self, status: StatusCode, body: &Value) -> bool {
            self.inner.is_success(status, body)
        }

        fn extract_data(&self, body: Value) -> Value {
            self.extracted.fetch_add(1, Ordering::SeqCst);
            self.inner.extract_data(body)
        }

        fn remote_error(&self, status: StatusCode, body: &Value) -> ExchangeError {
            self.inner.remote_error(status, body)
        }
    }

    #[test]
    fn test_status_envelope_error_body() {
        let env = Counting {
            inner: StatusEnvelope::default(),
            extracted: AtomicUsize::new(0),
        };
        let err = decode_response::<Ticker>(
            &env,
            StatusCode::BAD_REQUEST,
            br#"{"code":-1121,"msg":"Invalid symbol."}"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ExchangeError::RemoteError { code: -1121, ref message } if message == "Invalid symbol."
        ));
        assert_eq!(env.extracted.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_code_envelope_error_with_200_status() {
        let env = Counting {
            inner: CodeEnvelope::with_success_code("retCode", "retMsg", 0)
                .with_data_field("result"),
            extracted: AtomicUsize::new(0),
        };
        let err = decode_response::<Ticker>(
            &env,
            StatusCode::OK,
            br#"{"retCode":10001,"retMsg":"params error","result":{}}"#,
        )
        .unwrap_err();
        assert!(matches!(err, ExchangeError::RemoteError { code: 10001, .. }));
        assert_eq!(env.extracted.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_code_envelope_extracts_data() {
        let env = CodeEnvelope::with_success_code("code", "msg", 0).with_data_field("data");
        let ticker: Vec<Ticker> = decode_response(
            &env,
            StatusCode::OK,
            br#"{"code":"0","msg":"","data":[{"symbol":"BTC-USDT"}]}"#,
        )
        .unwrap();
        assert_eq!(ticker[0].symbol, "BTC-USDT");
    }

    #[test]
    fn test_gate_style_label_error() {
        let err = decode_response::<Value>(
            &StatusEnvelope::new("label", "message"),
            StatusCode::UNAUTHORIZED,
            br#"{"label":"INVALID_KEY","message":"Invalid key provided"}"#,
        )
        .unwrap_err();
        assert!(matches!(
            err,
            ExchangeError::RemoteError { code: 401, ref message } if message == "INVALID_KEY: Invalid key provided"
        ));
    }

    #[test]
    fn test_non_json_error_body() {
        let err = decode_response::<Value>(
            &StatusEnvelope::default(),
            StatusCode::BAD_GATEWAY,
            b"<html>bad gateway</html>",
        )
        .unwrap_err();
        assert!(matches!(err, ExchangeError::RemoteError { code: 502, .. }));
    }

    #[test]
    fn test_non_json_success_body() {
        let err =
            decode_response::<Value>(&StatusEnvelope::default(), StatusCode::OK, b"not json")
                .unwrap_err();
        assert!(matches!(err, ExchangeError::DeserializationError(_)));
    }

    #[test]
    fn test_empty_success_body_is_null() {
        let value: Value =
            decode_response(&StatusEnvelope::default(), StatusCode::OK, b"").unwrap();
        assert_eq!(value, Value::Null);
    }

    #[test]
    fn test_type_mismatch_is_deserialization_error() {
        let err = decode_response::<Ticker>(
            &StatusEnvelope::default(),
            StatusCode::OK,
            json!({"price": "1"}).to_string().as_bytes(),
        )
        .unwrap_err();
        assert!(matches!(err, ExchangeError::DeserializationError(_)));
    }
}
