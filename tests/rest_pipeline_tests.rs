use axum::{
    extract::{RawQuery, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use reqwest::Method;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use venuelink::core::config::{ConnectorConfig, Credentials};
use venuelink::core::kernel::{
    HmacSigner, Params, RestClient, RestClientBuilder, RestClientConfig, SigningStrategy,
};
use venuelink::exchanges::{binance, bybit};
use venuelink::{AuthLevel, ExchangeError};

#[derive(Debug, Default, Clone)]
struct Recorded {
    headers: Vec<(String, String)>,
    query: String,
    body: String,
}

impl Recorded {
    fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

type Seen = Arc<Mutex<Vec<Recorded>>>;

fn record(seen: &Seen, headers: &HeaderMap, query: Option<String>, body: String) {
    let headers = headers
        .iter()
        .filter_map(|(k, v)| Some((k.as_str().to_string(), v.to_str().ok()?.to_string())))
        .collect();
    seen.lock().unwrap().push(Recorded {
        headers,
        query: query.unwrap_or_default(),
        body,
    });
}

async fn account(
    State(seen): State<Seen>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
) -> Json<Value> {
    record(&seen, &headers, query, String::new());
    Json(json!({ "balances": [] }))
}

async fn create_order(
    State(seen): State<Seen>,
    headers: HeaderMap,
    RawQuery(query): RawQuery,
    body: String,
) -> Json<Value> {
    record(&seen, &headers, query, body);
    Json(json!({ "retCode": 0, "retMsg": "OK", "result": { "orderId": "1" } }))
}

async fn spawn_server(seen: Seen) -> String {
    let app = Router::new()
        .route(
            "/api/v3/ticker/price",
            get(|| async { Json(json!({ "symbol": "BTCUSDT", "price": "42000.10" })) }),
        )
        .route(
            "/api/v3/bad",
            get(|| async {
                (
                    StatusCode::BAD_REQUEST,
                    Json(json!({ "code": -1121, "msg": "Invalid symbol." })),
                )
            }),
        )
        .route(
            "/gateway",
            get(|| async { (StatusCode::BAD_GATEWAY, "Bad Gateway") }),
        )
        .route(
            "/slow",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(3)).await;
                Json(json!({}))
            }),
        )
        .route(
            "/v5/market/time",
            get(|| async {
                Json(json!({ "retCode": 0, "retMsg": "OK", "result": { "timeSecond": "1700000000" } }))
            }),
        )
        .route(
            "/v5/account/info",
            get(|| async {
                Json(json!({ "retCode": 10003, "retMsg": "API key is invalid.", "result": {} }))
            }),
        )
        .route("/api/v3/account", get(account))
        .route("/v5/order/create", post(create_order))
        .with_state(seen);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    format!("http://{addr}")
}

fn test_config(base_url: &str) -> ConnectorConfig {
    ConnectorConfig::new(Credentials::new(
        "test_api_key".to_string(),
        "test_secret_key".to_string(),
        None,
    ))
    .base_url(base_url)
}

#[derive(Debug, Deserialize)]
struct TickerPrice {
    symbol: String,
    price: String,
}

#[derive(Debug, Deserialize)]
struct ServerTime {
    #[serde(rename = "timeSecond")]
    time_second: String,
}

#[cfg(test)]
mod rest_pipeline_tests {
    use super::*;

    #[tokio::test]
    async fn test_public_call_decodes_body() {
        let base = spawn_server(Seen::default()).await;
        let connector = binance::create_binance_connector(test_config(&base)).unwrap();

        let params = Params::new().with("symbol", "BTCUSDT").unwrap();
        let ticker: TickerPrice = connector
            .call(Method::GET, "/api/v3/ticker/price", params, AuthLevel::None)
            .await
            .unwrap();

        assert_eq!(ticker.symbol, "BTCUSDT");
        assert_eq!(ticker.price, "42000.10");
    }

    #[tokio::test]
    async fn test_error_status_becomes_remote_error() {
        let base = spawn_server(Seen::default()).await;
        let connector = binance::create_binance_connector(test_config(&base)).unwrap();

        let err = connector
            .call::<Value>(Method::GET, "/api/v3/bad", Params::new(), AuthLevel::None)
            .await
            .unwrap_err();

        match err {
            ExchangeError::RemoteError { code, message } => {
                assert_eq!(code, -1121);
                assert_eq!(message, "Invalid symbol.");
            }
            other => panic!("expected RemoteError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_json_error_keeps_http_status() {
        let base = spawn_server(Seen::default()).await;
        let connector = binance::create_binance_connector(test_config(&base)).unwrap();

        let err = connector
            .call::<Value>(Method::GET, "/gateway", Params::new(), AuthLevel::None)
            .await
            .unwrap_err();

        assert!(matches!(err, ExchangeError::RemoteError { code: 502, .. }));
    }

    #[tokio::test]
    async fn test_signed_query_reaches_server() {
        let seen = Seen::default();
        let base = spawn_server(seen.clone()).await;
        let connector = binance::create_binance_connector(test_config(&base)).unwrap();

        let _: Value = connector
            .call(Method::GET, "/api/v3/account", Params::new(), AuthLevel::Signed)
            .await
            .unwrap();

        let recorded = seen.lock().unwrap()[0].clone();
        assert_eq!(recorded.header("x-mbx-apikey"), Some("test_api_key"));

        let (signed, signature) = recorded.query.split_once("&signature=").unwrap();
        assert!(signed.starts_with("recvWindow=5000&timestamp="));
        let expected = HmacSigner::sha256_hex()
            .sign(b"test_secret_key", signed.as_bytes())
            .unwrap();
        assert_eq!(signature, expected);
    }

    #[tokio::test]
    async fn test_signed_body_reaches_server() {
        let seen = Seen::default();
        let base = spawn_server(seen.clone()).await;
        let connector = bybit::create_bybit_connector(test_config(&base)).unwrap();

        let params = Params::new()
            .with("category", "spot")
            .and_then(|p| p.with("symbol", "BTCUSDT"))
            .and_then(|p| p.with("side", "Buy"))
            .unwrap();
        let result: Value = connector
            .call(Method::POST, "/v5/order/create", params, AuthLevel::Signed)
            .await
            .unwrap();
        assert_eq!(result["orderId"], "1");

        let recorded = seen.lock().unwrap()[0].clone();
        assert_eq!(
            recorded.body,
            r#"{"category":"spot","symbol":"BTCUSDT","side":"Buy"}"#
        );
        assert_eq!(recorded.header("content-type"), Some("application/json"));

        let timestamp = recorded.header("x-bapi-timestamp").unwrap();
        let prehash = format!("{}test_api_key5000{}", timestamp, recorded.body);
        let expected = HmacSigner::sha256_hex()
            .sign(b"test_secret_key", prehash.as_bytes())
            .unwrap();
        assert_eq!(recorded.header("x-bapi-sign"), Some(expected.as_str()));
    }

    #[tokio::test]
    async fn test_code_envelope_extracts_result() {
        let base = spawn_server(Seen::default()).await;
        let connector = bybit::create_bybit_connector(test_config(&base)).unwrap();

        let time: ServerTime = connector
            .call(Method::GET, "/v5/market/time", Params::new(), AuthLevel::None)
            .await
            .unwrap();
        assert_eq!(time.time_second, "1700000000");
    }

    #[tokio::test]
    async fn test_code_envelope_error_on_http_200() {
        let base = spawn_server(Seen::default()).await;
        let connector = bybit::create_bybit_connector(test_config(&base)).unwrap();

        let err = connector
            .call::<Value>(Method::GET, "/v5/account/info", Params::new(), AuthLevel::Signed)
            .await
            .unwrap_err();

        assert!(matches!(
            err,
            ExchangeError::RemoteError { code: 10003, ref message } if message == "API key is invalid."
        ));
        assert!(!err.is_retryable());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_transport_error() {
        let connector =
            binance::create_binance_connector(test_config("http://127.0.0.1:1")).unwrap();

        let err = connector
            .call::<Value>(Method::GET, "/api/v3/ping", Params::new(), AuthLevel::None)
            .await
            .unwrap_err();

        assert!(matches!(err, ExchangeError::TransportError(_)), "{err:?}");
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_slow_response_is_transport_error() {
        let base = spawn_server(Seen::default()).await;
        let rest = RestClientBuilder::new(
            RestClientConfig::new(base, "test".to_string()).with_timeout(1),
        )
        .build()
        .unwrap();

        let err = rest
            .call::<Value>(Method::GET, "/slow", Params::new(), AuthLevel::None)
            .await
            .unwrap_err();

        assert!(matches!(err, ExchangeError::TransportError(_)), "{err:?}");
        assert!(err.is_retryable());
    }

    #[tokio::test]
    async fn test_signed_call_without_credentials_never_sends() {
        let seen = Seen::default();
        let base = spawn_server(seen.clone()).await;
        let connector = binance::create_binance_connector(
            ConnectorConfig::read_only().base_url(base.as_str()),
        )
        .unwrap();

        let err = connector
            .call::<Value>(Method::GET, "/api/v3/account", Params::new(), AuthLevel::Signed)
            .await
            .unwrap_err();

        assert!(matches!(err, ExchangeError::AuthError(_)));
        assert!(seen.lock().unwrap().is_empty());
    }
}
