use chrono::{TimeZone, Utc};
use reqwest::Method;
use std::sync::Arc;
use venuelink::core::config::Credentials;
use venuelink::core::kernel::{
    AuthScheme, CanonicalRequest, HmacSigner, Params, Placement, RequestBuilder, SigningStrategy,
};
use venuelink::core::types::{AuthLevel, BodyFormat, QueryOrder};
use venuelink::exchanges::{binance, bitmart, bybit, gate, mexc, okx};

const BINANCE_KEY: &str = "vmPUZE6mv9SD5VNHk4HlWFsOr6aKE2zvsw0MuIgwCIPy6utIco14y7Ju91duEh8A";
const BINANCE_SECRET: &str = "NhqPtmdSJYdKjVHjA7PZj4Mge3R5YNiP1e3UZjInClVN65XAbvqqM6A7H5fATj0j";

fn creds(passphrase: Option<&str>) -> Arc<Credentials> {
    Arc::new(Credentials::new(
        "key".to_string(),
        "secret".to_string(),
        passphrase.map(str::to_string),
    ))
}

#[cfg(test)]
mod signing_tests {
    use super::*;

    #[test]
    fn test_binance_documented_vector() {
        let credentials = Arc::new(Credentials::new(
            BINANCE_KEY.to_string(),
            BINANCE_SECRET.to_string(),
            None,
        ));
        let builder = RequestBuilder::new(binance::REST_URL, credentials)
            .with_query_order(QueryOrder::Insertion)
            .with_body_format(BodyFormat::Query)
            .with_auth_scheme(binance::auth_scheme());

        let params = Params::new()
            .with("symbol", "LTCBTC")
            .and_then(|p| p.with("side", "BUY"))
            .and_then(|p| p.with("type", "LIMIT"))
            .and_then(|p| p.with("timeInForce", "GTC"))
            .and_then(|p| p.with("quantity", "1"))
            .and_then(|p| p.with("price", "0.1"))
            .unwrap();
        let now = Utc.timestamp_millis_opt(1_499_827_319_559).unwrap();

        let request = builder
            .build_at(Method::POST, "/api/v3/order", params, AuthLevel::Signed, now)
            .unwrap();

        assert_eq!(
            request.canonical_payload().unwrap(),
            b"symbol=LTCBTC&side=BUY&type=LIMIT&timeInForce=GTC&quantity=1&price=0.1&recvWindow=5000&timestamp=1499827319559"
        );
        assert_eq!(
            request.query_param("signature"),
            Some("c8db56825ae71d6d79447849e617115f4a920fa2acdcab2b053c4b2838bd6b71")
        );
        assert_eq!(request.header("X-MBX-APIKEY"), Some(BINANCE_KEY));
        assert!(request.body.is_none());
    }

    #[test]
    fn test_bybit_prehash_and_headers() {
        let builder =
            RequestBuilder::new(bybit::REST_URL, creds(None)).with_auth_scheme(bybit::auth_scheme());
        let params = Params::new()
            .with("category", "spot")
            .and_then(|p| p.with("symbol", "BTCUSDT"))
            .unwrap();
        let now = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();

        let request = builder
            .build_at(Method::POST, "/v5/order/create", params, AuthLevel::Signed, now)
            .unwrap();

        let body = br#"{"category":"spot","symbol":"BTCUSDT"}"#;
        assert_eq!(request.body.as_deref(), Some(body.as_slice()));

        let mut expected = b"1700000000000key5000".to_vec();
        expected.extend_from_slice(body);
        assert_eq!(request.canonical_payload().unwrap(), expected.as_slice());

        let signature = HmacSigner::sha256_hex().sign(b"secret", &expected).unwrap();
        assert_eq!(request.header("X-BAPI-SIGN"), Some(signature.as_str()));
        assert_eq!(request.header("X-BAPI-API-KEY"), Some("key"));
        assert_eq!(request.header("X-BAPI-TIMESTAMP"), Some("1700000000000"));
        assert_eq!(request.header("X-BAPI-RECV-WINDOW"), Some("5000"));
    }

    #[test]
    fn test_okx_prehash_uses_path_with_query() {
        let builder = RequestBuilder::new(okx::REST_URL, creds(Some("pass")))
            .with_auth_scheme(okx::auth_scheme());
        let params = Params::new().with("ccy", "BTC").unwrap();
        let now = Utc.timestamp_millis_opt(1_700_000_000_123).unwrap();

        let request = builder
            .build_at(Method::GET, "/api/v5/account/balance", params, AuthLevel::Signed, now)
            .unwrap();

        assert_eq!(
            request.canonical_payload().unwrap(),
            b"2023-11-14T22:13:20.123ZGET/api/v5/account/balance?ccy=BTC"
        );
        assert_eq!(request.header("OK-ACCESS-PASSPHRASE"), Some("pass"));
        assert_eq!(
            request.header("OK-ACCESS-TIMESTAMP"),
            Some("2023-11-14T22:13:20.123Z")
        );
        let signature = request.header("OK-ACCESS-SIGN").unwrap();
        assert_eq!(signature.len(), 44, "base64 of a 32 byte digest");
    }

    #[test]
    fn test_bitmart_prehash_includes_memo() {
        let builder = RequestBuilder::new(bitmart::REST_URL, creds(Some("memo")))
            .with_auth_scheme(bitmart::auth_scheme());
        let params = Params::new().with("symbol", "BTC_USDT").unwrap();
        let now = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();

        let request = builder
            .build_at(Method::POST, "/spot/v2/submit_order", params, AuthLevel::Signed, now)
            .unwrap();

        assert_eq!(
            request.canonical_payload().unwrap(),
            br#"1700000000000#memo#{"symbol":"BTC_USDT"}"#
        );
        assert_eq!(request.header("X-BM-TIMESTAMP"), Some("1700000000000"));
        assert_eq!(request.header("X-BM-KEY"), Some("key"));
    }

    #[test]
    fn test_gate_prehash_hashes_body() {
        let builder =
            RequestBuilder::new(gate::REST_URL, creds(None)).with_auth_scheme(gate::auth_scheme());
        let now = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();

        let request = builder
            .build_at(Method::GET, "/api/v4/spot/accounts", Params::new(), AuthLevel::Signed, now)
            .unwrap();

        let canonical = String::from_utf8(request.canonical_payload().unwrap().to_vec()).unwrap();
        assert!(canonical.starts_with("GET\n/api/v4/spot/accounts\n\ncf83e1357eefb8bd"));
        assert!(canonical.ends_with("\n1700000000"));
        assert_eq!(request.header("Timestamp"), Some("1700000000"));
        assert_eq!(request.header("SIGN").map(str::len), Some(128));
    }

    #[test]
    fn test_keyed_never_signs() {
        let builder =
            RequestBuilder::new(bybit::REST_URL, creds(None)).with_auth_scheme(bybit::auth_scheme());
        let request = builder
            .build(Method::GET, "/v5/user/query-api", Params::new(), AuthLevel::Keyed)
            .unwrap();
        assert_eq!(request.header("X-BAPI-API-KEY"), Some("key"));
        assert!(request.header("X-BAPI-SIGN").is_none());
        assert!(request.canonical_payload().is_none());
    }

    #[test]
    fn test_same_inputs_same_signature() {
        let builder =
            RequestBuilder::new(gate::REST_URL, creds(None)).with_auth_scheme(gate::auth_scheme());
        let now = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let sign = || {
            let params = Params::new().with("currency_pair", "BTC_USDT").unwrap();
            builder
                .build_at(Method::GET, "/api/v4/spot/orders", params, AuthLevel::Signed, now)
                .unwrap()
                .header("SIGN")
                .map(str::to_string)
        };
        assert_eq!(sign(), sign());
    }

    #[test]
    fn test_mexc_sorts_signed_query() {
        let builder = RequestBuilder::new(mexc::REST_URL, creds(None))
            .with_query_order(QueryOrder::Lexicographic)
            .with_body_format(BodyFormat::Query)
            .with_auth_scheme(mexc::auth_scheme());
        let params = Params::new()
            .with("symbol", "BTCUSDT")
            .and_then(|p| p.with("side", "BUY"))
            .and_then(|p| p.with("type", "LIMIT"))
            .unwrap();
        let now = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();

        let request = builder
            .build_at(Method::POST, "/api/v3/order", params, AuthLevel::Signed, now)
            .unwrap();

        let canonical = "recvWindow=6000&side=BUY&symbol=BTCUSDT&timestamp=1700000000000&type=LIMIT";
        assert_eq!(request.canonical_payload().unwrap(), canonical.as_bytes());
        let signature = HmacSigner::sha256_hex()
            .sign(b"secret", canonical.as_bytes())
            .unwrap();
        assert_eq!(
            request.url,
            format!("https://api.mexc.com/api/v3/order?{canonical}&signature={signature}")
        );
        assert_eq!(request.header("X-MEXC-APIKEY"), Some("key"));
        assert!(request.body.is_none());
    }

    #[test]
    fn test_signed_order_end_to_end() {
        let credentials = Arc::new(Credentials::new("K".to_string(), "S".to_string(), None));
        let scheme = AuthScheme::new(
            Arc::new(HmacSigner::sha256_hex()),
            Arc::new(|req: &CanonicalRequest, _: &Credentials| req.query.as_bytes().to_vec()),
            Placement::header("X-API-KEY"),
            Placement::query("signature"),
        )
        .with_timestamp_param("timestamp");
        let builder = RequestBuilder::new("https://api.example.com", credentials)
            .with_auth_scheme(scheme);
        let order = || {
            Params::new()
                .with("symbol", "BTCUSDT")
                .and_then(|p| p.with("side", "BUY"))
                .unwrap()
        };

        let first_at = Utc.timestamp_millis_opt(1_700_000_000_000).unwrap();
        let first = builder
            .build_at(Method::GET, "/order", order(), AuthLevel::Signed, first_at)
            .unwrap();

        let canonical = "symbol=BTCUSDT&side=BUY&timestamp=1700000000000";
        assert_eq!(first.canonical_payload().unwrap(), canonical.as_bytes());
        let signature = HmacSigner::sha256_hex()
            .sign(b"S", canonical.as_bytes())
            .unwrap();
        assert_eq!(first.query_param("signature"), Some(signature.as_str()));
        assert!(first.url.ends_with(&format!("&signature={signature}")));
        assert_eq!(first.header("X-API-KEY"), Some("K"));

        let later_at = Utc.timestamp_millis_opt(1_700_000_001_000).unwrap();
        let later = builder
            .build_at(Method::GET, "/order", order(), AuthLevel::Signed, later_at)
            .unwrap();
        assert_eq!(later.query_param("timestamp"), Some("1700000001000"));
        assert_ne!(later.query_param("signature"), first.query_param("signature"));
    }
}
