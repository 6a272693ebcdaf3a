use crate::core::config::Credentials;
use crate::core::errors::ExchangeError;
use crate::core::kernel::{AuthScheme, CanonicalRequest, HmacSigner, Placement, SigningStrategy};
use crate::core::types::TimestampUnit;
use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use std::sync::Arc;
use tokio_tungstenite::tungstenite::Message;
use zeroize::Zeroizing;

pub const API_KEY_HEADER: &str = "X-BAPI-API-KEY";
pub const SIGN_HEADER: &str = "X-BAPI-SIGN";
pub const TIMESTAMP_HEADER: &str = "X-BAPI-TIMESTAMP";
pub const RECV_WINDOW_HEADER: &str = "X-BAPI-RECV-WINDOW";
pub const SIGN_TYPE_HEADER: &str = "X-BAPI-SIGN-TYPE";
pub const RECV_WINDOW: &str = "5000";

/// v5 prehash: `timestamp + apiKey + recvWindow + (queryString | body)`
pub fn canonicalize(request: &CanonicalRequest, credentials: &Credentials) -> Vec<u8> {
    let mut payload = format!(
        "{}{}{}",
        request.timestamp,
        credentials.api_key(),
        RECV_WINDOW
    )
    .into_bytes();
    payload.extend_from_slice(request.payload());
    payload
}

fn signed_headers(request: &CanonicalRequest, _credentials: &Credentials) -> Vec<(String, String)> {
    vec![
        (TIMESTAMP_HEADER.to_string(), request.timestamp.clone()),
        (RECV_WINDOW_HEADER.to_string(), RECV_WINDOW.to_string()),
        (SIGN_TYPE_HEADER.to_string(), "2".to_string()),
    ]
}

pub fn auth_scheme() -> AuthScheme {
    AuthScheme::new(
        Arc::new(HmacSigner::sha256_hex()),
        Arc::new(canonicalize),
        Placement::header(API_KEY_HEADER),
        Placement::header(SIGN_HEADER),
    )
    .with_timestamp_unit(TimestampUnit::Milliseconds)
    .with_signed_headers(Arc::new(signed_headers))
}

/// Private stream `auth` frame, valid until `now + 10s`
pub fn login_frame(credentials: &Credentials, now: DateTime<Utc>) -> Result<Message, ExchangeError> {
    let expires = (now + Duration::seconds(10)).timestamp_millis();
    let secret = Zeroizing::new(credentials.api_secret().as_bytes().to_vec());
    let signature = HmacSigner::sha256_hex().sign(&secret, format!("GET/realtime{}", expires).as_bytes())?;
    Ok(Message::Text(
        json!({
            "op": "auth",
            "args": [credentials.api_key(), expires, signature]
        })
        .to_string(),
    ))
}
