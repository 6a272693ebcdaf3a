use crate::core::config::Credentials;
use crate::core::errors::ExchangeError;
use crate::core::kernel::{AuthScheme, CanonicalRequest, HmacSigner, Placement, SigningStrategy};
use crate::core::types::TimestampUnit;
use serde_json::json;
use std::sync::Arc;
use tokio_tungstenite::tungstenite::Message;
use zeroize::Zeroizing;

pub const API_KEY_HEADER: &str = "X-BM-KEY";
pub const SIGN_HEADER: &str = "X-BM-SIGN";
pub const TIMESTAMP_HEADER: &str = "X-BM-TIMESTAMP";

fn memo(credentials: &Credentials) -> &str {
    credentials.passphrase().unwrap_or_default()
}

/// `timestamp#memo#payload`, payload being the JSON body or the query string
pub fn canonicalize(request: &CanonicalRequest, credentials: &Credentials) -> Vec<u8> {
    let mut payload = format!("{}#{}#", request.timestamp, memo(credentials)).into_bytes();
    payload.extend_from_slice(request.payload());
    payload
}

fn signed_headers(request: &CanonicalRequest, _credentials: &Credentials) -> Vec<(String, String)> {
    vec![(TIMESTAMP_HEADER.to_string(), request.timestamp.clone())]
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

/// Stream login signature over `timestamp#memo#bitmart.WebSocket`
pub fn stream_signature(credentials: &Credentials, timestamp: &str) -> Result<String, ExchangeError> {
    let secret = Zeroizing::new(credentials.api_secret().as_bytes().to_vec());
    let message = format!("{}#{}#bitmart.WebSocket", timestamp, memo(credentials));
    HmacSigner::sha256_hex().sign(&secret, message.as_bytes())
}

/// Private channel `login` frame
pub fn login_frame(credentials: &Credentials, timestamp: &str) -> Result<Message, ExchangeError> {
    let signature = stream_signature(credentials, timestamp)?;
    Ok(Message::Text(
        json!({
            "op": "login",
            "args": [credentials.api_key(), timestamp, signature]
        })
        .to_string(),
    ))
}
