use crate::core::config::Credentials;
use crate::core::errors::ExchangeError;
use crate::core::kernel::{AuthScheme, CanonicalRequest, HmacSigner, Placement, SigningStrategy};
use crate::core::types::TimestampUnit;
use chrono::{DateTime, Utc};
use serde_json::json;
use std::sync::Arc;
use tokio_tungstenite::tungstenite::Message;
use zeroize::Zeroizing;

pub const API_KEY_HEADER: &str = "OK-ACCESS-KEY";
pub const SIGN_HEADER: &str = "OK-ACCESS-SIGN";
pub const TIMESTAMP_HEADER: &str = "OK-ACCESS-TIMESTAMP";
pub const PASSPHRASE_HEADER: &str = "OK-ACCESS-PASSPHRASE";

/// Prehash: `timestamp + METHOD + requestPath[?query] + body`
pub fn canonicalize(request: &CanonicalRequest, _credentials: &Credentials) -> Vec<u8> {
    let mut payload = format!(
        "{}{}{}",
        request.timestamp,
        request.method.as_str(),
        request.path_with_query()
    )
    .into_bytes();
    payload.extend_from_slice(&request.body);
    payload
}

fn signed_headers(request: &CanonicalRequest, credentials: &Credentials) -> Vec<(String, String)> {
    let mut headers = vec![(TIMESTAMP_HEADER.to_string(), request.timestamp.clone())];
    if let Some(passphrase) = credentials.passphrase() {
        headers.push((PASSPHRASE_HEADER.to_string(), passphrase.to_string()));
    }
    headers
}

/// HMAC-SHA256, base64 encoded, ISO-8601 millisecond timestamps
pub fn auth_scheme() -> AuthScheme {
    AuthScheme::new(
        Arc::new(HmacSigner::sha256_base64()),
        Arc::new(canonicalize),
        Placement::header(API_KEY_HEADER),
        Placement::header(SIGN_HEADER),
    )
    .with_timestamp_unit(TimestampUnit::Iso8601)
    .with_signed_headers(Arc::new(signed_headers))
}

/// Private channel `login` frame signed over `timestamp + "GET/users/self/verify"`
pub fn login_frame(credentials: &Credentials, now: DateTime<Utc>) -> Result<Message, ExchangeError> {
    let timestamp = TimestampUnit::Seconds.format(now);
    let secret = Zeroizing::new(credentials.api_secret().as_bytes().to_vec());
    let signature = HmacSigner::sha256_base64().sign(
        &secret,
        format!("{}GET/users/self/verify", timestamp).as_bytes(),
    )?;
    Ok(Message::Text(
        json!({
            "op": "login",
            "args": [{
                "apiKey": credentials.api_key(),
                "passphrase": credentials.passphrase().unwrap_or_default(),
                "timestamp": timestamp,
                "sign": signature
            }]
        })
        .to_string(),
    ))
}
