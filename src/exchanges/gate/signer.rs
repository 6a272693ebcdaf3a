use crate::core::config::Credentials;
use crate::core::errors::ExchangeError;
use crate::core::kernel::{AuthScheme, CanonicalRequest, HmacSigner, Placement, SigningStrategy};
use crate::core::types::TimestampUnit;
use serde_json::json;
use sha2::{Digest, Sha512};
use std::sync::Arc;
use tokio_tungstenite::tungstenite::Message;
use zeroize::Zeroizing;

pub const KEY_HEADER: &str = "KEY";
pub const SIGN_HEADER: &str = "SIGN";
pub const TIMESTAMP_HEADER: &str = "Timestamp";

/// `METHOD\npath\nquery\nhex(sha512(body))\ntimestamp`
pub fn canonicalize(request: &CanonicalRequest, _credentials: &Credentials) -> Vec<u8> {
    let body_hash = hex::encode(Sha512::digest(&request.body));
    format!(
        "{}\n{}\n{}\n{}\n{}",
        request.method.as_str(),
        request.path,
        request.query,
        body_hash,
        request.timestamp
    )
    .into_bytes()
}

fn signed_headers(request: &CanonicalRequest, _credentials: &Credentials) -> Vec<(String, String)> {
    vec![(TIMESTAMP_HEADER.to_string(), request.timestamp.clone())]
}

/// HMAC-SHA512, hex encoded, timestamps in seconds
pub fn auth_scheme() -> AuthScheme {
    AuthScheme::new(
        Arc::new(HmacSigner::sha512_hex()),
        Arc::new(canonicalize),
        Placement::header(KEY_HEADER),
        Placement::header(SIGN_HEADER),
    )
    .with_timestamp_unit(TimestampUnit::Seconds)
    .with_signed_headers(Arc::new(signed_headers))
}

/// Subscribe frame for a private channel, authenticated inline
///
/// Gate has no login step; each private subscription carries an `auth`
/// object signed over `channel=<c>&event=<e>&time=<t>`.
pub fn private_subscription(
    credentials: &Credentials,
    channel: &str,
    payload: &[&str],
    time: i64,
) -> Result<Message, ExchangeError> {
    let event = "subscribe";
    let secret = Zeroizing::new(credentials.api_secret().as_bytes().to_vec());
    let message = format!("channel={}&event={}&time={}", channel, event, time);
    let signature = HmacSigner::sha512_hex().sign(&secret, message.as_bytes())?;

    Ok(Message::Text(
        json!({
            "time": time,
            "channel": channel,
            "event": event,
            "payload": payload,
            "auth": {
                "method": "api_key",
                "KEY": credentials.api_key(),
                "SIGN": signature
            }
        })
        .to_string(),
    ))
}
