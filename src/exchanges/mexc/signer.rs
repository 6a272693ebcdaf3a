use crate::core::config::Credentials;
use crate::core::kernel::{AuthScheme, CanonicalRequest, HmacSigner, Placement};
use crate::core::types::TimestampUnit;
use std::sync::Arc;

pub const API_KEY_HEADER: &str = "X-MEXC-APIKEY";
pub const RECV_WINDOW: u64 = 6000;

/// MEXC signs the sorted query string (plus any body) with HMAC-SHA256, hex
/// encoded
pub fn canonicalize(request: &CanonicalRequest, _credentials: &Credentials) -> Vec<u8> {
    let mut payload = request.query.as_bytes().to_vec();
    payload.extend_from_slice(&request.body);
    payload
}

pub fn auth_scheme() -> AuthScheme {
    AuthScheme::new(
        Arc::new(HmacSigner::sha256_hex()),
        Arc::new(canonicalize),
        Placement::header(API_KEY_HEADER),
        Placement::query("signature"),
    )
    .with_timestamp_unit(TimestampUnit::Milliseconds)
    .with_signed_param("recvWindow", RECV_WINDOW)
    .with_timestamp_param("timestamp")
}
