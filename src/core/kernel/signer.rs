use crate::core::errors::ExchangeError;
use base64::engine::general_purpose;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::{Sha256, Sha512};

/// Signing strategy for request authentication
///
/// A pure function of the secret and the canonical bytes. Venues differ in
/// hash function and output encoding but never in this contract; how the
/// canonical bytes are built is supplied separately, see
/// [`Canonicalizer`](super::request::Canonicalizer).
pub trait SigningStrategy: Send + Sync {
    /// Sign `message` with `secret`
    ///
    /// Deterministic: identical inputs always yield identical output.
    fn sign(&self, secret: &[u8], message: &[u8]) -> Result<String, ExchangeError>;
}

/// Hash function behind an HMAC signer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HmacAlgorithm {
    Sha256,
    Sha512,
}

/// Text encoding of the raw MAC bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignatureEncoding {
    #[default]
    Hex,
    Base64,
}

/// HMAC-based signer
#[derive(Debug, Clone, Copy)]
pub struct HmacSigner {
    algorithm: HmacAlgorithm,
    encoding: SignatureEncoding,
}

impl HmacSigner {
    pub const fn new(algorithm: HmacAlgorithm, encoding: SignatureEncoding) -> Self {
        Self {
            algorithm,
            encoding,
        }
    }

    /// HMAC-SHA256, hex encoded (Binance, Bybit, Bitmart, MEXC)
    pub const fn sha256_hex() -> Self {
        Self::new(HmacAlgorithm::Sha256, SignatureEncoding::Hex)
    }

    /// HMAC-SHA256, base64 encoded (OKX)
    pub const fn sha256_base64() -> Self {
        Self::new(HmacAlgorithm::Sha256, SignatureEncoding::Base64)
    }

    /// HMAC-SHA512, hex encoded (Gate)
    pub const fn sha512_hex() -> Self {
        Self::new(HmacAlgorithm::Sha512, SignatureEncoding::Hex)
    }

    pub const fn algorithm(&self) -> HmacAlgorithm {
        self.algorithm
    }

    fn mac_bytes(&self, secret: &[u8], message: &[u8]) -> Result<Vec<u8>, ExchangeError> {
        // HMAC accepts keys of any length, the error arm is unreachable in practice
        match self.algorithm {
            HmacAlgorithm::Sha256 => {
                let mut mac = Hmac::<Sha256>::new_from_slice(secret)
                    .map_err(|e| ExchangeError::AuthError(format!("Invalid secret key: {}", e)))?;
                mac.update(message);
                Ok(mac.finalize().into_bytes().to_vec())
            }
            HmacAlgorithm::Sha512 => {
                let mut mac = Hmac::<Sha512>::new_from_slice(secret)
                    .map_err(|e| ExchangeError::AuthError(format!("Invalid secret key: {}", e)))?;
                mac.update(message);
                Ok(mac.finalize().into_bytes().to_vec())
            }
        }
    }
}

impl SigningStrategy for HmacSigner {
    fn sign(&self, secret: &[u8], message: &[u8]) -> Result<String, ExchangeError> {
        let bytes = self.mac_bytes(secret, message)?;
        Ok(match self.encoding {
            SignatureEncoding::Hex => hex::encode(bytes),
            SignatureEncoding::Base64 => general_purpose::STANDARD.encode(bytes),
        })
    }
}
