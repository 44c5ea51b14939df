//! Signed token framing.
//!
//! ```text
//! base64url(header_json) "." base64url(payload_json) "." base64url(hmac_sha256)
//! ```
//!
//! The MAC covers the first two segments exactly as they appear on the wire,
//! joined by `.`. All segments use the URL-safe alphabet without padding.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;
use thiserror::Error;

use shared::types::{Claims, TokenHeader};

use crate::token::key::SigningKey;

type HmacSha256 = Hmac<Sha256>;

#[derive(Error, Debug)]
pub enum CodecError {
    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("invalid token signature")]
    InvalidSignature,

    /// Serializing a fixed-shape value failed. Treat as an internal error.
    #[error("failed to serialize token segment: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Output of [`encode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedToken {
    pub header: String,
    pub payload: String,
    pub signature: String,
    /// `header.payload.signature`
    pub token: String,
}

pub fn encode(key: &SigningKey, claims: &Claims) -> Result<EncodedToken, CodecError> {
    let header = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&TokenHeader::HS256)?);
    let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims)?);

    let signature = sign(key, &header, &payload);
    let token = format!("{}.{}.{}", header, payload, signature);

    Ok(EncodedToken {
        header,
        payload,
        signature,
        token,
    })
}

/// Recompute the signature over `header.payload` and compare it with the
/// supplied one in constant time.
pub fn verify(
    key: &SigningKey,
    header: &str,
    payload: &str,
    signature: &str,
) -> Result<(), CodecError> {
    let expected = sign(key, header, payload);

    if expected.as_bytes().ct_eq(signature.as_bytes()).into() {
        Ok(())
    } else {
        Err(CodecError::InvalidSignature)
    }
}

/// Structural decode of the payload segment. Does not look at the signature
/// or the expiry.
pub fn decode(payload: &str) -> Result<Claims, CodecError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| CodecError::MalformedPayload(e.to_string()))?;

    serde_json::from_slice(&bytes).map_err(|e| CodecError::MalformedPayload(e.to_string()))
}

fn sign(key: &SigningKey, header: &str, payload: &str) -> String {
    let mut mac = HmacSha256::new_from_slice(key.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC accepts keys of any length"));
    mac.update(header.as_bytes());
    mac.update(b".");
    mac.update(payload.as_bytes());

    URL_SAFE_NO_PAD.encode(mac.finalize().into_bytes())
}
