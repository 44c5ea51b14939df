use hyper::header::{AUTHORIZATION, HeaderMap, HeaderValue};
use tracing::debug;

use shared::types::{Claims, Denial};

use crate::token;

const BEARER_PREFIX: &str = "Bearer ";

/// The three segments of a bearer token, borrowed from the header value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenParts<'a> {
    pub header: &'a str,
    pub payload: &'a str,
    pub signature: &'a str,
}

impl<'a> TokenParts<'a> {
    /// Split `header.payload.signature`; anything but three segments is
    /// malformed.
    pub fn split(token: &'a str) -> Result<Self, Denial> {
        let mut parts = token.split('.');
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(header), Some(payload), Some(signature), None) => Ok(Self {
                header,
                payload,
                signature,
            }),
            _ => Err(Denial::MalformedCredential),
        }
    }
}

/// Fetch the raw `Authorization` header, if any.
pub fn authorization_header(headers: &HeaderMap) -> Option<&HeaderValue> {
    headers.get(AUTHORIZATION)
}

/// Strip the `Bearer ` scheme from an Authorization header value.
///
/// An absent or empty header is a missing credential; anything present but
/// unreadable or using another scheme is malformed.
pub fn bearer_token(value: Option<&HeaderValue>) -> Result<&str, Denial> {
    let value = match value {
        Some(v) if !v.is_empty() => v,
        _ => return Err(Denial::MissingCredential),
    };

    let value = value.to_str().map_err(|_| {
        debug!("Authorization header is not visible ASCII");
        Denial::MalformedCredential
    })?;

    value
        .strip_prefix(BEARER_PREFIX)
        .ok_or(Denial::MalformedCredential)
}

/// Decode the claims of a bearer header without verifying anything beyond
/// structure.
///
/// Only for handlers that already sit behind the gate and need the subject
/// or the shop/company scope of the caller.
pub fn peek_claims(value: Option<&HeaderValue>) -> Result<Claims, Denial> {
    let token = bearer_token(value)?;
    let parts = TokenParts::split(token)?;
    token::decode(parts.payload).map_err(|_| Denial::MalformedCredential)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hv(s: &str) -> HeaderValue {
        HeaderValue::from_str(s).unwrap()
    }

    #[test]
    fn missing_and_empty_headers_are_missing() {
        assert_eq!(bearer_token(None), Err(Denial::MissingCredential));
        assert_eq!(
            bearer_token(Some(&HeaderValue::from_static(""))),
            Err(Denial::MissingCredential)
        );
    }

    #[test]
    fn other_schemes_are_malformed() {
        assert_eq!(
            bearer_token(Some(&hv("Basic dXNlcjpwYXNz"))),
            Err(Denial::MalformedCredential)
        );
        assert_eq!(
            bearer_token(Some(&hv("bearer abc"))),
            Err(Denial::MalformedCredential)
        );
        assert_eq!(bearer_token(Some(&hv("Bearer"))), Err(Denial::MalformedCredential));
    }

    #[test]
    fn non_ascii_header_is_malformed() {
        let value = HeaderValue::from_bytes(b"Bearer \xffabc").unwrap();
        assert_eq!(bearer_token(Some(&value)), Err(Denial::MalformedCredential));
    }

    #[test]
    fn bearer_prefix_is_stripped() {
        assert_eq!(bearer_token(Some(&hv("Bearer a.b.c"))), Ok("a.b.c"));
    }

    #[test]
    fn split_requires_exactly_three_segments() {
        assert!(TokenParts::split("a.b.c").is_ok());
        assert_eq!(TokenParts::split("a.b"), Err(Denial::MalformedCredential));
        assert_eq!(TokenParts::split("a.b.c.d"), Err(Denial::MalformedCredential));
        assert_eq!(TokenParts::split("abc"), Err(Denial::MalformedCredential));
    }

    #[test]
    fn split_keeps_empty_segments() {
        let parts = TokenParts::split("..").unwrap();
        assert_eq!(parts.header, "");
        assert_eq!(parts.payload, "");
        assert_eq!(parts.signature, "");
    }

    #[test]
    fn peek_rejects_garbage_payload() {
        assert_eq!(
            peek_claims(Some(&hv("Bearer invalid.token.value"))),
            Err(Denial::MalformedCredential)
        );
    }
}
