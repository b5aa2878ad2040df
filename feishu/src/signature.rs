//! Callback request signatures.
//!
//! Feishu signs each callback as
//! `hex(sha256(timestamp + nonce + encrypt_key + body))` and sends the
//! pieces in `X-Lark-Request-Timestamp`, `X-Lark-Request-Nonce` and
//! `X-Lark-Signature`.

use http::HeaderMap;
use sha2::{Digest, Sha256};
use thiserror::Error;

pub const HEADER_TIMESTAMP: &str = "x-lark-request-timestamp";
pub const HEADER_NONCE: &str = "x-lark-request-nonce";
pub const HEADER_SIGNATURE: &str = "x-lark-signature";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SignatureError {
    #[error("feishu: missing signature header {0}")]
    MissingHeader(&'static str),

    #[error("feishu: signature mismatch")]
    Mismatch,
}

/// Check a callback against the app's encrypt key.
///
/// With no key configured (`None` or empty) every request is accepted.
pub fn verify_signature(
    headers: &HeaderMap,
    body: &[u8],
    encrypt_key: Option<&str>,
) -> Result<(), SignatureError> {
    let Some(key) = encrypt_key.filter(|k| !k.is_empty()) else {
        return Ok(());
    };

    let timestamp = header(headers, HEADER_TIMESTAMP)?;
    let nonce = header(headers, HEADER_NONCE)?;
    let signature = header(headers, HEADER_SIGNATURE)?;

    let expected = sign(timestamp, nonce, key, body);
    if constant_time_eq(expected.as_bytes(), signature.to_ascii_lowercase().as_bytes()) {
        Ok(())
    } else {
        Err(SignatureError::Mismatch)
    }
}

/// Hex-encoded SHA-256 over `timestamp + nonce + key + body`.
pub fn sign(timestamp: &str, nonce: &str, key: &str, body: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(timestamp.as_bytes());
    hasher.update(nonce.as_bytes());
    hasher.update(key.as_bytes());
    hasher.update(body);
    hex::encode(hasher.finalize())
}

fn header<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str, SignatureError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .ok_or(SignatureError::MissingHeader(name))
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::HeaderValue;

    const BODY: &[u8] = br#"{"header":{"event_id":"e1"}}"#;

    fn signed_headers(key: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(HEADER_TIMESTAMP, HeaderValue::from_static("1700000000"));
        h.insert(HEADER_NONCE, HeaderValue::from_static("n0nce"));
        let sig = sign("1700000000", "n0nce", key, BODY);
        h.insert(HEADER_SIGNATURE, HeaderValue::from_str(&sig).unwrap());
        h
    }

    #[test]
    fn test_known_digest() {
        // sha256("") with every part empty.
        assert_eq!(
            sign("", "", "", b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_valid_signature() {
        let h = signed_headers("secret");
        assert_eq!(verify_signature(&h, BODY, Some("secret")), Ok(()));
    }

    #[test]
    fn test_tampered_body() {
        let h = signed_headers("secret");
        assert_eq!(
            verify_signature(&h, b"{}", Some("secret")),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_wrong_key() {
        let h = signed_headers("other");
        assert_eq!(
            verify_signature(&h, BODY, Some("secret")),
            Err(SignatureError::Mismatch)
        );
    }

    #[test]
    fn test_missing_header() {
        let mut h = signed_headers("secret");
        h.remove(HEADER_NONCE);
        assert_eq!(
            verify_signature(&h, BODY, Some("secret")),
            Err(SignatureError::MissingHeader(HEADER_NONCE))
        );
    }

    #[test]
    fn test_no_key_accepts_all() {
        assert_eq!(verify_signature(&HeaderMap::new(), BODY, None), Ok(()));
        assert_eq!(verify_signature(&HeaderMap::new(), BODY, Some("")), Ok(()));
    }
}
