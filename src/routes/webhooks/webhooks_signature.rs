//! Verification of provider webhook deliveries.
//!
//! The provider signs `{id}.{timestamp}.{body}` with HMAC-SHA256 using the
//! base64 key carried in a `whsec_` secret. The signature header holds one or
//! more space separated `v1,<base64>` entries; any match accepts the delivery.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::config::ConfigError;
use crate::error::WebhookError;

pub const HEADER_ID: &str = "svix-id";
pub const HEADER_TIMESTAMP: &str = "svix-timestamp";
pub const HEADER_SIGNATURE: &str = "svix-signature";

const SECRET_PREFIX: &str = "whsec_";
const TOLERANCE_SECS: u64 = 5 * 60;

type HmacSha256 = Hmac<Sha256>;

/// The three signature headers of one delivery.
#[derive(Debug, Clone, Copy)]
pub struct SignatureHeaders<'a> {
    pub id: &'a str,
    pub timestamp: &'a str,
    pub signature: &'a str,
}

#[derive(Clone)]
pub struct WebhookVerifier {
    key: Vec<u8>,
}

impl WebhookVerifier {
    pub fn new(secret: &str) -> Result<Self, ConfigError> {
        let encoded = secret.strip_prefix(SECRET_PREFIX).unwrap_or(secret);
        let key = STANDARD.decode(encoded).map_err(|e| ConfigError::Invalid {
            name: "WEBHOOK_SECRET",
            value: e.to_string(),
        })?;
        if key.is_empty() {
            return Err(ConfigError::Invalid {
                name: "WEBHOOK_SECRET",
                value: "empty key".to_string(),
            });
        }
        Ok(Self { key })
    }

    fn sign(&self, id: &str, timestamp: &str, payload: &[u8]) -> Result<Vec<u8>, WebhookError> {
        let mut mac = HmacSha256::new_from_slice(&self.key).map_err(|_| WebhookError::InvalidKey)?;
        mac.update(id.as_bytes());
        mac.update(b".");
        mac.update(timestamp.as_bytes());
        mac.update(b".");
        mac.update(payload);
        Ok(mac.finalize().into_bytes().to_vec())
    }

    /// Returns the `v1,<base64>` signature for a delivery.
    pub fn signature_for(&self, id: &str, timestamp: &str, payload: &[u8]) -> Result<String, WebhookError> {
        Ok(format!("v1,{}", STANDARD.encode(self.sign(id, timestamp, payload)?)))
    }

    /// Checks freshness against `now` (unix seconds), then the signature.
    pub fn verify(&self, headers: SignatureHeaders<'_>, payload: &[u8], now: i64) -> Result<(), WebhookError> {
        let sent_at: i64 = headers
            .timestamp
            .trim()
            .parse()
            .map_err(|_| WebhookError::InvalidTimestamp)?;
        // the header is unauthenticated here, any i64 may arrive
        if now.abs_diff(sent_at) > TOLERANCE_SECS {
            return Err(WebhookError::StaleTimestamp);
        }

        let expected = self.sign(headers.id, headers.timestamp, payload)?;
        let matched = headers
            .signature
            .split_whitespace()
            .filter_map(|entry| entry.split_once(','))
            .filter(|(version, _)| *version == "v1")
            .filter_map(|(_, sig)| STANDARD.decode(sig).ok())
            .any(|candidate| bool::from(candidate.as_slice().ct_eq(expected.as_slice())));

        if matched {
            Ok(())
        } else {
            Err(WebhookError::SignatureMismatch)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_MfKQ9r8GKYqrTwjUPD8ILPZIo2LaLaSw";

    fn headers<'a>(timestamp: &'a str, signature: &'a str) -> SignatureHeaders<'a> {
        SignatureHeaders {
            id: "msg_1",
            timestamp,
            signature,
        }
    }

    #[test]
    fn accepts_a_fresh_valid_signature() {
        let verifier = WebhookVerifier::new(SECRET).unwrap();
        let body = br#"{"type":"organization.created"}"#;
        let sig = verifier.signature_for("msg_1", "1700000000", body).unwrap();

        assert!(verifier.verify(headers("1700000000", &sig), body, 1_700_000_100).is_ok());
        // rotated secrets send several entries
        let several = format!("v1,AAAA {}", sig);
        assert!(verifier.verify(headers("1700000000", &several), body, 1_700_000_000).is_ok());
    }

    #[test]
    fn rejects_tampered_body_and_stale_timestamp() {
        let verifier = WebhookVerifier::new(SECRET).unwrap();
        let sig = verifier.signature_for("msg_1", "1700000000", b"{}").unwrap();

        assert!(matches!(
            verifier.verify(headers("1700000000", &sig), b"{ }", 1_700_000_000),
            Err(WebhookError::SignatureMismatch)
        ));
        assert!(verifier.verify(headers("1700000000", &sig), b"{}", 1_700_000_301).is_err());
        assert!(matches!(
            verifier.verify(headers("soon", &sig), b"{}", 1_700_000_000),
            Err(WebhookError::InvalidTimestamp)
        ));
    }

    #[test]
    fn extreme_timestamps_are_stale() {
        let verifier = WebhookVerifier::new(SECRET).unwrap();
        let sig = verifier.signature_for("msg_1", "1700000000", b"{}").unwrap();

        for timestamp in ["-9223372036854775808", "9223372036854775807"] {
            assert!(matches!(
                verifier.verify(headers(timestamp, &sig), b"{}", 1_700_000_000),
                Err(WebhookError::StaleTimestamp)
            ));
        }
        assert!(matches!(
            verifier.verify(headers("0", &sig), b"{}", i64::MIN),
            Err(WebhookError::StaleTimestamp)
        ));
    }

    #[test]
    fn rejects_malformed_secrets() {
        assert!(WebhookVerifier::new("whsec_***").is_err());
        assert!(WebhookVerifier::new("whsec_").is_err());
    }
}
