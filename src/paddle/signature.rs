//! Paddle webhook signature verification
//!
//! Paddle signs every notification with the `Paddle-Signature` header:
//!
//! ```text
//! Paddle-Signature: ts=1671552777;h1=eb4d0dc8853be92b7f063b9f3ba5233eb920a09459b6e6b2c26705b4364db151
//! ```
//!
//! `h1` is the hex HMAC-SHA256 of `"{ts}:{raw body}"` keyed with the
//! notification destination's secret. Several `h1` values may be present while
//! a secret is being rotated; any match is accepted.

use std::time::Duration;

use hmac::{Hmac, Mac};
use sha2::Sha256;

use crate::error::SignatureError;

type HmacSha256 = Hmac<Sha256>;

/// Canonical header name
pub const SIGNATURE_HEADER: &str = "paddle-signature";

/// Header name used by some proxies and older integrations
pub const LEGACY_SIGNATURE_HEADER: &str = "x-paddle-signature";

/// Verifies (and, for test senders, produces) Paddle signature headers.
#[derive(Clone)]
pub struct SignatureVerifier {
    secret: String,
    max_variance: Duration,
}

impl std::fmt::Debug for SignatureVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignatureVerifier")
            .field("secret", &"<redacted>")
            .field("max_variance", &self.max_variance)
            .finish()
    }
}

/// Parsed `ts=...;h1=...` header
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureHeader {
    /// Unix timestamp the sender signed at
    pub timestamp: i64,
    /// `ts` exactly as sent; this text is what the digest covers
    pub raw_timestamp: String,
    /// Candidate hex digests
    pub signatures: Vec<String>,
}

impl SignatureHeader {
    /// Parse a raw header value.
    pub fn parse(header: &str) -> Result<Self, SignatureError> {
        let mut timestamp = None;
        let mut raw_timestamp = String::new();
        let mut signatures = Vec::new();

        for part in header.split(';') {
            let (key, value) = part
                .trim()
                .split_once('=')
                .ok_or(SignatureError::InvalidFormat)?;
            match key {
                "ts" => {
                    timestamp = Some(
                        value
                            .parse::<i64>()
                            .map_err(|_| SignatureError::InvalidFormat)?,
                    );
                    raw_timestamp = value.to_string();
                }
                "h1" => signatures.push(value.to_string()),
                // unknown schemes are ignored
                _ => {}
            }
        }

        let timestamp = timestamp.ok_or(SignatureError::InvalidFormat)?;
        if signatures.is_empty() {
            return Err(SignatureError::InvalidFormat);
        }

        Ok(Self {
            timestamp,
            raw_timestamp,
            signatures,
        })
    }
}

impl SignatureVerifier {
    /// Create a verifier for the given secret and allowed clock drift.
    ///
    /// A zero `max_variance` disables the timestamp check.
    pub fn new(secret: impl Into<String>, max_variance: Duration) -> Self {
        Self {
            secret: secret.into(),
            max_variance,
        }
    }

    fn mac(&self, timestamp: &str, payload: &[u8]) -> HmacSha256 {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(timestamp.as_bytes());
        mac.update(b":");
        mac.update(payload);
        mac
    }

    /// Hex digest for a timestamp and body.
    pub fn sign(&self, timestamp: i64, payload: &[u8]) -> String {
        hex::encode(self.mac(&timestamp.to_string(), payload).finalize().into_bytes())
    }

    /// Full header value for a timestamp and body.
    pub fn sign_header(&self, timestamp: i64, payload: &[u8]) -> String {
        format!("ts={};h1={}", timestamp, self.sign(timestamp, payload))
    }

    /// Verify a header value against the raw body, using the current time.
    pub fn verify(&self, header: Option<&str>, payload: &[u8]) -> Result<(), SignatureError> {
        self.verify_at(header, payload, chrono::Utc::now().timestamp())
    }

    /// Verify a header value against the raw body at a given time.
    pub fn verify_at(
        &self,
        header: Option<&str>,
        payload: &[u8],
        now: i64,
    ) -> Result<(), SignatureError> {
        let header = header
            .map(str::trim)
            .filter(|h| !h.is_empty())
            .ok_or(SignatureError::Missing)?;
        let parsed = SignatureHeader::parse(header)?;

        let variance = self.max_variance.as_secs() as i64;
        if variance > 0 && now.saturating_sub(parsed.timestamp) > variance {
            return Err(SignatureError::Expired);
        }

        let matched = parsed.signatures.iter().any(|candidate| {
            hex::decode(candidate)
                .map(|bytes| self.mac(&parsed.raw_timestamp, payload).verify_slice(&bytes).is_ok())
                .unwrap_or(false)
        });

        if matched {
            Ok(())
        } else {
            Err(SignatureError::Invalid)
        }
    }
}
