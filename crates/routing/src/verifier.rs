//! Webhook authenticity checks.
//!
//! Two independent mechanisms, either or both of which may be configured:
//!
//! - an HMAC-SHA256 signature over the raw body, sent hex-encoded in the
//!   `linear-signature` header;
//! - a static bearer token in the `Authorization` header.
//!
//! Both comparisons run in constant time. Verification is pure and
//! synchronous; callers map a `false` result onto an authentication failure.

use hmac::{Hmac, Mac};
use secrecy::{ExposeSecret, SecretString};
use sha2::Sha256;
use tracing::{debug, warn};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the hex-encoded body signature.
pub const SIGNATURE_HEADER: &str = "linear-signature";

/// Computes the lowercase hex HMAC-SHA256 of `body` keyed by `secret`.
pub fn signature_hex(secret: &str, body: &[u8]) -> Option<String> {
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(m) => m,
        Err(_) => {
            warn!("failed to create HMAC");
            return None;
        }
    };
    mac.update(body);
    Some(hex::encode(mac.finalize().into_bytes()))
}

/// Verifies a body signature.
///
/// An unset `secret` skips verification and returns `true`: running without a
/// signing secret is an explicit operator choice. With a secret configured, a
/// missing or mismatching signature returns `false`.
pub fn verify_signature(secret: Option<&str>, raw_body: &[u8], provided_hex: Option<&str>) -> bool {
    let Some(secret) = secret else {
        debug!("no webhook secret configured, skipping signature verification");
        return true;
    };

    let Some(provided) = provided_hex else {
        warn!("missing {SIGNATURE_HEADER} header");
        return false;
    };

    let Some(expected) = signature_hex(secret, raw_body) else {
        return false;
    };

    if !constant_time_eq(expected.as_bytes(), provided.trim().as_bytes()) {
        warn!("invalid webhook signature");
        return false;
    }
    true
}

/// Verifies an `Authorization` header against the configured token.
///
/// The header must be exactly two whitespace-separated parts, the first of
/// which is `Bearer` in any letter case.
pub fn verify_bearer_token(configured_token: &str, header_value: Option<&str>) -> bool {
    let Some(header) = header_value else {
        warn!("missing Authorization header");
        return false;
    };

    let parts: Vec<&str> = header.split_whitespace().collect();
    let [scheme, token] = parts.as_slice() else {
        warn!("invalid Authorization header format");
        return false;
    };
    if !scheme.eq_ignore_ascii_case("bearer") {
        warn!("invalid Authorization header format");
        return false;
    }

    if !constant_time_eq(token.as_bytes(), configured_token.as_bytes()) {
        warn!("invalid bearer token");
        return false;
    }
    true
}

/// Constant-time byte comparison.
///
/// The length check short-circuits; only the content comparison is
/// timing-independent.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b.iter()).fold(0, |acc, (x, y)| acc | (x ^ y)) == 0
}

// ---------------------------------------------------------------------------
// Configured verifier
// ---------------------------------------------------------------------------

/// The webhook endpoint's verification policy, built once from configuration.
pub struct WebhookVerifier {
    signing_secret: Option<SecretString>,
    bearer_token: Option<SecretString>,
}

impl WebhookVerifier {
    /// Builds a verifier. Empty strings count as unset.
    pub fn new(signing_secret: Option<String>, bearer_token: Option<String>) -> Self {
        Self {
            signing_secret: signing_secret
                .filter(|s| !s.is_empty())
                .map(SecretString::new),
            bearer_token: bearer_token.filter(|t| !t.is_empty()).map(SecretString::new),
        }
    }

    /// Returns `true` when a bearer token is configured.
    pub fn requires_bearer(&self) -> bool {
        self.bearer_token.is_some()
    }

    /// Returns `true` when a signing secret is configured.
    pub fn requires_signature(&self) -> bool {
        self.signing_secret.is_some()
    }

    /// Checks the `Authorization` header. Passes when no token is configured.
    pub fn check_bearer(&self, header_value: Option<&str>) -> bool {
        match &self.bearer_token {
            Some(token) => verify_bearer_token(token.expose_secret(), header_value),
            None => {
                debug!("no bearer token configured, skipping verification");
                true
            }
        }
    }

    /// Checks the body signature. Passes when no secret is configured.
    pub fn check_signature(&self, raw_body: &[u8], provided_hex: Option<&str>) -> bool {
        verify_signature(
            self.signing_secret.as_ref().map(|s| s.expose_secret().as_str()),
            raw_body,
            provided_hex,
        )
    }
}

impl std::fmt::Debug for WebhookVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookVerifier")
            .field("signature", &self.requires_signature())
            .field("bearer", &self.requires_bearer())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SECRET: &str = "whsec_test";
    const BODY: &[u8] = br#"{"action":"update","type":"Issue"}"#;

    #[test]
    fn valid_signature_is_accepted() {
        let sig = signature_hex(SECRET, BODY).expect("hmac");
        assert!(verify_signature(Some(SECRET), BODY, Some(&sig)));
    }

    #[test]
    fn flipping_a_body_byte_invalidates_the_signature() {
        let sig = signature_hex(SECRET, BODY).expect("hmac");
        for i in 0..BODY.len() {
            let mut tampered = BODY.to_vec();
            tampered[i] ^= 0x01;
            assert!(!verify_signature(Some(SECRET), &tampered, Some(&sig)), "byte {i}");
        }
    }

    #[test]
    fn flipping_a_signature_character_invalidates_it() {
        let sig = signature_hex(SECRET, BODY).expect("hmac");
        for i in 0..sig.len() {
            let mut chars: Vec<char> = sig.chars().collect();
            chars[i] = if chars[i] == '0' { '1' } else { '0' };
            let tampered: String = chars.into_iter().collect();
            assert!(!verify_signature(Some(SECRET), BODY, Some(&tampered)), "position {i}");
        }
    }

    #[test]
    fn missing_signature_fails_only_when_secret_is_set() {
        assert!(!verify_signature(Some(SECRET), BODY, None));
        assert!(verify_signature(None, BODY, None));
        assert!(verify_signature(None, BODY, Some("garbage")));
    }

    #[test]
    fn bearer_scheme_is_case_insensitive() {
        assert!(verify_bearer_token("tok123", Some("Bearer tok123")));
        assert!(verify_bearer_token("tok123", Some("bearer tok123")));
        assert!(verify_bearer_token("tok123", Some("BEARER tok123")));
    }

    #[test]
    fn malformed_bearer_headers_are_rejected() {
        assert!(!verify_bearer_token("tok123", None));
        assert!(!verify_bearer_token("tok123", Some("tok123")));
        assert!(!verify_bearer_token("tok123", Some("Basic tok123")));
        assert!(!verify_bearer_token("tok123", Some("Bearer tok123 extra")));
        assert!(!verify_bearer_token("tok123", Some("Bearer")));
        assert!(!verify_bearer_token("tok123", Some("Bearer tok124")));
    }

    #[test]
    fn verifier_without_configuration_is_open() {
        let verifier = WebhookVerifier::new(Some(String::new()), None);
        assert!(!verifier.requires_signature());
        assert!(!verifier.requires_bearer());
        assert!(verifier.check_bearer(None));
        assert!(verifier.check_signature(BODY, None));
    }

    #[test]
    fn verifier_debug_output_hides_secrets() {
        let verifier = WebhookVerifier::new(Some(SECRET.into()), Some("tok123".into()));
        let rendered = format!("{verifier:?}");
        assert!(!rendered.contains(SECRET));
        assert!(!rendered.contains("tok123"));
    }

    #[test]
    fn constant_time_eq_matches_plain_equality() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
        assert!(!constant_time_eq(b"", b"a"));
    }
}
