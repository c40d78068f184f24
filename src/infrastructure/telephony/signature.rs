//! Webhook request signatures
//!
//! The provider signs every webhook with HMAC-SHA1 keyed by the account auth
//! token, over the full request URL followed by the POST parameters sorted by
//! name and concatenated as name+value.

use crate::domain::shared::{DomainError, Result};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use std::collections::BTreeMap;

type HmacSha1 = Hmac<Sha1>;

/// Header carrying the signature
pub const SIGNATURE_HEADER: &str = "x-twilio-signature";

fn signing_mac(auth_token: &str, url: &str, params: &BTreeMap<String, String>) -> Result<HmacSha1> {
    let mut mac = HmacSha1::new_from_slice(auth_token.as_bytes())
        .map_err(|e| DomainError::Internal(format!("invalid signing key: {}", e)))?;

    mac.update(url.as_bytes());
    for (name, value) in params {
        mac.update(name.as_bytes());
        mac.update(value.as_bytes());
    }
    Ok(mac)
}

/// Base64 signature of a request
pub fn compute_signature(
    auth_token: &str,
    url: &str,
    params: &BTreeMap<String, String>,
) -> Result<String> {
    let mac = signing_mac(auth_token, url, params)?;
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Constant-time check of a received signature
pub fn verify_signature(
    auth_token: &str,
    url: &str,
    params: &BTreeMap<String, String>,
    signature: &str,
) -> bool {
    let Ok(expected) = STANDARD.decode(signature.trim()) else {
        return false;
    };

    match signing_mac(auth_token, url, params) {
        Ok(mac) => mac.verify_slice(&expected).is_ok(),
        Err(_) => false,
    }
}

/// Checks signatures of webhooks addressed to this service
#[derive(Debug, Clone)]
pub struct WebhookVerifier {
    auth_token: String,
    public_base_url: String,
}

impl WebhookVerifier {
    pub fn new(auth_token: &str, public_base_url: &str) -> Self {
        Self {
            auth_token: auth_token.to_string(),
            public_base_url: public_base_url.trim_end_matches('/').to_string(),
        }
    }

    /// The provider signs the public URL, not the one we were reached on
    pub fn public_url(&self, path_and_query: &str) -> String {
        format!("{}{}", self.public_base_url, path_and_query)
    }

    pub fn verify(
        &self,
        path_and_query: &str,
        params: &BTreeMap<String, String>,
        signature: Option<&str>,
    ) -> bool {
        match signature {
            Some(signature) => verify_signature(
                &self.auth_token,
                &self.public_url(path_and_query),
                params,
                signature,
            ),
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> BTreeMap<String, String> {
        let mut params = BTreeMap::new();
        params.insert("To".to_string(), "+4930123456".to_string());
        params.insert("From".to_string(), "+4917000000".to_string());
        params.insert("CallSid".to_string(), "CA123".to_string());
        params
    }

    #[test]
    fn test_signature_round_trip() {
        let url = "https://calls.example.com/twilio/inbound";
        let signature = compute_signature("token", url, &params()).unwrap();

        assert!(verify_signature("token", url, &params(), &signature));
    }

    #[test]
    fn test_tampered_request_rejected() {
        let url = "https://calls.example.com/twilio/inbound";
        let signature = compute_signature("token", url, &params()).unwrap();

        let mut tampered = params();
        tampered.insert("To".to_string(), "+4930000000".to_string());

        assert!(!verify_signature("token", url, &tampered, &signature));
        assert!(!verify_signature("other-token", url, &params(), &signature));
        assert!(!verify_signature("token", "https://evil.example.com", &params(), &signature));
        assert!(!verify_signature("token", url, &params(), "not base64!"));
    }

    #[test]
    fn test_verifier_signs_public_url() {
        let verifier = WebhookVerifier::new("token", "https://calls.example.com/");
        let signature = compute_signature(
            "token",
            "https://calls.example.com/twilio/voice?sessionId=abc",
            &params(),
        )
        .unwrap();

        assert!(verifier.verify("/twilio/voice?sessionId=abc", &params(), Some(&signature)));
        assert!(!verifier.verify("/twilio/voice?sessionId=xyz", &params(), Some(&signature)));
        assert!(!verifier.verify("/twilio/voice?sessionId=abc", &params(), None));
    }

    #[test]
    fn test_parameter_order_is_canonical() {
        let url = "https://calls.example.com/twilio/status";
        let mut reversed = BTreeMap::new();
        for (k, v) in params().into_iter().rev() {
            reversed.insert(k, v);
        }

        assert_eq!(
            compute_signature("token", url, &params()).unwrap(),
            compute_signature("token", url, &reversed).unwrap()
        );
    }
}
