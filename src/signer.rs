use hmac::{Hmac, Mac};
use reqwest::Method;
use reqwest::header::{HeaderMap, HeaderValue};
use sha2::Sha256;

use crate::credentials::Credentials;
use crate::error::ApiError;

type HmacSha256 = Hmac<Sha256>;

pub(crate) const KEY_HEADER: &str = "FTX-KEY";
pub(crate) const SIGN_HEADER: &str = "FTX-SIGN";
pub(crate) const TS_HEADER: &str = "FTX-TS";
pub(crate) const SUBACCOUNT_HEADER: &str = "FTX-SUBACCOUNT";

/// Computes the authentication headers for one outgoing request.
///
/// Pure: the timestamp is passed in by the caller, so identical inputs
/// always produce an identical signature.
pub struct Signer {
    credentials: Credentials,
}

impl Signer {
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }

    /// HMAC-SHA256 over `timestamp + method + path?query + body`, no
    /// separators, keyed by the raw secret bytes, lower-case hex.
    fn signature(
        &self,
        method: &Method,
        request_path: &str,
        body: &[u8],
        timestamp_ms: i64,
    ) -> String {
        let mut mac = HmacSha256::new_from_slice(self.credentials.api_secret.as_bytes())
            .expect("HMAC can take key of any size");
        mac.update(timestamp_ms.to_string().as_bytes());
        mac.update(method.as_str().as_bytes());
        mac.update(request_path.as_bytes());
        mac.update(body);
        hex::encode(mac.finalize().into_bytes())
    }

    /// Build the authenticated header set for a request.
    ///
    /// `request_path` is the URL path including the query string, without
    /// scheme or host (e.g. `/api/markets?depth=20`).
    pub fn headers(
        &self,
        method: &Method,
        request_path: &str,
        body: &[u8],
        timestamp_ms: i64,
    ) -> Result<HeaderMap, ApiError> {
        let signature = self.signature(method, request_path, body, timestamp_ms);

        let mut headers = HeaderMap::new();
        headers.insert(
            KEY_HEADER,
            HeaderValue::from_str(&self.credentials.api_key)
                .map_err(|e| ApiError::Authentication(format!("Invalid API key: {}", e)))?,
        );
        headers.insert(
            SIGN_HEADER,
            HeaderValue::from_str(&signature)
                .map_err(|e| ApiError::Authentication(format!("Invalid signature: {}", e)))?,
        );
        headers.insert(
            TS_HEADER,
            HeaderValue::from_str(&timestamp_ms.to_string())
                .map_err(|e| ApiError::Authentication(format!("Invalid timestamp: {}", e)))?,
        );
        if let Some(ref subaccount) = self.credentials.subaccount {
            headers.insert(
                SUBACCOUNT_HEADER,
                HeaderValue::from_str(&urlencoding::encode(subaccount))
                    .map_err(|e| ApiError::Authentication(format!("Invalid subaccount: {}", e)))?,
            );
        }

        Ok(headers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TS: i64 = 1609459200000;

    fn signer() -> Signer {
        Signer::new(Credentials::new("test-key", "test-secret"))
    }

    #[test]
    fn known_get_signature() {
        let sig = signer().signature(&Method::GET, "/api/markets", b"", TS);
        assert_eq!(
            sig,
            "625b6995a3bf9c04531d6f14ea82a3a51d86770ce9dd57467671e68930f08a9b"
        );
    }

    #[test]
    fn known_post_signature_covers_body() {
        let sig = signer().signature(
            &Method::POST,
            "/api/orders",
            br#"{"market":"BTC-PERP"}"#,
            TS,
        );
        assert_eq!(
            sig,
            "dfa079583bd435256d4215bc704aa126c7b71a0acb9be02fb5dedf43f48e7958"
        );
    }

    #[test]
    fn known_signature_covers_query_string() {
        let sig = signer().signature(&Method::GET, "/api/markets/BTC-PERP/trades?start_time=100", b"", TS);
        assert_eq!(
            sig,
            "27706a5a130e7b5d0f1c074d2ef0e1c479b2294b128e3fdc075d54fd90e483cf"
        );
    }

    #[test]
    fn signature_is_deterministic() {
        let signer = signer();
        let first = signer.signature(&Method::GET, "/api/account", b"", TS);
        let second = signer.signature(&Method::GET, "/api/account", b"", TS);
        assert_eq!(first, second);
    }

    #[test]
    fn signature_is_sensitive_to_every_input() {
        let signer = signer();
        let base = signer.signature(&Method::GET, "/api/account", b"", TS);

        assert_ne!(base, signer.signature(&Method::POST, "/api/account", b"", TS));
        assert_ne!(base, signer.signature(&Method::GET, "/api/wallet/balances", b"", TS));
        assert_ne!(base, signer.signature(&Method::GET, "/api/account", b"{}", TS));
        assert_ne!(base, signer.signature(&Method::GET, "/api/account", b"", TS + 1));

        let other = Signer::new(Credentials::new("test-key", "other-secret"));
        assert_ne!(base, other.signature(&Method::GET, "/api/account", b"", TS));
    }

    #[test]
    fn headers_carry_key_signature_and_timestamp() {
        let headers = signer().headers(&Method::GET, "/api/markets", b"", TS).unwrap();
        assert_eq!(headers[KEY_HEADER], "test-key");
        assert_eq!(headers[TS_HEADER], "1609459200000");
        assert_eq!(
            headers[SIGN_HEADER],
            "625b6995a3bf9c04531d6f14ea82a3a51d86770ce9dd57467671e68930f08a9b"
        );
        assert!(!headers.contains_key(SUBACCOUNT_HEADER));
    }

    #[test]
    fn subaccount_header_is_percent_encoded() {
        let signer = Signer::new(
            Credentials::new("test-key", "test-secret").with_subaccount("my sub/acct"),
        );
        let headers = signer.headers(&Method::GET, "/api/markets", b"", TS).unwrap();
        assert_eq!(headers[SUBACCOUNT_HEADER], "my%20sub%2Facct");
    }
}
