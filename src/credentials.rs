use std::fmt;

/// API credentials for one FTX account.
///
/// Set once at client construction and read-only afterwards. The secret is
/// only ever used as an HMAC key; the custom `Debug` impl keeps it out of
/// log output.
#[derive(Clone)]
pub struct Credentials {
    pub api_key: String,
    pub api_secret: String,
    /// Optional subaccount name, sent percent-encoded in the
    /// `FTX-SUBACCOUNT` header.
    pub subaccount: Option<String>,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
            subaccount: None,
        }
    }

    pub fn with_subaccount(mut self, name: impl Into<String>) -> Self {
        self.subaccount = Some(name.into());
        self
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("api_secret", &"<redacted>")
            .field("subaccount", &self.subaccount)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn debug_redacts_the_secret() {
        let credentials = Credentials::new("key-123", "very-secret").with_subaccount("main");
        let output = format!("{:?}", credentials);
        assert!(output.contains("key-123"));
        assert!(output.contains("<redacted>"));
        assert!(!output.contains("very-secret"));
    }
}
