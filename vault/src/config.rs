//! Vault client configuration.

use hashi_common::HttpConfig;
use secrecy::SecretString;
use std::time::Duration;

/// Address used when neither a profile nor `VAULT_ADDR` provides one.
pub const DEFAULT_ADDR: &str = "https://127.0.0.1:8200";

/// Vault client configuration.
#[derive(Debug, Clone)]
pub struct VaultConfig {
    /// Vault server address
    pub addr: String,
    /// Token used before any login happens
    pub token: Option<SecretString>,
    /// HTTP settings (timeout, TLS)
    pub http: HttpConfig,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            token: None,
            http: HttpConfig::default(),
        }
    }
}

impl VaultConfig {
    /// Create a new configuration for the given address.
    #[must_use]
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            ..Default::default()
        }
    }

    /// Build a configuration from `VAULT_ADDR`, `VAULT_TOKEN`,
    /// `VAULT_CACERT` and `VAULT_SKIP_VERIFY` as returned by `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |name: &str| lookup(name).filter(|v| !v.is_empty());

        let addr = non_empty("VAULT_ADDR").unwrap_or_else(|| DEFAULT_ADDR.to_string());
        let token = non_empty("VAULT_TOKEN").map(SecretString::from);
        let skip_verify = non_empty("VAULT_SKIP_VERIFY")
            .is_some_and(|v| matches!(v.to_ascii_lowercase().as_str(), "1" | "true" | "yes"));

        let mut http = HttpConfig::default().with_tls_skip_verify(skip_verify);
        if let Some(ca_cert) = non_empty("VAULT_CACERT") {
            http = http.with_ca_cert(ca_cert);
        }

        Self { addr, token, http }
    }

    /// Set request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http = self.http.with_timeout(timeout);
        self
    }

    /// Set the initial token.
    #[must_use]
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(SecretString::from(token.into()));
        self
    }
}
