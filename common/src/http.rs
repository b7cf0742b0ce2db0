//! HTTP client construction for talking to Vault.
//!
//! Requests are bounded by a short timeout: resolution runs inside an
//! interactive shell and a hung server must not hang the prompt.

use crate::error::{PlatformError, PlatformResult};
use reqwest::{Certificate, Client};
use std::path::PathBuf;
use std::time::Duration;

/// Request timeout used when nothing else is configured.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Settings for the client built by [`build_http_client`].
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Bound on connect plus response
    pub timeout: Duration,
    /// Accept any server certificate
    pub tls_skip_verify: bool,
    /// Extra PEM bundle trusted in addition to the built-in roots
    pub ca_cert: Option<PathBuf>,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            tls_skip_verify: false,
            ca_cert: None,
        }
    }
}

impl HttpConfig {
    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Skip TLS certificate verification.
    #[must_use]
    pub const fn with_tls_skip_verify(mut self, skip: bool) -> Self {
        self.tls_skip_verify = skip;
        self
    }

    /// Trust the certificates in the PEM file at `path`.
    #[must_use]
    pub fn with_ca_cert(mut self, path: impl Into<PathBuf>) -> Self {
        self.ca_cert = Some(path.into());
        self
    }
}

/// Build a rustls-backed client from `config`.
///
/// # Errors
///
/// Fails when the CA bundle can't be read or parsed, or the TLS backend
/// can't be initialised.
pub fn build_http_client(config: &HttpConfig) -> PlatformResult<Client> {
    let mut builder = Client::builder()
        .use_rustls_tls()
        .timeout(config.timeout)
        .connect_timeout(config.timeout)
        .danger_accept_invalid_certs(config.tls_skip_verify)
        .user_agent(concat!("hashi-helper/", env!("CARGO_PKG_VERSION")));

    if let Some(path) = &config.ca_cert {
        let pem = std::fs::read(path).map_err(|e| PlatformError::io(path, e))?;
        for cert in Certificate::from_pem_bundle(&pem)? {
            builder = builder.add_root_certificate(cert);
        }
    }

    Ok(builder.build()?)
}
