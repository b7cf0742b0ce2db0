//! Vault HTTP client.

use crate::{
    config::VaultConfig,
    error::{VaultError, VaultResult},
    provider::{LeasedSecret, LoginGrant, SecretsEngine},
    secrets::{AuthResponse, ErrorResponse, SecretResponse},
};
use async_trait::async_trait;
use hashi_common::build_http_client;
use reqwest::{Client, Response, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, instrument};

const TOKEN_HEADER: &str = "X-Vault-Token";

/// Blocking-free Vault client holding the current address and token.
#[derive(Debug)]
pub struct VaultClient {
    addr: String,
    token: Option<SecretString>,
    http: Client,
}

impl VaultClient {
    /// Create a new Vault client.
    ///
    /// # Errors
    ///
    /// Fails when the address is empty or the HTTP client cannot be built.
    pub fn new(config: VaultConfig) -> VaultResult<Self> {
        if config.addr.trim().is_empty() {
            return Err(VaultError::InvalidConfig("Vault address is empty".to_string()));
        }

        let http = build_http_client(&config.http)
            .map_err(|e| VaultError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            addr: normalize_addr(&config.addr),
            token: config.token,
            http,
        })
    }

    /// Current server address.
    #[must_use]
    pub fn address(&self) -> &str {
        &self.addr
    }

    /// Whether a token is installed.
    #[must_use]
    pub const fn has_token(&self) -> bool {
        self.token.is_some()
    }

    fn url(&self, path: &str) -> String {
        format!("{}/v1/{}", self.addr, path.trim_start_matches('/'))
    }

    async fn send(&self, request: reqwest::RequestBuilder) -> VaultResult<Response> {
        request.send().await.map_err(|e| {
            if e.is_timeout() {
                VaultError::unavailable(format!("request to {} timed out", self.addr))
            } else {
                VaultError::unavailable(e.to_string())
            }
        })
    }
}

fn normalize_addr(addr: &str) -> String {
    addr.trim().trim_end_matches('/').to_string()
}

async fn error_text(response: Response) -> String {
    ErrorResponse::describe(&response.text().await.unwrap_or_default())
}

#[async_trait]
impl SecretsEngine for VaultClient {
    fn set_address(&mut self, addr: &str) {
        self.addr = normalize_addr(addr);
    }

    fn set_token(&mut self, token: SecretString) {
        self.token = Some(token);
    }

    #[instrument(skip(self, credentials), fields(addr = %self.addr))]
    async fn login(&self, mount: &str, credentials: Value) -> VaultResult<LoginGrant> {
        let url = self.url(&format!("auth/{}/login", mount.trim_matches('/')));
        let response = self.send(self.http.post(&url).json(&credentials)).await?;

        let status = response.status();
        if status.is_client_error() {
            return Err(VaultError::auth_failed(format!(
                "Status {status}: {}",
                error_text(response).await
            )));
        }
        if !status.is_success() {
            return Err(VaultError::unavailable(format!(
                "Status {status}: {}",
                error_text(response).await
            )));
        }

        let auth_response: AuthResponse = response.json().await?;
        let lease_duration = Duration::from_secs(auth_response.auth.lease_duration);

        info!(mount, ttl_secs = lease_duration.as_secs(), "Authenticated with Vault");
        Ok(LoginGrant {
            client_token: SecretString::from(auth_response.auth.client_token),
            lease_duration,
        })
    }

    #[instrument(skip(self), fields(addr = %self.addr))]
    async fn read_secret(&self, path: &str) -> VaultResult<LeasedSecret> {
        let token = self.token.as_ref().ok_or_else(|| {
            VaultError::auth_failed(format!("no Vault token available to read {path}"))
        })?;

        debug!(path, "Reading secret");
        let request = self
            .http
            .get(self.url(path))
            .header(TOKEN_HEADER, token.expose_secret());
        let response = self.send(request).await?;

        let status = response.status();
        match status {
            StatusCode::NOT_FOUND => return Err(VaultError::not_found(path)),
            StatusCode::FORBIDDEN => {
                return Err(VaultError::PermissionDenied(format!(
                    "{path}: {}",
                    error_text(response).await
                )));
            }
            StatusCode::UNAUTHORIZED | StatusCode::BAD_REQUEST => {
                return Err(VaultError::auth_failed(format!(
                    "Status {status}: {}",
                    error_text(response).await
                )));
            }
            s if !s.is_success() => {
                return Err(VaultError::unavailable(format!(
                    "Status {status}: {}",
                    error_text(response).await
                )));
            }
            _ => {}
        }

        let secret: SecretResponse = response.json().await?;
        let data = secret
            .data
            .ok_or_else(|| VaultError::malformed(path, "response has no data"))?;

        Ok(LeasedSecret {
            path: path.to_string(),
            data,
            lease_duration: Duration::from_secs(secret.lease_duration),
        })
    }
}
