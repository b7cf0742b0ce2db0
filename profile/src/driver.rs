//! Backend refresh drivers.
//!
//! Vault is the single trust root: its own token comes from a GitHub login,
//! and Consul/Nomad tokens are always dynamic secrets read through Vault.

use crate::credential::CredentialRecord;
use crate::model::{AuthConfig, AuthMethod, Backend};
use chrono::Utc;
use hashi_vault_client::{SecretsEngine, VaultError};
use secrecy::ExposeSecret;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, instrument};

/// Auth mount used by the GitHub method when the profile doesn't name one.
pub const DEFAULT_GITHUB_MOUNT: &str = "github";

/// Why a refresh did not produce a record.
#[derive(Error, Debug)]
pub enum RefreshError {
    /// A field the method needs is missing from the profile
    #[error("missing required {0}")]
    MissingField(&'static str),

    /// Vault rejected or failed the request
    #[error(transparent)]
    Vault(#[from] VaultError),
}

/// Dynamic credential payload issued by the Consul and Nomad secrets engines.
#[derive(Debug, Deserialize)]
struct SecretIdCredential {
    secret_id: String,
}

/// How a derived token is refreshed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshDriver {
    /// Exchange a GitHub token for a Vault token
    GithubLogin,
    /// Read a leased `secret_id` from Vault
    DynamicSecret,
}

impl RefreshDriver {
    /// Pick the driver for `backend` configured with `method`.
    ///
    /// Returns `Ok(None)` when the backend has no derived token.
    ///
    /// # Errors
    ///
    /// Returns a description of the problem when the method is not usable for
    /// this backend.
    pub fn select(backend: Backend, method: &AuthMethod) -> Result<Option<Self>, String> {
        match (backend, method) {
            (_, AuthMethod::Unset) => Ok(None),
            (Backend::Vault, AuthMethod::Github) => Ok(Some(Self::GithubLogin)),
            (Backend::Consul | Backend::Nomad, AuthMethod::Vault) => Ok(Some(Self::DynamicSecret)),
            (_, AuthMethod::Unsupported(other)) => {
                Err(format!("unsupported {backend} auth method '{other}'"))
            }
            (_, method) => Err(format!("auth method '{method}' can't be used for {backend}")),
        }
    }

    /// Obtain a fresh record.
    ///
    /// # Errors
    ///
    /// [`RefreshError::MissingField`] when the profile lacks the method's
    /// input, [`RefreshError::Vault`] when the exchange fails or the payload
    /// has the wrong shape.
    #[instrument(skip(self, auth, client), fields(driver = ?self))]
    pub async fn refresh<E>(self, auth: &AuthConfig, client: &E) -> Result<CredentialRecord, RefreshError>
    where
        E: SecretsEngine + ?Sized,
    {
        match self {
            Self::GithubLogin => github_login(auth, client).await,
            Self::DynamicSecret => read_dynamic_secret(auth, client).await,
        }
    }
}

async fn github_login<E>(auth: &AuthConfig, client: &E) -> Result<CredentialRecord, RefreshError>
where
    E: SecretsEngine + ?Sized,
{
    let github_token = auth
        .external_token()
        .ok_or(RefreshError::MissingField("external token (github_token)"))?;
    let mount = auth.mount.as_deref().unwrap_or(DEFAULT_GITHUB_MOUNT);

    let grant = client.login(mount, json!({ "token": github_token })).await?;

    Ok(CredentialRecord::leased(
        grant.client_token.expose_secret(),
        grant.lease_duration,
        Utc::now(),
    ))
}

async fn read_dynamic_secret<E>(auth: &AuthConfig, client: &E) -> Result<CredentialRecord, RefreshError>
where
    E: SecretsEngine + ?Sized,
{
    let path = auth
        .creds_path
        .as_deref()
        .ok_or(RefreshError::MissingField("creds_path"))?;

    let secret = client.read_secret(path).await?;
    let credential: SecretIdCredential = secret.decode()?;
    debug!(path, ttl_secs = secret.lease_duration.as_secs(), "Read dynamic secret");

    Ok(CredentialRecord::leased(
        credential.secret_id,
        secret.lease_duration,
        Utc::now(),
    ))
}
