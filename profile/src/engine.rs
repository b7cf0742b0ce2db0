//! Profile resolution.
//!
//! For each backend in [`Backend::ALL`] order the engine exports the address
//! and static values, then reuses or refreshes the derived token. Vault is
//! resolved first because Consul and Nomad reads authenticate with its
//! token.

use crate::cache::Cache;
use crate::credential::{CredentialRecord, is_still_valid_now};
use crate::driver::{RefreshDriver, RefreshError};
use crate::error::{HelperError, HelperResult};
use crate::export::{Exports, UNSEAL_KEY_VAR};
use crate::model::{AuthConfig, Backend};
use crate::store::{CacheStore, ProfileStore};
use hashi_vault_client::SecretsEngine;
use secrecy::SecretString;
use tracing::{debug, info, instrument};

/// Resolves profiles into exports, owning the Vault client for the run.
pub struct Resolver<E> {
    profiles: ProfileStore,
    cache: CacheStore,
    client: E,
}

impl<E: SecretsEngine> Resolver<E> {
    /// Create a resolver.
    pub const fn new(profiles: ProfileStore, cache: CacheStore, client: E) -> Self {
        Self {
            profiles,
            cache,
            client,
        }
    }

    /// The Vault client, with whatever address and token the last
    /// resolution installed.
    pub const fn client(&self) -> &E {
        &self.client
    }

    /// Resolve `name` into exports.
    ///
    /// Every backend's auth method is checked before the cache file is read.
    /// The cache is only read when a backend derives its token and only
    /// written when a record was refreshed. Any failure leaves it untouched.
    ///
    /// # Errors
    ///
    /// Configuration errors for a missing/unknown profile or incomplete
    /// backend settings, [`HelperError::BackendAuth`] when a refresh fails,
    /// and store errors from loading or saving the cache.
    #[instrument(skip(self))]
    pub async fn resolve(&mut self, name: &str) -> HelperResult<Exports> {
        if name.trim().is_empty() {
            return Err(HelperError::config("Missing profile name"));
        }

        let profile = self.profiles.get(name).await?;

        let mut drivers = [None; Backend::ALL.len()];
        for (slot, backend) in drivers.iter_mut().zip(Backend::ALL) {
            *slot = RefreshDriver::select(backend, &profile.backend(backend).auth.method)
                .map_err(|msg| HelperError::config(format!("profile '{name}': {msg}")))?;
        }

        let mut cache = if drivers.iter().any(Option::is_some) {
            Some(self.cache.load().await?)
        } else {
            None
        };

        let mut exports = Exports::default();
        let mut refreshed = false;

        for (backend, driver) in Backend::ALL.into_iter().zip(drivers) {
            let config = profile.backend(backend);

            if let Some(server) = &config.server {
                if backend == Backend::Vault {
                    self.client.set_address(server);
                }
                exports.push(backend.addr_var(), server.as_str());
            }

            if let Some(token) = config.auth.static_token() {
                if backend == Backend::Vault {
                    self.client.set_token(SecretString::from(token.to_string()));
                }
                exports.push(backend.token_var(), token);
            }

            if backend == Backend::Vault {
                if let Some(key) = &config.auth.unseal_token {
                    exports.push(UNSEAL_KEY_VAR, key.as_str());
                }
            }

            let Some(driver) = driver else {
                continue;
            };

            let cache = cache.get_or_insert_with(Cache::default);
            let (record, fresh) = self
                .derive_or_reuse(name, backend, driver, &config.auth, cache)
                .await?;
            refreshed |= fresh;

            if backend == Backend::Vault {
                self.client.set_token(SecretString::from(record.token.clone()));
            }
            exports.push(backend.token_var(), record.token);
        }

        match cache {
            Some(cache) if refreshed => self.cache.save(&cache).await?,
            _ => debug!("No credentials refreshed, cache left as is"),
        }

        Ok(exports)
    }

    async fn derive_or_reuse(
        &self,
        profile: &str,
        backend: Backend,
        driver: RefreshDriver,
        auth: &AuthConfig,
        cache: &mut Cache,
    ) -> HelperResult<(CredentialRecord, bool)> {
        if let Some(cached) = cache.record(profile, backend) {
            if is_still_valid_now(cached) {
                debug!(profile, %backend, "Reusing cached credentials");
                return Ok((cached.clone(), false));
            }
        }

        info!(profile, %backend, "Refreshing credentials");
        let record = driver
            .refresh(auth, &self.client)
            .await
            .map_err(|e| match e {
                RefreshError::MissingField(_) => {
                    HelperError::config(format!("profile '{profile}': {backend}: {e}"))
                }
                RefreshError::Vault(source) => HelperError::BackendAuth {
                    profile: profile.to_string(),
                    backend,
                    source,
                },
            })?;

        cache.store(profile, backend, record.clone());
        Ok((record, true))
    }
}
