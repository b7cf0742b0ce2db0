//! In-memory form of the credential cache file.

use crate::credential::CredentialRecord;
use crate::model::Backend;
use crate::yaml::{null_as_default, null_values_as_default};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct CachedBackend {
    #[serde(default, deserialize_with = "null_as_default")]
    auth: CredentialRecord,
}

impl CachedBackend {
    fn is_empty(&self) -> bool {
        self.auth.is_empty()
    }
}

/// Cached records for one profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachedProfile {
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "CachedBackend::is_empty"
    )]
    vault: CachedBackend,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "CachedBackend::is_empty"
    )]
    consul: CachedBackend,
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "CachedBackend::is_empty"
    )]
    nomad: CachedBackend,
}

impl CachedProfile {
    /// Record for `backend`; empty when nothing is cached.
    #[must_use]
    pub const fn record(&self, backend: Backend) -> &CredentialRecord {
        match backend {
            Backend::Vault => &self.vault.auth,
            Backend::Consul => &self.consul.auth,
            Backend::Nomad => &self.nomad.auth,
        }
    }

    fn record_mut(&mut self, backend: Backend) -> &mut CredentialRecord {
        match backend {
            Backend::Vault => &mut self.vault.auth,
            Backend::Consul => &mut self.consul.auth,
            Backend::Nomad => &mut self.nomad.auth,
        }
    }
}

/// Cached records for every profile, keyed by profile name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Cache {
    profiles: BTreeMap<String, CachedProfile>,
}

impl<'de> Deserialize<'de> for Cache {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        null_values_as_default(deserializer).map(|profiles| Self { profiles })
    }
}

impl Cache {
    /// Cached record for `profile`/`backend`, if the profile has an entry.
    #[must_use]
    pub fn record(&self, profile: &str, backend: Backend) -> Option<&CredentialRecord> {
        self.profiles
            .get(profile)
            .map(|cached| cached.record(backend))
            .filter(|record| !record.is_empty())
    }

    /// Replace the record for `profile`/`backend`.
    pub fn store(&mut self, profile: &str, backend: Backend, record: CredentialRecord) {
        *self
            .profiles
            .entry(profile.to_string())
            .or_default()
            .record_mut(backend) = record;
    }

    /// Names of the profiles that have entries.
    pub fn profile_names(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    /// Number of cached profiles.
    #[must_use]
    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    /// Whether the cache has no profiles.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}
