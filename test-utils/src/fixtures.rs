//! Test fixtures with sample profile files.

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// GitHub login for Vault, dynamic Consul and Nomad tokens.
pub const PROD_PROFILE: &str = r"
prod:
  vault:
    server: https://vault.prod:8200
    auth:
      method: github
      github_token: abc
  consul:
    server: https://consul.prod:8501
    auth:
      method: vault
      creds_path: consul/creds/ops
  nomad:
    server: https://nomad.prod:4646
    auth:
      method: vault
      creds_path: nomad/creds/ops
";

/// Only static values; never needs the cache.
pub const STATIC_PROFILE: &str = r"
static:
  vault:
    server: https://vault.lab:8200
    auth:
      token: s.static
      unseal_token: unseal-me
  consul:
    auth:
      token: consul-static
";

/// Static Vault token used to derive a Nomad token.
pub const STATIC_VAULT_DERIVED_NOMAD: &str = r"
ops:
  vault:
    auth:
      token: s.ops
  nomad:
    auth:
      method: vault
      creds_path: nomad/creds/ops
";

/// Profile and cache files in a private temporary directory.
#[derive(Debug)]
pub struct StoreDir {
    dir: TempDir,
}

impl StoreDir {
    /// Create an empty directory.
    ///
    /// # Panics
    ///
    /// Panics if the temporary directory cannot be created.
    #[must_use]
    pub fn new() -> Self {
        Self {
            dir: tempfile::tempdir().unwrap_or_else(|e| panic!("tempdir: {e}")),
        }
    }

    /// Create a directory with `profiles` written as the profile file.
    #[must_use]
    pub fn with_profiles(profiles: &str) -> Self {
        let store = Self::new();
        store.write_profiles(profiles);
        store
    }

    /// Directory root.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Profile file path.
    #[must_use]
    pub fn profile_file(&self) -> PathBuf {
        self.dir.path().join("profiles.pgp")
    }

    /// Cache file path.
    #[must_use]
    pub fn cache_file(&self) -> PathBuf {
        self.dir.path().join("cache.pgp")
    }

    /// Overwrite the profile file.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be written.
    pub fn write_profiles(&self, contents: &str) {
        std::fs::write(self.profile_file(), contents)
            .unwrap_or_else(|e| panic!("write profiles: {e}"));
    }

    /// Overwrite the cache file.
    ///
    /// # Panics
    ///
    /// Panics if the file cannot be written.
    pub fn write_cache(&self, contents: &str) {
        std::fs::write(self.cache_file(), contents).unwrap_or_else(|e| panic!("write cache: {e}"));
    }

    /// Cache file contents, if present.
    #[must_use]
    pub fn read_cache(&self) -> Option<String> {
        std::fs::read_to_string(self.cache_file()).ok()
    }
}

impl Default for StoreDir {
    fn default() -> Self {
        Self::new()
    }
}

/// Expiry string `offset_secs` away from now.
#[must_use]
pub fn expiry_in(offset_secs: i64) -> String {
    format_rfc3339(Utc::now() + TimeDelta::seconds(offset_secs))
}

/// Format like the cache does.
#[must_use]
pub fn format_rfc3339(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Cache file body with a Vault record for `profile`.
#[must_use]
pub fn cached_vault(profile: &str, token: &str, expire_time: &str) -> String {
    format!("{profile}:\n  vault:\n    auth:\n      token: {token}\n      expire_time: '{expire_time}'\n")
}
