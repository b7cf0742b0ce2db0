//! Runtime configuration.
//!
//! Everything except the log level comes from environment variables, read
//! once at startup after an optional `.env` file is applied.

use anyhow::{Context, Result, anyhow};
use hashi_common::cipher::DEFAULT_KEYBASE_BIN;
use hashi_profile::StorePaths;
use hashi_vault_client::VaultConfig;
use std::path::Path;
use std::time::Duration;

/// Program used for PGP decrypt/encrypt.
pub const KEYBASE_BIN_ENV: &str = "HASHI_HELPER_KEYBASE_BIN";
/// Vault request timeout in seconds.
pub const VAULT_TIMEOUT_ENV: &str = "HASHI_HELPER_VAULT_TIMEOUT";
/// Make cache persistence failures fatal.
pub const STRICT_PERSIST_ENV: &str = "HASHI_HELPER_STRICT_PERSIST";

const DEFAULT_VAULT_TIMEOUT_SECS: u64 = 5;

/// hashi-helper configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Profile and cache file locations
    pub paths: StorePaths,
    /// Program invoked for PGP operations
    pub keybase_bin: String,
    /// Initial Vault client settings
    pub vault: VaultConfig,
    /// Abort when the refreshed cache can't be written back
    pub strict_persist: bool,
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// # Errors
    ///
    /// Returns an error if a variable is invalid or no home directory is
    /// known when a default path is needed.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let home = dirs::home_dir();
        Self::from_lookup(|name| std::env::var(name).ok(), home.as_deref())
    }

    /// Load configuration from `lookup`, resolving default paths in `home`.
    ///
    /// # Errors
    ///
    /// Same as [`Config::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>, home: Option<&Path>) -> Result<Self> {
        let paths = StorePaths::resolve(&lookup, home)?;

        let keybase_bin = lookup(KEYBASE_BIN_ENV)
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_KEYBASE_BIN.to_string());

        let timeout = parse_env(&lookup, VAULT_TIMEOUT_ENV, DEFAULT_VAULT_TIMEOUT_SECS)?;
        if timeout == 0 {
            return Err(anyhow!("Invalid {VAULT_TIMEOUT_ENV}: must be at least 1 second"));
        }
        let vault = VaultConfig::from_lookup(&lookup).with_timeout(Duration::from_secs(timeout));

        let strict_persist = parse_env(&lookup, STRICT_PERSIST_ENV, false)?;

        Ok(Self {
            paths,
            keybase_bin,
            vault,
            strict_persist,
        })
    }
}

/// Parse an optional variable, falling back to `default` when unset or empty.
fn parse_env<T>(lookup: impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(name).filter(|v| !v.is_empty()) {
        Some(val) => val.parse().with_context(|| format!("Invalid {name}: {val:?}")),
        None => Ok(default),
    }
}
