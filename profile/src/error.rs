//! Error types for profile resolution.

use crate::model::Backend;
use hashi_common::PlatformError;
use hashi_vault_client::VaultError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by the stores and the resolution engine.
///
/// Nothing here is retried; every variant is terminal for the run.
#[derive(Error, Debug)]
pub enum HelperError {
    /// Missing or unknown profile, or a required field is absent
    #[error("{0}")]
    Configuration(String),

    /// Login or dynamic-secret read against Vault failed
    #[error("can't obtain {backend} credentials for profile '{profile}': {source}")]
    BackendAuth {
        /// Profile being resolved
        profile: String,
        /// Backend whose refresh failed
        backend: Backend,
        /// Underlying Vault error
        #[source]
        source: VaultError,
    },

    /// Cache file exists but does not parse
    #[error("cache file {} is corrupt: {source}", path.display())]
    CacheCorruption {
        /// Cache file path
        path: PathBuf,
        /// Parse error
        #[source]
        source: serde_yaml::Error,
    },

    /// Encryption collaborator failed on a file
    #[error("can't decrypt {}: {source}", path.display())]
    Cipher {
        /// File being decrypted
        path: PathBuf,
        /// Underlying failure
        #[source]
        source: PlatformError,
    },

    /// Updated cache could not be written back
    #[error("can't persist cache to {}: {reason}", path.display())]
    Persistence {
        /// Cache file path
        path: PathBuf,
        /// What went wrong
        reason: String,
    },
}

/// Result type for profile operations.
pub type HelperResult<T> = Result<T, HelperError>;

impl HelperError {
    /// Create a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a persistence error.
    #[must_use]
    pub fn persistence(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Persistence {
            path: path.into(),
            reason: reason.to_string(),
        }
    }

    /// Process exit status for this error, following sysexits(3).
    #[must_use]
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Configuration(_) => 78,
            Self::BackendAuth { .. } => 69,
            Self::CacheCorruption { .. } => 65,
            Self::Cipher { .. } => 71,
            Self::Persistence { .. } => 74,
        }
    }
}
