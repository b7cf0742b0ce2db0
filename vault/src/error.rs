//! Errors returned by the Vault client.

use thiserror::Error;

/// Ways a login or secret read can fail.
#[derive(Error, Debug)]
pub enum VaultError {
    /// Server unreachable, timed out or answered with a server error
    #[error("Vault unavailable: {0}")]
    Unavailable(String),

    /// Login rejected, or the token was missing or refused
    #[error("Vault rejected the credentials: {0}")]
    AuthenticationFailed(String),

    /// Nothing is mounted or stored at the path
    #[error("no secret at {0}")]
    SecretNotFound(String),

    /// Token lacks a policy for the path
    #[error("Vault denied access to {0}")]
    PermissionDenied(String),

    /// Response decoded but did not have the expected shape
    #[error("unexpected response for {path}: {reason}")]
    MalformedResponse {
        /// Request path
        path: String,
        /// What was wrong with it
        reason: String,
    },

    /// Response body was not the expected JSON
    #[error("can't decode Vault response: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Transport failure while reading a response
    #[error("Vault request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Client settings unusable
    #[error("invalid Vault client settings: {0}")]
    InvalidConfig(String),
}

/// Result type for Vault operations.
pub type VaultResult<T> = Result<T, VaultError>;

impl VaultError {
    /// Create an unavailable error.
    #[must_use]
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    /// Create an authentication failed error.
    #[must_use]
    pub fn auth_failed(msg: impl Into<String>) -> Self {
        Self::AuthenticationFailed(msg.into())
    }

    /// Create a secret not found error.
    #[must_use]
    pub fn not_found(path: impl Into<String>) -> Self {
        Self::SecretNotFound(path.into())
    }

    /// Create a malformed response error.
    #[must_use]
    pub fn malformed(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedResponse {
            path: path.into(),
            reason: reason.into(),
        }
    }
}
