//! HashiCorp Vault client for hashi-helper.
//!
//! Covers only what the credential engine needs: logging in through an auth
//! mount and reading leased secrets with an already-issued token.

pub mod client;
pub mod config;
pub mod error;
pub mod provider;
mod secrets;

pub use client::VaultClient;
pub use config::VaultConfig;
pub use error::{VaultError, VaultResult};
pub use provider::{LeasedSecret, LoginGrant, SecretsEngine};
