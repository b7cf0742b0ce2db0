//! Credential cache and refresh engine for hashi-helper.
//!
//! Given a named profile, resolves Vault, Consul and Nomad credentials,
//! reusing cached tokens until they expire and refreshing them through Vault
//! otherwise, and renders the result as shell `export` lines.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod cache;
pub mod credential;
pub mod driver;
pub mod engine;
pub mod error;
pub mod export;
pub mod model;
pub mod store;
mod yaml;

pub use cache::Cache;
pub use credential::{CredentialRecord, is_still_valid, is_still_valid_now};
pub use driver::{DEFAULT_GITHUB_MOUNT, RefreshDriver, RefreshError};
pub use engine::Resolver;
pub use error::{HelperError, HelperResult};
pub use export::Exports;
pub use model::{AuthConfig, AuthMethod, Backend, BackendConfig, Profile, Profiles, parse_profiles};
pub use store::{CacheStore, ProfileStore, StorePaths};
