//! Profile definitions as read from the profile file.

use crate::yaml::{null_as_default, null_values_as_default};
use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// All profiles keyed by name.
pub type Profiles = BTreeMap<String, Profile>;

/// Parse a profile file body.
///
/// A profile or backend section left empty (`prod:` or `consul: ~`) is an
/// empty configuration, not an error.
///
/// # Errors
///
/// Returns the YAML error when the body is not a name-keyed mapping of
/// profiles.
pub fn parse_profiles(yaml: &[u8]) -> Result<Profiles, serde_yaml::Error> {
    null_values_as_default(serde_yaml::Deserializer::from_slice(yaml))
}

/// Backend kinds a profile can configure, in resolution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Backend {
    /// Vault, the secrets engine every other credential is derived from
    Vault,
    /// Consul, the service-discovery backend
    Consul,
    /// Nomad, the scheduler backend
    Nomad,
}

impl Backend {
    /// Fixed resolution order. Vault must come first.
    pub const ALL: [Self; 3] = [Self::Vault, Self::Consul, Self::Nomad];

    /// Lowercase name used in profile and cache files.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Vault => "vault",
            Self::Consul => "consul",
            Self::Nomad => "nomad",
        }
    }

    /// Environment variable carrying the server address.
    #[must_use]
    pub const fn addr_var(self) -> &'static str {
        match self {
            Self::Vault => "VAULT_ADDR",
            Self::Consul => "CONSUL_HTTP_ADDR",
            Self::Nomad => "NOMAD_ADDR",
        }
    }

    /// Environment variable carrying the token.
    #[must_use]
    pub const fn token_var(self) -> &'static str {
        match self {
            Self::Vault => "VAULT_TOKEN",
            Self::Consul => "CONSUL_HTTP_TOKEN",
            Self::Nomad => "NOMAD_TOKEN",
        }
    }
}

impl fmt::Display for Backend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// How a backend token is obtained.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthMethod {
    /// No derived token
    #[default]
    Unset,
    /// Exchange a GitHub token for a Vault token
    Github,
    /// Read a dynamic secret from Vault
    Vault,
    /// Anything else found in the profile file
    Unsupported(String),
}

impl AuthMethod {
    /// Whether the backend token comes from a login or a dynamic read.
    #[must_use]
    pub const fn is_derived(&self) -> bool {
        !matches!(self, Self::Unset)
    }
}

impl FromStr for AuthMethod {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.trim() {
            "" => Self::Unset,
            "github" => Self::Github,
            "vault" => Self::Vault,
            other => Self::Unsupported(other.to_string()),
        })
    }
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unset => f.write_str("unset"),
            Self::Github => f.write_str("github"),
            Self::Vault => f.write_str("vault"),
            Self::Unsupported(other) => f.write_str(other),
        }
    }
}

impl<'de> Deserialize<'de> for AuthMethod {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = Option::<String>::deserialize(deserializer)?;
        Ok(raw.map_or(Self::Unset, |s| s.parse().unwrap_or_default()))
    }
}

fn empty_as_none<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    let raw = Option::<String>::deserialize(deserializer)?;
    Ok(raw.filter(|s| !s.is_empty()))
}

/// Auth section of a backend.
#[derive(Clone, Default, Deserialize)]
pub struct AuthConfig {
    /// Token derivation method
    #[serde(default)]
    pub method: AuthMethod,
    /// Static token exported as-is
    #[serde(default, deserialize_with = "empty_as_none")]
    pub token: Option<String>,
    /// Vault path holding dynamic credentials
    #[serde(default, deserialize_with = "empty_as_none")]
    pub creds_path: Option<String>,
    /// GitHub token used by the `github` method
    #[serde(default, deserialize_with = "empty_as_none")]
    pub github_token: Option<String>,
    /// Auth mount override for the `github` method
    #[serde(default, deserialize_with = "empty_as_none")]
    pub mount: Option<String>,
    /// Vault unseal key exported as-is
    #[serde(default, deserialize_with = "empty_as_none")]
    pub unseal_token: Option<String>,
}

impl fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "[REDACTED]");
        f.debug_struct("AuthConfig")
            .field("method", &self.method)
            .field("token", &redact(&self.token))
            .field("creds_path", &self.creds_path)
            .field("github_token", &redact(&self.github_token))
            .field("mount", &self.mount)
            .field("unseal_token", &redact(&self.unseal_token))
            .finish()
    }
}

impl AuthConfig {
    /// Token exchanged by the `github` method: `github_token`, else `token`.
    #[must_use]
    pub fn external_token(&self) -> Option<&str> {
        self.github_token.as_deref().or(self.token.as_deref())
    }

    /// Token exported as-is. `token` doesn't count when it is the input of a
    /// GitHub login.
    #[must_use]
    pub fn static_token(&self) -> Option<&str> {
        match self.method {
            AuthMethod::Github if self.github_token.is_none() => None,
            _ => self.token.as_deref(),
        }
    }
}

/// One backend section of a profile.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BackendConfig {
    /// Address override
    #[serde(default, deserialize_with = "empty_as_none")]
    pub server: Option<String>,
    /// Auth settings
    #[serde(default, deserialize_with = "null_as_default")]
    pub auth: AuthConfig,
}

/// A named bundle of per-backend settings.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Profile {
    /// Vault section
    #[serde(default, deserialize_with = "null_as_default")]
    pub vault: BackendConfig,
    /// Consul section
    #[serde(default, deserialize_with = "null_as_default")]
    pub consul: BackendConfig,
    /// Nomad section
    #[serde(default, deserialize_with = "null_as_default")]
    pub nomad: BackendConfig,
}

impl Profile {
    /// Settings for `backend`.
    #[must_use]
    pub const fn backend(&self, backend: Backend) -> &BackendConfig {
        match backend {
            Backend::Vault => &self.vault,
            Backend::Consul => &self.consul,
            Backend::Nomad => &self.nomad,
        }
    }

    /// Whether any backend needs the credential cache.
    #[must_use]
    pub fn has_derived_backend(&self) -> bool {
        Backend::ALL
            .iter()
            .any(|b| self.backend(*b).auth.method.is_derived())
    }
}
