//! Encrypted profile and cache files.
//!
//! Both stores read through a [`FileCipher`]; the cache store also writes
//! back through it. Paths are resolved once into [`StorePaths`] and handed to
//! the constructors.

use crate::cache::Cache;
use crate::error::{HelperError, HelperResult};
use crate::model::{Profile, Profiles, parse_profiles};
use hashi_common::FileCipher;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Overrides the profile file location.
pub const PROFILE_FILE_ENV: &str = "HASHI_HELPER_PROFILE_FILE";
/// Overrides the cache file location.
pub const CACHE_FILE_ENV: &str = "HASHI_HELPER_CACHE_FILE";
/// Profile file name under the home directory.
pub const DEFAULT_PROFILE_FILE: &str = ".hashi_helper_profiles.pgp";
/// Cache file name under the home directory.
pub const DEFAULT_CACHE_FILE: &str = ".hashi_helper_cache.pgp";

/// Locations of the encrypted profile and cache files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorePaths {
    /// Profile definitions
    pub profile_file: PathBuf,
    /// Credential cache
    pub cache_file: PathBuf,
}

impl StorePaths {
    /// Create paths explicitly.
    #[must_use]
    pub fn new(profile_file: impl Into<PathBuf>, cache_file: impl Into<PathBuf>) -> Self {
        Self {
            profile_file: profile_file.into(),
            cache_file: cache_file.into(),
        }
    }

    /// Resolve paths from the override variables, falling back to files in
    /// `home`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when a default is needed and no home
    /// directory is known.
    pub fn resolve(
        lookup: impl Fn(&str) -> Option<String>,
        home: Option<&Path>,
    ) -> HelperResult<Self> {
        let pick = |var: &str, default: &str| -> HelperResult<PathBuf> {
            if let Some(path) = lookup(var).filter(|p| !p.is_empty()) {
                return Ok(PathBuf::from(path));
            }
            home.map(|h| h.join(default)).ok_or_else(|| {
                HelperError::config(format!("can't locate home directory; set {var}"))
            })
        };

        Ok(Self {
            profile_file: pick(PROFILE_FILE_ENV, DEFAULT_PROFILE_FILE)?,
            cache_file: pick(CACHE_FILE_ENV, DEFAULT_CACHE_FILE)?,
        })
    }
}

/// Read-only access to profile definitions.
#[derive(Clone)]
pub struct ProfileStore {
    path: PathBuf,
    cipher: Arc<dyn FileCipher>,
}

impl ProfileStore {
    /// Create a store for the profile file at `path`.
    pub fn new(path: impl Into<PathBuf>, cipher: Arc<dyn FileCipher>) -> Self {
        Self {
            path: path.into(),
            cipher,
        }
    }

    /// Profile file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every profile.
    ///
    /// # Errors
    ///
    /// A missing or unparsable profile file is a configuration error.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn load(&self) -> HelperResult<Profiles> {
        let cleartext = self
            .cipher
            .decrypt(&self.path)
            .await
            .map_err(|source| HelperError::Cipher {
                path: self.path.clone(),
                source,
            })?
            .ok_or_else(|| {
                HelperError::config(format!(
                    "profile file {} does not exist",
                    self.path.display()
                ))
            })?;

        if cleartext.iter().all(u8::is_ascii_whitespace) {
            return Ok(Profiles::new());
        }

        let profiles = parse_profiles(&cleartext).map_err(|e| {
            HelperError::config(format!(
                "can't parse profile file {}: {e}",
                self.path.display()
            ))
        })?;

        debug!(count = profiles.len(), "Loaded profiles");
        Ok(profiles)
    }

    /// Load the profile called `name`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when no such profile exists.
    pub async fn get(&self, name: &str) -> HelperResult<Profile> {
        self.load().await?.remove(name).ok_or_else(|| {
            HelperError::config(format!("No profile with the name '{name}' was found"))
        })
    }

    /// Names of all configured profiles, sorted.
    ///
    /// # Errors
    ///
    /// Same as [`ProfileStore::load`].
    pub async fn names(&self) -> HelperResult<Vec<String>> {
        Ok(self.load().await?.into_keys().collect())
    }
}

/// Load and persist the credential cache.
///
/// The file is not locked. Two runs writing at the same time race and the
/// last one wins.
#[derive(Clone)]
pub struct CacheStore {
    path: PathBuf,
    cipher: Arc<dyn FileCipher>,
    strict: bool,
}

impl CacheStore {
    /// Create a store for the cache file at `path`.
    pub fn new(path: impl Into<PathBuf>, cipher: Arc<dyn FileCipher>) -> Self {
        Self {
            path: path.into(),
            cipher,
            strict: false,
        }
    }

    /// Make a failed encrypt step fatal instead of logging it.
    #[must_use]
    pub const fn with_strict_persistence(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Cache file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the cache. An absent file yields an empty cache.
    ///
    /// # Errors
    ///
    /// A file that decrypts but does not parse is [`HelperError::CacheCorruption`].
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub async fn load(&self) -> HelperResult<Cache> {
        let cleartext = self
            .cipher
            .decrypt(&self.path)
            .await
            .map_err(|source| HelperError::Cipher {
                path: self.path.clone(),
                source,
            })?;

        let Some(cleartext) = cleartext else {
            debug!("No cache file yet, starting empty");
            return Ok(Cache::default());
        };

        if cleartext.iter().all(u8::is_ascii_whitespace) {
            return Ok(Cache::default());
        }

        serde_yaml::from_slice(&cleartext).map_err(|source| HelperError::CacheCorruption {
            path: self.path.clone(),
            source,
        })
    }

    /// Write `cache` back.
    ///
    /// The cleartext goes to a private temporary file, is encrypted next to
    /// the cache file and then renamed over it.
    ///
    /// # Errors
    ///
    /// Serialization and temporary-file failures are always fatal. Failure of
    /// the encrypt-and-swap step is fatal only in strict mode; otherwise it is
    /// logged and the previous cache file stays in place.
    #[instrument(skip(self, cache), fields(path = %self.path.display(), profiles = cache.len()))]
    pub async fn save(&self, cache: &Cache) -> HelperResult<()> {
        let yaml = serde_yaml::to_string(cache)
            .map_err(|e| HelperError::persistence(&self.path, e))?;

        let mut staging = tempfile::Builder::new()
            .prefix("hashi_helper_cache")
            .tempfile()
            .map_err(|e| HelperError::persistence(&self.path, e))?;
        staging
            .write_all(yaml.as_bytes())
            .and_then(|()| staging.flush())
            .map_err(|e| HelperError::persistence(&self.path, e))?;

        match self.seal(staging.path()).await {
            Ok(()) => {
                info!("Cache updated");
                Ok(())
            }
            Err(reason) if self.strict => Err(HelperError::persistence(&self.path, reason)),
            Err(reason) => {
                warn!(%reason, "Cache not updated");
                Ok(())
            }
        }
    }

    async fn seal(&self, cleartext: &Path) -> Result<(), String> {
        let sealed = sibling_temp_path(&self.path);

        if let Err(e) = self.cipher.encrypt(cleartext, &sealed).await {
            let _ = tokio::fs::remove_file(&sealed).await;
            return Err(e.to_string());
        }

        if let Err(e) = tokio::fs::rename(&sealed, &self.path).await {
            let _ = tokio::fs::remove_file(&sealed).await;
            return Err(format!("can't move {} into place: {e}", sealed.display()));
        }

        Ok(())
    }
}

fn sibling_temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".tmp");
    path.with_file_name(name)
}
