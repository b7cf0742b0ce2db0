//! Encrypted-at-rest file collaborator.
//!
//! Profile and cache files are never read or written in cleartext by this
//! tool. Decryption and encryption are delegated to an external program,
//! keybase by default, through the [`FileCipher`] trait.

use crate::error::{PlatformError, PlatformResult};
use async_trait::async_trait;
use std::ffi::OsStr;
use std::path::Path;
use std::process::Output;
use tokio::process::Command;
use tracing::{debug, info, instrument};

/// Default program used for PGP operations.
pub const DEFAULT_KEYBASE_BIN: &str = "keybase";

/// Decrypts and encrypts files on behalf of the stores.
#[async_trait]
pub trait FileCipher: Send + Sync {
    /// Decrypt `path` and return its cleartext.
    ///
    /// Returns `Ok(None)` when the file does not exist; absence is not an
    /// error at this layer.
    async fn decrypt(&self, path: &Path) -> PlatformResult<Option<Vec<u8>>>;

    /// Encrypt the cleartext file `source` into `dest`.
    async fn encrypt(&self, source: &Path, dest: &Path) -> PlatformResult<()>;
}

/// [`FileCipher`] backed by `keybase pgp`.
#[derive(Debug, Clone)]
pub struct KeybaseCipher {
    program: String,
}

impl Default for KeybaseCipher {
    fn default() -> Self {
        Self::new(DEFAULT_KEYBASE_BIN)
    }
}

impl KeybaseCipher {
    /// Create a cipher that invokes `program` instead of `keybase`.
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    /// Program this cipher runs.
    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    async fn run(&self, action: &'static str, args: &[&OsStr]) -> PlatformResult<Output> {
        let output = Command::new(&self.program)
            .args(args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| PlatformError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(PlatformError::Collaborator {
                program: self.program.clone(),
                action,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(output)
    }
}

#[async_trait]
impl FileCipher for KeybaseCipher {
    #[instrument(skip(self), fields(program = %self.program))]
    async fn decrypt(&self, path: &Path) -> PlatformResult<Option<Vec<u8>>> {
        match tokio::fs::metadata(path)
            .await
            .map_err(|e| PlatformError::io(path, e))
        {
            Ok(_) => {}
            Err(e) if e.is_not_found() => {
                debug!(path = %path.display(), "Encrypted file absent");
                return Ok(None);
            }
            Err(e) => return Err(e),
        }

        info!("Decrypting {} using {}", path.display(), self.program);
        let output = self
            .run(
                "decrypt",
                &[
                    OsStr::new("pgp"),
                    OsStr::new("decrypt"),
                    OsStr::new("--infile"),
                    path.as_os_str(),
                ],
            )
            .await?;

        Ok(Some(output.stdout))
    }

    #[instrument(skip(self), fields(program = %self.program))]
    async fn encrypt(&self, source: &Path, dest: &Path) -> PlatformResult<()> {
        debug!(source = %source.display(), dest = %dest.display(), "Encrypting file");
        self.run(
            "encrypt",
            &[
                OsStr::new("pgp"),
                OsStr::new("encrypt"),
                OsStr::new("--infile"),
                source.as_os_str(),
                OsStr::new("--outfile"),
                dest.as_os_str(),
            ],
        )
        .await?;
        Ok(())
    }
}
