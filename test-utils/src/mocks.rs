//! Mock implementations for testing.
//!
//! [`MockSecretsEngine`] answers Vault calls from canned responses and records
//! every call. [`PlaintextCipher`] stands in for keybase by copying files
//! unchanged.

use async_trait::async_trait;
use hashi_common::{FileCipher, PlatformError, PlatformResult};
use hashi_vault_client::{LeasedSecret, LoginGrant, SecretsEngine, VaultError, VaultResult};
use secrecy::{ExposeSecret, SecretString};
use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A recorded login call.
#[derive(Debug, Clone, PartialEq)]
pub struct LoginCall {
    /// Auth mount
    pub mount: String,
    /// Request body
    pub credentials: Value,
}

/// A recorded secret read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadCall {
    /// Secret path
    pub path: String,
    /// Token installed on the client when the read happened
    pub token: Option<String>,
}

#[derive(Debug, Clone)]
enum Reply {
    Ok(String, u64),
    Fail(String),
}

#[derive(Debug, Clone)]
enum SecretReply {
    Ok(Value, u64),
    Fail(String),
}

/// Scripted [`SecretsEngine`].
#[derive(Debug, Default)]
pub struct MockSecretsEngine {
    address: Option<String>,
    token: Option<SecretString>,
    login_reply: Option<Reply>,
    secrets: HashMap<String, SecretReply>,
    logins: Mutex<Vec<LoginCall>>,
    reads: Mutex<Vec<ReadCall>>,
}

impl MockSecretsEngine {
    /// Create a mock with no canned responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Every login succeeds with `token` leased for `ttl_secs`.
    #[must_use]
    pub fn with_login(mut self, token: &str, ttl_secs: u64) -> Self {
        self.login_reply = Some(Reply::Ok(token.to_string(), ttl_secs));
        self
    }

    /// Every login is rejected.
    #[must_use]
    pub fn with_login_failure(mut self, message: &str) -> Self {
        self.login_reply = Some(Reply::Fail(message.to_string()));
        self
    }

    /// Reads of `path` return `data` leased for `ttl_secs`.
    #[must_use]
    pub fn with_secret(mut self, path: &str, data: Value, ttl_secs: u64) -> Self {
        self.secrets
            .insert(path.to_string(), SecretReply::Ok(data, ttl_secs));
        self
    }

    /// Reads of `path` fail as unavailable.
    #[must_use]
    pub fn with_read_failure(mut self, path: &str, message: &str) -> Self {
        self.secrets
            .insert(path.to_string(), SecretReply::Fail(message.to_string()));
        self
    }

    /// Logins made so far.
    #[must_use]
    pub fn login_calls(&self) -> Vec<LoginCall> {
        lock(&self.logins).clone()
    }

    /// Reads made so far.
    #[must_use]
    pub fn read_calls(&self) -> Vec<ReadCall> {
        lock(&self.reads).clone()
    }

    /// Address last installed.
    #[must_use]
    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }

    /// Token last installed.
    #[must_use]
    pub fn token(&self) -> Option<&str> {
        self.token.as_ref().map(|t| t.expose_secret())
    }
}

#[async_trait]
impl SecretsEngine for MockSecretsEngine {
    fn set_address(&mut self, addr: &str) {
        self.address = Some(addr.to_string());
    }

    fn set_token(&mut self, token: SecretString) {
        self.token = Some(token);
    }

    async fn login(&self, mount: &str, credentials: Value) -> VaultResult<LoginGrant> {
        lock(&self.logins).push(LoginCall {
            mount: mount.to_string(),
            credentials,
        });

        match &self.login_reply {
            Some(Reply::Ok(token, ttl)) => Ok(LoginGrant {
                client_token: SecretString::from(token.clone()),
                lease_duration: Duration::from_secs(*ttl),
            }),
            Some(Reply::Fail(message)) => Err(VaultError::auth_failed(message.clone())),
            None => Err(VaultError::unavailable("no login response scripted")),
        }
    }

    async fn read_secret(&self, path: &str) -> VaultResult<LeasedSecret> {
        let token = self.token().map(ToString::to_string);
        lock(&self.reads).push(ReadCall {
            path: path.to_string(),
            token: token.clone(),
        });

        if token.is_none() {
            return Err(VaultError::auth_failed(format!(
                "no Vault token available to read {path}"
            )));
        }

        match self.secrets.get(path) {
            Some(SecretReply::Ok(data, ttl)) => Ok(LeasedSecret {
                path: path.to_string(),
                data: data.as_object().cloned().unwrap_or_default(),
                lease_duration: Duration::from_secs(*ttl),
            }),
            Some(SecretReply::Fail(message)) => Err(VaultError::unavailable(message.clone())),
            None => Err(VaultError::not_found(path)),
        }
    }
}

/// [`FileCipher`] that "encrypts" by copying, for tests on real temp dirs.
#[derive(Debug, Default)]
pub struct PlaintextCipher {
    decrypts: AtomicUsize,
    encrypts: AtomicUsize,
    fail_encrypt: AtomicBool,
    fail_decrypt: AtomicBool,
    encrypted: Mutex<Vec<PathBuf>>,
}

impl PlaintextCipher {
    /// Create a working cipher.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every encrypt call fail.
    pub fn fail_encrypt(&self, fail: bool) {
        self.fail_encrypt.store(fail, Ordering::SeqCst);
    }

    /// Make every decrypt of an existing file fail.
    pub fn fail_decrypt(&self, fail: bool) {
        self.fail_decrypt.store(fail, Ordering::SeqCst);
    }

    /// Number of decrypt calls.
    #[must_use]
    pub fn decrypt_count(&self) -> usize {
        self.decrypts.load(Ordering::SeqCst)
    }

    /// Number of encrypt calls.
    #[must_use]
    pub fn encrypt_count(&self) -> usize {
        self.encrypts.load(Ordering::SeqCst)
    }

    /// Destinations passed to encrypt, in call order.
    #[must_use]
    pub fn encrypted_paths(&self) -> Vec<PathBuf> {
        lock(&self.encrypted).clone()
    }
}

#[async_trait]
impl FileCipher for PlaintextCipher {
    async fn decrypt(&self, path: &Path) -> PlatformResult<Option<Vec<u8>>> {
        self.decrypts.fetch_add(1, Ordering::SeqCst);
        match tokio::fs::read(path).await {
            Ok(_) if self.fail_decrypt.load(Ordering::SeqCst) => Err(PlatformError::Collaborator {
                program: "plaintext".to_string(),
                action: "decrypt",
                status: "exit status: 2".to_string(),
                stderr: "decryption disabled".to_string(),
            }),
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(PlatformError::io(path, e)),
        }
    }

    async fn encrypt(&self, source: &Path, dest: &Path) -> PlatformResult<()> {
        self.encrypts.fetch_add(1, Ordering::SeqCst);
        lock(&self.encrypted).push(dest.to_path_buf());

        if self.fail_encrypt.load(Ordering::SeqCst) {
            return Err(PlatformError::Collaborator {
                program: "plaintext".to_string(),
                action: "encrypt",
                status: "exit status: 1".to_string(),
                stderr: "encryption disabled".to_string(),
            });
        }

        tokio::fs::copy(source, dest)
            .await
            .map_err(|e| PlatformError::io(dest, e))?;
        Ok(())
    }
}
