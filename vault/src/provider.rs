//! The contract the credential engine needs from a secrets engine.

use crate::error::{VaultError, VaultResult};
use async_trait::async_trait;
use secrecy::SecretString;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::time::Duration;

/// Token issued by a successful login.
#[derive(Debug, Clone)]
pub struct LoginGrant {
    /// Client token to authenticate later requests
    pub client_token: SecretString,
    /// How long the token is valid
    pub lease_duration: Duration,
}

/// Payload of a leased secret read.
#[derive(Debug, Clone)]
pub struct LeasedSecret {
    /// Path the secret was read from
    pub path: String,
    /// Raw field map
    pub data: Map<String, Value>,
    /// How long the secret is valid
    pub lease_duration: Duration,
}

impl LeasedSecret {
    /// Decode the field map into a typed structure.
    ///
    /// # Errors
    ///
    /// Returns [`VaultError::MalformedResponse`] when the payload does not
    /// match `T`.
    pub fn decode<T: DeserializeOwned>(&self) -> VaultResult<T> {
        serde_json::from_value(Value::Object(self.data.clone()))
            .map_err(|e| VaultError::malformed(&self.path, e.to_string()))
    }
}

/// Operations against a secrets engine.
///
/// The client is stateful: the address and token set here are used by every
/// subsequent call.
#[async_trait]
pub trait SecretsEngine: Send + Sync {
    /// Point the client at a different server.
    fn set_address(&mut self, addr: &str);

    /// Authenticate later requests with `token`.
    fn set_token(&mut self, token: SecretString);

    /// Exchange `credentials` for a token at auth mount `mount`.
    async fn login(&self, mount: &str, credentials: Value) -> VaultResult<LoginGrant>;

    /// Read a leased secret at `path`.
    async fn read_secret(&self, path: &str) -> VaultResult<LeasedSecret>;
}
