//! Wire types for the Vault HTTP API.
//!
//! Only the fields the client reads are decoded; serde skips the rest.

use serde::Deserialize;
use serde_json::{Map, Value};

/// Vault auth response (`POST /v1/auth/<mount>/login`).
#[derive(Debug, Deserialize)]
pub struct AuthResponse {
    pub auth: AuthData,
}

#[derive(Debug, Deserialize)]
pub struct AuthData {
    pub client_token: String,
    pub lease_duration: u64,
}

/// Generic logical read response (`GET /v1/<path>`).
#[derive(Debug, Deserialize)]
pub struct SecretResponse {
    #[serde(default)]
    pub lease_duration: u64,
    #[serde(default)]
    pub data: Option<Map<String, Value>>,
}

/// Error body returned by Vault on non-2xx responses.
#[derive(Debug, Default, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub errors: Vec<String>,
}

impl ErrorResponse {
    /// Parse an error body, falling back to the raw text.
    pub fn describe(body: &str) -> String {
        match serde_json::from_str::<Self>(body) {
            Ok(parsed) if !parsed.errors.is_empty() => parsed.errors.join("; "),
            _ => body.trim().to_string(),
        }
    }
}
