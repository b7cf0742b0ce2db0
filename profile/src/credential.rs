//! Cached credential records and the expiry policy applied to them.

use crate::yaml::null_as_default;
use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// 9999-12-31T23:59:59Z, the last instant RFC 3339 can express.
const LATEST_EXPIRY_SECS: i64 = 253_402_300_799;

/// Token plus absolute expiry for one profile/backend pair.
///
/// Both fields use the empty string for "absent" so cache files stay
/// compatible with what earlier releases wrote.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    /// Opaque credential; empty means nothing cached
    #[serde(default, deserialize_with = "null_as_default")]
    pub token: String,
    /// RFC 3339 timestamp; empty means no known expiry
    #[serde(default, deserialize_with = "null_as_default")]
    pub expire_time: String,
}

impl CredentialRecord {
    /// Create a record from raw parts.
    #[must_use]
    pub fn new(token: impl Into<String>, expire_time: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            expire_time: expire_time.into(),
        }
    }

    /// Record for a token leased for `lease` starting at `issued_at`.
    #[must_use]
    pub fn leased(token: impl Into<String>, lease: Duration, issued_at: DateTime<Utc>) -> Self {
        let expires = TimeDelta::from_std(lease)
            .ok()
            .and_then(|delta| issued_at.checked_add_signed(delta))
            .filter(|at| at.timestamp() <= LATEST_EXPIRY_SECS)
            .unwrap_or_else(|| DateTime::from_timestamp(LATEST_EXPIRY_SECS, 0).unwrap_or_default());

        Self::new(token, format_expiry(expires))
    }

    /// Whether nothing is cached.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.token.is_empty() && self.expire_time.is_empty()
    }
}

impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let token = if self.token.is_empty() { "" } else { "[REDACTED]" };
        f.debug_struct("CredentialRecord")
            .field("token", &token)
            .field("expire_time", &self.expire_time)
            .finish()
    }
}

/// Format an expiry the way records store it.
#[must_use]
pub fn format_expiry(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

/// Decide whether `record` can be reused at `now`.
///
/// An empty token is never valid. A token without expiry is always valid.
/// An expiry that does not parse counts as already expired.
#[must_use]
pub fn is_still_valid(record: &CredentialRecord, now: DateTime<Utc>) -> bool {
    if record.token.is_empty() {
        return false;
    }
    if record.expire_time.is_empty() {
        return true;
    }

    DateTime::parse_from_rfc3339(&record.expire_time)
        .is_ok_and(|expires| expires.with_timezone(&Utc) > now)
}

/// [`is_still_valid`] against the current time.
#[must_use]
pub fn is_still_valid_now(record: &CredentialRecord) -> bool {
    is_still_valid(record, Utc::now())
}
