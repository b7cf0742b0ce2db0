//! Shared proptest generators.

use chrono::{DateTime, TimeDelta, Utc};
use proptest::prelude::*;

/// Generate Vault-style or opaque tokens.
pub fn token_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "(s|hvs)\\.[A-Za-z0-9]{16,40}",
        "[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}",
    ]
}

/// Generate profile names.
pub fn profile_name_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_-]{0,15}"
}

/// Generate instants between 2000 and 2100.
pub fn instant_strategy() -> impl Strategy<Value = DateTime<Utc>> {
    (946_684_800i64..4_102_444_800i64, 0u32..1_000_000_000u32).prop_map(|(secs, nanos)| {
        DateTime::from_timestamp(secs, nanos).unwrap_or_default()
    })
}

/// Generate a positive offset of up to ten years.
pub fn offset_strategy() -> impl Strategy<Value = TimeDelta> {
    (1i64..315_360_000i64).prop_map(TimeDelta::seconds)
}

/// Generate strings that are not RFC 3339 timestamps.
pub fn malformed_expiry_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        "[a-z ]{1,20}",
        "[0-9]{1,12}",
        Just("2024-02-30T00:00:00Z".to_string()),
        Just("2024-05-01 12:00:00".to_string()),
        Just("2024-05-01T12:00:00".to_string()),
        Just("Wed, 01 May 2024 12:00:00 GMT".to_string()),
    ]
}

/// Generate arbitrary printable values for shell rendering.
pub fn shell_value_strategy() -> impl Strategy<Value = String> {
    "[ -~]{0,40}"
}
