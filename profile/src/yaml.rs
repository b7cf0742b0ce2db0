//! Deserialize helpers for hand-edited YAML.
//!
//! A key written with no value (`consul:` or `consul: ~`) parses as null.
//! These helpers read such nulls as the empty default instead of failing.

use serde::{Deserialize, Deserializer};
use std::collections::BTreeMap;

/// Read `T`, treating null as `T::default()`.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Read a name-keyed map where the whole document or any value may be null.
pub(crate) fn null_values_as_default<'de, D, T>(
    deserializer: D,
) -> Result<BTreeMap<String, T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    let raw = Option::<BTreeMap<String, Option<T>>>::deserialize(deserializer)?;
    Ok(raw
        .unwrap_or_default()
        .into_iter()
        .map(|(name, value)| (name, value.unwrap_or_default()))
        .collect())
}
