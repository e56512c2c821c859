//! Small shared helpers.

use serde::{Deserialize, Deserializer};

/// Deserializes a present field (including an explicit `null`) as `Some(..)`.
///
/// Paired with `#[serde(default)]` on an `Option<Option<T>>` field this keeps
/// "field absent" (`None`) apart from "set to null" (`Some(None)`).
pub fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

/// Drops duplicate ids, keeping the first occurrence.
pub fn dedup_ids(ids: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
}
