//! Case-insensitive name lookup tables

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Normalize a name for case-insensitive comparison
pub fn normalize_name(name: &str) -> String {
    name.trim().to_lowercase()
}

/// A string-to-string map whose keys compare case-insensitively
///
/// The original spelling of each key is preserved for display. Iteration
/// order is the order of the normalized keys, so output built from a
/// `NameMap` is deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(
    from = "BTreeMap<String, String>",
    into = "BTreeMap<String, String>"
)]
pub struct NameMap {
    entries: BTreeMap<String, (String, String)>,
}

impl NameMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace an entry; returns the previous value
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let key = key.into();
        self.entries
            .insert(normalize_name(&key), (key, value.into()))
            .map(|(_, previous)| previous)
    }

    pub fn with_entry(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .get(&normalize_name(key))
            .map(|(_, value)| value.as_str())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(&normalize_name(key))
    }

    /// Whether any value equals `value` (case-insensitive)
    pub fn contains_value(&self, value: &str) -> bool {
        self.entries
            .values()
            .any(|(_, candidate)| candidate.eq_ignore_ascii_case(value))
    }

    /// Iterate `(key as originally written, value)` pairs
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries
            .values()
            .map(|(key, value)| (key.as_str(), value.as_str()))
    }

    /// Merge `other` into `self`, with `other` winning on conflicts
    pub fn extend_from(&mut self, other: &NameMap) {
        for (key, value) in other.iter() {
            self.insert(key, value);
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for NameMap {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut map = NameMap::new();
        for (key, value) in iter {
            map.insert(key, value);
        }
        map
    }
}

impl From<BTreeMap<String, String>> for NameMap {
    fn from(entries: BTreeMap<String, String>) -> Self {
        entries.into_iter().collect()
    }
}

impl From<NameMap> for BTreeMap<String, String> {
    fn from(map: NameMap) -> Self {
        map.entries.into_values().collect()
    }
}

/// Reference column names whose purpose is already served by a built-in
/// target attribute
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NativeFieldMap(NameMap);

impl NativeFieldMap {
    /// A map with no substitutions
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in audit, ownership and state attributes every Dataverse
    /// table carries
    pub fn dataverse_defaults() -> Self {
        Self(
            [
                ("CreatedAt", "createdon"),
                ("UpdatedAt", "modifiedon"),
                ("CreatedBy", "createdby"),
                ("UpdatedBy", "modifiedby"),
                ("OwnerId", "ownerid"),
                ("Owner", "ownerid"),
                ("Status", "statuscode"),
                ("StatusText", "statecode"),
                ("IsActive", "statecode"),
                ("IsDeleted", "statecode"),
                ("DeletedAt", "overriddencreatedon"),
                ("AssignedTo", "ownerid"),
            ]
            .into_iter()
            .collect(),
        )
    }

    pub fn with_entry(mut self, column: impl Into<String>, attribute: impl Into<String>) -> Self {
        self.0.insert(column, attribute);
        self
    }

    pub fn insert(&mut self, column: impl Into<String>, attribute: impl Into<String>) {
        self.0.insert(column, attribute);
    }

    /// The native attribute that replaces `column`, if any
    pub fn substitute(&self, column: &str) -> Option<&str> {
        self.0.get(column)
    }

    /// Whether `attribute` is the target of any substitution
    pub fn is_native_attribute(&self, attribute: &str) -> bool {
        self.0.contains_value(attribute)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}
