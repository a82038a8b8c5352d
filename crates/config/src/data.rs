//! Case-insensitive key/value snapshot shared by all providers

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use figment::value::{Dict, Map, Tag, Value};
use figment::{Error, Metadata, Profile, Provider};
use parking_lot::RwLock;

/// Separator of hierarchical keys, e.g. `Database:Url`
pub const KEY_DELIMITER: &str = ":";

#[derive(Clone, PartialEq)]
struct Entry {
    key: String,
    value: Option<String>,
}

/// Flat configuration data.
///
/// Keys compare case-insensitively; writing a key that is already present
/// replaces both the value and the stored spelling. A value of `None` means
/// the key exists but carries no value.
#[derive(Clone, Default, PartialEq)]
pub struct ConfigData {
    entries: HashMap<String, Entry>,
}

impl ConfigData {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace, returning the previous value if the key existed
    pub fn insert(&mut self, key: impl Into<String>, value: Option<String>) -> Option<Option<String>> {
        let key = key.into();
        self.entries
            .insert(normalize(&key), Entry { key, value })
            .map(|previous| previous.value)
    }

    /// Look up a key. `Some(None)` is a present key without a value.
    pub fn get(&self, key: &str) -> Option<Option<&str>> {
        self.entries
            .get(&normalize(key))
            .map(|entry| entry.value.as_deref())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(&normalize(key))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in no particular order, keys as last written
    pub fn iter(&self) -> impl Iterator<Item = (&str, Option<&str>)> {
        self.entries
            .values()
            .map(|entry| (entry.key.as_str(), entry.value.as_deref()))
    }

    /// Keys as last written, sorted case-insensitively
    pub fn keys(&self) -> Vec<&str> {
        let mut keys: Vec<_> = self.entries.iter().collect();
        keys.sort_by(|a, b| a.0.cmp(b.0));
        keys.into_iter().map(|(_, entry)| entry.key.as_str()).collect()
    }
}

fn normalize(key: &str) -> String {
    key.to_lowercase()
}

// secret values must never reach the logs
impl fmt::Debug for ConfigData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigData")
            .field("keys", &self.keys())
            .finish()
    }
}

impl Provider for ConfigData {
    fn metadata(&self) -> Metadata {
        Metadata::named("configuration data")
    }

    /// Nests `a:b:c` keys into dictionaries with lowercased segments.
    /// When a key is both a value and a section, the section wins; sections
    /// keyed `0..n` become arrays.
    fn data(&self) -> Result<Map<Profile, Dict>, Error> {
        let mut entries: Vec<_> = self.entries.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));

        let mut root = Dict::new();
        for (normalized, entry) in entries {
            let Some(value) = &entry.value else {
                continue;
            };
            let segments: Vec<&str> = normalized.split(KEY_DELIMITER).collect();
            insert_nested(&mut root, &segments, Value::String(Tag::Default, value.clone()));
        }

        let root = root
            .into_iter()
            .map(|(key, value)| (key, indexed_sections_to_arrays(value)))
            .collect();
        Ok(Profile::Default.collect(root))
    }
}

fn indexed_sections_to_arrays(value: Value) -> Value {
    let Value::Dict(tag, dict) = value else {
        return value;
    };

    let dict: Dict = dict
        .into_iter()
        .map(|(key, child)| (key, indexed_sections_to_arrays(child)))
        .collect();
    let is_sequence =
        !dict.is_empty() && (0..dict.len()).all(|index| dict.contains_key(&index.to_string()));
    if !is_sequence {
        return Value::Dict(tag, dict);
    }

    let mut items: Vec<(usize, Value)> = dict
        .into_iter()
        .filter_map(|(key, child)| key.parse().ok().map(|index| (index, child)))
        .collect();
    items.sort_by_key(|(index, _)| *index);
    Value::Array(tag, items.into_iter().map(|(_, child)| child).collect())
}

fn insert_nested(dict: &mut Dict, segments: &[&str], value: Value) {
    match segments {
        [] => {}
        [last] => {
            if !matches!(dict.get(*last), Some(Value::Dict(..))) {
                dict.insert(last.to_string(), value);
            }
        }
        [head, rest @ ..] => {
            let child = dict
                .entry(head.to_string())
                .or_insert_with(|| Value::Dict(Tag::Default, Dict::new()));
            if !matches!(child, Value::Dict(..)) {
                *child = Value::Dict(Tag::Default, Dict::new());
            }
            if let Value::Dict(_, child) = child {
                insert_nested(child, rest, value);
            }
        }
    }
}

/// Render a JSON value the way configuration consumers read it.
///
/// Strings are used verbatim, `null` becomes an absent value, everything
/// else is rendered as compact JSON.
pub fn value_to_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::Null => None,
        serde_json::Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// Published snapshot, swapped wholesale on every load
pub(crate) struct SnapshotCell {
    current: RwLock<Arc<ConfigData>>,
}

impl SnapshotCell {
    pub(crate) fn new() -> Self {
        Self {
            current: RwLock::new(Arc::new(ConfigData::new())),
        }
    }

    pub(crate) fn load(&self) -> Arc<ConfigData> {
        self.current.read().clone()
    }

    pub(crate) fn replace(&self, data: ConfigData) {
        *self.current.write() = Arc::new(data);
    }
}
