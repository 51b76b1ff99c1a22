//! Flattened module properties an artifact is compiled under.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::hash::ContentHash;

/// Resolved configuration properties (e.g. `cpp.defines`, `cpp.includePaths`)
/// keyed by their dotted name.
///
/// Property resolution itself happens elsewhere; the scan-result store only
/// needs to compare two maps and fingerprint one.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertyMap(BTreeMap<String, String>);

impl PropertyMap {
    /// Creates an empty property map.
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder-style insert.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    /// Sets a property, returning the previous value.
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    /// Returns the value of a property.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Returns the number of properties.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns `true` if no properties are set.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates properties in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Hashes the map in key order. Equal maps always share a fingerprint.
    pub fn fingerprint(&self) -> ContentHash {
        let mut buf = Vec::new();
        for (key, value) in &self.0 {
            buf.extend_from_slice(key.as_bytes());
            buf.push(0);
            buf.extend_from_slice(value.as_bytes());
            buf.push(0);
        }
        ContentHash::from_bytes(&buf)
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PropertyMap {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_ignores_insertion_order() {
        let a = PropertyMap::new().with("cpp.defines", "A").with("cpp.cxxLanguageVersion", "c++20");
        let b = PropertyMap::new().with("cpp.cxxLanguageVersion", "c++20").with("cpp.defines", "A");
        assert_eq!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn fingerprint_separates_key_and_value() {
        let a = PropertyMap::new().with("ab", "c");
        let b = PropertyMap::new().with("a", "bc");
        assert_ne!(a.fingerprint(), b.fingerprint());
    }

    #[test]
    fn from_iterator_and_get() {
        let map: PropertyMap = [("qbs.buildVariant", "debug")].into_iter().collect();
        assert_eq!(map.get("qbs.buildVariant"), Some("debug"));
        assert_eq!(map.len(), 1);
        assert!(!map.is_empty());
        assert!(PropertyMap::new().is_empty());
    }
}
